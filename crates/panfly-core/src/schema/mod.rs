// ── Object schemas ──
//
// Declarative description of each object type: which fields exist, what
// shape and format each one takes, which are required, which aliases are
// accepted, and where on the device the object lives. Validation, encoding
// and path resolution all read from these tables.

mod builtin;
mod registry;

pub use registry::{SchemaRegistry, SchemaRegistryBuilder};

use crate::model::ObjectType;

// ── Field rules ──────────────────────────────────────────────────────

/// Expected shape and format of one field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldKind {
    /// Free text up to `max_len` characters.
    Text { max_len: usize },
    /// `10.0.0.1`, `10.0.0.0/24`, `2001:db8::/32`.
    IpNetmask,
    /// `10.0.0.1-10.0.0.50`, both ends the same family.
    IpRange,
    /// `10.0.0.0/0.0.255.255`.
    IpWildcard,
    Fqdn,
    /// An IP, a CIDR, or the name of an address object.
    AddressRef,
    /// Comma-separated ports and ranges: `80,443,8000-8010`.
    PortSpec,
    Choice(&'static [&'static str]),
    YesNo,
    /// `color1` through `color42`.
    Color,
    /// A `<member>` list. Entries are names or literals; `any` must stand
    /// alone.
    Members { allow_empty: bool },
    /// A nested mapping with its own rules.
    Nested(FieldSet),
}

impl FieldKind {
    pub const MEMBERS: Self = Self::Members { allow_empty: false };
    pub const MEMBERS_OR_EMPTY: Self = Self::Members { allow_empty: true };

    pub fn is_members(&self) -> bool {
        matches!(self, Self::Members { .. })
    }

    pub fn nested(&self) -> Option<&FieldSet> {
        match self {
            Self::Nested(set) => Some(set),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRule {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

/// The rules for one mapping level: the top of an object, or a nested
/// field such as a service's `protocol`.
///
/// `one_of` groups demand exactly one of their members. None present is an
/// error; more than one is a warning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldSet {
    pub fields: Vec<FieldRule>,
    pub one_of: Vec<&'static [&'static str]>,
}

impl FieldSet {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn required(mut self, name: &'static str, kind: FieldKind) -> Self {
        self.fields.push(FieldRule {
            name,
            kind,
            required: true,
        });
        self
    }

    #[must_use]
    pub fn optional(mut self, name: &'static str, kind: FieldKind) -> Self {
        self.fields.push(FieldRule {
            name,
            kind,
            required: false,
        });
        self
    }

    #[must_use]
    pub fn one_of(mut self, group: &'static [&'static str]) -> Self {
        self.one_of.push(group);
        self
    }

    pub fn rule(&self, name: &str) -> Option<&FieldRule> {
        self.fields.iter().find(|r| r.name == name)
    }

    /// Required fields plus exactly-one-of groups at this level. An empty
    /// mapping fails exactly this many checks.
    pub fn requirement_count(&self) -> usize {
        self.fields.iter().filter(|r| r.required).count() + self.one_of.len()
    }
}

// ── Location ─────────────────────────────────────────────────────────

/// Where a collection of this type sits below a scope root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Container {
    /// A plain object container, e.g. `address`.
    Object(&'static str),
    /// Rules under a rulebase, e.g. `security` renders as
    /// `rulebase/security/rules` (or `pre-rulebase/...` on a manager).
    Rulebase(&'static str),
}

/// Scopes in which a type may be addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct ScopeSupport {
    pub vsys: bool,
    pub shared: bool,
    pub device_group: bool,
    pub template: bool,
}

impl ScopeSupport {
    /// Objects: everywhere.
    pub const ALL: Self = Self {
        vsys: true,
        shared: true,
        device_group: true,
        template: true,
    };

    /// Rules: a firewall rulebase, or a manager's shared and device-group
    /// pre/post rulebases.
    pub const POLICY: Self = Self {
        vsys: true,
        shared: true,
        device_group: true,
        template: false,
    };

    /// Network-bound objects such as zones.
    pub const NETWORK: Self = Self {
        vsys: true,
        shared: false,
        device_group: false,
        template: true,
    };
}

// ── Schema ───────────────────────────────────────────────────────────

/// Everything known about one object type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    pub object_type: ObjectType,
    pub container: Container,
    pub scopes: ScopeSupport,
    pub fields: FieldSet,
    /// `(alias, canonical)` pairs, both in hyphenated spelling.
    pub aliases: Vec<(&'static str, &'static str)>,
}

impl Schema {
    pub fn new(object_type: ObjectType, container: Container, fields: FieldSet) -> Self {
        Self {
            object_type,
            container,
            scopes: ScopeSupport::ALL,
            fields,
            aliases: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_scopes(mut self, scopes: ScopeSupport) -> Self {
        self.scopes = scopes;
        self
    }

    #[must_use]
    pub fn with_alias(mut self, alias: &'static str, canonical: &'static str) -> Self {
        self.aliases.push((alias, canonical));
        self
    }

    pub fn rule(&self, name: &str) -> Option<&FieldRule> {
        self.fields.rule(name)
    }

    pub fn requirement_count(&self) -> usize {
        self.fields.requirement_count()
    }

    /// Resolve a field spelling to its canonical name.
    ///
    /// Underscores are read as hyphens, then aliases are applied. Returns
    /// `None` for names the schema does not know.
    pub fn canonical_name(&self, key: &str) -> Option<&'static str> {
        canonical_in(&self.fields, &self.aliases, key)
    }
}

/// Shared by top-level and nested lookups; nested sets carry no aliases.
pub(crate) fn canonical_in(
    set: &FieldSet,
    aliases: &[(&'static str, &'static str)],
    key: &str,
) -> Option<&'static str> {
    let hyphenated = key.replace('_', "-");
    if let Some(rule) = set.rule(&hyphenated) {
        return Some(rule.name);
    }
    aliases
        .iter()
        .find(|(alias, _)| *alias == hyphenated)
        .map(|(_, canonical)| *canonical)
}
