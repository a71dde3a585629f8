// ── Path resolution ──
//
// Turns (object type, entry name, context) into the xpath the device
// expects. The structural part of a path depends only on the object type
// and the shape of the context, so it is built once per pair and cached;
// names (vsys, device group, template, entry) are substituted on every
// call.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;

use crate::context::{DeviceContext, PanoramaScope, Rulebase};
use crate::error::CoreError;
use crate::model::ObjectType;
use crate::schema::{Container, SchemaRegistry, ScopeSupport};

/// Device name under `/config/devices` on every platform.
pub const LOCALHOST: &str = "localhost.localdomain";

/// Absolute xpath into the device configuration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocationPath(String);

impl LocationPath {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for LocationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for LocationPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The structure of a context with every name stripped out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContextShape {
    Vsys,
    Shared(Rulebase),
    DeviceGroup(Rulebase),
    Template,
}

impl ContextShape {
    pub fn of(ctx: &DeviceContext) -> Self {
        match ctx {
            DeviceContext::Firewall { .. } => Self::Vsys,
            DeviceContext::Panorama(PanoramaScope::Shared { rulebase }) => Self::Shared(*rulebase),
            DeviceContext::Panorama(PanoramaScope::DeviceGroup { rulebase, .. }) => {
                Self::DeviceGroup(*rulebase)
            }
            DeviceContext::Panorama(PanoramaScope::Template { .. }) => Self::Template,
        }
    }

    fn supported_by(self, scopes: ScopeSupport) -> bool {
        match self {
            Self::Vsys => scopes.vsys,
            Self::Shared(_) => scopes.shared,
            Self::DeviceGroup(_) => scopes.device_group,
            Self::Template => scopes.template,
        }
    }
}

impl fmt::Display for ContextShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Vsys => "a firewall vsys",
            Self::Shared(_) => "the Panorama shared scope",
            Self::DeviceGroup(_) => "a Panorama device group",
            Self::Template => "a Panorama template",
        })
    }
}

// ── Templates ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Vsys,
    DeviceGroup,
    Template,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment {
    Literal(&'static str),
    /// `entry[@name='localhost.localdomain']`
    Localhost,
    /// `entry[@name='<name from context>']`
    Entry(Slot),
}

/// Path skeleton for one (object type, context shape) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PathTemplate {
    segments: Vec<Segment>,
}

impl PathTemplate {
    fn build(container: Container, shape: ContextShape) -> Self {
        use Segment::{Entry, Literal, Localhost};

        let mut segments = vec![Literal("config")];
        match shape {
            ContextShape::Vsys => {
                segments.extend([Literal("devices"), Localhost, Literal("vsys"), Entry(Slot::Vsys)]);
            }
            ContextShape::Shared(_) => segments.push(Literal("shared")),
            ContextShape::DeviceGroup(_) => segments.extend([
                Literal("devices"),
                Localhost,
                Literal("device-group"),
                Entry(Slot::DeviceGroup),
            ]),
            ContextShape::Template => segments.extend([
                Literal("devices"),
                Localhost,
                Literal("template"),
                Entry(Slot::Template),
                Literal("config"),
                Literal("devices"),
                Localhost,
                Literal("vsys"),
                Entry(Slot::Vsys),
            ]),
        }

        match (container, shape) {
            (Container::Object(name), _) => segments.push(Literal(name)),
            (Container::Rulebase(kind), ContextShape::Shared(rb) | ContextShape::DeviceGroup(rb)) => {
                segments.extend([Literal(rb.element()), Literal(kind), Literal("rules")]);
            }
            (Container::Rulebase(kind), _) => {
                segments.extend([Literal("rulebase"), Literal(kind), Literal("rules")]);
            }
        }
        Self { segments }
    }

    fn render(&self, ctx: &DeviceContext, default_vsys: &str) -> Result<String, CoreError> {
        let mut out = String::with_capacity(160);
        for segment in &self.segments {
            out.push('/');
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Localhost => push_entry(&mut out, LOCALHOST)?,
                Segment::Entry(slot) => push_entry(&mut out, slot_value(*slot, ctx, default_vsys)?)?,
            }
        }
        Ok(out)
    }
}

fn slot_value<'a>(slot: Slot, ctx: &'a DeviceContext, default_vsys: &'a str) -> Result<&'a str, CoreError> {
    match (slot, ctx) {
        (Slot::Vsys, DeviceContext::Firewall { vsys }) => Ok(vsys.as_deref().unwrap_or(default_vsys)),
        (Slot::Vsys, DeviceContext::Panorama(_)) => Ok(default_vsys),
        (Slot::DeviceGroup, DeviceContext::Panorama(PanoramaScope::DeviceGroup { name, .. }))
        | (Slot::Template, DeviceContext::Panorama(PanoramaScope::Template { name })) => Ok(name.as_str()),
        _ => Err(CoreError::Internal(format!(
            "path template slot {slot:?} does not match context {ctx}"
        ))),
    }
}

fn push_entry(out: &mut String, name: &str) -> Result<(), CoreError> {
    out.push_str("entry[@name=");
    out.push_str(&quote_name(name)?);
    out.push(']');
    Ok(())
}

/// Quote a name as an XPath 1.0 string literal.
///
/// Single quotes are used unless the name contains one, then double
/// quotes. XPath 1.0 has no escape syntax, so a name containing both is
/// rejected.
pub fn quote_name(name: &str) -> Result<String, CoreError> {
    if name.is_empty() {
        return Err(CoreError::InvalidEntryName {
            name: String::new(),
            reason: "name is empty".into(),
        });
    }
    match (name.contains('\''), name.contains('"')) {
        (false, _) => Ok(format!("'{name}'")),
        (true, false) => Ok(format!("\"{name}\"")),
        (true, true) => Err(CoreError::InvalidEntryName {
            name: name.to_owned(),
            reason: "contains both single and double quotes".into(),
        }),
    }
}

// ── Resolver ─────────────────────────────────────────────────────────

/// Resolves object locations. Safe to share across tasks; the template
/// cache is concurrent.
#[derive(Debug)]
pub struct PathResolver {
    registry: Arc<SchemaRegistry>,
    default_vsys: String,
    templates: DashMap<(ObjectType, ContextShape), Arc<PathTemplate>>,
}

impl PathResolver {
    pub fn new(registry: Arc<SchemaRegistry>, default_vsys: impl Into<String>) -> Self {
        Self {
            registry,
            default_vsys: default_vsys.into(),
            templates: DashMap::new(),
        }
    }

    /// Vsys used when a firewall context names none, and inside templates.
    pub fn default_vsys(&self) -> &str {
        &self.default_vsys
    }

    /// Path of one entry.
    pub fn resolve(
        &self,
        object_type: ObjectType,
        entry_name: &str,
        ctx: &DeviceContext,
    ) -> Result<LocationPath, CoreError> {
        let mut path = self.resolve_collection(object_type, ctx)?.into_string();
        path.push('/');
        push_entry(&mut path, entry_name)?;
        Ok(LocationPath(path))
    }

    /// Path of the container holding every entry of a type.
    pub fn resolve_collection(
        &self,
        object_type: ObjectType,
        ctx: &DeviceContext,
    ) -> Result<LocationPath, CoreError> {
        let template = self.template(object_type, ContextShape::of(ctx))?;
        template.render(ctx, &self.default_vsys).map(LocationPath)
    }

    /// Number of distinct path skeletons built so far.
    pub fn cached_templates(&self) -> usize {
        self.templates.len()
    }

    fn template(
        &self,
        object_type: ObjectType,
        shape: ContextShape,
    ) -> Result<Arc<PathTemplate>, CoreError> {
        let key = (object_type, shape);
        if let Some(template) = self.templates.get(&key) {
            return Ok(Arc::clone(template.value()));
        }

        let schema = self.registry.schema_for(object_type)?;
        if !shape.supported_by(schema.scopes) {
            return Err(CoreError::UnsupportedLocation {
                object_type,
                scope: shape.to_string(),
            });
        }
        let built = Arc::new(PathTemplate::build(schema.container, shape));
        Ok(Arc::clone(self.templates.entry(key).or_insert(built).value()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn resolver() -> PathResolver {
        PathResolver::new(SchemaRegistry::builtin(), "vsys1")
    }

    #[test]
    fn firewall_vsys_entry() {
        let path = resolver()
            .resolve(ObjectType::Address, "web-server", &DeviceContext::vsys("vsys2"))
            .unwrap();
        assert_eq!(
            path.as_str(),
            "/config/devices/entry[@name='localhost.localdomain']/vsys/entry[@name='vsys2']/address/entry[@name='web-server']"
        );
    }

    #[test]
    fn firewall_default_vsys_collection() {
        let path = resolver()
            .resolve_collection(ObjectType::SecurityPolicy, &DeviceContext::firewall())
            .unwrap();
        assert_eq!(
            path.as_str(),
            "/config/devices/entry[@name='localhost.localdomain']/vsys/entry[@name='vsys1']/rulebase/security/rules"
        );
    }

    #[test]
    fn device_group_rulebases() {
        let resolver = resolver();
        let pre = resolver
            .resolve(ObjectType::NatPolicy, "snat", &DeviceContext::device_group("branch"))
            .unwrap();
        assert_eq!(
            pre.as_str(),
            "/config/devices/entry[@name='localhost.localdomain']/device-group/entry[@name='branch']/pre-rulebase/nat/rules/entry[@name='snat']"
        );

        let post = resolver
            .resolve_collection(
                ObjectType::SecurityPolicy,
                &DeviceContext::device_group("branch").with_rulebase(Rulebase::Post),
            )
            .unwrap();
        assert!(post.as_str().ends_with("/post-rulebase/security/rules"), "{post}");
    }

    #[test]
    fn shared_and_template() {
        let resolver = resolver();
        assert_eq!(
            resolver
                .resolve_collection(ObjectType::Tag, &DeviceContext::shared())
                .unwrap()
                .as_str(),
            "/config/shared/tag"
        );
        assert_eq!(
            resolver
                .resolve(ObjectType::Zone, "inside", &DeviceContext::template("branch-net"))
                .unwrap()
                .as_str(),
            "/config/devices/entry[@name='localhost.localdomain']/template/entry[@name='branch-net']/config/devices/entry[@name='localhost.localdomain']/vsys/entry[@name='vsys1']/zone/entry[@name='inside']"
        );
    }

    #[test]
    fn unsupported_scopes() {
        let resolver = resolver();
        let err = resolver
            .resolve_collection(ObjectType::Zone, &DeviceContext::device_group("dg1"))
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::UnsupportedLocation { object_type: ObjectType::Zone, .. }
        ));
        assert!(
            resolver
                .resolve_collection(ObjectType::SecurityPolicy, &DeviceContext::template("t"))
                .is_err()
        );
    }

    #[test]
    fn quoting() {
        assert_eq!(quote_name("web").unwrap(), "'web'");
        assert_eq!(quote_name("bob's host").unwrap(), "\"bob's host\"");
        assert_eq!(quote_name("say \"hi\"").unwrap(), "'say \"hi\"'");
        assert!(matches!(
            quote_name("it's \"x\""),
            Err(CoreError::InvalidEntryName { .. })
        ));
        assert!(quote_name("").is_err());
    }

    #[test]
    fn apostrophe_names_in_paths() {
        let path = resolver()
            .resolve(ObjectType::Address, "bob's laptop", &DeviceContext::vsys("vsys1"))
            .unwrap();
        assert!(path.as_str().ends_with("/address/entry[@name=\"bob's laptop\"]"), "{path}");
    }

    #[test]
    fn cache_keys_on_shape_not_names() {
        let resolver = resolver();
        let a = resolver
            .resolve(ObjectType::Address, "x", &DeviceContext::device_group("dg-a"))
            .unwrap();
        let b = resolver
            .resolve(ObjectType::Address, "y", &DeviceContext::device_group("dg-b"))
            .unwrap();
        assert_eq!(resolver.cached_templates(), 1);
        assert!(a.as_str().contains("'dg-a'") && a.as_str().ends_with("'x']"));
        assert!(b.as_str().contains("'dg-b'") && b.as_str().ends_with("'y']"));

        resolver
            .resolve(ObjectType::Address, "x", &DeviceContext::vsys("vsys3"))
            .unwrap();
        assert_eq!(resolver.cached_templates(), 2);
    }

    #[test]
    fn concurrent_resolution_is_consistent() {
        let resolver = resolver();
        std::thread::scope(|scope| {
            for i in 0..8 {
                let resolver = &resolver;
                scope.spawn(move || {
                    let vsys = format!("vsys{}", i % 3 + 1);
                    let path = resolver
                        .resolve(ObjectType::Service, "svc", &DeviceContext::vsys(vsys.as_str()))
                        .unwrap();
                    assert!(path.as_str().contains(&format!("'{vsys}'")));
                });
            }
        });
        assert_eq!(resolver.cached_templates(), 1);
    }
}
