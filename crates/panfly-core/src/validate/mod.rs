// ── Validation ──
//
// Two passes over a field mapping. `normalize` rewrites spellings to the
// canonical hyphenated names, applies aliases, and turns a lone scalar
// into a one-item list where the schema expects members. `check` then
// reports every missing, unknown, mis-shaped or mis-formatted field.
// Nothing here touches the network.

mod ports;
pub mod rules;

pub use ports::{PortSpec, parse_port_spec};

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::CoreError;
use crate::model::{ConfigEntry, FieldValue, Fields, ObjectType, ValidationResult};
use crate::schema::{FieldKind, FieldRule, FieldSet, Schema, SchemaRegistry, canonical_in};

/// Validates mappings against a schema registry.
#[derive(Debug, Clone)]
pub struct Validator {
    registry: Arc<SchemaRegistry>,
}

impl Validator {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    /// Canonicalize a mapping. Conflicting spellings are resolved and
    /// reported as warnings in the returned result.
    pub fn normalize(
        &self,
        object_type: ObjectType,
        fields: &Fields,
    ) -> Result<(Fields, ValidationResult), CoreError> {
        let schema = self.registry.schema_for(object_type)?;
        let mut result = ValidationResult::new();
        let normalized = normalize(schema, fields, &mut result);
        Ok((normalized, result))
    }

    /// Normalize then check a mapping. The result lists every problem.
    pub fn validate(
        &self,
        object_type: ObjectType,
        fields: &Fields,
    ) -> Result<ValidationResult, CoreError> {
        let (normalized, mut result) = self.normalize(object_type, fields)?;
        let schema = self.registry.schema_for(object_type)?;
        check(schema, &normalized, &mut result);
        Ok(result)
    }

    /// As [`validate`](Self::validate), plus checks on the entry name.
    pub fn validate_entry(&self, entry: &ConfigEntry) -> Result<ValidationResult, CoreError> {
        let mut result = self.validate(entry.object_type, &entry.fields)?;
        if let Err(reason) = rules::check_entry_name(&entry.name) {
            result.error(format!("entry name: {reason}"));
        }
        Ok(result)
    }

    /// Produce the normalized entry ready for encoding, or a
    /// `CoreError::Validation` carrying the full result.
    pub fn prepare(
        &self,
        entry: &ConfigEntry,
    ) -> Result<(ConfigEntry, ValidationResult), CoreError> {
        let schema = self.registry.schema_for(entry.object_type)?;
        let mut result = ValidationResult::new();
        let fields = normalize(schema, &entry.fields, &mut result);
        check(schema, &fields, &mut result);
        if let Err(reason) = rules::check_entry_name(&entry.name) {
            result.error(format!("entry name: {reason}"));
        }

        if !result.is_valid() {
            return Err(CoreError::Validation {
                object_type: entry.object_type,
                entry_name: entry.name.clone(),
                result,
            });
        }
        let prepared = ConfigEntry {
            object_type: entry.object_type,
            name: entry.name.clone(),
            fields,
        };
        Ok((prepared, result))
    }
}

/// Validate against the built-in registry.
pub fn validate(object_type: ObjectType, fields: &Fields) -> ValidationResult {
    match Validator::new(SchemaRegistry::builtin()).validate(object_type, fields) {
        Ok(result) => result,
        Err(e) => {
            let mut result = ValidationResult::new();
            result.error(e.to_string());
            result
        }
    }
}

// ── Normalization ────────────────────────────────────────────────────

/// Rewrite `fields` into canonical names.
///
/// Unknown keys pass through unchanged so `check` can report them. When
/// two spellings land on the same field the exact canonical spelling wins,
/// then a hyphenated alias, then an underscored one; the loser is dropped
/// with a warning.
pub fn normalize(schema: &Schema, fields: &Fields, result: &mut ValidationResult) -> Fields {
    normalize_set(&schema.fields, &schema.aliases, fields, "", result)
}

fn normalize_set(
    set: &FieldSet,
    aliases: &[(&'static str, &'static str)],
    fields: &Fields,
    prefix: &str,
    result: &mut ValidationResult,
) -> Fields {
    let mut out = Fields::with_capacity(fields.len());
    let mut chosen: HashMap<&'static str, (u8, &str)> = HashMap::new();

    for (key, value) in fields {
        let rule = canonical_in(set, aliases, key).and_then(|name| set.rule(name));
        let Some(rule) = rule else {
            out.insert(key.clone(), value.clone());
            continue;
        };

        let rank = spelling_rank(key, rule.name);
        let value = coerce(rule, value, &format!("{prefix}{}.", rule.name), result);

        match chosen.get(rule.name) {
            Some(&(prev_rank, prev_key)) if prev_rank <= rank => {
                result.warn(format!(
                    "field '{prefix}{key}' ignored: '{prefix}{prev_key}' also given"
                ));
            }
            Some(&(_, prev_key)) => {
                result.warn(format!(
                    "field '{prefix}{prev_key}' ignored: '{prefix}{key}' also given"
                ));
                out.insert(rule.name.to_owned(), value);
                chosen.insert(rule.name, (rank, key.as_str()));
            }
            None => {
                out.insert(rule.name.to_owned(), value);
                chosen.insert(rule.name, (rank, key.as_str()));
            }
        }
    }
    out
}

/// 0 for the canonical spelling, 1 for other hyphenated spellings, 2 for
/// underscored ones.
fn spelling_rank(key: &str, canonical: &str) -> u8 {
    if key == canonical {
        0
    } else if key.contains('_') {
        2
    } else {
        1
    }
}

fn coerce(
    rule: &FieldRule,
    value: &FieldValue,
    nested_prefix: &str,
    result: &mut ValidationResult,
) -> FieldValue {
    match (&rule.kind, value) {
        (FieldKind::Members { .. }, FieldValue::Text(s)) => FieldValue::List(vec![s.clone()]),
        (FieldKind::Nested(set), FieldValue::Map(map)) => {
            FieldValue::Map(normalize_set(set, &[], map, nested_prefix, result))
        }
        _ => value.clone(),
    }
}

// ── Checking ─────────────────────────────────────────────────────────

/// Check a normalized mapping, appending findings to `result`.
///
/// An empty mapping yields exactly `schema.requirement_count()` errors.
pub fn check(schema: &Schema, fields: &Fields, result: &mut ValidationResult) {
    check_set(&schema.fields, fields, "", result);
}

fn check_set(set: &FieldSet, fields: &Fields, prefix: &str, result: &mut ValidationResult) {
    for rule in set.fields.iter().filter(|r| r.required) {
        if !fields.contains_key(rule.name) {
            result.error(format!("missing required field '{prefix}{}'", rule.name));
        }
    }

    for group in &set.one_of {
        let present: Vec<&str> = group
            .iter()
            .copied()
            .filter(|name| fields.contains_key(*name))
            .collect();
        match present.len() {
            0 => result.error(format!(
                "must specify one of {}",
                qualified(prefix, group)
            )),
            1 => {}
            _ => result.warn(format!(
                "only one of {} should be set; found {}",
                qualified(prefix, group),
                qualified(prefix, &present)
            )),
        }
    }

    for (key, value) in fields {
        let path = format!("{prefix}{key}");
        match set.rule(key) {
            Some(rule) => check_value(rule, value, &path, result),
            None => result.error(format!("unknown field '{path}'")),
        }
    }
}

fn check_value(rule: &FieldRule, value: &FieldValue, path: &str, result: &mut ValidationResult) {
    match (&rule.kind, value) {
        (FieldKind::Nested(set), FieldValue::Map(map)) => {
            check_set(set, map, &format!("{path}."), result);
        }
        (FieldKind::Nested(_), other) => result.error(format!(
            "field '{path}' must be a mapping, got {}",
            other.kind_name()
        )),
        (FieldKind::Members { allow_empty }, FieldValue::List(items)) => {
            if let Err(reason) = rules::check_members(items, *allow_empty) {
                result.error(format!("field '{path}': {reason}"));
            }
        }
        (FieldKind::Members { .. }, other) => result.error(format!(
            "field '{path}' must be a list, got {}",
            other.kind_name()
        )),
        (kind, FieldValue::Text(text)) => {
            if let Err(reason) = rules::check_scalar(kind, text) {
                result.error(format!("field '{path}': {reason}"));
            }
        }
        (_, other) => result.error(format!(
            "field '{path}' must be text, got {}",
            other.kind_name()
        )),
    }
}

fn qualified(prefix: &str, names: &[&str]) -> String {
    names
        .iter()
        .map(|n| format!("'{prefix}{n}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn fields(pairs: &[(&str, FieldValue)]) -> Fields {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect()
    }

    fn validator() -> Validator {
        Validator::new(SchemaRegistry::builtin())
    }

    #[test]
    fn empty_mapping_fails_every_requirement() {
        let validator = validator();
        for ot in ObjectType::all() {
            let expected = validator.registry().schema_for(ot).unwrap().requirement_count();
            let result = validator.validate(ot, &Fields::new()).unwrap();
            assert_eq!(result.errors.len(), expected, "{ot}: {:?}", result.errors);
        }
    }

    #[test]
    fn valid_address() {
        let result = validate(
            ObjectType::Address,
            &fields(&[("ip-netmask", "10.0.1.100/32".into())]),
        );
        assert!(result.is_valid(), "{result}");
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn underscore_spelling_loses_to_canonical() {
        let input = fields(&[
            ("ip_netmask", "10.0.0.2/32".into()),
            ("ip-netmask", "10.0.0.1/32".into()),
        ]);
        let (normalized, result) = validator().normalize(ObjectType::Address, &input).unwrap();

        assert_eq!(normalized.len(), 1);
        assert_eq!(normalized["ip-netmask"], FieldValue::from("10.0.0.1/32"));
        assert_eq!(
            result.warnings,
            vec!["field 'ip_netmask' ignored: 'ip-netmask' also given".to_owned()]
        );
    }

    #[test]
    fn aliases_and_scalar_coercion() {
        let input = fields(&[
            ("from_zone", "trust".into()),
            ("to", "untrust".into()),
            ("src", "any".into()),
            ("dst", vec!["web-server"].into()),
            ("app", "web-browsing".into()),
            ("service", "application-default".into()),
            ("action", "allow".into()),
        ]);
        let (normalized, result) = validator()
            .normalize(ObjectType::SecurityPolicy, &input)
            .unwrap();

        assert!(result.warnings.is_empty());
        assert_eq!(
            normalized.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["from", "to", "source", "destination", "application", "service", "action"]
        );
        assert_eq!(normalized["from"], FieldValue::from(["trust"]));
        assert_eq!(normalized["action"], FieldValue::from("allow"));
        assert!(validate(ObjectType::SecurityPolicy, &input).is_valid());
    }

    #[test]
    fn collects_every_problem() {
        let input = fields(&[
            ("ip-netmask", "10.0.0.300".into()),
            ("colour", "red".into()),
            ("tag", FieldValue::Map(Fields::new())),
        ]);
        let result = validate(ObjectType::Address, &input);

        assert_eq!(result.errors.len(), 3, "{:?}", result.errors);
        assert!(result.errors.iter().any(|e| e.contains("'10.0.0.300'")));
        assert!(result.errors.iter().any(|e| e == "unknown field 'colour'"));
        assert!(
            result
                .errors
                .iter()
                .any(|e| e == "field 'tag' must be a list, got mapping")
        );
    }

    #[test]
    fn one_of_overlap_is_a_warning() {
        let input = fields(&[
            ("ip-netmask", "10.0.0.1".into()),
            ("fqdn", "example.com".into()),
        ]);
        let result = validate(ObjectType::Address, &input);
        assert!(result.is_valid());
        assert_eq!(result.warnings.len(), 1);
    }

    #[test]
    fn nested_service_protocol() {
        let mut tcp = Fields::new();
        tcp.insert("port".into(), "80,443,8000-8010".into());
        let mut protocol = Fields::new();
        protocol.insert("tcp".into(), FieldValue::Map(tcp));
        let good = fields(&[("protocol", FieldValue::Map(protocol))]);
        assert!(validate(ObjectType::Service, &good).is_valid());

        let mut udp = Fields::new();
        udp.insert("port".into(), "70000".into());
        let mut protocol = Fields::new();
        protocol.insert("udp".into(), FieldValue::Map(udp));
        let bad = fields(&[("protocol", FieldValue::Map(protocol))]);
        let result = validate(ObjectType::Service, &bad);
        assert_eq!(result.errors.len(), 1);
        assert!(
            result.errors[0].starts_with("field 'protocol.udp.port'"),
            "{}",
            result.errors[0]
        );

        let empty = fields(&[("protocol", FieldValue::Map(Fields::new()))]);
        let result = validate(ObjectType::Service, &empty);
        assert_eq!(
            result.errors,
            vec!["must specify one of 'protocol.tcp', 'protocol.udp', 'protocol.sctp'".to_owned()]
        );
    }

    #[test]
    fn prepare_rejects_with_full_result() {
        let entry = ConfigEntry::new(ObjectType::Address, "");
        let err = validator().prepare(&entry).unwrap_err();
        match err {
            CoreError::Validation { result, .. } => {
                assert_eq!(result.errors.len(), 2, "{:?}", result.errors);
            }
            other => panic!("expected Validation, got {other:?}"),
        }
    }

    #[test]
    fn prepare_returns_normalized_entry() {
        let entry = ConfigEntry::new(ObjectType::AddressGroup, "web-servers")
            .with_field("members", "web-1")
            .with_field("tags", vec!["prod"]);
        let (prepared, result) = validator().prepare(&entry).unwrap();

        assert!(result.is_valid());
        assert_eq!(prepared.fields["static"], FieldValue::from(["web-1"]));
        assert_eq!(prepared.fields["tag"], FieldValue::from(["prod"]));
    }
}
