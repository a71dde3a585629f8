// ── XML codec ──
//
// Maps between field mappings and the device's `<entry name="...">`
// elements. Text becomes element text, lists become `<member>` children,
// nested mappings become nested elements. The schema decides the shape of
// member-list fields in both directions, so a scalar given for one is sent
// as a single `<member>`.

use std::fmt;
use std::sync::Arc;

use panfly_api::XmlNode;

use crate::error::CoreError;
use crate::model::{ConfigEntry, FieldValue, Fields, ObjectType};
use crate::schema::{FieldKind, FieldSet, SchemaRegistry};

const ENTRY: &str = "entry";
const MEMBER: &str = "member";
const NAME_ATTR: &str = "name";

/// Serialized `<entry>` element, ready to send as the `element` parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlFragment(String);

impl XmlFragment {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for XmlFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for XmlFragment {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Schema-aware encoder and decoder.
#[derive(Debug, Clone)]
pub struct Codec {
    registry: Arc<SchemaRegistry>,
}

impl Codec {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self { registry }
    }

    /// Encode one object as `<entry name="...">...</entry>`.
    ///
    /// Field order follows the mapping's insertion order. Text given for a
    /// member-list field is written as a one-member list.
    pub fn encode(
        &self,
        object_type: ObjectType,
        entry_name: &str,
        fields: &Fields,
    ) -> Result<XmlFragment, CoreError> {
        let schema = self.registry.schema_for(object_type)?;
        encode_children(Some(&schema.fields), entry_name, fields)
            .to_xml()
            .map(XmlFragment)
            .map_err(|e| CoreError::Internal(format!("encoding {object_type} '{entry_name}': {e}")))
    }

    pub fn encode_entry(&self, entry: &ConfigEntry) -> Result<XmlFragment, CoreError> {
        self.encode(entry.object_type, &entry.name, &entry.fields)
    }

    /// Decode the children of an `<entry>` element into a mapping.
    ///
    /// Attributes on the entry other than `name` (`uuid`, `loc`, ...) are
    /// ignored.
    pub fn decode(&self, object_type: ObjectType, entry: &XmlNode) -> Result<Fields, CoreError> {
        let schema = self.registry.schema_for(object_type)?;
        Ok(decode_children(Some(&schema.fields), entry))
    }

    /// Decode an `<entry>` element including its name.
    pub fn decode_entry(
        &self,
        object_type: ObjectType,
        entry: &XmlNode,
    ) -> Result<ConfigEntry, CoreError> {
        if entry.name() != ENTRY {
            return Err(CoreError::Internal(format!(
                "expected <{ENTRY}> element for {object_type}, found <{}>",
                entry.name()
            )));
        }
        let name = entry.attribute(NAME_ATTR).ok_or_else(|| {
            CoreError::Internal(format!("{object_type} <{ENTRY}> has no name attribute"))
        })?;
        Ok(ConfigEntry {
            object_type,
            name: name.to_owned(),
            fields: self.decode(object_type, entry)?,
        })
    }

    /// Decode every `<entry>` under a container element, in document order.
    pub fn decode_collection(
        &self,
        object_type: ObjectType,
        container: &XmlNode,
    ) -> Result<Vec<ConfigEntry>, CoreError> {
        container
            .children_named(ENTRY)
            .map(|entry| self.decode_entry(object_type, entry))
            .collect()
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::new(SchemaRegistry::builtin())
    }
}

// ── Encoding ─────────────────────────────────────────────────────────

/// Build the `<entry>` tree for one object by shape alone.
pub fn encode_node(entry_name: &str, fields: &Fields) -> XmlNode {
    encode_children(None, entry_name, fields)
}

fn encode_children(set: Option<&FieldSet>, entry_name: &str, fields: &Fields) -> XmlNode {
    let mut entry = XmlNode::new(ENTRY).with_attribute(NAME_ATTR, entry_name);
    for (key, value) in fields {
        entry.push_child(encode_value(rule_kind(set, key), key, value));
    }
    entry
}

fn rule_kind<'a>(set: Option<&'a FieldSet>, key: &str) -> Option<&'a FieldKind> {
    set.and_then(|s| s.rule(key)).map(|r| &r.kind)
}

fn encode_value(kind: Option<&FieldKind>, key: &str, value: &FieldValue) -> XmlNode {
    let node = XmlNode::new(key);
    match (kind, value) {
        (Some(FieldKind::Members { .. }), FieldValue::Text(text)) => {
            node.with_child(XmlNode::new(MEMBER).with_text(text.as_str()))
        }
        (_, FieldValue::Text(text)) if text.is_empty() => node,
        (_, FieldValue::Text(text)) => node.with_text(text.as_str()),
        (_, FieldValue::List(items)) => items.iter().fold(node, |node, item| {
            node.with_child(XmlNode::new(MEMBER).with_text(item.as_str()))
        }),
        (kind, FieldValue::Map(map)) => {
            let set = kind.and_then(FieldKind::nested);
            map.iter().fold(node, |node, (k, v)| {
                node.with_child(encode_value(rule_kind(set, k), k, v))
            })
        }
    }
}

// ── Decoding ─────────────────────────────────────────────────────────

/// Decode any element's children by shape alone. `<member>` lists become
/// lists, leaves become text, everything else a mapping.
pub fn decode_untyped(node: &XmlNode) -> Fields {
    decode_children(None, node)
}

fn decode_children(set: Option<&FieldSet>, parent: &XmlNode) -> Fields {
    let mut fields = Fields::with_capacity(parent.children().len());
    for child in parent.children() {
        let kind = rule_kind(set, child.name());
        fields.insert(child.name().to_owned(), decode_value(kind, child));
    }
    fields
}

fn decode_value(kind: Option<&FieldKind>, node: &XmlNode) -> FieldValue {
    match kind {
        Some(FieldKind::Members { .. }) => FieldValue::List(member_texts(node)),
        Some(FieldKind::Nested(set)) => FieldValue::Map(decode_children(Some(set), node)),
        _ if node.is_leaf() => FieldValue::Text(node.text().unwrap_or_default().to_owned()),
        _ if node.children().iter().all(|c| c.name() == MEMBER) => {
            FieldValue::List(member_texts(node))
        }
        _ => FieldValue::Map(decode_children(None, node)),
    }
}

/// `<member>` texts in order. Bare text with no `<member>` children is
/// kept as a single member.
fn member_texts(node: &XmlNode) -> Vec<String> {
    if node.is_leaf() {
        return node
            .text()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(|t| vec![t.to_owned()])
            .unwrap_or_default();
    }
    node.children_named(MEMBER)
        .map(|m| m.text().unwrap_or_default().to_owned())
        .collect()
}
