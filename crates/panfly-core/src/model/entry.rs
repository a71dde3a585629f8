use serde::{Deserialize, Serialize};

use super::{FieldValue, Fields, ObjectType};

/// A named configuration object: the unit that is validated, encoded and
/// written as one `<entry name="...">` element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub object_type: ObjectType,
    pub name: String,
    #[serde(default)]
    pub fields: Fields,
}

impl ConfigEntry {
    pub fn new(object_type: ObjectType, name: impl Into<String>) -> Self {
        Self {
            object_type,
            name: name.into(),
            fields: Fields::new(),
        }
    }

    /// Builder-style field insertion.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    pub fn field(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }
}
