use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use crate::error::CoreError;
use crate::model::ObjectType;

use super::Schema;
use super::builtin;

static BUILTIN: LazyLock<Arc<SchemaRegistry>> =
    LazyLock::new(|| Arc::new(SchemaRegistry::builder().with_builtin().build()));

/// Immutable lookup table from object type to schema.
///
/// The built-in registry is created once and shared. Custom registries are
/// assembled with [`SchemaRegistry::builder`], typically starting from the
/// built-in tables and replacing or adding entries.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<ObjectType, Schema>,
}

impl SchemaRegistry {
    /// The process-wide built-in registry.
    pub fn builtin() -> Arc<SchemaRegistry> {
        Arc::clone(&BUILTIN)
    }

    pub fn builder() -> SchemaRegistryBuilder {
        SchemaRegistryBuilder::default()
    }

    pub fn schema_for(&self, object_type: ObjectType) -> Result<&Schema, CoreError> {
        self.schemas
            .get(&object_type)
            .ok_or_else(|| CoreError::UnknownObjectType {
                name: object_type.to_string(),
            })
    }

    /// Look up by name, accepting either `snake_case` or hyphenated spelling.
    pub fn lookup(&self, name: &str) -> Result<&Schema, CoreError> {
        let object_type: ObjectType = name.parse()?;
        self.schema_for(object_type)
    }

    /// Registered types in declaration order.
    pub fn object_types(&self) -> Vec<ObjectType> {
        let mut types: Vec<_> = self.schemas.keys().copied().collect();
        types.sort();
        types
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}

/// Assembles a [`SchemaRegistry`]. Later registrations replace earlier ones
/// for the same type.
#[derive(Debug, Default)]
pub struct SchemaRegistryBuilder {
    schemas: HashMap<ObjectType, Schema>,
}

impl SchemaRegistryBuilder {
    #[must_use]
    pub fn with_builtin(mut self) -> Self {
        for schema in builtin::schemas() {
            self.schemas.insert(schema.object_type, schema);
        }
        self
    }

    #[must_use]
    pub fn register(mut self, schema: Schema) -> Self {
        self.schemas.insert(schema.object_type, schema);
        self
    }

    pub fn build(self) -> SchemaRegistry {
        SchemaRegistry {
            schemas: self.schemas,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::schema::{Container, FieldKind, FieldSet};

    #[test]
    fn builtin_covers_every_type() {
        let registry = SchemaRegistry::builtin();
        assert_eq!(registry.object_types(), ObjectType::all().collect::<Vec<_>>());
    }

    #[test]
    fn lookup_by_name() {
        let registry = SchemaRegistry::builtin();
        let schema = registry.lookup("service-group").unwrap();
        assert_eq!(schema.object_type, ObjectType::ServiceGroup);

        let err = registry.lookup("ike-gateway").unwrap_err();
        assert!(matches!(err, CoreError::UnknownObjectType { .. }));
    }

    #[test]
    fn custom_registry_replaces_and_omits() {
        let tag = Schema::new(
            ObjectType::Tag,
            Container::Object("tag"),
            FieldSet::new().required("color", FieldKind::Color),
        );
        let registry = SchemaRegistry::builder().register(tag).build();

        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.schema_for(ObjectType::Tag).unwrap().requirement_count(),
            1
        );
        assert!(matches!(
            registry.schema_for(ObjectType::Address),
            Err(CoreError::UnknownObjectType { ref name }) if name == "address"
        ));
    }
}
