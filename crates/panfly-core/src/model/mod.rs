// ── Domain model ──
//
// Plain data types shared by the schema, validator, codec and device
// facade. Nothing here talks to the network.

mod entry;
mod fields;
mod object_type;
mod validation;

pub use entry::ConfigEntry;
pub use fields::{FieldValue, Fields};
pub use object_type::ObjectType;
pub use validation::ValidationResult;
