//! Schema-driven configuration mapping between plain field mappings and a
//! firewall's XML configuration tree, plus the commit lifecycle.
//!
//! - **[`Device`]**: Facade over one firewall or Panorama:
//!   [`apply()`](Device::apply) validates, locates, encodes and sends an
//!   object; [`read()`](Device::read) and [`list()`](Device::list) decode
//!   objects back; [`commit_and_wait()`](Device::commit_and_wait) drives a
//!   commit job to completion. Clones share one connection pool.
//!
//! - **[`SchemaRegistry`]**: Declarative field rules, aliases and
//!   locations for every [`ObjectType`]. The built-in registry is shared;
//!   custom registries start from it.
//!
//! - **[`Validator`]**: Normalizes spellings and reports every problem in
//!   a [`ValidationResult`] before anything reaches the network.
//!
//! - **[`codec`]**: `<entry name="...">` encoding and schema-aware decoding.
//!
//! - **[`PathResolver`]**: Xpaths for a [`DeviceContext`] (firewall vsys,
//!   Panorama shared scope, device group or template), with a concurrent
//!   cache of path skeletons.
//!
//! - **[`CommitEngine`]**: Commit submission and bounded job polling with
//!   memoized terminal states.

pub mod codec;
pub mod commit;
pub mod config;
pub mod context;
pub mod device;
pub mod error;
pub mod model;
pub mod path;
pub mod schema;
pub mod validate;

// ── Primary re-exports ──────────────────────────────────────────────
pub use codec::{Codec, XmlFragment};
pub use commit::{CommitEngine, JobReport};
pub use config::{DeviceConfig, PollSettings, RetrySettings, TlsVerification};
pub use context::{DeviceContext, DeviceKind, PanoramaScope, Rulebase};
pub use device::Device;
pub use error::CoreError;
pub use model::{ConfigEntry, FieldValue, Fields, ObjectType, ValidationResult};
pub use path::{LocationPath, PathResolver};
pub use schema::{Schema, SchemaRegistry};
pub use validate::{PortSpec, Validator, parse_port_spec, validate};

// Job types come from the transport layer unchanged.
pub use panfly_api::{CommitOutcome, JobId, JobStatus};
