use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::error::CoreError;

/// Every configuration object kind the crate can map.
///
/// Names render in `snake_case`. Parsing also accepts the device's
/// hyphenated spelling (`address-group`) and is case-insensitive.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ObjectType {
    Address,
    AddressGroup,
    Service,
    ServiceGroup,
    SecurityPolicy,
    NatPolicy,
    Tag,
    Zone,
}

impl ObjectType {
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// All object types in declaration order.
    pub fn all() -> impl Iterator<Item = Self> {
        Self::iter()
    }

    /// Rule types live in a rulebase rather than an object container.
    pub fn is_policy(self) -> bool {
        matches!(self, Self::SecurityPolicy | Self::NatPolicy)
    }
}

impl FromStr for ObjectType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Self::iter()
            .find(|ot| ot.as_str() == wanted)
            .ok_or_else(|| CoreError::UnknownObjectType { name: s.to_owned() })
    }
}
