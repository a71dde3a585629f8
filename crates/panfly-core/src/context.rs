// ── Device context ──
//
// Which configuration tree an operation targets. A standalone firewall
// addresses one vsys; a manager (Panorama) addresses its shared tree, a
// device group's rulebases, or a template's embedded device config.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CoreError;

pub const DEFAULT_VSYS: &str = "vsys1";

/// Kind of device a connection talks to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DeviceKind {
    #[default]
    Firewall,
    Panorama,
}

impl FromStr for DeviceKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firewall" | "ngfw" => Ok(Self::Firewall),
            "panorama" | "manager" => Ok(Self::Panorama),
            other => Err(CoreError::InvalidContext {
                reason: format!("unknown device kind '{other}'"),
            }),
        }
    }
}

/// Which of a device group's two rulebases rules go into.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rulebase {
    #[default]
    Pre,
    Post,
}

impl Rulebase {
    pub fn element(self) -> &'static str {
        match self {
            Self::Pre => "pre-rulebase",
            Self::Post => "post-rulebase",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanoramaScope {
    Shared { rulebase: Rulebase },
    DeviceGroup { name: String, rulebase: Rulebase },
    Template { name: String },
}

/// Target configuration tree for one operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceContext {
    /// `vsys: None` means the connection's default vsys.
    Firewall { vsys: Option<String> },
    Panorama(PanoramaScope),
}

impl Default for DeviceContext {
    fn default() -> Self {
        Self::firewall()
    }
}

impl DeviceContext {
    pub fn firewall() -> Self {
        Self::Firewall { vsys: None }
    }

    pub fn vsys(vsys: impl Into<String>) -> Self {
        Self::Firewall {
            vsys: Some(vsys.into()),
        }
    }

    pub fn shared() -> Self {
        Self::Panorama(PanoramaScope::Shared {
            rulebase: Rulebase::Pre,
        })
    }

    pub fn device_group(name: impl Into<String>) -> Self {
        Self::Panorama(PanoramaScope::DeviceGroup {
            name: name.into(),
            rulebase: Rulebase::Pre,
        })
    }

    pub fn template(name: impl Into<String>) -> Self {
        Self::Panorama(PanoramaScope::Template { name: name.into() })
    }

    /// Target the post-rulebase. No effect outside shared and device-group
    /// scopes.
    #[must_use]
    pub fn with_rulebase(mut self, rulebase: Rulebase) -> Self {
        if let Self::Panorama(
            PanoramaScope::Shared { rulebase: rb } | PanoramaScope::DeviceGroup { rulebase: rb, .. },
        ) = &mut self
        {
            *rb = rulebase;
        }
        self
    }

    pub fn kind(&self) -> DeviceKind {
        match self {
            Self::Firewall { .. } => DeviceKind::Firewall,
            Self::Panorama(_) => DeviceKind::Panorama,
        }
    }

    /// Build a context from loose selectors, as given by configuration or a
    /// caller's request. Blank selectors count as absent.
    ///
    /// A firewall accepts only `vsys`. A manager accepts a device group or
    /// a template, never both; neither selects the shared scope. `vsys` is
    /// ignored on a manager.
    pub fn from_selectors(
        kind: DeviceKind,
        vsys: Option<&str>,
        device_group: Option<&str>,
        template: Option<&str>,
    ) -> Result<Self, CoreError> {
        fn present(selector: Option<&str>) -> Option<&str> {
            selector.map(str::trim).filter(|s| !s.is_empty())
        }
        let (vsys, device_group, template) =
            (present(vsys), present(device_group), present(template));

        match kind {
            DeviceKind::Firewall => {
                if device_group.is_some() || template.is_some() {
                    return Err(CoreError::InvalidContext {
                        reason: "device-group and template selectors require a Panorama device"
                            .into(),
                    });
                }
                Ok(Self::Firewall {
                    vsys: vsys.map(String::from),
                })
            }
            DeviceKind::Panorama => {
                if let Some(vsys) = vsys {
                    debug!(vsys, "vsys selector ignored on Panorama");
                }
                match (device_group, template) {
                    (Some(_), Some(_)) => Err(CoreError::InvalidContext {
                        reason: "device-group and template selectors are mutually exclusive"
                            .into(),
                    }),
                    (Some(dg), None) => Ok(Self::device_group(dg)),
                    (None, Some(t)) => Ok(Self::template(t)),
                    (None, None) => Ok(Self::shared()),
                }
            }
        }
    }
}

impl fmt::Display for DeviceContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Firewall { vsys: Some(vsys) } => write!(f, "firewall vsys {vsys}"),
            Self::Firewall { vsys: None } => f.write_str("firewall default vsys"),
            Self::Panorama(PanoramaScope::Shared { .. }) => f.write_str("Panorama shared"),
            Self::Panorama(PanoramaScope::DeviceGroup { name, .. }) => {
                write!(f, "Panorama device group {name}")
            }
            Self::Panorama(PanoramaScope::Template { name }) => write!(f, "Panorama template {name}"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn firewall_selectors() {
        assert_eq!(
            DeviceContext::from_selectors(DeviceKind::Firewall, Some("vsys2"), None, None).unwrap(),
            DeviceContext::vsys("vsys2")
        );
        assert_eq!(
            DeviceContext::from_selectors(DeviceKind::Firewall, Some("  "), None, None).unwrap(),
            DeviceContext::firewall()
        );
        assert!(matches!(
            DeviceContext::from_selectors(DeviceKind::Firewall, None, Some("dg1"), None),
            Err(CoreError::InvalidContext { .. })
        ));
    }

    #[test]
    fn panorama_selectors() {
        assert_eq!(
            DeviceContext::from_selectors(DeviceKind::Panorama, None, None, None).unwrap(),
            DeviceContext::shared()
        );
        assert_eq!(
            DeviceContext::from_selectors(DeviceKind::Panorama, Some("vsys1"), Some("dg1"), None)
                .unwrap(),
            DeviceContext::device_group("dg1")
        );
        assert_eq!(
            DeviceContext::from_selectors(DeviceKind::Panorama, None, None, Some("tpl")).unwrap(),
            DeviceContext::template("tpl")
        );
        assert_eq!(
            DeviceContext::from_selectors(DeviceKind::Panorama, None, Some(" dg1 "), Some(""))
                .unwrap(),
            DeviceContext::device_group("dg1")
        );
    }

    #[test]
    fn panorama_rejects_both_selectors() {
        let err =
            DeviceContext::from_selectors(DeviceKind::Panorama, None, Some("dg1"), Some("tpl"))
                .unwrap_err();
        assert!(err.to_string().contains("mutually exclusive"), "{err}");
    }

    #[test]
    fn post_rulebase() {
        let ctx = DeviceContext::device_group("dg1").with_rulebase(Rulebase::Post);
        assert_eq!(
            ctx,
            DeviceContext::Panorama(PanoramaScope::DeviceGroup {
                name: "dg1".into(),
                rulebase: Rulebase::Post,
            })
        );
        assert_eq!(
            DeviceContext::template("t").with_rulebase(Rulebase::Post),
            DeviceContext::template("t")
        );
    }

    #[test]
    fn device_kind_parse() {
        assert_eq!("Panorama".parse::<DeviceKind>().unwrap(), DeviceKind::Panorama);
        assert!("switch".parse::<DeviceKind>().is_err());
    }
}
