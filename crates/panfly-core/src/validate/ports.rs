use std::fmt;

use serde::{Deserialize, Serialize};

/// One element of a port list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PortSpec {
    Single(u16),
    /// Inclusive range, `start <= end`.
    Range(u16, u16),
}

impl PortSpec {
    pub fn contains(self, port: u16) -> bool {
        match self {
            Self::Single(p) => p == port,
            Self::Range(start, end) => (start..=end).contains(&port),
        }
    }
}

impl fmt::Display for PortSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(p) => write!(f, "{p}"),
            Self::Range(start, end) => write!(f, "{start}-{end}"),
        }
    }
}

/// Parse `80,443,8000-8010` into its parts.
///
/// Whitespace around elements is ignored. Ports are 1-65535; a range's
/// start must not exceed its end. Empty elements are rejected.
pub fn parse_port_spec(value: &str) -> Result<Vec<PortSpec>, String> {
    if value.trim().is_empty() {
        return Err("port list is empty".into());
    }
    value.split(',').map(|part| parse_element(part.trim())).collect()
}

fn parse_element(part: &str) -> Result<PortSpec, String> {
    if part.is_empty() {
        return Err("port list has an empty element".into());
    }
    match part.split_once('-') {
        Some((start, end)) => {
            let start = parse_port(start.trim())?;
            let end = parse_port(end.trim())?;
            if start > end {
                return Err(format!("port range {start}-{end} is reversed"));
            }
            Ok(PortSpec::Range(start, end))
        }
        None => parse_port(part).map(PortSpec::Single),
    }
}

fn parse_port(s: &str) -> Result<u16, String> {
    match s.parse::<u16>() {
        Ok(0) | Err(_) => Err(format!("'{s}' is not a port number between 1 and 65535")),
        Ok(port) => Ok(port),
    }
}
