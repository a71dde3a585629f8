// Format checks for individual values.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::LazyLock;

use regex::Regex;

use crate::schema::FieldKind;

use super::ports::parse_port_spec;

/// Longest entry name the device accepts.
pub const MAX_NAME_LEN: usize = 63;
const MAX_FQDN_LEN: usize = 255;
const MAX_COLOR: u8 = 42;

static FQDN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\*\.)?([A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.)*[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?\.?$")
        .expect("FQDN pattern compiles")
});

static OBJECT_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._ -]*$").expect("object name pattern compiles")
});

/// Check a text value against a scalar field kind.
pub fn check_scalar(kind: &FieldKind, value: &str) -> Result<(), String> {
    match kind {
        FieldKind::Text { max_len } => check_text(value, *max_len),
        FieldKind::IpNetmask => check_ip_netmask(value),
        FieldKind::IpRange => check_ip_range(value),
        FieldKind::IpWildcard => check_ip_wildcard(value),
        FieldKind::Fqdn => check_fqdn(value),
        FieldKind::AddressRef => check_address_ref(value),
        FieldKind::PortSpec => parse_port_spec(value).map(|_| ()),
        FieldKind::Choice(options) => check_choice(value, options),
        FieldKind::YesNo => check_choice(value, &["yes", "no"]),
        FieldKind::Color => check_color(value),
        FieldKind::Members { .. } => Err("expected a list".into()),
        FieldKind::Nested(_) => Err("expected a mapping".into()),
    }
}

pub fn check_text(value: &str, max_len: usize) -> Result<(), String> {
    let len = value.chars().count();
    if len > max_len {
        return Err(format!("{len} characters exceeds the limit of {max_len}"));
    }
    Ok(())
}

/// An address with optional prefix length: `10.0.0.1`, `10.0.0.0/24`,
/// `2001:db8::/32`.
pub fn check_ip_netmask(value: &str) -> Result<(), String> {
    let (addr, prefix) = match value.split_once('/') {
        Some((addr, prefix)) => (addr, Some(prefix)),
        None => (value, None),
    };
    let ip: IpAddr = addr
        .parse()
        .map_err(|_| format!("'{addr}' is not an IP address"))?;
    if let Some(prefix) = prefix {
        let max = if ip.is_ipv4() { 32 } else { 128 };
        match prefix.parse::<u8>() {
            Ok(len) if len <= max => {}
            _ => return Err(format!("'{prefix}' is not a prefix length between 0 and {max}")),
        }
    }
    Ok(())
}

pub fn check_ip_range(value: &str) -> Result<(), String> {
    let Some((start, end)) = value.split_once('-') else {
        return Err(format!("'{value}' is not a range of the form start-end"));
    };
    let start: IpAddr = start
        .trim()
        .parse()
        .map_err(|_| format!("'{start}' is not an IP address"))?;
    let end: IpAddr = end
        .trim()
        .parse()
        .map_err(|_| format!("'{end}' is not an IP address"))?;
    if start.is_ipv4() != end.is_ipv4() {
        return Err("range mixes IPv4 and IPv6 addresses".into());
    }
    if start > end {
        return Err(format!("range start {start} is after end {end}"));
    }
    Ok(())
}

pub fn check_ip_wildcard(value: &str) -> Result<(), String> {
    let Some((addr, mask)) = value.split_once('/') else {
        return Err(format!("'{value}' is not of the form address/wildcard-mask"));
    };
    addr.parse::<Ipv4Addr>()
        .map_err(|_| format!("'{addr}' is not an IPv4 address"))?;
    mask.parse::<Ipv4Addr>()
        .map_err(|_| format!("'{mask}' is not a dotted wildcard mask"))?;
    Ok(())
}

pub fn check_fqdn(value: &str) -> Result<(), String> {
    if value.len() > MAX_FQDN_LEN {
        return Err(format!("FQDN exceeds {MAX_FQDN_LEN} characters"));
    }
    if !FQDN.is_match(value) {
        return Err(format!("'{value}' is not a valid FQDN"));
    }
    Ok(())
}

/// An IP or CIDR literal, or the name of an address object.
pub fn check_address_ref(value: &str) -> Result<(), String> {
    if check_ip_netmask(value).is_ok() {
        return Ok(());
    }
    check_object_name(value)
}

pub fn check_object_name(value: &str) -> Result<(), String> {
    if value.chars().count() > MAX_NAME_LEN {
        return Err(format!("'{value}' exceeds {MAX_NAME_LEN} characters"));
    }
    if !OBJECT_NAME.is_match(value) {
        return Err(format!("'{value}' is not a valid object name"));
    }
    Ok(())
}

fn check_choice(value: &str, options: &[&str]) -> Result<(), String> {
    if options.contains(&value) {
        Ok(())
    } else {
        Err(format!("'{value}' is not one of: {}", options.join(", ")))
    }
}

fn check_color(value: &str) -> Result<(), String> {
    let valid = value
        .strip_prefix("color")
        .and_then(|n| n.parse::<u8>().ok())
        .is_some_and(|n| (1..=MAX_COLOR).contains(&n));
    if valid {
        Ok(())
    } else {
        Err(format!("'{value}' is not a color (color1 through color{MAX_COLOR})"))
    }
}

/// A `<member>` list: no blank items, and `any` only on its own.
pub fn check_members(items: &[String], allow_empty: bool) -> Result<(), String> {
    if items.is_empty() && !allow_empty {
        return Err("list must not be empty".into());
    }
    if items.iter().any(|m| m.trim().is_empty()) {
        return Err("list contains a blank member".into());
    }
    if items.len() > 1 && items.iter().any(|m| m == "any") {
        return Err("'any' cannot be combined with other members".into());
    }
    Ok(())
}

/// Entry names: non-empty, at most 63 characters, no control characters,
/// no surrounding whitespace.
pub fn check_entry_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("name is empty".into());
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(format!("name exceeds {MAX_NAME_LEN} characters"));
    }
    if name.chars().any(char::is_control) {
        return Err("name contains control characters".into());
    }
    if name.trim() != name {
        return Err("name has leading or trailing whitespace".into());
    }
    Ok(())
}
