//! Input parsing and normalization
//!
//! Setters accept either native values or the string forms typed on a
//! command line: `"a b 'c d'"` for lists and `"k=v flag k2='x y'"` for
//! dicts. Everything here is used by [`crate::schema::validate`] and the
//! item-specific setters.

use crate::value::{Inheritable, Mapping, Value, INHERIT};
use crate::{Error, Result};
use regex::Regex;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::LazyLock;

static MAC_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i)([0-9a-f]{2}:){5}[0-9a-f]{2}$").expect("failed to compile MAC regex")
});

// InfiniBand hardware addresses are 20 octets long
static INFINIBAND_MAC_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i)([0-9a-f]{2}:){19}[0-9a-f]{2}$")
        .expect("failed to compile InfiniBand MAC regex")
});

static NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9_\-.:+]+$").expect("failed to compile name regex")
});

/// Split a string into words using POSIX shell quoting rules
pub fn split_shell(field: &str, input: &str) -> Result<Vec<String>> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut chars = input.chars();

    while let Some(c) = chars.next() {
        match c {
            '\'' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('\'') => break,
                        Some(c) => current.push(c),
                        None => return Err(Error::invalid_field(field, "unterminated quote")),
                    }
                }
            }
            '"' => {
                in_word = true;
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => match chars.next() {
                            Some(c @ ('"' | '\\' | '$' | '`')) => current.push(c),
                            Some(c) => {
                                current.push('\\');
                                current.push(c);
                            }
                            None => {
                                return Err(Error::invalid_field(field, "unterminated quote"))
                            }
                        },
                        Some(c) => current.push(c),
                        None => return Err(Error::invalid_field(field, "unterminated quote")),
                    }
                }
            }
            '\\' => {
                in_word = true;
                match chars.next() {
                    Some(c) => current.push(c),
                    None => return Err(Error::invalid_field(field, "trailing escape")),
                }
            }
            c if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            c => {
                in_word = true;
                current.push(c);
            }
        }
    }

    if in_word {
        words.push(current);
    }

    Ok(words)
}

/// Parse list input: a native list, or a shell-quoted string of words
///
/// Empty input and the word `delete` both clear the list.
pub fn string_or_list(field: &str, raw: &Value) -> Result<Inheritable<Value>> {
    match raw {
        Value::Null => Ok(Inheritable::Value(Value::List(Vec::new()))),
        Value::List(items) => Ok(Inheritable::Value(Value::List(items.clone()))),
        Value::Str(s) if s == INHERIT => Ok(Inheritable::Inherit),
        Value::Str(s) if s.trim().is_empty() || s == "delete" => {
            Ok(Inheritable::Value(Value::List(Vec::new())))
        }
        Value::Str(s) => Ok(Inheritable::Value(Value::List(
            split_shell(field, s)?.into_iter().map(Value::Str).collect(),
        ))),
        other => Err(Error::invalid_field(
            field,
            format!("expected a list or a string, got '{}'", other),
        )),
    }
}

/// Parse dict input: a native dict, or `key=value` words
///
/// A word without `=` maps to null. With `allow_multiples`, a key given more
/// than once collects its values into a list; otherwise the last one wins.
pub fn string_or_dict(field: &str, raw: &Value, allow_multiples: bool) -> Result<Inheritable<Value>> {
    match raw {
        Value::Null => Ok(Inheritable::Value(Value::Dict(Mapping::new()))),
        Value::Dict(map) => Ok(Inheritable::Value(Value::Dict(map.clone()))),
        Value::Str(s) if s == INHERIT => Ok(Inheritable::Inherit),
        Value::Str(s) if s == "delete" => Ok(Inheritable::Value(Value::Dict(Mapping::new()))),
        Value::Str(s) => Ok(Inheritable::Value(Value::Dict(parse_pairs(
            field,
            s,
            allow_multiples,
        )?))),
        other => Err(Error::invalid_field(
            field,
            format!("expected a dict or a string, got '{}'", other),
        )),
    }
}

fn parse_pairs(field: &str, input: &str, allow_multiples: bool) -> Result<Mapping> {
    let mut map = Mapping::new();

    for word in split_shell(field, input)? {
        let (key, value) = match word.split_once('=') {
            Some((k, v)) => (k.to_string(), Value::Str(v.to_string())),
            None => (word, Value::Null),
        };
        if key.is_empty() {
            continue;
        }

        match map.get_mut(&key) {
            Some(Value::List(existing)) if allow_multiples => existing.push(value),
            Some(existing) if allow_multiples => {
                let first = std::mem::take(existing);
                *existing = Value::List(vec![first, value]);
            }
            _ => {
                map.insert(key, value);
            }
        }
    }

    Ok(map)
}

/// Interpret loosely-typed input as a boolean
pub fn input_boolean(raw: &Value) -> bool {
    match raw {
        Value::Bool(b) => *b,
        Value::Int(i) => *i != 0,
        Value::Str(s) => matches!(
            s.trim().to_lowercase().as_str(),
            "true" | "1" | "on" | "yes" | "y"
        ),
        _ => false,
    }
}

/// Whether the string looks like an Ethernet or InfiniBand hardware address
pub fn is_mac(s: &str) -> bool {
    MAC_REGEX.is_match(s) || INFINIBAND_MAC_REGEX.is_match(s)
}

/// Whether the string is an IPv4 or IPv6 address, with an optional prefix
pub fn is_ip(s: &str) -> bool {
    let addr = s.split_once('/').map_or(s, |(addr, _)| addr);
    addr.parse::<IpAddr>().is_ok()
}

/// Validate an object name
pub fn validate_name(field: &str, name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::invalid_field(field, "name must not be empty"));
    }
    if !NAME_REGEX.is_match(name) {
        return Err(Error::invalid_field(
            field,
            format!(
                "'{}' may only contain letters, digits and the characters _ - . : +",
                name
            ),
        ));
    }
    Ok(name.to_string())
}

/// Normalize a hardware address to lowercase; empty and `random` pass through
pub fn normalize_mac(field: &str, mac: &str) -> Result<String> {
    let mac = mac.trim().to_lowercase();
    if mac.is_empty() || mac == "random" || is_mac(&mac) {
        Ok(mac)
    } else {
        Err(Error::invalid_field(
            field,
            format!("'{}' is not a valid MAC address", mac),
        ))
    }
}

/// Validate an optional IPv4 address
pub fn validate_ipv4(field: &str, addr: &str) -> Result<String> {
    let addr = addr.trim();
    if addr.is_empty() || addr.parse::<Ipv4Addr>().is_ok() {
        Ok(addr.to_string())
    } else {
        Err(Error::invalid_field(
            field,
            format!("'{}' is not a valid IPv4 address", addr),
        ))
    }
}

/// Validate an optional IPv6 address
pub fn validate_ipv6(field: &str, addr: &str) -> Result<String> {
    let addr = addr.trim();
    if addr.is_empty() || addr.parse::<Ipv6Addr>().is_ok() {
        Ok(addr.to_string())
    } else {
        Err(Error::invalid_field(
            field,
            format!("'{}' is not a valid IPv6 address", addr),
        ))
    }
}

/// Validate an optional IPv4 netmask (contiguous ones followed by zeros)
pub fn validate_netmask(field: &str, mask: &str) -> Result<String> {
    let mask = mask.trim();
    if mask.is_empty() {
        return Ok(String::new());
    }
    match mask.parse::<Ipv4Addr>() {
        Ok(addr) => {
            let bits = u32::from(addr);
            if bits.leading_ones() + bits.trailing_zeros() == 32 {
                Ok(mask.to_string())
            } else {
                Err(Error::invalid_field(
                    field,
                    format!("'{}' is not a contiguous netmask", mask),
                ))
            }
        }
        Err(_) => Err(Error::invalid_field(
            field,
            format!("'{}' is not a valid netmask", mask),
        )),
    }
}

/// Parse `address/prefix` network notation
pub fn parse_cidr(cidr: &str) -> Option<(IpAddr, u8)> {
    let (addr, prefix) = cidr.trim().split_once('/')?;
    let addr: IpAddr = addr.parse().ok()?;
    let prefix: u8 = prefix.parse().ok()?;
    let max = if addr.is_ipv4() { 32 } else { 128 };
    (prefix <= max).then_some((addr, prefix))
}
