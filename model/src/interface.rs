//! Network interfaces of a System

use crate::convert;
use crate::schema::{self, FieldKind};
use crate::value::{Inheritable, Mapping, Value};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Deprecated interface field spellings still accepted by setters
const INTERFACE_ALIASES: &[(&str, &str)] = &[
    ("bonding", "interface_type"),
    ("bonding_master", "interface_master"),
    ("subnet", "netmask"),
    ("mac", "mac_address"),
    ("ip", "ip_address"),
];

/// One network interface of a System
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Interface {
    pub cnames: Vec<String>,
    pub connected_mode: bool,
    pub dhcp_tag: String,
    pub dns_name: String,
    pub bonding_opts: String,
    pub bridge_opts: String,
    pub if_gateway: String,
    pub interface_master: String,
    pub interface_type: String,
    pub ip_address: String,
    pub ipv6_address: String,
    pub ipv6_default_gateway: String,
    pub ipv6_mtu: String,
    pub ipv6_prefix: String,
    pub ipv6_secondaries: Vec<String>,
    pub ipv6_static_routes: Vec<String>,
    pub mac_address: String,
    pub management: bool,
    pub mtu: String,
    pub netmask: String,
    #[serde(rename = "static")]
    pub is_static: bool,
    pub static_routes: Vec<String>,
    pub virt_bridge: String,
}

/// Map a possibly deprecated interface field name to its canonical name
pub fn canonical_field(field: &str) -> &str {
    INTERFACE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == field)
        .map_or(field, |(_, canonical)| *canonical)
}

/// Whether `field` names an interface field
pub fn is_interface_field(field: &str) -> bool {
    schema::interface_descriptor(canonical_field(field)).is_some()
}

impl Interface {
    /// Set one field from raw input
    pub fn set(&mut self, field: &str, raw: &Value) -> Result<()> {
        let field = canonical_field(field);
        let descriptor = schema::interface_descriptor(field)
            .ok_or_else(|| Error::invalid_field(field, "not an interface field"))?;

        let value = match schema::validate_with(descriptor, raw)? {
            Inheritable::Value(v) => v,
            Inheritable::Inherit => {
                return Err(Error::invalid_field(
                    field,
                    "interface fields cannot inherit",
                ))
            }
        };

        match descriptor.kind {
            FieldKind::List => {
                let items = value
                    .as_list()
                    .unwrap_or_default()
                    .iter()
                    .map(Value::to_string)
                    .collect();
                match field {
                    "cnames" => self.cnames = items,
                    "ipv6_secondaries" => self.ipv6_secondaries = items,
                    "ipv6_static_routes" => self.ipv6_static_routes = items,
                    _ => self.static_routes = items,
                }
            }
            FieldKind::Bool => {
                let flag = matches!(value, Value::Bool(true));
                match field {
                    "connected_mode" => self.connected_mode = flag,
                    "management" => self.management = flag,
                    _ => self.is_static = flag,
                }
            }
            _ => self.set_str(field, value.to_string())?,
        }

        Ok(())
    }

    fn set_str(&mut self, field: &str, value: String) -> Result<()> {
        match field {
            "mac_address" => self.mac_address = convert::normalize_mac(field, &value)?,
            "ip_address" => self.ip_address = validate_ip(field, &value)?,
            "if_gateway" => self.if_gateway = convert::validate_ipv4(field, &value)?,
            "netmask" => self.netmask = convert::validate_netmask(field, &value)?,
            "ipv6_address" => self.ipv6_address = convert::validate_ipv6(field, &value)?,
            "ipv6_default_gateway" => {
                self.ipv6_default_gateway = convert::validate_ipv6(field, &value)?
            }
            "interface_type" => self.interface_type = normalize_interface_type(&value),
            "dns_name" => self.dns_name = value,
            "dhcp_tag" => self.dhcp_tag = value,
            "bonding_opts" => self.bonding_opts = value,
            "bridge_opts" => self.bridge_opts = value,
            "interface_master" => self.interface_master = value,
            "ipv6_mtu" => self.ipv6_mtu = value,
            "ipv6_prefix" => self.ipv6_prefix = value,
            "mtu" => self.mtu = value,
            "virt_bridge" => self.virt_bridge = value,
            other => return Err(Error::invalid_field(other, "not an interface field")),
        }
        Ok(())
    }

    /// The fields as a mapping keyed by field name
    pub fn to_map(&self) -> Mapping {
        match serde_json::to_value(self) {
            Ok(json) => match Value::from(json) {
                Value::Dict(map) => map,
                _ => Mapping::new(),
            },
            Err(_) => Mapping::new(),
        }
    }

    /// Current value of one field
    pub fn get(&self, field: &str) -> Option<Value> {
        self.to_map().shift_remove(canonical_field(field))
    }

    /// Forget the addresses that must be unique per system
    pub fn clear_addresses(&mut self) {
        self.mac_address.clear();
        self.ip_address.clear();
        self.dns_name.clear();
    }
}

fn validate_ip(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() || convert::is_ip(value) {
        Ok(value.to_string())
    } else {
        Err(Error::invalid_field(
            field,
            format!("'{}' is not a valid IP address", value),
        ))
    }
}

fn normalize_interface_type(value: &str) -> String {
    match value {
        "na" => String::new(),
        "master" => "bond".to_string(),
        "slave" => "bond_slave".to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_set_and_normalize() {
        let mut iface = Interface::default();
        iface.set("mac_address", &Value::from("AA:BB:CC:DD:EE:FF")).unwrap();
        iface.set("ip_address", &Value::from("10.0.0.5")).unwrap();
        iface.set("subnet", &Value::from("255.255.255.0")).unwrap();
        iface.set("static", &Value::from("yes")).unwrap();
        iface.set("cnames", &Value::from("www ftp")).unwrap();

        assert_eq!(iface.mac_address, "aa:bb:cc:dd:ee:ff");
        assert_eq!(iface.ip_address, "10.0.0.5");
        assert_eq!(iface.netmask, "255.255.255.0");
        assert!(iface.is_static);
        assert_eq!(iface.cnames, vec!["www".to_string(), "ftp".to_string()]);
    }

    #[test]
    fn test_interface_type_aliases() {
        let mut iface = Interface::default();
        iface.set("bonding", &Value::from("master")).unwrap();
        assert_eq!(iface.interface_type, "bond");
        iface.set("interface_type", &Value::from("slave")).unwrap();
        assert_eq!(iface.interface_type, "bond_slave");
        iface.set("interface_type", &Value::from("na")).unwrap();
        assert_eq!(iface.interface_type, "");
        assert_matches!(
            iface.set("interface_type", &Value::from("token-ring")),
            Err(Error::InvalidField { .. })
        );
    }

    #[test]
    fn test_rejects_bad_addresses() {
        let mut iface = Interface::default();
        assert!(iface.set("mac_address", &Value::from("nope")).is_err());
        assert!(iface.set("ip_address", &Value::from("10.0.0.300")).is_err());
        assert!(iface.set("if_gateway", &Value::from("fe80::1")).is_err());
        assert!(iface.set("no_such_field", &Value::from("x")).is_err());
        assert_eq!(iface, Interface::default());
    }

    #[test]
    fn test_to_map_uses_field_names() {
        let mut iface = Interface::default();
        iface.set("static", &Value::Bool(true)).unwrap();
        let map = iface.to_map();
        assert_eq!(map["static"], Value::Bool(true));
        assert_eq!(map["mac_address"], Value::from(""));
        assert_eq!(map.len(), schema::INTERFACE_FIELDS.len());
        assert_eq!(iface.get("subnet"), Some(Value::from("")));
    }

    #[test]
    fn test_is_interface_field() {
        assert!(is_interface_field("mac"));
        assert!(is_interface_field("dns_name"));
        assert!(!is_interface_field("hostname"));
    }
}
