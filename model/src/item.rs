//! Provisioning objects
//!
//! One [`Item`] struct covers every object type; the [`ItemType`]
//! discriminant selects its field table in [`crate::schema`]. Parent links
//! are plain names stored in fields (`distro`, `parent`, `profile`,
//! `image`); the cross-collection index that follows them lives in
//! [`crate::Inventory`].

use crate::convert;
use crate::interface::{self, Interface};
use crate::schema::{self, FieldKind};
use crate::value::{Inheritable, Mapping, Value, INHERIT};
use crate::{Error, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Kind of provisioning object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    Distro,
    Profile,
    System,
    Repo,
    Image,
    Network,
}

impl ItemType {
    /// Every item type
    pub const ALL: [ItemType; 6] = [
        ItemType::Distro,
        ItemType::Profile,
        ItemType::System,
        ItemType::Repo,
        ItemType::Image,
        ItemType::Network,
    ];
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemType::Distro => write!(f, "distro"),
            ItemType::Profile => write!(f, "profile"),
            ItemType::System => write!(f, "system"),
            ItemType::Repo => write!(f, "repo"),
            ItemType::Image => write!(f, "image"),
            ItemType::Network => write!(f, "network"),
        }
    }
}

impl FromStr for ItemType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "distro" => Ok(ItemType::Distro),
            "profile" => Ok(ItemType::Profile),
            "system" => Ok(ItemType::System),
            "repo" => Ok(ItemType::Repo),
            "image" => Ok(ItemType::Image),
            "network" => Ok(ItemType::Network),
            other => Err(Error::UnknownType(other.to_string())),
        }
    }
}

/// Type and name of an item; the identity used by the tree index
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemRef {
    pub kind: ItemType,
    pub name: String,
}

impl ItemRef {
    pub fn new(kind: ItemType, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.kind, self.name)
    }
}

/// A provisioning object
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    kind: ItemType,
    name: String,
    uid: String,
    ctime: f64,
    mtime: f64,
    depth: u32,
    is_subobject: bool,
    fields: IndexMap<&'static str, Inheritable<Value>>,
    interfaces: BTreeMap<String, Interface>,
}

impl Item {
    /// Create an item with every field at its default
    ///
    /// `settings` is the resolved settings mapping that settings-backed
    /// defaults read from.
    pub fn new(kind: ItemType, settings: &Mapping) -> Self {
        let mut item = Self {
            kind,
            name: String::new(),
            uid: String::new(),
            ctime: 0.0,
            mtime: 0.0,
            depth: 0,
            is_subobject: false,
            fields: IndexMap::new(),
            interfaces: BTreeMap::new(),
        };
        item.clear(false, settings);
        item
    }

    /// Create a sub-profile: a Profile whose fields inherit by default
    pub fn new_subprofile(settings: &Mapping) -> Self {
        let mut item = Self::new(ItemType::Profile, settings);
        item.clear(true, settings);
        item
    }

    /// Reset every field to its schema default
    ///
    /// Identity (name, uid, ctime) survives; parent links and interfaces
    /// do not.
    pub fn clear(&mut self, is_subobject: bool, settings: &Mapping) {
        self.is_subobject = is_subobject;
        self.depth = 0;
        self.interfaces.clear();
        self.fields = schema::defaults(self.kind, is_subobject, settings)
            .into_iter()
            .filter(|(name, _)| !schema::IDENTITY_FIELDS.contains(name))
            .collect();
    }

    pub fn kind(&self) -> ItemType {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }

    pub fn ctime(&self) -> f64 {
        self.ctime
    }

    pub fn mtime(&self) -> f64 {
        self.mtime
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn is_subobject(&self) -> bool {
        self.is_subobject
    }

    /// Type and name of this item
    pub fn item_ref(&self) -> ItemRef {
        ItemRef::new(self.kind, self.name.clone())
    }

    /// Stored value of a field (legacy spellings accepted)
    pub fn get(&self, field: &str) -> Option<&Inheritable<Value>> {
        self.fields.get(schema::canonical_name(field))
    }

    /// Concrete string value of a field; empty, inheriting and non-string
    /// fields give `None`
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field)
            .and_then(Inheritable::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Interfaces by name (System only)
    pub fn interfaces(&self) -> &BTreeMap<String, Interface> {
        &self.interfaces
    }

    /// One interface by name
    pub fn interface(&self, name: &str) -> Option<&Interface> {
        self.interfaces.get(name)
    }

    pub(crate) fn set_depth(&mut self, depth: u32) {
        self.depth = depth;
    }

    pub(crate) fn set_identity(&mut self, uid: String, ctime: f64) {
        self.uid = uid;
        self.ctime = ctime;
    }

    pub(crate) fn touch(&mut self, mtime: f64) {
        self.mtime = mtime;
    }

    /// Write a pointer field without validation; used by rename fix-ups
    pub(crate) fn set_raw(&mut self, field: &'static str, value: Value) {
        self.fields.insert(field, Inheritable::Value(value));
    }

    pub(crate) fn interfaces_mut(&mut self) -> impl Iterator<Item = &mut Interface> {
        self.interfaces.values_mut()
    }

    /// Validate and set a field
    ///
    /// On a System, interface field names go to the only interface (or a
    /// new `default` one when there are none).
    pub fn set_field(&mut self, field: &str, raw: impl Into<Value>) -> Result<()> {
        let raw = raw.into();
        let field = schema::canonical_name(field);

        if self.kind == ItemType::System
            && schema::descriptor(self.kind, field).is_none()
            && interface::is_interface_field(field)
        {
            let ifname = match self.interfaces.len() {
                0 => "default".to_string(),
                1 => self.interfaces.keys().next().cloned().unwrap_or_default(),
                _ => {
                    return Err(Error::invalid_field(
                        field,
                        "system has several interfaces; name one explicitly",
                    ))
                }
            };
            return self.set_interface_field(&ifname, field, raw);
        }

        let descriptor = schema::descriptor(self.kind, field)
            .ok_or_else(|| Error::invalid_field(field, format!("{} has no such field", self.kind)))?;
        if !descriptor.editable {
            return Err(Error::invalid_field(field, "field is read-only"));
        }

        if field == "name" {
            return self.set_name(&raw.to_string());
        }

        let value = schema::validate_with(descriptor, &raw)?;
        let value = self.normalize(descriptor.name, value)?;

        match (self.kind, descriptor.name) {
            (ItemType::System, "profile") if value.as_str().is_some_and(|s| !s.is_empty()) => {
                self.fields
                    .insert("image", Inheritable::Value(Value::from("")));
            }
            (ItemType::System, "image") if value.as_str().is_some_and(|s| !s.is_empty()) => {
                self.fields
                    .insert("profile", Inheritable::Value(Value::from("")));
            }
            (ItemType::Repo, "mirror") => {
                if let Some(mirror) = value.as_str() {
                    self.guess_repo_details(mirror.to_string());
                }
            }
            _ => {}
        }

        self.fields.insert(descriptor.name, value);
        Ok(())
    }

    /// Type-specific checks after schema validation
    fn normalize(&self, field: &str, value: Inheritable<Value>) -> Result<Inheritable<Value>> {
        let Inheritable::Value(Value::Str(s)) = &value else {
            return Ok(value);
        };
        if s.is_empty() {
            return Ok(value);
        }

        match (self.kind, field) {
            (ItemType::Profile, "parent") if *s == self.name => {
                Err(Error::SelfParent(self.name.clone()))
            }
            (_, "parent" | "distro" | "profile" | "image") => {
                convert::validate_name(field, s).map(|n| Inheritable::Value(Value::Str(n)))
            }
            (ItemType::System | ItemType::Network, "gateway") => {
                convert::validate_ipv4(field, s).map(|g| Inheritable::Value(Value::Str(g)))
            }
            (ItemType::Network, "cidr") => match convert::parse_cidr(s) {
                Some(_) => Ok(value),
                None => Err(Error::invalid_field(
                    field,
                    format!("'{}' is not in address/prefix form", s),
                )),
            },
            _ => Ok(value),
        }
    }

    fn set_name(&mut self, raw: &str) -> Result<()> {
        let name = convert::validate_name("name", raw)?;

        if self.kind == ItemType::Profile && self.get_str("parent") == Some(name.as_str()) {
            return Err(Error::SelfParent(name));
        }

        if self.kind == ItemType::System {
            let is_mac = convert::is_mac(&name);
            let is_ip = !is_mac && convert::is_ip(&name);
            if is_mac || is_ip {
                let eth0 = self.interfaces.entry("eth0".to_string()).or_default();
                if is_mac && eth0.mac_address.is_empty() {
                    eth0.mac_address = name.to_lowercase();
                } else if is_ip && eth0.ip_address.is_empty() {
                    eth0.ip_address = name.clone();
                }
            }
        }

        self.name = name;
        Ok(())
    }

    fn guess_repo_details(&mut self, mirror: String) {
        if self.get_str("arch").is_none() {
            let arch = ["x86_64", "i386", "ia64", "s390x"]
                .into_iter()
                .find(|arch| mirror.contains(arch))
                .or_else(|| mirror.contains("i686").then_some("i386"));
            if let Some(arch) = arch {
                self.set_raw("arch", Value::from(arch));
            }
        }

        if self.get_str("breed").is_none() && !mirror.is_empty() {
            let breed = if mirror.starts_with("http://")
                || mirror.starts_with("https://")
                || mirror.starts_with("ftp://")
            {
                "yum"
            } else if mirror.starts_with("rhn://") {
                "rhn"
            } else {
                "rsync"
            };
            self.set_raw("breed", Value::from(breed));
        }
    }

    /// Merge `key=value` pairs into a dict field; `~key` deletes `key`
    pub fn set_field_inplace(&mut self, field: &str, raw: impl Into<Value>) -> Result<()> {
        let field = schema::canonical_name(field);
        let descriptor = schema::descriptor(self.kind, field)
            .ok_or_else(|| Error::invalid_field(field, format!("{} has no such field", self.kind)))?;
        if descriptor.kind != FieldKind::Dict {
            return Err(Error::invalid_field(field, "in-place edits need a dict field"));
        }

        let changes = match convert::string_or_dict(field, &raw.into(), false)? {
            Inheritable::Value(Value::Dict(map)) => map,
            _ => return Err(Error::invalid_field(field, "expected key=value pairs")),
        };

        let mut current = self
            .fields
            .get(descriptor.name)
            .and_then(Inheritable::value)
            .and_then(Value::as_dict)
            .cloned()
            .unwrap_or_default();

        for (key, value) in changes {
            match key.strip_prefix('~') {
                Some(removed) => {
                    current.shift_remove(removed);
                }
                None => {
                    current.insert(key, value);
                }
            }
        }

        self.fields
            .insert(descriptor.name, Inheritable::Value(Value::Dict(current)));
        Ok(())
    }

    /// Set a field of a named interface, creating the interface on first use
    pub fn set_interface_field(
        &mut self,
        ifname: &str,
        field: &str,
        raw: impl Into<Value>,
    ) -> Result<()> {
        if self.kind != ItemType::System {
            return Err(Error::invalid_field(field, format!("{} has no interfaces", self.kind)));
        }
        let ifname = convert::validate_name("interface", ifname)?;

        // validate against a copy so a rejected value leaves nothing behind
        let mut iface = self.interfaces.get(&ifname).cloned().unwrap_or_default();
        iface.set(field, &raw.into())?;
        self.interfaces.insert(ifname, iface);
        Ok(())
    }

    /// Rename an interface, keeping its settings
    pub fn rename_interface(&mut self, old: &str, new: &str) -> Result<()> {
        let new = convert::validate_name("interface", new)?;
        if self.interfaces.contains_key(&new) {
            return Err(Error::invalid_field(
                "interface",
                format!("interface '{}' already exists", new),
            ));
        }
        let iface = self.interfaces.remove(old).ok_or_else(|| {
            Error::invalid_field("interface", format!("interface '{}' does not exist", old))
        })?;
        self.interfaces.insert(new, iface);
        Ok(())
    }

    /// Delete an interface; a system keeps at least one
    pub fn delete_interface(&mut self, name: &str) -> Result<()> {
        if !self.interfaces.contains_key(name) {
            return Err(Error::invalid_field(
                "interface",
                format!("interface '{}' does not exist", name),
            ));
        }
        if self.interfaces.len() == 1 {
            return Err(Error::invalid_field(
                "interface",
                "at least one interface needs to be defined",
            ));
        }
        self.interfaces.remove(name);
        Ok(())
    }

    /// Check every criterion against this item
    ///
    /// A `~` prefix on the expected value negates the criterion. Strings
    /// compare as case-insensitive shell globs, lists by containment,
    /// dicts by `key=value` containment and bools by loose coercion. On a
    /// System an interface field matches when any interface matches.
    pub fn find_match(&self, criteria: &[(&str, &str)]) -> Result<bool> {
        for (key, expected) in criteria {
            let (negate, expected) = match expected.strip_prefix('~') {
                Some(rest) => (true, rest),
                None => (false, *expected),
            };
            let key = schema::search_key(key);

            let matched = match self.lookup(&key) {
                Some(actual) => value_matches(&key, &actual, expected)?,
                None if self.kind == ItemType::System && interface::is_interface_field(&key) => {
                    let mut any = false;
                    for iface in self.interfaces.values() {
                        if let Some(actual) = iface.get(&key) {
                            if value_matches(&key, &actual, expected)? {
                                any = true;
                                break;
                            }
                        }
                    }
                    any
                }
                None => {
                    return Err(Error::invalid_field(
                        key,
                        format!("searching for a field {} does not have", self.kind),
                    ))
                }
            };

            if matched == negate {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn lookup(&self, key: &str) -> Option<Value> {
        match key {
            "name" => Some(Value::from(self.name.as_str())),
            "uid" => Some(Value::from(self.uid.as_str())),
            "ctime" => Some(Value::Float(self.ctime)),
            "mtime" => Some(Value::Float(self.mtime)),
            "depth" => Some(Value::Int(i64::from(self.depth))),
            _ => self.fields.get(key).map(|slot| match slot {
                Inheritable::Inherit => Value::from(INHERIT),
                Inheritable::Value(v) => v.clone(),
            }),
        }
    }

    /// Stored state as a mapping; inheriting fields keep their marker
    pub fn to_dict(&self) -> IndexMap<String, Inheritable<Value>> {
        let mut dict = IndexMap::new();
        dict.insert("name".to_string(), Inheritable::Value(Value::from(self.name.as_str())));
        dict.insert("uid".to_string(), Inheritable::Value(Value::from(self.uid.as_str())));
        dict.insert("ctime".to_string(), Inheritable::Value(Value::Float(self.ctime)));
        dict.insert("mtime".to_string(), Inheritable::Value(Value::Float(self.mtime)));
        dict.insert(
            "depth".to_string(),
            Inheritable::Value(Value::Int(i64::from(self.depth))),
        );
        for (field, value) in &self.fields {
            dict.insert(field.to_string(), value.clone());
        }
        if self.kind == ItemType::System {
            let interfaces = self
                .interfaces
                .iter()
                .map(|(name, iface)| (name.clone(), Value::Dict(iface.to_map())))
                .collect();
            dict.insert("interfaces".to_string(), Inheritable::Value(Value::Dict(interfaces)));
        }
        dict
    }

    /// Intrinsic validity checks run before an item joins an inventory
    pub fn check_valid(&self) -> Result<()> {
        let invalid = |reason: &str| Error::Invalid {
            kind: self.kind,
            name: self.name.clone(),
            reason: reason.to_string(),
        };

        if self.name.is_empty() {
            return Err(invalid("name is required"));
        }

        match self.kind {
            ItemType::Distro => {
                if self.get_str("kernel").is_none() {
                    return Err(invalid("kernel is required"));
                }
                if self.get_str("initrd").is_none() {
                    return Err(invalid("initrd is required"));
                }
            }
            ItemType::Profile => {
                if self.is_subobject && self.get_str("parent").is_none() {
                    return Err(invalid("sub-profile has no parent"));
                }
                if self.get_str("parent").is_none() && self.get_str("distro").is_none() {
                    return Err(invalid("profile needs a distro or a parent"));
                }
            }
            ItemType::System => {
                if self.get_str("profile").is_none() && self.get_str("image").is_none() {
                    return Err(invalid("system needs a profile or an image"));
                }
            }
            ItemType::Repo => {
                if self.get_str("mirror").is_none() {
                    return Err(invalid("mirror is required"));
                }
            }
            ItemType::Network => {
                if self.get_str("cidr").is_none() {
                    return Err(invalid("cidr is required"));
                }
            }
            ItemType::Image => {}
        }

        Ok(())
    }
}

fn value_matches(key: &str, actual: &Value, expected: &str) -> Result<bool> {
    Ok(match actual {
        Value::Str(s) => glob_match(expected, s),
        Value::Null => expected.is_empty(),
        Value::Bool(b) => convert::input_boolean(&Value::from(expected)) == *b,
        Value::Int(_) | Value::Float(_) => glob_match(expected, &actual.to_string()),
        Value::List(items) => match convert::string_or_list(key, &Value::from(expected))? {
            Inheritable::Value(Value::List(wanted)) => wanted
                .iter()
                .all(|w| items.iter().any(|i| i.to_string() == w.to_string())),
            _ => false,
        },
        Value::Dict(map) => match convert::string_or_dict(key, &Value::from(expected), false)? {
            Inheritable::Value(Value::Dict(wanted)) => wanted.iter().all(|(k, v)| {
                map.get(k)
                    .is_some_and(|actual| actual.to_string() == v.to_string())
            }),
            _ => false,
        },
    })
}

/// Case-insensitive shell-glob comparison; malformed patterns compare literally
fn glob_match(pattern: &str, value: &str) -> bool {
    let options = glob::MatchOptions {
        case_sensitive: false,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };
    match glob::Pattern::new(pattern) {
        Ok(p) => p.matches_with(value, options),
        Err(_) => pattern.eq_ignore_ascii_case(value),
    }
}
