//! Blending: resolving an item against its ancestors
//!
//! The chain is walked settings first, then root ancestor to leaf. Each
//! node's fields are merged into one mapping:
//!
//! - an inheriting field keeps whatever an earlier node resolved, or falls
//!   back to settings and then the schema default
//! - dicts merge key by key, later nodes winning
//! - lists append, dropping repeats and keeping first occurrence order
//! - scalars are replaced, except `distro`, which the first node to set
//!   it keeps
//!
//! After every node, `!key` entries in the removable dict fields delete
//! themselves and `key`. Derived keys (per-interface fields, `repo_data`,
//! `http_server`, `children`, type aliases) are added last.

use crate::flatten;
use crate::item::{Item, ItemType};
use crate::schema;
use crate::value::{Inheritable, Mapping, Value};
use crate::{Error, Inventory, Result};
use tracing::debug;

/// Dict fields in which `!key` removes `key`
pub const REMOVABLE_DICTS: &[&str] = &[
    "kernel_options",
    "kernel_options_post",
    "autoinstall_meta",
    "template_files",
    "boot_files",
    "fetchable_files",
];

/// Resolve an item of `kind` named `name` into one mapping
///
/// With `flatten`, dict and list fields consumed as command-line strings
/// are rendered to strings. Fails without a partial result when an
/// ancestor or child is missing.
pub fn blend(inventory: &Inventory, kind: ItemType, name: &str, flatten: bool) -> Result<Mapping> {
    let chain = inventory.chain(kind, name)?;
    let settings = inventory.settings_view();
    debug!(
        "Blending {} '{}' through {}",
        kind,
        name,
        chain
            .iter()
            .map(|item| item.name())
            .collect::<Vec<_>>()
            .join(" -> ")
    );

    let mut result = Mapping::new();
    for (key, value) in settings {
        merge_value(&mut result, key, value.clone());
    }
    annihilate(&mut result);

    for node in &chain {
        consolidate(&mut result, node, settings);
        annihilate(&mut result);
    }

    let Some(leaf) = chain.last() else {
        return Err(Error::NotFound {
            kind,
            name: name.to_string(),
        });
    };

    if leaf.kind() == ItemType::System {
        explode_interfaces(&mut result, leaf);
    }
    if matches!(leaf.kind(), ItemType::Profile | ItemType::System) {
        attach_repo_data(&mut result, inventory);
    }
    set_http_server(&mut result);
    merge_mgmt_parameters(&mut result);
    if matches!(
        leaf.kind(),
        ItemType::Distro | ItemType::Profile | ItemType::Image
    ) {
        attach_children(&mut result, inventory, leaf)?;
    }
    if flatten {
        flatten::flatten(&mut result);
    }
    set_aliases(&mut result);

    Ok(result)
}

/// Merge one node's stored fields into the running result
fn consolidate(result: &mut Mapping, node: &Item, settings: &Mapping) {
    for (key, slot) in node.to_dict() {
        let key = schema::canonical_name(&key).to_string();
        let value = match slot {
            Inheritable::Value(value) => value,
            Inheritable::Inherit if result.contains_key(&key) => continue,
            Inheritable::Inherit => resolve_inherited(node.kind(), &key, settings),
        };
        merge_value(result, &key, value);
    }
}

fn merge_value(result: &mut Mapping, key: &str, value: Value) {
    let Some(existing) = result.get_mut(key) else {
        result.insert(key.to_string(), deduped(value));
        return;
    };
    match (existing, value) {
        (Value::Dict(existing), Value::Dict(incoming)) => existing.extend(incoming),
        (Value::List(existing), Value::List(incoming)) => {
            existing.extend(incoming);
            dedupe(existing);
        }
        _ if key == "distro" => {}
        (existing, value) => *existing = deduped(value),
    }
}

fn deduped(value: Value) -> Value {
    match value {
        Value::List(mut items) => {
            dedupe(&mut items);
            Value::List(items)
        }
        other => other,
    }
}

fn dedupe(items: &mut Vec<Value>) {
    let mut seen: Vec<Value> = Vec::with_capacity(items.len());
    items.retain(|item| {
        if seen.contains(item) {
            false
        } else {
            seen.push(item.clone());
            true
        }
    });
}

/// Drop every `!key` in the removable dicts, together with `key`
fn annihilate(result: &mut Mapping) {
    for field in REMOVABLE_DICTS {
        let Some(Value::Dict(dict)) = result.get_mut(*field) else {
            continue;
        };
        let removals: Vec<String> = dict
            .keys()
            .filter(|k| k.len() > 1 && k.starts_with('!'))
            .cloned()
            .collect();
        for removal in removals {
            dict.shift_remove(&removal);
            dict.shift_remove(&removal[1..]);
        }
    }
}

/// Value for an inheriting field nothing earlier in the chain resolved
///
/// Tries the settings key of the same name, then its `default_` form, then
/// the field's concrete schema default.
pub fn resolve_inherited(kind: ItemType, key: &str, settings: &Mapping) -> Value {
    if let Some(value) = settings.get(key) {
        return value.clone();
    }
    let default_key = match key {
        "owners" => "default_ownership".to_string(),
        key => format!("default_{}", key),
    };
    if let Some(value) = settings.get(&default_key) {
        return value.clone();
    }
    schema::descriptor(kind, key)
        .and_then(|d| d.default.concrete(settings))
        .unwrap_or_default()
}

/// An item's stored fields with every inheriting slot resolved from
/// settings; used where an item is embedded rather than blended
pub fn resolved_dict(item: &Item, settings: &Mapping) -> Mapping {
    item.to_dict()
        .into_iter()
        .map(|(key, slot)| {
            let value = match slot {
                Inheritable::Value(value) => value,
                Inheritable::Inherit => resolve_inherited(item.kind(), &key, settings),
            };
            (key, value)
        })
        .collect()
}

fn explode_interfaces(result: &mut Mapping, system: &Item) {
    for (ifname, iface) in system.interfaces() {
        for (field, value) in iface.to_map() {
            result.insert(format!("{}_{}", field, ifname), value);
        }
    }
}

fn attach_repo_data(result: &mut Mapping, inventory: &Inventory) {
    let names: Vec<String> = result
        .get("repos")
        .and_then(Value::as_list)
        .unwrap_or_default()
        .iter()
        .map(Value::to_string)
        .collect();

    let mut repos: Vec<&Item> = names
        .iter()
        .filter_map(|name| inventory.get(ItemType::Repo, name))
        .collect();
    // stable, so equal priorities keep the order the profile lists them in
    repos.sort_by_key(|repo| std::cmp::Reverse(repo_priority(repo)));

    let repo_data = repos
        .into_iter()
        .map(|repo| Value::Dict(resolved_dict(repo, inventory.settings_view())))
        .collect();
    result.insert("repo_data".to_string(), Value::List(repo_data));
}

fn repo_priority(repo: &Item) -> i64 {
    repo.get("priority")
        .and_then(Inheritable::value)
        .and_then(Value::as_int)
        .unwrap_or(99)
}

fn set_http_server(result: &mut Mapping) {
    let server = result.get("server").map(Value::to_string).unwrap_or_default();
    let http_server = match result.get("http_port") {
        None => server,
        Some(port) if port.to_string() == "80" => server,
        Some(port) => format!("{}:{}", server, port),
    };
    result.insert("http_server".to_string(), Value::Str(http_server));
}

fn merge_mgmt_parameters(result: &mut Mapping) {
    let mut params = result
        .get("mgmt_parameters")
        .and_then(Value::as_dict)
        .cloned()
        .unwrap_or_default();
    if let Some(meta) = result.get("autoinstall_meta").and_then(Value::as_dict) {
        params.extend(meta.iter().map(|(k, v)| (k.clone(), v.clone())));
    }
    result.insert("mgmt_parameters".to_string(), Value::Dict(params));
}

/// A child the index names but the collections lack is [`Error::DanglingChild`]
fn attach_children(result: &mut Mapping, inventory: &Inventory, leaf: &Item) -> Result<()> {
    let parent = leaf.item_ref();
    let mut children = Mapping::new();
    for child in inventory.child_refs(&parent) {
        let item = inventory
            .get(child.kind, &child.name)
            .ok_or_else(|| Error::DanglingChild {
                parent: parent.clone(),
                child: child.clone(),
            })?;
        children.insert(
            child.name.clone(),
            Value::Dict(resolved_dict(item, inventory.settings_view())),
        );
    }
    result.insert("children".to_string(), Value::Dict(children));
    Ok(())
}

/// Name the item's place in the hierarchy for templates
fn set_aliases(result: &mut Mapping) {
    let get = |key: &str| result.get(key).cloned().unwrap_or_default();

    let aliases: Vec<(&str, Value)> = if result.contains_key("interfaces") {
        let mut aliases = vec![("system_name", get("name")), ("profile_name", get("profile"))];
        if result.contains_key("distro") {
            aliases.push(("distro_name", get("distro")));
        } else if result.contains_key("image") {
            aliases.push(("distro_name", Value::from("N/A")));
            aliases.push(("image_name", get("image")));
        }
        aliases
    } else if result.contains_key("distro") {
        vec![("profile_name", get("name")), ("distro_name", get("distro"))]
    } else if result.contains_key("kernel") {
        vec![("distro_name", get("name"))]
    } else if result.contains_key("file") {
        vec![("distro_name", Value::from("N/A")), ("image_name", get("name"))]
    } else {
        Vec::new()
    };

    for (key, value) in aliases {
        result.insert(key.to_string(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn dict(pairs: &[(&str, &str)]) -> Value {
        Value::Dict(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), Value::from(*v)))
                .collect(),
        )
    }

    #[test]
    fn test_merge_value_kinds() {
        let mut result = Mapping::new();
        merge_value(&mut result, "kernel_options", dict(&[("a", "1")]));
        merge_value(&mut result, "kernel_options", dict(&[("a", "2"), ("b", "3")]));
        assert_eq!(result["kernel_options"], dict(&[("a", "2"), ("b", "3")]));

        merge_value(&mut result, "mgmt_classes", Value::from(vec!["a", "b", "a"]));
        merge_value(&mut result, "mgmt_classes", Value::from(vec!["c", "b"]));
        assert_eq!(result["mgmt_classes"], Value::from(vec!["a", "b", "c"]));

        merge_value(&mut result, "virt_ram", Value::Int(512));
        merge_value(&mut result, "virt_ram", Value::Int(2048));
        assert_eq!(result["virt_ram"], Value::Int(2048));

        merge_value(&mut result, "distro", Value::from("first"));
        merge_value(&mut result, "distro", Value::from("second"));
        assert_eq!(result["distro"], Value::from("first"));
    }

    #[test]
    fn test_annihilate() {
        let mut result = Mapping::new();
        result.insert(
            "kernel_options".to_string(),
            dict(&[("x", "1"), ("!x", ""), ("!y", ""), ("!", "kept")]),
        );
        result.insert("environment".to_string(), dict(&[("!z", "")]));

        annihilate(&mut result);

        assert_eq!(result["kernel_options"], dict(&[("!", "kept")]));
        assert_eq!(result["environment"], dict(&[("!z", "")]));
    }

    #[test]
    fn test_resolve_inherited() {
        let mut settings = Mapping::new();
        settings.insert("server".to_string(), Value::from("10.0.0.1"));
        settings.insert("default_virt_ram".to_string(), Value::Int(1024));
        settings.insert("default_ownership".to_string(), Value::from(vec!["ops"]));

        assert_eq!(
            resolve_inherited(ItemType::System, "server", &settings),
            Value::from("10.0.0.1")
        );
        assert_eq!(
            resolve_inherited(ItemType::System, "virt_ram", &settings),
            Value::Int(1024)
        );
        assert_eq!(
            resolve_inherited(ItemType::Profile, "owners", &settings),
            Value::from(vec!["ops"])
        );
        assert_eq!(
            resolve_inherited(ItemType::Profile, "virt_cpus", &settings),
            Value::Int(1)
        );
        assert_eq!(
            resolve_inherited(ItemType::System, "virt_cpus", &settings),
            Value::Null
        );
    }

    #[test]
    fn test_http_server() {
        let mut result = Mapping::new();
        result.insert("server".to_string(), Value::from("cobbler"));
        result.insert("http_port".to_string(), Value::Int(80));
        set_http_server(&mut result);
        assert_eq!(result["http_server"], Value::from("cobbler"));

        result.insert("http_port".to_string(), Value::from("80"));
        set_http_server(&mut result);
        assert_eq!(result["http_server"], Value::from("cobbler"));

        result.insert("http_port".to_string(), Value::Int(8080));
        set_http_server(&mut result);
        assert_eq!(result["http_server"], Value::from("cobbler:8080"));
    }

    #[test]
    fn test_mgmt_parameters_take_autoinstall_meta() {
        let mut result = Mapping::new();
        result.insert(
            "mgmt_parameters".to_string(),
            dict(&[("from_cobbler", "1"), ("site", "a")]),
        );
        result.insert("autoinstall_meta".to_string(), dict(&[("site", "b")]));
        merge_mgmt_parameters(&mut result);
        assert_eq!(
            result["mgmt_parameters"],
            dict(&[("from_cobbler", "1"), ("site", "b")])
        );
    }

    #[test]
    fn test_aliases() {
        let mut result = Mapping::new();
        result.insert("name".to_string(), Value::from("web"));
        result.insert("distro".to_string(), Value::from("rhel9"));
        set_aliases(&mut result);
        assert_eq!(result["profile_name"], Value::from("web"));
        assert_eq!(result["distro_name"], Value::from("rhel9"));

        let mut result = Mapping::new();
        result.insert("name".to_string(), Value::from("appliance"));
        result.insert("file".to_string(), Value::from("/srv/appliance.iso"));
        set_aliases(&mut result);
        assert_eq!(result["distro_name"], Value::from("N/A"));
        assert_eq!(result["image_name"], Value::from("appliance"));
    }
}
