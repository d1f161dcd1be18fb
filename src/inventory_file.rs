//! Loading an inventory from a TOML file
//!
//! Each item type is an array of tables named after the type. Every key
//! except `interfaces` goes through the item's setter, so the file accepts
//! the same spellings (`ksmeta`, `kopts`, `<<inherit>>`) as any other input.
//!
//! ```toml
//! [[distro]]
//! name = "rhel9"
//! kernel = "/images/rhel9/vmlinuz"
//! initrd = "/images/rhel9/initrd.img"
//!
//! [[profile]]
//! name = "web"
//! distro = "rhel9"
//!
//! [[system]]
//! name = "web01"
//! profile = "web"
//! interfaces.eth0 = { mac_address = "aa:bb:cc:dd:ee:01" }
//! ```

use anyhow::{anyhow, bail, Context, Result};
use cobbler_model::{AddOptions, Inventory, Item, ItemType, Value};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Name of the inventory file inside a configuration root
pub const INVENTORY_FILE: &str = "inventory.toml";

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct InventoryFile {
    distro: Vec<toml::Table>,
    profile: Vec<toml::Table>,
    system: Vec<toml::Table>,
    repo: Vec<toml::Table>,
    image: Vec<toml::Table>,
    network: Vec<toml::Table>,
}

/// Inventory file to read: the explicit path, or the one in the config root
pub fn inventory_path(custom_path: Option<&Path>, config_dir: &Path) -> PathBuf {
    match custom_path {
        Some(path) => path.to_path_buf(),
        None => config_dir.join(INVENTORY_FILE),
    }
}

/// Read `path` into `inventory`, returning the number of items added
///
/// Parents are added before their children whatever order the file lists
/// them in.
pub fn load(path: &Path, inventory: &mut Inventory) -> Result<usize> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read inventory {}", path.display()))?;
    load_str(&content, inventory)
        .with_context(|| format!("Failed to load inventory {}", path.display()))
}

/// Parse inventory TOML into `inventory`
pub fn load_str(content: &str, inventory: &mut Inventory) -> Result<usize> {
    let file: InventoryFile = toml::from_str(content).context("Invalid inventory TOML")?;
    let before = inventory.len();

    for (kind, tables) in [
        (ItemType::Distro, &file.distro),
        (ItemType::Repo, &file.repo),
        (ItemType::Image, &file.image),
        (ItemType::Network, &file.network),
    ] {
        for table in tables {
            add_table(inventory, kind, table)?;
        }
    }

    add_profiles(inventory, &file.profile)?;

    for table in &file.system {
        add_table(inventory, ItemType::System, table)?;
    }

    let added = inventory.len() - before;
    info!("Loaded {} items", added);
    Ok(added)
}

/// Add profiles in passes until every parent is present
fn add_profiles(inventory: &mut Inventory, tables: &[toml::Table]) -> Result<()> {
    let mut pending: Vec<&toml::Table> = tables.iter().collect();

    while !pending.is_empty() {
        let (ready, waiting): (Vec<&toml::Table>, Vec<&toml::Table>) =
            pending.into_iter().partition(|table| match parent_of(table) {
                Some(parent) => inventory.get(ItemType::Profile, parent).is_some(),
                None => true,
            });

        if ready.is_empty() {
            let names: Vec<String> = waiting
                .iter()
                .map(|table| {
                    format!(
                        "{} (parent {})",
                        name_of(table).unwrap_or("?"),
                        parent_of(table).unwrap_or("?")
                    )
                })
                .collect();
            bail!("Profiles with missing parents: {}", names.join(", "));
        }

        for table in ready {
            add_table(inventory, ItemType::Profile, table)?;
        }
        pending = waiting;
    }

    Ok(())
}

fn name_of(table: &toml::Table) -> Option<&str> {
    table.get("name").and_then(toml::Value::as_str)
}

fn parent_of(table: &toml::Table) -> Option<&str> {
    table
        .get("parent")
        .and_then(toml::Value::as_str)
        .filter(|parent| !parent.is_empty())
}

fn add_table(inventory: &mut Inventory, kind: ItemType, table: &toml::Table) -> Result<()> {
    let name = name_of(table).ok_or_else(|| anyhow!("A {} entry has no name", kind))?;
    let item = build_item(inventory, kind, name, table)
        .with_context(|| format!("Invalid {} '{}'", kind, name))?;
    inventory
        .add(item, AddOptions::default())
        .with_context(|| format!("Cannot add {} '{}'", kind, name))?;
    debug!("Loaded {} '{}'", kind, name);
    Ok(())
}

fn build_item(inventory: &Inventory, kind: ItemType, name: &str, table: &toml::Table) -> Result<Item> {
    let mut item = match (kind, parent_of(table)) {
        (ItemType::Profile, Some(parent)) => inventory.new_subprofile(name, parent)?,
        _ => inventory.new_item(kind, name)?,
    };

    for (key, raw) in table {
        match key.as_str() {
            "name" | "parent" if kind == ItemType::Profile => {}
            "name" => {}
            "interfaces" => set_interfaces(&mut item, raw)?,
            field => item.set_field(field, to_value(raw)?)?,
        }
    }

    Ok(item)
}

fn set_interfaces(item: &mut Item, raw: &toml::Value) -> Result<()> {
    let Some(interfaces) = raw.as_table() else {
        bail!("interfaces must be a table of interface tables");
    };
    for (ifname, fields) in interfaces {
        let Some(fields) = fields.as_table() else {
            bail!("interface {} must be a table", ifname);
        };
        for (field, raw) in fields {
            item.set_interface_field(ifname, field, to_value(raw)?)?;
        }
    }
    Ok(())
}

fn to_value(raw: &toml::Value) -> Result<Value> {
    Ok(Value::from(serde_json::to_value(raw)?))
}
