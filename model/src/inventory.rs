//! The object graph
//!
//! [`Inventory`] owns one [`Collection`] per item type plus the
//! [`ChildIndex`] that links them. Every operation that can change an
//! item's parent goes through here so the index and each item's depth stay
//! consistent: a change is staged on a clone, checked, and only then
//! committed.

use crate::blend;
use crate::collection::Collection;
use crate::convert;
use crate::interface::Interface;
use crate::item::{Item, ItemRef, ItemType};
use crate::schema;
use crate::tree::{self, ChildIndex};
use crate::value::{Mapping, Value};
use crate::{Error, Result};
use cobbler_config::Settings;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info};

/// An inventory behind a coarse lock
///
/// Reads (`blend`, `find`) share the lock; mutations take it exclusively.
pub type SharedInventory = Arc<RwLock<Inventory>>;

/// Options for [`Inventory::add`]
#[derive(Debug, Clone, Copy)]
pub struct AddOptions {
    /// Replace an existing item of the same name
    pub overwrite: bool,
    /// Reject MAC, IP or DNS names already used by another system
    pub check_netinfo: bool,
}

impl Default for AddOptions {
    fn default() -> Self {
        Self {
            overwrite: false,
            check_netinfo: true,
        }
    }
}

/// Options for [`Inventory::remove`]
#[derive(Debug, Clone, Copy, Default)]
pub struct RemoveOptions {
    /// Also remove every descendant
    pub recursive: bool,
}

/// All provisioning objects and the links between them
#[derive(Debug, Clone)]
pub struct Inventory {
    settings: Settings,
    settings_view: Mapping,
    distros: Collection,
    profiles: Collection,
    systems: Collection,
    repos: Collection,
    images: Collection,
    networks: Collection,
    children: ChildIndex,
}

impl Inventory {
    /// Create an empty inventory rooted at `settings`
    pub fn new(settings: Settings) -> Result<Self> {
        let settings_view = settings_mapping(&settings)?;
        Ok(Self {
            settings,
            settings_view,
            distros: Collection::new(ItemType::Distro),
            profiles: Collection::new(ItemType::Profile),
            systems: Collection::new(ItemType::System),
            repos: Collection::new(ItemType::Repo),
            images: Collection::new(ItemType::Image),
            networks: Collection::new(ItemType::Network),
            children: ChildIndex::new(),
        })
    }

    /// Wrap in a lock for sharing between threads
    pub fn shared(self) -> SharedInventory {
        Arc::new(RwLock::new(self))
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Settings as a mapping; the root node of every blend
    pub fn settings_view(&self) -> &Mapping {
        &self.settings_view
    }

    /// The collection holding items of `kind`
    pub fn collection(&self, kind: ItemType) -> &Collection {
        match kind {
            ItemType::Distro => &self.distros,
            ItemType::Profile => &self.profiles,
            ItemType::System => &self.systems,
            ItemType::Repo => &self.repos,
            ItemType::Image => &self.images,
            ItemType::Network => &self.networks,
        }
    }

    fn collection_mut(&mut self, kind: ItemType) -> &mut Collection {
        match kind {
            ItemType::Distro => &mut self.distros,
            ItemType::Profile => &mut self.profiles,
            ItemType::System => &mut self.systems,
            ItemType::Repo => &mut self.repos,
            ItemType::Image => &mut self.images,
            ItemType::Network => &mut self.networks,
        }
    }

    /// Total number of items
    pub fn len(&self) -> usize {
        ItemType::ALL
            .iter()
            .map(|kind| self.collection(*kind).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A fresh, unattached item with defaults taken from these settings
    pub fn new_item(&self, kind: ItemType, name: &str) -> Result<Item> {
        let mut item = Item::new(kind, &self.settings_view);
        item.set_field("name", name)?;
        Ok(item)
    }

    /// A fresh, unattached sub-profile of `parent`
    pub fn new_subprofile(&self, name: &str, parent: &str) -> Result<Item> {
        let mut item = Item::new_subprofile(&self.settings_view);
        item.set_field("name", name)?;
        item.set_field("parent", parent)?;
        Ok(item)
    }

    pub fn get(&self, kind: ItemType, name: &str) -> Option<&Item> {
        self.collection(kind).get(name)
    }

    /// Like [`Inventory::get`], but a missing item is an error
    pub fn require(&self, kind: ItemType, name: &str) -> Result<&Item> {
        self.get(kind, name).ok_or_else(|| Error::NotFound {
            kind,
            name: name.to_string(),
        })
    }

    fn require_ref(&self, item: &ItemRef) -> Result<&Item> {
        self.require(item.kind, &item.name)
    }

    /// First item of `kind` matching the criteria
    pub fn find(&self, kind: ItemType, criteria: &[(&str, &str)]) -> Result<Option<&Item>> {
        self.collection(kind).find(criteria)
    }

    /// Every item of `kind` matching the criteria
    pub fn find_all(&self, kind: ItemType, criteria: &[(&str, &str)]) -> Result<Vec<&Item>> {
        self.collection(kind).find_all(criteria)
    }

    /// Add an item
    ///
    /// The item must pass its validity checks and its parent must exist.
    /// A missing uid or creation time is filled in.
    pub fn add(&mut self, mut item: Item, options: AddOptions) -> Result<()> {
        item.check_valid()?;

        let me = item.item_ref();
        if !options.overwrite && self.collection(me.kind).contains(&me.name) {
            return Err(Error::AlreadyExists {
                kind: me.kind,
                name: me.name,
            });
        }

        let parent = tree::parent_ref(&item);
        let depth = self.depth_under(&me, parent.as_ref())?;
        if me.kind == ItemType::Profile {
            self.check_lineage(&me, parent.as_ref())?;
            self.check_distro(&item)?;
        }
        if me.kind == ItemType::System && options.check_netinfo {
            self.check_netinfo(&item)?;
        }

        let now = now();
        let uid = match item.uid() {
            "" => uuid::Uuid::new_v4().simple().to_string(),
            uid => uid.to_string(),
        };
        let ctime = if item.ctime() == 0.0 { now } else { item.ctime() };
        item.set_identity(uid, ctime);
        item.touch(now);
        item.set_depth(depth);

        if let Some(old) = self.collection_mut(me.kind).take(&me.name) {
            if let Some(old_parent) = tree::parent_ref(&old) {
                self.children.unlink(&old_parent, &me);
            }
        }
        if let Some(parent) = parent {
            self.children.link(parent, me.clone());
        }
        self.collection_mut(me.kind).insert(item);
        self.cascade_depth(&me);

        info!("Added {}", me);
        Ok(())
    }

    /// Validate and set a field of a stored item
    ///
    /// Changing a parent pointer (`distro`, `parent`, `profile`, `image`)
    /// reparents the item; a missing new parent is [`Error::NotFound`] and
    /// leaves everything untouched. Setting `name` renames.
    pub fn set_field(
        &mut self,
        kind: ItemType,
        name: &str,
        field: &str,
        raw: impl Into<Value>,
    ) -> Result<()> {
        let field = schema::canonical_name(field);
        let raw = raw.into();
        if field == "name" {
            return self.rename(kind, name, &raw.to_string());
        }

        let mut item = self.require(kind, name)?.clone();
        item.set_field(field, raw)?;
        let check_netinfo = kind == ItemType::System && is_netinfo_field(field);
        self.commit(item, check_netinfo)
    }

    /// Merge `key=value` pairs into a dict field; `~key` deletes `key`
    pub fn set_field_inplace(
        &mut self,
        kind: ItemType,
        name: &str,
        field: &str,
        raw: impl Into<Value>,
    ) -> Result<()> {
        let mut item = self.require(kind, name)?.clone();
        item.set_field_inplace(field, raw)?;
        self.commit(item, false)
    }

    /// Set a field on one interface of a system
    pub fn set_interface_field(
        &mut self,
        system: &str,
        ifname: &str,
        field: &str,
        raw: impl Into<Value>,
    ) -> Result<()> {
        let mut item = self.require(ItemType::System, system)?.clone();
        item.set_interface_field(ifname, field, raw)?;
        self.commit(item, true)
    }

    /// Rename an interface of a system
    pub fn rename_interface(&mut self, system: &str, old: &str, new: &str) -> Result<()> {
        let mut item = self.require(ItemType::System, system)?.clone();
        item.rename_interface(old, new)?;
        self.commit(item, false)
    }

    /// Delete an interface of a system
    pub fn delete_interface(&mut self, system: &str, ifname: &str) -> Result<()> {
        let mut item = self.require(ItemType::System, system)?.clone();
        item.delete_interface(ifname)?;
        self.commit(item, false)
    }

    /// Reset a stored item's fields to their defaults
    pub fn clear(&mut self, kind: ItemType, name: &str) -> Result<()> {
        let mut item = self.require(kind, name)?.clone();
        let is_subobject = item.is_subobject();
        item.clear(is_subobject, &self.settings_view);
        self.commit(item, false)
    }

    /// Store a modified copy of an existing item, reparenting if needed
    fn commit(&mut self, mut item: Item, check_netinfo: bool) -> Result<()> {
        let me = item.item_ref();
        let old_parent = self.get(me.kind, &me.name).and_then(tree::parent_ref);
        let new_parent = tree::parent_ref(&item);

        if check_netinfo {
            self.check_netinfo(&item)?;
        }
        let old_distro = self.get(me.kind, &me.name).and_then(|old| old.get_str("distro"));
        if me.kind == ItemType::Profile && old_distro != item.get_str("distro") {
            self.check_distro(&item)?;
        }

        let reparented = old_parent != new_parent;
        if reparented {
            let depth = self.depth_under(&me, new_parent.as_ref())?;
            if me.kind == ItemType::Profile {
                self.check_lineage(&me, new_parent.as_ref())?;
            }
            item.set_depth(depth);

            if let Some(old) = &old_parent {
                self.children.unlink(old, &me);
            }
            if let Some(new) = &new_parent {
                self.children.link(new.clone(), me.clone());
            }
            debug!(
                "Reparented {} under {}",
                me,
                new_parent
                    .as_ref()
                    .map_or_else(|| "nothing".to_string(), ToString::to_string)
            );
        }

        item.touch(now());
        self.collection_mut(me.kind).insert(item);
        if reparented {
            self.cascade_depth(&me);
        }
        Ok(())
    }

    /// Rename an item and repoint everything that references it
    pub fn rename(&mut self, kind: ItemType, old: &str, new: &str) -> Result<()> {
        let new = convert::validate_name("name", new)?;
        let mut item = self.require(kind, old)?.clone();
        if old == new {
            return Ok(());
        }
        if self.collection(kind).contains(&new) {
            return Err(Error::AlreadyExists { kind, name: new });
        }
        item.set_field("name", new.as_str())?;

        let old_ref = ItemRef::new(kind, old);
        let new_ref = item.item_ref();
        if let Some(parent) = tree::parent_ref(&item) {
            self.children.unlink(&parent, &old_ref);
            self.children.link(parent, new_ref.clone());
        }
        self.children.rekey(&old_ref, new_ref.clone());

        self.collection_mut(kind).take(old);
        item.touch(now());
        self.collection_mut(kind).insert(item);

        let kids: Vec<ItemRef> = self.children.children_of(&new_ref).cloned().collect();
        for kid in kids {
            let field = match (kind, kid.kind) {
                (ItemType::Distro, ItemType::Profile) => "distro",
                (ItemType::Profile, ItemType::Profile) => "parent",
                (ItemType::Profile, ItemType::System) => "profile",
                (ItemType::Image, ItemType::System) => "image",
                _ => continue,
            };
            if let Some(child) = self.collection_mut(kid.kind).get_mut(&kid.name) {
                child.set_raw(field, Value::from(new.as_str()));
            }
        }

        match kind {
            // sub-profiles may also name their distro explicitly
            ItemType::Distro => self.rewrite_profiles(|profile| {
                if profile.get_str("distro") == Some(old) {
                    profile.set_raw("distro", Value::from(new.as_str()));
                }
            }),
            ItemType::Repo => self.rewrite_profiles(|profile| {
                let Some(Value::List(repos)) = profile.get("repos").and_then(|r| r.value())
                else {
                    return;
                };
                if repos.iter().any(|r| r.as_str() == Some(old)) {
                    let renamed = repos
                        .iter()
                        .map(|r| match r.as_str() {
                            Some(name) if name == old => Value::from(new.as_str()),
                            _ => r.clone(),
                        })
                        .collect();
                    profile.set_raw("repos", Value::List(renamed));
                }
            }),
            _ => {}
        }

        info!("Renamed {} to '{}'", old_ref, new);
        Ok(())
    }

    fn rewrite_profiles(&mut self, mut rewrite: impl FnMut(&mut Item)) {
        let names: Vec<String> = self.profiles.names().map(str::to_string).collect();
        for name in names {
            if let Some(profile) = self.profiles.get_mut(&name) {
                rewrite(profile);
            }
        }
    }

    /// Remove an item
    ///
    /// An item with descendants is only removed when `recursive` is set;
    /// descendants then go first, deepest first, so no item ever points at
    /// a missing parent. Returns what was removed, in removal order.
    pub fn remove(
        &mut self,
        kind: ItemType,
        name: &str,
        options: RemoveOptions,
    ) -> Result<Vec<ItemRef>> {
        let target = self.require(kind, name)?;
        let me = target.item_ref();
        let depth = target.depth();

        let descendants = self.children.descendants(&me, true);
        if !descendants.is_empty() && !options.recursive {
            return Err(Error::HasDependents {
                kind,
                name: name.to_string(),
                dependents: descendants.iter().map(ToString::to_string).collect(),
            });
        }

        let mut doomed: Vec<(u32, ItemRef)> = descendants
            .into_iter()
            .filter_map(|r| self.get(r.kind, &r.name).map(|item| (item.depth(), r)))
            .collect();
        doomed.sort_by(|a, b| b.0.cmp(&a.0));
        doomed.push((depth, me));

        let mut removed = Vec::with_capacity(doomed.len());
        for (_, doomed_ref) in doomed {
            if let Some(item) = self.collection_mut(doomed_ref.kind).take(&doomed_ref.name) {
                if let Some(parent) = tree::parent_ref(&item) {
                    self.children.unlink(&parent, &doomed_ref);
                }
                self.children.forget(&doomed_ref);
                info!("Removed {}", doomed_ref);
                removed.push(doomed_ref);
            }
        }
        Ok(removed)
    }

    /// Add a copy of an item under a new name
    ///
    /// The copy gets a fresh uid and creation time; a system copy loses
    /// its interfaces' MAC, IP and DNS names.
    pub fn copy(&mut self, kind: ItemType, name: &str, new_name: &str) -> Result<()> {
        let mut item = self.require(kind, name)?.clone();
        for iface in item.interfaces_mut() {
            iface.clear_addresses();
        }
        item.set_field("name", new_name)?;
        item.set_identity(String::new(), 0.0);
        self.add(item, AddOptions::default())?;
        info!("Copied {} '{}' to '{}'", kind, name, new_name);
        Ok(())
    }

    /// The item `name` inherits from directly
    pub fn parent_of(&self, kind: ItemType, name: &str) -> Result<Option<&Item>> {
        let item = self.require(kind, name)?;
        tree::parent_ref(item)
            .map(|parent| self.require_ref(&parent))
            .transpose()
    }

    /// The nearest ancestor of a different type
    ///
    /// Skips sub-profile chains: a system under a sub-profile still gets
    /// its profile, and a sub-profile gets its distro.
    pub fn conceptual_parent(&self, kind: ItemType, name: &str) -> Result<Option<&Item>> {
        let mut current = self.require(kind, name)?;
        for _ in 0..=self.len() {
            match self.parent_of(current.kind(), current.name())? {
                None => return Ok(None),
                Some(parent) if parent.kind() != kind => return Ok(Some(parent)),
                Some(parent) => current = parent,
            }
        }
        Err(self.cycle_at(current))
    }

    /// Direct children, sorted by type then name
    pub fn children(&self, kind: ItemType, name: &str) -> Vec<&Item> {
        self.children
            .children_of(&ItemRef::new(kind, name))
            .filter_map(|r| self.get(r.kind, &r.name))
            .collect()
    }

    /// All transitive children; see [`ChildIndex::descendants`] for order
    pub fn descendants(&self, kind: ItemType, name: &str, sorted: bool) -> Result<Vec<&Item>> {
        let item = self.require(kind, name)?;
        Ok(self
            .children
            .descendants(&item.item_ref(), sorted)
            .iter()
            .filter_map(|r| self.get(r.kind, &r.name))
            .collect())
    }

    /// Direct child references as recorded in the index
    pub(crate) fn child_refs(&self, item: &ItemRef) -> Vec<ItemRef> {
        self.children.children_of(item).cloned().collect()
    }

    /// The inheritance chain of an item, root first and the item last
    pub fn chain(&self, kind: ItemType, name: &str) -> Result<Vec<&Item>> {
        let leaf = self.require(kind, name)?;
        let mut chain = vec![leaf];
        let mut next = tree::parent_ref(leaf);

        while let Some(parent) = next {
            if chain.len() > self.len() {
                return Err(Error::Cycle {
                    item: leaf.item_ref(),
                    parent,
                });
            }
            let item = self.require_ref(&parent)?;
            next = tree::parent_ref(item);
            chain.push(item);
        }

        chain.reverse();
        Ok(chain)
    }

    /// Items without a parent, by type then name
    pub fn roots(&self) -> Vec<&Item> {
        ItemType::ALL
            .iter()
            .flat_map(|kind| self.collection(*kind).iter())
            .filter(|item| tree::parent_ref(item).is_none())
            .collect()
    }

    /// Fully resolved view of an item; see [`crate::blend`]
    pub fn blend(&self, kind: ItemType, name: &str, flatten: bool) -> Result<Mapping> {
        blend::blend(self, kind, name, flatten)
    }

    /// Depth an item would have under `parent`, rejecting self-parenting
    /// and cycles
    fn depth_under(&self, me: &ItemRef, parent: Option<&ItemRef>) -> Result<u32> {
        let Some(parent) = parent else {
            return Ok(0);
        };
        if parent == me {
            return Err(Error::SelfParent(me.name.clone()));
        }
        let parent_item = self.require_ref(parent)?;
        if self.children.descendants(me, false).contains(parent) {
            return Err(Error::Cycle {
                item: me.clone(),
                parent: parent.clone(),
            });
        }
        Ok(parent_item.depth() + 1)
    }

    /// A profile's chain must end at a distro
    fn check_lineage(&self, me: &ItemRef, parent: Option<&ItemRef>) -> Result<()> {
        let mut next = parent.cloned();
        let mut steps = 0;
        while let Some(current) = next.take() {
            if current.kind == ItemType::Distro {
                return Ok(());
            }
            if steps > self.len() {
                break;
            }
            steps += 1;
            next = tree::parent_ref(self.require_ref(&current)?);
        }
        Err(Error::Invalid {
            kind: me.kind,
            name: me.name.clone(),
            reason: "profile does not descend from a distro".to_string(),
        })
    }

    /// A profile's `distro` must name a stored distro, even under a `parent`
    fn check_distro(&self, item: &Item) -> Result<()> {
        if let Some(distro) = item.get_str("distro") {
            self.require(ItemType::Distro, distro)?;
        }
        Ok(())
    }

    /// Reject addresses another system already uses
    fn check_netinfo(&self, item: &Item) -> Result<()> {
        for iface in item.interfaces().values() {
            for (field, value) in netinfo(iface) {
                let allowed = match field {
                    "mac_address" => self.settings.allow_duplicate_macs || value == "random",
                    "ip_address" => self.settings.allow_duplicate_ips,
                    _ => self.settings.allow_duplicate_hostnames,
                };
                if allowed || value.is_empty() {
                    continue;
                }

                let owner = self.systems.iter().find(|other| {
                    other.name() != item.name()
                        && other
                            .interfaces()
                            .values()
                            .any(|i| netinfo(i).iter().any(|(f, v)| *f == field && *v == value))
                });
                if let Some(owner) = owner {
                    return Err(Error::DuplicateNetInfo {
                        field: field.to_string(),
                        value: value.to_string(),
                        owner: owner.name().to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Recompute depth for everything below `root`
    fn cascade_depth(&mut self, root: &ItemRef) {
        for node in self.children.descendants(root, true) {
            let depth = self
                .get(node.kind, &node.name)
                .and_then(tree::parent_ref)
                .and_then(|parent| self.get(parent.kind, &parent.name))
                .map_or(0, |parent| parent.depth() + 1);
            if let Some(item) = self.collection_mut(node.kind).get_mut(&node.name) {
                item.set_depth(depth);
            }
        }
    }

    fn cycle_at(&self, item: &Item) -> Error {
        Error::Cycle {
            item: item.item_ref(),
            parent: tree::parent_ref(item).unwrap_or_else(|| item.item_ref()),
        }
    }
}

fn netinfo(iface: &Interface) -> [(&'static str, &str); 3] {
    [
        ("mac_address", iface.mac_address.as_str()),
        ("ip_address", iface.ip_address.as_str()),
        ("dns_name", iface.dns_name.as_str()),
    ]
}

fn is_netinfo_field(field: &str) -> bool {
    matches!(
        crate::interface::canonical_field(field),
        "mac_address" | "ip_address" | "dns_name"
    )
}

/// Settings converted to a resolved mapping
fn settings_mapping(settings: &Settings) -> Result<Mapping> {
    match Value::from(serde_json::to_value(settings)?) {
        Value::Dict(map) => Ok(map),
        _ => Ok(Mapping::new()),
    }
}

/// Seconds since the epoch with microsecond precision
fn now() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
