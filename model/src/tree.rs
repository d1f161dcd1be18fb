//! Inheritance tree
//!
//! Parent links are derived from item fields by [`parent_ref`]; the reverse
//! direction is a [`ChildIndex`] kept by the inventory and updated only
//! when an item is added, reparented, renamed or removed.

use crate::item::{Item, ItemRef, ItemType};
use std::collections::{BTreeSet, HashMap};

/// The item an item inherits from, if any
///
/// Profiles inherit from their parent profile when one is set and from
/// their distro otherwise; systems from their profile, else their image.
/// Distros, repos, images and networks are roots.
pub fn parent_ref(item: &Item) -> Option<ItemRef> {
    match item.kind() {
        ItemType::Profile => item
            .get_str("parent")
            .map(|p| ItemRef::new(ItemType::Profile, p))
            .or_else(|| {
                item.get_str("distro")
                    .map(|d| ItemRef::new(ItemType::Distro, d))
            }),
        ItemType::System => item
            .get_str("profile")
            .map(|p| ItemRef::new(ItemType::Profile, p))
            .or_else(|| {
                item.get_str("image")
                    .map(|i| ItemRef::new(ItemType::Image, i))
            }),
        ItemType::Distro | ItemType::Repo | ItemType::Image | ItemType::Network => None,
    }
}

/// Reverse index from a parent to its direct children
#[derive(Debug, Clone, Default)]
pub struct ChildIndex {
    children: HashMap<ItemRef, BTreeSet<ItemRef>>,
}

impl ChildIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `child` under `parent`
    pub fn link(&mut self, parent: ItemRef, child: ItemRef) {
        self.children.entry(parent).or_default().insert(child);
    }

    /// Forget `child` under `parent`
    pub fn unlink(&mut self, parent: &ItemRef, child: &ItemRef) {
        if let Some(kids) = self.children.get_mut(parent) {
            kids.remove(child);
            if kids.is_empty() {
                self.children.remove(parent);
            }
        }
    }

    /// Move the children recorded under `old` to `new`
    pub fn rekey(&mut self, old: &ItemRef, new: ItemRef) {
        if let Some(kids) = self.children.remove(old) {
            self.children.insert(new, kids);
        }
    }

    /// Drop everything recorded under `parent`
    pub fn forget(&mut self, parent: &ItemRef) {
        self.children.remove(parent);
    }

    /// Direct children, sorted by type then name
    pub fn children_of(&self, parent: &ItemRef) -> impl Iterator<Item = &ItemRef> {
        self.children.get(parent).into_iter().flatten()
    }

    /// Whether `parent` has any children
    pub fn has_children(&self, parent: &ItemRef) -> bool {
        self.children.contains_key(parent)
    }

    /// All transitive children
    ///
    /// With `sorted`, the result is preorder: every node is immediately
    /// followed by its own descendants. Otherwise direct children come
    /// first, then each child's descendants in turn.
    pub fn descendants(&self, root: &ItemRef, sorted: bool) -> Vec<ItemRef> {
        let mut out = Vec::new();
        self.collect_descendants(root, sorted, &mut out);
        out
    }

    fn collect_descendants(&self, node: &ItemRef, sorted: bool, out: &mut Vec<ItemRef>) {
        let kids: Vec<&ItemRef> = self.children_of(node).collect();
        if !sorted {
            out.extend(kids.iter().map(|k| (*k).clone()));
        }
        for kid in kids {
            if sorted {
                out.push(kid.clone());
            }
            self.collect_descendants(kid, sorted, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Mapping;
    use pretty_assertions::assert_eq;

    fn r(kind: ItemType, name: &str) -> ItemRef {
        ItemRef::new(kind, name)
    }

    fn sample() -> ChildIndex {
        let mut index = ChildIndex::new();
        index.link(r(ItemType::Distro, "d"), r(ItemType::Profile, "p1"));
        index.link(r(ItemType::Distro, "d"), r(ItemType::Profile, "p2"));
        index.link(r(ItemType::Profile, "p1"), r(ItemType::System, "s1"));
        index.link(r(ItemType::Profile, "p1"), r(ItemType::Profile, "sub"));
        index.link(r(ItemType::Profile, "sub"), r(ItemType::System, "s2"));
        index
    }

    #[test]
    fn test_descendants_preorder() {
        let names: Vec<String> = sample()
            .descendants(&r(ItemType::Distro, "d"), true)
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["p1", "sub", "s2", "s1", "p2"]);
    }

    #[test]
    fn test_descendants_unsorted() {
        let names: Vec<String> = sample()
            .descendants(&r(ItemType::Distro, "d"), false)
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["p1", "p2", "sub", "s1", "s2"]);
    }

    #[test]
    fn test_unlink_and_rekey() {
        let mut index = sample();
        index.unlink(&r(ItemType::Profile, "sub"), &r(ItemType::System, "s2"));
        assert!(!index.has_children(&r(ItemType::Profile, "sub")));

        index.rekey(&r(ItemType::Profile, "p1"), r(ItemType::Profile, "web"));
        assert_eq!(index.children_of(&r(ItemType::Profile, "web")).count(), 2);
        assert_eq!(index.children_of(&r(ItemType::Profile, "p1")).count(), 0);
    }

    #[test]
    fn test_parent_ref() {
        let settings = Mapping::new();

        let mut profile = Item::new(ItemType::Profile, &settings);
        profile.set_field("distro", "rhel9").unwrap();
        assert_eq!(parent_ref(&profile), Some(r(ItemType::Distro, "rhel9")));
        profile.set_field("parent", "base").unwrap();
        assert_eq!(parent_ref(&profile), Some(r(ItemType::Profile, "base")));

        let mut system = Item::new(ItemType::System, &settings);
        assert_eq!(parent_ref(&system), None);
        system.set_field("image", "appliance").unwrap();
        assert_eq!(parent_ref(&system), Some(r(ItemType::Image, "appliance")));

        assert_eq!(parent_ref(&Item::new(ItemType::Repo, &settings)), None);
    }
}
