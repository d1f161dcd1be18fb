//! Cobbler object model
//!
//! The provisioning objects a Cobbler server manages and the rules by which
//! they inherit from one another.
//!
//! # Architecture
//!
//! - **Schema**: per-type field tables with defaults, sub-profile defaults
//!   and allowed values
//! - **Item**: one Distro, Profile, System, Repo, Image or Network, with
//!   validating setters and `find` matching
//! - **Inventory**: the collections and the child index linking them;
//!   every structural change (add, reparent, rename, remove) goes through it
//! - **Blend**: resolving an item against settings and its ancestors into a
//!   single mapping, optionally flattened for command lines
//!
//! The inheritance tree is Distro → Profile → sub-Profile … → System, and
//! Image → System. Repos and Networks stand alone.

pub mod blend;
pub mod collection;
pub mod convert;
pub mod error;
pub mod flatten;
pub mod interface;
pub mod inventory;
pub mod item;
pub mod schema;
pub mod tree;
pub mod value;

pub use collection::Collection;
pub use error::{Error, Result};
pub use interface::Interface;
pub use inventory::{AddOptions, Inventory, RemoveOptions, SharedInventory};
pub use item::{Item, ItemRef, ItemType};
pub use schema::{FieldDescriptor, FieldKind};
pub use tree::ChildIndex;
pub use value::{Inheritable, Mapping, Value, INHERIT};
