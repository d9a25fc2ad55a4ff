//! Module discovery for the Kindle lifecycle orchestrator.
//!
//! Applications describe their components as a tree of [`ContainerNode`]s:
//! folders that group things and modules that carry an unevaluated
//! [`ModuleRef`]. Scanning a tree into a [`ModuleIndex`] flattens it into a
//! `name → reference` map that the orchestrator resolves at boot.
//!
//! Discovery never evaluates a module. Duplicate names are not an error:
//! the first module found under a name is kept, and every later one is
//! reported once through `tracing` and recorded as a [`DuplicateModule`].
//!
//! # Example
//!
//! ```
//! use kindle_discovery::{ContainerNode, DiscoveryMode, ModuleIndex, ModuleValue};
//!
//! let root: ContainerNode<(), u32> = ContainerNode::folder("App")
//!     .with_child(ContainerNode::module("Clock", |_: &()| Ok(ModuleValue::Record(1))))
//!     .with_child(
//!         ContainerNode::folder("Shared")
//!             .with_child(ContainerNode::module("Clock", |_: &()| Ok(ModuleValue::Record(2)))),
//!     );
//!
//! let mut index = ModuleIndex::new();
//! let recorded = index.scan(&root, DiscoveryMode::Shallow);
//! assert_eq!(recorded, 1);
//! assert_eq!(index.duplicates().len(), 1);
//! ```

mod container;
mod index;
mod module;

pub use self::container::ContainerNode;
pub use self::index::{DiscoveryMode, DiscoveryModeParseError, DuplicateModule, ModuleIndex};
pub use self::module::{IN_PROGRESS, ModuleError, ModuleRef, ModuleValue};
