//! fast5 Container Store
//!
//! A hierarchical store of groups, attributes and datasets addressed by
//! slash-delimited paths: a small filesystem embedded in one file.
//!
//! # Core Concepts
//!
//! - [`Store`]: the operations every container offers (groups, attributes, datasets, moves)
//! - [`Container`]: in-memory tree, optionally backed by a file on disk
//! - [`NodePath`]: addressing of nodes from the container root
//! - [`AttrValue`] / [`Data`]: the closed set of values a container can hold
//!
//! # Example
//!
//! ```rust
//! use fast5_store::{AttrValue, Attributes, Container, NodePath, Store};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut container = Container::in_memory();
//! let group: NodePath = "Analyses/Test_000".parse()?;
//! container.create_group(&group)?;
//! container.set_attrs(&group, &Attributes::from([("component".to_string(), AttrValue::from("test"))]))?;
//! assert_eq!(container.list_children(&"Analyses".parse()?)?, ["Test_000"]);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
mod container;
mod error;
mod path;
mod store;
mod value;

// Re-exports
pub use container::Container;
pub use error::{StoreError, StoreResult};
pub use path::{NodePath, PathError};
pub use store::{NodeKind, OpenMode, Store};
pub use value::{AttrValue, Attributes, Cell, Data, Field, FieldType, RecordArray};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
