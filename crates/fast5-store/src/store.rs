//! The container store interface
//!
//! Everything above this crate talks to containers through [`Store`]. The
//! trait is object-safe so step tables and other dynamic callers can hold a
//! `&mut dyn Store`.

use crate::error::StoreResult;
use crate::path::NodePath;
use crate::value::{Attributes, Data};

/// How a container is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
    /// Existing container, no writes
    #[default]
    ReadOnly,
    /// New container; an existing file at the path is replaced
    Create,
    /// Existing container, reads and writes
    ReadWrite,
}

impl OpenMode {
    /// Whether writes are permitted in this mode
    #[inline]
    #[must_use]
    pub fn is_writable(self) -> bool {
        !matches!(self, Self::ReadOnly)
    }
}

/// Kind of node at a path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Attribute-bearing node with children
    Group,
    /// Attribute-bearing node with a payload
    Dataset,
}

/// Hierarchical store of groups, datasets and attributes
///
/// # Contract
/// - All paths are rooted at the container root
/// - Groups and datasets share one namespace per path
/// - Children are listed in creation order
/// - Writes on a read-only store fail with [`StoreError::ReadOnly`](crate::StoreError::ReadOnly)
pub trait Store {
    /// Whether writes are permitted
    fn is_writable(&self) -> bool;

    /// Kind of the node at `path`, `None` if absent
    fn node_kind(&self, path: &NodePath) -> Option<NodeKind>;

    /// Whether a group exists at `path`
    fn group_exists(&self, path: &NodePath) -> bool {
        self.node_kind(path) == Some(NodeKind::Group)
    }

    /// Whether a dataset exists at `path`
    fn dataset_exists(&self, path: &NodePath) -> bool {
        self.node_kind(path) == Some(NodeKind::Dataset)
    }

    /// Create a group, creating missing intermediate groups
    ///
    /// Succeeds without change if the group already exists.
    ///
    /// # Errors
    /// Fails if a dataset occupies `path` or one of its ancestors
    fn create_group(&mut self, path: &NodePath) -> StoreResult<()>;

    /// Names of the children of the group at `path`, in creation order
    ///
    /// # Errors
    /// Fails if `path` is absent or is a dataset
    fn list_children(&self, path: &NodePath) -> StoreResult<Vec<String>>;

    /// All attributes of the node at `path`
    ///
    /// # Errors
    /// Fails if `path` is absent
    fn get_attrs(&self, path: &NodePath) -> StoreResult<Attributes>;

    /// Merge `attrs` into the attributes of the node at `path`
    ///
    /// # Errors
    /// Fails if `path` is absent
    fn set_attrs(&mut self, path: &NodePath, attrs: &Attributes) -> StoreResult<()>;

    /// Create a dataset, creating missing intermediate groups
    ///
    /// # Errors
    /// Fails if any node already occupies `path`
    fn create_dataset(&mut self, path: &NodePath, data: Data) -> StoreResult<()>;

    /// Payload of the dataset at `path`
    ///
    /// # Errors
    /// Fails if `path` is absent or is a group
    fn read_dataset(&self, path: &NodePath) -> StoreResult<Data>;

    /// Relocate the subtree at `from` to `to`, creating missing parents of `to`
    ///
    /// # Errors
    /// Fails if `from` is absent, `to` is occupied, or `to` lies inside `from`
    fn move_node(&mut self, from: &NodePath, to: &NodePath) -> StoreResult<()>;

    /// Remember the current tree so [`Store::rollback`] can return to it
    ///
    /// A new checkpoint replaces the previous one.
    ///
    /// # Errors
    /// Fails if the store is closed
    fn checkpoint(&mut self) -> StoreResult<()>;

    /// Return to the last checkpoint and forget it
    ///
    /// # Errors
    /// Fails if no checkpoint is held
    fn rollback(&mut self) -> StoreResult<()>;

    /// Forget the last checkpoint, keeping every change made since
    fn commit(&mut self);

    /// Flush pending changes and release the container
    ///
    /// Further operations fail with [`StoreError::Closed`](crate::StoreError::Closed).
    ///
    /// # Errors
    /// Fails if pending changes cannot be persisted
    fn close(&mut self) -> StoreResult<()>;
}
