//! In-memory container tree with optional file backing
//!
//! A [`Container`] holds the whole node tree in memory. When opened from a
//! path, the tree is loaded on open and written back atomically on
//! [`Store::close`] (or on drop, if the caller never closed it).

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};
use crate::path::NodePath;
use crate::store::{NodeKind, OpenMode, Store};
use crate::value::{Attributes, Data};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Node {
    attrs: Attributes,
    body: Body,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum Body {
    Group(IndexMap<String, Node>),
    Dataset(Data),
}

impl Node {
    fn group() -> Self {
        Self {
            attrs: Attributes::new(),
            body: Body::Group(IndexMap::new()),
        }
    }

    fn dataset(data: Data) -> Self {
        Self {
            attrs: Attributes::new(),
            body: Body::Dataset(data),
        }
    }

    fn kind(&self) -> NodeKind {
        match self.body {
            Body::Group(_) => NodeKind::Group,
            Body::Dataset(_) => NodeKind::Dataset,
        }
    }
}

/// Hierarchical container
///
/// # Lifecycle
/// - [`Container::in_memory`]: scratch container, never persisted
/// - [`Container::open`]: file-backed; [`Store::close`] writes pending changes
///
/// Dropping an unclosed, modified file-backed container attempts a final
/// write and logs a warning if it fails.
#[derive(Debug)]
pub struct Container {
    root: Node,
    mode: OpenMode,
    backing: Option<PathBuf>,
    dirty: bool,
    closed: bool,
    /// Tree and dirty flag at the last checkpoint
    saved: Option<(Node, bool)>,
}

impl Container {
    /// Create an empty writable container with no backing file
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            root: Node::group(),
            mode: OpenMode::Create,
            backing: None,
            dirty: false,
            closed: false,
            saved: None,
        }
    }

    /// Open a file-backed container
    ///
    /// [`OpenMode::Create`] writes an empty container to `path` immediately,
    /// replacing any existing file.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or written, or does not hold
    /// a container image
    pub fn open(path: impl AsRef<Path>, mode: OpenMode) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let root = match mode {
            OpenMode::Create => Node::group(),
            OpenMode::ReadOnly | OpenMode::ReadWrite => load(&path)?,
        };

        let mut container = Self {
            root,
            mode,
            backing: Some(path),
            dirty: mode == OpenMode::Create,
            closed: false,
            saved: None,
        };
        container.flush()?;

        tracing::debug!(path = ?container.backing, ?mode, "opened container");
        Ok(container)
    }

    /// Mode the container was opened with
    #[inline]
    #[must_use]
    pub fn mode(&self) -> OpenMode {
        self.mode
    }

    /// Backing file, if any
    #[inline]
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.backing.as_deref()
    }

    /// Whether there are changes not yet written to the backing file
    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Whether both containers hold identical trees
    #[must_use]
    pub fn content_eq(&self, other: &Self) -> bool {
        self.root == other.root
    }

    /// Write pending changes to the backing file
    ///
    /// No-op for in-memory containers and when nothing changed.
    ///
    /// # Errors
    /// Returns error if the image cannot be written
    pub fn flush(&mut self) -> StoreResult<()> {
        let Some(path) = self.backing.as_deref() else {
            return Ok(());
        };
        if !self.dirty || !self.mode.is_writable() {
            return Ok(());
        }

        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut tmp =
            tempfile::NamedTempFile::new_in(dir).map_err(|e| StoreError::io_error(dir, e))?;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            serde_json::to_writer(&mut writer, &self.root)
                .map_err(|e| StoreError::io_error(path, e.into()))?;
            writer.flush().map_err(|e| StoreError::io_error(path, e))?;
        }
        tmp.persist(path)
            .map_err(|e| StoreError::io_error(path, e.error))?;

        self.dirty = false;
        tracing::debug!(path = %path.display(), "persisted container");
        Ok(())
    }

    /// Release the container without writing pending changes
    ///
    /// The backing file keeps whatever was last persisted.
    pub fn discard(&mut self) {
        if self.dirty {
            tracing::debug!(path = ?self.backing, "discarded unsaved changes");
        }
        self.saved = None;
        self.dirty = false;
        self.closed = true;
    }

    fn check_open(&self) -> StoreResult<()> {
        if self.closed {
            Err(StoreError::Closed)
        } else {
            Ok(())
        }
    }

    fn check_writable(&self) -> StoreResult<()> {
        self.check_open()?;
        if self.mode.is_writable() {
            Ok(())
        } else {
            Err(StoreError::ReadOnly)
        }
    }

    fn node(&self, path: &NodePath) -> Option<&Node> {
        let mut current = &self.root;
        for seg in path.iter() {
            current = match &current.body {
                Body::Group(children) => children.get(seg)?,
                Body::Dataset(_) => return None,
            };
        }
        Some(current)
    }

    fn node_mut(&mut self, path: &NodePath) -> Option<&mut Node> {
        let mut current = &mut self.root;
        for seg in path.iter() {
            current = match &mut current.body {
                Body::Group(children) => children.get_mut(seg)?,
                Body::Dataset(_) => return None,
            };
        }
        Some(current)
    }

    fn existing(&self, path: &NodePath) -> StoreResult<&Node> {
        self.check_open()?;
        self.node(path)
            .ok_or_else(|| StoreError::NotFound(path.clone()))
    }

    /// Children of the group at `path`, creating it and its ancestors as needed
    fn ensure_group(&mut self, path: &NodePath) -> StoreResult<&mut IndexMap<String, Node>> {
        let mut current = &mut self.root;
        for (depth, seg) in path.iter().enumerate() {
            let children = match &mut current.body {
                Body::Group(children) => children,
                Body::Dataset(_) => return Err(StoreError::NotAGroup(path.prefix(depth))),
            };
            current = children
                .entry(seg.to_string())
                .or_insert_with(Node::group);
        }
        match &mut current.body {
            Body::Group(children) => Ok(children),
            Body::Dataset(_) => Err(StoreError::NotAGroup(path.clone())),
        }
    }
}

fn load(path: &Path) -> StoreResult<Node> {
    let file = File::open(path).map_err(|e| StoreError::io_error(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|source| StoreError::Corrupt {
        path: path.to_path_buf(),
        source,
    })
}

impl Store for Container {
    fn is_writable(&self) -> bool {
        !self.closed && self.mode.is_writable()
    }

    fn node_kind(&self, path: &NodePath) -> Option<NodeKind> {
        if self.closed {
            return None;
        }
        self.node(path).map(Node::kind)
    }

    fn create_group(&mut self, path: &NodePath) -> StoreResult<()> {
        self.check_writable()?;
        if self.node_kind(path) == Some(NodeKind::Group) {
            return Ok(());
        }
        self.ensure_group(path)?;
        self.dirty = true;
        Ok(())
    }

    fn list_children(&self, path: &NodePath) -> StoreResult<Vec<String>> {
        match &self.existing(path)?.body {
            Body::Group(children) => Ok(children.keys().cloned().collect()),
            Body::Dataset(_) => Err(StoreError::NotAGroup(path.clone())),
        }
    }

    fn get_attrs(&self, path: &NodePath) -> StoreResult<Attributes> {
        Ok(self.existing(path)?.attrs.clone())
    }

    fn set_attrs(&mut self, path: &NodePath, attrs: &Attributes) -> StoreResult<()> {
        self.check_writable()?;
        let node = self
            .node_mut(path)
            .ok_or_else(|| StoreError::NotFound(path.clone()))?;
        for (key, value) in attrs {
            node.attrs.insert(key.clone(), value.clone());
        }
        self.dirty = true;
        Ok(())
    }

    fn create_dataset(&mut self, path: &NodePath, data: Data) -> StoreResult<()> {
        self.check_writable()?;
        let (parent, name) = match (path.parent(), path.name()) {
            (Some(parent), Some(name)) => (parent, name.to_string()),
            _ => return Err(StoreError::AlreadyExists(path.clone())),
        };
        if self.node(path).is_some() {
            return Err(StoreError::AlreadyExists(path.clone()));
        }
        self.ensure_group(&parent)?
            .insert(name, Node::dataset(data));
        self.dirty = true;
        Ok(())
    }

    fn read_dataset(&self, path: &NodePath) -> StoreResult<Data> {
        match &self.existing(path)?.body {
            Body::Dataset(data) => Ok(data.clone()),
            Body::Group(_) => Err(StoreError::NotADataset(path.clone())),
        }
    }

    fn move_node(&mut self, from: &NodePath, to: &NodePath) -> StoreResult<()> {
        self.check_writable()?;
        let (Some(from_parent), Some(from_name), Some(to_parent), Some(to_name)) =
            (from.parent(), from.name(), to.parent(), to.name())
        else {
            return Err(StoreError::InvalidMove {
                from: from.clone(),
                to: to.clone(),
            });
        };
        if from.is_ancestor_of(to) {
            return Err(StoreError::InvalidMove {
                from: from.clone(),
                to: to.clone(),
            });
        }
        if self.node(from).is_none() {
            return Err(StoreError::NotFound(from.clone()));
        }
        if self.node(to).is_some() {
            return Err(StoreError::AlreadyExists(to.clone()));
        }

        // Destination parents first, so a blocked destination leaves the source in place.
        self.ensure_group(&to_parent)?;

        let node = match self.node_mut(&from_parent).map(|n| &mut n.body) {
            Some(Body::Group(children)) => children.shift_remove(from_name),
            _ => None,
        }
        .ok_or_else(|| StoreError::NotFound(from.clone()))?;

        self.ensure_group(&to_parent)?
            .insert(to_name.to_string(), node);
        self.dirty = true;
        Ok(())
    }

    fn checkpoint(&mut self) -> StoreResult<()> {
        self.check_open()?;
        self.saved = Some((self.root.clone(), self.dirty));
        Ok(())
    }

    fn rollback(&mut self) -> StoreResult<()> {
        self.check_open()?;
        let (root, dirty) = self.saved.take().ok_or(StoreError::NoCheckpoint)?;
        self.root = root;
        self.dirty = dirty;
        tracing::debug!(path = ?self.backing, "rolled back to checkpoint");
        Ok(())
    }

    fn commit(&mut self) {
        self.saved = None;
    }

    fn close(&mut self) -> StoreResult<()> {
        if self.closed {
            return Ok(());
        }
        self.flush()?;
        self.saved = None;
        self.closed = true;
        tracing::debug!(path = ?self.backing, "closed container");
        Ok(())
    }
}

impl Drop for Container {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(err) = self.flush() {
            tracing::warn!(path = ?self.backing, error = %err, "failed to persist container on drop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::AttrValue;

    fn p(s: &str) -> NodePath {
        s.parse().unwrap()
    }

    #[test]
    fn create_group_makes_intermediates() {
        let mut c = Container::in_memory();
        c.create_group(&p("Analyses/Test_000/Sub1")).unwrap();
        assert!(c.group_exists(&p("Analyses")));
        assert!(c.group_exists(&p("Analyses/Test_000")));
        assert_eq!(c.list_children(&p("Analyses/Test_000")).unwrap(), ["Sub1"]);
        // Idempotent
        c.create_group(&p("Analyses/Test_000/Sub1")).unwrap();
    }

    #[test]
    fn children_keep_creation_order() {
        let mut c = Container::in_memory();
        for name in ["Zeta_000", "Alpha_000", "Mid_000"] {
            c.create_group(&p("Analyses").child(name).unwrap()).unwrap();
        }
        assert_eq!(
            c.list_children(&p("Analyses")).unwrap(),
            ["Zeta_000", "Alpha_000", "Mid_000"]
        );
    }

    #[test]
    fn attrs_merge() {
        let mut c = Container::in_memory();
        c.create_group(&p("g")).unwrap();
        c.set_attrs(&p("g"), &Attributes::from([("a".to_string(), AttrValue::Int(1))]))
            .unwrap();
        c.set_attrs(&p("g"), &Attributes::from([("b".to_string(), AttrValue::Int(2))]))
            .unwrap();
        let attrs = c.get_attrs(&p("g")).unwrap();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs["a"], AttrValue::Int(1));
    }

    #[test]
    fn set_attrs_on_missing_node() {
        let mut c = Container::in_memory();
        let err = c.set_attrs(&p("nope"), &Attributes::new()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn dataset_namespace_is_shared() {
        let mut c = Container::in_memory();
        c.create_dataset(&p("g/data"), Data::from("hello")).unwrap();
        assert!(c.dataset_exists(&p("g/data")));
        assert!(matches!(
            c.create_dataset(&p("g/data"), Data::from("again")),
            Err(StoreError::AlreadyExists(_))
        ));
        assert!(matches!(
            c.create_group(&p("g/data/child")),
            Err(StoreError::NotAGroup(_))
        ));
        assert!(matches!(
            c.read_dataset(&p("g")),
            Err(StoreError::NotADataset(_))
        ));
        assert_eq!(c.read_dataset(&p("g/data")).unwrap(), Data::from("hello"));
    }

    #[test]
    fn move_relocates_subtree() {
        let mut c = Container::in_memory();
        c.create_dataset(&p("ED/Read_1/Events"), Data::from("x")).unwrap();
        c.set_attrs(
            &p("ED/Read_1"),
            &Attributes::from([("read_number".to_string(), AttrValue::Int(1))]),
        )
        .unwrap();

        c.move_node(&p("ED/Read_1"), &p("ED/Reads/Read_1")).unwrap();

        assert!(c.node_kind(&p("ED/Read_1")).is_none());
        assert!(c.dataset_exists(&p("ED/Reads/Read_1/Events")));
        assert_eq!(
            c.get_attrs(&p("ED/Reads/Read_1")).unwrap()["read_number"],
            AttrValue::Int(1)
        );
    }

    #[test]
    fn move_rejects_bad_targets() {
        let mut c = Container::in_memory();
        c.create_group(&p("a/b")).unwrap();
        c.create_group(&p("c")).unwrap();
        assert!(matches!(
            c.move_node(&p("a"), &p("a/b/inner")),
            Err(StoreError::InvalidMove { .. })
        ));
        assert!(matches!(
            c.move_node(&p("a"), &p("c")),
            Err(StoreError::AlreadyExists(_))
        ));
        assert!(matches!(
            c.move_node(&p("missing"), &p("d")),
            Err(StoreError::NotFound(_))
        ));
        assert!(c.group_exists(&p("a/b")));
    }

    #[test]
    fn move_onto_itself_is_occupied() {
        let mut c = Container::in_memory();
        c.create_group(&p("a")).unwrap();
        assert!(matches!(
            c.move_node(&p("a"), &p("a")),
            Err(StoreError::AlreadyExists(_))
        ));
    }

    #[test]
    fn rollback_restores_checkpoint() {
        let mut c = Container::in_memory();
        c.create_group(&p("keep")).unwrap();
        c.checkpoint().unwrap();
        c.create_group(&p("drop/me")).unwrap();
        c.move_node(&p("keep"), &p("moved")).unwrap();

        c.rollback().unwrap();
        assert!(c.group_exists(&p("keep")));
        assert!(c.node_kind(&p("drop")).is_none());
        assert!(c.node_kind(&p("moved")).is_none());
        assert!(matches!(c.rollback(), Err(StoreError::NoCheckpoint)));
    }

    #[test]
    fn commit_keeps_changes() {
        let mut c = Container::in_memory();
        c.checkpoint().unwrap();
        c.create_group(&p("g")).unwrap();
        c.commit();
        assert!(matches!(c.rollback(), Err(StoreError::NoCheckpoint)));
        assert!(c.group_exists(&p("g")));
    }

    #[test]
    fn closed_container_rejects_operations() {
        let mut c = Container::in_memory();
        c.create_group(&p("g")).unwrap();
        c.close().unwrap();
        assert!(matches!(c.get_attrs(&p("g")), Err(StoreError::Closed)));
        assert!(matches!(c.create_group(&p("h")), Err(StoreError::Closed)));
        assert!(c.node_kind(&p("g")).is_none());
        // Closing twice is fine
        c.close().unwrap();
    }
}
