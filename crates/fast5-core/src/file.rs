//! Container handle
//!
//! [`Fast5File`] owns a store and the status obtained by inspecting it. All
//! attribute traffic goes through the sanitizer: text is encoded on the way
//! in and decoded on the way out.

use std::path::Path;

use fast5_store::{AttrValue, Attributes, Container, Data, NodePath, OpenMode, Store};

use crate::error::{Fast5Error, Result};
use crate::layout::{global_key, CHANNEL_ID, CONTEXT_TAGS, FILE_VERSION_ATTR, SIGNAL, TRACKING_ID};
use crate::migrate::{migrate, MigrationReport};
use crate::sanitize::{decode_attrs, decode_value, encode_attrs, sanitize_for_reading};
use crate::version::{raw_read_path, Fast5Info, SchemaVersion};

/// An open fast5 container
#[derive(Debug)]
pub struct Fast5File<S = Container> {
    pub(crate) store: S,
    info: Fast5Info,
}

impl Fast5File<Container> {
    /// Open the container at `path`
    ///
    /// A container created with [`OpenMode::Create`] starts at the current
    /// schema version.
    ///
    /// # Errors
    /// Returns error if the file cannot be opened or its schema is not recognized
    pub fn open(path: impl AsRef<Path>, mode: OpenMode) -> Result<Self> {
        let path = path.as_ref();
        tracing::debug!(path = %path.display(), ?mode, "opening container");
        Self::from_store(Container::open(path, mode)?)
    }

    /// Create a new container at `path`, replacing any existing file
    ///
    /// # Errors
    /// Returns error if the file cannot be written
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        Self::open(path, OpenMode::Create)
    }

    /// New container that lives only in memory
    ///
    /// # Errors
    /// Infallible in practice; kept fallible for symmetry with [`Fast5File::open`]
    pub fn in_memory() -> Result<Self> {
        Self::from_store(Container::in_memory())
    }

    /// Backing file, if any
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.store.path()
    }
}

impl<S: Store> Fast5File<S> {
    /// Wrap an existing store
    ///
    /// An empty writable store is stamped with the current schema version.
    ///
    /// # Errors
    /// Returns [`Fast5Error::UnrecognizedSchema`] if the store is not empty
    /// and matches no known schema
    pub fn from_store(mut store: S) -> Result<Self> {
        if store.is_writable() && is_blank(&store)? {
            store.set_attrs(
                &NodePath::root(),
                &Attributes::from([(
                    FILE_VERSION_ATTR.to_string(),
                    AttrValue::Float(SchemaVersion::CURRENT.as_f64()),
                )]),
            )?;
        }
        let info = Fast5Info::inspect(&store)?;
        Ok(Self { store, info })
    }

    /// Version and read inventory captured at open time
    #[inline]
    #[must_use]
    pub fn status(&self) -> &Fast5Info {
        &self.info
    }

    #[inline]
    #[must_use]
    pub fn version(&self) -> SchemaVersion {
        self.info.version
    }

    /// Re-inspect the container
    ///
    /// # Errors
    /// Returns error if the container can no longer be classified
    pub fn refresh_status(&mut self) -> Result<&Fast5Info> {
        self.info = Fast5Info::inspect(&self.store)?;
        Ok(&self.info)
    }

    /// Migrate the container in place and refresh its status
    ///
    /// # Errors
    /// See [`crate::Migrator::run`]
    pub fn migrate(&mut self) -> Result<MigrationReport> {
        let report = migrate(&mut self.store)?;
        self.refresh_status()?;
        Ok(report)
    }

    /// Attributes of `UniqueGlobalKey/channel_id`
    ///
    /// # Errors
    /// Returns [`Fast5Error::GroupNotFound`] if the group is absent
    pub fn get_channel_info(&self) -> Result<Attributes> {
        self.global_attrs(CHANNEL_ID)
    }

    /// Attributes of `UniqueGlobalKey/tracking_id`
    ///
    /// # Errors
    /// Returns [`Fast5Error::GroupNotFound`] if the group is absent
    pub fn get_tracking_id(&self) -> Result<Attributes> {
        self.global_attrs(TRACKING_ID)
    }

    /// Attributes of `UniqueGlobalKey/context_tags`
    ///
    /// # Errors
    /// Returns [`Fast5Error::GroupNotFound`] if the group is absent
    pub fn get_context_tags(&self) -> Result<Attributes> {
        self.global_attrs(CONTEXT_TAGS)
    }

    /// Raw signal of a read; the first read when `read_number` is `None`
    ///
    /// # Errors
    /// - [`Fast5Error::GroupNotFound`] if the read is unknown
    /// - [`Fast5Error::DatasetNotFound`] if the read has no raw signal
    pub fn get_raw_data(&self, read_number: Option<u32>) -> Result<Data> {
        let number = match read_number {
            Some(n) => n,
            None => self
                .info
                .reads
                .first()
                .map(|r| r.read_number)
                .ok_or_else(|| Fast5Error::GroupNotFound("Raw/Reads".into()))?,
        };
        let read = raw_read_path(self.info.version, number)?;
        if !self.store.group_exists(&read) {
            return Err(Fast5Error::GroupNotFound(read.to_string()));
        }
        let signal = read.child(SIGNAL)?;
        if !self.store.dataset_exists(&signal) {
            return Err(Fast5Error::DatasetNotFound(signal.to_string()));
        }
        sanitize_for_reading(self.store.read_dataset(&signal)?)
    }

    #[inline]
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub fn into_store(self) -> S {
        self.store
    }

    /// Flush and release the container
    ///
    /// # Errors
    /// Returns error if pending changes cannot be persisted
    pub fn close(mut self) -> Result<()> {
        self.store.close()?;
        Ok(())
    }

    pub(crate) fn ensure_current(&self) -> Result<()> {
        if self.info.version.is_legacy() {
            return Err(Fast5Error::LegacySchema(self.info.version));
        }
        Ok(())
    }

    pub(crate) fn ensure_group(&self, path: &NodePath) -> Result<()> {
        if self.store.group_exists(path) {
            Ok(())
        } else {
            Err(Fast5Error::GroupNotFound(path.to_string()))
        }
    }

    pub(crate) fn read_attrs(&self, path: &NodePath) -> Result<Attributes> {
        decode_attrs(self.store.get_attrs(path)?)
    }

    /// One decoded attribute; other attributes of the node are not decoded
    pub(crate) fn read_attr(&self, path: &NodePath, name: &str) -> Result<Option<AttrValue>> {
        self.store
            .get_attrs(path)?
            .swap_remove(name)
            .map(decode_value)
            .transpose()
    }

    pub(crate) fn write_attrs(&mut self, path: &NodePath, attrs: &Attributes) -> Result<()> {
        if attrs.is_empty() {
            return Ok(());
        }
        self.store.set_attrs(path, &encode_attrs(attrs)?)?;
        Ok(())
    }

    fn global_attrs(&self, group: &str) -> Result<Attributes> {
        let path = global_key(group)?;
        self.ensure_group(&path)?;
        self.read_attrs(&path)
    }
}

fn is_blank<S: Store>(store: &S) -> Result<bool> {
    let root = NodePath::root();
    Ok(store.get_attrs(&root)?.is_empty() && store.list_children(&root)?.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fast5_store::StoreError;

    #[test]
    fn fresh_container_is_current() {
        let file = Fast5File::in_memory().unwrap();
        assert_eq!(file.version(), SchemaVersion::CURRENT);
        assert!(file.status().reads.is_empty());
        assert!(file.ensure_current().is_ok());
    }

    #[test]
    fn blank_read_only_store_is_unrecognized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blank.fast5");
        Container::open(&path, OpenMode::Create).unwrap().close().unwrap();
        // Create stamps nothing at the store level; only Fast5File does.
        let err = Fast5File::open(&path, OpenMode::ReadOnly).unwrap_err();
        assert!(matches!(err, Fast5Error::UnrecognizedSchema(_)));
    }

    #[test]
    fn created_file_reopens_as_current() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("new.fast5");
        Fast5File::create(&path).unwrap().close().unwrap();
        let file = Fast5File::open(&path, OpenMode::ReadOnly).unwrap();
        assert_eq!(file.version(), SchemaVersion::V1_1);
        assert_eq!(file.path(), Some(path.as_path()));
    }

    #[test]
    fn missing_global_groups() {
        let file = Fast5File::in_memory().unwrap();
        assert!(matches!(
            file.get_channel_info(),
            Err(Fast5Error::GroupNotFound(_))
        ));
        assert!(matches!(
            file.get_raw_data(None),
            Err(Fast5Error::GroupNotFound(_))
        ));
    }

    #[test]
    fn closed_file_rejects_access() {
        let file = Fast5File::in_memory().unwrap();
        let mut store = file.into_store();
        store.close().unwrap();
        assert!(matches!(
            store.get_attrs(&NodePath::root()),
            Err(StoreError::Closed)
        ));
    }
}
