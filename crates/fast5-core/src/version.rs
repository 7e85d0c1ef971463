//! Schema version detection and per-read metadata
//!
//! A container's version is read from the root `file_version` attribute. Containers
//! written before that attribute existed are classified by layout:
//!
//! | Version      | Marker                                                         |
//! |--------------|----------------------------------------------------------------|
//! | 0.6 (raw)    | `Raw/Read_<N>` groups                                          |
//! | 0.6 (single) | `Analyses/EventDetection_000/Read_<N>` groups                  |
//! | 1.0          | `file_version = 1.0`, reads under `.../Reads/Read_<N>`         |
//! | 1.1          | `file_version = 1.1`, every read has `Raw/Reads/Read_<N>`      |

use std::fmt;
use std::path::Path;

use fast5_store::{AttrValue, Attributes, Container, NodePath, OpenMode, Store};
use serde::Serialize;

use crate::error::{Fast5Error, Result};
use crate::layout::{
    event_detection, node, parse_read_group, read_group_name, EVENTS, FILE_VERSION_ATTR, RAW,
    READS,
};
use crate::sanitize::decode_attrs;

/// Known container schema versions, oldest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum SchemaVersion {
    /// 0.6 layout with raw signal groups
    V0_6Raw,
    /// 0.6 layout with event detection only
    V0_6Single,
    /// 1.0 layout
    V1_0,
    /// 1.1 layout
    V1_1,
}

impl SchemaVersion {
    /// Version written by this library
    pub const CURRENT: Self = Self::V1_1;

    /// Numeric `file_version` for this schema
    #[must_use]
    pub fn as_f64(self) -> f64 {
        match self {
            Self::V0_6Raw | Self::V0_6Single => 0.6,
            Self::V1_0 => 1.0,
            Self::V1_1 => 1.1,
        }
    }

    /// Whether the schema predates [`SchemaVersion::CURRENT`]
    #[inline]
    #[must_use]
    pub fn is_legacy(self) -> bool {
        self != Self::CURRENT
    }

    fn from_file_version(value: f64) -> Option<Self> {
        if (value - 1.0).abs() < 1e-6 {
            Some(Self::V1_0)
        } else if (value - 1.1).abs() < 1e-6 {
            Some(Self::V1_1)
        } else {
            None
        }
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::V0_6Raw => write!(f, "0.6 (raw)"),
            Self::V0_6Single => write!(f, "0.6 (single)"),
            Self::V1_0 => write!(f, "1.0"),
            Self::V1_1 => write!(f, "1.1"),
        }
    }
}

/// Metadata of one read
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadInfo {
    pub read_number: u32,
    pub read_id: Option<String>,
    pub start_time: f64,
    pub duration: f64,
    pub start_mux: Option<u8>,
    pub median_before: Option<f64>,
    /// Row count of the read's event table, if it has one
    pub event_data_count: Option<usize>,
}

impl ReadInfo {
    fn from_attrs(
        read_number: u32,
        attrs: &Attributes,
        location: &NodePath,
        event_data_count: Option<usize>,
    ) -> Result<Self> {
        let number = |key: &str| -> Result<f64> {
            attrs.get(key).and_then(AttrValue::as_f64).ok_or_else(|| {
                Fast5Error::UnrecognizedSchema(format!(
                    "read group {location} has no numeric '{key}'"
                ))
            })
        };

        let read_number = match attrs.get("read_number").and_then(AttrValue::as_i64) {
            Some(n) => u32::try_from(n).map_err(|_| {
                Fast5Error::UnrecognizedSchema(format!("read group {location} has read_number {n}"))
            })?,
            None => read_number,
        };

        Ok(Self {
            read_number,
            read_id: attrs
                .get("read_id")
                .and_then(AttrValue::as_text)
                .map(str::to_string),
            start_time: number("start_time")?,
            duration: number("duration")?,
            start_mux: attrs
                .get("start_mux")
                .and_then(AttrValue::as_i64)
                .map(|m| {
                    u8::try_from(m).map_err(|_| {
                        Fast5Error::UnrecognizedSchema(format!(
                            "read group {location} has start_mux {m}"
                        ))
                    })
                })
                .transpose()?,
            median_before: attrs.get("median_before").and_then(AttrValue::as_f64),
            event_data_count,
        })
    }
}

/// Version and read inventory of a container
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Fast5Info {
    pub version: SchemaVersion,
    /// Reads ordered by read number
    pub reads: Vec<ReadInfo>,
}

impl Fast5Info {
    /// Classify `store` and collect its read metadata
    ///
    /// # Errors
    /// - [`Fast5Error::UnrecognizedSchema`] if no known layout matches
    /// - Store failures while reading attributes
    pub fn inspect<S: Store + ?Sized>(store: &S) -> Result<Self> {
        let version = detect_version(store)?;
        let mut reads = Vec::new();
        for (number, metadata) in read_groups(store, version)? {
            let events = events_path(version, number)?;
            let count = if store.dataset_exists(&events) {
                Some(store.read_dataset(&events)?.len())
            } else {
                None
            };
            let attrs = decode_attrs(store.get_attrs(&metadata)?)?;
            reads.push(ReadInfo::from_attrs(number, &attrs, &metadata, count)?);
        }
        reads.sort_by_key(|r| r.read_number);
        tracing::debug!(%version, reads = reads.len(), "inspected container");
        Ok(Self { version, reads })
    }

    /// Open the file at `path` read-only and inspect it
    ///
    /// # Errors
    /// Returns error if the file cannot be opened or classified
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let container = Container::open(path, OpenMode::ReadOnly)?;
        Self::inspect(&container)
    }

    /// Numeric `file_version` of the container
    #[inline]
    #[must_use]
    pub fn version_number(&self) -> f64 {
        self.version.as_f64()
    }

    /// Metadata of the given read
    #[must_use]
    pub fn read(&self, read_number: u32) -> Option<&ReadInfo> {
        self.reads.iter().find(|r| r.read_number == read_number)
    }
}

/// Schema version of `store`
///
/// # Errors
/// Returns [`Fast5Error::UnrecognizedSchema`] if neither the version
/// attribute nor the layout identifies a known schema
pub fn detect_version<S: Store + ?Sized>(store: &S) -> Result<SchemaVersion> {
    let root = decode_attrs(store.get_attrs(&NodePath::root())?)?;
    let Some(value) = root.get(FILE_VERSION_ATTR) else {
        return infer_legacy(store);
    };
    let number = match value {
        AttrValue::Text(s) => s.trim().parse::<f64>().ok(),
        other => other.as_f64(),
    }
    .ok_or_else(|| {
        Fast5Error::UnrecognizedSchema(format!("{FILE_VERSION_ATTR} holds a {}", value.kind()))
    })?;

    if let Some(version) = SchemaVersion::from_file_version(number) {
        return Ok(version);
    }
    if (number - 0.6).abs() < 1e-6 {
        return infer_legacy(store);
    }
    Err(Fast5Error::UnrecognizedSchema(format!(
        "unknown {FILE_VERSION_ATTR} {number}"
    )))
}

fn infer_legacy<S: Store + ?Sized>(store: &S) -> Result<SchemaVersion> {
    if !flat_reads(store, &node(RAW)?)?.is_empty() {
        Ok(SchemaVersion::V0_6Raw)
    } else if !flat_reads(store, &event_detection()?)?.is_empty() {
        Ok(SchemaVersion::V0_6Single)
    } else {
        Err(Fast5Error::UnrecognizedSchema(
            "no file_version attribute and no legacy read groups".into(),
        ))
    }
}

/// `Read_<N>` groups directly under `parent`, in creation order
pub(crate) fn flat_reads<S: Store + ?Sized>(
    store: &S,
    parent: &NodePath,
) -> Result<Vec<(u32, NodePath)>> {
    if !store.group_exists(parent) {
        return Ok(Vec::new());
    }
    let mut reads = Vec::new();
    for name in store.list_children(parent)? {
        let Some(number) = parse_read_group(&name) else {
            continue;
        };
        let path = parent.child(&name)?;
        if store.group_exists(&path) {
            reads.push((number, path));
        }
    }
    Ok(reads)
}

/// Groups holding the metadata attributes of each read
fn read_groups<S: Store + ?Sized>(
    store: &S,
    version: SchemaVersion,
) -> Result<Vec<(u32, NodePath)>> {
    match version {
        SchemaVersion::V0_6Raw => flat_reads(store, &node(RAW)?),
        SchemaVersion::V0_6Single => flat_reads(store, &event_detection()?),
        SchemaVersion::V1_0 | SchemaVersion::V1_1 => {
            let raw = flat_reads(store, &node(RAW)?.child(READS)?)?;
            if raw.is_empty() {
                flat_reads(store, &event_detection()?.child(READS)?)
            } else {
                Ok(raw)
            }
        }
    }
}

pub(crate) fn events_path(version: SchemaVersion, read_number: u32) -> Result<NodePath> {
    let ed = event_detection()?;
    let read = match version {
        SchemaVersion::V0_6Raw | SchemaVersion::V0_6Single => ed.child(&read_group_name(read_number))?,
        SchemaVersion::V1_0 | SchemaVersion::V1_1 => {
            ed.child(READS)?.child(&read_group_name(read_number))?
        }
    };
    Ok(read.child(EVENTS)?)
}

pub(crate) fn raw_read_path(version: SchemaVersion, read_number: u32) -> Result<NodePath> {
    let raw = node(RAW)?;
    Ok(match version {
        SchemaVersion::V0_6Raw | SchemaVersion::V0_6Single => {
            raw.child(&read_group_name(read_number))?
        }
        SchemaVersion::V1_0 | SchemaVersion::V1_1 => {
            raw.child(READS)?.child(&read_group_name(read_number))?
        }
    })
}
