//! fast5 Core
//!
//! Read, migrate and annotate fast5 read containers.
//!
//! # Core Concepts
//!
//! - [`Fast5File`]: an open container plus its inspected [`Fast5Info`]
//! - [`SchemaVersion`]: the layout generation of a container; legacy layouts
//!   are brought forward with [`migrate`] or [`update_legacy_file`]
//! - Analysis groups: `Analyses/<component>_<NNN>` groups created with
//!   [`Fast5File::add_analysis`], linked by provenance chains and carrying
//!   a [`ConfigMapping`]
//! - The sanitizer: text is stored encoded and read back as native strings
//!
//! # Example
//!
//! ```rust
//! use fast5_core::{Attributes, ConfigMapping, Fast5File};
//!
//! # fn main() -> fast5_core::Result<()> {
//! let mut file = Fast5File::in_memory()?;
//! let group = file.add_analysis("basecall", None, &Attributes::new())?;
//! assert_eq!(group, "basecall_000");
//!
//! let config: ConfigMapping = [("general", "model", "r9")].into_iter().collect();
//! file.set_analysis_config(&group, &config)?;
//! assert_eq!(file.get_analysis_config(&group)?.get("general", "model"), Some("r9"));
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
mod analysis;
mod config;
mod error;
mod file;
mod layout;
mod migrate;
mod naming;
mod provenance;
mod sanitize;
mod summary;
mod version;

// Re-exports
pub use config::{ConfigError, ConfigMapping};
pub use error::{Fast5Error, Result};
pub use file::Fast5File;
pub use layout::{
    parse_read_group, read_group_name, ANALYSES, CHANNEL_ID, COMPONENT_ATTR, CONFIG_ATTR,
    CONTEXT_TAGS, EVENTS, EVENT_DETECTION, FILE_VERSION_ATTR, GLOBAL_KEY, RAW, READS, READ_ATTRS,
    SIGNAL, SUMMARY, TRACKING_ID,
};
pub use migrate::{migrate, update_legacy_file, Action, MigrationReport, MigrationStep, Migrator};
pub use naming::{AnalysisName, MAX_INDEX};
pub use sanitize::{
    clean_attrs, clean_value, decode_attrs, decode_value, encode_attrs, encode_value,
    sanitize_for_reading, sanitize_for_writing,
};
pub use summary::{read_summary, ReadSummary};
pub use version::{detect_version, Fast5Info, ReadInfo, SchemaVersion};

pub use fast5_store::{
    AttrValue, Attributes, Cell, Container, Data, Field, FieldType, NodePath, OpenMode,
    RecordArray, Store, StoreError,
};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Schema version written by this crate
pub const CURRENT_VERSION: SchemaVersion = SchemaVersion::CURRENT;
