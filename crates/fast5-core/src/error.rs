//! Error types for fast5 core operations
//!
//! Provides error handling for:
//! - Schema classification and legacy migration (fatal for the container)
//! - Lookups of analysis groups, attributes and datasets
//! - Text normalization at the container boundary

use fast5_store::{PathError, StoreError};

use crate::config::ConfigError;
use crate::version::SchemaVersion;

/// Main fast5 error type
#[derive(Debug, thiserror::Error)]
pub enum Fast5Error {
    /// Container layout matches no known schema version
    #[error("unrecognized schema: {0}")]
    UnrecognizedSchema(String),

    /// A migration step could not run; the container keeps its prior version
    #[error("migration from {from} to {to} failed: {reason}")]
    Migration {
        /// Version the step started from
        from: SchemaVersion,
        /// Version the step was heading to
        to: SchemaVersion,
        /// What was missing or conflicting
        reason: String,
    },

    /// Target group does not exist
    #[error("group not found: {0}")]
    GroupNotFound(String),

    /// Target attribute does not exist
    #[error("attribute '{attribute}' not found on {path}")]
    AttributeNotFound {
        /// Node the attribute was looked up on
        path: String,
        /// Attribute name
        attribute: String,
    },

    /// Target dataset does not exist
    #[error("dataset not found: {0}")]
    DatasetNotFound(String),

    /// Analysis group name already taken
    #[error("group already exists: {0}")]
    DuplicateGroup(String),

    /// Text value that cannot be encoded or decoded
    #[error("unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    /// Malformed analysis group or component name
    #[error("invalid analysis name: {0}")]
    InvalidName(String),

    /// Write attempted before the container was migrated
    #[error("container uses legacy schema {0}; migrate it before modifying analyses")]
    LegacySchema(SchemaVersion),

    /// Analysis configuration could not be (de)serialized
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Malformed node path
    #[error("invalid path: {0}")]
    Path(#[from] PathError),

    /// Underlying container failure
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl Fast5Error {
    /// Create migration error for a version step
    pub fn migration(from: SchemaVersion, to: SchemaVersion, reason: impl Into<String>) -> Self {
        Self::Migration {
            from,
            to,
            reason: reason.into(),
        }
    }

    /// Create attribute-not-found error
    pub fn attribute_not_found(path: impl ToString, attribute: impl Into<String>) -> Self {
        Self::AttributeNotFound {
            path: path.to_string(),
            attribute: attribute.into(),
        }
    }

    /// Check if the container should be treated as unusable
    #[inline]
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::UnrecognizedSchema(_) | Self::Migration { .. })
    }

    /// Check if the error reports a missing node or attribute
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::GroupNotFound(_) | Self::AttributeNotFound { .. } | Self::DatasetNotFound(_) => {
                true
            }
            Self::Store(err) => err.is_not_found(),
            _ => false,
        }
    }
}

/// Result type alias for fast5 operations
pub type Result<T> = std::result::Result<T, Fast5Error>;
