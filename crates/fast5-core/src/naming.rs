//! Analysis group names: `<stem>_<NNN>`

use std::fmt;
use std::str::FromStr;

use crate::error::{Fast5Error, Result};

/// Highest index an analysis group name can carry
pub const MAX_INDEX: u16 = 999;

/// Parsed analysis group name
///
/// # Invariants
/// - `stem` is non-empty and contains no `/`
/// - `index` is at most [`MAX_INDEX`] and renders as three digits
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AnalysisName {
    stem: String,
    index: u16,
}

impl AnalysisName {
    /// Create a name from its parts
    ///
    /// # Errors
    /// Returns [`Fast5Error::InvalidName`] for an empty or nested stem, or an
    /// index above [`MAX_INDEX`]
    pub fn new(stem: impl Into<String>, index: u32) -> Result<Self> {
        let stem = stem.into();
        if stem.is_empty() || stem.contains('/') {
            return Err(Fast5Error::InvalidName(format!(
                "'{stem}' is not a valid component name"
            )));
        }
        let index = u16::try_from(index)
            .ok()
            .filter(|i| *i <= MAX_INDEX)
            .ok_or_else(|| {
                Fast5Error::InvalidName(format!("{stem}: index {index} exceeds {MAX_INDEX}"))
            })?;
        Ok(Self { stem, index })
    }

    /// Split `name` into stem and index; `None` if it has no `_NNN` suffix
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let (stem, digits) = name.rsplit_once('_')?;
        if stem.is_empty() || digits.len() != 3 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        Some(Self {
            stem: stem.to_string(),
            index: digits.parse().ok()?,
        })
    }

    #[inline]
    #[must_use]
    pub fn stem(&self) -> &str {
        &self.stem
    }

    #[inline]
    #[must_use]
    pub fn index(&self) -> u16 {
        self.index
    }

    /// Name with the following index
    ///
    /// # Errors
    /// Returns [`Fast5Error::InvalidName`] once the index space is exhausted
    pub fn next(&self) -> Result<Self> {
        Self::new(self.stem.clone(), u32::from(self.index) + 1)
    }
}

impl fmt::Display for AnalysisName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{:03}", self.stem, self.index)
    }
}

impl FromStr for AnalysisName {
    type Err = Fast5Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| Fast5Error::InvalidName(s.to_string()))
    }
}
