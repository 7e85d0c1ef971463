//! Node paths for addressing within a container
//!
//! Provides [`NodePath`] for slash-delimited addressing of groups and datasets.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Path of a node inside a container, rooted at the container root
///
/// Groups and datasets share one namespace, so a path names exactly one node.
///
/// # Examples
/// - `["Analyses", "EventDetection_000"]` → `Analyses/EventDetection_000`
/// - `["Raw", "Reads", "Read_5804", "Signal"]` → `Raw/Reads/Read_5804/Signal`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodePath(Vec<String>);

impl NodePath {
    /// Create new path from segments
    ///
    /// # Errors
    /// Returns error if any segment is empty or contains a slash
    pub fn new(segments: Vec<String>) -> Result<Self, PathError> {
        for seg in &segments {
            validate_segment(seg)?;
        }
        Ok(Self(segments))
    }

    /// The container root
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Get path segments
    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    /// Get number of segments
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if path is the root
    #[inline]
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Same as [`NodePath::is_root`]
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get parent path (if not root)
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// The first `len` segments (the whole path if `len` exceeds it)
    #[inline]
    #[must_use]
    pub fn prefix(&self, len: usize) -> Self {
        Self(self.0[..len.min(self.0.len())].to_vec())
    }

    /// Name of the addressed node (last segment), `None` for the root
    #[inline]
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Append a child name, returning new path
    ///
    /// # Errors
    /// Returns error if `name` is empty or contains a slash
    pub fn child(&self, name: impl Into<String>) -> Result<Self, PathError> {
        let name = name.into();
        validate_segment(&name)?;
        let mut new = self.clone();
        new.0.push(name);
        Ok(new)
    }

    /// Append a relative slash-delimited path, returning new path
    ///
    /// # Errors
    /// Returns error if `relative` contains empty segments
    pub fn join(&self, relative: &str) -> Result<Self, PathError> {
        let tail: NodePath = relative.parse()?;
        let mut new = self.clone();
        new.0.extend(tail.0);
        Ok(new)
    }

    /// Check if this path is a prefix of another
    ///
    /// # Examples
    /// - `Analyses` is prefix of `Analyses/Basecall_1D_000`
    /// - `Analyses/Basecall` is NOT prefix of `Analyses/Basecall_1D_000`
    #[inline]
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        if self.0.len() > other.0.len() {
            return false;
        }
        self.0 == other.0[..self.0.len()]
    }

    /// Check if this path is an ancestor of another (strict prefix)
    #[inline]
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        self.0.len() < other.0.len() && self.is_prefix_of(other)
    }

    /// Iterator over segments from root to leaf
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

fn validate_segment(seg: &str) -> Result<(), PathError> {
    if seg.is_empty() {
        Err(PathError::EmptySegment)
    } else if seg.contains('/') {
        Err(PathError::InvalidSegment(seg.to_string()))
    } else {
        Ok(())
    }
}

impl Display for NodePath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "/");
        }
        write!(f, "{}", self.0.join("/"))
    }
}

impl FromStr for NodePath {
    type Err = PathError;

    /// Parse `a/b/c`; a single leading slash is accepted, `/` alone is the root.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.strip_prefix('/').unwrap_or(s);
        if trimmed.is_empty() {
            return Ok(Self::root());
        }

        let segments: Vec<String> = trimmed
            .split('/')
            .map(|seg| {
                if seg.is_empty() {
                    Err(PathError::EmptySegment)
                } else {
                    Ok(seg.to_string())
                }
            })
            .collect::<Result<_, _>>()?;

        Ok(Self(segments))
    }
}

impl Default for NodePath {
    fn default() -> Self {
        Self::root()
    }
}

/// Errors related to node paths
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Empty segment in path
    #[error("path contains empty segment")]
    EmptySegment,

    /// Segment with an embedded separator
    #[error("invalid segment: {0} (must not contain '/')")]
    InvalidSegment(String),
}
