//! Analysis configuration
//!
//! A configuration is a two-level mapping of section to key to value, all
//! text. It is stored on its analysis group as a JSON string in the `config`
//! attribute, and can be exchanged with INI-style text.

use std::ops::Index;

use fast5_store::{AttrValue, Attributes, Store};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{Fast5Error, Result};
use crate::file::Fast5File;
use crate::layout::{analysis_path, CONFIG_ATTR};

/// Errors while encoding or decoding a configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config text at line {line}: {message}")]
    Ini { line: usize, message: String },

    #[error("config attribute holds a {0}, expected text")]
    NotText(&'static str),
}

/// Section → key → value configuration of an analysis
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfigMapping(IndexMap<String, IndexMap<String, String>>);

impl ConfigMapping {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` in `section`, creating the section if needed
    pub fn set(
        &mut self,
        section: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> &mut Self {
        self.0
            .entry(section.into())
            .or_default()
            .insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.0.get(section)?.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn section(&self, name: &str) -> Option<&IndexMap<String, String>> {
        self.0.get(name)
    }

    /// Section names in insertion order
    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse the stored JSON form
    ///
    /// # Errors
    /// Returns error if `text` is not a JSON object of string-valued objects
    pub fn from_json(text: &str) -> std::result::Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Serialize to the stored JSON form
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_json(&self) -> std::result::Result<String, ConfigError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse INI-style text
    ///
    /// `[section]` headers open sections; entries are `key = value` or
    /// `key: value`. Blank lines and lines starting with `#` or `;` are
    /// ignored.
    ///
    /// # Errors
    /// Returns error for an entry outside a section or a malformed line
    pub fn from_ini(text: &str) -> std::result::Result<Self, ConfigError> {
        let mut config = Self::new();
        let mut current: Option<String> = None;

        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            let error = |message: &str| ConfigError::Ini {
                line: idx + 1,
                message: message.to_string(),
            };

            if let Some(header) = line.strip_prefix('[') {
                let name = header
                    .strip_suffix(']')
                    .ok_or_else(|| error("unterminated section header"))?
                    .trim();
                if name.is_empty() {
                    return Err(error("empty section name"));
                }
                config.0.entry(name.to_string()).or_default();
                current = Some(name.to_string());
                continue;
            }

            let (key, value) = line
                .split_once(['=', ':'])
                .ok_or_else(|| error("expected 'key = value'"))?;
            let section = current
                .as_deref()
                .ok_or_else(|| error("entry before any section header"))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(error("empty key"));
            }
            config.set(section, key, value.trim());
        }
        Ok(config)
    }

    /// Render as INI-style text
    #[must_use]
    pub fn to_ini(&self) -> String {
        let mut out = String::new();
        for (i, (section, entries)) in self.0.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push('[');
            out.push_str(section);
            out.push_str("]\n");
            for (key, value) in entries {
                out.push_str(key);
                out.push_str(" = ");
                out.push_str(value);
                out.push('\n');
            }
        }
        out
    }
}

impl Index<&str> for ConfigMapping {
    type Output = IndexMap<String, String>;

    /// # Panics
    /// Panics if the section does not exist
    fn index(&self, section: &str) -> &Self::Output {
        &self.0[section]
    }
}

impl From<IndexMap<String, IndexMap<String, String>>> for ConfigMapping {
    fn from(sections: IndexMap<String, IndexMap<String, String>>) -> Self {
        Self(sections)
    }
}

impl<S, K, V> FromIterator<(S, K, V)> for ConfigMapping
where
    S: Into<String>,
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (S, K, V)>>(iter: I) -> Self {
        let mut config = Self::new();
        for (section, key, value) in iter {
            config.set(section, key, value);
        }
        config
    }
}

impl<S: Store> Fast5File<S> {
    /// Store `config` on the analysis group `group_name`
    ///
    /// # Errors
    /// Returns [`Fast5Error::GroupNotFound`] if the group does not exist
    pub fn set_analysis_config(&mut self, group_name: &str, config: &ConfigMapping) -> Result<()> {
        self.ensure_current()?;
        let path = analysis_path(group_name)?;
        self.ensure_group(&path)?;
        let attrs = Attributes::from([(CONFIG_ATTR.to_string(), AttrValue::Text(config.to_json()?))]);
        self.write_attrs(&path, &attrs)
    }

    /// Configuration stored on the analysis group `group_name`
    ///
    /// # Errors
    /// - [`Fast5Error::GroupNotFound`] if the group does not exist
    /// - [`Fast5Error::AttributeNotFound`] if no configuration was stored
    pub fn get_analysis_config(&self, group_name: &str) -> Result<ConfigMapping> {
        let path = analysis_path(group_name)?;
        self.ensure_group(&path)?;
        let attrs = self.read_attrs(&path)?;
        let value = attrs
            .get(CONFIG_ATTR)
            .ok_or_else(|| Fast5Error::attribute_not_found(&path, CONFIG_ATTR))?;
        let text = value
            .as_text()
            .ok_or_else(|| ConfigError::NotText(value.kind()))?;
        Ok(ConfigMapping::from_json(text)?)
    }
}
