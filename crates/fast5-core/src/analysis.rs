//! Analysis tree management
//!
//! Analysis groups live under `Analyses/` and are named `<component>_<NNN>`.
//! Each carries a `component` attribute naming its producer. Writes require
//! a container at the current schema version.

use fast5_store::{AttrValue, Attributes, Data, NodePath, Store};
use serde_json::{Map, Value};

use crate::error::{Fast5Error, Result};
use crate::file::Fast5File;
use crate::layout::{analyses_root, analysis_path, COMPONENT_ATTR};
use crate::naming::AnalysisName;
use crate::sanitize::{clean_value, sanitize_for_reading, sanitize_for_writing};

impl<S: Store> Fast5File<S> {
    /// Create an analysis group for `component`
    ///
    /// With no `group_name`, the next free `<component>_<NNN>` is allocated.
    /// The `component` attribute always reflects `component`, even if
    /// `attrs` carries one.
    ///
    /// # Errors
    /// - [`Fast5Error::DuplicateGroup`] if the group already exists
    /// - [`Fast5Error::InvalidName`] if the index space is exhausted
    /// - [`Fast5Error::LegacySchema`] before migration
    pub fn add_analysis(
        &mut self,
        component: &str,
        group_name: Option<&str>,
        attrs: &Attributes,
    ) -> Result<String> {
        self.ensure_current()?;
        let name = match group_name {
            Some(name) => name.to_string(),
            None => self.next_analysis_name(component)?.to_string(),
        };
        let path = analysis_path(&name)?;
        if self.store.node_kind(&path).is_some() {
            return Err(Fast5Error::DuplicateGroup(name));
        }

        let mut all = attrs.clone();
        all.insert(COMPONENT_ATTR.to_string(), AttrValue::from(component));
        self.add_group(&path, &all)?;
        tracing::debug!(component, group = %name, "added analysis");
        Ok(name)
    }

    /// Create `subgroup` (which may be nested) under an existing analysis group
    ///
    /// # Errors
    /// Returns [`Fast5Error::GroupNotFound`] if `group_name` does not exist
    pub fn add_analysis_subgroup(
        &mut self,
        group_name: &str,
        subgroup: &str,
        attrs: &Attributes,
    ) -> Result<()> {
        self.ensure_current()?;
        let parent = analysis_path(group_name)?;
        self.ensure_group(&parent)?;
        self.add_group(&parent.join(subgroup)?, attrs)
    }

    /// Merge `attrs` into the analysis group at `path` (relative to `Analyses/`)
    ///
    /// # Errors
    /// Returns [`Fast5Error::GroupNotFound`] if the group does not exist
    pub fn add_analysis_attributes(&mut self, path: &str, attrs: &Attributes) -> Result<()> {
        self.ensure_current()?;
        let path = analysis_path(path)?;
        self.ensure_group(&path)?;
        self.write_attrs(&path, attrs)
    }

    /// Attributes of the analysis group at `path` (relative to `Analyses/`)
    ///
    /// # Errors
    /// Returns [`Fast5Error::GroupNotFound`] if the group does not exist
    pub fn get_analysis_attributes(&self, path: &str) -> Result<Attributes> {
        let path = analysis_path(path)?;
        self.ensure_group(&path)?;
        self.read_attrs(&path)
    }

    /// Store a dataset inside an analysis group
    ///
    /// Nothing is written unless the group exists and `data` can be encoded.
    ///
    /// # Errors
    /// - [`Fast5Error::GroupNotFound`] if `group_name` does not exist
    /// - [`Fast5Error::UnsupportedEncoding`] if text cannot be encoded
    pub fn add_analysis_dataset(
        &mut self,
        group_name: &str,
        dataset_name: &str,
        data: Data,
        attrs: Option<&Attributes>,
    ) -> Result<()> {
        self.ensure_current()?;
        let group = analysis_path(group_name)?;
        self.ensure_group(&group)?;
        let path = group.join(dataset_name)?;
        let encoded = sanitize_for_writing(data)?;
        self.store.create_dataset(&path, encoded)?;
        if let Some(attrs) = attrs {
            self.write_attrs(&path, attrs)?;
        }
        Ok(())
    }

    /// Read a dataset from an analysis group
    ///
    /// # Errors
    /// - [`Fast5Error::GroupNotFound`] if `group_name` does not exist
    /// - [`Fast5Error::DatasetNotFound`] if the dataset does not exist
    pub fn get_analysis_dataset(&self, group_name: &str, dataset_name: &str) -> Result<Data> {
        let group = analysis_path(group_name)?;
        self.ensure_group(&group)?;
        let path = group.join(dataset_name)?;
        if !self.store.dataset_exists(&path) {
            return Err(Fast5Error::DatasetNotFound(path.to_string()));
        }
        sanitize_for_reading(self.store.read_dataset(&path)?)
    }

    /// `(component, group_name)` of every analysis group, optionally
    /// filtered by component
    ///
    /// Groups without a `component` attribute are skipped. Results are
    /// ordered by component, then by index. Allocated names of one component
    /// therefore come out in creation order; across components the component
    /// name decides, not creation order. Only the `component`
    /// attribute of each group is decoded.
    ///
    /// # Errors
    /// Returns error on store failures
    pub fn list_analyses(&self, component: Option<&str>) -> Result<Vec<(String, String)>> {
        let root = analyses_root()?;
        if !self.store.group_exists(&root) {
            return Ok(Vec::new());
        }
        let mut found = Vec::new();
        for name in self.store.list_children(&root)? {
            let path = root.child(&name)?;
            if !self.store.group_exists(&path) {
                continue;
            }
            let stored = self.read_attr(&path, COMPONENT_ATTR)?;
            let Some(found_component) = stored.as_ref().and_then(AttrValue::as_text) else {
                continue;
            };
            if component.is_some_and(|c| c != found_component) {
                continue;
            }
            found.push((found_component.to_string(), name));
        }
        found.sort_by_cached_key(|(component, name)| {
            (
                component.clone(),
                AnalysisName::parse(name).map(|n| n.index()),
            )
        });
        Ok(found)
    }

    /// Highest-indexed group whose stem is exactly `component`
    ///
    /// # Errors
    /// Returns error on store failures
    pub fn get_latest_analysis(&self, component: &str) -> Result<Option<String>> {
        Ok(self
            .latest_analysis_name(component)?
            .map(|name| name.to_string()))
    }

    /// Create a group anywhere in the container, merging `attrs` if it exists
    pub(crate) fn add_group(&mut self, path: &NodePath, attrs: &Attributes) -> Result<()> {
        self.store.create_group(path)?;
        self.write_attrs(path, attrs)
    }

    /// Nested JSON view of the attributes below `path` (relative to the root)
    ///
    /// Each child group maps to an object holding its cleaned attributes and
    /// its own child groups. Datasets are omitted.
    ///
    /// # Errors
    /// Returns [`Fast5Error::GroupNotFound`] if `path` is not a group
    pub fn attribute_tree(&self, path: &str) -> Result<Map<String, Value>> {
        let node = if path.trim_matches('/').is_empty() {
            NodePath::root()
        } else {
            path.parse()?
        };
        self.ensure_group(&node)?;
        self.subtree(&node)
    }

    fn subtree(&self, node: &NodePath) -> Result<Map<String, Value>> {
        let mut out = Map::new();
        for name in self.store.list_children(node)? {
            let child = node.child(&name)?;
            if !self.store.group_exists(&child) {
                continue;
            }
            let mut entry: Map<String, Value> = self
                .store
                .get_attrs(&child)?
                .iter()
                .map(|(k, v)| (k.clone(), clean_value(v)))
                .collect();
            entry.extend(self.subtree(&child)?);
            out.insert(name, Value::Object(entry));
        }
        Ok(out)
    }

    fn latest_analysis_name(&self, component: &str) -> Result<Option<AnalysisName>> {
        let root = analyses_root()?;
        if !self.store.group_exists(&root) {
            return Ok(None);
        }
        Ok(self
            .store
            .list_children(&root)?
            .iter()
            .filter_map(|name| AnalysisName::parse(name))
            .filter(|name| name.stem() == component)
            .max_by_key(AnalysisName::index))
    }

    fn next_analysis_name(&self, component: &str) -> Result<AnalysisName> {
        match self.latest_analysis_name(component)? {
            Some(latest) => latest.next(),
            None => AnalysisName::new(component, 0),
        }
    }
}
