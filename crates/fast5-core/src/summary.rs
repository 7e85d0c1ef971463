//! Per-file read summaries for reporting

use std::path::Path;

use fast5_store::{OpenMode, Store};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::{Fast5Error, Result};
use crate::file::Fast5File;
use crate::layout::{analysis_path, global_key, CHANNEL_ID, SUMMARY, TRACKING_ID};
use crate::sanitize::clean_attrs;
use crate::version::ReadInfo;

/// Summary of one container and one of its analyses
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadSummary {
    pub filename: String,
    pub channel_id: Map<String, Value>,
    /// Reads; a read without an id reports the file name instead
    pub reads: Vec<ReadInfo>,
    pub tracking_id: Map<String, Value>,
    /// Attribute tree of the analysis' `Summary` subgroup
    pub data: Map<String, Value>,
    /// Attributes of the analysis group itself
    pub software: Map<String, Value>,
}

/// Summarize the container at `path` and its latest `analysis` group
///
/// # Errors
/// - [`Fast5Error::GroupNotFound`] if no group of that component exists
/// - Open or classification failures
pub fn read_summary(path: impl AsRef<Path>, analysis: &str) -> Result<ReadSummary> {
    let path = path.as_ref();
    let file = Fast5File::open(path, OpenMode::ReadOnly)?;
    let filename = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
    file.summarize(filename, analysis)
}

impl<S: Store> Fast5File<S> {
    /// Summary of this container and its latest `analysis` group
    ///
    /// # Errors
    /// Returns [`Fast5Error::GroupNotFound`] if no group of that component exists
    pub fn summarize(&self, filename: impl Into<String>, analysis: &str) -> Result<ReadSummary> {
        let filename = filename.into();
        let group = self
            .get_latest_analysis(analysis)?
            .ok_or_else(|| Fast5Error::GroupNotFound(format!("{analysis}_NNN")))?;

        let software = clean_attrs(&self.store.get_attrs(&analysis_path(&group)?)?);
        let summary = analysis_path(&group)?.child(SUMMARY)?;
        let data = if self.store.group_exists(&summary) {
            self.attribute_tree(&summary.to_string())?
        } else {
            Map::new()
        };

        let reads = self
            .status()
            .reads
            .iter()
            .cloned()
            .map(|mut read| {
                if read.read_id.is_none() {
                    read.read_id = Some(filename.clone());
                }
                read
            })
            .collect();

        Ok(ReadSummary {
            channel_id: self.optional_global(CHANNEL_ID)?,
            tracking_id: self.optional_global(TRACKING_ID)?,
            filename,
            reads,
            data,
            software,
        })
    }

    fn optional_global(&self, group: &str) -> Result<Map<String, Value>> {
        let path = global_key(group)?;
        if !self.store.group_exists(&path) {
            return Ok(Map::new());
        }
        Ok(clean_attrs(&self.store.get_attrs(&path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fast5_store::{AttrValue, Attributes};

    #[test]
    fn summary_requires_analysis() {
        let f = Fast5File::in_memory().unwrap();
        assert!(matches!(
            f.summarize("x.fast5", "basecall"),
            Err(Fast5Error::GroupNotFound(_))
        ));
    }

    #[test]
    fn summary_collects_latest_analysis() {
        let mut f = Fast5File::in_memory().unwrap();
        f.add_analysis("basecall", None, &Attributes::from([("version".to_string(), AttrValue::from("0.1"))]))
            .unwrap();
        let latest = f
            .add_analysis("basecall", None, &Attributes::from([("version".to_string(), AttrValue::from("0.2"))]))
            .unwrap();
        f.add_analysis_subgroup(
            &latest,
            "Summary/basecall_1d",
            &Attributes::from([("mean_qscore".to_string(), AttrValue::Float(9.5))]),
        )
        .unwrap();

        let summary = f.summarize("x.fast5", "basecall").unwrap();
        assert_eq!(summary.filename, "x.fast5");
        assert_eq!(summary.software["version"], Value::from("0.2"));
        assert_eq!(summary.software["component"], Value::from("basecall"));
        assert_eq!(
            Value::Object(summary.data),
            serde_json::json!({ "basecall_1d": { "mean_qscore": 9.5 } })
        );
        assert!(summary.channel_id.is_empty());
        assert!(summary.reads.is_empty());
    }
}
