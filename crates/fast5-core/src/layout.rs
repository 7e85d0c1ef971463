//! Physical layout names shared by inspection, migration and the analysis tree

use fast5_store::NodePath;

use crate::error::Result;

/// Root attribute holding the schema version
pub const FILE_VERSION_ATTR: &str = "file_version";
/// Attribute naming the producer of an analysis group
pub const COMPONENT_ATTR: &str = "component";
/// Attribute holding an analysis group's serialized configuration
pub const CONFIG_ATTR: &str = "config";

/// Subtree of analysis groups
pub const ANALYSES: &str = "Analyses";
/// Subtree of raw per-read data
pub const RAW: &str = "Raw";
/// Intermediate group holding per-read groups
pub const READS: &str = "Reads";
/// Canonical event-detection analysis group
pub const EVENT_DETECTION: &str = "EventDetection_000";
/// Per-read event table
pub const EVENTS: &str = "Events";
/// Per-read raw signal
pub const SIGNAL: &str = "Signal";
/// Summary subgroup of an analysis
pub const SUMMARY: &str = "Summary";

/// Container-wide metadata group
pub const GLOBAL_KEY: &str = "UniqueGlobalKey";
/// Channel metadata group under [`GLOBAL_KEY`]
pub const CHANNEL_ID: &str = "channel_id";
/// Run tracking group under [`GLOBAL_KEY`]
pub const TRACKING_ID: &str = "tracking_id";
/// Context tags group under [`GLOBAL_KEY`]
pub const CONTEXT_TAGS: &str = "context_tags";

/// Attributes that describe one read
pub const READ_ATTRS: [&str; 6] = [
    "read_number",
    "read_id",
    "start_time",
    "duration",
    "start_mux",
    "median_before",
];

/// Group name of a read: `Read_<N>`
#[must_use]
pub fn read_group_name(read_number: u32) -> String {
    format!("Read_{read_number}")
}

/// Read number from a `Read_<N>` group name
#[must_use]
pub fn parse_read_group(name: &str) -> Option<u32> {
    name.strip_prefix("Read_")?.parse().ok()
}

pub(crate) fn node(path: &str) -> Result<NodePath> {
    Ok(path.parse()?)
}

pub(crate) fn analyses_root() -> Result<NodePath> {
    node(ANALYSES)
}

/// `Analyses/<group>`; `group` may itself contain slashes
pub(crate) fn analysis_path(group: &str) -> Result<NodePath> {
    Ok(analyses_root()?.join(group)?)
}

pub(crate) fn event_detection() -> Result<NodePath> {
    Ok(analyses_root()?.child(EVENT_DETECTION)?)
}

pub(crate) fn global_key(group: &str) -> Result<NodePath> {
    Ok(node(GLOBAL_KEY)?.child(group)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_group_names() {
        assert_eq!(read_group_name(5804), "Read_5804");
        assert_eq!(parse_read_group("Read_5804"), Some(5804));
        assert_eq!(parse_read_group("Read_"), None);
        assert_eq!(parse_read_group("Reads"), None);
    }

    #[test]
    fn analysis_paths() {
        assert_eq!(
            analysis_path("Test_000/Sub1").unwrap().to_string(),
            "Analyses/Test_000/Sub1"
        );
        assert_eq!(
            event_detection().unwrap().to_string(),
            "Analyses/EventDetection_000"
        );
    }
}
