//! Legacy schema migration
//!
//! Migration walks a table of [`MigrationStep`]s, each taking the container
//! one version forward. Every step first plans its work against the
//! unmodified container, then applies it against a store checkpoint; a step
//! that fails anywhere is rolled back. The new `file_version` is written
//! only after a step's actions have all been applied.
//!
//! Built-in steps:
//! - 0.6 → 1.0: per-read groups move under an intermediate `Reads` group
//! - 1.0 → 1.1: every read gets a `Raw/Reads/Read_<N>` metadata group and
//!   every analysis gets a `component` attribute

use std::path::Path;

use fast5_store::{AttrValue, Attributes, Container, NodePath, OpenMode, Store};
use serde::Serialize;

use crate::error::{Fast5Error, Result};
use crate::layout::{
    analyses_root, event_detection, node, read_group_name, COMPONENT_ATTR, FILE_VERSION_ATTR,
    RAW, READS, READ_ATTRS,
};
use crate::naming::AnalysisName;
use crate::sanitize::encode_value;
use crate::version::{detect_version, flat_reads, SchemaVersion};

/// One structural change planned by a migration step
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Create a group (and missing parents)
    CreateGroup(NodePath),
    /// Relocate a subtree
    Move { from: NodePath, to: NodePath },
    /// Merge attributes, already in stored form
    SetAttrs { path: NodePath, attrs: Attributes },
}

impl Action {
    fn apply(&self, store: &mut dyn Store) -> Result<()> {
        match self {
            Self::CreateGroup(path) => store.create_group(path)?,
            Self::Move { from, to } => store.move_node(from, to)?,
            Self::SetAttrs { path, attrs } => store.set_attrs(path, attrs)?,
        }
        Ok(())
    }
}

/// A single forward step between schema versions
pub trait MigrationStep {
    /// Versions this step accepts
    fn sources(&self) -> &[SchemaVersion];

    /// Version the container has after this step
    fn target(&self) -> SchemaVersion;

    /// Work required to bring `store` from `from` to [`MigrationStep::target`]
    ///
    /// Must not modify the container.
    ///
    /// # Errors
    /// Returns [`Fast5Error::Migration`] if an expected legacy node is missing
    /// or a destination is already occupied
    fn plan(&self, store: &dyn Store, from: SchemaVersion) -> Result<Vec<Action>>;
}

/// Outcome of a migration run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub from: SchemaVersion,
    pub to: SchemaVersion,
    /// Version pairs of the steps that ran, in order
    pub steps: Vec<(SchemaVersion, SchemaVersion)>,
}

impl MigrationReport {
    /// True if the container was already current
    #[inline]
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Ordered table of migration steps
pub struct Migrator {
    steps: Vec<Box<dyn MigrationStep>>,
}

impl Default for Migrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Migrator {
    /// Migrator with the built-in steps
    #[must_use]
    pub fn new() -> Self {
        Self {
            steps: vec![Box::new(NestReadGroups), Box::new(RawReadMetadata)],
        }
    }

    /// Migrator with no steps
    #[must_use]
    pub fn empty() -> Self {
        Self { steps: Vec::new() }
    }

    /// Append a step; earlier steps win when sources overlap
    #[must_use]
    pub fn with_step(mut self, step: impl MigrationStep + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Bring `store` to [`SchemaVersion::CURRENT`]
    ///
    /// Each step runs against a checkpoint of the store; a step that fails
    /// is rolled back, leaving the store as the previous step left it.
    ///
    /// # Errors
    /// - [`Fast5Error::UnrecognizedSchema`] if the container cannot be classified
    /// - [`Fast5Error::Migration`] if a step cannot be planned
    /// - Store failures while applying
    pub fn run(&self, store: &mut dyn Store) -> Result<MigrationReport> {
        let start = detect_version(&*store)?;
        let mut version = start;
        let mut steps = Vec::new();

        while version.is_legacy() {
            let step = self
                .steps
                .iter()
                .find(|s| s.sources().contains(&version))
                .ok_or_else(|| {
                    Fast5Error::migration(version, SchemaVersion::CURRENT, "no migration step")
                })?;
            let target = step.target();
            if target <= version {
                return Err(Fast5Error::migration(
                    version,
                    target,
                    "step does not move the schema forward",
                ));
            }

            store.checkpoint()?;
            let actions = match apply_step(step.as_ref(), store, version) {
                Ok(actions) => {
                    store.commit();
                    actions
                }
                Err(err) => {
                    if let Err(rollback) = store.rollback() {
                        tracing::error!(error = %rollback, "failed to roll back migration step");
                    }
                    return Err(err);
                }
            };

            tracing::info!(from = %version, to = %target, actions, "migrated container");
            steps.push((version, target));
            version = target;
        }

        if steps.is_empty() {
            tracing::info!(%version, "container already current");
        }
        Ok(MigrationReport {
            from: start,
            to: version,
            steps,
        })
    }
}

/// Plan and apply one step, then record its target version
fn apply_step(
    step: &dyn MigrationStep,
    store: &mut dyn Store,
    from: SchemaVersion,
) -> Result<usize> {
    let actions = step.plan(&*store, from)?;
    for action in &actions {
        action.apply(store)?;
    }
    store.set_attrs(
        &NodePath::root(),
        &Attributes::from([(
            FILE_VERSION_ATTR.to_string(),
            AttrValue::Float(step.target().as_f64()),
        )]),
    )?;
    Ok(actions.len())
}

/// Fails unless `to` is free and no dataset sits on the way to it
fn check_destination(
    store: &dyn Store,
    to: &NodePath,
    from: SchemaVersion,
    target: SchemaVersion,
) -> Result<()> {
    if store.node_kind(to).is_some() {
        return Err(Fast5Error::migration(
            from,
            target,
            format!("destination {to} already exists"),
        ));
    }
    if let Some(blocker) = (1..to.len())
        .map(|depth| to.prefix(depth))
        .find(|ancestor| store.dataset_exists(ancestor))
    {
        return Err(Fast5Error::migration(
            from,
            target,
            format!("destination {to} is blocked by dataset {blocker}"),
        ));
    }
    Ok(())
}

/// Bring `store` to the current schema using the built-in steps
///
/// # Errors
/// See [`Migrator::run`]
pub fn migrate(store: &mut dyn Store) -> Result<MigrationReport> {
    Migrator::new().run(store)
}

/// Open the file at `path` for writing, migrate it, and close it
///
/// The file is only rewritten when every step succeeds.
///
/// # Errors
/// Returns error if the file cannot be opened, migrated or persisted
pub fn update_legacy_file(path: impl AsRef<Path>) -> Result<MigrationReport> {
    let path = path.as_ref();
    let mut container = Container::open(path, OpenMode::ReadWrite)?;
    let report = match migrate(&mut container) {
        Ok(report) => report,
        Err(err) => {
            container.discard();
            return Err(err);
        }
    };
    container.close()?;
    if !report.is_noop() {
        tracing::info!(path = %path.display(), from = %report.from, to = %report.to, "updated legacy file");
    }
    Ok(report)
}

/// 0.6 → 1.0: `Read_<N>` groups move under a `Reads` group
struct NestReadGroups;

impl NestReadGroups {
    fn nest(store: &dyn Store, parent: &NodePath, from: SchemaVersion) -> Result<Vec<Action>> {
        let reads = parent.child(READS)?;
        flat_reads(store, parent)?
            .into_iter()
            .map(|(number, path)| {
                let name = path.name().map_or_else(|| read_group_name(number), str::to_string);
                let to = reads.child(name)?;
                check_destination(store, &to, from, SchemaVersion::V1_0)?;
                Ok(Action::Move { from: path, to })
            })
            .collect()
    }
}

impl MigrationStep for NestReadGroups {
    fn sources(&self) -> &[SchemaVersion] {
        &[SchemaVersion::V0_6Raw, SchemaVersion::V0_6Single]
    }

    fn target(&self) -> SchemaVersion {
        SchemaVersion::V1_0
    }

    fn plan(&self, store: &dyn Store, from: SchemaVersion) -> Result<Vec<Action>> {
        let ed = event_detection()?;
        if !store.group_exists(&ed) {
            return Err(Fast5Error::migration(
                from,
                self.target(),
                format!("missing {ed}"),
            ));
        }
        let mut actions = Self::nest(store, &ed, from)?;

        if from == SchemaVersion::V0_6Raw {
            let raw = node(RAW)?;
            let moves = Self::nest(store, &raw, from)?;
            if moves.is_empty() {
                return Err(Fast5Error::migration(
                    from,
                    self.target(),
                    format!("no read groups under {raw}"),
                ));
            }
            actions.extend(moves);
        }

        if actions.is_empty() {
            return Err(Fast5Error::migration(
                from,
                self.target(),
                "no per-read groups to relocate",
            ));
        }
        Ok(actions)
    }
}

/// 1.0 → 1.1: raw read metadata groups and analysis components
struct RawReadMetadata;

impl MigrationStep for RawReadMetadata {
    fn sources(&self) -> &[SchemaVersion] {
        &[SchemaVersion::V1_0]
    }

    fn target(&self) -> SchemaVersion {
        SchemaVersion::V1_1
    }

    fn plan(&self, store: &dyn Store, from: SchemaVersion) -> Result<Vec<Action>> {
        let raw_reads = node(RAW)?.child(READS)?;
        let ed_reads = event_detection()?.child(READS)?;
        let existing = flat_reads(store, &raw_reads)?;
        let analysed = flat_reads(store, &ed_reads)?;
        if existing.is_empty() && analysed.is_empty() {
            return Err(Fast5Error::migration(
                from,
                self.target(),
                format!("no read metadata under {raw_reads} or {ed_reads}"),
            ));
        }

        let mut actions = Vec::new();
        for (number, source) in analysed {
            if existing.iter().any(|(n, _)| *n == number) {
                continue;
            }
            let name = source.name().map_or_else(|| read_group_name(number), str::to_string);
            let dest = raw_reads.child(name)?;
            check_destination(store, &dest, from, self.target())?;
            let attrs: Attributes = store
                .get_attrs(&source)?
                .into_iter()
                .filter(|(k, _)| READ_ATTRS.contains(&k.as_str()))
                .collect();
            actions.push(Action::CreateGroup(dest.clone()));
            actions.push(Action::SetAttrs { path: dest, attrs });
        }

        let analyses = analyses_root()?;
        if store.group_exists(&analyses) {
            for name in store.list_children(&analyses)? {
                let path = analyses.child(&name)?;
                if !store.group_exists(&path)
                    || store.get_attrs(&path)?.contains_key(COMPONENT_ATTR)
                {
                    continue;
                }
                let component = derive_component(&name);
                actions.push(Action::SetAttrs {
                    path,
                    attrs: Attributes::from([(
                        COMPONENT_ATTR.to_string(),
                        encode_value(AttrValue::Text(component))?,
                    )]),
                });
            }
        }
        Ok(actions)
    }
}

/// Component name for a legacy group: `Basecall_2D_000` → `basecall_2d`
fn derive_component(group: &str) -> String {
    let stem = AnalysisName::parse(group).map_or_else(|| group.to_string(), |n| n.stem().to_string());
    let mut out = String::with_capacity(stem.len() + 4);
    let mut prev_lower = false;
    for c in stem.chars() {
        if c.is_uppercase() && prev_lower {
            out.push('_');
        }
        prev_lower = c.is_lowercase();
        out.extend(c.to_lowercase());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use fast5_store::Data;
    use pretty_assertions::assert_eq;

    fn p(s: &str) -> NodePath {
        s.parse().unwrap()
    }

    fn read_attrs(n: i64) -> Attributes {
        Attributes::from([
            ("read_number".to_string(), AttrValue::Int(n)),
            ("start_time".to_string(), AttrValue::Int(10)),
            ("duration".to_string(), AttrValue::Int(20)),
            ("scaling_used".to_string(), AttrValue::Int(1)),
        ])
    }

    fn single_layout() -> Container {
        let mut c = Container::in_memory();
        let read = p("Analyses/EventDetection_000/Read_4");
        c.create_group(&read).unwrap();
        c.set_attrs(&read, &read_attrs(4)).unwrap();
        c
    }

    #[test]
    fn component_names() {
        assert_eq!(derive_component("EventDetection_000"), "event_detection");
        assert_eq!(derive_component("Basecall_2D_000"), "basecall_2d");
        assert_eq!(derive_component("Segment_Linear_001"), "segment_linear");
        assert_eq!(derive_component("Calibration"), "calibration");
    }

    #[test]
    fn single_layout_reaches_current() {
        let mut c = single_layout();
        let report = migrate(&mut c).unwrap();
        assert_eq!(report.from, SchemaVersion::V0_6Single);
        assert_eq!(report.to, SchemaVersion::V1_1);
        assert_eq!(
            report.steps,
            [
                (SchemaVersion::V0_6Single, SchemaVersion::V1_0),
                (SchemaVersion::V1_0, SchemaVersion::V1_1)
            ]
        );

        assert!(c.group_exists(&p("Analyses/EventDetection_000/Reads/Read_4")));
        assert!(!c.group_exists(&p("Analyses/EventDetection_000/Read_4")));
        let raw = c.get_attrs(&p("Raw/Reads/Read_4")).unwrap();
        assert_eq!(raw["read_number"], AttrValue::Int(4));
        assert!(!raw.contains_key("scaling_used"));
        let ed = c.get_attrs(&p("Analyses/EventDetection_000")).unwrap();
        assert_eq!(ed[COMPONENT_ATTR], AttrValue::Bytes(b"event_detection".to_vec()));
        assert_eq!(detect_version(&c).unwrap(), SchemaVersion::V1_1);
    }

    #[test]
    fn current_container_is_noop() {
        let mut c = single_layout();
        migrate(&mut c).unwrap();
        let mut before = single_layout();
        migrate(&mut before).unwrap();
        let report = migrate(&mut c).unwrap();
        assert!(report.is_noop());
        assert!(c.content_eq(&before));
    }

    fn raw_only_layout() -> Container {
        let mut c = Container::in_memory();
        c.create_group(&p("Raw/Read_9")).unwrap();
        c.set_attrs(&p("Raw/Read_9"), &read_attrs(9)).unwrap();
        c
    }

    #[test]
    fn missing_event_detection_fails_cleanly() {
        let mut c = raw_only_layout();

        let err = migrate(&mut c).unwrap_err();
        assert!(matches!(
            err,
            Fast5Error::Migration {
                from: SchemaVersion::V0_6Raw,
                to: SchemaVersion::V1_0,
                ..
            }
        ));
        assert!(c.content_eq(&raw_only_layout()));
    }

    #[test]
    fn occupied_destination_fails_cleanly() {
        let occupied = || {
            let mut c = single_layout();
            c.create_group(&p("Analyses/EventDetection_000/Reads/Read_4")).unwrap();
            c
        };
        let mut c = occupied();
        assert!(matches!(migrate(&mut c), Err(Fast5Error::Migration { .. })));
        assert!(c.content_eq(&occupied()));
    }

    #[test]
    fn v1_0_without_reads_fails() {
        let mut c = Container::in_memory();
        c.set_attrs(
            &NodePath::root(),
            &Attributes::from([(FILE_VERSION_ATTR.to_string(), AttrValue::Float(1.0))]),
        )
        .unwrap();
        c.create_group(&p("Analyses/EventDetection_000")).unwrap();
        let err = migrate(&mut c).unwrap_err();
        assert!(matches!(
            err,
            Fast5Error::Migration {
                from: SchemaVersion::V1_0,
                to: SchemaVersion::V1_1,
                ..
            }
        ));
        assert_eq!(detect_version(&c).unwrap(), SchemaVersion::V1_0);
    }

    #[test]
    fn dataset_on_destination_path_fails_cleanly() {
        let blocked = || {
            let mut c = raw_only_layout();
            c.create_group(&p("Analyses/EventDetection_000/Read_9")).unwrap();
            c.create_dataset(&p("Raw/Reads"), Data::from("stray")).unwrap();
            c
        };
        let mut c = blocked();
        let err = migrate(&mut c).unwrap_err();
        assert!(matches!(
            err,
            Fast5Error::Migration {
                from: SchemaVersion::V0_6Raw,
                to: SchemaVersion::V1_0,
                ..
            }
        ));
        assert!(err.to_string().contains("Raw/Reads"));
        assert!(c.content_eq(&blocked()));
    }

    /// Plans work that only fails once applied
    struct FailsMidway;

    impl MigrationStep for FailsMidway {
        fn sources(&self) -> &[SchemaVersion] {
            &[SchemaVersion::V0_6Single]
        }

        fn target(&self) -> SchemaVersion {
            SchemaVersion::V1_0
        }

        fn plan(&self, _store: &dyn Store, _from: SchemaVersion) -> Result<Vec<Action>> {
            Ok(vec![
                Action::Move {
                    from: p("Analyses/EventDetection_000/Read_4"),
                    to: p("Analyses/EventDetection_000/Reads/Read_4"),
                },
                Action::Move {
                    from: p("Missing"),
                    to: p("Elsewhere"),
                },
            ])
        }
    }

    #[test]
    fn failed_apply_is_rolled_back() {
        let mut c = single_layout();
        let err = Migrator::empty().with_step(FailsMidway).run(&mut c).unwrap_err();
        assert!(matches!(err, Fast5Error::Store(_)));
        assert!(c.content_eq(&single_layout()));
        assert_eq!(detect_version(&c).unwrap(), SchemaVersion::V0_6Single);
    }

    #[test]
    fn empty_migrator_reports_missing_step() {
        let mut c = single_layout();
        let err = Migrator::empty().run(&mut c).unwrap_err();
        assert!(matches!(err, Fast5Error::Migration { .. }));
    }
}
