//! Testing utilities for the fast5-kit workspace
//!
//! Writers for each container layout generation, event tables and temp files.
//! Text attributes are written in encoded form, the way they sit on disk.

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use fast5_store::{
    AttrValue, Attributes, Cell, Container, Data, Field, FieldType, NodePath, OpenMode,
    RecordArray, Store, StoreResult,
};
use tempfile::TempDir;

/// One read to be laid out in a fixture container
#[derive(Debug, Clone, PartialEq)]
pub struct ReadFixture {
    pub read_number: u32,
    pub read_id: Option<String>,
    pub start_time: i64,
    pub duration: i64,
    pub start_mux: i64,
    pub event_count: usize,
    /// Raw samples; written only by layouts that carry raw data
    pub signal_len: Option<usize>,
    pub channel_number: i64,
}

impl ReadFixture {
    pub fn new(read_number: u32, event_count: usize) -> Self {
        Self {
            read_number,
            read_id: None,
            start_time: 1_000,
            duration: 4_000,
            start_mux: 1,
            event_count,
            signal_len: None,
            channel_number: 1,
        }
    }

    pub fn with_read_id(mut self, id: &str) -> Self {
        self.read_id = Some(id.to_string());
        self
    }

    /// Raw signal of `len` samples; the duration follows the sample count
    pub fn with_signal(mut self, len: usize) -> Self {
        self.signal_len = Some(len);
        self.duration = i64::try_from(len).unwrap_or(i64::MAX);
        self
    }

    pub fn with_channel(mut self, channel_number: i64) -> Self {
        self.channel_number = channel_number;
        self
    }

    fn attributes(&self) -> Attributes {
        let mut attrs = Attributes::new();
        attrs.insert("read_number".into(), AttrValue::Int(i64::from(self.read_number)));
        if let Some(id) = &self.read_id {
            attrs.insert("read_id".into(), bytes(id));
        }
        attrs.insert("start_time".into(), AttrValue::Int(self.start_time));
        attrs.insert("duration".into(), AttrValue::Int(self.duration));
        attrs.insert("start_mux".into(), AttrValue::Int(self.start_mux));
        attrs.insert("median_before".into(), AttrValue::Float(212.5));
        attrs
    }

    fn group_name(&self) -> String {
        format!("Read_{}", self.read_number)
    }
}

/// Encoded text attribute
pub fn bytes(text: &str) -> AttrValue {
    AttrValue::Bytes(text.as_bytes().to_vec())
}

pub fn path(text: &str) -> NodePath {
    text.parse().unwrap()
}

/// Event table with `mean`, `stdv`, `start` and `length` fields
pub fn event_table(count: usize) -> RecordArray {
    let fields = vec![
        Field::new("mean", FieldType::Float),
        Field::new("stdv", FieldType::Float),
        Field::new("start", FieldType::Int),
        Field::new("length", FieldType::Int),
    ];
    let mut table = RecordArray::new(fields);
    let mut start = 0_i64;
    for i in 0..count {
        let step = i64::try_from(i % 5).unwrap_or(0) + 3;
        table
            .push_row(vec![
                Cell::Float(80.0 + f64::from(u32::try_from(i % 40).unwrap_or(0)) * 0.5),
                Cell::Float(1.25),
                Cell::Int(start),
                Cell::Int(step),
            ])
            .unwrap();
        start += step;
    }
    table
}

fn signal(len: usize) -> Data {
    let samples = (0..len)
        .map(|i| 400 + i64::try_from(i % 97).unwrap_or(0))
        .collect::<Vec<_>>();
    Data::Value(AttrValue::IntArray(samples))
}

/// `UniqueGlobalKey/{channel_id,tracking_id,context_tags}`
pub fn write_global_metadata(store: &mut dyn Store, channel_number: i64) -> StoreResult<()> {
    let channel = path("UniqueGlobalKey/channel_id");
    store.create_group(&channel)?;
    store.set_attrs(
        &channel,
        &Attributes::from([
            ("channel_number".to_string(), AttrValue::Int(channel_number)),
            ("digitisation".to_string(), AttrValue::Float(8192.0)),
            ("offset".to_string(), AttrValue::Float(6.0)),
            ("range".to_string(), AttrValue::Float(1467.6)),
            ("sampling_rate".to_string(), AttrValue::Float(4000.0)),
        ]),
    )?;

    let tracking = path("UniqueGlobalKey/tracking_id");
    store.create_group(&tracking)?;
    store.set_attrs(
        &tracking,
        &Attributes::from([
            ("device_id".to_string(), bytes("MN12345")),
            ("run_id".to_string(), bytes("d1f3a5c7")),
        ]),
    )?;

    let context = path("UniqueGlobalKey/context_tags");
    store.create_group(&context)?;
    store.set_attrs(
        &context,
        &Attributes::from([("experiment_kit".to_string(), bytes("genomic_dna"))]),
    )
}

fn write_event_detection(store: &mut dyn Store, component: Option<&str>) -> StoreResult<NodePath> {
    let ed = path("Analyses/EventDetection_000");
    store.create_group(&ed)?;
    let mut attrs = Attributes::from([
        ("name".to_string(), bytes("MinKNOW Event Detection")),
        ("version".to_string(), bytes("1.1")),
    ]);
    if let Some(component) = component {
        attrs.insert("component".to_string(), bytes(component));
    }
    store.set_attrs(&ed, &attrs)?;
    Ok(ed)
}

fn write_read(store: &mut dyn Store, group: &NodePath, read: &ReadFixture, events: bool) -> StoreResult<()> {
    store.create_group(group)?;
    store.set_attrs(group, &read.attributes())?;
    if events {
        store.create_dataset(&group.child("Events")?, event_table(read.event_count).into())?;
    }
    Ok(())
}

fn set_file_version(store: &mut dyn Store, version: f64) -> StoreResult<()> {
    store.set_attrs(
        &NodePath::root(),
        &Attributes::from([("file_version".to_string(), AttrValue::Float(version))]),
    )
}

/// 0.6 layout with event detection only
pub fn write_v0_6_single(store: &mut dyn Store, read: &ReadFixture) -> StoreResult<()> {
    write_global_metadata(store, read.channel_number)?;
    let ed = write_event_detection(store, None)?;
    write_read(store, &ed.child(read.group_name())?, read, true)
}

/// 0.6 layout with raw signal groups
pub fn write_v0_6_raw(store: &mut dyn Store, read: &ReadFixture) -> StoreResult<()> {
    write_v0_6_single(store, read)?;
    let raw = path("Raw").child(read.group_name())?;
    write_read(store, &raw, read, false)?;
    store.create_dataset(&raw.child("Signal")?, signal(read.signal_len.unwrap_or(0)))
}

/// 1.0 layout: reads under `Reads`, no raw metadata, no components
pub fn write_v1_0(store: &mut dyn Store, read: &ReadFixture) -> StoreResult<()> {
    set_file_version(store, 1.0)?;
    write_global_metadata(store, read.channel_number)?;
    let ed = write_event_detection(store, None)?;
    write_read(store, &ed.child("Reads")?.child(read.group_name())?, read, true)
}

/// 1.1 layout
pub fn write_v1_1(store: &mut dyn Store, read: &ReadFixture) -> StoreResult<()> {
    set_file_version(store, 1.1)?;
    write_global_metadata(store, read.channel_number)?;
    let ed = write_event_detection(store, Some("event_detection"))?;
    write_read(store, &ed.child("Reads")?.child(read.group_name())?, read, true)?;
    let raw = path("Raw/Reads").child(read.group_name())?;
    write_read(store, &raw, read, false)?;
    if let Some(len) = read.signal_len {
        store.create_dataset(&raw.child("Signal")?, signal(len))?;
    }
    Ok(())
}

/// Layout writer signature shared by the `write_*` functions
pub type LayoutWriter = fn(&mut dyn Store, &ReadFixture) -> StoreResult<()>;

/// Write a fixture file named `name` into `dir`
pub fn fixture_file(dir: &Path, name: &str, writer: LayoutWriter, read: &ReadFixture) -> PathBuf {
    let file = dir.join(name);
    let mut container = Container::open(&file, OpenMode::Create).unwrap();
    writer(&mut container, read).unwrap();
    container.close().unwrap();
    file
}

/// Fresh temporary directory, removed on drop
pub fn temp_dir() -> TempDir {
    tempfile::tempdir().unwrap()
}
