use fast5_store::{
    AttrValue, Attributes, Cell, Container, Data, Field, FieldType, NodePath, OpenMode,
    RecordArray, Store, StoreError,
};
use pretty_assertions::assert_eq;

fn p(s: &str) -> NodePath {
    s.parse().unwrap()
}

fn sample_table() -> RecordArray {
    RecordArray::from_rows(
        vec![
            Field::new("mean", FieldType::Float),
            Field::new("start", FieldType::Int),
            Field::new("tag", FieldType::Bytes(4)),
        ],
        vec![
            vec![Cell::Float(0.1 + 0.2), Cell::Int(7), Cell::Bytes(b"ab\0\0".to_vec())],
            vec![Cell::Float(-3.25e-7), Cell::Int(-1), Cell::Bytes(b"wxyz".to_vec())],
        ],
    )
    .unwrap()
}

#[test]
fn create_close_reopen_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roundtrip.fast5");

    let mut c = Container::open(&path, OpenMode::Create).unwrap();
    c.create_group(&p("UniqueGlobalKey/channel_id")).unwrap();
    c.set_attrs(
        &p("UniqueGlobalKey/channel_id"),
        &Attributes::from([
            ("channel_number".to_string(), AttrValue::Int(102)),
            ("sampling_rate".to_string(), AttrValue::Float(4000.0)),
        ]),
    )
    .unwrap();
    c.create_dataset(&p("Analyses/EventDetection_000/Events"), sample_table().into())
        .unwrap();
    c.close().unwrap();

    let reopened = Container::open(&path, OpenMode::ReadOnly).unwrap();
    let attrs = reopened.get_attrs(&p("UniqueGlobalKey/channel_id")).unwrap();
    assert_eq!(attrs["channel_number"], AttrValue::Int(102));
    assert_eq!(
        reopened
            .read_dataset(&p("Analyses/EventDetection_000/Events"))
            .unwrap(),
        Data::Records(sample_table())
    );
}

#[test]
fn create_writes_file_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fresh.fast5");
    let _c = Container::open(&path, OpenMode::Create).unwrap();
    assert!(path.exists());
}

#[test]
fn drop_without_close_still_persists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dropped.fast5");
    {
        let mut c = Container::open(&path, OpenMode::Create).unwrap();
        c.create_group(&p("Raw/Reads/Read_1")).unwrap();
    }
    let c = Container::open(&path, OpenMode::ReadOnly).unwrap();
    assert!(c.group_exists(&p("Raw/Reads/Read_1")));
}

#[test]
fn read_only_rejects_writes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ro.fast5");
    Container::open(&path, OpenMode::Create).unwrap().close().unwrap();

    let mut c = Container::open(&path, OpenMode::ReadOnly).unwrap();
    assert!(!c.is_writable());
    assert!(matches!(c.create_group(&p("g")), Err(StoreError::ReadOnly)));
    assert!(matches!(
        c.create_dataset(&p("g/d"), Data::from("x")),
        Err(StoreError::ReadOnly)
    ));
}

#[test]
fn open_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Container::open(dir.path().join("absent.fast5"), OpenMode::ReadWrite).unwrap_err();
    assert!(matches!(err, StoreError::Io { .. }));
}

#[test]
fn open_garbage_is_corrupt() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("garbage.fast5");
    std::fs::write(&path, b"not a container").unwrap();
    let err = Container::open(&path, OpenMode::ReadOnly).unwrap_err();
    assert!(matches!(err, StoreError::Corrupt { .. }));
}

#[test]
fn discard_keeps_last_persisted_image() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("discard.fast5");
    {
        let mut c = Container::open(&path, OpenMode::Create).unwrap();
        c.create_group(&p("Raw")).unwrap();
        c.close().unwrap();
    }
    let before = std::fs::read(&path).unwrap();

    let mut c = Container::open(&path, OpenMode::ReadWrite).unwrap();
    c.create_group(&p("Raw/Reads")).unwrap();
    assert!(c.is_dirty());
    c.discard();
    assert!(matches!(c.get_attrs(&p("Raw")), Err(StoreError::Closed)));
    drop(c);

    assert_eq!(std::fs::read(&path).unwrap(), before);
}
