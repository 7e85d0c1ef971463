//! Text normalization at the container boundary
//!
//! Containers persist text in its encoded form. Everything handed to the
//! store passes through [`sanitize_for_writing`] (or [`encode_attrs`]) and
//! everything read back passes through [`sanitize_for_reading`] (or
//! [`decode_attrs`]). Numeric values and fields are never touched.
//!
//! Fixed-width text fields are padded with NUL bytes on the way in and have
//! trailing NULs trimmed on the way out.

use fast5_store::{AttrValue, Attributes, Cell, Data, Field, FieldType, RecordArray};
use serde_json::{Map, Value};

use crate::error::{Fast5Error, Result};

/// Convert native text in `data` to its encoded form
///
/// # Errors
/// - A text field declared with width zero
/// - A value whose encoded length exceeds its field width
/// - Already-encoded text that is not valid UTF-8
pub fn sanitize_for_writing(data: Data) -> Result<Data> {
    match data {
        Data::Value(value) => encode_value(value).map(Data::Value),
        Data::Records(table) => encode_records(table).map(Data::Records),
    }
}

/// Convert encoded text in `data` back to native text
///
/// # Errors
/// - A text field declared with width zero
/// - Bytes that are not valid UTF-8
pub fn sanitize_for_reading(data: Data) -> Result<Data> {
    match data {
        Data::Value(value) => decode_value(value).map(Data::Value),
        Data::Records(table) => decode_records(table).map(Data::Records),
    }
}

/// Encoded form of an attribute value
///
/// Values already in encoded form must hold valid UTF-8.
///
/// # Errors
/// Returns error if encoded text is not valid UTF-8
pub fn encode_value(value: AttrValue) -> Result<AttrValue> {
    match value {
        AttrValue::Text(s) => Ok(AttrValue::Bytes(s.into_bytes())),
        AttrValue::TextArray(items) => Ok(AttrValue::BytesArray(
            items.into_iter().map(String::into_bytes).collect(),
        )),
        AttrValue::Bytes(bytes) => {
            check_text(&bytes)?;
            Ok(AttrValue::Bytes(bytes))
        }
        AttrValue::BytesArray(items) => {
            for item in &items {
                check_text(item)?;
            }
            Ok(AttrValue::BytesArray(items))
        }
        other => Ok(other),
    }
}

/// Native form of an attribute value
///
/// # Errors
/// Returns error if encoded text is not valid UTF-8
pub fn decode_value(value: AttrValue) -> Result<AttrValue> {
    match value {
        AttrValue::Bytes(bytes) => decode_text(bytes).map(AttrValue::Text),
        AttrValue::BytesArray(items) => items
            .into_iter()
            .map(decode_text)
            .collect::<Result<Vec<_>>>()
            .map(AttrValue::TextArray),
        other => Ok(other),
    }
}

/// Encoded form of every value in `attrs`
///
/// # Errors
/// Returns error on the first value holding bytes that are not valid UTF-8
pub fn encode_attrs(attrs: &Attributes) -> Result<Attributes> {
    attrs
        .iter()
        .map(|(k, v)| {
            encode_value(v.clone())
                .map(|v| (k.clone(), v))
                .map_err(|e| for_attribute(k, e))
        })
        .collect()
}

/// Native form of every value in `attrs`
///
/// # Errors
/// Returns error on the first value that is not valid UTF-8
pub fn decode_attrs(attrs: Attributes) -> Result<Attributes> {
    attrs
        .into_iter()
        .map(|(k, v)| {
            decode_value(v)
                .map(|v| (k.clone(), v))
                .map_err(|e| for_attribute(&k, e))
        })
        .collect()
}

/// JSON view of an attribute value for reporting
///
/// Encoded text is decoded lossily. A one-element text array collapses to
/// its single string.
#[must_use]
pub fn clean_value(value: &AttrValue) -> Value {
    match value {
        AttrValue::Text(s) => Value::String(s.clone()),
        AttrValue::Bytes(b) => Value::String(String::from_utf8_lossy(b).into_owned()),
        AttrValue::Int(v) => Value::from(*v),
        AttrValue::Float(v) => Value::from(*v),
        AttrValue::Bool(v) => Value::Bool(*v),
        AttrValue::TextArray(items) if items.len() == 1 => Value::String(items[0].clone()),
        AttrValue::BytesArray(items) if items.len() == 1 => {
            Value::String(String::from_utf8_lossy(&items[0]).into_owned())
        }
        AttrValue::TextArray(items) => items.iter().cloned().map(Value::String).collect(),
        AttrValue::BytesArray(items) => items
            .iter()
            .map(|b| Value::String(String::from_utf8_lossy(b).into_owned()))
            .collect(),
        AttrValue::IntArray(items) => items.iter().copied().map(Value::from).collect(),
        AttrValue::FloatArray(items) => items.iter().copied().map(Value::from).collect(),
    }
}

/// [`clean_value`] applied to every attribute
#[must_use]
pub fn clean_attrs(attrs: &Attributes) -> Map<String, Value> {
    attrs
        .iter()
        .map(|(k, v)| (k.clone(), clean_value(v)))
        .collect()
}

fn for_attribute(name: &str, err: Fast5Error) -> Fast5Error {
    match err {
        Fast5Error::UnsupportedEncoding(msg) => {
            Fast5Error::UnsupportedEncoding(format!("attribute '{name}': {msg}"))
        }
        other => other,
    }
}

fn check_text(bytes: &[u8]) -> Result<()> {
    std::str::from_utf8(bytes)
        .map(|_| ())
        .map_err(|e| Fast5Error::UnsupportedEncoding(e.to_string()))
}

fn decode_text(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|e| Fast5Error::UnsupportedEncoding(e.to_string()))
}

fn zero_width(field: &Field) -> Fast5Error {
    Fast5Error::UnsupportedEncoding(format!(
        "text field '{}' has zero width",
        field.name
    ))
}

fn encode_records(table: RecordArray) -> Result<RecordArray> {
    let (fields, rows) = table.into_parts();
    let fields = fields
        .into_iter()
        .map(|field| match field.dtype {
            FieldType::Text(0) | FieldType::Bytes(0) => Err(zero_width(&field)),
            FieldType::Text(width) => Ok(Field::new(field.name, FieldType::Bytes(width))),
            _ => Ok(field),
        })
        .collect::<Result<Vec<_>>>()?;

    let rows = rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .zip(&fields)
                .map(|(cell, field)| match (cell, field.dtype) {
                    (Cell::Text(s), FieldType::Bytes(width)) => pad(s.into_bytes(), width, field),
                    (cell, _) => Ok(cell),
                })
                .collect::<Result<Vec<_>>>()
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(RecordArray::from_rows(fields, rows)?)
}

fn pad(mut bytes: Vec<u8>, width: usize, field: &Field) -> Result<Cell> {
    if bytes.len() > width {
        return Err(Fast5Error::UnsupportedEncoding(format!(
            "value of {} bytes exceeds width {width} of field '{}'",
            bytes.len(),
            field.name
        )));
    }
    bytes.resize(width, 0);
    Ok(Cell::Bytes(bytes))
}

fn decode_records(table: RecordArray) -> Result<RecordArray> {
    let (fields, rows) = table.into_parts();
    let fields = fields
        .into_iter()
        .map(|field| match field.dtype {
            FieldType::Text(0) | FieldType::Bytes(0) => Err(zero_width(&field)),
            FieldType::Bytes(width) => Ok(Field::new(field.name, FieldType::Text(width))),
            _ => Ok(field),
        })
        .collect::<Result<Vec<_>>>()?;

    let rows = rows
        .into_iter()
        .map(|row| {
            row.into_iter()
                .map(|cell| match cell {
                    Cell::Bytes(mut bytes) => {
                        let end = bytes.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
                        bytes.truncate(end);
                        decode_text(bytes).map(Cell::Text)
                    }
                    other => Ok(other),
                })
                .collect::<Result<Vec<_>>>()
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(RecordArray::from_rows(fields, rows)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn labelled(rows: &[(&str, i64)], width: usize) -> RecordArray {
        RecordArray::from_rows(
            vec![
                Field::new("label", FieldType::Text(width)),
                Field::new("start", FieldType::Int),
            ],
            rows.iter()
                .map(|(s, i)| vec![Cell::Text((*s).to_string()), Cell::Int(*i)])
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn scalar_text_is_encoded() {
        let out = sanitize_for_writing(Data::from("hello")).unwrap();
        assert_eq!(out, Data::Value(AttrValue::Bytes(b"hello".to_vec())));
        let back = sanitize_for_reading(out).unwrap();
        assert_eq!(back, Data::from("hello"));
    }

    #[test]
    fn numbers_pass_through() {
        let data = Data::Value(AttrValue::FloatArray(vec![1.5, -2.0]));
        assert_eq!(sanitize_for_writing(data.clone()).unwrap(), data);
        assert_eq!(sanitize_for_reading(data.clone()).unwrap(), data);
    }

    #[test]
    fn text_fields_are_padded_and_trimmed() {
        let written = sanitize_for_writing(labelled(&[("ab", 1), ("wxyz", 2)], 4).into()).unwrap();
        let table = written.as_records().unwrap();
        assert_eq!(table.fields()[0].dtype, FieldType::Bytes(4));
        assert_eq!(table.rows()[0][0], Cell::Bytes(b"ab\0\0".to_vec()));
        assert_eq!(table.rows()[1][1], Cell::Int(2));

        let read = sanitize_for_reading(written).unwrap();
        assert_eq!(read, Data::Records(labelled(&[("ab", 1), ("wxyz", 2)], 4)));
    }

    #[test]
    fn oversized_value_is_rejected() {
        let err = sanitize_for_writing(labelled(&[("toolong", 1)], 4).into()).unwrap_err();
        assert!(matches!(err, Fast5Error::UnsupportedEncoding(_)));
    }

    #[test]
    fn zero_width_field_is_rejected_both_ways() {
        let table = RecordArray::new(vec![Field::new("label", FieldType::Text(0))]);
        assert!(matches!(
            sanitize_for_writing(table.into()),
            Err(Fast5Error::UnsupportedEncoding(_))
        ));
        let table = RecordArray::new(vec![Field::new("label", FieldType::Bytes(0))]);
        assert!(matches!(
            sanitize_for_reading(table.into()),
            Err(Fast5Error::UnsupportedEncoding(_))
        ));
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let err = decode_value(AttrValue::Bytes(vec![0xff, 0xfe])).unwrap_err();
        assert!(matches!(err, Fast5Error::UnsupportedEncoding(_)));
    }

    #[test]
    fn undecodable_bytes_are_rejected_on_write() {
        assert!(matches!(
            encode_value(AttrValue::BytesArray(vec![b"ok".to_vec(), vec![0xff]])),
            Err(Fast5Error::UnsupportedEncoding(_))
        ));
        let attrs = Attributes::from([("blob".to_string(), AttrValue::Bytes(vec![0xff, 0xfe]))]);
        let err = encode_attrs(&attrs).unwrap_err();
        assert!(err.to_string().contains("'blob'"));
        assert_eq!(
            encode_value(AttrValue::Bytes(b"fine".to_vec())).unwrap(),
            AttrValue::Bytes(b"fine".to_vec())
        );
    }

    #[test]
    fn attribute_helpers() {
        let attrs = Attributes::from([
            ("name".to_string(), AttrValue::from("test")),
            ("count".to_string(), AttrValue::Int(3)),
        ]);
        let encoded = encode_attrs(&attrs).unwrap();
        assert_eq!(encoded["name"], AttrValue::Bytes(b"test".to_vec()));
        assert_eq!(encoded["count"], AttrValue::Int(3));
        assert_eq!(decode_attrs(encoded).unwrap(), attrs);
    }

    #[test]
    fn clean_value_collapses_single_element_arrays() {
        assert_eq!(
            clean_value(&AttrValue::BytesArray(vec![b"only".to_vec()])),
            Value::from("only")
        );
        assert_eq!(
            clean_value(&AttrValue::TextArray(vec!["a".into(), "b".into()])),
            serde_json::json!(["a", "b"])
        );
        assert_eq!(clean_value(&AttrValue::Bytes(b"x".to_vec())), Value::from("x"));
        assert_eq!(clean_value(&AttrValue::Int(7)), Value::from(7));
        assert_eq!(
            clean_value(&AttrValue::FloatArray(vec![0.5])),
            serde_json::json!([0.5])
        );
    }

    proptest! {
        #[test]
        fn text_survives_write_then_read(s in "[a-zA-Z0-9 _.-]{0,24}") {
            let back = sanitize_for_reading(sanitize_for_writing(Data::from(s.as_str())).unwrap()).unwrap();
            prop_assert_eq!(back, Data::from(s.as_str()));
        }

        #[test]
        fn records_survive_write_then_read(
            rows in prop::collection::vec(("[a-z]{0,8}", any::<i64>(), -1.0e9f64..1.0e9), 0..16)
        ) {
            let width = rows.iter().map(|(s, _, _)| s.len()).max().unwrap_or(0).max(1);
            let table = RecordArray::from_rows(
                vec![
                    Field::new("label", FieldType::Text(width)),
                    Field::new("start", FieldType::Int),
                    Field::new("mean", FieldType::Float),
                ],
                rows.iter()
                    .map(|(s, i, f)| vec![Cell::Text(s.clone()), Cell::Int(*i), Cell::Float(*f)])
                    .collect(),
            ).unwrap();
            let back = sanitize_for_reading(sanitize_for_writing(table.clone().into()).unwrap()).unwrap();
            prop_assert_eq!(back, Data::Records(table));
        }
    }
}
