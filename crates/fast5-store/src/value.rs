//! Value model for attributes and datasets
//!
//! Attribute values are a closed set of scalar and array kinds. Text comes in
//! two representations: native [`AttrValue::Text`] and encoded
//! [`AttrValue::Bytes`]. The store keeps whichever it is given; normalization
//! between the two happens above the store.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Ordered attribute mapping of a group or dataset
pub type Attributes = IndexMap<String, AttrValue>;

/// A single attribute value (or the payload of a non-tabular dataset)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttrValue {
    /// Native text
    Text(String),
    /// Encoded text
    Bytes(Vec<u8>),
    /// Signed integer
    Int(i64),
    /// Floating point
    Float(f64),
    /// Boolean flag
    Bool(bool),
    /// Homogeneous native text array
    TextArray(Vec<String>),
    /// Homogeneous encoded text array
    BytesArray(Vec<Vec<u8>>),
    /// Integer array
    IntArray(Vec<i64>),
    /// Floating point array
    FloatArray(Vec<f64>),
}

impl AttrValue {
    /// Short name of the value kind, for diagnostics
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Bytes(_) => "bytes",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Bool(_) => "bool",
            Self::TextArray(_) => "text-array",
            Self::BytesArray(_) => "bytes-array",
            Self::IntArray(_) => "int-array",
            Self::FloatArray(_) => "float-array",
        }
    }

    /// Whether this value holds text in either representation
    #[must_use]
    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            Self::Text(_) | Self::Bytes(_) | Self::TextArray(_) | Self::BytesArray(_)
        )
    }

    /// Native text, if this is a [`AttrValue::Text`]
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Integer value; floats with no fractional part are accepted
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            Self::Float(v) if v.fract() == 0.0 && v.is_finite() => Some(*v as i64),
            _ => None,
        }
    }

    /// Floating point value; integers are widened
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Number of elements: 1 for scalars, array length otherwise
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::TextArray(v) => v.len(),
            Self::BytesArray(v) => v.len(),
            Self::IntArray(v) => v.len(),
            Self::FloatArray(v) => v.len(),
            _ => 1,
        }
    }

    /// True for empty arrays
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for AttrValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for AttrValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for AttrValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for AttrValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for AttrValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec<String>> for AttrValue {
    fn from(value: Vec<String>) -> Self {
        Self::TextArray(value)
    }
}

impl From<Vec<i64>> for AttrValue {
    fn from(value: Vec<i64>) -> Self {
        Self::IntArray(value)
    }
}

impl From<Vec<f64>> for AttrValue {
    fn from(value: Vec<f64>) -> Self {
        Self::FloatArray(value)
    }
}

/// Element type of a record field
///
/// Text fields are fixed-width; the width counts encoded bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    /// Signed integer
    Int,
    /// Floating point
    Float,
    /// Native text of the given fixed width
    Text(usize),
    /// Encoded text of the given fixed width
    Bytes(usize),
}

/// Named, typed column of a [`RecordArray`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Field name
    pub name: String,
    /// Field element type
    pub dtype: FieldType,
}

impl Field {
    /// Create a field
    #[must_use]
    pub fn new(name: impl Into<String>, dtype: FieldType) -> Self {
        Self {
            name: name.into(),
            dtype,
        }
    }
}

/// One value inside a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    /// Signed integer
    Int(i64),
    /// Floating point
    Float(f64),
    /// Native text
    Text(String),
    /// Encoded text
    Bytes(Vec<u8>),
}

impl Cell {
    fn fits(&self, dtype: FieldType) -> bool {
        matches!(
            (self, dtype),
            (Self::Int(_), FieldType::Int)
                | (Self::Float(_), FieldType::Float)
                | (Self::Text(_), FieldType::Text(_))
                | (Self::Bytes(_), FieldType::Bytes(_))
        )
    }
}

/// Table of structured records with mixed field types
///
/// # Invariants
/// - Every row has exactly one cell per field
/// - Each cell's kind matches its field's [`FieldType`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordArray {
    fields: Vec<Field>,
    rows: Vec<Vec<Cell>>,
}

impl RecordArray {
    /// Create an empty table with the given fields
    #[must_use]
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            fields,
            rows: Vec::new(),
        }
    }

    /// Build a table from fields and rows, checking every row
    ///
    /// # Errors
    /// Returns error if a row does not match the field layout
    pub fn from_rows(fields: Vec<Field>, rows: Vec<Vec<Cell>>) -> Result<Self, StoreError> {
        let mut table = Self::new(fields);
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Append a row
    ///
    /// # Errors
    /// Returns error if the row does not match the field layout
    pub fn push_row(&mut self, row: Vec<Cell>) -> Result<(), StoreError> {
        if row.len() != self.fields.len() {
            return Err(StoreError::ShapeMismatch(format!(
                "row has {} cells, table has {} fields",
                row.len(),
                self.fields.len()
            )));
        }
        if let Some((cell, field)) = row
            .iter()
            .zip(&self.fields)
            .find(|(cell, field)| !cell.fits(field.dtype))
        {
            return Err(StoreError::ShapeMismatch(format!(
                "field '{}' expects {:?}, got {:?}",
                field.name, field.dtype, cell
            )));
        }
        self.rows.push(row);
        Ok(())
    }

    /// Field layout
    #[inline]
    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Field names in layout order
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    /// All rows
    #[inline]
    #[must_use]
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    /// Number of records
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True if there are no records
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All cells of the named field, in row order
    #[must_use]
    pub fn column(&self, name: &str) -> Option<Vec<&Cell>> {
        let idx = self.fields.iter().position(|f| f.name == name)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }

    /// Split into fields and rows
    #[must_use]
    pub fn into_parts(self) -> (Vec<Field>, Vec<Vec<Cell>>) {
        (self.fields, self.rows)
    }
}

/// Payload of a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Data {
    /// Scalar or homogeneous array
    Value(AttrValue),
    /// Structured records
    Records(RecordArray),
}

impl Data {
    /// Element count: array length, record count, or 1 for scalars
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Value(v) => v.len(),
            Self::Records(r) => r.len(),
        }
    }

    /// True if the dataset holds no elements
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record table, if this is one
    #[must_use]
    pub fn as_records(&self) -> Option<&RecordArray> {
        match self {
            Self::Records(r) => Some(r),
            Self::Value(_) => None,
        }
    }

    /// Plain value, if this is one
    #[must_use]
    pub fn as_value(&self) -> Option<&AttrValue> {
        match self {
            Self::Value(v) => Some(v),
            Self::Records(_) => None,
        }
    }
}

impl From<AttrValue> for Data {
    fn from(value: AttrValue) -> Self {
        Self::Value(value)
    }
}

impl From<&str> for Data {
    fn from(value: &str) -> Self {
        Self::Value(value.into())
    }
}

impl From<RecordArray> for Data {
    fn from(value: RecordArray) -> Self {
        Self::Records(value)
    }
}
