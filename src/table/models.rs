use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use crate::common::errors::{FactorError, Result};

/// Name of the reserved weight column.
pub const VALUE_COLUMN: &str = "value";

/// A single row, cells in the table's column order.
pub type Row = Vec<Value>;

/// Scalar cell value
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    Null,
}

/// Broad category of a cell, used to reject joins across incompatible columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Number,
    Boolean,
    Null,
}

impl std::fmt::Display for ValueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ValueKind::Text => "text",
            ValueKind::Number => "number",
            ValueKind::Boolean => "boolean",
            ValueKind::Null => "null",
        };
        write!(f, "{}", name)
    }
}

impl ValueKind {
    /// Null joins with anything; otherwise kinds must agree.
    pub fn compatible_with(&self, other: ValueKind) -> bool {
        *self == ValueKind::Null || other == ValueKind::Null || *self == other
    }
}

impl From<serde_json::Value> for Value {
    fn from(json_value: serde_json::Value) -> Self {
        match json_value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Value::Integer(i)
                } else if let Some(f) = n.as_f64() {
                    Value::Float(f)
                } else {
                    Value::String(n.to_string())
                }
            }
            serde_json::Value::String(s) => Value::String(s),
            // Nested structures have no place in a cell; keep their text.
            other => Value::String(other.to_string()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(fl) => write!(f, "{}", fl),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Null => write!(f, "null"),
        }
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::String(_) => ValueKind::Text,
            Value::Integer(_) | Value::Float(_) => ValueKind::Number,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Null => ValueKind::Null,
        }
    }

    /// Try to get the value as a string
    pub fn as_string(&self) -> Option<&String> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get the value as an integer
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get the value as a float
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to get the value as a boolean
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Integral floats are treated as the matching integer so `1` and `1.0` land on the
    /// same join key.
    fn integral(f: f64) -> Option<i64> {
        if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
            Some(f as i64)
        } else {
            None
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::Integer(a), Value::Float(b)) | (Value::Float(b), Value::Integer(a)) => {
                Value::integral(*b) == Some(*a)
            }
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Null, Value::Null) => true,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::String(s) => {
                0u8.hash(state);
                s.hash(state);
            }
            Value::Integer(i) => {
                1u8.hash(state);
                i.hash(state);
            }
            Value::Float(f) => match Value::integral(*f) {
                Some(i) => {
                    1u8.hash(state);
                    i.hash(state);
                }
                None => {
                    2u8.hash(state);
                    let bits = if f.is_nan() { f64::NAN.to_bits() } else { f.to_bits() };
                    bits.hash(state);
                }
            },
            Value::Boolean(b) => {
                3u8.hash(state);
                b.hash(state);
            }
            Value::Null => 4u8.hash(state),
        }
    }
}

/// Build a [`Row`] from literals: `row![0, 1, 0.25]`.
#[macro_export]
macro_rules! row {
    ($($cell:expr),* $(,)?) => {
        vec![$($crate::table::models::Value::from($cell)),*]
    };
}

/// Ordered rows over a name-unique, ordered column list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Table {
    /// Create an empty table, rejecting duplicate column names.
    pub fn new<S: AsRef<str>>(columns: &[S]) -> Result<Table> {
        let mut names: Vec<String> = Vec::with_capacity(columns.len());
        for column in columns {
            let column = column.as_ref();
            if names.iter().any(|c| c == column) {
                return Err(FactorError::DuplicateColumn(column.to_string()));
            }
            names.push(column.to_string());
        }
        Ok(Table {
            columns: names,
            rows: Vec::new(),
        })
    }

    pub fn from_rows<S: AsRef<str>>(columns: &[S], rows: Vec<Row>) -> Result<Table> {
        let mut table = Table::new(columns)?;
        for row in rows {
            table.push(row)?;
        }
        Ok(table)
    }

    /// Append a row. Its arity must match the column count.
    pub fn push(&mut self, row: Row) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(FactorError::RowArity {
                expected: self.columns.len(),
                found: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Every column except the weight column.
    pub fn variables(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.as_str() != VALUE_COLUMN)
            .cloned()
            .collect()
    }

    pub fn value_index(&self) -> Result<usize> {
        self.column_index(VALUE_COLUMN)
            .ok_or(FactorError::MissingValueColumn)
    }

    /// Weight column as floats.
    pub fn weights(&self) -> Result<Vec<f64>> {
        let index = self.value_index()?;
        self.rows
            .iter()
            .enumerate()
            .map(|(i, row)| {
                row[index].as_float().ok_or_else(|| FactorError::NonNumericWeight {
                    row: i,
                    value: row[index].to_string(),
                })
            })
            .collect()
    }

    /// Copy of this table with each weight passed through `f`.
    pub fn map_weights<F>(&self, mut f: F) -> Result<Table>
    where
        F: FnMut(usize, f64) -> Result<f64>,
    {
        let index = self.value_index()?;
        let weights = self.weights()?;
        let mut rows = self.rows.clone();
        for (i, (row, weight)) in rows.iter_mut().zip(weights).enumerate() {
            row[index] = Value::Float(f(i, weight)?);
        }
        Ok(Table {
            columns: self.columns.clone(),
            rows,
        })
    }

    /// Weight of the first row matching every `(column, value)` pair.
    pub fn weight_where(&self, assignment: &[(&str, Value)]) -> Option<f64> {
        let index = self.column_index(VALUE_COLUMN)?;
        let mut lookups = Vec::with_capacity(assignment.len());
        for (column, value) in assignment {
            lookups.push((self.column_index(column)?, value));
        }
        self.rows
            .iter()
            .find(|row| lookups.iter().all(|(i, value)| row[*i] == **value))
            .and_then(|row| row[index].as_float())
    }

    /// Rows as column-name maps.
    pub fn records(&self) -> Vec<BTreeMap<String, Value>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }

    /// New table holding only `columns`, in that order.
    pub fn project<S: AsRef<str>>(&self, columns: &[S]) -> Result<Table> {
        let indices = self.indices_of(columns)?;
        let mut table = Table::new(columns)?;
        table.rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|i| row[*i].clone()).collect())
            .collect();
        Ok(table)
    }

    pub(crate) fn indices_of<S: AsRef<str>>(&self, columns: &[S]) -> Result<Vec<usize>> {
        columns
            .iter()
            .map(|c| {
                self.column_index(c.as_ref())
                    .ok_or_else(|| FactorError::UnknownVariable(c.as_ref().to_string()))
            })
            .collect()
    }

    /// Distinct kinds present in a column, ignoring nulls.
    pub(crate) fn column_kinds(&self, index: usize) -> Vec<ValueKind> {
        let mut kinds = Vec::new();
        for row in &self.rows {
            let kind = row[index].kind();
            if kind != ValueKind::Null && !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }
        kinds
    }

    pub(crate) fn from_parts_unchecked(columns: Vec<String>, rows: Vec<Row>) -> Table {
        Table { columns, rows }
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}", self.columns.join("\t"))?;
        for row in &self.rows {
            let cells: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            writeln!(f, "{}", cells.join("\t"))?;
        }
        Ok(())
    }
}
