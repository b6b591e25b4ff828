//! Columnar store of quadkey-indexed records.
//!
//! Each row is one tile measurement: a quadkey plus zero or more named numeric
//! attributes. A `None` value marks an attribute the record does not carry.

use crate::error::MissingAttributeError;

/// One named numeric attribute column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// Quadkey-indexed records in column-major layout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TileTable {
    quadkeys: Vec<String>,
    columns: Vec<Column>,
}

impl TileTable {
    /// Create an empty table with the given attribute columns.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            quadkeys: Vec::new(),
            columns: columns
                .into_iter()
                .map(|name| Column {
                    name: name.into(),
                    values: Vec::new(),
                })
                .collect(),
        }
    }

    /// Create an empty table with room for `rows` records.
    pub fn with_capacity<I, S>(columns: I, rows: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::new(columns);
        table.quadkeys.reserve(rows);
        for column in &mut table.columns {
            column.values.reserve(rows);
        }
        table
    }

    /// Append one record.
    ///
    /// `values` are matched to columns by position; missing trailing values
    /// are stored as `None` and surplus values are ignored.
    pub fn push_row<I>(&mut self, quadkey: impl Into<String>, values: I)
    where
        I: IntoIterator<Item = Option<f64>>,
    {
        self.quadkeys.push(quadkey.into());
        let mut values = values.into_iter();
        for column in &mut self.columns {
            column.values.push(values.next().flatten());
        }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.quadkeys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quadkeys.is_empty()
    }

    /// Quadkey of record `row`.
    pub fn quadkey(&self, row: usize) -> Option<&str> {
        self.quadkeys.get(row).map(String::as_str)
    }

    /// All quadkeys in record order.
    pub fn quadkeys(&self) -> &[String] {
        &self.quadkeys
    }

    /// Look up an attribute column by name.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Attribute column names, in schema order.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Check the schema once for every requested column.
    ///
    /// The error lists all missing columns, not just the first.
    pub fn require_columns<S: AsRef<str>>(&self, names: &[S]) -> Result<(), MissingAttributeError> {
        let missing: Vec<String> = names
            .iter()
            .map(AsRef::as_ref)
            .filter(|name| self.column(name).is_none())
            .map(str::to_string)
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(MissingAttributeError::new(missing))
        }
    }
}
