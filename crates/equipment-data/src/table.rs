//! In-memory tabular input: a header row plus rows of loosely typed cells.
//!
//! Cells keep whatever representation the decoder produced. Conversion to the
//! types an [`EquipmentItem`](equipment_core::models::EquipmentItem) needs is
//! explicit and fallible, see [`Cell::to_f64`] and [`Cell::to_text`].

use std::borrow::Cow;

use equipment_core::error::{EquipmentError, Result};
use thiserror::Error;

// ── Cell ──────────────────────────────────────────────────────────────────────

/// One tagged value of a table row.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// The field was present but empty.
    Empty,
    /// Raw text as read from the source.
    Text(String),
    /// A value that is already numeric.
    Number(f64),
}

/// Why a cell could not be read as the requested type.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoercionError {
    #[error("value is missing")]
    Missing,
    #[error("cannot convert {0:?} to a number")]
    NotNumeric(String),
    #[error("{0:?} is not a finite number")]
    NonFinite(String),
}

impl Cell {
    /// Coerce to `f64`.
    ///
    /// Text is parsed after trimming surrounding whitespace. Empty cells,
    /// unparsable text and non-finite values (`NaN`, `inf`) are rejected.
    pub fn to_f64(&self) -> std::result::Result<f64, CoercionError> {
        let value = match self {
            Cell::Empty => return Err(CoercionError::Missing),
            Cell::Number(n) => *n,
            Cell::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| CoercionError::NotNumeric(s.clone()))?,
        };
        if !value.is_finite() {
            return Err(CoercionError::NonFinite(self.to_string()));
        }
        Ok(value)
    }

    /// Read as text. Text is returned verbatim; numbers use their shortest
    /// decimal form. Empty cells are rejected.
    pub fn to_text(&self) -> std::result::Result<Cow<'_, str>, CoercionError> {
        match self {
            Cell::Empty => Err(CoercionError::Missing),
            Cell::Text(s) => Ok(Cow::Borrowed(s.as_str())),
            Cell::Number(n) => Ok(Cow::Owned(n.to_string())),
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Number(n) => write!(f, "{}", n),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

// ── RawTable ──────────────────────────────────────────────────────────────────

/// A header row and an ordered sequence of rows aligned with it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl RawTable {
    /// Create an empty table with the given header row.
    pub fn new<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row. Its length must match the header row.
    pub fn push_row(&mut self, cells: Vec<Cell>) -> Result<()> {
        if cells.len() != self.headers.len() {
            return Err(EquipmentError::row(
                self.rows.len() + 1,
                format!(
                    "expected {} fields, found {}",
                    self.headers.len(),
                    cells.len()
                ),
            ));
        }
        self.rows.push(cells);
        Ok(())
    }

    /// Builder-style [`RawTable::push_row`].
    pub fn with_row<C: Into<Cell>>(mut self, cells: impl IntoIterator<Item = C>) -> Result<Self> {
        self.push_row(cells.into_iter().map(Into::into).collect())?;
        Ok(self)
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Position of the first header equal to `name` (exact match).
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows in their original order.
    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().enumerate().map(move |(index, cells)| Row {
            table: self,
            index,
            cells,
        })
    }
}

// ── Row ───────────────────────────────────────────────────────────────────────

/// Borrowed view of one row that resolves cells by column name.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    table: &'a RawTable,
    index: usize,
    cells: &'a [Cell],
}

impl<'a> Row<'a> {
    /// 1-based position among the data rows.
    pub fn number(&self) -> usize {
        self.index + 1
    }

    /// Cell under `column`, if the table has that column.
    pub fn get(&self, column: &str) -> Option<&'a Cell> {
        self.table
            .column_index(column)
            .and_then(|i| self.cells.get(i))
    }

    /// Cell at a known column position.
    pub fn at(&self, index: usize) -> Option<&'a Cell> {
        self.cells.get(index)
    }
}
