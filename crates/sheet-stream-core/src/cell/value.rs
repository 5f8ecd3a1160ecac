//! Decoded cell values

use super::CellAddress;
use std::fmt;

/// The declared type of a cell, taken from its `t` attribute.
///
/// The value itself is always kept as text; numeric and boolean parsing is
/// left to the caller (see [`Cell::as_number`] and [`Cell::as_bool`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CellType {
    /// No value element at all
    #[default]
    Empty,
    /// Shared, inline or formula string
    String,
    /// Direct numeric value (no `t` or `t="n"`)
    Number,
    /// `t="b"`, value is `0` or `1`
    Boolean,
    /// `t="e"`, value is the error literal (e.g. `#DIV/0!`)
    Error,
    /// `t="d"`, ISO 8601 text
    Date,
}

impl CellType {
    /// Get the type name for display
    pub fn type_name(&self) -> &'static str {
        match self {
            CellType::Empty => "empty",
            CellType::String => "string",
            CellType::Number => "number",
            CellType::Boolean => "boolean",
            CellType::Error => "error",
            CellType::Date => "date",
        }
    }
}

/// One decoded cell of a row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Cell {
    value: String,
    cell_type: CellType,
    column_index: usize,
    reference: Option<String>,
}

impl Cell {
    /// Create a new cell
    pub fn new(
        value: impl Into<String>,
        cell_type: CellType,
        column_index: usize,
        reference: Option<String>,
    ) -> Self {
        Self {
            value: value.into(),
            cell_type,
            column_index,
            reference,
        }
    }

    /// Create an empty cell at the given encounter position
    pub fn empty(column_index: usize, reference: Option<String>) -> Self {
        Self::new(String::new(), CellType::Empty, column_index, reference)
    }

    /// The decoded text value
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Consume the cell, returning its text value
    pub fn into_value(self) -> String {
        self.value
    }

    /// The declared type
    pub fn cell_type(&self) -> CellType {
        self.cell_type
    }

    /// Check if the cell holds no value
    pub fn is_empty(&self) -> bool {
        self.cell_type == CellType::Empty
    }

    /// 0-based position of this cell within its row, in document order.
    ///
    /// Sparse rows are compacted: a row holding only `A1` and `D1` yields
    /// indices 0 and 1. Use [`Cell::column`] for the spreadsheet column.
    pub fn column_index(&self) -> usize {
        self.column_index
    }

    /// The raw `r` reference (e.g. "B7"), when the producer wrote one
    pub fn reference(&self) -> Option<&str> {
        self.reference.as_deref()
    }

    /// The parsed reference, if present and well formed
    pub fn address(&self) -> Option<CellAddress> {
        self.reference
            .as_deref()
            .and_then(|r| CellAddress::parse(r).ok())
    }

    /// The 0-based spreadsheet column parsed from the reference letters
    pub fn column(&self) -> Option<u16> {
        self.address().map(|a| a.col)
    }

    /// Try to get the value as a number
    pub fn as_number(&self) -> Option<f64> {
        match self.cell_type {
            CellType::Empty | CellType::Error => None,
            CellType::Boolean => self.as_bool().map(|b| if b { 1.0 } else { 0.0 }),
            _ => self.value.trim().parse().ok(),
        }
    }

    /// Try to get the value as a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match (self.cell_type, self.value.trim()) {
            (CellType::Boolean, "1") => Some(true),
            (CellType::Boolean, "0") => Some(false),
            (_, v) if v.eq_ignore_ascii_case("true") => Some(true),
            (_, v) if v.eq_ignore_ascii_case("false") => Some(false),
            _ => None,
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}
