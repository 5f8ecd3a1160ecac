//! Lazily decoded rows

use std::sync::Arc;

use regex::Regex;

use sheet_stream_core::Cell;

use crate::decode::decode_row;
use crate::error::XlsxResult;
use crate::shared_strings::SharedStringTable;

/// How [`Row::contains`] compares a cell value with the needle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatchMode {
    /// Exact text equality
    #[default]
    Strict,
    /// Numeric equality when both sides parse as finite numbers, otherwise
    /// trimmed ASCII case-insensitive text equality
    Loose,
}

impl MatchMode {
    pub fn matches(self, cell: &str, needle: &str) -> bool {
        match self {
            MatchMode::Strict => cell == needle,
            MatchMode::Loose => {
                let (cell, needle) = (cell.trim(), needle.trim());
                match (cell.parse::<f64>(), needle.parse::<f64>()) {
                    (Ok(a), Ok(b)) if a.is_finite() && b.is_finite() => a == b,
                    _ => cell.eq_ignore_ascii_case(needle),
                }
            }
        }
    }
}

#[derive(Debug, Clone)]
enum RowState {
    Raw(String),
    Decoded(Vec<Cell>),
}

/// One worksheet row.
///
/// A row starts out holding its raw markup. The first call that needs cells
/// decodes them once and drops the markup.
#[derive(Clone)]
pub struct Row {
    number: u32,
    state: RowState,
    strings: Arc<SharedStringTable>,
}

impl Row {
    pub(crate) fn new(number: u32, markup: String, strings: Arc<SharedStringTable>) -> Self {
        Self {
            number,
            state: RowState::Raw(markup),
            strings,
        }
    }

    /// 1-based position of the row within its sheet
    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn is_decoded(&self) -> bool {
        matches!(self.state, RowState::Decoded(_))
    }

    /// Decode the cells if that has not happened yet
    pub fn decode(&mut self) -> XlsxResult<()> {
        if let RowState::Raw(markup) = &self.state {
            let cells = decode_row(markup, &self.strings)?;
            self.state = RowState::Decoded(cells);
        }
        Ok(())
    }

    /// All cells, decoding on first use
    pub fn cells(&mut self) -> XlsxResult<&[Cell]> {
        self.decode()?;
        Ok(self.decoded_cells().unwrap_or_default())
    }

    /// Cells of an already decoded row
    pub fn decoded_cells(&self) -> Option<&[Cell]> {
        match &self.state {
            RowState::Decoded(cells) => Some(cells),
            RowState::Raw(_) => None,
        }
    }

    /// Cell at a 0-based encounter-order index
    pub fn cell(&mut self, index: usize) -> XlsxResult<Option<&Cell>> {
        Ok(self.cells()?.get(index))
    }

    /// Cell text values in order
    pub fn values(&mut self) -> XlsxResult<Vec<String>> {
        Ok(self.cells()?.iter().map(|c| c.value().to_string()).collect())
    }

    pub fn into_cells(mut self) -> XlsxResult<Vec<Cell>> {
        self.decode()?;
        match self.state {
            RowState::Decoded(cells) => Ok(cells),
            RowState::Raw(_) => Ok(Vec::new()),
        }
    }

    /// Check whether any cell equals `needle` under `mode`
    pub fn contains(&mut self, needle: &str, mode: MatchMode) -> XlsxResult<bool> {
        Ok(self
            .cells()?
            .iter()
            .any(|c| mode.matches(c.value(), needle)))
    }

    /// Check whether any cell value matches `pattern`
    pub fn matches(&mut self, pattern: &Regex) -> XlsxResult<bool> {
        Ok(self.cells()?.iter().any(|c| pattern.is_match(c.value())))
    }
}

impl std::fmt::Debug for Row {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Row")
            .field("number", &self.number)
            .field("state", &self.state)
            .finish()
    }
}
