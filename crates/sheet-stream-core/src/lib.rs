//! # sheet-stream-core
//!
//! Core data types for the sheet-stream spreadsheet reader.
//!
//! This crate provides the leaf types shared by the readers:
//! - [`Cell`] and [`CellType`] - A decoded cell value and its declared type
//! - [`CellAddress`] - A1-style cell references
//!
//! ## Example
//!
//! ```rust
//! use sheet_stream_core::{Cell, CellType};
//!
//! let cell = Cell::new("42", CellType::Number, 0, Some("C5".into()));
//! assert_eq!(cell.as_number(), Some(42.0));
//! assert_eq!(cell.column(), Some(2));
//! ```

pub mod cell;
pub mod error;

pub use cell::{Cell, CellAddress, CellType};
pub use error::{Error, Result};

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u16 = 16_384;
