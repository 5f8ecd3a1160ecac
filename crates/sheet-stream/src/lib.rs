//! # sheet-stream
//!
//! A Rust library for reading very large spreadsheet files without loading
//! them into memory.
//!
//! ## Features
//!
//! - Sequential row streaming straight from the compressed worksheet part
//! - Random row access through an on-disk offset index
//! - Lazy shared string resolution with a bounded LRU cache
//! - Tolerant of producer quirks: namespace prefixes, unusual part locations,
//!   missing relationships or shared strings
//!
//! ## Example
//!
//! ```rust,no_run
//! use sheet_stream::prelude::*;
//!
//! let workbook = sheet_stream::open("orders.xlsx")?;
//! let sheet = workbook.sheet(0).expect("at least one sheet");
//!
//! // Stream every row
//! for row in sheet.rows()? {
//!     let mut row = row?;
//!     println!("{:>6}: {}", row.number(), row.values()?.join(" | "));
//! }
//!
//! // Jump straight to a row (builds the row index on first use)
//! if let Some(mut row) = sheet.row(1_000)? {
//!     println!("{:?}", row.values()?);
//! }
//!
//! // Search
//! let hits = sheet.find_rows_by_pattern(r"^ORD-10\d\d$", Some(10))?;
//! println!("{} matching rows", hits.len());
//! # Ok::<(), XlsxError>(())
//! ```

pub mod prelude;

use std::path::Path;

// Re-export core types
pub use sheet_stream_core::{
    Cell, CellAddress, CellType, Error, Result, MAX_COLS, MAX_ROWS,
};

// Re-export the reader
pub use sheet_stream_xlsx::{
    detect, CacheStats, CompactionPolicy, MatchMode, PackageArchive, PackageMetadata,
    PackageStructure, ReadOptions, Row, RowIter, ScanOptions, SharedStringTable, Sheet,
    SheetDescriptor, Workbook, XlsxError, XlsxResult, ZipPackage,
};

/// Open a spreadsheet file with default options
pub fn open<P: AsRef<Path>>(path: P) -> XlsxResult<Workbook> {
    open_with(path, ReadOptions::default())
}

/// Open a spreadsheet file, choosing the reader from its extension
pub fn open_with<P: AsRef<Path>>(path: P, options: ReadOptions) -> XlsxResult<Workbook> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match extension.as_deref() {
        Some("xlsx") | Some("xlsm") => Workbook::open_with(path, options),
        _ => Err(XlsxError::InvalidFormat(format!(
            "Unsupported file format: {}",
            path.display()
        ))),
    }
}
