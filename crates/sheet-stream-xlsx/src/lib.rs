//! # sheet-stream-xlsx
//!
//! Streaming reader for XLSX (Office Open XML) packages.
//!
//! Worksheets are never loaded whole. Rows are pulled out of the compressed
//! worksheet stream a chunk at a time, random row access goes through an
//! offset index over a temporary copy of the part, and shared strings are
//! resolved lazily through an LRU cache.
//!
//! ```rust,no_run
//! use sheet_stream_xlsx::{MatchMode, Workbook};
//!
//! let workbook = Workbook::open("large.xlsx")?;
//! let sheet = workbook.sheet_by_name("Orders").expect("sheet exists");
//! if let Some(mut row) = sheet.find_row("ORD-1042", MatchMode::Strict)? {
//!     println!("found at row {}: {:?}", row.number(), row.values()?);
//! }
//! # Ok::<(), sheet_stream_xlsx::XlsxError>(())
//! ```

pub mod archive;
pub mod decode;
pub mod detect;
pub mod error;
pub mod row;
pub mod scan;
pub mod shared_strings;
pub mod sheet;
pub mod structure;
pub mod text;
pub mod workbook;

mod store;

#[cfg(test)]
mod test_support;

pub use archive::{PackageArchive, ZipPackage};
pub use detect::detect;
pub use error::{XlsxError, XlsxResult};
pub use row::{MatchMode, Row};
pub use scan::ScanOptions;
pub use shared_strings::{CacheStats, SharedStringTable, DEFAULT_CACHE_CAPACITY};
pub use sheet::{CompactionPolicy, RowIter, Sheet, SheetDescriptor};
pub use structure::{PackageMetadata, PackageStructure};
pub use workbook::{ReadOptions, Workbook};
