//! Prelude module - common imports for sheet-stream users
//!
//! ```rust
//! use sheet_stream::prelude::*;
//! ```

pub use crate::{
    // Cell types
    Cell,
    CellAddress,
    CellType,
    // Reading options
    CompactionPolicy,
    MatchMode,
    ReadOptions,
    // Main types
    Row,
    ScanOptions,
    Sheet,
    Workbook,
    // Error types
    XlsxError,
    XlsxResult,
};
