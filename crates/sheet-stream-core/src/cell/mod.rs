//! Cell-related types
//!
//! This module contains:
//! - [`Cell`] - One decoded cell: text value, type tag, position
//! - [`CellType`] - The declared type that drove decoding
//! - [`CellAddress`] - A cell's location parsed from an A1 reference

mod address;
mod value;

pub use address::CellAddress;
pub use value::{Cell, CellType};
