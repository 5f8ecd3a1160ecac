//! Row and cell decoding
//!
//! Turns the raw markup of one `<row>` unit into typed cells. Cells are picked
//! out with patterns rather than a full XML parse, which keeps decoding cheap
//! and tolerant of namespace prefixes and minor producer quirks.

use once_cell::sync::Lazy;
use regex::Regex;

use sheet_stream_core::{Cell, CellType};

use crate::error::XlsxResult;
use crate::scan::{OPEN_ATTRS, PREFIX};
use crate::shared_strings::SharedStringTable;
use crate::text::{decode_entities, item_text};

/// A `<c>` unit; group 1 holds a self-closing cell's attributes, groups 2
/// and 3 the attributes and body of a full one
static CELL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?s)<{PREFIX}c(\s[^>]*)?/>|<{PREFIX}c({OPEN_ATTRS})>(.*?)</{PREFIX}c\s*>"
    ))
    .expect("cell pattern is valid")
});

static VALUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?s)<{PREFIX}v{OPEN_ATTRS}>(.*?)</{PREFIX}v\s*>"))
        .expect("value pattern is valid")
});

static INLINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?s)<{PREFIX}is{OPEN_ATTRS}>(.*?)</{PREFIX}is\s*>"))
        .expect("inline string pattern is valid")
});

static REF_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\sr\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("reference attribute pattern is valid")
});

static TYPE_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\st\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("type attribute pattern is valid")
});

fn attribute<'a>(pattern: &Regex, attrs: &'a str) -> Option<&'a str> {
    let caps = pattern.captures(attrs)?;
    caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str())
}

/// Decode every cell of a row unit, in document order.
///
/// Column indices count cells as they are encountered, so gaps in a sparse
/// row are not preserved (see [`Cell::column`] for the real column).
pub fn decode_row(markup: &str, strings: &SharedStringTable) -> XlsxResult<Vec<Cell>> {
    let mut cells = Vec::new();

    for (column_index, caps) in CELL.captures_iter(markup).enumerate() {
        let cell = if let Some(attrs) = caps.get(1) {
            let reference = attribute(&REF_ATTR, attrs.as_str()).map(str::to_string);
            Cell::empty(column_index, reference)
        } else {
            let attrs = caps.get(2).map_or("", |m| m.as_str());
            let body = caps.get(3).map_or("", |m| m.as_str());
            decode_cell(attrs, body, column_index, strings)?
        };
        cells.push(cell);
    }

    Ok(cells)
}

fn decode_cell(
    attrs: &str,
    body: &str,
    column_index: usize,
    strings: &SharedStringTable,
) -> XlsxResult<Cell> {
    let reference = attribute(&REF_ATTR, attrs).map(str::to_string);
    let declared = attribute(&TYPE_ATTR, attrs).unwrap_or("n");
    let raw = VALUE
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str());

    if declared == "inlineStr" {
        if let Some(inner) = INLINE.captures(body).and_then(|caps| caps.get(1)) {
            let text = item_text(inner.as_str());
            return Ok(Cell::new(text, CellType::String, column_index, reference));
        }
    }

    let Some(raw) = raw else {
        return Ok(Cell::empty(column_index, reference));
    };

    let (value, cell_type) = match declared {
        "s" => match raw.trim().parse::<usize>() {
            Ok(id) => (strings.get(id)?, CellType::String),
            Err(_) => return Ok(Cell::empty(column_index, reference)),
        },
        "inlineStr" | "str" => (decode_entities(raw).into_owned(), CellType::String),
        "b" => (raw.trim().to_string(), CellType::Boolean),
        "e" => (decode_entities(raw).into_owned(), CellType::Error),
        "d" => (raw.trim().to_string(), CellType::Date),
        _ => (raw.trim().to_string(), CellType::Number),
    };

    Ok(Cell::new(value, cell_type, column_index, reference))
}
