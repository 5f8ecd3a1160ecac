//! Package structure detection
//!
//! Producers disagree on part locations, letter case and namespace prefixes.
//! Detection walks ordered candidate tables (first hit wins), scans the
//! workbook part for namespace declarations and for the way sheets are
//! declared, and gathers a few container statistics. Only a missing workbook
//! part is fatal; everything else falls back to the conventional Excel layout.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use quick_xml::events::Event;
use quick_xml::Reader;
use regex::Regex;

use crate::archive::PackageArchive;
use crate::error::{XlsxError, XlsxResult};
use crate::structure::{PackageMetadata, PackageStructure, OOXML_FAMILY, UNKNOWN_FAMILY};

const WORKSHEET_DIRS: &[&str] = &["xl/worksheets/", "worksheets/", "Worksheets/", "xl/Worksheets/"];
const DEFAULT_WORKSHEET_DIR: &str = "xl/worksheets/";

const WORKBOOK_PATHS: &[&str] = &["xl/workbook.xml", "workbook.xml", "xl/Workbook.xml"];

const SHARED_STRINGS_PATHS: &[&str] = &[
    "xl/sharedStrings.xml",
    "sharedStrings.xml",
    "xl/SharedStrings.xml",
];

const RELATIONSHIPS_PATHS: &[&str] = &[
    "xl/_rels/workbook.xml.rels",
    "_rels/workbook.xml.rels",
    "xl/_rels/Workbook.xml.rels",
];

const CONTENT_TYPES_PATH: &str = "[Content_Types].xml";
const SPREADSHEETML_MARKER: &str = "officedocument.spreadsheetml";
const MACRO_MARKER: &str = "vbaProject";

const DEFAULT_SHEET_ELEMENT: &str = "sheet";
const DEFAULT_RELATIONSHIP_ID: &str = "r:id";

static NAMESPACE_DECL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"xmlns(?::([^=\s"'<>]+))?\s*=\s*"([^"]*)""#).expect("namespace pattern is valid")
});

static WORKSHEET_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^sheet(\d+)\.xml$").expect("worksheet name pattern is valid"));

/// Inspect a package and describe its layout.
pub fn detect(archive: &dyn PackageArchive) -> XlsxResult<PackageStructure> {
    let names = archive.entry_names();

    let workbook_path = first_present(names, WORKBOOK_PATHS).ok_or_else(|| {
        XlsxError::MissingPart(format!("workbook part (tried {})", WORKBOOK_PATHS.join(", ")))
    })?;

    let worksheet_dir = worksheet_dir(names);
    let shared_strings_path = first_present(names, SHARED_STRINGS_PATHS).unwrap_or_default();
    let relationships_path = first_present(names, RELATIONSHIPS_PATHS).unwrap_or_default();
    let worksheet_paths = worksheet_paths(names, worksheet_dir);

    let workbook = archive.read_entry(workbook_path)?;
    let namespaces = namespaces(&String::from_utf8_lossy(&workbook));
    let (sheet_element, relationship_id_attribute) = sheet_naming(&workbook);

    let structure = PackageStructure {
        worksheet_dir: worksheet_dir.to_string(),
        workbook_path: workbook_path.to_string(),
        shared_strings_path: shared_strings_path.to_string(),
        relationships_path: relationships_path.to_string(),
        namespaces,
        worksheet_paths,
        sheet_element,
        relationship_id_attribute,
        has_shared_strings: !shared_strings_path.is_empty(),
        metadata: metadata(archive),
    };

    log::debug!(
        "detected workbook {} with {} worksheet parts under {} (shared strings: {}, relationships: {})",
        structure.workbook_path,
        structure.worksheet_paths.len(),
        structure.worksheet_dir,
        if structure.has_shared_strings {
            structure.shared_strings_path.as_str()
        } else {
            "none"
        },
        if structure.has_relationships() {
            structure.relationships_path.as_str()
        } else {
            "none"
        },
    );

    Ok(structure)
}

/// First candidate that names an existing entry, compared exactly
fn first_present(names: &[String], candidates: &[&'static str]) -> Option<&'static str> {
    candidates
        .iter()
        .copied()
        .find(|candidate| names.iter().any(|n| n == *candidate))
}

fn worksheet_dir(names: &[String]) -> &'static str {
    WORKSHEET_DIRS
        .iter()
        .copied()
        .find(|dir| {
            names
                .iter()
                .any(|n| n.starts_with(dir) && n.ends_with(".xml"))
        })
        .unwrap_or(DEFAULT_WORKSHEET_DIR)
}

fn worksheet_paths(names: &[String], dir: &str) -> Vec<String> {
    let mut numbered: Vec<(u64, &String)> = names
        .iter()
        .filter_map(|n| {
            let file_name = n.strip_prefix(dir)?;
            let caps = WORKSHEET_NAME.captures(file_name)?;
            let number = caps[1].parse().unwrap_or(u64::MAX);
            Some((number, n))
        })
        .collect();
    numbered.sort_by_key(|(number, _)| *number);
    numbered.into_iter().map(|(_, n)| n.clone()).collect()
}

fn namespaces(workbook: &str) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for caps in NAMESPACE_DECL.captures_iter(workbook) {
        let prefix = caps.get(1).map_or("", |m| m.as_str());
        map.entry(prefix.to_string())
            .or_insert_with(|| caps[2].to_string());
    }
    map
}

fn is_relationship_id(value: &str) -> bool {
    value
        .strip_prefix("rId")
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}

/// Qualified names of the sheet declaration element and of its relationship
/// id attribute, taken from the first element whose local name is `sheet`
fn sheet_naming(workbook: &[u8]) -> (String, String) {
    let mut reader = Reader::from_reader(workbook);
    reader.trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if e.local_name().as_ref().eq_ignore_ascii_case(b"sheet") {
                    let element = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    let attribute = e
                        .attributes()
                        .flatten()
                        .find_map(|attr| {
                            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
                            let value = attr.unescape_value().ok()?;
                            (key.to_ascii_lowercase().contains("id") && is_relationship_id(&value))
                                .then_some(key)
                        })
                        .unwrap_or_else(|| DEFAULT_RELATIONSHIP_ID.to_string());
                    return (element, attribute);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                log::debug!("workbook part is not well formed ({e}), using default sheet names");
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    (
        DEFAULT_SHEET_ELEMENT.to_string(),
        DEFAULT_RELATIONSHIP_ID.to_string(),
    )
}

fn metadata(archive: &dyn PackageArchive) -> PackageMetadata {
    let names = archive.entry_names();
    let (compressed, uncompressed) = archive.entry_sizes();

    PackageMetadata {
        total_entries: names.len(),
        has_macros: names.iter().any(|n| n.contains(MACRO_MARKER)),
        format_family: format_family(archive).to_string(),
        compression_ratio: compression_ratio(compressed, uncompressed),
    }
}

fn format_family(archive: &dyn PackageArchive) -> &'static str {
    if !archive.contains(CONTENT_TYPES_PATH) {
        return UNKNOWN_FAMILY;
    }
    match archive.read_entry(CONTENT_TYPES_PATH) {
        Ok(bytes) if String::from_utf8_lossy(&bytes).contains(SPREADSHEETML_MARKER) => OOXML_FAMILY,
        Ok(_) => UNKNOWN_FAMILY,
        Err(e) => {
            log::debug!("could not read {CONTENT_TYPES_PATH}: {e}");
            UNKNOWN_FAMILY
        }
    }
}

fn compression_ratio(compressed: u64, uncompressed: u64) -> f64 {
    if uncompressed == 0 {
        return 0.0;
    }
    let saved = (1.0 - compressed as f64 / uncompressed as f64) * 100.0;
    (saved * 100.0).round() / 100.0
}
