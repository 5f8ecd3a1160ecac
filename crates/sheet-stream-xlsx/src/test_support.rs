//! In-memory fixture packages for unit tests

use std::io::{Cursor, Write};
use std::sync::Arc;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::archive::{PackageArchive, ZipPackage};

fn build(entries: &[(&str, &str)], method: CompressionMethod) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(method);
    for (name, content) in entries {
        zip.start_file(*name, options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// Deflated package from (name, content) pairs
pub(crate) fn build_package(entries: &[(&str, &str)]) -> Vec<u8> {
    build(entries, CompressionMethod::Deflated)
}

/// Stored (uncompressed) package from (name, content) pairs
pub(crate) fn build_stored_package(entries: &[(&str, &str)]) -> Vec<u8> {
    build(entries, CompressionMethod::Stored)
}

pub(crate) fn archive(entries: &[(&str, &str)]) -> Arc<dyn PackageArchive> {
    Arc::new(ZipPackage::from_bytes(build_package(entries)).unwrap())
}

/// `<sst>` body for the given strings
pub(crate) fn shared_strings_xml(strings: &[&str]) -> String {
    let items: String = strings
        .iter()
        .map(|s| format!("<si><t>{s}</t></si>"))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{0}" uniqueCount="{0}">{1}</sst>"#,
        strings.len(),
        items
    )
}

/// Worksheet part wrapping the given `<row>` units
pub(crate) fn worksheet_xml(rows: &[String]) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><dimension ref="A1"/><sheetData>
{}
</sheetData><pageMargins left="0.7" right="0.7" top="0.75" bottom="0.75" header="0.3" footer="0.3"/></worksheet>"#,
        rows.join("\n")
    )
}

/// Workbook part declaring the given sheet names as rId1..rIdN
pub(crate) fn workbook_xml(names: &[&str]) -> String {
    let sheets: String = names
        .iter()
        .enumerate()
        .map(|(i, n)| format!(r#"<sheet name="{n}" sheetId="{0}" r:id="rId{0}"/>"#, i + 1))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets>{sheets}</sheets></workbook>"#
    )
}

/// Relationships part mapping rIdN to `worksheets/sheetN.xml`
pub(crate) fn workbook_rels_xml(count: usize) -> String {
    let rels: String = (1..=count)
        .map(|i| {
            format!(
                r#"<Relationship Id="rId{i}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{i}.xml"/>"#
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{rels}</Relationships>"#
    )
}

/// A row of shared-string cells referencing the given ids
pub(crate) fn shared_row(number: usize, ids: &[usize]) -> String {
    let cells: String = ids
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let col = (b'A' + i as u8) as char;
            format!(r#"<c r="{col}{number}" t="s"><v>{id}</v></c>"#)
        })
        .collect();
    format!(r#"<row r="{number}">{cells}</row>"#)
}

/// A row of numeric cells
pub(crate) fn number_row(number: usize, values: &[f64]) -> String {
    let cells: String = values
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let col = (b'A' + i as u8) as char;
            format!(r#"<c r="{col}{number}"><v>{v}</v></c>"#)
        })
        .collect();
    format!(r#"<row r="{number}">{cells}</row>"#)
}
