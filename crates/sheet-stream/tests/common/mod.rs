//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::io::{Cursor, Write};
use std::path::PathBuf;

use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
pub const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub const WORKSHEET_REL: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";

/// Builds an in-memory package entry by entry.
#[derive(Debug, Clone)]
pub struct PackageBuilder {
    entries: Vec<(String, String)>,
    method: CompressionMethod,
}

impl Default for PackageBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PackageBuilder {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            method: CompressionMethod::Deflated,
        }
    }

    pub fn entry(mut self, name: &str, content: impl Into<String>) -> Self {
        self.entries.push((name.to_string(), content.into()));
        self
    }

    pub fn stored(mut self) -> Self {
        self.method = CompressionMethod::Stored;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(self.method);
        for (name, content) in &self.entries {
            zip.start_file(name.as_str(), options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    /// Write the package to a temporary directory
    pub fn write_temp(&self, file_name: &str) -> (TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(file_name);
        std::fs::write(&path, self.build()).unwrap();
        (dir, path)
    }
}

/// A conventional Excel package: content types, workbook, relationships,
/// optional shared strings and one worksheet part per sheet
pub fn standard_package(sheets: &[(&str, Vec<String>)], strings: Option<&[&str]>) -> PackageBuilder {
    let names: Vec<&str> = sheets.iter().map(|(name, _)| *name).collect();
    let mut builder = PackageBuilder::new()
        .entry("[Content_Types].xml", content_types_xml(sheets.len()))
        .entry("xl/workbook.xml", workbook_xml(&names))
        .entry("xl/_rels/workbook.xml.rels", workbook_rels_xml(sheets.len()));

    if let Some(strings) = strings {
        builder = builder.entry("xl/sharedStrings.xml", shared_strings_xml(strings));
    }

    for (i, (_, rows)) in sheets.iter().enumerate() {
        builder = builder.entry(
            &format!("xl/worksheets/sheet{}.xml", i + 1),
            worksheet_xml(rows),
        );
    }
    builder
}

pub fn content_types_xml(sheet_count: usize) -> String {
    let overrides: String = (1..=sheet_count)
        .map(|i| {
            format!(
                r#"<Override PartName="/xl/worksheets/sheet{i}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>{overrides}</Types>"#
    )
}

pub fn workbook_xml(names: &[&str]) -> String {
    let sheets: String = names
        .iter()
        .enumerate()
        .map(|(i, name)| format!(r#"<sheet name="{name}" sheetId="{0}" r:id="rId{0}"/>"#, i + 1))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="{MAIN_NS}" xmlns:r="{REL_NS}"><bookViews><workbookView/></bookViews><sheets>{sheets}</sheets></workbook>"#
    )
}

pub fn workbook_rels_xml(count: usize) -> String {
    let rels: String = (1..=count)
        .map(|i| {
            format!(
                r#"<Relationship Id="rId{i}" Type="{WORKSHEET_REL}" Target="worksheets/sheet{i}.xml"/>"#
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{rels}</Relationships>"#
    )
}

pub fn shared_strings_xml(strings: &[&str]) -> String {
    let items: String = strings.iter().map(|s| format!("<si><t>{s}</t></si>")).collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="{MAIN_NS}" count="{0}" uniqueCount="{0}">{items}</sst>"#,
        strings.len()
    )
}

pub fn worksheet_xml(rows: &[String]) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="{MAIN_NS}" xmlns:r="{REL_NS}"><sheetViews><sheetView workbookViewId="0"/></sheetViews><sheetData>
{}
</sheetData><pageMargins left="0.7" right="0.7" top="0.75" bottom="0.75" header="0.3" footer="0.3"/></worksheet>"#,
        rows.join("\n")
    )
}

/// Column letters for a 0-based column (enough for the fixtures)
pub fn column_letters(col: usize) -> String {
    let mut n = col + 1;
    let mut letters = Vec::new();
    while n > 0 {
        let rem = (n - 1) % 26;
        letters.push((b'A' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Row of shared-string cells
pub fn shared_row(number: usize, ids: &[usize]) -> String {
    let cells: String = ids
        .iter()
        .enumerate()
        .map(|(i, id)| format!(r#"<c r="{}{number}" t="s"><v>{id}</v></c>"#, column_letters(i)))
        .collect();
    format!(r#"<row r="{number}">{cells}</row>"#)
}

/// Row of numeric cells
pub fn number_row(number: usize, values: &[f64]) -> String {
    let cells: String = values
        .iter()
        .enumerate()
        .map(|(i, v)| format!(r#"<c r="{}{number}"><v>{v}</v></c>"#, column_letters(i)))
        .collect();
    format!(r#"<row r="{number}">{cells}</row>"#)
}

/// Row of inline-string cells
pub fn inline_row(number: usize, texts: &[&str]) -> String {
    let cells: String = texts
        .iter()
        .enumerate()
        .map(|(i, t)| {
            format!(
                r#"<c r="{}{number}" t="inlineStr"><is><t>{t}</t></is></c>"#,
                column_letters(i)
            )
        })
        .collect();
    format!(r#"<row r="{number}">{cells}</row>"#)
}

/// `count` rows, each holding its number, a label and a padded note
pub fn numbered_rows(count: usize) -> Vec<String> {
    (1..=count)
        .map(|n| {
            format!(
                r#"<row r="{n}" spans="1:3"><c r="A{n}"><v>{n}</v></c><c r="B{n}" t="inlineStr"><is><t>row {n}</t></is></c><c r="C{n}" t="str"><v>{}</v></c></row>"#,
                "x".repeat(n % 97)
            )
        })
        .collect()
}
