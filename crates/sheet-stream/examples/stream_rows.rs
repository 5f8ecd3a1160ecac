//! Example: Write a large workbook, then stream, index and search it

use std::io::Write;

use sheet_stream::prelude::*;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const ROWS: usize = 100_000;

fn main() -> XlsxResult<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("orders.xlsx");
    write_sample(&path)?;
    println!("Wrote {} rows to {}", ROWS, path.display());

    let workbook = sheet_stream::open(&path)?;
    let sheet = workbook
        .sheet(0)
        .ok_or_else(|| XlsxError::InvalidFormat("workbook has no sheets".into()))?;

    // Stream every row once
    let mut total = 0.0;
    for row in sheet.rows()? {
        let mut row = row?;
        if let Some(amount) = row.cell(2)?.and_then(Cell::as_number) {
            total += amount;
        }
    }
    println!("Sum of amounts: {total}");

    // Random access builds the row index on first use
    if let Some(mut row) = sheet.row(75_000)? {
        println!("Row 75000: {:?}", row.values()?);
    }
    println!("Indexed rows: {}", sheet.row_count()?);

    // Search
    let hits = sheet.find_rows_by_pattern(r"^ORD-0999\d$", Some(5))?;
    for mut row in hits {
        println!("Match at row {}: {:?}", row.number(), row.values()?);
    }

    println!("Shared strings: {:?}", workbook.shared_strings().stats());
    workbook.close();
    Ok(())
}

fn write_sample(path: &std::path::Path) -> XlsxResult<()> {
    let statuses = ["open", "shipped", "closed"];
    let file = std::fs::File::create(path)?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default();

    zip.start_file("xl/workbook.xml", options)?;
    zip.write_all(
        br#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Orders" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
    )?;

    zip.start_file("xl/_rels/workbook.xml.rels", options)?;
    zip.write_all(
        br#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#,
    )?;

    zip.start_file("xl/sharedStrings.xml", options)?;
    write!(zip, r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#)?;
    for status in statuses {
        write!(zip, "<si><t>{status}</t></si>")?;
    }
    write!(zip, "</sst>")?;

    zip.start_file("xl/worksheets/sheet1.xml", options)?;
    write!(zip, r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#)?;
    for n in 1..=ROWS {
        write!(
            zip,
            r#"<row r="{n}"><c r="A{n}" t="inlineStr"><is><t>ORD-{n:05}</t></is></c><c r="B{n}" t="s"><v>{}</v></c><c r="C{n}"><v>{}.5</v></c></row>"#,
            n % statuses.len(),
            n % 100
        )?;
    }
    write!(zip, "</sheetData></worksheet>")?;

    zip.finish()?;
    Ok(())
}
