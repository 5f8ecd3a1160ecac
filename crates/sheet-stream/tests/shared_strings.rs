//! Shared string resolution through whole workbooks

mod common;

use std::sync::Arc;

use common::*;
use pretty_assertions::assert_eq;
use sheet_stream::prelude::*;

fn package_with_sst(items: &str, rows: Vec<String>) -> Vec<u8> {
    let sst = format!(r#"<?xml version="1.0" encoding="UTF-8"?><sst xmlns="{MAIN_NS}">{items}</sst>"#);
    PackageBuilder::new()
        .entry("xl/workbook.xml", workbook_xml(&["Strings"]))
        .entry("xl/_rels/workbook.xml.rels", workbook_rels_xml(1))
        .entry("xl/sharedStrings.xml", sst)
        .entry("xl/worksheets/sheet1.xml", worksheet_xml(&rows))
        .build()
}

/// Plain, rich, escaped and phonetic items resolve to their display text
#[test]
fn test_item_forms() {
    let items = concat!(
        "<si><t>Hello</t></si>",
        r#"<si><r><rPr><b/></rPr><t>Hel</t></r><r><t xml:space="preserve">lo</t></r></si>"#,
        "<si><t>A &amp; B &lt; C</t></si>",
        "<si><t>Tab_x0009_here</t></si>",
        r#"<si><t>東京</t><rPh sb="0" eb="2"><t>トウキョウ</t></rPh></si>"#,
        "<si><t/></si>",
        "<si/>",
    );
    let bytes = package_with_sst(items, vec![shared_row(1, &[0, 1, 2, 3, 4, 5, 6])]);
    let wb = Workbook::from_bytes(bytes).unwrap();
    let strings = wb.shared_strings();

    assert_eq!(strings.len().unwrap(), 7);
    assert_eq!(strings.get(0).unwrap(), "Hello");
    assert_eq!(strings.get(1).unwrap(), "Hello");
    assert_eq!(strings.get(2).unwrap(), "A & B < C");
    assert_eq!(strings.get(3).unwrap(), "Tab\there");
    assert_eq!(strings.get(4).unwrap(), "東京");
    assert_eq!(strings.get(5).unwrap(), "");
    assert_eq!(strings.get(6).unwrap(), "");

    let mut row = wb.sheet(0).unwrap().row(1).unwrap().unwrap();
    let cells = row.cells().unwrap();
    assert_eq!(cells[1].value(), "Hello");
    assert_eq!(cells[1].cell_type(), CellType::String);
}

/// The `<c r="B2" t="s"><v>3</v></c>` cell resolves through the table
#[test]
fn test_shared_cell_lookup() {
    let strings = ["Item", "Qty", "Price", "Total"];
    let rows = vec![
        shared_row(1, &[0, 1, 2]),
        r#"<row r="2"><c r="A2"><v>12</v></c><c r="B2" t="s"><v>3</v></c></row>"#.to_string(),
    ];
    let bytes = standard_package(&[("Sheet1", rows)], Some(&strings[..])).build();
    let wb = Workbook::from_bytes(bytes).unwrap();

    let mut row = wb.sheet(0).unwrap().row(2).unwrap().unwrap();
    let cell = row.cell(1).unwrap().unwrap();
    assert_eq!(cell.value(), "Total");
    assert_eq!(cell.cell_type(), CellType::String);
    assert_eq!(cell.reference(), Some("B2"));
}

/// Repeated lookups return the same value and hit the cache
#[test]
fn test_repeat_lookups_hit_cache() {
    let strings: Vec<String> = (0..50).map(|i| format!("value {i}")).collect();
    let refs: Vec<&str> = strings.iter().map(String::as_str).collect();
    let rows: Vec<String> = (1..=100).map(|n| shared_row(n, &[n % 5])).collect();
    let bytes = standard_package(&[("Data", rows)], Some(&refs[..])).build();
    let wb = Workbook::from_bytes(bytes).unwrap();

    let values: Vec<String> = wb
        .sheet(0)
        .unwrap()
        .rows()
        .unwrap()
        .map(|r| r.unwrap().values().unwrap().remove(0))
        .collect();
    assert_eq!(values[0], "value 1");
    assert_eq!(values[4], "value 0");
    assert_eq!(values[99], "value 0");

    let stats = wb.shared_strings().stats();
    assert_eq!(stats.index_builds, 1);
    assert_eq!(stats.misses, 5);
    assert_eq!(stats.hits, 95);
    assert_eq!(stats.cached, 5);
    assert_eq!(stats.total_strings, 50);
}

/// Trimming or clearing the cache never changes a value
#[test]
fn test_trim_and_clear_keep_values_correct() {
    let strings: Vec<String> = (0..30).map(|i| format!("s{i}")).collect();
    let refs: Vec<&str> = strings.iter().map(String::as_str).collect();
    let bytes = standard_package(&[("Data", vec![shared_row(1, &[0])])], Some(&refs[..])).build();
    let wb = Workbook::from_bytes(bytes).unwrap();
    let table = wb.shared_strings();

    let before: Vec<String> = (0..30).map(|i| table.get(i).unwrap()).collect();
    table.trim_cache(3);
    assert_eq!(table.stats().cached, 3);
    let after_trim: Vec<String> = (0..30).map(|i| table.get(i).unwrap()).collect();
    table.clear_cache();
    assert_eq!(table.stats().cached, 0);
    let after_clear: Vec<String> = (0..30).map(|i| table.get(i).unwrap()).collect();

    assert_eq!(before, strings);
    assert_eq!(after_trim, before);
    assert_eq!(after_clear, before);
    assert_eq!(table.stats().index_builds, 1);
}

/// A small cache capacity evicts but still resolves correctly
#[test]
fn test_bounded_capacity() {
    let strings: Vec<String> = (0..40).map(|i| format!("cap{i}")).collect();
    let refs: Vec<&str> = strings.iter().map(String::as_str).collect();
    let rows: Vec<String> = (1..=40).map(|n| shared_row(n, &[n - 1])).collect();
    let bytes = standard_package(&[("Data", rows)], Some(&refs[..])).build();
    let options = ReadOptions {
        string_cache_capacity: 8,
        ..ReadOptions::default()
    };
    let wb = Workbook::from_bytes_with(bytes, options).unwrap();

    for (i, row) in wb.sheet(0).unwrap().rows().unwrap().enumerate() {
        assert_eq!(row.unwrap().values().unwrap(), vec![format!("cap{i}")]);
    }
    let stats = wb.shared_strings().stats();
    assert_eq!(stats.capacity, 8);
    assert!(stats.cached <= 8);
}

/// Without a shared string part every id resolves to ""
#[test]
fn test_missing_shared_strings() {
    let rows = vec![
        shared_row(1, &[0, 7]),
        inline_row(2, &["still readable"]),
    ];
    let bytes = standard_package(&[("NoStrings", rows)], None).build();
    let wb = Workbook::from_bytes(bytes).unwrap();
    let table = wb.shared_strings();

    assert!(!wb.structure().has_shared_strings);
    assert!(!table.has_shared_strings());
    assert_eq!(table.get(0).unwrap(), "");
    assert_eq!(table.len().unwrap(), 0);

    let values: Vec<Vec<String>> = wb
        .sheet(0)
        .unwrap()
        .rows()
        .unwrap()
        .map(|r| r.unwrap().values().unwrap())
        .collect();
    assert_eq!(values, vec![vec!["", ""], vec!["still readable"]]);
}

/// Inline strings never build the shared string index
#[test]
fn test_inline_cells_do_not_touch_table() {
    let rows = vec![inline_row(1, &["a", "b"]), number_row(2, &[1.0, 2.0])];
    let bytes = standard_package(&[("Inline", rows)], Some(&["unused"][..])).build();
    let wb = Workbook::from_bytes(bytes).unwrap();

    let count = wb.sheet(0).unwrap().rows().unwrap().map(|r| r.unwrap().values().unwrap().len()).sum::<usize>();
    assert_eq!(count, 4);
    let stats = wb.shared_strings().stats();
    assert_eq!(stats.index_builds, 0);
    assert_eq!(stats.hits + stats.misses, 0);
}

/// Warming up loads the first ids into the cache
#[test]
fn test_warm_up() {
    let strings: Vec<String> = (0..10).map(|i| format!("w{i}")).collect();
    let refs: Vec<&str> = strings.iter().map(String::as_str).collect();
    let bytes = standard_package(&[("Data", vec![shared_row(1, &[9])])], Some(&refs[..])).build();
    let wb = Workbook::from_bytes(bytes).unwrap();
    let table = wb.shared_strings();

    table.warm_up(100).unwrap();
    let stats = table.stats();
    assert_eq!(stats.cached, 10);
    assert_eq!(stats.misses, 10);

    assert_eq!(table.get(9).unwrap(), "w9");
    assert_eq!(table.stats().hits, 1);
}

/// Releasing the workbook drops cached strings but keeps it usable
#[test]
fn test_release_workbook() {
    let bytes = standard_package(
        &[("Data", vec![shared_row(1, &[0, 1])])],
        Some(&["left", "right"][..]),
    )
    .build();
    let mut wb = Workbook::from_bytes(bytes).unwrap();
    assert_eq!(wb.sheet(0).unwrap().row(1).unwrap().unwrap().values().unwrap(), vec!["left", "right"]);
    assert!(wb.sheet(0).unwrap().is_indexed());

    wb.release();
    assert!(!wb.sheet(0).unwrap().is_indexed());
    assert_eq!(wb.shared_strings().stats().cached, 0);
    assert_eq!(wb.sheet(0).unwrap().row(1).unwrap().unwrap().values().unwrap(), vec!["left", "right"]);
}

/// One table serves lookups from several threads
#[test]
fn test_concurrent_lookups() {
    let strings: Vec<String> = (0..200).map(|i| format!("t{i}")).collect();
    let refs: Vec<&str> = strings.iter().map(String::as_str).collect();
    let bytes = standard_package(&[("Data", vec![shared_row(1, &[0])])], Some(&refs[..])).build();
    let options = ReadOptions {
        string_cache_capacity: 16,
        ..ReadOptions::default()
    };
    let wb = Workbook::from_bytes_with(bytes, options).unwrap();
    let table = Arc::clone(wb.shared_strings());

    let handles: Vec<_> = (0..4usize)
        .map(|t| {
            let table = Arc::clone(&table);
            std::thread::spawn(move || {
                (0..200usize)
                    .map(|i| (i * 7 + t * 13) % 200)
                    .all(|id| table.get(id).unwrap() == format!("t{id}"))
            })
        })
        .collect();

    for handle in handles {
        assert!(handle.join().unwrap());
    }
    assert_eq!(table.stats().index_builds, 1);
}
