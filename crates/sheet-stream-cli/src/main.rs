//! sheet-stream CLI - read rows out of very large spreadsheets

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use sheet_stream::prelude::*;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "sheet-stream")]
#[command(
    author,
    version,
    about = "Stream, index and search rows of large spreadsheets"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show package structure and sheet information
    Info {
        /// Input spreadsheet file (xlsx, xlsm)
        input: PathBuf,

        /// Also count the rows of every sheet (scans each sheet once)
        #[arg(short, long)]
        count: bool,
    },

    /// List all sheets in a workbook
    Sheets {
        /// Input spreadsheet file
        input: PathBuf,
    },

    /// Stream rows as delimited text to stdout
    #[command(alias = "csv")]
    Rows {
        /// Input spreadsheet file
        input: PathBuf,

        /// Sheet index (0-based, default: 0)
        #[arg(short, long, default_value = "0")]
        sheet: usize,

        /// Stop after this many rows
        #[arg(short, long)]
        limit: Option<usize>,

        /// Field delimiter (default: comma)
        #[arg(short, long, default_value = ",")]
        delimiter: char,

        /// Prefix each line with its row number
        #[arg(short = 'n', long)]
        numbers: bool,
    },

    /// Print a single row by its 1-based number
    Row {
        /// Input spreadsheet file
        input: PathBuf,

        /// Row number (1-based)
        number: u32,

        /// Sheet index (0-based, default: 0)
        #[arg(short, long, default_value = "0")]
        sheet: usize,
    },

    /// Find rows containing a value or matching a pattern
    Find {
        /// Input spreadsheet file
        input: PathBuf,

        /// Exact cell value to look for
        #[arg(short, long, conflicts_with = "pattern", required_unless_present = "pattern")]
        value: Option<String>,

        /// Regular expression matched against every cell
        #[arg(short, long)]
        pattern: Option<String>,

        /// Trim and ignore case, compare numbers numerically
        #[arg(long, requires = "value")]
        loose: bool,

        /// Sheet index (0-based, default: 0)
        #[arg(short, long, default_value = "0")]
        sheet: usize,

        /// Report every matching row instead of the first
        #[arg(short, long)]
        all: bool,

        /// Maximum number of rows to report with --all
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Info { input, count } => show_info(&input, count),
        Commands::Sheets { input } => list_sheets(&input),
        Commands::Rows {
            input,
            sheet,
            limit,
            delimiter,
            numbers,
        } => stream_rows(&input, sheet, limit, delimiter, numbers),
        Commands::Row {
            input,
            number,
            sheet,
        } => print_row(&input, sheet, number),
        Commands::Find {
            input,
            value,
            pattern,
            loose,
            sheet,
            all,
            limit,
        } => {
            let query = match (value, pattern) {
                (Some(value), _) => Query::Value {
                    value,
                    mode: if loose { MatchMode::Loose } else { MatchMode::Strict },
                },
                (None, Some(pattern)) => Query::Pattern(pattern),
                (None, None) => bail!("either --value or --pattern is required"),
            };
            find(&input, sheet, &query, all, limit)
        }
    }
}

enum Query {
    Value { value: String, mode: MatchMode },
    Pattern(String),
}

fn open(input: &Path) -> Result<Workbook> {
    sheet_stream::open(input).with_context(|| format!("Failed to open '{}'", input.display()))
}

fn sheet_at(workbook: &Workbook, index: usize) -> Result<&Sheet> {
    workbook
        .sheet(index)
        .with_context(|| format!("Sheet index {} not found", index))
}

fn stream_rows(
    input: &Path,
    sheet_idx: usize,
    limit: Option<usize>,
    delimiter: char,
    numbers: bool,
) -> Result<()> {
    let workbook = open(input)?;
    let sheet = sheet_at(&workbook, sheet_idx)?;

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut written = 0usize;

    for row in sheet.rows()?.take(limit.unwrap_or(usize::MAX)) {
        let mut row = row.with_context(|| format!("Failed to read row {}", written + 1))?;
        write_row(&mut out, &mut row, delimiter, numbers)?;
        written += 1;
    }
    out.flush().context("Failed to write to stdout")?;

    eprintln!("{} rows from '{}'", written, sheet.name());
    Ok(())
}

fn print_row(input: &Path, sheet_idx: usize, number: u32) -> Result<()> {
    let workbook = open(input)?;
    let sheet = sheet_at(&workbook, sheet_idx)?;

    let Some(mut row) = sheet.row(number)? else {
        bail!(
            "Row {} not found ('{}' has {} rows)",
            number,
            sheet.name(),
            sheet.row_count()?
        );
    };

    for (i, cell) in row.cells()?.iter().enumerate() {
        let label = cell.reference().map_or_else(|| format!("#{}", i), str::to_string);
        println!("{}\t{:?}\t{}", label, cell.cell_type(), cell.value());
    }
    Ok(())
}

fn find(input: &Path, sheet_idx: usize, query: &Query, all: bool, limit: Option<usize>) -> Result<()> {
    let workbook = open(input)?;
    let sheet = sheet_at(&workbook, sheet_idx)?;

    let rows: Vec<Row> = match (query, all) {
        (Query::Value { value, mode }, false) => sheet.find_row(value, *mode)?.into_iter().collect(),
        (Query::Pattern(pattern), false) => sheet.find_row_by_pattern(pattern)?.into_iter().collect(),
        (Query::Value { value, mode }, true) => {
            sheet.find_rows(|row| row.contains(value, *mode), limit)?
        }
        (Query::Pattern(pattern), true) => sheet.find_rows_by_pattern(pattern, limit)?,
    };

    if rows.is_empty() {
        eprintln!("No matching rows");
        return Ok(());
    }

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let matched = rows.len();
    for mut row in rows {
        write_row(&mut out, &mut row, ',', true)?;
    }
    out.flush().context("Failed to write to stdout")?;
    eprintln!("{} matching rows", matched);
    Ok(())
}

fn write_row(out: &mut impl Write, row: &mut Row, delimiter: char, numbers: bool) -> Result<()> {
    let number = row.number();
    let fields: Vec<String> = row
        .cells()?
        .iter()
        .map(|cell| quote_field(cell.value(), delimiter))
        .collect();

    if numbers {
        write!(out, "{}{}", number, delimiter)?;
    }
    writeln!(out, "{}", fields.join(&delimiter.to_string())).context("Failed to write to stdout")
}

/// Quote a value for delimited output when necessary
fn quote_field(text: &str, delimiter: char) -> String {
    if text.contains(delimiter) || text.contains('"') || text.contains('\n') || text.contains('\r')
    {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}

fn show_info(input: &Path, count: bool) -> Result<()> {
    let workbook = open(input)?;
    let structure = workbook.structure();
    let meta = &structure.metadata;

    println!("File: {}", input.display());
    println!("Format: {}", meta.format_family);
    println!("Entries: {}", meta.total_entries);
    println!("Compression ratio: {:.2}", meta.compression_ratio);
    println!("Macros: {}", if meta.has_macros { "yes" } else { "no" });
    println!("Workbook part: {}", structure.workbook_path);
    println!(
        "Shared strings: {}",
        if structure.has_shared_strings {
            structure.shared_strings_path.as_str()
        } else {
            "none"
        }
    );
    println!("Sheets: {}", workbook.sheet_count());

    for sheet in workbook.sheets() {
        println!();
        println!("  Sheet {}: \"{}\"", sheet.index(), sheet.name());
        println!("    Part: {}", sheet.path());
        if count {
            let rows = sheet
                .rows()?
                .try_fold(0usize, |n, row| row.map(|_| n + 1))
                .with_context(|| format!("Failed to scan '{}'", sheet.name()))?;
            println!("    Rows: {}", rows);
        }
    }

    Ok(())
}

fn list_sheets(input: &Path) -> Result<()> {
    let workbook = open(input)?;

    for sheet in workbook.sheets() {
        println!("{}\t{}\t{}", sheet.index(), sheet.name(), sheet.path());
    }

    Ok(())
}
