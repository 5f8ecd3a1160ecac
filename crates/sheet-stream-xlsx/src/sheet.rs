//! Worksheets: sequential iteration, indexed access and search

use std::fmt;
use std::io::Read;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use regex::Regex;

use crate::archive::PackageArchive;
use crate::error::XlsxResult;
use crate::row::{MatchMode, Row};
use crate::scan::{ElementPattern, ElementScanner, ScanOptions};
use crate::shared_strings::SharedStringTable;
use crate::store::IndexedPart;

/// A declared sheet and the worksheet part it resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetDescriptor {
    pub name: String,
    /// 0-based declaration order in the workbook
    pub index: usize,
    /// Worksheet part inside the package
    pub path: String,
}

/// Periodic shared string cache compaction during iteration.
///
/// Long scans over sheets with many distinct strings would otherwise keep the
/// cache full of entries that are never read again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompactionPolicy {
    Disabled,
    /// Trim the cache to `keep` entries after every `every` rows
    TrimEvery { every: u64, keep: usize },
    /// Empty the cache after every `every` rows
    ClearEvery { every: u64 },
}

impl Default for CompactionPolicy {
    fn default() -> Self {
        CompactionPolicy::TrimEvery {
            every: 5000,
            keep: 100,
        }
    }
}

impl CompactionPolicy {
    pub(crate) fn apply(self, processed: u64, strings: &SharedStringTable) {
        match self {
            CompactionPolicy::TrimEvery { every, keep } if every > 0 && processed % every == 0 => {
                log::trace!("row {processed}: trimming string cache to {keep}");
                strings.trim_cache(keep);
            }
            CompactionPolicy::ClearEvery { every } if every > 0 && processed % every == 0 => {
                log::trace!("row {processed}: clearing string cache");
                strings.clear_cache();
            }
            _ => {}
        }
    }
}

/// One worksheet of a package.
///
/// Sequential reads ([`Sheet::rows`] and everything built on it) stream the
/// worksheet part straight out of the archive. Random access through
/// [`Sheet::row`] first copies the part to a temporary file and indexes the
/// byte span of every row; that happens at most once until
/// [`Sheet::release`] is called.
pub struct Sheet {
    descriptor: SheetDescriptor,
    archive: Arc<dyn PackageArchive>,
    strings: Arc<SharedStringTable>,
    options: ScanOptions,
    compaction: CompactionPolicy,
    indexed: OnceCell<IndexedPart>,
}

impl Sheet {
    pub(crate) fn new(
        descriptor: SheetDescriptor,
        archive: Arc<dyn PackageArchive>,
        strings: Arc<SharedStringTable>,
        options: ScanOptions,
        compaction: CompactionPolicy,
    ) -> Self {
        Self {
            descriptor,
            archive,
            strings,
            options,
            compaction,
            indexed: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// 0-based declaration order
    pub fn index(&self) -> usize {
        self.descriptor.index
    }

    /// Worksheet part path inside the package
    pub fn path(&self) -> &str {
        &self.descriptor.path
    }

    pub fn descriptor(&self) -> &SheetDescriptor {
        &self.descriptor
    }

    pub fn compaction(&self) -> CompactionPolicy {
        self.compaction
    }

    pub fn set_compaction(&mut self, policy: CompactionPolicy) {
        self.compaction = policy;
    }

    /// The package's shared string table
    pub fn shared_strings(&self) -> &Arc<SharedStringTable> {
        &self.strings
    }

    /// Stream the rows in document order, numbered from 1.
    ///
    /// Opening the worksheet part is the only thing done up front; rows are
    /// read chunk by chunk as the iterator advances.
    pub fn rows(&self) -> XlsxResult<RowIter> {
        let stream = self.archive.open_entry(&self.descriptor.path)?;
        Ok(RowIter {
            scanner: Some(ElementScanner::new(stream, ElementPattern::row(), self.options)),
            strings: Arc::clone(&self.strings),
            compaction: self.compaction,
            produced: 0,
        })
    }

    /// Fetch row `number` (1-based) through the row index.
    ///
    /// Returns `None` for 0 and for numbers past the last row.
    pub fn row(&self, number: u32) -> XlsxResult<Option<Row>> {
        if number == 0 {
            return Ok(None);
        }
        let part = self.part()?;
        let markup = part.read_unit(number as usize - 1)?;
        Ok(markup.map(|m| Row::new(number, m, Arc::clone(&self.strings))))
    }

    /// Build the row index now instead of on the first [`Sheet::row`] call
    pub fn build_index(&self) -> XlsxResult<()> {
        self.part().map(|_| ())
    }

    pub fn is_indexed(&self) -> bool {
        self.indexed.get().is_some()
    }

    /// Number of rows (builds the index)
    pub fn row_count(&self) -> XlsxResult<usize> {
        Ok(self.part()?.index().len())
    }

    /// Drop the row index and its temporary copy
    pub fn release(&mut self) {
        if self.indexed.take().is_some() {
            log::debug!("released row index of sheet '{}'", self.descriptor.name);
        }
    }

    /// First row holding a cell equal to `value` under `mode`
    pub fn find_row(&self, value: &str, mode: MatchMode) -> XlsxResult<Option<Row>> {
        self.find_first(|row| row.contains(value, mode))
    }

    /// First row with a cell matching the regular expression `pattern`
    pub fn find_row_by_pattern(&self, pattern: &str) -> XlsxResult<Option<Row>> {
        let pattern = Regex::new(pattern)?;
        self.find_first(|row| row.matches(&pattern))
    }

    /// Rows accepted by `predicate`, stopping after `limit` hits.
    ///
    /// Every row is decoded before it is handed to the predicate.
    pub fn find_rows<F>(&self, mut predicate: F, limit: Option<usize>) -> XlsxResult<Vec<Row>>
    where
        F: FnMut(&mut Row) -> XlsxResult<bool>,
    {
        let mut found = Vec::new();
        if limit == Some(0) {
            return Ok(found);
        }

        for row in self.rows()? {
            let mut row = row?;
            row.decode()?;
            if predicate(&mut row)? {
                found.push(row);
                if limit.is_some_and(|limit| found.len() >= limit) {
                    break;
                }
            }
        }
        Ok(found)
    }

    /// Rows with a cell matching `pattern`, up to `limit`
    pub fn find_rows_by_pattern(&self, pattern: &str, limit: Option<usize>) -> XlsxResult<Vec<Row>> {
        let pattern = Regex::new(pattern)?;
        self.find_rows(|row| row.matches(&pattern), limit)
    }

    /// Every row accepted by `predicate`
    pub fn filter<F>(&self, predicate: F) -> XlsxResult<Vec<Row>>
    where
        F: FnMut(&mut Row) -> XlsxResult<bool>,
    {
        self.find_rows(predicate, None)
    }

    fn find_first<F>(&self, predicate: F) -> XlsxResult<Option<Row>>
    where
        F: FnMut(&mut Row) -> XlsxResult<bool>,
    {
        Ok(self.find_rows(predicate, Some(1))?.into_iter().next())
    }

    fn part(&self) -> XlsxResult<&IndexedPart> {
        self.indexed.get_or_try_init(|| {
            IndexedPart::build(
                &*self.archive,
                &self.descriptor.path,
                ElementPattern::row(),
                &self.options,
            )
        })
    }
}

impl fmt::Debug for Sheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sheet")
            .field("descriptor", &self.descriptor)
            .field("compaction", &self.compaction)
            .field("indexed", &self.is_indexed())
            .finish()
    }
}

/// Sequential row iterator returned by [`Sheet::rows`].
///
/// Holds the open worksheet stream and at most one chunk of pending markup.
/// The stream is released as soon as the iterator is exhausted, fails, or is
/// dropped.
pub struct RowIter {
    scanner: Option<ElementScanner<Box<dyn Read + Send>>>,
    strings: Arc<SharedStringTable>,
    compaction: CompactionPolicy,
    produced: u32,
}

impl Iterator for RowIter {
    type Item = XlsxResult<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        let scanner = self.scanner.as_mut()?;
        match scanner.next_unit() {
            Ok(Some((_, unit))) => {
                let markup = String::from_utf8_lossy(unit).into_owned();
                self.produced += 1;
                self.compaction
                    .apply(u64::from(self.produced), &self.strings);
                Some(Ok(Row::new(
                    self.produced,
                    markup,
                    Arc::clone(&self.strings),
                )))
            }
            Ok(None) => {
                self.scanner = None;
                None
            }
            Err(e) => {
                self.scanner = None;
                Some(Err(e))
            }
        }
    }
}

impl fmt::Debug for RowIter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowIter")
            .field("produced", &self.produced)
            .field("finished", &self.scanner.is_none())
            .finish()
    }
}
