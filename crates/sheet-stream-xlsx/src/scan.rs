//! Chunked element scanning
//!
//! Worksheet and shared string parts are scanned as raw bytes, pulling a fixed
//! chunk from the entry stream at a time and extracting complete `<row>` (or
//! `<si>`) units with a regular expression. Every unit is reported together
//! with its absolute byte offset in the decompressed part, so the same scan
//! can feed both streaming iteration and offset indexing.

use std::io::{self, Read};

use once_cell::sync::Lazy;
use regex::bytes::Regex;

use crate::error::XlsxResult;

/// Tunables for the chunked scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    /// Bytes pulled from the entry stream per read
    pub chunk_size: usize,
    /// Pending buffer length above which it gets trimmed
    pub trim_threshold: usize,
    /// Trailing bytes kept when a trim finds no unit in progress
    pub trim_keep: usize,
    /// Longest unit kept in progress; a longer one is dropped like a blind trim
    pub max_unit: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            chunk_size: 8 * 1024,
            trim_threshold: 50_000,
            trim_keep: 10 * 1024,
            max_unit: 64 * 1024 * 1024,
        }
    }
}

impl ScanOptions {
    /// Set the read chunk size
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    /// Set the trim threshold and the number of bytes kept after a blind trim
    pub fn with_trim(mut self, threshold: usize, keep: usize) -> Self {
        self.trim_threshold = threshold;
        self.trim_keep = keep;
        self
    }

    /// Set the longest unit the scanner keeps waiting for
    pub fn with_max_unit(mut self, max_unit: usize) -> Self {
        self.max_unit = max_unit;
        self
    }
}

/// Optional namespace prefix in front of an element name
pub(crate) const PREFIX: &str = r"(?:[A-Za-z_][A-Za-z0-9_.\-]*:)?";

/// Attributes of an opening tag that is not self-closing
pub(crate) const OPEN_ATTRS: &str = r"(?:\s(?:[^>]*[^/>])?)?";

/// Regexes locating one element type in raw markup.
#[derive(Debug)]
pub(crate) struct ElementPattern {
    tag: &'static str,
    /// A complete unit, self-closing or with its closing tag
    unit: Regex,
    /// Just the opening tag
    open: Regex,
}

static ROW: Lazy<ElementPattern> = Lazy::new(|| ElementPattern::new("row"));
static SHARED_ITEM: Lazy<ElementPattern> = Lazy::new(|| ElementPattern::new("si"));

impl ElementPattern {
    fn new(tag: &'static str) -> Self {
        // The full form's opening tag cannot end in `/`, so `<row/>` never
        // runs on into the next row's closing tag.
        let unit = format!(
            r"(?s)<{PREFIX}{tag}(?:\s[^>]*)?/>|<{PREFIX}{tag}{OPEN_ATTRS}>.*?</{PREFIX}{tag}\s*>"
        );
        let open = format!(r"<{PREFIX}{tag}[\s/>]");
        Self {
            tag,
            unit: Regex::new(&unit).expect("unit pattern is valid"),
            open: Regex::new(&open).expect("open tag pattern is valid"),
        }
    }

    /// `<row>` units of a worksheet
    pub(crate) fn row() -> &'static Self {
        &ROW
    }

    /// `<si>` units of a shared string table
    pub(crate) fn shared_item() -> &'static Self {
        &SHARED_ITEM
    }

    pub(crate) fn tag(&self) -> &'static str {
        self.tag
    }
}

/// Pulls complete units out of a byte stream one chunk at a time.
///
/// The pending buffer only ever holds the unconsumed tail of the stream. When
/// it grows past [`ScanOptions::trim_threshold`] it is cut back to the first
/// unit still in progress, or to the last [`ScanOptions::trim_keep`] bytes if
/// there is none. A trailing fragment left at end of stream is dropped.
pub(crate) struct ElementScanner<R> {
    reader: R,
    pattern: &'static ElementPattern,
    options: ScanOptions,
    buffer: Vec<u8>,
    /// Scan position inside `buffer`
    pos: usize,
    /// Absolute offset of `buffer[0]`
    base: u64,
    chunk: Vec<u8>,
    eof: bool,
}

impl<R: Read> ElementScanner<R> {
    pub(crate) fn new(reader: R, pattern: &'static ElementPattern, options: ScanOptions) -> Self {
        Self {
            reader,
            pattern,
            options,
            buffer: Vec::new(),
            pos: 0,
            base: 0,
            chunk: vec![0u8; options.chunk_size.max(1)],
            eof: false,
        }
    }

    /// Next complete unit and its absolute byte offset
    pub(crate) fn next_unit(&mut self) -> XlsxResult<Option<(u64, &[u8])>> {
        loop {
            let found = self
                .pattern
                .unit
                .find_at(&self.buffer, self.pos)
                .map(|m| (m.start(), m.end()));

            if let Some((start, end)) = found {
                self.pos = end;
                let offset = self.base + start as u64;
                return Ok(Some((offset, &self.buffer[start..end])));
            }

            if self.eof {
                if self.buffer.len() > self.pos {
                    log::trace!(
                        "dropping {} trailing bytes without a complete <{}>",
                        self.buffer.len() - self.pos,
                        self.pattern.tag
                    );
                }
                return Ok(None);
            }

            self.fill()?;
        }
    }

    fn fill(&mut self) -> XlsxResult<()> {
        if self.pos > 0 {
            self.buffer.drain(..self.pos);
            self.base += self.pos as u64;
            self.pos = 0;
        }
        self.bound_buffer();

        let n = loop {
            match self.reader.read(&mut self.chunk) {
                Ok(n) => break n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        };

        if n == 0 {
            self.eof = true;
        } else {
            self.buffer.extend_from_slice(&self.chunk[..n]);
        }
        Ok(())
    }

    fn bound_buffer(&mut self) {
        if self.buffer.len() <= self.options.trim_threshold {
            return;
        }

        // No complete unit is left in the buffer, so any opening tag here
        // belongs to a unit still being read.
        let blind = self.buffer.len().saturating_sub(self.options.trim_keep);
        let cut = match self.pattern.open.find(&self.buffer) {
            Some(m) if self.buffer.len() - m.start() <= self.options.max_unit => m.start(),
            Some(m) => {
                log::warn!(
                    "dropping unclosed <{}> at offset {} after {} bytes",
                    self.pattern.tag,
                    self.base + m.start() as u64,
                    self.buffer.len() - m.start()
                );
                blind
            }
            None => blind,
        };

        if cut > 0 {
            self.buffer.drain(..cut);
            self.base += cut as u64;
        }
    }
}

/// Location of one unit inside a decompressed part
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Span {
    pub offset: u64,
    pub length: usize,
}

/// Byte spans of every unit in a part, in document order.
#[derive(Debug, Default)]
pub(crate) struct UnitIndex {
    spans: Vec<Span>,
}

impl UnitIndex {
    /// Scan `reader` once and record every unit
    pub(crate) fn build<R: Read>(
        reader: R,
        pattern: &'static ElementPattern,
        options: &ScanOptions,
    ) -> XlsxResult<Self> {
        let mut scanner = ElementScanner::new(reader, pattern, *options);
        let mut spans = Vec::new();
        while let Some((offset, unit)) = scanner.next_unit()? {
            spans.push(Span {
                offset,
                length: unit.len(),
            });
        }
        Ok(Self { spans })
    }

    /// Span of the unit at 0-based `position`
    pub(crate) fn span(&self, position: usize) -> Option<Span> {
        self.spans.get(position).copied()
    }

    pub(crate) fn len(&self) -> usize {
        self.spans.len()
    }
}
