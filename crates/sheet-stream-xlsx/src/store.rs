//! Temporary seekable copies of package parts
//!
//! Entry streams coming out of the archive are forward-only. Random access to
//! rows and shared strings goes through a [`SpillFile`]: the part is copied
//! chunk by chunk into an anonymous temporary file, which the OS removes once
//! the handle is dropped.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::archive::PackageArchive;
use crate::error::XlsxResult;
use crate::scan::{ElementPattern, ScanOptions, Span, UnitIndex};

/// Anonymous temporary file holding one decompressed part.
#[derive(Debug)]
pub(crate) struct SpillFile {
    file: Mutex<File>,
    len: u64,
}

impl SpillFile {
    /// Copy `reader` to a fresh temporary file, `chunk_size` bytes at a time
    pub(crate) fn materialize<R: Read>(mut reader: R, chunk_size: usize) -> XlsxResult<Self> {
        let mut file = tempfile::tempfile()?;
        let mut chunk = vec![0u8; chunk_size.max(1)];
        let mut len = 0u64;

        loop {
            let n = match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            };
            file.write_all(&chunk[..n])?;
            len += n as u64;
        }

        file.flush()?;
        file.seek(SeekFrom::Start(0))?;

        Ok(Self {
            file: Mutex::new(file),
            len,
        })
    }

    pub(crate) fn len(&self) -> u64 {
        self.len
    }

    fn lock(&self) -> MutexGuard<'_, File> {
        // Every access seeks first, so a poisoned handle is still usable
        self.file.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Read exactly `span.length` bytes starting at `span.offset`
    pub(crate) fn read_span(&self, span: Span) -> XlsxResult<Vec<u8>> {
        let mut file = self.lock();
        file.seek(SeekFrom::Start(span.offset))?;
        let mut data = vec![0u8; span.length];
        file.read_exact(&mut data)?;
        Ok(data)
    }

    /// A forward reader over the whole copy, starting at offset 0
    pub(crate) fn cursor(&self) -> SpillCursor<'_> {
        SpillCursor {
            spill: self,
            position: 0,
        }
    }
}

/// Sequential reader over a [`SpillFile`] that keeps its own position
pub(crate) struct SpillCursor<'a> {
    spill: &'a SpillFile,
    position: u64,
}

impl Read for SpillCursor<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut file = self.spill.lock();
        file.seek(SeekFrom::Start(self.position))?;
        let n = file.read(buf)?;
        self.position += n as u64;
        Ok(n)
    }
}

/// A part copied to a temporary file together with the offsets of its units.
#[derive(Debug)]
pub(crate) struct IndexedPart {
    spill: SpillFile,
    index: UnitIndex,
}

impl IndexedPart {
    /// Materialize `path` and index every unit matching `pattern` in one pass
    pub(crate) fn build(
        archive: &dyn PackageArchive,
        path: &str,
        pattern: &'static ElementPattern,
        options: &ScanOptions,
    ) -> XlsxResult<Self> {
        let spill = SpillFile::materialize(archive.open_entry(path)?, options.chunk_size)?;
        let index = UnitIndex::build(spill.cursor(), pattern, options)?;
        log::debug!(
            "indexed {} <{}> units in {} ({} bytes)",
            index.len(),
            pattern.tag(),
            path,
            spill.len()
        );
        Ok(Self { spill, index })
    }

    pub(crate) fn index(&self) -> &UnitIndex {
        &self.index
    }

    /// Raw markup of the unit at 0-based `position`
    pub(crate) fn read_unit(&self, position: usize) -> XlsxResult<Option<String>> {
        match self.index.span(position) {
            Some(span) => {
                let bytes = self.spill.read_span(span)?;
                Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
            }
            None => Ok(None),
        }
    }
}
