//! Package archive access
//!
//! The engine only needs four things from the container: the entry listing,
//! an existence test, a forward stream per entry and the full bytes of small
//! parts. [`PackageArchive`] captures that; [`ZipPackage`] implements it on top
//! of the `zip` crate's central directory.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use flate2::read::DeflateDecoder;
use zip::{CompressionMethod, ZipArchive};

use crate::error::{XlsxError, XlsxResult};

/// Read access to the parts of a package.
pub trait PackageArchive: Send + Sync {
    /// All entry names, in central directory order
    fn entry_names(&self) -> &[String];

    /// Check whether a named entry exists
    fn contains(&self, name: &str) -> bool;

    /// Open a forward-only byte stream over a named entry's content
    fn open_entry(&self, name: &str) -> XlsxResult<Box<dyn Read + Send>>;

    /// Read the full content of a named entry (meant for small parts)
    fn read_entry(&self, name: &str) -> XlsxResult<Vec<u8>> {
        let mut data = Vec::new();
        self.open_entry(name)?.read_to_end(&mut data)?;
        Ok(data)
    }

    /// Total (compressed, uncompressed) sizes over all entries
    fn entry_sizes(&self) -> (u64, u64) {
        (0, 0)
    }
}

trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// Where the package bytes live. Each opened entry gets its own handle.
#[derive(Debug, Clone)]
enum Source {
    File(PathBuf),
    Memory(Arc<[u8]>),
}

impl Source {
    fn reopen(&self) -> std::io::Result<Box<dyn ReadSeek>> {
        match self {
            Source::File(path) => Ok(Box::new(BufReader::new(File::open(path)?))),
            Source::Memory(bytes) => Ok(Box::new(Cursor::new(Arc::clone(bytes)))),
        }
    }
}

/// Central directory record for one entry
#[derive(Debug, Clone)]
struct EntryInfo {
    name: String,
    data_start: u64,
    compressed_size: u64,
    size: u64,
    method: CompressionMethod,
    encrypted: bool,
}

/// A ZIP package read through its central directory.
///
/// The directory is read once. Every [`PackageArchive::open_entry`] call opens
/// an independent handle on the source and decodes the entry's compressed span
/// directly, so several entry streams may be alive at the same time.
#[derive(Debug)]
pub struct ZipPackage {
    source: Source,
    entries: Vec<EntryInfo>,
    names: Vec<String>,
    by_name: HashMap<String, usize>,
}

impl ZipPackage {
    /// Open a package from a file path
    pub fn open<P: AsRef<Path>>(path: P) -> XlsxResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let mut archive = ZipArchive::new(BufReader::new(file))?;
        let entries = read_directory(&mut archive)?;
        Ok(Self::with_entries(Source::File(path.to_path_buf()), entries))
    }

    /// Open a package held in memory
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> XlsxResult<Self> {
        let bytes: Arc<[u8]> = bytes.into();
        let mut archive = ZipArchive::new(Cursor::new(Arc::clone(&bytes)))?;
        let entries = read_directory(&mut archive)?;
        Ok(Self::with_entries(Source::Memory(bytes), entries))
    }

    fn with_entries(source: Source, entries: Vec<EntryInfo>) -> Self {
        let names: Vec<String> = entries.iter().map(|e| e.name.clone()).collect();
        let by_name = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();
        log::debug!("package directory holds {} entries", names.len());
        Self {
            source,
            entries,
            names,
            by_name,
        }
    }

    /// Exact match first, then an ASCII case-insensitive one
    fn lookup(&self, name: &str) -> Option<&EntryInfo> {
        if let Some(&i) = self.by_name.get(name) {
            return Some(&self.entries[i]);
        }
        self.entries
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
    }
}

fn read_directory<R: Read + Seek>(archive: &mut ZipArchive<R>) -> XlsxResult<Vec<EntryInfo>> {
    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let file = archive.by_index_raw(i)?;
        entries.push(EntryInfo {
            name: file.name().to_string(),
            data_start: file.data_start(),
            compressed_size: file.compressed_size(),
            size: file.size(),
            method: file.compression(),
            encrypted: file.encrypted(),
        });
    }
    Ok(entries)
}

impl PackageArchive for ZipPackage {
    fn entry_names(&self) -> &[String] {
        &self.names
    }

    fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    fn open_entry(&self, name: &str) -> XlsxResult<Box<dyn Read + Send>> {
        let entry = self
            .lookup(name)
            .ok_or_else(|| XlsxError::EntryNotFound(name.to_string()))?;

        if entry.encrypted {
            return Err(XlsxError::InvalidFormat(format!(
                "entry {} is encrypted",
                entry.name
            )));
        }

        let mut reader = self.source.reopen()?;
        reader.seek(SeekFrom::Start(entry.data_start))?;
        let span = reader.take(entry.compressed_size);

        match entry.method {
            CompressionMethod::Stored => Ok(Box::new(span)),
            CompressionMethod::Deflated => Ok(Box::new(DeflateDecoder::new(span))),
            other => Err(XlsxError::UnsupportedCompression {
                entry: entry.name.clone(),
                method: format!("{other:?}"),
            }),
        }
    }

    fn entry_sizes(&self) -> (u64, u64) {
        self.entries.iter().fold((0, 0), |(c, u), e| {
            (c + e.compressed_size, u + e.size)
        })
    }
}
