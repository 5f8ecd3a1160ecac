//! Workbook orchestration
//!
//! Opening a workbook detects the package layout, reads the relationships
//! part and the sheet declarations, and resolves every declared sheet to its
//! worksheet part. No worksheet or shared string content is read here.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::archive::{PackageArchive, ZipPackage};
use crate::detect::detect;
use crate::error::{XlsxError, XlsxResult};
use crate::scan::ScanOptions;
use crate::shared_strings::{SharedStringTable, DEFAULT_CACHE_CAPACITY};
use crate::sheet::{CompactionPolicy, Sheet, SheetDescriptor};
use crate::structure::{local_part, PackageStructure};

/// Options applied to every sheet and to the shared string table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    pub scan: ScanOptions,
    pub string_cache_capacity: usize,
    pub compaction: CompactionPolicy,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            scan: ScanOptions::default(),
            string_cache_capacity: DEFAULT_CACHE_CAPACITY,
            compaction: CompactionPolicy::default(),
        }
    }
}

/// An opened spreadsheet package.
///
/// # Example
///
/// ```rust,no_run
/// use sheet_stream_xlsx::Workbook;
///
/// let workbook = Workbook::open("report.xlsx")?;
/// for sheet in workbook.sheets() {
///     for row in sheet.rows()? {
///         let mut row = row?;
///         println!("{}: {:?}", row.number(), row.values()?);
///     }
/// }
/// # Ok::<(), sheet_stream_xlsx::XlsxError>(())
/// ```
pub struct Workbook {
    archive: Arc<dyn PackageArchive>,
    structure: Arc<PackageStructure>,
    strings: Arc<SharedStringTable>,
    sheets: Vec<Sheet>,
}

impl Workbook {
    /// Open a package from a file path with default options
    pub fn open<P: AsRef<Path>>(path: P) -> XlsxResult<Self> {
        Self::open_with(path, ReadOptions::default())
    }

    pub fn open_with<P: AsRef<Path>>(path: P, options: ReadOptions) -> XlsxResult<Self> {
        let package = ZipPackage::open(path)?;
        Self::from_archive(Arc::new(package), options)
    }

    /// Open a package held in memory with default options
    pub fn from_bytes(bytes: impl Into<Arc<[u8]>>) -> XlsxResult<Self> {
        Self::from_bytes_with(bytes, ReadOptions::default())
    }

    pub fn from_bytes_with(bytes: impl Into<Arc<[u8]>>, options: ReadOptions) -> XlsxResult<Self> {
        let package = ZipPackage::from_bytes(bytes)?;
        Self::from_archive(Arc::new(package), options)
    }

    /// Open any [`PackageArchive`]
    pub fn from_archive(archive: Arc<dyn PackageArchive>, options: ReadOptions) -> XlsxResult<Self> {
        let structure = Arc::new(detect(&*archive)?);

        let strings = Arc::new(SharedStringTable::with_capacity(
            Arc::clone(&archive),
            structure
                .has_shared_strings
                .then(|| structure.shared_strings_path.clone()),
            options.scan,
            options.string_cache_capacity,
        ));

        let relations = read_relationships(&*archive, &structure);
        let workbook = archive.read_entry(&structure.workbook_path)?;
        let declarations = read_sheet_declarations(&workbook, &structure)?;

        let mut sheets = Vec::with_capacity(declarations.len());
        for (index, declaration) in declarations.into_iter().enumerate() {
            let name = declaration
                .name
                .unwrap_or_else(|| format!("Sheet{}", index + 1));
            let path = resolve_sheet_path(
                &*archive,
                &structure,
                &relations,
                declaration.relationship_id.as_deref(),
                index,
            )
            .ok_or_else(|| XlsxError::SheetNotResolved {
                name: name.clone(),
                index,
            })?;

            sheets.push(Sheet::new(
                SheetDescriptor { name, index, path },
                Arc::clone(&archive),
                Arc::clone(&strings),
                options.scan,
                options.compaction,
            ));
        }

        log::debug!("opened workbook with {} sheets", sheets.len());

        Ok(Self {
            archive,
            structure,
            strings,
            sheets,
        })
    }

    /// Sheets in declaration order
    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheets_mut(&mut self) -> &mut [Sheet] {
        &mut self.sheets
    }

    /// Sheet at a 0-based declaration index
    pub fn sheet(&self, index: usize) -> Option<&Sheet> {
        self.sheets.get(index)
    }

    pub fn sheet_mut(&mut self, index: usize) -> Option<&mut Sheet> {
        self.sheets.get_mut(index)
    }

    /// Sheet with exactly this name
    pub fn sheet_by_name(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name() == name)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(Sheet::name).collect()
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    pub fn shared_strings(&self) -> &Arc<SharedStringTable> {
        &self.strings
    }

    pub fn structure(&self) -> &PackageStructure {
        &self.structure
    }

    pub fn archive(&self) -> &Arc<dyn PackageArchive> {
        &self.archive
    }

    /// Drop every sheet's row index and temporary copy
    pub fn release(&mut self) {
        for sheet in &mut self.sheets {
            sheet.release();
        }
        self.strings.clear_cache();
    }

    /// Close the workbook, removing all temporary copies
    pub fn close(mut self) {
        self.release();
        log::debug!("closed workbook {}", self.structure.workbook_path);
    }
}

impl std::fmt::Debug for Workbook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workbook")
            .field("structure", &self.structure)
            .field("sheets", &self.sheets)
            .finish()
    }
}

/// One sheet declaration of the workbook part
#[derive(Debug, Default, PartialEq, Eq)]
struct SheetDeclaration {
    name: Option<String>,
    relationship_id: Option<String>,
}

fn attributes(element: &BytesStart<'_>) -> Vec<(String, String)> {
    element
        .attributes()
        .flatten()
        .map(|attr| {
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| String::from_utf8_lossy(&attr.value).into_owned());
            (key, value)
        })
        .collect()
}

fn is_sheet_element(qualified: &str, structure: &PackageStructure) -> bool {
    let lower = qualified.to_ascii_lowercase();
    local_part(&lower) == "sheet"
        || lower == structure.sheet_element.to_ascii_lowercase()
        || lower.ends_with(":sheet")
}

fn read_sheet_declarations(
    workbook: &[u8],
    structure: &PackageStructure,
) -> XlsxResult<Vec<SheetDeclaration>> {
    let mut reader = Reader::from_reader(workbook);
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut declarations = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                let qualified = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                if is_sheet_element(&qualified, structure) {
                    declarations.push(sheet_declaration(&attributes(&e), structure));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::Xml(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(declarations)
}

fn sheet_declaration(attrs: &[(String, String)], structure: &PackageStructure) -> SheetDeclaration {
    let find = |key: &str| {
        attrs
            .iter()
            .find(|(k, v)| k == key && !v.is_empty())
            .map(|(_, v)| v.clone())
    };

    let relationship_id = find(structure.relationship_id_attribute.as_str())
        .or_else(|| find("id"))
        .or_else(|| {
            attrs
                .iter()
                .find(|(k, v)| k.to_ascii_lowercase().contains("id") && v.starts_with("rId"))
                .map(|(_, v)| v.clone())
        });

    SheetDeclaration {
        name: find("name"),
        relationship_id,
    }
}

/// Worksheet relationships of the workbook, id to package path.
///
/// A missing or unreadable relationships part yields an empty map; sheets
/// then resolve by position.
fn read_relationships(
    archive: &dyn PackageArchive,
    structure: &PackageStructure,
) -> HashMap<String, String> {
    let mut relations = HashMap::new();
    if !structure.has_relationships() {
        return relations;
    }

    let bytes = match archive.read_entry(&structure.relationships_path) {
        Ok(bytes) => bytes,
        Err(e) => {
            log::warn!(
                "could not read {}: {e}; sheets resolve by position",
                structure.relationships_path
            );
            return relations;
        }
    };

    let base = base_dir(&structure.workbook_path);
    let mut reader = Reader::from_reader(bytes.as_slice());
    reader.trim_text(true);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e))
                if e.local_name().as_ref().eq_ignore_ascii_case(b"relationship") =>
            {
                let attrs = attributes(&e);
                let get = |key: &str| {
                    attrs
                        .iter()
                        .find(|(k, _)| local_part(k) == key)
                        .map(|(_, v)| v.as_str())
                        .unwrap_or_default()
                };
                let (id, target, kind) = (get("Id"), get("Target"), get("Type"));
                if !id.is_empty()
                    && !target.is_empty()
                    && (kind.contains("worksheet") || target.contains("sheet"))
                {
                    relations.insert(id.to_string(), resolve_target(base, target));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                log::warn!(
                    "{} is not well formed ({e}); keeping {} relationships read so far",
                    structure.relationships_path,
                    relations.len()
                );
                break;
            }
            _ => {}
        }
        buf.clear();
    }

    log::debug!("read {} worksheet relationships", relations.len());
    relations
}

/// Directory of a part path including the trailing `/`, or `""` at the root
fn base_dir(path: &str) -> &str {
    path.rfind('/').map_or("", |i| &path[..=i])
}

/// Resolve a relationship target against the directory of its source part.
///
/// A leading `/` makes the target package-absolute; `.` and `..` segments are
/// collapsed.
fn resolve_target(base: &str, target: &str) -> String {
    let joined = match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("{base}{target}"),
    };

    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            s => segments.push(s),
        }
    }
    segments.join("/")
}

fn resolve_sheet_path(
    archive: &dyn PackageArchive,
    structure: &PackageStructure,
    relations: &HashMap<String, String>,
    relationship_id: Option<&str>,
    index: usize,
) -> Option<String> {
    if let Some(target) = relationship_id.and_then(|id| relations.get(id)) {
        if archive.contains(target) {
            return Some(target.clone());
        }
        log::warn!("relationship target {target} is not in the package; resolving sheet {index} by position");
    }

    structure.worksheet_path(index).map(str::to_string)
}
