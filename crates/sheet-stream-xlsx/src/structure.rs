//! Detected package layout

use std::collections::BTreeMap;

/// Format family reported when `[Content_Types].xml` names SpreadsheetML
pub const OOXML_FAMILY: &str = "Office Open XML (2007+)";

/// Format family reported for anything else
pub const UNKNOWN_FAMILY: &str = "unknown";

/// Diagnostic facts about the package container.
#[derive(Debug, Clone, PartialEq)]
pub struct PackageMetadata {
    /// Number of entries in the archive
    pub total_entries: usize,
    /// Whether any entry name contains `vbaProject`
    pub has_macros: bool,
    /// [`OOXML_FAMILY`] or [`UNKNOWN_FAMILY`]
    pub format_family: String,
    /// Space saved by compression, in percent with two decimals
    pub compression_ratio: f64,
}

impl Default for PackageMetadata {
    fn default() -> Self {
        Self {
            total_entries: 0,
            has_macros: false,
            format_family: UNKNOWN_FAMILY.to_string(),
            compression_ratio: 0.0,
        }
    }
}

/// Where the parts of a package live and how its producer named things.
///
/// Built once by [`crate::detect::detect`] and shared read-only for the
/// lifetime of the workbook. Empty path strings mean "absent".
#[derive(Debug, Clone, PartialEq)]
pub struct PackageStructure {
    /// Directory prefix of the worksheet parts, with a trailing `/`
    pub worksheet_dir: String,
    pub workbook_path: String,
    pub shared_strings_path: String,
    pub relationships_path: String,
    /// Prefix to URI; the default namespace sits under `""`
    pub namespaces: BTreeMap<String, String>,
    /// `sheetN.xml` parts under `worksheet_dir`, ordered by N
    pub worksheet_paths: Vec<String>,
    /// Qualified name of the sheet declaration element
    pub sheet_element: String,
    /// Qualified name of the attribute carrying the relationship id
    pub relationship_id_attribute: String,
    pub has_shared_strings: bool,
    pub metadata: PackageMetadata,
}

impl PackageStructure {
    /// Worksheet part at a 0-based position in numeric order
    pub fn worksheet_path(&self, index: usize) -> Option<&str> {
        self.worksheet_paths.get(index).map(String::as_str)
    }

    /// Check whether the workbook declares a namespace URI (exact match)
    pub fn supports_namespace(&self, uri: &str) -> bool {
        self.namespaces.values().any(|u| u == uri)
    }

    pub fn has_relationships(&self) -> bool {
        !self.relationships_path.is_empty()
    }

    /// Sheet element name without its prefix
    pub fn sheet_local_name(&self) -> &str {
        local_part(&self.sheet_element)
    }
}

pub(crate) fn local_part(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}
