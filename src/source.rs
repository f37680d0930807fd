//! Collaborator seam for table-grid detection and first-page text.
//!
//! Table-region detection and PDF text extraction are deliberately outside
//! this crate: the pipeline consumes an opaque table-producing service that
//! returns a grid of text cells per detected region, and a text service
//! that returns one page of plain text. [`DocumentReader`] is that seam.
//! Both calls are synchronous blocking points with no timeout contract; a
//! per-document failure is caught at the record-assembly boundary and the
//! batch continues.
//!
//! [`SidecarReader`] is the concrete implementation the CLI uses: the
//! upstream detection tool dumps its grids and first-page text next to
//! each document as sidecar files, and the pipeline reads them at rest.
//! Tests substitute in-memory readers.

use crate::config::Flavor;
use crate::error::DocumentError;
use crate::record::TableGrid;
use std::fs;
use std::path::Path;

/// Produces table grids and first-page text for one document.
///
/// The strategy tag chosen by the flavor resolver is forwarded to
/// [`detect_tables`](DocumentReader::detect_tables) so grid-producing
/// backends that distinguish ruled and whitespace layouts can honour it.
pub trait DocumentReader {
    /// Ordered sequence of table grids detected in the document.
    fn detect_tables(&self, path: &Path, flavor: Flavor) -> Result<Vec<TableGrid>, DocumentError>;

    /// Plain text of the document's first page.
    fn first_page_text(&self, path: &Path) -> Result<String, DocumentError>;
}

/// Reads pre-detected grids from `<doc>.tables.json` and first-page text
/// from `<doc>.txt`, both sitting next to the document itself.
///
/// The grid sidecar is a JSON array of tables, each a row-major array of
/// cell-string arrays — exactly what a detection tool run upstream writes.
#[derive(Debug, Default)]
pub struct SidecarReader;

impl SidecarReader {
    pub fn new() -> Self {
        Self
    }

    fn file_name(path: &Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string())
    }
}

impl DocumentReader for SidecarReader {
    fn detect_tables(&self, path: &Path, flavor: Flavor) -> Result<Vec<TableGrid>, DocumentError> {
        let sidecar = path.with_extension("tables.json");
        tracing::debug!(
            "Reading table grids for {} (flavor: {flavor})",
            path.display()
        );
        let raw = fs::read_to_string(&sidecar).map_err(|e| DocumentError::TableDetection {
            file: Self::file_name(path),
            detail: format!("{}: {e}", sidecar.display()),
        })?;
        let grids: Vec<Vec<Vec<String>>> =
            serde_json::from_str(&raw).map_err(|e| DocumentError::TableDetection {
                file: Self::file_name(path),
                detail: format!("{}: {e}", sidecar.display()),
            })?;
        Ok(grids.into_iter().map(TableGrid::new).collect())
    }

    fn first_page_text(&self, path: &Path) -> Result<String, DocumentError> {
        let sidecar = path.with_extension("txt");
        fs::read_to_string(&sidecar).map_err(|e| DocumentError::PageText {
            file: Self::file_name(path),
            detail: format!("{}: {e}", sidecar.display()),
        })
    }
}
