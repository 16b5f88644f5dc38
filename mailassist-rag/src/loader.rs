//! Text extraction from office documents.
//!
//! [`DocumentLoader`] walks a single directory (non-recursively), picks up
//! `.pdf` and `.docx` files and extracts their text. A file that fails to
//! extract is logged and reported in [`LoadReport::failures`]; the rest of the
//! batch still loads.

use std::fs;
use std::io::Read;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::document::{Document, DocumentMetadata, DocumentType};
use crate::error::{RagError, Result};

/// Documents extracted from a directory, plus the files that could not be read.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub documents: Vec<Document>,
    pub failures: Vec<RagError>,
}

/// Loads PDF and DOCX files from a directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentLoader;

impl DocumentLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load every recognised document in `dir`, in file-name order.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Io`] if the directory itself cannot be read.
    /// Per-file extraction errors never abort the batch.
    pub fn load_documents(&self, dir: &Path) -> Result<LoadReport> {
        let mut entries: Vec<(String, PathBuf)> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|entry| (entry.file_name().to_string_lossy().into_owned(), entry.path()))
            .collect();
        entries.sort();

        let mut report = LoadReport::default();
        for (source, path) in entries {
            let Some(doc_type) = path
                .extension()
                .and_then(|ext| ext.to_str())
                .and_then(DocumentType::from_extension)
            else {
                debug!(file = %source, "skipping unsupported file");
                continue;
            };

            match self.load_file(&path, doc_type) {
                Ok(text) => {
                    debug!(document.source = %source, chars = text.chars().count(), "extracted document");
                    report.documents.push(Document {
                        text,
                        metadata: DocumentMetadata { source, doc_type, path },
                    });
                }
                Err(e) => {
                    warn!(document.source = %source, error = %e, "failed to extract document");
                    report.failures.push(e);
                }
            }
        }

        info!(
            directory = %dir.display(),
            documents = report.documents.len(),
            failures = report.failures.len(),
            "loaded documents"
        );
        Ok(report)
    }

    /// Extract the text of a single file.
    pub fn load_file(&self, path: &Path, doc_type: DocumentType) -> Result<String> {
        match doc_type {
            DocumentType::Pdf => load_pdf(path),
            DocumentType::Docx => load_docx(path),
        }
    }
}

fn extraction_error(doc_type: DocumentType, path: &Path, message: impl Into<String>) -> RagError {
    let kind = match doc_type {
        DocumentType::Pdf => "PDF",
        DocumentType::Docx => "DOCX",
    };
    RagError::Extraction { kind, path: path.to_path_buf(), message: message.into() }
}

/// Page texts, each followed by a newline.
fn load_pdf(path: &Path) -> Result<String> {
    // pdf-extract panics on some malformed inputs
    let pages = match catch_unwind(AssertUnwindSafe(|| pdf_extract::extract_text_by_pages(path))) {
        Ok(Ok(pages)) => pages,
        Ok(Err(e)) => return Err(extraction_error(DocumentType::Pdf, path, e.to_string())),
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "extractor panicked".to_string());
            return Err(extraction_error(DocumentType::Pdf, path, message));
        }
    };

    let mut text = String::new();
    for page in pages {
        text.push_str(&page);
        text.push('\n');
    }
    Ok(text)
}

/// Paragraph texts, each followed by a newline.
fn load_docx(path: &Path) -> Result<String> {
    let err = |message: String| extraction_error(DocumentType::Docx, path, message);

    let file = fs::File::open(path).map_err(|e| err(e.to_string()))?;
    let mut archive = zip::ZipArchive::new(file).map_err(|e| err(format!("invalid archive: {e}")))?;
    let mut entry = archive
        .by_name("word/document.xml")
        .map_err(|_| err("archive has no word/document.xml".to_string()))?;

    let mut xml = String::new();
    entry.read_to_string(&mut xml).map_err(|e| err(format!("failed to read document.xml: {e}")))?;
    Ok(docx_xml_to_text(&xml))
}

/// Flatten WordprocessingML into plain text.
///
/// Text runs (`w:t`) are concatenated, every paragraph (`w:p`) ends with a
/// newline, `w:tab` becomes a tab and `w:br`/`w:cr` a line break. Tab stop
/// definitions inside `w:tabs` are paragraph formatting and produce nothing.
pub(crate) fn docx_xml_to_text(xml: &str) -> String {
    let mut out = String::new();
    let mut in_text = false;
    let mut in_tab_stops = false;
    let mut rest = xml;

    while let Some(open) = rest.find('<') {
        if in_text {
            out.push_str(&decode_entities(&rest[..open]));
        }
        let Some(close) = rest[open..].find('>') else { break };
        let tag = &rest[open + 1..open + close];
        rest = &rest[open + close + 1..];

        let closing = tag.starts_with('/');
        let self_closing = tag.ends_with('/');
        let name = tag
            .trim_start_matches('/')
            .trim_end_matches('/')
            .split_whitespace()
            .next()
            .unwrap_or("");

        match (name, closing) {
            ("w:t", false) => in_text = !self_closing,
            ("w:t", true) => in_text = false,
            ("w:p", true) => out.push('\n'),
            ("w:p", false) if self_closing => out.push('\n'),
            ("w:tabs", false) => in_tab_stops = !self_closing,
            ("w:tabs", true) => in_tab_stops = false,
            ("w:tab", false) if !in_tab_stops => out.push('\t'),
            ("w:br" | "w:cr", false) => out.push('\n'),
            _ => {}
        }
    }
    out
}

fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paragraphs_end_with_newlines() {
        let xml = r#"<w:document><w:body><w:p><w:r><w:t>Sick leave</w:t></w:r><w:r><w:t xml:space="preserve"> policy</w:t></w:r></w:p><w:p/><w:p><w:r><w:t>Ten days.</w:t></w:r></w:p></w:body></w:document>"#;
        assert_eq!(docx_xml_to_text(xml), "Sick leave policy\n\nTen days.\n");
    }

    #[test]
    fn table_tags_are_not_mistaken_for_text_runs() {
        let xml = "<w:p><w:tbl><w:tr><w:tc><w:t>cell</w:t></w:tc></w:tr></w:tbl></w:p>";
        assert_eq!(docx_xml_to_text(xml), "cell\n");
    }

    #[test]
    fn tabs_breaks_and_entities() {
        let xml = "<w:p><w:r><w:t>A</w:t><w:tab/><w:t>B &amp; C</w:t><w:br/><w:t>&lt;D&gt;</w:t></w:r></w:p>";
        assert_eq!(docx_xml_to_text(xml), "A\tB & C\n<D>\n");
    }

    #[test]
    fn tab_stop_definitions_are_not_text() {
        let xml = r#"<w:p><w:pPr><w:tabs><w:tab w:val="left" w:pos="720"/><w:tab w:val="right" w:pos="9000"/></w:tabs></w:pPr><w:r><w:t>Leave policy</w:t><w:tab/><w:t>p. 4</w:t></w:r></w:p>"#;
        assert_eq!(docx_xml_to_text(xml), "Leave policy\tp. 4\n");
    }

    #[test]
    fn entities_decode_once() {
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
    }
}
