//! Deterministic embedders shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use mailassist_rag::{
    Chunk, ChunkMetadata, DocumentType, EmbeddingProvider, RagError, Result,
};

/// Buckets characters by code point, so similar texts get similar vectors.
pub struct CharHistogramEmbedder {
    pub dims: usize,
    pub calls: AtomicUsize,
}

impl CharHistogramEmbedder {
    pub fn new(dims: usize) -> Self {
        Self { dims, calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

pub fn histogram(text: &str, dims: usize) -> Vec<f32> {
    let mut v = vec![0.0; dims];
    for c in text.to_lowercase().chars().filter(|c| c.is_alphanumeric()) {
        v[c as usize % dims] += 1.0;
    }
    v
}

#[async_trait]
impl EmbeddingProvider for CharHistogramEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(histogram(text, self.dims))
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

/// Returns fixed vectors for known texts and the origin for everything else.
pub struct TableEmbedder {
    pub dims: usize,
    pub table: HashMap<String, Vec<f32>>,
}

impl TableEmbedder {
    pub fn new(dims: usize, entries: &[(&str, Vec<f32>)]) -> Self {
        let table = entries.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
        Self { dims, table }
    }
}

#[async_trait]
impl EmbeddingProvider for TableEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.table.get(text).cloned().unwrap_or_else(|| vec![0.0; self.dims]))
    }

    fn dimensions(&self) -> usize {
        self.dims
    }
}

/// Claims one dimensionality and produces another.
pub struct LyingEmbedder;

#[async_trait]
impl EmbeddingProvider for LyingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![1.0; 3])
    }

    fn dimensions(&self) -> usize {
        4
    }
}

/// Always fails.
pub struct FailingEmbedder;

#[async_trait]
impl EmbeddingProvider for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(RagError::Embedding { provider: "test".into(), message: "backend unavailable".into() })
    }

    fn dimensions(&self) -> usize {
        4
    }
}

pub fn chunk(source: &str, index: usize, text: &str) -> Chunk {
    Chunk {
        id: format!("{source}_{index}"),
        text: text.to_string(),
        metadata: ChunkMetadata {
            source: source.to_string(),
            doc_type: DocumentType::Docx,
            path: PathBuf::from("documents").join(source),
            chunk_index: index,
            chunk_count: 1,
        },
    }
}

/// Write a minimal DOCX whose paragraphs are `paragraphs`.
pub fn write_docx(path: &std::path::Path, paragraphs: &[&str]) {
    use std::io::Write;

    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t xml:space=\"preserve\">{p}</w:t></w:r></w:p>"))
        .collect();
    let xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
         <w:body>{body}</w:body></w:document>"
    );

    let file = std::fs::File::create(path).unwrap();
    let mut zip = zip::ZipWriter::new(file);
    zip.start_file("word/document.xml", zip::write::FileOptions::default()).unwrap();
    zip.write_all(xml.as_bytes()).unwrap();
    zip.finish().unwrap();
}

/// Write a one-page PDF showing `line` in Helvetica, with a valid xref table.
pub fn write_pdf(path: &std::path::Path, line: &str) {
    let stream = format!("BT /F1 12 Tf 72 720 Td ({line}) Tj ET");
    let objects = [
        "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
        "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
        "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
         /Resources << /Font << /F1 5 0 R >> >> /Contents 4 0 R >>"
            .to_string(),
        format!("<< /Length {} >>\nstream\n{stream}\nendstream", stream.len()),
        "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>".to_string(),
    ];

    let mut pdf = String::from("%PDF-1.4\n");
    let mut offsets = Vec::with_capacity(objects.len());
    for (i, body) in objects.iter().enumerate() {
        offsets.push(pdf.len());
        pdf.push_str(&format!("{} 0 obj\n{body}\nendobj\n", i + 1));
    }
    let xref_at = pdf.len();
    pdf.push_str(&format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1));
    for offset in offsets {
        pdf.push_str(&format!("{offset:010} 00000 n \n"));
    }
    pdf.push_str(&format!("trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_at}\n%%EOF\n", objects.len() + 1));

    std::fs::write(path, pdf).unwrap();
}
