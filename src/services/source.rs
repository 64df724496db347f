use crate::error::Result;
use crate::types::Segment;

/// Pages of an extracted range, serialized as a standalone document.
#[derive(Debug, Clone)]
pub struct ExtractedPages {
    pub content: Vec<u8>,
    pub page_count: usize,
}

/// The parsed source document as seen by the splitting pipeline.
///
/// The pipeline never parses the document format itself: it asks for page
/// text by index and for raw page-range extraction.
pub trait SourceDocument {
    fn page_count(&self) -> usize;

    /// Normalized, lowercased text of the page at `index` (0-based).
    fn page_text(&self, index: usize) -> Result<String>;

    /// Copies pages `segment.start..segment.end` into a new document.
    fn extract_pages(&self, segment: Segment) -> Result<ExtractedPages>;
}
