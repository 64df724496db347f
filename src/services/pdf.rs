use crate::error::{Result, SplitterError};
use crate::services::source::{ExtractedPages, SourceDocument};
use crate::services::text::normalize_text;
use crate::types::Segment;
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// A parsed PDF, backed by `lopdf`.
///
/// Page text is lowercased with whitespace runs collapsed to single spaces, so
/// that line breaks introduced by text extraction do not split a pattern.
pub struct PdfSource {
    document: Document,
    /// lopdf page numbers (1-based) and page object ids, in document order.
    pages: Vec<(u32, ObjectId)>,
}

impl PdfSource {
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|e| SplitterError::Pdf {
            reason: format!("failed to load PDF from memory: {}", e),
        })?;

        if document.is_encrypted() {
            return Err(SplitterError::Pdf {
                reason: "PDF is encrypted and cannot be split".to_string(),
            });
        }

        let pages: Vec<(u32, ObjectId)> = document.get_pages().into_iter().collect();
        info!("Loaded PDF with {} pages ({} bytes)", pages.len(), data.len());

        Ok(Self { document, pages })
    }

    fn page(&self, index: usize) -> Result<(u32, ObjectId)> {
        self.pages
            .get(index)
            .copied()
            .ok_or_else(|| SplitterError::Pdf {
                reason: format!(
                    "page index {} out of range (document has {} pages)",
                    index,
                    self.pages.len()
                ),
            })
    }
}

impl SourceDocument for PdfSource {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Text of every chunk that decodes; chunks lopdf cannot decode (for
    /// example a CID font without a ToUnicode map) are skipped with a warning.
    fn page_text(&self, index: usize) -> Result<String> {
        let (number, _) = self.page(index)?;

        let mut text = String::new();
        for chunk in self.document.extract_text_chunks(&[number]) {
            match chunk {
                Ok(chunk) => text.push_str(&chunk),
                Err(e) => warn!("Skipping undecodable text on page {}: {}", number, e),
            }
        }

        Ok(normalize_text(text.trim()))
    }

    fn extract_pages(&self, segment: Segment) -> Result<ExtractedPages> {
        if segment.end > self.pages.len() || segment.start >= segment.end {
            return Err(SplitterError::Pdf {
                reason: format!(
                    "invalid page range {}..{} for a {} page document",
                    segment.start,
                    segment.end,
                    self.pages.len()
                ),
            });
        }

        let page_ids: Vec<ObjectId> = self.pages[segment.start..segment.end]
            .iter()
            .map(|(_, id)| *id)
            .collect();
        let mut document = PageCopier::new(&self.document).copy_pages(&page_ids)?;
        let page_count = document.get_pages().len();

        let mut content = Vec::new();
        document.save_to(&mut content).map_err(|e| SplitterError::Pdf {
            reason: format!(
                "failed to serialise pages {}..{}: {}",
                segment.start, segment.end, e
            ),
        })?;

        debug!(
            "Extracted pages {}..{} ({} pages, {} objects, {} bytes)",
            segment.start,
            segment.end,
            page_count,
            document.objects.len(),
            content.len()
        );

        Ok(ExtractedPages {
            content,
            page_count,
        })
    }
}

/// Copies selected pages and everything they reference into a new document.
///
/// Each source object is copied at most once, so shared resources stay shared
/// and reference cycles terminate. `/Parent` links are not followed; inherited
/// page attributes are written onto each copied page instead.
struct PageCopier<'a> {
    source: &'a Document,
    target: Document,
    copied: BTreeMap<ObjectId, ObjectId>,
}

impl<'a> PageCopier<'a> {
    fn new(source: &'a Document) -> Self {
        Self {
            source,
            target: Document::with_version(source.version.clone()),
            copied: BTreeMap::new(),
        }
    }

    fn copy_pages(mut self, page_ids: &[ObjectId]) -> Result<Document> {
        let pages_id = self.target.new_object_id();

        let mut kids = Vec::with_capacity(page_ids.len());
        for page_id in page_ids {
            kids.push(Object::Reference(self.copy_page(*page_id, pages_id)?));
        }

        let mut pages = Dictionary::new();
        pages.set("Type", Object::Name(b"Pages".to_vec()));
        pages.set("Count", Object::Integer(kids.len() as i64));
        pages.set("Kids", Object::Array(kids));
        self.target.objects.insert(pages_id, Object::Dictionary(pages));

        let mut catalog = Dictionary::new();
        catalog.set("Type", Object::Name(b"Catalog".to_vec()));
        catalog.set("Pages", Object::Reference(pages_id));
        let catalog_id = self.target.add_object(catalog);
        self.target.trailer.set("Root", Object::Reference(catalog_id));

        Ok(self.target)
    }

    fn copy_page(&mut self, page_id: ObjectId, parent_id: ObjectId) -> Result<ObjectId> {
        let page = self
            .source
            .get_object(page_id)
            .and_then(Object::as_dict)
            .map_err(|e| SplitterError::Pdf {
                reason: format!("cannot read page object {:?}: {}", page_id, e),
            })?;

        // Registered before copying so that annotations pointing back at the
        // page resolve to the copy.
        let new_id = self.target.new_object_id();
        self.copied.insert(page_id, new_id);

        let mut copy = self.copy_dictionary(page);
        for (key, value) in self.inherited_attributes(page) {
            let value = self.copy_object(value);
            copy.set(key.to_vec(), value);
        }
        copy.set("Parent", Object::Reference(parent_id));

        self.target.objects.insert(new_id, Object::Dictionary(copy));
        Ok(new_id)
    }

    /// Inheritable attributes missing on `page`, taken from the nearest ancestor.
    fn inherited_attributes(&self, page: &'a Dictionary) -> Vec<(&'static [u8], &'a Object)> {
        let mut found = Vec::new();
        let mut node = page;
        // Bounded walk in case of a malformed, cyclic page tree.
        for _ in 0..64 {
            let parent = match node
                .get(b"Parent")
                .and_then(Object::as_reference)
                .and_then(|id| self.source.get_object(id))
                .and_then(Object::as_dict)
            {
                Ok(parent) => parent,
                Err(_) => break,
            };

            for key in INHERITABLE {
                let missing = page.get(key).is_err() && !found.iter().any(|(k, _)| *k == key);
                if missing {
                    if let Ok(value) = parent.get(key) {
                        found.push((key, value));
                    }
                }
            }
            node = parent;
        }
        found
    }

    fn copy_reference(&mut self, id: ObjectId) -> ObjectId {
        if let Some(new_id) = self.copied.get(&id) {
            return *new_id;
        }

        let new_id = self.target.new_object_id();
        self.copied.insert(id, new_id);

        let object = match self.source.get_object(id) {
            Ok(object) => self.copy_object(object),
            Err(e) => {
                warn!("Cannot resolve reference {:?} ({}), using null", id, e);
                Object::Null
            }
        };
        self.target.objects.insert(new_id, object);
        new_id
    }

    fn copy_object(&mut self, object: &Object) -> Object {
        match object {
            Object::Reference(id) => Object::Reference(self.copy_reference(*id)),
            Object::Array(items) => {
                Object::Array(items.iter().map(|item| self.copy_object(item)).collect())
            }
            Object::Dictionary(dict) => Object::Dictionary(self.copy_dictionary(dict)),
            Object::Stream(stream) => {
                let mut copy = stream.clone();
                copy.dict = self.copy_dictionary(&stream.dict);
                Object::Stream(copy)
            }
            other => other.clone(),
        }
    }

    fn copy_dictionary(&mut self, dict: &Dictionary) -> Dictionary {
        let mut copy = Dictionary::new();
        for (key, value) in dict.iter() {
            if key.as_slice() == b"Parent" {
                continue;
            }
            let value = self.copy_object(value);
            copy.set(key.clone(), value);
        }
        copy
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::{build_pdf, build_pdf_with, page_contents, Layout};
    use super::*;

    #[test]
    fn test_page_text_is_normalized() {
        let bytes = build_pdf(&["Chapter ONE", "plain   text"]);
        let source = PdfSource::from_bytes(&bytes).unwrap();

        assert_eq!(source.page_count(), 2);
        assert!(source.page_text(0).unwrap().contains("chapter one"));
        assert!(source.page_text(1).unwrap().contains("plain text"));
        assert!(source.page_text(2).is_err());
    }

    #[test]
    fn test_undecodable_font_keeps_readable_text() {
        let layout = Layout {
            undecodable_font: true,
            ..Layout::default()
        };
        let bytes = build_pdf_with(&["intro", "Chapter HEADER"], &layout);
        let source = PdfSource::from_bytes(&bytes).unwrap();

        assert!(source.page_text(1).unwrap().contains("header"));
        assert!(source.page_text(0).unwrap().contains("intro"));
    }

    #[test]
    fn test_extract_pages_keeps_content_and_order() {
        let bytes = build_pdf(&["p0", "p1", "p2", "p3"]);
        let source = PdfSource::from_bytes(&bytes).unwrap();
        let original = page_contents(&bytes);

        let extracted = source.extract_pages(Segment { start: 1, end: 3 }).unwrap();

        assert_eq!(extracted.page_count, 2);
        assert_eq!(page_contents(&extracted.content), original[1..3].to_vec());
    }

    #[test]
    fn test_extract_pages_copies_only_the_range() {
        let texts: Vec<String> = (0..50).map(|i| format!("page {}", i)).collect();
        let texts: Vec<&str> = texts.iter().map(String::as_str).collect();
        let bytes = build_pdf(&texts);
        let source = PdfSource::from_bytes(&bytes).unwrap();

        let extracted = source.extract_pages(Segment { start: 7, end: 8 }).unwrap();
        let part = Document::load_mem(&extracted.content).unwrap();

        // Catalog, page tree, page, content stream, resources and font; none
        // of the other 49 pages.
        assert!(part.objects.len() <= 6, "{} objects", part.objects.len());
        let part = PdfSource::from_bytes(&extracted.content).unwrap();
        assert_eq!(part.page_count(), 1);
        assert!(part.page_text(0).unwrap().contains("page 7"));
    }

    #[test]
    fn test_extract_pages_carries_inherited_attributes() {
        let layout = Layout {
            inherit_resources: true,
            ..Layout::default()
        };
        let bytes = build_pdf_with(&["first", "Second Page"], &layout);
        let source = PdfSource::from_bytes(&bytes).unwrap();
        assert!(source.page_text(1).unwrap().contains("second page"));

        let extracted = source.extract_pages(Segment { start: 1, end: 2 }).unwrap();
        let part = Document::load_mem(&extracted.content).unwrap();
        let page_id = *part.get_pages().get(&1).unwrap();
        let page = part.get_dictionary(page_id).unwrap();
        assert!(page.get(b"Resources").is_ok());
        assert!(page.get(b"MediaBox").is_ok());

        let part = PdfSource::from_bytes(&extracted.content).unwrap();
        assert!(part.page_text(0).unwrap().contains("second page"));
    }

    #[test]
    fn test_extract_out_of_range_fails() {
        let bytes = build_pdf(&["only"]);
        let source = PdfSource::from_bytes(&bytes).unwrap();
        assert!(matches!(
            source.extract_pages(Segment { start: 0, end: 2 }),
            Err(SplitterError::Pdf { .. })
        ));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(
            PdfSource::from_bytes(b"definitely not a pdf"),
            Err(SplitterError::Pdf { .. })
        ));
    }
}
