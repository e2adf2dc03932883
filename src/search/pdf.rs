//! PDF decoding backed by `lopdf`.

use lopdf::Document;

use super::{DocumentDecoder, PagedDocument};

/// Decodes PDF bytes held in memory.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfDecoder;

impl DocumentDecoder for PdfDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<Box<dyn PagedDocument>, String> {
        let doc = Document::load_mem(bytes).map_err(|e| format!("not a readable PDF: {e}"))?;
        let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
        tracing::debug!(pages = pages.len(), "PDF decoded");
        Ok(Box::new(PdfDocument { doc, pages }))
    }
}

struct PdfDocument {
    doc: Document,
    /// Page numbers as known to lopdf, in order.
    pages: Vec<u32>,
}

impl PagedDocument for PdfDocument {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_text(&self, page: u32) -> Result<String, String> {
        let number = page
            .checked_sub(1)
            .and_then(|i| self.pages.get(i as usize))
            .ok_or_else(|| format!("page {page} out of range"))?;
        self.doc
            .extract_text(&[*number])
            .map_err(|e| e.to_string())
    }
}
