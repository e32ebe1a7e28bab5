//! Page-by-page text extraction.

use lopdf::Document;
use tracing::debug;

use friday_core::{band_percent, ProgressSink, ProgressStage, SidecarError, SidecarResult};

/// Progress band covered by text extraction.
pub const TEXT_BAND: (u32, u32) = (0, 40);

/// Heading that opens every page section.
pub fn page_heading(page: u32) -> String {
    format!("## Page {}", page)
}

/// Extract every page's text, in document order, each under a page heading.
///
/// Emits one `text` progress event before the first page and one after each
/// page. A document with no pages still ends the band at 40.
pub fn extract_text(doc: &Document, progress: &dyn ProgressSink) -> SidecarResult<String> {
    let pages = doc.get_pages();
    let total = pages.len();
    let (start, width) = TEXT_BAND;

    progress.report(
        ProgressStage::Text,
        start,
        &format!("Extracting text from {} pages", total),
    );

    let mut out = String::new();
    for (done, page_number) in pages.keys().enumerate() {
        let text = doc.extract_text(&[*page_number]).map_err(|e| {
            SidecarError::extraction(format!("text of page {}: {}", page_number, e))
        })?;
        debug!(page = page_number, chars = text.len(), "Extracted page text");

        out.push_str(&page_heading(*page_number));
        out.push_str("\n\n");
        let text = text.trim();
        if !text.is_empty() {
            out.push_str(text);
            out.push_str("\n\n");
        }

        progress.report(
            ProgressStage::Text,
            band_percent(start, width, done + 1, total),
            &format!("Text extracted from page {}/{}", done + 1, total),
        );
    }

    if total == 0 {
        progress.report(ProgressStage::Text, start + width, "Document has no pages");
    }

    Ok(out)
}
