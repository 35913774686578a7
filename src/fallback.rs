//! Vision fallback extraction.
//!
//! Each page moves through rasterize → request → parse. The outcome is an
//! explicit per-page result; a failure at any step yields zero rows for
//! that page and never propagates to sibling pages.

use tracing::{info, warn};

use crate::document::SourceDocument;
use crate::raster::PageRasterizer;
use crate::vision::{parse_csv_rows, strip_code_fences, VisionClient};

/// Explicit result of one page's vision extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    Extracted {
        page_index: usize,
        rows: Vec<Vec<String>>,
    },
    Empty {
        page_index: usize,
    },
    Failed {
        page_index: usize,
        reason: String,
    },
}

impl PageOutcome {
    /// Rows contributed by this page (empty for `Empty` and `Failed`).
    pub fn into_rows(self) -> Vec<Vec<String>> {
        match self {
            PageOutcome::Extracted { rows, .. } => rows,
            PageOutcome::Empty { .. } | PageOutcome::Failed { .. } => Vec::new(),
        }
    }
}

/// Runs the vision path over a document, one page at a time, in order.
pub struct VisionFallbackExtractor<'a> {
    rasterizer: &'a dyn PageRasterizer,
    client: &'a dyn VisionClient,
    dpi: u32,
}

impl<'a> VisionFallbackExtractor<'a> {
    pub fn new(rasterizer: &'a dyn PageRasterizer, client: &'a dyn VisionClient, dpi: u32) -> Self {
        Self {
            rasterizer,
            client,
            dpi,
        }
    }

    /// Extract rows from every page, absorbing per-page failures.
    pub fn extract_document(
        &self,
        document: &SourceDocument,
        page_count: usize,
    ) -> Vec<PageOutcome> {
        (0..page_count)
            .map(|page_index| self.extract_page(document, page_index))
            .collect()
    }

    /// Run one page through the vision path. Never returns an error: a
    /// failed render, request, or parse is a `Failed` outcome for this
    /// page only.
    pub fn extract_page(&self, document: &SourceDocument, page_index: usize) -> PageOutcome {
        // Rendering
        let (image, mime) = match document.rasterize_page(self.rasterizer, page_index, self.dpi) {
            Ok(rendered) => rendered,
            Err(e) => {
                warn!(page = page_index, error = %e, "Vision fallback: page render failed");
                return PageOutcome::Failed {
                    page_index,
                    reason: e.to_string(),
                };
            }
        };

        // Requesting
        let raw = match self.client.extract_table_text(&image, mime) {
            Ok(text) => text,
            Err(e) => {
                warn!(page = page_index, error = %e, "Vision fallback: request failed");
                return PageOutcome::Failed {
                    page_index,
                    reason: e.to_string(),
                };
            }
        };

        // ParsingResponse
        let cleaned = strip_code_fences(&raw);
        if cleaned.is_empty() {
            return PageOutcome::Empty { page_index };
        }

        match parse_csv_rows(&cleaned) {
            Ok(rows) if rows.is_empty() => PageOutcome::Empty { page_index },
            Ok(rows) => {
                info!(
                    page = page_index,
                    rows = rows.len(),
                    "Vision fallback extracted rows"
                );
                PageOutcome::Extracted { page_index, rows }
            }
            Err(e) => {
                warn!(page = page_index, error = %e, "Vision fallback: response unparseable");
                PageOutcome::Failed {
                    page_index,
                    reason: e.to_string(),
                }
            }
        }
    }
}
