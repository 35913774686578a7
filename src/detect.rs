//! Structural table detection seam.
//!
//! The layout-analysis capability is external; this module defines the
//! trait it plugs into, the `DetectedTable` shape it produces, and the
//! confidence filtering rule applied before formatting.
//!
//! Scores are *lower-is-better* — an inversion of the usual convention,
//! preserved deliberately: a table is accepted only when its score is
//! strictly below the threshold.

use serde::Serialize;

use crate::document::SourceDocument;
use crate::error::ExtractionError;

/// Bounding region of a detected table, in page coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TableRegion {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// A candidate table region on one page.
///
/// Carries the owning page's index rather than a reference; the page is
/// not owned by the table.
#[derive(Debug, Clone)]
pub struct DetectedTable {
    pub page_index: usize,
    pub region: TableRegion,
    /// Detector quality score in [0, ∞); lower is better.
    pub confidence_score: f64,
}

impl DetectedTable {
    pub fn new(page_index: usize, region: TableRegion, confidence_score: f64) -> Self {
        Self {
            page_index,
            region,
            confidence_score,
        }
    }
}

/// Structural table detector over native document pages.
///
/// Returns a possibly-empty sequence for a page — "no tables found" is an
/// empty result, never an error. May fail on a malformed page; the caller
/// treats that as a page-level failure, not a document failure.
///
/// Implementations must be read-only after construction so one instance
/// can be shared across requests.
pub trait TableDetector {
    fn detect(
        &self,
        document: &SourceDocument,
        page_index: usize,
    ) -> Result<Vec<DetectedTable>, ExtractionError>;
}

/// Keep only tables whose score is strictly below the threshold.
pub fn filter_by_confidence(tables: Vec<DetectedTable>, threshold: f64) -> Vec<DetectedTable> {
    tables
        .into_iter()
        .filter(|t| t.confidence_score < threshold)
        .collect()
}

// ── Mock for testing ──────────────────────────────────────

/// Mock detector returning preconfigured tables per page.
pub struct MockTableDetector {
    per_page: Vec<Vec<DetectedTable>>,
    failing_pages: Vec<usize>,
}

impl MockTableDetector {
    /// Detector that finds nothing on any page.
    pub fn empty() -> Self {
        Self {
            per_page: Vec::new(),
            failing_pages: Vec::new(),
        }
    }

    /// Detector returning `per_page[i]` for page `i` (empty past the end).
    pub fn with_tables(per_page: Vec<Vec<DetectedTable>>) -> Self {
        Self {
            per_page,
            failing_pages: Vec::new(),
        }
    }

    /// Make detection fail on the given pages.
    pub fn failing_on(mut self, pages: Vec<usize>) -> Self {
        self.failing_pages = pages;
        self
    }
}

impl TableDetector for MockTableDetector {
    fn detect(
        &self,
        _document: &SourceDocument,
        page_index: usize,
    ) -> Result<Vec<DetectedTable>, ExtractionError> {
        if self.failing_pages.contains(&page_index) {
            return Err(ExtractionError::TableDetection {
                page: page_index,
                reason: "mock detection failure".into(),
            });
        }
        Ok(self.per_page.get(page_index).cloned().unwrap_or_default())
    }
}
