//! tablecast — multi-strategy table extraction to CSV.
//!
//! Takes a PDF (digital or scanned) or a standalone table image and
//! produces one normalized CSV file. Digital PDFs go through structural
//! layout analysis; scanned documents and images fall back to a remote
//! vision model that reads each page as an image. Per-table and per-page
//! results are combined into a single dataset, and a document with no
//! extractable tables degrades gracefully to a valid empty CSV.
//!
//! The entry point is [`ExtractionPipeline`], constructed with its
//! capabilities injected as trait objects:
//!
//! ```no_run
//! use tablecast::{ExtractionPipeline, GeminiClient, PdfiumRasterizer};
//! use tablecast::{MockTableDetector, MockTableFormatter};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), tablecast::ExtractionError> {
//! let pipeline = ExtractionPipeline::new(
//!     Box::new(MockTableDetector::empty()),
//!     Box::new(MockTableFormatter::empty()),
//!     Box::new(PdfiumRasterizer::new()?),
//!     Box::new(GeminiClient::from_env()?),
//! );
//!
//! let outcome = pipeline.run(Path::new("report.pdf"), Path::new("report.csv"))?;
//! println!("extracted {} rows", outcome.row_count());
//! # Ok(())
//! # }
//! ```

pub mod combine;
pub mod config;
pub mod detect;
pub mod document;
pub mod error;
pub mod fallback;
pub mod format;
pub mod orchestrator;
pub mod raster;
pub mod vision;
pub mod writer;

pub use combine::{combine_tables, CombinedDataset};
pub use config::{PipelineConfig, VisionConfig};
pub use detect::{filter_by_confidence, DetectedTable, MockTableDetector, TableDetector, TableRegion};
pub use document::{ImageMime, SourceDocument, SourceKind};
pub use error::ExtractionError;
pub use fallback::{PageOutcome, VisionFallbackExtractor};
pub use format::{FormattedTable, MockTableFormatter, TableFormatter};
pub use orchestrator::{ExtractionOutcome, ExtractionPipeline};
pub use raster::{MockRasterizer, PageRasterizer, PdfiumRasterizer};
pub use vision::{GeminiClient, MockVisionClient, VisionClient};
pub use writer::{write_csv, write_empty_csv};
