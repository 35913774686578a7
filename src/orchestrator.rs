//! Extraction orchestration: the fallback state machine.
//!
//! The structural path runs first. The vision fallback runs only when
//! structural detection found zero candidate tables across every page (a
//! page-level detection failure counts as zero candidates for that page).
//! A structural pass that *detected* tables but formatted them to an empty
//! dataset is accepted as a legitimate "no data" result and is not
//! redirected — that asymmetry is deliberate and preserved.
//!
//! Whatever happens, a syntactically valid (possibly empty) CSV exists at
//! the output path before any error reaches the caller.

use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use crate::combine::combine_tables;
use crate::config::PipelineConfig;
use crate::detect::{filter_by_confidence, TableDetector};
use crate::document::SourceDocument;
use crate::error::ExtractionError;
use crate::fallback::{PageOutcome, VisionFallbackExtractor};
use crate::format::TableFormatter;
use crate::raster::PageRasterizer;
use crate::vision::VisionClient;
use crate::writer::{write_csv, write_empty_csv};

/// Which path produced the artifact, for logging and response metadata.
/// Not used for control flow beyond the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExtractionOutcome {
    StructuralSuccess { rows: usize },
    VisionFallbackSuccess { rows: usize },
    Empty,
}

impl ExtractionOutcome {
    pub fn row_count(&self) -> usize {
        match self {
            ExtractionOutcome::StructuralSuccess { rows }
            | ExtractionOutcome::VisionFallbackSuccess { rows } => *rows,
            ExtractionOutcome::Empty => 0,
        }
    }
}

struct StructuralPass {
    /// Candidate tables the detector reported, before confidence filtering.
    detected: usize,
    /// Row grids of the accepted, successfully formatted tables.
    tables: Vec<Vec<Vec<String>>>,
}

/// The extraction pipeline with its injected capabilities.
///
/// Uses trait objects for every external seam, enabling dependency
/// injection: the structural detector in particular is expected to be
/// constructed once at process start (its state is a loaded model,
/// read-only after initialization) and shared across requests.
pub struct ExtractionPipeline {
    detector: Box<dyn TableDetector + Send + Sync>,
    formatter: Box<dyn TableFormatter + Send + Sync>,
    rasterizer: Box<dyn PageRasterizer + Send + Sync>,
    vision: Box<dyn VisionClient + Send + Sync>,
    config: PipelineConfig,
}

impl ExtractionPipeline {
    pub fn new(
        detector: Box<dyn TableDetector + Send + Sync>,
        formatter: Box<dyn TableFormatter + Send + Sync>,
        rasterizer: Box<dyn PageRasterizer + Send + Sync>,
        vision: Box<dyn VisionClient + Send + Sync>,
    ) -> Self {
        Self {
            detector,
            formatter,
            rasterizer,
            vision,
            config: PipelineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Extract whatever tabular data the source contains and write one
    /// combined CSV at `output`.
    ///
    /// On any failure an empty CSV is still written at `output` (best
    /// effort) before the error is returned, so downstream consumers
    /// always find a well-formed artifact at the expected location.
    pub fn run(
        &self,
        source: &Path,
        output: &Path,
    ) -> Result<ExtractionOutcome, ExtractionError> {
        info!(
            source = %source.display(),
            output = %output.display(),
            "Starting table extraction"
        );

        match self.try_run(source, output) {
            Ok(outcome) => {
                info!(outcome = ?outcome, "Extraction complete");
                Ok(outcome)
            }
            Err(e) => {
                if let Err(write_err) = write_empty_csv(output) {
                    warn!(error = %write_err, "Could not write empty fallback artifact");
                }
                Err(e)
            }
        }
    }

    fn try_run(
        &self,
        source: &Path,
        output: &Path,
    ) -> Result<ExtractionOutcome, ExtractionError> {
        let document = SourceDocument::open(source)?;
        let page_count = document.page_count(self.rasterizer.as_ref())?;
        info!(pages = page_count, kind = ?document.kind(), "Document opened");

        let structural = self.structural_pass(&document, page_count);

        let (dataset, fallback_used) = if structural.detected > 0 {
            info!(
                candidates = structural.detected,
                formatted = structural.tables.len(),
                "Structural detection found tables"
            );
            (combine_tables(structural.tables), false)
        } else {
            info!("No structural tables detected; running vision fallback");
            let extractor = VisionFallbackExtractor::new(
                self.rasterizer.as_ref(),
                self.vision.as_ref(),
                self.config.render_dpi,
            );
            let rows: Vec<Vec<Vec<String>>> = extractor
                .extract_document(&document, page_count)
                .into_iter()
                .map(PageOutcome::into_rows)
                .collect();
            (combine_tables(rows), true)
        };

        write_csv(&dataset, output)?;

        let rows = dataset.row_count();
        Ok(if rows == 0 {
            ExtractionOutcome::Empty
        } else if fallback_used {
            ExtractionOutcome::VisionFallbackSuccess { rows }
        } else {
            ExtractionOutcome::StructuralSuccess { rows }
        })
    }

    /// Detect and format tables page by page, absorbing page-level and
    /// table-level failures.
    fn structural_pass(&self, document: &SourceDocument, page_count: usize) -> StructuralPass {
        let mut detected = 0;
        let mut tables = Vec::new();

        for page_index in 0..page_count {
            let candidates = match self.detector.detect(document, page_index) {
                Ok(candidates) => candidates,
                Err(e) => {
                    warn!(
                        page = page_index,
                        error = %e,
                        "Structural detection failed; page contributes no tables"
                    );
                    continue;
                }
            };
            detected += candidates.len();

            let accepted = filter_by_confidence(candidates, self.config.confidence_threshold);
            for table in accepted {
                match self.formatter.format(&table) {
                    Ok(formatted) => tables.push(formatted.into_rows()),
                    Err(e) => {
                        warn!(
                            page = page_index,
                            error = %e,
                            "Table formatting failed; table skipped"
                        );
                    }
                }
            }
        }

        StructuralPass { detected, tables }
    }
}
