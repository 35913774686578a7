//! CSV output writing.
//!
//! Write failures are fatal to the request — there is nothing further to
//! degrade to — and are surfaced as `WriteFailure`.

use std::fs::File;
use std::path::Path;

use tracing::info;

use crate::combine::CombinedDataset;
use crate::error::ExtractionError;

/// Serialize the dataset as CSV at `path`, creating parent directories as
/// needed.
///
/// Cells are double-quoted only as required by standard CSV quoting; empty
/// cells are zero-length fields. An empty dataset produces an empty file —
/// a valid "no data" artifact.
pub fn write_csv(dataset: &CombinedDataset, path: &Path) -> Result<(), ExtractionError> {
    let fail = |reason: String| ExtractionError::WriteFailure {
        path: path.to_path_buf(),
        reason,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| fail(e.to_string()))?;
        }
    }

    let file = File::create(path).map_err(|e| fail(e.to_string()))?;
    let mut writer = csv::Writer::from_writer(file);

    for row in dataset.rows() {
        writer.write_record(row).map_err(|e| fail(e.to_string()))?;
    }
    writer.flush().map_err(|e| fail(e.to_string()))?;

    info!(
        path = %path.display(),
        rows = dataset.row_count(),
        columns = dataset.column_count(),
        "Wrote CSV output"
    );
    Ok(())
}

/// Write the well-formed empty artifact promised on failure paths.
pub fn write_empty_csv(path: &Path) -> Result<(), ExtractionError> {
    write_csv(&CombinedDataset::default(), path)
}
