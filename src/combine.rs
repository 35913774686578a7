//! Result combination.
//!
//! Reconciles per-page/per-table row grids of differing widths into one
//! ordered dataset: the unified column count is the maximum seen across
//! all inputs, shorter rows are right-padded with empty strings, and input
//! order is preserved. Header rows from separate tables are kept inline —
//! simple concatenation, no dedup or merge.

use tracing::debug;

/// The single unified row collection for one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CombinedDataset {
    rows: Vec<Vec<String>>,
    column_count: usize,
}

impl CombinedDataset {
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.column_count
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Concatenate row grids into one dataset.
///
/// Tables that contribute no rows are skipped silently; an input with no
/// rows at all yields an empty dataset, which is not an error.
pub fn combine_tables<I>(tables: I) -> CombinedDataset
where
    I: IntoIterator<Item = Vec<Vec<String>>>,
{
    let tables: Vec<Vec<Vec<String>>> = tables.into_iter().collect();

    let column_count = tables
        .iter()
        .flat_map(|t| t.iter())
        .map(Vec::len)
        .max()
        .unwrap_or(0);

    let mut rows = Vec::new();
    for table in tables {
        if table.is_empty() {
            continue;
        }
        for mut row in table {
            row.resize(column_count, String::new());
            rows.push(row);
        }
    }

    debug!(
        rows = rows.len(),
        columns = column_count,
        "Combined extracted tables"
    );

    CombinedDataset { rows, column_count }
}
