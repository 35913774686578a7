//! Table formatting seam.
//!
//! The external formatting capability turns a detected region into a grid
//! of string cells. Missing values are normalized to empty strings — never
//! a null marker — so CSV output stays deterministic.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::detect::DetectedTable;
use crate::error::ExtractionError;

/// A rectangularized table: ordered rows of string cells. The first row
/// may be a header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormattedTable {
    rows: Vec<Vec<String>>,
}

impl FormattedTable {
    pub fn from_rows(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    /// Build from a grid where absent cells are `None`; they become `""`.
    pub fn from_cells(cells: Vec<Vec<Option<String>>>) -> Self {
        let rows = cells
            .into_iter()
            .map(|row| row.into_iter().map(Option::unwrap_or_default).collect())
            .collect();
        Self { rows }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Vec<String>> {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Formats one detected table into a cell grid.
///
/// Each table is formatted independently; a failure here is caught by the
/// caller and the table is skipped, never aborting its siblings.
pub trait TableFormatter {
    fn format(&self, table: &DetectedTable) -> Result<FormattedTable, ExtractionError>;
}

// ── Mock for testing ──────────────────────────────────────

enum MockBehavior {
    Fixed(FormattedTable),
    Sequence(Mutex<VecDeque<Result<FormattedTable, String>>>),
}

/// Mock formatter returning either a fixed grid for every table, or a
/// per-call sequence of results (exhaustion yields empty tables).
pub struct MockTableFormatter {
    behavior: MockBehavior,
}

impl MockTableFormatter {
    pub fn fixed(rows: Vec<Vec<String>>) -> Self {
        Self {
            behavior: MockBehavior::Fixed(FormattedTable::from_rows(rows)),
        }
    }

    pub fn empty() -> Self {
        Self::fixed(Vec::new())
    }

    pub fn sequence(results: Vec<Result<Vec<Vec<String>>, String>>) -> Self {
        let queue = results
            .into_iter()
            .map(|r| r.map(FormattedTable::from_rows))
            .collect();
        Self {
            behavior: MockBehavior::Sequence(Mutex::new(queue)),
        }
    }
}

impl TableFormatter for MockTableFormatter {
    fn format(&self, _table: &DetectedTable) -> Result<FormattedTable, ExtractionError> {
        match &self.behavior {
            MockBehavior::Fixed(table) => Ok(table.clone()),
            MockBehavior::Sequence(queue) => match queue.lock().unwrap().pop_front() {
                Some(Ok(table)) => Ok(table),
                Some(Err(reason)) => Err(ExtractionError::TableFormatting(reason)),
                None => Ok(FormattedTable::default()),
            },
        }
    }
}
