/// Aggregator - Sparse Per-Case Results of One Submission
///
/// **Core Responsibility:**
/// Hold the case results of an in-flight submission keyed by case index
/// and expose them in ascending index order at any time.
///
/// **Rules:**
/// - `put` inserts or overwrites; an overwrite replaces, never merges
/// - No bound check against the expected case count
/// - Gaps are skipped in `snapshot`, never represented as placeholders
///
/// Mutation needs `&mut self`; the owning state machine is the only writer.

use coderun_common::types::CaseReport;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregator {
    cases: BTreeMap<usize, CaseReport>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the report at `index`, returning the one replaced
    pub fn put(&mut self, index: usize, report: CaseReport) -> Option<CaseReport> {
        self.cases.insert(index, report.with_index(index))
    }

    /// Populated cases in ascending index order
    pub fn snapshot(&self) -> Vec<CaseReport> {
        self.cases.values().cloned().collect()
    }

    pub fn count(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }

    pub fn indices(&self) -> Vec<usize> {
        self.cases.keys().copied().collect()
    }

    pub fn get(&self, index: usize) -> Option<&CaseReport> {
        self.cases.get(&index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CaseReport> {
        self.cases.values()
    }

    /// Discard every entry and take `reports` as the whole view
    pub fn replace_all(&mut self, reports: impl IntoIterator<Item = CaseReport>) {
        self.cases = reports
            .into_iter()
            .map(|report| (report.index(), report))
            .collect();
    }
}
