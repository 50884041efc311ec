use crate::aggregator::Aggregator;
use chrono::{DateTime, Utc};
use coderun_common::types::CaseReport;
use coderun_common::wire::CaseWire;
use std::fmt;
use uuid::Uuid;

/// How results are acquired for a submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Sync,
    Poll,
    Stream,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Sync => write!(f, "sync"),
            Mode::Poll => write!(f, "poll"),
            Mode::Stream => write!(f, "stream"),
        }
    }
}

/// Acquisition state machine states
///
/// `Submitted -> {SyncDone | Polling | Streaming} -> Finalized`, with
/// `Error` reachable from every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Submitted,
    SyncDone,
    Polling,
    Streaming,
    Finalized,
    Error,
}

impl Phase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Finalized | Phase::Error)
    }
}

/// Populated cases against the expected count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub done: usize,
    /// `None` while the backend has not told us how many cases to expect
    pub total: Option<usize>,
}

impl Progress {
    /// `None` when the denominator is unknown (indeterminate progress)
    pub fn ratio(&self) -> Option<f64> {
        match self.total {
            Some(total) if total > 0 => Some((self.done as f64 / total as f64).min(1.0)),
            _ => None,
        }
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.total {
            Some(total) => write!(f, "{}/{}", self.done, total),
            None => write!(f, "{}/?", self.done),
        }
    }
}

/// One end-to-end job as observed by the client
///
/// Only the acquisition state machine mutates a submission. Once it is
/// finalized (or failed) it is handed over and no longer changes.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    local_id: Uuid,
    request_id: Option<String>,
    mode: Option<Mode>,
    phase: Phase,
    expected_case_count: Option<usize>,
    /// Set once the backend announced a total
    total_announced: bool,
    cases: Aggregator,
    completed: bool,
    all_passed: Option<bool>,
    submitted_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
}

impl Submission {
    pub(crate) fn new(expected_case_count: Option<usize>) -> Self {
        Self {
            local_id: Uuid::new_v4(),
            request_id: None,
            mode: None,
            phase: Phase::Submitted,
            expected_case_count: expected_case_count.filter(|count| *count > 0),
            total_announced: false,
            cases: Aggregator::new(),
            completed: false,
            all_passed: None,
            submitted_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Client-side id, used to correlate log lines
    pub fn local_id(&self) -> Uuid {
        self.local_id
    }

    /// Backend token, present only for poll and stream modes
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn mode(&self) -> Option<Mode> {
        self.mode
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn expected_case_count(&self) -> Option<usize> {
        self.expected_case_count
    }

    pub fn cases(&self) -> &Aggregator {
        &self.cases
    }

    pub fn completed(&self) -> bool {
        self.completed
    }

    /// Meaningful only once completed, and only for graded runs
    pub fn all_passed(&self) -> Option<bool> {
        self.all_passed
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        self.submitted_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    pub fn progress(&self) -> Progress {
        Progress {
            done: self.cases.count(),
            total: self.expected_case_count,
        }
    }

    pub(crate) fn begin(&mut self, mode: Mode, request_id: Option<String>) {
        self.mode = Some(mode);
        self.request_id = request_id;
        self.phase = match mode {
            Mode::Sync => Phase::SyncDone,
            Mode::Poll => Phase::Polling,
            Mode::Stream => Phase::Streaming,
        };
    }

    /// Apply one progress message (last write wins per index)
    pub(crate) fn record_progress(&mut self, index: usize, report: CaseReport, total: Option<usize>) {
        self.cases.put(index, report);

        if let Some(total) = total {
            self.expected_case_count = Some(match self.expected_case_count {
                Some(known) if self.total_announced => known.max(total),
                _ => total,
            });
            self.total_announced = true;
        }

        // an index past the known count revises the total upward
        if let Some(known) = self.expected_case_count {
            if index >= known {
                self.expected_case_count = Some(index.saturating_add(1));
            }
        }
    }

    /// Take the backend's authoritative result set and close the submission
    ///
    /// `cases` of `None` keeps the aggregated view as the final one.
    pub(crate) fn finalize(&mut self, cases: Option<Vec<CaseWire>>, backend_all_passed: Option<bool>) {
        if let Some(cases) = cases {
            self.cases.replace_all(
                cases
                    .into_iter()
                    .enumerate()
                    .map(|(index, case)| case.into_report(index)),
            );
        }
        self.expected_case_count = Some(self.cases.count());

        let graded = self.cases.iter().any(|case| case.judged().is_some());
        self.all_passed = if !graded {
            backend_all_passed
        } else {
            // a case without a status in a graded set has not passed
            let ungraded: Vec<usize> = self
                .cases
                .iter()
                .filter(|case| case.judged().is_none())
                .map(CaseReport::index)
                .collect();
            if !ungraded.is_empty() {
                tracing::warn!(
                    local_id = %self.local_id,
                    indices = ?ungraded,
                    "Graded result set contains cases without a status"
                );
            }
            let computed = self.cases.iter().all(|case| case.passed() == Some(true));
            if backend_all_passed.is_some_and(|flag| flag != computed) {
                tracing::warn!(
                    local_id = %self.local_id,
                    backend = ?backend_all_passed,
                    computed,
                    "Backend allPassed disagrees with case statuses; using statuses"
                );
            }
            Some(computed)
        };

        self.completed = true;
        self.phase = Phase::Finalized;
        self.finished_at = Some(Utc::now());
    }

    pub(crate) fn fail(&mut self) {
        self.completed = false;
        self.phase = Phase::Error;
        self.finished_at = Some(Utc::now());
    }
}
