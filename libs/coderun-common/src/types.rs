use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of one run of the submitted code against one stdin case
///
/// Units are fixed for the whole workspace: milliseconds for time and
/// kilobytes for memory. The wire encoding uses the same units.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    pub case_index: usize,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub duration_ms: f64,
    pub memory_used_kb: u64,
    /// Set when the limiter killed the process, never on a normal exit
    pub timed_out: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Visible,
    Hidden,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Visibility::Visible => write!(f, "visible"),
            Visibility::Hidden => write!(f, "hidden"),
        }
    }
}

/// Judging status code reported by the backend for a graded case
///
/// Codes the client does not know are kept verbatim in `Other` so that
/// decoding a graded response never fails on a new status.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CaseStatus {
    Success,
    CompileError,
    WrongOutput,
    Timeout,
    Failure,
    Other(String),
}

impl CaseStatus {
    pub fn code(&self) -> &str {
        match self {
            CaseStatus::Success => "success",
            CaseStatus::CompileError => "compile_error",
            CaseStatus::WrongOutput => "wrong_output",
            CaseStatus::Timeout => "timeout",
            CaseStatus::Failure => "failure",
            CaseStatus::Other(code) => code,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CaseStatus::Success)
    }
}

impl From<&str> for CaseStatus {
    fn from(code: &str) -> Self {
        match code {
            "success" => CaseStatus::Success,
            "compile_error" => CaseStatus::CompileError,
            "wrong_output" => CaseStatus::WrongOutput,
            "timeout" => CaseStatus::Timeout,
            "failure" => CaseStatus::Failure,
            other => CaseStatus::Other(other.to_string()),
        }
    }
}

impl From<String> for CaseStatus {
    fn from(code: String) -> Self {
        CaseStatus::from(code.as_str())
    }
}

impl From<CaseStatus> for String {
    fn from(status: CaseStatus) -> Self {
        status.code().to_string()
    }
}

impl fmt::Display for CaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// An execution result annotated with its grading outcome
#[derive(Debug, Clone, PartialEq)]
pub struct JudgedCase {
    pub result: ExecutionResult,
    /// Stable across every submission to the same problem
    pub id: String,
    pub visibility: Visibility,
    pub status: CaseStatus,
}

impl JudgedCase {
    pub fn passed(&self) -> bool {
        self.status.is_success()
    }
}

/// One populated slot of a submission's case collection
#[derive(Debug, Clone, PartialEq)]
pub enum CaseReport {
    Plain(ExecutionResult),
    Judged(JudgedCase),
}

impl CaseReport {
    pub fn index(&self) -> usize {
        self.result().case_index
    }

    pub fn result(&self) -> &ExecutionResult {
        match self {
            CaseReport::Plain(result) => result,
            CaseReport::Judged(judged) => &judged.result,
        }
    }

    /// Re-key the report to `index`
    pub fn with_index(mut self, index: usize) -> Self {
        match &mut self {
            CaseReport::Plain(result) => result.case_index = index,
            CaseReport::Judged(judged) => judged.result.case_index = index,
        }
        self
    }

    pub fn judged(&self) -> Option<&JudgedCase> {
        match self {
            CaseReport::Plain(_) => None,
            CaseReport::Judged(judged) => Some(judged),
        }
    }

    /// `None` for ungraded runs, where pass/fail is not defined
    pub fn passed(&self) -> Option<bool> {
        self.judged().map(JudgedCase::passed)
    }
}
