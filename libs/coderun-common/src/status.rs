/// Status Classifier - Judging Code to Display Category
///
/// **Core Responsibility:**
/// Map a backend judging status code to a semantic category and the
/// label shown next to each case.
///
/// **Properties:**
/// - Pure function, no state
/// - Never fails: unknown codes pass through as their own label
/// - Knows nothing about transports or how the code was obtained

use crate::types::CaseStatus;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Pass,
    CompileError,
    WrongOutput,
    Timeout,
    Failure,
    /// Code not known to this client; label is the code itself
    Unrecognized,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub category: Category,
    pub label: String,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Classify a raw status code
pub fn classify(status_code: &str) -> Classification {
    let (category, label) = match status_code {
        "success" => (Category::Pass, "PASS"),
        "compile_error" => (Category::CompileError, "COMPILE ERROR"),
        "wrong_output" => (Category::WrongOutput, "WRONG OUTPUT"),
        "timeout" => (Category::Timeout, "TIMEOUT"),
        "failure" => (Category::Failure, "FAIL"),
        other => (Category::Unrecognized, other),
    };

    Classification {
        category,
        label: label.to_string(),
    }
}

/// Classify an already decoded case status
pub fn classify_status(status: &CaseStatus) -> Classification {
    classify(status.code())
}

/// Run-level message shown under graded results
pub fn verdict_line(all_passed: bool) -> &'static str {
    if all_passed {
        "All tests passed!"
    } else {
        "Some tests failed."
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        let cases = [
            ("success", Category::Pass, "PASS"),
            ("compile_error", Category::CompileError, "COMPILE ERROR"),
            ("wrong_output", Category::WrongOutput, "WRONG OUTPUT"),
            ("timeout", Category::Timeout, "TIMEOUT"),
            ("failure", Category::Failure, "FAIL"),
        ];

        for (code, category, label) in cases {
            let classification = classify(code);
            assert_eq!(classification.category, category, "code {}", code);
            assert_eq!(classification.label, label, "code {}", code);
        }
    }

    #[test]
    fn test_unrecognized_code_passes_through() {
        let classification = classify("oops");
        assert_eq!(classification.category, Category::Unrecognized);
        assert_eq!(classification.label, "oops");
        assert_eq!(classification.to_string(), "oops");
    }

    #[test]
    fn test_empty_code() {
        assert_eq!(classify("").label, "");
    }

    #[test]
    fn test_classify_status_matches_raw_code() {
        assert_eq!(classify_status(&CaseStatus::Timeout).label, "TIMEOUT");
        assert_eq!(
            classify_status(&CaseStatus::Other("memory_limit".to_string())).label,
            "memory_limit"
        );
    }

    #[test]
    fn test_verdict_line() {
        assert_eq!(verdict_line(true), "All tests passed!");
        assert_eq!(verdict_line(false), "Some tests failed.");
    }
}
