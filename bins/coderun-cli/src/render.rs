// Terminal rendering of submissions
use coderun_client::{Progress, Submission};
use coderun_common::status::{classify_status, verdict_line};
use coderun_common::types::{CaseReport, ExecutionResult};

const CASE_SEPARATOR: &str = "\n---\n";

/// Split a stdin file into one input per case; blank lines separate cases
pub fn split_stdins(raw: &str) -> Vec<String> {
    let mut cases = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in raw.trim().lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                cases.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        cases.push(current.join("\n"));
    }

    // an empty file still runs the program once
    if cases.is_empty() {
        cases.push(String::new());
    }
    cases
}

pub fn metrics_line(result: &ExecutionResult) -> String {
    format!(
        "exitCode: {}, duration: {:.0}ms, memory: {}KB, timedOut: {}",
        result.exit_code, result.duration_ms, result.memory_used_kb, result.timed_out
    )
}

pub fn progress_line(progress: &Progress) -> String {
    match progress.ratio() {
        Some(ratio) => format!("⏳ progress {} ({:.0}%)", progress, ratio * 100.0),
        None => format!("⏳ progress {}", progress),
    }
}

fn render_case(report: &CaseReport) -> String {
    match report {
        CaseReport::Plain(result) => format!(
            "#{}\nstdout: {}\nstderr: {}\n{}",
            result.case_index + 1,
            result.stdout.trim_end(),
            result.stderr.trim_end(),
            metrics_line(result)
        ),
        CaseReport::Judged(case) => format!(
            "#{} [{}] {}\nstdout: {}\nstderr: {}\n{}",
            case.id,
            case.visibility,
            classify_status(&case.status),
            case.result.stdout.trim_end(),
            case.result.stderr.trim_end(),
            metrics_line(&case.result)
        ),
    }
}

/// All populated cases in index order, plus the verdict of a completed graded run
pub fn render_submission(submission: &Submission) -> String {
    let mut out = submission
        .cases()
        .iter()
        .map(render_case)
        .collect::<Vec<_>>()
        .join(CASE_SEPARATOR);

    if submission.completed() {
        if let Some(all_passed) = submission.all_passed() {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(verdict_line(all_passed));
        }
    }
    out
}
