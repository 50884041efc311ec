// CLI commands for submitting code and following results
use crate::render::{progress_line, render_submission, split_stdins};
use anyhow::{bail, Context, Result};
use coderun_client::{Orchestrator, Submission, SubmissionHandle};
use coderun_common::config::{AcceptMode, ClientConfig};
use coderun_common::endpoints::DEFAULT_SUBMIT_PATH;
use coderun_common::status::classify;
use coderun_common::wire::SubmitRequest;
use std::fs;
use std::path::Path;
use tokio::sync::watch;
use tracing::{debug, info};

pub struct RunOptions<'a> {
    pub language: &'a str,
    pub file: &'a Path,
    pub stdins: Vec<String>,
    pub stdins_file: Option<&'a Path>,
    pub time_limit: Option<u64>,
    pub memory_limit: Option<u64>,
    pub token: Option<String>,
}

fn read_source(file: &Path) -> Result<String> {
    fs::read_to_string(file).with_context(|| format!("Failed to read {}", file.display()))
}

fn build_orchestrator(config: &ClientConfig) -> Result<Orchestrator> {
    Orchestrator::from_config(config).context("Failed to create HTTP client")
}

/// Run code against one or more stdins
pub async fn run_code(config: &ClientConfig, options: RunOptions<'_>) -> Result<()> {
    let code = read_source(options.file)?;

    let mut stdins = options.stdins;
    if let Some(path) = options.stdins_file {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        stdins.extend(split_stdins(&raw));
    }
    if stdins.is_empty() {
        stdins.push(String::new());
    }
    check_case_count(config, stdins.len())?;

    println!(
        "🚀 Running {} ({} case{})",
        options.file.display(),
        stdins.len(),
        if stdins.len() == 1 { "" } else { "s" }
    );

    let request = SubmitRequest {
        time_limit: options.time_limit,
        memory_limit: options.memory_limit,
        token: options.token,
        ..SubmitRequest::new(options.language, code)
    }
    .with_stdins(stdins);

    let handle = build_orchestrator(config)?.spawn(request);
    follow(handle).await
}

/// The plain /execute backend only reads a single `stdin`
fn check_case_count(config: &ClientConfig, cases: usize) -> Result<()> {
    if cases > 1 && config.endpoints.submit == DEFAULT_SUBMIT_PATH {
        bail!(
            "{} reads a single stdin; pass --endpoint (e.g. /execute_v2) to run {} cases",
            DEFAULT_SUBMIT_PATH,
            cases
        );
    }
    Ok(())
}

/// Submit code for a problem and print the verdict
pub async fn judge_code(
    config: &ClientConfig,
    language: &str,
    file: &Path,
    problem_id: &str,
    token: Option<String>,
) -> Result<()> {
    if problem_id.trim().is_empty() {
        bail!("Problem id cannot be empty");
    }
    let code = read_source(file)?;

    println!("⚖️  Judging {} against problem {}", file.display(), problem_id);

    let request = SubmitRequest {
        problem_id: Some(problem_id.to_string()),
        token,
        ..SubmitRequest::new(language, code)
    };

    let handle = build_orchestrator(config)?.spawn(request);
    follow(handle).await
}

/// Resume a submission the backend already accepted
pub async fn attach(
    config: &ClientConfig,
    request_id: &str,
    stream: bool,
    token: Option<String>,
) -> Result<()> {
    let mode = if stream {
        AcceptMode::Stream
    } else {
        AcceptMode::Poll
    };
    println!("🔗 Attaching to request {}", request_id);

    let handle = build_orchestrator(config)?.spawn_attach(request_id.to_string(), mode, token);
    follow(handle).await
}

/// Print the display label of a status code
pub fn classify_code(code: &str) {
    let classification = classify(code);
    debug!(code, category = ?classification.category, "Classified status");
    println!("{}", classification);
}

/// Print progress until the submission ends, then the results
async fn follow(handle: SubmissionHandle) -> Result<()> {
    let printer = tokio::spawn(print_progress(handle.updates()));

    let cancel = handle.cancellation();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, cancelling submission");
            cancel.cancel();
        }
    });

    let outcome = handle.wait().await;
    interrupt.abort();
    // the sender is gone once the task ended, so the printer drains and stops
    if let Err(e) = printer.await {
        debug!(error = %e, "Progress printer ended abnormally");
    }

    match outcome {
        Ok(submission) => {
            print_results(&submission);
            match elapsed_ms(&submission) {
                Some(ms) => println!("✅ Done in {}ms", ms),
                None => println!("✅ Done"),
            }
            Ok(())
        }
        Err(failure) => {
            if !failure.partial.cases().is_empty() {
                println!("⚠️  Partial results:");
                print_results(&failure.partial);
            }
            bail!("Submission failed: {}", failure.error)
        }
    }
}

async fn print_progress(mut updates: watch::Receiver<Submission>) {
    let mut last = None;
    while updates.changed().await.is_ok() {
        let (phase, progress) = {
            let submission = updates.borrow_and_update();
            (submission.phase(), submission.progress())
        };
        if phase.is_terminal() {
            continue;
        }
        if last != Some((phase, progress)) {
            if let Some(id) = updates.borrow().request_id() {
                debug!(request_id = id, phase = ?phase, "Update");
            }
            println!("{}", progress_line(&progress));
            last = Some((phase, progress));
        }
    }
}

fn elapsed_ms(submission: &Submission) -> Option<i64> {
    submission
        .finished_at()
        .map(|finished| (finished - submission.submitted_at()).num_milliseconds())
}

fn print_results(submission: &Submission) {
    let rendered = render_submission(submission);
    if rendered.is_empty() {
        println!("(no results)");
    } else {
        println!("{}", rendered);
    }
}
