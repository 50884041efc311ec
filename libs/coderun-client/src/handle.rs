use crate::acquire::Outcome;
use crate::error::{AcquireError, SubmissionFailure};
use crate::submission::Submission;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Owner of a spawned acquisition
///
/// Dropping the handle before the submission finished is abandonment: the
/// token is cancelled, polling stops and an open channel is closed.
#[derive(Debug)]
pub struct SubmissionHandle {
    updates: watch::Receiver<Submission>,
    cancel: CancellationToken,
    task: Option<JoinHandle<Outcome>>,
}

impl SubmissionHandle {
    pub(crate) fn new(
        updates: watch::Receiver<Submission>,
        cancel: CancellationToken,
        task: JoinHandle<Outcome>,
    ) -> Self {
        Self {
            updates,
            cancel,
            task: Some(task),
        }
    }

    /// Receiver republished after every state change
    pub fn updates(&self) -> watch::Receiver<Submission> {
        self.updates.clone()
    }

    pub fn latest(&self) -> Submission {
        self.updates.borrow().clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Token that cancels this submission, for callers that outlive `wait`
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for the terminal outcome
    pub async fn wait(mut self) -> Outcome {
        let Some(task) = self.task.take() else {
            return Err(self.interrupted());
        };

        match task.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(self.interrupted()),
        }
    }

    fn interrupted(&self) -> SubmissionFailure {
        let mut partial = self.latest();
        partial.fail();
        SubmissionFailure {
            error: AcquireError::Cancelled,
            partial: Box::new(partial),
        }
    }
}

impl Drop for SubmissionHandle {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.cancel.cancel();
        }
    }
}
