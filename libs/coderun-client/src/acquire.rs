/// Acquisition State Machine - One Flow for Sync, Poll and Stream Backends
///
/// **Core Responsibility:**
/// Submit a request, pick the acquisition strategy from the reply and drive
/// it until the submission is finalized or fails.
///
/// **Strategy Selection (from the submission reply):**
/// - HTTP 200 → `Sync`: the body is the final result set
/// - HTTP 202 with a streaming hint → `Stream`: progress over a message channel
/// - HTTP 202 without a hint → `Poll` (or `Stream`, per `unhinted_accept`)
/// - Anything else → backend error
///
/// **Guarantees:**
/// - One strategy per submission, events handled strictly one at a time
/// - Partial progress is republished after every message and never retracted
/// - A `final` message replaces the partial view wholesale
/// - Cancellation stops polling and closes the channel
/// - Every failure is returned with the partial submission, marked non-final
use crate::error::{AcquireError, SubmissionFailure, TransportError};
use crate::handle::SubmissionHandle;
use crate::submission::{Mode, Submission};
use crate::transport::{
    HttpReply, HttpTransport, MessageStream, ReqwestTransport, StreamConnector, WsConnector,
};
use coderun_common::config::{AcceptMode, ClientConfig, DEFAULT_POLL_INTERVAL_MS};
use coderun_common::endpoints::Endpoints;
use coderun_common::wire::{Accepted, ErrorBody, ResultBody, StreamMessage, SubmitRequest};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

pub type Outcome = Result<Submission, SubmissionFailure>;

#[derive(Debug, Clone, PartialEq)]
pub struct AcquireSettings {
    /// Fixed delay before every poll request
    pub poll_interval: Duration,
    pub endpoints: Endpoints,
    pub unhinted_accept: AcceptMode,
    /// Used when a request carries no token of its own
    pub default_token: Option<String>,
}

impl Default for AcquireSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            endpoints: Endpoints::default(),
            unhinted_accept: AcceptMode::default(),
            default_token: None,
        }
    }
}

impl From<&ClientConfig> for AcquireSettings {
    fn from(config: &ClientConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            endpoints: config.endpoints.clone(),
            unhinted_accept: config.unhinted_accept,
            default_token: config.token.clone().filter(|t| !t.is_empty()),
        }
    }
}

/// Strategy chosen from the submission reply
#[derive(Debug, Clone, PartialEq)]
pub enum Acquisition {
    Sync(ResultBody),
    Poll { request_id: String },
    Stream { request_id: String },
}

impl Acquisition {
    pub fn from_reply(reply: &HttpReply, unhinted: AcceptMode) -> Result<Self, AcquireError> {
        match reply.status {
            200 => decode_result_body(reply).map(Acquisition::Sync),
            202 => {
                let accepted: Accepted = serde_json::from_str(&reply.body).map_err(|e| {
                    AcquireError::Protocol(format!("invalid accepted body: {}", e))
                })?;
                if accepted.request_id.is_empty() {
                    return Err(AcquireError::Protocol(
                        "accepted reply without requestId".to_string(),
                    ));
                }

                let request_id = accepted.request_id;
                if accepted.stream || unhinted == AcceptMode::Stream {
                    Ok(Acquisition::Stream { request_id })
                } else {
                    Ok(Acquisition::Poll { request_id })
                }
            }
            status => Err(backend_error(status, &reply.body)),
        }
    }

    pub fn resume(request_id: &str, mode: AcceptMode) -> Self {
        let request_id = request_id.to_string();
        match mode {
            AcceptMode::Poll => Acquisition::Poll { request_id },
            AcceptMode::Stream => Acquisition::Stream { request_id },
        }
    }

    pub fn mode(&self) -> Mode {
        match self {
            Acquisition::Sync(_) => Mode::Sync,
            Acquisition::Poll { .. } => Mode::Poll,
            Acquisition::Stream { .. } => Mode::Stream,
        }
    }

    pub fn request_id(&self) -> Option<&str> {
        match self {
            Acquisition::Sync(_) => None,
            Acquisition::Poll { request_id } | Acquisition::Stream { request_id } => {
                Some(request_id)
            }
        }
    }
}

fn decode_result_body(reply: &HttpReply) -> Result<ResultBody, AcquireError> {
    serde_json::from_str(&reply.body).map_err(|e| match ErrorBody::message_from(&reply.body) {
        Some(message) => AcquireError::backend(Some(reply.status), message),
        None => AcquireError::Protocol(format!("invalid result body: {}", e)),
    })
}

fn backend_error(status: u16, body: &str) -> AcquireError {
    let message = ErrorBody::message_from(body)
        .unwrap_or_else(|| format!("request failed with HTTP {}", status));
    AcquireError::backend(Some(status), message)
}

/// Plain runs know their case count up front; graded runs learn it later
fn expected_cases(request: &SubmitRequest) -> Option<usize> {
    if request.is_graded() {
        return None;
    }
    request.case_count()
}

#[derive(Debug, Clone)]
pub struct Orchestrator {
    http: Arc<dyn HttpTransport>,
    streams: Arc<dyn StreamConnector>,
    settings: AcquireSettings,
}

impl Orchestrator {
    pub fn new(
        http: Arc<dyn HttpTransport>,
        streams: Arc<dyn StreamConnector>,
        settings: AcquireSettings,
    ) -> Self {
        Self {
            http,
            streams,
            settings,
        }
    }

    /// reqwest + WebSocket adapters against `config.api_url`
    pub fn from_config(config: &ClientConfig) -> Result<Self, TransportError> {
        Ok(Self::new(
            Arc::new(ReqwestTransport::new(&config.api_url)?),
            Arc::new(WsConnector::new(&config.api_url)),
            AcquireSettings::from(config),
        ))
    }

    /// Run a submission on its own task
    pub fn spawn(&self, request: SubmitRequest) -> SubmissionHandle {
        let submission = Submission::new(expected_cases(&request));
        let (updates, receiver) = watch::channel(submission.clone());
        let cancel = CancellationToken::new();

        let orchestrator = self.clone();
        let token = cancel.clone();
        let task = tokio::spawn(async move {
            orchestrator
                .acquire_with(submission, &request, &updates, &token)
                .await
        });

        SubmissionHandle::new(receiver, cancel, task)
    }

    /// Resume a known request on its own task
    pub fn spawn_attach(
        &self,
        request_id: String,
        mode: AcceptMode,
        token: Option<String>,
    ) -> SubmissionHandle {
        let submission = Submission::new(None);
        let (updates, receiver) = watch::channel(submission.clone());
        let cancel = CancellationToken::new();

        let orchestrator = self.clone();
        let cancel_token = cancel.clone();
        let task = tokio::spawn(async move {
            orchestrator
                .attach_with(
                    submission,
                    &request_id,
                    mode,
                    token.as_deref(),
                    &updates,
                    &cancel_token,
                )
                .await
        });

        SubmissionHandle::new(receiver, cancel, task)
    }

    /// Submit and acquire inline, publishing every state change on `updates`
    #[instrument(skip_all, fields(language = %request.language, graded = request.is_graded()))]
    pub async fn acquire(
        &self,
        request: &SubmitRequest,
        updates: &watch::Sender<Submission>,
        cancel: &CancellationToken,
    ) -> Outcome {
        let submission = Submission::new(expected_cases(request));
        self.acquire_with(submission, request, updates, cancel).await
    }

    /// Acquire results of an already accepted request without submitting
    #[instrument(skip(self, token, updates, cancel))]
    pub async fn attach(
        &self,
        request_id: &str,
        mode: AcceptMode,
        token: Option<&str>,
        updates: &watch::Sender<Submission>,
        cancel: &CancellationToken,
    ) -> Outcome {
        let submission = Submission::new(None);
        self.attach_with(submission, request_id, mode, token, updates, cancel)
            .await
    }

    async fn acquire_with(
        &self,
        mut submission: Submission,
        request: &SubmitRequest,
        updates: &watch::Sender<Submission>,
        cancel: &CancellationToken,
    ) -> Outcome {
        updates.send_replace(submission.clone());
        info!(
            local_id = %submission.local_id(),
            language = %request.language,
            cases = ?submission.expected_case_count(),
            "Submitting code"
        );

        let result = self
            .submit_and_drive(&mut submission, request, updates, cancel)
            .await;
        conclude(submission, result, updates)
    }

    async fn attach_with(
        &self,
        mut submission: Submission,
        request_id: &str,
        mode: AcceptMode,
        token: Option<&str>,
        updates: &watch::Sender<Submission>,
        cancel: &CancellationToken,
    ) -> Outcome {
        updates.send_replace(submission.clone());
        let token = token
            .filter(|t| !t.is_empty())
            .or(self.settings.default_token.as_deref());

        let acquisition = Acquisition::resume(request_id, mode);
        let result = self
            .drive(&mut submission, acquisition, token, updates, cancel)
            .await;
        conclude(submission, result, updates)
    }

    async fn submit_and_drive(
        &self,
        submission: &mut Submission,
        request: &SubmitRequest,
        updates: &watch::Sender<Submission>,
        cancel: &CancellationToken,
    ) -> Result<(), AcquireError> {
        let body = serde_json::to_value(request)
            .map_err(|e| AcquireError::Protocol(format!("unencodable request: {}", e)))?;
        let token = request
            .bearer_token()
            .or(self.settings.default_token.as_deref());
        let path = self.settings.endpoints.submit_path(request.is_graded());

        let reply = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AcquireError::Cancelled),
            reply = self.http.post_json(path, &body, token) => reply?,
        };
        debug!(local_id = %submission.local_id(), status = reply.status, "Submission reply");

        let acquisition = Acquisition::from_reply(&reply, self.settings.unhinted_accept)?;
        self.drive(submission, acquisition, token, updates, cancel)
            .await
    }

    async fn drive(
        &self,
        submission: &mut Submission,
        acquisition: Acquisition,
        token: Option<&str>,
        updates: &watch::Sender<Submission>,
        cancel: &CancellationToken,
    ) -> Result<(), AcquireError> {
        submission.begin(
            acquisition.mode(),
            acquisition.request_id().map(str::to_string),
        );
        info!(
            local_id = %submission.local_id(),
            mode = %acquisition.mode(),
            request_id = acquisition.request_id().unwrap_or("-"),
            "Acquiring results"
        );
        updates.send_replace(submission.clone());

        match acquisition {
            Acquisition::Sync(body) => {
                let (cases, all_passed) = body.into_parts();
                submission.finalize(Some(cases), all_passed);
                Ok(())
            }
            Acquisition::Poll { request_id } => {
                self.poll(submission, &request_id, token, cancel).await
            }
            Acquisition::Stream { request_id } => {
                self.stream(submission, &request_id, updates, cancel).await
            }
        }
    }

    async fn poll(
        &self,
        submission: &mut Submission,
        request_id: &str,
        token: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<(), AcquireError> {
        let path = self.settings.endpoints.result_path(request_id);
        let mut attempts: u64 = 0;

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(AcquireError::Cancelled),
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
            }

            attempts += 1;
            let reply = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(AcquireError::Cancelled),
                reply = self.http.get(&path, token) => reply?,
            };

            match reply.status {
                202 => {
                    debug!(request_id, attempts, "Still pending");
                }
                200 => {
                    let (cases, all_passed) = decode_result_body(&reply)?.into_parts();
                    info!(request_id, attempts, cases = cases.len(), "Result ready");
                    submission.finalize(Some(cases), all_passed);
                    return Ok(());
                }
                status => return Err(backend_error(status, &reply.body)),
            }
        }
    }

    async fn stream(
        &self,
        submission: &mut Submission,
        request_id: &str,
        updates: &watch::Sender<Submission>,
        cancel: &CancellationToken,
    ) -> Result<(), AcquireError> {
        let path = self.settings.endpoints.progress_path(request_id);
        let mut channel = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AcquireError::Cancelled),
            opened = self.streams.open(&path) => opened?,
        };

        let result = consume(submission, channel.as_mut(), updates, cancel).await;
        channel.close().await;
        debug!(request_id, "Progress stream closed");
        result
    }
}

async fn consume(
    submission: &mut Submission,
    channel: &mut dyn MessageStream,
    updates: &watch::Sender<Submission>,
    cancel: &CancellationToken,
) -> Result<(), AcquireError> {
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AcquireError::Cancelled),
            next = channel.next_text() => next,
        };

        let text = match next {
            Some(Ok(text)) => text,
            Some(Err(e)) => return Err(e.into()),
            None => {
                return Err(TransportError::Stream(
                    "stream closed before the final result".to_string(),
                )
                .into())
            }
        };

        let message: StreamMessage = serde_json::from_str(&text)
            .map_err(|e| AcquireError::Protocol(format!("undecodable stream message: {}", e)))?;

        match message {
            StreamMessage::Progress {
                index,
                result,
                total,
            } => {
                submission.record_progress(index, result.into_report(index), total);
                debug!(
                    local_id = %submission.local_id(),
                    index,
                    progress = %submission.progress(),
                    "Case progress"
                );
                updates.send_replace(submission.clone());
            }
            StreamMessage::Final {
                results,
                all_passed,
                error,
                detail,
            } => {
                if let Some(message) = (ErrorBody { error, detail }).message() {
                    return Err(AcquireError::backend(None, message));
                }

                let (cases, body_all_passed) = match results {
                    Some(body) => {
                        let (cases, flag) = body.into_parts();
                        (Some(cases), flag)
                    }
                    None => (None, None),
                };
                submission.finalize(cases, all_passed.or(body_all_passed));
                return Ok(());
            }
        }
    }
}

fn conclude(
    mut submission: Submission,
    result: Result<(), AcquireError>,
    updates: &watch::Sender<Submission>,
) -> Outcome {
    match result {
        Ok(()) => {
            info!(
                local_id = %submission.local_id(),
                cases = submission.cases().count(),
                all_passed = ?submission.all_passed(),
                "Submission finalized"
            );
            updates.send_replace(submission.clone());
            Ok(submission)
        }
        Err(error) => {
            submission.fail();
            if error == AcquireError::Cancelled {
                info!(local_id = %submission.local_id(), "Submission cancelled");
            } else {
                warn!(
                    local_id = %submission.local_id(),
                    error = %error,
                    partial_cases = submission.cases().count(),
                    "Submission failed"
                );
            }
            updates.send_replace(submission.clone());
            Err(SubmissionFailure {
                error,
                partial: Box::new(submission),
            })
        }
    }
}
