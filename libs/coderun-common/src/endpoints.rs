use serde::{Deserialize, Serialize};

/// Backend path semantics - defines only naming, not transport logic
/// Keeps the submit, poll and progress paths of one backend in one place

pub const REQUEST_ID_PLACEHOLDER: &str = "{requestId}";

pub const DEFAULT_SUBMIT_PATH: &str = "/execute";
pub const DEFAULT_GRADED_PATH: &str = "/execute_v3";
pub const DEFAULT_RESULT_PATH: &str = "/result/{requestId}";
pub const DEFAULT_PROGRESS_PATH: &str = "/ws/progress/{requestId}";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// Plain runs
    pub submit: String,
    /// Problem-based (graded) runs
    pub graded: String,
    /// Poll target, keyed by request id
    pub result: String,
    /// Message stream, keyed by request id
    pub progress: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            submit: DEFAULT_SUBMIT_PATH.to_string(),
            graded: DEFAULT_GRADED_PATH.to_string(),
            result: DEFAULT_RESULT_PATH.to_string(),
            progress: DEFAULT_PROGRESS_PATH.to_string(),
        }
    }
}

impl Endpoints {
    /// Submission path for a plain or graded run
    pub fn submit_path(&self, graded: bool) -> &str {
        if graded {
            &self.graded
        } else {
            &self.submit
        }
    }

    /// Generate the poll path for a request
    pub fn result_path(&self, request_id: &str) -> String {
        fill_request_id(&self.result, request_id)
    }

    /// Generate the progress stream path for a request
    pub fn progress_path(&self, request_id: &str) -> String {
        fill_request_id(&self.progress, request_id)
    }
}

/// Templates without a placeholder get the id appended as a path segment
fn fill_request_id(template: &str, request_id: &str) -> String {
    if template.contains(REQUEST_ID_PLACEHOLDER) {
        template.replace(REQUEST_ID_PLACEHOLDER, request_id)
    } else {
        format!("{}/{}", template.trim_end_matches('/'), request_id)
    }
}

/// Join an origin and a path without doubling or dropping the slash
pub fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Same origin with the HTTP scheme replaced by its message-stream scheme
pub fn stream_url(base: &str, path: &str) -> String {
    let url = join_url(base, path);
    if let Some(rest) = url.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = url.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        let endpoints = Endpoints::default();
        assert_eq!(endpoints.submit_path(false), "/execute");
        assert_eq!(endpoints.submit_path(true), "/execute_v3");
        assert_eq!(endpoints.result_path("abc"), "/result/abc");
        assert_eq!(endpoints.progress_path("abc"), "/ws/progress/abc");
    }

    #[test]
    fn test_paths_deterministic() {
        let endpoints = Endpoints::default();
        assert_eq!(endpoints.result_path("r-1"), endpoints.result_path("r-1"));
    }

    #[test]
    fn test_template_without_placeholder() {
        let endpoints = Endpoints {
            result: "/jobs/".to_string(),
            ..Default::default()
        };
        assert_eq!(endpoints.result_path("abc"), "/jobs/abc");
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://h:8000/", "/execute"), "http://h:8000/execute");
        assert_eq!(join_url("http://h:8000", "execute"), "http://h:8000/execute");
    }

    #[test]
    fn test_stream_url_scheme() {
        assert_eq!(
            stream_url("http://localhost:8000", "/ws/progress/abc"),
            "ws://localhost:8000/ws/progress/abc"
        );
        assert_eq!(
            stream_url("https://judge.example.com/", "/ws/progress/abc"),
            "wss://judge.example.com/ws/progress/abc"
        );
    }
}
