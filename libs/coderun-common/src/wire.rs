// JSON shapes exchanged with the execution backend
// Field names follow the backend (camelCase); values are converted into
// the domain types from `types` at the edge.

use crate::types::{CaseReport, CaseStatus, ExecutionResult, JudgedCase, Visibility};
use serde::{Deserialize, Deserializer, Serialize};

/// POST body of a submission
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub language: String,
    pub code: String,
    /// Single-input form understood by the plain `/execute` backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdins: Option<Vec<String>>,
    /// Milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_limit: Option<u64>,
    /// Megabytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problem_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl SubmitRequest {
    pub fn new(language: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            code: code.into(),
            ..Default::default()
        }
    }

    /// Set the case inputs; a single case also goes out as `stdin`
    pub fn with_stdins(mut self, stdins: Vec<String>) -> Self {
        self.stdin = match stdins.as_slice() {
            [only] => Some(only.clone()),
            _ => None,
        };
        self.stdins = Some(stdins);
        self
    }

    /// Number of cases the request asks for, if it lists them
    pub fn case_count(&self) -> Option<usize> {
        match (&self.stdins, &self.stdin) {
            (Some(stdins), _) => Some(stdins.len()),
            (None, Some(_)) => Some(1),
            (None, None) => None,
        }
    }

    /// Problem-based submissions are graded by the backend
    pub fn is_graded(&self) -> bool {
        self.problem_id.as_deref().is_some_and(|id| !id.is_empty())
    }

    /// Token to send as `Authorization: Bearer`, if any
    pub fn bearer_token(&self) -> Option<&str> {
        self.token.as_deref().filter(|token| !token.is_empty())
    }
}

/// Per-case result as it travels on the wire
///
/// Ungraded runs carry only the execution fields; graded runs add
/// `id`, `visibility`, `status` and `passed` on the same object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseWire {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "de_case_id"
    )]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CaseStatus>,
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    pub exit_code: i32,
    /// Milliseconds
    pub duration: f64,
    /// Kilobytes
    #[serde(default, deserialize_with = "de_kilobytes")]
    pub memory_used: u64,
    pub timed_out: bool,
    /// Informational only; `status` decides whether a case passed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passed: Option<bool>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCaseId {
    Text(String),
    Number(serde_json::Number),
}

fn de_case_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<RawCaseId>::deserialize(deserializer)?.map(|raw| match raw {
        RawCaseId::Text(text) => text,
        RawCaseId::Number(number) => number.to_string(),
    }))
}

fn de_kilobytes<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    Ok(if value.is_finite() && value > 0.0 {
        value.round() as u64
    } else {
        0
    })
}

impl CaseWire {
    /// Convert into a domain report placed at `index`
    ///
    /// A case is treated as graded when the backend sent a `status`.
    /// Missing ids fall back to the 1-based position.
    pub fn into_report(self, index: usize) -> CaseReport {
        let result = ExecutionResult {
            case_index: index,
            stdout: self.stdout,
            stderr: self.stderr,
            exit_code: self.exit_code,
            duration_ms: self.duration.max(0.0),
            memory_used_kb: self.memory_used,
            timed_out: self.timed_out,
        };

        match self.status {
            Some(status) => CaseReport::Judged(JudgedCase {
                result,
                id: self.id.unwrap_or_else(|| (index + 1).to_string()),
                visibility: self.visibility.unwrap_or(Visibility::Visible),
                status,
            }),
            None => CaseReport::Plain(result),
        }
    }
}

impl From<&CaseReport> for CaseWire {
    fn from(report: &CaseReport) -> Self {
        let result = report.result();
        let judged = report.judged();
        CaseWire {
            id: judged.map(|j| j.id.clone()),
            visibility: judged.map(|j| j.visibility),
            status: judged.map(|j| j.status.clone()),
            stdout: result.stdout.clone(),
            stderr: result.stderr.clone(),
            exit_code: result.exit_code,
            duration: result.duration_ms,
            memory_used: result.memory_used_kb,
            timed_out: result.timed_out,
            passed: judged.map(JudgedCase::passed),
        }
    }
}

/// Body of a completed submission (HTTP 200, or `results` of a final message)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultBody {
    Graded {
        results: Vec<CaseWire>,
        #[serde(rename = "allPassed", default, skip_serializing_if = "Option::is_none")]
        all_passed: Option<bool>,
    },
    Many(Vec<CaseWire>),
    Single(CaseWire),
}

impl ResultBody {
    /// Flatten into the ordered case list and the backend's pass flag
    pub fn into_parts(self) -> (Vec<CaseWire>, Option<bool>) {
        match self {
            ResultBody::Graded {
                results,
                all_passed,
            } => (results, all_passed),
            ResultBody::Many(results) => (results, None),
            ResultBody::Single(result) => (vec![result], None),
        }
    }
}

/// HTTP 202 body: the backend queued the submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Accepted {
    pub request_id: String,
    /// Progress will be pushed over the message stream
    #[serde(default)]
    pub stream: bool,
}

/// Messages pushed over the progress stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamMessage {
    Progress {
        index: usize,
        result: CaseWire,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        total: Option<usize>,
    },
    Final {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        results: Option<ResultBody>,
        #[serde(rename = "allPassed", default, skip_serializing_if = "Option::is_none")]
        all_passed: Option<bool>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<serde_json::Value>,
    },
}

/// Error payload; `error` and `detail` are interchangeable, `error` first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    pub fn message(&self) -> Option<String> {
        if let Some(error) = self.error.as_deref().filter(|e| !e.is_empty()) {
            return Some(error.to_string());
        }
        match &self.detail {
            Some(serde_json::Value::String(detail)) if !detail.is_empty() => Some(detail.clone()),
            Some(serde_json::Value::Null) | None => None,
            Some(serde_json::Value::String(_)) => None,
            Some(other) => Some(other.to_string()),
        }
    }

    /// Best-effort message from a raw error response body
    pub fn message_from(body: &str) -> Option<String> {
        serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|parsed| parsed.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_submit_request_omits_absent_fields() {
        let request = SubmitRequest::new("python", "print(1)");
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value, json!({ "language": "python", "code": "print(1)" }));
    }

    #[test]
    fn test_submit_request_camel_case() {
        let request = SubmitRequest {
            stdins: Some(vec!["1".to_string(), "2".to_string()]),
            time_limit: Some(2000),
            memory_limit: Some(256),
            problem_id: Some("p-7".to_string()),
            token: Some("secret".to_string()),
            ..SubmitRequest::new("cpp", "int main(){}")
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["timeLimit"], 2000);
        assert_eq!(value["memoryLimit"], 256);
        assert_eq!(value["problemId"], "p-7");
        assert_eq!(value["stdins"], json!(["1", "2"]));
        assert!(request.is_graded());
        assert_eq!(request.bearer_token(), Some("secret"));
    }

    #[test]
    fn test_single_case_also_sent_as_stdin() {
        let request =
            SubmitRequest::new("python", "print(input())").with_stdins(vec!["5".to_string()]);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["stdin"], "5");
        assert_eq!(value["stdins"], json!(["5"]));
        assert_eq!(request.case_count(), Some(1));

        let request = SubmitRequest::new("python", "")
            .with_stdins(vec!["1".to_string(), "2".to_string()]);
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("stdin").is_none());
        assert_eq!(request.case_count(), Some(2));

        let legacy: SubmitRequest =
            serde_json::from_value(json!({ "language": "python", "code": "", "stdin": "7" })).unwrap();
        assert_eq!(legacy.case_count(), Some(1));
        assert_eq!(SubmitRequest::new("python", "").case_count(), None);
    }

    #[test]
    fn test_empty_token_is_not_sent_as_bearer() {
        let mut request = SubmitRequest::new("python", "");
        request.token = Some(String::new());
        assert_eq!(request.bearer_token(), None);
        request.problem_id = Some(String::new());
        assert!(!request.is_graded());
    }

    #[test]
    fn test_single_result_body() {
        let body: ResultBody = serde_json::from_value(json!({
            "stdout": "1\n", "stderr": "", "exitCode": 0,
            "duration": 12, "memoryUsed": 500, "timedOut": false
        }))
        .unwrap();
        let (cases, all_passed) = body.into_parts();
        assert_eq!(cases.len(), 1);
        assert_eq!(all_passed, None);

        let report = cases.into_iter().next().unwrap().into_report(0);
        let result = report.result();
        assert_eq!(result.stdout, "1\n");
        assert_eq!(result.duration_ms, 12.0);
        assert_eq!(result.memory_used_kb, 500);
        assert!(report.judged().is_none());
    }

    #[test]
    fn test_array_result_body() {
        let body: ResultBody = serde_json::from_value(json!([
            { "stdout": "a", "stderr": "", "exitCode": 0, "duration": 1.5, "memoryUsed": 10, "timedOut": false },
            { "stdout": "", "stderr": "killed", "exitCode": -9, "duration": 2000.0, "memoryUsed": 12.4, "timedOut": true }
        ]))
        .unwrap();
        let (cases, _) = body.into_parts();
        assert_eq!(cases.len(), 2);
        assert_eq!(cases[1].exit_code, -9);
        assert_eq!(cases[1].memory_used, 12);
        assert!(cases[1].timed_out);
    }

    #[test]
    fn test_graded_result_body() {
        let body: ResultBody = serde_json::from_value(json!({
            "results": [
                { "id": 1, "visibility": "visible", "status": "success", "stdout": "3", "stderr": "",
                  "exitCode": 0, "duration": 4, "memoryUsed": 300, "timedOut": false, "passed": true },
                { "id": "h2", "visibility": "hidden", "status": "wrong_output", "stdout": "4", "stderr": "",
                  "exitCode": 0, "duration": 4, "memoryUsed": 300, "timedOut": false, "passed": false }
            ],
            "allPassed": false
        }))
        .unwrap();
        let (cases, all_passed) = body.into_parts();
        assert_eq!(all_passed, Some(false));

        let first = cases[0].clone().into_report(0);
        let judged = first.judged().unwrap();
        assert_eq!(judged.id, "1");
        assert!(judged.passed());

        let second = cases[1].clone().into_report(1);
        let judged = second.judged().unwrap();
        assert_eq!(judged.id, "h2");
        assert_eq!(judged.visibility, Visibility::Hidden);
        assert_eq!(judged.status, CaseStatus::WrongOutput);
    }

    #[test]
    fn test_report_back_to_wire_keeps_fields() {
        let wire = CaseWire {
            id: Some("7".to_string()),
            visibility: Some(Visibility::Hidden),
            status: Some(CaseStatus::Timeout),
            stdout: String::new(),
            stderr: "time limit".to_string(),
            exit_code: -1,
            duration: 1000.0,
            memory_used: 2048,
            timed_out: true,
            passed: Some(false),
        };
        let report = wire.clone().into_report(4);
        assert_eq!(report.index(), 4);
        assert_eq!(CaseWire::from(&report), wire);
    }

    #[test]
    fn test_stream_progress_message() {
        let message: StreamMessage = serde_json::from_str(
            r#"{"type":"progress","index":1,"total":3,"result":{"stdout":"x","stderr":"","exitCode":0,"duration":3,"memoryUsed":1,"timedOut":false}}"#,
        )
        .unwrap();
        match message {
            StreamMessage::Progress { index, total, result } => {
                assert_eq!(index, 1);
                assert_eq!(total, Some(3));
                assert_eq!(result.stdout, "x");
            }
            other => panic!("Expected progress message, got: {:?}", other),
        }
    }

    #[test]
    fn test_stream_final_error_message() {
        let message: StreamMessage =
            serde_json::from_str(r#"{"type":"final","error":"judge crashed"}"#).unwrap();
        assert_eq!(
            message,
            StreamMessage::Final {
                results: None,
                all_passed: None,
                error: Some("judge crashed".to_string()),
                detail: None,
            }
        );
    }

    #[test]
    fn test_stream_final_validation_detail() {
        let message: StreamMessage =
            serde_json::from_str(r#"{"type":"final","detail":[{"msg":"bad"}]}"#).unwrap();
        let StreamMessage::Final { error, detail, .. } = message else {
            panic!("expected a final message");
        };
        let body = ErrorBody { error, detail };
        assert_eq!(body.message().as_deref(), Some(r#"[{"msg":"bad"}]"#));
    }

    #[test]
    fn test_stream_unknown_type_is_rejected() {
        assert!(serde_json::from_str::<StreamMessage>(r#"{"type":"heartbeat"}"#).is_err());
    }

    #[test]
    fn test_accepted_stream_hint() {
        let plain: Accepted = serde_json::from_str(r#"{"requestId":"abc"}"#).unwrap();
        assert!(!plain.stream);
        let hinted: Accepted =
            serde_json::from_str(r#"{"requestId":"abc","stream":true}"#).unwrap();
        assert!(hinted.stream);
    }

    #[test]
    fn test_error_body_prefers_error_over_detail() {
        assert_eq!(
            ErrorBody::message_from(r#"{"error":"bad language","detail":"ignored"}"#),
            Some("bad language".to_string())
        );
        assert_eq!(
            ErrorBody::message_from(r#"{"detail":"Not Found"}"#),
            Some("Not Found".to_string())
        );
        assert_eq!(
            ErrorBody::message_from(r#"{"detail":[{"loc":["body","code"]}]}"#),
            Some(r#"[{"loc":["body","code"]}]"#.to_string())
        );
        assert_eq!(ErrorBody::message_from("<html>502</html>"), None);
        assert_eq!(ErrorBody::message_from("{}"), None);
    }
}
