//! Control-plane wire format.
//!
//! One JSON object per line in each direction. Requests are tagged by `op`:
//!
//! ```text
//! {"op":"submit","code":"S100","kind":"identity","session_id":1}
//! {"op":"activate","session_id":1}
//! {"op":"deactivate","session_id":1}
//! {"op":"status"}
//! ```
//!
//! Every request gets exactly one [`ControlResponse`].

use checkin_core::{ErrorKind, ScanStatus, SessionId, Submission};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ControlRequest {
    /// A completed scan from the listener.
    Submit(Submission),
    /// Arm a session for check-ins.
    Activate { session_id: SessionId },
    /// Close a session for check-ins.
    Deactivate { session_id: SessionId },
    /// Current Status Store record.
    Status,
}

impl ControlRequest {
    /// Operation name, for logging.
    pub fn op(&self) -> &'static str {
        match self {
            ControlRequest::Submit(_) => "submit",
            ControlRequest::Activate { .. } => "activate",
            ControlRequest::Deactivate { .. } => "deactivate",
            ControlRequest::Status => "status",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlResponse {
    pub success: bool,
    pub message: String,
    pub error: Option<ErrorKind>,
    pub status: Option<ScanStatus>,
}

impl ControlResponse {
    pub fn ok(message: impl Into<String>, status: Option<ScanStatus>) -> Self {
        Self {
            success: true,
            message: message.into(),
            error: None,
            status,
        }
    }

    pub fn failure(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            error: Some(kind),
            status: None,
        }
    }

    pub fn with_status(mut self, status: ScanStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::failure(ErrorKind::InvalidRequest, message)
    }

    pub fn forbidden() -> Self {
        Self::failure(
            ErrorKind::Forbidden,
            "control plane only accepts local connections",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use checkin_core::CodeKind;
    use rstest::rstest;

    #[rstest]
    #[case(
        r#"{"op":"submit","code":"S100","kind":"identity","session_id":1}"#,
        ControlRequest::Submit(Submission::new("S100", CodeKind::Identity, 1))
    )]
    #[case(r#"{"op":"activate","session_id":7}"#, ControlRequest::Activate { session_id: 7 })]
    #[case(r#"{"op":"deactivate","session_id":7}"#, ControlRequest::Deactivate { session_id: 7 })]
    #[case(r#"{"op":"status"}"#, ControlRequest::Status)]
    fn test_request_wire_format(#[case] line: &str, #[case] expected: ControlRequest) {
        let request: ControlRequest = serde_json::from_str(line).unwrap();
        assert_eq!(request, expected);
    }

    #[rstest]
    #[case(r#"{"op":"launch"}"#)]
    #[case(r#"{"op":"submit","code":"S100","kind":"passport","session_id":1}"#)]
    #[case(r#"{"op":"activate"}"#)]
    #[case("not json")]
    fn test_malformed_requests_rejected(#[case] line: &str) {
        assert!(serde_json::from_str::<ControlRequest>(line).is_err());
    }

    #[test]
    fn test_failure_response_shape() {
        let json = serde_json::to_value(ControlResponse::failure(
            ErrorKind::Duplicate,
            "BK001 already recorded",
        ))
        .unwrap();

        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "duplicate");
        assert!(json["status"].is_null());
    }

    #[test]
    fn test_ok_response_carries_status() {
        let response = ControlResponse::ok("activated", Some(ScanStatus::awaiting_identity(1, "Art")));
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["success"], true);
        assert!(json["error"].is_null());
        assert_eq!(json["status"]["expected_kind"], "identity");
    }
}
