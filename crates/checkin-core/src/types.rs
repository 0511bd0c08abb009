use crate::{
    Result,
    constants::{MAX_CODE_LENGTH, MIN_CODE_LENGTH},
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Database identifier of an exam session.
pub type SessionId = i64;

/// Database identifier of a participant.
pub type ParticipantId = i64;

/// A scanned code (identity or artifact), normalized and validated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ScanCode(String);

impl ScanCode {
    /// Create a new scan code with validation.
    ///
    /// Surrounding whitespace is trimmed. Codes are kept case-sensitive since
    /// the scanner key table already produces uppercase letters.
    ///
    /// # Errors
    /// Returns `Error::InvalidCode` if:
    /// - The trimmed code is empty or longer than `MAX_CODE_LENGTH`
    /// - The code contains control or non-ASCII characters
    pub fn new(code: &str) -> Result<Self> {
        let code = code.trim();

        let len = code.len();
        if !(MIN_CODE_LENGTH..=MAX_CODE_LENGTH).contains(&len) {
            return Err(Error::InvalidCode(format!(
                "code must be {MIN_CODE_LENGTH}-{MAX_CODE_LENGTH} chars, got {len}"
            )));
        }

        if !code.chars().all(|c| c.is_ascii() && !c.is_ascii_control()) {
            return Err(Error::InvalidCode(
                "code must be printable ASCII".to_string(),
            ));
        }

        Ok(ScanCode(code.to_string()))
    }

    /// Get the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScanCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ScanCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ScanCode::new(s)
    }
}

impl TryFrom<String> for ScanCode {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        ScanCode::new(&value)
    }
}

impl From<ScanCode> for String {
    fn from(code: ScanCode) -> Self {
        code.0
    }
}

/// Kind of a submitted code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeKind {
    /// Participant identity code (ID card, student number).
    Identity,
    /// Document artifact code (exam booklet barcode).
    Artifact,
}

impl CodeKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            CodeKind::Identity => "identity",
            CodeKind::Artifact => "artifact",
        }
    }
}

impl fmt::Display for CodeKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CodeKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "identity" => Ok(CodeKind::Identity),
            "artifact" => Ok(CodeKind::Artifact),
            other => Err(Error::InvalidKind(other.to_string())),
        }
    }
}

/// Code kind the kiosk currently expects, as persisted in the Status Store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedKind {
    /// No session is accepting scans.
    #[default]
    None,
    Identity,
    Artifact,
}

impl ExpectedKind {
    /// The submission kind this expectation accepts, if any.
    #[must_use]
    pub fn as_code_kind(self) -> Option<CodeKind> {
        match self {
            ExpectedKind::None => None,
            ExpectedKind::Identity => Some(CodeKind::Identity),
            ExpectedKind::Artifact => Some(CodeKind::Artifact),
        }
    }

    /// Returns `true` if a submission of `kind` is acceptable right now.
    #[must_use]
    pub fn accepts(self, kind: CodeKind) -> bool {
        self.as_code_kind() == Some(kind)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ExpectedKind::None => "none",
            ExpectedKind::Identity => "identity",
            ExpectedKind::Artifact => "artifact",
        }
    }
}

impl fmt::Display for ExpectedKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<CodeKind> for ExpectedKind {
    fn from(kind: CodeKind) -> Self {
        match kind {
            CodeKind::Identity => ExpectedKind::Identity,
            CodeKind::Artifact => ExpectedKind::Artifact,
        }
    }
}

/// A completed scan handed to the engine.
///
/// `code` is the raw assembled text; the engine trims and validates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub code: String,
    pub kind: CodeKind,
    pub session_id: SessionId,
}

impl Submission {
    pub fn new(code: impl Into<String>, kind: CodeKind, session_id: SessionId) -> Self {
        Self {
            code: code.into(),
            kind,
            session_id,
        }
    }
}

/// Lifecycle status of an exam session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Pending,
    /// Session is accepting check-ins. At most one session may hold this status.
    AuthenticationActive,
    Finished,
}

impl SessionStatus {
    /// Text representation stored in the `sessions.status` column.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::AuthenticationActive => "authentication_active",
            SessionStatus::Finished => "finished",
        }
    }

    /// Returns `true` if the session is currently accepting check-ins.
    #[inline]
    #[must_use]
    pub fn is_active(self) -> bool {
        matches!(self, SessionStatus::AuthenticationActive)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SessionStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(SessionStatus::Pending),
            "authentication_active" => Ok(SessionStatus::AuthenticationActive),
            "finished" => Ok(SessionStatus::Finished),
            other => Err(Error::InvalidSessionStatus(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("S100", "S100")]
    #[case("  BK001\n", "BK001")]
    #[case("A-1/2.3", "A-1/2.3")]
    fn test_scan_code_normalizes(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(ScanCode::new(input).unwrap().as_str(), expected);
    }

    #[rstest]
    #[case("")]
    #[case("   ")]
    #[case("BK\u{7}01")]
    #[case("Ünïcode")]
    fn test_scan_code_rejects(#[case] input: &str) {
        assert!(matches!(ScanCode::new(input), Err(Error::InvalidCode(_))));
    }

    #[test]
    fn test_scan_code_length_limit() {
        let long = "9".repeat(MAX_CODE_LENGTH + 1);
        assert!(ScanCode::new(&long).is_err());
        assert!(ScanCode::new(&long[..MAX_CODE_LENGTH]).is_ok());
    }

    #[test]
    fn test_scan_code_serde_validates() {
        let code: ScanCode = serde_json::from_str("\" S100 \"").unwrap();
        assert_eq!(code.as_str(), "S100");
        assert!(serde_json::from_str::<ScanCode>("\"\"").is_err());
    }

    #[rstest]
    #[case(ExpectedKind::None, CodeKind::Identity, false)]
    #[case(ExpectedKind::None, CodeKind::Artifact, false)]
    #[case(ExpectedKind::Identity, CodeKind::Identity, true)]
    #[case(ExpectedKind::Identity, CodeKind::Artifact, false)]
    #[case(ExpectedKind::Artifact, CodeKind::Artifact, true)]
    #[case(ExpectedKind::Artifact, CodeKind::Identity, false)]
    fn test_expected_kind_accepts(
        #[case] expected: ExpectedKind,
        #[case] submitted: CodeKind,
        #[case] accepted: bool,
    ) {
        assert_eq!(expected.accepts(submitted), accepted);
    }

    #[test]
    fn test_kind_wire_format() {
        assert_eq!(
            serde_json::to_string(&ExpectedKind::None).unwrap(),
            "\"none\""
        );
        assert_eq!(
            serde_json::to_string(&CodeKind::Artifact).unwrap(),
            "\"artifact\""
        );
        assert_eq!("identity".parse::<CodeKind>().unwrap(), CodeKind::Identity);
        assert!("booklet".parse::<CodeKind>().is_err());
    }

    #[rstest]
    #[case(SessionStatus::Pending)]
    #[case(SessionStatus::AuthenticationActive)]
    #[case(SessionStatus::Finished)]
    fn test_session_status_text(#[case] status: SessionStatus) {
        assert_eq!(status.as_str().parse::<SessionStatus>().unwrap(), status);
    }

    #[test]
    fn test_session_status_is_active() {
        assert!(SessionStatus::AuthenticationActive.is_active());
        assert!(!SessionStatus::Pending.is_active());
        assert!(!SessionStatus::Finished.is_active());
    }
}
