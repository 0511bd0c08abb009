use std::fmt;

use serde::{Deserialize, Serialize};

/// How a missing eligibility row is treated at the identity step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EligibilityPolicy {
    /// Log a warning and accept the participant.
    #[default]
    Advisory,
    /// Reject the participant with `Ineligible`.
    Enforce,
}

impl EligibilityPolicy {
    pub fn is_enforced(self) -> bool {
        matches!(self, EligibilityPolicy::Enforce)
    }
}

impl fmt::Display for EligibilityPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EligibilityPolicy::Advisory => f.write_str("advisory"),
            EligibilityPolicy::Enforce => f.write_str("enforce"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_advisory() {
        assert_eq!(EligibilityPolicy::default(), EligibilityPolicy::Advisory);
        assert!(!EligibilityPolicy::default().is_enforced());
    }

    #[test]
    fn test_config_spelling() {
        let policy: EligibilityPolicy = serde_json::from_str("\"enforce\"").unwrap();
        assert!(policy.is_enforced());
        assert_eq!(policy.to_string(), "enforce");
    }
}
