use serde::{Deserialize, Serialize};

/// Terminal status of one action attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCode {
    Success,
    Failed,
    Skipped,
    /// Instructions were handed to a human; nothing automated happened.
    Manual,
}

impl StatusCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCode::Success => "success",
            StatusCode::Failed => "failed",
            StatusCode::Skipped => "skipped",
            StatusCode::Manual => "manual",
        }
    }
}

impl std::fmt::Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one execution attempt.
///
/// `skipped_reason` is always set for `Skipped` and `Manual`; failures carry
/// it too when the cause is known before anything ran.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    pub status_code: StatusCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skipped_reason: Option<String>,
}

impl ActionResult {
    pub fn success(output: Option<String>) -> Self {
        Self {
            status_code: StatusCode::Success,
            output,
            skipped_reason: None,
        }
    }

    pub fn failed(reason: impl Into<String>, output: Option<String>) -> Self {
        Self {
            status_code: StatusCode::Failed,
            output,
            skipped_reason: Some(reason.into()),
        }
    }

    /// A failure discovered while running, described only by its output.
    pub fn failed_with_output(output: impl Into<String>) -> Self {
        Self {
            status_code: StatusCode::Failed,
            output: Some(output.into()),
            skipped_reason: None,
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            status_code: StatusCode::Skipped,
            output: None,
            skipped_reason: Some(reason.into()),
        }
    }

    pub fn manual(instructions: impl Into<String>) -> Self {
        Self {
            status_code: StatusCode::Manual,
            output: Some(instructions.into()),
            skipped_reason: Some("manual action: follow the instructions".to_string()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.status_code == StatusCode::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_code_json_is_snake_case() {
        let json = serde_json::to_string(&ActionResult::manual("do X")).unwrap();
        assert!(json.contains("\"statusCode\":\"manual\""));
        assert!(json.contains("\"skippedReason\""));
    }

    #[test]
    fn skipped_and_manual_always_carry_a_reason() {
        assert!(ActionResult::skipped("earlier action failed")
            .skipped_reason
            .is_some());
        let manual = ActionResult::manual("do X");
        assert_eq!(manual.output.as_deref(), Some("do X"));
        assert!(manual.skipped_reason.is_some());
    }

    #[test]
    fn success_omits_empty_fields() {
        let json = serde_json::to_string(&ActionResult::success(None)).unwrap();
        assert_eq!(json, r#"{"statusCode":"success"}"#);
    }
}
