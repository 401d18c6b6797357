use serde::{Deserialize, Serialize};
use toolbridge_model::ContentPart;

/// The preset response for an assistant step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetResponse {
    /// Parts of the turn.
    pub parts: Vec<ContentPart>,
    /// If set, the request will fail in the first `failure` attempts.
    /// `Some(0)` means the request will fail infinitely.
    pub failures: Option<u64>,
}

impl PresetResponse {
    /// Creates a `PresetResponse` with the specified parts.
    #[inline]
    pub fn with_parts(parts: impl Into<Vec<ContentPart>>) -> Self {
        Self {
            parts: parts.into(),
            failures: None,
        }
    }

    /// Sets failure times before a successful response. `0` means the
    /// response will always be a failure.
    #[inline]
    pub fn with_failures(mut self, failures: u64) -> Self {
        self.failures = Some(failures);
        self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use toolbridge_model::ToolCallRequest;

    use super::*;

    #[test]
    fn test_serialize_deserialize() {
        let response = PresetResponse::with_parts([
            ContentPart::text("Let me check the server for you."),
            ContentPart::ToolUse(ToolCallRequest {
                id: "1".to_string(),
                name: "get_healthcheck".to_string(),
                input: json!({}),
            }),
        ])
        .with_failures(2);

        let serialized = serde_json::to_string(&response).unwrap();
        let deserialized: PresetResponse =
            serde_json::from_str(&serialized).unwrap();

        assert_eq!(response, deserialized);
    }
}
