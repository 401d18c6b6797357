use std::error::Error as StdError;
use std::fmt::{self, Display};

use toolbridge_protocol::CallToolResult;

/// Why a tool call failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ToolErrorKind {
    /// The arguments don't deserialize into the tool's arguments type.
    InvalidArguments,
    /// The tool ran and could not do its job.
    Failed,
}

/// A failed tool call.
///
/// Failures stay inside the `tools/call` result: the client gets a
/// result with `isError` set and the message as its only text item, so
/// the model can read it. Protocol errors are reserved for calls that
/// name no known tool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolError {
    kind: ToolErrorKind,
    message: String,
}

impl ToolError {
    /// The call's arguments are unusable.
    #[inline]
    pub fn invalid_arguments<S: Into<String>>(message: S) -> Self {
        Self {
            kind: ToolErrorKind::InvalidArguments,
            message: message.into(),
        }
    }

    /// The tool failed while running.
    #[inline]
    pub fn failed<S: Into<String>>(message: S) -> Self {
        Self {
            kind: ToolErrorKind::Failed,
            message: message.into(),
        }
    }

    /// Returns why the call failed.
    #[inline]
    pub fn kind(&self) -> ToolErrorKind {
        self.kind
    }

    /// Returns the message without the kind.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for ToolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ToolErrorKind::InvalidArguments => {
                write!(f, "Invalid arguments: {}", self.message)
            }
            ToolErrorKind::Failed => f.write_str(&self.message),
        }
    }
}

impl StdError for ToolError {}

impl From<ToolError> for CallToolResult {
    #[inline]
    fn from(err: ToolError) -> Self {
        CallToolResult::error(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use toolbridge_protocol::Content;

    use super::*;

    #[test]
    fn test_into_call_result() {
        let result: CallToolResult =
            ToolError::invalid_arguments("missing field `url`").into();
        assert!(result.is_error);
        assert_eq!(
            result.content,
            vec![Content::text("Invalid arguments: missing field `url`")]
        );

        let err = ToolError::failed("connection refused");
        assert_eq!(err.kind(), ToolErrorKind::Failed);
        let result = CallToolResult::from(err);
        assert_eq!(result.render_text(), "connection refused");
    }
}
