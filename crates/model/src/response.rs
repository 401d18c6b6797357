use serde::{Deserialize, Serialize};

use crate::request::{ContentPart, ToolCallRequest};

/// One complete response of the completion service.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelTurn {
    /// Ordered content parts. Only `Text` and `ToolUse` parts are
    /// expected from a service.
    pub parts: Vec<ContentPart>,
}

impl ModelTurn {
    /// Creates a turn with the given parts.
    #[inline]
    pub fn with_parts(parts: impl Into<Vec<ContentPart>>) -> Self {
        Self {
            parts: parts.into(),
        }
    }

    /// Returns the tool call requests in this turn, in order.
    pub fn tool_uses(&self) -> impl Iterator<Item = &ToolCallRequest> {
        self.parts.iter().filter_map(|part| match part {
            ContentPart::ToolUse(req) => Some(req),
            _ => None,
        })
    }

    /// Returns whether this turn asks for any tool call.
    #[inline]
    pub fn has_tool_uses(&self) -> bool {
        self.tool_uses().next().is_some()
    }
}
