use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A request to be sent to the completion service.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ModelRequest {
    /// The conversation history, oldest first.
    pub messages: Vec<ModelMessage>,
    /// Tools that are available to the model.
    pub tools: Vec<ModelTool>,
}

/// Who authored a message.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The user, which also carries tool results back to the model.
    User,
    /// The model.
    Assistant,
}

/// A complete message in the conversation history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelMessage {
    /// The author of the message.
    pub role: Role,
    /// Ordered content parts.
    pub content: Vec<ContentPart>,
}

impl ModelMessage {
    /// Creates a user message with a single text part.
    #[inline]
    pub fn user_text<S: Into<String>>(text: S) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentPart::text(text)],
        }
    }

    /// Creates an assistant message with the given parts.
    #[inline]
    pub fn assistant(content: Vec<ContentPart>) -> Self {
        Self {
            role: Role::Assistant,
            content,
        }
    }

    /// Creates a user message carrying a single tool result.
    #[inline]
    pub fn tool_result(result: ToolCallResult) -> Self {
        Self {
            role: Role::User,
            content: vec![ContentPart::ToolResult(result)],
        }
    }
}

/// A part of a message. The set of variants is closed, and consumers
/// are expected to match on all of them.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Text from the user or the model.
    Text {
        /// The text.
        text: String,
    },
    /// The model asks for a tool to be called.
    ToolUse(ToolCallRequest),
    /// The outcome of a tool call.
    ToolResult(ToolCallResult),
}

impl ContentPart {
    /// Creates a text part.
    #[inline]
    pub fn text<S: Into<String>>(text: S) -> Self {
        ContentPart::Text { text: text.into() }
    }
}

/// Describes a tool call request from the model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// The unique identifier for the tool call request.
    pub id: String,
    /// The name of the tool to call.
    pub name: String,
    /// The arguments to pass to the tool, usually an object.
    pub input: Value,
}

/// The result of calling a tool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCallResult {
    /// The identifier of the tool call request this result answers.
    pub tool_use_id: String,
    /// The result of the tool call.
    pub content: String,
    /// Whether the call failed.
    #[serde(default)]
    pub is_error: bool,
}

/// Describes a tool that can be used by the model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelTool {
    /// Name of the tool.
    pub name: String,
    /// Description of the tool.
    pub description: String,
    /// Parameters definition of the tool.
    ///
    /// For most model providers, the parameters should typically be
    /// defined by a [JSON schema](https://json-schema.org/).
    pub input_schema: Value,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_part_wire_format() {
        let msg = ModelMessage::assistant(vec![
            ContentPart::text("Let me check."),
            ContentPart::ToolUse(ToolCallRequest {
                id: "toolu_1".to_owned(),
                name: "get_healthcheck".to_owned(),
                input: json!({}),
            }),
        ]);
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "role": "assistant",
                "content": [
                    { "type": "text", "text": "Let me check." },
                    {
                        "type": "tool_use",
                        "id": "toolu_1",
                        "name": "get_healthcheck",
                        "input": {}
                    }
                ]
            })
        );

        let msg = ModelMessage::tool_result(ToolCallResult {
            tool_use_id: "toolu_1".to_owned(),
            content: "{\"status\":\"ok\"}".to_owned(),
            is_error: false,
        });
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({
                "role": "user",
                "content": [{
                    "type": "tool_result",
                    "tool_use_id": "toolu_1",
                    "content": "{\"status\":\"ok\"}",
                    "is_error": false
                }]
            })
        );
    }
}
