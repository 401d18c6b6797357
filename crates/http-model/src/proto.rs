use serde::{Deserialize, Serialize};
use serde_json::Value;
use toolbridge_model::{
    ContentPart, ModelMessage, ModelRequest, ModelTool, ModelTurn,
    ToolCallRequest,
};

use crate::HttpModelConfig;

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ChatCompletion {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub content: Option<MessageContent>,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Parts(Vec<ResponsePart>),
    Text(String),
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponsePart {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(other)]
    Unsupported,
}

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatCompletionRequest {
    model: String,
    messages: Vec<ModelMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<ModelTool>,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
}

// -----------
// Conversions
// -----------

#[inline]
pub fn create_request(
    req: &ModelRequest,
    config: &HttpModelConfig,
) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: config.model.clone(),
        messages: req.messages.clone(),
        tools: req.tools.clone(),
        max_tokens: config.max_tokens,
        temperature: config.temperature,
        top_p: config.top_p,
    }
}

/// Extracts the turn from the first choice, or `None` if the service
/// returned no choice at all.
pub fn into_turn(completion: ChatCompletion) -> Option<ModelTurn> {
    let choice = completion.choices.into_iter().next()?;
    let parts = match choice.message.content {
        None => vec![],
        Some(MessageContent::Text(text)) => vec![ContentPart::Text { text }],
        Some(MessageContent::Parts(parts)) => parts
            .into_iter()
            .filter_map(|part| match part {
                ResponsePart::Text { text } => Some(ContentPart::Text { text }),
                ResponsePart::ToolUse { id, name, input } => {
                    let input = if input.is_null() {
                        Value::Object(Default::default())
                    } else {
                        input
                    };
                    Some(ContentPart::ToolUse(ToolCallRequest {
                        id,
                        name,
                        input,
                    }))
                }
                ResponsePart::Unsupported => {
                    debug!("skipping an unsupported content part");
                    None
                }
            })
            .collect(),
    };
    Some(ModelTurn { parts })
}
