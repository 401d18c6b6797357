use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use serde_json::json;
use tokio::time::sleep;
use toolbridge_model::{
    ContentPart, ErrorKind, ModelMessage, ModelProvider, ModelProviderError,
    ModelRequest, ModelTool, ModelTurn, Role, ToolCallRequest,
};

#[derive(Debug)]
struct FakeModelProviderError(ErrorKind);

impl Display for FakeModelProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Error for FakeModelProviderError {}

impl ModelProviderError for FakeModelProviderError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

/// Echoes the first user message, and asks for the first advertised
/// tool when the user says "tool".
struct FakeModelProvider;

impl ModelProvider for FakeModelProvider {
    type Error = FakeModelProviderError;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<ModelTurn, Self::Error>> + Send + 'static
    {
        let result = 'blk: {
            let Some(first) = req.messages.first() else {
                break 'blk Err(FakeModelProviderError(ErrorKind::Rejected));
            };
            let text = match first.content.first() {
                Some(ContentPart::Text { text }) => text.clone(),
                _ => unreachable!("unexpected message: {first:?}"),
            };

            if text == "tool" {
                let Some(tool) = req.tools.first() else {
                    break 'blk Err(FakeModelProviderError(
                        ErrorKind::InvalidResponse,
                    ));
                };
                break 'blk Ok(ModelTurn::with_parts([ContentPart::ToolUse(
                    ToolCallRequest {
                        id: "call:0".to_owned(),
                        name: tool.name.clone(),
                        input: json!({}),
                    },
                )]));
            }

            Ok(ModelTurn::with_parts([ContentPart::text(format!(
                "You said {text}"
            ))]))
        };

        async move {
            sleep(Duration::from_millis(1)).await;
            result
        }
    }
}

mod tests {
    use super::*;

    #[tokio::test]
    async fn test_completion() {
        let provider = FakeModelProvider;
        let req = ModelRequest {
            messages: vec![ModelMessage::user_text("Good morning")],
            tools: vec![],
        };
        let turn = provider.send_request(&req).await.unwrap();

        assert!(!turn.has_tool_uses());
        assert_eq!(turn.parts, vec![ContentPart::text("You said Good morning")]);
    }

    #[tokio::test]
    async fn test_tool_use() {
        let provider = FakeModelProvider;
        let req = ModelRequest {
            messages: vec![ModelMessage::user_text("tool")],
            tools: vec![ModelTool {
                name: "get_healthcheck".to_owned(),
                description: "Get the health status of the web server."
                    .to_owned(),
                input_schema: json!({ "type": "object" }),
            }],
        };
        let turn = provider.send_request(&req).await.unwrap();

        let tool_uses: Vec<_> = turn.tool_uses().collect();
        assert_eq!(tool_uses.len(), 1);
        assert_eq!(tool_uses[0].name, "get_healthcheck");
        assert_eq!(req.messages[0].role, Role::User);
    }

    #[tokio::test]
    async fn test_error() {
        let provider = FakeModelProvider;
        let req = ModelRequest::default();
        let result = provider.send_request(&req).await;
        let err = result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Rejected);
        assert!(!err.kind().is_transient());
    }
}
