mod builder;

use std::mem;
use std::time::Duration;

use thiserror::Error;
use toolbridge_model::{
    ContentPart, ModelMessage, ModelRequest, ModelTool, ToolCallRequest,
    ToolCallResult,
};
use tracing::Instrument;

use crate::conversation::{Conversation, Transcript, TranscriptSource};
use crate::model_client::{CompletionError, ModelClient};
use crate::session::{Session, SessionError, Tool};
pub use builder::OrchestratorBuilder;

/// Errors that end a query.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The session failed.
    #[error(transparent)]
    Session(#[from] SessionError),
    /// The completion service failed, after retrying.
    #[error(transparent)]
    Completion(#[from] CompletionError),
    /// The model kept requesting tools.
    #[error("the model was still calling tools after {rounds} round(s)")]
    TooManyRounds {
        /// The exhausted limit.
        rounds: usize,
    },
}

impl QueryError {
    /// Returns whether the session can't serve further queries.
    #[inline]
    pub fn is_fatal(&self) -> bool {
        match self {
            QueryError::Session(err) => err.is_fatal(),
            _ => false,
        }
    }
}

/// The outcome of a query.
#[derive(Clone, Debug)]
pub struct QueryOutput {
    /// What the user gets to see.
    pub transcript: Transcript,
    /// The full message history, ending with the final assistant message.
    pub conversation: Conversation,
}

/// Drives the conversation between the completion service and the tools
/// of a [`Session`].
///
/// Every round sends the history and the tools the session currently
/// advertises to the model. Tool uses in the reply are executed one by
/// one, in order, and each result is folded into the history before the
/// next call. A reply without tool uses ends the query.
#[derive(Clone)]
pub struct Orchestrator {
    model_client: ModelClient,
    tool_timeout: Duration,
    max_rounds: usize,
}

impl Orchestrator {
    /// Answers `query`, calling tools through `session` as the model
    /// requests them.
    ///
    /// Failures of single tool calls are reported back to the model as
    /// error results. Session failures that are fatal abort the query.
    pub async fn process_query(
        &self,
        session: &mut Session,
        query: &str,
    ) -> Result<QueryOutput, QueryError> {
        let mut conversation = Conversation::with_query(query);
        let mut transcript = Transcript::default();

        for round in 1..=self.max_rounds {
            let tools = session.list_tools().await?;
            let request = ModelRequest {
                messages: conversation.messages().to_vec(),
                tools: tools.iter().map(model_tool).collect(),
            };
            let turn = self
                .model_client
                .send_request(request)
                .instrument(debug_span!("completion", round))
                .await?;

            if !turn.has_tool_uses() {
                let text_parts: Vec<_> = turn
                    .parts
                    .into_iter()
                    .filter(|part| matches!(part, ContentPart::Text { .. }))
                    .collect();
                for part in &text_parts {
                    if let ContentPart::Text { text } = part {
                        transcript.push(TranscriptSource::Assistant, text);
                    }
                }
                conversation.push(ModelMessage::assistant(text_parts));
                debug!("query answered after {round} round(s)");
                return Ok(QueryOutput {
                    transcript,
                    conversation,
                });
            }

            let mut pending = vec![];
            for part in turn.parts {
                match part {
                    ContentPart::Text { text } => {
                        transcript.push(TranscriptSource::Assistant, &text);
                        pending.push(ContentPart::Text { text });
                    }
                    ContentPart::ToolUse(call) => {
                        pending.push(ContentPart::ToolUse(call.clone()));
                        conversation
                            .push(ModelMessage::assistant(mem::take(&mut pending)));
                        let result = self.call_tool(session, &call).await?;
                        conversation.push(ModelMessage::tool_result(result));
                        transcript.push(
                            TranscriptSource::Tool,
                            format!("invoking tool {} with {}", call.name, call.input),
                        );
                    }
                    ContentPart::ToolResult(_) => {
                        warn!("ignoring a tool result sent by the model");
                    }
                }
            }
            if !pending.is_empty() {
                // The next request must end with a tool result.
                debug!("dropping text after the last tool use from history");
            }
        }

        Err(QueryError::TooManyRounds {
            rounds: self.max_rounds,
        })
    }

    async fn call_tool(
        &self,
        session: &mut Session,
        call: &ToolCallRequest,
    ) -> Result<ToolCallResult, QueryError> {
        let outcome = session
            .call_tool(&call.name, call.input.clone(), self.tool_timeout)
            .instrument(debug_span!("tool call", name = %call.name))
            .await;
        let (content, is_error) = match outcome {
            Ok(result) => (result.text(), result.is_error),
            Err(err) if err.is_fatal() => return Err(err.into()),
            Err(err) => {
                warn!("tool `{}` failed: {err}", call.name);
                (err.to_string(), true)
            }
        };
        Ok(ToolCallResult {
            tool_use_id: call.id.clone(),
            content,
            is_error,
        })
    }
}

#[inline]
fn model_tool(tool: &Tool) -> ModelTool {
    ModelTool {
        name: tool.name.clone(),
        description: tool.description.clone(),
        input_schema: tool.input_schema.clone(),
    }
}
