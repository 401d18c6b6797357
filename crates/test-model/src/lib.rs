//! A local fake completion service for testing purpose.

mod preset;

use std::collections::HashMap;
use std::error::Error as StdError;
use std::fmt::{self, Debug, Display, Formatter};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::sleep;
use toolbridge_model::{
    ErrorKind, ModelProvider, ModelProviderError, ModelRequest, ModelTurn,
};

pub use preset::*;

#[derive(Debug)]
pub struct Error {
    message: &'static str,
    kind: ErrorKind,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:?})", self.message, self.kind)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

#[derive(Clone)]
enum ConversationStep {
    UserInput,
    AssistantResponse(PresetResponse),
}

#[derive(Default)]
struct SharedState {
    attempts: HashMap<usize, u64>,
    requests: Vec<ModelRequest>,
}

/// A local fake completion service for testing purpose.
///
/// Before sending requests, you need to setup the conversation script, which
/// is how the model should respond to a request. The added steps will be
/// selected according to the number of history messages in your request,
/// so every message the caller appends by itself (the user query, tool
/// results, assistant messages echoing earlier turns) needs a user step
/// as its placeholder. If there are no enough steps in the script, an error
/// will be returned.
///
/// Clones share the recorded requests and failure counters.
///
/// # Note
///
/// This type is not optimized for production use, there are heavy memory
/// copies involved. You should only use it for testing.
#[derive(Clone, Default)]
pub struct TestModelProvider {
    conversation_script: Vec<ConversationStep>,
    delay: Option<Duration>,
    shared: Arc<Mutex<SharedState>>,
}

impl TestModelProvider {
    #[inline]
    pub fn add_assistant_turn(&mut self, preset: PresetResponse) {
        self.conversation_script
            .push(ConversationStep::AssistantResponse(preset));
    }

    #[inline]
    pub fn add_user_turn(&mut self) {
        self.conversation_script.push(ConversationStep::UserInput);
    }

    #[inline]
    pub fn set_delay(&mut self, duration: Duration) {
        self.delay = Some(duration);
    }

    /// Returns every request received so far, including failed attempts.
    pub fn recorded_requests(&self) -> Vec<ModelRequest> {
        self.shared
            .lock()
            .map(|shared| shared.requests.clone())
            .unwrap_or_default()
    }

    fn respond(&self, req: &ModelRequest) -> Result<ModelTurn, Error> {
        let mut shared = self.shared.lock().map_err(|_| Error {
            message: "state is poisoned",
            kind: ErrorKind::Other,
        })?;
        shared.requests.push(req.clone());

        let step_idx = req.messages.len();
        let Some(step) = self.conversation_script.get(step_idx) else {
            return Err(Error {
                message: "no enough steps",
                kind: ErrorKind::Rejected,
            });
        };
        let preset = match step {
            ConversationStep::UserInput => {
                return Err(Error {
                    message: "not an assistant response step",
                    kind: ErrorKind::Moderated,
                });
            }
            ConversationStep::AssistantResponse(preset) => preset,
        };

        let attempts = shared.attempts.entry(step_idx).or_default();
        *attempts += 1;
        let should_fail = match preset.failures {
            Some(0) => true,
            Some(failures) => *attempts <= failures,
            None => false,
        };
        if should_fail {
            return Err(Error {
                message: "preset failure",
                kind: ErrorKind::Unavailable,
            });
        }

        Ok(ModelTurn::with_parts(preset.parts.clone()))
    }
}

impl ModelProvider for TestModelProvider {
    type Error = crate::Error;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<ModelTurn, Self::Error>> + Send + 'static
    {
        let result = self.respond(req);
        let delay = self.delay.unwrap_or(Duration::from_millis(1));
        async move {
            sleep(delay).await;
            result
        }
    }
}
