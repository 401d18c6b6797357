//! Client side of toolbridge: provider transport, protocol session, and
//! the loop that lets a completion service call the provider's tools.

#![deny(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

pub mod conversation;
mod guard;
mod model_client;
mod orchestrator;
pub mod session;
#[cfg(test)]
mod testing;
pub mod transport;

pub use conversation::{
    Conversation, Transcript, TranscriptLine, TranscriptSource,
};
pub use guard::{ConnectError, ResourceGuard};
pub use model_client::{CompletionError, RetryPolicy};
pub use orchestrator::{
    Orchestrator, OrchestratorBuilder, QueryError, QueryOutput,
};
pub use session::{
    Session, SessionError, SessionOptions, SessionState, Tool, ToolCallResult,
};
pub use transport::{ProviderLaunch, Transport, TransportError};
