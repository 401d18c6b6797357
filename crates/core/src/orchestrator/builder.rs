use std::time::Duration;

use toolbridge_model::ModelProvider;

use super::Orchestrator;
use crate::model_client::{ModelClient, RetryPolicy};

/// [`Orchestrator`] builder.
pub struct OrchestratorBuilder {
    model_client: ModelClient,
    tool_timeout: Duration,
    max_rounds: usize,
}

impl OrchestratorBuilder {
    /// Creates a new builder with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        provider: P,
    ) -> Self {
        Self {
            model_client: ModelClient::new(provider),
            tool_timeout: Duration::from_secs(30),
            max_rounds: 16,
        }
    }

    /// Sets how failed completion requests are retried.
    #[inline]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.model_client = self.model_client.with_retry_policy(retry_policy);
        self
    }

    /// Sets how long a single completion attempt may take.
    #[inline]
    pub fn with_completion_timeout(mut self, timeout: Duration) -> Self {
        self.model_client = self.model_client.with_request_timeout(timeout);
        self
    }

    /// Sets the timeout of every tool call.
    #[inline]
    pub fn with_tool_timeout(mut self, tool_timeout: Duration) -> Self {
        self.tool_timeout = tool_timeout;
        self
    }

    /// Sets how many completion requests a single query may take.
    #[inline]
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds.max(1);
        self
    }

    /// Builds the orchestrator.
    #[inline]
    pub fn build(self) -> Orchestrator {
        let OrchestratorBuilder {
            model_client,
            tool_timeout,
            max_rounds,
        } = self;
        Orchestrator {
            model_client,
            tool_timeout,
            max_rounds,
        }
    }
}
