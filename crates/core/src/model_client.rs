use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use backoff::ExponentialBackoffBuilder;
use backoff::future::retry_notify;
use thiserror::Error;
use tokio::time;
use toolbridge_model::{
    ErrorKind, ModelProvider, ModelProviderError, ModelRequest, ModelTurn,
};
use tracing::Instrument;

type SendRequestResult = Result<ModelTurn, Box<dyn ModelProviderError>>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
type HandlerFn =
    Arc<dyn Fn(ModelRequest) -> BoxedSendRequestFuture + Send + Sync>;

/// How failed completion requests are retried.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_interval: Duration,
    /// Upper bound of the delay between attempts.
    pub max_interval: Duration,
    /// Growth factor of the delay.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(8),
            multiplier: 2.0,
        }
    }
}

/// The completion service failed to produce a turn.
#[derive(Debug, Error)]
#[error("completion service failed after {attempts} attempt(s): {message}")]
pub struct CompletionError {
    attempts: u32,
    kind: ErrorKind,
    message: String,
}

impl CompletionError {
    /// Returns how many attempts were made.
    #[inline]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Returns the kind of the last failure.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the message of the last failure.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// A type-erased wrapper around a model provider that bounds every
/// attempt in time and retries transient failures.
#[derive(Clone)]
pub struct ModelClient {
    handler_fn: HandlerFn,
    retry_policy: RetryPolicy,
    request_timeout: Duration,
}

impl ModelClient {
    #[inline]
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        let handler_fn: HandlerFn = Arc::new(move |req| {
            let fut = provider.send_request(&req);
            Box::pin(
                async move {
                    trace!("got a request: {:?}", req);
                    fut.await.map_err(|err| {
                        Box::new(err) as Box<dyn ModelProviderError>
                    })
                }
                .instrument(trace_span!("model client req")),
            )
        });
        Self {
            handler_fn,
            retry_policy: RetryPolicy::default(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    #[inline]
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    #[inline]
    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    /// Sends a request, retrying transient failures with exponential
    /// backoff until the policy's attempts are used up.
    ///
    /// An attempt that outlives the request timeout is dropped and counts
    /// as a [`ErrorKind::Timeout`] failure.
    pub async fn send_request(
        &self,
        req: ModelRequest,
    ) -> Result<ModelTurn, CompletionError> {
        let policy = self.retry_policy;
        let max_attempts = policy.max_attempts.max(1);
        let backoff = ExponentialBackoffBuilder::new()
            .with_initial_interval(policy.initial_interval)
            .with_max_interval(policy.max_interval)
            .with_multiplier(policy.multiplier)
            .with_max_elapsed_time(None)
            .build();

        let request_timeout = self.request_timeout;
        let mut attempt = 0;
        let operation = || {
            attempt += 1;
            let attempts = attempt;
            let fut = (self.handler_fn)(req.clone());
            async move {
                let result = match time::timeout(request_timeout, fut).await {
                    Ok(result) => {
                        result.map_err(|err| (err.kind(), err.to_string()))
                    }
                    Err(_) => Err((
                        ErrorKind::Timeout,
                        format!("no response within {request_timeout:?}"),
                    )),
                };
                result.map_err(|(kind, message)| {
                    let err = CompletionError {
                        attempts,
                        kind,
                        message,
                    };
                    if attempts >= max_attempts || !kind.is_transient() {
                        backoff::Error::permanent(err)
                    } else {
                        backoff::Error::transient(err)
                    }
                })
            }
        };
        let notify = |err: CompletionError, wait: Duration| {
            warn!(
                "completion attempt {} failed ({:?}), retrying in {wait:?}: {}",
                err.attempts, err.kind, err.message
            );
        };

        retry_notify(backoff, operation, notify)
            .await
            .inspect(|turn| trace!("got a turn of {} part(s)", turn.parts.len()))
            .inspect_err(|err| error!("{err}"))
    }
}
