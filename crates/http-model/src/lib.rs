//! A completion service provider speaking JSON over HTTP.

#[macro_use]
extern crate tracing;

mod config;
mod proto;

use std::error::Error as StdError;
use std::fmt::{self, Display};
use std::sync::Arc;

use mime::Mime;
use reqwest::{Client, StatusCode, header};
use toolbridge_model::{
    ErrorKind, ModelProvider, ModelProviderError, ModelRequest, ModelTurn,
};

pub use config::{HttpModelConfig, HttpModelConfigBuilder};
use proto::ChatCompletion;

/// Error type for [`HttpModelProvider`].
#[derive(Debug)]
pub struct Error {
    message: String,
    kind: ErrorKind,
}

impl Error {
    fn new(message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            message: message.into(),
            kind,
        }
    }

    fn from_reqwest(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            ErrorKind::Timeout
        } else if err.is_connect() {
            ErrorKind::Unavailable
        } else {
            ErrorKind::Other
        };
        Self::new(format!("{err}"), kind)
    }

    fn from_status(status: StatusCode, body: &str) -> Self {
        let kind = if status == StatusCode::TOO_MANY_REQUESTS {
            ErrorKind::RateLimitExceeded
        } else if status.is_server_error() {
            ErrorKind::Unavailable
        } else {
            ErrorKind::Rejected
        };
        let body = body.trim();
        if body.is_empty() {
            Self::new(format!("server responded with {status}"), kind)
        } else {
            Self::new(format!("server responded with {status}: {body}"), kind)
        }
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Error {}

impl ModelProviderError for Error {
    #[inline]
    fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// Completion service provider that posts the conversation to an HTTP
/// endpoint and reads the next turn from `choices[0].message.content`.
#[derive(Clone, Debug)]
pub struct HttpModelProvider {
    client: Client,
    config: Arc<HttpModelConfig>,
}

impl HttpModelProvider {
    /// Creates a new `HttpModelProvider` with the given configuration.
    #[inline]
    pub fn new(config: HttpModelConfig) -> Self {
        Self {
            client: Client::new(),
            config: Arc::new(config),
        }
    }
}

impl ModelProvider for HttpModelProvider {
    type Error = Error;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<ModelTurn, Self::Error>> + Send + 'static
    {
        let body = proto::create_request(req, &self.config);
        let mut builder = self
            .client
            .post(self.config.endpoint_url())
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "application/json")
            .timeout(self.config.timeout)
            .json(&body);
        if let Some(api_key) = &self.config.api_key {
            builder = builder.bearer_auth(api_key);
        }
        let resp_fut = builder.send();

        async move {
            let resp = resp_fut.await.map_err(Error::from_reqwest)?;

            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                return Err(Error::from_status(status, &body));
            }

            // A missing content type is tolerated, anything else must be
            // some kind of JSON.
            let content_type = resp
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(ToOwned::to_owned);
            if let Some(content_type) = &content_type {
                let is_json = content_type
                    .parse()
                    .map(|m: Mime| {
                        m.subtype() == mime::JSON
                            || m.suffix().is_some_and(|s| s == mime::JSON)
                    })
                    .unwrap_or(false);
                if !is_json {
                    return Err(Error::new(
                        format!("Unexpected content type: {content_type}"),
                        ErrorKind::InvalidResponse,
                    ));
                }
            }

            let bytes = resp.bytes().await.map_err(Error::from_reqwest)?;
            trace!("got a response body of {} bytes", bytes.len());
            let completion: ChatCompletion = serde_json::from_slice(&bytes)
                .map_err(|err| {
                    Error::new(
                        format!("Malformed response body: {err}"),
                        ErrorKind::InvalidResponse,
                    )
                })?;
            proto::into_turn(completion).ok_or_else(|| {
                Error::new("Response has no choices", ErrorKind::InvalidResponse)
            })
        }
    }
}
