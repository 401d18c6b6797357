use std::fmt::Debug;
use std::time::Duration;

const DEFAULT_ENDPOINT: &str = "/v1/chat/completions";
const DEFAULT_MODEL: &str = "fk-gpt-large-v3";

/// Builder for [`HttpModelConfig`].
#[derive(Clone, PartialEq)]
pub struct HttpModelConfigBuilder {
    base_url: String,
    endpoint: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
    top_p: Option<f32>,
    timeout: Option<Duration>,
}

impl HttpModelConfigBuilder {
    /// Creates a builder for a service at the given base URL, like
    /// `http://localhost:8080`.
    #[inline]
    pub fn with_base_url<S: Into<String>>(base_url: S) -> Self {
        Self {
            base_url: base_url.into(),
            endpoint: None,
            api_key: None,
            model: None,
            max_tokens: None,
            temperature: None,
            top_p: None,
            timeout: None,
        }
    }

    /// Sets the path of the completion endpoint.
    #[inline]
    pub fn with_endpoint<S: Into<String>>(mut self, endpoint: S) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets a bearer token sent with every request.
    #[inline]
    pub fn with_api_key<S: Into<String>>(mut self, api_key: S) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the model to use.
    #[inline]
    pub fn with_model<S: Into<String>>(mut self, model: S) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sets the maximum number of tokens of a turn.
    #[inline]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Sets the sampling temperature.
    #[inline]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the nucleus sampling threshold.
    #[inline]
    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = Some(top_p);
        self
    }

    /// Sets the timeout of a single request.
    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Builds the configuration.
    #[inline]
    pub fn build(self) -> HttpModelConfig {
        HttpModelConfig {
            base_url: self.base_url.trim_end_matches('/').to_owned(),
            endpoint: self
                .endpoint
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_owned()),
            api_key: self.api_key,
            model: self.model.unwrap_or_else(|| DEFAULT_MODEL.to_owned()),
            max_tokens: self.max_tokens.unwrap_or(1024),
            temperature: self.temperature.unwrap_or(0.0),
            top_p: self.top_p.unwrap_or(1.0),
            timeout: self.timeout.unwrap_or(Duration::from_secs(60)),
        }
    }
}

impl Debug for HttpModelConfigBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpModelConfigBuilder")
            .field("base_url", &self.base_url)
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<deducted>"))
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

/// Configuration for the HTTP completion service.
#[derive(Clone, PartialEq)]
pub struct HttpModelConfig {
    pub(crate) base_url: String,
    pub(crate) endpoint: String,
    pub(crate) api_key: Option<String>,
    pub(crate) model: String,
    pub(crate) max_tokens: u32,
    pub(crate) temperature: f32,
    pub(crate) top_p: f32,
    pub(crate) timeout: Duration,
}

impl HttpModelConfig {
    /// Returns the full URL requests are posted to.
    pub fn endpoint_url(&self) -> String {
        if self.endpoint.starts_with('/') {
            format!("{}{}", self.base_url, self.endpoint)
        } else {
            format!("{}/{}", self.base_url, self.endpoint)
        }
    }
}

impl Debug for HttpModelConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpModelConfig")
            .field("endpoint", &self.endpoint_url())
            .field("api_key", &self.api_key.as_ref().map(|_| "<deducted>"))
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("timeout", &self.timeout)
            .finish()
    }
}
