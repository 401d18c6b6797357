//! Command line and environment configuration.

use std::time::Duration;

use clap::Parser;
use thiserror::Error;
use toolbridge_core::{ProviderLaunch, RetryPolicy, SessionOptions};
use toolbridge_http_model::{HttpModelConfig, HttpModelConfigBuilder};

/// Command line arguments. Completion service settings fall back to
/// `LLM_*` environment variables.
#[derive(Debug, Parser)]
#[command(name = "toolbridge", version)]
#[command(
    about = "Answers queries with a language model that can call the tools of a local tool provider"
)]
pub struct Cli {
    /// Tool provider executable, `.py` and `.js` files run under
    /// `python3` and `node`
    pub provider: String,

    /// Arguments passed to the tool provider
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub provider_args: Vec<String>,

    /// Completion service host, or a base URL with a scheme
    #[arg(long, env = "LLM_API_HOST")]
    pub api_host: Option<String>,

    /// Completion service port
    #[arg(long, env = "LLM_API_PORT", default_value_t = 80)]
    pub api_port: u16,

    /// Completion service endpoint path
    #[arg(long, env = "LLM_API_ENDPOINT", default_value = "/v1/chat/completions")]
    pub api_endpoint: String,

    /// Bearer token for the completion service
    #[arg(long, env = "LLM_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Model name
    #[arg(long, env = "LLM_MODEL", default_value = "fk-gpt-large-v3")]
    pub model: String,

    /// Maximum number of tokens per completion
    #[arg(long, env = "LLM_MAX_TOKENS", default_value_t = 1024)]
    pub max_tokens: u32,

    /// Sampling temperature
    #[arg(long, env = "LLM_TEMPERATURE", default_value_t = 0.0)]
    pub temperature: f32,

    /// Nucleus sampling probability
    #[arg(long, env = "LLM_TOP_P", default_value_t = 1.0)]
    pub top_p: f32,

    /// Seconds to wait for a tool call
    #[arg(long, value_name = "SECS", default_value = "30", value_parser = parse_secs)]
    pub tool_timeout: Duration,

    /// Seconds to wait for each provider request other than tool calls,
    /// that is the handshake and tool discovery
    #[arg(
        long,
        visible_alias = "request-timeout",
        value_name = "SECS",
        default_value = "10",
        value_parser = parse_secs
    )]
    pub handshake_timeout: Duration,

    /// Seconds to wait for each completion attempt
    #[arg(long, value_name = "SECS", default_value = "60", value_parser = parse_secs)]
    pub completion_timeout: Duration,

    /// Retries of a failed completion request
    #[arg(long, default_value_t = 3)]
    pub completion_retries: u32,

    /// Maximum number of completion requests per query
    #[arg(long, default_value_t = 16)]
    pub max_rounds: usize,
}

fn parse_secs(s: &str) -> Result<Duration, String> {
    let secs: f64 = s.parse().map_err(|err| format!("{err}"))?;
    if secs <= 0.0 {
        return Err("must be positive".to_owned());
    }
    Duration::try_from_secs_f64(secs).map_err(|err| format!("{err}"))
}

/// Invalid configuration values.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No completion service host was given.
    #[error("LLM_API_HOST is not set")]
    MissingApiHost,
    /// The host can't be part of a URL.
    #[error("invalid LLM_API_HOST `{0}`")]
    InvalidApiHost(String),
    /// The endpoint is not an absolute path.
    #[error("LLM_API_ENDPOINT must start with `/`, got `{0}`")]
    InvalidEndpoint(String),
    /// A numeric setting is outside its range.
    #[error("{name} must be {expected}, got {value}")]
    OutOfRange {
        /// The setting.
        name: &'static str,
        /// The accepted range.
        expected: &'static str,
        /// The given value.
        value: String,
    },
}

/// Validated configuration of the client.
#[derive(Clone, Debug)]
pub struct Config {
    /// How to start the tool provider.
    pub launch: ProviderLaunch,
    /// Completion service settings.
    pub model: HttpModelConfig,
    /// Session settings. The request timeout bounds the handshake and
    /// tool discovery.
    pub session: SessionOptions,
    /// Retries of completion requests.
    pub retry_policy: RetryPolicy,
    /// Timeout of every tool call.
    pub tool_timeout: Duration,
    /// Timeout of every completion attempt.
    pub completion_timeout: Duration,
    /// Maximum number of completion requests per query.
    pub max_rounds: usize,
}

impl TryFrom<Cli> for Config {
    type Error = ConfigError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let host = cli
            .api_host
            .as_deref()
            .map(str::trim)
            .filter(|host| !host.is_empty())
            .ok_or(ConfigError::MissingApiHost)?;
        if host.contains(char::is_whitespace) {
            return Err(ConfigError::InvalidApiHost(host.to_owned()));
        }
        let base_url = if host.contains("://") {
            host.to_owned()
        } else if cli.api_port == 80 {
            format!("http://{host}")
        } else {
            format!("http://{host}:{}", cli.api_port)
        };

        if !cli.api_endpoint.starts_with('/') {
            return Err(ConfigError::InvalidEndpoint(cli.api_endpoint));
        }
        if cli.max_tokens == 0 {
            return Err(out_of_range("LLM_MAX_TOKENS", "positive", cli.max_tokens));
        }
        if !(0.0..=2.0).contains(&cli.temperature) {
            return Err(out_of_range(
                "LLM_TEMPERATURE",
                "between 0 and 2",
                cli.temperature,
            ));
        }
        if !(cli.top_p > 0.0 && cli.top_p <= 1.0) {
            return Err(out_of_range("LLM_TOP_P", "in (0, 1]", cli.top_p));
        }
        if cli.max_rounds == 0 {
            return Err(out_of_range("--max-rounds", "positive", cli.max_rounds));
        }

        let mut model = HttpModelConfigBuilder::with_base_url(base_url)
            .with_endpoint(cli.api_endpoint)
            .with_model(cli.model)
            .with_max_tokens(cli.max_tokens)
            .with_temperature(cli.temperature)
            .with_top_p(cli.top_p)
            .with_timeout(cli.completion_timeout);
        if let Some(api_key) = cli.api_key.filter(|key| !key.is_empty()) {
            model = model.with_api_key(api_key);
        }

        Ok(Config {
            launch: ProviderLaunch::infer(cli.provider)
                .with_args(cli.provider_args),
            model: model.build(),
            session: SessionOptions {
                request_timeout: cli.handshake_timeout,
                ..Default::default()
            },
            retry_policy: RetryPolicy {
                max_attempts: cli.completion_retries.saturating_add(1),
                ..Default::default()
            },
            tool_timeout: cli.tool_timeout,
            completion_timeout: cli.completion_timeout,
            max_rounds: cli.max_rounds,
        })
    }
}

#[inline]
fn out_of_range(
    name: &'static str,
    expected: &'static str,
    value: impl ToString,
) -> ConfigError {
    ConfigError::OutOfRange {
        name,
        expected,
        value: value.to_string(),
    }
}
