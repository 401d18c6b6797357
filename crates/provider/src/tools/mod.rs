//! Tools shipped with the provider.

mod healthcheck;

pub use healthcheck::{
    DEFAULT_HEALTHCHECK_URL, HealthcheckArguments, HealthcheckTool,
};
