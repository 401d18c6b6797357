//! Serves the bundled tools on stdin and stdout.

#[macro_use]
extern crate tracing;

use std::env;
use std::process::ExitCode;

use tokio::io;
use toolbridge_provider::Server;
use toolbridge_provider::tool::Toolbox;
use toolbridge_provider::tools::{DEFAULT_HEALTHCHECK_URL, HealthcheckTool};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Stdout carries the protocol, logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let healthcheck_url = env::var("HEALTHCHECK_URL")
        .unwrap_or_else(|_| DEFAULT_HEALTHCHECK_URL.to_owned());
    info!("checking health at {healthcheck_url}");

    let toolbox =
        Toolbox::default().with_tool(HealthcheckTool::new(healthcheck_url));
    let server = Server::new(toolbox);
    match server.serve(io::stdin(), io::stdout()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("failed to serve: {err}");
            ExitCode::FAILURE
        }
    }
}
