//! Interactive client: connects to a tool provider and answers queries
//! read from the terminal.

#[macro_use]
extern crate tracing;

use std::io::{self, BufRead, Write as _};
use std::process::ExitCode;
use std::thread;
use std::time::Duration;

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::OwoColorize;
use tokio::sync::mpsc;
use tokio::{select, signal};
use toolbridge::config::{Cli, Config};
use toolbridge::core::{
    Orchestrator, OrchestratorBuilder, QueryError, ResourceGuard, Session,
    Transcript, TranscriptSource,
};
use toolbridge_http_model::HttpModelProvider;

const BAR_CHAR: &str = "▎";

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            // `--help` and `--version` end up here as well.
            let code = if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
            err.print().ok();
            return code;
        }
    };
    let config = match Config::try_from(cli) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{} {err}", "error:".bright_red().bold());
            return ExitCode::FAILURE;
        }
    };
    debug!("using {config:?}");

    let model_provider = HttpModelProvider::new(config.model.clone());
    let orchestrator = OrchestratorBuilder::with_model_provider(model_provider)
        .with_retry_policy(config.retry_policy)
        .with_completion_timeout(config.completion_timeout)
        .with_tool_timeout(config.tool_timeout)
        .with_max_rounds(config.max_rounds)
        .build();

    let guard = ResourceGuard::new(config.launch, config.session);
    let outcome = guard
        .run(async |session: &mut Session| {
            chat_loop(session, &orchestrator).await
        })
        .await;
    match outcome {
        Ok(Ok(())) => ExitCode::SUCCESS,
        Ok(Err(err)) => {
            eprintln!("{} {err}", "error:".bright_red().bold());
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!(
                "{} failed to connect to the tool provider: {err}",
                "error:".bright_red().bold()
            );
            ExitCode::FAILURE
        }
    }
}

/// Reads queries until `quit`, end of input or Ctrl-C. Only errors that
/// leave the session unusable are returned.
async fn chat_loop(
    session: &mut Session,
    orchestrator: &Orchestrator,
) -> Result<(), QueryError> {
    let tools = session.list_tools().await?;
    println!(
        "Connected to tool provider with tools: {}",
        tools
            .iter()
            .map(|tool| tool.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
            .bright_white()
    );
    println!("Type your queries or `quit` to exit.");

    let progress_style = ProgressStyle::with_template("{spinner} {wide_msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
    let mut lines = spawn_line_reader();

    loop {
        print!("\n{} ", "Query:".bright_green().bold());
        std::io::stdout().flush().ok();

        let line = select! {
            line = lines.recv() => line,
            _ = signal::ctrl_c() => {
                println!();
                break;
            }
        };
        let line = match line {
            Some(Ok(line)) => line,
            None => break,
            Some(Err(err)) => {
                error!("error reading input: {err}");
                break;
            }
        };
        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if query.eq_ignore_ascii_case("quit") {
            break;
        }

        let progress_bar = ProgressBar::new_spinner();
        progress_bar.set_style(progress_style.clone());
        progress_bar.set_message("🤔 Thinking...");
        progress_bar.enable_steady_tick(Duration::from_millis(100));

        let outcome = select! {
            outcome = orchestrator.process_query(session, query) => outcome,
            _ = signal::ctrl_c() => {
                progress_bar.finish_and_clear();
                println!("{}", "Cancelled.".bright_yellow());
                break;
            }
        };
        // Finish the progress bar before printing anything else.
        progress_bar.finish_and_clear();

        match outcome {
            Ok(output) => print_transcript(&output.transcript),
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                eprintln!("{} {err}", "query failed:".bright_red());
            }
        }
    }

    Ok(())
}

/// Reads stdin lines on a plain thread.
///
/// A read in progress can't be cancelled, and tokio's own stdin would keep
/// the runtime from shutting down until the next line arrives. The thread
/// is left blocked when the loop ends and goes away with the process.
fn spawn_line_reader() -> mpsc::Receiver<io::Result<String>> {
    let (tx, rx) = mpsc::channel(1);
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

fn print_transcript(transcript: &Transcript) {
    for line in transcript.lines() {
        match line.source {
            TranscriptSource::Assistant => println!(
                "{}🤖 {}",
                BAR_CHAR.bright_cyan(),
                line.text.bright_white()
            ),
            TranscriptSource::Tool => println!(
                "{}🔧 {}",
                BAR_CHAR.bright_yellow(),
                line.text.dimmed()
            ),
        }
    }
}
