//! deepflow CLI: run one research pipeline from the command line.
//!
//! The report goes to stdout; progress goes to stderr; logs go to `LOG_FILE`.
//! Ctrl-C cancels the run (nothing is published after that).

mod display;
mod logging;
mod responder;
mod setup;

use std::path::PathBuf;

use clap::Parser;
use deepflow::PipelineError;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(name = "deepflow")]
#[command(about = "deepflow: clarify, plan, search, write and review a research report")]
pub struct Args {
    /// The research question
    #[arg(required = true, value_name = "QUERY")]
    query: Vec<String>,

    /// Number of searches to plan
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    subtasks: Option<i64>,

    /// Writer revisions allowed after the first draft
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    max_retries: Option<i64>,

    /// Timeout for each tool call, in seconds
    #[arg(long, value_name = "SECS", allow_negative_numbers = true)]
    timeout_secs: Option<i64>,

    /// Searches in flight at once
    #[arg(long, value_name = "N", allow_negative_numbers = true)]
    concurrency: Option<i64>,

    /// What to do when the reviewer never accepts: `fail` or `accept`
    #[arg(long, value_name = "POLICY")]
    on_exhausted: Option<String>,

    /// Chat model for every stage
    #[arg(long, env = "OPENAI_MODEL", default_value = "gpt-4o-mini")]
    model: String,

    /// Skip clarifying questions
    #[arg(long)]
    no_clarify: bool,

    /// Answer to a clarifying question, in order (repeatable); skips the prompt on stdin
    #[arg(long, value_name = "TEXT")]
    answer: Vec<String>,

    /// Skip the review loop: the first draft is final
    #[arg(long)]
    no_evaluate: bool,

    /// Write the report as markdown into this directory
    #[arg(long, value_name = "DIR", conflicts_with = "webhook")]
    out_dir: Option<PathBuf>,

    /// POST the report as JSON to this URL
    #[arg(long, value_name = "URL")]
    webhook: Option<String>,

    /// Verbose: log node enter/exit
    #[arg(short, long)]
    verbose: bool,

    /// Print the full outcome (draft, status, results, delivery) as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    config::load_and_apply(setup::APP_NAME, None::<&std::path::Path>).ok();
    logging::init()?;

    let args = Args::parse();
    let (tx, mut rx) = mpsc::channel(64);
    let orchestrator = match setup::pipeline_config(&args)
        .and_then(|config| setup::build_orchestrator(&args, config, tx))
    {
        Ok(orchestrator) => orchestrator,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(EXIT_CONFIG);
        }
    };

    let progress = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            eprintln!("{}", display::event_line(&event));
        }
    });

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("cancelling…");
            on_signal.cancel();
        }
    });

    let query = args.query.join(" ");
    let result = orchestrator.run_with_cancel(&query, cancel).await;
    drop(orchestrator);
    let _ = progress.await;

    match result {
        Ok(outcome) => display::print_outcome(&outcome, args.json),
        Err(err) => {
            display::print_error(&err);
            std::process::exit(exit_code(&err));
        }
    }
}

const EXIT_CONFIG: i32 = 2;

/// 130 after Ctrl-C, 2 for configuration problems, 1 for everything else.
fn exit_code(err: &PipelineError) -> i32 {
    match err {
        PipelineError::Cancelled => 130,
        PipelineError::Config(_) => EXIT_CONFIG,
        _ => 1,
    }
}
