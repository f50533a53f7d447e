mod session;
mod ui;

use std::process::ExitCode;

use clap::Parser;

use scriptorium::state::BookType;
use scriptorium::{Settings, WorkflowMode};

/// Writer/editor review-loop sessions over a local LLM backend.
#[derive(Parser, Debug)]
#[command(name = "scriptorium", version, about)]
pub struct Cli {
    /// Test connectivity to the chat backend (and search provider) and exit.
    #[arg(long)]
    pub test_connection: bool,

    /// Workflow mode.
    #[arg(long, default_value = "multi-agent",
          value_parser = ["simple", "multi-agent", "book", "tutorial"])]
    pub mode: String,

    /// Book type (book/tutorial modes).
    #[arg(long, value_parser = ["history", "technical-guide", "tutorial", "general"])]
    pub book_type: Option<String>,

    /// Number of chapters (book/tutorial modes).
    #[arg(long)]
    pub chapters: Option<u32>,

    /// Content topic; prompted interactively if omitted in article modes.
    #[arg(long)]
    pub topic: Option<String>,

    /// Session id to resume a previous run.
    #[arg(long)]
    pub thread_id: Option<String>,

    /// Maximum draft revision iterations.
    #[arg(long)]
    pub max_iterations: Option<u32>,

    /// Maximum outline (or table of contents) revisions.
    #[arg(long)]
    pub max_outline_revisions: Option<u32>,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env();

    if cli.test_connection {
        return match session::test_connection(&settings).await {
            true => ExitCode::SUCCESS,
            false => ExitCode::FAILURE,
        };
    }

    let mode = match WorkflowMode::parse(&cli.mode) {
        Some(mode) => mode,
        None => {
            eprintln!("Error: unknown mode '{}'", cli.mode);
            return ExitCode::FAILURE;
        }
    };

    // Book modes need a topic up front; book mode also needs a type.
    if matches!(mode, WorkflowMode::Book | WorkflowMode::Tutorial) && cli.topic.is_none() {
        eprintln!("Error: --topic is required for book/tutorial modes");
        return ExitCode::FAILURE;
    }
    if mode == WorkflowMode::Book && cli.book_type.is_none() {
        eprintln!("Error: --book-type is required for book mode");
        eprintln!("Available types: history, technical-guide, tutorial, general");
        return ExitCode::FAILURE;
    }
    let book_type = match &cli.book_type {
        Some(name) => match BookType::parse(name) {
            Some(book_type) => book_type,
            None => {
                eprintln!("Error: unknown book type '{name}'");
                return ExitCode::FAILURE;
            }
        },
        None => BookType::Tutorial,
    };

    match session::run(&cli, mode, book_type, settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(session::SessionError::Interrupted { thread_id }) => {
            println!("\nInterrupted. Session state has been saved.");
            println!("Resume with: scriptorium --thread-id {thread_id}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("\nError: {err}");
            ExitCode::FAILURE
        }
    }
}
