//! Session driving: build the graph for the chosen mode, walk the
//! invoke/decide/resume loop, and render the results.

use std::path::Path;
use std::sync::Arc;

use rustyline::error::ReadlineError;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use scriptorium::state::BookType;
use scriptorium::{
    create_book_workflow, create_initial_book_state, create_initial_state,
    create_multi_agent_workflow, create_simple_workflow, ExportManager, Settings, WorkflowContext,
    WorkflowMode,
};
use scriptorium_checkpoint_sqlite::SqliteCheckpointer;
use scriptorium_graph::{
    Checkpointer, ExecutionOptions, GraphError, GraphState, RunOutcome, StateSchema,
};
use scriptorium_llm::{ChatClient, TextGenerator};
use scriptorium_search::{SearchBackend, SearchProvider, Searcher};

use crate::ui;
use crate::Cli;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session interrupted")]
    Interrupted { thread_id: String },
    #[error("{0}")]
    Setup(String),
    #[error("run failed: {source}\nThe last checkpoint is intact; resume with --thread-id {thread_id}")]
    Run {
        thread_id: String,
        source: GraphError,
    },
}

/// Probes the chat backend (and the search provider when enabled).
pub async fn test_connection(settings: &Settings) -> bool {
    println!(
        "Testing connection to {} (model {})...",
        settings.chat_base_url, settings.chat_model
    );
    let client = match ChatClient::new(
        &settings.chat_base_url,
        &settings.chat_model,
        0.7,
        settings.max_tokens,
    ) {
        Ok(client) => client,
        Err(err) => {
            println!("x Invalid chat configuration: {err}");
            return false;
        }
    };

    if client.test_connection().await {
        println!("+ Chat backend reachable");
    } else {
        println!("x Failed to reach the chat backend");
        println!("  1. Make sure the local server is running");
        println!("  2. Check CHAT_BASE_URL (current: {})", settings.chat_base_url);
        println!("  3. Verify the model is loaded");
        return false;
    }

    if settings.enable_web_search {
        match build_searcher(settings) {
            Some(provider) => {
                if provider.test_connection().await {
                    println!("+ Search provider '{}' reachable", settings.search_provider);
                } else {
                    println!(
                        "! Search provider '{}' did not answer; research will degrade",
                        settings.search_provider
                    );
                }
            }
            None => println!("! Search disabled or misconfigured; research will be skipped"),
        }
    }
    true
}

fn build_searcher(settings: &Settings) -> Option<SearchProvider> {
    if !settings.enable_web_search {
        return None;
    }
    let backend = match SearchBackend::parse(
        &settings.search_provider,
        settings.search_api_key.as_deref(),
    ) {
        Ok(backend) => backend,
        Err(err) => {
            tracing::warn!(error = %err, "search provider unavailable, continuing without");
            return None;
        }
    };
    match SearchProvider::new(backend, settings.max_search_results_per_query) {
        Ok(provider) => Some(provider),
        Err(err) => {
            tracing::warn!(error = %err, "search provider construction failed");
            None
        }
    }
}

async fn build_checkpointer(settings: &Settings) -> Result<SqliteCheckpointer, SessionError> {
    if let Some(parent) = Path::new(&settings.checkpoint_db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .map_err(|err| SessionError::Setup(format!("cannot create data dir: {err}")))?;
        }
    }
    SqliteCheckpointer::builder(format!("sqlite://{}", settings.checkpoint_db_path))
        .build()
        .await
        .map_err(|err| SessionError::Setup(format!("cannot open checkpoint store: {err}")))
}

pub async fn run(
    cli: &Cli,
    mode: WorkflowMode,
    book_type: BookType,
    settings: Settings,
) -> Result<(), SessionError> {
    ui::banner(mode.label(), &settings.chat_model, &settings.chat_base_url);

    let generator: Arc<dyn TextGenerator> = Arc::new(
        ChatClient::new(
            &settings.chat_base_url,
            &settings.chat_model,
            settings.writer_temperature,
            settings.max_tokens,
        )
        .map_err(|err| SessionError::Setup(err.to_string()))?,
    );
    let searcher: Option<Arc<dyn Searcher>> = build_searcher(&settings)
        .map(|provider| Arc::new(provider) as Arc<dyn Searcher>);
    let exporter = Arc::new(
        ExportManager::new(&settings.output_dir)
            .map_err(|err| SessionError::Setup(err.to_string()))?,
    );
    let checkpointer = Arc::new(build_checkpointer(&settings).await?);

    let thread_id = cli
        .thread_id
        .clone()
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    println!("\nSession ID: {thread_id}");

    let ctx = WorkflowContext {
        settings: settings.clone(),
        generator,
        searcher,
        exporter: exporter.clone(),
        observer: Some(Arc::new(ui::ConsoleObserver)),
    };

    match mode {
        WorkflowMode::Simple | WorkflowMode::MultiAgent => {
            run_article(cli, mode, &ctx, checkpointer, &thread_id, &exporter).await
        }
        WorkflowMode::Book | WorkflowMode::Tutorial => {
            let book_type = if mode == WorkflowMode::Tutorial {
                BookType::Tutorial
            } else {
                book_type
            };
            run_book(cli, book_type, &ctx, checkpointer, &thread_id).await
        }
    }
}

async fn run_article(
    cli: &Cli,
    mode: WorkflowMode,
    ctx: &WorkflowContext,
    checkpointer: Arc<dyn Checkpointer<scriptorium::WorkflowState>>,
    thread_id: &str,
    exporter: &ExportManager,
) -> Result<(), SessionError> {
    let graph = match mode {
        WorkflowMode::Simple => create_simple_workflow(ctx, checkpointer),
        _ => create_multi_agent_workflow(ctx, checkpointer),
    }
    .map_err(|err| SessionError::Setup(err.to_string()))?;

    let topic = match &cli.topic {
        Some(topic) => topic.clone(),
        None => ui::ask_topic().map_err(|_| SessionError::Interrupted {
            thread_id: thread_id.to_string(),
        })?,
    };
    println!("\nStarting workflow for topic: {topic}\n");

    let initial = create_initial_state(
        topic.clone(),
        &ctx.settings,
        cli.max_iterations,
        cli.max_outline_revisions,
    );
    let options = ExecutionOptions::for_thread(thread_id);
    let mut outcome = invoke(&graph, GraphState::new(initial), &options, thread_id).await?;

    loop {
        match outcome {
            RunOutcome::Complete(state) => {
                ui::panel("final draft", &state.data.current_draft);
                match exporter.export_article(&topic, &state.data.current_draft) {
                    Ok(path) => println!("\nExported to {}", path.display()),
                    Err(err) => tracing::warn!(error = %err, "article export failed"),
                }
                println!(
                    "Completed after {} iteration(s). Session: {thread_id}",
                    state.data.iteration_count
                );
                return Ok(());
            }
            RunOutcome::Suspended { node, interrupt } => {
                ui::panel("decision needed", &interrupt.prompt);
                let decision = if node == "outline_intervention" {
                    ask(&["proceed", "revise"], "proceed", thread_id)?
                } else {
                    ask(&["continue", "stop"], "stop", thread_id)?
                };
                outcome = resume(&graph, thread_id, &decision).await?;
            }
        }
    }
}

async fn run_book(
    cli: &Cli,
    book_type: BookType,
    ctx: &WorkflowContext,
    checkpointer: Arc<dyn Checkpointer<scriptorium::BookState>>,
    thread_id: &str,
) -> Result<(), SessionError> {
    let graph = create_book_workflow(ctx, book_type, checkpointer)
        .map_err(|err| SessionError::Setup(err.to_string()))?;

    let topic = cli.topic.clone().unwrap_or_default();
    println!("\nStarting {} workflow for: {topic}\n", book_type.label());

    let initial = create_initial_book_state(
        topic,
        book_type,
        &ctx.settings,
        cli.chapters,
        cli.max_outline_revisions,
    );
    let options = ExecutionOptions::for_thread(thread_id);
    let mut outcome = invoke(&graph, GraphState::new(initial), &options, thread_id).await?;

    loop {
        match outcome {
            RunOutcome::Complete(state) => {
                println!("\nBook complete: {} chapter(s) exported", state.data.chapters.len());
                for path in &state.data.exported_files {
                    println!("  {path}");
                }
                println!("Session: {thread_id}");
                return Ok(());
            }
            RunOutcome::Suspended { interrupt, .. } => {
                ui::panel("decision needed", &interrupt.prompt);
                let decision = ask(&["proceed", "revise"], "proceed", thread_id)?;
                outcome = resume(&graph, thread_id, &decision).await?;
            }
        }
    }
}

fn ask(choices: &[&str], default: &str, thread_id: &str) -> Result<String, SessionError> {
    match ui::ask_decision(choices, default) {
        Ok(decision) => Ok(decision),
        Err(ReadlineError::Interrupted | ReadlineError::Eof) => Err(SessionError::Interrupted {
            thread_id: thread_id.to_string(),
        }),
        Err(err) => Err(SessionError::Setup(err.to_string())),
    }
}

async fn invoke<S: StateSchema>(
    graph: &scriptorium_graph::ExecutableGraph<S>,
    initial: GraphState<S>,
    options: &ExecutionOptions,
    thread_id: &str,
) -> Result<RunOutcome<S>, SessionError> {
    graph
        .invoke(initial, options)
        .await
        .map_err(|source| SessionError::Run {
            thread_id: thread_id.to_string(),
            source,
        })
}

async fn resume<S: StateSchema>(
    graph: &scriptorium_graph::ExecutableGraph<S>,
    thread_id: &str,
    decision: &str,
) -> Result<RunOutcome<S>, SessionError> {
    graph
        .resume(thread_id, json!(decision))
        .await
        .map_err(|source| SessionError::Run {
            thread_id: thread_id.to_string(),
            source,
        })
}
