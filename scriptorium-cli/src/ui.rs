//! Plain-terminal rendering: banners, panels, decision prompts, and the
//! progress observer wired into the executor.

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use scriptorium_graph::Observer;

pub fn banner(mode: &str, model: &str, base_url: &str) {
    println!("==============================================");
    println!("  Scriptorium - writer/editor review loop");
    println!("  Mode:  {mode}");
    println!("  Model: {model} @ {base_url}");
    println!("==============================================");
}

pub fn panel(title: &str, body: &str) {
    println!("\n--- {title} ---");
    println!("{body}");
    println!("--- end {title} ---");
}

/// Stage labels shown as nodes finish, so a long run is not silent.
pub struct ConsoleObserver;

impl Observer for ConsoleObserver {
    fn on_node_enter(&self, node: &str) {
        println!("  -> {node}");
    }

    fn on_interrupt(&self, node: &str) {
        println!("  .. {node} is waiting for your decision");
    }

    fn on_error(&self, node: &str, error: &str) {
        eprintln!("  !! {node} failed: {error}");
    }
}

/// Reads a decision, constrained to `choices`; Ctrl-C/Ctrl-D abort.
pub fn ask_decision(choices: &[&str], default: &str) -> Result<String, ReadlineError> {
    let mut editor = DefaultEditor::new()?;
    let prompt = format!("[{}] (default: {default}) > ", choices.join("/"));
    loop {
        match editor.readline(&prompt) {
            Ok(line) => {
                let answer = line.trim().to_lowercase();
                if answer.is_empty() {
                    return Ok(default.to_string());
                }
                if choices.contains(&answer.as_str()) {
                    return Ok(answer);
                }
                println!("Please answer one of: {}", choices.join(", "));
            }
            Err(err) => return Err(err),
        }
    }
}

pub fn ask_topic() -> Result<String, ReadlineError> {
    let mut editor = DefaultEditor::new()?;
    loop {
        let line = editor.readline("What topic would you like to write about? > ")?;
        let topic = line.trim().to_string();
        if !topic.is_empty() {
            return Ok(topic);
        }
    }
}
