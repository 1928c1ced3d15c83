//! `rtedit`: replay a JSON command script against a document and print the result.
//!
//! ```text
//! rtedit script.json --document notes.txt --config rtedit.toml
//! ```
//!
//! A script is a JSON array of `{ "command": "<id>", "params": { ... } }`
//! steps. The final body is written to stdout as JSON; logs go to
//! `rtedit.log` in the configured directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Once;

use anyhow::{Context, Result};
use clap::Parser;
use core_actions::Editor;
use core_events::{layout_channel, spawn_layout_consumer};
use core_state::{DocumentState, SelectionProvider, TextRange};
use core_text::{DocumentBody, token};
use serde::Deserialize;
use serde_json::Value;
use tracing::{info, trace, warn};
use tracing_appender::non_blocking::WorkerGuard;

const UNIT_ID: &str = "main";
const LOG_FILE: &str = "rtedit.log";

/// CLI arguments.
#[derive(Parser, Debug)]
#[command(name = "rtedit", version, about = "Rich-text command replay")]
struct Args {
    /// JSON script of commands to run.
    pub script: PathBuf,
    /// Starting document: a `.json` body or plain text (one paragraph per line).
    #[arg(long = "document")]
    pub document: Option<PathBuf>,
    /// Configuration file path (overrides discovery of `rtedit.toml`).
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
    /// Log directory (overrides `[log] dir`).
    #[arg(long = "log-dir")]
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
struct ScriptStep {
    command: String,
    #[serde(default)]
    params: Value,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct ScriptReport {
    ok: usize,
    failed: usize,
}

fn configure_logging(log_dir: &Path, filter: &str) -> Option<WorkerGuard> {
    let log_path = log_dir.join(LOG_FILE);
    if log_path.exists() {
        let _ = std::fs::remove_file(&log_path);
    }
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));
    let file_appender = tracing_appender::rolling::never(log_dir, LOG_FILE);
    let (nb_writer, guard) = tracing_appender::non_blocking(file_appender);
    match tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(nb_writer)
        .with_ansi(false)
        .try_init()
    {
        Ok(_) => Some(guard),
        // Global subscriber already installed; drop guard so the writer shuts down.
        Err(_) => None,
    }
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            tracing::error!(target: "runtime.panic", ?info, "panic");
            default_panic(info);
        }));
    });
}

/// Plain text becomes one paragraph per line; a missing final marker is added.
fn body_from_plain(text: &str) -> DocumentBody {
    let mut stream = text.replace("\r\n", "\r").replace('\n', "\r");
    if !stream.ends_with(token::PARAGRAPH) {
        stream.push(token::PARAGRAPH);
    }
    DocumentBody::from_text(&stream)
}

fn load_document(path: Option<&Path>) -> Result<DocumentBody> {
    let Some(path) = path else {
        return Ok(body_from_plain(""));
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading document {}", path.display()))?;
    if path.extension().is_some_and(|e| e == "json") {
        let body: DocumentBody = serde_json::from_str(&content)
            .with_context(|| format!("parsing document {}", path.display()))?;
        body.validate()
            .with_context(|| format!("document {} is inconsistent", path.display()))?;
        Ok(body)
    } else {
        Ok(body_from_plain(&content))
    }
}

fn load_script(path: &Path) -> Result<Vec<ScriptStep>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading script {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing script {}", path.display()))
}

fn run_script(editor: &mut Editor, steps: Vec<ScriptStep>) -> ScriptReport {
    let mut report = ScriptReport::default();
    for (i, step) in steps.into_iter().enumerate() {
        match editor.try_execute(&step.command, step.params) {
            Ok(out) => {
                trace!(target: "runtime", step = i, command = %step.command, ?out, "step_ok");
                report.ok += 1;
            }
            Err(e) => {
                warn!(target: "runtime", step = i, command = %step.command, error = %e, "step_failed");
                report.failed += 1;
            }
        }
    }
    report
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = core_config::load_from(args.config.clone())?;
    let log_dir = args.log_dir.clone().unwrap_or_else(|| config.log_dir().clone());
    let _log_guard = configure_logging(&log_dir, config.log_filter());
    install_panic_hook();
    info!(target: "runtime", config_override = args.config.is_some(), "startup");

    let body = load_document(args.document.as_deref())?;
    let steps = load_script(&args.script)?;

    let (notifier, rx) = layout_channel();
    let layout_task = spawn_layout_consumer(rx, |event| {
        trace!(target: "events.layout", unit = %event.unit_id(), ?event, "layout_requested");
    });

    let mut editor = Editor::from_config(&config).with_layout(Arc::new(notifier));
    let mut doc = DocumentState::new(UNIT_ID, body);
    doc.selection.replace_text_ranges(vec![TextRange::caret(0)]);
    editor.open(doc);

    let report = run_script(&mut editor, steps);
    let output = serde_json::to_string_pretty(&editor.body(UNIT_ID))?;
    drop(editor);
    let layout_events = layout_task.await.unwrap_or_default();
    info!(target: "runtime", ok = report.ok, failed = report.failed, layout_events, "script_complete");

    println!("{output}");
    if report.failed > 0 {
        eprintln!("{} of {} steps failed", report.failed, report.ok + report.failed);
    }
    Ok(())
}
