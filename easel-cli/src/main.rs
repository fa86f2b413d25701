//! # Easel CLI
//!
//! Render canonical documents through an engine adapter and apply free-text
//! instructions from the command line.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use easel_core::{Document, DocumentId, EditorConfig, EditorContext, Page, DEFAULT_HISTORY_LIMIT};
use easel_engines::{create_adapter, default_registry, DEFAULT_ENGINE};
use easel_sync::{
    AutosaveConfig, AutosaveHandle, EditorSession, HttpPersistence, MemoryPersistence,
    PersistenceApi, DEFAULT_DEBOUNCE,
};

#[derive(Debug, Parser)]
#[command(name = "easel", version, about = "Engine-agnostic document editing")]
struct Cli {
    /// Rendering engine.
    #[arg(long, global = true, env = "EASEL_ENGINE", default_value = DEFAULT_ENGINE)]
    engine: String,

    /// Maximum undo depth.
    #[arg(long, global = true, env = "EASEL_HISTORY_LIMIT", default_value_t = DEFAULT_HISTORY_LIMIT)]
    history_limit: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List registered engines.
    Engines,

    /// Print the native scene for a document.
    Render {
        /// Document JSON file.
        document: PathBuf,

        /// Zero-based page index.
        #[arg(long, default_value_t = 0)]
        page: usize,
    },

    /// Parse and execute instructions against a document.
    Apply {
        /// Document JSON file.
        document: PathBuf,

        /// Instructions, executed in order.
        #[arg(required = true)]
        instructions: Vec<String>,

        /// Write the resulting document here.
        #[arg(long)]
        out: Option<PathBuf>,

        /// Undo this many steps after applying.
        #[arg(long, default_value_t = 0)]
        undo: usize,

        /// Save the result through auto-save. Without a persistence URL the
        /// save is a dry run against an in-memory store.
        #[arg(long)]
        save: bool,

        /// Persistence service base URL.
        #[arg(long, env = "EASEL_PERSISTENCE_URL")]
        persistence_url: Option<String>,

        /// Auto-save debounce in milliseconds.
        #[arg(long, env = "EASEL_DEBOUNCE_MS")]
        debounce_ms: Option<u64>,
    },

    /// Print a blank document.
    New {
        /// Document title.
        #[arg(long, default_value = "Untitled")]
        title: String,

        /// Page width in pixels.
        #[arg(long, requires = "height")]
        width: Option<f64>,

        /// Page height in pixels.
        #[arg(long, requires = "width")]
        height: Option<f64>,
    },
}

/// Initialize structured tracing with optional JSON format.
///
/// Set `RUST_LOG` to control log levels (default: warn,easel_core=info,easel_sync=info).
/// Set `RUST_LOG_FORMAT=json` for JSON output.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,easel_core=info,easel_sync=info"));

    // Logs go to stderr so stdout stays parseable JSON.
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true);

    if std::env::var("RUST_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let output = match cli.command {
        Commands::Engines => json!(default_registry().names()),
        Commands::Render { ref document, page } => {
            let doc = read_document(document)?;
            render(doc, &cli.engine, page)?
        }
        Commands::Apply {
            ref document,
            ref instructions,
            ref out,
            undo,
            save,
            ref persistence_url,
            debounce_ms,
        } => {
            let doc = read_document(document)?;
            let config = EditorConfig {
                history_limit: cli.history_limit,
            };
            let context = editor(doc, &cli.engine, config)?;
            let persistence = if save {
                Some(persistence(persistence_url.as_deref())?)
            } else {
                None
            };
            let debounce = debounce_ms.map_or(DEFAULT_DEBOUNCE, Duration::from_millis);
            let report = apply(context, instructions, undo, persistence, debounce).await?;
            if let Some(path) = out {
                write_document(path, &report.document)?;
            }
            report.to_json()?
        }
        Commands::New {
            title,
            width,
            height,
        } => serde_json::to_value(blank_document(&title, width.zip(height))?)?,
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn read_document(path: &Path) -> anyhow::Result<Document> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let doc = Document::from_json(&raw)
        .with_context(|| format!("{} is not a document", path.display()))?;
    Ok(doc)
}

fn write_document(path: &Path, doc: &Document) -> anyhow::Result<()> {
    std::fs::write(path, doc.to_json()?)
        .with_context(|| format!("failed to write {}", path.display()))
}

fn editor(doc: Document, engine: &str, config: EditorConfig) -> anyhow::Result<EditorContext> {
    let adapter = create_adapter(&default_registry(), engine);
    EditorContext::new(doc, adapter, config).context("document failed validation")
}

fn persistence(url: Option<&str>) -> anyhow::Result<Arc<dyn PersistenceApi>> {
    match url {
        Some(url) => Ok(Arc::new(HttpPersistence::new(url)?)),
        None => {
            tracing::info!("No persistence URL configured, saving to memory");
            Ok(Arc::new(MemoryPersistence::new()))
        }
    }
}

fn blank_document(title: &str, size: Option<(f64, f64)>) -> anyhow::Result<Document> {
    match size {
        Some((width, height)) => {
            let page = Page::new("Page 1", width, height);
            Ok(Document::from_pages(DocumentId::new(), title, vec![page])?)
        }
        None => Ok(Document::new(title)),
    }
}

fn render(doc: Document, engine: &str, page: usize) -> anyhow::Result<Value> {
    let page_id = doc
        .pages()
        .get(page)
        .map(|p| p.id.clone())
        .with_context(|| format!("document has no page {page}"))?;
    let mut context = editor(doc, engine, EditorConfig::default())?;
    context.set_active_page(&page_id)?;
    Ok(context.adapter().native_json()?)
}

struct ApplyReport {
    document: Document,
    scene: Value,
    engine: &'static str,
    history_depth: usize,
    autosave: Option<Value>,
}

impl ApplyReport {
    fn to_json(&self) -> anyhow::Result<Value> {
        Ok(json!({
            "engine": self.engine,
            "version": self.document.version(),
            "historyDepth": self.history_depth,
            "document": serde_json::to_value(&self.document)?,
            "scene": self.scene,
            "autosave": self.autosave,
        }))
    }
}

async fn apply(
    context: EditorContext,
    instructions: &[String],
    undo: usize,
    persistence: Option<Arc<dyn PersistenceApi>>,
    debounce: Duration,
) -> anyhow::Result<ApplyReport> {
    let mut session = EditorSession::new(context);
    if let Some(api) = persistence {
        let config = AutosaveConfig::default().with_debounce(debounce);
        session = session.with_autosave(AutosaveHandle::spawn(api, config));
    }

    for instruction in instructions {
        let receipts = session
            .run_instruction(instruction)
            .with_context(|| format!("instruction failed: {instruction}"))?;
        tracing::info!(instruction = %instruction, commands = receipts.len(), "Applied");
    }
    for _ in 0..undo {
        if !session.undo()? {
            tracing::warn!("Nothing left to undo");
            break;
        }
    }

    let autosave = match session.autosave() {
        Some(handle) => Some(serde_json::to_value(handle.flush().await)?),
        None => None,
    };
    let context = session.context();
    let report = ApplyReport {
        document: context.document().clone(),
        scene: context.adapter().native_json()?,
        engine: context.adapter().engine_name(),
        history_depth: context.history().past_len(),
        autosave,
    };
    session.shutdown().await;
    Ok(report)
}
