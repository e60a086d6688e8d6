use anyhow::{bail, Context, Result};
use chrono::{TimeZone, Utc};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

use capture_inbox::config;
use capture_inbox::decompose::{Decomposer, GeminiClient};
use capture_inbox::{
    CaptureFilter, CaptureInbox, CaptureItem, CapturePatch, CaptureSource, CaptureStatus,
    NewCapture, PromotionTarget,
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Capture quick notes and triage them later")]
struct Args {
    /// Path to YAML config file (defaults apply when the file is absent)
    #[arg(long, default_value = "capture-inbox.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Capture text (source: text, paste, meeting, voice)
    Add {
        #[arg(value_parser = parse_source)]
        source: CaptureSource,
        text: String,
    },
    /// Capture a photo by reference
    Photo { path: PathBuf },
    /// List captures, newest first
    List {
        #[arg(long, value_parser = parse_status)]
        status: Option<CaptureStatus>,
        /// Print JSON instead of one line per item
        #[arg(long)]
        json: bool,
    },
    /// Print the number of unreviewed captures
    Count,
    /// Show one capture as JSON
    Show { id: String },
    /// Attach a transcript to a capture
    Transcript { id: String, text: String },
    /// Promote a capture to a task or a note
    Promote {
        id: String,
        #[arg(value_parser = parse_target)]
        to: PromotionTarget,
    },
    /// Mark a capture as discarded
    Discard { id: String },
    /// Permanently remove a capture
    Delete { id: String },
    /// Permanently remove every discarded capture
    ClearDiscarded,
    /// Break a task into subtasks
    Decompose { task: String },
}

fn parse_source(s: &str) -> Result<CaptureSource, String> {
    CaptureSource::parse_source(s).ok_or_else(|| format!("unknown source '{s}'"))
}

fn parse_status(s: &str) -> Result<CaptureStatus, String> {
    CaptureStatus::parse_status(s).ok_or_else(|| format!("unknown status '{s}'"))
}

fn parse_target(s: &str) -> Result<PromotionTarget, String> {
    PromotionTarget::parse_target(s).ok_or_else(|| format!("expected 'task' or 'note', got '{s}'"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load_or_default(&args.config)?;
    cfg.ensure_dirs()?;

    let inbox = CaptureInbox::open(&cfg).context("failed to open capture store")?;
    let badge = inbox.subscribe(|count| {
        debug!(count, "unreviewed captures");
        Ok(())
    });

    match args.command {
        Command::Add { source, text } => {
            let input = NewCapture::text(source, &text)?;
            report_saved(&inbox.save(input))?;
        }
        Command::Photo { path } => {
            let size = std::fs::metadata(&path)
                .with_context(|| format!("cannot read {}", path.display()))?
                .len();
            let limit = cfg.app.max_attachment_bytes;
            if size > limit as u64 {
                bail!(
                    "photo is too large ({:.1} MB); limit is {:.1} MB",
                    size as f64 / 1_048_576.0,
                    limit as f64 / 1_048_576.0
                );
            }
            let abs = path.canonicalize()?;
            let label = abs
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| abs.display().to_string());
            let input = NewCapture::photo(&label, format!("file://{}", abs.display()), limit)?;
            report_saved(&inbox.save(input))?;
        }
        Command::List { status, json } => {
            let filter = CaptureFilter { status };
            let items = inbox.get_all(filter);
            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else {
                for item in &items {
                    println!("{}", render_line(item));
                }
            }
        }
        Command::Count => println!("{}", inbox.unreviewed_count()),
        Command::Show { id } => match inbox.get(&id) {
            Some(item) => println!("{}", serde_json::to_string_pretty(&item)?),
            None => bail!("no capture with id {id}"),
        },
        Command::Transcript { id, text } => {
            require(&inbox, &id)?;
            inbox.update(&id, CapturePatch::transcript(text));
        }
        Command::Promote { id, to } => {
            let item = require(&inbox, &id)?;
            if !item.is_unreviewed() {
                bail!("capture {id} is already {}", item.status);
            }
            inbox.promote(&id, to);
            info!(id = %id, to = to.as_str(), "promoted");
        }
        Command::Discard { id } => {
            let item = require(&inbox, &id)?;
            if !item.is_unreviewed() {
                bail!("capture {id} is already {}", item.status);
            }
            inbox.discard(&id);
        }
        Command::Delete { id } => {
            require(&inbox, &id)?;
            inbox.delete(&id);
        }
        Command::ClearDiscarded => inbox.clear_discarded(),
        Command::Decompose { task } => {
            let client = GeminiClient::from_config(&cfg)?;
            let decomposer = Decomposer::new(client)
                .with_timeout(Duration::from_millis(cfg.decompose.timeout_ms));
            for subtask in decomposer.decompose(&task).await {
                println!("- {subtask}");
            }
        }
    }

    badge.unsubscribe();
    Ok(())
}

fn require(inbox: &CaptureInbox, id: &str) -> Result<CaptureItem> {
    inbox
        .get(id)
        .with_context(|| format!("no capture with id {id}"))
}

fn report_saved(item: &CaptureItem) -> Result<()> {
    if let Some(err) = &item.sync_error {
        bail!("capture was not saved: {err}");
    }
    println!("{}", item.id);
    Ok(())
}

fn render_line(item: &CaptureItem) -> String {
    let when = Utc
        .timestamp_millis_opt(item.created_at)
        .single()
        .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| item.created_at.to_string());
    let mut line = format!(
        "{}  {:<10} {:<7} {}  {}",
        item.id,
        item.status.as_str(),
        item.source.as_str(),
        when,
        item.raw
    );
    if let Some(to) = item.promoted_to {
        line.push_str(&format!("  -> {}", to.as_str()));
    }
    line
}
