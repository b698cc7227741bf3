//! MediPredict: Multi-disease risk assessment
//!
//! Main entry point for the command-line application.
//!
//! ```text
//! medipredict assess --user <id> [--input <file.json>]
//! medipredict history --user <id> [--offset <n>] [--limit <n>]
//! ```
//!
//! Results are printed to stdout as JSON. Logs go to stderr or a file.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use medipredict::adapters::forest::ForestModel;
use medipredict::adapters::sanitize::SanitizingMakeWriter;
use medipredict::adapters::sqlite::SqliteHistoryStore;
use medipredict::application::{AssessmentService, HistoryView};
use medipredict::config::{AppConfig, LogMode};
use medipredict::ports::HistoryStore;
use medipredict::RawHealthInput;

enum Command {
    Assess {
        user_id: String,
        input: Option<PathBuf>,
    },
    History {
        user_id: String,
        offset: usize,
        limit: Option<usize>,
    },
}

fn usage() -> String {
    "Usage:\n  medipredict assess --user <id> [--input <file.json>]\n  medipredict history --user <id> [--offset <n>] [--limit <n>]".to_string()
}

fn parse_args() -> Result<Command> {
    let mut args = std::env::args().skip(1);
    let command = args.next().unwrap_or_default();

    let mut user_id: Option<String> = None;
    let mut input: Option<PathBuf> = None;
    let mut offset = 0usize;
    let mut limit: Option<usize> = None;

    while let Some(arg) = args.next() {
        let mut value = || args.next().with_context(usage);
        match arg.as_str() {
            "--user" => user_id = Some(value()?),
            "--input" => input = Some(PathBuf::from(value()?)),
            "--offset" => offset = value()?.parse().context("--offset must be a number")?,
            "--limit" => limit = Some(value()?.parse().context("--limit must be a number")?),
            "-h" | "--help" => bail!(usage()),
            other => bail!("Unknown argument {other:?}\n{}", usage()),
        }
    }

    let user_id = user_id.with_context(usage)?;
    match command.as_str() {
        "assess" => Ok(Command::Assess { user_id, input }),
        "history" => Ok(Command::History {
            user_id,
            offset,
            limit,
        }),
        _ => bail!(usage()),
    }
}

fn read_input(path: Option<&PathBuf>) -> Result<RawHealthInput> {
    let text = match path {
        Some(p) => std::fs::read_to_string(p).with_context(|| format!("Failed to read {p:?}"))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read input from stdin")?;
            buf
        }
    };
    serde_json::from_str(&text).context("Input is not a valid health record")
}

fn main() -> Result<()> {
    let command = parse_args()?;
    let config = AppConfig::from_env()?;

    // Initialize logging. Stdout carries command output, so logs never go there.
    let (writer, _guard) = match config.log_mode {
        LogMode::File => {
            if let Some(parent) = config.log_file.parent() {
                // Best-effort: don't fail startup just because the directory is missing.
                let _ = std::fs::create_dir_all(parent);
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&config.log_file)?;
            tracing_appender::non_blocking(file)
        }
        LogMode::Stderr => tracing_appender::non_blocking(std::io::stderr()),
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(SanitizingMakeWriter::new(writer)),
        )
        .init();

    tracing::info!("Starting MediPredict...");

    let store = Arc::new(
        SqliteHistoryStore::new(&config.db_path)
            .with_context(|| format!("Failed to open history database {:?}", config.db_path))?,
    );

    let output = match command {
        Command::Assess { user_id, input } => {
            let model = ForestModel::load(&config.model_path)
                .with_context(|| format!("Failed to load risk model from {:?}", config.model_path))?;
            let service = AssessmentService::new(Arc::new(model), store, config.assessment.clone());
            let input = read_input(input.as_ref())?;
            let outcome = service.assess(&user_id, input)?;
            serde_json::to_string_pretty(&outcome)?
        }
        Command::History {
            user_id,
            offset,
            limit,
        } => {
            let limit = limit.unwrap_or(config.assessment.history_limit);
            if limit == 0 {
                bail!("--limit must be positive");
            }
            let page = store.page(&user_id, offset, limit)?;
            let view = HistoryView::from_page(page, config.assessment.display_offset_minutes);
            serde_json::to_string_pretty(&view)?
        }
    };

    println!("{output}");
    tracing::info!("MediPredict done.");
    Ok(())
}
