use anyhow::{Context, Result};
use clap::Parser;
use eventflow_core::{LayoutPosition, NodeEdit};
use eventflow_session::{GraphSession, RenderOptions, SessionConfig, export_snapshot, load_event_log};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Event log as a JSON array of rows
    #[arg(short, long)]
    log: PathBuf,

    /// Session configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Node edits (JSON array) to apply before rendering
    #[arg(short, long)]
    edits: Option<PathBuf>,

    /// Manual node positions (JSON array)
    #[arg(long)]
    layout: Option<PathBuf>,

    /// Rebuild metrics from the log after applying the edits
    #[arg(short, long)]
    recalculate: bool,

    /// Write the payload into the experiments folder instead of stdout
    #[arg(long)]
    export: bool,

    #[arg(long)]
    width: Option<f64>,

    #[arg(long)]
    height: Option<f64>,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SessionConfig::load(path)?,
        None => SessionConfig::default(),
    };
    if let Some(width) = args.width {
        config.canvas.width = width;
    }
    if let Some(height) = args.height {
        config.canvas.height = height;
    }

    let log = load_event_log(&args.log, &config)?;
    let mut session = GraphSession::from_config(&config, log);
    tracing::info!(
        "Session ready with {} nodes and {} edges",
        session.nodes().len(),
        session.edges().len()
    );

    if let Some(path) = &args.layout {
        let positions: Vec<LayoutPosition> = read_json(path)?;
        session.apply_layout_edits(&positions);
    }

    if let Some(path) = &args.edits {
        let edits: Vec<NodeEdit> = read_json(path)?;
        if args.recalculate {
            session
                .recalculate(&edits)
                .context("Recalculation failed")?;
        } else {
            session.apply_node_edits(&edits);
        }
    } else if args.recalculate {
        session.recalculate(&[]).context("Recalculation failed")?;
    }

    let rendered = session
        .render(&RenderOptions {
            canvas: config.canvas,
            ..Default::default()
        })
        .context("Render failed")?;

    if args.export {
        let path = export_snapshot(&config.experiments_folder, &rendered)?;
        println!("{}", path.display());
    } else {
        println!("{}", serde_json::to_string_pretty(&rendered)?);
    }

    Ok(())
}
