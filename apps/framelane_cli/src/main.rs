//! Command-line front end for inspecting and editing timeline templates.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use framelane_core::config::{preset_by_name, EngineConfig};
use framelane_core::surface::TimelineViewport;
use framelane_core::types::{Frame, OverlayContent, OverlayKind};
use framelane_core::{Editor, Template};
use framelane_render::InputProps;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "framelane")]
#[command(about = "Timeline layout and overlap tools for overlay templates")]
#[command(version)]
struct Cli {
    /// Engine config (JSON). Defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print rows, overlays, total duration, and overlaps
    Inspect {
        template: PathBuf,
    },

    /// Push overlapping overlays apart and write the result
    Normalize {
        template: PathBuf,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print the render input props as JSON
    Props {
        template: PathBuf,

        /// Composition preset (1080p, 1080p60, 720p, 4k, shorts)
        #[arg(long)]
        preset: Option<String>,
    },

    /// Insert a blank overlay in the first free slot
    Place {
        template: PathBuf,

        /// Overlay type, e.g. video, text, sound
        #[arg(long, value_parser = parse_kind)]
        kind: OverlayKind,

        /// Length in frames
        #[arg(long)]
        duration: Frame,

        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    tracing::debug!(max_rows = config.max_rows, policy = ?config.overlap_policy, "config loaded");

    match cli.command {
        Commands::Inspect { template } => inspect(&template, config)?,
        Commands::Normalize { template, output } => normalize(&template, &output, config)?,
        Commands::Props { template, preset } => props(&template, preset.as_deref(), config)?,
        Commands::Place {
            template,
            kind,
            duration,
            output,
        } => place(&template, kind, duration, &output, config)?,
    }

    Ok(())
}

fn parse_kind(s: &str) -> std::result::Result<OverlayKind, String> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|_| format!("unknown overlay type '{s}'"))
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(EngineConfig::default()),
    }
}

/// Load a template into a fresh editing session.
fn open(path: &Path, config: EngineConfig) -> Result<(Template, Editor)> {
    let template = Template::load_from_file(path)
        .with_context(|| format!("Failed to load template {}", path.display()))?;
    let mut editor = Editor::new(config, TimelineViewport::new(1000.0, 40.0));
    editor
        .apply_template(&template)
        .context("Failed to apply template")?;
    Ok((template, editor))
}

fn inspect(path: &Path, config: EngineConfig) -> Result<()> {
    let (template, editor) = open(path, config)?;
    let store = editor.store();
    let fps = editor.config().composition.fps;

    println!(
        "{} ({} overlays, {} frames, {:.2}s @ {} fps)",
        template.name,
        store.len(),
        store.total_duration(),
        store.total_duration() as f64 / fps,
        fps
    );
    for row in 0..store.max_rows() {
        let mut items: Vec<_> = store.overlays().iter().filter(|o| o.row == row).collect();
        items.sort_by_key(|o| o.from);
        let cells: Vec<String> = items
            .iter()
            .map(|o| format!("{} {} [{}, {})", o.id, o.kind(), o.from, o.end()))
            .collect();
        println!("row {row}: {}", cells.join("  "));
    }

    let overlaps = store.find_overlaps();
    if overlaps.is_empty() {
        println!("no overlaps");
    } else {
        tracing::warn!(count = overlaps.len(), "template has overlapping overlays");
        for (a, b) in overlaps {
            println!("overlap: {a} / {b}");
        }
    }
    Ok(())
}

fn normalize(path: &Path, output: &Path, config: EngineConfig) -> Result<()> {
    let (template, mut editor) = open(path, config)?;
    let moved = editor.normalize()?;
    let written = template
        .refreshed(editor.store())
        .save_to_file(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    tracing::info!(moved, path = %written.display(), "normalized template written");
    println!("moved {moved} overlays, wrote {}", written.display());
    Ok(())
}

fn props(path: &Path, preset: Option<&str>, config: EngineConfig) -> Result<()> {
    let composition = match preset {
        Some(name) => match preset_by_name(name) {
            Some(settings) => settings,
            None => bail!("Unknown preset '{name}'"),
        },
        None => config.composition,
    };
    tracing::debug!(
        width = composition.width,
        height = composition.height,
        fps = composition.fps,
        "composition"
    );
    let (_, editor) = open(path, config)?;
    let props = InputProps::from_store(editor.store(), &composition);
    println!("{}", props.to_json()?);
    Ok(())
}

fn place(
    path: &Path,
    kind: OverlayKind,
    duration: Frame,
    output: &Path,
    config: EngineConfig,
) -> Result<()> {
    if duration < 1 {
        bail!("Duration must be at least one frame");
    }
    let (template, mut editor) = open(path, config)?;
    let Some(id) = editor.insert(OverlayContent::blank(kind), duration)? else {
        bail!("No rows available");
    };
    let placed = editor
        .store()
        .get(id)
        .context("Placed overlay missing from store")?;
    println!("placed {id} on row {} at frame {}", placed.row, placed.from);

    let written = template
        .refreshed(editor.store())
        .save_to_file(output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    tracing::info!(%id, path = %written.display(), "template with placed overlay written");
    Ok(())
}
