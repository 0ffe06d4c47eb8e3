use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use bubbleforce::io::FormatRegistry;
use bubbleforce::{BubbleLayout, ChartConfig, FramePacer, LayoutMode, LayoutSnapshot, RawRecord};

/// Force-directed layout for bubble charts.
#[derive(Parser)]
#[command(name = "bubbleforce")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the simulation to convergence and write the final layout
    Layout {
        /// Input records (.json, .yaml)
        #[arg(short, long)]
        input: PathBuf,

        /// Chart configuration (.yaml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output file (.json, .yaml); stdout as JSON when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Layout mode
        #[arg(short, long, value_enum, default_value_t = ModeArg::Grouped)]
        mode: ModeArg,

        /// Upper bound on simulation ticks
        #[arg(long, default_value = "1000")]
        max_ticks: usize,

        /// Seed for initial positions (overrides the config)
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Stream one JSON line of node positions per frame until the layout settles
    Animate {
        /// Input records (.json, .yaml)
        #[arg(short, long)]
        input: PathBuf,

        /// Chart configuration (.yaml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Frames per second
        #[arg(long, default_value = "60")]
        fps: u32,

        /// After settling grouped, split by group and settle again
        #[arg(long)]
        split: bool,

        /// Seed for initial positions (overrides the config)
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum ModeArg {
    Grouped,
    Split,
}

impl From<ModeArg> for LayoutMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Grouped => LayoutMode::Grouped,
            ModeArg::Split => LayoutMode::SplitByGroup,
        }
    }
}

#[derive(Serialize)]
struct FramePoint<'a> {
    id: &'a str,
    x: f64,
    y: f64,
    r: f64,
}

#[derive(Serialize)]
struct Frame<'a> {
    frame: u64,
    nodes: Vec<FramePoint<'a>>,
}

fn load_config(path: Option<&Path>, seed: Option<u64>) -> anyhow::Result<ChartConfig> {
    let mut config = match path {
        Some(path) => ChartConfig::from_yaml_path(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => ChartConfig::default(),
    };
    if seed.is_some() {
        config.seed = seed;
    }
    Ok(config)
}

fn read_records(registry: &FormatRegistry, input: &Path) -> anyhow::Result<Vec<RawRecord>> {
    let reader = registry.reader_for_path(input)?;
    let records = reader
        .read(input)
        .with_context(|| format!("reading records from {}", input.display()))?;
    info!(count = records.len(), input = %input.display(), "records loaded");
    Ok(records)
}

fn write_snapshot(
    registry: &FormatRegistry,
    snapshot: &LayoutSnapshot,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            registry.writer_for_path(path)?.write(snapshot, path)?;
            info!(output = %path.display(), "layout written");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            serde_json::to_writer_pretty(&mut stdout, snapshot)?;
            writeln!(stdout)?;
        }
    }
    Ok(())
}

fn layout(
    input: &Path,
    config: Option<&Path>,
    output: Option<&Path>,
    mode: LayoutMode,
    max_ticks: usize,
    seed: Option<u64>,
) -> anyhow::Result<()> {
    let registry = FormatRegistry::with_defaults();
    let records = read_records(&registry, input)?;

    let mut layout = BubbleLayout::new(load_config(config, seed)?);
    layout.load(&records)?;
    if mode != layout.mode() {
        layout.set_layout_mode(mode);
    }

    let ticks = layout.simulation_mut().run(max_ticks);
    if layout.simulation().is_running() {
        warn!(max_ticks, alpha = layout.simulation().alpha(), "stopped before convergence");
    }
    info!(ticks, mode = %layout.mode(), "layout finished");

    write_snapshot(&registry, &layout.snapshot(), output)
}

async fn animate(
    input: &Path,
    config: Option<&Path>,
    fps: u32,
    split: bool,
    seed: Option<u64>,
) -> anyhow::Result<()> {
    let registry = FormatRegistry::with_defaults();
    let records = read_records(&registry, input)?;

    let mut layout = BubbleLayout::new(load_config(config, seed)?);
    layout.load(&records)?;

    let mut frame = 0;
    layout.simulation_mut().on_tick(move |nodes| {
        frame += 1;
        let line = Frame {
            frame,
            nodes: nodes
                .iter()
                .map(|n| FramePoint {
                    id: n.id(),
                    x: n.x,
                    y: n.y,
                    r: n.radius(),
                })
                .collect(),
        };

        let mut stdout = std::io::stdout().lock();
        let written = serde_json::to_writer(&mut stdout, &line)
            .map_err(std::io::Error::from)
            .and_then(|()| writeln!(stdout));
        if let Err(e) = written {
            warn!(error = %e, "failed to write frame");
        }
    });

    let layout = Arc::new(Mutex::new(layout));
    let pacer = FramePacer::at_fps(fps).until_parked();

    let stats = pacer.spawn(Arc::clone(&layout)).join().await?;
    info!(frames = stats.frames, steps = stats.steps, "grouped layout settled");

    if split {
        layout
            .lock()
            .map_err(|_| anyhow::anyhow!("layout lock poisoned"))?
            .set_layout_mode(LayoutMode::SplitByGroup);

        let stats = pacer.spawn(Arc::clone(&layout)).join().await?;
        info!(frames = stats.frames, steps = stats.steps, "split layout settled");
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Layout {
            input,
            config,
            output,
            mode,
            max_ticks,
            seed,
        } => {
            layout(
                &input,
                config.as_deref(),
                output.as_deref(),
                mode.into(),
                max_ticks,
                seed,
            )?;
        }
        Commands::Animate {
            input,
            config,
            fps,
            split,
            seed,
        } => {
            animate(&input, config.as_deref(), fps, split, seed).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_layout_with_defaults() {
        let cli = Cli::try_parse_from(["bubbleforce", "layout", "--input", "records.json"]).unwrap();
        match cli.command {
            Commands::Layout {
                input,
                config,
                output,
                mode,
                max_ticks,
                seed,
            } => {
                assert_eq!(input, PathBuf::from("records.json"));
                assert!(config.is_none());
                assert!(output.is_none());
                assert_eq!(mode, ModeArg::Grouped);
                assert_eq!(max_ticks, 1000);
                assert!(seed.is_none());
            }
            _ => panic!("Expected Layout command"),
        }
    }

    #[test]
    fn cli_parses_layout_options() {
        let cli = Cli::try_parse_from([
            "bubbleforce",
            "layout",
            "-i",
            "records.yaml",
            "-c",
            "chart.yaml",
            "-o",
            "out.json",
            "--mode",
            "split",
            "--max-ticks",
            "50",
            "--seed",
            "9",
        ])
        .unwrap();
        match cli.command {
            Commands::Layout {
                config,
                output,
                mode,
                max_ticks,
                seed,
                ..
            } => {
                assert_eq!(config, Some(PathBuf::from("chart.yaml")));
                assert_eq!(output, Some(PathBuf::from("out.json")));
                assert_eq!(LayoutMode::from(mode), LayoutMode::SplitByGroup);
                assert_eq!(max_ticks, 50);
                assert_eq!(seed, Some(9));
            }
            _ => panic!("Expected Layout command"),
        }
    }

    #[test]
    fn cli_parses_animate_subcommand() {
        let cli = Cli::try_parse_from([
            "bubbleforce",
            "animate",
            "--input",
            "records.json",
            "--fps",
            "30",
            "--split",
        ])
        .unwrap();
        match cli.command {
            Commands::Animate { fps, split, .. } => {
                assert_eq!(fps, 30);
                assert!(split);
            }
            _ => panic!("Expected Animate command"),
        }
    }

    #[test]
    fn cli_rejects_unknown_mode() {
        assert!(
            Cli::try_parse_from(["bubbleforce", "layout", "-i", "r.json", "--mode", "diagonal"])
                .is_err()
        );
    }

    #[test]
    fn cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["bubbleforce"]).is_err());
    }
}
