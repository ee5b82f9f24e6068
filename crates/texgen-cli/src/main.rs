//! texgen CLI - interference check, correction and ABAQUS export
//!
//! Textiles are described in TOML or JSON files (see `TextileConfig`).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use texgen_abaqus::{AssemblyExporter, ExportSettings};
use texgen_adjust::{AdjustSettings, InterferenceResolver};
use texgen_textile::{Textile, TextileConfig};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "texgen")]
#[command(about = "Yarn interference correction and ABAQUS export", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress all log output
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Report interference between the yarns of a textile
    Check {
        /// Textile description (.toml or .json)
        textile: PathBuf,
    },
    /// Correct interference and report node displacements
    Adjust {
        /// Textile description (.toml or .json)
        textile: PathBuf,
        /// Interference depth accepted without correction
        #[arg(short, long, default_value_t = 1e-4)]
        tolerance: f64,
        /// Print statistics as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write an ABAQUS input file
    Export {
        /// Textile description (.toml or .json)
        textile: PathBuf,
        /// Output .inp file
        output: PathBuf,
        /// Export settings (.toml or .json)
        #[arg(short, long)]
        settings: Option<PathBuf>,
        /// Correct interference before export
        #[arg(long)]
        adjust: bool,
        /// Rebuild the meshes from the corrected sections
        #[arg(long)]
        regenerate: bool,
        /// Interference depth accepted without correction
        #[arg(short, long)]
        tolerance: Option<f64>,
    },
}

/// Initialize the tracing subscriber based on verbosity level.
fn init_tracing(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    // RUST_LOG wins over -v flags
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match verbose {
            0 => "warn",
            1 => "texgen_adjust=info,texgen_abaqus=info,texgen_textile=info",
            2 => "texgen_adjust=debug,texgen_abaqus=debug,texgen_textile=debug",
            _ => "trace",
        };
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Check { textile } => check(&textile),
        Commands::Adjust {
            textile,
            tolerance,
            json,
        } => adjust(&textile, tolerance, json),
        Commands::Export {
            textile,
            output,
            settings,
            adjust,
            regenerate,
            tolerance,
        } => {
            let mut settings = match settings {
                Some(path) => load_settings(&path)?,
                None => ExportSettings::default(),
            };
            settings.adjust_mesh |= adjust;
            settings.regenerate_mesh |= regenerate;
            if let Some(tolerance) = tolerance {
                settings.tolerance = tolerance;
            }
            export(&textile, &output, &settings)
        }
    }
}

fn load_textile(path: &Path) -> Result<Textile> {
    let config = TextileConfig::from_path(path)
        .with_context(|| format!("failed to read textile {}", path.display()))?;
    let textile = config
        .build()
        .with_context(|| format!("invalid textile {}", path.display()))?;
    info!(
        name = textile.name(),
        yarns = textile.num_yarns(),
        "loaded textile"
    );
    Ok(textile)
}

fn load_settings(path: &Path) -> Result<ExportSettings> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read settings {}", path.display()))?;
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    let settings: ExportSettings = if is_json {
        serde_json::from_str(&text).with_context(|| format!("invalid settings {}", path.display()))?
    } else {
        toml::from_str(&text).with_context(|| format!("invalid settings {}", path.display()))?
    };
    settings.validate()?;
    Ok(settings)
}

fn check(path: &Path) -> Result<()> {
    let textile = load_textile(path)?;
    let reports = textile.detect_interference();
    let inside: Vec<_> = reports.iter().filter(|r| r.depth < 0.0).collect();

    println!("Textile: {}", textile.name());
    println!("Yarns: {}", textile.num_yarns());
    println!("Interfering points: {}", inside.len());
    if let Some(worst) = inside.iter().min_by(|a, b| a.depth.total_cmp(&b.depth)) {
        println!(
            "Worst depth: {:.6} (yarn {} at {:.4}, {:.4}, {:.4})",
            -worst.depth, worst.yarn, worst.point.x, worst.point.y, worst.point.z
        );
    }
    Ok(())
}

#[derive(Serialize)]
struct YarnDisplacement {
    yarn: usize,
    moved_nodes: usize,
    max_displacement: f64,
    mean_displacement: f64,
}

#[derive(Serialize)]
struct AdjustReport {
    intersections: usize,
    passes: usize,
    yarns: Vec<YarnDisplacement>,
}

fn adjust(path: &Path, tolerance: f64, json: bool) -> Result<()> {
    let textile = load_textile(path)?;
    let mut meshes = InterferenceResolver::create_volume_meshes(&textile)?;
    let mut resolver = InterferenceResolver::with_settings(AdjustSettings {
        tolerance,
        ..Default::default()
    });
    resolver
        .adjust_mesh(&textile, &mut meshes, tolerance)
        .context("interference correction failed")?;

    let yarns = (0..textile.num_yarns())
        .map(|yarn| {
            let moved: Vec<f64> = resolver
                .node_displacements(yarn)
                .iter()
                .map(|d| d.norm())
                .filter(|&d| d > 0.0)
                .collect();
            let max = moved.iter().copied().fold(0.0, f64::max);
            let mean = if moved.is_empty() {
                0.0
            } else {
                moved.iter().sum::<f64>() / moved.len() as f64
            };
            YarnDisplacement {
                yarn,
                moved_nodes: moved.len(),
                max_displacement: max,
                mean_displacement: mean,
            }
        })
        .collect();
    let report = AdjustReport {
        intersections: resolver.intersections().len(),
        passes: resolver.passes(),
        yarns,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    println!("Intersections: {}", report.intersections);
    println!("Refinement passes: {}", report.passes);
    for y in &report.yarns {
        println!(
            "Yarn {}: {} nodes moved, max {:.6}, mean {:.6}",
            y.yarn, y.moved_nodes, y.max_displacement, y.mean_displacement
        );
    }
    Ok(())
}

fn export(path: &Path, output: &Path, settings: &ExportSettings) -> Result<()> {
    let mut textile = load_textile(path)?;
    let mut exporter = AssemblyExporter::new();
    exporter
        .create_abaqus_input_file(&mut textile, output, settings)
        .with_context(|| format!("failed to export {}", output.display()))?;
    println!("Exported ABAQUS input to {}", output.display());
    Ok(())
}
