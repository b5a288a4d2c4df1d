//! stripspace command-line interface.
//!
//! Resolves space points from JSON event files and writes them as CSV or
//! binary records.
#![allow(clippy::uninlined_format_args, clippy::too_many_lines)]

use clap::{Parser, Subcommand};
use log::{debug, info, warn};
use nalgebra::Vector3;
use std::path::PathBuf;
use std::time::Instant;
use stripspace_algorithms::build_space_points;
use stripspace_core::{PairingStrategy, SpacePointBuilderConfig, SpacePointStatistics};
use stripspace_io::{load_config, EventFileReader, SpacePointWriter};
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    StripspaceIo(#[from] stripspace_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] stripspace_core::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Output encoding, chosen from the output file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Csv,
    Binary,
}

impl OutputFormat {
    fn from_path(path: &std::path::Path) -> Self {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase);
        match ext.as_deref() {
            Some("csv") => Self::Csv,
            Some("bin" | "dat") => Self::Binary,
            other => {
                warn!(
                    "unknown output extension {:?}, defaulting to binary",
                    other.unwrap_or("")
                );
                Self::Binary
            }
        }
    }
}

/// Space point reconstruction from pairs of strip detector hits.
#[derive(Parser)]
#[command(name = "stripspace")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the space points of every event in a file
    Process {
        /// Input event file (JSON)
        input: PathBuf,

        /// Output file path (.csv or .bin)
        #[arg(short, long)]
        output: PathBuf,

        /// Builder configuration file (JSON); flags below override it
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Assumed vertex position as x,y,z
        #[arg(long, value_parser = parse_vertex, allow_hyphen_values = true)]
        vertex: Option<[f64; 3]>,

        /// Resolve without a vertex constraint
        #[arg(long)]
        perp_proj: bool,

        /// Tolerated overrun past the strip ends, as a fraction of the half-length
        #[arg(long)]
        strip_length_tolerance: Option<f64>,

        /// Tolerated overrun attributed to the gap between the layers
        #[arg(long)]
        gap_tolerance: Option<f64>,

        /// Keep only the closest second-layer candidate per first-layer hit
        #[arg(long)]
        closest_match: bool,

        /// Evaluate candidate pairs in parallel
        #[arg(long)]
        parallel: bool,

        /// Print the summary counters as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show information about an event file
    Info {
        /// Input event file (JSON)
        input: PathBuf,
    },
}

fn parse_vertex(value: &str) -> std::result::Result<[f64; 3], String> {
    let coords = value
        .split(',')
        .map(|part| part.trim().parse::<f64>().map_err(|e| e.to_string()))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    <[f64; 3]>::try_from(coords)
        .map_err(|coords| format!("expected 3 coordinates, got {}", coords.len()))
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default)).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Process {
            input,
            output,
            config,
            vertex,
            perp_proj,
            strip_length_tolerance,
            gap_tolerance,
            closest_match,
            parallel,
            json,
        } => {
            let mut builder_config = match &config {
                Some(path) => load_config(path)?,
                None => SpacePointBuilderConfig::default(),
            };
            if let Some(v) = vertex {
                builder_config.vertex = Vector3::from(v);
            }
            if perp_proj {
                builder_config.use_perp_proj = true;
            }
            if let Some(value) = strip_length_tolerance {
                builder_config.strip_length_tolerance = value;
            }
            if let Some(value) = gap_tolerance {
                builder_config.strip_length_gap_tolerance = value;
            }
            if closest_match {
                builder_config.pairing = PairingStrategy::ClosestMatch;
            }
            if parallel {
                builder_config.parallel = true;
            }
            builder_config.validate()?;
            debug!("{:?}", builder_config);

            let start = Instant::now();
            let reader = EventFileReader::open(&input)?;
            let detector = reader.detector()?;
            info!(
                "{}: {} sensors, {} events",
                input.display(),
                detector.len(),
                reader.event_count()
            );

            let format = OutputFormat::from_path(&output);
            let mut writer = SpacePointWriter::create(&output)?;
            let mut totals = SpacePointStatistics::default();
            let mut total_hits = 0usize;

            for (index, event) in reader.events().iter().enumerate() {
                let result =
                    build_space_points(&event.first, &event.second, &detector, &builder_config)?;
                debug!(
                    "event {}: {} hits, {} space points",
                    index,
                    event.hit_count(),
                    result.space_points.len()
                );
                match format {
                    OutputFormat::Csv => writer.write_csv(index, &result.space_points)?,
                    OutputFormat::Binary => writer.write_binary(index, &result.space_points)?,
                }
                total_hits += event.hit_count();
                totals += result.statistics;
            }
            writer.flush()?;

            info!("wrote {}", output.display());
            if json {
                println!("{}", serde_json::to_string_pretty(&totals)?);
            } else {
                println!(
                    "Processed {} events in {:.2}s",
                    reader.event_count(),
                    start.elapsed().as_secs_f64()
                );
                println!("Total hits: {}", total_hits);
                println!("Pairs considered: {}", totals.pairs_considered);
                println!("Filtered out: {}", totals.filtered_out);
                println!("Degenerate: {}", totals.degenerate);
                println!("Rejected: {}", totals.rejected);
                println!(
                    "Space points: {} ({} recovered)",
                    totals.committed(),
                    totals.recovered
                );
            }
        }

        Commands::Info { input } => {
            let reader = EventFileReader::open(&input)?;
            let detector = reader.detector()?;
            let events = reader.events();

            println!("File: {}", input.display());
            println!("Sensors: {}", detector.len());
            println!("Events: {}", events.len());

            let hits: usize = events.iter().map(|e| e.hit_count()).sum();
            println!("Hits: {}", hits);

            if let Some(max) = events.iter().map(|e| e.first.len() * e.second.len()).max() {
                println!("Largest event: {} candidate pairs", max);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_vertex() {
        assert_eq!(parse_vertex("0,-10,0.5").unwrap(), [0.0, -10.0, 0.5]);
        assert_eq!(parse_vertex(" 1, 2 ,3").unwrap(), [1.0, 2.0, 3.0]);
        assert!(parse_vertex("1,2").is_err());
        assert!(parse_vertex("1,x,3").is_err());
    }

    #[test]
    fn test_output_format() {
        assert_eq!(
            OutputFormat::from_path(std::path::Path::new("out.CSV")),
            OutputFormat::Csv
        );
        assert_eq!(
            OutputFormat::from_path(std::path::Path::new("out.bin")),
            OutputFormat::Binary
        );
        assert_eq!(
            OutputFormat::from_path(std::path::Path::new("out")),
            OutputFormat::Binary
        );
    }

    #[test]
    fn test_cli_parses_process() {
        let cli = Cli::try_parse_from([
            "stripspace",
            "process",
            "events.json",
            "-o",
            "out.csv",
            "--vertex",
            "-1,0,2",
            "--closest-match",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Process {
                vertex,
                closest_match,
                perp_proj,
                ..
            } => {
                assert_eq!(vertex, Some([-1.0, 0.0, 2.0]));
                assert!(closest_match);
                assert!(!perp_proj);
            }
            Commands::Info { .. } => panic!("expected process"),
        }
    }
}
