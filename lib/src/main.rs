//! Raster slicer CLI - Command-line interface for the slicer library
//!
//! Usage:
//!   raster-slicer slice <input.stl> -o <output.gcode> [options]
//!   raster-slicer slice <input.stl> --config profile.json --format dxf
//!   raster-slicer info <input.stl>

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{info, LevelFilter};
use raster_slicer::config::{InfillPattern, OutputFormat, PrintConfig, PrinterKind};
use raster_slicer::mesh::{load_stl, prepare};
use raster_slicer::pipeline::{CancellationToken, Pass, SliceOutcome, SliceSession};
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

/// Slice triangle meshes into printer toolpaths through layer rasters
#[derive(Parser, Debug)]
#[command(name = "raster-slicer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Slice an STL file and write G-code or DXF
    Slice {
        /// Input STL file
        #[arg(value_name = "INPUT")]
        input: PathBuf,

        /// Output file (defaults to the input name with the format's extension)
        #[arg(short, long, value_name = "OUTPUT")]
        output: Option<PathBuf>,

        /// Output format (gcode, dxf); defaults to the printer's native format
        #[arg(long)]
        format: Option<String>,

        /// Print profile (JSON); command-line options override it
        #[arg(short, long, value_name = "CONFIG")]
        config: Option<PathBuf>,

        /// Printer kind (fdm, inkjet, laser-cutter)
        #[arg(long)]
        printer: Option<String>,

        /// Layer height in mm
        #[arg(long)]
        layer_height: Option<f64>,

        /// Nozzle diameter in mm
        #[arg(long)]
        nozzle: Option<f64>,

        /// Number of shells
        #[arg(long)]
        shells: Option<u32>,

        /// Number of solid layers under top and over bottom surfaces
        #[arg(long)]
        lids: Option<u32>,

        /// Infill density (0-100)
        #[arg(long)]
        infill_density: Option<u32>,

        /// Infill pattern (zigzag, concentric)
        #[arg(long)]
        infill_pattern: Option<String>,

        /// Generate supports
        #[arg(long)]
        support: bool,

        /// Support overhang angle threshold (degrees)
        #[arg(long)]
        support_angle: Option<f64>,

        /// Draw a skirt around the first layer
        #[arg(long)]
        skirt: Option<bool>,

        /// Raster resolution in pixels along the longer bed axis
        #[arg(long)]
        resolution: Option<u32>,

        /// Number of threads to use (0 = auto)
        #[arg(short = 'j', long, default_value = "0")]
        threads: usize,
    },

    /// Show mesh statistics and the repair report
    Info {
        /// Input STL file
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },
}

/// Command-line overrides for the print profile.
#[derive(Debug, Default)]
struct Overrides {
    printer: Option<String>,
    layer_height: Option<f64>,
    nozzle: Option<f64>,
    shells: Option<u32>,
    lids: Option<u32>,
    infill_density: Option<u32>,
    infill_pattern: Option<String>,
    support: bool,
    support_angle: Option<f64>,
    skirt: Option<bool>,
    resolution: Option<u32>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.debug {
        LevelFilter::Debug
    } else if cli.verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };

    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();

    match cli.command {
        Commands::Slice {
            input,
            output,
            format,
            config,
            printer,
            layer_height,
            nozzle,
            shells,
            lids,
            infill_density,
            infill_pattern,
            support,
            support_angle,
            skirt,
            resolution,
            threads,
        } => cmd_slice(
            input,
            output,
            format,
            config,
            Overrides {
                printer,
                layer_height,
                nozzle,
                shells,
                lids,
                infill_density,
                infill_pattern,
                support,
                support_angle,
                skirt,
                resolution,
            },
            threads,
        ),
        Commands::Info { input } => cmd_info(input),
    }
}

fn parse_printer(name: &str) -> Result<PrinterKind> {
    match name.to_ascii_lowercase().as_str() {
        "fdm" => Ok(PrinterKind::Fdm),
        "inkjet" => Ok(PrinterKind::Inkjet),
        "laser" | "laser-cutter" | "laser_cutter" => Ok(PrinterKind::LaserCutter),
        other => bail!("Unknown printer kind '{}'", other),
    }
}

fn parse_format(name: &str) -> Result<OutputFormat> {
    match name.to_ascii_lowercase().as_str() {
        "gcode" | "g-code" => Ok(OutputFormat::GCode),
        "dxf" => Ok(OutputFormat::Dxf),
        other => bail!("Unknown output format '{}'", other),
    }
}

/// Load the profile (or defaults) and apply command-line overrides.
fn build_config(config_file: Option<PathBuf>, overrides: Overrides) -> Result<PrintConfig> {
    let mut config = match config_file {
        Some(path) => {
            info!("Loading profile from: {}", path.display());
            PrintConfig::from_json_file(&path)
                .with_context(|| format!("Failed to load profile {}", path.display()))?
        }
        None => PrintConfig::default(),
    };

    if let Some(printer) = overrides.printer {
        config.printer_kind = parse_printer(&printer)?;
    }
    if let Some(h) = overrides.layer_height {
        config.layer_height = h;
    }
    if let Some(d) = overrides.nozzle {
        config.nozzle_diameter = d;
    }
    if let Some(n) = overrides.shells {
        config.shell_count = n;
    }
    if let Some(n) = overrides.lids {
        config.lid_count = n;
        config.bottom_count = n;
    }
    if let Some(density) = overrides.infill_density {
        config.infill_density = (density.min(100) as f64) / 100.0;
    }
    if let Some(pattern) = overrides.infill_pattern {
        config.infill_pattern = pattern
            .parse::<InfillPattern>()
            .context("Invalid infill pattern")?;
    }
    if overrides.support {
        config.support_enabled = true;
    }
    if let Some(angle) = overrides.support_angle {
        config.support_angle = angle;
    }
    if let Some(skirt) = overrides.skirt {
        config.skirt_enabled = skirt;
    }
    if let Some(resolution) = overrides.resolution {
        config.raster_resolution = resolution;
    }

    config.validate().context("Invalid print configuration")?;
    Ok(config)
}

fn cmd_slice(
    input: PathBuf,
    output: Option<PathBuf>,
    format: Option<String>,
    config_file: Option<PathBuf>,
    overrides: Overrides,
    threads: usize,
) -> Result<()> {
    let config = build_config(config_file, overrides)?;
    let format = match format {
        Some(name) => parse_format(&name)?,
        None => config.output_format(),
    };
    let output_path = output.unwrap_or_else(|| input.with_extension(format.extension()));

    // Set thread count if specified
    if threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to initialize thread pool")?;
    }

    info!("Loading STL file: {}", input.display());
    let mut mesh = load_stl(&input).context("Failed to load STL file")?;
    let report = prepare(&mut mesh);
    info!("Mesh prepared:\n{}", report);

    info!("Printer: {}", config.printer_kind);
    info!("  Layer height: {} mm", config.layer_height);
    info!("  Nozzle: {} mm", config.nozzle_diameter);
    info!("  Shells: {}", config.shell_count);

    let mut session = SliceSession::new(config).context("Failed to create slice session")?;
    session.load_mesh(mesh);

    let progress = ProgressBar::new(0);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .context("Invalid progress bar template")?
            .progress_chars("#>-"),
    );

    let cancel = CancellationToken::new();
    let outcome = session
        .run(&cancel, |p| {
            if progress.length() != Some(2 * p.total as u64) {
                progress.set_length(2 * p.total as u64);
            }
            let done = match p.pass {
                Pass::Shells => p.layer + 1,
                Pass::LidsAndInfill => p.total + p.layer + 1,
            };
            progress.set_message(format!("{} (layer {})", p.pass, p.layer));
            progress.set_position(done as u64);
        })
        .context("Slicing failed")?;

    match outcome {
        SliceOutcome::Completed => progress.finish_with_message("Slicing complete"),
        SliceOutcome::Canceled { pass, layers } => {
            progress.abandon_with_message(format!("Canceled in {} pass", pass));
            bail!("Slicing canceled after {} layers of the {} pass", layers, pass);
        }
    }

    let file = File::create(&output_path)
        .with_context(|| format!("Failed to create {}", output_path.display()))?;
    let mut writer = BufWriter::new(file);
    session
        .write_format(format, &mut writer)
        .with_context(|| format!("Failed to write {}", output_path.display()))?;

    let stats = session.toolpath().stats();
    let speeds = (session.config().print_speed, session.config().travel_speed);
    println!("Wrote {}", output_path.display());
    println!("{}", stats);
    println!(
        "Estimated time:  {:.1} min",
        stats.estimated_time(speeds.0, speeds.1) / 60.0
    );
    Ok(())
}

fn cmd_info(input: PathBuf) -> Result<()> {
    info!("Loading STL file: {}", input.display());

    let mut mesh = load_stl(&input).context("Failed to load STL file")?;
    let report = prepare(&mut mesh);

    let bb = mesh.bounding_box();
    let size = bb.size();

    println!("Mesh Information:");
    println!("  File: {}", input.display());
    println!("  Bounding box:");
    println!(
        "    Min: ({:.3}, {:.3}, {:.3}) mm",
        bb.min.x, bb.min.y, bb.min.z
    );
    println!(
        "    Max: ({:.3}, {:.3}, {:.3}) mm",
        bb.max.x, bb.max.y, bb.max.z
    );
    println!("    Size: {:.3} x {:.3} x {:.3} mm", size.x, size.y, size.z);

    // Estimate layer count at common layer heights
    println!("  Estimated layers:");
    for h in [0.1, 0.2, 0.3] {
        println!("    {:.1} mm: {}", h, (size.z / h - 1e-9).ceil().max(0.0));
    }

    println!();
    println!("Repair Report:");
    for line in report.to_string().lines() {
        println!("  {}", line);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_overrides_applied() {
        let config = build_config(
            None,
            Overrides {
                printer: Some("inkjet".into()),
                layer_height: Some(0.1),
                shells: Some(3),
                lids: Some(4),
                infill_density: Some(35),
                infill_pattern: Some("concentric".into()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(config.printer_kind, PrinterKind::Inkjet);
        assert!((config.layer_height - 0.1).abs() < 1e-12);
        assert_eq!(config.shell_count, 3);
        assert_eq!(config.bottom_count, 4);
        assert!((config.infill_density - 0.35).abs() < 1e-12);
        assert_eq!(config.infill_pattern, InfillPattern::Concentric);
    }

    #[test]
    fn test_parse_names() {
        assert_eq!(parse_format("DXF").unwrap(), OutputFormat::Dxf);
        assert_eq!(parse_printer("laser-cutter").unwrap(), PrinterKind::LaserCutter);
        assert!(parse_printer("plotter").is_err());
        assert!(build_config(
            None,
            Overrides {
                nozzle: Some(-1.0),
                ..Default::default()
            }
        )
        .is_err());
    }
}
