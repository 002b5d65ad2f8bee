use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use kestrel_altitude_fix::log_file::write_report;
use kestrel_altitude_fix::overflow_unwrapper::{DEFAULT_WRAP_THRESHOLD_FT, DEFAULT_WRAP_TOLERANCE_FT};
use kestrel_altitude_fix::{process_directory, process_log_file, CorrectionMode, UnwrapConfig};

/// Correct density altitude in Kestrel weather meter logs (CSV).
///
/// Corrected files are written next to the input with an "altitude_corrected" suffix; only
/// the density altitude column changes. Existing corrected files are overwritten.
#[derive(Parser)]
#[command(name = "kestrel-fix")]
#[command(version, about, long_about = None, arg_required_else_help = true)]
struct Cli {
    /// Overflow point of the logger's altitude counter (ft)
    #[arg(global = true, long, default_value_t = DEFAULT_WRAP_THRESHOLD_FT)]
    wrap_threshold: f64,

    /// How far a sample step may be from the overflow point and still count as a wrap (ft)
    #[arg(global = true, long, default_value_t = DEFAULT_WRAP_TOLERANCE_FT)]
    wrap_tolerance: f64,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct FixArgs {
    /// Correction method
    #[arg(long, value_enum, default_value_t = CorrectionMode::WetAir)]
    fix_type: CorrectionMode,
}

#[derive(Subcommand)]
enum Commands {
    /// Correct a single log file
    Single {
        #[arg(long)]
        log_filepath: PathBuf,

        #[command(flatten)]
        fix: FixArgs,
    },

    /// Correct every matching log file in a directory
    ///
    /// Files already carrying the corrected suffix are skipped. Pattern case sensitivity
    /// follows the file names as stored.
    Batch {
        #[arg(long)]
        log_directory: PathBuf,

        #[arg(long, default_value = "*.csv")]
        log_pattern: String,

        #[command(flatten)]
        fix: FixArgs,

        /// Write a CSV summary of the run to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = UnwrapConfig {
        wrap_threshold_ft: cli.wrap_threshold,
        wrap_tolerance_ft: cli.wrap_tolerance,
    };
    config.validate()?;

    match cli.command {
        Commands::Single { log_filepath, fix } => {
            if !log_filepath.is_file() {
                return Err(format!("not a file: {}", log_filepath.display()).into());
            }
            let report = process_log_file(&log_filepath, fix.fix_type, &config)?;
            println!("✅ {} → {} ({} rows)", report.input_filename, report.output_filename, report.rows);
        }
        Commands::Batch {
            log_directory,
            log_pattern,
            fix,
            report,
        } => {
            if !log_directory.is_dir() {
                return Err(format!("not a directory: {}", log_directory.display()).into());
            }
            let reports = process_directory(&log_directory, &log_pattern, fix.fix_type, &config)?;

            let failed = reports.iter().filter(|r| !r.succeeded()).count();
            println!("\n✅ Corrected {} out of {} log files", reports.len() - failed, reports.len());
            for r in reports.iter().filter(|r| !r.succeeded()) {
                println!("   ❌ {}: {}", r.input_filename, r.status);
            }

            if let Some(report_path) = report {
                write_report(&reports, &report_path)?;
                println!("📁 Report saved to: {}", report_path.display());
            }

            if failed > 0 {
                return Err(format!("{} of {} log files failed", failed, reports.len()).into());
            }
        }
    }

    Ok(())
}
