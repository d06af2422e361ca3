//! protein-compare-toolkit - compare two protein families column by column
//!
//! ## Usage
//!
//! ```bash
//! protein-compare-toolkit sdi rank family1.aln family2.aln            # top 10, whole width
//! protein-compare-toolkit sdi rank family1.aln family2.aln 20 80 5 --by-second
//! protein-compare-toolkit sdi rank family1.aln family2.aln --save --save-as ranking.csv
//! protein-compare-toolkit sdi logo family1.aln family2.aln 30 45 --save-as logo.png
//! protein-compare-toolkit config > settings.toml
//! ```
//!
//! ## Supported Formats
//!
//! - Clustal (.aln, .clustal, .clw)
//! - FASTA (.fasta, .fa, .faa, .fas)
//!
//! Logging goes to stderr; set `PCT_LOG` (e.g. `PCT_LOG=debug`) or pass `-v`.

// Use jemalloc for better memory management (returns memory to OS)
#[cfg(not(windows))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use std::path::PathBuf;
use std::process;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use colored::*;
use tracing_subscriber::EnvFilter;

use protein_compare_toolkit::commands::{run_logo, run_rank, LogoRequest, RankRequest};
use protein_compare_toolkit::config::Settings;
use protein_compare_toolkit::logo::LogoMetric;
use protein_compare_toolkit::report::OutputMode;
use protein_compare_toolkit::sdi::ScorerRegistry;
use protein_compare_toolkit::CompareError;

/// Compare two protein multiple sequence alignments with the
/// selection-differentiation index (SDI)
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML settings file (print a sample with `config`)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Selection-differentiation index commands
    Sdi {
        #[command(subcommand)]
        command: SdiCommand,
    },
    /// Print a sample configuration file
    Config,
}

#[derive(Subcommand, Debug)]
enum SdiCommand {
    /// Rank alignment positions by their SDI
    Rank(RankArgs),
    /// Draw a two-sided sequence logo weighted by SDI
    Logo(LogoArgs),
}

#[derive(Args, Debug)]
#[command(allow_negative_numbers = true)]
struct RankArgs {
    /// First alignment (Clustal or FASTA)
    aln1: PathBuf,

    /// Second alignment (Clustal or FASTA)
    aln2: PathBuf,

    /// First position of the range, 1-based inclusive [default: 1]
    start: Option<i64>,

    /// Last position of the range, inclusive [default: alignment width]
    end: Option<i64>,

    /// Number of positions to report [default: 10]
    top: Option<i64>,

    /// Rank by the SDI anchored on the first alignment (default)
    #[arg(long)]
    by_first: bool,

    /// Rank by the SDI anchored on the second alignment
    #[arg(long)]
    by_second: bool,

    /// Print the ranking as a table (default)
    #[arg(long)]
    peek: bool,

    /// Save the ranking as CSV
    #[arg(long)]
    save: bool,

    /// CSV path used with --save [default: sdi_rank.csv]
    #[arg(long, value_name = "PATH")]
    save_as: Option<PathBuf>,

    /// Column scorer (`config` lists the available names)
    #[arg(long, default_value = "sdi")]
    metric: String,
}

#[derive(Args, Debug)]
#[command(allow_negative_numbers = true)]
struct LogoArgs {
    /// First alignment, drawn above the axis
    aln1: PathBuf,

    /// Second alignment, drawn below the axis
    aln2: PathBuf,

    /// First position of the range, 1-based inclusive [default: 1]
    start: Option<i64>,

    /// Last position of the range, inclusive [default: alignment width]
    end: Option<i64>,

    /// Output image [default: comparison.png]
    #[arg(long, value_name = "PATH")]
    save_as: Option<PathBuf>,

    /// Quantity that sets the stack heights
    #[arg(long, value_enum, default_value_t = LogoMetric::Sdi)]
    metric: LogoMetric,
}

impl From<RankArgs> for RankRequest {
    fn from(args: RankArgs) -> Self {
        RankRequest {
            first: args.aln1,
            second: args.aln2,
            start: args.start,
            end: args.end,
            top: args.top,
            by_first: args.by_first,
            by_second: args.by_second,
            peek: args.peek,
            save: args.save,
            save_as: args.save_as,
            metric: Some(args.metric),
        }
    }
}

impl From<LogoArgs> for LogoRequest {
    fn from(args: LogoArgs) -> Self {
        LogoRequest {
            first: args.aln1,
            second: args.aln2,
            start: args.start,
            end: args.end,
            save_as: args.save_as,
            metric: args.metric,
        }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => std::env::var("PCT_LOG").unwrap_or_else(|_| "warn".to_string()),
        1 => "info".to_string(),
        _ => "debug".to_string(),
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let settings = match &cli.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::default(),
    };

    match cli.command {
        Commands::Config => {
            print!("{}", Settings::generate_sample());
            println!();
            println!("# Available rank metrics:");
            for (name, description) in ScorerRegistry::new(&settings.sdi).list() {
                println!("#   {:<4} {}", name, description);
            }
        }
        Commands::Sdi {
            command: SdiCommand::Rank(args),
        } => {
            if let OutputMode::Save(path) = run_rank(&args.into(), &settings)? {
                println!("Ranking saved to {}", path.display());
            }
        }
        Commands::Sdi {
            command: SdiCommand::Logo(args),
        } => {
            let path = run_logo(&args.into(), &settings)?;
            println!("Graph saved to {}", path.display());
        }
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("{} {}", "Error:".red().bold(), e);

        let exit_code = e
            .downcast_ref::<CompareError>()
            .map(CompareError::exit_code)
            .unwrap_or(1);
        process::exit(exit_code);
    }
}
