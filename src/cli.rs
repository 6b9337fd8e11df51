//! The command line interface for the calculator.
use crate::billing::compute_charges;
use crate::filter::{SectorFilter, filter_rates};
use crate::input::read_rate_database;
use crate::log;
use crate::normalize::normalize;
use crate::output::{create_output_directory, get_output_dir, write_results};
use crate::settings::Settings;
use crate::usage::{DerivedUsageStats, read_usage_profile};
use ::log::{info, warn};
use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

/// The command line interface for the calculator.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Options for the run command
#[derive(Args)]
pub struct RunOpts {
    /// Number of charging days per week (weekdays are filled first)
    #[arg(short, long, default_value_t = 7, value_parser = clap::value_parser!(u32).range(1..=7))]
    pub days: u32,
    /// Customer class to restrict the rate set to
    #[arg(short, long, value_enum, default_value_t = SectorFilter::All)]
    pub sector: SectorFilter,
    /// Directory for output files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Whether to overwrite the output directory if it already exists
    #[arg(long)]
    pub overwrite: bool,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Calculate charges for every rate in a database against a usage profile.
    Run {
        /// Path to the rate database JSON file.
        rates_file: PathBuf,
        /// Path to the hourly usage profile CSV file.
        usage_file: PathBuf,
        /// Other run options
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Check which rates in a database can be normalized.
    Validate {
        /// Path to the rate database JSON file.
        rates_file: PathBuf,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Run {
                rates_file,
                usage_file,
                opts,
            } => handle_run_command(&rates_file, &usage_file, &opts, None),
            Self::Validate { rates_file } => handle_validate_command(&rates_file, None),
        }
    }
}

/// Parse CLI arguments and start the calculator
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    command.execute()
}

/// Handle the `run` command.
pub fn handle_run_command(
    rates_file: &Path,
    usage_file: &Path,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<()> {
    // Load program settings, if not provided
    let settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load().context("Failed to load settings.")?
    };

    // Get path to output folder
    let pathbuf: PathBuf;
    let output_path = if let Some(p) = opts.output_dir.as_deref() {
        p
    } else {
        pathbuf = get_output_dir(rates_file)?;
        &pathbuf
    };

    let overwrite = create_output_directory(output_path, opts.overwrite || settings.overwrite)
        .with_context(|| {
            format!(
                "Failed to create output directory: {}",
                output_path.display()
            )
        })?;

    // Initialise program logger
    log::init(settings.log_level.as_deref(), Some(output_path))
        .context("Failed to initialise logging.")?;

    // NB: We have to wait until the logger is initialised to display this warning
    if overwrite {
        warn!("Output folder will be overwritten");
    }

    // Load inputs
    let rates = read_rate_database(rates_file).context("Failed to read rate database.")?;
    info!("Loaded {} rates from {}", rates.len(), rates_file.display());
    let rates = filter_rates(rates, opts.sector);

    let profile = read_usage_profile(usage_file).context("Failed to read usage profile.")?;
    let stats = DerivedUsageStats::derive(&profile, opts.days)?;
    info!(
        "Loaded usage profile from {} ({} charging days per week)",
        usage_file.display(),
        opts.days
    );
    info!("Output folder: {}", output_path.display());

    // Normalize and bill every rate
    let results: IndexMap<_, _> = rates
        .into_iter()
        .map(|(id, record)| {
            let rate = normalize(&record);
            let result = compute_charges(&rate, &profile, &stats);
            (id, (rate, result))
        })
        .collect();

    let supported = results
        .values()
        .filter(|(_, result)| result.as_charges().is_some())
        .count();
    info!("{supported} of {} rates fully supported", results.len());

    write_results(output_path, &results, &stats).context("Failed to write results.")?;
    info!("Calculation complete!");

    Ok(())
}

/// Handle the `validate` command.
pub fn handle_validate_command(rates_file: &Path, settings: Option<Settings>) -> Result<()> {
    // Load program settings, if not provided
    let settings = if let Some(settings) = settings {
        settings
    } else {
        Settings::load().context("Failed to load settings.")?
    };

    // Initialise program logger (we won't save log files when running the validate command)
    log::init(settings.log_level.as_deref(), None).context("Failed to initialise logging.")?;

    let rates = read_rate_database(rates_file).context("Failed to read rate database.")?;
    let total = rates.len();

    let supported = rates
        .values()
        .map(|record| normalize(record))
        .filter(|rate| rate.is_valid() && !rate.has_unsupported())
        .count();

    info!("{supported} of {total} rates can be calculated in full");
    if supported < total {
        warn!(
            "{} rates have unsupported or inconsistent structures",
            total - supported
        );
    }

    Ok(())
}
