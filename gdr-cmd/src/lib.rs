//! Command implementations for the GDR CLI.
//!
//! Provides subcommands for a full drought-risk run, a trends-only pass over
//! the station data and dumping the default configuration.

use clap::Subcommand;

pub mod analyze;
pub mod trends;

#[derive(Subcommand)]
pub enum Command {
    /// Score municipalities and write the risk report
    Run {
        /// Station metadata CSV
        #[arg(short = 's', long)]
        stations: String,

        /// Station readings CSV (may be gzipped)
        #[arg(short = 'r', long)]
        readings: String,

        /// Hydropower plant registry JSON
        #[arg(short = 'p', long)]
        plants: String,

        /// Municipality boundaries JSON
        #[arg(short = 'm', long)]
        municipalities: String,

        /// Run configuration JSON; defaults are used when omitted
        #[arg(short = 'c', long)]
        config: Option<String>,

        /// Output path for the risk report JSON
        #[arg(short = 'o', long)]
        output: String,

        /// Also write the per-station trend table to this CSV
        #[arg(long)]
        trends_csv: Option<String>,
    },

    /// Estimate station trends only and write the trend table CSV
    Trends {
        /// Station metadata CSV
        #[arg(short = 's', long)]
        stations: String,

        /// Station readings CSV (may be gzipped)
        #[arg(short = 'r', long)]
        readings: String,

        /// Run configuration JSON; only the trend section is used
        #[arg(short = 'c', long)]
        config: Option<String>,

        /// Output path for the trend table CSV
        #[arg(short = 'o', long)]
        output: String,
    },

    /// Write the default run configuration as JSON
    DefaultConfig {
        /// Output path for the configuration JSON
        #[arg(short = 'o', long)]
        output: String,
    },
}

pub fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Run {
            stations,
            readings,
            plants,
            municipalities,
            config,
            output,
            trends_csv,
        } => analyze::run_analysis(&analyze::AnalysisArgs {
            stations: &stations,
            readings: &readings,
            plants: &plants,
            municipalities: &municipalities,
            config: config.as_deref(),
            output: &output,
            trends_csv: trends_csv.as_deref(),
        }),
        Command::Trends {
            stations,
            readings,
            config,
            output,
        } => trends::run_trends(&stations, &readings, config.as_deref(), &output),
        Command::DefaultConfig { output } => analyze::write_default_config(&output),
    }
}
