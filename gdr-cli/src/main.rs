//! GDR CLI - Command line tool for groundwater drought-risk analysis.

use clap::Parser;

#[derive(Parser)]
#[command(
    name = "gdr-cli",
    version,
    about = "Groundwater drought-risk toolkit"
)]
struct Cli {
    #[command(subcommand)]
    command: gdr_cmd::Command,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    gdr_cmd::run(cli.command)
}
