use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    league_stats_cli::logging::init_logging()?;
    let cli = league_stats_cli::Cli::parse();
    league_stats_cli::run_cli(cli)
}
