use clap::Parser;
use waypoint::cli::{run_cli, Cli};
use waypoint::logging::{init_logging, LogConfig};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    // Held until exit so buffered log lines are flushed.
    let _log_guard = init_logging(&LogConfig::from_env())?;
    run_cli(cli)
}
