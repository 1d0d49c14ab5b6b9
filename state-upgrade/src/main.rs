use anyhow::Result;
use clap::Parser;
use state_upgrade::logging;
use state_upgrade::settings::resolve_settings;

mod cli;
mod path_guard;
mod ports_cmd;
mod protocols_cmd;
mod reconcile_cmd;
mod upgrade_cmd;

use cli::{Cli, Command};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = resolve_settings(cli.config.as_deref())?;
    logging::init(cli.verbose, &settings.logging.filter);

    match cli.command {
        Command::Upgrade(args) => upgrade_cmd::run_upgrade(args, &settings),
        Command::PortsEqual(args) => ports_cmd::run_ports_equal(args),
        Command::NormalizeProtocols(args) => protocols_cmd::run_normalize_protocols(args, &settings),
        Command::Reconcile(args) => reconcile_cmd::run_reconcile(args, &settings),
    }
}
