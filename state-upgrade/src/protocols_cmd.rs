use anyhow::{Context, Result};
use state_upgrade::records::ProtocolsState;
use state_upgrade::report::render_protocols;
use state_upgrade::settings::Settings;

use crate::cli::{NormalizeProtocolsArgs, OutputFormat};
use crate::upgrade_cmd::load_resource_state;

pub fn run_normalize_protocols(args: NormalizeProtocolsArgs, settings: &Settings) -> Result<()> {
    let state = load_resource_state(&args.file, settings)?;
    let stored = state.protocols.value();
    let protocols = match stored {
        Some(stored) => stored
            .normalize()
            .with_context(|| format!("invalid protocols in {}", args.file.display()))?,
        None => Default::default(),
    };

    match args.format {
        OutputFormat::Text => println!("{}", render_protocols(&protocols)),
        OutputFormat::Json => {
            let normalized = ProtocolsState::from_protocols(&protocols, stored);
            println!("{}", settings.to_json(&normalized)?);
        }
    }
    Ok(())
}
