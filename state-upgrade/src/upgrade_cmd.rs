use std::fs;
use std::path::Path;

use access_core::MigrationWarning;
use anyhow::{bail, Context, Result};
use serde::Serialize;
use state_upgrade::records::ResourceState;
use state_upgrade::report::{render_upgrade_summary, render_warning};
use state_upgrade::settings::Settings;
use state_upgrade::state_file::{read_state_file, StateFile};
use state_upgrade::upgrade::{upgrade, RecordKind};
use tracing::debug;

use crate::cli::{OutputFormat, UpgradeArgs};
use crate::path_guard;

#[derive(Debug, Serialize)]
struct UpgradeReport<'a> {
    kind: RecordKind,
    from: u32,
    to: u32,
    warnings: &'a [MigrationWarning],
    state: &'a StateFile,
}

pub fn run_upgrade(args: UpgradeArgs, settings: &Settings) -> Result<()> {
    let kind = RecordKind::from(args.kind);
    let file = read_state_file(&args.file)?;
    let from = file.schema_version;
    let upgraded = upgrade(kind, from, file.attributes)
        .with_context(|| format!("failed to upgrade {}", args.file.display()))?;

    if args.strict && !upgraded.warnings.is_empty() {
        bail!(
            "strict mode failed: {} deprecation warning(s) while upgrading {}",
            upgraded.warnings.len(),
            args.file.display()
        );
    }

    let state = StateFile::new(upgraded.version, upgraded.record);
    if let Some(output) = &args.output {
        path_guard::ensure_output_not_input(output, &[&args.file])?;
        write_state_file(output, &state, settings)?;
    }

    match args.format {
        OutputFormat::Json => {
            let report = UpgradeReport {
                kind,
                from,
                to: upgraded.version,
                warnings: &upgraded.warnings,
                state: &state,
            };
            println!("{}", settings.to_json(&report)?);
        }
        OutputFormat::Text => {
            let mut lines = Vec::new();
            if settings.upgrade.emit_warnings {
                lines.extend(upgraded.warnings.iter().map(render_warning));
            }
            lines.push(render_upgrade_summary(
                kind,
                from,
                upgraded.version,
                upgraded.warnings.len(),
            ));

            if args.output.is_some() {
                println!("{}", lines.join("\n"));
            } else {
                // The upgraded state owns stdout.
                eprintln!("{}", lines.join("\n"));
                println!("{}", settings.to_json(&state)?);
            }
        }
    }
    Ok(())
}

/// Read a resource state file and bring it to the current schema version.
pub fn load_resource_state(path: &Path, settings: &Settings) -> Result<ResourceState> {
    let file = read_state_file(path)?;
    let upgraded = upgrade(RecordKind::Resource, file.schema_version, file.attributes)
        .with_context(|| format!("failed to upgrade {}", path.display()))?;
    if settings.upgrade.emit_warnings {
        for warning in &upgraded.warnings {
            eprintln!("{}", render_warning(warning));
        }
    }

    serde_json::from_value(upgraded.record)
        .with_context(|| format!("failed to decode resource state {}", path.display()))
}

pub fn write_state_file(path: &Path, state: &StateFile, settings: &Settings) -> Result<()> {
    let json = settings.to_json(state)?;
    fs::write(path, format!("{json}\n"))
        .with_context(|| format!("failed to write state file {}", path.display()))?;
    debug!(path = %path.display(), version = state.schema_version, "wrote state file");
    Ok(())
}
