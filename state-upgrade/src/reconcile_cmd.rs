use anyhow::{bail, Context, Result};
use serde_json::Value;
use state_upgrade::client::SnapshotClient;
use state_upgrade::reconcile::{
    apply_plan, refresh_group, refresh_resource, AccessChanges, PlanOutcome,
};
use state_upgrade::records::GroupState;
use state_upgrade::report::{render_group_refresh, render_plan_outcome, render_warning};
use state_upgrade::settings::Settings;
use state_upgrade::state_file::{read_state_file, StateFile};
use state_upgrade::upgrade::{upgrade, RecordKind};
use tracing::info;

use crate::cli::{KindArg, OutputFormat, ReconcileArgs};
use crate::path_guard;
use crate::upgrade_cmd::{load_resource_state, write_state_file};

pub fn run_reconcile(args: ReconcileArgs, settings: &Settings) -> Result<()> {
    if let Some(output) = &args.output {
        let mut inputs = vec![args.state.as_path(), args.remote.as_path()];
        inputs.extend(args.plan.as_deref());
        path_guard::ensure_output_not_input(output, &inputs)?;
    }

    match args.kind {
        KindArg::Resource => reconcile_resource(&args, settings),
        KindArg::Group => {
            if args.plan.is_some() {
                bail!("--plan applies to resource state only");
            }
            reconcile_group(&args, settings)
        }
    }
}

fn reconcile_resource(args: &ReconcileArgs, settings: &Settings) -> Result<()> {
    let state = load_resource_state(&args.state, settings)?;
    let mut client = SnapshotClient::load(&args.remote)?;
    let options = settings.reconcile_options();

    let refreshed = refresh_resource(&client, &state, options)
        .with_context(|| format!("failed to refresh resource {}", state.id))?;
    let outcome = match (refreshed, &args.plan) {
        (Some(current), Some(plan_path)) => {
            let plan = load_resource_state(plan_path, settings)?;
            apply_plan(&mut client, &plan, &current, options)
                .with_context(|| format!("failed to apply plan {}", plan_path.display()))?
        }
        (refreshed, _) => PlanOutcome {
            state: refreshed,
            access: AccessChanges::default(),
            updated: false,
        },
    };

    if let (Some(output), Some(state)) = (&args.output, &outcome.state) {
        let current = StateFile::new(
            RecordKind::Resource.current_version(),
            serde_json::to_value(state)?,
        );
        write_state_file(output, &current, settings)?;
    }

    match args.format {
        OutputFormat::Text => println!("{}", render_plan_outcome(&outcome)),
        OutputFormat::Json => println!("{}", settings.to_json(&outcome)?),
    }
    Ok(())
}

fn reconcile_group(args: &ReconcileArgs, settings: &Settings) -> Result<()> {
    let file = read_state_file(&args.state)?;
    let upgraded = upgrade(RecordKind::Group, file.schema_version, file.attributes)
        .with_context(|| format!("failed to upgrade {}", args.state.display()))?;
    if settings.upgrade.emit_warnings {
        for warning in &upgraded.warnings {
            eprintln!("{}", render_warning(warning));
        }
    }
    let state: GroupState = serde_json::from_value(upgraded.record)
        .with_context(|| format!("failed to decode group state {}", args.state.display()))?;

    let client = SnapshotClient::load(&args.remote)?;
    let refreshed = refresh_group(&client, &state, settings.reconcile_options())
        .with_context(|| format!("failed to refresh group {}", state.id))?;
    info!(id = %state.id, gone = refreshed.is_none(), "group reconciled");

    if let (Some(output), Some(group)) = (&args.output, &refreshed) {
        let current = StateFile::new(
            RecordKind::Group.current_version(),
            serde_json::to_value(group)?,
        );
        write_state_file(output, &current, settings)?;
    }

    match args.format {
        OutputFormat::Text => println!("{}", render_group_refresh(&state.id, refreshed.as_ref())),
        OutputFormat::Json => {
            let value = match &refreshed {
                Some(group) => serde_json::to_value(group)?,
                None => Value::Null,
            };
            println!("{}", settings.to_json(&value)?);
        }
    }
    Ok(())
}
