use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use state_upgrade::upgrade::RecordKind;

#[derive(Parser, Debug)]
#[command(name = "state-upgrade")]
#[command(about = "Upgrade, normalize and reconcile persisted access state")]
pub struct Cli {
    /// Settings TOML file. Defaults to the built-in settings.
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Log debug diagnostics to stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Upgrade one state file to the current schema version.
    Upgrade(UpgradeArgs),
    /// Check whether two port lists cover the same ports.
    PortsEqual(PortsEqualArgs),
    /// Normalize the protocols block of a current state file.
    NormalizeProtocols(NormalizeProtocolsArgs),
    /// Reconcile a state file against a remote snapshot.
    Reconcile(ReconcileArgs),
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum KindArg {
    Resource,
    Group,
}

impl From<KindArg> for RecordKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Resource => RecordKind::Resource,
            KindArg::Group => RecordKind::Group,
        }
    }
}

#[derive(Parser, Debug)]
pub struct UpgradeArgs {
    /// State file (`{"schema_version": N, "attributes": {...}}`).
    pub file: PathBuf,
    #[arg(long, value_enum, default_value_t = KindArg::Resource)]
    pub kind: KindArg,
    /// Write the upgraded state file here.
    #[arg(long)]
    pub output: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    /// Fail when the upgrade reports deprecation warnings.
    #[arg(long)]
    pub strict: bool,
}

#[derive(Parser, Debug)]
pub struct PortsEqualArgs {
    /// Comma-separated ports, for example `80-81,70`.
    #[arg(long, value_delimiter = ',', num_args = 0..)]
    pub left: Vec<String>,
    #[arg(long, value_delimiter = ',', num_args = 0..)]
    pub right: Vec<String>,
}

#[derive(Parser, Debug)]
pub struct NormalizeProtocolsArgs {
    /// Resource state file; upgraded first when behind.
    pub file: PathBuf,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Parser, Debug)]
pub struct ReconcileArgs {
    /// State file; upgraded first when behind.
    pub state: PathBuf,
    #[arg(long, value_enum, default_value_t = KindArg::Resource)]
    pub kind: KindArg,
    /// Remote snapshot (`{"resources": [...], "groups": [...]}`).
    #[arg(long)]
    pub remote: PathBuf,
    /// Planned resource state to apply after refreshing.
    #[arg(long)]
    pub plan: Option<PathBuf>,
    /// Write the reconciled state file here.
    #[arg(long)]
    pub output: Option<PathBuf>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}
