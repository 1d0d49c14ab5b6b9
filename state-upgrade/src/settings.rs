use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::reconcile::ReconcileOptions;

/// Tool settings. Every key is optional in a settings file; missing keys keep
/// their built-in value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub reconcile: ReconcileSettings,
    pub output: OutputSettings,
    pub upgrade: UpgradeSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingSettings {
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "state_upgrade=info,warn".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconcileSettings {
    pub default_authoritative: bool,
    pub check_global_ids: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSettings {
    pub pretty: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self { pretty: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpgradeSettings {
    pub emit_warnings: bool,
}

impl Default for UpgradeSettings {
    fn default() -> Self {
        Self {
            emit_warnings: true,
        }
    }
}

impl Settings {
    pub fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions {
            default_authoritative: self.reconcile.default_authoritative,
            check_global_ids: self.reconcile.check_global_ids,
        }
    }

    /// Render JSON according to `[output] pretty`.
    pub fn to_json<T: serde::Serialize>(&self, value: &T) -> serde_json::Result<String> {
        if self.output.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        }
    }
}

/// Errors returned when loading settings files.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse settings file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

/// Load settings from a TOML file.
pub fn load_settings(path: &Path) -> Result<Settings, SettingsError> {
    let raw = fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.display().to_string(),
        source,
    })?;

    parse_settings(&raw, path.display().to_string())
}

const EMBEDDED_DEFAULTS: &str = include_str!(concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/settings/defaults.toml"
));

/// Built-in settings, parsed from the embedded `defaults.toml`.
pub fn default_settings() -> Result<Settings, SettingsError> {
    parse_settings(EMBEDDED_DEFAULTS, "embedded settings".to_string())
}

/// Settings from `path` when given, otherwise the built-in ones.
pub fn resolve_settings(path: Option<&Path>) -> Result<Settings, SettingsError> {
    match path {
        Some(path) => load_settings(path),
        None => default_settings(),
    }
}

fn parse_settings(raw: &str, path: String) -> Result<Settings, SettingsError> {
    toml::from_str(raw).map_err(|source| SettingsError::Parse { path, source })
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn embedded_defaults_parse_and_match_default_impls() {
        let embedded = parse_settings(EMBEDDED_DEFAULTS, "embedded settings".to_string())
            .expect("embedded defaults.toml parses");
        assert_eq!(embedded, Settings::default());
        assert_eq!(resolve_settings(None).expect("built-in settings"), embedded);
    }

    #[test]
    fn embedded_defaults_name_every_section() {
        let raw: toml::Table = toml::from_str(EMBEDDED_DEFAULTS).expect("toml");
        let mut sections: Vec<&str> = raw.keys().map(String::as_str).collect();
        sections.sort_unstable();
        assert_eq!(sections, vec!["logging", "output", "reconcile", "upgrade"]);
        assert_eq!(raw["reconcile"].as_table().map(|table| table.len()), Some(2));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("settings.toml");
        fs::write(&path, "[reconcile]\ndefault_authoritative = true\n").expect("write");

        let settings = load_settings(&path).expect("load");
        assert!(settings.reconcile_options().default_authoritative);
        assert!(settings.output.pretty);
        assert_eq!(settings.logging, LoggingSettings::default());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = parse_settings("[output]\ncolour = false\n", "inline".to_string())
            .expect_err("unknown key");
        assert!(err.to_string().starts_with("failed to parse settings file inline"));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempdir().expect("tempdir");
        let err = load_settings(&dir.path().join("absent.toml")).expect_err("missing");
        assert!(matches!(err, SettingsError::Io { .. }));
    }

    #[test]
    fn compact_json_when_not_pretty() {
        let mut settings = Settings::default();
        settings.output.pretty = false;
        assert_eq!(
            settings.to_json(&serde_json::json!({ "a": 1 })).expect("json"),
            r#"{"a":1}"#
        );
    }
}
