use std::collections::BTreeMap;
use std::env;
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};

/// Refuse to write a state file over any of the files it was read from.
///
/// Inputs are resolved once into a lookup keyed by their resolved path, so
/// the same state named twice (`a.json`, `./a.json`) collapses to one entry.
pub fn ensure_output_not_input(output: &Path, inputs: &[&Path]) -> Result<()> {
    let mut resolved_inputs = BTreeMap::new();
    for input in inputs {
        let key = resolve(input)
            .with_context(|| format!("failed to resolve input path {}", input.display()))?;
        resolved_inputs.entry(key).or_insert(*input);
    }

    let output_key = resolve(output)
        .with_context(|| format!("failed to resolve output path {}", output.display()))?;
    if let Some(input) = resolved_inputs.get(&output_key) {
        bail!(
            "refusing to overwrite input state: output {} matches input {}",
            output.display(),
            input.display()
        );
    }
    Ok(())
}

/// Absolute form of `path` with `.` and `..` folded away. The longest prefix
/// that exists on disk is canonicalized; the rest is appended as written.
fn resolve(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir().context("current_dir")?.join(path)
    };
    let lexical = fold_dots(&absolute);

    let mut existing = lexical.as_path();
    let mut missing: Vec<OsString> = Vec::new();
    while !existing.exists() {
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => break,
        }
    }

    let mut resolved = if existing.exists() {
        existing
            .canonicalize()
            .with_context(|| format!("canonicalize {}", existing.display()))?
    } else {
        existing.to_path_buf()
    };
    resolved.extend(missing.iter().rev());
    Ok(resolved)
}

fn fold_dots(path: &Path) -> PathBuf {
    let mut folded = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                folded.pop();
            }
            other => folded.push(other),
        }
    }
    folded
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn rejects_output_equal_to_input() {
        let dir = tempdir().expect("tempdir");
        let input = dir.path().join("state.json");
        fs::write(&input, "{}").expect("write");

        let err = ensure_output_not_input(&input, &[&input]).expect_err("same path");
        assert!(err.to_string().contains("refusing to overwrite input state"));
    }

    #[test]
    fn accepts_new_output() {
        let dir = tempdir().expect("tempdir");
        let input = dir.path().join("state.json");
        fs::write(&input, "{}").expect("write");

        ensure_output_not_input(&dir.path().join("upgraded.json"), &[&input]).expect("distinct");
    }

    #[test]
    fn parent_segments_through_missing_directories_are_folded() {
        let dir = tempdir().expect("tempdir");
        let input = dir.path().join("state.json");
        fs::write(&input, "{}").expect("write");

        let sneaky = dir.path().join("not-yet").join("..").join("state.json");
        assert!(!sneaky.exists());
        let err = ensure_output_not_input(&sneaky, &[&input]).expect_err("folds to input");
        assert!(err.to_string().contains("matches input"));

        let elsewhere = dir.path().join("a").join("..").join("b").join("state.json");
        ensure_output_not_input(&elsewhere, &[&input]).expect("different file");
    }

    #[test]
    fn names_the_matching_input() {
        let dir = tempdir().expect("tempdir");
        let state = dir.path().join("state.json");
        let remote = dir.path().join("remote.json");
        fs::write(&state, "{}").expect("write");
        fs::write(&remote, "{}").expect("write");

        let dotted = dir.path().join(".").join("remote.json");
        let err = ensure_output_not_input(&dotted, &[&state, &remote, &state])
            .expect_err("remote overwritten");
        assert_eq!(
            err.to_string(),
            format!(
                "refusing to overwrite input state: output {} matches input {}",
                dotted.display(),
                remote.display()
            )
        );
    }

    #[test]
    fn missing_tail_is_kept_verbatim() {
        let dir = tempdir().expect("tempdir");
        let base = dir.path().canonicalize().expect("canonical tempdir");

        let resolved = resolve(&dir.path().join("x").join(".").join("y.json")).expect("resolve");
        assert_eq!(resolved, base.join("x").join("y.json"));
    }
}
