//! New command implementation

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cli::{GlobalArgs, NewArgs};
use crate::commands::common::load_project;

/// Execute the new command
pub async fn execute(args: &NewArgs, global: &GlobalArgs) -> Result<()> {
    let project = load_project(global)?;
    let path = scaffold(&project.migrations_dir(), &args.name, Utc::now())?;
    println!("Created {}", path.display());
    Ok(())
}

/// Write an empty descriptor named `<yyyymmddHHMMSS>_<snake_name>.yml`.
///
/// If another descriptor already uses the timestamp as its id, the next free
/// second is used instead.
pub(crate) fn scaffold(dir: &Path, name: &str, now: DateTime<Utc>) -> Result<PathBuf> {
    let snake = to_snake_case(name);
    if snake.is_empty() {
        bail!("Migration name '{name}' must contain letters or digits");
    }

    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let taken = existing_ids(dir)?;
    let mut stamp = now;
    let mut id = stamp.format("%Y%m%d%H%M%S").to_string();
    while taken.contains(&id) {
        stamp += Duration::seconds(1);
        id = stamp.format("%Y%m%d%H%M%S").to_string();
    }
    if stamp != now {
        log::debug!("Id {} is taken, using {}", now.format("%Y%m%d%H%M%S"), id);
    }

    let path = dir.join(format!("{id}_{snake}.yml"));
    let content = format!("name: {snake}\nup: []\ndown: []\n");
    fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Ids encoded in the file names of existing descriptors.
fn existing_ids(dir: &Path) -> Result<HashSet<String>> {
    let entries =
        fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))?;
    let mut ids = HashSet::new();
    for entry in entries {
        let path = entry?.path();
        if !path.extension().is_some_and(|e| e == "yml" || e == "yaml") {
            continue;
        }
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            let id = stem.split_once('_').map_or(stem, |(id, _)| id);
            ids.insert(id.to_string());
        }
    }
    Ok(ids)
}

/// `AddAuditoriaLogs` and `add auditoria-logs` both become `add_auditoria_logs`.
pub(crate) fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower_or_digit = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if c.is_ascii_uppercase() && prev_lower_or_digit && !out.ends_with('_') {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
            prev_lower_or_digit = c.is_ascii_lowercase() || c.is_ascii_digit();
        } else {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
            prev_lower_or_digit = false;
        }
    }
    out.trim_end_matches('_').to_string()
}

#[cfg(test)]
#[path = "new_test.rs"]
mod tests;
