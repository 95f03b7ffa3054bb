//! Exercise manifest (`info.toml`) loading.
//!
//! ```toml
//! [[exercises]]
//! name = "errors1"
//! path = "exercises/errors/errors1/main.go"
//! mode = "compile"
//! hint = """
//! Functions that can fail return an `error` as their last value.
//! """
//! ```
//!
//! `order` is optional; without it the manifest position is the ordinal.

use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::core::catalog::Catalog;
use crate::core::invariants::validate_exercises;
use crate::core::types::{Exercise, VerifyMode};
use crate::error::ConfigError;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    #[serde(default)]
    exercises: Vec<ManifestEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ManifestEntry {
    name: String,
    path: PathBuf,
    mode: VerifyMode,
    #[serde(default)]
    hint: String,
    order: Option<i64>,
}

/// Load, validate and order the manifest at `info_path`.
///
/// Exercise paths are resolved against `root` and must exist. All problems
/// (missing paths, duplicate names or ordinals) are reported together.
pub fn load_catalog(root: &Path, info_path: &Path) -> Result<Catalog, ConfigError> {
    debug!(path = %info_path.display(), "loading manifest");
    let contents = fs::read_to_string(info_path).map_err(|source| ConfigError::Read {
        path: info_path.to_path_buf(),
        source,
    })?;
    let catalog = parse_catalog(root, info_path, &contents)?;
    debug!(exercises = catalog.len(), "manifest loaded");
    Ok(catalog)
}

/// Parse manifest text; `info_path` is only used in error messages.
pub fn parse_catalog(
    root: &Path,
    info_path: &Path,
    contents: &str,
) -> Result<Catalog, ConfigError> {
    let manifest: Manifest = toml::from_str(contents).map_err(|source| ConfigError::Parse {
        path: info_path.to_path_buf(),
        source,
    })?;

    let exercises: Vec<Exercise> = manifest
        .exercises
        .into_iter()
        .enumerate()
        .map(|(index, entry)| Exercise {
            order: entry.order.unwrap_or(index as i64),
            name: entry.name,
            // `./exercises/x` and `exercises/x` must compare equal to watcher paths.
            path: entry
                .path
                .components()
                .filter(|component| !matches!(component, Component::CurDir))
                .collect(),
            hint: entry.hint.trim().to_string(),
            mode: entry.mode,
        })
        .collect();

    let mut problems = validate_exercises(&exercises);
    if exercises.is_empty() {
        problems.push("manifest lists no exercises".to_string());
    }
    for exercise in &exercises {
        if exercise.path.as_os_str().is_empty() {
            continue;
        }
        if !root.join(&exercise.path).exists() {
            problems.push(format!(
                "{}: path {} does not exist",
                exercise.name,
                exercise.path.display()
            ));
        }
    }

    if !problems.is_empty() {
        return Err(ConfigError::Invalid {
            path: info_path.to_path_buf(),
            problems,
        });
    }
    Ok(Catalog::new(exercises))
}
