//! Resolve a project root into its config, catalog and progress store.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

use crate::core::catalog::Catalog;
use crate::io::catalog::load_catalog;
use crate::io::config::{CONFIG_FILE, GolingsConfig, load_config};
use crate::io::progress::ProgressStore;

/// Canonical file locations for a project root.
#[derive(Debug, Clone)]
pub struct ProjectPaths {
    pub root: PathBuf,
    pub config_path: PathBuf,
    pub info_path: PathBuf,
    pub progress_path: PathBuf,
}

impl ProjectPaths {
    /// Paths derived from `root` and `config`; relative config entries are
    /// resolved against `root`.
    pub fn new(root: impl Into<PathBuf>, config_path: PathBuf, config: &GolingsConfig) -> Self {
        let root = root.into();
        Self {
            info_path: root.join(&config.info_file),
            progress_path: root.join(&config.progress_file),
            config_path,
            root,
        }
    }
}

/// Overrides from the command line.
#[derive(Debug, Clone, Default)]
pub struct ProjectOptions {
    pub config: Option<PathBuf>,
    pub info: Option<PathBuf>,
}

/// A loaded exercise project.
#[derive(Debug, Clone)]
pub struct Project {
    pub paths: ProjectPaths,
    pub config: GolingsConfig,
    pub catalog: Catalog,
}

impl Project {
    /// Load config and manifest under `root`.
    ///
    /// The root is canonicalized so watcher paths can be made relative to it.
    pub fn open(root: &Path, options: &ProjectOptions) -> Result<Self> {
        let root = root
            .canonicalize()
            .with_context(|| format!("resolve project root {}", root.display()))?;
        let config_path = match &options.config {
            Some(path) => root.join(path),
            None => root.join(CONFIG_FILE),
        };
        let mut config = load_config(&config_path)?;
        if let Some(info) = &options.info {
            config.info_file = info.clone();
        }
        let paths = ProjectPaths::new(&root, config_path, &config);
        let catalog = load_catalog(&root, &paths.info_path)?;
        debug!(
            root = %root.display(),
            exercises = catalog.len(),
            "project opened"
        );
        Ok(Self {
            paths,
            config,
            catalog,
        })
    }

    pub fn root(&self) -> &Path {
        &self.paths.root
    }

    pub fn progress_store(&self) -> ProgressStore {
        ProgressStore::new(&self.paths.progress_path)
    }
}
