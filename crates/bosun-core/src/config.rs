//! Project layout discovery
//!
//! A project root is the first directory, walking upward, that contains a
//! `manifest/` directory. An optional `bosun.yml` (or `.bosun/config.yml`)
//! in the root can rename the manifest and output directories.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CoreError, Result};

const DEFAULT_MANIFEST_DIR: &str = "manifest";
const DEFAULT_OUTPUT_DIR: &str = "output";
const PROJECT_FILES: &[&str] = &[".bosun/config.yml", "bosun.yml"];

/// Optional project file contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct ProjectFile {
    /// Manifest directory, relative to the project root
    pub manifest_dir: String,

    /// Output directory, relative to the manifest directory
    pub output_dir: String,
}

impl Default for ProjectFile {
    fn default() -> Self {
        Self {
            manifest_dir: DEFAULT_MANIFEST_DIR.to_string(),
            output_dir: DEFAULT_OUTPUT_DIR.to_string(),
        }
    }
}

impl ProjectFile {
    /// Load the first project file found in `root`, or defaults
    pub fn load(root: &Path) -> Result<Self> {
        for candidate in PROJECT_FILES {
            let path = root.join(candidate);
            if !path.is_file() {
                continue;
            }
            let content =
                std::fs::read_to_string(&path).map_err(|e| CoreError::read(&path, e))?;
            if content.trim().is_empty() {
                return Ok(Self::default());
            }
            tracing::debug!(path = %path.display(), "loaded project file");
            return Ok(serde_yaml::from_str(&content)?);
        }
        Ok(Self::default())
    }
}

/// Resolved project directories
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectConfig {
    pub root: PathBuf,
    pub manifest_dir: PathBuf,
    output_dir: PathBuf,
}

impl ProjectConfig {
    /// Discover the project starting from the current directory
    pub fn load() -> Result<Self> {
        let cwd = std::env::current_dir()?;
        Self::discover(&cwd)
    }

    /// Walk upward from `start` to find the project root
    pub fn discover(start: &Path) -> Result<Self> {
        for dir in start.ancestors() {
            let file = ProjectFile::load(dir)?;
            if dir.join(&file.manifest_dir).is_dir() {
                return Ok(Self::from_root(dir, file));
            }
        }
        Err(CoreError::RootNotFound {
            start: start.to_path_buf(),
        })
    }

    /// Use `root` as the project root without searching
    pub fn at(root: &Path) -> Result<Self> {
        let file = ProjectFile::load(root)?;
        Ok(Self::from_root(root, file))
    }

    fn from_root(root: &Path, file: ProjectFile) -> Self {
        let manifest_dir = root.join(file.manifest_dir);
        let output_dir = manifest_dir.join(file.output_dir);
        Self {
            root: root.to_path_buf(),
            manifest_dir,
            output_dir,
        }
    }

    pub fn provisions_dir(&self) -> PathBuf {
        self.manifest_dir.join("provisions")
    }

    pub fn services_dir(&self) -> PathBuf {
        self.manifest_dir.join("services")
    }

    pub fn stacks_dir(&self) -> PathBuf {
        self.manifest_dir.join("stacks")
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone()
    }

    /// Directory holding advisory lock files
    pub fn locks_dir(&self) -> PathBuf {
        self.manifest_dir.join(".bosun").join("locks")
    }
}
