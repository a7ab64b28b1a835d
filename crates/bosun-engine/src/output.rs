//! Writing rendered outputs to disk and comparing them with what is there

use bosun_core::Variables;
use serde::Serialize;
use similar::{ChangeTag, TextDiff};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{EngineError, Result};
use crate::provision::Target;
use crate::render::RenderOutput;

impl Target {
    /// File a target is written to, relative to the output directory
    pub fn output_path(&self, stack: &str) -> PathBuf {
        match self {
            Target::Compose => Path::new("compose").join(format!("{stack}.yml")),
            Target::Routing => Path::new("routing").join("dynamic.yml"),
            Target::Monitoring => Path::new("monitoring").join("endpoints.yml"),
        }
    }
}

#[derive(Serialize)]
struct Combined<'a> {
    compose: &'a Variables,
    routing: &'a Variables,
    monitoring: &'a Variables,
}

impl RenderOutput {
    /// All three targets as one YAML document
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&Combined {
            compose: &self.compose,
            routing: &self.routing,
            monitoring: &self.monitoring,
        })?)
    }

    /// One target as YAML, or `None` when it is empty
    pub fn target_yaml(&self, target: Target) -> Result<Option<String>> {
        let content = self.get(target);
        if content.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_yaml::to_string(content)?))
    }

    /// Write every non-empty target under `output_dir`
    ///
    /// Returns the written paths. Files of empty targets are left alone.
    pub fn write(&self, output_dir: &Path, stack: &str) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();

        for target in Target::ALL {
            let Some(yaml) = self.target_yaml(target)? else {
                continue;
            };
            let path = output_dir.join(target.output_path(stack));
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|source| EngineError::Write {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            std::fs::write(&path, yaml).map_err(|source| EngineError::Write {
                path: path.clone(),
                source,
            })?;
            tracing::debug!(output = %target, path = %path.display(), "wrote output");
            written.push(path);
        }

        Ok(written)
    }

    /// Compare each non-empty target with the file currently on disk
    pub fn diff(&self, output_dir: &Path, stack: &str) -> Result<OutputDiff> {
        let mut files = Vec::new();

        for target in Target::ALL {
            let Some(new) = self.target_yaml(target)? else {
                continue;
            };
            let path = output_dir.join(target.output_path(stack));

            let (status, lines) = if path.is_file() {
                let old = std::fs::read_to_string(&path).map_err(|source| EngineError::Read {
                    path: path.clone(),
                    source,
                })?;
                if old == new {
                    (FileStatus::Unchanged, Vec::new())
                } else {
                    (FileStatus::Modified, text_diff(&old, &new))
                }
            } else {
                let lines = new
                    .lines()
                    .map(|line| DiffLine {
                        line_type: LineType::Added,
                        content: line.to_string(),
                    })
                    .collect();
                (FileStatus::Added, lines)
            };

            files.push(FileDiff {
                target,
                path,
                status,
                lines,
            });
        }

        Ok(OutputDiff { files })
    }
}

fn text_diff(old: &str, new: &str) -> Vec<DiffLine> {
    TextDiff::from_lines(old, new)
        .iter_all_changes()
        .map(|change| DiffLine {
            line_type: match change.tag() {
                ChangeTag::Delete => LineType::Removed,
                ChangeTag::Insert => LineType::Added,
                ChangeTag::Equal => LineType::Context,
            },
            content: change.value().trim_end().to_string(),
        })
        .collect()
}

/// Differences between a render and the output directory
#[derive(Debug, Clone, Default)]
pub struct OutputDiff {
    pub files: Vec<FileDiff>,
}

impl OutputDiff {
    pub fn has_changes(&self) -> bool {
        self.files.iter().any(|f| f.status != FileStatus::Unchanged)
    }

    pub fn count(&self, status: FileStatus) -> usize {
        self.files.iter().filter(|f| f.status == status).count()
    }

    pub fn summary(&self) -> String {
        if !self.has_changes() {
            return "No changes".to_string();
        }
        let mut parts = Vec::new();
        for status in [FileStatus::Added, FileStatus::Modified, FileStatus::Unchanged] {
            let n = self.count(status);
            if n > 0 {
                parts.push(format!("{n} {status}"));
            }
        }
        parts.join(", ")
    }
}

/// Comparison result for one output file
#[derive(Debug, Clone)]
pub struct FileDiff {
    pub target: Target,
    pub path: PathBuf,
    pub status: FileStatus,
    pub lines: Vec<DiffLine>,
}

impl FileDiff {
    /// Render as a unified-style listing
    pub fn to_unified_diff(&self) -> String {
        let mut output = String::new();
        for line in &self.lines {
            let prefix = match line.line_type {
                LineType::Added => "+",
                LineType::Removed => "-",
                LineType::Context => " ",
            };
            output.push_str(prefix);
            output.push_str(&line.content);
            output.push('\n');
        }
        output
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileStatus {
    Added,
    Modified,
    Unchanged,
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileStatus::Added => write!(f, "added"),
            FileStatus::Modified => write!(f, "modified"),
            FileStatus::Unchanged => write!(f, "unchanged"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub line_type: LineType,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineType {
    Added,
    Removed,
    Context,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn output() -> RenderOutput {
        let mut output = RenderOutput::new();
        output
            .compose
            .insert("services".into(), json!({"web": {"image": "nginx"}}));
        output
            .monitoring
            .insert("endpoints".into(), json!([{"name": "web"}]));
        output
    }

    #[test]
    fn test_to_yaml_has_all_targets() {
        let yaml = output().to_yaml().unwrap();
        insta::assert_snapshot!(yaml, @r"
        compose:
          services:
            web:
              image: nginx
        routing: {}
        monitoring:
          endpoints:
          - name: web
        ");
    }

    #[test]
    fn test_write_skips_empty_targets() {
        let dir = TempDir::new().unwrap();
        let written = output().write(dir.path(), "home").unwrap();

        assert_eq!(
            written,
            vec![
                dir.path().join("compose/home.yml"),
                dir.path().join("monitoring/endpoints.yml"),
            ]
        );
        assert!(!dir.path().join("routing").exists());

        let compose = std::fs::read_to_string(dir.path().join("compose/home.yml")).unwrap();
        let parsed: serde_json::Value = serde_yaml::from_str(&compose).unwrap();
        assert_eq!(parsed, json!({"services": {"web": {"image": "nginx"}}}));
    }

    #[test]
    fn test_write_nothing_for_empty_output() {
        let dir = TempDir::new().unwrap();
        assert!(RenderOutput::new().write(dir.path(), "s").unwrap().is_empty());
    }

    #[test]
    fn test_diff_statuses() {
        let dir = TempDir::new().unwrap();
        let rendered = output();

        let diff = rendered.diff(dir.path(), "home").unwrap();
        assert_eq!(diff.count(FileStatus::Added), 2);
        assert!(diff.has_changes());

        rendered.write(dir.path(), "home").unwrap();
        let diff = rendered.diff(dir.path(), "home").unwrap();
        assert!(!diff.has_changes());
        assert_eq!(diff.summary(), "No changes");

        let mut changed = rendered.clone();
        changed
            .compose
            .insert("services".into(), json!({"web": {"image": "caddy"}}));
        let diff = changed.diff(dir.path(), "home").unwrap();
        assert_eq!(diff.summary(), "1 modified, 1 unchanged");

        let modified = &diff.files[0];
        assert_eq!(modified.target, Target::Compose);
        let unified = modified.to_unified_diff();
        assert!(unified.contains("-    image: nginx"));
        assert!(unified.contains("+    image: caddy"));
    }
}
