//! Migration of unversioned manifests to the current schema
//!
//! Migration never re-serializes a document. The `apiVersion`/`kind` header
//! is spliced into the original bytes so comments, key order and formatting
//! survive untouched.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{CoreError, Result};
use crate::version::{self, API_VERSION_V1, Kind, ManifestMeta};

/// Outcome of migrating one document in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Migration {
    /// Document bytes, with the header inserted when `migrated` is true
    pub bytes: Vec<u8>,
    pub kind: Kind,
    pub migrated: bool,
}

/// Add `apiVersion` and `kind` to an unversioned document
///
/// Already versioned documents are returned unchanged with `migrated == false`.
/// When only one of the two fields is present, only the missing one is added.
/// A present but unsupported `apiVersion` is an error either way.
pub fn migrate_to_v1(data: &[u8]) -> Result<Migration> {
    let meta = ManifestMeta::from_slice(data)?;
    version::validate_api_version(&meta.api_version)?;

    if meta.is_versioned() {
        let kind: Kind = meta.kind.parse()?;
        return Ok(Migration {
            bytes: data.to_vec(),
            kind,
            migrated: false,
        });
    }

    let kind = if meta.kind.is_empty() {
        version::detect_kind(data)?
    } else {
        meta.kind.parse()?
    };

    let mut header = String::new();
    if meta.api_version.is_empty() {
        let _ = writeln!(header, "apiVersion: {}", API_VERSION_V1);
    }
    if meta.kind.is_empty() {
        let _ = writeln!(header, "kind: {}", kind);
    }

    Ok(Migration {
        bytes: insert_header(data, header.as_bytes()),
        kind,
        migrated: true,
    })
}

/// Splice `header` into `data`
///
/// Goes after a leading `---` document marker (and any comments before it)
/// so the result stays a single YAML document; otherwise at the very start.
fn insert_header(data: &[u8], header: &[u8]) -> Vec<u8> {
    let mut offset = 0;
    let mut insert_at = 0;

    for line in data.split_inclusive(|b| *b == b'\n') {
        let trimmed = line.trim_ascii();
        if trimmed.is_empty() || trimmed.starts_with(b"#") {
            offset += line.len();
            continue;
        }
        if trimmed == b"---" {
            insert_at = offset + line.len();
        }
        break;
    }

    let mut out = Vec::with_capacity(data.len() + header.len() + 1);
    out.extend_from_slice(&data[..insert_at]);
    if insert_at > 0 && !data[..insert_at].ends_with(b"\n") {
        out.push(b'\n');
    }
    out.extend_from_slice(header);
    out.extend_from_slice(&data[insert_at..]);
    out
}

/// Options for file and directory migration
#[derive(Debug, Clone, Copy, Default)]
pub struct MigrateOptions {
    /// Report what would change without writing
    pub dry_run: bool,
}

/// Result of migrating (or scanning) a single file
#[derive(Debug)]
pub struct MigrationResult {
    pub path: PathBuf,
    /// Declared or detected kind, if it could be determined
    pub kind: Option<Kind>,
    pub was_versioned: bool,
    /// Migrated, or would be migrated in dry-run mode
    pub migrated: bool,
    pub error: Option<CoreError>,
}

impl MigrationResult {
    fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            kind: None,
            was_versioned: false,
            migrated: false,
            error: None,
        }
    }

    fn failed(path: &Path, error: CoreError) -> Self {
        Self {
            error: Some(error),
            ..Self::new(path)
        }
    }
}

/// Migrate a single manifest file in place
pub fn migrate_file(path: &Path, opts: MigrateOptions) -> Result<MigrationResult> {
    let data = std::fs::read(path).map_err(|e| CoreError::read(path, e))?;
    let migration = migrate_to_v1(&data)?;

    let mut result = MigrationResult::new(path);
    result.kind = Some(migration.kind);
    result.was_versioned = !migration.migrated;
    result.migrated = migration.migrated;

    if migration.migrated && !opts.dry_run {
        std::fs::write(path, &migration.bytes)?;
        tracing::debug!(path = %path.display(), kind = %migration.kind, "migrated manifest");
    }

    Ok(result)
}

/// Migrate every `.yml`/`.yaml` file directly inside each directory
///
/// Missing directories are skipped. Per-file failures are recorded in the
/// returned results rather than aborting the run.
pub fn migrate_directories(dirs: &[PathBuf], opts: MigrateOptions) -> Result<Vec<MigrationResult>> {
    let mut results = Vec::new();

    for path in manifest_files(dirs)? {
        let result = migrate_file(&path, opts).unwrap_or_else(|e| MigrationResult::failed(&path, e));
        results.push(result);
    }

    Ok(results)
}

/// List unversioned manifests with their detected kind, without modifying them
pub fn scan_unversioned(dirs: &[PathBuf]) -> Result<Vec<MigrationResult>> {
    let mut results = Vec::new();

    for path in manifest_files(dirs)? {
        let data = match std::fs::read(&path) {
            Ok(data) => data,
            Err(e) => {
                results.push(MigrationResult::failed(&path, CoreError::read(&path, e)));
                continue;
            }
        };

        match version::is_versioned(&data) {
            Ok(true) => {}
            Ok(false) => {
                let mut result = MigrationResult::new(&path);
                result.kind = version::detect_kind(&data).ok();
                results.push(result);
            }
            Err(e) => results.push(MigrationResult::failed(&path, e.into())),
        }
    }

    Ok(results)
}

/// Manifest files of each directory, sorted by name per directory
pub fn manifest_files(dirs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for dir in dirs {
        if !dir.is_dir() {
            continue;
        }
        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| CoreError::Io(e.into()))?;
            if entry.file_type().is_file() && is_manifest_file(entry.path()) {
                files.push(entry.into_path());
            }
        }
    }

    Ok(files)
}

fn is_manifest_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yml") | Some("yaml")
    )
}

/// Human-readable summary of migration results
pub fn format_migration_summary(results: &[MigrationResult], dry_run: bool) -> String {
    let migrated = results.iter().filter(|r| r.error.is_none() && r.migrated).count();
    let errors = results.iter().filter(|r| r.error.is_some()).count();
    let skipped = results.len() - migrated - errors;

    let action = if dry_run { "Would migrate" } else { "Migrated" };

    let mut out = String::new();
    let _ = writeln!(out, "\n{}: {} files", action, migrated);
    let _ = writeln!(out, "Already versioned: {} files", skipped);
    if errors > 0 {
        let _ = writeln!(out, "Errors: {} files", errors);
    }

    if migrated > 0 {
        out.push_str("\nFiles requiring migration:\n");
        for r in results.iter().filter(|r| r.error.is_none() && r.migrated) {
            let kind = r.kind.map_or("unknown", |k| k.as_str());
            let _ = writeln!(out, "  - {} (detected: {})", r.path.display(), kind);
        }
    }

    if errors > 0 {
        out.push_str("\nFiles with errors:\n");
        for r in results {
            if let Some(e) = &r.error {
                let _ = writeln!(out, "  - {}: {}", r.path.display(), e);
            }
        }
    }

    out
}
