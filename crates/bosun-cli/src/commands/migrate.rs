//! Migrate command - add apiVersion/kind to unversioned manifests

use bosun_core::ProjectConfig;
use bosun_core::migrate::{MigrateOptions, format_migration_summary, migrate_directories};
use console::style;

use crate::error::Result;
use crate::lock::OperationLock;

pub fn run(config: &ProjectConfig, write: bool) -> Result<()> {
    let dirs = vec![
        config.provisions_dir(),
        config.services_dir(),
        config.stacks_dir(),
    ];

    let _lock = if write {
        println!("{}", style("Migrating manifests...").yellow());
        Some(OperationLock::acquire(&config.locks_dir(), "migrate")?)
    } else {
        println!(
            "{}",
            style("Scanning for unversioned manifests (dry-run mode)...").blue()
        );
        println!("Use --write to apply changes\n");
        None
    };

    let results = migrate_directories(&dirs, MigrateOptions { dry_run: !write })?;

    if results.is_empty() {
        println!("No manifest files found in {}", config.manifest_dir.display());
        return Ok(());
    }

    for result in &results {
        let path = result
            .path
            .strip_prefix(&config.manifest_dir)
            .unwrap_or(&result.path);

        if let Some(err) = &result.error {
            println!("  {} {} - {}", style("ERROR:").red(), path.display(), err);
        } else if result.migrated {
            let action = if write { "migrated" } else { "would migrate" };
            let kind = result.kind.map_or("unknown", |k| k.as_str());
            println!(
                "  {} {} (kind: {})",
                style(format!("{action}:")).green(),
                path.display(),
                kind
            );
        } else {
            println!("  skipped: {} (already versioned)", path.display());
        }
    }

    print!("{}", format_migration_summary(&results, !write));

    let pending = results.iter().any(|r| r.error.is_none() && r.migrated);
    if !write && pending {
        println!(
            "\n{}",
            style("Run 'bosun migrate --write' to apply changes.").yellow()
        );
    }

    Ok(())
}
