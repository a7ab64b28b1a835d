//! Check command - validate manifest metadata across the project

use bosun_core::migrate::manifest_files;
use bosun_core::version::detect_kind;
use bosun_core::{Kind, ManifestMeta, ProjectConfig, ServiceManifest, Stack};
use console::style;
use std::path::Path;

use crate::error::{CliError, Result};

pub fn run(config: &ProjectConfig, strict: bool) -> Result<()> {
    let mode = if strict { "strict" } else { "lenient" };
    println!(
        "{} Checking manifests in {} ({} mode)",
        style("→").blue(),
        config.manifest_dir.display(),
        mode
    );

    let groups = [
        (Kind::Provision, config.provisions_dir()),
        (Kind::Service, config.services_dir()),
        (Kind::Stack, config.stacks_dir()),
    ];

    let mut checked = 0;
    let mut errors = 0;
    let mut unversioned = 0;

    for (kind, dir) in groups {
        for path in manifest_files(std::slice::from_ref(&dir))? {
            checked += 1;
            let display = path.strip_prefix(&config.manifest_dir).unwrap_or(&path);

            match check_file(&path, kind, strict) {
                Ok(Outcome::Valid) => {
                    println!("  {} {}", style("✓").green(), display.display());
                }
                Ok(Outcome::Unversioned(detected)) => {
                    unversioned += 1;
                    let detected = detected.map_or("unknown", |k| k.as_str());
                    println!(
                        "  {} {} unversioned (detected: {})",
                        style("⚠").yellow(),
                        display.display(),
                        detected
                    );
                }
                Err(message) => {
                    errors += 1;
                    println!("  {} {}: {}", style("✗").red(), display.display(), message);
                }
            }
        }
    }

    println!();
    if checked == 0 {
        println!("No manifest files found");
        return Ok(());
    }

    if errors > 0 {
        println!("{} {} file(s), {} invalid", style("✗").red(), checked, errors);
        return Err(CliError::CheckFailed { errors });
    }

    if unversioned > 0 {
        println!(
            "{} {} file(s) valid, {} unversioned (run 'bosun migrate --write')",
            style("✓").green(),
            checked,
            unversioned
        );
    } else {
        println!("{} {} file(s) valid", style("✓").green(), checked);
    }

    Ok(())
}

enum Outcome {
    Valid,
    Unversioned(Option<Kind>),
}

fn check_file(path: &Path, expected: Kind, strict: bool) -> std::result::Result<Outcome, String> {
    let data = std::fs::read(path).map_err(|e| e.to_string())?;
    let meta = ManifestMeta::from_slice(&data).map_err(|e| e.to_string())?;

    if strict {
        meta.validate_strict(expected).map_err(|e| e.to_string())?;
    } else {
        meta.validate(Some(expected)).map_err(|e| e.to_string())?;
    }

    let text = String::from_utf8_lossy(&data);
    match expected {
        Kind::Service => {
            ServiceManifest::from_yaml(&text).map_err(|e| e.to_string())?;
        }
        Kind::Stack => {
            Stack::from_yaml(&text).map_err(|e| e.to_string())?;
        }
        Kind::Provision => {}
    }

    if meta.is_versioned() {
        Ok(Outcome::Valid)
    } else {
        Ok(Outcome::Unversioned(detect_kind(&data).ok()))
    }
}
