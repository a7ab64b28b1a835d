//! Provision command - render a stack or service and write its outputs

use bosun_core::{ProjectConfig, Variables, parse_set_values};
use bosun_engine::{
    EngineError, FileStatus, MergePolicy, OutputDiff, RenderOutput, Renderer,
    load_service_manifest, load_values_overlay,
};
use bosun_engine::output::LineType;
use console::style;
use std::path::Path;

use crate::error::{CliError, Result};
use crate::lock::OperationLock;

pub fn run(
    config: &ProjectConfig,
    name: &str,
    dry_run: bool,
    diff: bool,
    values: Option<&Path>,
    set: &[String],
) -> Result<()> {
    let policy = MergePolicy::default();
    let overlay = build_overlay(values, set, &policy)?;
    let renderer = Renderer::new(config.provisions_dir());

    let (output, output_name) = render(config, &renderer, name, &overlay, &policy)?;

    if dry_run {
        print!("{}", output.to_yaml()?);
        return Ok(());
    }

    if diff {
        let result = output.diff(&config.output_dir(), &output_name)?;
        print_diff(&result);
        return Ok(());
    }

    let _lock = OperationLock::acquire(&config.locks_dir(), "provision")?;
    let written = output.write(&config.output_dir(), &output_name)?;

    if written.is_empty() {
        println!("{} Nothing to write for {}", style("⚠").yellow(), output_name);
        return Ok(());
    }
    for path in &written {
        println!("  {} {}", style("✓").green(), path.display());
    }
    println!(
        "\n{} Provisioned {}",
        style("✓").green().bold(),
        style(&output_name).cyan()
    );

    Ok(())
}

/// Values file first, then `--set` entries on top
fn build_overlay(values: Option<&Path>, set: &[String], policy: &MergePolicy) -> Result<Variables> {
    let mut overlay = match values {
        Some(path) => load_values_overlay(path)?,
        None => Variables::new(),
    };

    if !set.is_empty() {
        let set_values = parse_set_values(set)?.into_variables()?;
        overlay = policy.merge_variables(&overlay, &set_values)?;
    }

    Ok(overlay)
}

/// Render `stacks/<name>.yml`, or failing that `services/<name>.yml`
///
/// Returns the output together with the name its compose file is written under.
fn render(
    config: &ProjectConfig,
    renderer: &Renderer,
    name: &str,
    overlay: &Variables,
    policy: &MergePolicy,
) -> Result<(RenderOutput, String)> {
    let stack_path = config.stacks_dir().join(format!("{name}.yml"));
    if stack_path.is_file() {
        tracing::debug!(stack = name, "rendering stack");
        let output = renderer.render_stack(&stack_path, &config.services_dir(), overlay)?;
        return Ok((output, name.to_string()));
    }

    let service_path = config.services_dir().join(format!("{name}.yml"));
    if service_path.is_file() {
        tracing::debug!(service = name, "rendering service");
        let mut manifest = load_service_manifest(&service_path)?;
        if !overlay.is_empty() {
            manifest.config = policy.merge_variables(&manifest.config, overlay)?;
        }
        let output = renderer
            .render_service(&manifest)
            .map_err(|e| EngineError::Service {
                name: manifest.name.clone(),
                inner: Box::new(e),
            })?;
        return Ok((output, manifest.name));
    }

    Err(CliError::NotFound {
        what: "stack or service",
        name: name.to_string(),
        help: Some(format!(
            "looked for {} and {}",
            stack_path.display(),
            service_path.display()
        )),
    })
}

fn print_diff(result: &OutputDiff) {
    for file in &result.files {
        let status = match file.status {
            FileStatus::Added => style(file.status.to_string()).green(),
            FileStatus::Modified => style(file.status.to_string()).yellow(),
            FileStatus::Unchanged => style(file.status.to_string()).dim(),
        };
        println!("{} {} ({})", style("→").blue(), file.path.display(), status);

        for line in &file.lines {
            match line.line_type {
                LineType::Added => println!("{}", style(format!("+{}", line.content)).green()),
                LineType::Removed => println!("{}", style(format!("-{}", line.content)).red()),
                LineType::Context => println!(" {}", line.content),
            }
        }
    }

    println!("\n{}", style(result.summary()).bold());
}
