//! Create command - scaffold a service manifest from a template

use bosun_core::{API_VERSION_V1, Kind, ProjectConfig};
use console::style;
use std::fs;

use crate::error::{CliError, Result};

/// Template name and its starter config; the template name is also the provision it applies
const TEMPLATES: &[(&str, &str)] = &[
    ("webapp", "  port: 8080\n  domain: {name}.example.com\n"),
    ("api", "  port: 8080\n  health_path: /health\n"),
    ("worker", "  replicas: 1\n"),
    ("static", "  root: /var/www/html\n"),
];

fn available() -> String {
    TEMPLATES
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Manifest text for `template`, or `None` if there is no such template
pub fn render_template(template: &str, name: &str) -> Option<String> {
    let (_, config) = TEMPLATES.iter().find(|(t, _)| *t == template)?;
    Some(format!(
        "apiVersion: {API_VERSION_V1}\nkind: {kind}\nname: {name}\nprovisions:\n  - {template}\nconfig:\n{config}",
        kind = Kind::Service,
        config = config.replace("{name}", name),
    ))
}

pub fn run(config: &ProjectConfig, template: &str, name: &str) -> Result<()> {
    if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
        return Err(CliError::usage(
            format!("invalid service name: {name:?}"),
            "use a plain name such as `myapp`",
        ));
    }

    let Some(content) = render_template(template, name) else {
        return Err(CliError::usage(
            format!("unknown template: {template}"),
            format!("available templates: {}", available()),
        ));
    };

    let services_dir = config.services_dir();
    let service_path = services_dir.join(format!("{name}.yml"));
    if service_path.exists() {
        return Err(CliError::usage(
            format!("service already exists: {}", service_path.display()),
            "choose another name or edit the existing manifest",
        ));
    }

    fs::create_dir_all(&services_dir).map_err(|e| CliError::io(&services_dir, e))?;
    fs::write(&service_path, content).map_err(|e| CliError::io(&service_path, e))?;

    println!(
        "{} Created service: {}",
        style("✓").green(),
        service_path.display()
    );
    println!(
        "Edit the file and run '{}' to generate outputs",
        style(format!("bosun provision {name}")).cyan()
    );

    Ok(())
}
