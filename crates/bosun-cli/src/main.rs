//! Bosun CLI - compile homelab service manifests into compose, routing and
//! monitoring configuration

use bosun_core::ProjectConfig;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod commands;
mod error;
mod exit_codes;
mod lock;

use error::Result;

#[derive(Parser)]
#[command(name = "bosun")]
#[command(author = "Bosun Contributors")]
#[command(version)]
#[command(about = "Compile homelab service manifests into compose, routing and monitoring configs", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project root (defaults to the nearest directory containing manifest/)
    #[arg(long, global = true, env = "BOSUN_ROOT")]
    root: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a stack or service into compose, routing and monitoring outputs
    Provision {
        /// Stack name (stacks/<name>.yml), or service name (services/<name>.yml)
        name: String,

        /// Print the rendered output without writing
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show differences against the existing output files
        #[arg(short = 'd', long)]
        diff: bool,

        /// Values file overlaid onto every service's config
        #[arg(short = 'f', long = "values")]
        values: Option<PathBuf>,

        /// Set config values on command line (key=value)
        #[arg(long = "set")]
        set: Vec<String>,
    },

    /// List available provisions
    Provisions,

    /// Scaffold a new service manifest from a template
    Create {
        /// Template: webapp, api, worker or static
        template: String,

        /// Service name
        name: String,
    },

    /// Add apiVersion and kind to unversioned manifests
    Migrate {
        /// Write changes (default is a dry run)
        #[arg(short = 'w', long)]
        write: bool,
    },

    /// Validate manifest metadata
    Check {
        /// Require apiVersion and kind on every manifest
        #[arg(long)]
        strict: bool,
    },
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env("BOSUN_LOG").unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

fn project(root: Option<PathBuf>) -> Result<ProjectConfig> {
    let config = match root {
        Some(root) => ProjectConfig::at(&root)?,
        None => ProjectConfig::load()?,
    };
    tracing::debug!(root = %config.root.display(), manifest = %config.manifest_dir.display(), "project");
    Ok(config)
}

fn run(cli: Cli) -> Result<()> {
    let config = project(cli.root)?;

    match cli.command {
        Commands::Provision {
            name,
            dry_run,
            diff,
            values,
            set,
        } => commands::provision::run(&config, &name, dry_run, diff, values.as_deref(), &set),

        Commands::Provisions => commands::provisions::run(&config),

        Commands::Create { template, name } => commands::create::run(&config, &template, &name),

        Commands::Migrate { write } => commands::migrate::run(&config, write),

        Commands::Check { strict } => commands::check::run(&config, strict),
    }
}

fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.debug);

    if let Err(err) = run(cli) {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}
