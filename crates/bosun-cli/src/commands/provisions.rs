//! Provisions command - list available provisions

use bosun_core::ProjectConfig;
use bosun_engine::ProvisionLoader;
use console::style;

use crate::error::Result;

pub fn run(config: &ProjectConfig) -> Result<()> {
    let names = ProvisionLoader::new(config.provisions_dir()).list()?;

    if names.is_empty() {
        println!("No provisions found");
        return Ok(());
    }

    println!("{}", style("Available provisions:").blue().bold());
    for name in names {
        println!("  - {}", name);
    }

    Ok(())
}
