use std::path::Path;

use k2plan_core::InventoryConfig;

pub fn init(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
    }
    let config = InventoryConfig::scaffold();
    std::fs::write(path, config.to_toml_string()?)?;
    println!("✓ Generated {} ({} hosts)", path.display(), config.hosts.len());
    Ok(())
}
