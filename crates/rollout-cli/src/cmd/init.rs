use anyhow::Context;
use rollout_core::{config::Config, io, paths};
use std::path::Path;

pub fn run(root: &Path, name: Option<&str>) -> anyhow::Result<()> {
    let project_name = name.map(str::to_string).unwrap_or_else(|| {
        root.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "project".to_string())
    });

    println!("Initializing rollout in: {}", root.display());

    let yaml = serde_yaml::to_string(&Config::new(&project_name))
        .context("failed to render default config")?;
    let created = io::write_if_missing(&paths::config_path(root), yaml.as_bytes())
        .context("failed to write config.yaml")?;

    if created {
        println!("  created: {}", paths::CONFIG_FILE);
    } else {
        println!("  exists:  {}", paths::CONFIG_FILE);
    }
    Ok(())
}
