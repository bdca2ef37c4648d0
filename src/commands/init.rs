use anyhow::{Context, Result};
use ccsample::config::Config;
use std::path::PathBuf;

const CONFIG_HEADER: &str = "\
# ccsample configuration
#
# Every key is optional; missing keys take the values shown here.
# Command-line flags (--size, --output, --filter-mode, ...) override this file.
#
# [archive]    where crawl ids, manifests and segments are fetched from
# [fetch]      HTTP timeouts, per-segment byte budget and retry policy
# [extraction] payload encodings, removed elements and output text cap
# [filter]     mode (bias | all), keyword preset (bias | ethics) or list
# [pipeline]   output directory, segment count and per-segment record cap
# [logging]    format (text | json) and level

";

pub fn init_config(path: PathBuf, force: bool) -> Result<()> {
    let config_path = path.join("ccsample.toml");
    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }

    std::fs::create_dir_all(&path)
        .with_context(|| format!("Failed to create directory {}", path.display()))?;

    let body = Config::default().to_toml()?;
    std::fs::write(&config_path, format!("{}{}", CONFIG_HEADER, body))
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    println!("Created configuration file: {}", config_path.display());

    Ok(())
}
