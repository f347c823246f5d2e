mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    let default_paths = [
        "./config.toml",
        "./request-correlation.toml",
        "~/.config/request-correlation/config.toml",
        "/etc/request-correlation/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    Ok(Config::default())
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    config
        .correlation
        .validate()
        .context("Invalid correlation settings")?;

    if let Some(base_url) = &config.downstream.base_url {
        reqwest::Url::parse(base_url)
            .with_context(|| format!("Invalid downstream base_url: {}", base_url))?;
    }

    if config.downstream.timeout_secs == 0 {
        anyhow::bail!("Downstream timeout_secs cannot be 0");
    }

    Ok(())
}
