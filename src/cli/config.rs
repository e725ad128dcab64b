//! Config command handlers.

use std::path::Path;

use anyhow::{bail, Context, Result};

use gamestore_bridge::config::Config;

use super::{load_config, ConfigAction};

pub(crate) async fn cmd_config(action: ConfigAction, path: Option<&Path>) -> Result<()> {
    let config_path = path.map(Path::to_path_buf).unwrap_or_else(Config::path);

    match action {
        ConfigAction::Show => {
            let config = load_config(Some(config_path.as_path()))?;
            println!(
                "{}",
                serde_json::to_string_pretty(&config).context("Failed to encode config")?
            );
        }
        ConfigAction::Init { force } => {
            if config_path.exists() && !force {
                bail!(
                    "{} already exists (use --force to overwrite)",
                    config_path.display()
                );
            }
            Config::default()
                .save_to_path(&config_path)
                .with_context(|| format!("Failed to write {}", config_path.display()))?;
            println!("Wrote default config to {}", config_path.display());
        }
        ConfigAction::Check => {
            println!("Config file: {}", config_path.display());
            if !config_path.exists() {
                println!("[OK] No config file found (using defaults)");
            }
            let config = load_config(Some(config_path.as_path()))?;
            match config.validate() {
                Ok(()) => println!("\nConfiguration looks good!"),
                Err(e) => {
                    println!("[ERROR] {}", e);
                    bail!("invalid configuration");
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_writes_defaults_and_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        cmd_config(ConfigAction::Init { force: false }, Some(path.as_path()))
            .await
            .unwrap();
        let written = Config::load_from_path(&path).unwrap();
        assert_eq!(written.agents.primary, "gamestop");

        assert!(cmd_config(ConfigAction::Init { force: false }, Some(path.as_path()))
            .await
            .is_err());
        cmd_config(ConfigAction::Init { force: true }, Some(path.as_path()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_check_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"gateway":{"pending_ttl_secs":5}}"#).unwrap();
        assert!(cmd_config(ConfigAction::Check, Some(path.as_path())).await.is_err());
    }
}
