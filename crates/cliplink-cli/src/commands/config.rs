//! Config command implementation.

use std::path::Path;

use anyhow::{bail, Context, Result};

use cliplink_core::config::Config;

use super::{ConfigAction, ConfigArgs, RunArgs};

/// Run a config action.
pub async fn run(run: RunArgs, args: ConfigArgs) -> Result<()> {
    match args.action {
        ConfigAction::Show => {
            let config = run.effective_config();
            println!("# {}", Config::config_path().display());
            print!(
                "{}",
                toml::to_string_pretty(&config).context("Failed to serialize config")?
            );
        }
        ConfigAction::Path => println!("{}", Config::config_path().display()),
        ConfigAction::Init { force } => {
            let path = Config::config_path();
            init_at(&path, force)?;
            println!("  Wrote default config to {}", path.display());
        }
    }
    Ok(())
}

fn init_at(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "Config file already exists at {} (use --force to overwrite)",
            path.display()
        );
    }
    Config::default().save_to(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_writes_loadable_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        init_at(&path, false).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.network.port, cliplink_core::DEFAULT_PORT);
        assert_eq!(loaded.ui.history_capacity, cliplink_core::DEFAULT_HISTORY_CAPACITY);
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[general]\ndevice_name = \"kept\"\n").unwrap();

        assert!(init_at(&path, false).is_err());
        assert_eq!(
            Config::load_from(&path).unwrap().general.device_name,
            "kept"
        );

        init_at(&path, true).unwrap();
        assert_ne!(
            Config::load_from(&path).unwrap().general.device_name,
            "kept"
        );
    }
}
