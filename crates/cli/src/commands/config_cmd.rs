//! `shamba config`: Configuration management commands.

use shamba_config::AppConfig;
use std::path::PathBuf;

fn resolve(config_path: Option<PathBuf>) -> PathBuf {
    config_path.unwrap_or_else(AppConfig::config_path)
}

pub async fn validate(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let path = resolve(config_path);
    println!("Validating {}...", path.display());

    match AppConfig::load_with_env(&path) {
        Ok(config) => {
            println!("   Config parsed and validated");

            let mut warnings = Vec::new();

            if config.session.sweep_interval_secs > config.session.timeout_secs {
                warnings.push("Sweep interval is longer than the session timeout");
            }

            if config.gateway.response_deadline_secs >= config.session.timeout_secs {
                warnings.push("Response deadline is not shorter than the session timeout");
            }

            if config.registry.backend == "memory" {
                warnings.push("Memory registry: registrations are lost on restart");
            }

            for w in &warnings {
                println!("   warning: {w}");
            }

            println!();
            println!(
                "   Gateway:   {}:{}",
                config.gateway.host, config.gateway.port
            );
            println!("   Deadline:  {}s", config.gateway.response_deadline_secs);
            println!("   Timeout:   {}s", config.session.timeout_secs);
            println!("   Registry:  {}", config.registry.backend);
            println!("   Offset:    UTC{:+}", config.registry.utc_offset_hours);
        }
        Err(e) => {
            println!("   Config error: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

pub async fn show(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let config =
        super::load_config(config_path).map_err(|e| format!("Failed to load config: {e}"))?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

pub async fn path(config_path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", resolve(config_path).display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_path_is_under_shamba_dir() {
        assert!(resolve(None).ends_with(".shamba/config.toml"));
    }

    #[test]
    fn explicit_path_wins() {
        let path = PathBuf::from("/etc/shamba/config.toml");
        assert_eq!(resolve(Some(path.clone())), path);
    }

    #[test]
    fn explicit_file_is_the_one_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[session]\ntimeout_secs = 120\n").unwrap();

        let config = crate::commands::load_config(Some(path)).unwrap();
        assert_eq!(config.session.timeout_secs, 120);
    }
}
