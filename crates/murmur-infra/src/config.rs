//! Server configuration loader for Murmur.
//!
//! Reads `config.toml` from the data directory (`~/.murmur/` in production)
//! and deserializes it into [`ServerConfig`]. Falls back to defaults when the
//! file is missing or malformed.

use std::path::{Path, PathBuf};

use murmur_types::config::ServerConfig;

/// Load server configuration from `{data_dir}/config.toml`.
///
/// - Missing file: [`ServerConfig::default()`].
/// - Unreadable or unparsable file: logs a warning, returns the default.
pub async fn load_server_config(data_dir: &Path) -> ServerConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return ServerConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return ServerConfig::default();
        }
    };

    match toml::from_str::<ServerConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            ServerConfig::default()
        }
    }
}

/// Resolve the data directory.
///
/// Priority:
/// 1. `MURMUR_DATA_DIR` environment variable
/// 2. `~/.murmur`
/// 3. `.murmur` in the current directory
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("MURMUR_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".murmur");
    }

    PathBuf::from(".murmur")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn load_server_config_missing_file_returns_default() {
        let tmp = TempDir::new().unwrap();
        let config = load_server_config(tmp.path()).await;
        assert_eq!(config.port, 8080);
        assert_eq!(config.history_limit, 5);
    }

    #[tokio::test]
    async fn load_server_config_valid_toml_returns_parsed() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(
            tmp.path().join("config.toml"),
            r#"
host = "0.0.0.0"
port = 4000
allowed_origin = "https://chat.example.com"
"#,
        )
        .await
        .unwrap();

        let config = load_server_config(tmp.path()).await;
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 4000);
        assert_eq!(config.allowed_origin, "https://chat.example.com");
        assert_eq!(config.session_ttl_secs, 3600);
    }

    #[tokio::test]
    async fn load_server_config_invalid_toml_returns_default() {
        let tmp = TempDir::new().unwrap();
        tokio::fs::write(tmp.path().join("config.toml"), "port = \"not a number\"")
            .await
            .unwrap();

        let config = load_server_config(tmp.path()).await;
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn resolve_data_dir_ends_with_murmur() {
        if std::env::var("MURMUR_DATA_DIR").is_err() {
            assert!(resolve_data_dir().ends_with(".murmur"));
        }
    }
}
