use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use richdoc_gateway::DEFAULT_MAX_BODY_BYTES;
use richdoc_plugins::UploadOptions;

/// richdoc runtime configuration.
///
/// Resolution order: defaults, then the YAML file named by `--config` or
/// `RICHDOC_CONFIG`, then `RICHDOC_*` environment variables.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server bind address
    pub bind_address: String,
    /// HTTP server port
    pub port: u16,
    /// SQLite database path, or `:memory:`
    pub db_path: String,
    /// Log level
    pub log_level: String,
    /// Directory for rolling JSON logs; console only when unset
    pub log_dir: Option<PathBuf>,
    /// Per-call document store timeout
    pub store_timeout_ms: Option<u64>,
    /// Delete documents left behind by a failed rename/finalize
    pub cleanup_on_failure: bool,
    /// Largest accepted request body
    pub max_body_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 8080,
            db_path: default_db_path(),
            log_level: "info".to_string(),
            log_dir: None,
            store_timeout_ms: None,
            cleanup_on_failure: false,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

fn default_db_path() -> String {
    dirs::data_dir()
        .map(|dir| dir.join("richdoc").join("richdoc.db"))
        .unwrap_or_else(|| PathBuf::from("richdoc.db"))
        .to_string_lossy()
        .into_owned()
}

fn parse_var<T>(env: &HashMap<String, String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env.get(key)
        .map(|raw| raw.trim().parse::<T>().with_context(|| format!("Invalid {key}: {raw:?}")))
        .transpose()
}

impl Config {
    /// Load configuration from an optional YAML file and the environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os("RICHDOC_CONFIG").map(PathBuf::from));
        let mut config = match path {
            Some(path) => Self::from_yaml_file(&path)?,
            None => Self::default(),
        };
        config.apply_env(&std::env::vars().collect())?;
        Ok(config)
    }

    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_yaml::from_str(&raw)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Apply `RICHDOC_*` overrides from the given environment map.
    pub fn apply_env(&mut self, env: &HashMap<String, String>) -> Result<()> {
        if let Some(bind) = env.get("RICHDOC_BIND") {
            self.bind_address = bind.clone();
        }
        if let Some(port) = parse_var(env, "RICHDOC_PORT")? {
            self.port = port;
        }
        if let Some(db) = env.get("RICHDOC_DB") {
            self.db_path = db.clone();
        }
        if let Some(dir) = env.get("RICHDOC_LOG_DIR") {
            self.log_dir = Some(PathBuf::from(dir));
        }
        if let Some(level) = env.get("RUST_LOG") {
            self.log_level = level.clone();
        }
        if let Some(ms) = parse_var(env, "RICHDOC_STORE_TIMEOUT_MS")? {
            self.store_timeout_ms = Some(ms);
        }
        if let Some(cleanup) = parse_var(env, "RICHDOC_CLEANUP_ON_FAILURE")? {
            self.cleanup_on_failure = cleanup;
        }
        if let Some(limit) = parse_var(env, "RICHDOC_MAX_BODY_BYTES")? {
            self.max_body_bytes = limit;
        }
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.bind_address, self.port)
            .parse()
            .with_context(|| format!("Invalid bind address {}:{}", self.bind_address, self.port))
    }

    pub fn upload_options(&self) -> UploadOptions {
        UploadOptions {
            store_timeout: self.store_timeout_ms.map(Duration::from_millis),
            cleanup_on_failure: self.cleanup_on_failure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn yaml_fills_only_given_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port: 9090\ndb_path: \":memory:\"\nstore_timeout_ms: 1500").unwrap();

        let config = Config::from_yaml_file(file.path()).unwrap();
        assert_eq!(config.port, 9090);
        assert_eq!(config.db_path, ":memory:");
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.upload_options().store_timeout, Some(Duration::from_millis(1500)));
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = Config { port: 9090, ..Config::default() };
        config
            .apply_env(&env(&[
                ("RICHDOC_PORT", "7070"),
                ("RICHDOC_CLEANUP_ON_FAILURE", "true"),
                ("RICHDOC_LOG_DIR", "/var/log/richdoc"),
            ]))
            .unwrap();
        assert_eq!(config.port, 7070);
        assert!(config.upload_options().cleanup_on_failure);
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/richdoc")));
    }

    #[test]
    fn invalid_numbers_are_reported() {
        let mut config = Config::default();
        let err = config.apply_env(&env(&[("RICHDOC_PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("RICHDOC_PORT"));
    }

    #[test]
    fn socket_addr_combines_bind_and_port() {
        let config = Config { bind_address: "127.0.0.1".into(), port: 3000, ..Config::default() };
        assert_eq!(config.socket_addr().unwrap().to_string(), "127.0.0.1:3000");
    }
}
