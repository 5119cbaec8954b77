//! Connection settings resolution
//!
//! Each setting is taken from the first source that has a non-empty value:
//! command-line flag, environment variable, secrets file, built-in default.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use aqlz_core::ConnectionConfig;

pub const DEFAULT_HOST: &str = "http://localhost:8529";
pub const DEFAULT_DATABASE: &str = "test";

pub const ENV_HOST: &str = "ARANGO_HOST";
pub const ENV_DATABASE: &str = "ARANGO_DATABASE";
pub const ENV_USERNAME: &str = "ARANGO_USERNAME";
pub const ENV_PASSWORD: &str = "ARANGO_PASSWORD";

/// Environment variable naming an explicit secrets file
pub const ENV_SECRETS: &str = "AQLZ_SECRETS";

/// Values given on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub database: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Top-level `KEY = "value"` pairs read from the secrets file
///
/// Non-string values and tables are ignored.
#[derive(Debug, Clone, Default)]
pub struct Secrets(HashMap<String, String>);

impl Secrets {
    /// Read the secrets file. A missing file yields no secrets.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no secrets file");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to read secrets file: {}", path.display()));
            }
        };
        let table: toml::Table = toml::from_str(&text)
            .with_context(|| format!("Malformed secrets file: {}", path.display()))?;
        let secrets = Self::from_table(table);
        tracing::debug!(path = %path.display(), keys = secrets.0.len(), "loaded secrets file");
        Ok(secrets)
    }

    fn from_table(table: toml::Table) -> Self {
        table
            .into_iter()
            .filter_map(|(key, value)| match value {
                toml::Value::String(text) => Some((key, text)),
                _ => None,
            })
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Secrets {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Location of the secrets file: `$AQLZ_SECRETS`, else `<config dir>/aqlz/secrets.toml`
pub fn secrets_path(env: impl Fn(&str) -> Option<String>) -> Option<PathBuf> {
    non_empty(env(ENV_SECRETS))
        .map(PathBuf::from)
        .or_else(|| dirs::config_dir().map(|p| p.join("aqlz").join("secrets.toml")))
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Resolved connection settings
#[derive(Clone, PartialEq)]
pub struct Settings {
    pub host: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("host", &self.host)
            .field("database", &self.database)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

impl Settings {
    /// Resolve every setting from the given sources
    pub fn resolve(
        overrides: &ConfigOverrides,
        env: impl Fn(&str) -> Option<String>,
        secrets: &Secrets,
    ) -> Self {
        let pick = |flag: &Option<String>, key: &str| {
            non_empty(flag.clone())
                .or_else(|| non_empty(env(key)))
                .or_else(|| non_empty(secrets.get(key).map(str::to_string)))
        };

        Self {
            host: pick(&overrides.host, ENV_HOST).unwrap_or_else(|| DEFAULT_HOST.to_string()),
            database: pick(&overrides.database, ENV_DATABASE)
                .unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            username: pick(&overrides.username, ENV_USERNAME),
            password: pick(&overrides.password, ENV_PASSWORD),
        }
    }

    /// Resolve against the process environment and the secrets file
    pub fn load(overrides: &ConfigOverrides) -> Result<Self> {
        let env = |key: &str| std::env::var(key).ok();
        let secrets = match secrets_path(env) {
            Some(path) => Secrets::load(&path)?,
            None => Secrets::default(),
        };
        let settings = Self::resolve(overrides, env, &secrets);
        tracing::debug!(?settings, "resolved connection settings");
        Ok(settings)
    }

    pub fn to_connection_config(&self) -> ConnectionConfig {
        ConnectionConfig::new_arangodb(&self.host, &self.database)
            .with_credentials(self.username.clone(), self.password.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::resolve(&ConfigOverrides::default(), env_from(&[]), &Secrets::default());
        assert_eq!(settings.host, "http://localhost:8529");
        assert_eq!(settings.database, "test");
        assert_eq!(settings.username, None);
        assert_eq!(settings.password, None);
    }

    #[test]
    fn test_precedence_flag_env_secrets_default() {
        let overrides = ConfigOverrides {
            host: Some("http://flag:8529".to_string()),
            ..ConfigOverrides::default()
        };
        let env = env_from(&[
            (ENV_HOST, "http://env:8529"),
            (ENV_DATABASE, "from_env"),
        ]);
        let secrets: Secrets = [
            (ENV_HOST, "http://secret:8529"),
            (ENV_DATABASE, "from_secrets"),
            (ENV_USERNAME, "root"),
        ]
        .into_iter()
        .collect();

        let settings = Settings::resolve(&overrides, env, &secrets);
        assert_eq!(settings.host, "http://flag:8529");
        assert_eq!(settings.database, "from_env");
        assert_eq!(settings.username.as_deref(), Some("root"));
        assert_eq!(settings.password, None);
    }

    #[test]
    fn test_empty_values_count_as_unset() {
        let overrides = ConfigOverrides {
            database: Some(String::new()),
            ..ConfigOverrides::default()
        };
        let env = env_from(&[(ENV_DATABASE, "  "), (ENV_PASSWORD, "")]);
        let secrets: Secrets = [(ENV_DATABASE, "sales"), (ENV_PASSWORD, "hunter2")]
            .into_iter()
            .collect();

        let settings = Settings::resolve(&overrides, env, &secrets);
        assert_eq!(settings.database, "sales");
        assert_eq!(settings.password.as_deref(), Some("hunter2"));
    }

    #[test]
    fn test_secrets_file_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.toml");
        std::fs::write(
            &path,
            "ARANGO_USERNAME = \"root\"\nARANGO_PASSWORD = \"openSesame\"\n",
        )
        .unwrap();

        let secrets = Secrets::load(&path).unwrap();
        assert_eq!(secrets.get(ENV_USERNAME), Some("root"));
        assert_eq!(secrets.get(ENV_PASSWORD), Some("openSesame"));
        assert_eq!(secrets.get(ENV_HOST), None);
    }

    #[test]
    fn test_secrets_file_with_other_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.toml");
        std::fs::write(
            &path,
            "ARANGO_USERNAME = \"root\"\nARANGO_PORT = 8529\n\n[connections.other]\nurl = \"x\"\n",
        )
        .unwrap();

        let secrets = Secrets::load(&path).unwrap();
        assert_eq!(secrets.get(ENV_USERNAME), Some("root"));
        assert_eq!(secrets.get("ARANGO_PORT"), None);
        assert_eq!(secrets.get("connections"), None);

        let settings = Settings::resolve(&ConfigOverrides::default(), env_from(&[]), &secrets);
        assert_eq!(settings.username.as_deref(), Some("root"));
        assert_eq!(settings.host, DEFAULT_HOST);
    }

    #[test]
    fn test_missing_secrets_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let secrets = Secrets::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(secrets.get(ENV_USERNAME), None);
    }

    #[test]
    fn test_malformed_secrets_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("secrets.toml");
        std::fs::write(&path, "ARANGO_USERNAME = \"root\nARANGO_PASSWORD\n").unwrap();

        let err = Secrets::load(&path).unwrap_err();
        assert!(err.to_string().contains("Malformed secrets file"));
    }

    #[test]
    fn test_secrets_path_from_env() {
        let path = secrets_path(env_from(&[(ENV_SECRETS, "/etc/aqlz/secrets.toml")]));
        assert_eq!(path, Some(PathBuf::from("/etc/aqlz/secrets.toml")));
    }

    #[test]
    fn test_debug_hides_password() {
        let settings = Settings {
            host: DEFAULT_HOST.to_string(),
            database: DEFAULT_DATABASE.to_string(),
            username: Some("root".to_string()),
            password: Some("hunter2".to_string()),
        };
        let debug = format!("{:?}", settings);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("***"));
    }

    #[test]
    fn test_to_connection_config() {
        let settings = Settings {
            host: "http://db:8529".to_string(),
            database: "sales".to_string(),
            username: Some("root".to_string()),
            password: None,
        };
        let config = settings.to_connection_config();
        assert_eq!(config.driver, "arangodb");
        assert_eq!(config.host, "http://db:8529");
        assert_eq!(config.database.as_deref(), Some("sales"));
        assert_eq!(config.username.as_deref(), Some("root"));
    }
}
