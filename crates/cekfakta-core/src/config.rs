use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, anyhow};

pub const GOOGLE_API_KEY_ENV: &str = "GOOGLE_API_KEY";
pub const EXA_API_KEY_ENV: &str = "EXA_API_KEY";

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub default_model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub google_api_key: Option<String>,
    #[serde(default)]
    pub exa_api_key: Option<String>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(path, config_content)?;
        Ok(())
    }

    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow!("Could not determine config directory"))?;

        Ok(config_dir.join("cekfakta").join("config.json"))
    }
}

/// The two provider keys an agent is built with.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub google_api_key: String,
    pub exa_api_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("google_api_key", &"<redacted>")
            .field("exa_api_key", &"<redacted>")
            .finish()
    }
}

impl Credentials {
    pub fn new(google_api_key: impl Into<String>, exa_api_key: impl Into<String>) -> Self {
        Self {
            google_api_key: google_api_key.into(),
            exa_api_key: exa_api_key.into(),
        }
    }

    /// Resolve keys from the process environment first, then the config file.
    pub fn resolve(config: &Config) -> std::result::Result<Self, MissingCredential> {
        Self::resolve_with(|key| std::env::var(key).ok(), config)
    }

    pub fn resolve_with<F>(lookup: F, config: &Config) -> std::result::Result<Self, MissingCredential>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |env_key: &'static str, fallback: &Option<String>| {
            lookup(env_key)
                .or_else(|| fallback.clone())
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .ok_or(MissingCredential(env_key))
        };

        Ok(Self {
            google_api_key: pick(GOOGLE_API_KEY_ENV, &config.google_api_key)?,
            exa_api_key: pick(EXA_API_KEY_ENV, &config.exa_api_key)?,
        })
    }
}

/// Name of the environment variable whose key could not be found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{0} is not set (environment or config file)")]
pub struct MissingCredential(pub &'static str);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, Config::new());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config {
            default_model: Some("gemini-2.5-pro".to_string()),
            temperature: Some(0.2),
            google_api_key: Some("g-key".to_string()),
            exa_api_key: None,
        };
        config.save_to(&path).unwrap();

        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_load_accepts_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{ "exa_api_key": "e-key" }"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.exa_api_key.as_deref(), Some("e-key"));
        assert!(config.default_model.is_none());
    }

    #[test]
    fn test_env_takes_precedence_over_config() {
        let vars = env(&[(GOOGLE_API_KEY_ENV, "env-g"), (EXA_API_KEY_ENV, "env-e")]);
        let config = Config {
            google_api_key: Some("cfg-g".to_string()),
            exa_api_key: Some("cfg-e".to_string()),
            ..Config::new()
        };

        let creds = Credentials::resolve_with(|k| vars.get(k).cloned(), &config).unwrap();
        assert_eq!(creds, Credentials::new("env-g", "env-e"));
    }

    #[test]
    fn test_config_fills_missing_env() {
        let vars = env(&[(GOOGLE_API_KEY_ENV, "env-g")]);
        let config = Config {
            exa_api_key: Some("cfg-e".to_string()),
            ..Config::new()
        };

        let creds = Credentials::resolve_with(|k| vars.get(k).cloned(), &config).unwrap();
        assert_eq!(creds, Credentials::new("env-g", "cfg-e"));
    }

    #[test]
    fn test_blank_key_counts_as_missing() {
        let vars = env(&[(GOOGLE_API_KEY_ENV, "   "), (EXA_API_KEY_ENV, "e")]);
        let err = Credentials::resolve_with(|k| vars.get(k).cloned(), &Config::new()).unwrap_err();
        assert_eq!(err, MissingCredential(GOOGLE_API_KEY_ENV));
    }

    #[test]
    fn test_debug_redacts_keys() {
        let creds = Credentials::new("secret-g", "secret-e");
        let printed = format!("{:?}", creds);
        assert!(!printed.contains("secret"));
    }
}
