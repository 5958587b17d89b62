use anyhow::{anyhow, Context};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "googlemaps.toml";

/// Environment variable holding the API key; takes precedence over the config file
pub const API_KEY_ENV: &str = "GOOGLE_MAPS_API_KEY";

#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Config {
    pub secret_key: Option<String>,
    pub output_dir: Option<PathBuf>,
}

impl Config {
    /// Load `path`, or `googlemaps.toml` if it exists, then apply `GOOGLE_MAPS_API_KEY`.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };

        Ok(config.with_env_key(std::env::var(API_KEY_ENV).ok()))
    }

    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("could not read config file {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Override the key with a non-empty value from the environment
    pub fn with_env_key(mut self, value: Option<String>) -> Self {
        if let Some(key) = value.filter(|k| !k.trim().is_empty()) {
            self.secret_key = Some(key);
        }
        self
    }

    pub fn secret_key(&self) -> anyhow::Result<String> {
        self.secret_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                anyhow!("no API key found, set {} or secret_key in {}", API_KEY_ENV, DEFAULT_CONFIG_FILE)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_config() {
        let config =
            Config::from_toml_str("secret_key = \"abc123\"\noutput_dir = \"data/images\"\n").unwrap();
        assert_eq!(config.secret_key().unwrap(), "abc123");
        assert_eq!(config.output_dir, Some(PathBuf::from("data/images")));
    }

    #[test]
    fn test_empty_config_has_no_key() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.secret_key().is_err());
    }

    #[test]
    fn test_env_key_wins() {
        let config = Config::from_toml_str("secret_key = \"from-file\"").unwrap();
        let overridden = config.clone().with_env_key(Some("from-env".to_string()));
        assert_eq!(overridden.secret_key().unwrap(), "from-env");
        assert_eq!(config.clone().with_env_key(Some(String::new())).secret_key().unwrap(), "from-file");
        assert_eq!(config.with_env_key(None).secret_key().unwrap(), "from-file");
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "output_dir = \"out\"").unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.output_dir, Some(PathBuf::from("out")));
    }

    #[test]
    fn test_missing_explicit_file() {
        assert!(Config::load(Some(Path::new("/nonexistent/googlemaps.toml"))).is_err());
    }

    #[test]
    fn test_invalid_toml() {
        assert!(Config::from_toml_str("secret_key = ").is_err());
    }
}
