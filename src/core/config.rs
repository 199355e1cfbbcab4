use crate::core::universe::{Listing, default_universe, universe_from_symbols};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";
pub const DEFAULT_FRANKFURTER_BASE_URL: &str = "https://api.frankfurter.dev/v1";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct YahooProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FrankfurterProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub yahoo: Option<YahooProviderConfig>,
    pub frankfurter: Option<FrankfurterProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            yahoo: Some(YahooProviderConfig {
                base_url: DEFAULT_YAHOO_BASE_URL.to_string(),
            }),
            frankfurter: Some(FrankfurterProviderConfig {
                base_url: DEFAULT_FRANKFURTER_BASE_URL.to_string(),
            }),
        }
    }
}

impl ProvidersConfig {
    pub fn yahoo_base_url(&self) -> &str {
        self.yahoo
            .as_ref()
            .map_or(DEFAULT_YAHOO_BASE_URL, |p| &p.base_url)
    }

    pub fn frankfurter_base_url(&self) -> &str {
        self.frankfurter
            .as_ref()
            .map_or(DEFAULT_FRANKFURTER_BASE_URL, |p| &p.base_url)
    }
}

fn default_currency() -> String {
    "USD".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Display currency for all monetary amounts.
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub providers: ProvidersConfig,
    /// Replaces the built-in ticker universe when set.
    #[serde(default)]
    pub symbols: Option<Vec<String>>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            currency: default_currency(),
            providers: ProvidersConfig::default(),
            symbols: None,
        }
    }
}

impl AppConfig {
    /// Loads the config from the default location, or falls back to the
    /// built-in defaults when no file has been created yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config at {}, using built-in defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "divcal", "divcal")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// The tickers to track, with their sectors.
    pub fn listings(&self) -> Vec<Listing> {
        match &self.symbols {
            Some(symbols) => universe_from_symbols(symbols),
            None => default_universe(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::universe::Sector;

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
currency: "EUR"
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(config.currency, "EUR");
        assert!(config.symbols.is_none());
        assert_eq!(config.providers.yahoo_base_url(), DEFAULT_YAHOO_BASE_URL);
        assert_eq!(
            config.providers.frankfurter_base_url(),
            DEFAULT_FRANKFURTER_BASE_URL
        );
        assert_eq!(config.listings().len(), default_universe().len());

        let yaml_str_with_providers = r#"
providers:
  yahoo:
    base_url: "http://example.com/yahoo"
  frankfurter:
    base_url: "http://example.com/fx"
symbols: ["ko", "O", "XYZ"]
        "#;
        let config_with_providers: AppConfig =
            serde_yaml::from_str(yaml_str_with_providers).unwrap();
        assert_eq!(config_with_providers.currency, "USD");
        assert_eq!(
            config_with_providers.providers.yahoo_base_url(),
            "http://example.com/yahoo"
        );
        assert_eq!(
            config_with_providers.providers.frankfurter_base_url(),
            "http://example.com/fx"
        );

        let listings = config_with_providers.listings();
        assert_eq!(listings.len(), 3);
        assert_eq!(listings[0].symbol, "KO");
        assert_eq!(listings[1].sector, Sector::RealEstate);
        assert_eq!(listings[2].sector, Sector::Other);
    }

    #[test]
    fn test_partial_providers_fall_back_to_defaults() {
        let yaml_str = r#"
providers:
  yahoo:
    base_url: "http://localhost:9000"
"#;
        let config: AppConfig = serde_yaml::from_str(yaml_str).unwrap();
        assert_eq!(config.providers.yahoo_base_url(), "http://localhost:9000");
        assert!(config.providers.frankfurter.is_none());
        assert_eq!(
            config.providers.frankfurter_base_url(),
            DEFAULT_FRANKFURTER_BASE_URL
        );
    }
}
