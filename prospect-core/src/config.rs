use crate::error::{ConfigError, CoreError};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "prospect.toml";

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_url: String,
    pub user_agent: String,
    pub poll_interval_minutes: u64,
    /// Candidate ids probed per stream per cycle.
    pub range_size: usize,
    /// Ids per bulk lookup request; the endpoint caps out around 100.
    pub chunk_size: usize,
    /// Retention window for the background crawl, in hours.
    pub crawl_retention_hours: u64,
    /// Retention window for interactive, on-demand searches. Narrower than
    /// the crawl window.
    pub search_retention_hours: u64,
    /// Operator-supplied starting ids for a fresh cursor. When absent, a
    /// one-time latest-item lookup seeds the cursor instead.
    pub bootstrap_post_id: Option<String>,
    pub bootstrap_comment_id: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://prospect.db".to_string(),
            user_agent: "prospect/0.1 keyword discovery".to_string(),
            poll_interval_minutes: 5,
            range_size: 400,
            chunk_size: 100,
            crawl_retention_hours: 48,
            search_retention_hours: 6,
            bootstrap_post_id: None,
            bootstrap_comment_id: None,
        }
    }
}

impl AppConfig {
    /// Load from `$PROSPECT_CONFIG` (or `prospect.toml`) when the file
    /// exists, otherwise fall back to defaults. An explicitly configured
    /// path must exist; the default path is optional. `$PROSPECT_DATABASE_URL`
    /// overrides the file either way.
    pub fn load() -> Result<Self, CoreError> {
        let explicit = std::env::var("PROSPECT_CONFIG").ok();
        let path = explicit
            .clone()
            .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
        let mut config = if Path::new(&path).exists() {
            let raw = std::fs::read_to_string(&path)?;
            toml::from_str(&raw).map_err(ConfigError::Parse)?
        } else if explicit.is_some() {
            return Err(ConfigError::FileNotFound { path }.into());
        } else {
            Self::default()
        };

        if let Ok(url) = std::env::var("PROSPECT_DATABASE_URL") {
            config.database_url = url;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.user_agent.trim().is_empty() {
            return Err(ConfigError::MissingField {
                field: "user_agent".to_string(),
            });
        }
        if self.poll_interval_minutes == 0 {
            return Err(ConfigError::InvalidValue {
                field: "poll_interval_minutes".to_string(),
                value: self.poll_interval_minutes.to_string(),
            });
        }
        if self.range_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "range_size".to_string(),
                value: self.range_size.to_string(),
            });
        }
        if self.chunk_size == 0 || self.chunk_size > 100 {
            return Err(ConfigError::InvalidValue {
                field: "chunk_size".to_string(),
                value: self.chunk_size.to_string(),
            });
        }
        if self.search_retention_hours > self.crawl_retention_hours {
            return Err(ConfigError::InvalidValue {
                field: "search_retention_hours".to_string(),
                value: self.search_retention_hours.to_string(),
            });
        }
        Ok(())
    }

    pub fn crawl_retention(&self) -> Duration {
        Duration::from_secs(self.crawl_retention_hours * 3600)
    }

    pub fn search_retention(&self) -> Duration {
        Duration::from_secs(self.search_retention_hours * 3600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.chunk_size, 100);
        assert!(config.search_retention() < config.crawl_retention());
    }

    #[test]
    fn test_parse_partial_file() {
        let config: AppConfig = toml::from_str(
            r#"
            database_url = "sqlite:///tmp/test.db"
            range_size = 50
            "#,
        )
        .expect("partial config should parse");
        assert_eq!(config.database_url, "sqlite:///tmp/test.db");
        assert_eq!(config.range_size, 50);
        assert_eq!(config.poll_interval_minutes, 5);
    }

    #[test]
    fn test_chunk_size_is_bounded() {
        let mut config = AppConfig::default();
        config.chunk_size = 101;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "chunk_size"
        ));

        config.chunk_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_search_window_must_not_exceed_crawl_window() {
        let mut config = AppConfig::default();
        config.search_retention_hours = config.crawl_retention_hours + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_blank_user_agent_rejected() {
        let mut config = AppConfig::default();
        config.user_agent = "  ".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingField { field }) if field == "user_agent"
        ));
    }
}
