//! Ingestion configuration
//!
//! Loaded from `FOODFACTS_*`, `DATABASE_*` and `SEARCH_*` environment variables.
//! Unset or unparseable values fall back to the defaults below.

use chrono_tz::Tz;
use foodfacts_common::{FoodfactsError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

// ============================================================================
// Defaults
// ============================================================================

/// Remote directory holding the manifest and the dataset files.
pub const DEFAULT_DATA_BASE_URL: &str = "https://challenges.coode.sh/food/data/json";

/// Manifest file listing the available dataset files, oldest first.
pub const DEFAULT_MANIFEST_NAME: &str = "index.txt";

/// Local file name the dataset is downloaded to, overwritten on every run.
pub const DEFAULT_ARTIFACT_NAME: &str = "products.json.gz";

/// Accepted products per run.
pub const DEFAULT_MAX_RECORDS_PER_RUN: usize = 100;

pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 30;

/// Every day at 03:00 (sec min hour day month weekday).
pub const DEFAULT_SCHEDULE: &str = "0 0 3 * * *";

pub const DEFAULT_TIMEZONE: &str = "America/Sao_Paulo";

pub const DEFAULT_DATABASE_URL: &str = "postgresql://localhost/foodfacts";

pub const DEFAULT_DATABASE_MAX_CONNECTIONS: u32 = 5;

pub const DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS: u64 = 10;

pub const DEFAULT_SEARCH_URL: &str = "http://localhost:9200";

pub const DEFAULT_SEARCH_INDEX: &str = "products";

/// Main ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    pub source: SourceConfig,
    /// Upper bound on accepted products per run
    pub max_records_per_run: usize,
    pub schedule: ScheduleConfig,
    pub database: DatabaseConfig,
    pub search: SearchConfig,
}

/// Where the dataset comes from and where it is staged locally
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    pub data_base_url: String,
    pub manifest_name: String,
    /// Transient storage directory for the downloaded artifact
    pub tmp_dir: PathBuf,
    pub artifact_name: String,
    pub connect_timeout_secs: u64,
}

/// When the daily import fires
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Six-field cron expression, seconds first
    pub cron: String,
    /// IANA timezone name the cron expression is evaluated in
    pub timezone: String,
}

/// Primary store connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
}

/// Search index connection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    pub url: String,
    pub index: String,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

fn default_tmp_dir() -> PathBuf {
    std::env::temp_dir().join("foodfacts-ingest")
}

impl IngestConfig {
    /// Load ingestion configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let config = Self {
            source: SourceConfig {
                data_base_url: env_or("FOODFACTS_DATA_BASE_URL", DEFAULT_DATA_BASE_URL),
                manifest_name: env_or("FOODFACTS_MANIFEST_NAME", DEFAULT_MANIFEST_NAME),
                tmp_dir: std::env::var("FOODFACTS_TMP_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|_| default_tmp_dir()),
                artifact_name: env_or("FOODFACTS_ARTIFACT_NAME", DEFAULT_ARTIFACT_NAME),
                connect_timeout_secs: env_parse_or(
                    "FOODFACTS_HTTP_CONNECT_TIMEOUT_SECS",
                    DEFAULT_CONNECT_TIMEOUT_SECS,
                ),
            },
            max_records_per_run: env_parse_or(
                "FOODFACTS_MAX_RECORDS_PER_RUN",
                DEFAULT_MAX_RECORDS_PER_RUN,
            ),
            schedule: ScheduleConfig {
                cron: env_or("FOODFACTS_SCHEDULE", DEFAULT_SCHEDULE),
                timezone: env_or("FOODFACTS_TIMEZONE", DEFAULT_TIMEZONE),
            },
            database: DatabaseConfig {
                url: env_or("DATABASE_URL", DEFAULT_DATABASE_URL),
                max_connections: env_parse_or(
                    "DATABASE_MAX_CONNECTIONS",
                    DEFAULT_DATABASE_MAX_CONNECTIONS,
                ),
                connect_timeout_secs: env_parse_or(
                    "DATABASE_CONNECT_TIMEOUT",
                    DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
                ),
            },
            search: SearchConfig {
                url: env_or("SEARCH_URL", DEFAULT_SEARCH_URL),
                index: env_or("SEARCH_INDEX", DEFAULT_SEARCH_INDEX),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.source.validate()?;

        if self.max_records_per_run == 0 {
            return Err(FoodfactsError::config(
                "FOODFACTS_MAX_RECORDS_PER_RUN must be greater than 0",
            ));
        }

        self.schedule.tz()?;

        if self.database.url.is_empty() {
            return Err(FoodfactsError::config("DATABASE_URL cannot be empty"));
        }
        if self.database.max_connections == 0 {
            return Err(FoodfactsError::config(
                "DATABASE_MAX_CONNECTIONS must be greater than 0",
            ));
        }
        if self.search.url.is_empty() {
            return Err(FoodfactsError::config("SEARCH_URL cannot be empty"));
        }
        if self.search.index.is_empty() {
            return Err(FoodfactsError::config("SEARCH_INDEX cannot be empty"));
        }

        Ok(())
    }
}

impl SourceConfig {
    pub fn validate(&self) -> Result<()> {
        if self.data_base_url.is_empty() {
            return Err(FoodfactsError::config("FOODFACTS_DATA_BASE_URL cannot be empty"));
        }
        if self.manifest_name.is_empty() {
            return Err(FoodfactsError::config("FOODFACTS_MANIFEST_NAME cannot be empty"));
        }
        if self.artifact_name.is_empty() || self.artifact_name.contains(['/', '\\']) {
            return Err(FoodfactsError::config(format!(
                "FOODFACTS_ARTIFACT_NAME must be a plain file name, got '{}'",
                self.artifact_name
            )));
        }
        if self.connect_timeout_secs == 0 {
            return Err(FoodfactsError::config(
                "FOODFACTS_HTTP_CONNECT_TIMEOUT_SECS must be greater than 0",
            ));
        }
        Ok(())
    }

    /// Connect timeout for the dataset host. There is no overall read timeout.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Deterministic local path of the downloaded artifact
    pub fn artifact_path(&self) -> PathBuf {
        self.tmp_dir.join(&self.artifact_name)
    }
}

impl ScheduleConfig {
    /// Parsed timezone
    pub fn tz(&self) -> Result<Tz> {
        self.timezone.parse::<Tz>().map_err(|e| {
            FoodfactsError::Parse(format!(
                "FOODFACTS_TIMEZONE '{}' is not a known timezone: {}",
                self.timezone, e
            ))
        })
    }
}

impl DatabaseConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            max_records_per_run: DEFAULT_MAX_RECORDS_PER_RUN,
            schedule: ScheduleConfig {
                cron: DEFAULT_SCHEDULE.to_string(),
                timezone: DEFAULT_TIMEZONE.to_string(),
            },
            database: DatabaseConfig {
                url: DEFAULT_DATABASE_URL.to_string(),
                max_connections: DEFAULT_DATABASE_MAX_CONNECTIONS,
                connect_timeout_secs: DEFAULT_DATABASE_CONNECT_TIMEOUT_SECS,
            },
            search: SearchConfig {
                url: DEFAULT_SEARCH_URL.to_string(),
                index: DEFAULT_SEARCH_INDEX.to_string(),
            },
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            data_base_url: DEFAULT_DATA_BASE_URL.to_string(),
            manifest_name: DEFAULT_MANIFEST_NAME.to_string(),
            tmp_dir: default_tmp_dir(),
            artifact_name: DEFAULT_ARTIFACT_NAME.to_string(),
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = IngestConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_records_per_run, 100);
        assert_eq!(config.schedule.cron, "0 0 3 * * *");
    }

    #[test]
    fn test_zero_record_cap_is_rejected() {
        let config = IngestConfig {
            max_records_per_run: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(FoodfactsError::Config(_))));
    }

    #[test]
    fn test_unknown_timezone_is_rejected() {
        let mut config = IngestConfig::default();
        config.schedule.timezone = "Mars/Olympus_Mons".to_string();
        assert!(matches!(config.validate(), Err(FoodfactsError::Parse(_))));
    }

    #[test]
    fn test_artifact_name_must_not_contain_separators() {
        let mut config = SourceConfig::default();
        config.artifact_name = "../escape.gz".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_artifact_path_is_inside_tmp_dir() {
        let config = SourceConfig {
            tmp_dir: PathBuf::from("/var/tmp/foodfacts"),
            ..Default::default()
        };
        assert_eq!(
            config.artifact_path(),
            PathBuf::from("/var/tmp/foodfacts/products.json.gz")
        );
    }

    #[test]
    fn test_timeouts_as_durations() {
        let config = IngestConfig::default();
        assert_eq!(config.source.connect_timeout(), Duration::from_secs(30));
        assert_eq!(config.database.connect_timeout(), Duration::from_secs(10));
    }
}
