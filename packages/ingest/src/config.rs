//! Configuration loading.
//!
//! Layers, lowest priority first: built-in defaults, an optional TOML file
//! (`$ISSUE_SCRAPER_CONFIG`, or `issue_scraper.toml` in the working
//! directory if it exists), the `ISSUE_SCRAPER_PROJECTS` environment
//! variable, then explicit CLI overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use issue_scraper_ingest_models::IngestConfig;
use serde::Deserialize;

use crate::IngestError;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "ISSUE_SCRAPER_CONFIG";

/// Environment variable overriding the project list (comma-separated).
pub const PROJECTS_ENV: &str = "ISSUE_SCRAPER_PROJECTS";

/// Config file picked up from the working directory when present.
pub const DEFAULT_CONFIG_FILE: &str = "issue_scraper.toml";

/// On-disk shape of the config file. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    api_url: Option<String>,
    projects: Option<Vec<String>>,
    page_size: Option<u64>,
    inter_page_delay_ms: Option<u64>,
    retry_budget: Option<u32>,
    rate_limit_cooldown_secs: Option<u64>,
    backoff_base_ms: Option<u64>,
    request_timeout_secs: Option<u64>,
    accept_invalid_certs: Option<bool>,
    sink_path: Option<PathBuf>,
    checkpoint_path: Option<PathBuf>,
    status_path: Option<PathBuf>,
    transformed_path: Option<PathBuf>,
}

impl ConfigFile {
    fn apply(self, config: &mut IngestConfig) {
        if let Some(api_url) = self.api_url {
            config.api_url = api_url;
        }
        if let Some(projects) = self.projects {
            config.partitions = projects;
        }
        if let Some(page_size) = self.page_size {
            config.page_size = page_size;
        }
        if let Some(ms) = self.inter_page_delay_ms {
            config.inter_page_delay = Duration::from_millis(ms);
        }
        if let Some(retry_budget) = self.retry_budget {
            config.retry_budget = retry_budget;
        }
        if let Some(secs) = self.rate_limit_cooldown_secs {
            config.rate_limit_cooldown = Duration::from_secs(secs);
        }
        if let Some(ms) = self.backoff_base_ms {
            config.backoff_base = Duration::from_millis(ms);
        }
        if let Some(secs) = self.request_timeout_secs {
            config.request_timeout = Duration::from_secs(secs);
        }
        if let Some(accept) = self.accept_invalid_certs {
            config.accept_invalid_certs = accept;
        }
        if let Some(path) = self.sink_path {
            config.sink_path = path;
        }
        if let Some(path) = self.checkpoint_path {
            config.checkpoint_path = path;
        }
        if let Some(path) = self.status_path {
            config.status_path = path;
        }
        if let Some(path) = self.transformed_path {
            config.transformed_path = path;
        }
    }
}

/// Parses config TOML on top of the defaults.
///
/// The result is not validated; later layers may still fix it up.
///
/// # Errors
///
/// Returns [`IngestError::Toml`] if the text does not parse or names an
/// unknown key.
pub fn parse_config_toml(text: &str) -> Result<IngestConfig, IngestError> {
    let file: ConfigFile = toml::from_str(text)?;
    let mut config = IngestConfig::default();
    file.apply(&mut config);
    Ok(config)
}

/// Loads the layered configuration.
///
/// `cli_projects` is a comma-separated project list that overrides every
/// other source.
///
/// # Errors
///
/// Returns [`IngestError`] if an explicitly named config file is missing,
/// any config file fails to parse, or the final configuration is invalid.
pub fn load_config(cli_projects: Option<&str>) -> Result<IngestConfig, IngestError> {
    let mut config = match config_file_path() {
        Some(path) => {
            log::info!("Loading config from {}", path.display());
            parse_config_toml(&std::fs::read_to_string(&path)?)?
        }
        None => IngestConfig::default(),
    };

    if let Ok(projects) = std::env::var(PROJECTS_ENV) {
        config.partitions = parse_partition_list(&projects);
    }

    if let Some(projects) = cli_projects {
        config.partitions = parse_partition_list(projects);
    }

    validate(&config)?;
    Ok(config)
}

fn config_file_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    let default = Path::new(DEFAULT_CONFIG_FILE);
    default.exists().then(|| default.to_path_buf())
}

/// Splits a comma-separated project list, trimming and dropping blanks.
#[must_use]
pub fn parse_partition_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

/// Rejects configurations the engine cannot run with.
///
/// # Errors
///
/// Returns [`IngestError::Config`] describing the first problem found.
pub fn validate(config: &IngestConfig) -> Result<(), IngestError> {
    let problem = if config.partitions.is_empty() {
        Some("at least one project is required")
    } else if config.page_size == 0 {
        Some("page_size must be positive")
    } else if config.retry_budget == 0 {
        Some("retry_budget must be positive")
    } else if config.api_url.trim().is_empty() {
        Some("api_url must not be empty")
    } else {
        None
    };

    match problem {
        Some(message) => Err(IngestError::Config {
            message: message.to_owned(),
        }),
        None => Ok(()),
    }
}
