//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{num::NonZeroUsize, path::PathBuf, str::FromStr, time::Duration};

use chrono_tz::Tz;
use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::domain::fronts::MAX_CACHE_TTL_SECS;

pub use cli::{
    CliArgs, Command, RenderArgs, RequestContextArgs, SettingsOverrides, ShowArgs, SlotsArgs,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "frontpage";
const ENV_PREFIX: &str = "FRONTPAGE";
const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_CACHE_CAPACITY: usize = 256;
const DEFAULT_TIMEZONE: &str = "UTC";
const DEFAULT_FRONTS_FILE: &str = "fronts.toml";

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub cache: CacheSettings,
    pub conditions: ConditionSettings,
    pub sources: SourceSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub default_ttl_seconds: u64,
    pub capacity: usize,
}

impl CacheSettings {
    pub fn default_ttl(&self) -> Duration {
        Duration::from_secs(self.default_ttl_seconds)
    }
}

#[derive(Debug, Clone)]
pub struct ConditionSettings {
    /// Zone whose wall clock drives time-of-day and weekend conditions.
    pub timezone: Tz,
}

#[derive(Debug, Clone)]
pub struct SourceSettings {
    pub fronts_file: PathBuf,
    pub content_file: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(&cli.overrides);

    Settings::from_raw(raw)
}

/// Resolve configuration using the process arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    cache: RawCacheSettings,
    conditions: RawConditionSettings,
    sources: RawSourceSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &SettingsOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(enabled) = overrides.cache_enabled {
            self.cache.enabled = Some(enabled);
        }
        if let Some(timezone) = overrides.timezone.as_ref() {
            self.conditions.timezone = Some(timezone.clone());
        }
        if let Some(path) = overrides.fronts_file.as_ref() {
            self.sources.fronts_file = Some(path.clone());
        }
        if let Some(path) = overrides.content_file.as_ref() {
            self.sources.content_file = Some(path.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            cache,
            conditions,
            sources,
        } = raw;

        Ok(Self {
            logging: build_logging_settings(logging)?,
            cache: build_cache_settings(cache)?,
            conditions: build_condition_settings(conditions)?,
            sources: build_source_settings(sources)?,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let default_ttl_seconds = cache.default_ttl_seconds.unwrap_or(DEFAULT_CACHE_TTL_SECS);
    if default_ttl_seconds == 0 {
        return Err(LoadError::invalid(
            "cache.default_ttl_seconds",
            "must be greater than zero",
        ));
    }
    if default_ttl_seconds > MAX_CACHE_TTL_SECS {
        return Err(LoadError::invalid(
            "cache.default_ttl_seconds",
            format!("must be at most {MAX_CACHE_TTL_SECS} seconds"),
        ));
    }

    let capacity = non_zero_usize(
        cache.capacity.unwrap_or(DEFAULT_CACHE_CAPACITY as u64),
        "cache.capacity",
    )?;

    Ok(CacheSettings {
        enabled: cache.enabled.unwrap_or(true),
        default_ttl_seconds,
        capacity: capacity.get(),
    })
}

fn build_condition_settings(
    conditions: RawConditionSettings,
) -> Result<ConditionSettings, LoadError> {
    let name = conditions
        .timezone
        .unwrap_or_else(|| DEFAULT_TIMEZONE.to_string());
    let timezone = Tz::from_str(name.trim()).map_err(|err| {
        LoadError::invalid(
            "conditions.timezone",
            format!("unknown timezone `{name}`: {err}"),
        )
    })?;
    Ok(ConditionSettings { timezone })
}

fn build_source_settings(sources: RawSourceSettings) -> Result<SourceSettings, LoadError> {
    let fronts_file = sources
        .fronts_file
        .unwrap_or_else(|| PathBuf::from(DEFAULT_FRONTS_FILE));
    if fronts_file.as_os_str().is_empty() {
        return Err(LoadError::invalid(
            "sources.fronts_file",
            "path must not be empty",
        ));
    }

    let content_file = sources
        .content_file
        .filter(|path| !path.as_os_str().is_empty());

    Ok(SourceSettings {
        fronts_file,
        content_file,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    enabled: Option<bool>,
    default_ttl_seconds: Option<u64>,
    capacity: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawConditionSettings {
    timezone: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSourceSettings {
    fronts_file: Option<PathBuf>,
    content_file: Option<PathBuf>,
}

fn non_zero_usize(value: u64, key: &'static str) -> Result<NonZeroUsize, LoadError> {
    let value: usize = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for usize"))?;
    NonZeroUsize::new(value).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}
