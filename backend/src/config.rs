//! Process configuration.
//!
//! Resolved once in `main` from the environment (and a `.env` file when one
//! exists) and then handed to the services, so request handling never reads
//! environment variables.

use crate::error::{ServiceError, ServiceResult};
use crate::render::batch::SlideFailurePolicy;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: PathBuf,
    pub output_dir: PathBuf,
    /// Prepended to output locations to build absolute image URLs.
    pub public_base_url: Option<String>,
    pub raster_timeout: Duration,
    pub failure_policy: SlideFailurePolicy,
    pub seed_templates: bool,
    pub json_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            database_path: PathBuf::from("templates.db"),
            output_dir: PathBuf::from("output"),
            public_base_url: None,
            raster_timeout: Duration::from_secs(30),
            failure_policy: SlideFailurePolicy::Continue,
            seed_templates: true,
            json_limit: 10 * 1024 * 1024,
        }
    }
}

impl Config {
    pub fn from_env() -> ServiceResult<Self> {
        // A missing .env file is the normal case in production.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> ServiceResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Config {
            host: value("HOST").unwrap_or(defaults.host),
            port: parse_or("PORT", value("PORT"), defaults.port)?,
            database_path: value("DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            output_dir: value("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            public_base_url: value("PUBLIC_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string()),
            raster_timeout: Duration::from_secs(parse_or(
                "RASTER_TIMEOUT_SECS",
                value("RASTER_TIMEOUT_SECS"),
                defaults.raster_timeout.as_secs(),
            )?),
            failure_policy: parse_or(
                "SLIDE_FAILURE_POLICY",
                value("SLIDE_FAILURE_POLICY"),
                defaults.failure_policy,
            )?,
            seed_templates: parse_or(
                "SEED_TEMPLATES",
                value("SEED_TEMPLATES"),
                defaults.seed_templates,
            )?,
            json_limit: parse_or(
                "JSON_LIMIT_BYTES",
                value("JSON_LIMIT_BYTES"),
                defaults.json_limit,
            )?,
        })
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> ServiceResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| ServiceError::Config(format!("{}={:?}: {}", key, raw, e))),
    }
}
