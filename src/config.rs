//! Startup configuration.
//!
//! Read once at process start from an optional `dashboard.toml`, then overridden
//! by the environment (`DATABASE_URL`, `DASHBOARD_SOURCE`) and finally by CLI flags.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::mock;

pub const DEFAULT_CONFIG_FILE: &str = "dashboard.toml";

/// Which record source backs the analysis service.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Generated,
    Files,
    Postgres,
}

impl std::str::FromStr for SourceKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "generated" => Ok(SourceKind::Generated),
            "files" => Ok(SourceKind::Files),
            "postgres" => Ok(SourceKind::Postgres),
            other => anyhow::bail!("unknown source '{other}' (expected generated, files or postgres)"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub source: SourceKind,

    #[serde(default)]
    pub files: FilesConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub generator: GeneratorConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesConfig {
    #[serde(default = "default_sales_csv")]
    pub sales_csv: PathBuf,

    #[serde(default = "default_customers_json")]
    pub customers_json: PathBuf,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            sales_csv: default_sales_csv(),
            customers_json: default_customers_json(),
        }
    }
}

fn default_sales_csv() -> PathBuf {
    PathBuf::from("data/sales_data.csv")
}

fn default_customers_json() -> PathBuf {
    PathBuf::from("data/customer_data.json")
}

#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Postgres connection string. `DATABASE_URL` takes precedence.
    #[serde(default)]
    pub url: Option<String>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
        }
    }
}

fn default_max_connections() -> u32 {
    5
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &self.url.as_deref().map(redact_url))
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

/// Masks the password in a connection string, both the `user:password@` form
/// and a `password=` query parameter.
pub fn redact_url(url: &str) -> String {
    let (head, query) = match url.split_once('?') {
        Some((head, query)) => (head, Some(query)),
        None => (url, None),
    };

    let mut redacted = match head.split_once("://") {
        Some((scheme, rest)) => {
            let authority_end = rest.find('/').unwrap_or(rest.len());
            let (authority, path) = rest.split_at(authority_end);
            match authority.rsplit_once('@') {
                Some((userinfo, host)) => {
                    let user = match userinfo.split_once(':') {
                        Some((user, _)) => format!("{user}:***"),
                        None => userinfo.to_string(),
                    };
                    format!("{scheme}://{user}@{host}{path}")
                }
                None => head.to_string(),
            }
        }
        None => head.to_string(),
    };

    if let Some(query) = query {
        let params: Vec<String> = query
            .split('&')
            .map(|param| match param.split_once('=') {
                Some((key, _)) if key.eq_ignore_ascii_case("password") => format!("{key}=***"),
                _ => param.to_string(),
            })
            .collect();
        redacted.push('?');
        redacted.push_str(&params.join("&"));
    }
    redacted
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default = "default_sales_seed")]
    pub sales_seed: u64,

    #[serde(default = "default_customer_seed")]
    pub customer_seed: u64,

    #[serde(default = "default_customer_count")]
    pub customer_count: usize,

    #[serde(default = "mock::default_start")]
    pub start: NaiveDate,

    #[serde(default = "mock::default_end")]
    pub end: NaiveDate,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            sales_seed: default_sales_seed(),
            customer_seed: default_customer_seed(),
            customer_count: default_customer_count(),
            start: mock::default_start(),
            end: mock::default_end(),
        }
    }
}

fn default_sales_seed() -> u64 {
    mock::DEFAULT_SALES_SEED
}

fn default_customer_seed() -> u64 {
    mock::DEFAULT_CUSTOMER_SEED
}

fn default_customer_count() -> usize {
    mock::DEFAULT_CUSTOMER_COUNT
}

impl AppConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse dashboard configuration")
    }

    /// Loads `path` if given (it must exist), else `dashboard.toml` when present,
    /// else defaults. Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                Self::from_toml_str(&content)?
            }
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.exists() {
                    let content = std::fs::read_to_string(fallback)
                        .with_context(|| format!("Failed to read {DEFAULT_CONFIG_FILE}"))?;
                    Self::from_toml_str(&content)?
                } else {
                    Self::default()
                }
            }
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL").filter(|url| !url.is_empty()) {
            self.database.url = Some(url);
        }
        if let Some(source) = lookup("DASHBOARD_SOURCE") {
            self.source = source.parse().context("DASHBOARD_SOURCE is invalid")?;
        }
        Ok(())
    }

    pub fn database_url(&self) -> Result<&str> {
        self.database
            .url
            .as_deref()
            .context("DATABASE_URL must be set to use the postgres source")
    }
}
