use crate::error::{AppError, Result};

pub const RANKING_URL: &str = "https://www.fundsexplorer.com.br/ranking";

/// CSS selector of the ranking `<table>` element.
pub const TABLE_SELECTOR: &str = ".default-fiis-table__container__table";

/// Collection the ranking is upserted into, keyed by fund code.
pub const FII_COLLECTION: &str = "fii_data";

/// Upper bound on waiting for the table to appear (seconds).
pub const WAIT_TIMEOUT_SECS: u64 = 30;

/// Page re-check interval while waiting for the table (milliseconds).
pub const WAIT_POLL_MS: u64 = 1000;

pub const HTTP_TIMEOUT_SECS: u64 = 30;

pub const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(StoreBackend::Sqlite),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(AppError::Config(format!(
                "STORE_BACKEND must be `sqlite` or `memory`, got `{other}`"
            ))),
        }
    }
}

impl std::fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreBackend::Sqlite => write!(f, "sqlite"),
            StoreBackend::Memory => write!(f, "memory"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub ranking_url: String,
    pub table_selector: String,
    pub wait_timeout_secs: u64,
    pub wait_poll_ms: u64,
    pub http_timeout_secs: u64,
    pub user_agent: String,
    /// When false the cycle stops after mapping (PERSIST_ENABLED)
    pub persist_enabled: bool,
    pub store_backend: StoreBackend,
    pub db_path: String,
    pub collection: String,
    /// Run a cycle every N seconds instead of once (SCRAPE_INTERVAL_SECS)
    pub scrape_interval_secs: Option<u64>,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ranking_url: RANKING_URL.to_string(),
            table_selector: TABLE_SELECTOR.to_string(),
            wait_timeout_secs: WAIT_TIMEOUT_SECS,
            wait_poll_ms: WAIT_POLL_MS,
            http_timeout_secs: HTTP_TIMEOUT_SECS,
            user_agent: USER_AGENT.to_string(),
            persist_enabled: true,
            store_backend: StoreBackend::Sqlite,
            db_path: "fii.db".to_string(),
            collection: FII_COLLECTION.to_string(),
            scrape_interval_secs: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let d = Self::default();
        Ok(Self {
            ranking_url: var("RANKING_URL").unwrap_or(d.ranking_url),
            table_selector: var("TABLE_SELECTOR").unwrap_or(d.table_selector),
            wait_timeout_secs: parse_var(&var, "WAIT_TIMEOUT_SECS", d.wait_timeout_secs)?,
            wait_poll_ms: parse_var(&var, "WAIT_POLL_MS", d.wait_poll_ms)?,
            http_timeout_secs: parse_var(&var, "HTTP_TIMEOUT_SECS", d.http_timeout_secs)?,
            user_agent: var("USER_AGENT").unwrap_or(d.user_agent),
            persist_enabled: match var("PERSIST_ENABLED") {
                Some(v) => parse_bool("PERSIST_ENABLED", &v)?,
                None => d.persist_enabled,
            },
            store_backend: match var("STORE_BACKEND") {
                Some(v) => v.parse()?,
                None => d.store_backend,
            },
            db_path: var("DB_PATH").unwrap_or(d.db_path),
            collection: var("FII_COLLECTION").unwrap_or(d.collection),
            scrape_interval_secs: match var("SCRAPE_INTERVAL_SECS") {
                Some(v) => match v.trim().parse::<u64>() {
                    Ok(0) | Err(_) => {
                        return Err(AppError::Config(
                            "SCRAPE_INTERVAL_SECS must be a positive integer".to_string(),
                        ))
                    }
                    Ok(n) => Some(n),
                },
                None => None,
            },
            log_level: var("LOG_LEVEL").unwrap_or(d.log_level),
        })
    }
}

fn parse_var<T: std::str::FromStr>(
    var: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> Result<T> {
    match var(key) {
        Some(v) => v
            .trim()
            .parse::<T>()
            .map_err(|_| AppError::Config(format!("{key} must be a valid number, got `{v}`"))),
        None => Ok(default),
    }
}

fn parse_bool(key: &str, v: &str) -> Result<bool> {
    match v.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(AppError::Config(format!("{key} must be true or false, got `{v}`"))),
    }
}
