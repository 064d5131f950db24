//! Application configuration loaded from environment variables.

use projections::{QueryPolicy, TimeWindow};
use sqlx::postgres::PgConnectOptions;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `DATABASE_URL`, or `POSTGRES_HOST` / `POSTGRES_PORT` / `POSTGRES_USER` /
///   `POSTGRES_PASSWORD` / `POSTGRES_DB`: PostgreSQL connection. Without
///   either the server runs on an empty in-memory store.
/// - `LOST_AFTER_MONTHS`: months before an unreturned borrow counts as lost
///   (default: `3`)
/// - `PAYMENT_LEAD_DAYS`: days ahead a payment method expiry is flagged
///   (default: `30`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub database: Option<DatabaseConfig>,
    pub lost_after_months: u32,
    pub payment_lead_days: u32,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            database: DatabaseConfig::from_lookup(&lookup),
            lost_after_months: lookup("LOST_AFTER_MONTHS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.lost_after_months),
            payment_lead_days: lookup("PAYMENT_LEAD_DAYS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.payment_lead_days),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Query thresholds derived from this configuration.
    pub fn policy(&self) -> QueryPolicy {
        QueryPolicy {
            lost_after: TimeWindow::Months(self.lost_after_months),
            payment_lead_time: TimeWindow::Days(self.payment_lead_days),
            ..QueryPolicy::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            database: None,
            lost_after_months: 3,
            payment_lead_days: 30,
        }
    }
}

/// Where the PostgreSQL event logs live.
#[derive(Clone, PartialEq, Eq)]
pub enum DatabaseConfig {
    /// A full connection URL from `DATABASE_URL`.
    Url(String),
    /// Discrete `POSTGRES_*` settings, passed to the driver unescaped.
    Parts {
        host: String,
        port: u16,
        user: String,
        password: Option<String>,
        database: String,
    },
}

impl DatabaseConfig {
    /// `DATABASE_URL` wins; otherwise `POSTGRES_HOST` enables the discrete
    /// settings, with the rest defaulting like libpq does.
    fn from_lookup<F>(lookup: &F) -> Option<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("DATABASE_URL") {
            return Some(DatabaseConfig::Url(url));
        }

        let host = lookup("POSTGRES_HOST")?;
        let user = lookup("POSTGRES_USER").unwrap_or_else(|| "postgres".to_string());
        Some(DatabaseConfig::Parts {
            host,
            port: lookup("POSTGRES_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(5432),
            database: lookup("POSTGRES_DB").unwrap_or_else(|| user.clone()),
            password: lookup("POSTGRES_PASSWORD"),
            user,
        })
    }

    /// Driver connection options. Fails only for a malformed `DATABASE_URL`.
    pub fn connect_options(&self) -> Result<PgConnectOptions, sqlx::Error> {
        match self {
            DatabaseConfig::Url(url) => url.parse(),
            DatabaseConfig::Parts {
                host,
                port,
                user,
                password,
                database,
            } => {
                let options = PgConnectOptions::new()
                    .host(host)
                    .port(*port)
                    .username(user)
                    .database(database);
                Ok(match password {
                    Some(password) => options.password(password),
                    None => options,
                })
            }
        }
    }
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DatabaseConfig::Url(_) => f.debug_tuple("Url").field(&"<redacted>").finish(),
            DatabaseConfig::Parts {
                host,
                port,
                user,
                database,
                ..
            } => f
                .debug_struct("Parts")
                .field("host", host)
                .field("port", port)
                .field("user", user)
                .field("database", database)
                .finish_non_exhaustive(),
        }
    }
}
