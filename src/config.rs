// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! Configuration is read from the environment once at startup and shared
//! read-only for the lifetime of the process.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `JWT_SECRET` | HS256 signing secret | Required (startup fails without it) |
//! | `JWT_EXPIRES_IN` | Token lifetime (`90s`, `30m`, `2h`, `7d`, or seconds) | `2h` |
//! | `PASSWORD_RESET_TOKEN_TTL_MINUTES` | Reset secret lifetime | `15` |
//! | `RETURN_RESET_URL` | Echo the reset link in the API response (development only) | `false` |
//! | `FRONTEND_URL` | Base URL of the web app hosting `/reset-password` | `http://localhost:3000` |
//! | `DATA_DIR` | Directory holding the auth database | `./data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `EMAIL_API_URL` | HTTP mail API endpoint; unset disables email | unset |
//! | `EMAIL_API_KEY` | Bearer key for the mail API | unset |
//! | `EMAIL_FROM` | Sender address | `no-reply@verdant.local` |
//! | `SESSION_SWEEP_INTERVAL_SECS` | Expired session/secret purge interval | `300` |
//! | `ADMIN_EMAIL` / `ADMIN_PASSWORD` | Bootstrap admin account | unset |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::path::PathBuf;

use chrono::{Duration, Utc};

pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const JWT_EXPIRES_IN_ENV: &str = "JWT_EXPIRES_IN";
pub const RESET_TTL_MINUTES_ENV: &str = "PASSWORD_RESET_TOKEN_TTL_MINUTES";
pub const RETURN_RESET_URL_ENV: &str = "RETURN_RESET_URL";
pub const FRONTEND_URL_ENV: &str = "FRONTEND_URL";
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const EMAIL_API_URL_ENV: &str = "EMAIL_API_URL";
pub const EMAIL_API_KEY_ENV: &str = "EMAIL_API_KEY";
pub const EMAIL_FROM_ENV: &str = "EMAIL_FROM";
pub const SWEEP_INTERVAL_ENV: &str = "SESSION_SWEEP_INTERVAL_SECS";
pub const ADMIN_EMAIL_ENV: &str = "ADMIN_EMAIL";
pub const ADMIN_PASSWORD_ENV: &str = "ADMIN_PASSWORD";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_JWT_EXPIRES_IN: &str = "2h";
pub const DEFAULT_RESET_TTL_MINUTES: i64 = 15;
pub const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";
pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_EMAIL_FROM: &str = "no-reply@verdant.local";
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{var} has invalid value {value:?}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// Outbound mail API settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailApiConfig {
    pub url: String,
    pub api_key: Option<String>,
    pub from: String,
}

/// Credentials for the startup admin bootstrap.
#[derive(Clone, PartialEq, Eq)]
pub struct AdminBootstrap {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for AdminBootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminBootstrap")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Process-wide configuration.
#[derive(Clone)]
pub struct AppConfig {
    pub jwt_secret: String,
    pub jwt_ttl: Duration,
    pub reset_ttl: Duration,
    pub return_reset_url: bool,
    pub frontend_url: String,
    pub data_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub email: Option<EmailApiConfig>,
    pub sweep_interval: std::time::Duration,
    pub admin_bootstrap: Option<AdminBootstrap>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("jwt_secret", &"<redacted>")
            .field("jwt_ttl", &self.jwt_ttl)
            .field("reset_ttl", &self.reset_ttl)
            .field("return_reset_url", &self.return_reset_url)
            .field("frontend_url", &self.frontend_url)
            .field("data_dir", &self.data_dir)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("email", &self.email.as_ref().map(|e| &e.url))
            .field("sweep_interval", &self.sweep_interval)
            .field("admin_bootstrap", &self.admin_bootstrap)
            .finish()
    }
}

impl AppConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = get(JWT_SECRET_ENV).ok_or(ConfigError::Missing(JWT_SECRET_ENV))?;

        let jwt_ttl_raw = get(JWT_EXPIRES_IN_ENV).unwrap_or_else(|| DEFAULT_JWT_EXPIRES_IN.into());
        let jwt_ttl = parse_duration(&jwt_ttl_raw).map_err(|reason| ConfigError::Invalid {
            var: JWT_EXPIRES_IN_ENV,
            value: jwt_ttl_raw.clone(),
            reason,
        })?;

        let reset_ttl = match get(RESET_TTL_MINUTES_ENV) {
            Some(raw) => match raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|minutes| *minutes > 0)
                .and_then(Duration::try_minutes)
                .filter(|ttl| fits_from_now(*ttl))
            {
                Some(ttl) => ttl,
                None => {
                    return Err(ConfigError::Invalid {
                        var: RESET_TTL_MINUTES_ENV,
                        value: raw,
                        reason: "expected a positive number of minutes in range".into(),
                    })
                }
            },
            None => Duration::minutes(DEFAULT_RESET_TTL_MINUTES),
        };

        let return_reset_url = get(RETURN_RESET_URL_ENV)
            .map(|v| v.trim().eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let frontend_url = get(FRONTEND_URL_ENV).unwrap_or_else(|| DEFAULT_FRONTEND_URL.into());
        if let Err(e) = url::Url::parse(&frontend_url) {
            return Err(ConfigError::Invalid {
                var: FRONTEND_URL_ENV,
                value: frontend_url,
                reason: e.to_string(),
            });
        }

        let port = match get(PORT_ENV) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::Invalid {
                var: PORT_ENV,
                value: raw.clone(),
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };

        let sweep_secs = match get(SWEEP_INTERVAL_ENV) {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: SWEEP_INTERVAL_ENV,
                        value: raw,
                        reason: "expected a positive number of seconds".into(),
                    })
                }
            },
            None => DEFAULT_SWEEP_INTERVAL_SECS,
        };

        let email = get(EMAIL_API_URL_ENV).map(|url| EmailApiConfig {
            url,
            api_key: get(EMAIL_API_KEY_ENV),
            from: get(EMAIL_FROM_ENV).unwrap_or_else(|| DEFAULT_EMAIL_FROM.into()),
        });

        let admin_bootstrap = match (get(ADMIN_EMAIL_ENV), get(ADMIN_PASSWORD_ENV)) {
            (Some(email), Some(password)) => Some(AdminBootstrap { email, password }),
            _ => None,
        };

        Ok(Self {
            jwt_secret,
            jwt_ttl,
            reset_ttl,
            return_reset_url,
            frontend_url,
            data_dir: PathBuf::from(get(DATA_DIR_ENV).unwrap_or_else(|| DEFAULT_DATA_DIR.into())),
            host: get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.into()),
            port,
            email,
            sweep_interval: std::time::Duration::from_secs(sweep_secs),
            admin_bootstrap,
        })
    }

    /// Default configuration around an explicit signing secret.
    pub fn with_secret(jwt_secret: impl Into<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            jwt_ttl: Duration::hours(2),
            reset_ttl: Duration::minutes(DEFAULT_RESET_TTL_MINUTES),
            return_reset_url: false,
            frontend_url: DEFAULT_FRONTEND_URL.into(),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            host: DEFAULT_HOST.into(),
            port: DEFAULT_PORT,
            email: None,
            sweep_interval: std::time::Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS),
            admin_bootstrap: None,
        }
    }
}

/// Parse a token lifetime such as `90s`, `30m`, `2h`, `7d` or `3600`.
pub fn parse_duration(raw: &str) -> Result<Duration, String> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);

    let amount: i64 = digits
        .parse()
        .map_err(|_| "expected a number followed by s, m, h or d".to_string())?;
    if amount <= 0 {
        return Err("duration must be positive".into());
    }

    let ttl = match unit.trim() {
        "" | "s" => Duration::try_seconds(amount),
        "m" => Duration::try_minutes(amount),
        "h" => Duration::try_hours(amount),
        "d" => Duration::try_days(amount),
        other => return Err(format!("unknown unit {other:?}")),
    };

    ttl.filter(|ttl| fits_from_now(*ttl))
        .ok_or_else(|| "duration is out of range".to_string())
}

/// Whether an expiry `ttl` from now is representable.
fn fits_from_now(ttl: Duration) -> bool {
    Utc::now().checked_add_signed(ttl).is_some()
}
