// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Runtime configuration loaded from environment variables.
//!
//! `main` calls `dotenvy::dotenv()` first, so a `.env` file next to the
//! binary works too. The API URL can also be pinned in the `settings`
//! table with `sadaqah config set-api`; the environment wins over it.

use anyhow::{Context, Result};
use rusqlite::Connection;
use std::path::PathBuf;
use std::time::Duration;

use crate::utils::get_setting;

pub const DEFAULT_API_URL: &str = "https://api.alihsan.org.au";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Default)]
pub struct Config {
    /// `SADAQAH_API_URL`; overrides the stored setting when present.
    pub api_url: Option<String>,
    /// `SADAQAH_HTTP_TIMEOUT_SECS`; the single request timeout for every call.
    pub http_timeout_secs: u64,
    /// `SADAQAH_DB`; path of the SQLite file instead of the platform data dir.
    pub db_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let http_timeout_secs = match env_var("SADAQAH_HTTP_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("Invalid SADAQAH_HTTP_TIMEOUT_SECS '{}'", raw))?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };
        Ok(Config {
            api_url: env_var("SADAQAH_API_URL"),
            http_timeout_secs,
            db_path: env_var("SADAQAH_DB").map(PathBuf::from),
        })
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Environment first, then the `api_url` setting, then the production URL.
    pub fn api_url(&self, conn: &Connection) -> Result<String> {
        if let Some(url) = &self.api_url {
            return Ok(url.trim_end_matches('/').to_string());
        }
        let stored = get_setting(conn, "api_url")?;
        Ok(stored
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string()))
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::set_setting;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE settings(key TEXT PRIMARY KEY, value TEXT NOT NULL);")
            .unwrap();
        conn
    }

    #[test]
    fn api_url_prefers_environment_over_setting() {
        let conn = setup();
        set_setting(&conn, "api_url", "http://localhost:4000/").unwrap();
        let cfg = Config {
            api_url: Some("https://staging.example.org/".into()),
            ..Config::default()
        };
        assert_eq!(cfg.api_url(&conn).unwrap(), "https://staging.example.org");
    }

    #[test]
    fn api_url_falls_back_to_setting_then_default() {
        let conn = setup();
        let cfg = Config::default();
        assert_eq!(cfg.api_url(&conn).unwrap(), DEFAULT_API_URL);
        set_setting(&conn, "api_url", "http://localhost:4000/").unwrap();
        assert_eq!(cfg.api_url(&conn).unwrap(), "http://localhost:4000");
    }
}
