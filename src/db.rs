// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Serialize, de::DeserializeOwned};
use std::fs;
use std::path::PathBuf;

use crate::config::Config;

static APP: Lazy<(&str, &str, &str)> = Lazy::new(|| ("org.alphavelocity", "Sadaqah", "sadaqah"));

pub fn db_path(config: &Config) -> Result<PathBuf> {
    if let Some(p) = &config.db_path {
        if let Some(parent) = p.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(parent).context("Failed to create data dir")?;
        }
        return Ok(p.clone());
    }
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("sadaqah.sqlite"))
}

pub fn open_or_init(config: &Config) -> Result<Connection> {
    let path = db_path(config)?;
    let mut conn =
        Connection::open(&path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&mut conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    CREATE TABLE IF NOT EXISTS settings(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    -- device-local key/value storage: session, basket mirror, checkout hand-off
    CREATE TABLE IF NOT EXISTS storage(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        updated_at TEXT NOT NULL DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS metal_prices(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        fetched_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        gold_usd TEXT NOT NULL,
        gold_aud TEXT NOT NULL,
        silver_fine_usd TEXT NOT NULL,
        silver_fine_aud TEXT NOT NULL,
        silver_sterling_usd TEXT NOT NULL,
        silver_sterling_aud TEXT NOT NULL,
        status TEXT NOT NULL CHECK(status IN ('fresh','degraded'))
    );
    CREATE INDEX IF NOT EXISTS idx_metal_prices_fetched ON metal_prices(fetched_at);
    "#,
    )?;
    Ok(())
}

pub fn storage_get(conn: &Connection, key: &str) -> Result<Option<String>> {
    let v: Option<String> = conn
        .query_row("SELECT value FROM storage WHERE key=?1", params![key], |r| {
            r.get(0)
        })
        .optional()?;
    Ok(v)
}

pub fn storage_set(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO storage(key, value, updated_at) VALUES(?1, ?2, datetime('now'))
         ON CONFLICT(key) DO UPDATE SET value=excluded.value, updated_at=excluded.updated_at",
        params![key, value],
    )?;
    Ok(())
}

pub fn storage_remove(conn: &Connection, key: &str) -> Result<()> {
    conn.execute("DELETE FROM storage WHERE key=?1", params![key])?;
    Ok(())
}

pub fn load_json<T: DeserializeOwned>(conn: &Connection, key: &str) -> Result<Option<T>> {
    match storage_get(conn, key)? {
        Some(raw) => {
            let v = serde_json::from_str(&raw)
                .with_context(|| format!("Stored '{}' is not valid JSON", key))?;
            Ok(Some(v))
        }
        None => Ok(None),
    }
}

pub fn save_json<T: Serialize + ?Sized>(conn: &Connection, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    storage_set(conn, key, &raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_roundtrip_and_remove() {
        let mut conn = Connection::open_in_memory().unwrap();
        init_schema(&mut conn).unwrap();
        assert_eq!(storage_get(&conn, "authData").unwrap(), None);
        storage_set(&conn, "authData", "{\"token\":\"a\"}").unwrap();
        storage_set(&conn, "authData", "{\"token\":\"b\"}").unwrap();
        let v: serde_json::Value = load_json(&conn, "authData").unwrap().unwrap();
        assert_eq!(v["token"], "b");
        storage_remove(&conn, "authData").unwrap();
        assert!(storage_get(&conn, "authData").unwrap().is_none());
    }

    #[test]
    fn load_json_reports_corrupt_value() {
        let mut conn = Connection::open_in_memory().unwrap();
        init_schema(&mut conn).unwrap();
        storage_set(&conn, "localBasket", "[{").unwrap();
        let err = load_json::<serde_json::Value>(&conn, "localBasket").unwrap_err();
        assert!(err.to_string().contains("localBasket"));
    }
}
