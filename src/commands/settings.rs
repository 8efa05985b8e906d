// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Result, bail};
use rusqlite::Connection;

use crate::config::Config;
use crate::db::db_path;
use crate::models::Currency;
use crate::utils::{get_display_currency, pretty_table, set_display_currency, set_setting};

pub fn handle(conn: &Connection, config: &Config, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("show", _)) => {
            let rows = vec![
                vec!["api_url".to_string(), config.api_url(conn)?],
                vec![
                    "display_currency".to_string(),
                    get_display_currency(conn)?.to_string(),
                ],
                vec![
                    "http_timeout_secs".to_string(),
                    config.http_timeout_secs.to_string(),
                ],
                vec!["database".to_string(), db_path(config)?.display().to_string()],
            ];
            println!("{}", pretty_table(&["Setting", "Value"], rows));
        }
        Some(("set-currency", sub)) => {
            let ccy: Currency = sub.get_one::<String>("currency").unwrap().parse()?;
            set_display_currency(conn, ccy)?;
            println!("Display currency set to {}", ccy);
        }
        Some(("set-api", sub)) => {
            let url = set_api_url(conn, sub.get_one::<String>("url").unwrap())?;
            if config.api_url.is_some() {
                println!("Saved {}, but SADAQAH_API_URL is set and takes precedence", url);
            } else {
                println!("API URL set to {}", url);
            }
        }
        _ => {}
    }
    Ok(())
}

pub fn set_api_url(conn: &Connection, raw: &str) -> Result<String> {
    let url = raw.trim().trim_end_matches('/');
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        bail!("API URL must start with http:// or https://");
    }
    set_setting(conn, "api_url", url)?;
    Ok(url.to_string())
}
