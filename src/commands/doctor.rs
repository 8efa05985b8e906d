// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::basket::LOCAL_BASKET_KEY;
use crate::commands::auth::SESSION_KEY;
use crate::db::load_json;
use crate::models::{AuthSession, BasketItem};
use crate::prices::latest_snapshot;
use crate::utils::pretty_table;
use crate::zakat::{WORKSHEET_KEY, ZakatWorksheet};
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use rusqlite::Connection;

pub const STALE_PRICES_HOURS: i64 = 24;

pub fn handle(conn: &Connection) -> Result<()> {
    let rows = diagnose(conn, Utc::now())?;
    if rows.is_empty() {
        println!("✅ doctor: no issues found");
    } else {
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}

pub fn diagnose(conn: &Connection, now: DateTime<Utc>) -> Result<Vec<Vec<String>>> {
    let mut rows = Vec::new();

    // 1) Metal prices the calculator would run on
    match latest_snapshot(conn) {
        Ok(None) => rows.push(vec![
            "no_metal_prices".into(),
            "run `sadaqah prices fetch`".into(),
        ]),
        Ok(Some(s)) => {
            if s.status != "fresh" || !s.prices.has_quotes() {
                rows.push(vec![
                    "degraded_metal_prices".into(),
                    format!("{} snapshot from {}", s.status, s.fetched_at),
                ]);
            }
            if now - s.fetched_at > Duration::hours(STALE_PRICES_HOURS) {
                rows.push(vec!["stale_metal_prices".into(), s.fetched_at.to_rfc3339()]);
            }
        }
        Err(e) => rows.push(vec!["unreadable_metal_prices".into(), format!("{:#}", e)]),
    }

    // 2) Persisted client state
    if let Err(e) = load_json::<Vec<BasketItem>>(conn, LOCAL_BASKET_KEY) {
        rows.push(vec!["unreadable_local_basket".into(), format!("{:#}", e)]);
    }
    if let Err(e) = load_json::<ZakatWorksheet>(conn, WORKSHEET_KEY) {
        rows.push(vec!["unreadable_zakat_worksheet".into(), format!("{:#}", e)]);
    }
    match load_json::<AuthSession>(conn, SESSION_KEY) {
        Ok(Some(s)) if s.token.trim().is_empty() => {
            rows.push(vec!["session_without_token".into(), s.email])
        }
        Ok(_) => {}
        Err(e) => rows.push(vec!["unreadable_session".into(), format!("{:#}", e)]),
    }

    Ok(rows)
}
