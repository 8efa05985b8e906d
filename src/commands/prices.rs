// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use chrono::Utc;
use rusqlite::Connection;

use crate::api::ApiClient;
use crate::prices::{PriceRefresh, RetryPolicy, record_refresh, recent_prices, refresh_prices};
use crate::utils::{maybe_print_json, pretty_table};

pub fn handle(conn: &Connection, api: &ApiClient, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("fetch", _)) => fetch(conn, api)?,
        Some(("list", sub)) => {
            let limit = *sub.get_one::<usize>("limit").unwrap_or(&20);
            list(conn, limit, sub)?;
        }
        _ => {}
    }
    Ok(())
}

fn fetch(conn: &Connection, api: &ApiClient) -> Result<()> {
    let outcome = refresh_prices(api, &RetryPolicy::default());
    record_refresh(conn, &outcome, Utc::now())?;
    match &outcome {
        PriceRefresh::Fresh(p) => println!(
            "Gold {} USD/oz, silver {} USD/oz (as of {})",
            p.gold_price_in_usd, p.silver_fine_price_in_usd, p.updated_at
        ),
        PriceRefresh::Degraded(p) => println!(
            "Prices came back empty after retries; stored the last response from {}",
            p.updated_at
        ),
        PriceRefresh::Exhausted(e) => println!("Could not reach the price feed: {}", e),
    }
    Ok(())
}

fn list(conn: &Connection, limit: usize, sub: &clap::ArgMatches) -> Result<()> {
    let snapshots = recent_prices(conn, limit)?;
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &snapshots)? {
        return Ok(());
    }
    let rows = snapshots
        .into_iter()
        .map(|s| {
            let p = s.prices;
            vec![
                s.fetched_at.format("%Y-%m-%d %H:%M").to_string(),
                s.status,
                format!("{:.2}", p.gold_price_in_usd),
                format!("{:.2}", p.gold_price_in_aud),
                format!("{:.4}", p.silver_fine_price_in_usd),
                format!("{:.4}", p.silver_fine_price_in_aud),
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &["Fetched", "Status", "Gold USD", "Gold AUD", "Silver USD", "Silver AUD"],
            rows
        )
    );
    Ok(())
}
