// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Metal-price refresh with a bounded, fixed-delay retry, plus the local
//! price history that lets the calculator work from the last snapshot.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use rust_decimal::Decimal;
use serde::Serialize;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::api::PriceFeed;
use crate::models::MetalPrices;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Pause after a response without usable quotes.
    pub invalid_delay: Duration,
    /// Pause after a failed request.
    pub error_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_retries: 3,
            invalid_delay: Duration::from_secs(2),
            error_delay: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PriceRefresh {
    Fresh(MetalPrices),
    /// Retries ran out; the last response received, possibly all zero.
    Degraded(MetalPrices),
    /// Retries ran out without any response; carries the last error.
    Exhausted(String),
}

impl PriceRefresh {
    pub fn prices(&self) -> Option<&MetalPrices> {
        match self {
            PriceRefresh::Fresh(p) | PriceRefresh::Degraded(p) => Some(p),
            PriceRefresh::Exhausted(_) => None,
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            PriceRefresh::Fresh(_) => "fresh",
            PriceRefresh::Degraded(_) => "degraded",
            PriceRefresh::Exhausted(_) => "exhausted",
        }
    }
}

pub fn refresh_prices<F: PriceFeed + ?Sized>(feed: &F, policy: &RetryPolicy) -> PriceRefresh {
    refresh_prices_with(feed, policy, std::thread::sleep)
}

/// Same as [`refresh_prices`] with the pause between attempts supplied by
/// the caller.
pub fn refresh_prices_with<F, S>(feed: &F, policy: &RetryPolicy, mut sleep: S) -> PriceRefresh
where
    F: PriceFeed + ?Sized,
    S: FnMut(Duration),
{
    let mut last_received: Option<MetalPrices> = None;
    let mut last_error = String::new();
    let mut retries = 0;

    loop {
        let delay = match feed.metal_prices() {
            Ok(prices) if prices.has_quotes() => {
                info!(updated_at = %prices.updated_at, "Loaded metal prices");
                return PriceRefresh::Fresh(prices);
            }
            Ok(prices) => {
                last_received = Some(prices);
                policy.invalid_delay
            }
            Err(e) => {
                last_error = e.to_string();
                policy.error_delay
            }
        };

        if retries >= policy.max_retries {
            error!("Failed to load metal prices after {} retries", retries);
            return match last_received {
                Some(p) => PriceRefresh::Degraded(p),
                None => PriceRefresh::Exhausted(last_error),
            };
        }
        retries += 1;
        warn!(
            "Metal prices unavailable, retrying in {:?} ({}/{})",
            delay, retries, policy.max_retries
        );
        sleep(delay);
    }
}

pub fn store_prices(
    conn: &Connection,
    prices: &MetalPrices,
    fetched_at: DateTime<Utc>,
    status: &str,
) -> Result<()> {
    conn.execute(
        "INSERT INTO metal_prices(fetched_at, updated_at, gold_usd, gold_aud, silver_fine_usd,
            silver_fine_aud, silver_sterling_usd, silver_sterling_aud, status)
         VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9)",
        params![
            fetched_at.to_rfc3339(),
            prices.updated_at.to_rfc3339(),
            prices.gold_price_in_usd.to_string(),
            prices.gold_price_in_aud.to_string(),
            prices.silver_fine_price_in_usd.to_string(),
            prices.silver_fine_price_in_aud.to_string(),
            prices.silver_sterling_price_in_usd.to_string(),
            prices.silver_sterling_price_in_aud.to_string(),
            status,
        ],
    )?;
    Ok(())
}

/// Caches whatever the refresh surfaced. Returns false for `Exhausted`.
pub fn record_refresh(conn: &Connection, outcome: &PriceRefresh, at: DateTime<Utc>) -> Result<bool> {
    match outcome.prices() {
        Some(p) => {
            store_prices(conn, p, at, outcome.status())?;
            Ok(true)
        }
        None => Ok(false),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredPrices {
    pub fetched_at: DateTime<Utc>,
    pub status: String,
    pub prices: MetalPrices,
}

fn parse_ts(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("Invalid timestamp '{}' in metal_prices", s))?
        .with_timezone(&Utc))
}

fn parse_price(s: &str) -> Result<Decimal> {
    s.parse::<Decimal>()
        .with_context(|| format!("Invalid price '{}' in metal_prices", s))
}

type RawRow = (String, String, [String; 6], String);

fn raw_row(r: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok((
        r.get(0)?,
        r.get(1)?,
        [r.get(2)?, r.get(3)?, r.get(4)?, r.get(5)?, r.get(6)?, r.get(7)?],
        r.get(8)?,
    ))
}

fn decode(raw: RawRow) -> Result<StoredPrices> {
    let (fetched_at, updated_at, q, status) = raw;
    Ok(StoredPrices {
        fetched_at: parse_ts(&fetched_at)?,
        status,
        prices: MetalPrices {
            gold_price_in_usd: parse_price(&q[0])?,
            gold_price_in_aud: parse_price(&q[1])?,
            silver_fine_price_in_usd: parse_price(&q[2])?,
            silver_fine_price_in_aud: parse_price(&q[3])?,
            silver_sterling_price_in_usd: parse_price(&q[4])?,
            silver_sterling_price_in_aud: parse_price(&q[5])?,
            updated_at: parse_ts(&updated_at)?,
        },
    })
}

const SELECT_COLUMNS: &str = "SELECT fetched_at, updated_at, gold_usd, gold_aud, silver_fine_usd,
    silver_fine_aud, silver_sterling_usd, silver_sterling_aud, status FROM metal_prices";

pub fn latest_snapshot(conn: &Connection) -> Result<Option<StoredPrices>> {
    let sql = format!("{} ORDER BY fetched_at DESC, id DESC LIMIT 1", SELECT_COLUMNS);
    let raw = conn.query_row(&sql, [], raw_row).optional()?;
    raw.map(decode).transpose()
}

pub fn latest_prices(conn: &Connection) -> Result<Option<MetalPrices>> {
    Ok(latest_snapshot(conn)?.map(|s| s.prices))
}

pub fn recent_prices(conn: &Connection, limit: usize) -> Result<Vec<StoredPrices>> {
    let sql = format!("{} ORDER BY fetched_at DESC, id DESC LIMIT ?1", SELECT_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![limit as i64], raw_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(decode(row?)?);
    }
    Ok(out)
}
