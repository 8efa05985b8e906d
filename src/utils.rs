// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result, bail};
use comfy_table::{Cell, Table, presets::UTF8_FULL};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;
use std::time::Duration;

use crate::models::Currency;

const UA: &str = concat!(
    "sadaqah/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/alphavelocity/sadaqah)"
);

static NON_NUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9.]").expect("static regex"));

pub fn http_client(timeout: Duration) -> Result<reqwest::blocking::Client> {
    let c = reqwest::blocking::Client::builder()
        .timeout(timeout)
        .user_agent(UA)
        .build()?;
    Ok(c)
}

pub fn parse_decimal(s: &str) -> Result<Decimal> {
    s.trim()
        .parse::<Decimal>()
        .with_context(|| format!("Invalid decimal '{}'", s))
}

/// Lenient money input: everything but digits and `.` is dropped and input
/// without digits is zero. A second decimal point is rejected.
pub fn coerce_amount(s: &str) -> Result<Decimal> {
    let cleaned = NON_NUMERIC.replace_all(s, "");
    if cleaned.matches('.').count() > 1 {
        bail!("Invalid amount '{}': more than one decimal point", s.trim());
    }
    if !cleaned.chars().any(|c| c.is_ascii_digit()) {
        return Ok(Decimal::ZERO);
    }
    cleaned
        .parse::<Decimal>()
        .with_context(|| format!("Invalid amount '{}'", s.trim()))
}

pub fn fmt_money(d: &Decimal, ccy: Currency) -> String {
    format!("{} {:.2}", ccy, d.round_dp(2))
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

pub fn maybe_print_json<T: serde::Serialize>(
    json_flag: bool,
    jsonl_flag: bool,
    v: &T,
) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    if jsonl_flag {
        // If v is an array, stream each element; else stream single line
        let val = serde_json::to_value(v)?;
        if let Some(arr) = val.as_array() {
            for item in arr {
                println!("{}", serde_json::to_string(item)?);
            }
        } else {
            println!("{}", serde_json::to_string(&val)?);
        }
        return Ok(true);
    }
    Ok(false)
}

pub fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>> {
    let v: Option<String> = conn
        .query_row(
            "SELECT value FROM settings WHERE key=?1",
            params![key],
            |r| r.get(0),
        )
        .optional()?;
    Ok(v)
}

pub fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value) VALUES(?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params![key, value],
    )?;
    Ok(())
}

// Display currency settings
pub fn get_display_currency(conn: &Connection) -> Result<Currency> {
    match get_setting(conn, "display_currency")? {
        Some(s) => s.parse(),
        None => Ok(Currency::default()),
    }
}

pub fn set_display_currency(conn: &Connection, ccy: Currency) -> Result<()> {
    set_setting(conn, "display_currency", ccy.code())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerce_amount_strips_symbols() {
        assert_eq!(coerce_amount("$1,250.50").unwrap(), Decimal::new(125050, 2));
        assert_eq!(coerce_amount(" 40 AUD").unwrap(), Decimal::from(40));
    }

    #[test]
    fn coerce_amount_without_digits_is_zero() {
        assert_eq!(coerce_amount("").unwrap(), Decimal::ZERO);
        assert_eq!(coerce_amount("abc").unwrap(), Decimal::ZERO);
        assert_eq!(coerce_amount(".").unwrap(), Decimal::ZERO);
    }

    #[test]
    fn coerce_amount_rejects_second_decimal_point() {
        let err = coerce_amount("1.2.3").unwrap_err();
        assert!(err.to_string().contains("more than one decimal point"));
    }

    #[test]
    fn coerce_amount_rejects_out_of_range() {
        assert!(coerce_amount("79228162514264337593543950336").is_err());
    }

    #[test]
    fn coerce_amount_drops_sign() {
        assert_eq!(coerce_amount("-75").unwrap(), Decimal::from(75));
    }

    #[test]
    fn fmt_money_rounds_to_cents() {
        assert_eq!(
            fmt_money(&Decimal::new(229635, 1), Currency::Aud),
            "AUD 22963.50"
        );
    }
}
