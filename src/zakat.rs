// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Wealth aggregation, nisab thresholds and the 2.5% obligation.
//!
//! All thresholds are computed in USD from the spot feed and converted to
//! the display currency through the gold cross-rate (goldUsd / goldAud),
//! for silver as well as gold. Anything the feed cannot support collapses
//! to zero instead of erroring; a zero nisab means "prices unavailable".

use anyhow::{Result, anyhow};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::db::{load_json, save_json, storage_remove};
use crate::models::{Currency, Metal, MetalHolding, MetalPrices, WeightUnit, ZakatAmounts};

/// Silver nisab weight, multiplied by the fine silver spot quote.
pub const SILVER_NISAB_WEIGHT: Decimal = Decimal::from_parts(61236, 0, 0, false, 2);
/// Gold nisab weight, multiplied by the gold spot quote.
pub const GOLD_NISAB_WEIGHT: Decimal = Decimal::from_parts(8748, 0, 0, false, 2);
pub const TROY_OUNCE_GRAMS: Decimal = Decimal::from_parts(311035, 0, 0, false, 4);
/// wealth / 40 == 2.5%
pub const ZAKAT_DIVISOR: Decimal = Decimal::from_parts(40, 0, 0, false, 0);

pub const GOLD_KARATS: [u32; 5] = [24, 22, 18, 14, 10];
pub const SILVER_KARATS: [u32; 1] = [1];

pub const WORKSHEET_KEY: &str = "zakatWorksheet";
pub const FIRST_STEP: u8 = 1;
pub const LAST_STEP: u8 = 5;

fn checked_sum<'a>(values: impl IntoIterator<Item = &'a Decimal>) -> Option<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v))
}

fn checked_wealth(a: &ZakatAmounts) -> Option<Decimal> {
    let gold = checked_sum(a.gold.iter().map(|h| &h.value))?;
    let silver = checked_sum(a.silver.iter().map(|h| &h.value))?;
    checked_sum([
        &a.cash,
        &a.bank,
        &silver,
        &gold,
        &a.investment_profit,
        &a.share_resale,
        &a.merchandise,
        &a.loan,
        &a.other,
    ])
}

/// Total zakatable wealth. Negative entries are summed as given.
pub fn calculate_wealth(amounts: &ZakatAmounts) -> Decimal {
    checked_wealth(amounts).unwrap_or(Decimal::ZERO)
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct Nisab {
    pub silver: Decimal,
    pub gold: Decimal,
}

/// The three quotes every threshold depends on must be present and non-zero.
fn usable(prices: Option<&MetalPrices>) -> Option<&MetalPrices> {
    prices.filter(|p| {
        !p.silver_fine_price_in_usd.is_zero()
            && !p.gold_price_in_usd.is_zero()
            && !p.gold_price_in_aud.is_zero()
    })
}

/// USD per AUD, derived from the two gold quotes.
pub fn cross_rate(prices: &MetalPrices) -> Option<Decimal> {
    prices
        .gold_price_in_usd
        .checked_div(prices.gold_price_in_aud)
        .filter(|r| !r.is_zero())
}

fn usd_to_unit(amount: Decimal, prices: &MetalPrices, unit: Currency) -> Option<Decimal> {
    match unit {
        Currency::Usd => Some(amount),
        Currency::Aud => amount.checked_div(cross_rate(prices)?),
    }
}

pub fn calculate_nisab(prices: Option<&MetalPrices>, unit: Currency) -> Nisab {
    let Some(p) = usable(prices) else {
        return Nisab::default();
    };
    let silver = SILVER_NISAB_WEIGHT
        .checked_mul(p.silver_fine_price_in_usd)
        .and_then(|usd| usd_to_unit(usd, p, unit));
    let gold = GOLD_NISAB_WEIGHT
        .checked_mul(p.gold_price_in_usd)
        .and_then(|usd| usd_to_unit(usd, p, unit));
    match (silver, gold) {
        (Some(silver), Some(gold)) => Nisab { silver, gold },
        _ => Nisab::default(),
    }
}

/// Zakat due in the worksheet's currency. Only the silver threshold
/// decides eligibility; wealth must exceed it strictly.
pub fn calculate_zakat(amounts: &ZakatAmounts, prices: Option<&MetalPrices>) -> Decimal {
    let Some(p) = usable(prices) else {
        return Decimal::ZERO;
    };
    let Some(wealth) = checked_wealth(amounts) else {
        return Decimal::ZERO;
    };
    let Some(nisab_silver) = SILVER_NISAB_WEIGHT
        .checked_mul(p.silver_fine_price_in_usd)
        .and_then(|usd| usd_to_unit(usd, p, amounts.unit))
    else {
        return Decimal::ZERO;
    };
    if nisab_silver < wealth {
        wealth.checked_div(ZAKAT_DIVISOR).unwrap_or(Decimal::ZERO)
    } else {
        Decimal::ZERO
    }
}

/// Market value of a metal holding from its weight, in the display currency.
pub fn estimate_metal_value(
    metal: Metal,
    karat: u32,
    weight: Decimal,
    unit: WeightUnit,
    prices: Option<&MetalPrices>,
    currency: Currency,
) -> Decimal {
    let Some(p) = prices else {
        return Decimal::ZERO;
    };
    if weight <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let per_gram = match metal {
        Metal::Gold => p
            .gold_in(currency)
            .checked_div(TROY_OUNCE_GRAMS)
            .and_then(|g| g.checked_mul(Decimal::from(karat)))
            .and_then(|g| g.checked_div(Decimal::from(24))),
        Metal::Silver => p.silver_fine_in(currency).checked_div(TROY_OUNCE_GRAMS),
    };
    let grams = match unit {
        WeightUnit::Gram => Some(weight),
        WeightUnit::Ounce => weight.checked_mul(TROY_OUNCE_GRAMS),
    };
    grams
        .zip(per_gram)
        .and_then(|(g, per)| g.checked_mul(per))
        .unwrap_or(Decimal::ZERO)
}

pub fn allowed_karats(metal: Metal) -> &'static [u32] {
    match metal {
        Metal::Gold => &GOLD_KARATS,
        Metal::Silver => &SILVER_KARATS,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZakatSummary {
    pub currency: Currency,
    pub wealth: Decimal,
    pub nisab: Nisab,
    pub zakat_due: Decimal,
    pub zakatable: bool,
    pub prices_updated_at: Option<DateTime<Utc>>,
}

pub fn summarize(amounts: &ZakatAmounts, prices: Option<&MetalPrices>) -> ZakatSummary {
    let zakat_due = calculate_zakat(amounts, prices);
    ZakatSummary {
        currency: amounts.unit,
        wealth: calculate_wealth(amounts),
        nisab: calculate_nisab(prices, amounts.unit),
        zakat_due,
        zakatable: zakat_due > Decimal::ZERO,
        prices_updated_at: prices.map(|p| p.updated_at),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountField {
    Cash,
    Bank,
    InvestmentProfit,
    ShareResale,
    Merchandise,
    Loan,
    Other,
}

impl FromStr for AmountField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm: String = s
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();
        match norm.as_str() {
            "cash" => Ok(AmountField::Cash),
            "bank" => Ok(AmountField::Bank),
            "investmentprofit" | "investment" => Ok(AmountField::InvestmentProfit),
            "shareresale" | "shares" => Ok(AmountField::ShareResale),
            "merchandise" => Ok(AmountField::Merchandise),
            "loan" | "loans" => Ok(AmountField::Loan),
            "other" => Ok(AmountField::Other),
            _ => Err(anyhow!("Unknown zakat field '{}'", s.trim())),
        }
    }
}

/// The calculator wizard: five steps over one set of amounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZakatWorksheet {
    pub step: u8,
    pub amounts: ZakatAmounts,
}

impl Default for ZakatWorksheet {
    fn default() -> Self {
        ZakatWorksheet {
            step: FIRST_STEP,
            amounts: ZakatAmounts::default(),
        }
    }
}

impl ZakatWorksheet {
    pub fn load(conn: &Connection) -> Result<Self> {
        Ok(load_json(conn, WORKSHEET_KEY)?.unwrap_or_default())
    }

    pub fn save(&self, conn: &Connection) -> Result<()> {
        save_json(conn, WORKSHEET_KEY, self)
    }

    pub fn discard(conn: &Connection) -> Result<()> {
        storage_remove(conn, WORKSHEET_KEY)
    }

    pub fn next_step(&mut self) {
        self.step = (self.step + 1).min(LAST_STEP);
    }

    pub fn prev_step(&mut self) {
        self.step = self.step.saturating_sub(1).max(FIRST_STEP);
    }

    pub fn set_step(&mut self, step: u8) {
        self.step = step.clamp(FIRST_STEP, LAST_STEP);
    }

    pub fn update_amount(&mut self, field: AmountField, value: Decimal) {
        let a = &mut self.amounts;
        let slot = match field {
            AmountField::Cash => &mut a.cash,
            AmountField::Bank => &mut a.bank,
            AmountField::InvestmentProfit => &mut a.investment_profit,
            AmountField::ShareResale => &mut a.share_resale,
            AmountField::Merchandise => &mut a.merchandise,
            AmountField::Loan => &mut a.loan,
            AmountField::Other => &mut a.other,
        };
        *slot = value;
    }

    pub fn set_currency(&mut self, unit: Currency) {
        self.amounts.unit = unit;
    }

    /// Replaces the holding with the same key, or appends it.
    pub fn upsert_metal(&mut self, metal: Metal, holding: MetalHolding) {
        let list = self.amounts.holdings_mut(metal);
        match list.iter_mut().find(|h| h.key == holding.key) {
            Some(existing) => *existing = holding,
            None => list.push(holding),
        }
    }

    pub fn remove_metal(&mut self, metal: Metal, key: &str) -> bool {
        let list = self.amounts.holdings_mut(metal);
        let before = list.len();
        list.retain(|h| h.key != key);
        list.len() != before
    }

    pub fn reset(&mut self) {
        *self = ZakatWorksheet::default();
    }

    pub fn summary(&self, prices: Option<&MetalPrices>) -> ZakatSummary {
        summarize(&self.amounts, prices)
    }
}
