// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Result, anyhow, bail};
use chrono::Utc;
use rusqlite::Connection;
use rust_decimal::Decimal;
use tracing::warn;

use crate::api::{ApiClient, BasketRemote};
use crate::basket::BasketReconciler;
use crate::commands::basket::open_basket;
use crate::commands::campaigns::find_zakat_campaign;
use crate::models::{AddToBasket, Campaign, Metal, MetalHolding, MetalPrices, WeightUnit};
use crate::prices::{RetryPolicy, latest_prices, record_refresh, refresh_prices};
use crate::utils::{coerce_amount, fmt_money, maybe_print_json, parse_decimal, pretty_table};
use crate::zakat::{AmountField, ZakatWorksheet, allowed_karats, estimate_metal_value};

pub const ZAKAT_DONATION_ITEM: &str = "Zakat Al Maal Donation";

pub fn handle(conn: &Connection, api: &ApiClient, m: &clap::ArgMatches) -> Result<()> {
    let mut ws = ZakatWorksheet::load(conn)?;
    match m.subcommand() {
        Some(("show", sub)) => {
            let prices = if sub.get_flag("live") {
                let outcome = refresh_prices(api, &RetryPolicy::default());
                record_refresh(conn, &outcome, Utc::now())?;
                outcome.prices().cloned().or(latest_prices(conn)?)
            } else {
                latest_prices(conn)?
            };
            show(&ws, prices.as_ref(), sub)?;
        }
        Some(("set", sub)) => {
            let field: AmountField = sub.get_one::<String>("field").unwrap().parse()?;
            let value = coerce_amount(sub.get_one::<String>("value").unwrap())?;
            ws.update_amount(field, value);
            ws.save(conn)?;
            println!("Set {:?} to {}", field, fmt_money(&value, ws.amounts.unit));
        }
        Some(("currency", sub)) => {
            let ccy = sub.get_one::<String>("currency").unwrap().parse()?;
            ws.set_currency(ccy);
            ws.save(conn)?;
            println!("Zakat currency set to {}", ccy);
        }
        Some(("metal", sub)) => metal(conn, &mut ws, sub)?,
        Some(("step", sub)) => {
            match sub.get_one::<String>("to").unwrap().trim() {
                "next" => ws.next_step(),
                "prev" | "back" => ws.prev_step(),
                n => {
                    let step: u8 = n
                        .parse()
                        .map_err(|_| anyhow!("Invalid step '{}', expected next, prev or 1-5", n))?;
                    ws.set_step(step);
                }
            }
            ws.save(conn)?;
            println!("Step {} of {}", ws.step, crate::zakat::LAST_STEP);
        }
        Some(("reset", _)) => {
            ZakatWorksheet::discard(conn)?;
            println!("Zakat worksheet cleared");
        }
        Some(("donate", _)) => {
            let prices = latest_prices(conn)?;
            let campaigns = api.campaigns()?;
            let mut basket = open_basket(conn, api)?;
            let amount = donate_zakat(&mut ws, prices.as_ref(), &campaigns, &mut basket)?;
            ws.save(conn)?;
            println!(
                "Added {} Zakat to your basket ({} item(s))",
                fmt_money(&amount, ws.amounts.unit),
                basket.item_count()
            );
        }
        _ => {}
    }
    Ok(())
}

fn show(ws: &ZakatWorksheet, prices: Option<&MetalPrices>, sub: &clap::ArgMatches) -> Result<()> {
    let summary = ws.summary(prices);
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &summary)? {
        return Ok(());
    }
    let ccy = summary.currency;
    let a = &ws.amounts;
    let mut rows = vec![
        vec!["Cash".to_string(), fmt_money(&a.cash, ccy)],
        vec!["Bank".to_string(), fmt_money(&a.bank, ccy)],
    ];
    for metal in [Metal::Gold, Metal::Silver] {
        for h in a.holdings(metal) {
            rows.push(vec![
                format!("{} {}k [{}] {} {:?}", metal.as_str(), h.karat, h.key, h.weight, h.unit),
                fmt_money(&h.value, ccy),
            ]);
        }
    }
    rows.extend([
        vec!["Investment profit".to_string(), fmt_money(&a.investment_profit, ccy)],
        vec!["Share resale".to_string(), fmt_money(&a.share_resale, ccy)],
        vec!["Merchandise".to_string(), fmt_money(&a.merchandise, ccy)],
        vec!["Loans owed to you".to_string(), fmt_money(&a.loan, ccy)],
        vec!["Other".to_string(), fmt_money(&a.other, ccy)],
        vec!["Total wealth".to_string(), fmt_money(&summary.wealth, ccy)],
        vec!["Silver nisab".to_string(), fmt_money(&summary.nisab.silver, ccy)],
        vec!["Gold nisab".to_string(), fmt_money(&summary.nisab.gold, ccy)],
        vec!["Zakat due".to_string(), fmt_money(&summary.zakat_due, ccy)],
    ]);
    println!("{}", pretty_table(&["Item", "Amount"], rows));
    match summary.prices_updated_at {
        Some(at) if summary.nisab.silver.is_zero() => {
            println!("Metal prices from {} are unavailable; nisab shows 0", at)
        }
        Some(at) => println!("Prices as of {} (step {} of 5)", at, ws.step),
        None => println!("No metal prices yet; run `sadaqah prices fetch`"),
    }
    Ok(())
}

fn metal(conn: &Connection, ws: &mut ZakatWorksheet, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("add", sub)) => {
            let kind: Metal = sub.get_one::<String>("type").unwrap().parse()?;
            let karat = match sub.get_one::<u32>("karat") {
                Some(k) => *k,
                None => allowed_karats(kind)[0],
            };
            if !allowed_karats(kind).contains(&karat) {
                bail!(
                    "Unsupported karat {} for {}, expected one of {:?}",
                    karat,
                    kind.as_str(),
                    allowed_karats(kind)
                );
            }
            let weight = parse_decimal(sub.get_one::<String>("weight").unwrap())?;
            let unit: WeightUnit = sub.get_one::<String>("unit").unwrap().parse()?;
            let value = match sub.get_one::<String>("value") {
                Some(v) => coerce_amount(v)?,
                None => {
                    let prices = latest_prices(conn)?;
                    if prices.is_none() {
                        warn!("No cached metal prices; holding valued at 0");
                    }
                    estimate_metal_value(kind, karat, weight, unit, prices.as_ref(), ws.amounts.unit)
                        .round_dp(2)
                }
            };
            let key = sub
                .get_one::<String>("key")
                .map(|k| k.trim().to_string())
                .unwrap_or_else(|| Utc::now().timestamp_millis().to_string());
            let holding = MetalHolding {
                key: key.clone(),
                karat,
                unit,
                weight,
                value,
                name: Some(format!("{} {}k", kind.as_str(), karat)),
            };
            ws.upsert_metal(kind, holding);
            ws.save(conn)?;
            println!(
                "Saved {} holding {} worth {}",
                kind.as_str(),
                key,
                fmt_money(&value, ws.amounts.unit)
            );
        }
        Some(("rm", sub)) => {
            let kind: Metal = sub.get_one::<String>("type").unwrap().parse()?;
            let key = sub.get_one::<String>("key").unwrap().trim();
            if ws.remove_metal(kind, key) {
                ws.save(conn)?;
                println!("Removed {} holding {}", kind.as_str(), key);
            } else {
                println!("No {} holding {}", kind.as_str(), key);
            }
        }
        _ => {}
    }
    Ok(())
}

/// Puts the zakat due into the basket against the Zakat campaign and
/// resets the worksheet. Returns the amount added.
pub fn donate_zakat<R: BasketRemote + ?Sized>(
    ws: &mut ZakatWorksheet,
    prices: Option<&MetalPrices>,
    campaigns: &[Campaign],
    basket: &mut BasketReconciler<'_, R>,
) -> Result<Decimal> {
    let amount = ws.summary(prices).zakat_due.round_dp(2);
    if amount <= Decimal::ZERO {
        bail!("No Zakat is due on the current worksheet");
    }
    let campaign = find_zakat_campaign(campaigns)
        .ok_or_else(|| anyhow!("No Zakat campaign is currently available"))?;
    basket.add_item(AddToBasket {
        campaign_id: campaign.id,
        amount,
        donation_item: Some(ZAKAT_DONATION_ITEM.to_string()),
        is_recurring: Some(false),
        ..AddToBasket::default()
    })?;
    let unit = ws.amounts.unit;
    ws.reset();
    ws.set_currency(unit);
    Ok(amount)
}
