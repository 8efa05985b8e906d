// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use chrono::Utc;
use rusqlite::Connection;
use std::path::Path;

use crate::api::ApiClient;
use crate::basket::{AuthState, BasketReconciler, validate_donation};
use crate::commands::auth::current_session;
use crate::commands::exporter::export_basket;
use crate::models::{AddToBasket, BasketItem};
use crate::utils::{
    coerce_amount, fmt_money, get_display_currency, maybe_print_json, pretty_table,
};

pub fn handle(conn: &Connection, api: &ApiClient, m: &clap::ArgMatches) -> Result<()> {
    if let Some(("refresh", _)) = m.subcommand() {
        return refresh(conn, api);
    }
    let mut basket = open_basket(conn, api)?;
    basket.subscribe(|items| tracing::debug!(lines = items.len(), "Basket changed"));
    match m.subcommand() {
        Some(("list", sub)) => list(conn, &basket, sub)?,
        Some(("add", sub)) => {
            let (campaign_id, checkout_type) =
                resolve_campaign(api, sub.get_one::<String>("campaign").unwrap())?;
            let req = donation_request(sub, campaign_id)?;
            validate_donation(req.amount, checkout_type.as_deref())?;
            basket.add_item(req)?;
            println!(
                "Added campaign #{} to basket ({} item(s))",
                campaign_id,
                basket.item_count()
            );
        }
        Some(("update", sub)) => {
            let (campaign_id, _) =
                resolve_campaign(api, sub.get_one::<String>("campaign").unwrap())?;
            let req = donation_request(sub, campaign_id)?;
            validate_donation(req.amount, None)?;
            basket.update_item(req)?;
            println!("Updated campaign #{}", campaign_id);
        }
        Some(("rm", sub)) => {
            let campaign_id = *sub.get_one::<i64>("campaign").unwrap();
            let donation_item = sub
                .get_one::<String>("donation_item")
                .map(|s| s.trim())
                .filter(|s| !s.is_empty());
            basket.remove_item(campaign_id, donation_item)?;
            println!("Removed campaign #{} from basket", campaign_id);
        }
        Some(("clear", _)) => {
            let failures = basket.clear();
            if failures > 0 {
                println!("Basket cleared locally; {} line(s) could not be removed remotely", failures);
            } else {
                println!("Basket cleared");
            }
        }
        Some(("export", sub)) => {
            let fmt = sub.get_one::<String>("format").unwrap().to_lowercase();
            let out = sub.get_one::<String>("out").unwrap();
            export_basket(basket.items(), &fmt, Path::new(out))?;
            println!("Exported basket to {}", out);
        }
        _ => {}
    }
    Ok(())
}

/// Basket for whoever is signed in right now, loaded from its source.
pub fn open_basket<'a>(
    conn: &'a Connection,
    api: &'a ApiClient,
) -> Result<BasketReconciler<'a, ApiClient>> {
    let state = AuthState::from_signed_in(current_session(conn)?.is_some());
    Ok(BasketReconciler::open(conn, api, state))
}

/// Starts from the mirror so the cooldown decides whether the server is read.
fn refresh(conn: &Connection, api: &ApiClient) -> Result<()> {
    let state = AuthState::from_signed_in(current_session(conn)?.is_some());
    let mut basket = BasketReconciler::cached(conn, api, state);
    if basket.manual_refresh(Utc::now())? {
        println!("Basket refreshed ({} item(s))", basket.item_count());
    } else {
        println!("Basket was refreshed moments ago; try again shortly");
    }
    Ok(())
}

/// Numeric ids are used as is; anything else is looked up as a slug.
pub fn resolve_campaign(api: &ApiClient, raw: &str) -> Result<(i64, Option<String>)> {
    let raw = raw.trim();
    if let Ok(id) = raw.parse::<i64>() {
        return Ok((id, None));
    }
    let c = api.campaign_details(raw)?;
    Ok((c.id, c.checkout_type))
}

fn text(sub: &clap::ArgMatches, name: &str) -> Option<String> {
    sub.get_one::<String>(name)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Amount text is coerced the way the donation form does: anything but
/// digits and a dot is dropped, and unparsable input becomes 0.
pub fn donation_request(sub: &clap::ArgMatches, campaign_id: i64) -> Result<AddToBasket> {
    let amount = coerce_amount(sub.get_one::<String>("amount").unwrap())?;
    let recurring = sub.get_flag("recurring");
    Ok(AddToBasket {
        campaign_id,
        amount,
        quantity: sub.get_one::<u32>("quantity").copied(),
        is_recurring: Some(recurring),
        period_days: sub.get_one::<u32>("period_days").copied(),
        notes: text(sub, "notes"),
        behalf_of: text(sub, "behalf_of"),
        donation_item: text(sub, "donation_item"),
        ..AddToBasket::default()
    })
}

pub fn period_label(period_days: Option<u32>) -> &'static str {
    match period_days {
        Some(1) => "Daily",
        Some(10) => "Last 10 Ramadan",
        _ => "",
    }
}

fn list(
    conn: &Connection,
    basket: &BasketReconciler<'_, ApiClient>,
    sub: &clap::ArgMatches,
) -> Result<()> {
    let items: &[BasketItem] = basket.items();
    if maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &items)? {
        return Ok(());
    }
    let ccy = get_display_currency(conn)?;
    let rows = items
        .iter()
        .map(|i| {
            let recurring = if i.is_recurring.unwrap_or(false) {
                period_label(i.period_days).to_string()
            } else {
                String::new()
            };
            vec![
                i.campaign_id.to_string(),
                i.display_name(),
                i.donation_item.clone().unwrap_or_default(),
                format!("{:.2}", i.amount),
                i.quantity_or_one().to_string(),
                format!("{:.2}", i.total),
                recurring,
            ]
        })
        .collect();
    println!(
        "{}",
        pretty_table(
            &["Campaign", "Name", "Item", "Amount", "Qty", "Total", "Recurring"],
            rows
        )
    );
    match basket.total_amount() {
        Some(total) => println!(
            "{} item(s), total {}",
            basket.item_count(),
            fmt_money(&total, ccy)
        ),
        None => println!("{} item(s), total too large to display", basket.item_count()),
    }
    Ok(())
}
