// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use chrono::Utc;
use rusqlite::Connection;

use crate::api::ApiClient;
use crate::checkout::{checkout_total, has_recurring, pending_checkout, submit_checkout};
use crate::commands::auth::current_session;
use crate::commands::basket::open_basket;
use crate::models::{BuyerDetails, CheckoutDetails, PaymentGateway};
use crate::utils::{fmt_money, get_display_currency, maybe_print_json, pretty_table};

pub fn handle(conn: &Connection, api: &ApiClient, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("submit", sub)) => submit(conn, api, sub)?,
        Some(("show", sub)) => match pending_checkout(conn)? {
            Some(details) => {
                if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &details)? {
                    print_details(conn, &details)?;
                }
            }
            None => println!("No checkout in progress"),
        },
        _ => {}
    }
    Ok(())
}

fn text(sub: &clap::ArgMatches, id: &str) -> String {
    sub.get_one::<String>(id).cloned().unwrap_or_default()
}

pub fn buyer_from_args(sub: &clap::ArgMatches) -> BuyerDetails {
    BuyerDetails {
        first_name: text(sub, "first_name"),
        last_name: text(sub, "last_name"),
        email: text(sub, "email"),
        phone: text(sub, "phone"),
        company: text(sub, "company"),
        country: text(sub, "country"),
        address: text(sub, "address"),
        city: text(sub, "city"),
        state: text(sub, "state"),
        zip: text(sub, "zip"),
        create_account: sub.get_flag("create_account"),
        require_address: !sub.get_flag("skip_address"),
    }
}

fn submit(conn: &Connection, api: &ApiClient, sub: &clap::ArgMatches) -> Result<()> {
    let gateway: PaymentGateway = sub.get_one::<String>("gateway").unwrap().parse()?;
    let session = current_session(conn)?;
    let basket = open_basket(conn, api)?;
    let details = submit_checkout(
        conn,
        api,
        session.as_ref(),
        buyer_from_args(sub),
        basket.items(),
        gateway,
        Utc::now(),
    )?;
    print_details(conn, &details)
}

fn print_details(conn: &Connection, d: &CheckoutDetails) -> Result<()> {
    let ccy = get_display_currency(conn)?;
    let mut rows = vec![
        vec![
            "Donor".to_string(),
            format!("{} {} <{}>", d.buyer.first_name, d.buyer.last_name, d.buyer.email),
        ],
        vec!["Lines".to_string(), d.basket_items.len().to_string()],
        vec!["Total".to_string(), fmt_money(&checkout_total(&d.basket_items)?, ccy)],
        vec!["Gateway".to_string(), format!("{:?}", d.payment_gateway)],
        vec![
            "Checkout".to_string(),
            if d.is_anonymous { "guest" } else { "member" }.to_string(),
        ],
    ];
    if has_recurring(&d.basket_items) {
        rows.push(vec!["Recurring".to_string(), "yes".to_string()]);
    }
    if let Some(secret) = &d.client_secret {
        rows.push(vec!["Client secret".to_string(), secret.clone()]);
    }
    if let Some(url) = &d.approval_url {
        rows.push(vec!["Approve at".to_string(), url.clone()]);
    }
    println!("{}", pretty_table(&["Field", "Value"], rows));
    Ok(())
}
