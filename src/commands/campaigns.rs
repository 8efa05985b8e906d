// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::Connection;

use crate::api::ApiClient;
use crate::models::Campaign;
use crate::utils::{maybe_print_json, pretty_table};

pub const ZAKAT_CHECKOUT_TYPE: &str = "ZAQAT";

pub fn handle(_conn: &Connection, api: &ApiClient, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("list", sub)) => {
            let campaigns = api.campaigns()?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &campaigns)? {
                let rows = campaigns
                    .iter()
                    .map(|c| {
                        vec![
                            c.id.to_string(),
                            c.name.clone(),
                            c.slug.clone(),
                            c.checkout_type.clone().unwrap_or_default(),
                        ]
                    })
                    .collect();
                println!(
                    "{}",
                    pretty_table(&["Id", "Name", "Slug", "Checkout"], rows)
                );
            }
        }
        Some(("show", sub)) => {
            let slug = sub.get_one::<String>("slug").unwrap().trim();
            let c = api.campaign_details(slug)?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &c)? {
                let summary = c
                    .description_text
                    .clone()
                    .unwrap_or_else(|| c.description.clone());
                let rows = vec![
                    vec!["Id".into(), c.id.to_string()],
                    vec!["Name".into(), c.name.clone()],
                    vec!["Slug".into(), c.slug.clone()],
                    vec!["Checkout".into(), c.checkout_type.clone().unwrap_or_default()],
                    vec!["Status".into(), c.status.clone().unwrap_or_default()],
                    vec!["About".into(), summary],
                ];
                println!("{}", pretty_table(&["Field", "Value"], rows));
            }
        }
        Some(("categories", sub)) => {
            let cats = api.campaign_categories()?;
            if !maybe_print_json(sub.get_flag("json"), sub.get_flag("jsonl"), &cats)? {
                let rows = cats
                    .iter()
                    .map(|c| vec![c.id.to_string(), c.name.clone()])
                    .collect();
                println!("{}", pretty_table(&["Id", "Category"], rows));
            }
        }
        _ => {}
    }
    Ok(())
}

/// The campaign Zakat donations go to: checkout type `ZAQAT`, or failing
/// that a name mentioning zakat.
pub fn find_zakat_campaign(campaigns: &[Campaign]) -> Option<&Campaign> {
    campaigns.iter().find(|c| {
        c.checkout_type.as_deref() == Some(ZAKAT_CHECKOUT_TYPE)
            || c.name.to_lowercase().contains("zakat")
    })
}
