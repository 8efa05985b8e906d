// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Result, bail};
use serde_json::json;
use std::path::Path;

use crate::models::BasketItem;

pub fn export_basket(items: &[BasketItem], fmt: &str, out: &Path) -> Result<()> {
    match fmt {
        "csv" => {
            let mut wtr = csv::Writer::from_path(out)?;
            wtr.write_record([
                "campaign_id",
                "name",
                "donation_item",
                "amount",
                "quantity",
                "total",
                "recurring",
                "period_days",
                "behalf_of",
            ])?;
            for i in items {
                wtr.write_record([
                    i.campaign_id.to_string(),
                    i.display_name(),
                    i.donation_item.clone().unwrap_or_default(),
                    i.amount.to_string(),
                    i.quantity_or_one().to_string(),
                    i.total.to_string(),
                    i.is_recurring.unwrap_or(false).to_string(),
                    i.period_days.map(|d| d.to_string()).unwrap_or_default(),
                    i.behalf_of.clone().unwrap_or_default(),
                ])?;
            }
            wtr.flush()?;
        }
        "json" => {
            let rows: Vec<_> = items
                .iter()
                .map(|i| {
                    json!({
                        "campaignId": i.campaign_id,
                        "name": i.display_name(),
                        "donationItem": i.donation_item,
                        "amount": i.amount.to_string(),
                        "quantity": i.quantity_or_one(),
                        "total": i.total.to_string(),
                        "isRecurring": i.is_recurring.unwrap_or(false),
                        "periodDays": i.period_days,
                        "behalfOf": i.behalf_of,
                    })
                })
                .collect();
            std::fs::write(out, serde_json::to_string_pretty(&rows)?)?;
        }
        other => bail!("Unknown format: {} (use csv|json)", other),
    }
    Ok(())
}
