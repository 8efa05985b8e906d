// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Currency {
    #[default]
    #[serde(rename = "AUD")]
    Aud,
    #[serde(rename = "USD")]
    Usd,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Aud => "AUD",
            Currency::Usd => "USD",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "AUD" => Ok(Currency::Aud),
            "USD" => Ok(Currency::Usd),
            other => Err(anyhow!("Unsupported currency '{}', expected AUD or USD", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    #[default]
    Gram,
    Ounce,
}

impl FromStr for WeightUnit {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "g" | "gram" | "grams" => Ok(WeightUnit::Gram),
            "oz" | "ounce" | "ounces" => Ok(WeightUnit::Ounce),
            other => Err(anyhow!("Unknown weight unit '{}', expected gram or ounce", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metal {
    Gold,
    Silver,
}

impl Metal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metal::Gold => "gold",
            Metal::Silver => "silver",
        }
    }
}

impl FromStr for Metal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gold" => Ok(Metal::Gold),
            "silver" => Ok(Metal::Silver),
            other => Err(anyhow!("Unknown metal '{}', expected gold or silver", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetalHolding {
    pub key: String,
    pub karat: u32,
    pub unit: WeightUnit,
    pub weight: Decimal,
    pub value: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Zakatable assets as entered in the calculator, in `unit` currency.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ZakatAmounts {
    pub cash: Decimal,
    pub bank: Decimal,
    pub unit: Currency,
    pub gold: Vec<MetalHolding>,
    pub silver: Vec<MetalHolding>,
    pub investment_profit: Decimal,
    pub share_resale: Decimal,
    pub merchandise: Decimal,
    pub loan: Decimal,
    pub other: Decimal,
}

impl ZakatAmounts {
    pub fn holdings(&self, metal: Metal) -> &[MetalHolding] {
        match metal {
            Metal::Gold => &self.gold,
            Metal::Silver => &self.silver,
        }
    }

    pub fn holdings_mut(&mut self, metal: Metal) -> &mut Vec<MetalHolding> {
        match metal {
            Metal::Gold => &mut self.gold,
            Metal::Silver => &mut self.silver,
        }
    }
}

/// Spot prices per troy ounce.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetalPrices {
    pub gold_price_in_usd: Decimal,
    pub gold_price_in_aud: Decimal,
    pub silver_fine_price_in_usd: Decimal,
    pub silver_fine_price_in_aud: Decimal,
    pub silver_sterling_price_in_usd: Decimal,
    pub silver_sterling_price_in_aud: Decimal,
    pub updated_at: DateTime<Utc>,
}

impl MetalPrices {
    pub fn zeroed(updated_at: DateTime<Utc>) -> Self {
        MetalPrices {
            gold_price_in_usd: Decimal::ZERO,
            gold_price_in_aud: Decimal::ZERO,
            silver_fine_price_in_usd: Decimal::ZERO,
            silver_fine_price_in_aud: Decimal::ZERO,
            silver_sterling_price_in_usd: Decimal::ZERO,
            silver_sterling_price_in_aud: Decimal::ZERO,
            updated_at,
        }
    }

    /// A feed response counts as usable when either USD quote is positive.
    pub fn has_quotes(&self) -> bool {
        self.gold_price_in_usd > Decimal::ZERO || self.silver_fine_price_in_usd > Decimal::ZERO
    }

    pub fn gold_in(&self, ccy: Currency) -> Decimal {
        match ccy {
            Currency::Aud => self.gold_price_in_aud,
            Currency::Usd => self.gold_price_in_usd,
        }
    }

    pub fn silver_fine_in(&self, ccy: Currency) -> Decimal {
        match ccy {
            Currency::Aud => self.silver_fine_price_in_aud,
            Currency::Usd => self.silver_fine_price_in_usd,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Campaign {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub slug: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkout_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignCategory {
    pub id: i64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

pub fn line_total(amount: Decimal, quantity: u32) -> Option<Decimal> {
    amount.checked_mul(Decimal::from(quantity))
}

/// One donation line in the basket, as the server returns it and as the
/// local mirror stores it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasketItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub campaign_id: i64,
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub total: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_recurring: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behalf_of: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub donation_item: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub donation_item_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rice_quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rice_price: Option<Decimal>,
    #[serde(rename = "Campaign", default, skip_serializing_if = "Option::is_none")]
    pub campaign: Option<Campaign>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkout_type: Option<String>,
}

impl BasketItem {
    /// New local line: quantity defaults to 1, total = amount x quantity.
    /// `None` when the total does not fit in a `Decimal`.
    pub fn from_request(req: &AddToBasket) -> Option<Self> {
        let quantity = req.quantity.unwrap_or(1);
        Some(BasketItem {
            id: None,
            campaign_id: req.campaign_id,
            amount: req.amount,
            quantity: Some(quantity),
            total: line_total(req.amount, quantity)?,
            is_recurring: req.is_recurring,
            period_days: req.period_days,
            notes: req.notes.clone(),
            behalf_of: req.behalf_of.clone(),
            donation_item: req.donation_item.clone(),
            donation_item_price: req.donation_item_price,
            rice_quantity: req.rice_quantity,
            rice_price: req.rice_price,
            campaign: None,
            name: None,
            cover_image: None,
            checkout_type: None,
        })
    }

    pub fn quantity_or_one(&self) -> u32 {
        self.quantity.unwrap_or(1)
    }

    pub fn checkout_type(&self) -> Option<&str> {
        self.checkout_type
            .as_deref()
            .or_else(|| self.campaign.as_ref().and_then(|c| c.checkout_type.as_deref()))
    }

    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.campaign.as_ref().map(|c| c.name.clone()))
            .unwrap_or_else(|| format!("Campaign #{}", self.campaign_id))
    }
}

/// Body of add/update basket calls. Amounts go out as JSON numbers.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToBasket {
    pub campaign_id: i64,
    #[serde(with = "rust_decimal::serde::float")]
    pub amount: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_recurring: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_days: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behalf_of: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub donation_item: Option<String>,
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub donation_item_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rice_quantity: Option<u32>,
    #[serde(
        default,
        with = "rust_decimal::serde::float_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub rice_price: Option<Decimal>,
}

impl AddToBasket {
    /// Blank text fields are not sent to the server.
    pub fn cleaned(mut self) -> Self {
        for field in [
            &mut self.notes,
            &mut self.behalf_of,
            &mut self.donation_item,
        ] {
            if field.as_deref().is_some_and(|s| s.trim().is_empty()) {
                *field = None;
            }
        }
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub token: String,
    pub id: i64,
    #[serde(default)]
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_role: Option<String>,
    #[serde(default = "default_auth_type")]
    pub auth_type: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub is_logged_in: bool,
}

fn default_auth_type() -> String {
    "email".to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentGateway {
    #[default]
    Stripe,
    Paypal,
}

impl FromStr for PaymentGateway {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stripe" | "card" => Ok(PaymentGateway::Stripe),
            "paypal" => Ok(PaymentGateway::Paypal),
            other => Err(anyhow!("Unknown payment gateway '{}', expected stripe or paypal", other)),
        }
    }
}

/// Buyer form submitted at checkout. `require_address` (wire name
/// `status`) makes the postal fields mandatory.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuyerDetails {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub company: String,
    pub country: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub create_account: bool,
    #[serde(rename = "status")]
    pub require_address: bool,
}

/// Hand-off record stored between checkout and payment confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutDetails {
    #[serde(flatten)]
    pub buyer: BuyerDetails,
    pub basket_items: Vec<BasketItem>,
    pub payment_gateway: PaymentGateway,
    pub is_anonymous: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_intent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub donation_ids: Option<Vec<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_url: Option<String>,
    pub created_at: DateTime<Utc>,
}
