// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Blocking client for the donation platform's JSON/HTTP API.
//!
//! Every endpoint answers with an envelope `{ "payload": ..., "message": ... }`.
//! The traits at the bottom are the seams the basket, price and checkout
//! logic depend on, so they can run against in-process fakes.

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::blocking::{Client, RequestBuilder};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::{
    AddToBasket, AuthSession, BasketItem, BuyerDetails, Campaign, CampaignCategory, MetalPrices,
    PaymentGateway,
};
use crate::utils::http_client;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-2xx answer; `message` is the server's text or a per-call fallback.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Rejected { status, .. } => Some(*status),
            ApiError::Http(e) => e.status().map(|s| s.as_u16()),
            ApiError::Decode(_) => None,
        }
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    payload: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProjectsPayload {
    projects: Option<ProjectRows>,
}

#[derive(Debug, Deserialize)]
struct ProjectRows {
    #[serde(default)]
    rows: Vec<Campaign>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NestedPrice {
    gold_price_in_usd: Option<Decimal>,
    gold_price_in_aud: Option<Decimal>,
    silver_price_in_usd: Option<Decimal>,
    silver_price_in_aud: Option<Decimal>,
    updated_at: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetalPricePayload {
    price: Option<NestedPrice>,
    gold_price_in_usd: Option<Decimal>,
    gold_price_in_aud: Option<Decimal>,
    silver_fine_price_in_usd: Option<Decimal>,
    silver_fine_price_in_aud: Option<Decimal>,
    silver_sterling_price_in_usd: Option<Decimal>,
    silver_sterling_price_in_aud: Option<Decimal>,
}

/// First non-zero quote wins; absent or zero falls through.
fn first_quote(candidates: &[Option<Decimal>]) -> Decimal {
    candidates
        .iter()
        .flatten()
        .find(|d| !d.is_zero())
        .copied()
        .unwrap_or(Decimal::ZERO)
}

impl MetalPricePayload {
    fn into_prices(self, now: DateTime<Utc>) -> MetalPrices {
        let nested = self.price.unwrap_or_default();
        let updated_at = nested
            .updated_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or(now);
        MetalPrices {
            gold_price_in_usd: first_quote(&[self.gold_price_in_usd, nested.gold_price_in_usd]),
            gold_price_in_aud: first_quote(&[self.gold_price_in_aud, nested.gold_price_in_aud]),
            silver_fine_price_in_usd: first_quote(&[
                self.silver_fine_price_in_usd,
                nested.silver_price_in_usd,
            ]),
            silver_fine_price_in_aud: first_quote(&[
                self.silver_fine_price_in_aud,
                nested.silver_price_in_aud,
            ]),
            silver_sterling_price_in_usd: first_quote(&[self.silver_sterling_price_in_usd]),
            silver_sterling_price_in_aud: first_quote(&[self.silver_sterling_price_in_aud]),
            updated_at,
        }
    }
}

/// Parse a `/metal-price` response body. A missing payload is an all-zero
/// snapshot, which the refresh loop treats as "no quotes".
pub fn parse_metal_prices(body: &str, now: DateTime<Utc>) -> ApiResult<MetalPrices> {
    let env: Envelope<MetalPricePayload> =
        serde_json::from_str(body).map_err(|e| ApiError::Decode(e.to_string()))?;
    match env.payload {
        Some(p) => Ok(p.into_prices(now)),
        None => {
            warn!("No payload in metal prices response");
            Ok(MetalPrices::zeroed(now))
        }
    }
}

/// Registration form for `POST /auth/register`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    pub timezone_offset: i32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[serde(flatten)]
    pub buyer: BuyerDetails,
    pub basket_items: Vec<BasketItem>,
    pub payment_gateway: PaymentGateway,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_anonymous: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CheckoutReceipt {
    pub client_secret: Option<String>,
    pub payment_intent_id: Option<String>,
    pub donation_ids: Option<Vec<Value>>,
    pub approval_url: Option<String>,
}

pub trait BasketRemote {
    fn basket_items(&self) -> ApiResult<Vec<BasketItem>>;
    fn add_basket_item(&self, item: &AddToBasket) -> ApiResult<()>;
    fn update_basket_item(&self, item: &AddToBasket) -> ApiResult<()>;
    fn remove_basket_item(&self, campaign_id: i64, donation_item: Option<&str>) -> ApiResult<()>;
}

pub trait PriceFeed {
    fn metal_prices(&self) -> ApiResult<MetalPrices>;
}

pub trait CheckoutGateway {
    /// Anonymous (or staff) checkout, creates the payment without a profile.
    fn checkout_guest(&self, req: &CheckoutRequest) -> ApiResult<CheckoutReceipt>;
    /// Checkout that also updates the signed-in donor's profile.
    fn checkout_member(&self, req: &CheckoutRequest) -> ApiResult<CheckoutReceipt>;
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    base_url: String,
    http: Client,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        Ok(ApiClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: http_client(timeout)?,
            token: None,
        })
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    /// Same connection pool, different bearer token.
    pub fn authorized(&self, token: &str) -> Self {
        self.clone().with_token(Some(token.to_string()))
    }

    fn request(&self, method: reqwest::Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "API request");
        let rb = self.http.request(method, url);
        match &self.token {
            Some(t) => rb.bearer_auth(t),
            None => rb,
        }
    }

    fn send_raw(&self, rb: RequestBuilder, fallback: &str) -> ApiResult<String> {
        let resp = rb.send()?;
        let status = resp.status();
        debug!(status = status.as_u16(), "API response");
        let body = resp.text()?;
        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .filter(|m| !m.trim().is_empty())
                .unwrap_or_else(|| fallback.to_string());
            warn!(status = status.as_u16(), %message, "API call rejected");
            return Err(ApiError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        Ok(body)
    }

    fn send<T: DeserializeOwned>(&self, rb: RequestBuilder, fallback: &str) -> ApiResult<Option<T>> {
        let body = self.send_raw(rb, fallback)?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        let env: Envelope<T> =
            serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))?;
        Ok(env.payload)
    }

    pub fn campaigns(&self) -> ApiResult<Vec<Campaign>> {
        let rb = self.request(reqwest::Method::GET, "/project/all-projects");
        let payload: Option<ProjectsPayload> = self.send(rb, "Failed to load campaigns.")?;
        Ok(payload
            .and_then(|p| p.projects)
            .map(|p| p.rows)
            .unwrap_or_default())
    }

    pub fn campaign_details(&self, slug: &str) -> ApiResult<Campaign> {
        let rb = self.request(reqwest::Method::GET, &format!("/project/details/{}", slug));
        let payload: Option<Value> = self.send(rb, "Failed to load campaign details.")?;
        let payload = payload.unwrap_or(Value::Null);
        let campaign = match payload.get("campaign") {
            Some(c) if !c.is_null() => c.clone(),
            _ => payload,
        };
        serde_json::from_value(campaign).map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub fn campaign_categories(&self) -> ApiResult<Vec<CampaignCategory>> {
        let rb = self.request(reqwest::Method::GET, "/project/category");
        let payload: Option<Vec<CampaignCategory>> =
            self.send(rb, "Failed to load campaign categories.")?;
        Ok(payload.unwrap_or_default())
    }

    pub fn login(&self, email: &str, password: &str) -> ApiResult<AuthSession> {
        let rb = self.request(reqwest::Method::POST, "/auth/login").json(&json!({
            "email": email.trim().to_lowercase(),
            "password": password,
            "isAdmin": false,
        }));
        let payload: Option<AuthSession> = self.send(rb, "Login failed. Please try again.")?;
        let mut session =
            payload.ok_or_else(|| ApiError::Decode("login response had no payload".into()))?;
        session.auth_type = "email".to_string();
        session.is_logged_in = true;
        Ok(session)
    }

    pub fn register(&self, form: &Registration) -> ApiResult<()> {
        let mut body = form.clone();
        body.email = body.email.trim().to_lowercase();
        body.first_name = body.first_name.trim().to_string();
        body.last_name = body.last_name.trim().to_string();
        let rb = self.request(reqwest::Method::POST, "/auth/register").json(&body);
        self.send_raw(rb, "Registration failed. Please try again.")?;
        Ok(())
    }
}

impl BasketRemote for ApiClient {
    fn basket_items(&self) -> ApiResult<Vec<BasketItem>> {
        let rb = self.request(reqwest::Method::GET, "/basket");
        match self.send::<Vec<BasketItem>>(rb, "Failed to load basket.") {
            Ok(items) => Ok(items.unwrap_or_default()),
            Err(e) if e.status() == Some(StatusCode::UNAUTHORIZED.as_u16()) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    fn add_basket_item(&self, item: &AddToBasket) -> ApiResult<()> {
        let body = item.clone().cleaned();
        let rb = self.request(reqwest::Method::POST, "/basket").json(&body);
        self.send_raw(rb, "Failed to add item to basket.")?;
        Ok(())
    }

    fn update_basket_item(&self, item: &AddToBasket) -> ApiResult<()> {
        let rb = self.request(reqwest::Method::PUT, "/basket").json(item);
        self.send_raw(rb, "Failed to update basket item.")?;
        Ok(())
    }

    fn remove_basket_item(&self, campaign_id: i64, donation_item: Option<&str>) -> ApiResult<()> {
        let rb = self.request(reqwest::Method::DELETE, "/basket").json(&json!({
            "campaignId": campaign_id,
            "donationItem": donation_item,
        }));
        self.send_raw(rb, "Failed to remove item from basket.")?;
        Ok(())
    }
}

impl PriceFeed for ApiClient {
    fn metal_prices(&self) -> ApiResult<MetalPrices> {
        let rb = self.request(reqwest::Method::GET, "/metal-price");
        let body = self.send_raw(rb, "Failed to load metal prices.")?;
        parse_metal_prices(&body, Utc::now())
    }
}

impl CheckoutGateway for ApiClient {
    fn checkout_guest(&self, req: &CheckoutRequest) -> ApiResult<CheckoutReceipt> {
        let rb = self
            .request(reqwest::Method::POST, "/basket/checkout-unknown")
            .json(req);
        let payload: Option<CheckoutReceipt> = self.send(rb, "Something went wrong")?;
        Ok(payload.unwrap_or_default())
    }

    fn checkout_member(&self, req: &CheckoutRequest) -> ApiResult<CheckoutReceipt> {
        let rb = self.request(reqwest::Method::PATCH, "/profile").json(req);
        let payload: Option<CheckoutReceipt> = self.send(rb, "Something went wrong")?;
        Ok(payload.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn metal_prices_prefer_top_level_fields() {
        let body = r#"{"payload": {
            "goldPriceInUsd": 2000, "goldPriceInAud": 3000,
            "silverFinePriceInUsd": 25, "silverFinePriceInAud": 37.5,
            "silverSterlingPriceInUsd": 23.1,
            "price": {"goldPriceInUsd": 1, "updatedAt": "2025-02-28T09:30:00Z"}
        }}"#;
        let p = parse_metal_prices(body, now()).unwrap();
        assert_eq!(p.gold_price_in_usd, Decimal::from(2000));
        assert_eq!(p.silver_fine_price_in_aud, Decimal::new(375, 1));
        assert_eq!(p.silver_sterling_price_in_aud, Decimal::ZERO);
        assert_eq!(
            p.updated_at,
            Utc.with_ymd_and_hms(2025, 2, 28, 9, 30, 0).unwrap()
        );
    }

    #[test]
    fn metal_prices_fall_back_to_nested_price_when_zero() {
        let body = r#"{"payload": {
            "goldPriceInUsd": 0,
            "price": {"goldPriceInUsd": 1990.5, "goldPriceInAud": 2950,
                      "silverPriceInUsd": 24, "silverPriceInAud": 36}
        }}"#;
        let p = parse_metal_prices(body, now()).unwrap();
        assert_eq!(p.gold_price_in_usd, Decimal::new(19905, 1));
        assert_eq!(p.silver_fine_price_in_usd, Decimal::from(24));
        assert_eq!(p.updated_at, now());
    }

    #[test]
    fn missing_payload_is_all_zero() {
        let p = parse_metal_prices(r#"{"message": "ok"}"#, now()).unwrap();
        assert_eq!(p, MetalPrices::zeroed(now()));
        assert!(!p.has_quotes());
    }

    #[test]
    fn garbage_body_is_decode_error() {
        let err = parse_metal_prices("<html>", now()).unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }
}
