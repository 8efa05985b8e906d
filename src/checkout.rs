// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error;
use tracing::info;

use crate::api::{CheckoutGateway, CheckoutRequest};
use crate::basket::UNSUPPORTED_CHECKOUT_TYPE;
use crate::db::{load_json, save_json};
use crate::models::{
    AuthSession, BasketItem, BuyerDetails, CheckoutDetails, PaymentGateway, line_total,
};

pub const CHECKOUT_DETAILS_KEY: &str = "checkoutDetails";
const STAFF_ROLES: [&str; 2] = ["ADMIN", "SUPERADMIN"];

static NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z\s-]+$").expect("static regex"));
static CITY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z\s'-]+$").expect("static regex"));
static ZIP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9A-Za-z\s-]+$").expect("static regex"));
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("static regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Error)]
#[error("{}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
pub struct ValidationError(pub Vec<FieldError>);

struct Checker {
    errors: Vec<FieldError>,
}

impl Checker {
    fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(FieldError {
            field,
            message: message.into(),
        });
    }

    /// Required, max length, then pattern; one message per field.
    fn text(
        &mut self,
        field: &'static str,
        value: &str,
        label: &str,
        required: bool,
        max: usize,
        pattern: Option<(&Regex, &str)>,
    ) {
        let v = value.trim();
        if v.is_empty() {
            if required {
                self.push(field, format!("{} is required", label));
            }
            return;
        }
        if v.chars().count() > max {
            self.push(field, format!("{} must be at most {} characters", label, max));
            return;
        }
        if let Some((re, msg)) = pattern {
            if !re.is_match(v) {
                self.push(field, msg);
            }
        }
    }
}

pub fn validate_buyer(b: &BuyerDetails) -> Vec<FieldError> {
    let mut c = Checker { errors: Vec::new() };
    let full = b.require_address;
    c.text(
        "firstName",
        &b.first_name,
        "First name",
        true,
        40,
        Some((&*NAME_RE, "First name must contain only letters, spaces, and hyphens")),
    );
    c.text(
        "lastName",
        &b.last_name,
        "Last name",
        true,
        40,
        Some((&*NAME_RE, "Last name must contain only letters, spaces, and hyphens")),
    );
    c.text(
        "email",
        &b.email,
        "Email",
        true,
        254,
        Some((&*EMAIL_RE, "Enter a valid email")),
    );
    c.text("phone", &b.phone, "Phone Number", full, 30, None);
    c.text("address", &b.address, "Address", full, 100, None);
    c.text("country", &b.country, "Country", full, 2, None);
    c.text(
        "state",
        &b.state,
        "State",
        full,
        40,
        Some((&*NAME_RE, "State must contain only letters, spaces, and hyphens")),
    );
    c.text(
        "city",
        &b.city,
        "City",
        full,
        40,
        Some((&*CITY_RE, "City must contain only letters, spaces, apostrophes, and hyphens")),
    );
    c.text(
        "zip",
        &b.zip,
        "Zip code",
        full,
        20,
        Some((&*ZIP_RE, "Zip code must contain only letters, digits, spaces, and hyphens")),
    );
    c.errors
}

/// Guests and staff accounts pay through the anonymous checkout.
pub fn requires_guest_checkout(session: Option<&AuthSession>) -> bool {
    match session {
        None => true,
        Some(s) => s.email.trim().is_empty() || STAFF_ROLES.contains(&s.role.as_str()),
    }
}

/// Amount payable: sacrifice lines carry a precomputed total, everything
/// else is amount x quantity.
pub fn checkout_total(items: &[BasketItem]) -> Result<Decimal> {
    let mut sum = Decimal::ZERO;
    for i in items {
        let line = if i.checkout_type() == Some(UNSUPPORTED_CHECKOUT_TYPE) {
            Some(i.total)
        } else {
            line_total(i.amount, i.quantity_or_one())
        };
        match line.and_then(|l| sum.checked_add(l)) {
            Some(next) => sum = next,
            None => bail!("Basket total is too large to check out"),
        }
    }
    Ok(sum)
}

pub fn has_recurring(items: &[BasketItem]) -> bool {
    items.iter().any(|i| i.is_recurring.unwrap_or(false))
}

pub fn submit_checkout<G: CheckoutGateway + ?Sized>(
    conn: &Connection,
    gateway: &G,
    session: Option<&AuthSession>,
    buyer: BuyerDetails,
    items: &[BasketItem],
    payment_gateway: PaymentGateway,
    now: DateTime<Utc>,
) -> Result<CheckoutDetails> {
    let errors = validate_buyer(&buyer);
    if !errors.is_empty() {
        return Err(ValidationError(errors).into());
    }
    if items.is_empty() {
        bail!("Your basket is empty");
    }
    checkout_total(items)?;

    let guest = requires_guest_checkout(session);
    let req = CheckoutRequest {
        buyer,
        basket_items: items.to_vec(),
        payment_gateway,
        is_anonymous: guest.then_some(true),
    };
    let receipt = if guest {
        gateway.checkout_guest(&req)?
    } else {
        gateway.checkout_member(&req)?
    };
    info!(guest, lines = items.len(), "Checkout submitted");

    let details = CheckoutDetails {
        buyer: req.buyer,
        basket_items: req.basket_items,
        payment_gateway,
        is_anonymous: guest,
        client_secret: receipt.client_secret,
        payment_intent_id: receipt.payment_intent_id,
        donation_ids: receipt.donation_ids,
        approval_url: receipt.approval_url,
        created_at: now,
    };
    save_json(conn, CHECKOUT_DETAILS_KEY, &details)?;
    Ok(details)
}

pub fn pending_checkout(conn: &Connection) -> Result<Option<CheckoutDetails>> {
    load_json(conn, CHECKOUT_DETAILS_KEY)
}
