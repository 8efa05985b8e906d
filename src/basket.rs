// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Donation basket that is either server-authoritative (signed in) or kept
//! on the device (anonymous).
//!
//! The two copies are never merged. Signing in replaces the list with the
//! server's; signing out falls back to the local mirror, which is refreshed
//! from the server on every successful remote read.

use anyhow::{Result, bail};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::api::{ApiError, BasketRemote};
use crate::db::{load_json, save_json, storage_get, storage_remove, storage_set};
use crate::models::{AddToBasket, BasketItem, line_total};

pub const LOCAL_BASKET_KEY: &str = "localBasket";
pub const REFRESH_STAMP_KEY: &str = "basketRefreshedAt";
pub const MANUAL_REFRESH_COOLDOWN_SECS: i64 = 5;
/// Campaigns that need sacrifice details this client does not collect.
pub const UNSUPPORTED_CHECKOUT_TYPE: &str = "ADEEQAH_GENERAL_SACRIFICE";

#[derive(Debug, Error)]
pub enum BasketError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Amount is too large for campaign #{0}")]
    Overflow(i64),
}

impl BasketError {
    pub fn status(&self) -> Option<u16> {
        match self {
            BasketError::Api(e) => e.status(),
            BasketError::Overflow(_) => None,
        }
    }
}

pub type BasketResult<T> = std::result::Result<T, BasketError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Anonymous,
    Authenticated,
}

impl AuthState {
    pub fn from_signed_in(signed_in: bool) -> Self {
        if signed_in {
            AuthState::Authenticated
        } else {
            AuthState::Anonymous
        }
    }
}

pub type BasketListener<'a> = Box<dyn FnMut(&[BasketItem]) + 'a>;

pub struct BasketReconciler<'a, R: BasketRemote + ?Sized> {
    conn: &'a Connection,
    remote: &'a R,
    state: AuthState,
    items: Vec<BasketItem>,
    listeners: Vec<BasketListener<'a>>,
}

impl<'a, R: BasketRemote + ?Sized> BasketReconciler<'a, R> {
    /// Empty basket in `state`; nothing is loaded yet.
    pub fn new(conn: &'a Connection, remote: &'a R, state: AuthState) -> Self {
        BasketReconciler {
            conn,
            remote,
            state,
            items: Vec::new(),
            listeners: Vec::new(),
        }
    }

    /// Basket loaded from its source of truth for `state`.
    pub fn open(conn: &'a Connection, remote: &'a R, state: AuthState) -> Self {
        let mut b = Self::new(conn, remote, state);
        b.refresh();
        b
    }

    /// Basket from the local mirror only; the remote is not contacted.
    pub fn cached(conn: &'a Connection, remote: &'a R, state: AuthState) -> Self {
        let mut b = Self::new(conn, remote, state);
        b.load_local();
        b
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    pub fn items(&self) -> &[BasketItem] {
        &self.items
    }

    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0u32, |n, i| n.saturating_add(i.quantity_or_one()))
    }

    /// `None` when the line totals overflow.
    pub fn total_amount(&self) -> Option<Decimal> {
        self.items
            .iter()
            .try_fold(Decimal::ZERO, |sum, i| sum.checked_add(i.total))
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&[BasketItem]) + 'a) {
        self.listeners.push(Box::new(listener));
    }

    fn set_items(&mut self, items: Vec<BasketItem>) {
        self.items = items;
        for l in self.listeners.iter_mut() {
            l(&self.items);
        }
    }

    /// Switches the source of truth. Going authenticated always re-reads
    /// the server; the anonymous list is superseded, not merged.
    pub fn set_auth_state(&mut self, state: AuthState) {
        if self.state == state {
            return;
        }
        debug!(?state, "Basket auth state changed");
        self.state = state;
        self.refresh();
    }

    /// Remote read when signed in, with a silent fallback to the mirror.
    pub fn refresh(&mut self) {
        if self.state == AuthState::Anonymous {
            self.load_local();
            return;
        }
        match self.remote.basket_items() {
            Ok(items) => {
                self.save_local(&items);
                self.set_items(items);
            }
            Err(e) => {
                warn!("Error refreshing basket, using local copy: {}", e);
                self.load_local();
            }
        }
    }

    /// User-triggered refresh. Returns false when skipped for the cooldown.
    pub fn manual_refresh(&mut self, now: DateTime<Utc>) -> Result<bool> {
        if let Some(raw) = storage_get(self.conn, REFRESH_STAMP_KEY)? {
            if let Ok(last) = DateTime::parse_from_rfc3339(&raw) {
                let elapsed = now.signed_duration_since(last.with_timezone(&Utc));
                if elapsed.num_seconds() >= 0 && elapsed.num_seconds() < MANUAL_REFRESH_COOLDOWN_SECS
                {
                    debug!("Basket refresh skipped, last one {}s ago", elapsed.num_seconds());
                    return Ok(false);
                }
            }
        }
        storage_set(self.conn, REFRESH_STAMP_KEY, &now.to_rfc3339())?;
        self.refresh();
        Ok(true)
    }

    pub fn add_item(&mut self, req: AddToBasket) -> BasketResult<()> {
        match self.state {
            AuthState::Authenticated => {
                self.remote.add_basket_item(&req)?;
                self.refresh();
            }
            AuthState::Anonymous => {
                let item = BasketItem::from_request(&req)
                    .ok_or(BasketError::Overflow(req.campaign_id))?;
                self.add_item_local(item)?;
            }
        }
        Ok(())
    }

    pub fn update_item(&mut self, req: AddToBasket) -> BasketResult<()> {
        match self.state {
            AuthState::Authenticated => {
                self.remote.update_basket_item(&req)?;
                self.refresh();
            }
            AuthState::Anonymous => {
                let total = line_total(req.amount, req.quantity.unwrap_or(1))
                    .ok_or(BasketError::Overflow(req.campaign_id))?;
                let updated: Vec<BasketItem> = self
                    .items
                    .iter()
                    .map(|existing| {
                        if existing.campaign_id != req.campaign_id {
                            return existing.clone();
                        }
                        let mut line = existing.clone();
                        line.amount = req.amount;
                        line.total = total;
                        if req.quantity.is_some() {
                            line.quantity = req.quantity;
                        }
                        overlay(&mut line.is_recurring, req.is_recurring);
                        overlay(&mut line.period_days, req.period_days);
                        overlay(&mut line.notes, req.notes.clone());
                        overlay(&mut line.behalf_of, req.behalf_of.clone());
                        overlay(&mut line.donation_item, req.donation_item.clone());
                        overlay(&mut line.donation_item_price, req.donation_item_price);
                        overlay(&mut line.rice_quantity, req.rice_quantity);
                        overlay(&mut line.rice_price, req.rice_price);
                        line
                    })
                    .collect();
                self.save_local(&updated);
                self.set_items(updated);
            }
        }
        Ok(())
    }

    pub fn remove_item(
        &mut self,
        campaign_id: i64,
        donation_item: Option<&str>,
    ) -> BasketResult<()> {
        match self.state {
            AuthState::Authenticated => {
                self.remote.remove_basket_item(campaign_id, donation_item)?;
                self.refresh();
            }
            AuthState::Anonymous => self.remove_item_local(campaign_id),
        }
        Ok(())
    }

    /// Bumps an existing line for the same campaign by one, else appends.
    /// The basket is left untouched when the bumped total overflows.
    pub fn add_item_local(&mut self, item: BasketItem) -> BasketResult<()> {
        let mut updated = self.items.clone();
        match updated.iter_mut().find(|i| i.campaign_id == item.campaign_id) {
            Some(existing) => {
                let overflow = BasketError::Overflow(existing.campaign_id);
                let Some(quantity) = existing.quantity_or_one().checked_add(1) else {
                    return Err(overflow);
                };
                let Some(total) = line_total(existing.amount, quantity) else {
                    return Err(overflow);
                };
                existing.quantity = Some(quantity);
                existing.total = total;
            }
            None => updated.push(item),
        }
        self.save_local(&updated);
        self.set_items(updated);
        Ok(())
    }

    pub fn remove_item_local(&mut self, campaign_id: i64) {
        let updated: Vec<BasketItem> = self
            .items
            .iter()
            .filter(|i| i.campaign_id != campaign_id)
            .cloned()
            .collect();
        self.save_local(&updated);
        self.set_items(updated);
    }

    /// Deletes every line one by one when signed in, then wipes the local
    /// copy regardless. Returns how many remote deletes failed.
    pub fn clear(&mut self) -> usize {
        let mut failures = 0;
        if self.state == AuthState::Authenticated {
            for item in &self.items {
                if let Err(e) = self
                    .remote
                    .remove_basket_item(item.campaign_id, item.donation_item.as_deref())
                {
                    error!("Error removing item {}: {}", item.campaign_id, e);
                    failures += 1;
                }
            }
        }
        if let Err(e) = storage_remove(self.conn, LOCAL_BASKET_KEY) {
            warn!("Error clearing local basket: {}", e);
        }
        self.set_items(Vec::new());
        failures
    }

    /// A missing or unreadable mirror leaves the current list untouched.
    fn load_local(&mut self) {
        match load_json::<Vec<BasketItem>>(self.conn, LOCAL_BASKET_KEY) {
            Ok(Some(items)) => self.set_items(items),
            Ok(None) => {}
            Err(e) => error!("Error loading local basket: {:#}", e),
        }
    }

    fn save_local(&self, items: &[BasketItem]) {
        if let Err(e) = save_json(self.conn, LOCAL_BASKET_KEY, items) {
            error!("Error saving local basket: {:#}", e);
        }
    }
}

fn overlay<T>(slot: &mut Option<T>, value: Option<T>) {
    if value.is_some() {
        *slot = value;
    }
}

/// Pre-flight checks before a campaign goes into the basket.
pub fn validate_donation(amount: Decimal, checkout_type: Option<&str>) -> Result<()> {
    if amount <= Decimal::ZERO {
        bail!("Please enter a valid amount");
    }
    if checkout_type == Some(UNSUPPORTED_CHECKOUT_TYPE) {
        bail!(
            "This campaign requires additional information. Please use the web app for this campaign type."
        );
    }
    Ok(())
}
