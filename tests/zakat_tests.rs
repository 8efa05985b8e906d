// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::cell::RefCell;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use rusqlite::Connection;
use rust_decimal::Decimal;
use sadaqah::api::{ApiClient, ApiError, ApiResult, BasketRemote};
use sadaqah::basket::{AuthState, BasketReconciler};
use sadaqah::commands::zakat::{ZAKAT_DONATION_ITEM, donate_zakat};
use sadaqah::models::{
    AddToBasket, BasketItem, Campaign, Currency, Metal, MetalPrices, WeightUnit,
};
use sadaqah::prices::store_prices;
use sadaqah::zakat::{
    AmountField, ZakatWorksheet, calculate_nisab, calculate_wealth, calculate_zakat,
    estimate_metal_value,
};
use sadaqah::{cli, commands, db};
use serde_json::json;

fn setup() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&mut conn).unwrap();
    conn
}

fn prices(gold_usd: i64, gold_aud: i64, silver_usd: i64) -> MetalPrices {
    let mut p = MetalPrices::zeroed(Utc.with_ymd_and_hms(2025, 3, 1, 9, 0, 0).unwrap());
    p.gold_price_in_usd = Decimal::from(gold_usd);
    p.gold_price_in_aud = Decimal::from(gold_aud);
    p.silver_fine_price_in_usd = Decimal::from(silver_usd);
    p.silver_fine_price_in_aud = Decimal::from(silver_usd * 3 / 2);
    p
}

fn worksheet(unit: Currency, cash: Decimal) -> ZakatWorksheet {
    let mut ws = ZakatWorksheet::default();
    ws.set_currency(unit);
    ws.update_amount(AmountField::Cash, cash);
    ws
}

#[test]
fn silver_nisab_converts_usd_to_aud_through_gold_cross_rate() {
    let p = prices(2000, 3000, 25);
    let usd = calculate_nisab(Some(&p), Currency::Usd);
    assert_eq!(usd.silver, Decimal::from(15309));
    assert_eq!(usd.gold, Decimal::from(174960));

    let aud = calculate_nisab(Some(&p), Currency::Aud);
    assert_eq!(aud.silver.round_dp(2), Decimal::new(2296350, 2));
    assert_eq!(aud.gold.round_dp(2), Decimal::from(262440));
}

#[test]
fn missing_or_zero_quotes_give_zero_everywhere() {
    let ws = worksheet(Currency::Aud, Decimal::from(1_000_000));
    assert_eq!(calculate_nisab(None, Currency::Aud).silver, Decimal::ZERO);
    assert_eq!(calculate_zakat(&ws.amounts, None), Decimal::ZERO);

    let zero_silver = prices(2000, 3000, 0);
    assert_eq!(calculate_zakat(&ws.amounts, Some(&zero_silver)), Decimal::ZERO);
    let zero_gold_aud = prices(2000, 0, 25);
    assert_eq!(calculate_nisab(Some(&zero_gold_aud), Currency::Usd).gold, Decimal::ZERO);
}

#[test]
fn zakat_is_a_fortieth_of_wealth_above_silver_nisab() {
    let p = prices(2000, 3000, 25);
    let ws = worksheet(Currency::Aud, Decimal::from(30000));
    assert_eq!(calculate_zakat(&ws.amounts, Some(&p)), Decimal::from(750));

    let below = worksheet(Currency::Aud, Decimal::from(20000));
    assert_eq!(calculate_zakat(&below.amounts, Some(&p)), Decimal::ZERO);
}

#[test]
fn wealth_equal_to_nisab_is_not_zakatable() {
    let p = prices(2000, 3000, 25);
    let at = worksheet(Currency::Usd, Decimal::from(15309));
    assert_eq!(calculate_zakat(&at.amounts, Some(&p)), Decimal::ZERO);

    let above = worksheet(Currency::Usd, Decimal::new(1530901, 2));
    assert_eq!(
        calculate_zakat(&above.amounts, Some(&p)),
        Decimal::new(1530901, 2) / Decimal::from(40)
    );
}

#[test]
fn wealth_sums_cash_assets_and_metal_holdings() {
    let mut ws = worksheet(Currency::Aud, Decimal::from(100));
    ws.update_amount(AmountField::Bank, Decimal::from(200));
    ws.update_amount(AmountField::Loan, Decimal::from(50));
    ws.upsert_metal(
        Metal::Gold,
        sadaqah::models::MetalHolding {
            key: "ring".into(),
            karat: 22,
            unit: WeightUnit::Gram,
            weight: Decimal::from(5),
            value: Decimal::from(400),
            name: None,
        },
    );
    assert_eq!(calculate_wealth(&ws.amounts), Decimal::from(750));
    assert!(ws.remove_metal(Metal::Gold, "ring"));
    assert!(!ws.remove_metal(Metal::Gold, "ring"));
    assert_eq!(calculate_wealth(&ws.amounts), Decimal::from(350));
}

#[test]
fn metal_value_scales_with_karat_and_unit() {
    let mut p = prices(2000, 3000, 25);
    p.gold_price_in_aud = Decimal::new(311035, 2);
    let one_gram_24k = estimate_metal_value(
        Metal::Gold,
        24,
        Decimal::ONE,
        WeightUnit::Gram,
        Some(&p),
        Currency::Aud,
    );
    assert_eq!(one_gram_24k, Decimal::from(100));
    let one_gram_18k = estimate_metal_value(
        Metal::Gold,
        18,
        Decimal::ONE,
        WeightUnit::Gram,
        Some(&p),
        Currency::Aud,
    );
    assert_eq!(one_gram_18k, Decimal::from(75));
    let one_ounce = estimate_metal_value(
        Metal::Gold,
        24,
        Decimal::ONE,
        WeightUnit::Ounce,
        Some(&p),
        Currency::Aud,
    );
    assert_eq!(one_ounce.round_dp(2), Decimal::new(311035, 2));
    assert_eq!(
        estimate_metal_value(Metal::Silver, 1, Decimal::ONE, WeightUnit::Gram, None, Currency::Aud),
        Decimal::ZERO
    );
}

#[test]
fn wealth_counts_every_component_once() {
    let mut ws = ZakatWorksheet::default();
    for (field, value) in [
        (AmountField::Cash, 1),
        (AmountField::Bank, 2),
        (AmountField::InvestmentProfit, 4),
        (AmountField::ShareResale, 8),
        (AmountField::Merchandise, 16),
        (AmountField::Loan, 32),
        (AmountField::Other, 64),
    ] {
        ws.update_amount(field, Decimal::from(value));
    }
    for (metal, key, value) in [(Metal::Gold, "bangle", 128), (Metal::Silver, "tray", 256)] {
        ws.upsert_metal(
            metal,
            sadaqah::models::MetalHolding {
                key: key.into(),
                karat: 1,
                unit: WeightUnit::Gram,
                weight: Decimal::ONE,
                value: Decimal::from(value),
                name: None,
            },
        );
    }
    assert_eq!(calculate_wealth(&ws.amounts), Decimal::from(511));
}

#[test]
fn silver_value_uses_fine_price_without_karat_scaling() {
    let mut p = prices(2000, 3000, 25);
    p.silver_fine_price_in_aud = Decimal::new(311035, 3);
    let three_grams = estimate_metal_value(
        Metal::Silver,
        1,
        Decimal::from(3),
        WeightUnit::Gram,
        Some(&p),
        Currency::Aud,
    );
    assert_eq!(three_grams, Decimal::from(30));

    let two_ounces = estimate_metal_value(
        Metal::Silver,
        1,
        Decimal::from(2),
        WeightUnit::Ounce,
        Some(&p),
        Currency::Usd,
    );
    assert_eq!(two_ounces.round_dp(2), Decimal::from(50));
}

#[test]
fn metal_value_overflow_is_zero() {
    let p = prices(2000, 3000, 25);
    for unit in [WeightUnit::Gram, WeightUnit::Ounce] {
        assert_eq!(
            estimate_metal_value(
                Metal::Gold,
                24,
                Decimal::MAX,
                unit,
                Some(&p),
                Currency::Usd
            ),
            Decimal::ZERO
        );
    }
    let mut rich = prices(2000, 3000, 25);
    rich.gold_price_in_usd = Decimal::MAX;
    assert_eq!(
        estimate_metal_value(
            Metal::Gold,
            22,
            Decimal::from(1000),
            WeightUnit::Gram,
            Some(&rich),
            Currency::Usd
        ),
        Decimal::ZERO
    );
}

#[test]
fn worksheet_steps_clamp_and_persist() {
    let conn = setup();
    let mut ws = ZakatWorksheet::load(&conn).unwrap();
    assert_eq!(ws.step, 1);
    ws.prev_step();
    assert_eq!(ws.step, 1);
    for _ in 0..10 {
        ws.next_step();
    }
    assert_eq!(ws.step, 5);
    ws.set_step(3);
    ws.update_amount(AmountField::Cash, Decimal::from(42));
    ws.save(&conn).unwrap();

    let reloaded = ZakatWorksheet::load(&conn).unwrap();
    assert_eq!(reloaded, ws);
    ZakatWorksheet::discard(&conn).unwrap();
    assert_eq!(ZakatWorksheet::load(&conn).unwrap(), ZakatWorksheet::default());
}

#[derive(Default)]
struct NoRemote {
    calls: RefCell<usize>,
}

impl BasketRemote for NoRemote {
    fn basket_items(&self) -> ApiResult<Vec<BasketItem>> {
        *self.calls.borrow_mut() += 1;
        Err(ApiError::Decode("offline".into()))
    }
    fn add_basket_item(&self, _item: &AddToBasket) -> ApiResult<()> {
        *self.calls.borrow_mut() += 1;
        Err(ApiError::Decode("offline".into()))
    }
    fn update_basket_item(&self, _item: &AddToBasket) -> ApiResult<()> {
        *self.calls.borrow_mut() += 1;
        Err(ApiError::Decode("offline".into()))
    }
    fn remove_basket_item(&self, _campaign_id: i64, _item: Option<&str>) -> ApiResult<()> {
        *self.calls.borrow_mut() += 1;
        Err(ApiError::Decode("offline".into()))
    }
}

fn campaigns() -> Vec<Campaign> {
    serde_json::from_value(json!([
        { "id": 4, "name": "Orphan Care", "slug": "orphan-care" },
        { "id": 9, "name": "Zakat Al Maal", "slug": "zakat", "checkoutType": "ZAQAT" }
    ]))
    .unwrap()
}

#[test]
fn donate_adds_rounded_zakat_line_and_resets_worksheet() {
    let conn = setup();
    let remote = NoRemote::default();
    let mut basket = BasketReconciler::new(&conn, &remote, AuthState::Anonymous);
    let p = prices(2000, 3000, 25);
    let mut ws = worksheet(Currency::Usd, Decimal::new(1600001, 2));
    ws.set_step(5);

    let amount = donate_zakat(&mut ws, Some(&p), &campaigns(), &mut basket).unwrap();
    assert_eq!(amount, Decimal::new(40000, 2));
    let line = &basket.items()[0];
    assert_eq!(line.campaign_id, 9);
    assert_eq!(line.amount, amount);
    assert_eq!(line.donation_item.as_deref(), Some(ZAKAT_DONATION_ITEM));
    assert_eq!(line.is_recurring, Some(false));
    assert_eq!(ws.step, 1);
    assert_eq!(ws.amounts.cash, Decimal::ZERO);
    assert_eq!(ws.amounts.unit, Currency::Usd);
    assert_eq!(*remote.calls.borrow(), 0);
}

#[test]
fn donate_refuses_without_zakat_due_or_campaign() {
    let conn = setup();
    let remote = NoRemote::default();
    let mut basket = BasketReconciler::new(&conn, &remote, AuthState::Anonymous);
    let p = prices(2000, 3000, 25);

    let mut poor = worksheet(Currency::Usd, Decimal::from(100));
    assert!(donate_zakat(&mut poor, Some(&p), &campaigns(), &mut basket).is_err());

    let mut rich = worksheet(Currency::Usd, Decimal::from(100_000));
    let err = donate_zakat(&mut rich, Some(&p), &campaigns()[..1], &mut basket).unwrap_err();
    assert!(err.to_string().contains("No Zakat campaign"));
    assert_eq!(rich.amounts.cash, Decimal::from(100_000));
    assert!(basket.items().is_empty());
}

#[test]
fn cli_edits_worksheet_with_cached_prices() {
    let conn = setup();
    let fetched = Utc::now();
    let mut p = prices(2000, 3000, 25);
    p.gold_price_in_aud = Decimal::new(311035, 2);
    store_prices(&conn, &p, fetched, "fresh").unwrap();
    let api = ApiClient::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap();

    let run = |args: &[&str]| {
        let mut full = vec!["sadaqah", "zakat"];
        full.extend_from_slice(args);
        let matches = cli::build_cli().get_matches_from(full);
        if let Some(("zakat", sub)) = matches.subcommand() {
            commands::zakat::handle(&conn, &api, sub).unwrap();
        } else {
            panic!("no zakat subcommand");
        }
    };

    run(&["set", "cash", "$1,250.50"]);
    run(&["metal", "add", "--type", "gold", "--karat", "18", "--weight", "2", "--key", "chain"]);
    run(&["step", "next"]);

    let ws = ZakatWorksheet::load(&conn).unwrap();
    assert_eq!(ws.amounts.cash, Decimal::new(125050, 2));
    assert_eq!(ws.amounts.gold.len(), 1);
    assert_eq!(ws.amounts.gold[0].value, Decimal::from(150));
    assert_eq!(ws.amounts.gold[0].name.as_deref(), Some("gold 18k"));
    assert_eq!(ws.step, 2);
}
