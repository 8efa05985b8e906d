// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use std::cell::RefCell;

use chrono::{TimeZone, Utc};
use rusqlite::Connection;
use rust_decimal::Decimal;
use sadaqah::api::{ApiError, ApiResult, CheckoutGateway, CheckoutReceipt, CheckoutRequest};
use sadaqah::checkout::{
    checkout_total, has_recurring, pending_checkout, requires_guest_checkout, submit_checkout,
    validate_buyer,
};
use sadaqah::db;
use sadaqah::models::{AddToBasket, AuthSession, BasketItem, BuyerDetails, PaymentGateway};

fn setup() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&mut conn).unwrap();
    conn
}

fn buyer() -> BuyerDetails {
    BuyerDetails {
        first_name: "Amina".into(),
        last_name: "Rahman-Ali".into(),
        email: "amina@example.org".into(),
        phone: "+61 400 000 000".into(),
        country: "AU".into(),
        address: "1 Smith St".into(),
        city: "St Kilda".into(),
        state: "Victoria".into(),
        zip: "3182".into(),
        require_address: true,
        ..BuyerDetails::default()
    }
}

fn session(role: &str, email: &str) -> AuthSession {
    AuthSession {
        token: "tok".into(),
        id: 11,
        role: role.into(),
        secondary_role: None,
        auth_type: "email".into(),
        first_name: "Amina".into(),
        last_name: "Rahman".into(),
        email: email.into(),
        is_logged_in: true,
    }
}

fn line(campaign_id: i64, amount: i64, quantity: u32) -> BasketItem {
    BasketItem::from_request(&AddToBasket {
        campaign_id,
        amount: Decimal::from(amount),
        quantity: Some(quantity),
        ..AddToBasket::default()
    })
    .unwrap()
}

#[derive(Default)]
struct RecordingGateway {
    calls: RefCell<Vec<(&'static str, Option<bool>, PaymentGateway)>>,
    fail: bool,
}

impl RecordingGateway {
    fn record(&self, route: &'static str, req: &CheckoutRequest) -> ApiResult<CheckoutReceipt> {
        self.calls
            .borrow_mut()
            .push((route, req.is_anonymous, req.payment_gateway));
        if self.fail {
            return Err(ApiError::Rejected {
                status: 422,
                message: "Card declined".into(),
            });
        }
        Ok(CheckoutReceipt {
            client_secret: Some(format!("secret-{}", route)),
            payment_intent_id: Some("pi_1".into()),
            donation_ids: None,
            approval_url: None,
        })
    }
}

impl CheckoutGateway for RecordingGateway {
    fn checkout_guest(&self, req: &CheckoutRequest) -> ApiResult<CheckoutReceipt> {
        self.record("guest", req)
    }

    fn checkout_member(&self, req: &CheckoutRequest) -> ApiResult<CheckoutReceipt> {
        self.record("member", req)
    }
}

#[test]
fn valid_buyer_passes() {
    assert!(validate_buyer(&buyer()).is_empty());
}

#[test]
fn names_reject_digits_and_overlong_values() {
    let mut b = buyer();
    b.first_name = "Am1na".into();
    b.last_name = "x".repeat(41);
    let errors = validate_buyer(&b);
    let fields: Vec<&str> = errors.iter().map(|e| e.field).collect();
    assert_eq!(fields, vec!["firstName", "lastName"]);
    assert!(errors[1].message.contains("40"));
}

#[test]
fn address_fields_only_required_when_flagged() {
    let mut b = BuyerDetails {
        first_name: "Omar".into(),
        last_name: "Khan".into(),
        email: "omar@example.org".into(),
        ..BuyerDetails::default()
    };
    assert!(validate_buyer(&b).is_empty());
    b.require_address = true;
    let fields: Vec<&str> = validate_buyer(&b).iter().map(|e| e.field).collect();
    assert!(fields.contains(&"address"));
    assert!(fields.contains(&"zip"));
    assert!(!fields.contains(&"company"));
}

#[test]
fn guests_and_staff_use_anonymous_checkout() {
    assert!(requires_guest_checkout(None));
    assert!(requires_guest_checkout(Some(&session("ADMIN", "a@x.org"))));
    assert!(requires_guest_checkout(Some(&session("SUPERADMIN", "a@x.org"))));
    assert!(requires_guest_checkout(Some(&session("USER", ""))));
    assert!(!requires_guest_checkout(Some(&session("USER", "a@x.org"))));
}

#[test]
fn totals_use_quantity_except_for_sacrifices() {
    let mut sacrifice = line(3, 150, 2);
    sacrifice.checkout_type = Some("ADEEQAH_GENERAL_SACRIFICE".into());
    sacrifice.total = Decimal::from(420);
    let items = vec![line(1, 25, 2), sacrifice];
    assert_eq!(checkout_total(&items).unwrap(), Decimal::from(470));
    assert!(!has_recurring(&items));
}

#[test]
fn member_checkout_is_saved_for_later() {
    let conn = setup();
    let gateway = RecordingGateway::default();
    let user = session("USER", "amina@example.org");
    let at = Utc.with_ymd_and_hms(2025, 3, 10, 8, 0, 0).unwrap();

    let details = submit_checkout(
        &conn,
        &gateway,
        Some(&user),
        buyer(),
        &[line(1, 25, 1)],
        PaymentGateway::Stripe,
        at,
    )
    .unwrap();
    assert!(!details.is_anonymous);
    assert_eq!(details.client_secret.as_deref(), Some("secret-member"));
    assert_eq!(
        gateway.calls.borrow()[0],
        ("member", None, PaymentGateway::Stripe)
    );
    assert_eq!(pending_checkout(&conn).unwrap(), Some(details));
}

#[test]
fn guest_checkout_flags_anonymous() {
    let conn = setup();
    let gateway = RecordingGateway::default();
    let details = submit_checkout(
        &conn,
        &gateway,
        None,
        buyer(),
        &[line(1, 25, 1)],
        PaymentGateway::Paypal,
        Utc::now(),
    )
    .unwrap();
    assert!(details.is_anonymous);
    assert_eq!(
        gateway.calls.borrow()[0],
        ("guest", Some(true), PaymentGateway::Paypal)
    );
}

#[test]
fn invalid_form_empty_basket_and_rejection_save_nothing() {
    let conn = setup();
    let gateway = RecordingGateway::default();
    let mut bad = buyer();
    bad.email = "not-an-email".into();
    let err = submit_checkout(&conn, &gateway, None, bad, &[line(1, 5, 1)], PaymentGateway::Stripe, Utc::now())
        .unwrap_err();
    assert!(err.to_string().starts_with("email:"));

    let err = submit_checkout(&conn, &gateway, None, buyer(), &[], PaymentGateway::Stripe, Utc::now())
        .unwrap_err();
    assert_eq!(err.to_string(), "Your basket is empty");
    assert!(gateway.calls.borrow().is_empty());

    let failing = RecordingGateway {
        fail: true,
        ..RecordingGateway::default()
    };
    let err = submit_checkout(&conn, &failing, None, buyer(), &[line(1, 5, 1)], PaymentGateway::Stripe, Utc::now())
        .unwrap_err();
    assert_eq!(err.to_string(), "Card declined");
    assert_eq!(pending_checkout(&conn).unwrap(), None);
}

#[test]
fn overflowing_total_is_rejected_before_any_call() {
    let conn = setup();
    let gateway = RecordingGateway::default();
    let mut huge = line(1, 1, 1);
    huge.amount = Decimal::MAX;
    huge.quantity = Some(2);

    assert!(checkout_total(std::slice::from_ref(&huge)).is_err());
    let err = submit_checkout(
        &conn,
        &gateway,
        None,
        buyer(),
        &[huge],
        PaymentGateway::Stripe,
        Utc::now(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("too large"));
    assert!(gateway.calls.borrow().is_empty());
}
