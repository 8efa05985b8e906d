// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rusqlite::Connection;
use sadaqah::commands::basket::{donation_request, period_label};
use sadaqah::commands::checkout::buyer_from_args;
use sadaqah::config::Config;
use sadaqah::models::Currency;
use sadaqah::utils::get_display_currency;
use sadaqah::{cli, commands, db};

fn sub<'a>(m: &'a clap::ArgMatches, path: &[&str]) -> &'a clap::ArgMatches {
    let mut cur = m;
    for name in path {
        match cur.subcommand() {
            Some((n, s)) if n == *name => cur = s,
            other => panic!("expected {}, got {:?}", name, other.map(|(n, _)| n)),
        }
    }
    cur
}

#[test]
fn basket_add_builds_donation_request() {
    let m = cli::build_cli().get_matches_from([
        "sadaqah",
        "basket",
        "add",
        "--campaign",
        "orphan-care",
        "--amount",
        "$ 75.5",
        "--recurring",
        "--period-days",
        "10",
        "--notes",
        "  ",
    ]);
    let add = sub(&m, &["basket", "add"]);
    let req = donation_request(add, 12).unwrap();
    assert_eq!(req.campaign_id, 12);
    assert_eq!(req.amount, rust_decimal::Decimal::new(755, 1));
    assert_eq!(req.is_recurring, Some(true));
    assert_eq!(req.period_days, Some(10));
    assert_eq!(req.notes, None);
    assert_eq!(period_label(req.period_days), "Last 10 Ramadan");
}

#[test]
fn checkout_submit_maps_flags_to_buyer() {
    let m = cli::build_cli().get_matches_from([
        "sadaqah",
        "checkout",
        "submit",
        "--first-name",
        "Omar",
        "--last-name",
        "Khan",
        "--email",
        "omar@example.org",
        "--skip-address",
        "--create-account",
    ]);
    let b = buyer_from_args(sub(&m, &["checkout", "submit"]));
    assert_eq!(b.first_name, "Omar");
    assert!(b.create_account);
    assert!(!b.require_address);
    assert_eq!(b.city, "");
}

#[test]
fn config_set_currency_persists() {
    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&mut conn).unwrap();
    let m = cli::build_cli().get_matches_from(["sadaqah", "config", "set-currency", " usd "]);
    commands::settings::handle(&conn, &Config::default(), sub(&m, &["config"])).unwrap();
    assert_eq!(get_display_currency(&conn).unwrap(), Currency::Usd);
}

#[test]
fn cli_rejects_non_numeric_quantity() {
    let res = cli::build_cli().try_get_matches_from([
        "sadaqah",
        "basket",
        "add",
        "--campaign",
        "1",
        "--amount",
        "10",
        "--quantity",
        "two",
    ]);
    assert!(res.is_err());
}
