// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use chrono::{Local, Offset};
use rusqlite::Connection;
use tracing::warn;

use crate::api::{ApiClient, Registration};
use crate::basket::{AuthState, BasketReconciler};
use crate::db::{load_json, save_json, storage_remove};
use crate::models::AuthSession;
use crate::utils::pretty_table;

pub const SESSION_KEY: &str = "authData";

pub fn handle(conn: &Connection, api: &ApiClient, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("login", sub)) => {
            let email = sub.get_one::<String>("email").unwrap();
            let password = sub.get_one::<String>("password").unwrap();
            login(conn, api, email, password)?;
        }
        Some(("logout", _)) => logout(conn, api)?,
        Some(("status", _)) => status(conn)?,
        Some(("register", sub)) => register(api, sub)?,
        _ => {}
    }
    Ok(())
}

/// Stored session, if any. An unreadable record counts as signed out.
pub fn current_session(conn: &Connection) -> Result<Option<AuthSession>> {
    match load_json::<AuthSession>(conn, SESSION_KEY) {
        Ok(s) => Ok(s.filter(|s| !s.token.is_empty())),
        Err(e) => {
            warn!("Error reading stored session: {:#}", e);
            Ok(None)
        }
    }
}

pub fn save_session(conn: &Connection, session: &AuthSession) -> Result<()> {
    save_json(conn, SESSION_KEY, session)
}

pub fn clear_session(conn: &Connection) -> Result<()> {
    storage_remove(conn, SESSION_KEY)
}

fn login(conn: &Connection, api: &ApiClient, email: &str, password: &str) -> Result<()> {
    let session = api.login(email, password)?;
    save_session(conn, &session)?;

    let authed = api.authorized(&session.token);
    let mut basket = BasketReconciler::new(conn, &authed, AuthState::Anonymous);
    basket.set_auth_state(AuthState::Authenticated);

    println!(
        "Signed in as {} {} <{}>; basket has {} item(s)",
        session.first_name,
        session.last_name,
        session.email,
        basket.item_count()
    );
    Ok(())
}

fn logout(conn: &Connection, api: &ApiClient) -> Result<()> {
    let was_signed_in = current_session(conn)?.is_some();
    clear_session(conn)?;
    if !was_signed_in {
        println!("Not signed in");
        return Ok(());
    }
    let mut basket = BasketReconciler::new(conn, api, AuthState::Authenticated);
    basket.set_auth_state(AuthState::Anonymous);
    println!(
        "Signed out; local basket has {} item(s)",
        basket.item_count()
    );
    Ok(())
}

fn status(conn: &Connection) -> Result<()> {
    match current_session(conn)? {
        Some(s) => {
            let rows = vec![
                vec!["Name".into(), format!("{} {}", s.first_name, s.last_name)],
                vec!["Email".into(), s.email.clone()],
                vec!["Role".into(), s.role.clone()],
                vec!["User id".into(), s.id.to_string()],
            ];
            println!("{}", pretty_table(&["Field", "Value"], rows));
        }
        None => println!("Not signed in"),
    }
    Ok(())
}

fn opt(sub: &clap::ArgMatches, name: &str) -> Option<String> {
    sub.get_one::<String>(name)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn register(api: &ApiClient, sub: &clap::ArgMatches) -> Result<()> {
    // Minutes behind UTC, the way browsers report it.
    let offset_minutes = -Local::now().offset().fix().local_minus_utc() / 60;
    let form = Registration {
        email: sub.get_one::<String>("email").unwrap().clone(),
        password: sub.get_one::<String>("password").unwrap().clone(),
        first_name: sub.get_one::<String>("first_name").unwrap().clone(),
        last_name: sub.get_one::<String>("last_name").unwrap().clone(),
        phone: opt(sub, "phone"),
        address: opt(sub, "address"),
        country: opt(sub, "country"),
        state: opt(sub, "state"),
        city: opt(sub, "city"),
        zip: opt(sub, "zip"),
        company: opt(sub, "company"),
        timezone_offset: offset_minutes,
    };
    api.register(&form)?;
    println!("Registered {}; you can now sign in", form.email.trim().to_lowercase());
    Ok(())
}
