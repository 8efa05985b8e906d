// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use sadaqah::api::ApiClient;
use sadaqah::config::Config;
use sadaqah::{cli, commands, db};

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env()?;
    let matches = cli::build_cli().get_matches();

    let conn = db::open_or_init(&config)?;
    let session = commands::auth::current_session(&conn)?;
    let api = ApiClient::new(&config.api_url(&conn)?, config.http_timeout())?
        .with_token(session.map(|s| s.token));

    match matches.subcommand() {
        Some(("init", _)) => {
            println!("Database initialized at {}", db::db_path(&config)?.display());
        }
        Some(("config", sub)) => commands::settings::handle(&conn, &config, sub)?,
        Some(("campaign", sub)) => commands::campaigns::handle(&conn, &api, sub)?,
        Some(("auth", sub)) => commands::auth::handle(&conn, &api, sub)?,
        Some(("basket", sub)) => commands::basket::handle(&conn, &api, sub)?,
        Some(("zakat", sub)) => commands::zakat::handle(&conn, &api, sub)?,
        Some(("prices", sub)) => commands::prices::handle(&conn, &api, sub)?,
        Some(("checkout", sub)) => commands::checkout::handle(&conn, &api, sub)?,
        Some(("doctor", _)) => commands::doctor::handle(&conn)?,
        _ => {
            cli::build_cli().print_help()?;
            println!();
        }
    }
    Ok(())
}
