// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{Arg, ArgAction, Command, crate_version, value_parser};

fn json_flags(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("json")
            .long("json")
            .action(ArgAction::SetTrue)
            .help("Print pretty JSON"),
    )
    .arg(
        Arg::new("jsonl")
            .long("jsonl")
            .action(ArgAction::SetTrue)
            .conflicts_with("json")
            .help("Print one JSON object per line"),
    )
}

fn donation_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("campaign")
            .long("campaign")
            .required(true)
            .help("Campaign id or slug"),
    )
    .arg(Arg::new("amount").long("amount").required(true))
    .arg(
        Arg::new("quantity")
            .long("quantity")
            .value_parser(value_parser!(u32)),
    )
    .arg(
        Arg::new("recurring")
            .long("recurring")
            .action(ArgAction::SetTrue),
    )
    .arg(
        Arg::new("period_days")
            .long("period-days")
            .value_parser(value_parser!(u32))
            .help("Recurrence period: 1 = daily, 10 = last ten nights of Ramadan"),
    )
    .arg(Arg::new("notes").long("notes"))
    .arg(Arg::new("behalf_of").long("behalf-of"))
    .arg(
        Arg::new("donation_item")
            .long("donation-item")
            .help("Distinguishes several lines for one campaign"),
    )
}

pub fn build_cli() -> Command {
    Command::new("sadaqah")
        .version(crate_version!())
        .about("Donate to campaigns, manage your basket and calculate Zakat")
        .subcommand(Command::new("init").about("Create the local database"))
        .subcommand(
            Command::new("config")
                .about("Client settings")
                .subcommand(Command::new("show"))
                .subcommand(
                    Command::new("set-currency")
                        .arg(Arg::new("currency").required(true).help("AUD or USD")),
                )
                .subcommand(Command::new("set-api").arg(Arg::new("url").required(true))),
        )
        .subcommand(
            Command::new("campaign")
                .about("Browse campaigns")
                .subcommand(json_flags(Command::new("list")))
                .subcommand(json_flags(
                    Command::new("show").arg(Arg::new("slug").required(true)),
                ))
                .subcommand(json_flags(Command::new("categories"))),
        )
        .subcommand(
            Command::new("auth")
                .about("Sign in and out")
                .subcommand(
                    Command::new("login")
                        .arg(Arg::new("email").long("email").required(true))
                        .arg(Arg::new("password").long("password").required(true)),
                )
                .subcommand(Command::new("logout"))
                .subcommand(Command::new("status"))
                .subcommand(
                    Command::new("register")
                        .arg(Arg::new("email").long("email").required(true))
                        .arg(Arg::new("password").long("password").required(true))
                        .arg(Arg::new("first_name").long("first-name").required(true))
                        .arg(Arg::new("last_name").long("last-name").required(true))
                        .arg(Arg::new("phone").long("phone"))
                        .arg(Arg::new("address").long("address"))
                        .arg(Arg::new("country").long("country"))
                        .arg(Arg::new("state").long("state"))
                        .arg(Arg::new("city").long("city"))
                        .arg(Arg::new("zip").long("zip"))
                        .arg(Arg::new("company").long("company")),
                ),
        )
        .subcommand(
            Command::new("basket")
                .about("Donation basket")
                .subcommand(json_flags(Command::new("list")))
                .subcommand(donation_args(Command::new("add")))
                .subcommand(donation_args(Command::new("update")))
                .subcommand(
                    Command::new("rm")
                        .arg(
                            Arg::new("campaign")
                                .long("campaign")
                                .required(true)
                                .value_parser(value_parser!(i64)),
                        )
                        .arg(Arg::new("donation_item").long("donation-item")),
                )
                .subcommand(Command::new("clear"))
                .subcommand(Command::new("refresh"))
                .subcommand(
                    Command::new("export")
                        .arg(
                            Arg::new("format")
                                .long("format")
                                .default_value("csv")
                                .help("csv or json"),
                        )
                        .arg(Arg::new("out").long("out").required(true)),
                ),
        )
        .subcommand(
            Command::new("zakat")
                .about("Zakat calculator")
                .subcommand(json_flags(
                    Command::new("show").arg(
                        Arg::new("live")
                            .long("live")
                            .action(ArgAction::SetTrue)
                            .help("Refresh metal prices first"),
                    ),
                ))
                .subcommand(
                    Command::new("set")
                        .arg(Arg::new("field").required(true))
                        .arg(Arg::new("value").required(true)),
                )
                .subcommand(Command::new("currency").arg(Arg::new("currency").required(true)))
                .subcommand(
                    Command::new("metal")
                        .subcommand(
                            Command::new("add")
                                .arg(Arg::new("type").long("type").required(true))
                                .arg(
                                    Arg::new("karat")
                                        .long("karat")
                                        .value_parser(value_parser!(u32)),
                                )
                                .arg(Arg::new("weight").long("weight").required(true))
                                .arg(Arg::new("unit").long("unit").default_value("gram"))
                                .arg(
                                    Arg::new("value")
                                        .long("value")
                                        .help("Override the estimated market value"),
                                )
                                .arg(Arg::new("key").long("key")),
                        )
                        .subcommand(
                            Command::new("rm")
                                .arg(Arg::new("type").long("type").required(true))
                                .arg(Arg::new("key").long("key").required(true)),
                        ),
                )
                .subcommand(
                    Command::new("step")
                        .arg(Arg::new("to").required(true).help("next, prev or 1-5")),
                )
                .subcommand(Command::new("reset"))
                .subcommand(Command::new("donate")),
        )
        .subcommand(
            Command::new("prices")
                .about("Gold and silver spot prices")
                .subcommand(Command::new("fetch"))
                .subcommand(json_flags(
                    Command::new("list").arg(
                        Arg::new("limit")
                            .long("limit")
                            .value_parser(value_parser!(usize))
                            .default_value("20"),
                    ),
                )),
        )
        .subcommand(
            Command::new("checkout")
                .about("Pay for the basket")
                .subcommand(
                    Command::new("submit")
                        .arg(Arg::new("first_name").long("first-name").required(true))
                        .arg(Arg::new("last_name").long("last-name").required(true))
                        .arg(Arg::new("email").long("email").required(true))
                        .arg(Arg::new("phone").long("phone"))
                        .arg(Arg::new("company").long("company"))
                        .arg(Arg::new("country").long("country"))
                        .arg(Arg::new("address").long("address"))
                        .arg(Arg::new("city").long("city"))
                        .arg(Arg::new("state").long("state"))
                        .arg(Arg::new("zip").long("zip"))
                        .arg(
                            Arg::new("create_account")
                                .long("create-account")
                                .action(ArgAction::SetTrue),
                        )
                        .arg(
                            Arg::new("skip_address")
                                .long("skip-address")
                                .action(ArgAction::SetTrue)
                                .help("Do not require postal details"),
                        )
                        .arg(
                            Arg::new("gateway")
                                .long("gateway")
                                .default_value("stripe")
                                .help("stripe or paypal"),
                        ),
                )
                .subcommand(json_flags(Command::new("show"))),
        )
        .subcommand(Command::new("doctor").about("Check local data for problems"))
}
