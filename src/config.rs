//! Command-line configuration. Every flag falls back to an environment
//! variable, then to a default.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use bcrypt::DEFAULT_COST;
use clap::{value_parser, Arg, ArgMatches, Command};
use time::Duration;

/// Ten years. Keeps `issued_at + ttl` far inside the representable range.
pub const MAX_TOKEN_TTL_HOURS: i64 = 87_600;

/// What the binary was asked to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Serve,
    Import(PathBuf),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database: PathBuf,
    pub listen: SocketAddr,
    pub token_ttl: Duration,
    pub bcrypt_cost: u32,
    pub mode: Mode,
}

pub fn command() -> Command {
    Command::new("patientdesk")
        .about("Clinic staff patient lookup service")
        .arg(
            Arg::new("database")
                .long("database")
                .env("PATIENTDESK_DATABASE")
                .value_name("PATH")
                .help("SQLite database file (use :memory: for a throwaway store)")
                .default_value("patientdesk.db")
                .value_parser(value_parser!(PathBuf))
                .global(true),
        )
        .arg(
            Arg::new("listen")
                .long("listen")
                .env("PATIENTDESK_LISTEN")
                .value_name("ADDR")
                .help("Address to serve HTTP on")
                .default_value("0.0.0.0:8080")
                .value_parser(value_parser!(SocketAddr))
                .global(true),
        )
        .arg(
            Arg::new("token-ttl-hours")
                .long("token-ttl-hours")
                .env("PATIENTDESK_TOKEN_TTL_HOURS")
                .value_name("HOURS")
                .help("How long an issued session token stays valid")
                .default_value("24")
                .value_parser(value_parser!(i64).range(1..=MAX_TOKEN_TTL_HOURS))
                .global(true),
        )
        .arg(
            Arg::new("bcrypt-cost")
                .long("bcrypt-cost")
                .env("PATIENTDESK_BCRYPT_COST")
                .value_name("COST")
                .help("bcrypt work factor for new passwords [default: bcrypt's DEFAULT_COST]")
                .value_parser(value_parser!(u32).range(4..=31))
                .global(true),
        )
        .subcommand(Command::new("serve").about("Run the HTTP service (default)"))
        .subcommand(
            Command::new("import")
                .about("Load hospitals and patients from a JSON seed file")
                .arg(
                    Arg::new("file")
                        .help("Path to the seed file")
                        .required(true)
                        .value_parser(value_parser!(PathBuf)),
                ),
        )
}

impl Config {
    pub fn from_matches(matches: &ArgMatches) -> Result<Self> {
        let mode = match matches.subcommand() {
            Some(("import", sub)) => Mode::Import(
                sub.get_one::<PathBuf>("file")
                    .cloned()
                    .context("missing seed file")?,
            ),
            _ => Mode::Serve,
        };
        let hours = *matches
            .get_one::<i64>("token-ttl-hours")
            .context("missing token-ttl-hours")?;

        Ok(Self {
            database: matches
                .get_one::<PathBuf>("database")
                .cloned()
                .context("missing database")?,
            listen: *matches
                .get_one::<SocketAddr>("listen")
                .context("missing listen address")?,
            token_ttl: Duration::hours(hours),
            bcrypt_cost: matches
                .get_one::<u32>("bcrypt-cost")
                .copied()
                .unwrap_or(DEFAULT_COST),
            mode,
        })
    }

    pub fn from_args() -> Result<Self> {
        Self::from_matches(&command().get_matches())
    }
}
