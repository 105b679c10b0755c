//! SeriesDB command-line shell.
//!
//! Connects to a SeriesDB server over HTTP, forwards statements as queries,
//! and renders responses as json, csv, or aligned columns.

mod repl;
mod session;

use std::process;

use clap::Parser;

use seriesdb_client::{ConsistencyLevel, DEFAULT_PORT};
use seriesdb_core::Format;

use crate::repl::Repl;
use crate::session::{normalize_precision, Session, SessionOptions};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser)]
#[command(name = "seriesdb", version, about = "SeriesDB command-line shell")]
struct Cli {
    /// Server host to connect to
    #[arg(long, default_value = "localhost")]
    host: String,

    /// Server port to connect to
    #[arg(long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Username to authenticate with
    #[arg(short = 'u', long)]
    username: Option<String>,

    /// Password; passing the flag without a value prompts for one
    #[arg(short = 'p', long, num_args = 0..=1, default_missing_value = "")]
    password: Option<String>,

    /// Database to use
    #[arg(long)]
    database: Option<String>,

    /// Use https for requests
    #[arg(long)]
    ssl: bool,

    /// Format of the server responses: json, csv, or column
    #[arg(long, default_value_t = Format::Column)]
    format: Format,

    /// Format of the timestamp: rfc3339, h, m, s, ms, u or ns
    #[arg(long, default_value = "rfc3339")]
    precision: String,

    /// Write consistency level: any, one, quorum, or all
    #[arg(long, default_value = "any")]
    consistency: String,

    /// Turn on pretty print for the json format
    #[arg(long)]
    pretty: bool,

    /// Execute a single statement and exit
    #[arg(long)]
    execute: Option<String>,
}

fn main() {
    let cli = Cli::parse();

    // A bare --password flag means "prompt for it".
    let password = match cli.password {
        Some(p) if p.is_empty() => match rpassword::prompt_password("password: ") {
            Ok(p) => Some(p),
            Err(_) => {
                println!("Unable to parse password.");
                None
            }
        },
        other => other,
    };

    let precision = match normalize_precision(&cli.precision) {
        Ok(precision) => precision,
        Err(msg) => {
            eprintln!("{msg}");
            process::exit(1);
        }
    };

    let consistency = match cli.consistency.to_lowercase().parse::<ConsistencyLevel>() {
        Ok(level) => level,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    let mut session = match Session::new(SessionOptions {
        host: cli.host,
        port: cli.port,
        ssl: cli.ssl,
        username: cli.username,
        password,
        database: cli.database.unwrap_or_default(),
        format: cli.format,
        precision,
        consistency,
        pretty: cli.pretty,
    }) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("ERR: {e}");
            process::exit(1);
        }
    };

    if session.ping().is_err() {
        eprintln!("Failed to connect to {}", session.addr());
        eprintln!("Please check your connection settings and ensure 'seriesdbd' is running.");
        process::exit(1);
    }

    // One-shot mode bypasses the interactive loop.
    if let Some(query) = cli.execute {
        let ok = session.execute_query(&query);
        process::exit(if ok { 0 } else { 1 });
    }

    println!("Connected to {} version {}", session.addr(), session.server_version());
    println!("SeriesDB shell {VERSION}");

    let mut repl = match Repl::new() {
        Ok(repl) => repl,
        Err(e) => {
            eprintln!("ERR: {e}");
            process::exit(1);
        }
    };

    if let Err(e) = repl.run(&mut session) {
        eprintln!("ERR: {e}");
        process::exit(1);
    }
}
