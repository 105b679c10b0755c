//! Shell session state and meta-command dispatch.
//!
//! All mutable shell state (current database, format, precision,
//! credentials) lives in an explicit `Session`; nothing is global. Each
//! command handler prints its own output and never aborts the session.

use std::io::{self, BufRead, Write};

use anyhow::Context;
use tokio::runtime::Runtime;

use seriesdb_client::error::Result as ClientResult;
use seriesdb_client::{
    parse_connection_string, BatchPoints, Client, Config, ConsistencyLevel, Point, Query,
};
use seriesdb_core::format::write_response;
use seriesdb_core::ident::{parse_insert_target, parse_next_identifier};
use seriesdb_core::Format;

const SHELL_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Map a precision selector to the `epoch` parameter value; rfc3339 means
/// text timestamps and clears the parameter.
pub fn normalize_precision(precision: &str) -> std::result::Result<String, String> {
    let lower = precision.trim().to_lowercase();
    match lower.as_str() {
        "rfc3339" => Ok(String::new()),
        "h" | "m" | "s" | "ms" | "u" | "ns" => Ok(lower),
        other => Err(format!(
            "Unknown precision {other:?}. Please use rfc3339, h, m, s, ms, u or ns."
        )),
    }
}

/// What the REPL should do after a command.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Quit,
}

pub struct SessionOptions {
    pub host: String,
    pub port: u16,
    pub ssl: bool,
    pub username: Option<String>,
    pub password: Option<String>,
    pub database: String,
    pub format: Format,
    /// Normalized precision; empty means rfc3339.
    pub precision: String,
    pub consistency: ConsistencyLevel,
    pub pretty: bool,
}

pub struct Session {
    rt: Runtime,
    client: Client,
    host: String,
    port: u16,
    ssl: bool,
    username: Option<String>,
    password: Option<String>,
    database: String,
    retention_policy: String,
    format: Format,
    precision: String,
    consistency: ConsistencyLevel,
    pretty: bool,
    server_version: String,
}

impl Session {
    pub fn new(options: SessionOptions) -> anyhow::Result<Self> {
        let rt = Runtime::new().context("failed to start async runtime")?;
        let url = parse_connection_string(
            &format!("{}:{}", options.host, options.port),
            options.ssl,
        )?;
        let client = Client::new(Config {
            url,
            username: options.username.clone(),
            password: options.password.clone(),
            user_agent: format!("SeriesDBShell/{SHELL_VERSION}"),
            precision: options.precision.clone(),
        })?;

        Ok(Session {
            rt,
            client,
            host: options.host,
            port: options.port,
            ssl: options.ssl,
            username: options.username,
            password: options.password,
            database: options.database,
            retention_policy: String::new(),
            format: options.format,
            precision: options.precision,
            consistency: options.consistency,
            pretty: options.pretty,
            server_version: String::new(),
        })
    }

    pub fn addr(&self) -> String {
        self.client.addr()
    }

    pub fn server_version(&self) -> &str {
        &self.server_version
    }

    /// Ping the current server and record its version.
    pub fn ping(&mut self) -> ClientResult<()> {
        self.server_version = self.rt.block_on(self.client.ping())?;
        Ok(())
    }

    /// Dispatch one input line. Unrecognized input is forwarded as a query.
    pub fn handle(&mut self, cmd: &str) -> Outcome {
        let lower = cmd.trim().to_lowercase();
        let Some(token) = lower.split_whitespace().next() else {
            return Outcome::Continue;
        };

        match token {
            "exit" | "quit" => return Outcome::Quit,
            "connect" => self.connect(cmd),
            "auth" => self.set_auth(cmd),
            "help" => self.help(),
            "format" => self.set_format(cmd),
            "precision" => self.set_precision(cmd),
            "consistency" => self.set_consistency(cmd),
            "settings" => self.settings(),
            "pretty" => {
                self.pretty = !self.pretty;
                if self.pretty {
                    println!("Pretty print enabled");
                } else {
                    println!("Pretty print disabled");
                }
            }
            "use" => self.use_database(cmd),
            "insert" => {
                self.insert(cmd);
            }
            _ => {
                self.execute_query(cmd);
            }
        }

        Outcome::Continue
    }

    /// Run a query and render the response in the session format. Returns
    /// false when the transport or the response reported an error.
    pub fn execute_query(&mut self, query: &str) -> bool {
        let q = Query {
            command: query.to_string(),
            database: self.database.clone(),
        };

        let response = match self.rt.block_on(self.client.query(&q)) {
            Ok(response) => response,
            Err(e) => {
                println!("ERR: {e}");
                return false;
            }
        };

        let mut stdout = io::stdout();
        if let Err(e) = write_response(&response, self.format, self.pretty, &mut stdout) {
            println!("{e}");
        }

        if let Some(err) = response.error() {
            println!("ERR: {err}");
            if self.database.is_empty() {
                println!("Warning: It is possible this error is due to not setting a database.");
                println!("Please set a database with the command \"use <database>\".");
            }
            return false;
        }

        true
    }

    /// Run an INSERT statement, extracting the database/retention-policy
    /// prefix from an INTO clause before delegating the raw point.
    fn insert(&mut self, stmt: &str) -> bool {
        let (ident, point) = parse_next_identifier(stmt);
        if !ident.eq_ignore_ascii_case("insert") {
            println!("ERR: found {ident}, expected INSERT");
            return true;
        }

        let (keyword, rest) = parse_next_identifier(point);
        let line = if keyword.eq_ignore_ascii_case("into") {
            let target = parse_insert_target(rest);
            if let Some(database) = target.database {
                self.database = database;
                println!("Using database {}", self.database);
            }
            if let Some(policy) = target.retention_policy {
                self.retention_policy = policy;
                println!("Using retention policy {}", self.retention_policy);
            }
            target.line.to_string()
        } else {
            point.to_string()
        };

        let batch = BatchPoints {
            points: vec![Point { raw: line }],
            database: self.database.clone(),
            retention_policy: self.retention_policy.clone(),
            precision: "n".to_string(),
            consistency: self.consistency.to_string(),
        };

        if let Err(e) = self.rt.block_on(self.client.write(&batch)) {
            println!("ERR: {e}");
            if self.database.is_empty() {
                println!("Note: error may be due to not setting a database or retention policy.");
                println!("Please set a database with the command \"use <database>\" or");
                println!("INSERT INTO <database>.<retention-policy> <point>");
            }
            return false;
        }

        true
    }

    /// Reconnect, to another server when an argument is given. The old
    /// client stays in place if the new one cannot be reached.
    fn connect(&mut self, cmd: &str) {
        let arg = rest_after_keyword(cmd);
        let path = if arg.is_empty() {
            format!("{}:{}", self.host, self.port)
        } else {
            arg.to_string()
        };

        let url = match parse_connection_string(&path, self.ssl) {
            Ok(url) => url,
            Err(e) => {
                println!("ERR: {e}");
                return;
            }
        };

        let client = match Client::new(Config {
            url,
            username: self.username.clone(),
            password: self.password.clone(),
            user_agent: format!("SeriesDBShell/{SHELL_VERSION}"),
            precision: self.precision.clone(),
        }) {
            Ok(client) => client,
            Err(e) => {
                println!("ERR: {e}");
                return;
            }
        };

        match self.rt.block_on(client.ping()) {
            Ok(version) => {
                self.client = client;
                self.server_version = version;
            }
            Err(_) => {
                println!("ERR: Failed to connect to {}", client.addr());
            }
        }
    }

    /// Set credentials from `auth <username> <password>`, prompting for
    /// anything not supplied inline.
    fn set_auth(&mut self, cmd: &str) {
        let args: Vec<&str> = cmd.split_whitespace().collect();

        let (username, password) = if args.len() == 3 {
            (args[1].to_string(), args[2].to_string())
        } else {
            print!("username: ");
            let _ = io::stdout().flush();
            let mut username = String::new();
            if let Err(e) = io::stdin().lock().read_line(&mut username) {
                println!("Unable to process input: {e}");
                return;
            }
            let password = match rpassword::prompt_password("password: ") {
                Ok(password) => password,
                Err(e) => {
                    println!("Unable to process input: {e}");
                    return;
                }
            };
            (username.trim().to_string(), password)
        };

        self.username = Some(username.clone());
        self.password = Some(password.clone());
        self.client.set_auth(&username, &password);
    }

    fn use_database(&mut self, cmd: &str) {
        let args: Vec<&str> = cmd.trim().trim_end_matches(';').split(' ').collect();
        if args.len() != 2 {
            println!("Could not parse database name from {cmd:?}.");
            return;
        }
        self.database = args[1].to_string();
        println!("Using database {}", self.database);
    }

    fn set_format(&mut self, cmd: &str) {
        let arg = rest_after_keyword(cmd).to_lowercase();
        match arg.parse::<Format>() {
            Ok(format) => self.format = format,
            Err(msg) => println!("{msg}"),
        }
    }

    fn set_precision(&mut self, cmd: &str) {
        let arg = rest_after_keyword(cmd);
        match normalize_precision(arg) {
            Ok(precision) => {
                self.precision = precision;
                self.client.set_precision(&self.precision);
            }
            Err(msg) => println!("{msg}"),
        }
    }

    fn set_consistency(&mut self, cmd: &str) {
        let arg = rest_after_keyword(cmd).to_lowercase();
        match arg.parse::<ConsistencyLevel>() {
            Ok(level) => self.consistency = level,
            Err(e) => println!("{e}"),
        }
    }

    fn settings(&self) {
        if self.port > 0 {
            println!("Host\t\t\t{}:{}", self.host, self.port);
        } else {
            println!("Host\t\t\t{}", self.host);
        }
        println!("Username\t\t{}", self.username.as_deref().unwrap_or_default());
        println!("Database\t\t{}", self.database);
        println!("Pretty\t\t\t{}", self.pretty);
        println!("Format\t\t\t{}", self.format);
        println!("Write Consistency\t{}", self.consistency);
        println!();
    }

    fn help(&self) {
        println!(
            r#"Usage:
        connect <host:port>   connect to another server specified by host:port
        auth                  prompt for username and password
        pretty                toggle pretty print for the json format
        use <db_name>         set the current database
        format <format>       set the server response format: json, csv, or column
        precision <format>    set the timestamp format: rfc3339, h, m, s, ms, u or ns
        consistency <level>   set the write consistency level: any, one, quorum, or all
        history               display command history
        settings              output the current settings for the shell
        insert                write a point in line protocol
        exit                  quit the shell
"#
        );
    }
}

/// The argument text after a meta-command keyword.
fn rest_after_keyword(cmd: &str) -> &str {
    let trimmed = cmd.trim();
    match trimmed.find(char::is_whitespace) {
        Some(i) => trimmed[i..].trim_start(),
        None => "",
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    fn test_session() -> Session {
        Session::new(SessionOptions {
            host: "localhost".to_string(),
            port: 8086,
            ssl: false,
            username: None,
            password: None,
            database: String::new(),
            format: Format::Column,
            precision: String::new(),
            consistency: ConsistencyLevel::Any,
            pretty: false,
        })
        .unwrap()
    }

    #[test]
    fn test_normalize_precision() {
        assert_eq!(normalize_precision("rfc3339").unwrap(), "");
        assert_eq!(normalize_precision("NS").unwrap(), "ns");
        assert_eq!(normalize_precision("ms").unwrap(), "ms");
        assert!(normalize_precision("fortnight").is_err());
    }

    #[test]
    fn test_use_database() {
        let mut session = test_session();
        assert_eq!(session.handle("use mydb"), Outcome::Continue);
        assert_eq!(session.database, "mydb");

        session.handle("use other;");
        assert_eq!(session.database, "other");

        // Malformed input leaves the database untouched.
        session.handle("use");
        assert_eq!(session.database, "other");
    }

    #[test]
    fn test_set_format_and_precision() {
        let mut session = test_session();
        session.handle("format csv");
        assert_eq!(session.format, Format::Csv);

        session.handle("format bogus");
        assert_eq!(session.format, Format::Csv);

        session.handle("precision ns");
        assert_eq!(session.precision, "ns");

        session.handle("precision rfc3339");
        assert_eq!(session.precision, "");
    }

    #[test]
    fn test_consistency_and_pretty() {
        let mut session = test_session();
        session.handle("consistency quorum");
        assert_eq!(session.consistency, ConsistencyLevel::Quorum);

        session.handle("consistency most");
        assert_eq!(session.consistency, ConsistencyLevel::Quorum);

        session.handle("pretty");
        assert!(session.pretty);
        session.handle("pretty");
        assert!(!session.pretty);
    }

    #[test]
    fn test_exit_outcomes() {
        let mut session = test_session();
        assert_eq!(session.handle("exit"), Outcome::Quit);
        assert_eq!(session.handle("QUIT"), Outcome::Quit);
        assert_eq!(session.handle("   "), Outcome::Continue);
    }

    #[test]
    fn test_insert_requires_keyword() {
        let mut session = test_session();
        // Not an INSERT statement: reported, no write attempted.
        assert!(session.insert("UPSERT cpu value=1"));
    }

    #[test]
    fn test_rest_after_keyword() {
        assert_eq!(rest_after_keyword("format csv"), "csv");
        assert_eq!(rest_after_keyword("  connect  other:9999 "), "other:9999");
        assert_eq!(rest_after_keyword("settings"), "");
    }
}
