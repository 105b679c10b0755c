//! HTTP client for a SeriesDB server.
//!
//! A thin collaborator around three endpoints: `GET /ping` for liveness and
//! server version, `GET /query` for statements, and `POST /write` for
//! line-protocol points. The client never retries and owns no timeout policy
//! beyond the transport defaults.

pub mod error;

use std::fmt;
use std::str::FromStr;

use reqwest::{RequestBuilder, StatusCode, Url};
use serde::Deserialize;

use seriesdb_core::Response;

use crate::error::{ClientError, Result};

/// Default server port when a connection string does not name one.
pub const DEFAULT_PORT: u16 = 8086;

/// Response header carrying the server version.
const VERSION_HEADER: &str = "X-Seriesdb-Version";

/// Write consistency level for a batch of points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConsistencyLevel {
    #[default]
    Any,
    One,
    Quorum,
    All,
}

impl FromStr for ConsistencyLevel {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "any" => Ok(ConsistencyLevel::Any),
            "one" => Ok(ConsistencyLevel::One),
            "quorum" => Ok(ConsistencyLevel::Quorum),
            "all" => Ok(ConsistencyLevel::All),
            other => Err(ClientError::UnknownConsistencyLevel(other.to_string())),
        }
    }
}

impl fmt::Display for ConsistencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsistencyLevel::Any => write!(f, "any"),
            ConsistencyLevel::One => write!(f, "one"),
            ConsistencyLevel::Quorum => write!(f, "quorum"),
            ConsistencyLevel::All => write!(f, "all"),
        }
    }
}

/// Parse a `host[:port]` connection string into a server URL.
///
/// A missing scheme is filled in from the ssl flag and a missing port with
/// [`DEFAULT_PORT`]; a full URL passes through untouched.
pub fn parse_connection_string(path: &str, ssl: bool) -> Result<Url> {
    let scheme = if ssl { "https" } else { "http" };
    let trimmed = path.trim();

    let addr = if trimmed.is_empty() {
        format!("{scheme}://localhost:{DEFAULT_PORT}")
    } else if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("{scheme}://{trimmed}")
    };

    let mut url =
        Url::parse(&addr).map_err(|e| ClientError::InvalidAddress(path.to_string(), e.to_string()))?;

    if url.port().is_none() {
        url.set_port(Some(DEFAULT_PORT)).map_err(|_| {
            ClientError::InvalidAddress(path.to_string(), "cannot set port".to_string())
        })?;
    }

    Ok(url)
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub url: Url,
    pub username: Option<String>,
    pub password: Option<String>,
    pub user_agent: String,
    /// Timestamp precision sent as the `epoch` query parameter; empty means
    /// rfc3339 text and the parameter is omitted.
    pub precision: String,
}

/// One statement to execute against an optional database.
#[derive(Debug, Clone, Default)]
pub struct Query {
    pub command: String,
    pub database: String,
}

/// A single point in raw line-protocol text.
#[derive(Debug, Clone)]
pub struct Point {
    pub raw: String,
}

/// A batch of points plus the write routing parameters.
#[derive(Debug, Clone)]
pub struct BatchPoints {
    pub points: Vec<Point>,
    pub database: String,
    pub retention_policy: String,
    pub precision: String,
    pub consistency: String,
}

impl BatchPoints {
    /// The newline-joined request body.
    pub fn body(&self) -> String {
        self.points
            .iter()
            .map(|p| p.raw.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Error document returned by the write endpoint on failure.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

pub struct Client {
    http: reqwest::Client,
    url: Url,
    username: Option<String>,
    password: Option<String>,
    precision: String,
}

impl Client {
    /// Create a new client
    pub fn new(config: Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| ClientError::CreateClient(e.to_string()))?;

        Ok(Client {
            http,
            url: config.url,
            username: config.username,
            password: config.password,
            precision: config.precision,
        })
    }

    /// The server address this client talks to.
    pub fn addr(&self) -> String {
        self.url.as_str().trim_end_matches('/').to_string()
    }

    pub fn set_auth(&mut self, username: &str, password: &str) {
        self.username = Some(username.to_string());
        self.password = Some(password.to_string());
    }

    /// Set the timestamp precision for queries; empty means rfc3339 text.
    pub fn set_precision(&mut self, precision: &str) {
        self.precision = precision.to_string();
    }

    /// Check the server is reachable and report its version.
    pub async fn ping(&self) -> Result<String> {
        let url = self.endpoint("ping")?;
        let response = self
            .with_auth(self.http.get(url))
            .send()
            .await
            .map_err(|e| ClientError::Ping(e.to_string()))?;

        let version = response
            .headers()
            .get(VERSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        Ok(version)
    }

    /// Execute a query statement and decode the response document.
    ///
    /// Statement errors are carried inside the document, so the body is
    /// decoded regardless of HTTP status; a body that is not a response
    /// document surfaces the status and a body excerpt instead.
    pub async fn query(&self, query: &Query) -> Result<Response> {
        let url = self.endpoint("query")?;

        let mut request = self.with_auth(self.http.get(url)).query(&[
            ("q", query.command.as_str()),
            ("db", query.database.as_str()),
        ]);
        if !self.precision.is_empty() {
            request = request.query(&[("epoch", self.precision.as_str())]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ClientError::Query(e.to_string()))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ClientError::Query(e.to_string()))?;

        serde_json::from_str::<Response>(&body)
            .map_err(|_| ClientError::UnexpectedResponse(status.as_u16(), excerpt(&body)))
    }

    /// Write a batch of line-protocol points.
    pub async fn write(&self, batch: &BatchPoints) -> Result<()> {
        let url = self.endpoint("write")?;

        let mut params: Vec<(&str, &str)> = Vec::new();
        for (name, value) in [
            ("db", batch.database.as_str()),
            ("rp", batch.retention_policy.as_str()),
            ("precision", batch.precision.as_str()),
            ("consistency", batch.consistency.as_str()),
        ] {
            if !value.is_empty() {
                params.push((name, value));
            }
        }

        let response = self
            .with_auth(self.http.post(url))
            .query(&params)
            .body(batch.body())
            .send()
            .await
            .map_err(|e| ClientError::Write(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(ClientError::Write(server_error_message(status, &body)))
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.url
            .join(path)
            .map_err(|e| ClientError::InvalidAddress(self.url.to_string(), e.to_string()))
    }

    fn with_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.username {
            Some(username) => request.basic_auth(username, self.password.as_deref()),
            None => request,
        }
    }
}

/// Prefer the server's json error message, fall back to the raw body.
fn server_error_message(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(doc) => doc.error,
        Err(_) if body.trim().is_empty() => format!("server returned status {status}"),
        Err(_) => excerpt(body),
    }
}

fn excerpt(body: &str) -> String {
    const LIMIT: usize = 256;
    let trimmed = body.trim();
    if trimmed.len() <= LIMIT {
        trimmed.to_string()
    } else {
        let mut end = LIMIT;
        while !trimmed.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &trimmed[..end])
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    fn test_parse_connection_string_defaults() {
        let url = parse_connection_string("", false).unwrap();
        assert_eq!(url.as_str(), "http://localhost:8086/");
    }

    #[test]
    fn test_parse_connection_string_host_only() {
        let url = parse_connection_string("db.example.com", false).unwrap();
        assert_eq!(url.scheme(), "http");
        assert_eq!(url.host_str(), Some("db.example.com"));
        assert_eq!(url.port(), Some(DEFAULT_PORT));
    }

    #[test]
    fn test_parse_connection_string_ssl() {
        let url = parse_connection_string("db.example.com:9999", true).unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.port(), Some(9999));
    }

    #[test]
    fn test_parse_connection_string_full_url_passthrough() {
        let url = parse_connection_string("https://db.example.com:8087", false).unwrap();
        assert_eq!(url.scheme(), "https");
        assert_eq!(url.port(), Some(8087));
    }

    #[test]
    fn test_parse_connection_string_invalid() {
        assert!(matches!(
            parse_connection_string("http://", false),
            Err(ClientError::InvalidAddress(_, _))
        ));
    }

    #[test]
    fn test_consistency_levels() {
        assert_eq!("any".parse::<ConsistencyLevel>().unwrap(), ConsistencyLevel::Any);
        assert_eq!("quorum".parse::<ConsistencyLevel>().unwrap(), ConsistencyLevel::Quorum);
        assert!(matches!(
            "most".parse::<ConsistencyLevel>(),
            Err(ClientError::UnknownConsistencyLevel(_))
        ));
        assert_eq!(ConsistencyLevel::All.to_string(), "all");
    }

    #[test]
    fn test_batch_body_joins_lines() {
        let batch = BatchPoints {
            points: vec![
                Point { raw: "cpu value=1".into() },
                Point { raw: "cpu value=2".into() },
            ],
            database: "mydb".into(),
            retention_policy: String::new(),
            precision: "n".into(),
            consistency: "any".into(),
        };
        assert_eq!(batch.body(), "cpu value=1\ncpu value=2");
    }

    #[test]
    fn test_server_error_message() {
        let status = StatusCode::BAD_REQUEST;
        assert_eq!(
            server_error_message(status, r#"{"error":"database not found"}"#),
            "database not found"
        );
        assert_eq!(server_error_message(status, "plain text"), "plain text");
        assert_eq!(
            server_error_message(status, ""),
            "server returned status 400 Bad Request"
        );
    }
}
