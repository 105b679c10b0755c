//! Query response data model.
//!
//! A `Response` is built once per query by the HTTP client, consumed by the
//! formatter, and discarded. The serde shape matches the server's JSON
//! document, so the json output format is a straight serialization of these
//! structs.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single scalar cell in a result row.
///
/// Deserialized untagged, so JSON numbers without a fraction or exponent
/// become `Integer` and everything else falls through in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl fmt::Display for Scalar {
    /// Row-value rendering for the csv and column formats: nulls are empty,
    /// integers never show a decimal point, floats use the shortest
    /// round-trippable form. The json format does not use this path.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => Ok(()),
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Integer(i) => write!(f, "{i}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::Text(s) => write!(f, "{s}"),
        }
    }
}

/// One named, tagged table of rows sharing a column schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<Vec<Scalar>>,
}

/// The outcome of one statement within a query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub series: Vec<Series>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The full server response to one query execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<QueryResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    /// The overall error if present, otherwise the first per-result error.
    pub fn error(&self) -> Option<&str> {
        if let Some(err) = &self.error {
            return Some(err);
        }
        self.results.iter().find_map(|r| r.error.as_deref())
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    fn test_scalar_deserialize_kinds() {
        let row: Vec<Scalar> = serde_json::from_str(r#"[null, true, 3, 1.5, "x"]"#).unwrap();
        assert_eq!(
            row,
            vec![
                Scalar::Null,
                Scalar::Bool(true),
                Scalar::Integer(3),
                Scalar::Float(1.5),
                Scalar::Text("x".into()),
            ]
        );
    }

    #[test]
    fn test_scalar_display() {
        assert_eq!(Scalar::Null.to_string(), "");
        assert_eq!(Scalar::Bool(false).to_string(), "false");
        assert_eq!(Scalar::Integer(42).to_string(), "42");
        assert_eq!(Scalar::Float(1.0).to_string(), "1");
        assert_eq!(Scalar::Float(0.25).to_string(), "0.25");
        assert_eq!(Scalar::Text("cpu".into()).to_string(), "cpu");
    }

    #[test]
    fn test_response_error_precedence() {
        let mut response = Response {
            results: vec![
                QueryResult::default(),
                QueryResult {
                    error: Some("statement failed".into()),
                    ..Default::default()
                },
            ],
            error: None,
        };
        assert_eq!(response.error(), Some("statement failed"));

        response.error = Some("overall".into());
        assert_eq!(response.error(), Some("overall"));

        assert_eq!(Response::default().error(), None);
    }

    #[test]
    fn test_round_trip() {
        let json = r#"{"results":[{"series":[{"name":"cpu","tags":{"host":"a"},"columns":["time","value"],"values":[[0,1]]}]}]}"#;
        let response: Response = serde_json::from_str(json).unwrap();
        let out = serde_json::to_string(&response).unwrap();
        let again: Response = serde_json::from_str(&out).unwrap();
        assert_eq!(response, again);
    }
}
