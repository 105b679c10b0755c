//! Response formatting.
//!
//! A `Response` renders to one of three output formats. The json format is a
//! straight serialization of the response document; csv and column share a
//! row-building algorithm and differ only in presentation.

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use serde::Serialize;

use crate::error::Result;
use crate::response::{QueryResult, Response};

/// Output format for query responses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Format {
    Json,
    Csv,
    #[default]
    Column,
}

impl FromStr for Format {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "json" => Ok(Format::Json),
            "csv" => Ok(Format::Csv),
            "column" => Ok(Format::Column),
            other => Err(format!(
                "Unknown format {other:?}. Please use json, csv, or column."
            )),
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Json => write!(f, "json"),
            Format::Csv => write!(f, "csv"),
            Format::Column => write!(f, "column"),
        }
    }
}

/// Serialize a response as a json document, indented with 4 spaces when
/// `pretty` is set.
pub fn to_json(response: &Response, pretty: bool) -> Result<String> {
    let data = if pretty {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        response.serialize(&mut ser)?;
        buf
    } else {
        serde_json::to_vec(response)?
    };

    // serde_json always emits valid UTF-8
    Ok(String::from_utf8(data).unwrap_or_default())
}

/// Write a formatted response to `w`.
///
/// A json serialization failure is reported as text on `w` and formatting
/// stops; the csv and column paths cannot fail beyond sink I/O.
pub fn write_response<W: Write>(
    response: &Response,
    format: Format,
    pretty: bool,
    w: &mut W,
) -> Result<()> {
    match format {
        Format::Json => match to_json(response, pretty) {
            Ok(data) => writeln!(w, "{data}")?,
            Err(e) => writeln!(w, "{e}")?,
        },
        Format::Csv => {
            let mut csvw = csv::Writer::from_writer(&mut *w);
            for result in &response.results {
                // Rows are built with an internal tab separator and re-split
                // here so standard csv quoting applies per field.
                for row in format_results(result, "\t", Format::Csv) {
                    csvw.write_record(row.split('\t'))?;
                }
                csvw.flush()?;
            }
        }
        Format::Column => {
            for result in &response.results {
                for row in format_results(result, "\t", Format::Column) {
                    writeln!(w, "{row}")?;
                }
            }
        }
    }
    Ok(())
}

/// Build the printable rows for one result.
///
/// Behaves differently for csv and column output: csv carries series identity
/// as `name`/`tags` pseudo-columns on every row, column renders it as
/// separate lines above the header.
pub fn format_results(result: &QueryResult, separator: &str, format: Format) -> Vec<String> {
    let mut rows: Vec<String> = Vec::new();

    for (i, series) in result.series.iter().enumerate() {
        // Gather tags as key=value, kept sorted on every append so the final
        // order is alphabetical over the composed strings.
        let mut tags: Vec<String> = Vec::new();
        for (k, v) in &series.tags {
            tags.push(format!("{k}={v}"));
            tags.sort();
        }

        let mut column_names: Vec<String> = Vec::new();

        // Only put name/tags in a column if format is csv
        if format == Format::Csv {
            if !tags.is_empty() {
                column_names.insert(0, "tags".to_string());
            }
            if !series.name.is_empty() {
                column_names.insert(0, "name".to_string());
            }
        }

        column_names.extend(series.columns.iter().cloned());

        // Line separator between series in column format
        if i > 0 && format == Format::Column {
            rows.push(String::new());
        }

        // Column format breaks name/tags out to their own lines. A name with
        // no tags gets its own underline; when tags exist the header row's
        // underline below serves instead.
        if format == Format::Column {
            if !series.name.is_empty() {
                let name_line = format!("name: {}", series.name);
                let underline = "-".repeat(name_line.len());
                rows.push(name_line);
                if tags.is_empty() {
                    rows.push(underline);
                }
            }
            if !tags.is_empty() {
                rows.push(format!("tags: {}", tags.join(", ")));
            }
        }

        rows.push(column_names.join(separator));

        if format == Format::Column && !tags.is_empty() {
            let dashes: Vec<String> = column_names
                .iter()
                .map(|name| "-".repeat(name.len()))
                .collect();
            rows.push(dashes.join(separator));
        }

        for value_row in &series.values {
            let mut values: Vec<String> = Vec::new();
            if format == Format::Csv {
                if !series.name.is_empty() {
                    values.push(series.name.clone());
                }
                if !tags.is_empty() {
                    values.push(tags.join(","));
                }
            }
            values.extend(value_row.iter().map(ToString::to_string));
            rows.push(values.join(separator));
        }

        // Trailing separator line in column format
        if format == Format::Column {
            rows.push(String::new());
        }
    }

    rows
}
