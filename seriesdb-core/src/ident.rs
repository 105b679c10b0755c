//! Identifier parsing for INSERT statement prefixes.
//!
//! The shell recognizes `INSERT INTO <db>.<retention-policy> <line>` before
//! delegating the raw line to the write endpoint. Identifiers are either an
//! unquoted run of letters/digits/underscores or a double-quoted string with
//! backslash escaping.

fn is_whitespace(ch: char) -> bool {
    ch == ' ' || ch == '\t' || ch == '\n'
}

fn is_ident_first_char(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_'
}

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

/// Parse the next identifier out of `stmt`, returning it with the remaining
/// input.
///
/// Leading whitespace is skipped. If no identifier starts at the first
/// non-whitespace character the identifier is empty and the remainder is the
/// input with that whitespace consumed; this is not an error, callers check
/// for the empty string.
pub fn parse_next_identifier(stmt: &str) -> (String, &str) {
    let trimmed = stmt.trim_start_matches(is_whitespace);

    match trimmed.chars().next() {
        Some(ch) if is_ident_first_char(ch) => parse_unquoted_identifier(trimmed),
        Some('"') => parse_double_quoted_identifier(trimmed),
        _ => (String::new(), trimmed),
    }
}

fn parse_unquoted_identifier(stmt: &str) -> (String, &str) {
    let end = stmt.find(|ch| !is_ident_char(ch)).unwrap_or(stmt.len());
    (stmt[..end].to_string(), &stmt[end..])
}

/// `stmt` starts with the opening quote. A backslash escapes the following
/// character, quotes included; the backslash itself is dropped. An
/// unterminated quote consumes nothing: the remainder is the full input.
fn parse_double_quoted_identifier(stmt: &str) -> (String, &str) {
    let mut ident = String::new();
    let mut chars = stmt.char_indices().skip(1);

    while let Some((i, ch)) = chars.next() {
        match ch {
            '\\' => {
                if let Some((_, escaped)) = chars.next() {
                    ident.push(escaped);
                }
            }
            '"' => return (ident, &stmt[i + ch.len_utf8()..]),
            _ => ident.push(ch),
        }
    }

    (ident, stmt)
}

/// The database/retention-policy prefix extracted from the text after
/// `INSERT INTO`, plus the remaining line-protocol text.
#[derive(Debug, PartialEq)]
pub struct InsertTarget<'a> {
    pub database: Option<String>,
    pub retention_policy: Option<String>,
    pub line: &'a str,
}

/// Split `<ident>.<ident> <line>` or `<ident> <line>` after `INSERT INTO`.
///
/// A `.` directly after the first identifier marks it as the database name,
/// with the retention policy parsed after the dot. A space marks the single
/// identifier as the retention policy only. Anything else captures neither
/// and returns the remainder untouched, so a malformed prefix is forwarded
/// to the server verbatim.
pub fn parse_insert_target(stmt: &str) -> InsertTarget<'_> {
    let (mut ident, mut rest) = parse_next_identifier(stmt);
    let mut database = None;

    if let Some(after_dot) = rest.strip_prefix('.') {
        database = Some(ident);
        let (next, next_rest) = parse_next_identifier(after_dot);
        ident = next;
        rest = next_rest;
    }

    if let Some(line) = rest.strip_prefix(' ') {
        return InsertTarget {
            database,
            retention_policy: Some(ident),
            line,
        };
    }

    InsertTarget {
        database,
        retention_policy: None,
        line: rest,
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    #[test]
    fn test_parse_unquoted() {
        assert_eq!(parse_next_identifier("cpu_load,host=a"), ("cpu_load".into(), ",host=a"));
        assert_eq!(parse_next_identifier("_x9 rest"), ("_x9".into(), " rest"));
    }

    #[test]
    fn test_parse_skips_whitespace() {
        assert_eq!(parse_next_identifier(" \t\nmydb.rp"), ("mydb".into(), ".rp"));
    }

    #[test]
    fn test_parse_nothing_to_parse() {
        assert_eq!(parse_next_identifier(""), ("".into(), ""));
        assert_eq!(parse_next_identifier("123abc"), ("".into(), "123abc"));
        // Leading whitespace is consumed even when no identifier follows.
        assert_eq!(parse_next_identifier("  .rp"), ("".into(), ".rp"));
    }

    #[test]
    fn test_parse_double_quoted() {
        assert_eq!(parse_next_identifier("\"my db\".rp"), ("my db".into(), ".rp"));
        // Escaped quote inside the identifier; the leading space of the
        // remainder is preserved.
        assert_eq!(parse_next_identifier(" \"a\\\"b\" rest"), ("a\"b".into(), " rest"));
    }

    #[test]
    fn test_parse_unterminated_quote() {
        assert_eq!(parse_next_identifier("\"abc"), ("abc".into(), "\"abc"));
    }

    #[test]
    fn test_insert_target_database_and_policy() {
        let target = parse_insert_target("mydb.rp value");
        assert_eq!(target.database, Some("mydb".into()));
        assert_eq!(target.retention_policy, Some("rp".into()));
        assert_eq!(target.line, "value");
    }

    #[test]
    fn test_insert_target_policy_only() {
        let target = parse_insert_target("rp value");
        assert_eq!(target.database, None);
        assert_eq!(target.retention_policy, Some("rp".into()));
        assert_eq!(target.line, "value");
    }

    #[test]
    fn test_insert_target_quoted() {
        let target = parse_insert_target("\"my db\".\"my rp\" cpu value=1");
        assert_eq!(target.database, Some("my db".into()));
        assert_eq!(target.retention_policy, Some("my rp".into()));
        assert_eq!(target.line, "cpu value=1");
    }

    #[test]
    fn test_insert_target_no_prefix() {
        // No dot and no space after the identifier: nothing is captured and
        // the remainder is handed back as-is.
        let target = parse_insert_target("rp,host=a value");
        assert_eq!(target.database, None);
        assert_eq!(target.retention_policy, None);
        assert_eq!(target.line, ",host=a value");
    }
}
