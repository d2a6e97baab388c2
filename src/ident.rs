//! Identifier validation and quoting for SQL text assembly
//!
//! Table and column names end up interpolated into DDL/DML strings, so every
//! call site routes them through this module before they touch SQL text.

use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

/// Maximum identifier length accepted (MySQL caps identifiers at 64).
pub const MAX_IDENT_LEN: usize = 64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentError {
    #[error("identifier is empty")]
    Empty,

    #[error("identifier '{0}' is longer than {MAX_IDENT_LEN} characters")]
    TooLong(String),

    #[error("identifier '{0}' contains characters outside [A-Za-z0-9_]")]
    InvalidCharacters(String),
}

fn ident_regex() -> &'static Regex {
    static IDENT_RE: OnceLock<Regex> = OnceLock::new();
    IDENT_RE.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex is valid")
    })
}

/// Validate a table or column identifier against the allow-list.
pub fn validate(name: &str) -> Result<&str, IdentError> {
    if name.is_empty() {
        return Err(IdentError::Empty);
    }
    if name.len() > MAX_IDENT_LEN {
        return Err(IdentError::TooLong(name.to_string()));
    }
    if !ident_regex().is_match(name) {
        return Err(IdentError::InvalidCharacters(name.to_string()));
    }
    Ok(name)
}

/// Validate and render an identifier backtick-quoted for MySQL statements.
pub fn quoted(name: &str) -> Result<String, IdentError> {
    validate(name).map(|n| format!("`{n}`"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("users")]
    #[case("order_items")]
    #[case("_staging")]
    #[case("Table2")]
    fn accepts_plain_identifiers(#[case] name: &str) {
        assert_eq!(validate(name), Ok(name));
    }

    #[rstest]
    #[case("")]
    #[case("user name")]
    #[case("users;--")]
    #[case("users`")]
    #[case("1users")]
    #[case("naïve")]
    fn rejects_unsafe_identifiers(#[case] name: &str) {
        assert!(validate(name).is_err());
    }

    #[test]
    fn rejects_overlong_identifier() {
        let name = "a".repeat(MAX_IDENT_LEN + 1);
        assert!(matches!(validate(&name), Err(IdentError::TooLong(_))));
    }

    #[test]
    fn quoted_wraps_in_backticks() {
        assert_eq!(quoted("users").unwrap(), "`users`");
    }

    #[test]
    fn quoted_refuses_injection_shaped_input() {
        assert!(quoted("users` (id INT); DROP TABLE x; --").is_err());
    }
}
