//! Statement preparation.
//!
//! Two statement forms exist: `select` and
//! `insert <id> <username> <email>`. Anything else is unrecognized, and a
//! malformed insert is reported with the precedence the REPL promises:
//! syntax first, then field length, then id sign.
use super::statement::Statement;
use crate::errors::Error;
use crate::storage::row::{Row, EMAIL_SIZE, USERNAME_SIZE};
use once_cell::sync::Lazy;
use regex::Regex;

static INSERT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^insert\s+(\S+)\s+(\S+)\s+(\S+)$").expect("insert pattern is valid")
});

/// Turns an input line into a [`Statement`].
///
/// # Errors
/// - `Error::Syntax` — insert with missing/garbled fields or a non-numeric id.
/// - `Error::StringTooLong` — username over 32 or email over 255 bytes.
/// - `Error::NegativeId` — negative id.
/// - `Error::Unrecognized` — any other keyword.
pub fn prepare(input: &str) -> Result<Statement, Error> {
    let input = input.trim();

    if input == "select" {
        return Ok(Statement::Select);
    }
    if input.starts_with("insert") {
        return prepare_insert(input);
    }

    Err(Error::Unrecognized(input.to_string()))
}

fn prepare_insert(input: &str) -> Result<Statement, Error> {
    let captures = INSERT_REGEX
        .captures(input)
        .ok_or_else(|| err!(Syntax, "could not parse insert statement: '{}'", input))?;

    let id_str = &captures[1];
    let username = &captures[2];
    let email = &captures[3];

    if username.len() > USERNAME_SIZE || email.len() > EMAIL_SIZE {
        return Err(Error::StringTooLong);
    }

    let id: i64 = id_str
        .parse()
        .map_err(|_| err!(Syntax, "id is not a number: '{}'", id_str))?;
    if id < 0 {
        return Err(Error::NegativeId);
    }
    let id = u32::try_from(id).map_err(|_| err!(Syntax, "id out of range: '{}'", id_str))?;

    Ok(Statement::Insert(Row::new(id, username, email)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_select() {
        assert!(matches!(prepare("select"), Ok(Statement::Select)));
        assert!(matches!(prepare("  select  "), Ok(Statement::Select)));
    }

    #[test]
    fn test_prepare_insert() {
        let statement = prepare("insert 1 user1 person1@example.com").unwrap();
        match statement {
            Statement::Insert(row) => {
                assert_eq!(row.id, 1);
                assert_eq!(row.username(), "user1");
                assert_eq!(row.email(), "person1@example.com");
            }
            other => panic!("expected insert, got {:?}", other),
        }
    }

    #[test]
    fn test_insert_missing_fields_is_syntax_error() {
        assert!(matches!(prepare("insert"), Err(Error::Syntax(_))));
        assert!(matches!(prepare("insert 1 user1"), Err(Error::Syntax(_))));
    }

    #[test]
    fn test_insert_non_numeric_id_is_syntax_error() {
        assert!(matches!(
            prepare("insert foo bar baz"),
            Err(Error::Syntax(_))
        ));
    }

    #[test]
    fn test_insert_negative_id() {
        assert!(matches!(
            prepare("insert -1 user1 a@b"),
            Err(Error::NegativeId)
        ));
    }

    #[test]
    fn test_insert_long_strings() {
        let long_username = "a".repeat(USERNAME_SIZE + 1);
        assert!(matches!(
            prepare(&format!("insert 1 {} a@b", long_username)),
            Err(Error::StringTooLong)
        ));

        let long_email = "b".repeat(EMAIL_SIZE + 1);
        assert!(matches!(
            prepare(&format!("insert 1 user1 {}", long_email)),
            Err(Error::StringTooLong)
        ));
    }

    #[test]
    fn test_max_length_strings_are_accepted() {
        let username = "a".repeat(USERNAME_SIZE);
        let email = "b".repeat(EMAIL_SIZE);
        assert!(prepare(&format!("insert 1 {} {}", username, email)).is_ok());
    }

    #[test]
    fn test_unrecognized_statement() {
        assert!(matches!(
            prepare("update users set x = 1"),
            Err(Error::Unrecognized(_))
        ));
        assert!(matches!(prepare("select *"), Err(Error::Unrecognized(_))));
    }
}
