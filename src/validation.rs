//! Field-level checks shared by the entity validators.
//!
//! Each check returns `DatabaseError::Validation` naming the offending field.
//! They run before any statement touches the database.

use std::ops::RangeInclusive;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::db::DatabaseError;

/// Letters, then letters / spaces / hyphens / apostrophes (`Anna-Maria`, `O'Neil`).
static PERSON_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\p{L}[\p{L} '\-]*$").unwrap());

/// Free-form label such as a role name (`Head Nurse`, `IT support 2`).
static LABEL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\p{L}[\p{L}\p{N} _\-]*$").unwrap());

/// Lower snake-case identifier (`manage_schedule`).
static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9_]*$").unwrap());

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$").unwrap());

/// Optional `+`, then digits with single spaces or hyphens between groups.
static PHONE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\+?[0-9]+([ \-][0-9]+)*$").unwrap());

/// Door number with an optional wing letter (`7`, `104B`).
static ROOM_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[0-9]{1,4}[A-Z]?$").unwrap());

const PHONE_DIGITS: RangeInclusive<usize> = 9..=15;

fn invalid(field: &str, reason: impl Into<String>) -> DatabaseError {
    DatabaseError::validation(field, reason)
}

/// Non-blank, no surrounding whitespace, at most `max_chars` characters.
pub fn required(field: &str, value: &str, max_chars: usize) -> Result<(), DatabaseError> {
    if value.trim().is_empty() {
        return Err(invalid(field, "is required"));
    }
    if value.trim() != value {
        return Err(invalid(field, "must not start or end with whitespace"));
    }
    max_len(field, value, max_chars)
}

pub fn max_len(field: &str, value: &str, max_chars: usize) -> Result<(), DatabaseError> {
    let len = value.chars().count();
    if len > max_chars {
        return Err(invalid(field, format!("is {len} characters long, maximum is {max_chars}")));
    }
    Ok(())
}

/// `None` passes; `Some` must be non-blank and within `max_chars`.
pub fn optional(field: &str, value: Option<&str>, max_chars: usize) -> Result<(), DatabaseError> {
    value.map_or(Ok(()), |v| required(field, v, max_chars))
}

pub fn person_name(field: &str, value: &str) -> Result<(), DatabaseError> {
    required(field, value, 50)?;
    if !PERSON_NAME.is_match(value) {
        return Err(invalid(field, "may contain only letters, spaces, hyphens and apostrophes"));
    }
    Ok(())
}

pub fn label(field: &str, value: &str, max_chars: usize) -> Result<(), DatabaseError> {
    required(field, value, max_chars)?;
    if !LABEL.is_match(value) {
        return Err(invalid(field, "must start with a letter and contain only letters, digits, spaces, '_' or '-'"));
    }
    Ok(())
}

pub fn identifier(field: &str, value: &str, max_chars: usize) -> Result<(), DatabaseError> {
    required(field, value, max_chars)?;
    if !IDENTIFIER.is_match(value) {
        return Err(invalid(field, "must be lower snake_case, e.g. manage_schedule"));
    }
    Ok(())
}

pub fn email(field: &str, value: &str) -> Result<(), DatabaseError> {
    required(field, value, 254)?;
    if !EMAIL.is_match(value) {
        return Err(invalid(field, "is not a valid e-mail address"));
    }
    Ok(())
}

pub fn phone(field: &str, value: &str) -> Result<(), DatabaseError> {
    required(field, value, 20)?;
    if !PHONE.is_match(value) {
        return Err(invalid(field, "may contain only digits, an optional leading '+', spaces and hyphens"));
    }
    let digits = value.chars().filter(char::is_ascii_digit).count();
    if !PHONE_DIGITS.contains(&digits) {
        return Err(invalid(
            field,
            format!("must have {}-{} digits", PHONE_DIGITS.start(), PHONE_DIGITS.end()),
        ));
    }
    Ok(())
}

pub fn room_number(field: &str, value: &str) -> Result<(), DatabaseError> {
    required(field, value, 5)?;
    if !ROOM_NUMBER.is_match(value) {
        return Err(invalid(field, "must be 1-4 digits with an optional capital letter"));
    }
    Ok(())
}

pub fn in_range(field: &str, value: i64, range: RangeInclusive<i64>) -> Result<(), DatabaseError> {
    if !range.contains(&value) {
        return Err(invalid(
            field,
            format!("{value} is outside {}..={}", range.start(), range.end()),
        ));
    }
    Ok(())
}

/// Foreign keys and primary keys are positive.
pub fn positive_id(field: &str, id: i64) -> Result<(), DatabaseError> {
    if id <= 0 {
        return Err(invalid(field, format!("{id} is not a valid id")));
    }
    Ok(())
}

pub fn date_between(
    field: &str,
    date: NaiveDate,
    earliest: NaiveDate,
    latest: NaiveDate,
) -> Result<(), DatabaseError> {
    if date < earliest || date > latest {
        return Err(invalid(field, format!("{date} is outside {earliest}..={latest}")));
    }
    Ok(())
}
