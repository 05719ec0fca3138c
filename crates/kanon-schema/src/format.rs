//! `format` checks for string values.

use std::net::{Ipv4Addr, Ipv6Addr};

/// Outcome of a format check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatCheck {
    /// The value matches the format.
    Valid,
    /// The value does not match the format.
    Invalid,
    /// The format is not known; the value is accepted.
    Unknown,
}

/// Checks `value` against a named string format.
#[must_use]
pub fn check(format: &str, value: &str) -> FormatCheck {
    let valid = match format {
        "uuid" => uuid::Uuid::parse_str(value).is_ok(),
        "date" => chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d").is_ok(),
        "date-time" => chrono::DateTime::parse_from_rfc3339(value).is_ok(),
        "email" => is_email(value),
        "ipv4" => value.parse::<Ipv4Addr>().is_ok(),
        "ipv6" => value.parse::<Ipv6Addr>().is_ok(),
        _ => return FormatCheck::Unknown,
    };
    if valid {
        FormatCheck::Valid
    } else {
        FormatCheck::Invalid
    }
}

fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.split('.').count() >= 2
        && domain.split('.').all(|label| !label.is_empty())
        && !value.chars().any(char::is_whitespace)
}
