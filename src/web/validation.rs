//! Binding and validation of JSON request bodies.
//!
//! All failures are client errors (400).

use crate::client_bail;
use crate::web::error::ResultExt;
use regex::Regex;
use serde::de::DeserializeOwned;
use std::fmt::Display;
use std::sync::LazyLock;

/// Implemented by request payloads which carry constraints beyond their shape.
pub trait Validate {
    fn validate(&self) -> anyhow::Result<()>;
}

/// Decodes a JSON body and validates it.
pub fn bind_json<T: DeserializeOwned + Validate>(body: &[u8]) -> anyhow::Result<T> {
    let value: T = serde_json::from_slice(body).mark_client_error()?;
    value.validate()?;

    Ok(value)
}

pub fn require_non_zero(field_name: &str, value: i64) -> anyhow::Result<i64> {
    if value == 0 {
        client_bail!("'{}' is required", field_name);
    }

    Ok(value)
}

pub fn require_non_empty<S: AsRef<str>>(field_name: &str, value: S) -> anyhow::Result<S> {
    if value.as_ref().trim().is_empty() {
        client_bail!("'{}' is required", field_name);
    }

    Ok(value)
}

pub fn validate_range<T: PartialOrd + Display>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> anyhow::Result<T> {
    if value < min || value > max {
        client_bail!("'{}' must be between {} and {}", field_name, min, max);
    }

    Ok(value)
}

static VALID_EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@.]+(\.[^\s@.]+)+$").expect("Invalid regex"));

pub fn is_valid_email(email: &str) -> bool {
    VALID_EMAIL_REGEX.is_match(email)
}

pub fn validate_email<S: AsRef<str>>(field_name: &str, email: S) -> anyhow::Result<S> {
    if !is_valid_email(email.as_ref()) {
        client_bail!("'{}' must be a valid email address", field_name);
    }

    Ok(email)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::error::ApiError;
    use serde::Deserialize;
    use warp::http::StatusCode;

    #[derive(Deserialize, Debug)]
    struct Probe {
        id: i64,
    }

    impl Validate for Probe {
        fn validate(&self) -> anyhow::Result<()> {
            require_non_zero("id", self.id)?;
            Ok(())
        }
    }

    #[test]
    fn accepts_common_email_shapes() {
        assert!(is_valid_email("john@example.com"));
        assert!(is_valid_email("user.name+tag@subdomain.example.com"));
        assert!(is_valid_email("test@domain.co.uk"));
    }

    #[test]
    fn rejects_malformed_emails() {
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@example.com"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("a@@example.com"));
    }

    #[test]
    fn range_is_inclusive() {
        assert!(validate_range("age", 0, 0, 130).is_ok());
        assert!(validate_range("age", 130, 0, 130).is_ok());
        assert!(validate_range("age", 131, 0, 130).is_err());
        assert!(validate_range("age", -1, 0, 130).is_err());
    }

    #[test]
    fn bind_json_reports_client_errors() {
        let err = bind_json::<Probe>(b"{").unwrap_err();
        assert_eq!(ApiError::from_error(&err).status, StatusCode::BAD_REQUEST);

        let err = bind_json::<Probe>(br#"{"id":0}"#).unwrap_err();
        let api_error = ApiError::from_error(&err);
        assert_eq!(api_error.status, StatusCode::BAD_REQUEST);
        assert_eq!(api_error.error, "'id' is required");

        assert_eq!(bind_json::<Probe>(br#"{"id":5}"#).unwrap().id, 5);
    }

    #[test]
    fn blank_strings_are_missing() {
        assert!(require_non_empty("name", "  ").is_err());
        assert!(require_non_empty("name", "Jo").is_ok());
    }
}
