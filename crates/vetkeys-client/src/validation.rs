//! Client-side input validation.
//!
//! Runs before any backend call: a rejected input never reaches the network.

use chrono::{DateTime, NaiveDateTime};

use crate::error::VetKeyError;

/// Accepted local-style datetime layouts, interpreted as UTC
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"];

/// Validated input for creating a timelock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelockRequest {
    /// Trimmed, non-empty title
    pub title: String,
    /// Trimmed, non-empty plaintext
    pub content: String,
    /// Unix seconds, strictly in the future at validation time
    pub unlock_timestamp: u64,
}

impl TimelockRequest {
    /// Validate and normalise raw form input.
    ///
    /// # Errors
    ///
    /// - `Validation`: empty title or content (after trimming), or an unlock
    ///   time that is not after `now`
    pub fn new(
        title: &str,
        content: &str,
        unlock_timestamp: u64,
        now: u64,
    ) -> Result<Self, VetKeyError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(VetKeyError::validation("title", "title cannot be empty"));
        }

        let content = content.trim();
        if content.is_empty() {
            return Err(VetKeyError::validation("content", "content cannot be empty"));
        }

        if unlock_timestamp <= now {
            return Err(VetKeyError::validation(
                "unlock time",
                format!("unlock time {unlock_timestamp} must be after current time {now}"),
            ));
        }

        Ok(Self { title: title.to_string(), content: content.to_string(), unlock_timestamp })
    }
}

/// Parse an unlock datetime into Unix seconds.
///
/// Accepts RFC 3339 (`2030-01-01T12:00:00Z`, any offset) or the offset-less
/// `YYYY-MM-DDTHH:MM[:SS]` form, which is read as UTC.
///
/// # Errors
///
/// - `Validation`: empty, malformed, or before the Unix epoch
pub fn parse_unlock_datetime(text: &str) -> Result<u64, VetKeyError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(VetKeyError::validation("unlock time", "datetime cannot be empty"));
    }

    let timestamp = match DateTime::parse_from_rfc3339(text) {
        Ok(datetime) => datetime.timestamp(),
        Err(_) => DATETIME_FORMATS
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
            .map(|naive| naive.and_utc().timestamp())
            .ok_or_else(|| {
                VetKeyError::validation(
                    "unlock time",
                    format!("'{text}' is not RFC 3339 or YYYY-MM-DDTHH:MM"),
                )
            })?,
    };

    u64::try_from(timestamp).map_err(|_| {
        VetKeyError::validation("unlock time", format!("'{text}' is before the Unix epoch"))
    })
}
