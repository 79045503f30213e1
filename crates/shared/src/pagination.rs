//! Cursor pagination for newest-first listings.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Default page size when the client does not ask for one.
pub const DEFAULT_PAGE_SIZE: i64 = 25;

/// Largest page size a client may request.
pub const MAX_PAGE_SIZE: i64 = 100;

/// Error type for cursor operations.
#[derive(Debug, Error)]
pub enum CursorError {
    #[error("Invalid cursor format")]
    InvalidFormat,
    #[error("Invalid cursor encoding")]
    InvalidEncoding,
    #[error("Invalid timestamp in cursor")]
    InvalidTimestamp,
    #[error("Invalid ID in cursor")]
    InvalidId,
}

/// Encodes a cursor as base64(`RFC3339 timestamp|uuid`).
///
/// The id breaks ties between rows sharing a timestamp.
pub fn encode_cursor(at: DateTime<Utc>, id: Uuid) -> String {
    let raw = format!(
        "{}|{}",
        at.to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
        id
    );
    URL_SAFE_NO_PAD.encode(raw.as_bytes())
}

/// Decodes a cursor produced by [`encode_cursor`].
pub fn decode_cursor(cursor: &str) -> Result<(DateTime<Utc>, Uuid), CursorError> {
    let decoded = URL_SAFE_NO_PAD
        .decode(cursor)
        .map_err(|_| CursorError::InvalidEncoding)?;
    let s = String::from_utf8(decoded).map_err(|_| CursorError::InvalidFormat)?;

    let (ts, id) = s.split_once('|').ok_or(CursorError::InvalidFormat)?;

    let id = Uuid::parse_str(id).map_err(|_| CursorError::InvalidId)?;
    let at = DateTime::parse_from_rfc3339(ts)
        .map_err(|_| CursorError::InvalidTimestamp)?
        .with_timezone(&Utc);

    Ok((at, id))
}

/// Clamps a requested page size into `1..=MAX_PAGE_SIZE`.
pub fn clamp_limit(requested: Option<i64>) -> i64 {
    requested.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
}
