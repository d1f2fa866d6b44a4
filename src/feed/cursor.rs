use std::fmt;

/// Opaque keyset cursor for the activity feed: `"{timestamp}::{id}"`.
///
/// The timestamp is carried as the row's stored text, verbatim, so a
/// returned cursor compares exactly against column values when fed back
/// in. Callers never inspect the parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    pub date_updated: String,
    pub id: String,
}

impl Cursor {
    /// Parses a cursor string. Returns `None` when the shape or the
    /// timestamp is malformed, so handlers can reject with a client error
    /// instead of silently returning page one.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let (date_updated, id) = s.split_once("::")?;
        if date_updated.is_empty() || id.is_empty() {
            return None;
        }
        if !is_valid_timestamp(date_updated) {
            return None;
        }
        Some(Self {
            date_updated: date_updated.to_string(),
            id: id.to_string(),
        })
    }

    #[must_use]
    pub fn encode(&self) -> String {
        format!("{}::{}", self.date_updated, self.id)
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.date_updated, self.id)
    }
}

fn is_valid_timestamp(s: &str) -> bool {
    chrono::DateTime::parse_from_rfc3339(s).is_ok()
        || chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").is_ok()
}
