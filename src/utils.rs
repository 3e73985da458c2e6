//! Utility functions for the queue service

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Generate a new unique matchup ID
pub fn generate_matchup_id() -> Uuid {
    Uuid::new_v4()
}

/// Generate a correlation ID for outbound messages
pub fn generate_correlation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Join display labels with the given separator
pub fn join_labels<'a, I>(labels: I, separator: &str) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    labels.into_iter().collect::<Vec<_>>().join(separator)
}
