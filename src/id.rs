//! Entity id generation.
//!
//! Ids are lowercase ULIDs with an entity prefix, e.g. `board_01h9...`.
//! The ULID keeps ids time-sortable so directory listings of entity files
//! roughly follow creation order.

use ulid::Ulid;

/// Generate a fresh prefixed entity id.
pub fn new_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Ulid::new().to_string().to_lowercase())
}

/// True when `value` looks like an id for the given prefix.
pub fn has_prefix(value: &str, prefix: &str) -> bool {
    value
        .strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('_'))
        .map(|suffix| !suffix.is_empty())
        .unwrap_or(false)
}
