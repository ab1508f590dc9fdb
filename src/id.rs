//! ID generation utilities for toolgate
//!
//! Provides functions for generating identifiers for tools and execution requests.

use rand::Rng;

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}

/// Generate a tool ID for registrations that did not supply one
///
/// Format: `tool-{timestamp_ms}-{random_hex}`
/// Example: `tool-1738300800123-a1b2c3d4`
pub fn generate_tool_id() -> String {
    let timestamp = now_ms();
    let random: u32 = rand::rng().random();
    format!("tool-{}-{:08x}", timestamp, random)
}

/// Derive a stable tool ID from a display name
///
/// Lowercases and collapses every run of non-alphanumeric characters into `_`.
/// Returns `None` when nothing usable remains.
pub fn slugify(name: &str) -> Option<String> {
    let mut slug = String::with_capacity(name.len());
    let mut pending_sep = false;
    for c in name.chars().flat_map(char::to_lowercase) {
        if c.is_alphanumeric() {
            if pending_sep && !slug.is_empty() {
                slug.push('_');
            }
            pending_sep = false;
            slug.push(c);
        } else {
            pending_sep = true;
        }
    }
    if slug.is_empty() { None } else { Some(slug) }
}

/// Generate a request ID for an execution
///
/// Format: `exec-{tool_id}-{random_hex}`
pub fn generate_execution_id(tool_id: &str) -> String {
    let random: u16 = rand::rng().random();
    format!("exec-{}-{:04x}", tool_id, random)
}
