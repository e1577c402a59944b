//! User-visible message catalog.
//!
//! Texts live in an embedded JSON file and are resolved by dot-separated
//! key; `{placeholder}` substitution happens at the call site. Embedding
//! via `include_str!` means no file I/O at runtime.

use std::sync::OnceLock;

use serde_json::Value;

static TEXTS: OnceLock<Value> = OnceLock::new();

/// Load the embedded catalog. Safe to call more than once.
pub fn init() {
    let raw = include_str!("en.json");
    if let Ok(value) = serde_json::from_str(raw) {
        let _ = TEXTS.set(value);
    }
}

/// Get the text for a key, e.g. `"dispatch.denied"`.
///
/// Falls back to the key itself when missing, so a typo surfaces in the
/// chat instead of panicking the request.
pub fn get_text(key: &str) -> String {
    TEXTS
        .get()
        .and_then(|store| resolve_key(store, key))
        .unwrap_or_else(|| key.to_string())
}

fn resolve_key(value: &Value, key: &str) -> Option<String> {
    let mut current = value;
    for part in key.split('.') {
        current = current.get(part)?;
    }
    current.as_str().map(|s| s.to_string())
}
