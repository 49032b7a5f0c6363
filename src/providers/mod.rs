pub mod brolexy;
pub mod shopify;

use serde_json::Value;

/// Interpret an error body: JSON when it parses, `Null` otherwise.
pub(crate) fn body_as_json(text: &str) -> Value {
    serde_json::from_str(text).unwrap_or(Value::Null)
}

pub(crate) fn truncate_for_log(mut s: String, max_len: usize) -> String {
    if s.len() > max_len {
        let mut cut = max_len;
        while !s.is_char_boundary(cut) {
            cut -= 1;
        }
        s.truncate(cut);
        s.push('…');
    }
    s
}
