//! Text-safety encoding for resilient-rdbc.
//!
//! Surrogate-damaged and NUL-bearing text coming out of uploaded files has
//! historically broken the networked wire protocol mid-statement. These
//! helpers normalize SQL text and parameters before they reach a backend:
//! - Lossy UTF-8 normalization at the byte-ingestion boundary
//! - NUL stripping (the one scalar both backends' text protocols reject)
//!
//! All functions are pure: no I/O, no logging, no shared state.

use crate::types::Value;

/// Normalize SQL text for safe transmission to a backend.
///
/// Strips NUL characters; everything else in a Rust `&str` is already valid
/// UTF-8 and passes through unchanged. Applying the function to its own
/// output returns the same string.
///
/// # Examples
///
/// ```
/// use resilient_rdbc::encoding::safe_encode_query;
///
/// assert_eq!(safe_encode_query("SELECT 1"), "SELECT 1");
/// assert_eq!(safe_encode_query("SELECT\0 1"), "SELECT 1");
///
/// let once = safe_encode_query("a\0b");
/// assert_eq!(safe_encode_query(&once), once);
/// ```
pub fn safe_encode_query(sql: &str) -> String {
    // Fast path: clean input (common case)
    if !sql.contains('\0') {
        return sql.to_string();
    }
    sql.chars().filter(|&c| c != '\0').collect()
}

/// Normalize raw bytes into safe SQL text.
///
/// The byte-ingestion boundary: invalid UTF-8 sequences become U+FFFD via
/// lossy decoding, then NULs are stripped. Round-tripping the output through
/// this function again yields the same string.
///
/// # Examples
///
/// ```
/// use resilient_rdbc::encoding::safe_encode_bytes;
///
/// assert_eq!(safe_encode_bytes(b"SELECT 1"), "SELECT 1");
/// assert_eq!(safe_encode_bytes(&[0x53, 0xFF, 0x51]), "S\u{FFFD}Q");
///
/// let once = safe_encode_bytes(&[0x61, 0x00, 0xC3]);
/// assert_eq!(safe_encode_bytes(once.as_bytes()), once);
/// ```
pub fn safe_encode_bytes(bytes: &[u8]) -> String {
    let text = String::from_utf8_lossy(bytes);
    safe_encode_query(&text)
}

/// Normalize query parameters for safe transmission.
///
/// Applies [`safe_encode_query`] to every `Value::String`; all other
/// variants pass through untouched. Parameter order is preserved.
///
/// # Examples
///
/// ```
/// use resilient_rdbc::encoding::safe_encode_params;
/// use resilient_rdbc::Value;
///
/// let params = vec![Value::Int32(7), Value::String("a\0b".into())];
/// let encoded = safe_encode_params(&params);
/// assert_eq!(encoded[0], Value::Int32(7));
/// assert_eq!(encoded[1], Value::String("ab".into()));
/// ```
pub fn safe_encode_params(params: &[Value]) -> Vec<Value> {
    params
        .iter()
        .map(|value| match value {
            Value::String(s) => Value::String(safe_encode_query(s)),
            other => other.clone(),
        })
        .collect()
}
