//! Tests for text-safety encoding

use resilient_rdbc::encoding::{safe_encode_bytes, safe_encode_params, safe_encode_query};
use resilient_rdbc::Value;

// ==================== Query Encoding Tests ====================

#[test]
fn test_clean_text_unchanged() {
    let queries = [
        "SELECT 1",
        "SELECT * FROM users WHERE name = 'O''Brien'",
        "INSERT INTO t VALUES ('héllo', '日本', '🦀')",
        "",
    ];
    for q in queries {
        assert_eq!(safe_encode_query(q), q);
    }
}

#[test]
fn test_nul_characters_removed() {
    assert_eq!(safe_encode_query("SELECT\u{0} 1"), "SELECT 1");
    assert_eq!(safe_encode_query("\u{0}"), "");
    assert_eq!(safe_encode_query("a\u{0}b\u{0}c"), "abc");
}

#[test]
fn test_query_encoding_idempotent() {
    let inputs = [
        "SELECT 1",
        "bad\u{0}query",
        "naïve café ☕",
        "\u{0}\u{0}\u{0}",
        "trailing\u{0}",
    ];
    for input in inputs {
        let once = safe_encode_query(input);
        assert_eq!(safe_encode_query(&once), once, "input {input:?}");
    }
}

// ==================== Byte Encoding Tests ====================

#[test]
fn test_valid_utf8_bytes() {
    assert_eq!(safe_encode_bytes("SELECT 'ü'".as_bytes()), "SELECT 'ü'");
}

#[test]
fn test_invalid_utf8_replaced_not_dropped() {
    // Overlong/stray bytes become U+FFFD so data corruption stays visible
    assert_eq!(safe_encode_bytes(&[0x41, 0xFF, 0x42]), "A\u{FFFD}B");
    assert_eq!(safe_encode_bytes(&[0xC3]), "\u{FFFD}");
}

#[test]
fn test_bytes_with_nul_and_invalid_sequences() {
    let mangled = [0x53, 0x00, 0xE2, 0x28, 0xA1, 0x54];
    let encoded = safe_encode_bytes(&mangled);

    assert!(!encoded.contains('\u{0}'));
    assert!(encoded.starts_with('S'));
    assert!(encoded.ends_with('T'));
}

#[test]
fn test_bytes_encoding_stable_on_own_output() {
    let inputs: &[&[u8]] = &[
        b"plain",
        &[0x00, 0xFF, 0x00, 0xFE],
        &[0xE2, 0x82],
        b"",
    ];
    for input in inputs {
        let once = safe_encode_bytes(input);
        assert_eq!(safe_encode_bytes(once.as_bytes()), once, "input {input:?}");
    }
}

// ==================== Parameter Encoding Tests ====================

#[test]
fn test_only_string_params_rewritten() {
    let params = vec![
        Value::Null,
        Value::Bool(false),
        Value::Int32(-1),
        Value::Int64(i64::MAX),
        Value::Float64(2.25),
        Value::String("with\u{0}nul".into()),
        Value::Bytes(vec![0x00, 0x01]),
    ];

    let encoded = safe_encode_params(&params);
    assert_eq!(encoded.len(), params.len());
    assert_eq!(encoded[5], Value::String("withnul".into()));

    // Everything else is bit-identical
    assert_eq!(encoded[0], params[0]);
    assert_eq!(encoded[1], params[1]);
    assert_eq!(encoded[2], params[2]);
    assert_eq!(encoded[3], params[3]);
    assert_eq!(encoded[4], params[4]);
    assert_eq!(encoded[6], params[6]);
}

#[test]
fn test_param_encoding_idempotent() {
    let params = vec![
        Value::String("a\u{0}b".into()),
        Value::String("clean".into()),
    ];
    let once = safe_encode_params(&params);
    let twice = safe_encode_params(&once);
    assert_eq!(once, twice);
}

#[test]
fn test_clean_params_equal_input() {
    let params = vec![Value::String("clean".into()), Value::Int64(9)];
    assert_eq!(safe_encode_params(&params), params);
}
