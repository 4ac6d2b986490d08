//! MD5 parameter signing.
//!
//! The gateway signs a flat parameter map: drop empty values and the
//! signature fields themselves, sort the remaining keys in byte order, join
//! as `key=value` pairs with `&`, append the shared secret, and MD5 the
//! result to lowercase hex. Both sides must produce the identical string
//! regardless of parameter insertion order.

use md5::{Digest, Md5};
use subtle::ConstantTimeEq;

/// Field carrying the signature itself. Never part of the signed string.
pub const SIGN_FIELD: &str = "sign";
/// Field naming the signature algorithm. Never part of the signed string.
pub const SIGN_TYPE_FIELD: &str = "sign_type";
/// The only algorithm the gateway speaks.
pub const SIGN_TYPE: &str = "MD5";

/// Build the canonical `key=value&...` string the signature covers.
///
/// Values are joined raw (no percent-encoding): the gateway signs the
/// decoded parameter values, not their URL representation.
pub fn canonicalize(params: &[(&str, &str)]) -> String {
    let mut pairs: Vec<(&str, &str)> = params
        .iter()
        .filter(|(k, v)| !v.is_empty() && *k != SIGN_FIELD && *k != SIGN_TYPE_FIELD)
        .copied()
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));

    pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// Sign a parameter map with the shared secret.
pub fn sign(params: &[(&str, &str)], secret: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(canonicalize(params).as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Verify a signature received from the gateway.
///
/// Comparison is constant-time; length is not secret (always 32 hex chars).
pub fn verify(params: &[(&str, &str)], secret: &str, provided: &str) -> bool {
    let expected = sign(params, secret);
    if expected.len() != provided.len() {
        return false;
    }
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key";

    #[test]
    fn canonical_string_sorts_keys() {
        let params = [
            ("type", "alipay"),
            ("money", "0.10"),
            ("pid", "1000"),
            ("out_trade_no", "20240307090542123"),
        ];
        assert_eq!(
            canonicalize(&params),
            "money=0.10&out_trade_no=20240307090542123&pid=1000&type=alipay"
        );
    }

    #[test]
    fn signature_is_stable_under_key_order() {
        let base = [
            ("pid", "1000"),
            ("money", "0.10"),
            ("name", "Pro (monthly)"),
            ("out_trade_no", "20240307090542123"),
            ("type", "alipay"),
        ];
        let expected = sign(&base, SECRET);

        // Every rotation and the full reversal must agree with the original.
        let mut rotated = base;
        for _ in 0..base.len() {
            rotated.rotate_left(1);
            assert_eq!(sign(&rotated, SECRET), expected);
        }
        let mut reversed = base;
        reversed.reverse();
        assert_eq!(sign(&reversed, SECRET), expected);
    }

    #[test]
    fn empty_values_are_excluded() {
        let with_empty = [("pid", "1000"), ("money", "0.10"), ("param", "")];
        let without = [("pid", "1000"), ("money", "0.10")];
        assert_eq!(sign(&with_empty, SECRET), sign(&without, SECRET));
    }

    #[test]
    fn signature_fields_are_excluded() {
        let with_sig = [
            ("pid", "1000"),
            ("money", "0.10"),
            ("sign", "deadbeef"),
            ("sign_type", "MD5"),
        ];
        let without = [("pid", "1000"), ("money", "0.10")];
        assert_eq!(sign(&with_sig, SECRET), sign(&without, SECRET));
    }

    #[test]
    fn verify_accepts_own_signature() {
        let params = [("pid", "1000"), ("money", "0.10")];
        let s = sign(&params, SECRET);
        assert!(verify(&params, SECRET, &s));
    }

    #[test]
    fn verify_rejects_tampered_params() {
        let params = [("pid", "1000"), ("money", "0.10")];
        let s = sign(&params, SECRET);

        let tampered = [("pid", "1000"), ("money", "9.99")];
        assert!(!verify(&tampered, SECRET, &s));
        assert!(!verify(&params, "other-secret", &s));
        assert!(!verify(&params, SECRET, "0000"));
    }
}
