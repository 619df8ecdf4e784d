//! Webhook payload signing.
//!
//! Forwarded payloads carry an `X-Abacate-Signature: t=<unix-seconds>,v1=<hex>`
//! header, where the signature is HMAC-SHA256 over `"<t>.<raw body>"` keyed by
//! the signing secret. Receivers recompute it with [`verify_header`], which
//! compares in constant time.

mod error;
mod header;

pub use error::{SigningError, SigningResult};
pub use header::{format_header, SignatureHeader};

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use std::time::Duration;

/// Header name carrying the signature on forwarded requests.
pub const SIGNATURE_HEADER: &str = "X-Abacate-Signature";

/// Prefix of secrets generated for local runs.
pub const MOCK_SECRET_PREFIX: &str = "whsec_mock_";

type HmacSha256 = Hmac<Sha256>;

fn keyed_mac(secret: &str, timestamp: i64, payload: &[u8]) -> SigningResult<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| SigningError::InvalidKey(e.to_string()))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Sign `payload` at `timestamp`, returning the lowercase hex digest.
pub fn sign(secret: &str, timestamp: i64, payload: &[u8]) -> SigningResult<String> {
    let mac = keyed_mac(secret, timestamp, payload)?;
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check a hex signature against `payload` in constant time.
pub fn verify(secret: &str, timestamp: i64, payload: &[u8], signature_hex: &str) -> bool {
    let Ok(expected) = hex::decode(signature_hex.trim()) else {
        return false;
    };
    keyed_mac(secret, timestamp, payload)
        .is_ok_and(|mac| mac.verify_slice(&expected).is_ok())
}

/// Verify a full signature header against `payload`.
///
/// With a `tolerance`, the header timestamp must also lie within that
/// distance of `now` (unix seconds).
pub fn verify_header(
    secret: &str,
    header: &str,
    payload: &[u8],
    tolerance: Option<Duration>,
    now: i64,
) -> SigningResult<()> {
    let parsed = SignatureHeader::parse(header)?;

    if let Some(tolerance) = tolerance {
        let age = now.abs_diff(parsed.timestamp);
        if age > tolerance.as_secs() {
            return Err(SigningError::Expired {
                timestamp: parsed.timestamp,
                tolerance_secs: tolerance.as_secs(),
            });
        }
    }

    // Every candidate is checked so timing does not reveal which one matched.
    let matched = parsed
        .signatures
        .iter()
        .fold(false, |acc, sig| verify(secret, parsed.timestamp, payload, sig) | acc);

    if matched {
        Ok(())
    } else {
        Err(SigningError::Mismatch)
    }
}

/// Generate a throwaway secret for a single run.
pub fn generate_mock_secret() -> String {
    let mut bytes = [0u8; 12];
    rand::thread_rng().fill_bytes(&mut bytes);
    format!("{MOCK_SECRET_PREFIX}{}", hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";
    const TS: i64 = 1_700_000_000;

    #[test]
    fn sign_matches_reference_hmac() {
        let mut mac = HmacSha256::new_from_slice(SECRET.as_bytes()).unwrap();
        mac.update(b"1700000000.{\"a\":1}");
        let expected = hex::encode(mac.finalize().into_bytes());

        assert_eq!(sign(SECRET, TS, br#"{"a":1}"#).unwrap(), expected);
        assert_eq!(expected.len(), 64);
    }

    #[test]
    fn secrets_of_any_length_sign() {
        let long = "k".repeat(200);
        for secret in ["", "s", long.as_str()] {
            let signature = sign(secret, TS, b"{}").unwrap();
            assert!(verify(secret, TS, b"{}", &signature));
        }
    }

    #[test]
    fn sign_is_deterministic() {
        let payload = br#"{"event":"billing.paid"}"#;
        assert_eq!(sign(SECRET, TS, payload).unwrap(), sign(SECRET, TS, payload).unwrap());
    }

    #[test]
    fn any_input_change_changes_signature() {
        let base = sign(SECRET, TS, br#"{"a":1}"#).unwrap();
        assert_ne!(base, sign("whsec_other", TS, br#"{"a":1}"#).unwrap());
        assert_ne!(base, sign(SECRET, TS + 1, br#"{"a":1}"#).unwrap());
        assert_ne!(base, sign(SECRET, TS, br#"{"a":2}"#).unwrap());
    }

    #[test]
    fn verify_header_accepts_exact_match_only() {
        let header = format_header(TS, &sign(SECRET, TS, br#"{"a":1}"#).unwrap());

        assert_eq!(verify_header(SECRET, &header, br#"{"a":1}"#, None, TS), Ok(()));
        assert_eq!(
            verify_header(SECRET, &header, br#"{"a":2}"#, None, TS),
            Err(SigningError::Mismatch)
        );
        assert_eq!(
            verify_header("whsec_wrong", &header, br#"{"a":1}"#, None, TS),
            Err(SigningError::Mismatch)
        );
    }

    #[test]
    fn verify_rejects_non_hex_and_truncated_signatures() {
        let signature = sign(SECRET, TS, b"x").unwrap();
        assert!(verify(SECRET, TS, b"x", &signature));
        assert!(!verify(SECRET, TS, b"x", "zz"));
        assert!(!verify(SECRET, TS, b"x", &signature[..32]));
    }

    #[test]
    fn verify_header_enforces_tolerance() {
        let header = format_header(TS, &sign(SECRET, TS, b"{}").unwrap());
        let tolerance = Some(Duration::from_secs(300));

        assert!(verify_header(SECRET, &header, b"{}", tolerance, TS + 299).is_ok());
        assert_eq!(
            verify_header(SECRET, &header, b"{}", tolerance, TS + 301),
            Err(SigningError::Expired {
                timestamp: TS,
                tolerance_secs: 300
            })
        );
    }

    #[test]
    fn verify_header_accepts_any_listed_signature() {
        let good = sign(SECRET, TS, b"{}").unwrap();
        let header = format!("t={TS},v1={},v1={good}", "0".repeat(64));
        assert!(verify_header(SECRET, &header, b"{}", None, TS).is_ok());
    }

    #[test]
    fn mock_secret_is_prefixed_and_unique() {
        let a = generate_mock_secret();
        let b = generate_mock_secret();
        assert!(a.starts_with(MOCK_SECRET_PREFIX));
        assert_eq!(a.len(), MOCK_SECRET_PREFIX.len() + 24);
        assert_ne!(a, b);
    }
}
