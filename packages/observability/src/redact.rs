//! Field-name based redaction for credentials.

const SENSITIVE_KEYS: [&str; 8] = [
    "token",
    "access_token",
    "authorization",
    "password",
    "secret",
    "signing_secret",
    "api_key",
    "cookie",
];

pub(crate) const REDACTED: &str = "[REDACTED]";

/// Whether a field with this name must never be written verbatim.
pub fn is_sensitive_key(key: &str) -> bool {
    let key = key.to_ascii_lowercase();
    SENSITIVE_KEYS
        .iter()
        .any(|sensitive| key == *sensitive || key.ends_with(&format!("_{sensitive}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_exact_and_suffixed_keys() {
        assert!(is_sensitive_key("token"));
        assert!(is_sensitive_key("Authorization"));
        assert!(is_sensitive_key("bearer_token"));
        assert!(is_sensitive_key("webhook_secret"));
    }

    #[test]
    fn leaves_ordinary_keys_alone() {
        assert!(!is_sensitive_key("url"));
        assert!(!is_sensitive_key("status_code"));
        assert!(!is_sensitive_key("tokens_used"));
    }
}
