//! `t=<timestamp>,v1=<hex>` header encoding.

use crate::{SigningError, SigningResult};

/// Parsed signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    /// All `v1` entries, in header order.
    pub signatures: Vec<String>,
}

impl SignatureHeader {
    /// Parse a header value. Unknown schemes are ignored.
    pub fn parse(header: &str) -> SigningResult<Self> {
        let mut timestamp = None;
        let mut signatures = Vec::new();

        for part in header.split(',') {
            let (key, value) = part
                .trim()
                .split_once('=')
                .ok_or_else(|| SigningError::MalformedHeader(format!("missing '=' in {part:?}")))?;

            match key {
                "t" => {
                    let parsed = value.parse::<i64>().map_err(|_| {
                        SigningError::MalformedHeader(format!("invalid timestamp {value:?}"))
                    })?;
                    timestamp = Some(parsed);
                }
                "v1" => signatures.push(value.to_string()),
                _ => {}
            }
        }

        let timestamp =
            timestamp.ok_or_else(|| SigningError::MalformedHeader("missing t=".to_string()))?;
        if signatures.is_empty() {
            return Err(SigningError::MalformedHeader("missing v1=".to_string()));
        }

        Ok(Self {
            timestamp,
            signatures,
        })
    }
}

/// Render the header value sent with forwarded requests.
pub fn format_header(timestamp: i64, signature: &str) -> String {
    format!("t={timestamp},v1={signature}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_then_parse() {
        let header = format_header(1_700_000_000, "abcd");
        assert_eq!(header, "t=1700000000,v1=abcd");

        let parsed = SignatureHeader::parse(&header).unwrap();
        assert_eq!(parsed.timestamp, 1_700_000_000);
        assert_eq!(parsed.signatures, vec!["abcd".to_string()]);
    }

    #[test]
    fn parse_tolerates_spaces_and_unknown_schemes() {
        let parsed = SignatureHeader::parse("t=5, v0=old, v1=new").unwrap();
        assert_eq!(parsed.timestamp, 5);
        assert_eq!(parsed.signatures, vec!["new".to_string()]);
    }

    #[test]
    fn parse_rejects_missing_parts() {
        assert!(matches!(
            SignatureHeader::parse("v1=abcd"),
            Err(SigningError::MalformedHeader(_))
        ));
        assert!(matches!(
            SignatureHeader::parse("t=10"),
            Err(SigningError::MalformedHeader(_))
        ));
        assert!(matches!(
            SignatureHeader::parse("t=soon,v1=abcd"),
            Err(SigningError::MalformedHeader(_))
        ));
        assert!(matches!(
            SignatureHeader::parse("garbage"),
            Err(SigningError::MalformedHeader(_))
        ));
    }
}
