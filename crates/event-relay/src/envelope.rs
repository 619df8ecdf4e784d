//! Event envelope parsing.

use crate::RelayResult;
use serde::Deserialize;

#[derive(Deserialize)]
struct WireEnvelope {
    #[serde(default)]
    event: String,
    #[serde(default)]
    data: Option<serde_json::Value>,
}

/// One event received from the stream.
///
/// Only `event` and `data.id` are read; the raw bytes are forwarded untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub event: String,
    pub id: Option<String>,
    raw: Vec<u8>,
}

impl Envelope {
    /// Parse a frame. Fails if the frame is not a JSON object.
    pub fn parse(raw: Vec<u8>) -> RelayResult<Self> {
        let wire: WireEnvelope = serde_json::from_slice(&raw)?;

        let id = wire
            .data
            .as_ref()
            .and_then(|data| data.get("id"))
            .and_then(|id| id.as_str())
            .map(str::to_owned);

        Ok(Self {
            event: wire.event,
            id,
            raw,
        })
    }

    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn size(&self) -> usize {
        self.raw.len()
    }

    /// Raw payload as text, lossy for non-UTF-8 frames.
    pub fn raw_text(&self) -> String {
        String::from_utf8_lossy(&self.raw).into_owned()
    }
}
