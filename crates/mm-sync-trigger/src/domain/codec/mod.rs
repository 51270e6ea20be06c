//! # Protocol Codec
//!
//! JSON-over-UDP wire format, protocol version 1:
//!
//! ```text
//! {"v":1,"type":"trigger","delay":<seconds>,"rpc":<json>}   relative trigger
//! {"v":1,"type":"trigger","t":<epoch seconds>,"rpc":<json>} absolute trigger
//! {"v":1,"type":"ping"}
//! {"v":1,"type":"pong","time":<epoch seconds>}
//! ```
//!
//! Validation runs in a fixed order: size ceiling, UTF-8, JSON object syntax,
//! version, kind, then the trigger fields. Fields are kept as raw JSON until
//! their turn so that a badly typed `delay` is reported after a bad version,
//! and so the `rpc` payload is carried through byte-for-byte.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use thiserror::Error;

use super::errors::ProtocolError;
use super::message::{IncomingMessage, Pong, RelayPayload, Trigger, TriggerTime, PROTOCOL_VERSION};
use super::time::WallTime;

/// Default datagram ceiling in bytes.
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 2048;

/// Longest raw field echoed back in error values (and thus in logs).
const MAX_ECHO_LEN: usize = 32;

/// Decoder bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CodecLimits {
    /// Datagrams above this size are rejected before decoding.
    pub max_message_bytes: usize,
    /// Largest accepted relative delay, in seconds.
    pub max_delay_secs: f64,
}

impl Default for CodecLimits {
    fn default() -> Self {
        Self {
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
            max_delay_secs: 10.0,
        }
    }
}

/// Errors building outbound messages.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("relay payload is not valid JSON: {0}")]
    InvalidPayload(String),

    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Inbound message with every field still in raw JSON form.
#[derive(Deserialize)]
struct Envelope<'a> {
    #[serde(default, borrow)]
    v: Option<&'a RawValue>,
    #[serde(default, borrow, rename = "type")]
    kind: Option<&'a RawValue>,
    #[serde(default, borrow)]
    delay: Option<&'a RawValue>,
    #[serde(default, borrow)]
    t: Option<&'a RawValue>,
    #[serde(default, borrow)]
    rpc: Option<&'a RawValue>,
    #[serde(default, borrow)]
    time: Option<&'a RawValue>,
}

#[derive(Serialize)]
struct PingWire {
    v: u32,
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct PongWire {
    v: u32,
    #[serde(rename = "type")]
    kind: &'static str,
    time: f64,
}

#[derive(Serialize)]
struct TriggerWire<'a> {
    v: u32,
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    delay: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    t: Option<f64>,
    rpc: &'a RawValue,
}

/// Stateless decoder/encoder for the trigger protocol.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessageCodec {
    limits: CodecLimits,
}

impl MessageCodec {
    #[must_use]
    pub fn new(limits: CodecLimits) -> Self {
        Self { limits }
    }

    #[must_use]
    pub fn limits(&self) -> CodecLimits {
        self.limits
    }

    /// Decode and validate one inbound datagram.
    ///
    /// # Errors
    ///
    /// Returns the first [`ProtocolError`] hit in validation order.
    pub fn decode(&self, data: &[u8]) -> Result<IncomingMessage, ProtocolError> {
        let envelope = self.parse_envelope(data)?;

        check_version(envelope.v)?;

        match parse_kind(envelope.kind)?.as_str() {
            "trigger" => self.decode_trigger(&envelope).map(IncomingMessage::Trigger),
            "ping" => Ok(IncomingMessage::Ping),
            other => Err(ProtocolError::UnknownKind {
                found: Some(truncate(other)),
            }),
        }
    }

    /// Decode a pong reply (sender side).
    ///
    /// # Errors
    ///
    /// Same validation order as [`MessageCodec::decode`]; a missing or
    /// non-numeric `time` is reported as [`ProtocolError::InvalidTime`].
    pub fn decode_pong(&self, data: &[u8]) -> Result<Pong, ProtocolError> {
        let envelope = self.parse_envelope(data)?;

        check_version(envelope.v)?;

        let kind = parse_kind(envelope.kind)?;
        if kind != "pong" {
            return Err(ProtocolError::UnknownKind {
                found: Some(truncate(&kind)),
            });
        }

        let time = envelope
            .time
            .ok_or(ProtocolError::InvalidTime { field: "time" })
            .and_then(|raw| parse_seconds(raw, "time"))?;

        Ok(Pong {
            version: PROTOCOL_VERSION,
            time: WallTime::from_secs_f64(time),
        })
    }

    /// Serialize a pong reply.
    #[must_use]
    pub fn encode_pong(&self, pong: &Pong) -> Vec<u8> {
        encode_infallible(&PongWire {
            v: pong.version,
            kind: "pong",
            time: pong.time.as_secs_f64(),
        })
    }

    /// Serialize a ping request.
    #[must_use]
    pub fn encode_ping(&self) -> Vec<u8> {
        encode_infallible(&PingWire {
            v: PROTOCOL_VERSION,
            kind: "ping",
        })
    }

    /// Serialize a trigger request, embedding the payload verbatim.
    ///
    /// # Errors
    ///
    /// [`EncodeError::InvalidPayload`] if the payload is not a JSON document.
    pub fn encode_trigger(&self, trigger: &Trigger) -> Result<Vec<u8>, EncodeError> {
        let text = std::str::from_utf8(trigger.payload.as_bytes())
            .map_err(|e| EncodeError::InvalidPayload(e.to_string()))?;
        let rpc: &RawValue = serde_json::from_str(text)
            .map_err(|e: serde_json::Error| EncodeError::InvalidPayload(e.to_string()))?;

        let (delay, t) = match trigger.time {
            TriggerTime::Relative(delay) => (Some(delay), None),
            TriggerTime::Absolute(at) => (None, Some(at.as_secs_f64())),
        };

        Ok(serde_json::to_vec(&TriggerWire {
            v: PROTOCOL_VERSION,
            kind: "trigger",
            delay,
            t,
            rpc,
        })?)
    }

    fn parse_envelope<'a>(&self, data: &'a [u8]) -> Result<Envelope<'a>, ProtocolError> {
        if data.len() > self.limits.max_message_bytes {
            return Err(ProtocolError::Oversized {
                size: data.len(),
                max: self.limits.max_message_bytes,
            });
        }

        let text = std::str::from_utf8(data)
            .map_err(|e| ProtocolError::MalformedMessage(format!("invalid UTF-8: {e}")))?;

        // serde accepts a JSON array for a struct; the protocol only has objects.
        if !text.trim_start().starts_with('{') {
            return Err(ProtocolError::MalformedMessage(
                "expected a JSON object".into(),
            ));
        }

        serde_json::from_str(text).map_err(|e| ProtocolError::MalformedMessage(e.to_string()))
    }

    fn decode_trigger(&self, envelope: &Envelope<'_>) -> Result<Trigger, ProtocolError> {
        let rpc = envelope.rpc.ok_or(ProtocolError::MissingPayload)?;

        let time = match (envelope.delay, envelope.t) {
            (Some(raw), None) => {
                let delay = parse_seconds(raw, "delay")?;
                if delay < 0.0 || delay > self.limits.max_delay_secs {
                    return Err(ProtocolError::DelayOutOfRange {
                        delay,
                        max: self.limits.max_delay_secs,
                    });
                }
                TriggerTime::Relative(delay)
            }
            (None, Some(raw)) => {
                TriggerTime::Absolute(WallTime::from_secs_f64(parse_seconds(raw, "t")?))
            }
            _ => return Err(ProtocolError::MissingOrAmbiguousTime),
        };

        Ok(Trigger {
            time,
            payload: RelayPayload::new(Bytes::copy_from_slice(rpc.get().as_bytes())),
        })
    }
}

fn check_version(raw: Option<&RawValue>) -> Result<(), ProtocolError> {
    let raw = raw.ok_or(ProtocolError::UnsupportedVersion { found: None })?;

    let supported = serde_json::from_str::<serde_json::Number>(raw.get())
        .ok()
        .and_then(|n| n.as_f64())
        .is_some_and(|v| v == f64::from(PROTOCOL_VERSION));

    if supported {
        Ok(())
    } else {
        Err(ProtocolError::UnsupportedVersion {
            found: Some(truncate(raw.get())),
        })
    }
}

fn parse_kind(raw: Option<&RawValue>) -> Result<String, ProtocolError> {
    let raw = raw.ok_or(ProtocolError::UnknownKind { found: None })?;
    serde_json::from_str::<String>(raw.get()).map_err(|_| ProtocolError::UnknownKind {
        found: Some(truncate(raw.get())),
    })
}

fn parse_seconds(raw: &RawValue, field: &'static str) -> Result<f64, ProtocolError> {
    serde_json::from_str::<f64>(raw.get())
        .ok()
        .filter(|secs| secs.is_finite())
        .ok_or(ProtocolError::InvalidTime { field })
}

/// Plain structs of integers, strings and floats cannot fail to serialize;
/// a non-finite float is written as `null`.
fn encode_infallible<T: Serialize>(wire: &T) -> Vec<u8> {
    serde_json::to_value(wire)
        .map(|value| value.to_string().into_bytes())
        .unwrap_or_default()
}

fn truncate(raw: &str) -> String {
    raw.chars().take(MAX_ECHO_LEN).collect()
}

#[cfg(test)]
mod tests;
