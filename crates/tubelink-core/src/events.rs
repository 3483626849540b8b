//! Event decoder
//!
//! Turns raw payloads posted by the embedded page into [`PlayerEvent`]s.
//! Payloads look like `{"event": "onStateChange", "state": 1}`.

use crate::{
    types::{PlaybackState, PlayerEvent},
    Error, Result,
};
use serde_json::Value;

pub const EVENT_READY: &str = "onReady";
pub const EVENT_STATE_CHANGE: &str = "onStateChange";
pub const EVENT_ERROR: &str = "onError";
pub const EVENT_CURRENT_SECOND: &str = "onCurrentSecond";
pub const EVENT_VIDEO_DURATION: &str = "onVideoDuration";

/// Decode a parsed payload.
///
/// Returns `Ok(None)` for event names this bridge does not know, and
/// `Err(MalformedEvent)` when the payload is not a mapping, has no `event`
/// key, or lacks the fields its event requires.
pub fn decode(payload: &Value) -> Result<Option<PlayerEvent>> {
    let map = payload
        .as_object()
        .ok_or_else(|| Error::malformed("payload is not an object"))?;

    let name = map
        .get("event")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::malformed("missing event key"))?;

    let event = match name {
        EVENT_READY => PlayerEvent::Ready,
        EVENT_STATE_CHANGE => {
            let code = integer_field(payload, "state")?;
            PlayerEvent::StateChanged {
                state: PlaybackState::from_code(code),
            }
        }
        EVENT_ERROR => PlayerEvent::Error {
            code: integer_field(payload, "error")?,
        },
        EVENT_CURRENT_SECOND => PlayerEvent::Progress {
            seconds: number_field(payload, "second")?,
        },
        EVENT_VIDEO_DURATION => PlayerEvent::Duration {
            seconds: number_field(payload, "duration")?,
        },
        _ => return Ok(None),
    };

    Ok(Some(event))
}

/// Decode a payload delivered as JSON text
pub fn decode_str(raw: &str) -> Result<Option<PlayerEvent>> {
    let payload: Value =
        serde_json::from_str(raw).map_err(|e| Error::malformed(format!("invalid JSON: {}", e)))?;
    decode(&payload)
}

fn integer_field(payload: &Value, key: &str) -> Result<i64> {
    payload
        .get(key)
        .and_then(Value::as_i64)
        .ok_or_else(|| Error::malformed(format!("missing integer field '{}'", key)))
}

fn number_field(payload: &Value, key: &str) -> Result<f64> {
    payload
        .get(key)
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite())
        .ok_or_else(|| Error::malformed(format!("missing numeric field '{}'", key)))
}
