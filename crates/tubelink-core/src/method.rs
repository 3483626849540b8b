//! Method channel codec
//!
//! Host calls arrive as `{method, arguments}` pairs with a JSON argument map.
//! Outbound notifications use the same shape.

use crate::{
    types::{InitializeOptions, LoadOptions, PlayerCommand, PlayerEvent},
    Error, Result,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Method invocation received from the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub arguments: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }

    /// Call without arguments
    pub fn bare(method: impl Into<String>) -> Self {
        Self::new(method, Value::Null)
    }

    /// Call whose arguments arrive as JSON text
    pub fn with_json_args(method: impl Into<String>, raw: &str) -> Result<Self> {
        let arguments: Value = serde_json::from_str(raw)?;
        Ok(Self::new(method, arguments))
    }
}

/// Notification delivered to the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostMessage {
    pub method: String,
    pub arguments: Value,
}

impl HostMessage {
    pub fn from_event(event: &PlayerEvent) -> Self {
        let (method, arguments) = match event {
            PlayerEvent::Ready => ("onReady", Value::Null),
            PlayerEvent::StateChanged { state } => {
                ("onStateChange", Value::String(state.as_str().to_string()))
            }
            PlayerEvent::Error { code } => {
                ("onError", Value::String(format!("Error code: {}", code)))
            }
            PlayerEvent::Progress { seconds } => ("onCurrentSecond", Value::from(*seconds)),
            PlayerEvent::Duration { seconds } => ("onVideoDuration", Value::from(*seconds)),
        };
        Self {
            method: method.to_string(),
            arguments,
        }
    }
}

/// Decode a host call into a command
pub fn decode_command(call: &MethodCall) -> Result<PlayerCommand> {
    let args = Args::new(&call.arguments)?;

    let command = match call.method.as_str() {
        "initialize" => PlayerCommand::Initialize(InitializeOptions {
            video_id: args.required_str("videoId")?,
            auto_play: args.bool_or("autoPlay", false)?,
            show_controls: args.bool_or("showControls", true)?,
            muted: args.bool_or("muted", false)?,
            start_at: args.seconds_or_zero("startAt")?,
        }),
        "loadVideo" => PlayerCommand::LoadVideo(LoadOptions {
            video_id: args.required_str("videoId")?,
            auto_play: args.bool_or("autoPlay", false)?,
            start_at: args.seconds_or_zero("startAt")?,
        }),
        "play" => PlayerCommand::Play,
        "pause" => PlayerCommand::Pause,
        "seekTo" => PlayerCommand::SeekTo {
            seconds: args.required_f64("seconds")?,
        },
        "setPlaybackRate" => PlayerCommand::SetPlaybackRate {
            rate: args.required_f64("rate")?,
        },
        "mute" => PlayerCommand::Mute,
        "unmute" => PlayerCommand::Unmute,
        "enterFullscreen" => PlayerCommand::EnterFullscreen,
        "exitFullscreen" => PlayerCommand::ExitFullscreen,
        "dispose" => PlayerCommand::Dispose,
        other => return Err(Error::MethodNotImplemented(other.to_string())),
    };

    command.validate()?;
    Ok(command.normalized())
}

/// Argument map accessor; `null` values count as absent
struct Args<'a> {
    map: Option<&'a Map<String, Value>>,
}

impl<'a> Args<'a> {
    fn new(arguments: &'a Value) -> Result<Self> {
        match arguments {
            Value::Null => Ok(Self { map: None }),
            Value::Object(map) => Ok(Self { map: Some(map) }),
            _ => Err(Error::invalid_arg("Arguments are not a map")),
        }
    }

    fn get(&self, key: &str) -> Option<&'a Value> {
        self.map.and_then(|m| m.get(key)).filter(|v| !v.is_null())
    }

    fn required_str(&self, key: &str) -> Result<String> {
        match self.get(key) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(Error::invalid_arg(format!("{} must be a string", key))),
            None => Err(Error::invalid_arg("VideoId cannot be null")),
        }
    }

    fn bool_or(&self, key: &str, default: bool) -> Result<bool> {
        match self.get(key) {
            Some(Value::Bool(b)) => Ok(*b),
            Some(_) => Err(Error::invalid_arg(format!("{} must be a bool", key))),
            None => Ok(default),
        }
    }

    fn required_f64(&self, key: &str) -> Result<f64> {
        self.get(key)
            .ok_or_else(|| Error::invalid_arg(format!("{} is required", key)))?
            .as_f64()
            .ok_or_else(|| Error::invalid_arg(format!("{} must be a number", key)))
    }

    fn seconds_or_zero(&self, key: &str) -> Result<u32> {
        let Some(value) = self.get(key) else {
            return Ok(0);
        };
        let malformed = || Error::invalid_arg(format!("{} must be a non-negative integer", key));

        if let Some(n) = value.as_u64() {
            return u32::try_from(n).map_err(|_| malformed());
        }
        match value.as_f64() {
            Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= u32::MAX as f64 => Ok(f as u32),
            _ => Err(malformed()),
        }
    }
}
