//! Core types for Tubelink

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a bridge instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BridgeId(pub Uuid);

impl BridgeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for BridgeId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for BridgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Options carried by an `initialize` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeOptions {
    pub video_id: String,
    pub auto_play: bool,
    pub show_controls: bool,
    pub muted: bool,
    /// Start offset in whole seconds
    pub start_at: u32,
}

impl InitializeOptions {
    pub fn new(video_id: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            auto_play: false,
            show_controls: true,
            muted: false,
            start_at: 0,
        }
    }
}

/// Options carried by a `loadVideo` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadOptions {
    pub video_id: String,
    pub auto_play: bool,
    pub start_at: u32,
}

impl LoadOptions {
    pub fn new(video_id: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            auto_play: false,
            start_at: 0,
        }
    }
}

/// Command issued by the host against the embedded player
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCommand {
    Initialize(InitializeOptions),
    Play,
    Pause,
    SeekTo { seconds: f64 },
    SetPlaybackRate { rate: f64 },
    LoadVideo(LoadOptions),
    Mute,
    Unmute,
    EnterFullscreen,
    ExitFullscreen,
    Dispose,
}

impl PlayerCommand {
    /// Method-channel name of this command
    pub fn method_name(&self) -> &'static str {
        match self {
            PlayerCommand::Initialize(_) => "initialize",
            PlayerCommand::Play => "play",
            PlayerCommand::Pause => "pause",
            PlayerCommand::SeekTo { .. } => "seekTo",
            PlayerCommand::SetPlaybackRate { .. } => "setPlaybackRate",
            PlayerCommand::LoadVideo(_) => "loadVideo",
            PlayerCommand::Mute => "mute",
            PlayerCommand::Unmute => "unmute",
            PlayerCommand::EnterFullscreen => "enterFullscreen",
            PlayerCommand::ExitFullscreen => "exitFullscreen",
            PlayerCommand::Dispose => "dispose",
        }
    }

    /// Check argument invariants without touching any state
    pub fn validate(&self) -> Result<()> {
        match self {
            PlayerCommand::Initialize(opts) => validate_video_id(&opts.video_id),
            PlayerCommand::LoadVideo(opts) => validate_video_id(&opts.video_id),
            PlayerCommand::SeekTo { seconds } => {
                if !seconds.is_finite() || *seconds < 0.0 {
                    return Err(Error::invalid_arg(format!(
                        "seconds must be a non-negative number, got {}",
                        seconds
                    )));
                }
                Ok(())
            }
            PlayerCommand::SetPlaybackRate { rate } => {
                if !rate.is_finite() || *rate <= 0.0 {
                    return Err(Error::invalid_arg(format!(
                        "rate must be a positive number, got {}",
                        rate
                    )));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Return a copy with normalized arguments (trimmed video ids)
    pub fn normalized(self) -> Self {
        match self {
            PlayerCommand::Initialize(mut opts) => {
                opts.video_id = opts.video_id.trim().to_string();
                PlayerCommand::Initialize(opts)
            }
            PlayerCommand::LoadVideo(mut opts) => {
                opts.video_id = opts.video_id.trim().to_string();
                PlayerCommand::LoadVideo(opts)
            }
            other => other,
        }
    }
}

fn validate_video_id(video_id: &str) -> Result<()> {
    if video_id.trim().is_empty() {
        return Err(Error::invalid_arg("VideoId cannot be null or empty"));
    }
    Ok(())
}

/// Playback state reported by the embedded player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Unstarted,
    Ended,
    Playing,
    Paused,
    Buffering,
    Cued,
    Unknown,
}

impl PlaybackState {
    /// Map the embedded player's numeric state code
    pub fn from_code(code: i64) -> Self {
        match code {
            -1 => PlaybackState::Unstarted,
            0 => PlaybackState::Ended,
            1 => PlaybackState::Playing,
            2 => PlaybackState::Paused,
            3 => PlaybackState::Buffering,
            5 => PlaybackState::Cued,
            _ => PlaybackState::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackState::Unstarted => "unstarted",
            PlaybackState::Ended => "ended",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Buffering => "buffering",
            PlaybackState::Cued => "cued",
            PlaybackState::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event emitted by the embedded player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlayerEvent {
    /// Player finished loading and accepts instructions
    Ready,
    StateChanged { state: PlaybackState },
    /// Playback error code, carried verbatim
    Error { code: i64 },
    /// Current playback position
    Progress { seconds: f64 },
    /// Duration of the loaded video
    Duration { seconds: f64 },
}

/// Initialization request held until the player signals readiness
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingInit {
    pub video_id: String,
    pub auto_play: bool,
    pub start_at: u32,
    pub muted: bool,
}

impl From<&InitializeOptions> for PendingInit {
    fn from(opts: &InitializeOptions) -> Self {
        Self {
            video_id: opts.video_id.clone(),
            auto_play: opts.auto_play,
            start_at: opts.start_at,
            muted: opts.muted,
        }
    }
}

/// Readiness of a bridge as seen from outside
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    NotReady,
    Ready,
    Disposed,
}

impl std::fmt::Display for Readiness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Readiness::NotReady => write!(f, "not_ready"),
            Readiness::Ready => write!(f, "ready"),
            Readiness::Disposed => write!(f, "disposed"),
        }
    }
}

/// Snapshot of the controller state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeState {
    pub ready: bool,
    pub pending: Option<PendingInit>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_codes() {
        assert_eq!(PlaybackState::from_code(-1), PlaybackState::Unstarted);
        assert_eq!(PlaybackState::from_code(0), PlaybackState::Ended);
        assert_eq!(PlaybackState::from_code(3), PlaybackState::Buffering);
        assert_eq!(PlaybackState::from_code(5), PlaybackState::Cued);
        // 4 is not assigned by the player
        assert_eq!(PlaybackState::from_code(4), PlaybackState::Unknown);
        assert_eq!(PlaybackState::from_code(99), PlaybackState::Unknown);
    }

    #[test]
    fn test_validate_video_id() {
        let blank = PlayerCommand::Initialize(InitializeOptions::new("   "));
        assert!(matches!(blank.validate(), Err(Error::InvalidArgument(_))));

        let ok = PlayerCommand::LoadVideo(LoadOptions::new("dQw4w9WgXcQ"));
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_validate_numbers() {
        assert!(PlayerCommand::SeekTo { seconds: -1.0 }.validate().is_err());
        assert!(PlayerCommand::SeekTo { seconds: f64::NAN }.validate().is_err());
        assert!(PlayerCommand::SeekTo { seconds: 0.0 }.validate().is_ok());
        assert!(PlayerCommand::SetPlaybackRate { rate: 0.0 }.validate().is_err());
        assert!(PlayerCommand::SetPlaybackRate { rate: 1.25 }.validate().is_ok());
    }

    #[test]
    fn test_normalized_trims() {
        let cmd = PlayerCommand::Initialize(InitializeOptions::new("  abc \n")).normalized();
        match cmd {
            PlayerCommand::Initialize(opts) => assert_eq!(opts.video_id, "abc"),
            other => panic!("unexpected command {:?}", other),
        }
    }
}
