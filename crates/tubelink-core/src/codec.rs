//! Command codec
//!
//! Maps a [`PlayerCommand`] onto the instructions understood by the embedded
//! IFrame player. Encoding is pure: nothing is sent from here.

use crate::{
    config::BridgeConfig,
    types::{PendingInit, PlayerCommand},
    Result,
};
use serde::{Deserialize, Serialize};

/// Name of the player object inside the embedded page
pub const PLAYER_OBJECT: &str = "player";

/// Low-level call issued to the embedded player
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DriverInstruction {
    /// Prepare a video without starting playback
    CueVideo {
        video_id: String,
        start_seconds: Option<u32>,
    },
    /// Prepare a video and start playback
    LoadVideo {
        video_id: String,
        start_seconds: Option<u32>,
    },
    Play,
    Pause,
    SeekTo { seconds: f64, allow_seek_ahead: bool },
    SetPlaybackRate { rate: f64 },
    Mute,
    Unmute,
    /// Accepted but has no effect in the embedded player
    Noop,
}

impl DriverInstruction {
    pub fn is_noop(&self) -> bool {
        matches!(self, DriverInstruction::Noop)
    }

    /// Render as a script call against the embedded player.
    ///
    /// `Noop` renders to an empty string.
    pub fn to_script(&self) -> String {
        match self {
            DriverInstruction::CueVideo { video_id, start_seconds } => {
                video_call("cueVideoById", video_id, *start_seconds)
            }
            DriverInstruction::LoadVideo { video_id, start_seconds } => {
                video_call("loadVideoById", video_id, *start_seconds)
            }
            DriverInstruction::Play => format!("{}.playVideo();", PLAYER_OBJECT),
            DriverInstruction::Pause => format!("{}.pauseVideo();", PLAYER_OBJECT),
            DriverInstruction::SeekTo { seconds, allow_seek_ahead } => {
                format!("{}.seekTo({}, {});", PLAYER_OBJECT, seconds, allow_seek_ahead)
            }
            DriverInstruction::SetPlaybackRate { rate } => {
                format!("{}.setPlaybackRate({});", PLAYER_OBJECT, rate)
            }
            DriverInstruction::Mute => format!("{}.mute();", PLAYER_OBJECT),
            DriverInstruction::Unmute => format!("{}.unMute();", PLAYER_OBJECT),
            DriverInstruction::Noop => String::new(),
        }
    }
}

fn video_call(function: &str, video_id: &str, start_seconds: Option<u32>) -> String {
    // serde_json escapes quotes and control characters in the id
    let id_literal = serde_json::Value::String(video_id.to_string()).to_string();
    match start_seconds {
        Some(start) => format!(
            "{}.{}({{videoId: {}, startSeconds: {}}});",
            PLAYER_OBJECT, function, id_literal, start
        ),
        None => format!("{}.{}({{videoId: {}}});", PLAYER_OBJECT, function, id_literal),
    }
}

/// Snap a requested rate to the nearest supported bucket
pub fn snap_rate(rate: f64) -> f64 {
    if rate <= 0.25 {
        0.25
    } else if rate <= 0.5 {
        0.5
    } else if (rate - 1.0).abs() < 0.1 {
        1.0
    } else if rate <= 1.5 {
        1.5
    } else {
        2.0
    }
}

/// Stateless command encoder
#[derive(Debug, Clone, Copy)]
pub struct CommandCodec {
    allow_seek_ahead: bool,
    snap_playback_rate: bool,
}

impl Default for CommandCodec {
    fn default() -> Self {
        Self::new(&BridgeConfig::default())
    }
}

impl CommandCodec {
    pub fn new(config: &BridgeConfig) -> Self {
        Self {
            allow_seek_ahead: config.allow_seek_ahead,
            snap_playback_rate: config.snap_playback_rate,
        }
    }

    /// Encode a command into the instructions that effect it.
    ///
    /// `Dispose` encodes to nothing; disposal is handled by the controller.
    pub fn encode(&self, command: &PlayerCommand) -> Result<Vec<DriverInstruction>> {
        command.validate()?;

        let instructions = match command {
            PlayerCommand::Initialize(opts) => {
                let mut out = vec![load_or_cue(opts.video_id.trim(), opts.auto_play, opts.start_at)];
                if opts.muted {
                    out.push(DriverInstruction::Mute);
                }
                out
            }
            PlayerCommand::LoadVideo(opts) => {
                vec![load_or_cue(opts.video_id.trim(), opts.auto_play, opts.start_at)]
            }
            PlayerCommand::Play => vec![DriverInstruction::Play],
            PlayerCommand::Pause => vec![DriverInstruction::Pause],
            PlayerCommand::SeekTo { seconds } => vec![DriverInstruction::SeekTo {
                seconds: *seconds,
                allow_seek_ahead: self.allow_seek_ahead,
            }],
            PlayerCommand::SetPlaybackRate { rate } => {
                let rate = if self.snap_playback_rate { snap_rate(*rate) } else { *rate };
                vec![DriverInstruction::SetPlaybackRate { rate }]
            }
            PlayerCommand::Mute => vec![DriverInstruction::Mute],
            PlayerCommand::Unmute => vec![DriverInstruction::Unmute],
            PlayerCommand::EnterFullscreen | PlayerCommand::ExitFullscreen => {
                vec![DriverInstruction::Noop]
            }
            PlayerCommand::Dispose => Vec::new(),
        };

        Ok(instructions)
    }

    /// Encode a buffered initialization replayed on readiness
    pub fn encode_pending(&self, pending: &PendingInit) -> Vec<DriverInstruction> {
        let mut out = vec![load_or_cue(&pending.video_id, pending.auto_play, pending.start_at)];
        if pending.muted {
            out.push(DriverInstruction::Mute);
        }
        out
    }
}

fn load_or_cue(video_id: &str, auto_play: bool, start_at: u32) -> DriverInstruction {
    let video_id = video_id.to_string();
    let start_seconds = (start_at > 0).then_some(start_at);
    if auto_play {
        DriverInstruction::LoadVideo { video_id, start_seconds }
    } else {
        DriverInstruction::CueVideo { video_id, start_seconds }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{InitializeOptions, LoadOptions};
    use crate::Error;

    #[test]
    fn test_cue_without_autoplay() {
        let codec = CommandCodec::default();
        let cmd = PlayerCommand::LoadVideo(LoadOptions::new("abc"));
        let out = codec.encode(&cmd).unwrap();
        assert_eq!(
            out,
            vec![DriverInstruction::CueVideo { video_id: "abc".into(), start_seconds: None }]
        );
        assert_eq!(out[0].to_script(), r#"player.cueVideoById({videoId: "abc"});"#);
    }

    #[test]
    fn test_load_with_start_and_mute() {
        let codec = CommandCodec::default();
        let mut opts = InitializeOptions::new("abc");
        opts.auto_play = true;
        opts.start_at = 30;
        opts.muted = true;

        let out = codec.encode(&PlayerCommand::Initialize(opts)).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(
            out[0].to_script(),
            r#"player.loadVideoById({videoId: "abc", startSeconds: 30});"#
        );
        assert_eq!(out[1], DriverInstruction::Mute);
    }

    #[test]
    fn test_video_id_is_escaped() {
        let instr = DriverInstruction::CueVideo {
            video_id: "a'b\"c".into(),
            start_seconds: None,
        };
        assert_eq!(instr.to_script(), r#"player.cueVideoById({videoId: "a'b\"c"});"#);
    }

    #[test]
    fn test_empty_video_id_rejected() {
        let codec = CommandCodec::default();
        let err = codec
            .encode(&PlayerCommand::Initialize(InitializeOptions::new("")))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn test_fullscreen_is_noop() {
        let codec = CommandCodec::default();
        let out = codec.encode(&PlayerCommand::EnterFullscreen).unwrap();
        assert_eq!(out, vec![DriverInstruction::Noop]);
        assert!(out[0].to_script().is_empty());
        assert!(codec.encode(&PlayerCommand::Dispose).unwrap().is_empty());
    }

    #[test]
    fn test_simple_scripts() {
        let codec = CommandCodec::default();
        let script = |cmd: PlayerCommand| codec.encode(&cmd).unwrap()[0].to_script();
        assert_eq!(script(PlayerCommand::Play), "player.playVideo();");
        assert_eq!(script(PlayerCommand::Pause), "player.pauseVideo();");
        assert_eq!(script(PlayerCommand::Unmute), "player.unMute();");
        assert_eq!(
            script(PlayerCommand::SeekTo { seconds: 12.5 }),
            "player.seekTo(12.5, true);"
        );
        assert_eq!(
            script(PlayerCommand::SetPlaybackRate { rate: 1.25 }),
            "player.setPlaybackRate(1.25);"
        );
    }

    #[test]
    fn test_rate_snapping() {
        assert_eq!(snap_rate(0.1), 0.25);
        assert_eq!(snap_rate(0.4), 0.5);
        assert_eq!(snap_rate(1.05), 1.0);
        assert_eq!(snap_rate(1.25), 1.5);
        assert_eq!(snap_rate(3.0), 2.0);

        let codec = CommandCodec::new(&BridgeConfig::native_rates());
        let out = codec.encode(&PlayerCommand::SetPlaybackRate { rate: 1.3 }).unwrap();
        assert_eq!(out, vec![DriverInstruction::SetPlaybackRate { rate: 1.5 }]);
    }
}
