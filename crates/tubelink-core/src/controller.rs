//! Bridge controller - readiness state machine
//!
//! Owns the readiness flag and the pending-init buffer, and decides for every
//! command and event whether it is sent, buffered, forwarded or dropped:
//! - `initialize` before readiness is buffered (last one wins)
//! - other commands before readiness are acknowledged and dropped
//! - readiness replays the buffered init exactly once
//! - after disposal everything is inert

use crate::{
    codec::{CommandCodec, DriverInstruction},
    config::BridgeConfig,
    events,
    method::{decode_command, HostMessage, MethodCall},
    pending::ReadinessBuffer,
    transport::{HostSink, InstructionSink},
    types::*,
    Error, Result,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Stateful mediator between one host view and one embedded player
pub struct BridgeController {
    /// Bridge identifier
    id: BridgeId,
    /// Configuration
    config: BridgeConfig,
    /// Command encoder
    codec: CommandCodec,
    /// Player has signaled readiness
    ready: bool,
    /// Bridge has been disposed
    disposed: bool,
    /// Pre-readiness initialize request
    buffer: ReadinessBuffer,
    /// Command-out channel, dropped on disposal
    instructions: Option<Arc<dyn InstructionSink>>,
    /// Host notification channel, dropped on disposal
    host: Option<Arc<dyn HostSink>>,
}

impl BridgeController {
    /// Create a controller in the not-ready state
    pub fn new(
        config: BridgeConfig,
        instructions: Arc<dyn InstructionSink>,
        host: Arc<dyn HostSink>,
    ) -> Self {
        Self::with_id(BridgeId::new(), config, instructions, host)
    }

    pub fn with_id(
        id: BridgeId,
        config: BridgeConfig,
        instructions: Arc<dyn InstructionSink>,
        host: Arc<dyn HostSink>,
    ) -> Self {
        Self {
            id,
            codec: CommandCodec::new(&config),
            config,
            ready: false,
            disposed: false,
            buffer: ReadinessBuffer::new(),
            instructions: Some(instructions),
            host: Some(host),
        }
    }

    pub fn id(&self) -> BridgeId {
        self.id
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn readiness(&self) -> Readiness {
        if self.disposed {
            Readiness::Disposed
        } else if self.ready {
            Readiness::Ready
        } else {
            Readiness::NotReady
        }
    }

    /// Buffered initialize request, if any
    pub fn pending(&self) -> Option<&PendingInit> {
        self.buffer.peek()
    }

    pub fn state(&self) -> BridgeState {
        BridgeState {
            ready: self.ready,
            pending: self.buffer.peek().cloned(),
        }
    }

    /// Decode and handle a host method call
    pub fn handle_call(&mut self, call: &MethodCall) -> Result<()> {
        let command = decode_command(call)?;
        self.handle_command(command)
    }

    /// Handle a host command.
    ///
    /// Argument errors are returned before any state is touched. Everything
    /// else is acknowledged with `Ok(())`.
    #[instrument(skip(self), fields(bridge_id = %self.id, method = command.method_name()))]
    pub fn handle_command(&mut self, command: PlayerCommand) -> Result<()> {
        command.validate()?;
        let command = command.normalized();

        if self.disposed {
            debug!("Bridge disposed, command ignored");
            return Ok(());
        }

        match &command {
            PlayerCommand::Dispose => {
                self.dispose();
                return Ok(());
            }
            PlayerCommand::Initialize(opts) if !self.ready => {
                info!(video_id = %opts.video_id, "Player not ready, buffering initialize");
                self.buffer.record(PendingInit::from(opts));
                return Ok(());
            }
            _ if !self.ready => {
                debug!("Player not ready, command dropped");
                return Ok(());
            }
            _ => {}
        }

        let instructions = self.codec.encode(&command)?;
        self.send_all(command.method_name(), instructions);
        Ok(())
    }

    /// Handle a raw payload posted by the embedded page
    pub fn handle_payload(&mut self, payload: &Value) {
        match events::decode(payload) {
            Ok(Some(event)) => self.handle_event(event),
            Ok(None) => debug!(bridge_id = %self.id, "Unknown player event ignored"),
            Err(e) => warn!(bridge_id = %self.id, error = %e, "Dropping malformed player event"),
        }
    }

    /// Handle a decoded player event
    #[instrument(skip(self), fields(bridge_id = %self.id))]
    pub fn handle_event(&mut self, event: PlayerEvent) {
        if self.disposed {
            debug!("Bridge disposed, event dropped");
            return;
        }

        match event {
            PlayerEvent::Ready => {
                if let Some(pending) = self.buffer.drain() {
                    info!(
                        video_id = %pending.video_id,
                        auto_play = pending.auto_play,
                        "Replaying buffered initialize"
                    );
                    let instructions = self.codec.encode_pending(&pending);
                    self.send_all("initialize", instructions);
                }
                if !self.ready {
                    info!(from = %Readiness::NotReady, to = %Readiness::Ready, "Player ready");
                }
                self.ready = true;
            }
            PlayerEvent::Progress { seconds } if !self.progress_due(seconds) => {
                return;
            }
            PlayerEvent::StateChanged { state } => {
                debug!(state = %state, "Player state changed");
            }
            PlayerEvent::Error { code } => {
                warn!(code, "Player reported error");
            }
            _ => {}
        }

        self.forward(&event);
    }

    /// Release transport resources and clear state. Idempotent.
    #[instrument(skip(self), fields(bridge_id = %self.id))]
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        if let Some(sink) = self.instructions.take() {
            sink.close();
        }
        self.host = None;
        self.buffer.clear();
        self.ready = false;
        self.disposed = true;
        info!("Bridge disposed");
    }

    fn progress_due(&self, seconds: f64) -> bool {
        let interval = i64::from(self.config.progress_interval_secs);
        interval == 0 || (seconds.floor() as i64) % interval == 0
    }

    fn send_all(&self, operation: &str, instructions: Vec<DriverInstruction>) {
        let Some(sink) = self.instructions.as_ref() else {
            return;
        };
        for instruction in instructions {
            if instruction.is_noop() {
                let unsupported = Error::UnsupportedOperation {
                    operation: operation.to_string(),
                };
                debug!(%unsupported, "Accepted as no-op");
                continue;
            }
            debug!(instruction = ?instruction, "Sending instruction");
            if let Err(e) = sink.send(instruction) {
                warn!(error = %e, "Failed to send instruction");
            }
        }
    }

    fn forward(&self, event: &PlayerEvent) {
        let Some(host) = self.host.as_ref() else {
            return;
        };
        if let Err(e) = host.deliver(HostMessage::from_event(event)) {
            warn!(error = %e, "Failed to deliver host message");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        instructions: Mutex<Vec<DriverInstruction>>,
        messages: Mutex<Vec<HostMessage>>,
    }

    impl InstructionSink for Recorder {
        fn send(&self, instruction: DriverInstruction) -> Result<()> {
            self.instructions.lock().unwrap().push(instruction);
            Ok(())
        }
    }

    impl HostSink for Recorder {
        fn deliver(&self, message: HostMessage) -> Result<()> {
            self.messages.lock().unwrap().push(message);
            Ok(())
        }
    }

    impl Recorder {
        fn sent(&self) -> Vec<DriverInstruction> {
            self.instructions.lock().unwrap().clone()
        }

        fn methods(&self) -> Vec<String> {
            self.messages
                .lock()
                .unwrap()
                .iter()
                .map(|m| m.method.clone())
                .collect()
        }
    }

    fn controller(config: BridgeConfig) -> (BridgeController, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let controller = BridgeController::new(config, recorder.clone(), recorder.clone());
        (controller, recorder)
    }

    fn init(video_id: &str, auto_play: bool, start_at: u32) -> PlayerCommand {
        PlayerCommand::Initialize(InitializeOptions {
            video_id: video_id.to_string(),
            auto_play,
            show_controls: true,
            muted: false,
            start_at,
        })
    }

    #[test]
    fn test_initial_state() {
        let (bridge, _) = controller(BridgeConfig::default());
        assert_eq!(bridge.state(), BridgeState::default());
        assert_eq!(bridge.readiness(), Readiness::NotReady);
    }

    #[test]
    fn test_only_last_initialize_survives() {
        let (mut bridge, rec) = controller(BridgeConfig::default());
        bridge.handle_command(init("first", false, 0)).unwrap();
        bridge.handle_command(init("second", false, 0)).unwrap();
        bridge.handle_command(init("third", true, 0)).unwrap();
        assert!(rec.sent().is_empty());

        bridge.handle_event(PlayerEvent::Ready);
        assert_eq!(
            rec.sent(),
            vec![DriverInstruction::LoadVideo { video_id: "third".into(), start_seconds: None }]
        );
    }

    #[test]
    fn test_ready_without_initialize_sends_nothing() {
        let (mut bridge, rec) = controller(BridgeConfig::default());
        bridge.handle_event(PlayerEvent::Ready);
        assert!(rec.sent().is_empty());
        assert!(bridge.is_ready());
        assert_eq!(rec.methods(), vec!["onReady"]);
    }

    #[test]
    fn test_replay_happens_once() {
        let (mut bridge, rec) = controller(BridgeConfig::default());
        bridge.handle_command(init("abc", true, 30)).unwrap();
        bridge.handle_event(PlayerEvent::Ready);
        bridge.handle_event(PlayerEvent::Ready);

        assert_eq!(
            rec.sent(),
            vec![DriverInstruction::LoadVideo { video_id: "abc".into(), start_seconds: Some(30) }]
        );
        assert_eq!(rec.methods(), vec!["onReady", "onReady"]);
    }

    #[test]
    fn test_pending_mute_replayed_after_load() {
        let (mut bridge, rec) = controller(BridgeConfig::default());
        let mut opts = InitializeOptions::new("abc");
        opts.muted = true;
        bridge.handle_command(PlayerCommand::Initialize(opts)).unwrap();
        bridge.handle_event(PlayerEvent::Ready);

        assert_eq!(
            rec.sent(),
            vec![
                DriverInstruction::CueVideo { video_id: "abc".into(), start_seconds: None },
                DriverInstruction::Mute,
            ]
        );
    }

    #[test]
    fn test_invalid_initialize_leaves_buffer() {
        let (mut bridge, rec) = controller(BridgeConfig::default());
        bridge.handle_command(init("keep", false, 0)).unwrap();

        let err = bridge.handle_command(init("", false, 0)).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ARGS");
        assert_eq!(bridge.pending().map(|p| p.video_id.as_str()), Some("keep"));
        assert!(rec.sent().is_empty());
    }

    #[test]
    fn test_commands_before_ready_are_dropped() {
        let (mut bridge, rec) = controller(BridgeConfig::default());
        bridge.handle_command(PlayerCommand::Play).unwrap();
        bridge.handle_command(PlayerCommand::SeekTo { seconds: 10.0 }).unwrap();
        bridge.handle_command(PlayerCommand::LoadVideo(LoadOptions::new("xyz"))).unwrap();
        bridge.handle_event(PlayerEvent::Ready);
        assert!(rec.sent().is_empty());
        assert!(bridge.pending().is_none());
    }

    #[test]
    fn test_commands_after_ready_send_one_instruction() {
        let (mut bridge, rec) = controller(BridgeConfig::default());
        bridge.handle_event(PlayerEvent::Ready);

        bridge.handle_command(PlayerCommand::Play).unwrap();
        assert_eq!(rec.sent().len(), 1);
        bridge.handle_command(PlayerCommand::SetPlaybackRate { rate: 1.5 }).unwrap();
        assert_eq!(rec.sent().len(), 2);
        bridge.handle_command(init("abc", false, 0)).unwrap();
        assert_eq!(rec.sent().len(), 3);
        assert!(bridge.pending().is_none());
    }

    #[test]
    fn test_fullscreen_never_reaches_transport() {
        let (mut bridge, rec) = controller(BridgeConfig::default());
        bridge.handle_event(PlayerEvent::Ready);
        bridge.handle_command(PlayerCommand::EnterFullscreen).unwrap();
        bridge.handle_command(PlayerCommand::ExitFullscreen).unwrap();
        assert!(rec.sent().is_empty());
    }

    #[test]
    fn test_payload_without_event_key() {
        let (mut bridge, rec) = controller(BridgeConfig::default());
        bridge.handle_payload(&json!({"state": 1}));
        bridge.handle_payload(&json!("garbage"));
        assert!(rec.methods().is_empty());
        assert!(!bridge.is_ready());
    }

    #[test]
    fn test_payload_ready_triggers_replay() {
        let (mut bridge, rec) = controller(BridgeConfig::default());
        bridge.handle_call(&MethodCall::new("initialize", json!({"videoId": "abc"}))).unwrap();
        bridge.handle_payload(&json!({"event": "onReady"}));
        bridge.handle_payload(&json!({"event": "onStateChange", "state": 5}));

        assert_eq!(rec.sent().len(), 1);
        assert_eq!(rec.methods(), vec!["onReady", "onStateChange"]);
    }

    #[test]
    fn test_dispose_makes_bridge_inert() {
        let (mut bridge, rec) = controller(BridgeConfig::default());
        bridge.handle_command(init("abc", false, 0)).unwrap();
        bridge.handle_command(PlayerCommand::Dispose).unwrap();
        assert!(bridge.is_disposed());
        assert_eq!(bridge.state(), BridgeState::default());

        bridge.handle_event(PlayerEvent::Ready);
        bridge.handle_command(PlayerCommand::Play).unwrap();
        bridge.handle_command(init("other", true, 0)).unwrap();

        assert!(rec.sent().is_empty());
        assert!(rec.methods().is_empty());
        assert_eq!(bridge.state(), BridgeState::default());
        assert_eq!(bridge.readiness(), Readiness::Disposed);
    }

    #[test]
    fn test_progress_throttling() {
        let (mut bridge, rec) = controller(BridgeConfig::default());
        for second in [0.2, 1.0, 4.9, 5.3, 7.0, 10.0] {
            bridge.handle_event(PlayerEvent::Progress { seconds: second });
        }
        assert_eq!(rec.methods().len(), 3);

        let (mut bridge, rec) = controller(BridgeConfig::verbose_progress());
        bridge.handle_event(PlayerEvent::Progress { seconds: 1.0 });
        bridge.handle_event(PlayerEvent::Progress { seconds: 2.0 });
        assert_eq!(rec.methods().len(), 2);
    }

    #[test]
    fn test_negative_progress_is_dropped() {
        let (mut bridge, rec) = controller(BridgeConfig::default());
        bridge.handle_event(PlayerEvent::Progress { seconds: -3.2 });
        bridge.handle_event(PlayerEvent::Progress { seconds: -0.5 });
        assert!(rec.methods().is_empty());

        bridge.handle_event(PlayerEvent::Progress { seconds: 15.0 });
        assert_eq!(rec.methods(), vec!["onCurrentSecond"]);
    }

    struct FailingSink;

    impl InstructionSink for FailingSink {
        fn send(&self, _instruction: DriverInstruction) -> Result<()> {
            Err(Error::Transport("driver gone".to_string()))
        }
    }

    #[test]
    fn test_send_failure_does_not_fail_command() {
        let recorder = Arc::new(Recorder::default());
        let mut bridge =
            BridgeController::new(BridgeConfig::default(), Arc::new(FailingSink), recorder.clone());
        bridge.handle_event(PlayerEvent::Ready);

        assert!(bridge.handle_command(PlayerCommand::Play).is_ok());
        assert!(bridge.handle_command(PlayerCommand::SeekTo { seconds: 4.0 }).is_ok());
        assert!(bridge.is_ready());
        assert_eq!(recorder.methods(), vec!["onReady"]);
    }

    #[test]
    fn test_invalid_arguments_after_dispose() {
        let (mut bridge, rec) = controller(BridgeConfig::default());
        bridge.dispose();

        let err = bridge
            .handle_call(&MethodCall::new("seekTo", json!({})))
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ARGS");

        let err = bridge.handle_command(init("  ", false, 0)).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_ARGS");
        assert!(rec.sent().is_empty());
        assert_eq!(bridge.readiness(), Readiness::Disposed);
    }

    #[test]
    fn test_duration_forwarded_in_either_state() {
        let (mut bridge, rec) = controller(BridgeConfig::default());
        bridge.handle_event(PlayerEvent::Duration { seconds: 212.0 });
        assert!(!bridge.is_ready());

        bridge.handle_event(PlayerEvent::Ready);
        bridge.handle_event(PlayerEvent::Duration { seconds: 212.0 });
        assert_eq!(
            rec.methods(),
            vec!["onVideoDuration", "onReady", "onVideoDuration"]
        );
        assert!(rec.sent().is_empty());
    }
}
