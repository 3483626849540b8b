//! Bridge session - async runtime for one embedded player
//!
//! Runs:
//! - an actor task that owns the [`BridgeController`] and drains a single
//!   inbox, so commands and events are applied strictly in arrival order
//! - a pump task that feeds encoded instructions to the [`ScriptDriver`]
//!   without blocking the actor

use crate::{
    codec::DriverInstruction,
    config::BridgeConfig,
    controller::BridgeController,
    method::{HostMessage, MethodCall},
    transport::{ChannelHostSink, ChannelSink, HostSink, ScriptDriver},
    types::*,
    Error, Result,
};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// Message processed by the session actor
enum Envelope {
    Call {
        call: MethodCall,
        reply: oneshot::Sender<Result<()>>,
    },
    Command {
        command: PlayerCommand,
        reply: oneshot::Sender<Result<()>>,
    },
    Payload(Value),
    Event(PlayerEvent),
    Flush(oneshot::Sender<BridgeState>),
}

/// Handle to a running bridge
pub struct BridgeSession {
    /// Bridge identifier
    id: BridgeId,
    /// Single inbox for commands and events
    inbox: mpsc::Sender<Envelope>,
    /// Readiness broadcaster
    readiness: watch::Receiver<Readiness>,
    /// Command-out channel shared with the controller
    sink: Arc<ChannelSink>,
    /// Number of instructions the pump has taken off the channel
    pumped: watch::Receiver<u64>,
    /// Controller task
    actor: JoinHandle<()>,
    /// Instruction pump task
    pump: JoinHandle<()>,
}

impl BridgeSession {
    /// Start a session that delivers host messages to `host`
    pub fn spawn(
        config: BridgeConfig,
        driver: Arc<dyn ScriptDriver>,
        host: Arc<dyn HostSink>,
    ) -> Result<Self> {
        config.validate()?;

        let id = BridgeId::new();
        let (sink, instruction_rx) = ChannelSink::new();
        let sink = Arc::new(sink);
        let controller = BridgeController::with_id(id, config.clone(), sink.clone(), host);

        let (inbox, inbox_rx) = mpsc::channel(config.queue_capacity);
        let (readiness_tx, readiness_rx) = watch::channel(Readiness::NotReady);
        let (pumped_tx, pumped_rx) = watch::channel(0u64);

        let pump = tokio::spawn(pump_instructions(
            id,
            instruction_rx,
            driver,
            readiness_rx.clone(),
            pumped_tx,
        ));
        let actor = tokio::spawn(run_actor(controller, inbox_rx, readiness_tx));

        info!(bridge_id = %id, "Bridge session started");

        Ok(Self {
            id,
            inbox,
            readiness: readiness_rx,
            sink,
            pumped: pumped_rx,
            actor,
            pump,
        })
    }

    /// Start a session whose host messages are read from a channel
    pub fn with_host_channel(
        config: BridgeConfig,
        driver: Arc<dyn ScriptDriver>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<HostMessage>)> {
        let (host, host_rx) = ChannelHostSink::new();
        let session = Self::spawn(config, driver, Arc::new(host))?;
        Ok((session, host_rx))
    }

    pub fn id(&self) -> BridgeId {
        self.id
    }

    /// Current readiness
    pub fn readiness(&self) -> Readiness {
        *self.readiness.borrow()
    }

    /// Subscribe to readiness changes
    pub fn subscribe_readiness(&self) -> watch::Receiver<Readiness> {
        self.readiness.clone()
    }

    /// Wait until the player is ready or the bridge is disposed
    pub async fn wait_ready(&self) -> Result<Readiness> {
        let mut rx = self.readiness.clone();
        let readiness = rx
            .wait_for(|r| *r != Readiness::NotReady)
            .await
            .map_err(|_| Error::Internal("bridge session stopped".to_string()))?;
        Ok(*readiness)
    }

    /// Handle a host method call; resolves once the call is acknowledged
    #[instrument(skip(self), fields(bridge_id = %self.id, method = %call.method))]
    pub async fn call(&self, call: MethodCall) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.enqueue(Envelope::Call { call, reply }).await?;
        rx.await
            .map_err(|_| Error::Internal("bridge session stopped".to_string()))?
    }

    /// Handle a typed command
    pub async fn command(&self, command: PlayerCommand) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.enqueue(Envelope::Command { command, reply }).await?;
        rx.await
            .map_err(|_| Error::Internal("bridge session stopped".to_string()))?
    }

    /// Queue a raw payload posted by the embedded page
    pub async fn post_payload(&self, payload: Value) -> Result<()> {
        self.enqueue(Envelope::Payload(payload)).await
    }

    /// Queue a decoded player event
    pub async fn post_event(&self, event: PlayerEvent) -> Result<()> {
        self.enqueue(Envelope::Event(event)).await
    }

    /// Wait until everything queued so far has been handled and every
    /// resulting instruction has been handed to the driver.
    ///
    /// Returns the bridge state as of that point.
    pub async fn flush(&self) -> Result<BridgeState> {
        let (reply, rx) = oneshot::channel();
        self.enqueue(Envelope::Flush(reply)).await?;
        let state = rx
            .await
            .map_err(|_| Error::Internal("bridge session stopped".to_string()))?;

        let sent = self.sink.sent();
        let mut pumped = self.pumped.clone();
        if pumped.wait_for(|n| *n >= sent).await.is_err() {
            debug!(bridge_id = %self.id, "Instruction pump already stopped");
        }
        Ok(state)
    }

    /// Dispose the bridge and wait for both tasks to finish
    pub async fn dispose(self) -> Result<()> {
        self.command(PlayerCommand::Dispose).await?;
        let Self { id, inbox, sink, actor, pump, .. } = self;
        drop(inbox);
        drop(sink);

        actor
            .await
            .map_err(|e| Error::Internal(format!("actor task failed: {}", e)))?;
        pump.await
            .map_err(|e| Error::Internal(format!("pump task failed: {}", e)))?;

        info!(bridge_id = %id, "Bridge session stopped");
        Ok(())
    }

    async fn enqueue(&self, envelope: Envelope) -> Result<()> {
        self.inbox
            .send(envelope)
            .await
            .map_err(|_| Error::Internal("bridge session stopped".to_string()))
    }
}

async fn run_actor(
    mut controller: BridgeController,
    mut inbox: mpsc::Receiver<Envelope>,
    readiness: watch::Sender<Readiness>,
) {
    while let Some(envelope) = inbox.recv().await {
        let reply = match envelope {
            Envelope::Call { call, reply } => Some((controller.handle_call(&call), reply)),
            Envelope::Command { command, reply } => {
                Some((controller.handle_command(command), reply))
            }
            Envelope::Payload(payload) => {
                controller.handle_payload(&payload);
                None
            }
            Envelope::Event(event) => {
                controller.handle_event(event);
                None
            }
            Envelope::Flush(reply) => {
                let _ = reply.send(controller.state());
                None
            }
        };

        // Publish before acknowledging so a disposed bridge stops its pump first
        let current = controller.readiness();
        readiness.send_if_modified(|r| {
            let changed = *r != current;
            *r = current;
            changed
        });

        if let Some((result, reply)) = reply {
            if let Err(e) = &result {
                if !e.is_host_visible() {
                    warn!(bridge_id = %controller.id(), error = %e, "Call failed inside the bridge");
                }
            }
            let _ = reply.send(result);
        }
    }

    controller.dispose();
    readiness.send_replace(Readiness::Disposed);
    debug!(bridge_id = %controller.id(), "Session actor stopped");
}

async fn pump_instructions(
    id: BridgeId,
    mut instructions: mpsc::UnboundedReceiver<DriverInstruction>,
    driver: Arc<dyn ScriptDriver>,
    readiness: watch::Receiver<Readiness>,
    pumped: watch::Sender<u64>,
) {
    while let Some(instruction) = instructions.recv().await {
        if *readiness.borrow() == Readiness::Disposed {
            debug!(bridge_id = %id, "Bridge disposed, discarding queued instructions");
            break;
        }

        let script = instruction.to_script();
        if !script.is_empty() {
            if let Err(e) = driver.evaluate(&script).await {
                warn!(bridge_id = %id, error = %e, script = %script, "Driver failed to evaluate script");
            }
        }
        pumped.send_modify(|n| *n += 1);
    }
    debug!(bridge_id = %id, "Instruction pump stopped");
}
