//! CLI command implementations

use crate::output::format_rows;
use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tabled::Tabled;
use tokio::sync::mpsc::UnboundedReceiver;
use tubelink_core::{
    decode_command, events, BridgeConfig, BridgeSession, CommandCodec, HostError, HostMessage,
    MethodCall, ScriptDriver,
};

/// One line of output
#[derive(Debug, Serialize, Tabled)]
pub struct Record {
    pub step: usize,
    pub direction: &'static str,
    pub method: String,
    pub detail: String,
}

impl Record {
    fn script(step: usize, method: &str, script: &str) -> Self {
        let detail = if script.is_empty() {
            "(no-op)".to_string()
        } else {
            script.to_string()
        };
        Self {
            step,
            direction: "driver",
            method: method.to_string(),
            detail,
        }
    }

    fn host(step: usize, message: &HostMessage) -> Self {
        Self {
            step,
            direction: "host",
            method: message.method.clone(),
            detail: message.arguments.to_string(),
        }
    }
}

/// One step of a replay script
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ScriptStep {
    /// Host method call
    Call(MethodCall),
    /// Raw payload posted by the embedded page
    Event(Value),
}

/// Load configuration from a file, or fall back to defaults
pub fn load_config(path: Option<&Path>) -> anyhow::Result<BridgeConfig> {
    match path {
        Some(path) => BridgeConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display())),
        None => Ok(BridgeConfig::default()),
    }
}

/// Encode a single method call into driver scripts
pub fn encode(
    method: &str,
    args: Option<&str>,
    config: &BridgeConfig,
    format: &str,
) -> anyhow::Result<()> {
    let call = match args {
        Some(raw) => MethodCall::with_json_args(method, raw).context("--args is not valid JSON")?,
        None => MethodCall::bare(method),
    };

    let command = match decode_command(&call) {
        Ok(command) => command,
        Err(e) if !e.is_host_visible() => return Err(e.into()),
        Err(e) => {
            let host_error = HostError::from(&e);
            println!("{}", serde_json::to_string_pretty(&host_error)?);
            std::process::exit(1);
        }
    };

    let instructions = CommandCodec::new(config).encode(&command)?;
    let records: Vec<Record> = instructions
        .iter()
        .map(|i| Record::script(1, method, &i.to_script()))
        .collect();

    match format_rows(&records, format) {
        Some(rendered) => println!("{}", rendered),
        None => {
            if records.is_empty() {
                println!("{}: no driver instructions", method);
            }
            for r in &records {
                println!("{}", r.detail);
            }
        }
    }

    Ok(())
}

/// Decode a raw event payload
pub fn decode(payload: &str, format: &str) -> anyhow::Result<()> {
    match events::decode_str(payload) {
        Ok(Some(event)) => {
            let message = HostMessage::from_event(&event);
            let records = vec![Record::host(1, &message)];
            match format_rows(&records, format) {
                Some(rendered) => println!("{}", rendered),
                None => {
                    println!("Event: {}", serde_json::to_string(&event)?);
                    println!("Host:  {}({})", message.method, message.arguments);
                }
            }
        }
        Ok(None) => println!("Ignored: unknown event"),
        Err(e) => println!("Dropped: {}", e),
    }
    Ok(())
}

/// Driver that keeps evaluated scripts for printing
#[derive(Default)]
struct RecordingDriver {
    scripts: Mutex<Vec<String>>,
}

impl RecordingDriver {
    fn take(&self) -> Vec<String> {
        self.scripts
            .lock()
            .map(|mut scripts| std::mem::take(&mut *scripts))
            .unwrap_or_default()
    }
}

#[async_trait]
impl ScriptDriver for RecordingDriver {
    async fn evaluate(&self, script: &str) -> tubelink_core::Result<()> {
        self.scripts
            .lock()
            .map_err(|_| tubelink_core::Error::Driver("script log poisoned".to_string()))?
            .push(script.to_string());
        Ok(())
    }
}

/// Replay a JSON-lines session script through a bridge session
pub fn replay(path: &Path, config: BridgeConfig, format: &str) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;
    runtime.block_on(replay_session(path, &content, config, format))
}

async fn replay_session(
    path: &Path,
    content: &str,
    config: BridgeConfig,
    format: &str,
) -> anyhow::Result<()> {
    let driver = Arc::new(RecordingDriver::default());
    let (session, mut messages) = BridgeSession::with_host_channel(config, driver.clone())?;
    tracing::info!(bridge_id = %session.id(), script = %path.display(), "Replaying session");

    let mut records = Vec::new();
    let mut rejected = 0usize;

    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let step = index + 1;
        let parsed: ScriptStep = serde_json::from_str(line)
            .with_context(|| format!("line {}: not a call or event step", step))?;

        let method = match parsed {
            ScriptStep::Call(call) => {
                let detail = match session.call(call.clone()).await {
                    Ok(()) => "ack".to_string(),
                    Err(e) if e.is_host_visible() => {
                        rejected += 1;
                        HostError::from(&e).to_string()
                    }
                    Err(e) => return Err(e.into()),
                };
                records.push(Record {
                    step,
                    direction: "call",
                    method: call.method.clone(),
                    detail,
                });
                call.method
            }
            ScriptStep::Event(payload) => {
                let name = payload
                    .get("event")
                    .and_then(Value::as_str)
                    .unwrap_or("(none)")
                    .to_string();
                records.push(Record {
                    step,
                    direction: "event",
                    method: name.clone(),
                    detail: payload.to_string(),
                });
                session.post_payload(payload).await?;
                name
            }
        };

        session.flush().await?;
        collect(step, &method, &driver, &mut messages, &mut records);
    }

    let state = session.flush().await?;
    let readiness = session.readiness();
    session.dispose().await?;

    match format_rows(&records, format) {
        Some(rendered) => println!("{}", rendered),
        None => {
            for r in &records {
                let arrow = match r.direction {
                    "call" => "->",
                    "event" => "<-",
                    "driver" => "  >",
                    _ => "  <",
                };
                println!("{:>4} {} {:<16} {}", r.step, arrow, r.method, r.detail);
            }
        }
    }

    println!(
        "\nFinal: {} (pending: {}), {} rejected call(s)",
        readiness,
        state.pending.map(|p| p.video_id).unwrap_or_else(|| "none".to_string()),
        rejected
    );

    Ok(())
}

fn collect(
    step: usize,
    method: &str,
    driver: &RecordingDriver,
    messages: &mut UnboundedReceiver<HostMessage>,
    records: &mut Vec<Record>,
) {
    for script in driver.take() {
        records.push(Record::script(step, method, &script));
    }
    while let Ok(message) = messages.try_recv() {
        records.push(Record::host(step, &message));
    }
}
