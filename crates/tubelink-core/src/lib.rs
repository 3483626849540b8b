//! Tubelink Core - Embedded Player Bridge
//!
//! This crate lets a host application drive a video player that lives inside
//! a web view, without knowing how the page is built:
//! - Host method calls decoded into typed commands
//! - Commands encoded into player driver scripts
//! - Player events decoded and forwarded to the host
//! - Initialization buffered until the player reports readiness
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Tubelink Core                            │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │   host call ──► ┌──────────────┐         ┌──────────────┐       │
//! │                 │    Method    │         │   Command    │       │
//! │                 │    Codec     │         │    Codec     │──► driver
//! │                 └──────┬───────┘         └──────▲───────┘       │
//! │                        │                        │               │
//! │                 ┌──────┴────────────────────────┴──────┐        │
//! │                 │          Bridge Controller           │        │
//! │                 │     (readiness + pending buffer)     │        │
//! │                 └──────▲────────────────────────┬──────┘        │
//! │                        │                        │               │
//! │                 ┌──────┴───────┐                ▼               │
//! │  player event ─►│    Event     │           host message         │
//! │                 │   Decoder    │                                │
//! │                 └──────────────┘                                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod types;
pub mod config;
pub mod codec;
pub mod events;
pub mod pending;
pub mod method;
pub mod transport;
pub mod controller;
pub mod session;

pub use error::{Error, HostError, Result};
pub use types::*;
pub use config::BridgeConfig;
pub use codec::{CommandCodec, DriverInstruction};
pub use pending::ReadinessBuffer;
pub use method::{decode_command, HostMessage, MethodCall};
pub use transport::{ChannelHostSink, ChannelSink, HostSink, InstructionSink, ScriptDriver};
pub use controller::BridgeController;
pub use session::BridgeSession;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Log the library version once at startup
pub fn init() {
    tracing::info!(version = VERSION, "Tubelink Core initialized");
}
