//! Client side of a streaming chat API.
//!
//! One user turn opens one server-sent-event stream. Its frames (`token`,
//! `draft`, `rt`, `mcp`, `error`, `done`) are demultiplexed onto a
//! conversation log, a capped telemetry buffer and a latest-per-tool
//! registry, all owned by a [`ChatController`].
//!
//! # Driving a session
//!
//! ```no_run
//! use rtchat_client::prelude::*;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), ClientError> {
//! let config = ClientConfig::from_env()?;
//! let (mut transport, mut frames) = SseTransport::new(&config)?;
//! let mut chat = ChatController::from_config(&config);
//!
//! chat.submit(&mut transport, "What is the $BTC funding rate?", config.rt_mode)?;
//! while let Some(SessionEvent { session, event }) = frames.recv().await {
//!     if let Dispatch::Closed(_) = chat.dispatch(session, &event) {
//!         break;
//!     }
//! }
//!
//! for turn in chat.conversation().turns() {
//!     println!("{:?}: {}", turn.role, turn.text);
//! }
//! if let Some(card) = chat.selected_card() {
//!     println!("{card}");
//! }
//! # Ok(())
//! # }
//! ```

/// Config endpoint client.
pub mod api;
/// Client configuration.
pub mod config;
/// Single owner of chat state; entry points for the UI layer.
pub mod controller;
/// Turns and the conversation log.
pub mod conversation;
/// Public error types.
pub mod errors;
/// Wire frames and typed stream events.
pub mod event;
/// Realtime mode, session ids and stream requests.
pub mod model;
/// Logging setup.
pub mod observability;
/// Common imports for typical usage.
pub mod prelude;
/// Latest-per-tool registry with sticky selection.
pub mod registry;
/// Tool card display models.
pub mod render;
/// Capped telemetry buffer.
pub mod ring;
/// Stream session lifecycle.
pub mod session;
mod sse;
/// Stream transports.
pub mod transport;

pub use api::{ApiClient, ServerConfig};
pub use config::ClientConfig;
pub use controller::{ChatController, Change, Dispatch};
pub use conversation::{ConversationLog, Role, Turn};
pub use errors::{ClientError, DecodeError};
pub use event::{EventKind, RawEvent, StreamEvent, ToolEvent};
pub use model::{RtMode, SessionId, StreamRequest};
pub use registry::ToolRegistry;
pub use render::{CardBody, ToolCard, render, render_selected};
pub use ring::{TelemetryLimits, TelemetryRing};
pub use session::{SessionState, StreamSession};
pub use transport::{Connection, SessionEvent, SseTransport, Transport};
