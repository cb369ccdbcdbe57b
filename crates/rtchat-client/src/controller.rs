use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::conversation::{ConversationLog, Turn};
use crate::errors::ClientError;
use crate::event::{RawEvent, StreamEvent};
use crate::model::{RtMode, SessionId, StreamRequest};
use crate::registry::ToolRegistry;
use crate::render::{ToolCard, render_selected};
use crate::ring::{TelemetryLimits, TelemetryRing};
use crate::session::{SessionState, StreamSession};
use crate::transport::Transport;

/// Part of the UI state touched by an applied event.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Change {
    Telemetry,
    Tools,
    Conversation,
}

/// Outcome of delivering one event to the controller.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Dispatch {
    /// The event updated state.
    Applied(Change),
    /// Malformed, empty or unknown payload; nothing changed.
    Discarded,
    /// The event belongs to a session that is not the active, open one.
    Stale,
    /// A terminal event closed the session.
    Closed(SessionState),
}

/// Owns all client-side chat state and the single active stream session.
///
/// Every mutation goes through `&mut self`, so events are applied strictly in
/// the order the caller delivers them.
#[derive(Debug)]
pub struct ChatController {
    ring: TelemetryRing,
    registry: ToolRegistry,
    conversation: ConversationLog,
    active: Option<StreamSession>,
}

impl ChatController {
    pub fn new(limits: TelemetryLimits) -> Self {
        Self {
            ring: TelemetryRing::new(limits),
            registry: ToolRegistry::new(),
            conversation: ConversationLog::new(),
            active: None,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.telemetry)
    }

    /// Starts a session for `text` with the given realtime mode.
    pub fn submit(
        &mut self,
        transport: &mut dyn Transport,
        text: &str,
        rt_mode: RtMode,
    ) -> Result<SessionId, ClientError> {
        self.submit_request(transport, StreamRequest::new(text, rt_mode))
    }

    /// Starts a session from a full request.
    ///
    /// Resets telemetry and tools, closes any prior session, opens the new
    /// stream, then records the user turn. A failed open still records the
    /// user turn, followed by a frozen error turn, and leaves the session in
    /// [`SessionState::ClosedError`].
    pub fn submit_request(
        &mut self,
        transport: &mut dyn Transport,
        mut request: StreamRequest,
    ) -> Result<SessionId, ClientError> {
        let message = request.message.trim();
        if message.is_empty() {
            return Err(ClientError::Validation("message must not be empty".into()));
        }
        request.message = message.to_string();

        self.ring.reset();
        self.registry.reset();
        self.close_active(SessionState::Cancelled);

        let mut session = StreamSession::new();
        let opened = transport.open(session.id(), &request);
        self.conversation.push(Turn::user(request.message.clone()));
        match opened {
            Ok(connection) => session.attach(connection),
            Err(err) => {
                warn!(session = %session.id(), error = %err, "failed to open stream");
                self.conversation
                    .push(Turn::assistant_error(&err.to_string()));
                session.close(SessionState::ClosedError);
            }
        }

        let id = session.id();
        self.active = Some(session);
        Ok(id)
    }

    /// Decodes and applies a wire frame for `session`.
    ///
    /// Frames that fail to decode are dropped without touching state.
    pub fn dispatch(&mut self, session: SessionId, raw: &RawEvent) -> Dispatch {
        if !self.is_live(session) {
            debug!(session = %session, event = %raw.event, "ignoring event for inactive session");
            return Dispatch::Stale;
        }
        match StreamEvent::decode(raw) {
            Ok(event) => self.apply_live(event),
            Err(err) => {
                debug!(session = %session, error = %err, "discarding malformed event");
                Dispatch::Discarded
            }
        }
    }

    /// Applies an already-typed event for `session`.
    pub fn apply(&mut self, session: SessionId, event: StreamEvent) -> Dispatch {
        if !self.is_live(session) {
            debug!(session = %session, kind = %event.kind(), "ignoring event for inactive session");
            return Dispatch::Stale;
        }
        self.apply_live(event)
    }

    fn is_live(&self, session: SessionId) -> bool {
        self.active
            .as_ref()
            .is_some_and(|s| s.id() == session && s.is_streaming())
    }

    fn apply_live(&mut self, event: StreamEvent) -> Dispatch {
        let Self {
            ring,
            registry,
            conversation,
            active,
        } = self;
        let Some(session) = active.as_mut() else {
            return Dispatch::Stale;
        };
        debug!(session = %session.id(), kind = %event.kind(), "applying event");

        match event {
            StreamEvent::Rt(text) => {
                if ring.append(&text) {
                    Dispatch::Applied(Change::Telemetry)
                } else {
                    Dispatch::Discarded
                }
            }
            StreamEvent::Mcp(tool_event) => {
                let tool = tool_event.tool.clone();
                registry.upsert(tool, tool_event);
                Dispatch::Applied(Change::Tools)
            }
            StreamEvent::Draft(text) => {
                match conversation.open_assistant_mut() {
                    Some(turn) => turn.text = text,
                    None => {
                        session.reset_accumulator();
                        conversation.push(Turn::assistant_open(text));
                    }
                }
                Dispatch::Applied(Change::Conversation)
            }
            StreamEvent::Token(fragment) => {
                if !conversation.has_open_assistant() {
                    session.reset_accumulator();
                    conversation.push(Turn::assistant_open(String::new()));
                }
                let text = session.accumulate(&fragment).to_string();
                if let Some(turn) = conversation.open_assistant_mut() {
                    turn.text = text;
                }
                Dispatch::Applied(Change::Conversation)
            }
            StreamEvent::Error(message) => {
                conversation.push(Turn::assistant_error(&message));
                session.close(SessionState::ClosedError);
                Dispatch::Closed(SessionState::ClosedError)
            }
            StreamEvent::Done => {
                conversation.freeze_last();
                session.close(SessionState::ClosedNormal);
                Dispatch::Closed(SessionState::ClosedNormal)
            }
        }
    }

    fn close_active(&mut self, state: SessionState) -> bool {
        let Some(session) = self.active.as_mut() else {
            return false;
        };
        if !session.close(state) {
            return false;
        }
        self.conversation.freeze_last();
        true
    }

    /// Closes the active stream, if any. Events already in flight are ignored.
    pub fn cancel(&mut self) -> bool {
        self.close_active(SessionState::Cancelled)
    }

    /// Closes the active stream and empties the conversation.
    pub fn new_conversation(&mut self) {
        self.cancel();
        self.conversation.clear();
    }

    /// Empties the telemetry buffer and the tool registry.
    pub fn clear_telemetry(&mut self) {
        self.ring.reset();
        self.registry.reset();
    }

    /// Selects the tool shown in the detail card; unknown ids are rejected.
    pub fn select_tool(&mut self, tool: &str) -> bool {
        self.registry.select(tool)
    }

    pub fn conversation(&self) -> &ConversationLog {
        &self.conversation
    }

    pub fn telemetry(&self) -> &TelemetryRing {
        &self.ring
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Display model for the selected tool.
    pub fn selected_card(&self) -> Option<ToolCard> {
        render_selected(&self.registry)
    }

    pub fn active_session(&self) -> Option<SessionId> {
        self.active.as_ref().map(StreamSession::id)
    }

    pub fn session_state(&self) -> Option<SessionState> {
        self.active.as_ref().map(StreamSession::state)
    }

    pub fn is_streaming(&self) -> bool {
        self.active.as_ref().is_some_and(StreamSession::is_streaming)
    }
}

impl Default for ChatController {
    fn default() -> Self {
        Self::new(TelemetryLimits::default())
    }
}
