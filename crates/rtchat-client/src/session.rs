use std::fmt;

use tracing::info;

use crate::model::SessionId;
use crate::transport::Connection;

/// Lifecycle of one stream session.
#[derive(Clone, Copy, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum SessionState {
    /// Created, connection not yet open.
    Idle,
    /// Connection open, events being applied.
    Streaming,
    /// Ended by a `done` event.
    ClosedNormal,
    /// Ended by an `error` event or a failed open.
    ClosedError,
    /// Closed by the caller (new submission, new conversation, cancel).
    Cancelled,
}

impl SessionState {
    pub fn is_closed(self) -> bool {
        matches!(
            self,
            Self::ClosedNormal | Self::ClosedError | Self::Cancelled
        )
    }
}

/// One streaming connection plus the token accumulator scoped to it.
///
/// The connection is held until the first transition to a closed state and
/// is closed exactly once; later close requests are no-ops.
pub struct StreamSession {
    id: SessionId,
    state: SessionState,
    accumulator: String,
    connection: Option<Box<dyn Connection>>,
}

impl StreamSession {
    pub(crate) fn new() -> Self {
        Self {
            id: SessionId::new(),
            state: SessionState::Idle,
            accumulator: String::new(),
            connection: None,
        }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_streaming(&self) -> bool {
        self.state == SessionState::Streaming
    }

    pub(crate) fn attach(&mut self, connection: Box<dyn Connection>) {
        debug_assert_eq!(self.state, SessionState::Idle);
        self.connection = Some(connection);
        self.state = SessionState::Streaming;
        info!(session = %self.id, "stream session opened");
    }

    /// Appends a token fragment and returns the accumulated text.
    pub(crate) fn accumulate(&mut self, fragment: &str) -> &str {
        self.accumulator.push_str(fragment);
        &self.accumulator
    }

    pub(crate) fn reset_accumulator(&mut self) {
        self.accumulator.clear();
    }

    /// Moves to `state` and closes the connection.
    ///
    /// Returns `false` if the session was already closed.
    pub(crate) fn close(&mut self, state: SessionState) -> bool {
        debug_assert!(state.is_closed());
        if self.state.is_closed() {
            return false;
        }
        self.state = state;
        self.close_connection();
        info!(session = %self.id, state = ?state, "stream session closed");
        true
    }

    fn close_connection(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            connection.close();
        }
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.close_connection();
    }
}

impl fmt::Debug for StreamSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamSession")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("accumulator_len", &self.accumulator.len())
            .field("connected", &self.connection.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingConnection(Arc<AtomicUsize>);

    impl Connection for CountingConnection {
        fn close(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn close_is_applied_once() {
        let closes = Arc::new(AtomicUsize::new(0));
        let mut session = StreamSession::new();
        session.attach(Box::new(CountingConnection(closes.clone())));
        assert!(session.is_streaming());

        assert!(session.close(SessionState::ClosedNormal));
        assert!(!session.close(SessionState::ClosedError));
        assert!(!session.close(SessionState::Cancelled));
        drop(session);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropping_an_open_session_closes_its_connection() {
        let closes = Arc::new(AtomicUsize::new(0));
        let mut session = StreamSession::new();
        session.attach(Box::new(CountingConnection(closes.clone())));
        drop(session);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn accumulator_concatenates_until_reset() {
        let mut session = StreamSession::new();
        session.accumulate("Hel");
        assert_eq!(session.accumulate("lo"), "Hello");
        session.reset_accumulator();
        assert_eq!(session.accumulate("x"), "x");
    }

    #[test]
    fn closed_states() {
        assert!(!SessionState::Idle.is_closed());
        assert!(!SessionState::Streaming.is_closed());
        assert!(SessionState::ClosedNormal.is_closed());
        assert!(SessionState::ClosedError.is_closed());
        assert!(SessionState::Cancelled.is_closed());
    }
}
