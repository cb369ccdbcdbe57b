//! Common imports for typical client usage.
pub use crate::{
    ApiClient, ChatController, Change, ClientConfig, ClientError, Dispatch, RawEvent, Role,
    RtMode, SessionEvent, SessionId, SessionState, SseTransport, StreamEvent, ToolCard, Transport,
};
