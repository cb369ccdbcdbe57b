use std::fmt;

use serde_json::Value;

use crate::errors::DecodeError;

/// Tool name used when an `mcp` payload does not carry one.
pub const UNKNOWN_TOOL: &str = "unknown";

/// Event names the chat stream emits.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum EventKind {
    Token,
    Draft,
    Rt,
    Mcp,
    Error,
    Done,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Token => "token",
            Self::Draft => "draft",
            Self::Rt => "rt",
            Self::Mcp => "mcp",
            Self::Error => "error",
            Self::Done => "done",
        }
    }

    /// Maps an SSE `event:` name to a kind. Names are matched exactly.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "token" => Self::Token,
            "draft" => Self::Draft,
            "rt" => Self::Rt,
            "mcp" => Self::Mcp,
            "error" => Self::Error,
            "done" => Self::Done,
            _ => return None,
        })
    }

    /// `done` and `error` end a session.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One frame as delivered by the transport, payload still encoded.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RawEvent {
    /// SSE `event:` field.
    pub event: String,
    /// SSE `data:` field; an absent payload is the empty string.
    pub data: String,
}

impl RawEvent {
    pub fn new(event: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            data: data.into(),
        }
    }

    pub fn kind(&self) -> Option<EventKind> {
        EventKind::from_name(&self.event)
    }

    pub fn is_terminal(&self) -> bool {
        self.kind().is_some_and(EventKind::is_terminal)
    }
}

/// Latest result reported for one tool.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolEvent {
    pub tool: String,
    pub function: Option<String>,
    /// Tool-specific payload; `Value::Null` when the event had none.
    pub response: Value,
    /// The whole decoded event, kept for the fallback renderer.
    pub raw: Value,
}

impl ToolEvent {
    /// Builds a tool event from any decoded JSON value.
    ///
    /// Non-object values and objects without a string `tool` field land under
    /// [`UNKNOWN_TOOL`].
    pub fn from_value(raw: Value) -> Self {
        let tool = raw
            .get("tool")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .unwrap_or(UNKNOWN_TOOL)
            .to_string();
        let function = raw
            .get("function")
            .and_then(Value::as_str)
            .filter(|f| !f.is_empty())
            .map(str::to_string);
        let response = raw.get("response").cloned().unwrap_or(Value::Null);
        Self {
            tool,
            function,
            response,
            raw,
        }
    }
}

/// Typed stream event.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamEvent {
    /// Incremental assistant text.
    Token(String),
    /// Full replacement of the in-progress assistant text.
    Draft(String),
    /// Free-form realtime telemetry.
    Rt(String),
    /// Structured tool result.
    Mcp(ToolEvent),
    /// Stream-level failure; terminal.
    Error(String),
    /// Normal end of stream; terminal.
    Done,
}

impl StreamEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Token(_) => EventKind::Token,
            Self::Draft(_) => EventKind::Draft,
            Self::Rt(_) => EventKind::Rt,
            Self::Mcp(_) => EventKind::Mcp,
            Self::Error(_) => EventKind::Error,
            Self::Done => EventKind::Done,
        }
    }

    /// Decodes a wire frame.
    ///
    /// `token`, `draft` and `mcp` carry JSON; `rt` and `error` are taken as
    /// plain text; `done` ignores its payload.
    pub fn decode(raw: &RawEvent) -> Result<Self, DecodeError> {
        let kind = raw
            .kind()
            .ok_or_else(|| DecodeError::UnknownKind(raw.event.clone()))?;
        match kind {
            EventKind::Token => decode_text(kind, &raw.data).map(Self::Token),
            EventKind::Draft => decode_text(kind, &raw.data).map(Self::Draft),
            EventKind::Mcp => serde_json::from_str::<Value>(&raw.data)
                .map(|value| Self::Mcp(ToolEvent::from_value(value)))
                .map_err(|err| DecodeError::json(kind, &err)),
            EventKind::Rt => Ok(Self::Rt(raw.data.clone())),
            EventKind::Error => Ok(Self::Error(raw.data.clone())),
            EventKind::Done => Ok(Self::Done),
        }
    }
}

fn decode_text(kind: EventKind, data: &str) -> Result<String, DecodeError> {
    match serde_json::from_str::<Value>(data) {
        Ok(Value::String(text)) => Ok(text),
        Ok(_) => Err(DecodeError::NotText { kind }),
        Err(err) => Err(DecodeError::json(kind, &err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn token_payload_is_json_decoded() {
        let event = StreamEvent::decode(&RawEvent::new("token", r#""Hel\nlo""#)).expect("decode");
        assert_eq!(event, StreamEvent::Token("Hel\nlo".into()));
    }

    #[test]
    fn draft_rejects_non_string_json() {
        let err = StreamEvent::decode(&RawEvent::new("draft", "42")).unwrap_err();
        assert_eq!(
            err,
            DecodeError::NotText {
                kind: EventKind::Draft
            }
        );
    }

    #[test]
    fn malformed_token_is_a_json_error() {
        let err = StreamEvent::decode(&RawEvent::new("token", "\"unterminated")).unwrap_err();
        assert!(matches!(err, DecodeError::Json { kind: EventKind::Token, .. }));
    }

    #[test]
    fn rt_and_error_are_plain_text_and_may_be_empty() {
        assert_eq!(
            StreamEvent::decode(&RawEvent::new("rt", "{not json")).expect("rt"),
            StreamEvent::Rt("{not json".into())
        );
        assert_eq!(
            StreamEvent::decode(&RawEvent::new("error", "")).expect("error"),
            StreamEvent::Error(String::new())
        );
    }

    #[test]
    fn done_ignores_payload() {
        assert_eq!(
            StreamEvent::decode(&RawEvent::new("done", "{}")).expect("done"),
            StreamEvent::Done
        );
    }

    #[test]
    fn unknown_event_name_is_rejected() {
        let err = StreamEvent::decode(&RawEvent::new("message", "x")).unwrap_err();
        assert_eq!(err, DecodeError::UnknownKind("message".into()));
    }

    #[test]
    fn mcp_extracts_tool_function_and_response() {
        let raw = RawEvent::new(
            "mcp",
            json!({"tool": "orderbook", "function": "l2Book", "response": {"bids": []}}).to_string(),
        );
        let StreamEvent::Mcp(event) = StreamEvent::decode(&raw).expect("decode") else {
            panic!("expected mcp");
        };
        assert_eq!(event.tool, "orderbook");
        assert_eq!(event.function.as_deref(), Some("l2Book"));
        assert_eq!(event.response, json!({"bids": []}));
    }

    #[test]
    fn mcp_without_tool_defaults_to_unknown() {
        let StreamEvent::Mcp(event) =
            StreamEvent::decode(&RawEvent::new("mcp", r#"{"response": 1}"#)).expect("decode")
        else {
            panic!("expected mcp");
        };
        assert_eq!(event.tool, UNKNOWN_TOOL);
        assert_eq!(event.function, None);

        let StreamEvent::Mcp(event) =
            StreamEvent::decode(&RawEvent::new("mcp", r#""bare""#)).expect("decode")
        else {
            panic!("expected mcp");
        };
        assert_eq!(event.tool, UNKNOWN_TOOL);
        assert_eq!(event.response, Value::Null);
    }

    #[test]
    fn terminal_kinds() {
        assert!(RawEvent::new("done", "").is_terminal());
        assert!(RawEvent::new("error", "x").is_terminal());
        assert!(!RawEvent::new("token", "\"x\"").is_terminal());
        assert!(!RawEvent::new("bogus", "").is_terminal());
    }
}
