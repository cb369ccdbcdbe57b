use std::fmt;
use std::str::FromStr;

use crate::errors::ClientError;

/// How the server should blend realtime market data into an answer.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RtMode {
    /// Prefer realtime data over retrieved context.
    #[default]
    Prefer,
    /// Merge realtime data with retrieved context.
    Merge,
    /// No realtime data.
    Off,
}

impl RtMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Prefer => "prefer",
            Self::Merge => "merge",
            Self::Off => "off",
        }
    }
}

impl fmt::Display for RtMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RtMode {
    type Err = ClientError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "prefer" => Ok(Self::Prefer),
            "merge" => Ok(Self::Merge),
            "off" => Ok(Self::Off),
            other => Err(ClientError::Config(format!("unknown rt mode: {other}"))),
        }
    }
}

/// Identifies one streaming session.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub struct SessionId(pub uuid::Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Parameters used to open one chat stream.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct StreamRequest {
    pub message: String,
    pub rt_mode: RtMode,
    /// Retrieval depth; server default when unset.
    pub top_k: Option<u32>,
    /// Generation length cap; server default when unset.
    pub max_new_tokens: Option<u32>,
}

impl StreamRequest {
    pub fn new(message: impl Into<String>, rt_mode: RtMode) -> Self {
        Self {
            message: message.into(),
            rt_mode,
            top_k: None,
            max_new_tokens: None,
        }
    }

    /// Query parameters for the stream endpoint, optional ones only when set.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("message", self.message.clone()),
            ("rt_mode", self.rt_mode.as_str().to_string()),
        ];
        if let Some(top_k) = self.top_k {
            pairs.push(("top_k", top_k.to_string()));
        }
        if let Some(max_new_tokens) = self.max_new_tokens {
            pairs.push(("max_new_tokens", max_new_tokens.to_string()));
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rt_mode_parses_case_insensitively() {
        assert_eq!(" Merge ".parse::<RtMode>().expect("merge"), RtMode::Merge);
        assert_eq!("OFF".parse::<RtMode>().expect("off"), RtMode::Off);
        assert!(matches!(
            "sometimes".parse::<RtMode>(),
            Err(ClientError::Config(msg)) if msg.contains("sometimes")
        ));
        assert_eq!(RtMode::default(), RtMode::Prefer);
    }

    #[test]
    fn query_pairs_skip_unset_tuning() {
        let mut request = StreamRequest::new("hi", RtMode::Off);
        assert_eq!(
            request.query_pairs(),
            vec![("message", "hi".to_string()), ("rt_mode", "off".to_string())]
        );
        request.top_k = Some(3);
        request.max_new_tokens = Some(64);
        assert_eq!(request.query_pairs().len(), 4);
    }
}
