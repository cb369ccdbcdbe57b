//! Command-line arguments and in-session commands.

use clap::Parser;
use rtchat_client::{ClientConfig, ClientError, RtMode};

/// rtchat - chat with a streaming assistant and watch its tool calls live
#[derive(Parser, Debug)]
#[command(name = "rtchat", version, about)]
pub struct Cli {
    /// Server root, e.g. http://127.0.0.1:8000 (overrides RTCHAT_BASE_URL)
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Realtime mode: prefer, merge or off (overrides RTCHAT_RT_MODE)
    #[arg(long, value_name = "MODE")]
    pub rt_mode: Option<RtMode>,

    /// Telemetry event cap before the buffer halves
    #[arg(long, value_name = "N")]
    pub max_events: Option<usize>,

    /// Telemetry character cap
    #[arg(long, value_name = "N")]
    pub max_chars: Option<usize>,

    /// Retrieval depth sent with each message
    #[arg(long, value_name = "N")]
    pub top_k: Option<u32>,

    /// Generation length cap sent with each message
    #[arg(long, value_name = "N")]
    pub max_new_tokens: Option<u32>,

    /// Send one message, print the reply and the selected tool card, then exit
    #[arg(value_name = "MESSAGE")]
    pub message: Option<String>,
}

impl Cli {
    /// Environment config with command-line flags laid over it.
    pub fn client_config(&self) -> Result<ClientConfig, ClientError> {
        let mut config = ClientConfig::from_env()?;
        if let Some(url) = &self.base_url {
            config.base_url = url.clone();
        }
        if let Some(mode) = self.rt_mode {
            config.rt_mode = mode;
        }
        if let Some(n) = self.max_events {
            config.telemetry.max_events = n;
        }
        if let Some(n) = self.max_chars {
            config.telemetry.max_chars = n;
        }
        config.validate()?;
        Ok(config)
    }
}

pub const HELP: &str = "\
commands:
  /tools          list tools seen this turn (* = selected)
  /tool <name>    select a tool and show its card
  /card           show the selected tool card
  /telemetry      show the realtime telemetry buffer
  /clear          clear telemetry and tools
  /new            cancel the stream and start a fresh conversation
  /rt <mode>      switch realtime mode (prefer, merge, off)
  /cancel         stop the current stream
  /quit           exit
anything else is sent as a message";

/// One line of user input.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command {
    Send(String),
    Tools,
    Tool(String),
    Card,
    Telemetry,
    Clear,
    New,
    Rt(RtMode),
    Cancel,
    Help,
    Quit,
}

impl Command {
    /// Parses an input line; `Ok(None)` for a blank line.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Ok(Some(Self::Send(line.to_string())));
        };
        let (name, arg) = match rest.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (rest, ""),
        };
        let command = match (name, arg) {
            ("tools", "") => Self::Tools,
            ("tool", "") => return Err("usage: /tool <name>".into()),
            ("tool", tool) => Self::Tool(tool.to_string()),
            ("card", "") => Self::Card,
            ("telemetry", "") => Self::Telemetry,
            ("clear", "") => Self::Clear,
            ("new", "") => Self::New,
            ("rt", mode) => Self::Rt(mode.parse().map_err(|err: ClientError| err.to_string())?),
            ("cancel", "") => Self::Cancel,
            ("help", "") => Self::Help,
            ("quit" | "exit", "") => Self::Quit,
            _ => return Err(format!("unknown command: /{rest} (try /help)")),
        };
        Ok(Some(command))
    }
}
