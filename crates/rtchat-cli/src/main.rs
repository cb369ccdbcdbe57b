//! Interactive terminal chat over the streaming API.

mod cli;
mod view;

use std::error::Error;
use std::io::{self, Write as _};

use clap::Parser as _;
use rtchat_client::observability::init_observability;
use rtchat_client::prelude::*;
use rtchat_client::StreamRequest;
use tokio::io::{AsyncBufReadExt as _, BufReader};
use tokio::sync::mpsc;

use crate::cli::{Cli, Command, HELP};
use crate::view::{ReplyPrinter, write_card, write_telemetry, write_tools};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    let _ = dotenvy::dotenv();
    init_observability();

    let args = Cli::parse();
    let config = args.client_config()?;
    let (transport, frames) = SseTransport::new(&config)?;
    let mut app = App {
        chat: ChatController::from_config(&config),
        transport,
        printer: ReplyPrinter::default(),
        rt_mode: config.rt_mode,
        top_k: args.top_k,
        max_new_tokens: args.max_new_tokens,
    };

    let model = ApiClient::new(&config)?.model_label().await;
    tracing::info!(base_url = %config.base_url, model = %model, "rtchat starting");

    match args.message {
        Some(message) => app.one_shot(&message, frames).await,
        None => {
            if !model.is_empty() {
                eprintln!("model: {model}");
            }
            eprintln!("type /help for commands");
            app.interactive(frames).await
        }
    }
}

struct App {
    chat: ChatController,
    transport: SseTransport,
    printer: ReplyPrinter,
    rt_mode: RtMode,
    top_k: Option<u32>,
    max_new_tokens: Option<u32>,
}

impl App {
    fn send(&mut self, message: &str) -> Result<(), Box<dyn Error>> {
        let mut request = StreamRequest::new(message, self.rt_mode);
        request.top_k = self.top_k;
        request.max_new_tokens = self.max_new_tokens;
        self.chat.submit_request(&mut self.transport, request)?;
        self.printer.update(self.chat.conversation(), &mut io::stdout())?;
        Ok(())
    }

    /// Applies one frame and echoes whatever it changed.
    fn on_frame(&mut self, frame: SessionEvent) -> io::Result<Dispatch> {
        let outcome = self.chat.dispatch(frame.session, &frame.event);
        let mut out = io::stdout();
        match outcome {
            Dispatch::Applied(Change::Conversation) => {
                self.printer.update(self.chat.conversation(), &mut out)?;
            }
            Dispatch::Closed(_) => {
                self.printer.update(self.chat.conversation(), &mut out)?;
                self.printer.finish(&mut out)?;
            }
            Dispatch::Applied(_) | Dispatch::Discarded | Dispatch::Stale => {}
        }
        Ok(outcome)
    }

    async fn one_shot(
        &mut self,
        message: &str,
        mut frames: mpsc::Receiver<SessionEvent>,
    ) -> Result<(), Box<dyn Error>> {
        self.send(message)?;
        while self.chat.is_streaming() {
            let Some(frame) = frames.recv().await else {
                break;
            };
            self.on_frame(frame)?;
        }
        if self.chat.selected_card().is_some() {
            let mut out = io::stdout();
            writeln!(out)?;
            write_card(&self.chat, &mut out)?;
        }
        match self.chat.session_state() {
            Some(SessionState::ClosedError) => Err("stream ended with an error".into()),
            _ => Ok(()),
        }
    }

    async fn interactive(
        &mut self,
        mut frames: mpsc::Receiver<SessionEvent>,
    ) -> Result<(), Box<dyn Error>> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        break;
                    };
                    match Command::parse(&line) {
                        Ok(Some(Command::Quit)) => break,
                        Ok(Some(command)) => self.run(command)?,
                        Ok(None) => {}
                        Err(message) => eprintln!("{message}"),
                    }
                }
                Some(frame) = frames.recv() => {
                    self.on_frame(frame)?;
                }
            }
        }
        self.chat.cancel();
        Ok(())
    }

    fn run(&mut self, command: Command) -> Result<(), Box<dyn Error>> {
        let mut out = io::stdout();
        match command {
            Command::Send(message) => {
                self.printer.finish(&mut out)?;
                if let Err(err) = self.send(&message) {
                    eprintln!("{err}");
                }
            }
            Command::Tools => write_tools(&self.chat, &mut out)?,
            Command::Tool(name) => {
                if self.chat.select_tool(&name) {
                    write_card(&self.chat, &mut out)?;
                } else {
                    eprintln!("no tool named {name}");
                }
            }
            Command::Card => write_card(&self.chat, &mut out)?,
            Command::Telemetry => write_telemetry(&self.chat, &mut out)?,
            Command::Clear => self.chat.clear_telemetry(),
            Command::New => {
                self.printer.finish(&mut out)?;
                self.chat.new_conversation();
                self.printer.reset();
            }
            Command::Rt(mode) => {
                self.rt_mode = mode;
                eprintln!("rt mode: {mode}");
            }
            Command::Cancel => {
                if self.chat.cancel() {
                    self.printer.finish(&mut out)?;
                    eprintln!("(cancelled)");
                }
            }
            Command::Help => writeln!(out, "{HELP}")?,
            Command::Quit => {}
        }
        Ok(())
    }
}
