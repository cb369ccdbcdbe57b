//! Terminal rendering of controller state.

use std::io::{self, Write};

use rtchat_client::{ChatController, ConversationLog, Role};

/// Prints the assistant reply incrementally as the log grows.
///
/// Tracks what has already been written for the last assistant turn so a
/// token append prints only the new suffix, while a draft that rewrites the
/// text reprints it on a fresh line.
#[derive(Debug, Default)]
pub struct ReplyPrinter {
    turns: usize,
    shown: String,
}

impl ReplyPrinter {
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn update(&mut self, log: &ConversationLog, out: &mut impl Write) -> io::Result<()> {
        let Some(turn) = log.last() else {
            self.reset();
            return Ok(());
        };
        if log.len() != self.turns {
            if !self.shown.is_empty() {
                writeln!(out)?;
            }
            self.turns = log.len();
            self.shown.clear();
        }
        if turn.role != Role::Assistant || turn.text == self.shown {
            return Ok(());
        }
        match turn.text.strip_prefix(self.shown.as_str()) {
            Some(rest) => write!(out, "{rest}")?,
            None => write!(out, "\n{}", turn.text)?,
        }
        self.shown.clone_from(&turn.text);
        out.flush()
    }

    /// Ends the current reply line, if one is open.
    pub fn finish(&mut self, out: &mut impl Write) -> io::Result<()> {
        if !self.shown.is_empty() {
            writeln!(out)?;
            self.shown.clear();
        }
        out.flush()
    }
}

pub fn write_tools(chat: &ChatController, out: &mut impl Write) -> io::Result<()> {
    let registry = chat.registry();
    if registry.is_empty() {
        return writeln!(out, "(no tools yet)");
    }
    for key in registry.selectable_keys() {
        let marker = if registry.selected() == Some(key) { "*" } else { " " };
        writeln!(out, "{marker} {key}")?;
    }
    Ok(())
}

pub fn write_card(chat: &ChatController, out: &mut impl Write) -> io::Result<()> {
    match chat.selected_card() {
        Some(card) => write!(out, "{card}"),
        None => writeln!(out, "(no tool selected)"),
    }
}

pub fn write_telemetry(chat: &ChatController, out: &mut impl Write) -> io::Result<()> {
    let ring = chat.telemetry();
    if ring.is_empty() {
        return writeln!(out, "(no telemetry)");
    }
    writeln!(out, "{}", ring.as_str())
}
