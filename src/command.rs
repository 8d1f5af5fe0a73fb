//! Command tokens and the dispatch bus.
//!
//! Both command sources (the local HTTP gateway and the remote feed poller)
//! funnel into one bounded channel; a single consumer task serializes all
//! execution. See `executor.rs` for the consumer side.

use tokio::sync::mpsc;
use tracing::warn;

/// A platform action request. Opaque beyond its token — dispatched and
/// discarded, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    On,
    Off,
    Send,
    State,
}

impl Command {
    /// The string handed to the action executor.
    pub fn token(&self) -> &'static str {
        match self {
            Command::On => "on",
            Command::Off => "off",
            Command::Send => "send",
            Command::State => "state",
        }
    }

    /// Map remote chat text to a command. Unrecognized text maps to nothing;
    /// the poller still advances its cursor past such messages.
    pub fn from_chat_text(text: &str) -> Option<Command> {
        match text {
            "/photo" | "/picture" => Some(Command::Send),
            "/on" => Some(Command::On),
            "/off" => Some(Command::Off),
            "/state" => Some(Command::State),
            _ => None,
        }
    }
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

/// Producer handle for the command channel. Cloned freely across handlers
/// and the poller task.
#[derive(Clone)]
pub struct CommandBus {
    tx: mpsc::Sender<Command>,
}

impl CommandBus {
    /// Create the bus and the receiver for the executor task.
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Command>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Fire-and-forget dispatch. A full queue briefly holds the producer; a
    /// closed channel is logged and the command dropped, never surfaced —
    /// callers have already answered their request and have no one to
    /// report to.
    pub async fn dispatch(&self, command: Command) {
        if self.tx.send(command).await.is_err() {
            warn!("command executor is gone, dropping '{}'", command);
        }
    }
}
