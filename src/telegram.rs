//! Remote Command Poller: long-polls a Telegram bot's getUpdates feed and
//! forwards recognized chat commands onto the command bus.
//!
//! The loop never terminates and never backs off — one fetch, one fixed
//! sleep, forever. The only state is the update cursor, owned here and held
//! in memory only: after a restart old updates may be fetched again, which
//! is an accepted at-least-once behavior.

use anyhow::{Result, bail};
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::command::{Command, CommandBus};
use crate::config::TelegramConfig;

#[derive(Debug, Deserialize)]
struct UpdateResponse {
    ok: bool,
    #[serde(default)]
    result: Vec<Update>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    text: Option<String>,
}

pub struct TelegramPoller {
    client: reqwest::Client,
    config: TelegramConfig,
    bus: CommandBus,
    /// Identifier of the last consumed update. The next fetch requests
    /// strictly greater identifiers only.
    cursor: i64,
}

impl TelegramPoller {
    pub fn new(config: TelegramConfig, bus: CommandBus) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
            bus,
            cursor: 0,
        }
    }

    /// Poll until the process ends. Every failure mode — transport error,
    /// malformed body, feed refusing the request — is logged and retried at
    /// the same cadence.
    pub async fn run(mut self) {
        info!(
            "remote command poller started (interval {:?})",
            self.config.poll_interval
        );
        loop {
            if let Err(e) = self.poll_once().await {
                warn!("update fetch failed: {:#}", e);
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    async fn poll_once(&mut self) -> Result<()> {
        let url = format!(
            "{}/bot{}/getUpdates",
            self.config.api_base, self.config.bot_token
        );
        let response: UpdateResponse = self
            .client
            .get(&url)
            .query(&[("offset", self.next_offset())])
            .send()
            .await?
            .json()
            .await?;

        if !response.ok {
            bail!("feed answered ok=false");
        }
        self.apply_batch(response.result).await;
        Ok(())
    }

    /// Offset parameter for the next fetch: strictly after the cursor.
    fn next_offset(&self) -> i64 {
        self.cursor + 1
    }

    /// Process one batch in feed order. The cursor commits per update,
    /// before dispatch — kept from the original design: a crash between
    /// commit and dispatch drops that command rather than replaying it.
    /// Unrecognized or text-less updates advance the cursor and dispatch
    /// nothing.
    async fn apply_batch(&mut self, updates: Vec<Update>) {
        for update in updates {
            self.cursor = update.update_id;
            let text = update.message.and_then(|m| m.text);
            match text.as_deref().and_then(Command::from_chat_text) {
                Some(command) => {
                    debug!("update {} -> command '{}'", self.cursor, command);
                    self.bus.dispatch(command).await;
                }
                None => debug!("update {} carries no command", self.cursor),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;

    fn poller(capacity: usize) -> (TelegramPoller, mpsc::Receiver<Command>) {
        let (bus, rx) = CommandBus::new(capacity);
        let config = TelegramConfig {
            api_base: "http://unused.invalid".into(),
            bot_token: "0:test".into(),
            poll_interval: Duration::from_secs(1),
        };
        (TelegramPoller::new(config, bus), rx)
    }

    fn update(id: i64, text: Option<&str>) -> Update {
        Update {
            update_id: id,
            message: text.map(|t| ChatMessage {
                text: Some(t.to_string()),
            }),
        }
    }

    #[tokio::test]
    async fn cursor_tracks_maximum_of_batch() {
        let (mut p, _rx) = poller(8);
        p.apply_batch(vec![
            update(5, Some("/on")),
            update(7, Some("/off")),
            update(9, Some("/state")),
        ])
        .await;
        assert_eq!(p.cursor, 9);
        assert_eq!(p.next_offset(), 10);
    }

    #[tokio::test]
    async fn unrecognized_text_advances_cursor_without_dispatch() {
        let (mut p, mut rx) = poller(8);
        p.cursor = 10;
        p.apply_batch(vec![update(12, Some("/on")), update(13, Some("/unknown"))])
            .await;

        assert_eq!(p.cursor, 13);
        assert_eq!(rx.try_recv(), Ok(Command::On));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn textless_updates_are_consumed_silently() {
        let (mut p, mut rx) = poller(8);
        p.apply_batch(vec![
            update(1, None),
            Update {
                update_id: 2,
                message: Some(ChatMessage { text: None }),
            },
            update(3, Some("/photo")),
        ])
        .await;

        assert_eq!(p.cursor, 3);
        assert_eq!(rx.try_recv(), Ok(Command::Send));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn empty_batch_leaves_cursor_untouched() {
        let (mut p, _rx) = poller(8);
        p.cursor = 41;
        p.apply_batch(Vec::new()).await;
        assert_eq!(p.cursor, 41);
        assert_eq!(p.next_offset(), 42);
    }

    #[test]
    fn parses_real_feed_shape() {
        let body = r#"{
            "ok": true,
            "result": [
                {"update_id": 100, "message": {"message_id": 7, "text": "/picture", "chat": {"id": 1}}},
                {"update_id": 101, "message": {"message_id": 8, "chat": {"id": 1}}},
                {"update_id": 102, "edited_message": {"text": "/on"}}
            ]
        }"#;
        let parsed: UpdateResponse = serde_json::from_str(body).unwrap();
        assert!(parsed.ok);
        assert_eq!(parsed.result.len(), 3);
        assert_eq!(parsed.result[0].update_id, 100);
        assert_eq!(
            parsed.result[0].message.as_ref().unwrap().text.as_deref(),
            Some("/picture")
        );
        assert!(parsed.result[1].message.as_ref().unwrap().text.is_none());
        // Non-message updates deserialize with no message at all.
        assert!(parsed.result[2].message.is_none());
    }

    #[test]
    fn error_body_fails_parse_or_flags_not_ok() {
        let parsed: UpdateResponse =
            serde_json::from_str(r#"{"ok": false, "error_code": 401, "description": "Unauthorized"}"#)
                .unwrap();
        assert!(!parsed.ok);
        assert!(parsed.result.is_empty());
    }
}
