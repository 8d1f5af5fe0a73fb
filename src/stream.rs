//! Ack-gated frame streaming.
//!
//! One session per connected WebSocket client. A fixed-period ticker drives
//! sends, but a frame only goes out when the client has acknowledged the
//! previous one — so a slow client gets frames less often instead of a
//! growing backlog, and at most one frame is ever in flight per session.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::frame::FrameSource;

/// Pacing state for one session.
///
/// A session starts ready to send, so the first tick after connect
/// transmits immediately. Any inbound data message re-arms the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckGate {
    /// Client has consumed the last frame (or none was sent yet).
    AwaitingAck,
    /// A frame is in flight; ticks are skipped until the client acks.
    Sent,
}

impl AckGate {
    pub fn new() -> Self {
        AckGate::AwaitingAck
    }

    /// True when a tick should transmit a frame.
    pub fn ready(&self) -> bool {
        matches!(self, AckGate::AwaitingAck)
    }

    /// A frame was just transmitted.
    pub fn sent(&mut self) {
        *self = AckGate::Sent;
    }

    /// The client acknowledged. Content is irrelevant by protocol: every
    /// data message from the client counts.
    pub fn ack(&mut self) {
        *self = AckGate::AwaitingAck;
    }
}

impl Default for AckGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Run one streaming session until the client goes away.
///
/// The ticker lives inside this task, so it stops firing the moment the
/// session ends — nothing keeps ticking against a dead connection.
pub async fn run_session(mut socket: WebSocket, frames: Arc<FrameSource>, period: Duration) {
    info!("stream client connected");

    let mut gate = AckGate::new();
    let mut ticker = tokio::time::interval(period);
    // A stalled period is skipped, not bursted: the client was not ready
    // for it anyway.
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if !gate.ready() {
                    continue;
                }
                if socket.send(Message::Binary(frames.latest())).await.is_err() {
                    debug!("frame send failed, closing session");
                    break;
                }
                gate.sent();
            }
            inbound = socket.recv() => {
                match inbound {
                    Some(Ok(Message::Text(_) | Message::Binary(_))) => gate.ack(),
                    // Keepalive traffic is not an acknowledgement; the
                    // client signals consumption with a data message.
                    Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("stream client disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        debug!("stream transport error: {}", e);
                        break;
                    }
                }
            }
        }
    }
}
