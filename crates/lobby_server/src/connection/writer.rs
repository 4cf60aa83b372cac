//! Outbound writer task.
//!
//! The writer is the only task that writes to the connection. It multiplexes
//! queued application payloads and heartbeat pings onto one ordered stream of
//! whole WebSocket messages.

use super::diagnostics::{SessionEvent, SessionLog};
use super::player::PlayerId;
use crate::error::WriteError;
use futures_util::{Sink, SinkExt};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

/// Timing and batching knobs for [`run_writer`].
#[derive(Debug, Clone, Copy)]
pub struct WriterSettings {
    pub write_wait: Duration,
    pub ping_period: Duration,
    pub max_coalesce: usize,
}

/// Runs the outbound writer until the queue closes, a write fails, or the
/// session is cancelled.
///
/// Each dequeued payload is merged with whatever is already waiting in the
/// queue, up to `max_coalesce` payloads, and sent as one message. Pings are
/// written directly and never pass through the queue. Every write is bounded
/// by `write_wait`; a failed or timed out write is treated as a dead
/// connection and cancels the session.
///
/// # Arguments
///
/// * `sink` - Write half of the connection
/// * `outbound` - Consumer side of the parser → writer queue
/// * `settings` - Write deadline, heartbeat period and coalescing limit
/// * `cancel` - Session-wide cancellation token
pub async fn run_writer<S>(
    player_id: PlayerId,
    mut sink: S,
    mut outbound: mpsc::Receiver<String>,
    settings: WriterSettings,
    cancel: CancellationToken,
    log: Arc<dyn SessionLog>,
) where
    S: Sink<Message> + Unpin,
    S::Error: fmt::Display,
{
    log.record(player_id, SessionEvent::WriterStarted);

    let mut ticker = interval_at(Instant::now() + settings.ping_period, settings.ping_period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                send_close(player_id, &mut sink, settings.write_wait, log.as_ref()).await;
                break;
            }
            item = outbound.recv() => {
                let Some(first) = item else {
                    log.record(player_id, SessionEvent::OutboundClosed);
                    send_close(player_id, &mut sink, settings.write_wait, log.as_ref()).await;
                    break;
                };

                let (payload, items) = coalesce(first, &mut outbound, settings.max_coalesce);
                let bytes = payload.len();
                match send_with_deadline(&mut sink, Message::text(payload), settings.write_wait).await {
                    Ok(()) => log.record(player_id, SessionEvent::MessageSent { items, bytes }),
                    Err(e) => {
                        log.record(player_id, SessionEvent::WriteFailed { error: e.to_string() });
                        cancel.cancel();
                        break;
                    }
                }
            }
            _ = ticker.tick() => {
                match send_with_deadline(&mut sink, Message::Ping(Default::default()), settings.write_wait).await {
                    Ok(()) => log.record(player_id, SessionEvent::PingSent),
                    Err(e) => {
                        log.record(player_id, SessionEvent::PingFailed { error: e.to_string() });
                        cancel.cancel();
                        break;
                    }
                }
            }
        }
    }

    drop(ticker);
    log.record(player_id, SessionEvent::WriterStopped);
}

/// Appends up to `limit - 1` already-queued payloads to `first`.
///
/// Never waits: only items present in the queue at this instant are taken,
/// in queue order.
fn coalesce(first: String, outbound: &mut mpsc::Receiver<String>, limit: usize) -> (String, usize) {
    let mut payload = first;
    let mut items = 1;
    while items < limit {
        match outbound.try_recv() {
            Ok(next) => {
                payload.push_str(&next);
                items += 1;
            }
            Err(_) => break,
        }
    }
    (payload, items)
}

async fn send_with_deadline<S>(sink: &mut S, message: Message, write_wait: Duration) -> Result<(), WriteError>
where
    S: Sink<Message> + Unpin,
    S::Error: fmt::Display,
{
    match tokio::time::timeout(write_wait, sink.send(message)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(WriteError::Transport(e.to_string())),
        Err(_) => Err(WriteError::TimedOut(write_wait)),
    }
}

async fn send_close<S>(player_id: PlayerId, sink: &mut S, write_wait: Duration, log: &dyn SessionLog)
where
    S: Sink<Message> + Unpin,
    S::Error: fmt::Display,
{
    if let Err(e) = send_with_deadline(sink, Message::Close(None), write_wait).await {
        log.record(player_id, SessionEvent::CloseFailed { error: e.to_string() });
    }
}
