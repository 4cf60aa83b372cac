//! Command parser task.
//!
//! The parser is the sequential consumer of inbound frames and the only place
//! where command side effects run. It owns the session's [`Player`] and hands
//! the final state back when it stops.

use crate::connection::diagnostics::{SessionEvent, SessionLog};
use crate::connection::player::Player;
use crate::messaging::types::{ClientInfo, Command};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Response to a command whose `type` is not recognised.
pub const INVALID_COMMAND: &str = "Invalid command type!";

/// Decodes inbound frames and applies them to one player's state.
pub struct CommandParser {
    player: Player,
    outbound: mpsc::Sender<String>,
    max_username_len: usize,
    cancel: CancellationToken,
    log: Arc<dyn SessionLog>,
}

impl CommandParser {
    pub fn new(
        player: Player,
        outbound: mpsc::Sender<String>,
        max_username_len: usize,
        cancel: CancellationToken,
        log: Arc<dyn SessionLog>,
    ) -> Self {
        Self {
            player,
            outbound,
            max_username_len,
            cancel,
            log,
        }
    }

    /// Processes frames until the inbound queue closes or the session is
    /// cancelled, then returns the player's final state.
    ///
    /// Frames already queued are preferred over the cancellation signal.
    /// Dropping the parser's outbound sender on return is what lets the
    /// writer observe a closed queue.
    pub async fn run(mut self, mut inbound: mpsc::Receiver<Vec<u8>>) -> Player {
        loop {
            let frame = tokio::select! {
                biased;
                frame = inbound.recv() => frame,
                _ = self.cancel.cancelled() => None,
            };
            let Some(frame) = frame else { break };
            self.handle_frame(&frame).await;
        }

        self.log.record(self.player.id(), SessionEvent::ParserStopped);
        self.player
    }

    async fn handle_frame(&mut self, frame: &[u8]) {
        match Command::decode(frame) {
            Ok(command) => self.dispatch(command).await,
            Err(e) => self.record(SessionEvent::MalformedCommand {
                error: e.to_string(),
            }),
        }
    }

    async fn dispatch(&mut self, command: Command) {
        match command {
            Command::SetUsername(username) => self.set_username(&username).await,
            Command::Move(_) => self.record(SessionEvent::MoveIgnored),
            Command::Unknown(kind) => {
                self.record(SessionEvent::UnknownCommand { kind });
                self.send_error(INVALID_COMMAND).await;
            }
        }
    }

    async fn set_username(&mut self, username: &str) {
        match self.player.set_username(username, self.max_username_len) {
            Ok(()) => self.record(SessionEvent::UsernameSet {
                username: username.to_owned(),
            }),
            Err(error) => {
                let message = error.to_string();
                self.record(SessionEvent::UsernameRejected { error });
                self.send_error(&message).await;
            }
        }
    }

    /// Enqueues an error envelope. Best effort: encoding failures are only
    /// logged, and nothing is enqueued once the session is cancelled.
    async fn send_error(&self, message: &str) {
        let payload = match serde_json::to_string(&ClientInfo::error(message)) {
            Ok(payload) => payload,
            Err(e) => {
                self.record(SessionEvent::EncodeFailed {
                    error: e.to_string(),
                });
                return;
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {}
            _ = self.outbound.send(payload) => {}
        }
    }

    fn record(&self, event: SessionEvent) {
        self.log.record(self.player.id(), event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::diagnostics::RecordingLog;
    use crate::connection::player::{PlayerId, Status};

    struct Harness {
        inbound: mpsc::Sender<Vec<u8>>,
        outbound: mpsc::Receiver<String>,
        cancel: CancellationToken,
        log: Arc<RecordingLog>,
        parser: tokio::task::JoinHandle<Player>,
    }

    fn start() -> Harness {
        let (inbound_tx, inbound_rx) = mpsc::channel(16);
        let (outbound_tx, outbound_rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();
        let log = Arc::new(RecordingLog::new());
        let parser = CommandParser::new(
            Player::new(PlayerId::new(), None),
            outbound_tx,
            14,
            cancel.clone(),
            log.clone(),
        );
        Harness {
            inbound: inbound_tx,
            outbound: outbound_rx,
            cancel,
            log,
            parser: tokio::spawn(parser.run(inbound_rx)),
        }
    }

    async fn send(harness: &Harness, frame: &str) {
        harness
            .inbound
            .send(frame.as_bytes().to_vec())
            .await
            .expect("parser alive");
    }

    fn drain(outbound: &mut mpsc::Receiver<String>) -> Vec<ClientInfo> {
        let mut responses = Vec::new();
        while let Ok(payload) = outbound.try_recv() {
            responses.push(serde_json::from_str(&payload).expect("valid envelope"));
        }
        responses
    }

    #[tokio::test]
    async fn username_scenario() {
        let mut harness = start();
        send(&harness, r#"{"type":"username","value":"Ada"}"#).await;
        send(&harness, r#"{"type":"username","value":"Bob"}"#).await;
        send(&harness, r#"{"type":"wizard"}"#).await;

        let Harness { inbound, parser, .. } = harness;
        drop(inbound);
        let player = parser.await.unwrap();

        assert_eq!(player.username(), "Ada");
        assert_eq!(player.status(), Status::ReadyToPlay);
        assert_eq!(
            drain(&mut harness.outbound),
            vec![
                ClientInfo::error("Username already set!"),
                ClientInfo::error(INVALID_COMMAND),
            ]
        );
    }

    #[tokio::test]
    async fn too_long_username_leaves_state_unchanged() {
        let mut harness = start();
        send(&harness, r#"{"type":"username","value":"fifteen-chars!!"}"#).await;

        let Harness { inbound, parser, .. } = harness;
        drop(inbound);
        let player = parser.await.unwrap();

        assert_eq!(player.status(), Status::NoUsername);
        assert_eq!(player.username(), "");
        assert_eq!(
            drain(&mut harness.outbound),
            vec![ClientInfo::error("Username is too long! Max length 14")]
        );
    }

    #[tokio::test]
    async fn malformed_frames_are_dropped_silently() {
        let mut harness = start();
        send(&harness, "{not json").await;
        send(&harness, r#"{"type":"move","value":"north"}"#).await;
        send(&harness, r#"{"type":"username","value":"Ada"}"#).await;

        let Harness { inbound, parser, log, .. } = harness;
        drop(inbound);
        let player = parser.await.unwrap();

        assert_eq!(player.username(), "Ada", "parser survives a malformed frame");
        assert!(drain(&mut harness.outbound).is_empty());
        assert_eq!(
            log.count(|e| matches!(e, SessionEvent::MalformedCommand { .. })),
            1
        );
        assert_eq!(log.count(|e| *e == SessionEvent::MoveIgnored), 1);
    }

    #[tokio::test]
    async fn unknown_commands_do_not_touch_state() {
        let mut harness = start();
        for kind in ["wizard", "USERNAME", "", "moves"] {
            send(&harness, &format!(r#"{{"type":"{kind}","value":"x"}}"#)).await;
        }

        let Harness { inbound, parser, log, .. } = harness;
        drop(inbound);
        let player = parser.await.unwrap();

        assert_eq!(player.status(), Status::NoUsername);
        let responses = drain(&mut harness.outbound);
        assert_eq!(responses.len(), 4);
        assert!(responses.iter().all(|r| *r == ClientInfo::error(INVALID_COMMAND)));
        assert_eq!(
            log.count(|e| matches!(e, SessionEvent::UnknownCommand { .. })),
            4
        );
    }

    #[tokio::test]
    async fn empty_object_is_an_invalid_command() {
        let mut harness = start();
        send(&harness, "{}").await;

        let Harness { inbound, parser, log, .. } = harness;
        drop(inbound);
        let player = parser.await.unwrap();

        assert_eq!(player.status(), Status::NoUsername);
        assert_eq!(
            drain(&mut harness.outbound),
            vec![ClientInfo::error(INVALID_COMMAND)]
        );
        assert_eq!(
            log.count(|e| matches!(e, SessionEvent::MalformedCommand { .. })),
            0
        );
    }

    #[tokio::test]
    async fn null_value_sets_an_empty_username() {
        let mut harness = start();
        send(&harness, r#"{"type":"username","value":null}"#).await;
        send(&harness, r#"{"type":"username","value":"Ada"}"#).await;

        let Harness { inbound, parser, .. } = harness;
        drop(inbound);
        let player = parser.await.unwrap();

        assert_eq!(player.status(), Status::ReadyToPlay);
        assert_eq!(player.username(), "");
        assert_eq!(
            drain(&mut harness.outbound),
            vec![ClientInfo::error("Username already set!")]
        );
    }

    #[tokio::test]
    async fn cancellation_stops_the_parser() {
        let harness = start();
        harness.cancel.cancel();
        let player = harness.parser.await.unwrap();
        assert_eq!(player.status(), Status::NoUsername);
        assert_eq!(harness.log.events().last(), Some(&SessionEvent::ParserStopped));
    }
}
