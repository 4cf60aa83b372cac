//! End-to-end tests over real TCP sockets and WebSocket handshakes.

use futures_util::{SinkExt, StreamExt};
use lobby_server::{
    ClientInfo, DisconnectReason, GameServer, RecordingLog, ServerConfig, SessionEvent,
    SessionLog,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct TestServer {
    server: Arc<GameServer>,
    addr: SocketAddr,
    log: Arc<RecordingLog>,
    serving: JoinHandle<()>,
}

async fn start(config: ServerConfig) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has an address");
    let log = Arc::new(RecordingLog::new());
    let server = Arc::new(GameServer::with_log(
        config,
        log.clone() as Arc<dyn SessionLog>,
    ));

    let serving = tokio::spawn({
        let server = server.clone();
        async move {
            server.serve(listener).await.expect("Server failed");
        }
    });

    TestServer {
        server,
        addr,
        log,
        serving,
    }
}

async fn connect(addr: SocketAddr) -> Client {
    let (client, _response) = connect_async(format!("ws://{addr}"))
        .await
        .expect("Failed to connect");
    client
}

async fn wait_for_players(server: &GameServer, expected: usize) {
    let registry = server.registry();
    tokio::time::timeout(Duration::from_secs(5), async {
        while registry.player_count().await != expected {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("Player count never settled");
}

/// Reads until `count` envelopes arrived, splitting coalesced messages.
async fn read_envelopes(client: &mut Client, count: usize) -> Vec<ClientInfo> {
    let mut envelopes = Vec::new();
    while envelopes.len() < count {
        let message = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("Timed out waiting for a response")
            .expect("Connection ended early")
            .expect("Transport error");
        if let Message::Text(text) = message {
            let batch = serde_json::Deserializer::from_str(text.as_str())
                .into_iter::<ClientInfo>()
                .collect::<Result<Vec<_>, _>>()
                .expect("Server sent invalid envelopes");
            envelopes.extend(batch);
        }
    }
    envelopes
}

#[tokio::test(flavor = "multi_thread")]
async fn username_flow_over_websocket() {
    let test = start(ServerConfig::default()).await;
    let mut client = connect(test.addr).await;
    wait_for_players(&test.server, 1).await;

    for frame in [
        r#"{"type":"username","value":"Ada"}"#,
        r#"{"type":"username","value":"Bob"}"#,
        r#"{"type":"wizard","value":""}"#,
        r#"{"type":"move","value":"north"}"#,
    ] {
        client
            .send(Message::text(frame))
            .await
            .expect("Failed to send command");
    }

    assert_eq!(
        read_envelopes(&mut client, 2).await,
        vec![
            ClientInfo::error("Username already set!"),
            ClientInfo::error("Invalid command type!"),
        ]
    );

    client.close(None).await.expect("Failed to close");
    wait_for_players(&test.server, 0).await;

    let events = test.log.events();
    assert!(events.contains(&SessionEvent::UsernameSet {
        username: "Ada".to_string()
    }));
    assert!(events.contains(&SessionEvent::MoveIgnored));
    assert_eq!(
        test.log
            .count(|e| matches!(e, SessionEvent::Disconnected { .. })),
        1
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn oversized_frames_end_the_session() {
    let test = start(ServerConfig::default()).await;
    let mut client = connect(test.addr).await;
    wait_for_players(&test.server, 1).await;

    let oversized = format!(
        r#"{{"type":"username","value":"{}"}}"#,
        "x".repeat(6000)
    );
    // The server may drop the connection before the write finishes.
    let _ = client.send(Message::text(oversized)).await;

    wait_for_players(&test.server, 0).await;
    assert_eq!(
        test.log.count(|e| matches!(
            e,
            SessionEvent::Disconnected {
                reason: DisconnectReason::ReadFailed(_)
            }
        )),
        1
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn connections_beyond_the_limit_are_refused() {
    let config = ServerConfig {
        max_connections: 1,
        ..Default::default()
    };
    let test = start(config).await;
    let _first = connect(test.addr).await;
    wait_for_players(&test.server, 1).await;

    let second = connect_async(format!("ws://{}", test.addr)).await;
    assert!(second.is_err(), "Second client should be refused");
    assert_eq!(test.server.registry().player_count().await, 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn shutdown_closes_every_client() {
    let test = start(ServerConfig::default()).await;
    let mut clients = vec![connect(test.addr).await, connect(test.addr).await];
    wait_for_players(&test.server, 2).await;

    test.server.shutdown().await.expect("Failed to signal shutdown");
    test.serving.await.expect("Serving task panicked");

    for client in clients.iter_mut() {
        let message = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("Timed out waiting for close");
        assert!(matches!(message, Some(Ok(Message::Close(_)))));
    }
    assert_eq!(test.server.registry().player_count().await, 0);
}
