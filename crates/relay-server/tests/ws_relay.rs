use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use relay_bus::{Hub, RouteTable};
use relay_server::{RelayServer, SerialFeeder};
use relay_types::OutboundFrame;
use serde_json::{Value, json};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

async fn start_relay() -> (Arc<Hub>, SocketAddr) {
    let hub = Arc::new(Hub::new(RouteTable::default()));
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let server = RelayServer::new(Arc::clone(&hub));
    tokio::spawn(async move {
        let _ = server.serve(listener).await;
    });
    (hub, addr)
}

async fn connect(addr: SocketAddr) -> Client {
    let (ws, _) = connect_async(format!("ws://{addr}/")).await.expect("ws connect");
    ws
}

async fn wait_for_sessions(hub: &Hub, expected: usize) {
    timeout(Duration::from_secs(3), async {
        while hub.registry().len() != expected {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("registry never reached {expected} sessions"));
}

async fn emit(client: &mut Client, event: &str, data: Value) {
    let text = json!({"event": event, "data": data}).to_string();
    client.send(Message::Text(text.into())).await.expect("send");
}

async fn next_frame(client: &mut Client) -> OutboundFrame {
    timeout(Duration::from_secs(3), async {
        loop {
            match client.next().await {
                Some(Ok(Message::Text(text))) => {
                    return serde_json::from_str::<OutboundFrame>(text.as_str())
                        .expect("outbound frame");
                }
                Some(Ok(_)) => continue,
                other => panic!("connection ended: {other:?}"),
            }
        }
    })
    .await
    .expect("timed out waiting for a frame")
}

async fn http_get(addr: SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.expect("tcp connect");
    let request = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\n\r\n");
    stream.write_all(request.as_bytes()).await.expect("write");
    let mut response = String::new();
    stream.read_to_string(&mut response).await.expect("read");
    response
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn two_clients_share_feedback_until_one_leaves() {
    let (hub, addr) = start_relay().await;
    let mut a = connect(addr).await;
    let mut b = connect(addr).await;
    wait_for_sessions(&hub, 2).await;

    emit(&mut a, "from_browser", json!({"x": 1})).await;

    let at_a = next_frame(&mut a).await;
    let at_b = next_frame(&mut b).await;
    assert_eq!(at_a.event, "feedback");
    assert_eq!(at_a.data.data, json!({"x": 1}));
    assert_eq!(at_a, at_b, "both sessions see the same envelope");

    b.close(None).await.expect("close b");
    wait_for_sessions(&hub, 1).await;

    emit(&mut a, "from_browser", json!({"x": 2})).await;
    let again = next_frame(&mut a).await;
    assert_eq!(again.data.data, json!({"x": 2}));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn message_is_not_broadcast() {
    let (hub, addr) = start_relay().await;
    let mut a = connect(addr).await;
    let mut b = connect(addr).await;
    wait_for_sessions(&hub, 2).await;

    emit(&mut a, "message", json!("just saying hi")).await;
    a.send(Message::Text("unnamed send".to_string().into())).await.expect("send");
    emit(&mut a, "from_browser", json!("marker")).await;

    // Frames from one session are handled in order, so the first frame each
    // client sees must be the marker's feedback.
    for client in [&mut a, &mut b] {
        let frame = next_frame(client).await;
        assert_eq!(frame.event, "feedback");
        assert_eq!(frame.data.data, json!("marker"));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn serial_feeder_updates_pages() {
    let (hub, addr) = start_relay().await;
    let mut page = connect(addr).await;
    wait_for_sessions(&hub, 1).await;

    let feeder = SerialFeeder::new(format!("ws://{addr}/"));
    let input = b"{\"left\": 300, \"right\": 700}\n\nraw line\n";
    let sent = feeder.run(&input[..]).await.expect("feeder run");
    assert_eq!(sent, 2);

    let first = next_frame(&mut page).await;
    assert_eq!(first.event, "update");
    assert_eq!(first.data.data, json!({"left": 300, "right": 700}));

    let second = next_frame(&mut page).await;
    assert_eq!(second.event, "update");
    assert_eq!(second.data.data, json!("raw line"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn serves_static_pages() {
    let (_hub, addr) = start_relay().await;

    let index = http_get(addr, "/").await;
    assert!(index.starts_with("HTTP/1.1 200 OK"));
    assert!(index.contains("href=\"/pong\""));

    let pong = http_get(addr, "/pong").await;
    assert!(pong.starts_with("HTTP/1.1 200 OK"));
    assert!(pong.contains("from_browser"));

    let missing = http_get(addr, "/nope").await;
    assert!(missing.starts_with("HTTP/1.1 404 Not Found"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn client_close_gets_close_reply() {
    let (hub, addr) = start_relay().await;
    let mut client = connect(addr).await;
    wait_for_sessions(&hub, 1).await;

    client.send(Message::Close(None)).await.expect("send close");

    let reply = timeout(Duration::from_secs(3), client.next())
        .await
        .expect("timed out waiting for the close reply");
    assert!(
        matches!(reply, Some(Ok(Message::Close(_)))),
        "expected a close frame, got {reply:?}"
    );
    wait_for_sessions(&hub, 0).await;
}
