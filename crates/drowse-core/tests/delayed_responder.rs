use drowse_core::{
    ConnectionTracker, DelayedResponder, Router, Server, ServerConfig, DEFAULT_BODY, DEFAULT_DELAY,
};
use futures_util::future::join_all;
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Slack allowed on top of the nap before a request counts as "late"
const SLACK: Duration = Duration::from_secs(2);

struct TestServer {
    base_url: String,
    tracker: Arc<ConnectionTracker>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    fn spawn() -> Self {
        // Same router as the binary, but bound to an ephemeral port.
        let router = Router::with_responder(DelayedResponder::default());
        let listener =
            Server::bind("127.0.0.1:0".parse().unwrap()).expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let server = Server::new(ServerConfig::default(), router);
        let tracker = server.tracker();
        let handle = tokio::spawn(async move {
            server.serve(listener).await.unwrap();
        });

        Self {
            base_url,
            tracker,
            handle,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn addr(&self) -> &str {
        self.base_url.trim_start_matches("http://")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Write a raw request and read the response head, plus the body when asked.
async fn raw_exchange(addr: &str, request: &[u8], with_body: bool) -> (String, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(request).await.unwrap();

    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = stream.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        let text = String::from_utf8_lossy(&buf);
        if let Some((_, body)) = text.split_once("\r\n\r\n") {
            if !with_body || body.len() >= DEFAULT_BODY.len() {
                break;
            }
        }
    }

    let text = String::from_utf8_lossy(&buf).into_owned();
    match text.split_once("\r\n\r\n") {
        Some((head, body)) => (head.to_string(), body.to_string()),
        None => (text, String::new()),
    }
}

/// Poll until every connection task has finished.
async fn wait_for_idle(tracker: &ConnectionTracker) {
    for _ in 0..100 {
        if tracker.count() == 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("{} connection(s) still open", tracker.count());
}

#[tokio::test(flavor = "multi_thread")]
async fn get_root_naps_then_answers() {
    let server = TestServer::spawn();
    let client = reqwest::Client::new();

    let start = Instant::now();
    let res = client.get(server.url("/")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), DEFAULT_BODY);

    let elapsed = start.elapsed();
    assert!(elapsed >= DEFAULT_DELAY, "answered after {:?}", elapsed);
    assert!(elapsed < DEFAULT_DELAY + SLACK, "answered after {:?}", elapsed);
}

#[tokio::test(flavor = "multi_thread")]
async fn post_any_path_gets_same_answer() {
    let server = TestServer::spawn();
    let client = reqwest::Client::new();

    let start = Instant::now();
    let res = client
        .post(server.url("/anything/path?x=1"))
        .header("content-type", "application/json")
        .body(r#"{"ignored":true}"#)
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "ciao :)");
    assert!(start.elapsed() >= DEFAULT_DELAY);
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_requests_are_not_serialized() {
    let server = TestServer::spawn();
    let client = reqwest::Client::new();

    let start = Instant::now();
    let requests = (0..5).map(|i| {
        let client = client.clone();
        let url = server.url(&format!("/req/{}", i));
        async move { client.get(url).send().await.unwrap() }
    });
    let responses = join_all(requests).await;

    for res in responses {
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.text().await.unwrap(), DEFAULT_BODY);
    }

    let elapsed = start.elapsed();
    assert!(elapsed >= DEFAULT_DELAY);
    assert!(elapsed < DEFAULT_DELAY + SLACK, "5 requests took {:?}", elapsed);
}

#[tokio::test(flavor = "multi_thread")]
async fn client_hanging_up_mid_nap_does_not_stop_server() {
    let server = TestServer::spawn();

    let mut stream = tokio::net::TcpStream::connect(server.addr()).await.unwrap();
    stream
        .write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    drop(stream);

    let client = reqwest::Client::new();
    let res = client
        .get(server.url("/after"))
        .header("connection", "close")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), DEFAULT_BODY);
    drop(client);

    assert!(!server.handle.is_finished());
    wait_for_idle(&server.tracker).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn non_path_request_targets_get_the_same_answer() {
    let server = TestServer::spawn();

    let start = Instant::now();
    let options = raw_exchange(
        server.addr(),
        b"OPTIONS * HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
        true,
    );
    let connect = raw_exchange(
        server.addr(),
        b"CONNECT example.com:443 HTTP/1.1\r\nHost: example.com:443\r\n\r\n",
        false,
    );
    let ((options_head, options_body), (connect_head, _)) = tokio::join!(options, connect);

    assert!(options_head.starts_with("HTTP/1.1 200 OK"), "OPTIONS * -> {}", options_head);
    assert_eq!(options_body, DEFAULT_BODY);
    assert!(connect_head.starts_with("HTTP/1.1 200 OK"), "CONNECT -> {}", connect_head);
    assert!(start.elapsed() >= DEFAULT_DELAY);
}
