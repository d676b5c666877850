use std::collections::HashMap;
use std::fs;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::thread::JoinHandle;
use std::time::Duration;

use lantern::config::Config;
use lantern::server::{Server, ServerError, ServerState, ShutdownHandle};

const INDEX: &str = "<h1>Hi</h1>";

struct TestServer {
    addr: SocketAddr,
    shutdown: ShutdownHandle,
    thread: Option<JoinHandle<Result<(), ServerError>>>,
    _dir: tempfile::TempDir,
}

impl TestServer {
    fn start() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("www")).unwrap();
        fs::write(dir.path().join("www/index.html"), INDEX).unwrap();

        let config = Config {
            port: 0,
            base_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        let mut server = Server::bind(&config).unwrap();
        let addr = SocketAddr::from(([127, 0, 0, 1], server.local_addr().port()));
        let shutdown = server.shutdown_handle();
        let thread = std::thread::spawn(move || server.run());

        Self {
            addr,
            shutdown,
            thread: Some(thread),
            _dir: dir,
        }
    }

    fn connect(&self) -> Client {
        let stream = TcpStream::connect(self.addr).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();
        Client {
            reader: BufReader::new(stream),
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.stop();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

struct Client {
    reader: BufReader<TcpStream>,
}

#[derive(Debug)]
struct Reply {
    status: u16,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

impl Reply {
    fn header(&self, key: &str) -> Option<&str> {
        self.headers.get(key).map(|v| v.as_str())
    }

    fn text(&self) -> String {
        String::from_utf8(self.body.clone()).unwrap()
    }
}

impl Client {
    fn send(&mut self, raw: &str) {
        self.reader.get_mut().write_all(raw.as_bytes()).unwrap();
    }

    fn request(&mut self, method: &str, path: &str, headers: &[(&str, &str)]) -> Reply {
        let mut raw = format!("{method} {path} HTTP/1.1\r\nHost: localhost\r\n");
        for (k, v) in headers {
            raw.push_str(&format!("{k}: {v}\r\n"));
        }
        raw.push_str("\r\n");
        self.send(&raw);
        self.read_reply(method == "HEAD")
    }

    fn read_reply(&mut self, head_only: bool) -> Reply {
        let mut status_line = String::new();
        self.reader.read_line(&mut status_line).unwrap();
        let status = status_line
            .split(' ')
            .nth(1)
            .and_then(|code| code.parse().ok())
            .unwrap_or_else(|| panic!("bad status line {status_line:?}"));

        let mut headers = HashMap::new();
        loop {
            let mut line = String::new();
            self.reader.read_line(&mut line).unwrap();
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            let (key, value) = line.split_once(':').unwrap();
            headers.insert(key.to_string(), value.trim().to_string());
        }

        let length: usize = headers
            .get("Content-Length")
            .map(|v| v.parse().unwrap())
            .unwrap_or(0);
        let mut body = vec![0; if head_only || status == 304 { 0 } else { length }];
        self.reader.read_exact(&mut body).unwrap();

        Reply {
            status,
            headers,
            body,
        }
    }

    fn is_closed(&mut self) -> bool {
        let mut buf = [0u8; 1];
        matches!(self.reader.read(&mut buf), Ok(0))
    }
}

#[test]
fn test_get_root_serves_index() {
    let server = TestServer::start();
    let reply = server.connect().request("GET", "/", &[]);

    assert_eq!(reply.status, 200);
    assert_eq!(reply.text(), INDEX);
    assert_eq!(reply.header("Content-Length"), Some("11"));
    assert_eq!(reply.header("Content-Type"), Some("text/html"));
    assert!(reply.header("ETag").unwrap().starts_with('"'));
    assert!(reply.header("Last-Modified").is_some());
    assert_eq!(reply.header("Connection"), Some("close"));
}

#[test]
fn test_if_none_match_round_trip_is_304() {
    let server = TestServer::start();
    let etag = server
        .connect()
        .request("GET", "/", &[])
        .header("ETag")
        .unwrap()
        .to_string();

    let reply = server
        .connect()
        .request("GET", "/", &[("If-None-Match", etag.as_str())]);

    assert_eq!(reply.status, 304);
    assert!(reply.body.is_empty());
}

#[test]
fn test_head_matches_get_headers() {
    let server = TestServer::start();
    let get = server.connect().request("GET", "/", &[]);
    let head = server.connect().request("HEAD", "/", &[]);

    assert_eq!(head.status, 200);
    assert_eq!(head.headers, get.headers);
    assert!(head.body.is_empty());
}

#[test]
fn test_missing_file_is_404() {
    let server = TestServer::start();
    let reply = server.connect().request("GET", "/missing.html", &[]);

    assert_eq!(reply.status, 404);
    assert!(reply.text().contains("Not Found"));
    assert!(reply.text().contains("/missing.html"));
}

#[test]
fn test_post_is_405() {
    let server = TestServer::start();
    let reply = server.connect().request("POST", "/index.html", &[]);

    assert_eq!(reply.status, 405);
    assert!(reply.text().contains("Method Not Allowed"));
}

#[test]
fn test_post_with_large_body_is_405() {
    let server = TestServer::start();
    let mut client = server.connect();

    client.send("POST /index.html HTTP/1.1\r\nContent-Length: 20000\r\n\r\n");
    client.send(&"x".repeat(20000));

    let reply = client.read_reply(false);
    assert_eq!(reply.status, 405);
    assert!(reply.text().contains("Method Not Allowed"));
    assert!(client.is_closed());
}

#[test]
fn test_keep_alive_then_close() {
    let server = TestServer::start();
    let mut client = server.connect();

    let first = client.request("GET", "/", &[("Connection", "keep-alive")]);
    let second = client.request("GET", "/missing.html", &[("Connection", "keep-alive")]);

    assert_eq!(first.status, 200);
    assert_eq!(first.header("Connection"), Some("keep-alive"));
    assert_eq!(second.status, 404);

    let third = client.request("HEAD", "/", &[("Connection", "close")]);
    assert_eq!(third.status, 200);
    assert_eq!(third.header("Connection"), Some("close"));
    assert!(client.is_closed());
}

#[test]
fn test_request_split_across_writes() {
    let server = TestServer::start();
    let mut client = server.connect();

    client.send("GET / HT");
    std::thread::sleep(Duration::from_millis(50));
    client.send("TP/1.1\r\nHost: localhost\r\n\r\n");

    let reply = client.read_reply(false);
    assert_eq!(reply.status, 200);
    assert_eq!(reply.text(), INDEX);
}

#[test]
fn test_pipelined_requests_answered_in_order() {
    let server = TestServer::start();
    let mut client = server.connect();

    client.send(
        "GET /missing.html HTTP/1.1\r\nConnection: keep-alive\r\n\r\n\
         GET / HTTP/1.1\r\nConnection: close\r\n\r\n",
    );

    assert_eq!(client.read_reply(false).status, 404);
    assert_eq!(client.read_reply(false).status, 200);
    assert!(client.is_closed());
}

#[test]
fn test_malformed_request_is_400_and_closes() {
    let server = TestServer::start();
    let mut client = server.connect();

    client.send("HELLO\r\nConnection: keep-alive\r\n\r\n");

    assert_eq!(client.read_reply(false).status, 400);
    assert!(client.is_closed());
}

#[test]
fn test_oversized_head_is_431_with_clean_close() {
    let server = TestServer::start();
    let mut client = server.connect();

    let mut raw = String::from("GET / HTTP/1.1\r\n");
    for i in 0..400 {
        raw.push_str(&format!("X-Filler-{i}: aaaaaaaaaaaaaaaa\r\n"));
    }
    client.send(&raw);

    assert_eq!(client.read_reply(false).status, 431);
    // the server shuts down its side instead of resetting the connection
    assert!(client.is_closed());
}

#[test]
fn test_abandoned_connections_do_not_stop_the_server() {
    let server = TestServer::start();

    let mut half = server.connect();
    half.send("GET /index.ht");
    drop(half);

    let mut impatient = server.connect();
    impatient.send("GET / HTTP/1.1\r\n\r\n");
    drop(impatient);

    let reply = server.connect().request("GET", "/", &[]);
    assert_eq!(reply.status, 200);
    assert_eq!(reply.text(), INDEX);
}

#[test]
fn test_other_version_is_505() {
    let server = TestServer::start();
    let mut client = server.connect();

    client.send("GET / HTTP/1.0\r\n\r\n");

    assert_eq!(client.read_reply(false).status, 505);
}

#[test]
fn test_server_lifecycle() {
    let config = Config {
        port: 0,
        ..Config::default()
    };
    let mut server = Server::bind(&config).unwrap();
    assert_eq!(server.state(), ServerState::Idle);
    assert_ne!(server.local_addr().port(), 0);

    // a stop requested before the loop starts ends it at once
    server.shutdown_handle().stop();
    server.run().unwrap();
    assert_eq!(server.state(), ServerState::Stopped);

    assert!(matches!(server.run(), Err(ServerError::Stopped)));

    // the listening socket is released on stop
    let port = server.local_addr().port();
    assert!(std::net::TcpListener::bind(("127.0.0.1", port)).is_ok());
}

#[test]
fn test_stop_closes_open_connections() {
    let server = TestServer::start();
    let mut client = server.connect();
    let reply = client.request("GET", "/", &[("Connection", "keep-alive")]);
    assert_eq!(reply.status, 200);

    drop(server);

    assert!(client.is_closed());
}
