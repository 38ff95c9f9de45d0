//! Minimal HTTP/1.1 server standing in for a CDX index in integration tests.
//!
//! Every request is answered by a routing closure that sees the request target
//! and headers. Replies can be plain bodies, gzip-labelled bodies, arbitrary
//! statuses, or a stalled connection that never answers.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

/// How long a stalled reply holds the socket open.
const HANG_FOR: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub enum Reply {
    /// 200 with this body.
    Ok(Vec<u8>),
    /// 200 with `Content-Encoding: gzip`; bytes are sent as given.
    Gzip(Vec<u8>),
    /// Any status line (e.g. `404 Not Found`) with a body.
    Status(&'static str, Vec<u8>),
    /// Read the request, never answer.
    Hang,
}

#[derive(Debug, Clone)]
pub struct Request {
    /// Path and query, e.g. `/CC-MAIN-2024-10-index?url=x&page=3`.
    pub target: String,
    pub headers: Vec<(String, String)>,
}

impl Request {
    /// First value of query parameter `key`.
    pub fn query(&self, key: &str) -> Option<String> {
        let url = url::Url::parse(&format!("http://localhost{}", self.target)).ok()?;
        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    pub fn page(&self) -> Option<u64> {
        self.query("page")?.parse().ok()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

pub struct PageServer {
    /// Base URL, e.g. "http://127.0.0.1:12345/".
    pub base: String,
    requests: Arc<Mutex<Vec<Request>>>,
}

impl PageServer {
    /// Index endpoint for `collection` on this server.
    pub fn endpoint(&self, collection: &str) -> url::Url {
        url::Url::parse(&format!("{}{}-index", self.base, collection)).unwrap()
    }

    /// Every request received so far, in arrival order.
    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests for page `page`.
    pub fn hits(&self, page: u64) -> usize {
        self.requests()
            .iter()
            .filter(|r| r.page() == Some(page))
            .count()
    }
}

/// Starts a server in a background thread. The server runs until the process exits.
pub fn start<F>(route: F) -> PageServer
where
    F: Fn(&Request) -> Reply + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let route = Arc::new(route);
    let requests = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&requests);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let route = Arc::clone(&route);
            let log = Arc::clone(&log);
            thread::spawn(move || handle(stream, route.as_ref(), &log));
        }
    });
    PageServer {
        base: format!("http://127.0.0.1:{}/", port),
        requests,
    }
}

/// Base URL of a port nothing listens on.
pub fn refused_base() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{}/", port)
}

fn handle<F>(mut stream: TcpStream, route: &F, log: &Mutex<Vec<Request>>)
where
    F: Fn(&Request) -> Reply,
{
    let _ = stream.set_read_timeout(Some(Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => parse_request(s),
        Err(_) => return,
    };
    log.lock().unwrap().push(request.clone());

    let (status, encoding, body) = match route(&request) {
        Reply::Ok(body) => ("200 OK", "", body),
        Reply::Gzip(body) => ("200 OK", "Content-Encoding: gzip\r\n", body),
        Reply::Status(status, body) => (status, "", body),
        Reply::Hang => {
            thread::sleep(HANG_FOR);
            return;
        }
    };
    let head = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\n{}Connection: close\r\n\r\n",
        status,
        body.len(),
        encoding
    );
    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(&body);
}

fn parse_request(request: &str) -> Request {
    let mut target = String::new();
    let mut headers = Vec::new();
    for line in request.lines() {
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if target.is_empty() {
            target = line.split_whitespace().nth(1).unwrap_or("/").to_string();
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }
    }
    Request { target, headers }
}
