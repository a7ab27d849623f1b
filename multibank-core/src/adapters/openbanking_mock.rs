//! Mock Open Banking provider for testing
//!
//! A tiny threaded HTTP server whose routes are scripted per test. Each route
//! (method + path, query ignored) holds a queue of responses that are served
//! in order; the last one keeps repeating. Every request is recorded so tests
//! can count calls and inspect headers and bodies.
//!
//! `POST /auth/bank-token` answers with a valid token unless a test overrides it.

use std::collections::{HashMap, VecDeque};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use serde_json::{json, Value as JsonValue};

/// Scripted response
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl MockResponse {
    pub fn json(status: u16, body: JsonValue) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    pub fn text(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

/// Request as seen by the server
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: String,
    /// Lowercased header names
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn json(&self) -> JsonValue {
        serde_json::from_str(&self.body).unwrap_or(JsonValue::Null)
    }
}

#[derive(Default)]
struct MockState {
    routes: HashMap<(String, String), VecDeque<MockResponse>>,
    requests: Vec<RecordedRequest>,
}

impl MockState {
    fn next_response(&mut self, method: &str, path: &str) -> MockResponse {
        let key = (method.to_string(), path.to_string());
        match self.routes.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_else(not_found),
            Some(queue) => queue.front().cloned().unwrap_or_else(not_found),
            None => not_found(),
        }
    }
}

fn not_found() -> MockResponse {
    MockResponse::json(404, json!({ "error": "not found" }))
}

/// Mock provider server for testing
pub struct MockBankServer {
    port: u16,
    running: Arc<AtomicBool>,
    state: Arc<Mutex<MockState>>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl MockBankServer {
    /// Start on a random port with the token endpoint pre-scripted
    pub fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let port = listener.local_addr()?.port();
        let running = Arc::new(AtomicBool::new(true));
        let state = Arc::new(Mutex::new(MockState::default()));

        listener.set_nonblocking(true)?;

        let running_clone = running.clone();
        let state_clone = state.clone();
        let thread_handle = thread::spawn(move || {
            while running_clone.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _)) => {
                        let state = state_clone.clone();
                        thread::spawn(move || handle_connection(stream, &state));
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                        thread::sleep(std::time::Duration::from_millis(5));
                    }
                    Err(_) => break,
                }
            }
        });

        let server = Self {
            port,
            running,
            state,
            thread_handle: Some(thread_handle),
        };
        server.on(
            "POST",
            "/auth/bank-token",
            vec![MockResponse::json(
                200,
                json!({ "access_token": "test-token", "token_type": "Bearer", "expires_in": 86400 }),
            )],
        );
        Ok(server)
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Script a route, replacing any previous script for it
    pub fn on(&self, method: &str, path: &str, responses: Vec<MockResponse>) {
        let mut state = self.state.lock().unwrap();
        state
            .routes
            .insert((method.to_string(), path.to_string()), responses.into());
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Recorded requests for one route
    pub fn requests_to(&self, method: &str, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }

    pub fn hits(&self, method: &str, path: &str) -> usize {
        self.requests_to(method, path).len()
    }

    pub fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for MockBankServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn handle_connection(stream: TcpStream, state: &Mutex<MockState>) {
    let _ = stream.set_nonblocking(false);
    let Ok(mut writer) = stream.try_clone() else {
        return;
    };
    let mut reader = BufReader::new(stream);

    let mut request_line = String::new();
    if reader.read_line(&mut request_line).is_err() {
        return;
    }
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or("").to_string();
    let target = parts.next().unwrap_or("").to_string();
    if method.is_empty() || target.is_empty() {
        send_response(&mut writer, &MockResponse::text(400, "bad request"));
        return;
    }

    let mut headers = HashMap::new();
    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_lowercase(), value.trim().to_string());
        }
    }

    let content_length = headers
        .get("content-length")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(0);
    let mut body = vec![0u8; content_length];
    if content_length > 0 && reader.read_exact(&mut body).is_err() {
        return;
    }

    let (path, query) = match target.split_once('?') {
        Some((path, query)) => (path.to_string(), query.to_string()),
        None => (target.clone(), String::new()),
    };

    let response = {
        let mut state = state.lock().unwrap();
        state.requests.push(RecordedRequest {
            method: method.clone(),
            path: path.clone(),
            query,
            headers,
            body: String::from_utf8_lossy(&body).into_owned(),
        });
        state.next_response(&method, &path)
    };

    send_response(&mut writer, &response);
}

fn send_response(stream: &mut TcpStream, response: &MockResponse) {
    let mut head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n",
        response.status,
        reason(response.status),
        response.body.len()
    );
    for (name, value) in &response.headers {
        head.push_str(&format!("{}: {}\r\n", name, value));
    }
    head.push_str("\r\n");

    let _ = stream.write_all(head.as_bytes());
    let _ = stream.write_all(response.body.as_bytes());
    let _ = stream.flush();
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get(url: &str) -> (u16, String) {
        let addr = url.trim_start_matches("http://");
        let (host, path) = addr.split_once('/').unwrap();
        let mut stream = TcpStream::connect(host).unwrap();
        write!(
            stream,
            "GET /{} HTTP/1.1\r\nHost: {}\r\nConnection: close\r\n\r\n",
            path, host
        )
        .unwrap();
        let mut raw = String::new();
        stream.read_to_string(&mut raw).unwrap();
        let status = raw
            .split_whitespace()
            .nth(1)
            .and_then(|s| s.parse().ok())
            .unwrap();
        let body = raw.split("\r\n\r\n").nth(1).unwrap_or("").to_string();
        (status, body)
    }

    #[test]
    fn test_scripted_sequence_repeats_last() {
        let server = MockBankServer::start().unwrap();
        server.on(
            "GET",
            "/accounts",
            vec![
                MockResponse::text(503, "busy"),
                MockResponse::json(200, json!({ "ok": true })),
            ],
        );

        let url = format!("{}/accounts?client_id=team-1", server.base_url());
        assert_eq!(get(&url).0, 503);
        assert_eq!(get(&url).0, 200);
        assert_eq!(get(&url).0, 200);

        let recorded = server.requests_to("GET", "/accounts");
        assert_eq!(recorded.len(), 3);
        assert_eq!(recorded[0].query, "client_id=team-1");
    }

    #[test]
    fn test_unscripted_route_is_404() {
        let server = MockBankServer::start().unwrap();
        let (status, body) = get(&format!("{}/nope", server.base_url()));
        assert_eq!(status, 404);
        assert!(body.contains("not found"));
    }
}
