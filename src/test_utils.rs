//! Test utilities: synthetic frames, a scripted control transport and
//! loopback servers standing in for the radar.

#![cfg(any(test, feature = "benchmark"))]

use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::control::{ControlTransport, Endpoint, Response};
use crate::types::{Frame, FrameHeader, HEADER_SIZE_BYTES};
use crate::wire::encode_frame;
use crate::{AcquisitionError, Result};

/// Build `count` frames of `points` samples with distinct, predictable values.
pub fn test_frames(count: u32, points: usize) -> Vec<Frame> {
    (0..count)
        .map(|n| {
            let header = FrameHeader {
                seconds: 1_700_000_000 + n / 5,
                nanoseconds: (n % 5) * 200_000_000,
                trace_number: n,
                status: 0,
                stack_count: 4,
                header_size: HEADER_SIZE_BYTES as u16,
            };
            let samples = (0..points).map(|i| n as f32 + i as f32 / 1000.0).collect();
            Frame::new(header, samples)
        })
        .collect()
}

/// Concatenate frames into the raw byte stream the device would send.
pub fn encode_stream(frames: &[Frame]) -> Vec<u8> {
    frames.iter().flat_map(|frame| encode_frame(&frame.header, &frame.samples)).collect()
}

/// Split `bytes` into chunks whose sizes cycle through `pattern`.
pub fn split_uneven(bytes: &[u8], pattern: &[usize]) -> Vec<Vec<u8>> {
    let mut chunks = Vec::new();
    let mut rest = bytes;
    let mut sizes = pattern.iter().copied().filter(|&size| size > 0).cycle();

    while !rest.is_empty() {
        let size = sizes.next().unwrap_or(rest.len()).min(rest.len());
        let (chunk, tail) = rest.split_at(size);
        chunks.push(chunk.to_vec());
        rest = tail;
    }
    chunks
}

/// What the loopback data server does after sending its chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AfterSend {
    /// Close the connection (end of stream)
    Close,
    /// Keep the connection open until the client goes away
    HoldOpen,
}

/// Serve one data connection on 127.0.0.1, writing `chunks` with a short
/// pause between them. Returns the bound port.
pub async fn spawn_data_server(chunks: Vec<Vec<u8>>, after: AfterSend) -> u16 {
    let listener = bind_loopback().await;
    let port = listener.local_addr().map(|addr| addr.port()).unwrap_or(0);

    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };

        for chunk in chunks {
            if socket.write_all(&chunk).await.is_err() {
                return;
            }
            let _ = socket.flush().await;
            tokio::time::sleep(Duration::from_millis(1)).await;
        }

        match after {
            AfterSend::Close => {
                let _ = socket.shutdown().await;
            }
            AfterSend::HoldOpen => {
                let mut sink = [0u8; 64];
                while let Ok(n) = socket.read(&mut sink).await {
                    if n == 0 {
                        break;
                    }
                }
            }
        }
    });

    port
}

/// Canned HTTP reply for [`spawn_http_responder`].
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn ok(body: impl Into<String>) -> Self {
        Self { status: 200, body: body.into() }
    }

    pub fn with_status(status: u16, body: impl Into<String>) -> Self {
        Self { status, body: body.into() }
    }
}

/// Minimal HTTP/1.1 server answering one request per reply, in order.
///
/// Each raw request (head and body) is forwarded on the returned channel.
pub async fn spawn_http_responder(
    replies: Vec<HttpReply>,
) -> (u16, mpsc::UnboundedReceiver<String>) {
    let listener = bind_loopback().await;
    let port = listener.local_addr().map(|addr| addr.port()).unwrap_or(0);
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        for reply in replies {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let Some(request) = read_http_request(&mut socket).await else {
                return;
            };
            let _ = tx.send(request);

            let reason = if reply.status == 200 { "OK" } else { "Error" };
            let response = format!(
                "HTTP/1.1 {} {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                reply.status,
                reason,
                reply.body.len(),
                reply.body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    (port, rx)
}

async fn read_http_request(socket: &mut tokio::net::TcpStream) -> Option<String> {
    let mut raw = Vec::new();
    let mut buf = [0u8; 1024];

    let head_end = loop {
        let n = socket.read(&mut buf).await.ok()?;
        if n == 0 {
            return None;
        }
        raw.extend_from_slice(&buf[..n]);
        if let Some(pos) = raw.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&raw[..head_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while raw.len() < head_end + content_length {
        let n = socket.read(&mut buf).await.ok()?;
        if n == 0 {
            break;
        }
        raw.extend_from_slice(&buf[..n]);
    }

    Some(String::from_utf8_lossy(&raw).to_string())
}

async fn bind_loopback() -> TcpListener {
    match TcpListener::bind("127.0.0.1:0").await {
        Ok(listener) => listener,
        Err(e) => panic!("failed to bind loopback listener: {e}"),
    }
}

/// HTTP verb of a recorded control call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
}

/// One control call seen by [`MockTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct MockCall {
    pub method: Method,
    pub endpoint: Endpoint,
    pub payload: Option<Value>,
}

#[derive(Debug)]
struct MockState {
    api_name: String,
    reference_ps: Value,
    data_port: u16,
    overrides: HashMap<Endpoint, Response>,
    rejected: HashMap<Endpoint, (i64, String)>,
    failing: HashSet<Endpoint>,
    calls: Vec<MockCall>,
}

/// Scripted radar control plane.
///
/// Answers every endpoint like a healthy NIC-500 in SDK mode unless told
/// otherwise. Clones share state, so a clone kept by the test can inspect
/// calls made through the session and change behavior mid-session.
#[derive(Debug, Clone)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new(data_port: u16) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                api_name: "NIC-500 SDK".to_string(),
                reference_ps: json!(-53_000),
                data_port,
                overrides: HashMap::new(),
                rejected: HashMap::new(),
                failing: HashSet::new(),
                calls: Vec::new(),
            })),
        }
    }

    pub fn with_api_name(self, name: &str) -> Self {
        self.lock().api_name = name.to_string();
        self
    }

    /// Value reported as `window_time_shift_reference_ps` (may be null or a string).
    pub fn with_reference_ps(self, reference: Value) -> Self {
        self.lock().reference_ps = reference;
        self
    }

    /// Answer `endpoint` with a well-formed envelope carrying `status_code`.
    pub fn reject(self, endpoint: Endpoint, status_code: i64, message: &str) -> Self {
        self.lock().rejected.insert(endpoint, (status_code, message.to_string()));
        self
    }

    /// Fail `endpoint` at the transport level.
    pub fn fail(self, endpoint: Endpoint) -> Self {
        self.lock().failing.insert(endpoint);
        self
    }

    /// Replace the default answer for `endpoint`.
    pub fn respond(self, endpoint: Endpoint, response: Response) -> Self {
        self.lock().overrides.insert(endpoint, response);
        self
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.clone()
    }

    pub fn get_count(&self, endpoint: Endpoint) -> usize {
        self.count(Method::Get, endpoint)
    }

    pub fn put_count(&self, endpoint: Endpoint) -> usize {
        self.count(Method::Put, endpoint)
    }

    pub fn put_payloads(&self, endpoint: Endpoint) -> Vec<Value> {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.method == Method::Put && call.endpoint == endpoint)
            .filter_map(|call| call.payload.clone())
            .collect()
    }

    fn count(&self, method: Method, endpoint: Endpoint) -> usize {
        self.lock().calls.iter().filter(|c| c.method == method && c.endpoint == endpoint).count()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn answer(&self, method: Method, endpoint: Endpoint, payload: Option<Value>) -> Result<Response> {
        let mut state = self.lock();
        state.calls.push(MockCall { method, endpoint, payload });

        if state.failing.contains(&endpoint) {
            return Err(AcquisitionError::network(format!("mock {} unreachable", endpoint.label())));
        }
        if let Some((code, message)) = state.rejected.get(&endpoint) {
            return Ok(Response::new(*code, message.clone(), Value::Null));
        }
        if let Some(response) = state.overrides.get(&endpoint) {
            return Ok(response.clone());
        }

        let data = match (method, endpoint) {
            (Method::Get, Endpoint::Root) => json!({"name": state.api_name}),
            (Method::Get, Endpoint::GprSystemInformation) => {
                json!({"gpr": {"window_time_shift_reference_ps": state.reference_ps}})
            }
            (Method::Get, Endpoint::DataSocket) => json!({"data_socket": {"port": state.data_port}}),
            (Method::Get, Endpoint::Version) => json!({"version": "1.0.0"}),
            _ => json!({}),
        };
        Ok(Response::new(0, format!("{} OK", endpoint.label()), data))
    }
}

#[async_trait::async_trait]
impl ControlTransport for MockTransport {
    async fn get(&self, endpoint: Endpoint) -> Result<Response> {
        self.answer(Method::Get, endpoint, None)
    }

    async fn put(&self, endpoint: Endpoint, payload: &Value) -> Result<Response> {
        self.answer(Method::Put, endpoint, Some(payload.clone()))
    }
}
