//! Connection to a worker's development node.
//!
//! The wire transport is deliberately minimal: the fuzzer only needs to
//! connect, reset and exchange JSON-RPC payloads. Everything else a test
//! does with the chain goes through [`ChainClient::call`].

use crate::node::{NetworkKind, NodeHandle, NodeLauncher};
use crate::result::{FuzzError, FuzzResult};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// JSON-RPC "method not found"
const METHOD_NOT_FOUND: i64 = -32601;

/// Request/response exchange with a node
pub trait ChainTransport: Send + Sync {
    /// Send one serialized request and return the raw response body
    fn send_recv(&self, request: &str) -> FuzzResult<String>;
}

/// JSON-RPC over HTTP
#[derive(Debug)]
pub struct HttpTransport {
    url: String,
    agent: ureq::Agent,
}

impl HttpTransport {
    /// Create a transport for `url`
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(1))
            .timeout(Duration::from_secs(60))
            .build();
        Self {
            url: url.into(),
            agent,
        }
    }
}

impl ChainTransport for HttpTransport {
    fn send_recv(&self, request: &str) -> FuzzResult<String> {
        let response = self
            .agent
            .post(&self.url)
            .set("Content-Type", "application/json")
            .send_string(request);
        match response {
            Ok(resp) => Ok(resp.into_string()?),
            // JSON-RPC errors may come back with a non-2xx status and a body
            Err(ureq::Error::Status(_, resp)) => Ok(resp.into_string()?),
            Err(ureq::Error::Transport(t)) => Err(FuzzError::transport(t.to_string())),
        }
    }
}

/// Connect-retry budget while a freshly launched node boots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay between attempts
    pub poll_interval: Duration,
    /// Overall budget
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            timeout: Duration::from_secs(10),
        }
    }
}

/// JSON-RPC client bound to one node
pub struct ChainClient {
    url: String,
    transport: Box<dyn ChainTransport>,
    next_id: AtomicU64,
}

impl std::fmt::Debug for ChainClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainClient").field("url", &self.url).finish()
    }
}

impl ChainClient {
    /// Wrap a transport
    #[must_use]
    pub fn new(url: impl Into<String>, transport: Box<dyn ChainTransport>) -> Self {
        Self {
            url: url.into(),
            transport,
            next_id: AtomicU64::new(1),
        }
    }

    /// Node URL
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Call a JSON-RPC method and return its `result`
    pub fn call(&self, method: &str, params: Value) -> FuzzResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        let raw = self.transport.send_recv(&request.to_string())?;
        let mut response: Value = serde_json::from_str(&raw)?;
        if let Some(error) = response.get("error") {
            return Err(FuzzError::Rpc {
                code: error.get("code").and_then(Value::as_i64).unwrap_or(0),
                message: error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown error")
                    .to_string(),
            });
        }
        Ok(response
            .get_mut("result")
            .map(Value::take)
            .unwrap_or(Value::Null))
    }

    /// Current block number
    pub fn block_number(&self) -> FuzzResult<u64> {
        let value = self.call("eth_blockNumber", json!([]))?;
        let hex = value
            .as_str()
            .ok_or_else(|| FuzzError::transport(format!("unexpected eth_blockNumber result {value}")))?;
        u64::from_str_radix(hex.trim_start_matches("0x"), 16)
            .map_err(|e| FuzzError::transport(format!("bad block number '{hex}': {e}")))
    }

    /// Reset chain state to genesis
    pub fn reset(&self, network: NetworkKind) -> FuzzResult<()> {
        let method = network
            .reset_method()
            .ok_or_else(|| FuzzError::unsupported(format!("reset on {network}")))?;
        match self.call(method, json!([])) {
            Ok(_) => Ok(()),
            Err(FuzzError::Rpc { code, .. }) if code == METHOD_NOT_FOUND => {
                Err(FuzzError::unsupported(format!("reset on {network}")))
            }
            Err(e) => Err(e),
        }
    }
}

/// Launches nodes and opens transports to them
pub trait ChainBackend: Send + Sync {
    /// Start a node of `network` on `port`
    fn launch(&self, network: NetworkKind, port: u16) -> FuzzResult<Box<dyn NodeHandle>>;

    /// Open a transport to `url`
    fn open(&self, url: &str) -> FuzzResult<Box<dyn ChainTransport>>;
}

/// Real node subprocesses reached over HTTP
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalNodeBackend;

impl ChainBackend for LocalNodeBackend {
    fn launch(&self, network: NetworkKind, port: u16) -> FuzzResult<Box<dyn NodeHandle>> {
        Ok(Box::new(NodeLauncher::start(network, port)?))
    }

    fn open(&self, url: &str) -> FuzzResult<Box<dyn ChainTransport>> {
        Ok(Box::new(HttpTransport::new(url)))
    }
}

/// URL of the node listening on `port`
#[must_use]
pub fn node_url(port: u16) -> String {
    format!("http://127.0.0.1:{port}")
}

/// Poll until the node answers or the retry budget is spent
pub fn connect_with_retry(
    backend: &dyn ChainBackend,
    url: &str,
    policy: RetryPolicy,
    node: &mut dyn NodeHandle,
) -> FuzzResult<ChainClient> {
    let start = Instant::now();
    let mut attempts = 0u32;
    loop {
        attempts += 1;
        let attempt = backend.open(url).and_then(|transport| {
            let client = ChainClient::new(url, transport);
            client.block_number().map(|_| client)
        });
        match attempt {
            Ok(client) => {
                debug!(url, attempts, "connected to node");
                return Ok(client);
            }
            Err(e) if e.is_transport() => {
                if let Some(status) = node.exit_status() {
                    return Err(FuzzError::NodeExited {
                        network: node.network().to_string(),
                        status,
                    });
                }
                if start.elapsed() >= policy.timeout {
                    warn!(url, attempts, "node did not become reachable");
                    return Err(FuzzError::ConnectionTimeout {
                        url: url.to_string(),
                        timeout_ms: policy.timeout.as_millis() as u64,
                    });
                }
                thread::sleep(policy.poll_interval);
            }
            Err(e) => return Err(e),
        }
    }
}
