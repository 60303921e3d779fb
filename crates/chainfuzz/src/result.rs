//! Result and error types for Chainfuzz.

use thiserror::Error;

/// Result type for Chainfuzz operations
pub type FuzzResult<T> = Result<T, FuzzError>;

/// Errors that can occur while running a fuzz campaign
#[derive(Debug, Error)]
pub enum FuzzError {
    /// Invalid campaign, worker or test configuration
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message
        message: String,
    },

    /// The development node did not accept connections in time
    #[error("Could not connect to {url} within {timeout_ms}ms")]
    ConnectionTimeout {
        /// Node URL
        url: String,
        /// Connect budget in milliseconds
        timeout_ms: u64,
    },

    /// The development node exited before it became reachable
    #[error("{network} node exited before accepting connections ({status})")]
    NodeExited {
        /// Network kind of the node
        network: String,
        /// Exit status description
        status: String,
    },

    /// The node does not support a requested capability
    #[error("Unsupported capability: {capability}")]
    UnsupportedCapability {
        /// Capability name (for example `reset`)
        capability: String,
    },

    /// JSON-RPC error object returned by the node
    #[error("RPC error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code
        code: i64,
        /// Error message
        message: String,
    },

    /// Transport-level failure talking to the node
    #[error("Transport error: {message}")]
    Transport {
        /// Error message
        message: String,
    },

    /// Orchestrator/worker protocol violation
    #[error("Protocol violation: {message}")]
    Protocol {
        /// Error message
        message: String,
    },

    /// A worker terminated without completing the protocol
    #[error("Worker #{index} terminated without signalling completion ({status})")]
    WorkerDied {
        /// Worker index
        index: usize,
        /// Exit status description
        status: String,
    },

    /// No registered fuzz test with this name
    #[error("Unknown fuzz test '{name}'")]
    UnknownTest {
        /// Requested test name
        name: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Frame encoding error
    #[error("Codec error: {0}")]
    Codec(#[from] bincode::Error),
}

impl FuzzError {
    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an unsupported capability error
    #[must_use]
    pub fn unsupported(capability: impl Into<String>) -> Self {
        Self::UnsupportedCapability {
            capability: capability.into(),
        }
    }

    /// Create a transport error
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a protocol violation error
    #[must_use]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Short kind name used when the error is reported as an exception envelope
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "ConfigurationError",
            Self::ConnectionTimeout { .. } => "ConnectionTimeoutError",
            Self::NodeExited { .. } => "NodeExitedError",
            Self::UnsupportedCapability { .. } => "UnsupportedCapabilityError",
            Self::Rpc { .. } => "RpcError",
            Self::Transport { .. } => "TransportError",
            Self::Protocol { .. } => "ProtocolError",
            Self::WorkerDied { .. } => "WorkerDiedError",
            Self::UnknownTest { .. } => "UnknownTestError",
            Self::Io(_) => "IoError",
            Self::Json(_) => "JsonError",
            Self::Codec(_) => "CodecError",
        }
    }

    /// Whether the error is a transport failure worth retrying while a node boots
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Io(_))
    }
}
