//! Orchestrator/worker protocol.
//!
//! Each worker owns one bidirectional link to the orchestrator. Upward the
//! worker sends its exception slot, coverage snapshots and a completion
//! signal; downward the orchestrator sends the attach decision.
//!
//! Over a socket every message is a bincode frame with a 4-byte big-endian
//! length prefix. The first frame on a connection must be
//! [`WorkerMessage::Hello`].

mod envelope;
mod handshake;
mod transport;

pub use envelope::{
    parse_backtrace, CapturedPanic, EnvelopeOrigin, ExceptionEnvelope, StackFrame,
    ENVELOPE_VERSION,
};
pub use handshake::{Handshake, HandshakeState};
pub use transport::{
    channel_pair, ChannelUplink, ControlServer, Downlink, LostHook, SocketUplink, Uplink,
    WorkerChannels, WorkerSenders, CONTROL_LOST_EXIT_CODE,
};

use crate::coverage::CoverageSnapshot;
use crate::result::{FuzzError, FuzzResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::{ErrorKind, Read, Write};

/// Version announced in [`WorkerMessage::Hello`]
pub const PROTOCOL_VERSION: u16 = 1;

/// Largest frame accepted from a peer
pub const MAX_FRAME_LEN: u32 = 64 * 1024 * 1024;

/// Messages sent by a worker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerMessage {
    /// First frame on a connection
    Hello {
        /// Worker index
        index: usize,
        /// Protocol version spoken by the worker
        protocol_version: u16,
    },
    /// The exception slot; `None` means the test passed
    Exception(Option<ExceptionEnvelope>),
    /// Latest coverage snapshot
    Coverage(CoverageSnapshot),
    /// Completion signal
    Finished,
}

/// Messages sent by the orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrchestratorMessage {
    /// Whether to attach a debugger to the reported failure
    Decision {
        /// `true` to attach
        attach: bool,
    },
    /// Stop the node and exit
    Shutdown,
}

/// Write one length-prefixed frame
pub fn write_frame<W: Write, T: Serialize>(writer: &mut W, message: &T) -> FuzzResult<()> {
    let payload = bincode::serialize(message)?;
    let len = u32::try_from(payload.len())
        .ok()
        .filter(|len| *len <= MAX_FRAME_LEN)
        .ok_or_else(|| FuzzError::protocol(format!("frame of {} bytes too large", payload.len())))?;
    writer.write_all(&len.to_be_bytes())?;
    writer.write_all(&payload)?;
    writer.flush()?;
    Ok(())
}

/// Read one length-prefixed frame; `None` on a clean end of stream
pub fn read_frame<R: Read, T: DeserializeOwned>(reader: &mut R) -> FuzzResult<Option<T>> {
    let mut len = [0u8; 4];
    match reader.read_exact(&mut len) {
        Ok(()) => {}
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }
    let len = u32::from_be_bytes(len);
    if len > MAX_FRAME_LEN {
        return Err(FuzzError::protocol(format!("frame of {len} bytes too large")));
    }
    let mut payload = vec![0u8; len as usize];
    reader.read_exact(&mut payload)?;
    Ok(Some(bincode::deserialize(&payload)?))
}
