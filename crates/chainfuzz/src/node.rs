//! Ephemeral development node processes.
//!
//! Each worker owns exactly one node, bound to its own port. Starting a node
//! does not wait for it to accept connections; readiness is established by
//! the caller's connect-retry loop.

use crate::result::{FuzzError, FuzzResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::process::{Child, Command, Stdio};
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

/// Supported development node implementations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkKind {
    /// Foundry's anvil
    #[default]
    Anvil,
    /// ganache-cli
    Ganache,
    /// Hardhat network via npx
    Hardhat,
}

impl NetworkKind {
    /// All supported kinds
    pub const ALL: [Self; 3] = [Self::Anvil, Self::Ganache, Self::Hardhat];

    /// Identifier used on the command line
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Anvil => "anvil",
            Self::Ganache => "ganache",
            Self::Hardhat => "hardhat",
        }
    }

    /// Program and arguments that start a node of this kind on `port`
    #[must_use]
    pub fn command_line(self, port: u16) -> (&'static str, Vec<String>) {
        let port = port.to_string();
        match self {
            Self::Anvil => (
                "anvil",
                vec![
                    "--port".into(),
                    port,
                    "--prune-history".into(),
                    "--gas-price".into(),
                    "0".into(),
                    "--base-fee".into(),
                    "0".into(),
                    "--steps-tracing".into(),
                ],
            ),
            Self::Ganache => (
                "ganache-cli",
                vec![
                    "--port".into(),
                    port,
                    "-g".into(),
                    "0".into(),
                    "-k".into(),
                    "istanbul".into(),
                ],
            ),
            Self::Hardhat => (
                "npx",
                vec!["hardhat".into(), "node".into(), "--port".into(), port],
            ),
        }
    }

    /// JSON-RPC method that resets chain state, if the node has one
    #[must_use]
    pub const fn reset_method(self) -> Option<&'static str> {
        match self {
            Self::Anvil => Some("anvil_reset"),
            Self::Hardhat => Some("hardhat_reset"),
            Self::Ganache => None,
        }
    }
}

impl fmt::Display for NetworkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NetworkKind {
    type Err = FuzzError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| FuzzError::configuration(format!("Unknown network ID '{s}'")))
    }
}

/// A running node, as seen by the worker that owns it
pub trait NodeHandle: Send {
    /// Network kind of the node
    fn network(&self) -> NetworkKind;

    /// Port the node listens on
    fn port(&self) -> u16;

    /// Exit status if the node already terminated
    fn exit_status(&mut self) -> Option<String>;

    /// Stop the node. Safe to call repeatedly.
    fn stop(&mut self);

    /// Callback that kills the node from another thread
    fn kill_switch(&self) -> Box<dyn FnOnce() + Send>;
}

/// Starts node subprocesses
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeLauncher;

impl NodeLauncher {
    /// Build the command for a node of `kind` on `port`
    #[must_use]
    pub fn command(kind: NetworkKind, port: u16) -> Command {
        let (program, args) = kind.command_line(port);
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null());
        cmd
    }

    /// Spawn a node without waiting for it to become ready
    pub fn start(kind: NetworkKind, port: u16) -> FuzzResult<NodeProcess> {
        let child = Self::command(kind, port).spawn().map_err(|e| {
            FuzzError::configuration(format!(
                "Failed to start {kind} node ({}): {e}",
                kind.command_line(port).0
            ))
        })?;
        info!(network = %kind, port, pid = child.id(), "started node");
        Ok(NodeProcess {
            network: kind,
            port,
            child: Arc::new(Mutex::new(Some(child))),
        })
    }

    /// Parse a network identifier and spawn; unknown identifiers never spawn
    pub fn start_named(network: &str, port: u16) -> FuzzResult<NodeProcess> {
        let kind: NetworkKind = network.parse()?;
        Self::start(kind, port)
    }
}

/// Handle to a spawned node subprocess
#[derive(Debug)]
pub struct NodeProcess {
    network: NetworkKind,
    port: u16,
    child: Arc<Mutex<Option<Child>>>,
}

impl NodeProcess {
    /// OS process id, if the node has not been stopped
    #[must_use]
    pub fn id(&self) -> Option<u32> {
        self.child
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(Child::id)
    }
}

fn kill_child(slot: &Mutex<Option<Child>>) {
    let taken = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
    if let Some(mut child) = taken {
        // kill() fails once the process is gone; either way it gets reaped
        let _ = child.kill();
        match child.wait() {
            Ok(status) => debug!(pid = child.id(), %status, "node stopped"),
            Err(e) => debug!(pid = child.id(), error = %e, "node already reaped"),
        }
    }
}

impl NodeHandle for NodeProcess {
    fn network(&self) -> NetworkKind {
        self.network
    }

    fn port(&self) -> u16 {
        self.port
    }

    fn exit_status(&mut self) -> Option<String> {
        let mut guard = self.child.lock().unwrap_or_else(PoisonError::into_inner);
        match guard.as_mut().map(Child::try_wait) {
            Some(Ok(Some(status))) => Some(status.to_string()),
            Some(Ok(None)) => None,
            Some(Err(e)) => Some(e.to_string()),
            None => Some("stopped".to_string()),
        }
    }

    fn stop(&mut self) {
        kill_child(&self.child);
    }

    fn kill_switch(&self) -> Box<dyn FnOnce() + Send> {
        let slot = Arc::clone(&self.child);
        Box::new(move || kill_child(&slot))
    }
}

impl Drop for NodeProcess {
    fn drop(&mut self) {
        self.stop();
    }
}
