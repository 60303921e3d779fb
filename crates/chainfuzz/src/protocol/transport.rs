//! Worker links: in-process channels and loopback sockets.

use super::{read_frame, write_frame, OrchestratorMessage, WorkerMessage, PROTOCOL_VERSION};
use crate::coverage::CoverageSnapshot;
use crate::protocol::ExceptionEnvelope;
use crate::result::{FuzzError, FuzzResult};
use std::collections::HashMap;
use std::fmt;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use tracing::{debug, warn};

/// Exit code of a worker whose orchestrator went away
pub const CONTROL_LOST_EXIT_CODE: i32 = 75;

/// Callback run when the orchestrator link is lost
pub type LostHook = Box<dyn FnOnce() + Send>;

/// Worker end of the link
pub trait Uplink: Send + Sync {
    /// Send a message to the orchestrator
    fn send(&self, message: WorkerMessage) -> FuzzResult<()>;

    /// Block until the orchestrator sends a message
    fn recv(&self) -> FuzzResult<OrchestratorMessage>;

    /// Register a callback run if the orchestrator disappears
    fn on_connection_lost(&self, _hook: LostHook) {}
}

/// Orchestrator end of the link, downward direction
pub trait Downlink: Send {
    /// Send a message to the worker
    fn send(&self, message: OrchestratorMessage) -> FuzzResult<()>;
}

/// Producer halves of a worker's upward channels
#[derive(Debug, Clone)]
pub struct WorkerSenders {
    completion: Sender<()>,
    exception: Sender<Option<ExceptionEnvelope>>,
    coverage: Sender<CoverageSnapshot>,
}

impl WorkerSenders {
    /// Deliver a worker message to the matching channel
    pub fn route(&self, message: WorkerMessage) -> FuzzResult<()> {
        let delivered = match message {
            WorkerMessage::Hello { index, .. } => {
                return Err(FuzzError::protocol(format!(
                    "unexpected hello from worker #{index}"
                )))
            }
            WorkerMessage::Exception(slot) => self.exception.send(slot).is_ok(),
            WorkerMessage::Coverage(snapshot) => self.coverage.send(snapshot).is_ok(),
            WorkerMessage::Finished => self.completion.send(()).is_ok(),
        };
        if delivered {
            Ok(())
        } else {
            Err(FuzzError::protocol("orchestrator stopped listening"))
        }
    }
}

/// Consumer halves of a worker's channels, owned by the orchestrator
pub struct WorkerChannels {
    /// Completion signal; one per handshake phase
    pub completion: Receiver<()>,
    /// Exception slot
    pub exception: Receiver<Option<ExceptionEnvelope>>,
    /// Coverage snapshots
    pub coverage: Receiver<CoverageSnapshot>,
    /// Decision and shutdown channel
    pub downlink: Box<dyn Downlink>,
}

impl fmt::Debug for WorkerChannels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerChannels").finish_non_exhaustive()
    }
}

fn upward(downlink: Box<dyn Downlink>) -> (WorkerSenders, WorkerChannels) {
    let (completion_tx, completion) = mpsc::channel();
    let (exception_tx, exception) = mpsc::channel();
    let (coverage_tx, coverage) = mpsc::channel();
    (
        WorkerSenders {
            completion: completion_tx,
            exception: exception_tx,
            coverage: coverage_tx,
        },
        WorkerChannels {
            completion,
            exception,
            coverage,
            downlink,
        },
    )
}

// ---------------------------------------------------------------------------
// In-process channels
// ---------------------------------------------------------------------------

struct ChannelDownlink(Sender<OrchestratorMessage>);

impl Downlink for ChannelDownlink {
    fn send(&self, message: OrchestratorMessage) -> FuzzResult<()> {
        self.0
            .send(message)
            .map_err(|_| FuzzError::protocol("worker hung up"))
    }
}

/// Worker end of an in-process link
pub struct ChannelUplink {
    senders: WorkerSenders,
    inbox: Mutex<Receiver<OrchestratorMessage>>,
}

impl fmt::Debug for ChannelUplink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelUplink").finish_non_exhaustive()
    }
}

impl Uplink for ChannelUplink {
    fn send(&self, message: WorkerMessage) -> FuzzResult<()> {
        self.senders.route(message)
    }

    fn recv(&self) -> FuzzResult<OrchestratorMessage> {
        self.inbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .recv()
            .map_err(|_| FuzzError::protocol("orchestrator hung up"))
    }
}

/// Link a worker running on a thread of this process
#[must_use]
pub fn channel_pair() -> (ChannelUplink, WorkerChannels) {
    let (down_tx, down_rx) = mpsc::channel();
    let (senders, channels) = upward(Box::new(ChannelDownlink(down_tx)));
    (
        ChannelUplink {
            senders,
            inbox: Mutex::new(down_rx),
        },
        channels,
    )
}

// ---------------------------------------------------------------------------
// Loopback sockets
// ---------------------------------------------------------------------------

type StreamSlot = Arc<Mutex<Option<TcpStream>>>;

struct PendingWorker {
    senders: WorkerSenders,
    stream: StreamSlot,
}

struct SocketDownlink {
    index: usize,
    stream: StreamSlot,
}

impl Downlink for SocketDownlink {
    fn send(&self, message: OrchestratorMessage) -> FuzzResult<()> {
        let mut guard = self.stream.lock().unwrap_or_else(PoisonError::into_inner);
        let stream = guard.as_mut().ok_or_else(|| {
            FuzzError::protocol(format!("worker #{} has not connected", self.index))
        })?;
        write_frame(stream, &message)
    }
}

/// Loopback listener that worker processes connect back to
#[derive(Clone)]
pub struct ControlServer {
    addr: SocketAddr,
    pending: Arc<Mutex<HashMap<usize, PendingWorker>>>,
}

impl fmt::Debug for ControlServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControlServer")
            .field("addr", &self.addr)
            .finish_non_exhaustive()
    }
}

impl ControlServer {
    /// Listen on an ephemeral loopback port
    pub fn bind() -> FuzzResult<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        let pending: Arc<Mutex<HashMap<usize, PendingWorker>>> = Arc::default();
        let registry = Arc::clone(&pending);
        thread::Builder::new()
            .name("chainfuzz-accept".into())
            .spawn(move || {
                for stream in listener.incoming() {
                    let stream = match stream {
                        Ok(stream) => stream,
                        Err(e) => {
                            warn!(error = %e, "failed to accept worker connection");
                            continue;
                        }
                    };
                    let registry = Arc::clone(&registry);
                    let spawned = thread::Builder::new()
                        .name("chainfuzz-link".into())
                        .spawn(move || {
                            if let Err(e) = serve_connection(stream, &registry) {
                                warn!(error = %e, "worker link closed with error");
                            }
                        });
                    if let Err(e) = spawned {
                        warn!(error = %e, "failed to spawn link thread");
                    }
                }
            })?;
        debug!(%addr, "control server listening");
        Ok(Self { addr, pending })
    }

    /// Address workers connect to
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Expect a connection from worker `index`
    #[must_use]
    pub fn register(&self, index: usize) -> WorkerChannels {
        let stream: StreamSlot = Arc::default();
        let (senders, channels) = upward(Box::new(SocketDownlink {
            index,
            stream: Arc::clone(&stream),
        }));
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(index, PendingWorker { senders, stream });
        channels
    }
}

fn serve_connection(
    mut stream: TcpStream,
    registry: &Mutex<HashMap<usize, PendingWorker>>,
) -> FuzzResult<()> {
    let hello: WorkerMessage = read_frame(&mut stream)?
        .ok_or_else(|| FuzzError::protocol("connection closed before hello"))?;
    let WorkerMessage::Hello {
        index,
        protocol_version,
    } = hello
    else {
        return Err(FuzzError::protocol("first frame was not a hello"));
    };
    if protocol_version != PROTOCOL_VERSION {
        return Err(FuzzError::protocol(format!(
            "worker #{index} speaks protocol {protocol_version}, expected {PROTOCOL_VERSION}"
        )));
    }
    let worker = registry
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(&index)
        .ok_or_else(|| FuzzError::protocol(format!("unexpected connection from worker #{index}")))?;
    *worker.stream.lock().unwrap_or_else(PoisonError::into_inner) = Some(stream.try_clone()?);
    debug!(worker = index, "worker connected");

    while let Some(message) = read_frame::<_, WorkerMessage>(&mut stream)? {
        worker.senders.route(message)?;
    }
    debug!(worker = index, "worker link closed");
    Ok(())
}

/// Worker end of a socket link
///
/// A background thread reads orchestrator messages. When the orchestrator
/// sends [`OrchestratorMessage::Shutdown`] or the connection drops, the
/// registered hooks run and the process exits.
pub struct SocketUplink {
    writer: Mutex<TcpStream>,
    inbox: Mutex<Receiver<OrchestratorMessage>>,
    hooks: Arc<Mutex<Vec<LostHook>>>,
}

impl fmt::Debug for SocketUplink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketUplink").finish_non_exhaustive()
    }
}

fn run_hooks(hooks: &Mutex<Vec<LostHook>>) {
    let hooks = std::mem::take(&mut *hooks.lock().unwrap_or_else(PoisonError::into_inner));
    for hook in hooks {
        hook();
    }
}

impl SocketUplink {
    /// Connect to the orchestrator at `addr` and announce worker `index`
    pub fn connect(addr: &str, index: usize) -> FuzzResult<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let mut writer = stream.try_clone()?;
        write_frame(
            &mut writer,
            &WorkerMessage::Hello {
                index,
                protocol_version: PROTOCOL_VERSION,
            },
        )?;

        let (tx, rx) = mpsc::channel();
        let hooks: Arc<Mutex<Vec<LostHook>>> = Arc::default();
        let reader_hooks = Arc::clone(&hooks);
        let mut reader = stream;
        thread::Builder::new()
            .name("chainfuzz-uplink".into())
            .spawn(move || loop {
                match read_frame::<_, OrchestratorMessage>(&mut reader) {
                    Ok(Some(OrchestratorMessage::Shutdown)) => {
                        debug!(worker = index, "shutdown requested");
                        run_hooks(&reader_hooks);
                        std::process::exit(CONTROL_LOST_EXIT_CODE);
                    }
                    Ok(Some(message)) => {
                        if tx.send(message).is_err() {
                            return;
                        }
                    }
                    Ok(None) | Err(_) => {
                        warn!(worker = index, "lost connection to orchestrator");
                        run_hooks(&reader_hooks);
                        std::process::exit(CONTROL_LOST_EXIT_CODE);
                    }
                }
            })?;

        Ok(Self {
            writer: Mutex::new(writer),
            inbox: Mutex::new(rx),
            hooks,
        })
    }
}

impl Uplink for SocketUplink {
    fn send(&self, message: WorkerMessage) -> FuzzResult<()> {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        write_frame(&mut *writer, &message)
    }

    fn recv(&self) -> FuzzResult<OrchestratorMessage> {
        self.inbox
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .recv()
            .map_err(|_| FuzzError::protocol("orchestrator hung up"))
    }

    fn on_connection_lost(&self, hook: LostHook) {
        self.hooks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(hook);
    }
}
