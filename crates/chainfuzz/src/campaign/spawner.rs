//! Starting workers.

use crate::chain::{ChainBackend, RetryPolicy};
use crate::protocol::{channel_pair, ControlServer, WorkerChannels};
use crate::result::FuzzResult;
use crate::test_fn::FuzzTest;
use crate::worker::{run_worker, WorkerExit, WorkerSpec, CONTROL_ADDR_ENV, WORKER_SPEC_ENV};
use std::fs::File;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, info, warn};

/// A running worker, as seen by the orchestrator
pub trait WorkerProcess: Send {
    /// Exit status if the worker terminated
    fn try_wait(&mut self) -> FuzzResult<Option<String>>;

    /// Terminate the worker
    fn kill(&mut self);

    /// OS process id, if there is one
    fn id(&self) -> Option<u32>;
}

/// Starts workers for a campaign
pub trait WorkerSpawner {
    /// Start the worker described by `spec`
    fn spawn(&self, spec: &WorkerSpec) -> FuzzResult<(Box<dyn WorkerProcess>, WorkerChannels)>;
}

// ---------------------------------------------------------------------------
// Subprocesses
// ---------------------------------------------------------------------------

/// Re-executes a binary in worker mode, one process per worker
#[derive(Debug)]
pub struct ProcessSpawner {
    program: PathBuf,
    args: Vec<String>,
    server: ControlServer,
}

impl ProcessSpawner {
    /// Spawn `program` with `args` for every worker
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> FuzzResult<Self> {
        Ok(Self {
            program: program.into(),
            args,
            server: ControlServer::bind()?,
        })
    }

    /// Spawn the currently running executable
    pub fn current_exe() -> FuzzResult<Self> {
        Self::new(std::env::current_exe()?, Vec::new())
    }
}

impl WorkerSpawner for ProcessSpawner {
    fn spawn(&self, spec: &WorkerSpec) -> FuzzResult<(Box<dyn WorkerProcess>, WorkerChannels)> {
        let channels = self.server.register(spec.index);
        let log = File::create(&spec.log_path)?;

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .env(WORKER_SPEC_ENV, serde_json::to_string(spec)?)
            .env(CONTROL_ADDR_ENV, self.server.addr().to_string())
            .stdin(Stdio::null());
        if !spec.tee {
            cmd.stdout(log.try_clone()?).stderr(log);
        }

        let child = cmd.spawn()?;
        info!(worker = spec.index, pid = child.id(), port = spec.port, "spawned worker");
        Ok((Box::new(ChildWorker { child }), channels))
    }
}

struct ChildWorker {
    child: Child,
}

impl WorkerProcess for ChildWorker {
    fn try_wait(&mut self) -> FuzzResult<Option<String>> {
        Ok(self.child.try_wait()?.map(|status| status.to_string()))
    }

    fn kill(&mut self) {
        if let Err(e) = self.child.kill() {
            debug!(pid = self.child.id(), error = %e, "worker already gone");
        }
        let _ = self.child.wait();
    }

    fn id(&self) -> Option<u32> {
        Some(self.child.id())
    }
}

// ---------------------------------------------------------------------------
// Threads
// ---------------------------------------------------------------------------

/// Runs worker logic on threads of this process
///
/// Workers share the process, so a worker cannot be killed; use this for
/// tests and debugging.
pub struct InProcessSpawner {
    test: &'static FuzzTest,
    backend: Arc<dyn ChainBackend>,
    retry: RetryPolicy,
}

impl std::fmt::Debug for InProcessSpawner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InProcessSpawner")
            .field("test", &self.test.name)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl InProcessSpawner {
    /// Run `test` against nodes from `backend`
    #[must_use]
    pub fn new(test: &'static FuzzTest, backend: Arc<dyn ChainBackend>) -> Self {
        Self {
            test,
            backend,
            retry: RetryPolicy::default(),
        }
    }

    /// Use a custom connect-retry policy
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl WorkerSpawner for InProcessSpawner {
    fn spawn(&self, spec: &WorkerSpec) -> FuzzResult<(Box<dyn WorkerProcess>, WorkerChannels)> {
        let (uplink, channels) = channel_pair();
        let test = self.test;
        let backend = Arc::clone(&self.backend);
        let retry = self.retry;
        let spec = spec.clone();
        let handle = thread::Builder::new()
            .name(format!("chainfuzz-worker-{}", spec.index))
            .spawn(move || run_worker(test, &spec, Arc::new(uplink), backend.as_ref(), retry))?;
        Ok((
            Box::new(ThreadWorker {
                handle: Some(handle),
                status: None,
            }),
            channels,
        ))
    }
}

struct ThreadWorker {
    handle: Option<JoinHandle<FuzzResult<WorkerExit>>>,
    status: Option<String>,
}

impl WorkerProcess for ThreadWorker {
    fn try_wait(&mut self) -> FuzzResult<Option<String>> {
        if self.status.is_none() && self.handle.as_ref().is_some_and(JoinHandle::is_finished) {
            self.status = self.handle.take().map(|handle| match handle.join() {
                Ok(Ok(exit)) => format!("{exit:?}"),
                Ok(Err(e)) => format!("error: {e}"),
                Err(_) => "panicked".to_string(),
            });
        }
        Ok(self.status.clone())
    }

    fn kill(&mut self) {
        if self.handle.take().is_some() {
            warn!("in-process workers cannot be killed; detaching thread");
            self.status = Some("detached".to_string());
        }
    }

    fn id(&self) -> Option<u32> {
        None
    }
}
