//! Per-worker context handed to test bodies.

use super::log_scope::LogSink;
use crate::chain::ChainClient;
use crate::node::NetworkKind;
use crate::seed::Seed;
use rand::rngs::StdRng;
use std::fmt::Debug;
use std::io::Write;

/// Everything a test body may touch, built once per worker
pub struct FuzzContext {
    index: usize,
    seed: Seed,
    rng: StdRng,
    chain: ChainClient,
    network: NetworkKind,
    out: Box<dyn Write + Send>,
    watched: Vec<(String, String)>,
}

impl std::fmt::Debug for FuzzContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FuzzContext")
            .field("index", &self.index)
            .field("seed", &self.seed)
            .field("network", &self.network)
            .field("chain", &self.chain)
            .finish_non_exhaustive()
    }
}

impl FuzzContext {
    pub(crate) fn new(
        index: usize,
        seed: Seed,
        chain: ChainClient,
        network: NetworkKind,
        out: LogSink,
    ) -> Self {
        Self {
            index,
            seed,
            rng: seed.rng(),
            chain,
            network,
            out: Box::new(out),
            watched: Vec::new(),
        }
    }

    /// Worker index
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Seed of this worker
    #[must_use]
    pub fn seed(&self) -> Seed {
        self.seed
    }

    /// Random generator seeded from [`FuzzContext::seed`]
    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Client for this worker's node
    #[must_use]
    pub fn chain(&self) -> &ChainClient {
        &self.chain
    }

    /// Kind of node this worker runs
    #[must_use]
    pub fn network(&self) -> NetworkKind {
        self.network
    }

    /// Writer for test output; lands in the worker log
    pub fn out(&mut self) -> &mut dyn Write {
        &mut *self.out
    }

    /// Record a named value shown with the failure if the test fails.
    ///
    /// Watching a name again replaces the previous value.
    pub fn watch(&mut self, name: &str, value: impl Debug) {
        let rendered = format!("{value:?}");
        match self.watched.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = rendered,
            None => self.watched.push((name.to_string(), rendered)),
        }
    }

    /// Watched values, in first-watched order
    #[must_use]
    pub fn watched(&self) -> Vec<(String, String)> {
        self.watched.clone()
    }
}
