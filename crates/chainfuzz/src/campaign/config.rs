//! Campaign configuration.

use crate::node::NetworkKind;
use crate::result::{FuzzError, FuzzResult};
use crate::seed::Seed;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Port of worker #0's node; worker `i` uses `DEFAULT_BASE_PORT + i`
pub const DEFAULT_BASE_PORT: u16 = 8545;

/// Configuration of one fuzz campaign
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignConfig {
    /// Number of workers
    pub process_count: usize,
    /// Seeds for the first workers; the rest are generated
    pub seeds: Vec<Seed>,
    /// Directory receiving worker logs; must exist
    pub logs_dir: PathBuf,
    /// Only worker #0 talks to the terminal
    pub passive: bool,
    /// Node kind
    pub network: NetworkKind,
    /// Coverage is collected by workers `0..coverage_workers`
    pub coverage_workers: usize,
    /// Show per-function hit counts under the progress line
    pub verbose_coverage: bool,
    /// Port of worker #0's node
    pub base_port: u16,
    /// Orchestrator poll interval
    pub poll_interval: Duration,
    /// Directory receiving coverage files
    pub coverage_dir: PathBuf,
    /// Detach automatically if nobody answers the attach prompt in time
    pub decision_timeout: Option<Duration>,
    /// How long to wait for a finished worker to exit before killing it
    pub reap_timeout: Duration,
    /// How long a worker may be gone before it is declared dead
    pub dead_worker_grace: Duration,
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            process_count: 1,
            seeds: Vec::new(),
            logs_dir: PathBuf::from(".chainfuzz-logs"),
            passive: false,
            network: NetworkKind::Anvil,
            coverage_workers: 0,
            verbose_coverage: false,
            base_port: DEFAULT_BASE_PORT,
            poll_interval: Duration::from_millis(125),
            coverage_dir: PathBuf::from("."),
            decision_timeout: None,
            reap_timeout: Duration::from_secs(10),
            dead_worker_grace: Duration::from_secs(2),
        }
    }
}

impl CampaignConfig {
    /// Create a new builder
    #[must_use]
    pub fn builder() -> CampaignConfigBuilder {
        CampaignConfigBuilder::default()
    }

    /// Check the campaign entry contract
    pub fn validate(&self) -> FuzzResult<()> {
        if self.process_count == 0 {
            return Err(FuzzError::configuration("process count must be at least 1"));
        }
        if self.coverage_workers > self.process_count {
            return Err(FuzzError::configuration(format!(
                "coverage worker count {} exceeds process count {}",
                self.coverage_workers, self.process_count
            )));
        }
        let last_port = usize::from(self.base_port) + self.process_count - 1;
        if last_port > usize::from(u16::MAX) {
            return Err(FuzzError::configuration(format!(
                "{} workers starting at port {} exceed the port range",
                self.process_count, self.base_port
            )));
        }
        if !self.logs_dir.is_dir() {
            return Err(FuzzError::configuration(format!(
                "logs directory '{}' does not exist",
                self.logs_dir.display()
            )));
        }
        Ok(())
    }

    /// Node port of worker `index`
    #[must_use]
    pub fn port_for(&self, index: usize) -> u16 {
        u16::try_from(usize::from(self.base_port) + index).unwrap_or(u16::MAX)
    }

    /// Whether worker `index` collects coverage
    #[must_use]
    pub fn collects_coverage(&self, index: usize) -> bool {
        index < self.coverage_workers
    }

    /// Whether worker `index` duplicates its output to the terminal
    #[must_use]
    pub fn tees_output(&self, index: usize) -> bool {
        self.passive && index == 0
    }

    /// Whether a failure of worker `index` is shown and prompted for
    #[must_use]
    pub fn prompts_for(&self, index: usize) -> bool {
        !self.passive || index == 0
    }
}

/// Builder for `CampaignConfig`
#[derive(Debug, Clone, Default)]
pub struct CampaignConfigBuilder {
    config: CampaignConfig,
}

impl CampaignConfigBuilder {
    /// Set worker count
    #[must_use]
    pub fn process_count(mut self, count: usize) -> Self {
        self.config.process_count = count;
        self
    }

    /// Set supplied seeds
    #[must_use]
    pub fn seeds(mut self, seeds: Vec<Seed>) -> Self {
        self.config.seeds = seeds;
        self
    }

    /// Set logs directory
    #[must_use]
    pub fn logs_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.logs_dir = dir.into();
        self
    }

    /// Enable/disable passive mode
    #[must_use]
    pub fn passive(mut self, passive: bool) -> Self {
        self.config.passive = passive;
        self
    }

    /// Set node kind
    #[must_use]
    pub fn network(mut self, network: NetworkKind) -> Self {
        self.config.network = network;
        self
    }

    /// Set number of coverage-collecting workers
    #[must_use]
    pub fn coverage_workers(mut self, count: usize) -> Self {
        self.config.coverage_workers = count;
        self
    }

    /// Enable/disable per-function coverage lines
    #[must_use]
    pub fn verbose_coverage(mut self, verbose: bool) -> Self {
        self.config.verbose_coverage = verbose;
        self
    }

    /// Set base port
    #[must_use]
    pub fn base_port(mut self, port: u16) -> Self {
        self.config.base_port = port;
        self
    }

    /// Set poll interval
    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.config.poll_interval = interval;
        self
    }

    /// Set coverage output directory
    #[must_use]
    pub fn coverage_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.coverage_dir = dir.into();
        self
    }

    /// Set attach prompt timeout
    #[must_use]
    pub fn decision_timeout(mut self, timeout: Duration) -> Self {
        self.config.decision_timeout = Some(timeout);
        self
    }

    /// Set reap timeout
    #[must_use]
    pub fn reap_timeout(mut self, timeout: Duration) -> Self {
        self.config.reap_timeout = timeout;
        self
    }

    /// Set dead worker grace period
    #[must_use]
    pub fn dead_worker_grace(mut self, grace: Duration) -> Self {
        self.config.dead_worker_grace = grace;
        self
    }

    /// Build the configuration
    #[must_use]
    pub fn build(self) -> CampaignConfig {
        self.config
    }
}
