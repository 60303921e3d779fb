//! Campaign orchestrator.
//!
//! Spawns one worker per seed, then sweeps over the active workers until all
//! of them finished:
//!
//! ```text
//! for each active worker, every poll interval:
//!     drain coverage ──► aggregate ──► persist
//!     completion? ──► exception slot
//!         None ──────────────────────────────► reap
//!         Some ──► render, prompt ──► Decision ──► second completion ──► reap
//!     gone without completion for longer than the grace period? ──► WorkerDied
//! ```
//!
//! Failures are handled one at a time on the orchestrator thread.

mod config;
mod progress;
mod prompt;
mod render;
mod spawner;

pub use config::{CampaignConfig, CampaignConfigBuilder, DEFAULT_BASE_PORT};
pub use progress::{status_text, CampaignProgress};
pub use prompt::{parse_answer, DecisionPrompt, PromptOutcome, ScriptedPrompt, TerminalPrompt, ATTACH_PROMPT};
pub use render::render_failure;
pub use spawner::{InProcessSpawner, ProcessSpawner, WorkerProcess, WorkerSpawner};

use crate::coverage::CoverageAggregator;
use crate::protocol::{ExceptionEnvelope, Handshake, OrchestratorMessage, WorkerChannels};
use crate::result::{FuzzError, FuzzResult};
use crate::seed::{pad_seeds, Seed};
use crate::test_fn::FuzzTest;
use crate::worker::{log_file_name, WorkerSpec};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::mpsc::{RecvTimeoutError, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

const REAP_POLL: Duration = Duration::from_millis(10);

/// How one worker ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// The test body returned normally
    Passed,
    /// The worker reported a failure
    Failed {
        /// What went wrong
        envelope: ExceptionEnvelope,
        /// Whether a debugger was attached
        attached: bool,
    },
}

/// Result of one worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSummary {
    /// Worker index
    pub index: usize,
    /// Seed the worker ran with
    pub seed: Seed,
    /// Outcome
    pub outcome: WorkerOutcome,
}

/// Result of a whole campaign
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CampaignReport {
    /// Per-worker results, by index
    pub workers: Vec<WorkerSummary>,
    /// Coverage files written last
    pub coverage_files: Vec<PathBuf>,
}

impl CampaignReport {
    /// No worker reported a failure
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.workers
            .iter()
            .all(|w| matches!(w.outcome, WorkerOutcome::Passed))
    }

    /// Workers that reported a failure
    pub fn failures(&self) -> impl Iterator<Item = &WorkerSummary> {
        self.workers
            .iter()
            .filter(|w| matches!(w.outcome, WorkerOutcome::Failed { .. }))
    }
}

/// A worker the orchestrator is still responsible for
struct Tracked {
    index: usize,
    seed: Seed,
    log_path: PathBuf,
    process: Box<dyn WorkerProcess>,
    channels: WorkerChannels,
    handshake: Handshake,
    gone_since: Option<Instant>,
}

impl Tracked {
    /// Keep only the newest queued snapshot; `true` if there was one
    fn drain_coverage(&self, aggregator: &mut CoverageAggregator) -> bool {
        let mut latest = None;
        while let Ok(snapshot) = self.channels.coverage.try_recv() {
            latest = Some(snapshot);
        }
        match latest {
            Some(snapshot) => {
                aggregator.submit(self.index, snapshot);
                true
            }
            None => false,
        }
    }

    fn is_alive(&mut self) -> bool {
        matches!(self.process.try_wait(), Ok(None))
    }

    /// Fails once the worker has been gone without completing for `grace`
    fn check_liveness(&mut self, disconnected: bool, grace: Duration) -> FuzzResult<()> {
        let status = match self.process.try_wait()? {
            Some(status) => status,
            None if disconnected => "control connection closed".to_string(),
            None => {
                self.gone_since = None;
                return Ok(());
            }
        };
        let since = *self.gone_since.get_or_insert_with(Instant::now);
        if since.elapsed() >= grace {
            Err(FuzzError::WorkerDied {
                index: self.index,
                status,
            })
        } else {
            Ok(())
        }
    }

    fn await_completion(&mut self, poll: Duration, grace: Duration) -> FuzzResult<()> {
        self.gone_since = None;
        loop {
            match self.channels.completion.recv_timeout(poll) {
                Ok(()) => return Ok(()),
                Err(RecvTimeoutError::Timeout) => self.check_liveness(false, grace)?,
                Err(RecvTimeoutError::Disconnected) => {
                    self.check_liveness(true, grace)?;
                    thread::sleep(poll);
                }
            }
        }
    }

    /// Wait for the worker to exit on its own, then kill it
    fn reap(&mut self, timeout: Duration) {
        let deadline = Instant::now() + timeout;
        loop {
            match self.process.try_wait() {
                Ok(Some(status)) => {
                    debug!(worker = self.index, %status, "worker reaped");
                    return;
                }
                Ok(None) if Instant::now() < deadline => thread::sleep(REAP_POLL),
                Ok(None) => {
                    warn!(worker = self.index, pid = ?self.process.id(), "worker did not exit in time, killing");
                    self.process.kill();
                    return;
                }
                Err(e) => {
                    warn!(worker = self.index, error = %e, "cannot wait for worker, killing");
                    self.process.kill();
                    return;
                }
            }
        }
    }

    fn shutdown(&mut self, timeout: Duration) {
        if let Err(e) = self.channels.downlink.send(OrchestratorMessage::Shutdown) {
            debug!(worker = self.index, error = %e, "shutdown not delivered");
        }
        self.reap(timeout);
    }
}

/// A configured fuzz campaign
#[derive(Debug, Clone)]
pub struct Campaign {
    config: CampaignConfig,
}

impl Campaign {
    /// Create a campaign
    #[must_use]
    pub fn new(config: CampaignConfig) -> Self {
        Self { config }
    }

    /// Campaign configuration
    #[must_use]
    pub fn config(&self) -> &CampaignConfig {
        &self.config
    }

    /// Spec of worker `index`
    #[must_use]
    pub fn worker_spec(&self, test: &FuzzTest, index: usize, seed: Seed) -> WorkerSpec {
        let config = &self.config;
        WorkerSpec {
            index,
            test: test.qualified_name(),
            seed,
            port: config.port_for(index),
            log_path: config.logs_dir.join(log_file_name(test, index)),
            tee: config.tees_output(index),
            network: config.network,
            coverage: config.collects_coverage(index),
        }
    }

    /// Run `test` in every worker until all of them finished.
    ///
    /// Returns an error only for campaign-fatal conditions; failing tests
    /// are reported in the [`CampaignReport`].
    pub fn run(
        &self,
        test: &FuzzTest,
        spawner: &dyn WorkerSpawner,
        prompt: &mut dyn DecisionPrompt,
    ) -> FuzzResult<CampaignReport> {
        let config = &self.config;
        config.validate()?;
        let seeds = pad_seeds(&config.seeds, config.process_count);
        info!(
            test = %test.qualified_name(),
            processes = config.process_count,
            coverage_workers = config.coverage_workers,
            network = %config.network,
            "starting campaign"
        );

        let progress =
            CampaignProgress::start(config.process_count, config.passive, config.verbose_coverage);
        let mut active = BTreeMap::new();
        for (index, seed) in seeds.into_iter().enumerate() {
            progress.println(format!("Using seed '{seed}' for process #{index}"));
            let spec = self.worker_spec(test, index, seed);
            match spawner.spawn(&spec) {
                Ok((process, channels)) => {
                    active.insert(
                        index,
                        Tracked {
                            index,
                            seed,
                            log_path: spec.log_path.clone(),
                            process,
                            channels,
                            handshake: Handshake::new(),
                            gone_since: None,
                        },
                    );
                }
                Err(e) => {
                    error!(worker = index, error = %e, "failed to spawn worker");
                    self.shutdown_all(&mut active);
                    progress.finish();
                    return Err(e);
                }
            }
        }

        let mut report = CampaignReport::default();
        let mut aggregator = CoverageAggregator::new();
        let result = self.sweep(&mut active, &mut aggregator, &progress, prompt, &mut report);
        if let Err(e) = &result {
            error!(error = %e, "campaign aborted");
            self.shutdown_all(&mut active);
        }
        progress.finish();
        result?;

        report.workers.sort_by_key(|w| w.index);
        info!(
            passed = report.workers.len() - report.failures().count(),
            failed = report.failures().count(),
            "campaign finished"
        );
        Ok(report)
    }

    fn sweep(
        &self,
        active: &mut BTreeMap<usize, Tracked>,
        aggregator: &mut CoverageAggregator,
        progress: &CampaignProgress,
        prompt: &mut dyn DecisionPrompt,
        report: &mut CampaignReport,
    ) -> FuzzResult<()> {
        let config = &self.config;
        while !active.is_empty() {
            let mut coverage_changed = false;
            let mut completed = Vec::new();

            for (index, worker) in active.iter_mut() {
                coverage_changed |= worker.drain_coverage(aggregator);
                match worker.channels.completion.try_recv() {
                    Ok(()) => completed.push(*index),
                    Err(TryRecvError::Empty) => {
                        worker.check_liveness(false, config.dead_worker_grace)?;
                    }
                    Err(TryRecvError::Disconnected) => {
                        worker.check_liveness(true, config.dead_worker_grace)?;
                    }
                }
            }

            for index in &completed {
                let Some(mut worker) = active.remove(index) else {
                    continue;
                };
                let outcome = self.finish_worker(&mut worker, progress, prompt);
                coverage_changed |= worker.drain_coverage(aggregator);
                match outcome {
                    Ok(outcome) => report.workers.push(WorkerSummary {
                        index: worker.index,
                        seed: worker.seed,
                        outcome,
                    }),
                    Err(e) => {
                        worker.shutdown(config.reap_timeout);
                        return Err(e);
                    }
                }
            }

            if coverage_changed {
                match aggregator.persist(&config.coverage_dir) {
                    Ok(files) if !files.is_empty() => report.coverage_files = files,
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "failed to write coverage files"),
                }
            }
            progress.update(active.len(), &aggregator.summary_lines());

            if completed.is_empty() {
                thread::sleep(config.poll_interval);
            }
        }
        Ok(())
    }

    /// Handle a worker that signalled completion and reap it
    fn finish_worker(
        &self,
        worker: &mut Tracked,
        progress: &CampaignProgress,
        prompt: &mut dyn DecisionPrompt,
    ) -> FuzzResult<WorkerOutcome> {
        let config = &self.config;
        let index = worker.index;
        let slot = worker.channels.exception.try_recv().map_err(|_| {
            FuzzError::protocol(format!(
                "worker #{index} signalled completion without reporting an outcome"
            ))
        })?;

        let Some(envelope) = slot else {
            worker.handshake.finish()?;
            debug!(worker = index, "worker passed");
            worker.reap(config.reap_timeout);
            return Ok(WorkerOutcome::Passed);
        };

        worker.handshake.raise()?;
        worker.handshake.await_decision()?;

        let attach = if config.prompts_for(index) {
            info!(worker = index, %envelope, "worker reported a failure");
            progress.suspend(|| {
                eprintln!("{}", render_failure(index, &envelope));
                if envelope.is_debuggable() {
                    self.ask(worker, &envelope, prompt)
                } else {
                    Ok(false)
                }
            })?
        } else {
            warn!(
                worker = index,
                %envelope,
                log = %worker.log_path.display(),
                "worker reported a failure"
            );
            false
        };

        worker.handshake.resolve(attach)?;
        worker
            .channels
            .downlink
            .send(OrchestratorMessage::Decision { attach })
            .map_err(|e| FuzzError::WorkerDied {
                index,
                status: e.to_string(),
            })?;
        info!(worker = index, attach, "decision sent");

        worker.await_completion(config.poll_interval, config.dead_worker_grace)?;
        worker.handshake.finish()?;
        worker.reap(config.reap_timeout);
        Ok(WorkerOutcome::Failed {
            envelope,
            attached: attach,
        })
    }

    fn ask(
        &self,
        worker: &mut Tracked,
        envelope: &ExceptionEnvelope,
        prompt: &mut dyn DecisionPrompt,
    ) -> FuzzResult<bool> {
        let index = worker.index;
        let outcome = prompt.decide(index, envelope, &mut || worker.is_alive());
        match outcome {
            PromptOutcome::Answer(attach) => Ok(attach),
            PromptOutcome::TimedOut => {
                warn!(worker = index, "no answer to attach prompt, detaching");
                Ok(false)
            }
            PromptOutcome::Abandoned => {
                let status = worker
                    .process
                    .try_wait()
                    .ok()
                    .flatten()
                    .unwrap_or_else(|| "exited while awaiting decision".to_string());
                Err(FuzzError::WorkerDied { index, status })
            }
        }
    }

    fn shutdown_all(&self, active: &mut BTreeMap<usize, Tracked>) {
        for worker in active.values() {
            if let Err(e) = worker.channels.downlink.send(OrchestratorMessage::Shutdown) {
                debug!(worker = worker.index, error = %e, "shutdown not delivered");
            }
        }
        for (_, mut worker) in std::mem::take(active) {
            worker.reap(self.config.reap_timeout);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::chain::stub::StubBackend;
    use crate::chain::RetryPolicy;
    use crate::coverage::{read_coverage_file, CoverageProbe, IdePosition, FULL_COVERAGE_FILE};
    use crate::protocol::{channel_pair, EnvelopeOrigin};
    use crate::test_fn::TestResult;
    use crate::worker::{FuzzContext, TestArgs};
    use std::path::Path;
    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    fn config(dir: &Path, count: usize) -> CampaignConfigBuilder {
        CampaignConfig::builder()
            .process_count(count)
            .logs_dir(dir)
            .coverage_dir(dir)
            .poll_interval(Duration::from_millis(5))
            .reap_timeout(Duration::from_secs(5))
            .dead_worker_grace(Duration::from_millis(50))
    }

    fn spawner(test: &'static FuzzTest, backend: StubBackend) -> InProcessSpawner {
        InProcessSpawner::new(test, Arc::new(backend)).with_retry(RetryPolicy {
            poll_interval: Duration::from_millis(1),
            timeout: Duration::from_millis(500),
        })
    }

    fn passing(_: &mut FuzzContext, _: &mut TestArgs) -> TestResult {
        Ok(())
    }

    fn second_worker_breaks(ctx: &mut FuzzContext, _: &mut TestArgs) -> TestResult {
        ctx.watch("index", ctx.index());
        assert!(ctx.index() != 1, "invariant broken");
        Ok(())
    }

    fn always_breaks(_: &mut FuzzContext, _: &mut TestArgs) -> TestResult {
        Err("invariant broken".into())
    }

    fn covering(_: &mut FuzzContext, args: &mut TestArgs) -> TestResult {
        let probe: Option<CoverageProbe> = args.take("coverage")?;
        if let Some(mut probe) = probe {
            probe.record_hits("A.sol", IdePosition::new(10, 0, 10, 20), "transfer", 5);
        }
        Ok(())
    }

    static PASSING: FuzzTest = FuzzTest::new("demo", "passing", &[], passing);
    static SECOND_BREAKS: FuzzTest = FuzzTest::new("demo", "second_breaks", &[], second_worker_breaks);
    static ALWAYS_BREAKS: FuzzTest = FuzzTest::new("demo", "always_breaks", &[], always_breaks);
    static COVERING: FuzzTest = FuzzTest::new("demo", "covering", &["coverage"], covering);
    static BAD_PARAMS: FuzzTest = FuzzTest::new("demo", "bad_params", &["accounts"], passing);

    #[test]
    fn test_supplied_seeds_then_generated() {
        let dir = tempfile::tempdir().unwrap();
        let backend = StubBackend::default();
        let ledger = Arc::clone(&backend.ledger);
        let config = config(dir.path(), 3)
            .seeds(vec![Seed::new([1; 8]), Seed::new([2; 8])])
            .build();

        let report = Campaign::new(config)
            .run(&PASSING, &spawner(&PASSING, backend), &mut ScriptedPrompt::default())
            .unwrap();

        assert!(report.is_success());
        assert_eq!(report.workers.len(), 3);
        assert_eq!(report.workers[0].seed, Seed::new([1; 8]));
        assert_eq!(report.workers[1].seed, Seed::new([2; 8]));
        assert_eq!(report.workers[2].seed.as_bytes().len(), 8);
        assert_eq!(ledger.launches.load(Ordering::SeqCst), 3);
        assert_eq!(ledger.stops.load(Ordering::SeqCst), 3);
        assert!(dir.path().join("demo.passing_2.ansi").exists());
    }

    #[test]
    fn test_failing_worker_declined_debugger() {
        let dir = tempfile::tempdir().unwrap();
        let backend = StubBackend::default();
        let ledger = Arc::clone(&backend.ledger);
        let mut prompt = ScriptedPrompt::new([PromptOutcome::Answer(false)]);

        let report = Campaign::new(config(dir.path(), 4).build())
            .run(&SECOND_BREAKS, &spawner(&SECOND_BREAKS, backend), &mut prompt)
            .unwrap();

        assert!(!report.is_success());
        assert_eq!(prompt.asked(), &[1]);
        assert_eq!(report.workers.len(), 4);
        let failures: Vec<_> = report.failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].index, 1);
        match &failures[0].outcome {
            WorkerOutcome::Failed { envelope, attached } => {
                assert!(!attached);
                assert_eq!(envelope.kind, "panic");
                assert_eq!(envelope.message, "invariant broken");
                assert_eq!(envelope.origin, EnvelopeOrigin::TestBody);
            }
            WorkerOutcome::Passed => panic!("worker #1 should have failed"),
        }
        assert_eq!(ledger.stops.load(Ordering::SeqCst), 4);
    }

    struct NodeCheckingPrompt {
        ledger: Arc<crate::chain::stub::StubLedger>,
        stops_at_decision: Option<usize>,
    }

    impl DecisionPrompt for NodeCheckingPrompt {
        fn decide(
            &mut self,
            _index: usize,
            _envelope: &ExceptionEnvelope,
            _worker_alive: &mut dyn FnMut() -> bool,
        ) -> PromptOutcome {
            self.stops_at_decision = Some(self.ledger.stops.load(Ordering::SeqCst));
            PromptOutcome::Answer(false)
        }
    }

    #[test]
    fn test_node_outlives_decision() {
        let dir = tempfile::tempdir().unwrap();
        let backend = StubBackend::default();
        let ledger = Arc::clone(&backend.ledger);
        let mut prompt = NodeCheckingPrompt {
            ledger: Arc::clone(&ledger),
            stops_at_decision: None,
        };

        let report = Campaign::new(config(dir.path(), 1).build())
            .run(&ALWAYS_BREAKS, &spawner(&ALWAYS_BREAKS, backend), &mut prompt)
            .unwrap();

        assert_eq!(report.failures().count(), 1);
        assert_eq!(prompt.stops_at_decision, Some(0));
        assert_eq!(ledger.stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_passive_mode_prompts_only_first_worker() {
        let dir = tempfile::tempdir().unwrap();
        let mut prompt = ScriptedPrompt::default();
        let config = config(dir.path(), 3).passive(true).build();

        let report = Campaign::new(config)
            .run(&ALWAYS_BREAKS, &spawner(&ALWAYS_BREAKS, StubBackend::default()), &mut prompt)
            .unwrap();

        assert_eq!(prompt.asked(), &[0]);
        assert_eq!(report.failures().count(), 3);
    }

    #[test]
    fn test_prompt_timeout_detaches() {
        let dir = tempfile::tempdir().unwrap();
        let mut prompt = ScriptedPrompt::new([PromptOutcome::TimedOut]);

        let report = Campaign::new(config(dir.path(), 1).build())
            .run(&ALWAYS_BREAKS, &spawner(&ALWAYS_BREAKS, StubBackend::default()), &mut prompt)
            .unwrap();

        assert!(matches!(
            report.workers[0].outcome,
            WorkerOutcome::Failed { attached: false, .. }
        ));
    }

    #[test]
    fn test_harness_failure_is_not_prompted() {
        let dir = tempfile::tempdir().unwrap();
        let mut prompt = ScriptedPrompt::default();

        let report = Campaign::new(config(dir.path(), 1).build())
            .run(&BAD_PARAMS, &spawner(&BAD_PARAMS, StubBackend::default()), &mut prompt)
            .unwrap();

        assert!(prompt.asked().is_empty());
        match &report.workers[0].outcome {
            WorkerOutcome::Failed { envelope, attached } => {
                assert!(!attached);
                assert_eq!(envelope.origin, EnvelopeOrigin::Harness);
                assert_eq!(envelope.kind, "ConfigurationError");
            }
            WorkerOutcome::Passed => panic!("bad parameters should fail"),
        }
    }

    #[test]
    fn test_coverage_from_two_workers_is_summed() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), 3).coverage_workers(2).build();

        let report = Campaign::new(config)
            .run(&COVERING, &spawner(&COVERING, StubBackend::default()), &mut ScriptedPrompt::default())
            .unwrap();

        assert!(report.is_success());
        assert_eq!(report.coverage_files.len(), 2);
        let merged = read_coverage_file(&dir.path().join(FULL_COVERAGE_FILE)).unwrap();
        let record = &merged["A.sol"][&IdePosition::new(10, 0, 10, 20)];
        assert_eq!(record.name, "transfer");
        assert_eq!(record.coverage_hits, 10);
    }

    #[test]
    fn test_no_coverage_workers_writes_no_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = config(dir.path(), 2).coverage_workers(0).build();

        let report = Campaign::new(config)
            .run(&COVERING, &spawner(&COVERING, StubBackend::default()), &mut ScriptedPrompt::default())
            .unwrap();

        assert!(report.is_success());
        assert!(report.coverage_files.is_empty());
        assert!(!dir.path().join(FULL_COVERAGE_FILE).exists());
    }

    struct DeadWorker;

    impl WorkerProcess for DeadWorker {
        fn try_wait(&mut self) -> FuzzResult<Option<String>> {
            Ok(Some("signal: 9 (SIGKILL)".to_string()))
        }

        fn kill(&mut self) {}

        fn id(&self) -> Option<u32> {
            None
        }
    }

    struct CrashingSpawner;

    impl WorkerSpawner for CrashingSpawner {
        fn spawn(&self, _spec: &WorkerSpec) -> FuzzResult<(Box<dyn WorkerProcess>, WorkerChannels)> {
            let (uplink, channels) = channel_pair();
            drop(uplink);
            Ok((Box::new(DeadWorker), channels))
        }
    }

    #[test]
    fn test_dead_worker_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = Campaign::new(config(dir.path(), 2).build())
            .run(&PASSING, &CrashingSpawner, &mut ScriptedPrompt::default())
            .unwrap_err();
        match err {
            FuzzError::WorkerDied { index, status } => {
                assert_eq!(index, 0);
                assert!(status.contains("SIGKILL"));
            }
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn test_abandoned_prompt_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut prompt = ScriptedPrompt::new([PromptOutcome::Abandoned]);
        let err = Campaign::new(config(dir.path(), 1).build())
            .run(&ALWAYS_BREAKS, &spawner(&ALWAYS_BREAKS, StubBackend::default()), &mut prompt)
            .unwrap_err();
        assert!(matches!(err, FuzzError::WorkerDied { index: 0, .. }));
    }

    #[test]
    fn test_invalid_config_spawns_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let backend = StubBackend::default();
        let ledger = Arc::clone(&backend.ledger);
        let config = config(dir.path(), 1).coverage_workers(2).build();
        assert!(Campaign::new(config)
            .run(&PASSING, &spawner(&PASSING, backend), &mut ScriptedPrompt::default())
            .is_err());
        assert_eq!(ledger.launches.load(Ordering::SeqCst), 0);
    }
}
