// Copyright (c) The teamcity-go-test Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::executor::ExecutorContext;
use crate::{
    config::RunConfig,
    errors::{TestRunnerBuildError, TestRunnerExecuteErrors, WriteEventError},
    parse::parse_output,
    record::{PendingTest, TestName, Verdict},
    service_message::format_record,
    write_str::WriteStr,
};
use std::{num::NonZeroUsize, sync::Arc};
use tokio::{
    runtime::Runtime,
    sync::{
        Mutex,
        mpsc::{self, UnboundedSender, unbounded_channel},
    },
    task::JoinHandle,
};
use tracing::{debug, info, warn};

/// Test runner options.
#[derive(Debug)]
pub struct TestRunnerBuilder {
    config: RunConfig,
}

impl TestRunnerBuilder {
    /// Creates a new builder for the given configuration.
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    /// Creates a new test runner for the given tests.
    ///
    /// Tests are handed to workers in the order they are listed here. Duplicate names are run
    /// once per occurrence.
    pub fn build(self, test_names: Vec<TestName>) -> Result<TestRunner, TestRunnerBuildError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("teamcity-runner-worker")
            .build()
            .map_err(TestRunnerBuildError::TokioRuntimeCreate)?;

        Ok(TestRunner {
            inner: TestRunnerInner {
                executor: Arc::new(ExecutorContext::new(&self.config)),
                parallelism: self.config.parallelism(),
                test_names,
            },
            runtime,
        })
    }
}

/// Context for running tests.
///
/// Created using [`TestRunnerBuilder::build`].
#[derive(Debug)]
pub struct TestRunner {
    inner: TestRunnerInner,
    runtime: Runtime,
}

impl TestRunner {
    /// Returns the number of tests that will be run.
    pub fn run_count(&self) -> usize {
        self.inner.test_names.len()
    }

    /// Executes the listed tests, each one in its own process, and writes one block of service
    /// messages per test to `writer`.
    ///
    /// Blocks are written whole, in the order tests finish. This method only returns once every
    /// test has finished, even if writing to `writer` fails partway through. In that case the
    /// remaining blocks are dropped and the write error is returned.
    ///
    /// Returns an error if writing failed or any of the worker tasks panicked.
    pub fn execute<W: WriteStr>(self, mut writer: W) -> Result<RunStats, TestRunnerExecuteErrors> {
        let TestRunner { inner, runtime } = self;
        let res = runtime.block_on(inner.execute(&mut writer));

        // Don't wait for any stray blocking tasks to complete.
        runtime.shutdown_background();

        res
    }
}

#[derive(Debug)]
struct TestRunnerInner {
    executor: Arc<ExecutorContext>,
    parallelism: NonZeroUsize,
    test_names: Vec<TestName>,
}

impl TestRunnerInner {
    async fn execute<W: WriteStr>(
        self,
        writer: &mut W,
    ) -> Result<RunStats, TestRunnerExecuteErrors> {
        let total = self.test_names.len();
        let mut run_stats = RunStats {
            initial_run_count: total,
            ..RunStats::default()
        };
        if total == 0 {
            debug!("no tests to run");
            return Ok(run_stats);
        }

        // Workers beyond the number of tests would only wait for the queue to close.
        let worker_count = self.parallelism.get().min(total);
        info!(
            "running {total} {} with {worker_count} {}",
            plural(total, "test", "tests"),
            plural(worker_count, "worker", "workers"),
        );

        // The queue only ever needs to hold one name per worker.
        let (queue_tx, queue_rx) = mpsc::channel::<TestName>(worker_count);
        let queue_rx = Arc::new(Mutex::new(queue_rx));
        let (block_tx, mut block_rx) = unbounded_channel::<String>();
        let (done_tx, mut done_rx) = unbounded_channel::<Verdict>();

        let test_names = self.test_names;
        let feeder: JoinHandle<()> = tokio::spawn(async move {
            for name in test_names {
                // This only fails if every worker has exited early.
                if queue_tx.send(name).await.is_err() {
                    break;
                }
            }
        });

        let workers: Vec<_> = (0..worker_count)
            .map(|worker_id| {
                let worker = Worker {
                    worker_id,
                    executor: self.executor.clone(),
                    queue: queue_rx.clone(),
                    block_tx: block_tx.clone(),
                    done_tx: done_tx.clone(),
                };
                tokio::spawn(worker.run())
            })
            .collect();

        // The channels close once every worker has exited.
        drop(queue_rx);
        drop(block_tx);
        drop(done_tx);

        let mut write_error = None;
        while run_stats.finished_count < total {
            tokio::select! {
                biased;

                Some(block) = block_rx.recv() => {
                    write_block(writer, &block, &mut write_error);
                }
                verdict = done_rx.recv() => match verdict {
                    Some(verdict) => run_stats.on_test_finished(verdict),
                    None => {
                        warn!(
                            "all workers exited after {} of {total} tests finished",
                            run_stats.finished_count,
                        );
                        break;
                    }
                },
            }
        }

        let mut join_errors = Vec::new();
        for handle in std::iter::once(feeder).chain(workers) {
            if let Err(error) = handle.await {
                join_errors.push(error);
            }
        }

        // Blocks can still be in flight after their completion was observed.
        while let Some(block) = block_rx.recv().await {
            write_block(writer, &block, &mut write_error);
        }

        debug!(?run_stats, "test run finished");

        if write_error.is_none() && join_errors.is_empty() {
            Ok(run_stats)
        } else {
            Err(TestRunnerExecuteErrors {
                write_error,
                join_errors,
            })
        }
    }
}

struct Worker {
    worker_id: usize,
    executor: Arc<ExecutorContext>,
    queue: Arc<Mutex<mpsc::Receiver<TestName>>>,
    block_tx: UnboundedSender<String>,
    done_tx: UnboundedSender<Verdict>,
}

impl Worker {
    async fn run(self) {
        loop {
            let name = {
                let mut queue = self.queue.lock().await;
                queue.recv().await
            };
            let Some(name) = name else {
                break;
            };

            let pending = PendingTest::start(name);
            let output = self.executor.run_test(pending.name()).await;
            let outcome = parse_output(pending.name(), &output);
            let record = pending.finish(outcome);
            debug!(
                worker_id = self.worker_id,
                test = %record.name,
                verdict = %record.verdict,
                duration_ms = record.duration.as_millis() as u64,
                data_race = record.data_race,
                "test finished"
            );

            // The coordinator outlives all workers, so these sends only fail if it panicked.
            let _ = self.block_tx.send(format_record(&record));
            let _ = self.done_tx.send(record.verdict);
        }
    }
}

fn write_block<W: WriteStr>(
    writer: &mut W,
    block: &str,
    write_error: &mut Option<WriteEventError>,
) {
    if write_error.is_some() {
        return;
    }

    if let Err(error) = writer
        .write_str(block)
        .and_then(|()| writer.write_str_flush())
    {
        warn!("error writing service messages, dropping further results: {error}");
        *write_error = Some(WriteEventError::Io(error));
    }
}

fn plural(count: usize, singular: &'static str, plural: &'static str) -> &'static str {
    if count == 1 { singular } else { plural }
}

/// Statistics for a test run.
#[derive(Copy, Clone, Default, Debug, Eq, PartialEq)]
pub struct RunStats {
    /// The total number of tests that were expected to be run at the beginning.
    pub initial_run_count: usize,

    /// The total number of tests that finished running.
    pub finished_count: usize,

    /// The number of tests that passed.
    pub passed: usize,

    /// The number of tests that failed, including those with data races.
    pub failed: usize,

    /// The number of tests that were skipped.
    pub skipped: usize,

    /// The number of tests that did not produce a result.
    pub errored: usize,
}

impl RunStats {
    /// Returns true if every test finished and none of them failed or errored.
    ///
    /// The exit code of the run does not depend on this.
    pub fn is_success(&self) -> bool {
        self.finished_count == self.initial_run_count && self.failed == 0 && self.errored == 0
    }

    fn on_test_finished(&mut self, verdict: Verdict) {
        self.finished_count += 1;
        match verdict {
            Verdict::Passed => self.passed += 1,
            Verdict::Failed => self.failed += 1,
            Verdict::Skipped => self.skipped += 1,
            Verdict::Errored => self.errored += 1,
        }
    }
}
