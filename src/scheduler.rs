use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::process::Stdio;
use std::time::{Duration, Instant};

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use tracing::{debug, trace};

use constants::env_vars::EnvVars;

use crate::process::Cmd;
use crate::system::{Error, TaskSystem};
use crate::task::{Action, Task};

/// Receives progress events while a [`TaskSystem`] runs.
pub trait Reporter {
    /// Called when `task` starts on worker `slot`. Returns an id passed back on completion.
    fn on_task_start(&self, task: &Task, slot: usize) -> usize;
    fn on_task_complete(&self, id: usize, task: &Task, elapsed: Duration);
    fn on_complete(&self);
}

/// Wall-clock cost of running a system sequentially and in parallel.
#[derive(Debug, Clone, Copy)]
pub struct ParCost {
    pub sequential: Duration,
    pub parallel: Duration,
}

impl ParCost {
    pub fn speedup(&self) -> f64 {
        if self.parallel.is_zero() {
            return 1.0;
        }
        self.sequential.as_secs_f64() / self.parallel.as_secs_f64()
    }
}

/// Worker slot numbers, handed out lowest first.
#[derive(Default)]
struct Slots(Vec<bool>);

impl Slots {
    fn acquire(&mut self) -> usize {
        if let Some(idx) = self.0.iter().position(|used| !used) {
            self.0[idx] = true;
            idx + 1
        } else {
            self.0.push(true);
            self.0.len()
        }
    }

    fn release(&mut self, slot: usize) {
        self.0[slot - 1] = false;
    }
}

impl TaskSystem {
    async fn execute(&self, task: &Task, slot: usize) -> anyhow::Result<()> {
        match &task.action {
            Action::Noop => Ok(()),
            Action::Func(f) => {
                let f = f.clone();
                tokio::task::spawn_blocking(move || f()).await?
            }
            Action::Command(line) => {
                let mut cmd = Cmd::shell(line, line);
                cmd.env(EnvVars::MAXPAR_TASK, &task.name)
                    .env(EnvVars::MAXPAR_WORKER, slot.to_string())
                    .stdin(Stdio::null());
                if let Some(dir) = self.workdir() {
                    cmd.current_dir(dir);
                }
                cmd.run().await?;
                Ok(())
            }
        }
    }

    fn reporter<'a>(&self, reporter: Option<&'a dyn Reporter>) -> Option<&'a dyn Reporter> {
        reporter.filter(|_| self.logging())
    }

    /// Run every task one after the other, in [`TaskSystem::sequence`] order.
    pub async fn run_seq(&self, reporter: Option<&dyn Reporter>) -> Result<(), Error> {
        let reporter = self.reporter(reporter);

        for task in self.sequence() {
            debug!(task = %task, "Running task");
            let id = reporter.map(|r| r.on_task_start(task, 1));
            let start = Instant::now();

            self.execute(task, 1)
                .await
                .map_err(|source| Error::TaskFailed {
                    name: task.name.clone(),
                    source,
                })?;

            if let (Some(reporter), Some(id)) = (reporter, id) {
                reporter.on_task_complete(id, task, start.elapsed());
            }
        }

        if let Some(reporter) = reporter {
            reporter.on_complete();
        }
        Ok(())
    }

    /// Run the system with maximal parallelism and no limit on concurrent tasks.
    pub async fn run(&self, reporter: Option<&dyn Reporter>) -> Result<(), Error> {
        self.run_with(None, reporter).await
    }

    /// Run the system with maximal parallelism, with at most `jobs` tasks at a time.
    ///
    /// A task starts once all its predecessors have completed and it does not interfere with a
    /// running task or with a task that precedes it in [`TaskSystem::sequence`] and has not
    /// started yet. The outcome is therefore the same as [`TaskSystem::run_seq`].
    ///
    /// After a failure no new task is started; running tasks are awaited and the first failure
    /// is returned.
    pub async fn run_with(
        &self,
        jobs: Option<NonZeroUsize>,
        reporter: Option<&dyn Reporter>,
    ) -> Result<(), Error> {
        let reporter = self.reporter(reporter);
        let limit = jobs.map_or(usize::MAX, NonZeroUsize::get);

        let mut pending = self.sequence();
        let mut running: Vec<&Task> = Vec::new();
        let mut completed: HashSet<&str> = HashSet::with_capacity(pending.len());
        let mut slots = Slots::default();
        let mut futures = FuturesUnordered::new();
        let mut failure = None;

        loop {
            if failure.is_none() {
                let mut idx = 0;
                while idx < pending.len() && running.len() < limit {
                    let task = pending[idx];
                    if !self.is_ready(task, &pending[..idx], &running, &completed) {
                        idx += 1;
                        continue;
                    }

                    pending.remove(idx);
                    let slot = slots.acquire();
                    debug!(task = %task, slot, "Starting task");
                    let id = reporter.map(|r| r.on_task_start(task, slot));
                    running.push(task);

                    futures.push(async move {
                        let start = Instant::now();
                        let result = self.execute(task, slot).await;
                        (task, slot, id, start.elapsed(), result)
                    });
                }
            }

            let Some((task, slot, id, elapsed, result)) = futures.next().await else {
                break;
            };

            running.retain(|t| t.name != task.name);
            slots.release(slot);

            match result {
                Ok(()) => {
                    trace!(task = %task, ?elapsed, "Task completed");
                    completed.insert(task.name.as_str());
                    if let (Some(reporter), Some(id)) = (reporter, id) {
                        reporter.on_task_complete(id, task, elapsed);
                    }
                }
                Err(source) => {
                    debug!(task = %task, "Task failed, waiting for running tasks");
                    failure.get_or_insert(Error::TaskFailed {
                        name: task.name.clone(),
                        source,
                    });
                }
            }
        }

        if let Some(reporter) = reporter {
            reporter.on_complete();
        }

        match failure {
            Some(err) => Err(err),
            None => {
                debug_assert!(pending.is_empty(), "scheduler stalled");
                Ok(())
            }
        }
    }

    fn is_ready(
        &self,
        task: &Task,
        earlier: &[&Task],
        running: &[&Task],
        completed: &HashSet<&str>,
    ) -> bool {
        if let Some(dep) = self
            .predecessors(&task.name)
            .iter()
            .find(|dep| !completed.contains(dep.as_str()))
        {
            trace!(task = %task, waiting_for = %dep, "Predecessor not completed");
            return false;
        }
        if let Some(other) = running.iter().find(|other| other.interferes(task)) {
            trace!(task = %task, conflict = %other, "Interferes with a running task");
            return false;
        }
        if let Some(other) = earlier.iter().find(|other| other.interferes(task)) {
            trace!(task = %task, conflict = %other, "Interferes with an earlier pending task");
            return false;
        }
        true
    }

    /// Time a sequential run followed by a parallel run.
    pub async fn par_cost(
        &self,
        jobs: Option<NonZeroUsize>,
        reporter: Option<&dyn Reporter>,
    ) -> Result<ParCost, Error> {
        let start = Instant::now();
        self.run_seq(reporter).await?;
        let sequential = start.elapsed();

        let start = Instant::now();
        self.run_with(jobs, reporter).await?;
        let parallel = start.elapsed();

        debug!(?sequential, ?parallel, "Measured parallel cost");
        Ok(ParCost {
            sequential,
            parallel,
        })
    }
}
