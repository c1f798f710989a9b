//! Bounded-concurrency batch runner.
//!
//! A semaphore with `budget` permits gates task starts and a channel
//! collects completions. Starts follow submission order; completions arrive
//! in whatever order the tasks finish. A failed task is reported like any
//! other outcome and its permit goes straight to the next queued task.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures_core::Stream;
use futures_util::FutureExt;
use tokio::sync::{mpsc, Semaphore};

use crate::core::error::SdkError;

/// Result of one task; terminal and never requeued.
pub type Outcome<O> = Result<O, SdkError>;

/// Completion of one task.
#[derive(Debug)]
pub struct TaskEvent<T, O> {
    pub task: T,
    pub outcome: Outcome<O>,
}

pub type EventStream<T, O> = Pin<Box<dyn Stream<Item = TaskEvent<T, O>> + Send>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scheduler {
    budget: usize,
    stagger: Duration,
}

impl Scheduler {
    /// Default pause between consecutive starts within one filling pass.
    pub const DEFAULT_STAGGER: Duration = Duration::from_millis(200);

    /// `budget` is floored at 1.
    pub fn new(budget: usize) -> Self {
        Self {
            budget: budget.max(1),
            stagger: Self::DEFAULT_STAGGER,
        }
    }

    /// One in-flight request per credential.
    pub fn for_pool_size(pool_size: usize) -> Self {
        Self::new(pool_size)
    }

    pub fn with_stagger(mut self, stagger: Duration) -> Self {
        self.stagger = stagger;
        self
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    pub fn stagger(&self) -> Duration {
        self.stagger
    }

    /// Run every task through `per_task`, at most `budget` at a time.
    ///
    /// Must be called inside a tokio runtime. The returned stream yields one
    /// event per task and ends once the queue and in-flight set are both
    /// empty. Dropping the stream stops further starts; tasks already
    /// running are left to finish.
    pub fn run<T, O, F, Fut>(&self, tasks: Vec<T>, per_task: F) -> EventStream<T, O>
    where
        T: Clone + Send + 'static,
        O: Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Outcome<O>> + Send + 'static,
    {
        let budget = self.budget;
        let stagger = self.stagger;
        let per_task = Arc::new(per_task);
        let permits = Arc::new(Semaphore::new(budget));
        let (tx, mut rx) = mpsc::unbounded_channel::<TaskEvent<T, O>>();
        let total = tasks.len();

        tracing::info!(target: "storyboard::scheduler", tasks = total, budget, "batch started");

        tokio::spawn(async move {
            let mut started_in_pass = false;
            for (index, task) in tasks.into_iter().enumerate() {
                // A permit that is free right away continues the current
                // filling pass; waiting for one starts a new pass.
                let permit = match Arc::clone(&permits).try_acquire_owned() {
                    Ok(permit) => {
                        if started_in_pass && !stagger.is_zero() {
                            tokio::time::sleep(stagger).await;
                        }
                        permit
                    }
                    Err(_) => match Arc::clone(&permits).acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => break,
                    },
                };
                // The stream may have been dropped while we waited.
                if tx.is_closed() {
                    tracing::debug!(
                        target: "storyboard::scheduler",
                        remaining = total - index,
                        "event stream dropped, not starting remaining tasks"
                    );
                    break;
                }
                started_in_pass = true;

                let tx = tx.clone();
                let per_task = Arc::clone(&per_task);
                tokio::spawn(async move {
                    let input = task.clone();
                    let outcome = AssertUnwindSafe(async move { per_task(input).await })
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|_| Err(SdkError::other("task panicked")));
                    drop(permit);
                    let _ = tx.send(TaskEvent { task, outcome });
                });
                tracing::debug!(target: "storyboard::scheduler", index, "task started");
            }
        });

        Box::pin(async_stream::stream! {
            let mut done = 0usize;
            while let Some(event) = rx.recv().await {
                done += 1;
                yield event;
            }
            tracing::info!(target: "storyboard::scheduler", completed = done, "batch finished");
        })
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(1)
    }
}
