//! Bounded fan-out/fan-in over independent blocking tasks.
//!
//! Inputs are pulled from a shared queue by at most `max_workers` blocking
//! workers. Each result travels back over one channel, and the coordinator
//! reads exactly one message per input before returning. A failing task never
//! cancels its siblings; every input is processed and every success kept.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;

use crate::config::ErrorPolicy;

/// Outputs collected from a fan-out, plus the error kept by the [`ErrorPolicy`].
///
/// Output order follows completion order and is unspecified.
#[derive(Debug)]
pub struct Gathered<T, E> {
    /// Successful outputs.
    pub outputs: Vec<T>,
    /// The error kept by the policy, if any task failed.
    pub error: Option<E>,
    /// Number of tasks that failed.
    pub failures: usize,
}

impl<T, E> Default for Gathered<T, E> {
    fn default() -> Self {
        Self {
            outputs: Vec::new(),
            error: None,
            failures: 0,
        }
    }
}

impl<T, E> Gathered<T, E> {
    /// Returns the outputs if no task failed, otherwise the kept error.
    ///
    /// # Errors
    ///
    /// Returns the error kept by the policy when any task failed.
    pub fn into_result(self) -> Result<Vec<T>, E> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.outputs),
        }
    }

    fn record(&mut self, result: Result<T, E>, policy: ErrorPolicy) {
        match result {
            Ok(output) => self.outputs.push(output),
            Err(e) => {
                self.failures += 1;
                if self.error.is_none() || policy == ErrorPolicy::LastObserved {
                    self.error = Some(e);
                }
            }
        }
    }
}

/// Runs one blocking task per input with bounded parallelism.
#[derive(Clone, Copy, Debug)]
pub struct FanOut {
    max_workers: NonZeroUsize,
    policy: ErrorPolicy,
}

impl FanOut {
    /// Creates a fan-out that runs at most `max_workers` tasks at once.
    #[must_use]
    pub fn new(max_workers: NonZeroUsize, policy: ErrorPolicy) -> Self {
        Self {
            max_workers,
            policy,
        }
    }

    /// Applies `task` to every input and gathers the results.
    ///
    /// Must be called from within a Tokio runtime. A panicking task is
    /// re-raised on the caller once every other result has been collected.
    pub async fn run<I, T, E, F>(&self, inputs: Vec<I>, task: F) -> Gathered<T, E>
    where
        I: Send + 'static,
        T: Send + 'static,
        E: Send + 'static,
        F: Fn(I) -> Result<T, E> + Send + Sync + 'static,
    {
        let total = inputs.len();
        let mut gathered = Gathered::default();

        if total == 0 {
            return gathered;
        }

        let workers = self.max_workers.get().min(total);
        let queue = Arc::new(Mutex::new(inputs.into_iter()));
        let task = Arc::new(task);
        let (tx, mut rx) = mpsc::channel(workers);

        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let queue = Arc::clone(&queue);
                let task = Arc::clone(&task);
                let tx = tx.clone();

                tokio::task::spawn_blocking(move || {
                    loop {
                        let next = queue.lock().unwrap_or_else(PoisonError::into_inner).next();
                        let Some(input) = next else {
                            break;
                        };

                        if tx.blocking_send(task(input)).is_err() {
                            break;
                        }
                    }
                })
            })
            .collect();

        drop(tx);

        for _ in 0..total {
            let Some(result) = rx.recv().await else {
                break;
            };

            gathered.record(result, self.policy);
        }

        for handle in handles {
            if let Err(e) = handle.await
                && e.is_panic()
            {
                std::panic::resume_unwind(e.into_panic());
            }
        }

        if gathered.failures > 0 {
            tracing::warn!(
                total,
                failures = gathered.failures,
                "fan-out finished with failed tasks"
            );
        }

        gathered
    }
}
