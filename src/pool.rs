use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};

use crate::domain::{FailureReason, FetchOutcome, FetchTask};
use crate::error::PackError;
use crate::fetcher::{ImageClient, fetch_task};

type TaskQueue = Arc<Mutex<VecDeque<FetchTask>>>;

/// Fixed-width pool of fetch threads.
///
/// All tasks are queued up front; each worker takes the next queued task as
/// soon as it is free. Outcomes come back in completion order, not in
/// submission order.
#[derive(Debug, Clone, Copy)]
pub struct WorkerPool {
    concurrency: usize,
}

impl WorkerPool {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn submit(
        &self,
        tasks: Vec<FetchTask>,
        client: Arc<dyn ImageClient>,
    ) -> Result<Completions, PackError> {
        let total = tasks.len();
        let width = self.concurrency.min(total);
        let queue: TaskQueue = Arc::new(Mutex::new(tasks.into()));
        let (sender, receiver) = mpsc::channel();

        let mut completions = Completions {
            receiver,
            queue: queue.clone(),
            workers: Vec::with_capacity(width),
            total,
            received: 0,
        };

        for id in 0..width {
            let queue = queue.clone();
            let client = client.clone();
            let sender = sender.clone();
            let handle = thread::Builder::new()
                .name(format!("imgpack-fetch-{id}"))
                .spawn(move || worker_loop(queue, client, sender))
                .map_err(|err| PackError::WorkerSpawn(err.to_string()))?;
            completions.workers.push(handle);
        }
        tracing::debug!(workers = width, tasks = total, "fetch pool started");

        Ok(completions)
    }
}

fn worker_loop(queue: TaskQueue, client: Arc<dyn ImageClient>, sender: Sender<FetchOutcome>) {
    loop {
        let next = queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let Some(task) = next else {
            break;
        };

        let outcome = run_guarded(client.as_ref(), task);
        if sender.send(outcome).is_err() {
            break;
        }
    }
}

/// A panicking client still has to answer its task, so the panic becomes a
/// transport failure.
fn run_guarded(client: &dyn ImageClient, task: FetchTask) -> FetchOutcome {
    let row_index = task.row_index;
    let sanitized_name = task.sanitized_name();
    let source_url = task.source_url.clone().unwrap_or_default();

    panic::catch_unwind(AssertUnwindSafe(|| fetch_task(client, task))).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|message| message.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        FetchOutcome::Failure {
            row_index,
            sanitized_name,
            source_url,
            reason: FailureReason::Transport(format!("fetch worker panicked: {message}")),
        }
    })
}

/// Outcomes of one submission, yielded as they complete.
///
/// Iteration ends after exactly `total` outcomes. Dropping early discards the
/// tasks still queued and waits for in-flight fetches to finish.
pub struct Completions {
    receiver: Receiver<FetchOutcome>,
    queue: TaskQueue,
    workers: Vec<JoinHandle<()>>,
    total: usize,
    received: usize,
}

impl Completions {
    pub fn total(&self) -> usize {
        self.total
    }

    fn join_workers(&mut self) {
        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                tracing::warn!("fetch worker exited with a panic");
            }
        }
    }
}

impl Iterator for Completions {
    type Item = FetchOutcome;

    fn next(&mut self) -> Option<Self::Item> {
        if self.received == self.total {
            self.join_workers();
            return None;
        }
        match self.receiver.recv() {
            Ok(outcome) => {
                self.received += 1;
                Some(outcome)
            }
            Err(_) => {
                tracing::warn!(
                    received = self.received,
                    total = self.total,
                    "fetch workers stopped before every task completed"
                );
                self.join_workers();
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.total - self.received;
        (0, Some(remaining))
    }
}

impl Drop for Completions {
    fn drop(&mut self) {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        self.join_workers();
    }
}
