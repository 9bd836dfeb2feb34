//! Bounded worker pool used to fan a multi-row operation out across many
//! concurrent requests (see `Client::mget`/`Client::put_many`-style
//! batch helpers).
//!
//! The reference client's `Threads` runs a fixed set of OS threads
//! pulling from a bounded queue, with a `wait_all()` that enqueues one
//! "I'm done, now wait to be released" sentinel per worker and blocks
//! until every worker has reached it. The async translation keeps that
//! shape: a fixed set of tasks pulling from a bounded `mpsc` channel, and
//! `wait_all` implemented as a rendezvous barrier with one extra party
//! for the caller, so every worker must reach the same point before any
//! of them (or the caller) proceeds.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::{mpsc, Barrier, Mutex};
use tokio::task::JoinHandle;

type Job = Pin<Box<dyn Future<Output = ()> + Send>>;

pub struct WorkerPool {
    sender: mpsc::Sender<Job>,
    num_workers: usize,
    workers: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn new(num_workers: usize, max_queued_tasks: usize) -> Self {
        let (sender, receiver) = mpsc::channel(max_queued_tasks);
        let receiver = Arc::new(Mutex::new(receiver));
        let workers = (0..num_workers)
            .map(|_| {
                let receiver = receiver.clone();
                tokio::spawn(async move {
                    loop {
                        let job = receiver.lock().await.recv().await;
                        match job {
                            Some(job) => job.await,
                            None => break,
                        }
                    }
                })
            })
            .collect();

        WorkerPool {
            sender,
            num_workers,
            workers,
        }
    }

    /// Enqueues `job`, blocking if the queue is at capacity.
    pub async fn submit<F>(&self, job: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if self.sender.send(Box::pin(job)).await.is_err() {
            tracing::warn!("worker pool submit after terminate; task dropped");
        }
    }

    /// Waits for every task submitted before this call to finish,
    /// without tearing any worker down.
    pub async fn wait_all(&self) {
        let barrier = Arc::new(Barrier::new(self.num_workers + 1));
        for _ in 0..self.num_workers {
            let barrier = barrier.clone();
            self.submit(async move {
                barrier.wait().await;
            })
            .await;
        }
        barrier.wait().await;
    }

    /// Stops accepting new work and waits for every worker to exit.
    pub async fn terminate(self) {
        drop(self.sender);
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn wait_all_observes_every_prior_submission() {
        let pool = WorkerPool::new(4, 16);
        let counter = Arc::new(AtomicUsize::new(0));

        for _ in 0..20 {
            let counter = counter.clone();
            pool.submit(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        }

        pool.wait_all().await;
        assert_eq!(counter.load(Ordering::SeqCst), 20);
        pool.terminate().await;
    }

    #[tokio::test]
    async fn wait_all_can_be_called_repeatedly() {
        let pool = WorkerPool::new(2, 8);
        let counter = Arc::new(AtomicUsize::new(0));

        for round in 0..3 {
            for _ in 0..5 {
                let counter = counter.clone();
                pool.submit(async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                })
                .await;
            }
            pool.wait_all().await;
            assert_eq!(counter.load(Ordering::SeqCst), (round + 1) * 5);
        }
        pool.terminate().await;
    }
}
