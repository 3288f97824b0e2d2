//! Per-destination-chain execution queues.
//!
//! Each destination chain gets one worker fed by an unbounded channel, so at
//! most one execution is in flight per chain and jobs run strictly in
//! enqueue order. Jobs are isolated: a panic inside one job is reaped and
//! the worker keeps draining.

use {
    futures::future::BoxFuture,
    std::collections::HashMap,
    tokio::{sync::mpsc, task::JoinHandle},
};

pub type Job = BoxFuture<'static, ()>;

#[derive(Default)]
pub struct SerialQueues {
    queues: HashMap<u64, Queue>,
}

struct Queue {
    sender: mpsc::UnboundedSender<Job>,
    worker: JoinHandle<()>,
}

impl SerialQueues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues a job on the chain's worker, spawning it on first use.
    pub fn enqueue(&mut self, chain_id: u64, job: Job) {
        let queue = self
            .queues
            .entry(chain_id)
            .or_insert_with(|| spawn_worker(chain_id));
        if queue.sender.send(job).is_err() {
            tracing::error!(chain_id, "execution queue worker is gone, dropping job");
        }
    }

    /// Closes all queues and waits for every worker to drain its backlog.
    pub async fn shutdown(&mut self) {
        for (chain_id, queue) in std::mem::take(&mut self.queues) {
            drop(queue.sender);
            if let Err(err) = queue.worker.await {
                tracing::error!(chain_id, ?err, "execution queue worker panicked");
            }
        }
    }
}

fn spawn_worker(chain_id: u64) -> Queue {
    let (sender, mut receiver) = mpsc::unbounded_channel::<Job>();
    let worker = tokio::spawn(async move {
        while let Some(job) = receiver.recv().await {
            // Running the job in its own task keeps a panic from taking the
            // worker (and with it the whole chain's queue) down.
            if let Err(err) = tokio::spawn(job).await {
                tracing::error!(chain_id, ?err, "execution job panicked");
            }
        }
    });
    Queue { sender, worker }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        futures::FutureExt,
        std::{
            sync::{Arc, Mutex},
            time::Duration,
        },
    };

    #[tokio::test]
    async fn jobs_on_one_chain_run_in_enqueue_order() {
        let mut queues = SerialQueues::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for index in 0..10u32 {
            let seen = Arc::clone(&seen);
            queues.enqueue(
                80002,
                async move {
                    // Later jobs finish faster; only serialization keeps the
                    // order intact.
                    tokio::time::sleep(Duration::from_millis(u64::from(10 - index))).await;
                    seen.lock().unwrap().push(index);
                }
                .boxed(),
            );
        }
        queues.shutdown().await;

        assert_eq!(*seen.lock().unwrap(), (0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn chains_do_not_block_each_other() {
        let mut queues = SerialQueues::new();
        let (sender, receiver) = tokio::sync::oneshot::channel::<()>();

        // The first chain's worker parks on the receiver...
        queues.enqueue(
            97,
            async move {
                let _ = receiver.await;
            }
            .boxed(),
        );
        // ...while the other chain's job must still complete.
        let done = Arc::new(Mutex::new(false));
        let observed = Arc::clone(&done);
        queues.enqueue(
            80002,
            async move {
                *observed.lock().unwrap() = true;
            }
            .boxed(),
        );

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(*done.lock().unwrap());

        let _ = sender.send(());
        queues.shutdown().await;
    }

    #[tokio::test]
    async fn a_panicking_job_does_not_starve_the_queue() {
        let mut queues = SerialQueues::new();
        queues.enqueue(97, async { panic!("job blew up") }.boxed());

        let done = Arc::new(Mutex::new(false));
        let observed = Arc::clone(&done);
        queues.enqueue(
            97,
            async move {
                *observed.lock().unwrap() = true;
            }
            .boxed(),
        );
        queues.shutdown().await;

        assert!(*done.lock().unwrap());
    }
}
