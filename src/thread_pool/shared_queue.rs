use std::thread;

use crossbeam::channel::{self, Receiver, Sender};
use log::{debug, error};

use super::{run_contained, ThreadPool};
use crate::{KvError, Result};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A bounded pool of workers sharing one job queue.
///
/// Workers pull jobs from a single MPMC channel, so connections beyond the
/// worker count queue up until a session ends. A panicking job is logged and
/// the worker moves on to the next one.
pub struct SharedQueueThreadPool {
    tx: Sender<Job>,
}

impl ThreadPool for SharedQueueThreadPool {
    fn new(threads: u32) -> Result<Self> {
        if threads == 0 {
            return Err(KvError::StringError(
                "thread pool needs at least one thread".to_owned(),
            ));
        }

        let (tx, rx) = channel::unbounded::<Job>();
        for id in 0..threads {
            spawn_worker(id, rx.clone())?;
        }

        Ok(SharedQueueThreadPool { tx })
    }

    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.tx.send(Box::new(job)).is_err() {
            error!("Thread pool has no active workers, dropping job");
        }
    }
}

/// Spawns a single worker thread that pulls jobs until the channel closes.
fn spawn_worker(id: u32, rx: Receiver<Job>) -> Result<()> {
    thread::Builder::new()
        .name(format!("pool-worker-{id}"))
        .spawn(move || {
            let name = format!("worker {id}");
            // Dropping the pool drops the only sender, which ends this loop.
            while let Ok(job) = rx.recv() {
                debug!("Worker {id} picked up a session");
                run_contained(&name, job);
            }
            debug!("Worker {id}: channel closed, shutting down");
        })?;
    Ok(())
}
