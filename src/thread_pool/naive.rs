use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use log::error;

use super::{run_contained, ThreadPool};
use crate::Result;

/// Spawns a fresh thread for every job.
///
/// This is thread-per-connection: concurrency is unbounded and no session
/// ever waits for another to finish. The `threads` argument is ignored.
#[derive(Default)]
pub struct NaiveThreadPool {
    spawned: AtomicU64,
}

impl ThreadPool for NaiveThreadPool {
    fn new(_threads: u32) -> Result<Self> {
        Ok(NaiveThreadPool::default())
    }

    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let id = self.spawned.fetch_add(1, Ordering::Relaxed);
        let name = format!("session-{id}");
        let worker = name.clone();
        if let Err(e) = thread::Builder::new()
            .name(name)
            .spawn(move || run_contained(&worker, job))
        {
            error!("Failed to spawn session thread {id}: {e}");
        }
    }
}
