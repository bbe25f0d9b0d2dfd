use super::{run_contained, ThreadPool};
use crate::{KvError, Result};

/// A bounded pool backed by the `rayon` library.
///
/// Sessions block on socket reads, so at most `threads` connections
/// are served at once.
pub struct RayonThreadPool {
    pool: rayon::ThreadPool,
}

impl ThreadPool for RayonThreadPool {
    fn new(threads: u32) -> Result<Self> {
        if threads == 0 {
            return Err(KvError::StringError(
                "thread pool needs at least one thread".to_owned(),
            ));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads as usize)
            .thread_name(|i| format!("rayon-session-{i}"))
            .build()
            .map_err(|e| KvError::StringError(e.to_string()))?;
        Ok(RayonThreadPool { pool })
    }

    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        // rayon aborts the process on an uncaught panic in `spawn`.
        self.pool.spawn(move || run_contained("rayon worker", job));
    }
}
