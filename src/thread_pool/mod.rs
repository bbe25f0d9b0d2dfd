use crate::Result;

/// A pool that runs sessions.
///
/// Each accepted connection becomes one job, and a job runs until its
/// connection closes. A pool with a fixed number of threads can therefore
/// serve at most that many connections at a time; further connections wait
/// in the queue until a running session ends.
pub trait ThreadPool {
    /// Creates a new thread pool with the given number of threads.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be created (e.g., invalid size).
    fn new(threads: u32) -> Result<Self>
    where
        Self: Sized;

    /// Spawns a function into the thread pool.
    ///
    /// A panic inside `job` is contained to that job.
    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static;
}

/// Runs a job, logging instead of propagating a panic.
fn run_contained<F: FnOnce()>(worker: &str, job: F) {
    if std::panic::catch_unwind(std::panic::AssertUnwindSafe(job)).is_err() {
        log::error!("{worker}: job panicked, continuing");
    }
}

mod naive;
mod rayon_pool;
mod shared_queue;

pub use self::naive::NaiveThreadPool;
pub use self::rayon_pool::RayonThreadPool;
pub use self::shared_queue::SharedQueueThreadPool;
