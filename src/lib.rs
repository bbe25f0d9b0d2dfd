#![deny(missing_docs)]

//! An in-memory key-value store served over a newline-delimited TCP protocol.
//!
//! One shared map guarded by a reader/writer lock, and one session per
//! connection that frames the incoming byte stream into `SET`, `GET` and
//! `DEL` lines and answers each with one response line.

mod client;
mod engines;
mod error;
pub mod protocol;
mod server;
mod session;
/// Thread pool implementations for running sessions.
pub mod thread_pool;

pub use client::KvsClient;
pub use engines::{KvsEngine, MemStore};
pub use error::{KvError, Result};
pub use protocol::{Command, MalformedCommand, Response};
pub use server::KvsServer;
pub use session::Session;
pub use thread_pool::{NaiveThreadPool, RayonThreadPool, SharedQueueThreadPool, ThreadPool};
