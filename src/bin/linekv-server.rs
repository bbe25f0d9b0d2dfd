use std::net::SocketAddr;
use std::process::exit;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use log::{error, info};

use linekv::{
    KvsServer, MemStore, NaiveThreadPool, RayonThreadPool, Result, SharedQueueThreadPool,
    ThreadPool,
};

const DEFAULT_ADDR: &str = "127.0.0.1:8080";

#[derive(Parser)]
#[command(name = "linekv-server", version, about = "A key-value store server")]
struct Cli {
    /// Server listening address
    #[arg(long, default_value = DEFAULT_ADDR, value_name = "IP-PORT")]
    addr: SocketAddr,

    /// How connections are scheduled onto threads
    #[arg(long, value_enum, default_value_t = PoolKind::Naive)]
    pool: PoolKind,

    /// Worker count for bounded pools [default: number of CPUs]
    #[arg(long, value_name = "N")]
    threads: Option<u32>,

    /// Close connections idle for this many seconds (0 disables)
    #[arg(long, value_name = "SECS", default_value_t = 0)]
    idle_timeout: u64,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum PoolKind {
    /// One thread per connection
    Naive,
    /// Fixed workers sharing one queue
    SharedQueue,
    /// Fixed rayon workers
    Rayon,
}

fn main() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        error!("{}", e);
        exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let threads = cli.threads.unwrap_or_else(|| num_cpus::get() as u32);

    info!("linekv-server {}", env!("CARGO_PKG_VERSION"));
    info!("Thread pool: {:?}", cli.pool);

    match cli.pool {
        PoolKind::Naive => run_with_pool(NaiveThreadPool::new(threads)?, &cli),
        PoolKind::SharedQueue => {
            info!("Serving at most {} connections at once", threads);
            run_with_pool(SharedQueueThreadPool::new(threads)?, &cli)
        }
        PoolKind::Rayon => {
            info!("Serving at most {} connections at once", threads);
            run_with_pool(RayonThreadPool::new(threads)?, &cli)
        }
    }
}

fn run_with_pool<P: ThreadPool>(pool: P, cli: &Cli) -> Result<()> {
    let mut server = KvsServer::new(MemStore::new(), pool);
    if cli.idle_timeout > 0 {
        info!("Idle timeout: {}s", cli.idle_timeout);
        server = server.with_idle_timeout(Duration::from_secs(cli.idle_timeout));
    }
    server.run(cli.addr)
}
