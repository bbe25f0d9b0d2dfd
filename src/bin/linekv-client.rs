use std::net::SocketAddr;
use std::process::exit;

use clap::{Parser, Subcommand};

use linekv::{KvsClient, Result};

const DEFAULT_ADDR: &str = "127.0.0.1:8080";

#[derive(Parser)]
#[command(name = "linekv-client", version, about = "A key-value store client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Set the value of a string key to a string
    Set {
        /// The key
        key: String,
        /// The value
        value: String,
        /// Server address
        #[arg(long, default_value = DEFAULT_ADDR, value_name = "IP-PORT")]
        addr: SocketAddr,
    },
    /// Get the string value of a given string key
    Get {
        /// The key
        key: String,
        /// Server address
        #[arg(long, default_value = DEFAULT_ADDR, value_name = "IP-PORT")]
        addr: SocketAddr,
    },
    /// Delete a given key
    Del {
        /// The key
        key: String,
        /// Server address
        #[arg(long, default_value = DEFAULT_ADDR, value_name = "IP-PORT")]
        addr: SocketAddr,
    },
}

fn main() {
    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => {}
        Ok(false) => exit(1),
        Err(e) => {
            eprintln!("{}", e);
            exit(1);
        }
    }
}

/// Returns `false` when the command should exit with a failure status
/// without an error message of its own.
fn run(cli: Cli) -> Result<bool> {
    match cli.command {
        Commands::Set { key, value, addr } => {
            KvsClient::connect(addr)?.set(&key, &value)?;
        }
        Commands::Get { key, addr } => match KvsClient::connect(addr)?.get(&key)? {
            Some(value) => println!("{}", value),
            None => println!("Key not found"),
        },
        Commands::Del { key, addr } => {
            if !KvsClient::connect(addr)?.delete(&key)? {
                eprintln!("Key not found");
                return Ok(false);
            }
        }
    }
    Ok(true)
}
