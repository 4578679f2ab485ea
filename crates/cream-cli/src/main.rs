use std::num::{NonZeroU16, NonZeroUsize};
use std::time::Duration;

use clap::Parser;
use cream::{CacheConfig, Server, ServerConfig, DEFAULT_TTL};
use tracing_subscriber::EnvFilter;

/// Bounded in-memory key/value cache served over a binary TCP protocol.
#[derive(Parser, Debug)]
#[command(name = "cream", about = "Bounded in-memory key/value cache server")]
struct Args {
    /// The number of worker threads used to service requests.
    num_workers: NonZeroUsize,

    /// Port number to listen on for incoming connections.
    port_number: NonZeroU16,

    /// The maximum number of entries that can be stored in cream's
    /// underlying data store.
    max_entries: NonZeroUsize,
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig {
        workers: args.num_workers.get(),
        port: args.port_number.get(),
        cache: CacheConfig {
            capacity: args.max_entries.get(),
            ttl: ttl_from_env(),
        },
    };

    // Binding is the only fatal path; everything after it retries or drops.
    let server = match Server::bind(config) {
        Ok(server) => server,
        Err(e) => {
            eprintln!("cream: {e}");
            std::process::exit(1);
        }
    };
    server.run();
}

/// Entry lifetime in milliseconds, read once from `CREAM_TTL_MS`. Absent or
/// unparseable values fall back to the default of 2500.
fn ttl_from_env() -> Duration {
    std::env::var("CREAM_TTL_MS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(DEFAULT_TTL)
}
