//! stream-dav: serve the drive index over read-only WebDAV.
//!
//! Film and show folders from the index are exposed as a fixed tree; file
//! content is streamed from the remote drive on demand.
//!
//! # Usage
//!
//! ```bash
//! # Start the server with ./config.toml
//! stream-dav
//!
//! # Then point a media player at http://localhost:4918
//! ```

use clap::Parser;
use env_logger::Env;
use log::{error, info};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use stream_dav::fetch::{Fetcher, RateLimiter};
use stream_dav::webdav::{self, DavService};
use stream_dav::Config;
use stream_index::SqliteIndex;

/// Serve the drive index over read-only WebDAV.
#[derive(Parser, Debug)]
#[command(name = "stream-dav")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML config file
    #[arg(short, long, value_name = "PATH", default_value = "config.toml")]
    config: PathBuf,

    /// Port to listen on, overriding the config file
    #[arg(short, long)]
    port: Option<u16>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_timestamp_millis()
        .init();

    let mut config = match Config::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to load config: {}", e);
            process::exit(1);
        }
    };
    if let Some(port) = args.port {
        config.server.port = port;
    }

    info!("Opening index: {}", config.database.display());
    let index = match SqliteIndex::open(&config.database) {
        Ok(i) => i,
        Err(e) => {
            error!("Failed to open index: {}", e);
            process::exit(1);
        }
    };

    info!("Index ready: {}", index.path().display());

    let limiter = Arc::new(RateLimiter::new(config.stream.rate, config.stream.burst));
    let fetcher = match Fetcher::new(
        config.token_source(),
        config.stream.base_url.as_str(),
        config.fetch_timeout(),
    ) {
        Ok(f) => f.with_limiter(limiter),
        Err(e) => {
            error!("Failed to create fetcher: {}", e);
            process::exit(1);
        }
    };

    let service = DavService::new(config.dav_config(), Arc::new(index), fetcher);
    info!("Films folder: {}", config.films);
    info!("Shows folder: {} (depth {})", config.shows, service.depth());

    if let Err(e) = webdav::serve(service, config.listen_addr()).await {
        error!("Server error: {}", e);
        process::exit(1);
    }
}
