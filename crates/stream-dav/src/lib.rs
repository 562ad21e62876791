//! # stream-dav
//!
//! Read-only WebDAV server over a cloud-drive index.
//!
//! This crate provides:
//! - Name encoding that embeds drive IDs in file and folder names
//! - `Range` header parsing
//! - A rate-limited, chunked fetcher for remote file content
//! - **The WebDAV server** itself: routing, PROPFIND listings and ranged GET
//! - TOML configuration for the `stream-dav` binary
//!
//! Listings come from a [`stream_index::HierarchyReader`], normally the
//! SQLite index kept current by a separate synchronisation process.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use stream_dav::auth::StaticToken;
//! use stream_dav::fetch::{Fetcher, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
//! use stream_dav::webdav::{serve, DavConfig, DavService};
//! use stream_index::SqliteIndex;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let index = SqliteIndex::open("bernard.db")?;
//!     let fetcher = Fetcher::new(Arc::new(StaticToken::new("token")), DEFAULT_BASE_URL, DEFAULT_TIMEOUT)?;
//!     let service = DavService::new(DavConfig::new("films-id", "shows-id"), Arc::new(index), fetcher);
//!
//!     // Blocks until Ctrl+C
//!     serve(service, "0.0.0.0:4918".parse()?).await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod config;
pub mod fetch;
pub mod naming;
pub mod range;
pub mod webdav;

pub use auth::{AccessToken, AuthError, StaticToken, TokenFile, TokenSource};
pub use config::{Config, ConfigError};
pub use fetch::{FetchError, Fetcher, RateLimiter};
pub use naming::{decode_file, decode_folder, encode_file, encode_folder, NameError};
pub use range::{parse_range, ByteRange, RangeError};
pub use webdav::{serve, serve_background, DavConfig, DavService, StreamDavServer};
