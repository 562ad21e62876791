//! Read-only WebDAV front end for the drive index.
//!
//! The tree exposed to clients is fixed:
//!
//! ```text
//! /
//! ├── films/                 every file below the films folder, flattened
//! │   └── <name>.<id>.<ext>
//! └── shows/                 folders `depth` levels below the shows folder
//!     └── <name> [<id>]/     every file below that folder, flattened
//!         └── <name>.<id>.<ext>
//! ```
//!
//! PROPFIND answers come from the index alone. GET streams file content
//! from the remote API in chunks, always as `206 Partial Content`.
//!
//! # Example
//!
//! ```ignore
//! use stream_dav::webdav::{serve, DavConfig, DavService};
//!
//! let service = DavService::new(config, Arc::new(index), fetcher);
//! serve(service, "0.0.0.0:4918".parse()?).await?;
//! ```

mod content_type;
mod handlers;
mod middleware;
mod router;
mod server;
mod stream;
mod xml;

pub use content_type::content_type_for;
pub use middleware::{FileRequest, RequestContext};
pub use router::Route;
pub use server::{serve, serve_background, StreamDavServer};
pub use xml::{multistatus, DavResource, ResourceKind, XmlError};

use crate::fetch::Fetcher;
use bytes::Bytes;
use http_body_util::{combinators::BoxBody, BodyExt, Empty, Full};
use hyper::{Response, StatusCode};
use std::io;
use std::sync::Arc;
use stream_index::{HierarchyReader, IndexError};
use thiserror::Error;
use tokio::task::JoinError;

/// Response body type for every route.
pub type DavBody = BoxBody<Bytes, io::Error>;

/// Default cap for the first chunk of a stream, so players probing file
/// headers get bytes quickly.
pub const DEFAULT_METADATA_CHUNK: u64 = 10 * 1024 * 1024;

/// Default cap for every later chunk.
pub const DEFAULT_CHUNK: u64 = 50 * 1024 * 1024;

/// What the WebDAV tree is built from.
#[derive(Debug, Clone)]
pub struct DavConfig {
    /// Folder whose files make up `/films`.
    pub films_id: String,
    /// Folder whose descendants at `depth` make up `/shows`.
    pub shows_id: String,
    /// Levels below the shows folder at which shows live. Values below 1
    /// are treated as 1.
    pub depth: i64,
    /// Byte cap of the first chunk fetched for a stream.
    pub metadata_chunk: u64,
    /// Byte cap of every later chunk.
    pub chunk: u64,
}

impl DavConfig {
    pub fn new<S: Into<String>>(films_id: S, shows_id: S) -> Self {
        Self {
            films_id: films_id.into(),
            shows_id: shows_id.into(),
            depth: 1,
            metadata_chunk: DEFAULT_METADATA_CHUNK,
            chunk: DEFAULT_CHUNK,
        }
    }
}

/// The WebDAV request handler.
///
/// Cheap to clone; all clones share the index, fetcher, rate limiter and
/// buffer pool.
#[derive(Clone)]
pub struct DavService {
    inner: Arc<DavServiceInner>,
}

struct DavServiceInner {
    index: Arc<dyn HierarchyReader>,
    fetcher: Fetcher,
    films_id: String,
    shows_id: String,
    depth: u32,
    metadata_chunk: u64,
    chunk: u64,
}

impl DavService {
    pub fn new(config: DavConfig, index: Arc<dyn HierarchyReader>, fetcher: Fetcher) -> Self {
        let depth = u32::try_from(config.depth.max(1)).unwrap_or(u32::MAX);
        Self {
            inner: Arc::new(DavServiceInner {
                index,
                fetcher,
                films_id: config.films_id,
                shows_id: config.shows_id,
                depth,
                metadata_chunk: config.metadata_chunk.max(1),
                chunk: config.chunk.max(1),
            }),
        }
    }

    /// Depth at which shows are listed, after clamping.
    pub fn depth(&self) -> u32 {
        self.inner.depth
    }

    /// Run an index query on the blocking pool.
    async fn query<T, F>(&self, f: F) -> Result<T, QueryError>
    where
        F: FnOnce(&dyn HierarchyReader) -> stream_index::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let index = Arc::clone(&self.inner.index);
        match tokio::task::spawn_blocking(move || f(index.as_ref())).await {
            Ok(result) => result.map_err(QueryError::Index),
            Err(err) => Err(QueryError::Task(err)),
        }
    }
}

#[derive(Debug, Error)]
enum QueryError {
    #[error(transparent)]
    Index(#[from] IndexError),

    #[error("index query task failed: {0}")]
    Task(#[from] JoinError),
}

pub(crate) fn empty_body() -> DavBody {
    Empty::<Bytes>::new().map_err(|never| match never {}).boxed()
}

pub(crate) fn full_body<B: Into<Bytes>>(bytes: B) -> DavBody {
    Full::new(bytes.into()).map_err(|never| match never {}).boxed()
}

pub(crate) fn status_response(status: StatusCode) -> Response<DavBody> {
    let mut response = Response::new(empty_body());
    *response.status_mut() = status;
    response
}

pub(crate) fn not_found() -> Response<DavBody> {
    status_response(StatusCode::NOT_FOUND)
}
