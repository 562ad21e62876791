//! Request-scoped state and the steps that build it.
//!
//! Handlers never look state up implicitly: the router threads a
//! [`RequestContext`] through, and file-scoped handlers take a
//! [`FileRequest`] that can only be built by resolving the `:file` segment.

use super::{not_found, DavBody, DavService, QueryError};
use crate::naming::decode_file;
use hyper::Response;
use log::{debug, error};
use stream_index::FileEntry;
use uuid::Uuid;

/// Per-request state, created at request entry and dropped with the request.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    request_id: Option<String>,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a fresh correlation ID for log lines of this request.
    pub fn with_request_id(mut self) -> Self {
        self.request_id = Some(Uuid::new_v4().to_string());
        self
    }

    /// Correlation ID, or `-` when none was attached.
    pub fn request_id(&self) -> &str {
        self.request_id.as_deref().unwrap_or("-")
    }
}

/// A request whose `:file` segment resolved to an index entry.
#[derive(Debug, Clone)]
pub struct FileRequest {
    pub ctx: RequestContext,
    pub file: FileEntry,
}

impl DavService {
    /// Decode the `:file` segment and load the entry it names.
    ///
    /// Any failure becomes a 404 before headers are committed.
    pub(crate) async fn resolve_file(
        &self,
        ctx: RequestContext,
        segment: &str,
    ) -> Result<FileRequest, Response<DavBody>> {
        let id = match decode_file(segment) {
            Ok(id) => id.to_string(),
            Err(err) => {
                debug!("{} - {}: {:?}", ctx.request_id(), err, segment);
                return Err(not_found());
            }
        };

        match self.query(move |index| index.get_file(&id)).await {
            Ok(file) => Ok(FileRequest { ctx, file }),
            Err(QueryError::Index(err)) if err.is_not_found() => {
                debug!("{} - file not in index: {:?}", ctx.request_id(), segment);
                Err(not_found())
            }
            Err(err) => {
                error!("{} - file lookup failed: {}", ctx.request_id(), err);
                Err(not_found())
            }
        }
    }
}
