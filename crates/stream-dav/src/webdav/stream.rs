//! GET/HEAD on files: ranged, chunked relay from the content API.
//!
//! Headers are committed before the first byte is fetched, so failures while
//! streaming can only end the body early. The chunk loop runs in its own task
//! and writes into a bounded pipe whose read half is the response body; a
//! slow client therefore slows the loop down.

use super::{content_type_for, empty_body, DavBody, DavService, FileRequest};
use crate::fetch::FetchError;
use crate::range::{parse_range, ByteRange};
use futures::StreamExt;
use http_body_util::{BodyExt, StreamBody};
use hyper::body::Frame;
use hyper::header::{HeaderValue, ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use log::{debug, error, info, warn};
use tokio::io::DuplexStream;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;

/// Bytes buffered between the chunk loop and the response body.
const PIPE_CAPACITY: usize = 256 * 1024;

impl DavService {
    pub(crate) fn stream_file(&self, req: FileRequest, range_header: &str, head: bool) -> Response<DavBody> {
        let size = req.file.size;
        let content_type = HeaderValue::from_static(content_type_for(&req.file.name));

        if size == 0 {
            let mut response = Response::new(empty_body());
            let headers = response.headers_mut();
            headers.insert(ACCEPT_RANGES, HeaderValue::from_static("bytes"));
            headers.insert(CONTENT_LENGTH, HeaderValue::from(0u64));
            headers.insert(CONTENT_TYPE, content_type);
            return response;
        }

        // Clients that omit or mangle Range still get the whole file.
        let range = parse_range(range_header, size).unwrap_or_else(|_| ByteRange::full(size));

        let body = if head {
            empty_body()
        } else {
            info!("{} - request: {}", req.ctx.request_id(), range_header);
            self.spawn_stream(req, range)
        };

        let mut response = Response::new(body);
        *response.status_mut() = StatusCode::PARTIAL_CONTENT;
        let headers = response.headers_mut();
        headers.insert(ACCEPT_RANGES, HeaderValue::from_static("bytes"));
        if let Ok(value) = HeaderValue::from_str(&range.content_range(size)) {
            headers.insert(CONTENT_RANGE, value);
        }
        headers.insert(CONTENT_LENGTH, HeaderValue::from(range.len()));
        headers.insert(CONTENT_TYPE, content_type);
        response
    }

    /// Start the chunk loop and return the body it feeds.
    fn spawn_stream(&self, req: FileRequest, range: ByteRange) -> DavBody {
        let cancel = CancellationToken::new();
        let (writer, reader) = tokio::io::duplex(PIPE_CAPACITY);

        let watcher = cancel.clone();
        let request_id = req.ctx.request_id().to_string();
        tokio::spawn(async move {
            watcher.cancelled().await;
            debug!("{} - stream closed", request_id);
        });

        let service = self.clone();
        let loop_cancel = cancel.clone();
        tokio::spawn(async move {
            service.stream_chunks(&loop_cancel, writer, &req, range).await;
        });

        // Dropping the body (client gone or body finished) cancels the loop
        // and releases the watcher.
        let guard = cancel.drop_guard();
        let frames = ReaderStream::new(reader).map(move |chunk| {
            let _keep = &guard;
            chunk.map(Frame::data)
        });
        BodyExt::boxed(StreamBody::new(frames))
    }

    /// Fetch `range` chunk by chunk into `sink`, in order, until done or the
    /// first error.
    async fn stream_chunks(
        &self,
        cancel: &CancellationToken,
        mut sink: DuplexStream,
        req: &FileRequest,
        range: ByteRange,
    ) {
        let request_id = req.ctx.request_id();
        let fetcher = &self.inner.fetcher;
        let mut chunk_start = range.start;
        let mut cap = self.inner.metadata_chunk;

        while chunk_start <= range.end {
            let chunk_end = chunk_start.saturating_add(cap - 1).min(range.end);
            let expected = chunk_end - chunk_start + 1;

            debug!(
                "{} - chunk: {} -> {} ({} bytes)",
                request_id, chunk_start, chunk_end, expected
            );

            match fetcher
                .fetch_range(cancel, &mut sink, &req.file.id, chunk_start, chunk_end)
                .await
            {
                Ok(copied) if copied == expected => {
                    chunk_start = chunk_end + 1;
                    cap = self.inner.chunk;
                }
                Ok(copied) => {
                    warn!(
                        "{} - short chunk: got {} of {} bytes",
                        request_id, copied, expected
                    );
                    break;
                }
                Err(err) if err.is_broken_pipe() => {
                    debug!("{} - stream epipe", request_id);
                    break;
                }
                Err(FetchError::Cancelled) => {
                    debug!("{} - context cancelled", request_id);
                    break;
                }
                Err(FetchError::RateLimited) => {
                    warn!("{} - error: {}", request_id, FetchError::RateLimited);
                    break;
                }
                Err(err) => {
                    error!("{} - error: {}", request_id, err);
                    break;
                }
            }
        }
    }
}
