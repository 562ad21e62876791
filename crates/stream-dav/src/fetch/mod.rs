//! Rate-limited range fetches from the remote content API.
//!
//! A [`Fetcher`] copies one inclusive byte range of a remote file into a
//! sink. The rate limiter and buffer pool are shared by every stream the
//! server is running; the HTTP client and its connection pool likewise.

mod limiter;
mod pool;

pub use limiter::RateLimiter;
pub use pool::{BufferPool, PooledBuffer, DEFAULT_BUFFER_SIZE};

use crate::auth::{AuthError, TokenSource};
use futures::TryStreamExt;
use log::trace;
use reqwest::header::RANGE;
use reqwest::StatusCode;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::io::StreamReader;
use tokio_util::sync::CancellationToken;

/// Default content API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/drive/v3";

/// Default timeout for a single range request, body included.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

#[derive(Debug, Error)]
pub enum FetchError {
    /// The request's cancellation token fired.
    #[error("fetch cancelled")]
    Cancelled,

    /// The content API answered 403.
    #[error("rate limited by upstream")]
    RateLimited,

    /// The content API answered with something other than 206 or 403.
    #[error("unexpected upstream status: {0}")]
    UnexpectedStatus(u16),

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Building or sending the request failed.
    #[error("upstream request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Reading the upstream body failed.
    #[error("upstream read failed: {0}")]
    Upstream(#[source] io::Error),

    /// Writing to the sink failed.
    #[error("sink write failed: {0}")]
    Sink(#[source] io::Error),
}

impl FetchError {
    /// Whether the sink went away, i.e. the client hung up.
    pub fn is_broken_pipe(&self) -> bool {
        match self {
            FetchError::Sink(err) => matches!(
                err.kind(),
                io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset
            ),
            _ => false,
        }
    }
}

/// Client for ranged reads of remote file content.
pub struct Fetcher {
    auth: Arc<dyn TokenSource>,
    base_url: String,
    client: reqwest::Client,
    limiter: Arc<RateLimiter>,
    pool: Arc<BufferPool>,
}

impl Fetcher {
    /// Create a fetcher against `base_url`.
    ///
    /// The client speaks HTTP/1.1 only: long-lived range reads over HTTP/2
    /// cost far more memory and were less stable.
    pub fn new<S: Into<String>>(
        auth: Arc<dyn TokenSource>,
        base_url: S,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .http1_only()
            .timeout(timeout)
            .build()?;

        Ok(Self {
            auth,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            limiter: Arc::new(RateLimiter::new(10.0, 1)),
            pool: Arc::new(BufferPool::default()),
        })
    }

    pub fn with_limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn pool(&self) -> &BufferPool {
        &self.pool
    }

    /// Copy bytes `start..=end` of file `id` into `sink`.
    ///
    /// Returns the number of bytes written. Fails with
    /// [`FetchError::Cancelled`] as soon as `cancel` fires, whether waiting
    /// for a permit or mid-transfer.
    pub async fn fetch_range<W>(
        &self,
        cancel: &CancellationToken,
        sink: &mut W,
        id: &str,
        start: u64,
        end: u64,
    ) -> Result<u64, FetchError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchError::Cancelled),
            result = self.copy_range(cancel, sink, id, start, end) => result,
        }
    }

    async fn copy_range<W>(
        &self,
        cancel: &CancellationToken,
        sink: &mut W,
        id: &str,
        start: u64,
        end: u64,
    ) -> Result<u64, FetchError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        self.limiter.acquire(cancel).await?;

        let token = self.auth.access_token()?;
        let url = format!(
            "{}/files/{}?alt=media",
            self.base_url,
            urlencoding::encode(id)
        );

        trace!("GET {} bytes={}-{}", url, start, end);

        let response = self
            .client
            .get(&url)
            .bearer_auth(&token.token)
            .header(RANGE, format!("bytes={start}-{end}"))
            .send()
            .await?;

        match response.status() {
            StatusCode::PARTIAL_CONTENT => {}
            StatusCode::FORBIDDEN => return Err(FetchError::RateLimited),
            status => return Err(FetchError::UnexpectedStatus(status.as_u16())),
        }

        let reader = StreamReader::new(response.bytes_stream().map_err(io::Error::other));
        tokio::pin!(reader);

        let mut buf = self.pool.checkout();
        let mut copied = 0u64;
        loop {
            let n = reader.read(&mut buf).await.map_err(FetchError::Upstream)?;
            if n == 0 {
                break;
            }
            sink.write_all(&buf[..n]).await.map_err(FetchError::Sink)?;
            copied += n as u64;
        }
        sink.flush().await.map_err(FetchError::Sink)?;

        Ok(copied)
    }
}
