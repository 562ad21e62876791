#![allow(dead_code)]

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_RANGE, RANGE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use std::collections::HashMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use stream_dav::auth::StaticToken;
use stream_dav::fetch::{Fetcher, RateLimiter};
use stream_dav::webdav::{serve_background, DavConfig, DavService, StreamDavServer};
use stream_index::{FileEntry, FolderEntry, HierarchyReader, IndexError};
use tokio::net::TcpListener;

pub const TOKEN: &str = "test-token";

/// Deterministic content for a file of `len` bytes.
pub fn content(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// In-memory index: every entry records its parent folder ID.
#[derive(Default)]
pub struct MemoryIndex {
    folders: Vec<(String, FolderEntry)>,
    files: Vec<(String, FileEntry)>,
}

impl MemoryIndex {
    pub fn folder(mut self, parent: &str, id: &str, name: &str) -> Self {
        self.folders.push((
            parent.to_string(),
            FolderEntry {
                id: id.to_string(),
                name: name.to_string(),
            },
        ));
        self
    }

    pub fn file(mut self, parent: &str, id: &str, name: &str, size: u64) -> Self {
        self.files.push((
            parent.to_string(),
            FileEntry {
                id: id.to_string(),
                name: name.to_string(),
                size,
                content_hash: format!("md5-{id}"),
            },
        ));
        self
    }

    fn children(&self, parent: &str) -> impl Iterator<Item = &FolderEntry> {
        let parent = parent.to_string();
        self.folders
            .iter()
            .filter(move |(p, _)| *p == parent)
            .map(|(_, f)| f)
    }
}

impl HierarchyReader for MemoryIndex {
    fn get_file(&self, id: &str) -> stream_index::Result<FileEntry> {
        self.files
            .iter()
            .map(|(_, f)| f)
            .find(|f| f.id == id)
            .cloned()
            .ok_or(IndexError::NotFound)
    }

    fn recursive_files(&self, folder_id: &str) -> stream_index::Result<Vec<FileEntry>> {
        let mut folders = vec![folder_id.to_string()];
        let mut i = 0;
        while i < folders.len() {
            let next: Vec<String> = self.children(&folders[i]).map(|f| f.id.clone()).collect();
            folders.extend(next);
            i += 1;
        }

        Ok(self
            .files
            .iter()
            .filter(|(parent, _)| folders.contains(parent))
            .map(|(_, f)| f.clone())
            .collect())
    }

    fn recursive_folders(
        &self,
        folder_id: &str,
        depth: u32,
    ) -> stream_index::Result<Vec<FolderEntry>> {
        let mut level: Vec<FolderEntry> = self.children(folder_id).cloned().collect();
        for _ in 1..depth {
            level = level
                .iter()
                .flat_map(|f| self.children(&f.id).cloned().collect::<Vec<_>>())
                .collect();
        }
        Ok(level)
    }
}

/// Fake content API serving `/files/{id}?alt=media` with byte ranges.
pub struct Upstream {
    pub addr: SocketAddr,
    state: Arc<UpstreamState>,
}

struct UpstreamState {
    files: HashMap<String, Vec<u8>>,
    /// Requests served before every further one gets 403.
    forbid_after: AtomicUsize,
    served: AtomicUsize,
    ranges: Mutex<Vec<(String, u64, u64)>>,
}

impl Upstream {
    pub async fn start(files: HashMap<String, Vec<u8>>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(UpstreamState {
            files,
            forbid_after: AtomicUsize::new(usize::MAX),
            served: AtomicUsize::new(0),
            ranges: Mutex::new(Vec::new()),
        });

        let server_state = Arc::clone(&state);
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = listener.accept().await else {
                    return;
                };
                let state = Arc::clone(&server_state);
                tokio::spawn(async move {
                    let _ = http1::Builder::new()
                        .serve_connection(
                            TokioIo::new(stream),
                            service_fn(move |req| {
                                let state = Arc::clone(&state);
                                async move { Ok::<_, Infallible>(serve_range(&state, req)) }
                            }),
                        )
                        .await;
                });
            }
        });

        Self { addr, state }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Answer 403 to every request after the first `n`.
    pub fn forbid_after(&self, n: usize) {
        self.state.forbid_after.store(n, Ordering::SeqCst);
    }

    /// Ranges requested so far, as `(id, start, end)`.
    pub fn ranges(&self) -> Vec<(String, u64, u64)> {
        self.state.ranges.lock().unwrap().clone()
    }
}

fn serve_range(state: &UpstreamState, req: Request<Incoming>) -> Response<Full<Bytes>> {
    let expected = format!("Bearer {TOKEN}");
    let authorized = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(expected.as_str());
    if !authorized {
        return status(StatusCode::UNAUTHORIZED);
    }

    let served = state.served.fetch_add(1, Ordering::SeqCst);
    if served >= state.forbid_after.load(Ordering::SeqCst) {
        return status(StatusCode::FORBIDDEN);
    }

    if req.uri().query() != Some("alt=media") {
        return status(StatusCode::BAD_REQUEST);
    }
    let Some(id) = req.uri().path().strip_prefix("/files/") else {
        return status(StatusCode::NOT_FOUND);
    };
    let Some(data) = state.files.get(id) else {
        return status(StatusCode::NOT_FOUND);
    };

    let range = req
        .headers()
        .get(RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("bytes="))
        .and_then(|v| v.split_once('-'))
        .and_then(|(s, e)| Some((s.parse::<u64>().ok()?, e.parse::<u64>().ok()?)));
    let Some((start, end)) = range else {
        return status(StatusCode::BAD_REQUEST);
    };

    state
        .ranges
        .lock()
        .unwrap()
        .push((id.to_string(), start, end));

    let end = end.min(data.len() as u64 - 1);
    let body = data[start as usize..=end as usize].to_vec();
    Response::builder()
        .status(StatusCode::PARTIAL_CONTENT)
        .header(CONTENT_LENGTH, body.len())
        .header(
            CONTENT_RANGE,
            format!("bytes {}-{}/{}", start, end, data.len()),
        )
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}

fn status(code: StatusCode) -> Response<Full<Bytes>> {
    Response::builder()
        .status(code)
        .body(Full::new(Bytes::new()))
        .unwrap()
}

pub fn fetcher(upstream: &Upstream) -> Fetcher {
    Fetcher::new(
        Arc::new(StaticToken::new(TOKEN)),
        upstream.url(),
        Duration::from_secs(30),
    )
    .unwrap()
    .with_limiter(Arc::new(RateLimiter::unlimited()))
}

pub async fn start_dav(
    config: DavConfig,
    index: MemoryIndex,
    upstream: &Upstream,
) -> StreamDavServer {
    let service = DavService::new(config, Arc::new(index), fetcher(upstream));
    serve_background(service, "127.0.0.1:0".parse().unwrap())
        .await
        .unwrap()
}

pub fn propfind() -> reqwest::Method {
    reqwest::Method::from_bytes(b"PROPFIND").unwrap()
}
