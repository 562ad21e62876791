//! WebDAV server implementation using hyper.
//!
//! This module accepts connections and hands every request to a
//! [`DavService`]. Each connection is served on its own task.

use super::DavService;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use log::{debug, error, info};
use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

/// Handle to a server running in the background.
pub struct StreamDavServer {
    /// Server address.
    addr: SocketAddr,
    /// Shutdown signal sender.
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl StreamDavServer {
    /// Get the server's listen address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get the URL clients should mount.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop accepting connections. Requests already in flight run to
    /// completion.
    pub fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Start a WebDAV server and block until Ctrl+C.
///
/// # Example
///
/// ```ignore
/// use stream_dav::webdav::serve;
///
/// serve(service, "0.0.0.0:4918".parse()?).await?;
/// ```
pub async fn serve(service: DavService, addr: SocketAddr) -> io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;

    info!("WebDAV server listening on http://{}", local_addr);
    info!("Press Ctrl+C to stop the server");

    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, remote_addr) = result?;
                debug!("Connection from {}", remote_addr);
                spawn_connection(service.clone(), stream);
            }
            _ = tokio::signal::ctrl_c() => {
                info!("WebDAV server shutting down");
                return Ok(());
            }
        }
    }
}

/// Start a WebDAV server in the background.
///
/// Pass port 0 to have the OS pick one; the returned handle reports the
/// address actually bound.
pub async fn serve_background(service: DavService, addr: SocketAddr) -> io::Result<StreamDavServer> {
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;

    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

    info!("WebDAV server started on http://{}", local_addr);

    tokio::spawn(async move {
        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, remote_addr)) => {
                            debug!("Connection from {}", remote_addr);
                            spawn_connection(service.clone(), stream);
                        }
                        Err(e) => {
                            error!("Accept error: {:?}", e);
                        }
                    }
                }
                _ = &mut shutdown_rx => {
                    info!("WebDAV server shutting down");
                    break;
                }
            }
        }
    });

    Ok(StreamDavServer {
        addr: local_addr,
        shutdown_tx: Some(shutdown_tx),
    })
}

fn spawn_connection(service: DavService, stream: TcpStream) {
    let io = TokioIo::new(stream);

    tokio::spawn(async move {
        if let Err(err) = http1::Builder::new()
            .serve_connection(
                io,
                service_fn(move |req| {
                    let service = service.clone();
                    async move { Ok::<_, Infallible>(service.handle(req).await) }
                }),
            )
            .await
        {
            // Players drop connections mid-stream all the time.
            debug!("Connection closed: {:?}", err);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticToken;
    use crate::fetch::{Fetcher, DEFAULT_TIMEOUT};
    use crate::webdav::DavConfig;
    use std::sync::Arc;
    use stream_index::{FileEntry, FolderEntry, HierarchyReader, IndexError};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    struct EmptyIndex;

    impl HierarchyReader for EmptyIndex {
        fn get_file(&self, _id: &str) -> stream_index::Result<FileEntry> {
            Err(IndexError::NotFound)
        }

        fn recursive_files(&self, _folder_id: &str) -> stream_index::Result<Vec<FileEntry>> {
            Ok(Vec::new())
        }

        fn recursive_folders(&self, _folder_id: &str, _depth: u32) -> stream_index::Result<Vec<FolderEntry>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_server_starts() {
        let fetcher = Fetcher::new(
            Arc::new(StaticToken::new("t")),
            "http://127.0.0.1:9",
            DEFAULT_TIMEOUT,
        )
        .unwrap();
        let service = DavService::new(DavConfig::new("F", "S"), Arc::new(EmptyIndex), fetcher);
        let server = serve_background(service, "127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        assert_ne!(server.addr().port(), 0);
        assert_eq!(server.url(), format!("http://{}", server.addr()));

        let mut stream = TcpStream::connect(server.addr()).await.unwrap();
        stream
            .write_all(b"OPTIONS / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200 OK"), "{response}");
        assert!(response.to_ascii_lowercase().contains("dav: 1"), "{response}");

        server.shutdown();
    }
}
