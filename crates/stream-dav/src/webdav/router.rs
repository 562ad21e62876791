//! Method and path dispatch.

use super::{not_found, status_response, DavBody, DavService, RequestContext};
use hyper::header::{HeaderValue, ALLOW, RANGE};
use hyper::{Method, Request, Response, StatusCode};
use log::{debug, trace};

const ALLOW_COLLECTION: &str = "OPTIONS, PROPFIND";
const ALLOW_FILE: &str = "OPTIONS, PROPFIND, GET, HEAD";

/// A recognised path, with its segments percent-decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Root,
    Films,
    Shows,
    /// `/films/:file`
    FilmFile(String),
    /// `/shows/:folder`
    Show(String),
    /// `/shows/:folder/:file`
    ShowFile(String, String),
}

impl Route {
    /// Match a request path. A trailing slash is ignored.
    pub fn parse(path: &str) -> Option<Route> {
        let trimmed = path.trim_start_matches('/').trim_end_matches('/');
        if trimmed.is_empty() {
            return Some(Route::Root);
        }

        let segments = trimmed
            .split('/')
            .map(|s| urlencoding::decode(s).ok().map(|s| s.into_owned()))
            .collect::<Option<Vec<String>>>()?;

        let route = match segments.as_slice() {
            [top] if top == "films" => Route::Films,
            [top] if top == "shows" => Route::Shows,
            [top, file] if top == "films" => Route::FilmFile(file.clone()),
            [top, folder] if top == "shows" => Route::Show(folder.clone()),
            [top, folder, file] if top == "shows" => Route::ShowFile(folder.clone(), file.clone()),
            _ => return None,
        };
        Some(route)
    }

    fn file_segment(&self) -> Option<&str> {
        match self {
            Route::FilmFile(file) | Route::ShowFile(_, file) => Some(file),
            _ => None,
        }
    }

    fn allow(&self) -> &'static str {
        if self.file_segment().is_some() {
            ALLOW_FILE
        } else {
            ALLOW_COLLECTION
        }
    }
}

impl DavService {
    /// Handle one HTTP request. The request body is never read.
    pub async fn handle<B>(&self, req: Request<B>) -> Response<DavBody> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let range = req
            .headers()
            .get(RANGE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        drop(req);
        trace!("{} {}", method, path);

        if method == Method::OPTIONS {
            return options();
        }

        let Some(route) = Route::parse(&path) else {
            debug!("No route for {} {}", method, path);
            return not_found();
        };

        let ctx = RequestContext::new();
        match (method.as_str(), &route) {
            ("PROPFIND", Route::Root) => self.prop_root(),
            ("PROPFIND", Route::Films) => self.prop_films().await,
            ("PROPFIND", Route::Shows) => self.prop_shows().await,
            ("PROPFIND", Route::Show(folder)) => self.prop_episodes(folder).await,
            ("PROPFIND", Route::FilmFile(file) | Route::ShowFile(_, file)) => {
                match self.resolve_file(ctx, file).await {
                    Ok(req) => self.prop_file(&path, &req),
                    Err(response) => response,
                }
            }
            ("GET" | "HEAD", Route::FilmFile(file) | Route::ShowFile(_, file)) => {
                let head = method == Method::HEAD;
                match self.resolve_file(ctx.with_request_id(), file).await {
                    Ok(req) => self.stream_file(req, &range, head),
                    Err(response) => response,
                }
            }
            _ => {
                let mut response = status_response(StatusCode::METHOD_NOT_ALLOWED);
                response
                    .headers_mut()
                    .insert(ALLOW, HeaderValue::from_static(route.allow()));
                response
            }
        }
    }
}

/// Advertise WebDAV class 1 on any path.
fn options() -> Response<DavBody> {
    let mut response = status_response(StatusCode::OK);
    let headers = response.headers_mut();
    headers.insert("dav", HeaderValue::from_static("1"));
    headers.insert("ms-author-via", HeaderValue::from_static("DAV"));
    headers.insert(ALLOW, HeaderValue::from_static(ALLOW_FILE));
    response
}
