//! PROPFIND responders.

use super::{
    full_body, multistatus, not_found, status_response, DavBody, DavResource, DavService,
    FileRequest,
};
use crate::naming::{decode_folder, encode_file, encode_folder};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use log::{debug, error};
use urlencoding::encode;

impl DavService {
    /// `/`: the root plus the two fixed collections. No index access.
    pub(crate) fn prop_root(&self) -> Response<DavBody> {
        write_xml(&[
            DavResource::folder("/", ""),
            DavResource::folder("/films/", "films"),
            DavResource::folder("/shows/", "shows"),
        ])
    }

    /// `/films`: every file below the films folder.
    pub(crate) async fn prop_films(&self) -> Response<DavBody> {
        let films_id = self.inner.films_id.clone();
        let films = match self.query(move |index| index.recursive_files(&films_id)).await {
            Ok(films) => films,
            Err(err) => {
                error!("Listing films failed: {}", err);
                return not_found();
            }
        };

        debug!("PROPFIND /films: {} files", films.len());

        let mut responses = Vec::with_capacity(films.len() + 1);
        responses.push(DavResource::folder("/films/", "films"));
        for f in &films {
            let href = format!("/films/{}", encode(&encode_file(&f.name, &f.id)));
            responses.push(DavResource::file(href, f));
        }

        write_xml(&responses)
    }

    /// `/shows`: one collection per folder at the configured depth.
    pub(crate) async fn prop_shows(&self) -> Response<DavBody> {
        let shows_id = self.inner.shows_id.clone();
        let depth = self.inner.depth;
        let shows = match self
            .query(move |index| index.recursive_folders(&shows_id, depth))
            .await
        {
            Ok(shows) => shows,
            Err(err) => {
                error!("Listing shows failed: {}", err);
                return not_found();
            }
        };

        debug!("PROPFIND /shows: {} folders", shows.len());

        let mut responses = Vec::with_capacity(shows.len() + 1);
        responses.push(DavResource::folder("/shows/", "shows"));
        for f in &shows {
            let href = format!("/shows/{}", encode(&encode_folder(&f.name, &f.id)));
            responses.push(DavResource::folder(href, f.name.as_str()));
        }

        write_xml(&responses)
    }

    /// `/shows/:folder`: every file below one show folder.
    pub(crate) async fn prop_episodes(&self, segment: &str) -> Response<DavBody> {
        let (name, id) = match decode_folder(segment) {
            Ok(decoded) => decoded,
            Err(err) => {
                debug!("{}: {:?}", err, segment);
                return not_found();
            }
        };

        let folder_id = id.to_string();
        let episodes = match self
            .query(move |index| index.recursive_files(&folder_id))
            .await
        {
            Ok(episodes) => episodes,
            Err(err) => {
                error!("Listing episodes of {} failed: {}", id, err);
                return status_response(StatusCode::INTERNAL_SERVER_ERROR);
            }
        };

        let folder_href = format!("/shows/{}", encode(segment));
        let mut responses = Vec::with_capacity(episodes.len() + 1);
        responses.push(DavResource::folder(folder_href.as_str(), name));
        for f in &episodes {
            let href = format!("{}/{}", folder_href, encode(&encode_file(&f.name, &f.id)));
            responses.push(DavResource::file(href, f));
        }

        write_xml(&responses)
    }

    /// `:file` routes: the resolved file alone.
    pub(crate) fn prop_file(&self, href: &str, req: &FileRequest) -> Response<DavBody> {
        write_xml(&[DavResource::file(href, &req.file)])
    }
}

fn write_xml(resources: &[DavResource]) -> Response<DavBody> {
    let body = match multistatus(resources) {
        Ok(body) => body,
        Err(err) => {
            error!("{}", err);
            return status_response(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    let mut response = Response::new(full_body(body));
    *response.status_mut() = StatusCode::MULTI_STATUS;
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/xml; charset=utf-8"),
    );
    response
}
