//! `DAV:` multistatus documents.

use super::content_type_for;
use stream_index::FileEntry;
use thiserror::Error;
use xmltree::{Element, EmitterConfig, XMLNode};

const STATUS_OK: &str = "HTTP/1.1 200 OK";

#[derive(Debug, Error)]
#[error("failed to write multistatus: {0}")]
pub struct XmlError(String);

/// One `<D:response>` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DavResource {
    pub href: String,
    pub display_name: String,
    pub kind: ResourceKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKind {
    Collection,
    File {
        len: u64,
        content_type: &'static str,
        etag: String,
    },
}

impl DavResource {
    pub fn folder<H: Into<String>, N: Into<String>>(href: H, name: N) -> Self {
        Self {
            href: href.into(),
            display_name: name.into(),
            kind: ResourceKind::Collection,
        }
    }

    pub fn file<H: Into<String>>(href: H, file: &FileEntry) -> Self {
        Self {
            href: href.into(),
            display_name: file.name.clone(),
            kind: ResourceKind::File {
                len: file.size,
                content_type: content_type_for(&file.name),
                etag: file.content_hash.clone(),
            },
        }
    }

    fn to_element(&self) -> Element {
        let mut prop = vec![text_element("D:displayname", &self.display_name)];
        let resource_type = match &self.kind {
            ResourceKind::Collection => element("D:resourcetype", vec![element("D:collection", vec![])]),
            ResourceKind::File {
                len,
                content_type,
                etag,
            } => {
                prop.push(text_element("D:getcontentlength", len.to_string()));
                prop.push(text_element("D:getcontenttype", *content_type));
                if !etag.is_empty() {
                    prop.push(text_element("D:getetag", etag));
                }
                element("D:resourcetype", vec![])
            }
        };
        prop.push(resource_type);

        element(
            "D:response",
            vec![
                text_element("D:href", &self.href),
                element(
                    "D:propstat",
                    vec![
                        element("D:prop", prop),
                        text_element("D:status", STATUS_OK),
                    ],
                ),
            ],
        )
    }
}

/// Render `resources` as a complete multistatus document, XML declaration
/// included.
pub fn multistatus(resources: &[DavResource]) -> Result<Vec<u8>, XmlError> {
    let mut root = element(
        "D:multistatus",
        resources.iter().map(DavResource::to_element).collect(),
    );
    root.attributes
        .insert("xmlns:D".to_string(), "DAV:".to_string());

    let mut out = Vec::new();
    root.write_with_config(
        &mut out,
        EmitterConfig::new()
            .perform_indent(false)
            .write_document_declaration(true),
    )
    .map_err(|e| XmlError(e.to_string()))?;
    Ok(out)
}

fn element(name: &str, children: Vec<Element>) -> Element {
    let mut e = Element::new(name);
    e.children = children.into_iter().map(XMLNode::Element).collect();
    e
}

fn text_element<T: Into<String>>(name: &str, text: T) -> Element {
    let mut e = Element::new(name);
    e.children.push(XMLNode::Text(text.into()));
    e
}
