//! Presentation surfaces the dispatcher renders into.
//!
//! A surface is whatever container the host hands over for a single fence: it
//! accepts appended elements, can drop them again, lets the dispatcher rewrite
//! the status text, and turns decoded media into a URL its elements can point at.

use std::{
    fs,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};

use sha2::{Digest, Sha256};
use thiserror::Error;

use super::media::{MediaBlob, extension_for_mime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Element {
    /// Transient progress or failure text.
    Status { text: String },
    /// Video with playback controls, scaled to the container width.
    Video { src: String },
    /// Image scaled to the container width.
    Image { src: String },
    /// Fallback for media the surface cannot display inline.
    DownloadLink {
        href: String,
        label: String,
        filename: String,
    },
}

impl Element {
    pub fn status(text: impl Into<String>) -> Self {
        Self::Status { text: text.into() }
    }
}

#[derive(Debug, Error)]
pub enum SurfaceError {
    #[error("failed to write media to {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

pub trait RenderSurface {
    fn append_child(&mut self, element: Element) -> NodeId;

    /// Removing a node that is not attached is a no-op.
    fn remove_child(&mut self, node: NodeId);

    /// Replace the text of a status node. Ignored for other elements.
    fn set_text(&mut self, node: NodeId, text: &str);

    fn create_object_url(&mut self, blob: &MediaBlob) -> Result<String, SurfaceError>;
}

/// Where [`HtmlSurface`] puts decoded media.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectUrlStrategy {
    /// Embed media as `data:` URLs.
    Inline,
    /// Write media into `dir` under a content hash and link to it via `url_prefix`.
    Directory { dir: PathBuf, url_prefix: String },
}

/// In-memory surface that serialises its children to HTML.
#[derive(Debug)]
pub struct HtmlSurface {
    strategy: ObjectUrlStrategy,
    next_id: usize,
    children: Vec<(NodeId, Element)>,
}

impl HtmlSurface {
    pub fn new(strategy: ObjectUrlStrategy) -> Self {
        Self {
            strategy,
            next_id: 0,
            children: Vec::new(),
        }
    }

    pub fn inline() -> Self {
        Self::new(ObjectUrlStrategy::Inline)
    }

    pub fn children(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().map(|(_, element)| element)
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Text of the first attached status node.
    pub fn status_text(&self) -> Option<&str> {
        self.children().find_map(|element| match element {
            Element::Status { text } => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn to_html(&self) -> String {
        let mut html = String::new();
        for element in self.children() {
            match element {
                Element::Status { text } => {
                    html.push_str("<div data-role=\"manim-status\" style=\"font-style: italic\">");
                    html.push_str(&ammonia::clean_text(text));
                    html.push_str("</div>");
                }
                Element::Video { src } => {
                    html.push_str("<video controls src=\"");
                    html.push_str(&escape_attribute(src));
                    html.push_str("\" style=\"max-width: 100%\"></video>");
                }
                Element::Image { src } => {
                    html.push_str("<img src=\"");
                    html.push_str(&escape_attribute(src));
                    html.push_str("\" alt=\"\" style=\"max-width: 100%\">");
                }
                Element::DownloadLink {
                    href,
                    label,
                    filename,
                } => {
                    html.push_str("<a href=\"");
                    html.push_str(&escape_attribute(href));
                    html.push_str("\" download=\"");
                    html.push_str(&escape_attribute(filename));
                    html.push_str("\">");
                    html.push_str(&ammonia::clean_text(label));
                    html.push_str("</a>");
                }
            }
            html.push('\n');
        }
        html
    }

    fn position(&self, node: NodeId) -> Option<usize> {
        self.children.iter().position(|(id, _)| *id == node)
    }
}

impl RenderSurface for HtmlSurface {
    fn append_child(&mut self, element: Element) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.children.push((id, element));
        id
    }

    fn remove_child(&mut self, node: NodeId) {
        if let Some(index) = self.position(node) {
            self.children.remove(index);
        }
    }

    fn set_text(&mut self, node: NodeId, text: &str) {
        let Some(index) = self.position(node) else {
            return;
        };
        if let Element::Status { text: current } = &mut self.children[index].1 {
            text.clone_into(current);
        }
    }

    fn create_object_url(&mut self, blob: &MediaBlob) -> Result<String, SurfaceError> {
        match &self.strategy {
            ObjectUrlStrategy::Inline => {
                Ok(format!("data:{};base64,{}", blob.mime, blob.to_base64()))
            }
            ObjectUrlStrategy::Directory { dir, url_prefix } => {
                let name = write_content_addressed(dir, blob)?;
                let prefix = url_prefix.trim_end_matches('/');
                if prefix.is_empty() {
                    Ok(name)
                } else {
                    Ok(format!("{prefix}/{name}"))
                }
            }
        }
    }
}

fn write_content_addressed(dir: &Path, blob: &MediaBlob) -> Result<String, SurfaceError> {
    let name = format!(
        "{}.{}",
        hash_bytes(&blob.bytes),
        extension_for_mime(blob.mime)
    );
    let path = dir.join(&name);

    fs::create_dir_all(dir).map_err(|source| SurfaceError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    match fs::metadata(&path) {
        Ok(meta) if meta.len() == blob.len() as u64 => return Ok(name),
        Ok(_) => {}
        Err(err) if err.kind() == ErrorKind::NotFound => {}
        Err(source) => return Err(SurfaceError::Io { path, source }),
    }
    fs::write(&path, &blob.bytes).map_err(|source| SurfaceError::Io { path, source })?;
    Ok(name)
}

fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

fn escape_attribute(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\n' | '\r' | '\t' => escaped.push(' '),
            _ => escaped.push(ch),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use tempfile::TempDir;

    use super::*;

    /// Undo entity escaping so assertions see the text a browser would show.
    fn displayed(html: &str) -> String {
        let mut out = String::with_capacity(html.len());
        let mut rest = html;
        while let Some(start) = rest.find('&') {
            out.push_str(&rest[..start]);
            let tail = &rest[start..];
            let Some(end) = tail.find(';') else {
                out.push_str(tail);
                return out;
            };
            let entity = &tail[1..end];
            let decoded = match entity {
                "lt" => Some('<'),
                "gt" => Some('>'),
                "amp" => Some('&'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "grave" => Some('`'),
                _ => entity
                    .strip_prefix('#')
                    .and_then(|code| code.parse::<u32>().ok())
                    .and_then(char::from_u32),
            };
            match decoded {
                Some(ch) => out.push(ch),
                None => out.push_str(&tail[..=end]),
            }
            rest = &tail[end + 1..];
        }
        out.push_str(rest);
        out
    }

    fn blob(bytes: &'static [u8], mime: &'static str) -> MediaBlob {
        MediaBlob {
            mime,
            bytes: Bytes::from_static(bytes),
        }
    }

    #[test]
    fn status_text_can_be_replaced_and_removed() {
        let mut surface = HtmlSurface::inline();
        let status = surface.append_child(Element::status("Rendering"));
        surface.set_text(status, "Render failed: boom");
        assert_eq!(surface.status_text(), Some("Render failed: boom"));

        surface.remove_child(status);
        assert!(surface.is_empty());
        // Detached nodes are ignored.
        surface.set_text(status, "late");
        surface.remove_child(status);
        assert!(surface.is_empty());
    }

    #[test]
    fn set_text_ignores_media_elements() {
        let mut surface = HtmlSurface::inline();
        let image = surface.append_child(Element::Image { src: "a.png".into() });
        surface.set_text(image, "nope");
        assert_eq!(
            surface.children().next(),
            Some(&Element::Image { src: "a.png".into() })
        );
    }

    #[test]
    fn inline_urls_embed_payload() {
        let mut surface = HtmlSurface::inline();
        let url = surface
            .create_object_url(&blob(b"hello", "image/png"))
            .expect("url");
        assert_eq!(url, "data:image/png;base64,aGVsbG8=");
    }

    #[test]
    fn directory_urls_are_content_addressed() {
        let dir = TempDir::new().expect("temp dir");
        let assets = dir.path().join("assets");
        let mut surface = HtmlSurface::new(ObjectUrlStrategy::Directory {
            dir: assets.clone(),
            url_prefix: "media/".into(),
        });

        let first = surface
            .create_object_url(&blob(b"frame", "video/mp4"))
            .expect("first url");
        let second = surface
            .create_object_url(&blob(b"frame", "video/mp4"))
            .expect("second url");
        assert_eq!(first, second);
        assert!(first.starts_with("media/"), "unexpected url: {first}");
        assert!(first.ends_with(".mp4"), "unexpected url: {first}");

        let name = first.trim_start_matches("media/");
        let written = fs::read(assets.join(name)).expect("read media");
        assert_eq!(written, b"frame");
    }

    #[test]
    fn html_escapes_attributes_and_text() {
        let mut surface = HtmlSurface::inline();
        surface.append_child(Element::DownloadLink {
            href: "data:x\"y".into(),
            label: "Download <scene>.xyz".into(),
            filename: "<scene>.xyz".into(),
        });
        let html = surface.to_html();
        assert!(html.contains("href=\"data:x&quot;y\""), "{html}");
        assert!(html.contains("download=\"&lt;scene&gt;.xyz\""), "{html}");
        assert!(!html.contains("<scene>"), "{html}");
        assert!(
            displayed(&html).contains(">Download <scene>.xyz</a>"),
            "{html}"
        );
    }

    #[test]
    fn status_html_shows_message_text() {
        let mut surface = HtmlSurface::inline();
        surface.append_child(Element::status("Render failed: x < y & z"));
        let html = surface.to_html();
        assert!(html.starts_with("<div data-role=\"manim-status\""), "{html}");
        assert!(!html.contains("x < y"), "{html}");
        assert!(
            displayed(&html).contains(">Render failed: x < y & z</div>"),
            "{html}"
        );
    }
}
