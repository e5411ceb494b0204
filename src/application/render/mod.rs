//! Manim fence rendering.
//!
//! A fence's annotation line is parsed into options, combined with configured
//! defaults into a request for the render server, and the returned media is
//! attached to a [`RenderSurface`]. Failures never propagate to the caller;
//! they end up as status text on the surface.

mod dispatcher;
mod document;
mod info;
mod media;
mod surface;

pub use dispatcher::{
    DEFAULT_FORMAT, DEFAULT_QUALITY, DEFAULT_SCENE, DEFAULT_SERVER_URL, ManimRenderer,
    RenderOutcome, RendererError, RendererOptions, STATUS_IN_PROGRESS,
};
pub use document::{
    DEFAULT_FENCE_LANGUAGE, DocumentError, DocumentOptions, RenderedDocument, figure_html,
    render_document,
};
pub use info::{ParsedOptions, parse_info_string};
pub use media::{MediaBlob, MediaKind, OCTET_STREAM, extension_of, mime_for_extension};
pub use surface::{
    Element, HtmlSurface, NodeId, ObjectUrlStrategy, RenderSurface, SurfaceError,
};
