//! Markdown documents with embedded Manim fences.
//!
//! Every fence whose language tag matches the configured fence language is
//! rendered through [`ManimRenderer`] into its own [`HtmlSurface`] and replaced
//! by the surface HTML. All fences of a document render concurrently on the
//! calling task; everything else goes through comrak unchanged.

use comrak::{
    Arena, Options, format_html,
    nodes::{AstNode, NodeHtmlBlock, NodeValue},
    parse_document,
};
use futures::future::join_all;
use thiserror::Error;
use tracing::info;

use crate::config::MediaMode;

use super::{
    dispatcher::{ManimRenderer, RenderOutcome},
    surface::{HtmlSurface, ObjectUrlStrategy},
};

pub const DEFAULT_FENCE_LANGUAGE: &str = "manim";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentOptions {
    pub fence_language: String,
    pub media: ObjectUrlStrategy,
}

impl Default for DocumentOptions {
    fn default() -> Self {
        Self {
            fence_language: DEFAULT_FENCE_LANGUAGE.to_string(),
            media: ObjectUrlStrategy::Inline,
        }
    }
}

impl From<&crate::config::Settings> for DocumentOptions {
    fn from(settings: &crate::config::Settings) -> Self {
        let media = match settings.output.media {
            MediaMode::Inline => ObjectUrlStrategy::Inline,
            MediaMode::Directory => ObjectUrlStrategy::Directory {
                dir: settings.output.assets_dir.clone(),
                url_prefix: settings.output.assets_url_prefix.clone(),
            },
        };
        Self {
            fence_language: settings.renderer.fence_language.clone(),
            media,
        }
    }
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to format markdown: {message}")]
    Markdown { message: String },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedDocument {
    pub html: String,
    pub rendered: usize,
    pub rejected: usize,
    pub errored: usize,
}

impl RenderedDocument {
    pub fn fences(&self) -> usize {
        self.rendered + self.rejected + self.errored
    }
}

struct Fence<'a> {
    node: &'a AstNode<'a>,
    annotation: String,
    code: String,
}

pub async fn render_document(
    markdown: &str,
    renderer: &ManimRenderer,
    options: &DocumentOptions,
) -> Result<RenderedDocument, DocumentError> {
    let arena = Arena::new();
    let comrak_options = markdown_options();
    let root = parse_document(&arena, markdown, &comrak_options);

    let fences = collect_fences(root, &options.fence_language);
    let mut surfaces: Vec<HtmlSurface> = fences
        .iter()
        .map(|_| HtmlSurface::new(options.media.clone()))
        .collect();

    let outcomes = join_all(
        fences
            .iter()
            .zip(surfaces.iter_mut())
            .map(|(fence, surface)| renderer.render(&fence.code, &fence.annotation, surface)),
    )
    .await;

    let mut document = RenderedDocument::default();
    for outcome in &outcomes {
        match outcome {
            RenderOutcome::Rendered { .. } => document.rendered += 1,
            RenderOutcome::Rejected { .. } => document.rejected += 1,
            RenderOutcome::Errored { .. } => document.errored += 1,
        }
    }

    for (fence, surface) in fences.iter().zip(&surfaces) {
        let mut data = fence.node.data.borrow_mut();
        data.value = NodeValue::HtmlBlock(NodeHtmlBlock {
            block_type: 0,
            literal: figure_html(surface),
        });
    }

    let mut html = String::new();
    format_html(root, &comrak_options, &mut html).map_err(|err| DocumentError::Markdown {
        message: err.to_string(),
    })?;
    document.html = html;

    info!(
        target = "application::render::document",
        op = "document::render",
        fences = document.fences(),
        rendered = document.rendered,
        rejected = document.rejected,
        errored = document.errored,
        html_bytes = document.html.len(),
        "Markdown document rendered"
    );

    Ok(document)
}

/// Wrap a single surface in the figure used for both documents and standalone blocks.
pub fn figure_html(surface: &HtmlSurface) -> String {
    format!(
        "<figure data-role=\"manim-render\">\n{}</figure>\n",
        surface.to_html()
    )
}

fn collect_fences<'a>(root: &'a AstNode<'a>, fence_language: &str) -> Vec<Fence<'a>> {
    root.descendants()
        .filter_map(|node| {
            let data = node.data.borrow();
            let NodeValue::CodeBlock(block) = &data.value else {
                return None;
            };
            if !block.fenced {
                return None;
            }

            let mut segments = block.info.split_whitespace();
            let language = segments.next()?;
            if !language.eq_ignore_ascii_case(fence_language) {
                return None;
            }

            Some(Fence {
                node,
                annotation: segments.collect::<Vec<_>>().join(" "),
                code: block.literal.clone(),
            })
        })
        .collect()
}

fn markdown_options() -> Options<'static> {
    let mut options = Options::default();

    let ext = &mut options.extension;
    ext.strikethrough = true;
    ext.table = true;
    ext.autolink = true;
    ext.tasklist = true;
    ext.footnotes = true;

    let render = &mut options.render;
    render.github_pre_lang = true;
    render.r#unsafe = true;

    options
}
