//! Render Manim code fences through a remote render server.
//!
//! The library entry point is [`application::render::ManimRenderer::render`],
//! which takes a fence's source, its annotation line and a
//! [`application::render::RenderSurface`] to attach the result to. The
//! `manimark` binary hosts it for whole Markdown documents and single files.

pub mod application;
pub mod config;
pub mod infra;
