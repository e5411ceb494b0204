//! Application services: fence rendering and the errors surfaced to the binary.

pub mod error;
pub mod render;
