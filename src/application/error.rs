use std::{error::Error as StdError, io, path::PathBuf};

use thiserror::Error;

use crate::{
    application::render::{DocumentError, RendererError},
    config::LoadError,
    infra::error::InfraError,
};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("failed to load configuration: {0}")]
    Config(#[from] LoadError),
    #[error(transparent)]
    Renderer(#[from] RendererError),
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("failed to read input file {path}: {source}")]
    Input { path: PathBuf, source: io::Error },
    #[error("failed to write output file {path}: {source}")]
    Output { path: PathBuf, source: io::Error },
}

impl AppError {
    pub fn input(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Input {
            path: path.into(),
            source,
        }
    }

    pub fn output(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Output {
            path: path.into(),
            source,
        }
    }
}

/// The error message followed by every message in its source chain.
pub fn error_chain(error: &dyn StdError) -> Vec<String> {
    let mut messages = vec![error.to_string()];
    let mut current = error.source();
    while let Some(inner) = current {
        messages.push(inner.to_string());
        current = inner.source();
    }
    messages
}
