use std::path::PathBuf;

use thiserror::Error;

use crate::GID;

/// Errors raised while building or registering tags.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
    #[error("empty tag path is not allowed")]
    EmptyPath,

    #[error("invalid tag path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("tag path '{path}' has depth {depth}, exceeding MAX_DEPTH ({max})")]
    TooDeep {
        path: String,
        depth: usize,
        max: usize,
    },

    #[error("GID collision: '{path}' and '{existing}' both hash to {gid:#034x}")]
    Collision {
        path: String,
        existing: String,
        gid: GID,
    },
}

/// Errors raised while loading configuration or value assets.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Tag(#[from] TagError),

    #[error("validation error: {0}")]
    Validation(String),
}
