//! Fatal errors raised while loading a project.
//!
//! Everything in here aborts a parse. Recoverable conditions (missing
//! property sheets, file nodes without a path, absent attributes) never
//! surface as a [`ProjectError`]; they are logged and skipped instead.

use std::path::PathBuf;

use thiserror::Error;

use crate::format::Format;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("{}: does not exist", path.display())]
    NotFound { path: PathBuf },

    #[error("{}: empty or unreadable: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: empty or unreadable", path.display())]
    Empty { path: PathBuf },

    #[error("XML Error: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("{}: {format} files are not supported", path.display())]
    UnsupportedFormat { path: PathBuf, format: Format },

    #[error("{} does not contain any global properties", path.display())]
    NoGlobalProperties { path: PathBuf },

    #[error("{} does not contain any configurations", path.display())]
    NoConfigurations { path: PathBuf },

    #[error("Failed to parse condition '{condition}': {message}")]
    Condition { condition: String, message: String },

    #[error("{} is not a directory", path.display())]
    NotADirectory { path: PathBuf },

    #[error("Configuration '{0}' not found")]
    UnknownConfiguration(String),

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
}
