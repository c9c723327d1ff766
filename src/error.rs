use std::path::PathBuf;

use thiserror::Error;

/// Everything that can abort a scrape run.
///
/// Upstream HTTP error statuses and extraction misses are deliberately absent:
/// they are logged and tolerated, never raised.
#[derive(Debug, Error)]
pub enum Error {
    #[error("required environment variable `{0}` is not set")]
    MissingEnv(&'static str),

    #[error("invalid value `{value}` for environment variable `{name}`")]
    InvalidEnv { name: &'static str, value: String },

    #[error("input file not found: {}", .0.display())]
    InputNotFound(PathBuf),

    #[error("a search request needs at least one non-blank keyword")]
    NoKeywords,

    #[error("invalid proxy address `{address}`: {source}")]
    InvalidProxy {
        address: String,
        #[source]
        source: reqwest::Error,
    },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Url(#[from] url::ParseError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Template(#[from] indicatif::style::TemplateError),
}

pub type Result<T> = std::result::Result<T, Error>;
