//! Typed errors for the chart pipeline.
//!
//! The binary wraps these in `anyhow` at the CLI boundary; inside the crate
//! fetch and parse failures stay distinguishable.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("read {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("GET {url}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("GET {url}: server answered {status}")]
    Status { url: String, status: u16 },
}

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("line {line}: expected `key,number`, got {content:?}")]
    Malformed { line: usize, content: String },

    #[error("value pattern")]
    Pattern(#[from] regex::Error),
}

#[derive(Debug, Error, PartialEq)]
pub enum RenderError {
    #[error("chart {0:?} was never rendered")]
    UnknownChart(String),

    #[error("serialize chart {id:?}: {message}")]
    Serialize { id: String, message: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config {path}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("parse {name}")]
    Parse {
        name: String,
        #[source]
        source: ParseError,
    },

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("no chart generated for event {0:?}")]
    UnknownEvent(String),
}
