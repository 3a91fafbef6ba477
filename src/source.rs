//! Where CSV payloads come from: a local directory or an HTTP(S) base URL.

use crate::error::FetchError;
use std::path::PathBuf;
use tracing::debug;

/// Fetch port. `name` is a file name such as `keypress_all.csv`.
pub trait Source {
    fn fetch(&self, name: &str) -> Result<String, FetchError>;
}

#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl Source for DirSource {
    fn fetch(&self, name: &str) -> Result<String, FetchError> {
        let path = self.root.join(name);
        debug!(path = %path.display(), "reading payload");
        std::fs::read_to_string(&path).map_err(|source| FetchError::Io {
            path: path.display().to_string(),
            source,
        })
    }
}

#[derive(Debug, Clone)]
pub struct HttpSource {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpSource {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: reqwest::blocking::Client::new(),
        }
    }

    pub fn url(&self, name: &str) -> String {
        format!("{}/{}", self.base_url, name)
    }
}

impl Source for HttpSource {
    fn fetch(&self, name: &str) -> Result<String, FetchError> {
        let url = self.url(name);
        debug!(%url, "fetching payload");
        let resp = match self.client.get(&url).send() {
            Ok(resp) => resp,
            Err(source) => return Err(FetchError::Http { url, source }),
        };
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }
        resp.text().map_err(|source| FetchError::Http { url, source })
    }
}

/// Pick a source from a CLI argument: URLs go over HTTP, anything else is a
/// directory.
pub fn from_location(location: &str) -> Box<dyn Source> {
    if location.starts_with("http://") || location.starts_with("https://") {
        Box::new(HttpSource::new(location))
    } else {
        Box::new(DirSource::new(location))
    }
}

impl<S: Source + ?Sized> Source for Box<S> {
    fn fetch(&self, name: &str) -> Result<String, FetchError> {
        (**self).fetch(name)
    }
}
