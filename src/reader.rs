use std::{io, path::PathBuf, time::Duration};

use async_trait::async_trait;
use tracing::trace;
use url::Url;

use crate::location::Location;

#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to fetch {url}: {source}")]
    Http {
        url: Url,
        #[source]
        source: reqwest::Error,
    },

    #[error("fetching {url} returned status {status}")]
    Status { url: Url, status: u16 },

    #[error("{0} cannot be read by this reader")]
    UnsupportedLocation(Location),
}

/// Reads module source text without blocking on anything but local I/O.
pub trait ReadSource: Send + Sync {
    fn read(&self, location: &Location) -> Result<String, ReadError>;
}

/// Reads module source text, possibly waiting on the network.
#[async_trait]
pub trait AsyncReadSource: Send + Sync {
    async fn read(&self, location: &Location) -> Result<String, ReadError>;
}

#[async_trait]
impl<T: ReadSource> AsyncReadSource for T {
    async fn read(&self, location: &Location) -> Result<String, ReadError> {
        ReadSource::read(self, location)
    }
}

/// Reads paths from the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsReader;

impl ReadSource for FsReader {
    fn read(&self, location: &Location) -> Result<String, ReadError> {
        match location {
            Location::Path(path) => {
                std::fs::read_to_string(path).map_err(|source| ReadError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
            Location::Url(_) => Err(ReadError::UnsupportedLocation(location.clone())),
        }
    }
}

/// Reads paths with `tokio::fs` and fetches URLs over HTTP.
#[derive(Debug, Clone)]
pub struct UrlOrPathReader {
    client: reqwest::Client,
}

impl UrlOrPathReader {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Fails fetches that take longer than `timeout` with [`ReadError::Http`].
    pub fn with_timeout(timeout: Duration) -> Result<Self, reqwest::Error> {
        reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map(Self::with_client)
    }

    async fn fetch(&self, url: &Url) -> Result<String, ReadError> {
        let http_error = |source| ReadError::Http {
            url: url.clone(),
            source,
        };
        trace!(%url, "fetching module");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(http_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ReadError::Status {
                url: url.clone(),
                status: status.as_u16(),
            });
        }
        response.text().await.map_err(http_error)
    }
}

impl Default for UrlOrPathReader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AsyncReadSource for UrlOrPathReader {
    async fn read(&self, location: &Location) -> Result<String, ReadError> {
        match location {
            Location::Path(path) => {
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| ReadError::Io {
                        path: path.to_path_buf(),
                        source,
                    })
            }
            Location::Url(url) => self.fetch(url).await,
        }
    }
}
