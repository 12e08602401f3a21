//! Feature collection retrieval.
//!
//! The pipeline only consumes a parsed [`FeatureCollection`] or the error
//! raised while producing it. Retries belong to the source implementation;
//! [`LocatorSource`] does not retry.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use formats::{FeatureCollection, FeatureCollectionError};
use tracing::debug;

/// Type alias for a boxed future that can be sent between threads.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

#[derive(Debug)]
pub enum RetrievalError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Http {
        url: String,
        source: reqwest::Error,
    },
    Parse {
        locator: String,
        source: FeatureCollectionError,
    },
}

impl std::fmt::Display for RetrievalError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RetrievalError::Io { path, source } => {
                write!(f, "failed to read {}: {source}", path.display())
            }
            RetrievalError::Http { url, source } => write!(f, "failed to fetch {url}: {source}"),
            RetrievalError::Parse { locator, source } => {
                write!(f, "failed to parse {locator}: {source}")
            }
        }
    }
}

impl std::error::Error for RetrievalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RetrievalError::Io { source, .. } => Some(source),
            RetrievalError::Http { source, .. } => Some(source),
            RetrievalError::Parse { source, .. } => Some(source),
        }
    }
}

/// Produces a feature collection for a string locator.
///
/// Implementations must be `Send + Sync` for use across async tasks.
pub trait FeatureSource: Send + Sync {
    fn fetch<'a>(
        &'a self,
        locator: &'a str,
    ) -> BoxFuture<'a, Result<FeatureCollection, RetrievalError>>;
}

/// Where a locator points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator<'a> {
    Http(&'a str),
    File(&'a Path),
}

impl<'a> Locator<'a> {
    pub fn parse(locator: &'a str) -> Self {
        if locator.starts_with("http://") || locator.starts_with("https://") {
            Locator::Http(locator)
        } else if let Some(path) = locator.strip_prefix("file://") {
            Locator::File(Path::new(path))
        } else {
            Locator::File(Path::new(locator))
        }
    }
}

/// Reads `http(s)://` locators with reqwest and everything else from disk.
#[derive(Debug, Clone, Default)]
pub struct LocatorSource {
    http: reqwest::Client,
}

impl LocatorSource {
    pub fn new() -> Self {
        Self::default()
    }

    async fn read(&self, locator: &str) -> Result<String, RetrievalError> {
        match Locator::parse(locator) {
            Locator::Http(url) => {
                let http_err = |source| RetrievalError::Http {
                    url: url.to_string(),
                    source,
                };
                let resp = self
                    .http
                    .get(url)
                    .send()
                    .await
                    .and_then(reqwest::Response::error_for_status)
                    .map_err(http_err)?;
                resp.text().await.map_err(http_err)
            }
            Locator::File(path) => {
                tokio::fs::read_to_string(path)
                    .await
                    .map_err(|source| RetrievalError::Io {
                        path: path.to_path_buf(),
                        source,
                    })
            }
        }
    }
}

impl FeatureSource for LocatorSource {
    fn fetch<'a>(
        &'a self,
        locator: &'a str,
    ) -> BoxFuture<'a, Result<FeatureCollection, RetrievalError>> {
        Box::pin(async move {
            let payload = self.read(locator).await?;
            debug!(locator, bytes = payload.len(), "retrieved feature collection");
            FeatureCollection::from_geojson_str(&payload).map_err(|source| RetrievalError::Parse {
                locator: locator.to_string(),
                source,
            })
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::Path;

    use super::{FeatureSource, Locator, LocatorSource, RetrievalError};

    const ONE_SQUARE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            { "type": "Feature", "properties": {},
              "geometry": { "type": "Polygon",
                            "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 1]]] } }
        ]
    }"#;

    #[test]
    fn classifies_locators() {
        assert_eq!(
            Locator::parse("https://example.org/china.json"),
            Locator::Http("https://example.org/china.json")
        );
        assert_eq!(
            Locator::parse("file:///data/a.geojson"),
            Locator::File(Path::new("/data/a.geojson"))
        );
        assert_eq!(
            Locator::parse("assets/a.geojson"),
            Locator::File(Path::new("assets/a.geojson"))
        );
    }

    #[tokio::test]
    async fn reads_collection_from_disk() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(ONE_SQUARE.as_bytes()).expect("write");
        let path = file.path().to_string_lossy().into_owned();

        let source = LocatorSource::new();
        let fc = source.fetch(&path).await.expect("fetch by path");
        assert_eq!(fc.features.len(), 1);

        let url = format!("file://{path}");
        let fc = source.fetch(&url).await.expect("fetch by file url");
        assert_eq!(fc.polygonal_feature_count(), 1);
    }

    #[tokio::test]
    async fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().expect("temp dir");
        let missing = dir.path().join("missing.geojson");
        let err = LocatorSource::new()
            .fetch(&missing.to_string_lossy())
            .await
            .expect_err("missing file");
        assert!(matches!(err, RetrievalError::Io { .. }));
    }

    #[tokio::test]
    async fn invalid_document_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(b"{\"type\": \"Topology\"}").expect("write");
        let err = LocatorSource::new()
            .fetch(&file.path().to_string_lossy())
            .await
            .expect_err("not geojson");
        assert!(matches!(err, RetrievalError::Parse { .. }));
        assert!(err.to_string().contains("FeatureCollection"));
    }
}
