//! URL parsing for storage backends.
//!
//! Extracts backend configuration from S3, GCS, Azure, local filesystem, and
//! in-memory URLs.

use object_store::path::Path;
use regex::{Captures, Regex};
use std::sync::LazyLock;

use crate::error::{InvalidUrlSnafu, StorageError};

const S3_PATH: &str =
    r"^https://s3\.(?P<region>[\w\-]+)\.amazonaws\.com/(?P<bucket>[a-z0-9\-\.]+)(/(?P<key>.+))?$";
const S3_ENDPOINT_URL: &str = r"^[sS]3[aA]?::(?P<protocol>https?)://(?P<endpoint>[^:/]+):(?P<port>\d+)/(?P<bucket>[a-z0-9\-\.]+)(/(?P<key>.+))?$";
const S3_URL: &str = r"^[sS]3[aA]?://(?P<bucket>[a-z0-9\-\.]+)(/(?P<key>.+))?$";

const GCS_PATH: &str =
    r"^https://storage\.googleapis\.com/(?P<bucket>[a-z0-9\-_\.]+)(/(?P<key>.+))?$";
const GCS_URL: &str = r"^[gG][sS]://(?P<bucket>[a-z0-9\-\._]+)(/(?P<key>.+))?$";

const ABFS_URL: &str = r"^abfss?://(?P<container>[a-z0-9\-]+)@(?P<account>[a-z0-9]+)\.dfs\.core\.windows\.net(/(?P<key>.+))?$";
const AZ_URL: &str = r"^az://(?P<container>[a-z0-9\-]+)(/(?P<key>.+))?$";

const MEMORY_URL: &str = r"^memory://(?P<name>[^/]+)(/(?P<key>.+))?$";

const FILE_URI: &str = r"^file://(?P<path>.*)$";
const FILE_URL: &str = r"^file:(?P<path>.*)$";
const FILE_PATH: &str = r"^/(?P<path>.*)$";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Backend {
    S3,
    Gcs,
    Azure,
    Memory,
    Local,
}

/// Matchers in evaluation order; the first pattern that matches wins.
static MATCHERS: LazyLock<Vec<(Backend, Regex)>> = LazyLock::new(|| {
    [
        (Backend::S3, S3_PATH),
        (Backend::S3, S3_ENDPOINT_URL),
        (Backend::S3, S3_URL),
        (Backend::Gcs, GCS_PATH),
        (Backend::Gcs, GCS_URL),
        (Backend::Azure, ABFS_URL),
        (Backend::Azure, AZ_URL),
        (Backend::Memory, MEMORY_URL),
        (Backend::Local, FILE_URI),
        (Backend::Local, FILE_URL),
        (Backend::Local, FILE_PATH),
    ]
    .into_iter()
    .map(|(backend, pattern)| (backend, Regex::new(pattern).expect("Invalid regex pattern")))
    .collect()
});

/// S3 storage configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Config {
    pub endpoint: Option<String>,
    pub region: Option<String>,
    pub bucket: String,
    pub key: Option<Path>,
}

/// Google Cloud Storage configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcsConfig {
    pub bucket: String,
    pub key: Option<Path>,
}

/// Azure Blob Storage configuration. The account comes from the URL or,
/// for `az://` URLs, from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzureConfig {
    pub account: Option<String>,
    pub container: String,
    pub key: Option<Path>,
}

/// Local filesystem configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalConfig {
    pub path: String,
}

/// Process-local in-memory store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryConfig {
    pub name: String,
    pub key: Option<Path>,
}

/// Backend configuration enum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    S3(S3Config),
    Gcs(GcsConfig),
    Azure(AzureConfig),
    Local(LocalConfig),
    Memory(MemoryConfig),
}

impl BackendConfig {
    /// Parse a URL into a backend configuration.
    pub fn parse_url(url: &str) -> Result<Self, StorageError> {
        let Some((backend, caps)) = MATCHERS
            .iter()
            .find_map(|(backend, re)| re.captures(url).map(|caps| (*backend, caps)))
        else {
            return InvalidUrlSnafu { url }.fail();
        };

        Ok(match backend {
            Backend::S3 => Self::parse_s3(&caps),
            Backend::Gcs => BackendConfig::Gcs(GcsConfig {
                bucket: group(&caps, "bucket"),
                key: key(&caps),
            }),
            Backend::Azure => BackendConfig::Azure(AzureConfig {
                account: caps.name("account").map(|m| m.as_str().to_string()),
                container: group(&caps, "container"),
                key: key(&caps),
            }),
            Backend::Memory => BackendConfig::Memory(MemoryConfig {
                name: group(&caps, "name"),
                key: key(&caps),
            }),
            Backend::Local => Self::parse_local(&caps),
        })
    }

    fn parse_s3(caps: &Captures) -> Self {
        let region = std::env::var("AWS_DEFAULT_REGION")
            .ok()
            .or_else(|| caps.name("region").map(|m| m.as_str().to_string()));

        let endpoint = std::env::var("AWS_ENDPOINT").ok().or_else(|| {
            caps.name("endpoint").map(|endpoint| {
                let protocol = caps.name("protocol").map(|p| p.as_str()).unwrap_or("https");
                let port = caps.name("port").map(|p| p.as_str()).unwrap_or("443");
                format!("{protocol}://{}:{port}", endpoint.as_str())
            })
        });

        BackendConfig::S3(S3Config {
            endpoint,
            region,
            bucket: group(caps, "bucket"),
            key: key(caps),
        })
    }

    fn parse_local(caps: &Captures) -> Self {
        let path = group(caps, "path");
        let path = if path.starts_with('/') {
            path
        } else {
            format!("/{path}")
        };
        BackendConfig::Local(LocalConfig { path })
    }

    /// Key prefix applied to every path on this backend.
    pub(crate) fn key(&self) -> Option<&Path> {
        match self {
            BackendConfig::S3(s3) => s3.key.as_ref(),
            BackendConfig::Gcs(gcs) => gcs.key.as_ref(),
            BackendConfig::Azure(azure) => azure.key.as_ref(),
            BackendConfig::Memory(memory) => memory.key.as_ref(),
            BackendConfig::Local(_) => None,
        }
    }
}

fn group(caps: &Captures, name: &str) -> String {
    caps.name(name)
        .map(|m| m.as_str().to_string())
        .unwrap_or_default()
}

fn key(caps: &Captures) -> Option<Path> {
    caps.name("key").map(|m| Path::from(m.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_s3_url_parsing() {
        let config = BackendConfig::parse_url("s3://raw-events/ingest").unwrap();
        match config {
            BackendConfig::S3(s3) => {
                assert_eq!(s3.bucket, "raw-events");
                assert_eq!(s3.key, Some(Path::from("ingest")));
            }
            other => panic!("Expected S3 config, got {other:?}"),
        }
    }

    #[test]
    fn test_s3_bucket_root() {
        let config = BackendConfig::parse_url("s3://raw-events").unwrap();
        match config {
            BackendConfig::S3(s3) => {
                assert_eq!(s3.bucket, "raw-events");
                assert_eq!(s3.key, None);
            }
            other => panic!("Expected S3 config, got {other:?}"),
        }
    }

    #[test]
    fn test_s3_endpoint_url() {
        let config = BackendConfig::parse_url("s3::http://localhost:9000/raw-events").unwrap();
        match config {
            BackendConfig::S3(s3) => {
                assert_eq!(s3.bucket, "raw-events");
                // AWS_ENDPOINT may override in CI, so only assert when unset
                if std::env::var("AWS_ENDPOINT").is_err() {
                    assert_eq!(s3.endpoint.as_deref(), Some("http://localhost:9000"));
                }
            }
            other => panic!("Expected S3 config, got {other:?}"),
        }
    }

    #[test]
    fn test_s3_path_style_url() {
        let config =
            BackendConfig::parse_url("https://s3.eu-west-1.amazonaws.com/raw-events/a/b").unwrap();
        match config {
            BackendConfig::S3(s3) => {
                assert_eq!(s3.bucket, "raw-events");
                assert_eq!(s3.key, Some(Path::from("a/b")));
            }
            other => panic!("Expected S3 config, got {other:?}"),
        }
    }

    #[test]
    fn test_gcs_url_parsing() {
        let config = BackendConfig::parse_url("gs://analytics/tables/events").unwrap();
        match config {
            BackendConfig::Gcs(gcs) => {
                assert_eq!(gcs.bucket, "analytics");
                assert_eq!(gcs.key, Some(Path::from("tables/events")));
            }
            other => panic!("Expected Gcs config, got {other:?}"),
        }
    }

    #[test]
    fn test_azure_urls() {
        let config =
            BackendConfig::parse_url("abfss://raw@acct.dfs.core.windows.net/events").unwrap();
        match config {
            BackendConfig::Azure(azure) => {
                assert_eq!(azure.account.as_deref(), Some("acct"));
                assert_eq!(azure.container, "raw");
                assert_eq!(azure.key, Some(Path::from("events")));
            }
            other => panic!("Expected Azure config, got {other:?}"),
        }

        let config = BackendConfig::parse_url("az://raw").unwrap();
        match config {
            BackendConfig::Azure(azure) => {
                assert_eq!(azure.account, None);
                assert_eq!(azure.container, "raw");
            }
            other => panic!("Expected Azure config, got {other:?}"),
        }
    }

    #[test]
    fn test_memory_url() {
        let config = BackendConfig::parse_url("memory://raw-events/prefix").unwrap();
        assert_eq!(
            config,
            BackendConfig::Memory(MemoryConfig {
                name: "raw-events".to_string(),
                key: Some(Path::from("prefix")),
            })
        );
    }

    #[test]
    fn test_local_forms() {
        for url in ["/srv/blobs/raw", "file:///srv/blobs/raw", "file:/srv/blobs/raw"] {
            let config = BackendConfig::parse_url(url).unwrap();
            assert_eq!(
                config,
                BackendConfig::Local(LocalConfig {
                    path: "/srv/blobs/raw".to_string()
                }),
                "url: {url}"
            );
        }
    }

    #[test]
    fn test_invalid_url() {
        assert!(matches!(
            BackendConfig::parse_url("ftp://nowhere"),
            Err(StorageError::InvalidUrl { .. })
        ));
    }
}
