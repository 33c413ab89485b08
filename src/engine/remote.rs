use super::traits::RemoteFetcher;
use crate::error::{BlockifyError, Result};
use futures::{stream, StreamExt, TryStreamExt};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::io::StreamReader;
use tracing::{info, warn};
use url::Url;

/// An externally hosted plain-text blocklist.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteSource {
    pub name: String,
    pub url: String,
}

/// Reads the remote sources file: a YAML mapping of arbitrary keys to
/// `{name, url}` records. Sources come back sorted by key.
///
/// A missing file means no sources. Entries with an unparseable url are
/// skipped with a warning.
pub async fn load_sources(path: impl AsRef<Path>) -> Result<Vec<RemoteSource>> {
    let path = path.as_ref();
    let contents = match tokio::fs::read_to_string(path).await {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!("No remote sources file at {}", path.display());
            return Ok(Vec::new());
        }
        Err(e) => {
            return Err(BlockifyError::RemotesFile {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
        }
    };

    if contents.trim().is_empty() {
        return Ok(Vec::new());
    }

    let map: BTreeMap<String, RemoteSource> =
        serde_yml::from_str(&contents).map_err(|e| BlockifyError::RemotesFile {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    Ok(map
        .into_values()
        .filter(|source| match Url::parse(&source.url) {
            Ok(_) => true,
            Err(e) => {
                warn!(
                    "Skipping remote list '{}' with invalid url {}: {}",
                    source.name, source.url, e
                );
                false
            }
        })
        .collect())
}

/// Fetches every source, at most `concurrency` at a time.
/// Results are returned in the same order as `sources`.
pub async fn fetch_all(
    fetcher: &dyn RemoteFetcher,
    sources: &[RemoteSource],
    concurrency: usize,
) -> Vec<Result<Vec<String>>> {
    let tasks = sources.iter().map(|source| {
        info!("Fetching remote list '{}' from {}", source.name, source.url);
        fetcher.fetch_lines(&source.url)
    });

    stream::iter(tasks)
        .buffered(concurrency.max(1))
        .collect()
        .await
}

fn fetch_error(url: &str, e: impl std::fmt::Display) -> BlockifyError {
    BlockifyError::Fetch {
        url: url.to_string(),
        message: e.to_string(),
    }
}

/// Strips the line terminator and decodes lossily, so a stray non-UTF-8
/// byte costs one character rather than the whole list.
fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\n").unwrap_or(raw);
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("blockify/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .map_err(|e| fetch_error("", e))?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl RemoteFetcher for HttpFetcher {
    async fn fetch_lines(&self, url: &str) -> Result<Vec<String>> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_error(url, e))?;

        if resp.status() != StatusCode::OK {
            return Err(BlockifyError::HttpStatus {
                url: url.to_string(),
                status: resp.status().as_u16(),
            });
        }

        let stream = resp.bytes_stream().map_err(std::io::Error::other);
        let mut reader = BufReader::new(StreamReader::new(stream));
        let mut out = Vec::new();
        let mut buf = Vec::new();

        loop {
            buf.clear();
            let read = reader
                .read_until(b'\n', &mut buf)
                .await
                .map_err(|e| fetch_error(url, e))?;
            if read == 0 {
                break;
            }
            out.push(decode_line(&buf));
        }

        Ok(out)
    }
}
