//! Acquisition entry points and manifest assembly.
//!
//! All entry points funnel into the same pipeline: construct a
//! [`ReadAt`] byte source, hand it to the build-info decoder, then
//! [`assemble`] the raw record into a [`BinaryInfo`]. Each one returns
//! either a fully populated manifest or an error, never a partial result.
//!
//! The URL-based variants carry an overall deadline covering acquisition
//! *and* decode; it defaults to [`DEFAULT_TIMEOUT`] when the caller does
//! not supply one.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use bytes::Bytes;
use reqwest::Client;
use tracing::debug;

use crate::buildinfo::{self, RawBuildInfo};
use crate::error::{Error, Result};
use crate::model::{BinaryInfo, Dependency, Replacement, SourceKind};
use crate::remote::HttpRangeReader;
use crate::source::{BytesSource, FileSource, ReadAt};

/// Overall time budget for URL-based parsing when the caller supplies none
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Parses the Go binary at a local path.
///
/// The path is validated before any decode work: a missing or unreadable
/// file surfaces as [`Error::SourceUnavailable`] immediately.
///
/// ```no_run
/// # async fn example() -> godeps_core::Result<()> {
/// let info = godeps_core::parse_file("/usr/local/bin/kubectl").await?;
/// println!("{}@{} built with {}", info.path, info.version, info.go_version);
/// # Ok(())
/// # }
/// ```
pub async fn parse_file(path: impl AsRef<Path>) -> Result<BinaryInfo> {
    let path = path.as_ref();
    let metadata = std::fs::metadata(path).map_err(|e| Error::source_unavailable(path, e))?;
    if !metadata.is_file() {
        return Err(Error::source_unavailable(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a regular file"),
        ));
    }

    let source = FileSource::open(path)?;
    let raw = buildinfo::read_build_info(&source).await?;

    let label = path
        .canonicalize()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| path.display().to_string());
    Ok(assemble(raw, label, SourceKind::File))
}

/// Parses a Go binary that is already resident in memory.
pub async fn parse_bytes(data: impl Into<Bytes>) -> Result<BinaryInfo> {
    let source = BytesSource::new(data);
    let raw = buildinfo::read_build_info(&source).await?;
    Ok(assemble(raw, "", SourceKind::Bytes))
}

/// Parses a Go binary through a caller-supplied random-access source.
///
/// `label` identifies the source in the resulting manifest (an archive
/// member name, an object key, anything meaningful to the caller).
pub async fn parse_read_at(source: &dyn ReadAt, label: impl Into<String>) -> Result<BinaryInfo> {
    let raw = buildinfo::read_build_info(source).await?;
    Ok(assemble(raw, label, SourceKind::Stream))
}

/// Downloads a Go binary in full and parses it, with the default timeout.
pub async fn parse_url(url: &str) -> Result<BinaryInfo> {
    parse_url_with_timeout(url, DEFAULT_TIMEOUT).await
}

/// Downloads a Go binary in full and parses it within `timeout`.
///
/// The budget covers the whole operation: download plus decode.
pub async fn parse_url_with_timeout(url: &str, timeout: Duration) -> Result<BinaryInfo> {
    tokio::time::timeout(timeout, download_and_parse(url))
        .await
        .map_err(|_| Error::DeadlineExceeded)?
}

async fn download_and_parse(url: &str) -> Result<BinaryInfo> {
    debug!(url, "downloading binary");
    let response = Client::new()
        .get(url)
        .send()
        .await
        .map_err(Error::from_reqwest)?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::http(
            status.as_u16(),
            status.canonical_reason().unwrap_or("unknown status"),
        ));
    }

    let body = response.bytes().await.map_err(Error::from_reqwest)?;
    debug!(url, len = body.len(), "downloaded binary");

    let source = BytesSource::new(body);
    let raw = buildinfo::read_build_info(&source).await?;
    Ok(assemble(raw, url, SourceKind::Url))
}

/// Parses a remote Go binary via range requests, with the default timeout.
///
/// Unlike [`parse_url`] this never downloads the whole file: only the byte
/// ranges the decoder actually touches are transferred, which matters for
/// large release binaries.
pub async fn parse_remote(url: &str) -> Result<BinaryInfo> {
    parse_remote_with_timeout(url, DEFAULT_TIMEOUT).await
}

/// Parses a remote Go binary via range requests within `timeout`.
pub async fn parse_remote_with_timeout(url: &str, timeout: Duration) -> Result<BinaryInfo> {
    let reader = HttpRangeReader::new(url).with_timeout(timeout);
    let decode = async {
        let raw = buildinfo::read_build_info(&reader).await?;
        Ok(assemble(raw, url, SourceKind::Url))
    };
    tokio::time::timeout(timeout, decode)
        .await
        .map_err(|_| Error::DeadlineExceeded)?
}

/// Assembles a decoded raw record into the public manifest.
///
/// Pure and total: duplicate build-setting keys overwrite (last wins),
/// dependency order is preserved, and a raw replacement becomes the single
/// non-nested [`Replacement`] of its dependency. `source` and `kind` come
/// from the acquisition path, never from the decoded content.
pub fn assemble(raw: RawBuildInfo, source: impl Into<String>, kind: SourceKind) -> BinaryInfo {
    let mut build_settings = BTreeMap::new();
    for (key, value) in raw.settings {
        build_settings.insert(key, value);
    }

    let dependencies = raw
        .deps
        .into_iter()
        .map(|dep| Dependency {
            path: dep.module.path,
            version: dep.module.version,
            sum: dep.module.sum,
            replace: dep.replace.map(|r| Replacement {
                path: r.path,
                version: r.version,
                sum: r.sum,
            }),
        })
        .collect();

    let version = raw.main.map(|m| m.version).unwrap_or_default();

    BinaryInfo {
        path: raw.path,
        version,
        go_version: raw.go_version,
        build_settings,
        dependencies,
        source: source.into(),
        source_kind: kind,
    }
}
