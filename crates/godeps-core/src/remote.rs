//! Random-access reads over HTTP using range requests.
//!
//! [`HttpRangeReader`] presents a remote resource as a [`ReadAt`] byte
//! source without ever downloading it in full: each positional read becomes
//! one `GET` with a `Range: bytes=start-end` header. A decoder that only
//! probes the head and one metadata region of a multi-hundred-megabyte
//! binary then transfers only those ranges.
//!
//! Servers that ignore range requests answer `200 OK` with the full body;
//! the reader degrades gracefully by slicing the body itself. Anything that
//! is neither `206`, `200` nor `416` is a hard transport error.
//!
//! The reader never retries: a `read_at` call issues at most one request,
//! so a caller-level retry policy can reason about offsets safely.

use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::source::ReadAt;

/// Random-access byte source over a remote HTTP resource.
///
/// The reader holds no state across calls beyond its URL, client and
/// deadline, so a decoder may invoke it repeatedly and independently at
/// arbitrary offsets.
///
/// ```no_run
/// use godeps_core::{HttpRangeReader, ReadAt};
/// use std::time::Duration;
///
/// # async fn example() -> godeps_core::Result<()> {
/// let reader = HttpRangeReader::new("https://example.com/bin/kubectl")
///     .with_timeout(Duration::from_secs(10));
/// let mut header = [0u8; 64];
/// let n = reader.read_at(&mut header, 0).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpRangeReader {
    client: Client,
    url: String,
    deadline: Option<Instant>,
}

impl HttpRangeReader {
    /// Creates a reader for the given URL with no deadline.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
            deadline: None,
        }
    }

    /// Returns a reader whose reads all fail once `deadline` has passed.
    ///
    /// The deadline scopes the whole sequence of reads belonging to one
    /// operation, not each individual request.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Convenience for [`Self::with_deadline`] measured from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        let deadline = Instant::now() + timeout;
        self.with_deadline(deadline)
    }

    /// Replaces the HTTP client, e.g. to configure proxies or TLS settings.
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// The URL this reader fetches from
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Remaining time budget, or an error if the deadline already fired.
    fn remaining(&self) -> Result<Option<Duration>> {
        match self.deadline {
            None => Ok(None),
            Some(deadline) => {
                let now = Instant::now();
                if now >= deadline {
                    Err(Error::DeadlineExceeded)
                } else {
                    Ok(Some(deadline - now))
                }
            }
        }
    }

    /// Runs a transport future under the remaining deadline budget.
    async fn bounded<T>(&self, fut: impl Future<Output = reqwest::Result<T>>) -> Result<T> {
        let result = match self.remaining()? {
            Some(budget) => tokio::time::timeout(budget, fut)
                .await
                .map_err(|_| Error::DeadlineExceeded)?,
            None => fut.await,
        };
        result.map_err(Error::from_reqwest)
    }
}

#[async_trait]
impl ReadAt for HttpRangeReader {
    async fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        // A zero-length read needs no bytes, so it must not cost a request.
        if buf.is_empty() {
            return Ok(0);
        }

        let end = offset + buf.len() as u64 - 1;
        trace!(url = %self.url, offset, len = buf.len(), "range request");

        let request = self
            .client
            .get(&self.url)
            .header(header::RANGE, format!("bytes={offset}-{end}"));

        let response = self.bounded(request.send()).await?;
        let status = response.status();

        match status {
            StatusCode::PARTIAL_CONTENT | StatusCode::OK => {}
            // The whole requested range lies past the end of the resource.
            StatusCode::RANGE_NOT_SATISFIABLE => {
                debug!(url = %self.url, offset, "range not satisfiable, treating as end of data");
                return Ok(0);
            }
            _ => {
                return Err(Error::http(
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("unknown status"),
                ))
            }
        }

        let body = self.bounded(response.bytes()).await?;

        // A 200 means the server ignored the Range header and sent the full
        // resource; slice out the window we asked for.
        let window: &[u8] = if status == StatusCode::OK {
            if body.len() as u64 <= offset {
                return Ok(0);
            }
            &body[offset as usize..]
        } else {
            &body[..]
        };

        let n = window.len().min(buf.len());
        buf[..n].copy_from_slice(&window[..n]);
        Ok(n)
    }
}
