//! Random-access byte sources.
//!
//! The build-info decoder never sees files or sockets directly; it reads
//! through the [`ReadAt`] capability. Three providers live here (local file,
//! in-memory buffer, and anything the caller implements themselves), and
//! [`crate::remote::HttpRangeReader`] adds the fourth over HTTP.
//!
//! ## Read semantics
//!
//! `read_at` follows classic positional-read rules: it fills up to
//! `buf.len()` bytes starting at the absolute `offset`, returns fewer bytes
//! only when the data ends, and returns `Ok(0)` once no bytes exist at or
//! beyond `offset`. End-of-data is therefore an ordinary return value,
//! never an error.

use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{Error, Result};

/// Capability for reading bytes at arbitrary absolute offsets.
///
/// Implement this to feed the parser from a custom source (an archive
/// member, an object store, a test fixture):
///
/// ```no_run
/// use async_trait::async_trait;
/// use godeps_core::{ReadAt, Result};
///
/// struct ZeroSource;
///
/// #[async_trait]
/// impl ReadAt for ZeroSource {
///     async fn read_at(&self, buf: &mut [u8], _offset: u64) -> Result<usize> {
///         buf.fill(0);
///         Ok(buf.len())
///     }
/// }
/// ```
#[async_trait]
pub trait ReadAt: Send + Sync {
    /// Reads up to `buf.len()` bytes starting at `offset`.
    ///
    /// Returns the number of bytes read; a short count or `Ok(0)` signals
    /// end of data.
    async fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize>;
}

/// Fills `buf` completely from `offset`, treating a short read as an error.
///
/// This is the decoder-facing helper: when the decoder has committed to a
/// record layout, missing bytes mean the record is truncated.
pub async fn read_full_at(source: &dyn ReadAt, buf: &mut [u8], offset: u64) -> Result<()> {
    let n = source.read_at(buf, offset).await?;
    if n < buf.len() {
        return Err(Error::unexpected_eof(offset + n as u64));
    }
    Ok(())
}

/// Byte source backed by a local file.
///
/// The file is opened (and its length read) at construction, so missing or
/// unreadable paths fail before any decode work starts.
#[derive(Debug)]
pub struct FileSource {
    file: Mutex<File>,
    len: u64,
}

impl FileSource {
    /// Opens the file at `path` for random-access reading.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::source_unavailable(path, e))?;
        let len = file
            .metadata()
            .map_err(|e| Error::source_unavailable(path, e))?
            .len();
        Ok(Self {
            file: Mutex::new(file),
            len,
        })
    }

    /// Length of the underlying file in bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns true if the underlying file is empty
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[async_trait]
impl ReadAt for FileSource {
    async fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        if buf.is_empty() || offset >= self.len {
            return Ok(0);
        }

        // Seek + read under a lock instead of the platform positional-read
        // APIs, which differ between unix and windows.
        let mut file = self.file.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        file.seek(SeekFrom::Start(offset))?;

        let mut read = 0;
        while read < buf.len() {
            match file.read(&mut buf[read..]) {
                Ok(0) => break,
                Ok(n) => read += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Io(e)),
            }
        }
        Ok(read)
    }
}

/// Byte source over an already-resident buffer.
///
/// Never fails; reads past the end simply return `Ok(0)`.
#[derive(Debug, Clone)]
pub struct BytesSource {
    data: Bytes,
}

impl BytesSource {
    /// Wraps a byte buffer. Accepts `Vec<u8>`, `Bytes`, or static slices.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// Length of the buffer in bytes
    pub fn len(&self) -> u64 {
        self.data.len() as u64
    }

    /// Returns true if the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[async_trait]
impl ReadAt for BytesSource {
    async fn read_at(&self, buf: &mut [u8], offset: u64) -> Result<usize> {
        if offset >= self.data.len() as u64 {
            return Ok(0);
        }
        let start = offset as usize;
        let n = buf.len().min(self.data.len() - start);
        buf[..n].copy_from_slice(&self.data[start..start + n]);
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[tokio::test]
    async fn test_bytes_source_reads_in_bounds() {
        let source = BytesSource::new(b"0123456789".to_vec());
        let mut buf = [0u8; 3];

        let n = source.read_at(&mut buf, 2).await.unwrap();
        assert_eq!(n, 3);
        assert_eq!(&buf, b"234");
    }

    #[tokio::test]
    async fn test_bytes_source_short_read_at_end() {
        let source = BytesSource::new(b"0123456789".to_vec());
        let mut buf = [0u8; 8];

        let n = source.read_at(&mut buf, 7).await.unwrap();
        assert_eq!(n, 3);
        assert_eq!(&buf[..n], b"789");
    }

    #[tokio::test]
    async fn test_bytes_source_past_end_is_end_of_data() {
        let source = BytesSource::new(b"0123456789".to_vec());
        let mut buf = [0u8; 4];

        assert_eq!(source.read_at(&mut buf, 10).await.unwrap(), 0);
        assert_eq!(source.read_at(&mut buf, 1000).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_file_source_round_trip() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"hello positional world").unwrap();

        let source = FileSource::open(tmp.path()).unwrap();
        assert_eq!(source.len(), 22);

        let mut buf = [0u8; 10];
        let n = source.read_at(&mut buf, 6).await.unwrap();
        assert_eq!(n, 10);
        assert_eq!(&buf, b"positional");

        // Past end of file
        assert_eq!(source.read_at(&mut buf, 22).await.unwrap(), 0);
    }

    #[test]
    fn test_file_source_missing_path_fails_at_construction() {
        let err = FileSource::open("/no/such/binary").unwrap_err();
        assert!(matches!(err, Error::SourceUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_read_full_at_errors_on_truncation() {
        let source = BytesSource::new(b"short".to_vec());
        let mut buf = [0u8; 16];

        let err = read_full_at(&source, &mut buf, 0).await.unwrap_err();
        match err {
            Error::UnexpectedEof { offset } => assert_eq!(offset, 5),
            other => panic!("expected UnexpectedEof, got {other:?}"),
        }
    }
}
