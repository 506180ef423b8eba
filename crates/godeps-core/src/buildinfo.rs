//! Decoding of the embedded Go build-info record.
//!
//! Every Go binary built from module-aware code carries a toolchain-written
//! record describing the main module, the toolchain version, the resolved
//! dependency list and the build settings. This module locates that record
//! through the [`ReadAt`](crate::source::ReadAt) capability and decodes it
//! into a [`RawBuildInfo`], leaving assembly into the public model to
//! [`crate::parser`].
//!
//! ## Record layout
//!
//! 1. A 14-byte magic (`\xff Go buildinf:`) at a 16-byte-aligned offset.
//! 2. A 32-byte header whose byte 15 carries flags; bit `0x2` means the two
//!    payload strings follow inline (go1.18+). Older toolchains stored
//!    pointers into the data segment instead, which this decoder rejects.
//! 3. Two uvarint-length-prefixed strings: the toolchain version, then the
//!    module-info text wrapped in 16-byte start/end sentinels.
//! 4. The module-info text is line-oriented with tab-separated fields:
//!    `path`, `mod`, `dep`, `=>` (a replacement for the preceding `dep`)
//!    and `build KEY=value` lines with Go-style quoting.

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::source::{read_full_at, ReadAt};

/// Magic marking the start of the build-info header
const MAGIC: &[u8] = b"\xff Go buildinf:";

/// The magic is written at offsets aligned to this boundary
const MAGIC_ALIGN: usize = 16;

/// Total size of the build-info header, magic included
const HEADER_SIZE: usize = 32;

/// Header flag: version and module info are stored inline (go1.18+)
const FLAG_INLINE_STRINGS: u8 = 0x2;

/// Scan granularity. A multiple of the magic alignment, so an aligned magic
/// can never straddle a chunk boundary.
const SCAN_CHUNK: usize = 64 * 1024;

/// Upper bound on an inline string length, to reject corrupt varints before
/// allocating
const MAX_STRING_LEN: u64 = 16 << 20;

/// Longest valid encoding of a 64-bit uvarint
const MAX_UVARINT_LEN: usize = 10;

/// One module as recorded in the module-info text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawModule {
    /// Module import path
    pub path: String,
    /// Module version
    pub version: String,
    /// Module checksum, empty field omitted
    pub sum: Option<String>,
}

/// One `dep` line, optionally followed by a `=>` replacement line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDependency {
    /// The dependency as resolved by the module graph
    pub module: RawModule,
    /// The module substituted by a replace directive, if any
    pub replace: Option<RawModule>,
}

/// The decoded build-info record, before assembly into [`crate::BinaryInfo`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBuildInfo {
    /// Toolchain version string, e.g. `go1.21.0`
    pub go_version: String,
    /// Main package path from the `path` line
    pub path: String,
    /// Main module from the `mod` line
    pub main: Option<RawModule>,
    /// Build settings in record order, duplicates preserved
    pub settings: Vec<(String, String)>,
    /// Dependencies in record order
    pub deps: Vec<RawDependency>,
}

/// Locates and decodes the build-info record of `source`.
///
/// Reads only the chunks needed to find the magic plus the record itself,
/// which keeps remote sources cheap. Returns a decode error when no
/// recognizable record exists or when it predates inline build info.
pub async fn read_build_info(source: &dyn ReadAt) -> Result<RawBuildInfo> {
    let magic_offset = find_magic(source).await?;
    debug!(offset = magic_offset, "found build info magic");

    let mut header = [0u8; HEADER_SIZE];
    read_full_at(source, &mut header, magic_offset).await?;

    let flags = header[15];
    if flags & FLAG_INLINE_STRINGS == 0 {
        return Err(Error::decode(
            "binary predates inline build info (go1.18); its record cannot be read",
        ));
    }

    let strings_start = magic_offset + HEADER_SIZE as u64;
    let (version_bytes, mod_start) = read_inline_string(source, strings_start).await?;
    let (mod_bytes, _) = read_inline_string(source, mod_start).await?;

    let go_version = String::from_utf8(version_bytes)
        .map_err(|_| Error::decode("toolchain version is not valid UTF-8"))?;
    if go_version.is_empty() {
        return Err(Error::decode("empty toolchain version string"));
    }

    let mod_text = strip_sentinels(&mod_bytes);
    let mod_text = std::str::from_utf8(mod_text)
        .map_err(|_| Error::decode("module info is not valid UTF-8"))?;
    trace!(len = mod_text.len(), "decoded module info text");

    let mut info = parse_mod_info(mod_text)?;
    info.go_version = go_version;
    Ok(info)
}

/// Scans the source in aligned chunks for the build-info magic.
async fn find_magic(source: &dyn ReadAt) -> Result<u64> {
    let mut buf = vec![0u8; SCAN_CHUNK];
    let mut offset = 0u64;

    loop {
        let n = source.read_at(&mut buf, offset).await?;
        if n == 0 {
            return Err(Error::decode("no Go build info found"));
        }

        let chunk = &buf[..n];
        let mut pos = 0;
        while pos + MAGIC.len() <= chunk.len() {
            if &chunk[pos..pos + MAGIC.len()] == MAGIC {
                return Ok(offset + pos as u64);
            }
            pos += MAGIC_ALIGN;
        }

        if n < SCAN_CHUNK {
            return Err(Error::decode("no Go build info found"));
        }
        offset += SCAN_CHUNK as u64;
    }
}

/// Reads one uvarint-length-prefixed string starting at `offset`.
///
/// Returns the string bytes and the offset of the byte following them.
async fn read_inline_string(source: &dyn ReadAt, offset: u64) -> Result<(Vec<u8>, u64)> {
    let mut prefix = [0u8; MAX_UVARINT_LEN];
    let n = source.read_at(&mut prefix, offset).await?;
    if n == 0 {
        return Err(Error::unexpected_eof(offset));
    }

    let (len, consumed) = decode_uvarint(&prefix[..n])?;
    if len > MAX_STRING_LEN {
        return Err(Error::decode(format!(
            "build info string of {len} bytes exceeds the size cap"
        )));
    }

    let start = offset + consumed as u64;
    let mut data = vec![0u8; len as usize];
    read_full_at(source, &mut data, start).await?;
    Ok((data, start + len))
}

/// Decode an unsigned LEB128 varint.
///
/// Returns the decoded value and the number of bytes consumed.
pub(crate) fn decode_uvarint(data: &[u8]) -> Result<(u64, usize)> {
    let mut result: u64 = 0;
    let mut shift = 0;

    for (i, &byte) in data.iter().enumerate() {
        if i >= MAX_UVARINT_LEN {
            return Err(Error::decode("varint exceeds 10 bytes"));
        }

        result |= ((byte & 0x7F) as u64) << shift;
        shift += 7;

        if byte & 0x80 == 0 {
            return Ok((result, i + 1));
        }
    }

    Err(Error::decode("truncated varint"))
}

/// Strips the 16-byte sentinels around the module-info text.
///
/// Mirrors the toolchain's own check: the text must be long enough to hold
/// both sentinels and end with a newline right before the trailing one.
/// Anything else means the binary carries no module info (e.g. built
/// outside module mode) and yields an empty text.
fn strip_sentinels(data: &[u8]) -> &[u8] {
    if data.len() >= 33 && data[data.len() - 17] == b'\n' {
        &data[16..data.len() - 16]
    } else {
        &[]
    }
}

/// Parses the line-oriented module-info text.
fn parse_mod_info(text: &str) -> Result<RawBuildInfo> {
    let mut info = RawBuildInfo {
        go_version: String::new(),
        path: String::new(),
        main: None,
        settings: Vec::new(),
        deps: Vec::new(),
    };

    for line in text.lines() {
        let mut fields = line.split('\t');
        match fields.next() {
            Some("path") => {
                info.path = fields.next().unwrap_or_default().to_string();
            }
            Some("mod") => {
                info.main = Some(parse_module(fields));
            }
            Some("dep") => {
                info.deps.push(RawDependency {
                    module: parse_module(fields),
                    replace: None,
                });
            }
            Some("=>") => {
                let Some(last) = info.deps.last_mut() else {
                    return Err(Error::decode("replacement line without a preceding dep"));
                };
                last.replace = Some(parse_module(fields));
            }
            Some("build") => {
                let rest = line.strip_prefix("build\t").unwrap_or_default();
                match parse_build_line(rest) {
                    Some((key, value)) => info.settings.push((key, value)),
                    None => trace!(line, "skipping malformed build line"),
                }
            }
            // Future toolchains may add verbs; unknown lines are skipped.
            _ => {}
        }
    }

    Ok(info)
}

/// Parses the tab-separated `path version [sum]` tail of a module line.
fn parse_module<'a>(mut fields: impl Iterator<Item = &'a str>) -> RawModule {
    let path = fields.next().unwrap_or_default().to_string();
    let version = fields.next().unwrap_or_default().to_string();
    let sum = fields
        .next()
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    RawModule { path, version, sum }
}

/// Parses a `KEY=value` build setting, where key and value are each quoted
/// Go-style when they contain metacharacters.
fn parse_build_line(rest: &str) -> Option<(String, String)> {
    let (key, remainder) = if rest.starts_with('"') {
        let (key, after) = unquote_prefix(rest)?;
        (key, after.strip_prefix('=')?)
    } else {
        let (key, after) = rest.split_once('=')?;
        (key.to_string(), after)
    };

    let value = if remainder.starts_with('"') {
        let (value, after) = unquote_prefix(remainder)?;
        if !after.is_empty() {
            return None;
        }
        value
    } else {
        remainder.to_string()
    };

    Some((key, value))
}

/// Decodes a leading Go double-quoted string literal.
///
/// Returns the decoded content and the remainder of the input after the
/// closing quote. Covers the escapes `strconv.Quote` emits.
fn unquote_prefix(input: &str) -> Option<(String, &str)> {
    let mut chars = input.strip_prefix('"')?.char_indices();
    let inner = &input[1..];
    let mut out = String::new();

    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Some((out, &inner[i + 1..])),
            '\\' => {
                let (_, escape) = chars.next()?;
                match escape {
                    '"' => out.push('"'),
                    '\'' => out.push('\''),
                    '\\' => out.push('\\'),
                    'n' => out.push('\n'),
                    't' => out.push('\t'),
                    'r' => out.push('\r'),
                    'a' => out.push('\u{07}'),
                    'b' => out.push('\u{08}'),
                    'f' => out.push('\u{0C}'),
                    'v' => out.push('\u{0B}'),
                    'x' => {
                        let hi = chars.next()?.1.to_digit(16)?;
                        let lo = chars.next()?.1.to_digit(16)?;
                        out.push(char::from_u32(hi * 16 + lo)?);
                    }
                    'u' => {
                        let mut code = 0u32;
                        for _ in 0..4 {
                            code = code * 16 + chars.next()?.1.to_digit(16)?;
                        }
                        out.push(char::from_u32(code)?);
                    }
                    _ => return None,
                }
            }
            _ => out.push(c),
        }
    }

    // No closing quote
    None
}

#[cfg(test)]
pub(crate) mod testutil {
    //! Builders for synthetic build-info blobs used across the test suite.

    use super::{FLAG_INLINE_STRINGS, HEADER_SIZE, MAGIC};

    /// Sentinel written by the toolchain before the module-info text
    const INFO_START: [u8; 16] = [
        0x30, 0x77, 0xaf, 0x0c, 0x92, 0x74, 0x08, 0x02, 0x41, 0xe1, 0xc1, 0x07, 0xe6, 0xd6, 0x18,
        0xe6,
    ];

    /// Sentinel written by the toolchain after the module-info text
    const INFO_END: [u8; 16] = [
        0xf9, 0x32, 0x43, 0x31, 0x86, 0x18, 0x20, 0x72, 0x00, 0x82, 0x42, 0x10, 0x41, 0x16, 0xd8,
        0xf2,
    ];

    pub(crate) fn encode_uvarint(mut value: u64) -> Vec<u8> {
        let mut out = Vec::new();
        while value >= 0x80 {
            out.push((value as u8 & 0x7F) | 0x80);
            value >>= 7;
        }
        out.push(value as u8);
        out
    }

    /// Builds an inline-layout build-info blob with the magic at offset
    /// `lead_padding` (must be 16-byte aligned).
    pub(crate) fn build_info_blob_at(
        lead_padding: usize,
        go_version: &str,
        mod_info: &str,
    ) -> Vec<u8> {
        assert_eq!(lead_padding % 16, 0, "magic must stay 16-byte aligned");

        let mut data = vec![0u8; lead_padding];
        data.extend_from_slice(MAGIC);
        data.push(8); // pointer size, unused by the inline layout
        data.push(FLAG_INLINE_STRINGS);
        data.resize(lead_padding + HEADER_SIZE, 0);

        let version = go_version.as_bytes();
        data.extend_from_slice(&encode_uvarint(version.len() as u64));
        data.extend_from_slice(version);

        let mut payload = Vec::new();
        if !mod_info.is_empty() {
            payload.extend_from_slice(&INFO_START);
            payload.extend_from_slice(mod_info.as_bytes());
            payload.extend_from_slice(&INFO_END);
        }
        data.extend_from_slice(&encode_uvarint(payload.len() as u64));
        data.extend_from_slice(&payload);
        data
    }

    /// Blob with a representative module graph: a main module, three
    /// dependencies (one replaced), and a few build settings.
    pub(crate) fn sample_blob() -> Vec<u8> {
        build_info_blob_at(32, "go1.21.0", sample_mod_info())
    }

    pub(crate) fn sample_mod_info() -> &'static str {
        concat!(
            "path\tgithub.com/example/app\n",
            "mod\tgithub.com/example/app\tv1.2.3\t\n",
            "dep\tgithub.com/spf13/cobra\tv1.6.1\th1:cobrasum\n",
            "dep\tgithub.com/fork/dep2\tv2.0.0\th1:dep2sum\n",
            "=>\tgithub.com/fork/dep2-fork\tv2.0.1\th1:forksum\n",
            "dep\tgolang.org/x/net\tv0.1.0\th1:netsum\n",
            "build\tGOOS=linux\n",
            "build\tGOARCH=amd64\n",
            "build\t-ldflags=\"-s -w\"\n",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::BytesSource;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decode_uvarint_single_byte() {
        let (value, len) = decode_uvarint(&[0x08]).unwrap();
        assert_eq!(value, 8);
        assert_eq!(len, 1);
    }

    #[test]
    fn test_decode_uvarint_multi_byte() {
        let (value, len) = decode_uvarint(&[0xAC, 0x02]).unwrap();
        assert_eq!(value, 300);
        assert_eq!(len, 2);
    }

    #[test]
    fn test_decode_uvarint_truncated() {
        assert!(decode_uvarint(&[0x80, 0x80]).is_err());
        assert!(decode_uvarint(&[]).is_err());
    }

    #[test]
    fn test_encode_decode_uvarint_round_trip() {
        for value in [0u64, 1, 127, 128, 300, 16 << 20, u64::MAX] {
            let encoded = testutil::encode_uvarint(value);
            let (decoded, len) = decode_uvarint(&encoded).unwrap();
            assert_eq!(decoded, value);
            assert_eq!(len, encoded.len());
        }
    }

    #[tokio::test]
    async fn test_decode_sample_blob() {
        let source = BytesSource::new(testutil::sample_blob());
        let info = read_build_info(&source).await.unwrap();

        assert_eq!(info.go_version, "go1.21.0");
        assert_eq!(info.path, "github.com/example/app");

        let main = info.main.unwrap();
        assert_eq!(main.path, "github.com/example/app");
        assert_eq!(main.version, "v1.2.3");
        assert_eq!(main.sum, None);

        assert_eq!(info.deps.len(), 3);
        assert_eq!(info.deps[0].module.path, "github.com/spf13/cobra");
        assert_eq!(info.deps[0].module.sum.as_deref(), Some("h1:cobrasum"));
        assert_eq!(info.deps[0].replace, None);

        let replace = info.deps[1].replace.as_ref().unwrap();
        assert_eq!(replace.path, "github.com/fork/dep2-fork");
        assert_eq!(replace.version, "v2.0.1");

        assert_eq!(
            info.settings,
            vec![
                ("GOOS".to_string(), "linux".to_string()),
                ("GOARCH".to_string(), "amd64".to_string()),
                ("-ldflags".to_string(), "-s -w".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_magic_found_beyond_first_chunk() {
        // Magic at 64 KiB, exercising the chunked scan
        let blob = testutil::build_info_blob_at(64 * 1024, "go1.20.5", testutil::sample_mod_info());
        let source = BytesSource::new(blob);

        let info = read_build_info(&source).await.unwrap();
        assert_eq!(info.go_version, "go1.20.5");
        assert_eq!(info.deps.len(), 3);
    }

    #[tokio::test]
    async fn test_no_magic_is_decode_error() {
        let source = BytesSource::new(b"this is not a Go binary".to_vec());
        let err = read_build_info(&source).await.unwrap_err();
        assert!(err.is_decode());
        assert!(err.to_string().contains("no Go build info"));
    }

    #[tokio::test]
    async fn test_pointer_layout_rejected() {
        let mut blob = vec![0u8; 16];
        blob.extend_from_slice(MAGIC);
        blob.push(8);
        blob.push(0); // flags without the inline bit
        blob.resize(16 + HEADER_SIZE + 16, 0);

        let source = BytesSource::new(blob);
        let err = read_build_info(&source).await.unwrap_err();
        assert!(err.is_decode());
        assert!(err.to_string().contains("go1.18"));
    }

    #[tokio::test]
    async fn test_missing_mod_info_yields_version_only() {
        let blob = testutil::build_info_blob_at(0, "go1.19.1", "");
        let source = BytesSource::new(blob);

        let info = read_build_info(&source).await.unwrap();
        assert_eq!(info.go_version, "go1.19.1");
        assert_eq!(info.path, "");
        assert_eq!(info.main, None);
        assert!(info.deps.is_empty());
    }

    #[test]
    fn test_strip_sentinels_requires_trailing_newline() {
        // Too short
        assert!(strip_sentinels(b"short").is_empty());

        // Right length but no newline before the end sentinel
        let bad = vec![b'x'; 64];
        assert!(strip_sentinels(&bad).is_empty());
    }

    #[test]
    fn test_parse_build_line_plain() {
        let (key, value) = parse_build_line("GOOS=linux").unwrap();
        assert_eq!(key, "GOOS");
        assert_eq!(value, "linux");
    }

    #[test]
    fn test_parse_build_line_quoted_value() {
        let (key, value) = parse_build_line("-ldflags=\"-X main.version=1.0 -s\"").unwrap();
        assert_eq!(key, "-ldflags");
        assert_eq!(value, "-X main.version=1.0 -s");
    }

    #[test]
    fn test_parse_build_line_quoted_key_and_escapes() {
        let (key, value) = parse_build_line("\"odd key\"=\"tab\\there\"").unwrap();
        assert_eq!(key, "odd key");
        assert_eq!(value, "tab\there");
    }

    #[test]
    fn test_parse_build_line_malformed() {
        assert!(parse_build_line("no-equals-sign").is_none());
        assert!(parse_build_line("\"unterminated=x").is_none());
    }

    #[test]
    fn test_replacement_without_dep_is_error() {
        let text = "path\texample.com/app\n=>\texample.com/fork\tv1.0.0\t\n";
        let err = parse_mod_info(text).unwrap_err();
        assert!(err.is_decode());
    }
}
