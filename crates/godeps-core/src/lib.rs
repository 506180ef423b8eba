//! # godeps-core
//!
//! A library for extracting build provenance from compiled Go binaries.
//!
//! Go toolchains embed a build-info record in every binary they produce:
//! the main module, the toolchain version, the full resolved dependency
//! graph with checksums and replace directives, and the build settings in
//! effect. This crate locates that record, decodes it, and exposes it as a
//! typed manifest.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`source`]: Random-access byte sources ([`ReadAt`] and its providers)
//! - [`remote`]: HTTP range-request byte source for remote binaries
//! - [`buildinfo`]: Low-level build-info record decoding
//! - [`parser`]: Acquisition entry points and manifest assembly
//! - [`model`]: The [`BinaryInfo`] manifest and its value types
//! - [`filters`]: Dependency queries over an assembled manifest
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```no_run
//! use godeps_core::parse_file;
//!
//! # async fn example() -> godeps_core::Result<()> {
//! let info = parse_file("/usr/local/bin/kubectl").await?;
//!
//! println!("{} {} (built with {})", info.path, info.version, info.go_version);
//! for dep in &info.dependencies {
//!     println!("  {} {}", dep.path, dep.version);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! Remote binaries can be inspected without downloading them in full:
//! [`parse_remote`] reads only the byte ranges the decoder touches, via
//! HTTP range requests.
//!
//! ## Extensibility
//!
//! Implement [`ReadAt`] to feed the parser from any random-access source
//! (archive members, object stores, test fixtures) and hand it to
//! [`parse_read_at`].

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod buildinfo;
pub mod error;
pub mod filters;
pub mod model;
pub mod parser;
pub mod remote;
pub mod source;

// Re-export primary types for convenience
pub use error::{Error, Result};
pub use filters::{exclude_stdlib, is_stdlib};
pub use model::{BinaryInfo, Dependency, Replacement, SourceKind};
pub use parser::{
    assemble, parse_bytes, parse_file, parse_read_at, parse_remote, parse_remote_with_timeout,
    parse_url, parse_url_with_timeout, DEFAULT_TIMEOUT,
};
pub use remote::HttpRangeReader;
pub use source::{read_full_at, BytesSource, FileSource, ReadAt};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
