//! Data model for analyzed Go binaries.
//!
//! Everything in this module is a passive value type: a [`BinaryInfo`] is
//! assembled once from a single decode pass and never mutated afterwards, so
//! it can be shared freely across threads and serialized as-is. The JSON
//! shape mirrors the fields one-to-one; there are no rendering concerns here.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A version/path override substituted for a dependency at build time.
///
/// Replacements are at most one level deep: a replacement never carries a
/// further replacement, which this type enforces structurally by not having
/// a `replace` field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replacement {
    /// Import path of the replacing module
    pub path: String,
    /// Version of the replacing module
    pub version: String,
    /// Module checksum, when recorded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sum: Option<String>,
}

/// One resolved module dependency of an analyzed binary.
///
/// Example JSON shape:
///
/// ```json
/// {
///   "path": "github.com/spf13/cobra",
///   "version": "v1.6.1",
///   "sum": "h1:xJqmnvzCeeF2MXGd8Byi93jN5wLSQOkImGTD2MMpcL0=",
///   "replace": {
///     "path": "github.com/spf13/cobra",
///     "version": "v1.6.2-0.20221107171228-a7f686d8f418"
///   }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// Import path, e.g. `github.com/spf13/cobra`
    pub path: String,
    /// Resolved version, semantic or pseudo-version
    pub version: String,
    /// Module checksum, when recorded
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sum: Option<String>,
    /// The module that replaced this one, if a replace directive applied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replace: Option<Replacement>,
}

impl Dependency {
    /// Returns true if this dependency was substituted by a replace directive
    pub fn is_replaced(&self) -> bool {
        self.replace.is_some()
    }
}

/// Where the analyzed bytes came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// A local file opened by path
    File,
    /// An in-memory byte buffer
    Bytes,
    /// A caller-supplied random-access reader
    Stream,
    /// A remote HTTP resource
    Url,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SourceKind::File => "file",
            SourceKind::Bytes => "bytes",
            SourceKind::Stream => "stream",
            SourceKind::Url => "url",
        };
        f.write_str(label)
    }
}

/// The fully resolved build provenance of one analyzed Go binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BinaryInfo {
    /// Main module path, e.g. `github.com/example/myapp`
    pub path: String,
    /// Main module version, often `(devel)` for locally built binaries
    pub version: String,
    /// Go toolchain version used for the build, e.g. `go1.21.0`
    pub go_version: String,
    /// Build settings recorded by the toolchain (GOOS, GOARCH, flags, vcs info)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub build_settings: BTreeMap<String, String>,
    /// Module dependencies in the order the toolchain recorded them
    pub dependencies: Vec<Dependency>,
    /// Path, URL or label identifying where the bytes came from
    pub source: String,
    /// Which acquisition path produced this manifest
    pub source_kind: SourceKind,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_info() -> BinaryInfo {
        BinaryInfo {
            path: "github.com/example/myapp".to_string(),
            version: "v1.0.0".to_string(),
            go_version: "go1.21.0".to_string(),
            build_settings: BTreeMap::from([("GOOS".to_string(), "linux".to_string())]),
            dependencies: vec![Dependency {
                path: "github.com/spf13/cobra".to_string(),
                version: "v1.6.1".to_string(),
                sum: None,
                replace: Some(Replacement {
                    path: "github.com/fork/cobra".to_string(),
                    version: "v1.6.2".to_string(),
                    sum: None,
                }),
            }],
            source: "/usr/local/bin/myapp".to_string(),
            source_kind: SourceKind::File,
        }
    }

    #[test]
    fn test_json_shape_mirrors_model() {
        let info = sample_info();
        let json: serde_json::Value = serde_json::to_value(&info).unwrap();

        assert_eq!(json["path"], "github.com/example/myapp");
        assert_eq!(json["go_version"], "go1.21.0");
        assert_eq!(json["build_settings"]["GOOS"], "linux");
        assert_eq!(json["source_kind"], "file");
        assert_eq!(json["dependencies"][0]["replace"]["path"], "github.com/fork/cobra");
        // Absent checksums are omitted rather than serialized as null
        assert!(json["dependencies"][0].get("sum").is_none());
    }

    #[test]
    fn test_replacement_is_exposed_alongside_original() {
        let info = sample_info();
        let dep = &info.dependencies[0];

        assert!(dep.is_replaced());
        assert_eq!(dep.path, "github.com/spf13/cobra");
        assert_eq!(dep.version, "v1.6.1");
        let replace = dep.replace.as_ref().unwrap();
        assert_eq!(replace.path, "github.com/fork/cobra");
        assert_eq!(replace.version, "v1.6.2");
    }

    #[test]
    fn test_source_kind_labels() {
        assert_eq!(SourceKind::File.to_string(), "file");
        assert_eq!(SourceKind::Bytes.to_string(), "bytes");
        assert_eq!(SourceKind::Stream.to_string(), "stream");
        assert_eq!(SourceKind::Url.to_string(), "url");
    }
}
