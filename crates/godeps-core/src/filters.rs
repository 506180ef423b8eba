//! Dependency queries over an assembled manifest.
//!
//! These are read-only views: every function borrows from the manifest and
//! returns references in the original recording order. Nothing here mutates
//! a [`BinaryInfo`].

use crate::model::{BinaryInfo, Dependency};

/// Classifies an import path as part of the Go standard library.
///
/// Standard library packages (`fmt`, `net/http`, `crypto/tls`) never carry
/// a dot in their path, while module paths start with a dotted host
/// (`github.com/...`, `golang.org/...`). The heuristic is exactly that:
/// no dot anywhere means standard library.
pub fn is_stdlib(path: &str) -> bool {
    !path.contains('.')
}

/// Returns the dependencies whose paths are not part of the standard library.
pub fn exclude_stdlib(deps: &[Dependency]) -> Vec<&Dependency> {
    deps.iter().filter(|d| !is_stdlib(&d.path)).collect()
}

impl BinaryInfo {
    /// Returns the dependencies matching `predicate`, in recording order.
    ///
    /// `None` selects everything, so callers can thread an optional filter
    /// through without branching:
    ///
    /// ```
    /// # use godeps_core::{BinaryInfo, Dependency};
    /// # fn demo(info: &BinaryInfo) {
    /// let replaced = info.filter_dependencies(Some(Dependency::is_replaced));
    /// let all = info.filter_dependencies(None::<fn(&Dependency) -> bool>);
    /// # }
    /// ```
    pub fn filter_dependencies<P>(&self, predicate: Option<P>) -> Vec<&Dependency>
    where
        P: Fn(&Dependency) -> bool,
    {
        match predicate {
            Some(pred) => self.dependencies.iter().filter(|d| pred(d)).collect(),
            None => self.dependencies.iter().collect(),
        }
    }

    /// Partitions dependencies by standard-library membership.
    ///
    /// `keep_std = true` returns only standard-library entries,
    /// `false` only module dependencies; the two views together cover the
    /// full dependency list exactly once.
    pub fn filter_stdlib(&self, keep_std: bool) -> Vec<&Dependency> {
        self.filter_dependencies(Some(|d: &Dependency| is_stdlib(&d.path) == keep_std))
    }

    /// Looks up a dependency by exact import path.
    pub fn dependency_by_path(&self, path: &str) -> Option<&Dependency> {
        self.dependencies.iter().find(|d| d.path == path)
    }
}
