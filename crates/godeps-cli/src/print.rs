//! Output rendering: aligned tables for humans, JSON for machines.
//!
//! Rendering is separated from printing so tests can assert on the exact
//! output text. The JSON shape is a stable CLI contract and is narrower
//! than the library model: it carries only the selected dependencies, and
//! checksums plus build settings appear only in verbose mode.

use std::collections::BTreeMap;

use anyhow::Result;
use godeps_core::{BinaryInfo, Dependency};
use serde::Serialize;

/// Renders the full human-readable report for one analyzed binary.
pub fn render_info(info: &BinaryInfo, deps: &[&Dependency], verbose: bool) -> String {
    let mut out = String::new();

    out.push_str(&format!("Binary: {}\n", info.source));
    out.push_str(&format!("Main module: {}@{}\n", info.path, info.version));
    out.push_str(&format!("Go version: {}\n", info.go_version));

    if verbose && !info.build_settings.is_empty() {
        out.push_str("\nBuild settings:\n");
        for (key, value) in &info.build_settings {
            out.push_str(&format!("  {key} = {value}\n"));
        }
    }

    out.push_str(&format!("\nDependencies ({}):\n", deps.len()));
    out.push_str(&render_table(deps, verbose));
    out
}

/// Renders the dependency table with aligned columns.
pub fn render_table(deps: &[&Dependency], verbose: bool) -> String {
    let headers: &[&str] = if verbose {
        &["MODULE", "VERSION", "SUM", "REPLACED BY"]
    } else {
        &["MODULE", "VERSION", "REPLACED BY"]
    };

    let rows: Vec<Vec<String>> = deps
        .iter()
        .map(|dep| {
            let replaced = dep
                .replace
                .as_ref()
                .map(|r| format!("{}@{}", r.path, r.version))
                .unwrap_or_default();
            if verbose {
                vec![
                    dep.path.clone(),
                    dep.version.clone(),
                    dep.sum.clone().unwrap_or_default(),
                    replaced,
                ]
            } else {
                vec![dep.path.clone(), dep.version.clone(), replaced]
            }
        })
        .collect();

    // Column widths over headers and all rows, two spaces between columns.
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.len());
        }
    }

    let mut out = String::new();
    render_row(&mut out, headers.iter().map(|h| h.to_string()), &widths);
    for row in rows {
        render_row(&mut out, row.into_iter(), &widths);
    }
    out
}

fn render_row(out: &mut String, cells: impl Iterator<Item = String>, widths: &[usize]) {
    let cells: Vec<String> = cells.collect();
    let last = cells.len().saturating_sub(1);
    out.push_str("  ");
    for (i, cell) in cells.iter().enumerate() {
        if i == last {
            // Last column unpadded, so empty cells leave no trailing spaces
            out.push_str(cell);
        } else {
            out.push_str(&format!("{cell:<width$}  ", width = widths[i]));
        }
    }
    while out.ends_with(' ') {
        out.pop();
    }
    out.push('\n');
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonOutput<'a> {
    binary: &'a str,
    main: JsonMain<'a>,
    go_version: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    build_settings: Option<&'a BTreeMap<String, String>>,
    dependencies: Vec<JsonDependency<'a>>,
}

#[derive(Serialize)]
struct JsonMain<'a> {
    path: &'a str,
    version: &'a str,
}

#[derive(Serialize)]
struct JsonDependency<'a> {
    path: &'a str,
    version: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sum: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    replace: Option<JsonReplace<'a>>,
}

#[derive(Serialize)]
struct JsonReplace<'a> {
    path: &'a str,
    version: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sum: Option<&'a str>,
}

/// Renders the machine-readable report for one analyzed binary.
pub fn render_json(info: &BinaryInfo, deps: &[&Dependency], verbose: bool) -> Result<String> {
    let output = JsonOutput {
        binary: &info.source,
        main: JsonMain {
            path: &info.path,
            version: &info.version,
        },
        go_version: &info.go_version,
        build_settings: (verbose && !info.build_settings.is_empty())
            .then_some(&info.build_settings),
        dependencies: deps
            .iter()
            .map(|dep| JsonDependency {
                path: &dep.path,
                version: &dep.version,
                sum: if verbose { dep.sum.as_deref() } else { None },
                replace: dep.replace.as_ref().map(|r| JsonReplace {
                    path: &r.path,
                    version: &r.version,
                    sum: if verbose { r.sum.as_deref() } else { None },
                }),
            })
            .collect(),
    };

    Ok(serde_json::to_string_pretty(&output)?)
}
