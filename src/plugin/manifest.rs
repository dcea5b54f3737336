//! Plugin manifest
//!
//! Every package carries a `plugin.properties` file at its root. The file uses
//! the classic `key=value` property syntax and must declare the entry-point
//! type under the `entrypoint` key:
//!
//! ```text
//! # Addition operation
//! entrypoint = calc.ops.Addition
//! ```

use std::collections::HashMap;

use super::error::{CandidateError, LoadError, SkipReason};
use super::scope::PackageScope;

/// Well-known manifest resource inside every package
pub const MANIFEST_RESOURCE: &str = "plugin.properties";

/// Manifest key naming the entry-point type
pub const ENTRY_POINT_KEY: &str = "entrypoint";

/// Parsed property set of a manifest
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    properties: HashMap<String, String>,
}

impl Manifest {
    /// Parses property text
    ///
    /// Parsing never fails: malformed lines degrade to keys with empty values.
    pub fn parse(text: &str) -> Self {
        let mut properties = HashMap::new();
        let mut lines = text.lines();

        while let Some(line) = lines.next() {
            let trimmed = line.trim_start();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
                continue;
            }

            let mut logical = trimmed.to_string();
            while ends_with_continuation(&logical) {
                logical.pop();
                match lines.next() {
                    Some(next) => logical.push_str(next.trim_start()),
                    None => break,
                }
            }

            let (key, value) = split_entry(&logical);
            properties.insert(unescape(key.trim()), unescape(value.trim()));
        }

        Self { properties }
    }

    /// Gets a property value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Gets the declared entry point, ignoring blank values
    pub fn entry_point(&self) -> Option<&str> {
        self.get(ENTRY_POINT_KEY)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

/// Reads the manifest of the package behind `scope` and returns its entry point
///
/// A missing manifest or `entrypoint` key skips the package; a key that is
/// present but blank fails it.
pub fn read_manifest(scope: &mut PackageScope<'_>) -> Result<String, CandidateError> {
    let Some(bytes) = scope.read_resource(MANIFEST_RESOURCE)? else {
        return Err(SkipReason::MissingManifest {
            resource: MANIFEST_RESOURCE,
        }
        .into());
    };

    let manifest = Manifest::parse(&decode(bytes));
    match manifest.get(ENTRY_POINT_KEY).map(str::trim) {
        None => Err(SkipReason::MissingEntryPoint {
            key: ENTRY_POINT_KEY,
        }
        .into()),
        Some("") => Err(LoadError::Manifest {
            reason: format!("`{ENTRY_POINT_KEY}` is blank"),
        }
        .into()),
        Some(entry_point) => Ok(entry_point.to_string()),
    }
}

/// Decodes manifest bytes as UTF-8, falling back to ISO-8859-1
fn decode(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes)
        .unwrap_or_else(|e| e.into_bytes().into_iter().map(char::from).collect())
}

fn ends_with_continuation(line: &str) -> bool {
    let slashes = line.chars().rev().take_while(|c| *c == '\\').count();
    slashes % 2 == 1
}

/// Splits a logical line at the first unescaped `=`, `:` or whitespace
fn split_entry(line: &str) -> (&str, &str) {
    let mut escaped = false;

    for (idx, c) in line.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '=' | ':' => return (&line[..idx], &line[idx + 1..]),
            c if c.is_whitespace() => {
                let rest = line[idx..].trim_start();
                let rest = rest
                    .strip_prefix('=')
                    .or_else(|| rest.strip_prefix(':'))
                    .unwrap_or(rest);
                return (&line[..idx], rest);
            }
            _ => {}
        }
    }

    (line, "")
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{000c}'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                match u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push_str("\\u");
                        out.push_str(&hex);
                    }
                }
            }
            Some(other) => out.push(other),
            None => {}
        }
    }

    out
}
