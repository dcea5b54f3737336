//! Plugin discovery
//!
//! Scans one directory (not recursively) for package files, loads each in
//! isolation and registers the results. A broken package never stops the
//! scan: its outcome is logged and recorded in the [`DiscoveryReport`]. Only
//! an unusable directory fails the whole pass.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{error, info, warn};

use super::error::{CandidateError, DiscoveryError};
use super::loader::load_plugin;
use super::registry::{PluginRegistry, Registration};
use super::scope::BaseScope;

/// Final state of one candidate
#[derive(Debug)]
pub enum CandidateStatus {
    /// Registered under `name`; `replaced` is set when an earlier plugin held the name
    Registered { name: String, replaced: bool },

    /// Left out, see the error
    Rejected(CandidateError),
}

/// Outcome of loading one candidate package
#[derive(Debug)]
pub struct CandidateOutcome {
    pub path: PathBuf,
    pub status: CandidateStatus,
}

/// What happened during a discovery pass
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    outcomes: Vec<CandidateOutcome>,
}

impl DiscoveryReport {
    /// Outcomes in processing order
    pub fn outcomes(&self) -> &[CandidateOutcome] {
        &self.outcomes
    }

    /// Number of candidate packages found
    pub fn candidates(&self) -> usize {
        self.outcomes.len()
    }

    /// Names registered during the pass, in processing order
    pub fn registered(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter_map(|o| match &o.status {
                CandidateStatus::Registered { name, .. } => Some(name.as_str()),
                CandidateStatus::Rejected(_) => None,
            })
            .collect()
    }

    /// Candidates that were skipped
    pub fn skipped(&self) -> Vec<&CandidateOutcome> {
        self.rejected(true)
    }

    /// Candidates that failed to load
    pub fn failed(&self) -> Vec<&CandidateOutcome> {
        self.rejected(false)
    }

    /// Names whose registration replaced an earlier plugin
    pub fn duplicates(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter_map(|o| match &o.status {
                CandidateStatus::Registered {
                    name,
                    replaced: true,
                } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    fn rejected(&self, skip: bool) -> Vec<&CandidateOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(&o.status, CandidateStatus::Rejected(e) if e.is_skip() == skip))
            .collect()
    }
}

/// A fresh registry together with the report that filled it
#[derive(Debug)]
pub struct Discovery {
    pub registry: PluginRegistry,
    pub report: DiscoveryReport,
}

/// Discovers plugins in `dir` into a new registry
pub fn discover(
    dir: &Path,
    base: &BaseScope,
    extension: &str,
) -> Result<Discovery, DiscoveryError> {
    let mut registry = PluginRegistry::new();
    let report = discover_into(dir, base, extension, &mut registry)?;
    Ok(Discovery { registry, report })
}

/// Discovers plugins in `dir` and registers them into `registry`
pub fn discover_into(
    dir: &Path,
    base: &BaseScope,
    extension: &str,
    registry: &mut PluginRegistry,
) -> Result<DiscoveryReport, DiscoveryError> {
    let candidates = find_candidates(dir, extension)?;
    let mut report = DiscoveryReport::default();

    if candidates.is_empty() {
        info!(dir = %dir.display(), extension, "no plugins found");
        return Ok(report);
    }
    info!(dir = %dir.display(), count = candidates.len(), "found plugins");

    for path in candidates {
        let status = match load_plugin(&path, base) {
            Ok(plugin) => {
                let name = plugin.name.clone();
                let entry_point = plugin.entry_point.clone();
                let replaced = match registry.register(plugin) {
                    Registration::Replaced(previous) => {
                        warn!(
                            name = %name,
                            previous = ?previous.source,
                            package = %path.display(),
                            "duplicate registration, most recent one will be used"
                        );
                        true
                    }
                    Registration::Inserted => false,
                };
                info!(name = %name, entry_point = %entry_point, package = %path.display(), "registered plugin");
                CandidateStatus::Registered { name, replaced }
            }
            Err(err) => {
                log_rejection(&path, &err);
                CandidateStatus::Rejected(err)
            }
        };
        report.outcomes.push(CandidateOutcome { path, status });
    }

    Ok(report)
}

/// Lists package files directly inside `dir`, sorted by path
pub fn find_candidates(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, DiscoveryError> {
    let unreadable = |source| DiscoveryError::Unreadable {
        path: dir.to_path_buf(),
        source,
    };

    let metadata = match fs::metadata(dir) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(DiscoveryError::MissingDirectory(dir.to_path_buf()))
        }
        Err(e) => return Err(unreadable(e)),
    };
    if !metadata.is_dir() {
        return Err(DiscoveryError::NotADirectory(dir.to_path_buf()));
    }

    let dir = dir.canonicalize().map_err(unreadable)?;
    let entries = fs::read_dir(&dir).map_err(|source| DiscoveryError::Unreadable {
        path: dir.clone(),
        source,
    })?;

    let mut candidates = Vec::new();
    for entry in entries {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "unreadable directory entry ignored");
                continue;
            }
        };
        if path.is_file() && has_extension(&path, extension) {
            candidates.push(path);
        }
    }
    candidates.sort();
    Ok(candidates)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

fn log_rejection(path: &Path, err: &CandidateError) {
    match err {
        CandidateError::Skipped(reason) => {
            error!(package = %path.display(), reason = %reason, "plugin skipped");
        }
        CandidateError::Failed(load) => {
            error!(
                package = %path.display(),
                type_name = load.type_name().unwrap_or("-"),
                error = %load,
                "plugin failed to load"
            );
        }
    }
}
