//! Dependency list extraction for a single npm project.
//!
//! [`calculate_dependencies_list`] runs `npm ls`, reduces the tree into a
//! [`DependencyMap`], and partitions it into the dependencies that go into
//! the build-info record and those that have to be skipped.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use semver::Version;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::{Cacache, PackageCache};
use crate::checksum::calculate_checksums;
use crate::error::{ExtractError, Result};
use crate::graph::{CanonicalDependency, DependencyMap};
use crate::npm::{config_cache_dir, ls_args, npm_version, NpmCommand, NpmExecutor};
use crate::parser::{Schema, SkipReason};

/// Settings for one extraction.
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Directory containing package.json and node_modules.
    pub project_dir: PathBuf,
    /// The module's own build-info id; the last element of every path.
    pub module_id: String,
    /// Extra arguments passed to `npm ls` and `npm config`.
    pub npm_args: Vec<String>,
    /// Whether to look tarballs up in the npm cache and hash them.
    pub calculate_checksums: bool,
    /// npm's version, when the caller already asked npm for it.
    pub npm_version: Option<Version>,
}

impl ExtractOptions {
    pub fn new(project_dir: impl Into<PathBuf>, module_id: impl Into<String>) -> Self {
        Self {
            project_dir: project_dir.into(),
            module_id: module_id.into(),
            ..Default::default()
        }
    }

    pub fn with_npm_args(mut self, npm_args: Vec<String>) -> Self {
        self.npm_args = npm_args;
        self
    }

    pub fn with_checksums(mut self, calculate_checksums: bool) -> Self {
        self.calculate_checksums = calculate_checksums;
        self
    }

    pub fn with_npm_version(mut self, npm_version: Version) -> Self {
        self.npm_version = Some(npm_version);
        self
    }
}

/// Ids of dependencies left out of the build-info, grouped by reason.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SkippedDependencies {
    #[serde(rename = "bundleDependencies", skip_serializing_if = "Vec::is_empty")]
    pub bundled: Vec<String>,
    #[serde(rename = "peerDependencies", skip_serializing_if = "Vec::is_empty")]
    pub peer: Vec<String>,
    #[serde(rename = "optionalDependencies", skip_serializing_if = "Vec::is_empty")]
    pub optional: Vec<String>,
    #[serde(rename = "missingFromCache", skip_serializing_if = "Vec::is_empty")]
    pub missing_from_cache: Vec<String>,
}

impl SkippedDependencies {
    pub fn push(&mut self, reason: SkipReason, id: String) {
        self.bucket_mut(reason).push(id);
    }

    pub fn get(&self, reason: SkipReason) -> &[String] {
        match reason {
            SkipReason::MissingBundled => &self.bundled,
            SkipReason::MissingPeer => &self.peer,
            SkipReason::MissingOptional => &self.optional,
            SkipReason::MissingFromCache => &self.missing_from_cache,
        }
    }

    fn bucket_mut(&mut self, reason: SkipReason) -> &mut Vec<String> {
        match reason {
            SkipReason::MissingBundled => &mut self.bundled,
            SkipReason::MissingPeer => &mut self.peer,
            SkipReason::MissingOptional => &mut self.optional,
            SkipReason::MissingFromCache => &mut self.missing_from_cache,
        }
    }

    pub fn len(&self) -> usize {
        SkipReason::ALL.iter().map(|r| self.get(*r).len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Yields each non-empty bucket in precedence order.
    pub fn iter(&self) -> impl Iterator<Item = (SkipReason, &[String])> {
        SkipReason::ALL
            .into_iter()
            .map(|reason| (reason, self.get(reason)))
            .filter(|(_, ids)| !ids.is_empty())
    }

    /// Emits one warning per non-empty bucket.
    fn warn(&self) {
        for (reason, ids) in self.iter() {
            let ids = ids.join(",");
            match reason {
                SkipReason::MissingFromCache => warn!(
                    "The following dependencies will not be included in the build-info, because they are missing in the npm cache: '{}'.\nHint: Try to delete 'node_modules' and/or 'package-lock.json'.",
                    ids
                ),
                _ => warn!(
                    "The following dependencies will not be included in the build-info, because the 'npm ls' command did not return their integrity.\nThe reason why the version wasn't returned may be because the package is a '{}', which was not manually installed.\nIt is therefore okay to skip this dependency: {}",
                    reason.label(),
                    ids
                ),
            }
        }
    }
}

/// The result of an extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyReport {
    pub module_id: String,
    /// Dependencies to record, in discovery order.
    pub dependencies: Vec<CanonicalDependency>,
    pub skipped: SkippedDependencies,
}

/// Extracts the project's flattened dependency list.
///
/// # Errors
///
/// Fails when `npm ls` fails and the project has no node_modules, when npm's
/// version or cache location cannot be determined, or when the tree contains
/// a malformed node. Dependencies that merely cannot be trusted or hashed are
/// reported in [`DependencyReport::skipped`] instead.
///
/// # Example
///
/// ```ignore
/// use npm_buildinfo::extract::{calculate_dependencies_list, ExtractOptions};
/// use npm_buildinfo::npm::NpmCli;
///
/// let npm = NpmCli::locate()?;
/// let options = ExtractOptions::new(".", "my-app:1.0.0").with_checksums(true);
/// let report = calculate_dependencies_list(&npm, &options)?;
/// println!("{} dependencies", report.dependencies.len());
/// ```
pub fn calculate_dependencies_list(
    npm: &dyn NpmExecutor,
    options: &ExtractOptions,
) -> Result<DependencyReport> {
    let map = calculate_dependencies_map(npm, options)?;

    let cache = if options.calculate_checksums {
        let cache = Cacache::new(config_cache_dir(npm, &options.project_dir, &options.npm_args)?);
        debug!("Reading tarballs from {}", cache.root().display());
        Some(cache)
    } else {
        None
    };

    Ok(assemble(
        &options.module_id,
        map,
        cache.as_ref().map(|c| c as &dyn PackageCache),
    ))
}

/// Runs `npm ls` and reduces its output.
pub fn calculate_dependencies_map(
    npm: &dyn NpmExecutor,
    options: &ExtractOptions,
) -> Result<DependencyMap> {
    let output = npm.run(
        NpmCommand::Ls,
        Some(&options.project_dir),
        &ls_args(&options.npm_args),
    );

    if let Some(failure) = &output.failure {
        ensure_node_modules(options)?;
        warn!("npm list command failed with error: {}", failure);
    }
    if !output.stderr.is_empty() {
        warn!(
            "Some errors occurred while collecting dependencies info:\n{}",
            String::from_utf8_lossy(&output.stderr)
        );
    }

    let version = match &options.npm_version {
        Some(version) => version.clone(),
        None => npm_version(npm)?,
    };
    let schema = Schema::for_npm(&version);
    debug!("Parsing npm ls output with the {} schema.", schema);

    if output.stdout.iter().all(u8::is_ascii_whitespace) {
        return Ok(DependencyMap::new());
    }
    let tree: Value = serde_json::from_slice(&output.stdout)?;
    DependencyMap::from_ls_output(&tree, &options.module_id, schema)
}

/// A failed `npm ls` is only tolerable if there is something installed.
fn ensure_node_modules(options: &ExtractOptions) -> Result<()> {
    let node_modules = options.project_dir.join("node_modules");
    match fs::metadata(&node_modules) {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => Err(ExtractError::NodeModulesMissing {
            project_dir: options.project_dir.clone(),
        }),
        Err(e) if e.kind() == ErrorKind::NotFound => Err(ExtractError::NodeModulesMissing {
            project_dir: options.project_dir.clone(),
        }),
        Err(source) => Err(ExtractError::Io {
            path: node_modules,
            source,
        }),
    }
}

/// Partitions a reduced tree into recorded and skipped dependencies.
///
/// Rules, first match wins:
///
/// 1. no integrity and bundled - skipped as a bundled dependency
/// 2. no integrity and flagged peer-missing - skipped as a peer dependency
/// 3. with a cache, checksum resolution fails - skipped as optional when the
///    dependency is optional, otherwise as missing from the cache
/// 4. everything else is recorded
pub fn assemble(
    module_id: &str,
    map: DependencyMap,
    cache: Option<&dyn PackageCache>,
) -> DependencyReport {
    let mut report = DependencyReport {
        module_id: module_id.to_string(),
        ..Default::default()
    };

    for mut dependency in map.into_dependencies() {
        if dependency.integrity().is_empty() {
            if let Some(reason) = dependency.record.missing_integrity_reason() {
                report.skipped.push(reason, dependency.id);
                continue;
            }
        }

        if let Some(cache) = cache {
            match calculate_checksums(
                cache,
                dependency.name(),
                dependency.version(),
                dependency.integrity(),
            ) {
                Ok(checksums) => dependency.checksums = Some(checksums),
                Err(err) if dependency.record.optional => {
                    debug!("skipping optional {}: {}", dependency.id, err);
                    report
                        .skipped
                        .push(SkipReason::MissingOptional, dependency.id);
                    continue;
                }
                Err(err) => {
                    // Typically a lockfile upgraded from v1 to v2, which can drop integrities.
                    debug!(
                        "couldn't calculate checksum for {}. Error: '{}'.",
                        dependency.id, err
                    );
                    report
                        .skipped
                        .push(SkipReason::MissingFromCache, dependency.id);
                    continue;
                }
            }
        }

        report.dependencies.push(dependency);
    }

    report.skipped.warn();
    report
}
