//! Shared types for dependency parsing.
//!
//! This module defines the normalized record produced from a single
//! `npm ls` node, independent of which npm version emitted it.

use semver::Version;
use std::fmt;

/// The first npm major version that emits the modern `npm ls` shape.
pub const MODERN_NPM_MAJOR: u64 = 7;

/// The `npm ls --long` output shape to decode.
///
/// Chosen once per run from npm's own version, never per node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schema {
    /// npm 6 and older: flags live under underscore-prefixed keys.
    Legacy,
    /// npm 7 and newer: flat field names plus a `problems` list.
    Modern,
}

impl Schema {
    /// Selects the schema for the given npm version.
    ///
    /// # Example
    ///
    /// ```
    /// use npm_buildinfo::parser::Schema;
    /// use semver::Version;
    ///
    /// assert_eq!(Schema::for_npm(&Version::new(6, 14, 4)), Schema::Legacy);
    /// assert_eq!(Schema::for_npm(&Version::new(7, 0, 0)), Schema::Modern);
    /// ```
    pub fn for_npm(npm_version: &Version) -> Self {
        if npm_version.major < MODERN_NPM_MAJOR {
            Schema::Legacy
        } else {
            Schema::Modern
        }
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Schema::Legacy => write!(f, "legacy"),
            Schema::Modern => write!(f, "modern"),
        }
    }
}

/// Why a dependency was left out of the final list.
///
/// npm reports "missing" through three unrelated flags that differ between
/// versions; they are folded into this one type before classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SkipReason {
    /// A bundled dependency npm reported without an integrity.
    MissingBundled,
    /// A peer dependency that was never installed.
    MissingPeer,
    /// An optional dependency whose tarball is not in the cache.
    MissingOptional,
    /// Any other dependency whose tarball could not be found in the cache.
    MissingFromCache,
}

impl SkipReason {
    /// All reasons, in classification precedence order.
    pub const ALL: [SkipReason; 4] = [
        SkipReason::MissingBundled,
        SkipReason::MissingPeer,
        SkipReason::MissingOptional,
        SkipReason::MissingFromCache,
    ];

    /// Returns the key used for this bucket in exported reports.
    pub fn label(&self) -> &'static str {
        match self {
            SkipReason::MissingBundled => "bundleDependencies",
            SkipReason::MissingPeer => "peerDependencies",
            SkipReason::MissingOptional => "optionalDependencies",
            SkipReason::MissingFromCache => "missingFromCache",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SkipReason::MissingBundled => "missing bundled dependency",
            SkipReason::MissingPeer => "missing peer dependency",
            SkipReason::MissingOptional => "missing optional dependency",
            SkipReason::MissingFromCache => "missing from npm cache",
        };
        write!(f, "{}", s)
    }
}

/// A single node of `npm ls` output, normalized across npm versions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyRecord {
    /// The package name (e.g., "react", "@types/node").
    pub name: String,

    /// The installed version. Empty for unresolved peer dependencies.
    pub version: String,

    /// The SRI integrity string npm reported, or empty.
    pub integrity: String,

    /// True when the package ships inside its parent's tarball.
    pub in_bundle: bool,

    /// True when the package is only reachable through devDependencies.
    pub dev: bool,

    /// True when the package is only reachable through optionalDependencies.
    pub optional: bool,

    /// True when npm could not find the package on disk.
    pub missing: bool,

    /// True when npm flagged the package as an unmet peer dependency.
    pub peer_missing: bool,

    /// Diagnostics npm attached to this node.
    pub problems: Vec<String>,
}

impl DependencyRecord {
    /// Returns the `name:version` key used to deduplicate occurrences.
    pub fn id(&self) -> String {
        format!("{}:{}", self.name, self.version)
    }

    /// Returns true if npm could not resolve this node to an installed package.
    ///
    /// Only meaningful together with an empty version: such nodes are
    /// unresolved peers and are skipped rather than rejected.
    pub fn is_unresolved(&self) -> bool {
        self.missing || !self.problems.is_empty()
    }

    /// Returns the scope labels this occurrence contributes.
    ///
    /// Always one of `dev`/`prod`, plus the `@org` group for names with more
    /// than two `/`-separated segments.
    ///
    /// # Example
    ///
    /// ```
    /// use npm_buildinfo::parser::DependencyRecord;
    ///
    /// let record = DependencyRecord {
    ///     name: "@org/sub/pkg".to_string(),
    ///     ..Default::default()
    /// };
    /// assert_eq!(record.scopes(), vec!["prod", "@org"]);
    /// ```
    pub fn scopes(&self) -> Vec<String> {
        let kind = if self.dev { "dev" } else { "prod" };
        let mut scopes = vec![kind.to_string()];
        if self.name.starts_with('@') {
            let segments: Vec<&str> = self.name.split('/').collect();
            if segments.len() > 2 {
                scopes.push(segments[0].to_string());
            }
        }
        scopes
    }

    /// Classifies a record whose integrity is still unknown after the walk.
    ///
    /// Bundled takes precedence over peer-missing.
    pub fn missing_integrity_reason(&self) -> Option<SkipReason> {
        if self.in_bundle {
            Some(SkipReason::MissingBundled)
        } else if self.peer_missing || !self.problems.is_empty() {
            Some(SkipReason::MissingPeer)
        } else {
            None
        }
    }
}

impl fmt::Display for DependencyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}
