//! Parser for npm package.json files.
//!
//! This module reads a module's own identity (name, version and scope) from
//! its manifest. The identity seeds the root of every `requestedBy` path and
//! names the module in the build-info record.

use std::fs;
use std::path::Path;

use semver::Version;
use serde::Deserialize;

use super::types::MODERN_NPM_MAJOR;

/// Errors that can occur during package.json parsing.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Failed to read the file from disk.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse JSON content.
    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type alias for parser operations.
pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct Manifest {
    name: String,
    version: String,
}

/// A module's identity as declared in its package.json.
///
/// `scope` keeps its leading `@`; `name` never contains the scope.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PackageInfo {
    pub name: String,
    pub version: String,
    pub scope: String,
}

impl PackageInfo {
    /// Returns the build-info module id: `scope:name:version` (scope without
    /// its `@`) or `name:version`.
    ///
    /// # Example
    ///
    /// ```
    /// use npm_buildinfo::parser::package_json::parse_str;
    ///
    /// let info = parse_str(r#"{"name": "@acme/widget", "version": "2.0.0"}"#, None).unwrap();
    /// assert_eq!(info.build_info_module_id(), "acme:widget:2.0.0");
    /// ```
    pub fn build_info_module_id(&self) -> String {
        let name_base = format!("{}:{}", self.name, self.version);
        if self.scope.is_empty() {
            return name_base;
        }
        format!("{}:{}", self.scope.trim_start_matches('@'), name_base)
    }

    /// Returns the registry path the packed tarball is deployed to.
    pub fn deploy_path(&self) -> String {
        let file_name = format!("{}-{}.tgz", self.name, self.version);
        if self.scope.is_empty() {
            return format!("{}/-/{}", self.name, file_name);
        }
        format!("{}/{}/-/{}", self.scope, self.name, file_name)
    }

    /// Returns the scope-qualified package name.
    pub fn full_name(&self) -> String {
        if self.scope.is_empty() {
            return self.name.clone();
        }
        format!("{}/{}", self.scope, self.name)
    }

    fn split_scope_from_name(&mut self) {
        if self.name.starts_with('@') && self.name.contains('/') {
            let mut segments = self.name.split('/');
            let scope = segments.next().unwrap_or_default().to_string();
            let name = segments.next().unwrap_or_default().to_string();
            self.scope = scope;
            self.name = name;
        }
    }
}

/// Reads `package.json` from `directory`.
///
/// Older npm versions ignore a leading `v`/`=` on the version, so the prefix
/// is stripped when `npm_version` is below 7.
pub fn read_package_info(directory: &Path, npm_version: Option<&Version>) -> ParseResult<PackageInfo> {
    let content = fs::read_to_string(directory.join("package.json"))?;
    parse_str(&content, npm_version)
}

/// Parses a package identity from package.json content.
pub fn parse_str(content: &str, npm_version: Option<&Version>) -> ParseResult<PackageInfo> {
    let manifest: Manifest = serde_json::from_str(content)?;
    let mut info = PackageInfo {
        name: manifest.name,
        version: manifest.version,
        scope: String::new(),
    };
    if npm_version.is_some_and(|v| v.major < MODERN_NPM_MAJOR) {
        info.version = strip_version_prefixes(&info.version).to_string();
    }
    info.split_scope_from_name();
    Ok(info)
}

/// Strips at most one leading `v` and at most one leading `=`, in either order.
fn strip_version_prefixes(version: &str) -> &str {
    let mut rest = version;
    let (mut stripped_v, mut stripped_eq) = (false, false);
    loop {
        if !stripped_v && rest.starts_with('v') {
            rest = &rest[1..];
            stripped_v = true;
        } else if !stripped_eq && rest.starts_with('=') {
            rest = &rest[1..];
            stripped_eq = true;
        } else {
            return rest;
        }
    }
}
