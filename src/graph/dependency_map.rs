//! Reduction of the nested `npm ls` tree into a flat dependency map.
//!
//! npm reports a package once per place it is required from, so the same
//! `name:version` shows up many times in a deep tree. The map keeps one
//! [`CanonicalDependency`] per id and folds every occurrence into it.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::checksum::Checksums;
use crate::error::{ExtractError, Result};
use crate::parser::{is_empty_node, parse_node, DependencyRecord, Schema};

/// A deduplicated dependency, merged from every occurrence in the tree.
///
/// Serializes as a build-info dependency: `id`, `scopes`, `requestedBy` and,
/// once computed, `md5`/`sha1`/`sha256`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalDependency {
    /// `name:version`
    pub id: String,
    /// Scope labels in first-seen order, without duplicates.
    pub scopes: Vec<String>,
    /// One path per occurrence, nearest ancestor first, ending at the module id.
    pub requested_by: Vec<Vec<String>>,
    #[serde(flatten, skip_serializing_if = "Option::is_none")]
    pub checksums: Option<Checksums>,
    /// The first occurrence, with its integrity backfilled by later ones.
    #[serde(skip)]
    pub record: DependencyRecord,
}

impl CanonicalDependency {
    /// Creates a dependency seeded from its first occurrence.
    ///
    /// Scopes and paths start empty; they are added by [`DependencyMap::insert`].
    pub fn new(record: DependencyRecord) -> Self {
        Self {
            id: record.id(),
            scopes: Vec::new(),
            requested_by: Vec::new(),
            checksums: None,
            record,
        }
    }

    /// The package name.
    pub fn name(&self) -> &str {
        &self.record.name
    }

    /// The installed version.
    pub fn version(&self) -> &str {
        &self.record.version
    }

    /// The first non-empty integrity seen for this id, or empty.
    pub fn integrity(&self) -> &str {
        &self.record.integrity
    }

    /// Sets the integrity unless one is already known.
    pub fn backfill_integrity(&mut self, integrity: &str) {
        if self.record.integrity.is_empty() {
            self.record.integrity = integrity.to_string();
        }
    }

    /// Unions `scopes` into this dependency's scopes.
    ///
    /// Existing order is kept, new labels are appended, empty labels dropped.
    pub fn merge_scopes<S: AsRef<str>>(&mut self, scopes: &[S]) {
        for scope in scopes {
            let scope = scope.as_ref();
            if scope.is_empty() || self.scopes.iter().any(|s| s == scope) {
                continue;
            }
            self.scopes.push(scope.to_string());
        }
    }
}

/// All dependencies found in one `npm ls` tree, keyed by `name:version`.
///
/// Iteration follows first discovery order, which is depth-first order of
/// the walk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyMap {
    entries: IndexMap<String, CanonicalDependency>,
}

impl DependencyMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reduces a full `npm ls --json` document.
    ///
    /// Only the root's `dependencies` object is walked; every path starts at
    /// `module_id`.
    ///
    /// # Example
    ///
    /// ```
    /// use npm_buildinfo::graph::DependencyMap;
    /// use npm_buildinfo::parser::Schema;
    /// use serde_json::json;
    ///
    /// let output = json!({
    ///     "name": "my-app",
    ///     "dependencies": {
    ///         "left-pad": {"name": "left-pad", "version": "1.3.0", "integrity": "sha512-x"}
    ///     }
    /// });
    ///
    /// let map = DependencyMap::from_ls_output(&output, "my-app:1.0.0", Schema::Modern).unwrap();
    /// let dep = map.get("left-pad:1.3.0").unwrap();
    /// assert_eq!(dep.requested_by, vec![vec!["my-app:1.0.0".to_string()]]);
    /// ```
    pub fn from_ls_output(output: &Value, module_id: &str, schema: Schema) -> Result<Self> {
        let mut map = Self::new();
        if let Some(dependencies) = output.get("dependencies").and_then(Value::as_object) {
            map.walk(dependencies, &[module_id.to_string()], schema)?;
        }
        Ok(map)
    }

    /// Walks a `dependencies` object depth-first, merging every node.
    ///
    /// # Arguments
    ///
    /// * `dependencies` - Mapping of package name to its `npm ls` node
    /// * `path_to_root` - Ids from the parent of these nodes up to the module
    /// * `schema` - Node shape to decode
    ///
    /// # Errors
    ///
    /// Fails on the first node that cannot be decoded, or that has no version
    /// without being marked missing. Empty nodes and unresolved peers are
    /// skipped.
    pub fn walk(
        &mut self,
        dependencies: &Map<String, Value>,
        path_to_root: &[String],
        schema: Schema,
    ) -> Result<()> {
        for (key, node) in dependencies {
            if is_empty_node(node) {
                debug!("{key} is missing. This may be the result of an optional dependency.");
                continue;
            }

            let mut record =
                parse_node(schema, node).map_err(|source| ExtractError::MalformedNode {
                    node: node.to_string(),
                    source,
                })?;
            if record.version.is_empty() {
                if record.is_unresolved() {
                    debug!("{key} is missing, this may be the result of a peer dependency.");
                    continue;
                }
                return Err(ExtractError::MissingVersion {
                    node: node.to_string(),
                });
            }
            if record.name.is_empty() {
                record.name = key.clone();
            }

            let id = record.id();
            self.insert(record, path_to_root.to_vec());

            if let Some(transitive) = node.get("dependencies").and_then(Value::as_object) {
                if !transitive.is_empty() {
                    let mut path = Vec::with_capacity(path_to_root.len() + 1);
                    path.push(id);
                    path.extend_from_slice(path_to_root);
                    self.walk(transitive, &path, schema)?;
                }
            }
        }
        Ok(())
    }

    /// Merges one occurrence of a dependency into the map.
    ///
    /// The first occurrence of an id seeds its entry; every occurrence
    /// contributes its scopes and its path, and may fill in a missing integrity.
    pub fn insert(&mut self, record: DependencyRecord, path_to_root: Vec<String>) {
        let scopes = record.scopes();
        let integrity = record.integrity.clone();
        let dependency = self
            .entries
            .entry(record.id())
            .or_insert_with(|| CanonicalDependency::new(record));

        dependency.backfill_integrity(&integrity);
        dependency.merge_scopes(&scopes);
        dependency.requested_by.push(path_to_root);
    }

    /// Folds another map into this one with the same rules as [`insert`].
    ///
    /// Entries of `other` are visited in its order, so merging reduced
    /// subtrees in a fixed order gives a stable result.
    ///
    /// [`insert`]: DependencyMap::insert
    pub fn merge(&mut self, other: DependencyMap) {
        for (id, incoming) in other.entries {
            match self.entries.get_mut(&id) {
                Some(existing) => {
                    existing.backfill_integrity(incoming.integrity());
                    existing.merge_scopes(&incoming.scopes);
                    existing.requested_by.extend(incoming.requested_by);
                }
                None => {
                    self.entries.insert(id, incoming);
                }
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&CanonicalDependency> {
        self.entries.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CanonicalDependency> {
        self.entries.values()
    }

    /// Consumes the map, yielding dependencies in discovery order.
    pub fn into_dependencies(self) -> impl Iterator<Item = CanonicalDependency> {
        self.entries.into_values()
    }
}
