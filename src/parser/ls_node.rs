//! Decoder for single nodes of `npm ls --json --all --long` output.
//!
//! npm 6 and npm 7+ disagree on where flags and the integrity live, so each
//! shape gets its own serde struct; both are normalized into
//! [`DependencyRecord`] before anything else looks at them.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::types::{DependencyRecord, Schema};

/// Reads an explicit JSON `null` as the field's default.
///
/// `npm ls --long` copies fields from each package's own package.json, so a
/// `null` there must not reject the whole node.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A node as emitted by npm 7 and newer.
#[derive(Debug, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct ModernLsNode {
    #[serde(deserialize_with = "null_as_default")]
    name: String,
    #[serde(deserialize_with = "null_as_default")]
    version: String,
    #[serde(deserialize_with = "null_as_default")]
    integrity: String,
    #[serde(deserialize_with = "null_as_default")]
    in_bundle: bool,
    #[serde(deserialize_with = "null_as_default")]
    dev: bool,
    #[serde(deserialize_with = "null_as_default")]
    optional: bool,
    #[serde(deserialize_with = "null_as_default")]
    missing: bool,
    #[serde(deserialize_with = "null_as_default")]
    problems: Vec<String>,
    peer_missing: Option<Value>,
}

/// A node as emitted by npm 6 and older.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct LegacyLsNode {
    #[serde(deserialize_with = "null_as_default")]
    name: String,
    #[serde(deserialize_with = "null_as_default")]
    version: String,
    #[serde(deserialize_with = "null_as_default")]
    missing: bool,
    #[serde(rename = "_integrity", deserialize_with = "null_as_default")]
    integrity: String,
    #[serde(rename = "_inBundle", deserialize_with = "null_as_default")]
    in_bundle: bool,
    #[serde(rename = "_development", deserialize_with = "null_as_default")]
    dev: bool,
    #[serde(rename = "_optional", deserialize_with = "null_as_default")]
    inner_optional: bool,
    #[serde(deserialize_with = "null_as_default")]
    optional: bool,
    #[serde(rename = "peerMissing")]
    peer_missing: Option<Value>,
}

impl From<ModernLsNode> for DependencyRecord {
    fn from(node: ModernLsNode) -> Self {
        DependencyRecord {
            name: node.name,
            version: node.version,
            integrity: node.integrity,
            in_bundle: node.in_bundle,
            dev: node.dev,
            optional: node.optional,
            missing: node.missing,
            peer_missing: node.peer_missing.is_some(),
            problems: node.problems,
        }
    }
}

impl From<LegacyLsNode> for DependencyRecord {
    fn from(node: LegacyLsNode) -> Self {
        DependencyRecord {
            name: node.name,
            version: node.version,
            integrity: node.integrity,
            in_bundle: node.in_bundle,
            dev: node.dev,
            optional: node.optional || node.inner_optional,
            missing: node.missing,
            peer_missing: node.peer_missing.is_some(),
            problems: Vec::new(),
        }
    }
}

/// Decodes one `npm ls` node with the given schema.
///
/// `serde_json` maps a JSON `null` marker to `None`, so only a present,
/// non-null `peerMissing` counts.
///
/// # Example
///
/// ```
/// use npm_buildinfo::parser::{parse_node, Schema};
/// use serde_json::json;
///
/// let node = json!({"name": "lodash", "version": "4.17.21", "_development": true});
/// let record = parse_node(Schema::Legacy, &node).unwrap();
/// assert!(record.dev);
/// ```
pub fn parse_node(schema: Schema, node: &Value) -> Result<DependencyRecord, serde_json::Error> {
    let record: DependencyRecord = match schema {
        Schema::Legacy => LegacyLsNode::deserialize(node)?.into(),
        Schema::Modern => ModernLsNode::deserialize(node)?.into(),
    };
    Ok(record)
}

/// Returns true for the `{}` nodes npm emits for optional dependencies that
/// were never installed.
pub fn is_empty_node(node: &Value) -> bool {
    node.as_object().is_some_and(|map| map.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_modern_node() {
        let node = json!({
            "version": "4.17.21",
            "resolved": "https://registry.npmjs.org/lodash/-/lodash-4.17.21.tgz",
            "name": "lodash",
            "integrity": "sha512-abc",
            "dev": true,
            "inBundle": false,
            "dependencies": {}
        });

        let record = parse_node(Schema::Modern, &node).unwrap();
        assert_eq!(record.name, "lodash");
        assert_eq!(record.version, "4.17.21");
        assert_eq!(record.integrity, "sha512-abc");
        assert!(record.dev);
        assert!(!record.in_bundle);
        assert!(!record.peer_missing);
        assert!(record.problems.is_empty());
    }

    #[test]
    fn test_modern_unresolved_peer() {
        let node = json!({
            "required": "^18.0.0",
            "missing": true,
            "problems": ["missing: react@^18.0.0, required by my-lib@1.0.0"]
        });

        let record = parse_node(Schema::Modern, &node).unwrap();
        assert!(record.version.is_empty());
        assert!(record.missing);
        assert_eq!(record.problems.len(), 1);
        assert!(record.is_unresolved());
    }

    #[test]
    fn test_legacy_underscore_fields() {
        let node = json!({
            "name": "fsevents",
            "version": "1.2.13",
            "_integrity": "sha512-legacy",
            "_inBundle": true,
            "_development": true,
            "_optional": true
        });

        let record = parse_node(Schema::Legacy, &node).unwrap();
        assert_eq!(record.integrity, "sha512-legacy");
        assert!(record.in_bundle);
        assert!(record.dev);
        assert!(record.optional);
    }

    #[test]
    fn test_legacy_optional_is_either_flag() {
        let top = json!({"name": "a", "version": "1.0.0", "optional": true});
        assert!(parse_node(Schema::Legacy, &top).unwrap().optional);

        let neither = json!({"name": "a", "version": "1.0.0"});
        assert!(!parse_node(Schema::Legacy, &neither).unwrap().optional);
    }

    #[test]
    fn test_legacy_ignores_modern_field_names() {
        let node = json!({"name": "a", "version": "1.0.0", "integrity": "sha512-x", "dev": true});
        let record = parse_node(Schema::Legacy, &node).unwrap();
        assert!(record.integrity.is_empty());
        assert!(!record.dev);
    }

    #[test]
    fn test_peer_missing_marker_presence() {
        let object = json!({"name": "a", "version": "", "peerMissing": {"requiredBy": "b"}});
        assert!(parse_node(Schema::Legacy, &object).unwrap().peer_missing);

        let flag = json!({"name": "a", "version": "", "peerMissing": false});
        assert!(parse_node(Schema::Legacy, &flag).unwrap().peer_missing);

        let null = json!({"name": "a", "version": "1.0.0", "peerMissing": null});
        assert!(!parse_node(Schema::Modern, &null).unwrap().peer_missing);
    }

    #[test]
    fn test_null_fields_read_as_defaults() {
        let node = json!({
            "name": "a",
            "version": "1.0.0",
            "integrity": null,
            "inBundle": null,
            "dev": null,
            "optional": null,
            "missing": null,
            "problems": null
        });
        let record = parse_node(Schema::Modern, &node).unwrap();
        assert_eq!(record.id(), "a:1.0.0");
        assert!(record.integrity.is_empty());
        assert!(!record.dev);
        assert!(record.problems.is_empty());
        assert!(!record.is_unresolved());

        let node = json!({
            "name": null,
            "version": "2.0.0",
            "_integrity": null,
            "_inBundle": null,
            "_development": null,
            "_optional": null,
            "optional": null,
            "missing": null
        });
        let record = parse_node(Schema::Legacy, &node).unwrap();
        assert!(record.name.is_empty());
        assert_eq!(record.version, "2.0.0");
        assert!(record.integrity.is_empty());
        assert!(!record.in_bundle);
        assert!(!record.optional);
    }

    #[test]
    fn test_type_mismatch_is_error() {
        let node = json!({"name": "a", "version": 1});
        assert!(parse_node(Schema::Modern, &node).is_err());

        let node = json!({"name": "a", "version": "1.0.0", "_inBundle": "yes"});
        assert!(parse_node(Schema::Legacy, &node).is_err());
    }

    #[test]
    fn test_is_empty_node() {
        assert!(is_empty_node(&json!({})));
        assert!(!is_empty_node(&json!({"version": "1.0.0"})));
        assert!(!is_empty_node(&json!([])));
    }
}
