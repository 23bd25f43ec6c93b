//! Parser module for npm-buildinfo.
//!
//! This module decodes the two inputs the extraction starts from:
//!
//! - **`npm ls --json --all --long` nodes** - in either the npm 6 (legacy) or
//!   npm 7+ (modern) shape, normalized into [`DependencyRecord`]
//! - **package.json** - the module's own identity, see [`PackageInfo`]
//!
//! # Example
//!
//! ```
//! use npm_buildinfo::parser::{parse_node, Schema};
//! use semver::Version;
//! use serde_json::json;
//!
//! let schema = Schema::for_npm(&Version::new(9, 6, 7));
//! let node = json!({"name": "react", "version": "18.2.0", "integrity": "sha512-abc"});
//! let record = parse_node(schema, &node).unwrap();
//!
//! assert_eq!(record.id(), "react:18.2.0");
//! assert_eq!(record.scopes(), vec!["prod"]);
//! ```

pub mod ls_node;
pub mod package_json;
pub mod types;

// Re-export commonly used types for convenience
pub use ls_node::{is_empty_node, parse_node};
pub use package_json::{read_package_info, PackageInfo, ParseError, ParseResult};
pub use types::{DependencyRecord, Schema, SkipReason, MODERN_NPM_MAJOR};
