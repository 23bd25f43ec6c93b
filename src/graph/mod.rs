//! Graph module for dependency tree reduction.
//!
//! This module provides the [`DependencyMap`] that flattens the nested
//! `npm ls` tree into one [`CanonicalDependency`] per `name:version`,
//! remembering every path through which each one was required.
//!
//! # Example
//!
//! ```rust
//! use npm_buildinfo::graph::DependencyMap;
//! use npm_buildinfo::parser::DependencyRecord;
//!
//! let react = DependencyRecord {
//!     name: "react".to_string(),
//!     version: "18.2.0".to_string(),
//!     ..Default::default()
//! };
//!
//! let mut map = DependencyMap::new();
//! map.insert(react.clone(), vec!["my-app:1.0.0".to_string()]);
//! map.insert(react, vec!["react-dom:18.2.0".to_string(), "my-app:1.0.0".to_string()]);
//!
//! assert_eq!(map.len(), 1);
//! assert_eq!(map.get("react:18.2.0").unwrap().requested_by.len(), 2);
//! ```

mod dependency_map;

pub use dependency_map::{CanonicalDependency, DependencyMap};
