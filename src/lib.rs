//! npm-buildinfo - flattened, checksummed npm dependency lists for build-info records
//!
//! This crate reduces the nested `npm ls --json --all --long` tree of an npm
//! project into one entry per `name:version`, annotated with scopes, the
//! paths that required it, and checksums of the tarball in npm's cache.

pub mod cache;
pub mod checksum;
pub mod error;
pub mod export;
pub mod extract;
pub mod graph;
pub mod npm;
pub mod parser;

pub use error::{ExtractError, Result};
pub use extract::{calculate_dependencies_list, DependencyReport, ExtractOptions};
