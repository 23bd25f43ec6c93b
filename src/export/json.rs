//! JSON export implementation.
//!
//! Writes the build-info dependency payload: one object per recorded
//! dependency, plus the skipped ids grouped by reason.

use super::Exporter;
use crate::extract::{DependencyReport, SkippedDependencies};
use crate::graph::CanonicalDependency;
use serde::Serialize;
use std::io::{self, Write};

/// JSON exporter implementation.
pub struct JsonExporter;

/// Root JSON export structure.
#[derive(Serialize)]
struct JsonExport<'a> {
    module: &'a str,
    dependencies: &'a [CanonicalDependency],
    #[serde(skip_serializing_if = "nothing_skipped")]
    skipped: &'a SkippedDependencies,
}

fn nothing_skipped(skipped: &&SkippedDependencies) -> bool {
    skipped.is_empty()
}

impl Exporter for JsonExporter {
    fn export<W: Write>(&self, report: &DependencyReport, writer: &mut W) -> io::Result<()> {
        let export = JsonExport {
            module: &report.module_id,
            dependencies: &report.dependencies,
            skipped: &report.skipped,
        };

        let json = serde_json::to_string_pretty(&export)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        writeln!(writer, "{}", json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checksum::Checksums;
    use crate::graph::DependencyMap;
    use crate::parser::{DependencyRecord, SkipReason};

    fn create_test_report() -> DependencyReport {
        let mut map = DependencyMap::new();
        map.insert(
            DependencyRecord {
                name: "react".to_string(),
                version: "18.2.0".to_string(),
                ..Default::default()
            },
            vec!["app:1.0.0".to_string()],
        );
        map.insert(
            DependencyRecord {
                name: "jest".to_string(),
                version: "29.0.0".to_string(),
                dev: true,
                ..Default::default()
            },
            vec!["app:1.0.0".to_string()],
        );

        let mut dependencies: Vec<_> = map.into_dependencies().collect();
        dependencies[0].checksums = Some(Checksums {
            md5: "m".to_string(),
            sha1: "s1".to_string(),
            sha256: "s256".to_string(),
        });

        DependencyReport {
            module_id: "app:1.0.0".to_string(),
            dependencies,
            skipped: SkippedDependencies::default(),
        }
    }

    fn export_value(report: &DependencyReport) -> serde_json::Value {
        let mut output = Vec::new();
        JsonExporter.export(report, &mut output).unwrap();
        serde_json::from_slice(&output).unwrap()
    }

    #[test]
    fn test_json_export_basic() {
        let parsed = export_value(&create_test_report());

        assert_eq!(parsed["module"], "app:1.0.0");
        assert_eq!(parsed["dependencies"].as_array().unwrap().len(), 2);
        assert!(parsed.get("skipped").is_none());
    }

    #[test]
    fn test_json_export_dependency_fields() {
        let parsed = export_value(&create_test_report());

        let react = &parsed["dependencies"][0];
        assert_eq!(react["id"], "react:18.2.0");
        assert_eq!(react["scopes"][0], "prod");
        assert_eq!(react["requestedBy"][0][0], "app:1.0.0");
        assert_eq!(react["md5"], "m");
        assert_eq!(react["sha1"], "s1");
        assert_eq!(react["sha256"], "s256");

        let jest = &parsed["dependencies"][1];
        assert_eq!(jest["scopes"][0], "dev");
        assert!(jest.get("sha1").is_none());
    }

    #[test]
    fn test_json_export_skipped() {
        let mut report = create_test_report();
        report
            .skipped
            .push(SkipReason::MissingOptional, "fsevents:2.3.2".to_string());

        let parsed = export_value(&report);
        assert_eq!(
            parsed["skipped"]["optionalDependencies"][0],
            "fsevents:2.3.2"
        );
        assert!(parsed["skipped"].get("peerDependencies").is_none());
    }
}
