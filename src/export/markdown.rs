//! Markdown export implementation.
//!
//! Exports an extraction report in Markdown format for documentation and reporting.

use super::Exporter;
use crate::extract::DependencyReport;
use std::io::{self, Write};

/// Markdown exporter implementation.
pub struct MarkdownExporter;

impl Exporter for MarkdownExporter {
    fn export<W: Write>(&self, report: &DependencyReport, writer: &mut W) -> io::Result<()> {
        // Title
        writeln!(writer, "# Build-Info Dependencies")?;
        writeln!(writer)?;
        writeln!(writer, "**Module:** {}", report.module_id)?;
        writeln!(writer)?;

        // Summary section
        let dev_count = report
            .dependencies
            .iter()
            .filter(|d| d.scopes.iter().any(|s| s == "dev"))
            .count();
        let with_checksums = report
            .dependencies
            .iter()
            .filter(|d| d.checksums.is_some())
            .count();

        writeln!(writer, "## Summary")?;
        writeln!(writer)?;
        writeln!(writer, "| Metric | Count |")?;
        writeln!(writer, "|--------|-------|")?;
        writeln!(
            writer,
            "| Recorded Dependencies | {} |",
            report.dependencies.len()
        )?;
        writeln!(writer, "| Development | {} |", dev_count)?;
        writeln!(writer, "| With Checksums | {} |", with_checksums)?;
        writeln!(writer, "| Skipped | {} |", report.skipped.len())?;
        writeln!(writer)?;

        // Dependencies
        if !report.dependencies.is_empty() {
            writeln!(writer, "## Dependencies")?;
            writeln!(writer)?;
            writeln!(writer, "| Package | Scopes | Requested By | SHA-1 |")?;
            writeln!(writer, "|---------|--------|--------------|-------|")?;
            for dep in &report.dependencies {
                let requested_by = dep
                    .requested_by
                    .iter()
                    .map(|path| path.join(" > "))
                    .collect::<Vec<_>>()
                    .join("<br>");
                let sha1 = dep.checksums.as_ref().map_or("-", |c| c.sha1.as_str());
                writeln!(
                    writer,
                    "| {} | {} | {} | {} |",
                    dep.id,
                    dep.scopes.join(", "),
                    requested_by,
                    sha1
                )?;
            }
            writeln!(writer)?;
        }

        // Skipped dependencies
        if !report.skipped.is_empty() {
            writeln!(writer, "## Skipped")?;
            writeln!(writer)?;
            for (reason, ids) in report.skipped.iter() {
                writeln!(writer, "### {} ({})", capitalize(&reason.to_string()), ids.len())?;
                writeln!(writer)?;
                for id in ids {
                    writeln!(writer, "- `{}`", id)?;
                }
                writeln!(writer)?;
            }
        }

        // Footer
        writeln!(writer, "---")?;
        writeln!(writer, "*Generated by npm-buildinfo*")?;

        Ok(())
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::DependencyMap;
    use crate::parser::{DependencyRecord, SkipReason};

    fn create_test_report() -> DependencyReport {
        let mut map = DependencyMap::new();
        let lodash = DependencyRecord {
            name: "lodash".to_string(),
            version: "4.17.21".to_string(),
            ..Default::default()
        };
        map.insert(lodash.clone(), vec!["app:1.0.0".to_string()]);
        map.insert(
            lodash,
            vec!["async:3.2.4".to_string(), "app:1.0.0".to_string()],
        );

        DependencyReport {
            module_id: "app:1.0.0".to_string(),
            dependencies: map.into_dependencies().collect(),
            ..Default::default()
        }
    }

    fn render(report: &DependencyReport) -> String {
        let mut output = Vec::new();
        MarkdownExporter.export(report, &mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_markdown_export_basic() {
        let md_str = render(&create_test_report());

        assert!(md_str.contains("# Build-Info Dependencies"));
        assert!(md_str.contains("**Module:** app:1.0.0"));
        assert!(md_str.contains("| Recorded Dependencies | 1 |"));
        assert!(md_str.contains("| lodash:4.17.21 | prod | app:1.0.0<br>async:3.2.4 > app:1.0.0 | - |"));
        assert!(!md_str.contains("## Skipped"));
    }

    #[test]
    fn test_markdown_export_skipped() {
        let mut report = create_test_report();
        report
            .skipped
            .push(SkipReason::MissingPeer, "react:".to_string());

        let md_str = render(&report);
        assert!(md_str.contains("## Skipped"));
        assert!(md_str.contains("### Missing peer dependency (1)"));
        assert!(md_str.contains("- `react:`"));
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("missing"), "Missing");
        assert_eq!(capitalize(""), "");
    }
}
