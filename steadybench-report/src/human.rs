//! Human-readable Output
//!
//! Renders successful combinations as an aligned score table, one line per
//! combination with a column per parameter axis, followed by a list of the
//! combinations that failed or were skipped.
//!
//! ```text
//! Benchmark  (numPuts)  (mapType)  Mode  Cnt    Score     Error  Units
//! put              100    hashMap  avgt   10  812.402 ±  31.877  ns/op
//! ```

use crate::report::{EntryStatus, Report, ReportEntry};

fn axis_names<'a>(entries: impl IntoIterator<Item = &'a ReportEntry>) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for entry in entries {
        for (axis, _) in entry.params.iter() {
            if !names.iter().any(|n| n == axis) {
                names.push(axis.to_string());
            }
        }
    }
    names
}

fn format_value(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        format!("{value:.3}")
    }
}

/// Format a report for terminal display
pub fn generate_human_report(report: &Report) -> String {
    let mut output = String::new();
    let passed: Vec<&ReportEntry> = report
        .results
        .iter()
        .filter(|e| e.status == EntryStatus::Passed)
        .collect();

    if !passed.is_empty() {
        let axes = axis_names(passed.iter().copied());

        let mut header: Vec<String> = vec!["Benchmark".to_string()];
        header.extend(axes.iter().map(|a| format!("({a})")));
        header.extend(["Mode", "Cnt", "Score", "", "Error", "Units"].map(String::from));

        let mut rows: Vec<Vec<String>> = Vec::with_capacity(passed.len());
        for entry in &passed {
            let Some(metrics) = &entry.metrics else {
                continue;
            };
            let mut row = vec![entry.benchmark.clone()];
            for axis in &axes {
                row.push(entry.params.get(axis).unwrap_or("").to_string());
            }
            let error = format_value(metrics.error);
            row.push(metrics.mode.to_string());
            row.push(metrics.samples.to_string());
            row.push(format_value(metrics.score));
            row.push(if error.is_empty() { String::new() } else { "±".to_string() });
            row.push(error);
            row.push(format!("{}/op", metrics.unit));
            rows.push(row);
        }

        let mut widths: Vec<usize> = header.iter().map(|h| h.chars().count()).collect();
        for row in &rows {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.chars().count());
            }
        }

        let render = |cells: &[String]| -> String {
            let mut line = String::new();
            for (i, cell) in cells.iter().enumerate() {
                if i > 0 {
                    line.push_str("  ");
                }
                let pad = widths[i] - cell.chars().count();
                if i == 0 || i == cells.len() - 1 {
                    line.push_str(cell);
                    line.push_str(&" ".repeat(pad));
                } else {
                    line.push_str(&" ".repeat(pad));
                    line.push_str(cell);
                }
            }
            line.trim_end().to_string()
        };

        output.push_str(&render(&header));
        output.push('\n');
        for row in &rows {
            output.push_str(&render(row));
            output.push('\n');
        }
    }

    let failures: Vec<&ReportEntry> = report
        .results
        .iter()
        .filter(|e| e.status != EntryStatus::Passed)
        .collect();
    if !failures.is_empty() {
        if !output.is_empty() {
            output.push('\n');
        }
        output.push_str("Failures:\n");
        for entry in failures {
            let (kind, message) = entry
                .failure
                .as_ref()
                .map(|f| (f.kind.as_str(), f.message.as_str()))
                .unwrap_or(("unknown", ""));
            output.push_str(&format!(
                "  {} {}  [{kind}] {message}\n",
                entry.benchmark, entry.params
            ));
        }
    }

    let s = &report.summary;
    output.push_str(&format!(
        "\n{} combinations: {} passed, {} failed, {} skipped ({:.1} s)\n",
        s.total,
        s.passed,
        s.failed,
        s.skipped,
        s.total_duration_ms / 1000.0
    ));
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::tests::sample_report;

    #[test]
    fn test_table_layout() {
        let text = generate_human_report(&sample_report());
        let mut lines = text.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("Benchmark"));
        assert!(header.contains("(numPuts)"));
        assert!(header.contains("(mapType)"));
        assert!(header.ends_with("Units"));

        let row = lines.next().unwrap();
        assert!(row.starts_with("put"));
        assert!(row.contains("hashMap"));
        assert!(row.contains("avgt"));
        assert!(row.contains("100.000"));
        assert!(row.contains('±'));
        assert!(row.ends_with("ns/op"));
    }

    #[test]
    fn test_failures_listed() {
        let text = generate_human_report(&sample_report());
        assert!(text.contains("Failures:"));
        assert!(text.contains("[crashed] worker exited with signal 9"));
        assert!(text.contains("[skipped] timed out after 1s"));
        assert!(text.contains("3 combinations: 1 passed, 1 failed, 1 skipped"));
    }

    #[test]
    fn test_single_sample_has_no_error_column_value() {
        assert_eq!(format_value(f64::NAN), "");
        assert_eq!(format_value(1.23456), "1.235");
    }
}
