//! CSV Output
//!
//! One line per combination with a `Param: <axis>` column per axis and a
//! status column.

use crate::report::{Report, ReportEntry};

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

fn number(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else {
        format!("{value:.6}")
    }
}

/// Generate a CSV report
pub fn generate_csv_report(report: &Report) -> String {
    let mut axes: Vec<&str> = Vec::new();
    for entry in &report.results {
        for (axis, _) in entry.params.iter() {
            if !axes.contains(&axis) {
                axes.push(axis);
            }
        }
    }

    let confidence = report.meta.config.confidence_level;
    let mut header = vec![
        quote("Benchmark"),
        quote("Mode"),
        quote("Status"),
        quote("Samples"),
        quote("Score"),
        quote(&format!(
            "Score Error ({}%)",
            (confidence * 1000.0).round() / 10.0
        )),
        quote("Unit"),
    ];
    header.extend(axes.iter().map(|a| quote(&format!("Param: {a}"))));

    let mut output = header.join(",");
    output.push('\n');

    for entry in &report.results {
        output.push_str(&line(entry, &axes).join(","));
        output.push('\n');
    }
    output
}

fn line(entry: &ReportEntry, axes: &[&str]) -> Vec<String> {
    let status = serde_json::to_value(entry.status)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();

    let mut fields = vec![quote(&entry.benchmark)];
    match &entry.metrics {
        Some(m) => {
            fields.push(quote(&m.mode.to_string()));
            fields.push(quote(&status));
            fields.push(m.samples.to_string());
            fields.push(number(m.score));
            fields.push(number(m.error));
            fields.push(quote(&format!("{}/op", m.unit)));
        }
        None => {
            fields.push(quote("avgt"));
            fields.push(quote(&status));
            fields.extend(["0", "", "", "\"\""].map(String::from));
        }
    }
    for axis in axes {
        fields.push(quote(entry.params.get(axis).unwrap_or("")));
    }
    fields
}
