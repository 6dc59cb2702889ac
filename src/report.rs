//! Periodic statistics reports.
//!
//! `Report::collect` only reads target histories and returns plain data;
//! `Report::render` turns it into the two console tables.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::time::Duration;

use crate::store::{Target, WindowStats};

/// Window statistics for one target.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetReport {
    pub url: String,
    pub stats: WindowStats,
}

impl TargetReport {
    /// Number of samples behind the status code histogram.
    pub fn total(&self) -> usize {
        self.stats.response_codes.values().sum()
    }
}

/// Statistics of every target over the same window.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub window: Duration,
    pub at: DateTime<Utc>,
    pub targets: Vec<TargetReport>,
}

impl Report {
    pub fn collect(targets: &[Target], window: Duration, at: DateTime<Utc>) -> Self {
        Self {
            window,
            at,
            targets: targets
                .iter()
                .map(|t| TargetReport {
                    url: t.url.clone(),
                    stats: t.samples.stats(window, at),
                })
                .collect(),
        }
    }

    /// Every status code seen by any target, ascending.
    pub fn codes(&self) -> BTreeSet<i32> {
        self.targets
            .iter()
            .flat_map(|t| t.stats.response_codes.keys().copied())
            .collect()
    }

    /// Samples across all targets.
    pub fn total(&self) -> usize {
        self.targets.iter().map(TargetReport::total).sum()
    }

    /// Occurrences of `code` across all targets.
    pub fn code_total(&self, code: i32) -> usize {
        self.targets
            .iter()
            .filter_map(|t| t.stats.response_codes.get(&code))
            .sum()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Statistics for last {} seconds.", self.window.as_secs());
        out.push_str(&self.summary_table());
        out.push('\n');
        out.push_str(&self.codes_table());
        out.push('\n');
        out
    }

    fn summary_table(&self) -> String {
        let headers = [
            "Website (number of measures)",
            "Availability (%)",
            "Avg response time (sec)",
            "Max response time (sec)",
        ];
        let rows: Vec<Vec<String>> = self
            .targets
            .iter()
            .map(|t| {
                vec![
                    format!("{} ({})", t.url, t.stats.count),
                    format!("{:.2}", t.stats.availability * 100.0),
                    format_seconds(t.stats.avg_response_time),
                    format_seconds(t.stats.max_response_time),
                ]
            })
            .collect();
        render_table(&headers, &rows)
    }

    fn codes_table(&self) -> String {
        let codes = self.codes();
        let code_names: Vec<String> = codes.iter().map(|c| c.to_string()).collect();
        let mut headers = vec!["Website"];
        headers.extend(code_names.iter().map(String::as_str));
        headers.push("Total");

        let mut rows: Vec<Vec<String>> = self
            .targets
            .iter()
            .map(|t| {
                let mut row = vec![t.url.clone()];
                row.extend(codes.iter().map(|c| {
                    let n = t.stats.response_codes.get(c).copied().unwrap_or(0);
                    n.to_string()
                }));
                row.push(t.total().to_string());
                row
            })
            .collect();

        let mut totals = vec!["Total".to_string()];
        totals.extend(codes.iter().map(|&c| self.code_total(c).to_string()));
        totals.push(self.total().to_string());
        rows.push(totals);

        render_table(&headers, &rows)
    }
}

fn format_seconds(value: Option<f64>) -> String {
    match value {
        Some(secs) => format!("{:.3}", secs),
        None => "-1".to_string(),
    }
}

/// Org-mode style table. The first column is left aligned, the rest right
/// aligned.
fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in rows {
        for (w, cell) in widths.iter_mut().zip(row) {
            *w = (*w).max(cell.len());
        }
    }

    let mut out = table_line(headers, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(w + 2)).collect();
    out.push_str(&format!("|{}|\n", rule.join("+")));
    for row in rows {
        let cells: Vec<&str> = row.iter().map(String::as_str).collect();
        out.push_str(&table_line(&cells, &widths));
    }
    out
}

fn table_line(cells: &[&str], widths: &[usize]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(i, (cell, &w))| {
            if i == 0 {
                format!("{:<w$}", cell)
            } else {
                format!("{:>w$}", cell)
            }
        })
        .collect();
    format!("| {} |\n", padded.join(" | "))
}
