//! Run Report
//!
//! Aggregated outcome of one script, in the shape front ends render.

use std::fmt::Write as _;

use serde::Serialize;

use crate::validation::engine::ValidationResult;

/// Overall outcome of validating one script
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    /// True when every statement is valid
    pub success: bool,
    pub total_queries: usize,
    pub valid_queries: usize,
    pub results: Vec<ValidationResult>,
}

impl ValidationReport {
    pub fn new(results: Vec<ValidationResult>) -> Self {
        let valid_queries = results.iter().filter(|r| r.is_valid()).count();

        Self {
            success: valid_queries == results.len(),
            total_queries: results.len(),
            valid_queries,
            results,
        }
    }

    /// Results that failed validation
    pub fn failures(&self) -> impl Iterator<Item = &ValidationResult> {
        self.results.iter().filter(|r| !r.is_valid())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Human-readable listing, one line per statement plus a summary
    pub fn render_text(&self) -> String {
        let mut out = String::new();

        for result in &self.results {
            let first_line = result.query().lines().next().unwrap_or("");
            match result.error() {
                None => {
                    let _ = writeln!(out, "{:>5}  ok     {}", result.line_number(), first_line);
                }
                Some(error) => {
                    let _ = writeln!(out, "{:>5}  error  {}", result.line_number(), first_line);
                    let _ = writeln!(out, "       {}", error);
                }
            }
        }

        let _ = writeln!(
            out,
            "{} of {} statements valid",
            self.valid_queries, self.total_queries
        );
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_and_success() {
        let report = ValidationReport::new(vec![
            ValidationResult::ok("SELECT 1", 1),
            ValidationResult::failed("SELEC 2", 2, "line 1:0 bad"),
        ]);

        assert!(!report.success);
        assert_eq!(report.total_queries, 2);
        assert_eq!(report.valid_queries, 1);
        assert_eq!(report.failures().count(), 1);
    }

    #[test]
    fn test_empty_report_is_successful() {
        let report = ValidationReport::new(Vec::new());
        assert!(report.success);
        assert_eq!(report.total_queries, 0);
    }

    #[test]
    fn test_json_omits_error_for_valid_results() {
        let report = ValidationReport::new(vec![
            ValidationResult::ok("SELECT 1", 1),
            ValidationResult::failed("SELEC 2", 2, "line 1:0 bad"),
        ]);
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(value["success"], false);
        assert_eq!(value["totalQueries"], 2);
        assert_eq!(value["validQueries"], 1);
        assert_eq!(value["results"][0]["lineNumber"], 1);
        assert!(value["results"][0].get("error").is_none());
        assert_eq!(value["results"][1]["error"], "line 1:0 bad");
    }

    #[test]
    fn test_render_text() {
        let report = ValidationReport::new(vec![ValidationResult::failed(
            "SELEC 2\nFROM t",
            4,
            "line 1:0 bad",
        )]);
        let text = report.render_text();

        assert!(text.contains("    4  error  SELEC 2"));
        assert!(text.contains("line 1:0 bad"));
        assert!(text.ends_with("0 of 1 statements valid\n"));
    }
}
