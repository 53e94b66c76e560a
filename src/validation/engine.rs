//! Validation Orchestrator
//!
//! Walks statements in order, skips what must not be grammar-checked,
//! and calls the grammar validator once per statement or routine body.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use serde::Serialize;

use crate::splitter::{self, DEFAULT_DELIMITER, Statement, StatementKind, patterns};
use crate::validation::grammar::{GrammarValidator, ValidatorError, join_diagnostics};
use crate::validation::report::ValidationReport;

/// Error reported for a routine body still open at end of input
pub const INCOMPLETE_ROUTINE: &str = "Incomplete procedure definition";

/// Outcome for one statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    line_number: usize,
    query: String,
    valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ValidationResult {
    pub fn ok(query: impl Into<String>, line_number: usize) -> Self {
        Self {
            line_number,
            query: query.into(),
            valid: true,
            error: None,
        }
    }

    pub fn failed(query: impl Into<String>, line_number: usize, error: impl Into<String>) -> Self {
        Self {
            line_number,
            query: query.into(),
            valid: false,
            error: Some(error.into()),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// Present if and only if the result is invalid
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn line_number(&self) -> usize {
        self.line_number
    }
}

/// A raw query string with the line it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryEntry {
    pub text: String,
    pub line: usize,
}

impl QueryEntry {
    pub fn new(text: impl Into<String>, line: usize) -> Self {
        Self {
            text: text.into(),
            line,
        }
    }

    /// Number queries by their 1-based position
    pub fn numbered<I, S>(queries: I) -> Vec<QueryEntry>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        queries
            .into_iter()
            .enumerate()
            .map(|(idx, text)| QueryEntry::new(text, idx + 1))
            .collect()
    }
}

#[derive(Debug)]
struct PendingRoutine {
    start_line: usize,
    text: String,
}

/// State carried across statements of one run
#[derive(Debug)]
struct Run {
    delimiter: String,
    routine: Option<PendingRoutine>,
    results: Vec<ValidationResult>,
}

impl Run {
    fn new() -> Self {
        Self {
            delimiter: DEFAULT_DELIMITER.to_string(),
            routine: None,
            results: Vec::new(),
        }
    }

    /// Directives are never grammar-checked
    fn directive(&mut self, text: &str, line: usize) {
        if let Some(token) = patterns::delimiter_directive(text) {
            self.delimiter = token.to_string();
        }
        self.results.push(ValidationResult::ok(text, line));
    }

    fn open_routine(&mut self, text: &str, start_line: usize) {
        self.abandon_routine();
        self.routine = Some(PendingRoutine {
            start_line,
            text: text.to_string(),
        });
    }

    fn abandon_routine(&mut self) {
        if let Some(routine) = self.routine.take() {
            log::debug!(
                "routine body from line {} ended without its closing END",
                routine.start_line
            );
            self.results.push(ValidationResult::failed(
                routine.text,
                routine.start_line,
                INCOMPLETE_ROUTINE,
            ));
        }
    }

    fn finish(mut self) -> Vec<ValidationResult> {
        self.abandon_routine();
        self.results
    }
}

/// Drives a [`GrammarValidator`] over the statements of a script
#[derive(Debug, Clone)]
pub struct Orchestrator<V> {
    validator: V,
}

impl<V: GrammarValidator> Orchestrator<V> {
    pub fn new(validator: V) -> Self {
        Self { validator }
    }

    pub fn validator(&self) -> &V {
        &self.validator
    }

    /// Split a script and validate every statement
    pub fn validate_script(&self, script: &str) -> Vec<ValidationResult> {
        self.validate_statements(splitter::split(script))
    }

    /// Split and validate a script, aggregated into a report
    pub fn report_script(&self, script: &str) -> ValidationReport {
        ValidationReport::new(self.validate_script(script))
    }

    /// Validate statements produced by the splitter, trusting their kind
    pub fn validate_statements<I>(&self, statements: I) -> Vec<ValidationResult>
    where
        I: IntoIterator<Item = Statement>,
    {
        let mut run = Run::new();

        for statement in statements {
            if statement.text.trim().is_empty() {
                continue;
            }

            match statement.kind {
                StatementKind::DelimiterDirective => {
                    run.directive(&statement.text, statement.start_line);
                }
                StatementKind::RoutineBody if !statement.is_terminated() => {
                    run.open_routine(&statement.text, statement.start_line);
                }
                StatementKind::Ordinary | StatementKind::RoutineBody => {
                    run.abandon_routine();
                    let result =
                        self.check(&statement.text, &statement.text, statement.start_line);
                    run.results.push(result);
                }
            }
        }

        run.finish()
    }

    /// Validate pre-split query strings.
    ///
    /// Routine bodies spread over several entries are accumulated until an
    /// entry ends with the active delimiter and contains `END`, then
    /// validated once at the line where the routine started.
    pub fn validate_queries(&self, entries: &[QueryEntry]) -> Vec<ValidationResult> {
        let mut run = Run::new();

        for entry in entries {
            let query = entry.text.trim();
            if query.is_empty() {
                continue;
            }

            if patterns::delimiter_directive(query).is_some() {
                run.directive(query, entry.line);
                continue;
            }

            if let Some(routine) = run.routine.as_mut() {
                routine.text.push('\n');
                routine.text.push_str(query);

                let closes = query
                    .strip_suffix(run.delimiter.as_str())
                    .is_some_and(patterns::contains_end_keyword);

                if closes && let Some(routine) = run.routine.take() {
                    let body = patterns::strip_delimiter(&routine.text, &run.delimiter);
                    let result = self.check(body, &routine.text, routine.start_line);
                    run.results.push(result);
                }
                continue;
            }

            if patterns::starts_routine(query) && !query.ends_with(run.delimiter.as_str()) {
                run.open_routine(query, entry.line);
                continue;
            }

            let statement = patterns::strip_delimiter(query, &run.delimiter);
            let result = self.check(statement, query, entry.line);
            run.results.push(result);
        }

        run.finish()
    }

    /// Run the validator on one statement; never lets a failure escape
    fn check(&self, statement: &str, query: &str, line: usize) -> ValidationResult {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| self.validator.validate(statement)));

        match outcome {
            Ok(Ok(diagnostics)) if diagnostics.is_empty() => ValidationResult::ok(query, line),
            Ok(Ok(diagnostics)) => {
                ValidationResult::failed(query, line, join_diagnostics(&diagnostics))
            }
            Ok(Err(err @ ValidatorError::Cancelled(_))) => {
                log::warn!("line {}: validator cancelled: {}", line, err);
                ValidationResult::failed(query, line, err.to_string())
            }
            Ok(Err(err)) => {
                log::warn!("line {}: validator failed: {}", line, err);
                ValidationResult::failed(query, line, format!("Unexpected error: {}", err))
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                log::warn!("line {}: validator panicked: {}", line, message);
                ValidationResult::failed(query, line, format!("Unexpected error: {}", message))
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "validator panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::grammar::SyntaxDiagnostic;

    fn accept_all(_: &str) -> Result<Vec<SyntaxDiagnostic>, ValidatorError> {
        Ok(Vec::new())
    }

    #[test]
    fn test_result_error_present_only_when_invalid() {
        let ok = ValidationResult::ok("SELECT 1", 1);
        assert!(ok.is_valid());
        assert!(ok.error().is_none());

        let failed = ValidationResult::failed("SELEC 1", 2, "line 1:0 bad");
        assert!(!failed.is_valid());
        assert_eq!(failed.error(), Some("line 1:0 bad"));
        assert_eq!(failed.line_number(), 2);
    }

    #[test]
    fn test_numbered_entries() {
        let entries = QueryEntry::numbered(["SELECT 1;", "SELECT 2;"]);
        assert_eq!(entries[0], QueryEntry::new("SELECT 1;", 1));
        assert_eq!(entries[1].line, 2);
    }

    #[test]
    fn test_statement_mode_skips_directives() {
        let calls = std::cell::RefCell::new(Vec::new());
        let validator = |text: &str| -> Result<Vec<SyntaxDiagnostic>, ValidatorError> {
            calls.borrow_mut().push(text.to_string());
            Ok(Vec::new())
        };
        let orchestrator = Orchestrator::new(validator);

        let results = orchestrator
            .validate_script("DELIMITER //\nCREATE PROCEDURE p() BEGIN SELECT 1; END//\nDELIMITER ;");

        assert_eq!(results.len(), 3);
        assert!(results.iter().all(ValidationResult::is_valid));
        assert_eq!(
            calls.borrow().as_slice(),
            ["CREATE PROCEDURE p() BEGIN SELECT 1; END"]
        );
    }

    #[test]
    fn test_incomplete_routine_in_statement_mode() {
        let orchestrator = Orchestrator::new(accept_all);
        let results = orchestrator.validate_script("SELECT 1;\nCREATE PROCEDURE p()\nBEGIN\n  SELECT 2;");

        assert_eq!(results.len(), 2);
        assert!(results[0].is_valid());
        assert!(!results[1].is_valid());
        assert_eq!(results[1].error(), Some(INCOMPLETE_ROUTINE));
        assert_eq!(results[1].line_number(), 2);
    }

    #[test]
    fn test_queries_mode_accumulates_routine() {
        let orchestrator = Orchestrator::new(accept_all);
        let entries = QueryEntry::numbered([
            "DELIMITER //",
            "CREATE PROCEDURE p()",
            "BEGIN",
            "SELECT 1;",
            "END//",
            "DELIMITER ;",
        ]);

        let results = orchestrator.validate_queries(&entries);

        assert_eq!(results.len(), 3);
        assert_eq!(results[1].line_number(), 2);
        assert_eq!(results[1].query(), "CREATE PROCEDURE p()\nBEGIN\nSELECT 1;\nEND//");
        assert_eq!(results[2].query(), "DELIMITER ;");
    }

    #[test]
    fn test_queries_mode_strips_custom_delimiter_before_validation() {
        let seen = std::cell::RefCell::new(Vec::new());
        let validator = |text: &str| -> Result<Vec<SyntaxDiagnostic>, ValidatorError> {
            seen.borrow_mut().push(text.to_string());
            Ok(Vec::new())
        };
        let orchestrator = Orchestrator::new(validator);

        orchestrator.validate_queries(&QueryEntry::numbered(["DELIMITER $$", "SELECT 1$$"]));

        assert_eq!(seen.borrow().as_slice(), ["SELECT 1"]);
    }

    #[test]
    fn test_panicking_validator_is_contained() {
        let validator = |text: &str| -> Result<Vec<SyntaxDiagnostic>, ValidatorError> {
            if text.contains("boom") {
                panic!("engine exploded");
            }
            Ok(Vec::new())
        };
        let orchestrator = Orchestrator::new(validator);

        let results = orchestrator.validate_script("SELECT boom;\nSELECT 2;");

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].error(), Some("Unexpected error: engine exploded"));
        assert!(results[1].is_valid());
    }
}
