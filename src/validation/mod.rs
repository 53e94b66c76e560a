//! Validation Orchestration
//!
//! Hands split statements to a grammar validator and aggregates the results.

pub mod engine;
pub mod grammar;
pub mod report;

pub use engine::{INCOMPLETE_ROUTINE, Orchestrator, QueryEntry, ValidationResult};
pub use grammar::{
    Dialect, GrammarValidator, SqlParserValidator, SyntaxDiagnostic, ValidatorError,
    join_diagnostics,
};
pub use report::ValidationReport;
