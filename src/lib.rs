//! SQL Script Validator
//!
//! Splits multi-statement SQL scripts into individual statements and checks
//! each one with a pluggable grammar validator.
//!
//! This library provides:
//! - A streaming statement splitter aware of `DELIMITER`, comments and
//!   stored routine bodies
//! - A validation orchestrator producing per-statement results
//! - A `sqlparser`-backed grammar validator
//! - Configuration and the `sqlcheck` command-line front end

pub mod cli;
pub mod config;
pub mod splitter;
pub mod validation;

// Re-exports for clean public API
pub use config::Config;
pub use splitter::{Statement, StatementKind, split};
pub use validation::{
    GrammarValidator, Orchestrator, SqlParserValidator, SyntaxDiagnostic, ValidationReport,
    ValidationResult,
};
