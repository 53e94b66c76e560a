//! Grammar Validator Seam
//!
//! The orchestrator never parses SQL itself. It hands statement text to a
//! [`GrammarValidator`] and receives structured diagnostics back. Any engine
//! can plug in; [`SqlParserValidator`] wraps the `sqlparser` crate.

use std::fmt;
use std::sync::LazyLock;

use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlparser::dialect;
use sqlparser::parser::{Parser, ParserError};
use thiserror::Error;

use crate::splitter::patterns;

static LOCATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^(.*?)\s*at Line: (\d+), Column: (\d+)\s*$").expect("location pattern")
});

/// One syntax error reported by a grammar validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyntaxDiagnostic {
    /// 1-based line within the statement text
    pub line: usize,
    /// 0-based column within that line
    pub column: usize,
    pub message: String,
}

impl SyntaxDiagnostic {
    pub fn new(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
        }
    }

    /// Build a diagnostic from a `sqlparser` error message, which carries a
    /// trailing `at Line: L, Column: C` (both 1-based)
    pub fn from_parser_message(message: &str) -> Self {
        match LOCATION_RE.captures(message) {
            Some(caps) => {
                let line = caps[2].parse().unwrap_or(1);
                let column: usize = caps[3].parse().unwrap_or(1);
                Self::new(line, column.saturating_sub(1), caps[1].trim())
            }
            None => Self::new(1, 0, message.trim()),
        }
    }
}

impl fmt::Display for SyntaxDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}:{} {}", self.line, self.column, self.message)
    }
}

/// Join diagnostics into the single message carried by a failed result
pub fn join_diagnostics(diagnostics: &[SyntaxDiagnostic]) -> String {
    diagnostics
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Failure raised outside the normal diagnostic channel
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidatorError {
    /// The engine gave up on the statement (e.g. nesting too deep)
    #[error("parse cancelled: {0}")]
    Cancelled(String),
    /// Anything else that went wrong inside the engine
    #[error("{0}")]
    Internal(String),
}

/// Parse one statement and report its syntax errors
pub trait GrammarValidator {
    /// An empty list means the statement is valid.
    fn validate(&self, statement: &str) -> Result<Vec<SyntaxDiagnostic>, ValidatorError>;
}

impl<F> GrammarValidator for F
where
    F: Fn(&str) -> Result<Vec<SyntaxDiagnostic>, ValidatorError>,
{
    fn validate(&self, statement: &str) -> Result<Vec<SyntaxDiagnostic>, ValidatorError> {
        self(statement)
    }
}

/// SQL dialects understood by [`SqlParserValidator`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// MySQL / MariaDB
    #[default]
    #[value(name = "mysql")]
    MySql,
    Generic,
    #[value(name = "postgres")]
    #[serde(rename = "postgres")]
    PostgreSql,
    Sqlite,
    Ansi,
    #[value(name = "mssql")]
    MsSql,
}

impl Dialect {
    fn to_sqlparser(self) -> Box<dyn dialect::Dialect> {
        match self {
            Dialect::MySql => Box::new(dialect::MySqlDialect {}),
            Dialect::Generic => Box::new(dialect::GenericDialect {}),
            Dialect::PostgreSql => Box::new(dialect::PostgreSqlDialect {}),
            Dialect::Sqlite => Box::new(dialect::SQLiteDialect {}),
            Dialect::Ansi => Box::new(dialect::AnsiDialect {}),
            Dialect::MsSql => Box::new(dialect::MsSqlDialect {}),
        }
    }
}

/// Grammar validator backed by `sqlparser`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SqlParserValidator {
    dialect: Dialect,
}

impl SqlParserValidator {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }
}

impl GrammarValidator for SqlParserValidator {
    fn validate(&self, statement: &str) -> Result<Vec<SyntaxDiagnostic>, ValidatorError> {
        let dialect = self.dialect.to_sqlparser();

        match Parser::parse_sql(dialect.as_ref(), statement) {
            Ok(_) => Ok(Vec::new()),
            Err(ParserError::ParserError(message)) if patterns::starts_routine(statement) => {
                log::debug!("routine definition not parsed ({}); checking structure", message);
                Ok(check_routine(statement))
            }
            Err(ParserError::ParserError(message)) | Err(ParserError::TokenizerError(message)) => {
                Ok(vec![SyntaxDiagnostic::from_parser_message(&message)])
            }
            Err(other) => Err(ValidatorError::Cancelled(other.to_string())),
        }
    }
}

/// Structural check for stored routine definitions.
///
/// `sqlparser` does not parse MySQL compound statements, so a routine it
/// rejects is only required to carry a name and to balance its
/// `BEGIN`/`CASE` blocks against `END`. Comments are skipped.
fn check_routine(statement: &str) -> Vec<SyntaxDiagnostic> {
    let mut diagnostics = Vec::new();

    if patterns::routine_name(statement).is_none() {
        diagnostics.push(SyntaxDiagnostic::new(1, 0, "routine definition has no name"));
    }

    let mut depth = 0usize;
    let mut last_line = 1;
    let mut in_comment = false;

    for (idx, raw) in statement.lines().enumerate() {
        let line_number = idx + 1;
        let mut code = raw.trim();

        if in_comment {
            match patterns::block_comment_close(code) {
                Some(rest) => code = rest,
                None => continue,
            }
        }
        if code.is_empty() || patterns::is_line_comment(code) {
            in_comment = false;
            continue;
        }
        in_comment = patterns::opens_block_comment(code);
        last_line = line_number;

        let balance = patterns::block_balance(&patterns::strip_block_comments(code));
        let open = depth + balance.opened;
        if balance.closed > open {
            diagnostics.push(SyntaxDiagnostic::new(
                line_number,
                0,
                "END without a matching BEGIN",
            ));
            depth = 0;
        } else {
            depth = open - balance.closed;
        }
    }

    if depth > 0 {
        diagnostics.push(SyntaxDiagnostic::new(
            last_line,
            0,
            format!("missing END for {} open block(s)", depth),
        ));
    }

    diagnostics
}
