//! Statement records
//!
//! Plain data emitted by the scanner. No boundary logic lives here.

/// How a statement was classified when the scanner emitted it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    /// A regular statement closed by the active delimiter
    Ordinary,
    /// A `DELIMITER <token>` line
    DelimiterDirective,
    /// A full `CREATE PROCEDURE|FUNCTION|TRIGGER|EVENT` definition
    RoutineBody,
}

/// One unit of script text, ready to be handed to a grammar validator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Statement text without its trailing delimiter, trimmed
    pub text: String,
    /// 1-based line of the first physical line contributing to the statement;
    /// for routine bodies, the line holding `CREATE ... PROCEDURE|FUNCTION|...`
    pub start_line: usize,
    pub kind: StatementKind,
    /// Delimiter that closed the statement, if any
    pub terminator: Option<String>,
}

impl Statement {
    pub fn new(text: impl Into<String>, start_line: usize, kind: StatementKind) -> Self {
        Self {
            text: text.into(),
            start_line,
            kind,
            terminator: None,
        }
    }

    pub fn terminated_by(mut self, delimiter: impl Into<String>) -> Self {
        self.terminator = Some(delimiter.into());
        self
    }

    /// Whether the statement was closed by a delimiter (rather than by a
    /// directive or the end of input)
    pub fn is_terminated(&self) -> bool {
        self.terminator.is_some()
    }

    /// Statement text with its original delimiter re-appended
    pub fn to_source(&self) -> String {
        match &self.terminator {
            Some(delimiter) => format!("{}{}", self.text, delimiter),
            None => self.text.clone(),
        }
    }
}
