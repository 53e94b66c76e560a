//! SQL Script Splitter
//!
//! Finds statement boundaries in a multi-statement SQL script. Tracks the
//! active `DELIMITER`, comments, and stored routine bodies whose internal
//! terminators must not end the statement. Never checks SQL grammar.

pub mod patterns;
pub mod scanner;
pub mod statement;

pub use scanner::{DEFAULT_DELIMITER, Scanner, ScannerState, StatementStream};
pub use statement::{Statement, StatementKind};

/// Split a whole script into statements
///
/// This is the main entry point for splitting. Line numbers are 1-based
/// and refer to physical lines of `script`.
pub fn split(script: &str) -> Vec<Statement> {
    let mut scanner = Scanner::new();
    for line in script.lines() {
        scanner.feed_line(line);
    }
    scanner.finish();
    scanner.drain().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(statements: &[Statement]) -> Vec<&str> {
        statements.iter().map(|s| s.text.as_str()).collect()
    }

    #[test]
    fn test_split_two_selects() {
        let statements = split("SELECT 1;\nSELECT 2;");

        assert_eq!(statements.len(), 2);
        assert_eq!(statements[0].text, "SELECT 1");
        assert_eq!(statements[0].start_line, 1);
        assert_eq!(statements[0].kind, StatementKind::Ordinary);
        assert_eq!(statements[1].text, "SELECT 2");
        assert_eq!(statements[1].start_line, 2);
    }

    #[test]
    fn test_split_procedure_with_custom_delimiter() {
        let statements =
            split("DELIMITER //\nCREATE PROCEDURE p() BEGIN SELECT 1; END//\nDELIMITER ;");

        assert_eq!(statements.len(), 3);
        assert_eq!(statements[0].kind, StatementKind::DelimiterDirective);
        assert_eq!(statements[0].text, "DELIMITER //");
        assert_eq!(statements[1].kind, StatementKind::RoutineBody);
        assert_eq!(statements[1].text, "CREATE PROCEDURE p() BEGIN SELECT 1; END");
        assert_eq!(statements[1].start_line, 2);
        assert_eq!(statements[2].kind, StatementKind::DelimiterDirective);
        assert_eq!(statements[2].text, "DELIMITER ;");
        assert_eq!(statements[2].start_line, 3);
    }

    #[test]
    fn test_split_keeps_comments_with_following_statement() {
        let statements = split("-- first\nSELECT 1;\n# second\nSELECT 2;");

        assert_eq!(texts(&statements), vec!["-- first\nSELECT 1", "# second\nSELECT 2"]);
        assert_eq!(statements[1].start_line, 3);
    }

    #[test]
    fn test_split_trailing_statement_without_delimiter() {
        let statements = split("SELECT 1;\nSELECT 2");

        assert_eq!(statements.len(), 2);
        assert!(statements[0].is_terminated());
        assert!(!statements[1].is_terminated());
        assert_eq!(statements[1].text, "SELECT 2");
    }

    #[test]
    fn test_split_empty_input() {
        assert!(split("").is_empty());
        assert!(split("\n   \n\t\n").is_empty());
    }
}
