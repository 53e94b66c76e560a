//! Statement Scanner
//!
//! Line-at-a-time state machine that turns script text into [`Statement`]s.
//! Each line is classified in a fixed priority order: open block comment,
//! blank, line comment, block comment start, `DELIMITER` directive, routine
//! entry, `BEGIN`/`END` tracking, and finally delimiter termination.

use std::collections::VecDeque;
use std::io::{self, BufRead};

use super::patterns;
use super::statement::{Statement, StatementKind};

/// Default statement terminator
pub const DEFAULT_DELIMITER: &str = ";";

/// Mutable state threaded through one splitting run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannerState {
    pub current_delimiter: String,
    /// Text of the statement currently being assembled
    pub buffer: String,
    /// Line of the first line contributing to `buffer`
    pub buffer_start: Option<usize>,
    pub in_block_comment: bool,
    pub in_routine_body: bool,
    /// Unmatched `BEGIN`/`CASE` openers inside the current routine body
    pub begin_depth: usize,
    pub routine_start_line: usize,
}

impl Default for ScannerState {
    fn default() -> Self {
        Self {
            current_delimiter: DEFAULT_DELIMITER.to_string(),
            buffer: String::new(),
            buffer_start: None,
            in_block_comment: false,
            in_routine_body: false,
            begin_depth: 0,
            routine_start_line: 0,
        }
    }
}

/// Streaming splitter: feed physical lines in, pull statements out
#[derive(Debug, Default)]
pub struct Scanner {
    state: ScannerState,
    line_number: usize,
    ready: VecDeque<Statement>,
}

impl Scanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ScannerState {
        &self.state
    }

    /// Number of lines consumed so far
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// Consume one physical line (line ending already stripped)
    pub fn feed_line(&mut self, raw: &str) {
        self.line_number += 1;
        let line_number = self.line_number;
        let line = raw.trim();

        if self.state.in_block_comment {
            self.append(raw, line_number);
            if let Some(rest) = patterns::block_comment_close(line) {
                self.state.in_block_comment = patterns::opens_block_comment(rest);
                if !self.state.in_block_comment {
                    self.complete_line(rest.trim(), line_number);
                }
            }
            return;
        }

        if line.is_empty() {
            if !self.state.buffer.is_empty() {
                self.state.buffer.push('\n');
            }
            return;
        }

        if patterns::is_line_comment(line) {
            self.append(raw, line_number);
            return;
        }

        if patterns::opens_block_comment(line) {
            self.append(raw, line_number);
            self.state.in_block_comment = true;
            // Code outside the comments still counts towards routine nesting
            self.track_routine(line, line_number);
            return;
        }

        if let Some(token) = patterns::delimiter_directive(line) {
            let token = token.to_string();
            if self.state.in_routine_body {
                self.append(raw, line_number);
            } else {
                self.flush(StatementKind::Ordinary, false);
                self.ready.push_back(Statement::new(
                    line,
                    line_number,
                    StatementKind::DelimiterDirective,
                ));
            }
            log::debug!(
                "line {}: delimiter changed from '{}' to '{}'",
                line_number,
                self.state.current_delimiter,
                token
            );
            self.state.current_delimiter = token;
            return;
        }

        self.append(raw, line_number);
        self.complete_line(line, line_number);
    }

    /// Flush whatever is left once the input is exhausted
    pub fn finish(&mut self) {
        if self.state.in_routine_body {
            log::debug!(
                "routine body opened at line {} was never closed",
                self.state.routine_start_line
            );
            self.flush(StatementKind::RoutineBody, false);
        } else {
            self.flush(StatementKind::Ordinary, false);
        }
        self.state.in_block_comment = false;
    }

    /// Pop the next completed statement, if any
    pub fn next_statement(&mut self) -> Option<Statement> {
        self.ready.pop_front()
    }

    /// Drain every completed statement
    pub fn drain(&mut self) -> impl Iterator<Item = Statement> + '_ {
        self.ready.drain(..)
    }

    fn append(&mut self, raw: &str, line_number: usize) {
        if self.state.buffer_start.is_none() {
            self.state.buffer_start = Some(line_number);
        }
        self.state.buffer.push_str(raw.trim_end());
        self.state.buffer.push('\n');
    }

    /// Routine entry and block nesting for the code portion of a line
    fn track_routine(&mut self, line: &str, line_number: usize) {
        let code = patterns::strip_block_comments(line);
        let code = code.trim();
        if code.is_empty() {
            return;
        }

        if !self.state.in_routine_body && patterns::starts_routine(code) {
            self.state.in_routine_body = true;
            self.state.begin_depth = 0;
            self.state.routine_start_line = line_number;
            log::debug!("line {}: routine body started", line_number);
        }

        if self.state.in_routine_body {
            let balance = patterns::block_balance(code);
            self.state.begin_depth = (self.state.begin_depth + balance.opened)
                .saturating_sub(balance.closed);
        }
    }

    /// Apply routine tracking and delimiter termination to the code of a line
    /// that has already been appended to the buffer
    fn complete_line(&mut self, code: &str, line_number: usize) {
        self.track_routine(code, line_number);

        if !code.ends_with(self.state.current_delimiter.as_str()) {
            return;
        }

        if !self.state.in_routine_body {
            self.flush(StatementKind::Ordinary, true);
        } else if self.state.begin_depth == 0 {
            log::debug!(
                "line {}: routine body from line {} closed",
                line_number,
                self.state.routine_start_line
            );
            self.flush(StatementKind::RoutineBody, true);
        }
    }

    fn flush(&mut self, kind: StatementKind, terminated: bool) {
        let buffer = std::mem::take(&mut self.state.buffer);
        let buffer_start = self.state.buffer_start.take();
        // Routines are located at their CREATE line, not at leading comments
        let start_line = match kind {
            StatementKind::RoutineBody => self.state.routine_start_line,
            _ => buffer_start.unwrap_or(self.line_number),
        };

        if kind == StatementKind::RoutineBody {
            self.state.in_routine_body = false;
            self.state.begin_depth = 0;
        }

        let delimiter = self.state.current_delimiter.clone();
        let text = if terminated {
            patterns::strip_delimiter(&buffer, &delimiter)
        } else {
            buffer.trim()
        };

        if text.is_empty() {
            return;
        }

        let mut statement = Statement::new(text, start_line, kind);
        if terminated {
            statement = statement.terminated_by(delimiter);
        }
        self.ready.push_back(statement);
    }
}

/// Streaming iterator of statements read from a `BufRead` source
pub struct StatementStream<R: BufRead> {
    reader: R,
    scanner: Scanner,
    line_buffer: String,
    finished: bool,
}

impl<R: BufRead> StatementStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            scanner: Scanner::new(),
            line_buffer: String::new(),
            finished: false,
        }
    }
}

impl<R: BufRead> Iterator for StatementStream<R> {
    type Item = io::Result<Statement>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(statement) = self.scanner.next_statement() {
                return Some(Ok(statement));
            }

            if self.finished {
                return None;
            }

            self.line_buffer.clear();
            match self.reader.read_line(&mut self.line_buffer) {
                Ok(0) => {
                    self.scanner.finish();
                    self.finished = true;
                }
                Ok(_) => {
                    let line = self.line_buffer.trim_end_matches(['\n', '\r']);
                    self.scanner.feed_line(line);
                }
                Err(e) => {
                    self.finished = true;
                    return Some(Err(e));
                }
            }
        }
    }
}
