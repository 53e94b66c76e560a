//! Line Patterns
//!
//! Precompiled matchers used by the scanner and the orchestrator.
//! Compiled once per process and never mutated afterwards.

use regex::Regex;
use std::borrow::Cow;
use std::sync::LazyLock;

static DELIMITER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^DELIMITER\s+(\S+)\s*$").expect("delimiter directive pattern")
});

static ROUTINE_START_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:CREATE|ALTER)\s+(?:OR\s+REPLACE\s+)?(?:DEFINER\s*=\s*\S+\s+)?(?:AGGREGATE\s+)?(?:PROCEDURE|FUNCTION|TRIGGER|EVENT)\b",
    )
    .expect("routine start pattern")
});

// Group 1 is an opener. Otherwise the match is an END, and group 2 holds
// the keyword swallowed after it so `END CASE` is not re-read as an opener.
static BLOCK_KEYWORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:(BEGIN|CASE)|END(?:\s+(IF|LOOP|WHILE|REPEAT|FOR|CASE))?)\b")
        .expect("block keyword pattern")
});

static ROUTINE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(?:PROCEDURE|FUNCTION|TRIGGER|EVENT)\s+(?:IF\s+NOT\s+EXISTS\s+)?([\w$.`"]+)"#)
        .expect("routine name pattern")
});

static END_KEYWORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bEND\b").expect("end keyword pattern"));

/// Net effect of one line on routine block nesting
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlockBalance {
    pub opened: usize,
    pub closed: usize,
}

/// Match a `DELIMITER <token>` directive, returning the new delimiter
pub fn delimiter_directive(line: &str) -> Option<&str> {
    DELIMITER_RE
        .captures(line.trim())
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Whether the line opens a stored routine definition
pub fn starts_routine(line: &str) -> bool {
    ROUTINE_START_RE.is_match(line)
}

/// Name following `PROCEDURE|FUNCTION|TRIGGER|EVENT` in a routine header
pub fn routine_name(text: &str) -> Option<&str> {
    ROUTINE_NAME_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Whether the text contains an `END` keyword anywhere
pub fn contains_end_keyword(text: &str) -> bool {
    END_KEYWORD_RE.is_match(text)
}

/// Count block openers and closers on one line.
///
/// `BEGIN` and `CASE` open a block; `END` and `END CASE` close one.
/// `END IF`, `END LOOP`, `END WHILE`, `END REPEAT` and `END FOR` close
/// constructs whose openers are not tracked, so they are ignored.
pub fn block_balance(line: &str) -> BlockBalance {
    let mut balance = BlockBalance::default();

    for caps in BLOCK_KEYWORD_RE.captures_iter(line) {
        if caps.get(1).is_some() {
            balance.opened += 1;
            continue;
        }

        match caps.get(2) {
            None => balance.closed += 1,
            Some(suffix) if suffix.as_str().eq_ignore_ascii_case("CASE") => balance.closed += 1,
            Some(_) => {}
        }
    }

    balance
}

/// Whether the line is a `--` or `#` comment
pub fn is_line_comment(line: &str) -> bool {
    let trimmed = line.trim_start();
    trimmed.starts_with("--") || trimmed.starts_with('#')
}

/// Whether the line leaves a `/*` comment open at its end
pub fn opens_block_comment(line: &str) -> bool {
    match line.rfind("/*") {
        Some(start) => !line[start + 2..].contains("*/"),
        None => false,
    }
}

/// If the line closes an open block comment, return the code after the last `*/`
pub fn block_comment_close(line: &str) -> Option<&str> {
    line.rfind("*/").map(|end| &line[end + 2..])
}

/// Code portion of a line with every `/* ... */` span removed, including an
/// unclosed one running to the end of the line
pub fn strip_block_comments(line: &str) -> Cow<'_, str> {
    if !line.contains("/*") {
        return Cow::Borrowed(line);
    }

    let mut code = String::with_capacity(line.len());
    let mut rest = line;
    while let Some(start) = rest.find("/*") {
        code.push_str(&rest[..start]);
        code.push(' ');
        match rest[start + 2..].find("*/") {
            Some(end) => rest = &rest[start + 2 + end + 2..],
            None => return Cow::Owned(code),
        }
    }
    code.push_str(rest);
    Cow::Owned(code)
}

/// Remove a trailing delimiter (and surrounding whitespace) from statement text
pub fn strip_delimiter<'a>(text: &'a str, delimiter: &str) -> &'a str {
    let trimmed = text.trim();
    trimmed
        .strip_suffix(delimiter)
        .map(str::trim_end)
        .unwrap_or(trimmed)
}
