//! Syntax errors and human-readable failure diagnostics.

use std::fmt;

use pest::error::{ErrorVariant, LineColLocation};
use thiserror::Error;

use crate::grammar::Rule;

/// Marker inserted immediately before the first rejected character of the offending line.
pub const ERROR_MARKER: &str = "...ERROR START...-->";

/// The first grammar violation in a repaired dump.
///
/// `line` and `column` are 1-based and refer to the *repaired* text (see
/// [`crate::repair::repair_dump`]), which is what the grammar sees.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at line {line}, column {column}")]
pub struct XlmSyntaxError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl XlmSyntaxError {
    pub fn new(line: usize, column: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
        }
    }

    pub(crate) fn at_span(span: pest::Span<'_>, message: impl Into<String>) -> Self {
        let (line, column) = span.start_pos().line_col();
        Self::new(line, column, message)
    }
}

impl From<pest::error::Error<Rule>> for XlmSyntaxError {
    fn from(err: pest::error::Error<Rule>) -> Self {
        let (line, column) = match err.line_col {
            LineColLocation::Pos((line, col)) => (line, col),
            LineColLocation::Span((line, col), _) => (line, col),
        };
        let message = match &err.variant {
            ErrorVariant::ParsingError {
                positives,
                negatives,
            } => describe_expectation(positives, negatives),
            ErrorVariant::CustomError { message } => message.clone(),
        };
        Self::new(line, column, message)
    }
}

fn describe_expectation(positives: &[Rule], negatives: &[Rule]) -> String {
    fn join(rules: &[Rule]) -> String {
        rules
            .iter()
            .map(|r| format!("{r:?}"))
            .collect::<Vec<_>>()
            .join(", ")
    }

    match (positives.is_empty(), negatives.is_empty()) {
        (true, true) => "unexpected input".to_string(),
        (false, true) => format!("unexpected input, expected one of: {}", join(positives)),
        (true, false) => format!("unexpected {}", join(negatives)),
        (false, false) => format!(
            "unexpected {}, expected one of: {}",
            join(negatives),
            join(positives)
        ),
    }
}

/// A failed document: the syntax error plus the offending line with [`ERROR_MARKER`] inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XlmDumpDiagnostic {
    pub error: XlmSyntaxError,
    pub annotated_line: String,
}

impl XlmDumpDiagnostic {
    /// Build a diagnostic for `error`, locating the offending line inside `fixed`.
    pub fn new(error: XlmSyntaxError, fixed: &str) -> Self {
        let annotated_line = annotate_line(fixed, error.line, error.column);
        Self {
            error,
            annotated_line,
        }
    }

    pub fn line(&self) -> usize {
        self.error.line
    }

    pub fn column(&self) -> usize {
        self.error.column
    }
}

impl fmt::Display for XlmDumpDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "parsing XLM dump failed: {}\nBAD LINE: {}",
            self.error, self.annotated_line
        )
    }
}

impl std::error::Error for XlmDumpDiagnostic {}

/// Insert [`ERROR_MARKER`] before the `column`-th character (1-based) of line `line` (1-based).
///
/// Out-of-range positions are clamped: a missing line annotates as an empty line, and a column
/// past the end of the line appends the marker.
pub fn annotate_line(text: &str, line: usize, column: usize) -> String {
    let bad_line = text.split('\n').nth(line.saturating_sub(1)).unwrap_or("");
    let bad_line = bad_line.strip_suffix('\r').unwrap_or(bad_line);

    let char_idx = column.saturating_sub(1);
    let byte_idx = bad_line
        .char_indices()
        .nth(char_idx)
        .map(|(idx, _)| idx)
        .unwrap_or(bad_line.len());

    let mut out = String::with_capacity(bad_line.len() + ERROR_MARKER.len());
    out.push_str(&bad_line[..byte_idx]);
    out.push_str(ERROR_MARKER);
    out.push_str(&bad_line[byte_idx..]);
    out
}
