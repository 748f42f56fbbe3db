//! Diagnostics for the S# front end.
//!
//! Every failure in lexing or parsing is reported as exactly one
//! [`Diagnostic`] carrying the source span it refers to. Rendering prints the
//! offending source lines with `^` markers under the reported columns.

#[cfg(test)]
mod tests;

use crate::lexer::token::{Position, Span};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// The lexer met a character outside the grammar.
    IllegalCharacter { details: String, span: Span },

    /// The lexer met a valid character whose required follow-up was missing.
    ExpectedCharacter { details: String, span: Span },

    /// A numeric literal that cannot be represented.
    InvalidNumber { details: String, span: Span },

    /// No grammar production admits the current token.
    InvalidSyntax { details: String, span: Span },

    /// Raised by the evaluator; the front end never produces it.
    Runtime {
        details: String,
        span: Span,
        context: Context,
    },
}

/// One frame of the evaluator's execution context chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Context {
    pub display_name: String,
    /// The calling context, if any.
    pub parent: Option<Box<Context>>,
    /// Where the parent entered this context.
    pub parent_entry_position: Option<Position>,
}

impl Context {
    pub fn new(display_name: impl Into<String>) -> Self {
        Self {
            display_name: display_name.into(),
            parent: None,
            parent_entry_position: None,
        }
    }

    pub fn with_parent(display_name: impl Into<String>, parent: Context, entry: Position) -> Self {
        Self {
            display_name: display_name.into(),
            parent: Some(Box::new(parent)),
            parent_entry_position: Some(entry),
        }
    }
}

impl Diagnostic {
    pub fn illegal_character(details: impl Into<String>, span: Span) -> Self {
        Diagnostic::IllegalCharacter {
            details: details.into(),
            span,
        }
    }

    pub fn expected_character(details: impl Into<String>, span: Span) -> Self {
        Diagnostic::ExpectedCharacter {
            details: details.into(),
            span,
        }
    }

    pub fn invalid_number(details: impl Into<String>, span: Span) -> Self {
        Diagnostic::InvalidNumber {
            details: details.into(),
            span,
        }
    }

    pub fn invalid_syntax(details: impl Into<String>, span: Span) -> Self {
        Diagnostic::InvalidSyntax {
            details: details.into(),
            span,
        }
    }

    pub fn runtime(details: impl Into<String>, span: Span, context: Context) -> Self {
        Diagnostic::Runtime {
            details: details.into(),
            span,
            context,
        }
    }

    /// Human-readable kind name, as printed before the details.
    pub fn kind(&self) -> &'static str {
        match self {
            Diagnostic::IllegalCharacter { .. } => "Illegal Character",
            Diagnostic::ExpectedCharacter { .. } => "Expected Character",
            Diagnostic::InvalidNumber { .. } => "Invalid Number",
            Diagnostic::InvalidSyntax { .. } => "Invalid Syntax",
            Diagnostic::Runtime { .. } => "Runtime Error",
        }
    }

    pub fn details(&self) -> &str {
        match self {
            Diagnostic::IllegalCharacter { details, .. }
            | Diagnostic::ExpectedCharacter { details, .. }
            | Diagnostic::InvalidNumber { details, .. }
            | Diagnostic::InvalidSyntax { details, .. }
            | Diagnostic::Runtime { details, .. } => details,
        }
    }

    pub fn span(&self) -> &Span {
        match self {
            Diagnostic::IllegalCharacter { span, .. }
            | Diagnostic::ExpectedCharacter { span, .. }
            | Diagnostic::InvalidNumber { span, .. }
            | Diagnostic::InvalidSyntax { span, .. }
            | Diagnostic::Runtime { span, .. } => span,
        }
    }

    pub fn position(&self) -> &Position {
        &self.span().start
    }

    /// `Traceback (most recent call last):` followed by one line per
    /// context frame, outermost first. Empty for non-runtime diagnostics.
    pub fn traceback(&self) -> String {
        let Diagnostic::Runtime { span, context, .. } = self else {
            return String::new();
        };

        let mut frames = Vec::new();
        let mut position = Some(&span.start);
        let mut current = Some(context);

        while let Some(ctx) = current {
            if let Some(pos) = position {
                frames.push(format!(
                    "  File {}, line {}, in {}\n",
                    pos.filename(),
                    pos.line + 1,
                    ctx.display_name
                ));
            }
            position = ctx.parent_entry_position.as_ref();
            current = ctx.parent.as_deref();
        }

        frames.reverse();
        format!("Traceback (most recent call last):\n{}", frames.concat())
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let span = self.span();

        if let Diagnostic::Runtime { .. } = self {
            write!(f, "{}", self.traceback())?;
            write!(f, "{}: {}", self.kind(), self.details())?;
        } else {
            writeln!(f, "{}: {}", self.kind(), self.details())?;
            write!(f, "File {}, line {}", span.start.filename(), span.start.line + 1)?;
        }

        write!(f, "\n\n{}", string_with_arrows(&span.start, &span.end))
    }
}

impl std::error::Error for Diagnostic {}

/// Renders the source lines between `start` and `end`, each followed by a
/// line of `^` under the covered columns.
pub fn string_with_arrows(start: &Position, end: &Position) -> String {
    let source = &start.source;
    // A range ending at column 0 stops at the previous line break.
    let last_line = if end.line > start.line && end.column == 0 {
        end.line - 1
    } else {
        end.line.max(start.line)
    };
    let mut rendered = Vec::new();

    for line_no in start.line..=last_line {
        let line: Vec<char> = source.line(line_no).chars().collect();

        let col_start = if line_no == start.line { start.column } else { 0 };
        let col_end = if line_no == end.line { end.column } else { line.len() };
        let width = col_end.saturating_sub(col_start).max(1);

        let padding: String = (0..col_start)
            .map(|col| if line.get(col) == Some(&'\t') { '\t' } else { ' ' })
            .collect();

        rendered.push(format!(
            "{}\n{}{}",
            line.iter().collect::<String>(),
            padding,
            "^".repeat(width)
        ));
    }

    rendered.join("\n")
}
