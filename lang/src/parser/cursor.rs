//! The parser's backtracking protocol.
//!
//! Rules never mutate a shared token index. Each rule receives the [`Cursor`]
//! it starts at and hands back the cursor it stopped at, inside [`Parsed`] on
//! success or [`Failure`] on error. The number of tokens a rule consumed is
//! the distance between those two cursors.
//!
//! - Propagating a sub-rule's result with `?` registers it: its failure
//!   becomes the caller's failure, unchanged.
//! - Speculative parsing matches on the sub-rule's result and, on failure,
//!   carries on from the cursor it held before the call, which undoes
//!   whatever the failed attempt consumed.
//! - [`Failure::or_else_expected`] lets a caller swap a sub-rule's error for
//!   its own, broader message, but only when the sub-rule failed without
//!   consuming a token. Errors found deeper in the input always win.

use crate::error::Diagnostic;

/// Index of the current token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cursor(usize);

impl Cursor {
    pub const START: Cursor = Cursor(0);

    pub fn index(self) -> usize {
        self.0
    }

    pub fn next(self) -> Cursor {
        Cursor(self.0 + 1)
    }

    pub fn prev(self) -> Cursor {
        Cursor(self.0.saturating_sub(1))
    }

    /// Number of tokens consumed between `earlier` and `self`.
    pub fn since(self, earlier: Cursor) -> usize {
        self.0.saturating_sub(earlier.0)
    }
}

/// A successfully parsed value and the cursor just past it.
#[derive(Debug, Clone, PartialEq)]
pub struct Parsed<T> {
    pub value: T,
    pub cursor: Cursor,
}

impl<T> Parsed<T> {
    pub fn new(value: T, cursor: Cursor) -> Self {
        Self { value, cursor }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Parsed<U> {
        Parsed {
            value: f(self.value),
            cursor: self.cursor,
        }
    }
}

/// A parse error together with the cursor at which it was detected.
#[derive(Debug, Clone, PartialEq)]
pub struct Failure {
    pub error: Diagnostic,
    pub cursor: Cursor,
}

impl Failure {
    pub fn new(error: Diagnostic, cursor: Cursor) -> Self {
        Self { error, cursor }
    }

    /// Whether the failing rule consumed nothing after `start`.
    pub fn consumed_nothing_since(&self, start: Cursor) -> bool {
        self.cursor.since(start) == 0
    }

    /// Replaces the error with `expected(cursor)` if nothing was consumed
    /// since `start`; otherwise keeps the deeper error.
    pub fn or_else_expected(self, start: Cursor, expected: impl FnOnce(Cursor) -> Diagnostic) -> Failure {
        if self.consumed_nothing_since(start) {
            Failure::new(expected(self.cursor), self.cursor)
        } else {
            self
        }
    }
}

pub type ParseResult<T> = Result<Parsed<T>, Failure>;
