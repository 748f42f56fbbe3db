//! Front end for the S# scripting language: a lexer producing positioned
//! tokens and a backtracking recursive-descent parser producing a syntax tree.

pub mod error;
pub mod lexer;
pub mod parser;


use tracing::instrument;

pub use error::Diagnostic;
pub use parser::ast::Node;

/// Lexes and parses `text`, stopping at the first diagnostic.
#[instrument(skip_all, fields(file = %filename))]
pub fn run(filename: &str, text: &str) -> Result<Node, Diagnostic> {
    let tokens = lexer::tokenize(filename, text)?;
    parser::parse(tokens)
}
