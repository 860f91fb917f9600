use thiserror::Error;

// Modular parser structure
mod parser;
pub use parser::Parser;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("{message}")]
    SyntaxError {
        message: String,
        line: usize,
        col: usize,
    },
}

impl ParseError {
    pub fn location(&self) -> (usize, usize) {
        match self {
            ParseError::SyntaxError { line, col, .. } => (*line, *col),
        }
    }
}
