// Recursive-descent parser for btrc.
// This module organizes the parser into logical components.

use crate::ParseError;
use btrc_ast::*;
use btrc_lexer::{Lexer, Token, TokenSpan};

// Sub-modules for different parsing responsibilities
mod expressions;
mod items;
mod statements;
mod types;

pub struct Parser<'a> {
    pub(crate) tokens: Vec<TokenSpan>,
    pub(crate) current: usize,
    pub(crate) source: &'a str,
    line_starts: Vec<usize>,
    pub(crate) next_id: u32,
}

impl<'a> Parser<'a> {
    /// Parse from pre-lexed tokens (the driver lexes first so it can
    /// serve `--emit-tokens` from the same stream).
    pub fn from_tokens(tokens: Vec<TokenSpan>, source: &'a str) -> Self {
        Self {
            tokens,
            current: 0,
            source,
            line_starts: line_starts(source),
            next_id: 0,
        }
    }

    pub fn new(source: &'a str) -> Result<Self, ParseError> {
        let tokens = Lexer::tokenize(source).map_err(|e| {
            let (line, col) = offset_to_line_col(source, e.span().start);
            ParseError::SyntaxError {
                message: e.to_string(),
                line,
                col,
            }
        })?;
        Ok(Self::from_tokens(tokens, source))
    }

    pub fn parse(&mut self) -> Result<Program, ParseError> {
        let mut declarations = Vec::new();
        while !self.is_at_end() {
            declarations.push(self.parse_declaration()?);
        }
        Ok(Program { declarations })
    }

    // ==================== Helper Methods ====================

    pub(crate) fn match_token(&mut self, kind: &Token) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn check(&self, kind: &Token) -> bool {
        if self.is_at_end() {
            false
        } else {
            std::mem::discriminant(self.peek()) == std::mem::discriminant(kind)
        }
    }

    pub(crate) fn check_ahead(&self, offset: usize, kind: &Token) -> bool {
        match self.tokens.get(self.current + offset) {
            Some(ts) => std::mem::discriminant(&ts.token) == std::mem::discriminant(kind),
            None => false,
        }
    }

    pub(crate) fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    pub(crate) fn is_at_end(&self) -> bool {
        self.current >= self.tokens.len()
    }

    pub(crate) fn peek(&self) -> &Token {
        static EOF: Token = Token::Semicolon;
        match self.tokens.get(self.current) {
            Some(ts) => &ts.token,
            None => &EOF,
        }
    }

    pub(crate) fn previous(&self) -> &Token {
        &self.tokens[self.current - 1].token
    }

    pub(crate) fn consume(&mut self, kind: &Token, message: &str) -> Result<(), ParseError> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(message))
        }
    }

    /// Consume an identifier token and return its text.
    pub(crate) fn consume_ident(&mut self, message: &str) -> Result<String, ParseError> {
        match self.peek().clone() {
            Token::Ident(name) => {
                self.advance();
                Ok(name)
            }
            _ => Err(self.error(message)),
        }
    }

    pub(crate) fn error(&self, message: &str) -> ParseError {
        let (line, col) = self.current_line_col();
        ParseError::SyntaxError {
            message: message.to_string(),
            line,
            col,
        }
    }

    pub(crate) fn current_line_col(&self) -> (usize, usize) {
        let offset = match self.tokens.get(self.current) {
            Some(ts) => ts.span.start,
            None => self.source.len(),
        };
        self.line_col(offset)
    }

    pub(crate) fn line_col(&self, offset: usize) -> (usize, usize) {
        let line_idx = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        (line_idx + 1, offset - self.line_starts[line_idx] + 1)
    }

    pub(crate) fn fresh_id(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Build an expression node at the position of token index `start`.
    pub(crate) fn mk_expr(&mut self, start: usize, kind: ExprKind) -> Expr {
        let offset = self
            .tokens
            .get(start)
            .map(|t| t.span.start)
            .unwrap_or(self.source.len());
        let (line, col) = self.line_col(offset);
        Expr {
            id: self.fresh_id(),
            line,
            col,
            kind,
        }
    }

    /// Parse an expression embedded in another token (f-string
    /// interpolations). Node ids stay unique by threading the counter.
    pub(crate) fn parse_embedded_expr(&mut self, fragment: &str) -> Result<Expr, ParseError> {
        let tokens = Lexer::tokenize(fragment).map_err(|e| {
            let (line, col) = self.current_line_col();
            ParseError::SyntaxError {
                message: format!("in f-string interpolation: {}", e),
                line,
                col,
            }
        })?;
        let mut sub = Parser::from_tokens(tokens, fragment);
        sub.next_id = self.next_id;
        let expr = sub.parse_expression().map_err(|e| {
            let (line, col) = self.current_line_col();
            ParseError::SyntaxError {
                message: format!("in f-string interpolation: {}", e),
                line,
                col,
            }
        })?;
        if !sub.is_at_end() {
            let (line, col) = self.current_line_col();
            return Err(ParseError::SyntaxError {
                message: "trailing tokens in f-string interpolation".to_string(),
                line,
                col,
            });
        }
        self.next_id = sub.next_id;
        Ok(expr)
    }

    pub(crate) fn parse_block(&mut self) -> Result<Block, ParseError> {
        self.consume(&Token::LBrace, "Expected '{'")?;
        let mut statements = Vec::new();

        while !self.check(&Token::RBrace) && !self.is_at_end() {
            statements.push(self.parse_statement()?);
        }

        self.consume(&Token::RBrace, "Expected '}'")?;
        Ok(Block { statements })
    }
}

fn line_starts(source: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (i, b) in source.bytes().enumerate() {
        if b == b'\n' {
            starts.push(i + 1);
        }
    }
    starts
}

pub(crate) fn offset_to_line_col(source: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(source.len());
    let before = &source[..offset];
    let line = before.bytes().filter(|&b| b == b'\n').count() + 1;
    let col = match before.rfind('\n') {
        Some(pos) => before.len() - pos,
        None => before.len() + 1,
    };
    (line, col)
}
