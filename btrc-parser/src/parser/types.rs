// Type expression parsing: primitives, generics, pointers, arrays,
// tuples, const qualifier.

use super::Parser;
use crate::ParseError;
use btrc_ast::TypeExpr;
use btrc_lexer::Token;

/// Primitive base names — used by the cast heuristic in expressions.rs.
pub(crate) const PRIMITIVE_NAMES: &[&str] = &[
    "int", "float", "double", "bool", "char", "string", "void", "long", "short", "byte", "uint",
    "size_t",
];

impl<'a> Parser<'a> {
    /// Attempt to parse a type, restoring the cursor on failure.
    pub(crate) fn try_parse_type(&mut self) -> Option<TypeExpr> {
        let saved = self.current;
        let saved_id = self.next_id;
        match self.parse_type() {
            Ok(t) => Some(t),
            Err(_) => {
                self.current = saved;
                self.next_id = saved_id;
                None
            }
        }
    }

    pub(crate) fn parse_type(&mut self) -> Result<TypeExpr, ParseError> {
        let is_const = self.match_token(&Token::Const);

        // Tuple type: (int, string)
        if self.check(&Token::LParen) {
            self.advance();
            let mut args = vec![self.parse_type()?];
            while self.match_token(&Token::Comma) {
                args.push(self.parse_type()?);
            }
            self.consume(&Token::RParen, "Expected ')' after tuple type")?;
            let mut ty = TypeExpr::generic("Tuple", args);
            ty.is_const = is_const;
            while self.match_token(&Token::Star) {
                ty.pointer_depth += 1;
            }
            return Ok(ty);
        }

        let base = self.consume_ident("Expected type name")?;

        let mut generic_args = Vec::new();
        if self.check(&Token::Lt) {
            self.advance();
            generic_args.push(self.parse_type()?);
            while self.match_token(&Token::Comma) {
                generic_args.push(self.parse_type()?);
            }
            self.consume(&Token::Gt, "Expected '>' after generic arguments")?;
        }

        let mut ty = TypeExpr {
            base,
            generic_args,
            pointer_depth: 0,
            is_array: false,
            array_size: None,
            is_const,
        };
        while self.match_token(&Token::Star) {
            ty.pointer_depth += 1;
        }
        Ok(ty)
    }

    /// C-style postfix array suffix after a declared name:
    /// `int arr[5]` / `int nums[]`. Folds into the declared type.
    pub(crate) fn parse_array_suffix(&mut self, ty: &mut TypeExpr) -> Result<(), ParseError> {
        if self.check(&Token::LBracket) {
            self.advance();
            if self.check(&Token::RBracket) {
                self.advance();
                ty.is_array = true;
            } else {
                let size = self.parse_expression()?;
                self.consume(&Token::RBracket, "Expected ']' after array size")?;
                ty.is_array = true;
                ty.array_size = Some(Box::new(size));
            }
        }
        Ok(())
    }

    /// Generic parameter list on declarations: `<T, K, V>`.
    pub(crate) fn parse_generic_params(&mut self) -> Result<Vec<String>, ParseError> {
        let mut params = Vec::new();
        if self.match_token(&Token::Lt) {
            loop {
                params.push(self.consume_ident("Expected generic parameter name")?);
                if !self.match_token(&Token::Comma) {
                    break;
                }
            }
            self.consume(&Token::Gt, "Expected '>' after generic parameters")?;
        }
        Ok(params)
    }
}
