// Expression parsing: precedence ladder, casts, lambdas, literals,
// f-string interpolation splitting.

use super::types::PRIMITIVE_NAMES;
use super::Parser;
use crate::ParseError;
use btrc_ast::*;
use btrc_lexer::{unescape_string, Token};

impl<'a> Parser<'a> {
    pub(crate) fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expr, ParseError> {
        let start = self.current;
        let target = self.parse_ternary()?;

        let op = match self.peek() {
            Token::Eq => "=",
            Token::PlusEq => "+=",
            Token::MinusEq => "-=",
            Token::StarEq => "*=",
            Token::SlashEq => "/=",
            Token::PercentEq => "%=",
            _ => return Ok(target),
        }
        .to_string();
        self.advance();
        let value = self.parse_assignment()?;
        Ok(self.mk_expr(
            start,
            ExprKind::Assign {
                op,
                target: Box::new(target),
                value: Box::new(value),
            },
        ))
    }

    fn parse_ternary(&mut self) -> Result<Expr, ParseError> {
        let start = self.current;
        let condition = self.parse_null_coalescing()?;
        if self.match_token(&Token::Question) {
            let true_expr = self.parse_expression()?;
            self.consume(&Token::Colon, "Expected ':' in ternary expression")?;
            let false_expr = self.parse_ternary()?;
            return Ok(self.mk_expr(
                start,
                ExprKind::Ternary {
                    condition: Box::new(condition),
                    true_expr: Box::new(true_expr),
                    false_expr: Box::new(false_expr),
                },
            ));
        }
        Ok(condition)
    }

    fn parse_null_coalescing(&mut self) -> Result<Expr, ParseError> {
        let start = self.current;
        let mut left = self.parse_logical_or()?;
        while self.match_token(&Token::QuestionQuestion) {
            let right = self.parse_logical_or()?;
            left = self.mk_expr(
                start,
                ExprKind::Binary {
                    op: "??".to_string(),
                    left: Box::new(left),
                    right: Box::new(right),
                },
            );
        }
        Ok(left)
    }

    fn parse_logical_or(&mut self) -> Result<Expr, ParseError> {
        self.parse_binary_level(0)
    }

    /// Binary operator tiers, loosest first.
    fn parse_binary_level(&mut self, level: usize) -> Result<Expr, ParseError> {
        const LEVELS: &[&[(&str, Token)]] = &[
            &[("||", Token::OrOr)],
            &[("&&", Token::AndAnd)],
            &[("|", Token::Pipe)],
            &[("^", Token::Caret)],
            &[("&", Token::Amp)],
            &[("==", Token::EqEq), ("!=", Token::NotEq)],
            &[
                ("<", Token::Lt),
                (">", Token::Gt),
                ("<=", Token::LtEq),
                (">=", Token::GtEq),
            ],
            &[("<<", Token::Shl), (">>", Token::Shr)],
            &[("+", Token::Plus), ("-", Token::Minus)],
            &[
                ("*", Token::Star),
                ("/", Token::Slash),
                ("%", Token::Percent),
            ],
        ];

        if level >= LEVELS.len() {
            return self.parse_unary();
        }

        let start = self.current;
        let mut left = self.parse_binary_level(level + 1)?;
        'outer: loop {
            for (text, tok) in LEVELS[level] {
                if self.check(tok) {
                    self.advance();
                    let right = self.parse_binary_level(level + 1)?;
                    left = self.mk_expr(
                        start,
                        ExprKind::Binary {
                            op: (*text).to_string(),
                            left: Box::new(left),
                            right: Box::new(right),
                        },
                    );
                    continue 'outer;
                }
            }
            break;
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        let start = self.current;

        // Cast: (type)expr — only for unambiguous type shapes.
        if self.check(&Token::LParen) {
            let saved = self.current;
            self.advance();
            if let Some(ty) = self.try_parse_type() {
                let castable = PRIMITIVE_NAMES.contains(&ty.base.as_str())
                    || ty.pointer_depth > 0
                    || !ty.generic_args.is_empty();
                if castable && self.check(&Token::RParen) {
                    self.advance();
                    // Reject `(x)` followed by a non-expression.
                    if self.starts_expression() {
                        let expr = self.parse_unary()?;
                        return Ok(self.mk_expr(
                            start,
                            ExprKind::Cast {
                                target_type: ty,
                                expr: Box::new(expr),
                            },
                        ));
                    }
                }
            }
            self.current = saved;
        }

        if self.match_token(&Token::Sizeof) {
            self.consume(&Token::LParen, "Expected '(' after 'sizeof'")?;
            let saved = self.current;
            if let Some(ty) = self.try_parse_type() {
                if self.check(&Token::RParen) {
                    self.advance();
                    return Ok(self.mk_expr(start, ExprKind::Sizeof(SizeofOperand::Type(ty))));
                }
            }
            self.current = saved;
            let inner = self.parse_expression()?;
            self.consume(&Token::RParen, "Expected ')' after sizeof operand")?;
            return Ok(self.mk_expr(
                start,
                ExprKind::Sizeof(SizeofOperand::Expr(Box::new(inner))),
            ));
        }

        if self.match_token(&Token::New) {
            let ty = self.parse_type()?;
            let mut args = Vec::new();
            if self.match_token(&Token::LParen) {
                args = self.parse_call_args()?;
            }
            return Ok(self.mk_expr(start, ExprKind::New { ty, args }));
        }

        if self.match_token(&Token::Spawn) {
            self.consume(&Token::LParen, "Expected '(' after 'spawn'")?;
            let func = self.parse_expression()?;
            self.consume(&Token::RParen, "Expected ')' after spawn argument")?;
            return Ok(self.mk_expr(
                start,
                ExprKind::Spawn {
                    func: Box::new(func),
                },
            ));
        }

        let prefix_op = match self.peek() {
            Token::Not => Some("!"),
            Token::Minus => Some("-"),
            Token::Plus => Some("+"),
            Token::Tilde => Some("~"),
            Token::Star => Some("*"),
            Token::Amp => Some("&"),
            Token::PlusPlus => Some("++"),
            Token::MinusMinus => Some("--"),
            _ => None,
        };
        if let Some(op) = prefix_op {
            self.advance();
            let operand = self.parse_unary()?;
            return Ok(self.mk_expr(
                start,
                ExprKind::Unary {
                    op: op.to_string(),
                    operand: Box::new(operand),
                    prefix: true,
                },
            ));
        }

        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let start = self.current;
        let mut expr = self.parse_primary()?;

        loop {
            if self.match_token(&Token::LParen) {
                let args = self.parse_call_args()?;
                expr = self.mk_expr(
                    start,
                    ExprKind::Call {
                        callee: Box::new(expr),
                        args,
                    },
                );
            } else if self.match_token(&Token::LBracket) {
                let index = self.parse_expression()?;
                self.consume(&Token::RBracket, "Expected ']' after index")?;
                expr = self.mk_expr(
                    start,
                    ExprKind::Index {
                        obj: Box::new(expr),
                        index: Box::new(index),
                    },
                );
            } else if self.match_token(&Token::Dot) {
                let field = self.parse_field_name()?;
                expr = self.mk_expr(
                    start,
                    ExprKind::FieldAccess {
                        obj: Box::new(expr),
                        field,
                        optional: false,
                        arrow: false,
                    },
                );
            } else if self.match_token(&Token::Arrow) {
                let field = self.parse_field_name()?;
                expr = self.mk_expr(
                    start,
                    ExprKind::FieldAccess {
                        obj: Box::new(expr),
                        field,
                        optional: false,
                        arrow: true,
                    },
                );
            } else if self.match_token(&Token::QuestionDot) {
                let field = self.parse_field_name()?;
                expr = self.mk_expr(
                    start,
                    ExprKind::FieldAccess {
                        obj: Box::new(expr),
                        field,
                        optional: true,
                        arrow: false,
                    },
                );
            } else if self.check(&Token::PlusPlus) || self.check(&Token::MinusMinus) {
                let op = if self.check(&Token::PlusPlus) { "++" } else { "--" };
                self.advance();
                expr = self.mk_expr(
                    start,
                    ExprKind::Unary {
                        op: op.to_string(),
                        operand: Box::new(expr),
                        prefix: false,
                    },
                );
            } else {
                break;
            }
        }
        Ok(expr)
    }

    /// Field/method names may collide with soft keywords (`get`, `set`).
    fn parse_field_name(&mut self) -> Result<String, ParseError> {
        match self.peek().clone() {
            Token::Ident(name) => {
                self.advance();
                Ok(name)
            }
            Token::Get => {
                self.advance();
                Ok("get".to_string())
            }
            Token::Set => {
                self.advance();
                Ok("set".to_string())
            }
            _ => Err(self.error("Expected field or method name")),
        }
    }

    pub(crate) fn parse_call_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        if self.match_token(&Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expression()?);
            if !self.match_token(&Token::Comma) {
                break;
            }
        }
        self.consume(&Token::RParen, "Expected ')' after arguments")?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let start = self.current;

        // Typed lambda: `int function(int a) { ... }`
        if matches!(self.peek(), Token::Ident(_)) {
            let saved = self.current;
            let saved_id = self.next_id;
            if let Some(ret) = self.try_parse_type() {
                if self.check(&Token::Function) {
                    self.advance();
                    self.consume(&Token::LParen, "Expected '(' after 'function'")?;
                    let params = self.parse_params()?;
                    self.consume(&Token::RParen, "Expected ')' after lambda parameters")?;
                    let body = LambdaBody::Block(self.parse_block()?);
                    return Ok(self.mk_expr(
                        start,
                        ExprKind::Lambda(Box::new(LambdaExpr {
                            params,
                            return_type: Some(ret),
                            body,
                        })),
                    ));
                }
                self.current = saved;
                self.next_id = saved_id;
            }
        }

        match self.peek().clone() {
            Token::IntLiteral(raw) => {
                self.advance();
                Ok(self.mk_expr(start, ExprKind::IntLiteral { raw }))
            }
            Token::FloatLiteral(raw) => {
                self.advance();
                Ok(self.mk_expr(start, ExprKind::FloatLiteral { raw }))
            }
            Token::StringLiteral(raw) => {
                self.advance();
                Ok(self.mk_expr(start, ExprKind::StringLiteral { raw }))
            }
            Token::CharLiteral(raw) => {
                self.advance();
                Ok(self.mk_expr(start, ExprKind::CharLiteral { raw }))
            }
            Token::FStringLiteral(body) => {
                self.advance();
                let parts = self.parse_fstring_parts(&body)?;
                Ok(self.mk_expr(start, ExprKind::FString { parts }))
            }
            Token::True => {
                self.advance();
                Ok(self.mk_expr(start, ExprKind::BoolLiteral { value: true }))
            }
            Token::False => {
                self.advance();
                Ok(self.mk_expr(start, ExprKind::BoolLiteral { value: false }))
            }
            Token::Null => {
                self.advance();
                Ok(self.mk_expr(start, ExprKind::NullLiteral))
            }
            Token::SelfKw => {
                self.advance();
                Ok(self.mk_expr(start, ExprKind::SelfExpr))
            }
            Token::Super => {
                self.advance();
                Ok(self.mk_expr(start, ExprKind::SuperExpr))
            }
            Token::Ident(name) => {
                self.advance();
                Ok(self.mk_expr(start, ExprKind::Identifier { name }))
            }
            Token::LParen => self.parse_paren_expr(),
            Token::LBracket => {
                self.advance();
                let mut elements = Vec::new();
                if !self.check(&Token::RBracket) {
                    loop {
                        elements.push(self.parse_expression()?);
                        if !self.match_token(&Token::Comma) {
                            break;
                        }
                    }
                }
                self.consume(&Token::RBracket, "Expected ']' after list literal")?;
                Ok(self.mk_expr(start, ExprKind::ListLiteral { elements }))
            }
            Token::LBrace => self.parse_brace_expr(),
            _ => Err(self.error("Expected expression")),
        }
    }

    /// `(...)`: arrow lambda, tuple literal, or grouping.
    fn parse_paren_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.current;

        // Arrow lambda: (params) => expr — try typed params first.
        let saved = self.current;
        let saved_id = self.next_id;
        self.advance(); // consume '('
        if let Ok(params) = self.parse_params() {
            if self.check(&Token::RParen) && self.check_ahead(1, &Token::FatArrow) {
                self.advance();
                self.advance();
                let body_expr = self.parse_expression()?;
                return Ok(self.mk_expr(
                    start,
                    ExprKind::Lambda(Box::new(LambdaExpr {
                        params,
                        return_type: None,
                        body: LambdaBody::Expr(body_expr),
                    })),
                ));
            }
        }
        self.current = saved;
        self.next_id = saved_id;

        self.advance(); // consume '('
        let first = self.parse_expression()?;
        if self.match_token(&Token::Comma) {
            let mut elements = vec![first];
            loop {
                elements.push(self.parse_expression()?);
                if !self.match_token(&Token::Comma) {
                    break;
                }
            }
            self.consume(&Token::RParen, "Expected ')' after tuple literal")?;
            return Ok(self.mk_expr(start, ExprKind::TupleLiteral { elements }));
        }
        self.consume(&Token::RParen, "Expected ')' after expression")?;
        Ok(first)
    }

    /// `{...}`: empty brace init, map literal (`k: v`), or brace init
    /// list.
    fn parse_brace_expr(&mut self) -> Result<Expr, ParseError> {
        let start = self.current;
        self.advance(); // consume '{'

        if self.match_token(&Token::RBrace) {
            return Ok(self.mk_expr(start, ExprKind::BraceInit { elements: vec![] }));
        }

        let first = self.parse_expression()?;
        if self.match_token(&Token::Colon) {
            let first_val = self.parse_expression()?;
            let mut entries = vec![MapEntry {
                key: first,
                value: first_val,
            }];
            while self.match_token(&Token::Comma) {
                if self.check(&Token::RBrace) {
                    break;
                }
                let k = self.parse_expression()?;
                self.consume(&Token::Colon, "Expected ':' in map literal")?;
                let v = self.parse_expression()?;
                entries.push(MapEntry { key: k, value: v });
            }
            self.consume(&Token::RBrace, "Expected '}' after map literal")?;
            return Ok(self.mk_expr(start, ExprKind::MapLiteral { entries }));
        }

        let mut elements = vec![first];
        while self.match_token(&Token::Comma) {
            if self.check(&Token::RBrace) {
                break;
            }
            elements.push(self.parse_expression()?);
        }
        self.consume(&Token::RBrace, "Expected '}' after brace initializer")?;
        Ok(self.mk_expr(start, ExprKind::BraceInit { elements }))
    }

    /// Split an f-string body into text and interpolation parts.
    /// `{{` and `}}` escape literal braces.
    fn parse_fstring_parts(&mut self, body: &str) -> Result<Vec<FStringPart>, ParseError> {
        let mut parts = Vec::new();
        let mut text = String::new();
        let chars: Vec<char> = body.chars().collect();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            if c == '{' {
                if i + 1 < chars.len() && chars[i + 1] == '{' {
                    text.push('{');
                    i += 2;
                    continue;
                }
                // Find matching '}' (interpolations may nest braces in
                // expressions only through map literals, which we track
                // with a depth counter).
                let mut depth = 1;
                let mut j = i + 1;
                let mut frag = String::new();
                while j < chars.len() {
                    match chars[j] {
                        '{' => depth += 1,
                        '}' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                    frag.push(chars[j]);
                    j += 1;
                }
                if depth != 0 {
                    return Err(self.error("Unterminated '{' in f-string"));
                }
                if !text.is_empty() {
                    parts.push(FStringPart::Text(unescape_string(&text)));
                    text = String::new();
                }
                let expr = self.parse_embedded_expr(&frag)?;
                parts.push(FStringPart::Expr(expr));
                i = j + 1;
            } else if c == '}' {
                if i + 1 < chars.len() && chars[i + 1] == '}' {
                    text.push('}');
                    i += 2;
                    continue;
                }
                text.push('}');
                i += 1;
            } else {
                text.push(c);
                i += 1;
            }
        }
        if !text.is_empty() {
            parts.push(FStringPart::Text(unescape_string(&text)));
        }
        Ok(parts)
    }

    /// Could the current token begin an expression? Used to reject
    /// `(name)` grouping being misread as a cast.
    fn starts_expression(&self) -> bool {
        matches!(
            self.peek(),
            Token::IntLiteral(_)
                | Token::FloatLiteral(_)
                | Token::StringLiteral(_)
                | Token::CharLiteral(_)
                | Token::FStringLiteral(_)
                | Token::Ident(_)
                | Token::True
                | Token::False
                | Token::Null
                | Token::SelfKw
                | Token::Super
                | Token::LParen
                | Token::LBracket
                | Token::LBrace
                | Token::New
                | Token::Spawn
                | Token::Sizeof
                | Token::Not
                | Token::Minus
                | Token::Tilde
                | Token::Star
                | Token::Amp
                | Token::PlusPlus
                | Token::MinusMinus
        )
    }
}
