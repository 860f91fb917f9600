// Statement parsing: declarations vs expressions, control flow,
// try/catch, release/delete.

use super::Parser;
use crate::ParseError;
use btrc_ast::*;
use btrc_lexer::Token;

impl<'a> Parser<'a> {
    pub(crate) fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        if self.match_token(&Token::Return) {
            let value = if self.check(&Token::Semicolon) {
                None
            } else {
                Some(self.parse_expression()?)
            };
            self.consume(&Token::Semicolon, "Expected ';' after return")?;
            return Ok(Stmt::Return { value });
        }

        if self.match_token(&Token::If) {
            return Ok(Stmt::If(self.parse_if()?));
        }

        if self.match_token(&Token::While) {
            self.consume(&Token::LParen, "Expected '(' after 'while'")?;
            let condition = self.parse_expression()?;
            self.consume(&Token::RParen, "Expected ')' after while condition")?;
            let body = self.parse_block()?;
            return Ok(Stmt::While { condition, body });
        }

        if self.match_token(&Token::Do) {
            let body = self.parse_block()?;
            self.consume(&Token::While, "Expected 'while' after do block")?;
            self.consume(&Token::LParen, "Expected '(' after 'while'")?;
            let condition = self.parse_expression()?;
            self.consume(&Token::RParen, "Expected ')' after do-while condition")?;
            self.consume(&Token::Semicolon, "Expected ';' after do-while")?;
            return Ok(Stmt::DoWhile { body, condition });
        }

        if self.check(&Token::Parallel) && self.check_ahead(1, &Token::For) {
            self.advance();
            self.advance();
            return self.parse_for(true);
        }

        if self.match_token(&Token::For) {
            return self.parse_for(false);
        }

        if self.match_token(&Token::Switch) {
            return Ok(Stmt::Switch(self.parse_switch()?));
        }

        if self.match_token(&Token::Break) {
            self.consume(&Token::Semicolon, "Expected ';' after 'break'")?;
            return Ok(Stmt::Break);
        }

        if self.match_token(&Token::Continue) {
            self.consume(&Token::Semicolon, "Expected ';' after 'continue'")?;
            return Ok(Stmt::Continue);
        }

        if self.match_token(&Token::Delete) {
            let expr = self.parse_expression()?;
            self.consume(&Token::Semicolon, "Expected ';' after 'delete'")?;
            return Ok(Stmt::Delete { expr });
        }

        if self.match_token(&Token::Release) {
            let expr = self.parse_expression()?;
            self.consume(&Token::Semicolon, "Expected ';' after 'release'")?;
            return Ok(Stmt::Release { expr });
        }

        if self.match_token(&Token::Throw) {
            let expr = self.parse_expression()?;
            self.consume(&Token::Semicolon, "Expected ';' after 'throw'")?;
            return Ok(Stmt::Throw { expr });
        }

        if self.match_token(&Token::Try) {
            return Ok(Stmt::TryCatch(self.parse_try_catch()?));
        }

        // Variable declaration or expression statement. A declaration
        // is `type name ...`; backtrack when the shape doesn't fit.
        if let Some(stmt) = self.try_parse_var_decl()? {
            return Ok(stmt);
        }

        let expr = self.parse_expression()?;
        self.consume(&Token::Semicolon, "Expected ';' after expression")?;
        Ok(Stmt::Expr(expr))
    }

    fn try_parse_var_decl(&mut self) -> Result<Option<Stmt>, ParseError> {
        if !matches!(self.peek(), Token::Ident(_) | Token::Const | Token::LParen) {
            return Ok(None);
        }
        let saved = self.current;
        let saved_id = self.next_id;
        let (line, col) = self.current_line_col();

        let ty = match self.parse_type() {
            Ok(t) => t,
            Err(_) => {
                self.current = saved;
                self.next_id = saved_id;
                return Ok(None);
            }
        };
        let name = match self.peek().clone() {
            Token::Ident(n) => {
                self.advance();
                n
            }
            _ => {
                self.current = saved;
                self.next_id = saved_id;
                return Ok(None);
            }
        };
        // Must be followed by '=', ';' or '[' to be a declaration.
        if !(self.check(&Token::Eq) || self.check(&Token::Semicolon) || self.check(&Token::LBracket))
        {
            self.current = saved;
            self.next_id = saved_id;
            return Ok(None);
        }

        let mut ty = ty;
        self.parse_array_suffix(&mut ty)?;
        let initializer = if self.match_token(&Token::Eq) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.consume(&Token::Semicolon, "Expected ';' after variable declaration")?;
        Ok(Some(Stmt::VarDecl(VarDecl {
            ty: Some(ty),
            name,
            initializer,
            line,
            col,
        })))
    }

    fn parse_if(&mut self) -> Result<IfStmt, ParseError> {
        self.consume(&Token::LParen, "Expected '(' after 'if'")?;
        let condition = self.parse_expression()?;
        self.consume(&Token::RParen, "Expected ')' after if condition")?;
        let then_block = self.parse_block()?;

        let else_branch = if self.match_token(&Token::Else) {
            if self.match_token(&Token::If) {
                Some(ElseBranch::ElseIf(Box::new(self.parse_if()?)))
            } else {
                Some(ElseBranch::Else(self.parse_block()?))
            }
        } else {
            None
        };

        Ok(IfStmt {
            condition,
            then_block,
            else_branch,
        })
    }

    fn parse_for(&mut self, is_parallel: bool) -> Result<Stmt, ParseError> {
        // C-style: for (init; cond; update) { ... }
        if self.match_token(&Token::LParen) {
            let init = if self.check(&Token::Semicolon) {
                None
            } else if let Some(Stmt::VarDecl(vd)) = self.try_parse_for_var_decl()? {
                return self.finish_c_for(Some(ForInit::Var(vd)));
            } else {
                Some(ForInit::Expr(self.parse_expression()?))
            };
            self.consume(&Token::Semicolon, "Expected ';' after for initializer")?;
            return self.finish_c_for_after_init(init);
        }

        // for x in iterable / for k, v in iterable
        let var_name = self.consume_ident("Expected loop variable name")?;
        let var_name2 = if self.match_token(&Token::Comma) {
            Some(self.consume_ident("Expected second loop variable name")?)
        } else {
            None
        };
        self.consume(&Token::In, "Expected 'in' in for loop")?;
        let iterable = self.parse_expression()?;
        let body = self.parse_block()?;
        Ok(Stmt::ForIn(ForInStmt {
            var_name,
            var_name2,
            iterable,
            body,
            is_parallel,
        }))
    }

    /// `for (int i = 0; ...` — the declaration includes its ';'.
    fn try_parse_for_var_decl(&mut self) -> Result<Option<Stmt>, ParseError> {
        if !matches!(self.peek(), Token::Ident(_) | Token::Const) {
            return Ok(None);
        }
        let saved = self.current;
        let saved_id = self.next_id;
        let (line, col) = self.current_line_col();
        let ty = match self.parse_type() {
            Ok(t) => t,
            Err(_) => {
                self.current = saved;
                self.next_id = saved_id;
                return Ok(None);
            }
        };
        let name = match self.peek().clone() {
            Token::Ident(n) => {
                self.advance();
                n
            }
            _ => {
                self.current = saved;
                self.next_id = saved_id;
                return Ok(None);
            }
        };
        if !(self.check(&Token::Eq) || self.check(&Token::Semicolon)) {
            self.current = saved;
            self.next_id = saved_id;
            return Ok(None);
        }
        let initializer = if self.match_token(&Token::Eq) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.consume(&Token::Semicolon, "Expected ';' after for-loop declaration")?;
        Ok(Some(Stmt::VarDecl(VarDecl {
            ty: Some(ty),
            name,
            initializer,
            line,
            col,
        })))
    }

    fn finish_c_for(&mut self, init: Option<ForInit>) -> Result<Stmt, ParseError> {
        self.finish_c_for_after_init(init)
    }

    fn finish_c_for_after_init(&mut self, init: Option<ForInit>) -> Result<Stmt, ParseError> {
        let condition = if self.check(&Token::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume(&Token::Semicolon, "Expected ';' after for condition")?;
        let update = if self.check(&Token::RParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.consume(&Token::RParen, "Expected ')' after for clauses")?;
        let body = self.parse_block()?;
        Ok(Stmt::CFor(CForStmt {
            init,
            condition,
            update,
            body,
        }))
    }

    fn parse_switch(&mut self) -> Result<SwitchStmt, ParseError> {
        self.consume(&Token::LParen, "Expected '(' after 'switch'")?;
        let value = self.parse_expression()?;
        self.consume(&Token::RParen, "Expected ')' after switch value")?;
        self.consume(&Token::LBrace, "Expected '{' after switch header")?;

        let mut cases = Vec::new();
        while !self.check(&Token::RBrace) && !self.is_at_end() {
            let case_value = if self.match_token(&Token::Case) {
                let v = self.parse_expression()?;
                self.consume(&Token::Colon, "Expected ':' after case value")?;
                Some(v)
            } else if self.match_token(&Token::Default) {
                self.consume(&Token::Colon, "Expected ':' after 'default'")?;
                None
            } else {
                return Err(self.error("Expected 'case' or 'default' in switch body"));
            };

            let mut body = Vec::new();
            while !self.check(&Token::Case)
                && !self.check(&Token::Default)
                && !self.check(&Token::RBrace)
                && !self.is_at_end()
            {
                body.push(self.parse_statement()?);
            }
            cases.push(SwitchCase {
                value: case_value,
                body,
            });
        }
        self.consume(&Token::RBrace, "Expected '}' after switch body")?;
        Ok(SwitchStmt { value, cases })
    }

    fn parse_try_catch(&mut self) -> Result<TryCatchStmt, ParseError> {
        let try_block = self.parse_block()?;
        self.consume(&Token::Catch, "Expected 'catch' after try block")?;

        let mut catch_type = None;
        let mut catch_var = None;
        if self.match_token(&Token::LParen) {
            // catch (string e) or catch (e)
            let saved = self.current;
            match self.try_parse_type() {
                Some(ty) if matches!(self.peek(), Token::Ident(_)) => {
                    catch_type = Some(ty);
                    catch_var = Some(self.consume_ident("Expected catch variable")?);
                }
                _ => {
                    // Single identifier: the "type" was the variable.
                    self.current = saved;
                    catch_var = Some(self.consume_ident("Expected catch variable")?);
                }
            }
            self.consume(&Token::RParen, "Expected ')' after catch clause")?;
        }
        let catch_block = self.parse_block()?;

        let finally_block = if self.match_token(&Token::Finally) {
            Some(self.parse_block()?)
        } else {
            None
        };

        Ok(TryCatchStmt {
            try_block,
            catch_type,
            catch_var,
            catch_block,
            finally_block,
        })
    }
}
