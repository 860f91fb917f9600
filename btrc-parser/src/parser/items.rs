// Top-level declaration parsing: classes, interfaces, enums, structs,
// typedefs, functions, globals, preprocessor passthrough.

use super::Parser;
use crate::ParseError;
use btrc_ast::*;
use btrc_lexer::Token;

impl<'a> Parser<'a> {
    pub(crate) fn parse_declaration(&mut self) -> Result<Decl, ParseError> {
        if let Token::PreprocessorLine(text) = self.peek().clone() {
            self.advance();
            return Ok(Decl::Preprocessor { text });
        }
        if self.check(&Token::Abstract) && self.check_ahead(1, &Token::Class) {
            self.advance();
            self.advance();
            return Ok(Decl::Class(self.parse_class(true)?));
        }
        if self.match_token(&Token::Class) {
            return Ok(Decl::Class(self.parse_class(false)?));
        }
        if self.match_token(&Token::Interface) {
            return Ok(Decl::Interface(self.parse_interface()?));
        }
        if self.match_token(&Token::Enum) {
            return self.parse_enum();
        }
        if self.match_token(&Token::Struct) {
            return Ok(Decl::Struct(self.parse_struct()?));
        }
        if self.match_token(&Token::Typedef) {
            let ty = self.parse_type()?;
            let name = self.consume_ident("Expected typedef name")?;
            self.consume(&Token::Semicolon, "Expected ';' after typedef")?;
            return Ok(Decl::Typedef(TypedefDecl { name, ty }));
        }

        // Function or top-level variable: both start with `keep`? type name.
        self.parse_function_or_var()
    }

    fn parse_function_or_var(&mut self) -> Result<Decl, ParseError> {
        let (line, col) = self.current_line_col();
        let keep_return = self.match_token(&Token::Keep);
        let ty = self.parse_type()?;
        let name = self.consume_ident("Expected declaration name")?;

        // Generic function: T identity<T>(T x)
        let generic_params = if self.check(&Token::Lt) {
            self.parse_generic_params()?
        } else {
            Vec::new()
        };

        if self.check(&Token::LParen) {
            self.advance();
            let params = self.parse_params()?;
            self.consume(&Token::RParen, "Expected ')' after parameters")?;
            let body = if self.match_token(&Token::Semicolon) {
                None
            } else {
                Some(self.parse_block()?)
            };
            return Ok(Decl::Function(FunctionDecl {
                keep_return,
                return_type: Some(ty),
                name,
                generic_params,
                params,
                body,
                line,
                col,
            }));
        }

        if keep_return || !generic_params.is_empty() {
            return Err(self.error("Expected '(' after function name"));
        }

        // Top-level variable
        let mut ty = ty;
        self.parse_array_suffix(&mut ty)?;
        let initializer = if self.match_token(&Token::Eq) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.consume(&Token::Semicolon, "Expected ';' after global variable")?;
        Ok(Decl::Var(VarDecl {
            ty: Some(ty),
            name,
            initializer,
            line,
            col,
        }))
    }

    pub(crate) fn parse_params(&mut self) -> Result<Vec<Param>, ParseError> {
        let mut params = Vec::new();
        if self.check(&Token::RParen) {
            return Ok(params);
        }
        loop {
            let keep = self.match_token(&Token::Keep);
            let mut ty = self.parse_type()?;
            let name = self.consume_ident("Expected parameter name")?;
            self.parse_array_suffix(&mut ty)?;
            let default = if self.match_token(&Token::Eq) {
                Some(self.parse_expression()?)
            } else {
                None
            };
            params.push(Param {
                name,
                ty,
                default,
                keep,
            });
            if !self.match_token(&Token::Comma) {
                break;
            }
        }
        Ok(params)
    }

    // ==================== Classes ====================

    fn parse_class(&mut self, is_abstract: bool) -> Result<ClassDecl, ParseError> {
        let (line, col) = self.current_line_col();
        let name = self.consume_ident("Expected class name")?;
        let generic_params = self.parse_generic_params()?;

        let mut parent = None;
        let mut interfaces = Vec::new();
        if self.match_token(&Token::Extends) {
            parent = Some(self.consume_ident("Expected parent class name")?);
            while self.match_token(&Token::Comma) {
                interfaces.push(self.consume_ident("Expected interface name")?);
            }
        }

        self.consume(&Token::LBrace, "Expected '{' after class header")?;
        let mut members = Vec::new();
        while !self.check(&Token::RBrace) && !self.is_at_end() {
            members.push(self.parse_class_member(&name)?);
        }
        self.consume(&Token::RBrace, "Expected '}' after class body")?;

        Ok(ClassDecl {
            name,
            parent,
            interfaces,
            generic_params,
            is_abstract,
            members,
            line,
            col,
        })
    }

    fn parse_class_member(&mut self, class_name: &str) -> Result<ClassMember, ParseError> {
        // Access modifiers are recognized and discarded (everything is
        // a C symbol in the output); static/abstract are semantic.
        let mut is_static = false;
        let mut is_abstract = false;
        loop {
            if self.match_token(&Token::Public)
                || self.match_token(&Token::Private)
                || self.match_token(&Token::Protected)
            {
                continue;
            }
            if self.match_token(&Token::Static) {
                is_static = true;
                continue;
            }
            if self.match_token(&Token::Abstract) {
                is_abstract = true;
                continue;
            }
            break;
        }

        // property declaration
        if self.match_token(&Token::Property) {
            return Ok(ClassMember::Property(self.parse_property()?));
        }

        let (line, col) = self.current_line_col();

        // Constructor: ClassName(params) { ... }
        if let Token::Ident(id) = self.peek().clone() {
            if id == class_name && self.check_ahead(1, &Token::LParen) {
                self.advance();
                self.advance();
                let params = self.parse_params()?;
                self.consume(&Token::RParen, "Expected ')' after constructor parameters")?;
                let body = Some(self.parse_block()?);
                return Ok(ClassMember::Method(MethodDecl {
                    is_static: false,
                    is_abstract: false,
                    keep_return: false,
                    return_type: None,
                    name: id,
                    params,
                    body,
                    line,
                    col,
                }));
            }
            // Destructor hook: __del__() { ... }
            if id == "__del__" && self.check_ahead(1, &Token::LParen) {
                self.advance();
                self.advance();
                self.consume(&Token::RParen, "Expected ')' after '__del__('")?;
                let body = Some(self.parse_block()?);
                return Ok(ClassMember::Method(MethodDecl {
                    is_static: false,
                    is_abstract: false,
                    keep_return: false,
                    return_type: None,
                    name: "__del__".to_string(),
                    params: Vec::new(),
                    body,
                    line,
                    col,
                }));
            }
        }

        // Method or field: keep? type name ...
        let keep_return = self.match_token(&Token::Keep);
        let mut ty = self.parse_type()?;
        let name = self.consume_ident("Expected member name")?;

        if self.check(&Token::LParen) {
            self.advance();
            let params = self.parse_params()?;
            self.consume(&Token::RParen, "Expected ')' after method parameters")?;
            let body = if self.match_token(&Token::Semicolon) {
                None
            } else {
                Some(self.parse_block()?)
            };
            if is_abstract && body.is_some() {
                return Err(self.error("Abstract method cannot have a body"));
            }
            return Ok(ClassMember::Method(MethodDecl {
                is_static,
                is_abstract,
                keep_return,
                return_type: Some(ty),
                name,
                params,
                body,
                line,
                col,
            }));
        }

        if keep_return {
            return Err(self.error("'keep' is only valid on methods and parameters"));
        }

        self.parse_array_suffix(&mut ty)?;
        let initializer = if self.match_token(&Token::Eq) {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.consume(&Token::Semicolon, "Expected ';' after field")?;
        Ok(ClassMember::Field(FieldDecl {
            ty,
            name,
            initializer,
        }))
    }

    /// `property int count;` (auto accessors) or
    /// `property int area { get { ... } set { ... } }`.
    fn parse_property(&mut self) -> Result<PropertyDecl, ParseError> {
        let ty = self.parse_type()?;
        let name = self.consume_ident("Expected property name")?;

        if self.match_token(&Token::Semicolon) {
            return Ok(PropertyDecl {
                ty,
                name,
                has_getter: true,
                getter_body: None,
                has_setter: true,
                setter_body: None,
            });
        }

        self.consume(&Token::LBrace, "Expected '{' or ';' after property name")?;
        let mut has_getter = false;
        let mut getter_body = None;
        let mut has_setter = false;
        let mut setter_body = None;
        while !self.check(&Token::RBrace) && !self.is_at_end() {
            if self.match_token(&Token::Get) {
                has_getter = true;
                if self.match_token(&Token::Semicolon) {
                    continue;
                }
                getter_body = Some(self.parse_block()?);
            } else if self.match_token(&Token::Set) {
                has_setter = true;
                if self.match_token(&Token::Semicolon) {
                    continue;
                }
                setter_body = Some(self.parse_block()?);
            } else {
                return Err(self.error("Expected 'get' or 'set' in property body"));
            }
        }
        self.consume(&Token::RBrace, "Expected '}' after property body")?;

        Ok(PropertyDecl {
            ty,
            name,
            has_getter,
            getter_body,
            has_setter,
            setter_body,
        })
    }

    // ==================== Interfaces ====================

    fn parse_interface(&mut self) -> Result<InterfaceDecl, ParseError> {
        let name = self.consume_ident("Expected interface name")?;
        let mut extends = Vec::new();
        if self.match_token(&Token::Extends) {
            loop {
                extends.push(self.consume_ident("Expected interface name after 'extends'")?);
                if !self.match_token(&Token::Comma) {
                    break;
                }
            }
        }
        self.consume(&Token::LBrace, "Expected '{' after interface header")?;
        let mut methods = Vec::new();
        while !self.check(&Token::RBrace) && !self.is_at_end() {
            let (line, col) = self.current_line_col();
            let ty = self.parse_type()?;
            let mname = self.consume_ident("Expected method name")?;
            self.consume(&Token::LParen, "Expected '(' after method name")?;
            let params = self.parse_params()?;
            self.consume(&Token::RParen, "Expected ')' after parameters")?;
            self.consume(&Token::Semicolon, "Expected ';' after interface method")?;
            methods.push(MethodDecl {
                is_static: false,
                is_abstract: true,
                keep_return: false,
                return_type: Some(ty),
                name: mname,
                params,
                body: None,
                line,
                col,
            });
        }
        self.consume(&Token::RBrace, "Expected '}' after interface body")?;
        Ok(InterfaceDecl {
            name,
            extends,
            methods,
        })
    }

    // ==================== Enums ====================

    /// `enum` is rich iff any variant carries a parameter list.
    fn parse_enum(&mut self) -> Result<Decl, ParseError> {
        let name = self.consume_ident("Expected enum name")?;
        self.consume(&Token::LBrace, "Expected '{' after enum name")?;

        let mut variants: Vec<RichVariant> = Vec::new();
        let mut values: Vec<EnumValue> = Vec::new();
        let mut is_rich = false;

        while !self.check(&Token::RBrace) && !self.is_at_end() {
            let vname = self.consume_ident("Expected enum variant name")?;
            if self.check(&Token::LParen) {
                self.advance();
                is_rich = true;
                let params = self.parse_params()?;
                self.consume(&Token::RParen, "Expected ')' after variant parameters")?;
                variants.push(RichVariant {
                    name: vname,
                    params,
                });
            } else if self.match_token(&Token::Eq) {
                let value = self.parse_expression()?;
                values.push(EnumValue {
                    name: vname.clone(),
                    value: Some(value),
                });
                variants.push(RichVariant {
                    name: vname,
                    params: Vec::new(),
                });
            } else {
                values.push(EnumValue {
                    name: vname.clone(),
                    value: None,
                });
                variants.push(RichVariant {
                    name: vname,
                    params: Vec::new(),
                });
            }
            if !self.match_token(&Token::Comma) {
                break;
            }
        }
        self.consume(&Token::RBrace, "Expected '}' after enum body")?;
        self.match_token(&Token::Semicolon);

        if is_rich {
            Ok(Decl::RichEnum(RichEnumDecl { name, variants }))
        } else {
            Ok(Decl::Enum(EnumDecl { name, values }))
        }
    }

    // ==================== Structs ====================

    fn parse_struct(&mut self) -> Result<StructDecl, ParseError> {
        let name = self.consume_ident("Expected struct name")?;
        self.consume(&Token::LBrace, "Expected '{' after struct name")?;
        let mut fields = Vec::new();
        while !self.check(&Token::RBrace) && !self.is_at_end() {
            let mut ty = self.parse_type()?;
            let fname = self.consume_ident("Expected field name")?;
            self.parse_array_suffix(&mut ty)?;
            self.consume(&Token::Semicolon, "Expected ';' after struct field")?;
            fields.push(StructField { ty, name: fname });
        }
        self.consume(&Token::RBrace, "Expected '}' after struct body")?;
        self.match_token(&Token::Semicolon);
        Ok(StructDecl { name, fields })
    }
}
