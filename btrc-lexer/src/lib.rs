use logos::Logos;
use std::ops::Range;

/// Token types for the btrc language.
///
/// Literal tokens keep their raw source text: the C emitter passes
/// integer spellings (hex, octal) straight through, and string/char
/// literals are emitted quotes-and-all.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
#[logos(skip r"//[^\n]*")]
#[logos(skip r"/\*([^*]|\*[^/])*\*/")]
pub enum Token {
    // Keywords
    #[token("class")]
    Class,
    #[token("extends")]
    Extends,
    #[token("interface")]
    Interface,
    #[token("enum")]
    Enum,
    #[token("struct")]
    Struct,
    #[token("typedef")]
    Typedef,
    #[token("new")]
    New,
    #[token("delete")]
    Delete,
    #[token("spawn")]
    Spawn,
    #[token("parallel")]
    Parallel,
    #[token("try")]
    Try,
    #[token("catch")]
    Catch,
    #[token("finally")]
    Finally,
    #[token("throw")]
    Throw,
    #[token("release")]
    Release,
    #[token("keep")]
    Keep,
    #[token("return")]
    Return,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("do")]
    Do,
    #[token("for")]
    For,
    #[token("in")]
    In,
    #[token("break")]
    Break,
    #[token("continue")]
    Continue,
    #[token("switch")]
    Switch,
    #[token("case")]
    Case,
    #[token("default")]
    Default,
    #[token("null")]
    Null,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("self")]
    SelfKw,
    #[token("super")]
    Super,
    #[token("public")]
    Public,
    #[token("private")]
    Private,
    #[token("protected")]
    Protected,
    #[token("static")]
    Static,
    #[token("abstract")]
    Abstract,
    #[token("property")]
    Property,
    #[token("get")]
    Get,
    #[token("set")]
    Set,
    #[token("function")]
    Function,
    #[token("const")]
    Const,
    #[token("sizeof")]
    Sizeof,

    // Literals (raw text preserved)
    #[regex(r"0[xX][0-9a-fA-F]+", |lex| lex.slice().to_string(), priority = 4)]
    #[regex(r"0[oO][0-7]+", |lex| lex.slice().to_string(), priority = 4)]
    #[regex(r"[0-9]+", |lex| lex.slice().to_string(), priority = 2)]
    IntLiteral(String),

    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice().to_string())]
    FloatLiteral(String),

    /// Raw slice including quotes.
    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| lex.slice().to_string())]
    StringLiteral(String),

    /// Raw slice including quotes.
    #[regex(r"'([^'\\\n]|\\.)'", |lex| lex.slice().to_string())]
    CharLiteral(String),

    /// Body of an f-string without the `f"` prefix and closing quote.
    #[regex(r#"f"([^"\\\n]|\\.)*""#, |lex| {
        let s = lex.slice();
        s[2..s.len() - 1].to_string()
    })]
    FStringLiteral(String),

    /// A malformed numeric literal like `123abc` or a bare `0x`.
    /// Caught here so the error points at the whole bad token.
    #[regex(r"[0-9][0-9a-zA-Z_]*[a-zA-Z_][0-9a-zA-Z_]*", |lex| lex.slice().to_string(), priority = 3)]
    BadNumber(String),

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    /// Whole preprocessor line, passed through to the C output.
    #[regex(r"#[^\n]*", |lex| lex.slice().to_string())]
    PreprocessorLine(String),

    // Multi-char operators (longest first where prefixes overlap)
    #[token("?.")]
    QuestionDot,
    #[token("??")]
    QuestionQuestion,
    #[token("=>")]
    FatArrow,
    #[token("->")]
    Arrow,
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<=")]
    LtEq,
    #[token(">=")]
    GtEq,
    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token("++")]
    PlusPlus,
    #[token("--")]
    MinusMinus,
    #[token("+=")]
    PlusEq,
    #[token("-=")]
    MinusEq,
    #[token("*=")]
    StarEq,
    #[token("/=")]
    SlashEq,
    #[token("%=")]
    PercentEq,

    // Single-char operators and punctuation
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("=")]
    Eq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("!")]
    Not,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("~")]
    Tilde,
    #[token("?")]
    Question,
    #[token(":")]
    Colon,
    #[token(";")]
    Semicolon,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
}

/// A token with its byte span in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenSpan {
    pub token: Token,
    pub span: Range<usize>,
}

#[derive(Debug, thiserror::Error)]
pub enum LexError {
    #[error("unknown character '{ch}'")]
    UnknownChar { ch: char, span: Range<usize> },
    #[error("unterminated string literal")]
    UnterminatedString { span: Range<usize> },
    #[error("malformed numeric literal '{text}'")]
    MalformedNumber { text: String, span: Range<usize> },
}

impl LexError {
    pub fn span(&self) -> Range<usize> {
        match self {
            LexError::UnknownChar { span, .. }
            | LexError::UnterminatedString { span, .. }
            | LexError::MalformedNumber { span, .. } => span.clone(),
        }
    }
}

/// Iterator over spanned tokens.
pub struct Lexer<'a> {
    inner: logos::Lexer<'a, Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            inner: Token::lexer(source),
        }
    }

    /// Lex the whole source, stopping at the first error.
    pub fn tokenize(source: &'a str) -> Result<Vec<TokenSpan>, LexError> {
        Lexer::new(source).collect()
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Result<TokenSpan, LexError>;

    fn next(&mut self) -> Option<Self::Item> {
        let token = self.inner.next()?;
        let span = self.inner.span();

        match token {
            Ok(Token::BadNumber(text)) => {
                Some(Err(LexError::MalformedNumber { text, span }))
            }
            Ok(tok) => Some(Ok(TokenSpan { token: tok, span })),
            Err(_) => {
                let slice = self.inner.slice();
                if slice.starts_with('"') || slice.starts_with("f\"") {
                    Some(Err(LexError::UnterminatedString { span }))
                } else {
                    let ch = slice.chars().next().unwrap_or('\0');
                    Some(Err(LexError::UnknownChar { ch, span }))
                }
            }
        }
    }
}

/// Unescape a quoted string literal body (no surrounding quotes).
pub fn unescape_string(s: &str) -> String {
    let mut result = String::new();
    let mut chars = s.chars();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('r') => result.push('\r'),
                Some('t') => result.push('\t'),
                Some('0') => result.push('\0'),
                Some('"') => result.push('"'),
                Some('\\') => result.push('\\'),
                Some(c) => {
                    result.push('\\');
                    result.push(c);
                }
                None => result.push('\\'),
            }
        } else {
            result.push(ch);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords() {
        let source = "class extends new delete spawn keep release";
        let mut lexer = Lexer::new(source);

        assert_eq!(lexer.next().unwrap().unwrap().token, Token::Class);
        assert_eq!(lexer.next().unwrap().unwrap().token, Token::Extends);
        assert_eq!(lexer.next().unwrap().unwrap().token, Token::New);
        assert_eq!(lexer.next().unwrap().unwrap().token, Token::Delete);
        assert_eq!(lexer.next().unwrap().unwrap().token, Token::Spawn);
        assert_eq!(lexer.next().unwrap().unwrap().token, Token::Keep);
        assert_eq!(lexer.next().unwrap().unwrap().token, Token::Release);
    }

    #[test]
    fn test_literals_keep_raw_text() {
        let source = r#"42 0o17 0xFF 3.14 "hi" 'A'"#;
        let tokens: Vec<_> = Lexer::new(source).map(|r| r.unwrap().token).collect();

        assert_eq!(tokens[0], Token::IntLiteral("42".to_string()));
        assert_eq!(tokens[1], Token::IntLiteral("0o17".to_string()));
        assert_eq!(tokens[2], Token::IntLiteral("0xFF".to_string()));
        assert_eq!(tokens[3], Token::FloatLiteral("3.14".to_string()));
        assert_eq!(tokens[4], Token::StringLiteral("\"hi\"".to_string()));
        assert_eq!(tokens[5], Token::CharLiteral("'A'".to_string()));
    }

    #[test]
    fn test_fstring_body() {
        let source = r#"f"sum: {a + b}""#;
        let mut lexer = Lexer::new(source);
        assert_eq!(
            lexer.next().unwrap().unwrap().token,
            Token::FStringLiteral("sum: {a + b}".to_string())
        );
    }

    #[test]
    fn test_operators() {
        let source = "?? ?. => -> == != <= >= && ||";
        let tokens: Vec<_> = Lexer::new(source).map(|r| r.unwrap().token).collect();
        assert_eq!(
            tokens,
            vec![
                Token::QuestionQuestion,
                Token::QuestionDot,
                Token::FatArrow,
                Token::Arrow,
                Token::EqEq,
                Token::NotEq,
                Token::LtEq,
                Token::GtEq,
                Token::AndAnd,
                Token::OrOr,
            ]
        );
    }

    #[test]
    fn test_comments_skipped() {
        let source = "int // line comment\n/* block\ncomment */ x";
        let tokens: Vec<_> = Lexer::new(source).map(|r| r.unwrap().token).collect();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0], Token::Ident("int".to_string()));
        assert_eq!(tokens[1], Token::Ident("x".to_string()));
    }

    #[test]
    fn test_malformed_number() {
        let mut lexer = Lexer::new("int x = 12ab;");
        lexer.next();
        lexer.next();
        lexer.next();
        let err = lexer.next().unwrap().unwrap_err();
        assert!(matches!(err, LexError::MalformedNumber { .. }));
    }

    #[test]
    fn test_unterminated_string() {
        let err = Lexer::tokenize("string s = \"oops;\n").unwrap_err();
        assert!(matches!(err, LexError::UnterminatedString { .. }));
    }

    #[test]
    fn test_preprocessor_line() {
        let source = "#include <math.h>\nint x;";
        let tokens: Vec<_> = Lexer::new(source).map(|r| r.unwrap().token).collect();
        assert_eq!(
            tokens[0],
            Token::PreprocessorLine("#include <math.h>".to_string())
        );
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape_string(r"a\nb"), "a\nb");
        assert_eq!(unescape_string(r#"say \"hi\""#), "say \"hi\"");
    }
}
