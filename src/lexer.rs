use std::sync::LazyLock;

use logos::Logos;
use regex::Regex;

use crate::error::{Error, Result};
use crate::token::{Span, Token, TokenKind};

static INT_LITERAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[+-]?[0-9]+$").unwrap());
static FLOAT_LITERAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?([0-9]+\.[0-9]*|\.[0-9]+)$").unwrap());

/// Decodes a quoted string literal, dropping the surrounding quotes.
pub fn unescape_string(input: &str) -> String {
    let mut result = String::new();
    let mut chars = input.chars().peekable();

    chars.next();
    chars.next_back();

    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                match escaped {
                    'n' => result.push('\n'),
                    't' => result.push('\t'),
                    'r' => result.push('\r'),
                    '"' => result.push('"'),
                    '\\' => result.push('\\'),
                    _ => {
                        result.push('\\');
                        result.push(escaped);
                    }
                }
            }
        } else {
            result.push(c);
        }
    }

    result
}

/// Inverse of [`unescape_string`]: quotes `input` so it reads back unchanged.
pub fn escape_string(input: &str) -> String {
    let mut result = String::with_capacity(input.len() + 2);
    result.push('"');

    for c in input.chars() {
        match c {
            '\n' => result.push_str("\\n"),
            '\t' => result.push_str("\\t"),
            '\r' => result.push_str("\\r"),
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            _ => result.push(c),
        }
    }

    result.push('"');
    result
}

/// Decides what a bare word is once it has been cut out of the source.
pub fn classify(word: &str) -> TokenKind {
    if INT_LITERAL.is_match(word) {
        if word.parse::<i64>().is_ok() {
            TokenKind::IntLiteral
        } else {
            TokenKind::FloatLiteral
        }
    } else if FLOAT_LITERAL.is_match(word) {
        TokenKind::FloatLiteral
    } else {
        match word {
            "true" | "false" => TokenKind::BoolLiteral,
            "nil" => TokenKind::NilLiteral,
            _ => TokenKind::Identifier,
        }
    }
}

#[derive(Logos, Clone, Debug, PartialEq)]
#[logos(skip r"([ \t\r\n\f]+|#[^\n]*)")]
enum Lexeme {
    #[token("(")]
    OpenParen,

    #[token(")")]
    CloseParen,

    #[token("[")]
    OpenBracket,

    #[token("]")]
    CloseBracket,

    #[regex(r#""([^"\\]|\\.)*""#)]
    StringLiteral,

    #[regex(r##"[^ \t\r\n\f()\[\]"#]+"##)]
    Word,
}

pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();

    for (lexeme, range) in Lexeme::lexer(source).spanned() {
        let slice = &source[range.clone()];
        let span = Span(range.start, range.end);

        let kind = match lexeme {
            Ok(Lexeme::OpenParen) => TokenKind::OpenParen,
            Ok(Lexeme::CloseParen) => TokenKind::CloseParen,
            Ok(Lexeme::OpenBracket) => TokenKind::OpenBracket,
            Ok(Lexeme::CloseBracket) => TokenKind::CloseBracket,
            Ok(Lexeme::StringLiteral) => TokenKind::StringLiteral,
            Ok(Lexeme::Word) => classify(slice),
            Err(()) if slice.starts_with('"') => {
                return Err(Error::syntax("unterminated string literal", range.start));
            }
            Err(()) => {
                return Err(Error::syntax(format!("unexpected character `{}`", slice), range.start));
            }
        };

        tokens.push(Token::new(kind, slice.to_owned(), span));
    }

    Ok(tokens)
}
