use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
  Identifier,
  OpenParen,
  CloseParen,
  OpenBracket,
  CloseBracket,

  StringLiteral,
  BoolLiteral,
  IntLiteral,
  FloatLiteral,
  NilLiteral,
}

/// Byte range of a token in the source it was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span(pub usize, pub usize);

impl fmt::Display for Span {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}..{}", self.0, self.1)
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
  pub kind: TokenKind,
  pub slice: String,
  pub span: Span,
}

impl Token {
  pub fn new(kind: TokenKind, slice: String, span: Span) -> Token {
    Token {
      kind,
      slice,
      span,
    }
  }

  pub fn is(&self, kind: TokenKind) -> bool {
    self.kind == kind
  }

  /// Two tokens read the same when kind and text match, wherever they came from.
  pub fn same_text(&self, other: &Token) -> bool {
    self.kind == other.kind && self.slice == other.slice
  }
}

/// Index of the token closing the group opened at `open`, counting nested
/// groups of the same kind.
pub fn matching_close(tokens: &[Token], open: usize) -> Option<usize> {
  let (opener, closer) = match tokens.get(open)?.kind {
    TokenKind::OpenParen => (TokenKind::OpenParen, TokenKind::CloseParen),
    TokenKind::OpenBracket => (TokenKind::OpenBracket, TokenKind::CloseBracket),
    _ => return None,
  };

  let mut depth = 0usize;
  for (i, token) in tokens.iter().enumerate().skip(open) {
    if token.kind == opener {
      depth += 1;
    } else if token.kind == closer {
      depth -= 1;
      if depth == 0 {
        return Some(i);
      }
    }
  }

  None
}

/// Renders a token span back into source text.
pub fn render(tokens: &[Token]) -> String {
  let mut out = String::new();
  let mut prev: Option<TokenKind> = None;

  for token in tokens {
    let glue = matches!(prev, None | Some(TokenKind::OpenParen) | Some(TokenKind::OpenBracket))
      || matches!(token.kind, TokenKind::CloseParen | TokenKind::CloseBracket);
    if !glue {
      out.push(' ');
    }
    out.push_str(&token.slice);
    prev = Some(token.kind);
  }

  out
}
