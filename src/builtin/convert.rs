use crate::builtin::{mismatch, number, text};
use crate::error::Result;
use crate::evaluator::{token_value, Evaluator, Outcome};
use crate::lexer::classify;
use crate::token::{Span, Token, TokenKind};
use crate::value::Value;

fn operand(ev: &Evaluator, mut args: Vec<Value>) -> Result<Value> {
  ev.resolve(args.remove(0))
}

pub(crate) fn int(ev: &mut Evaluator, _depth: usize, args: Vec<Value>) -> Result<Outcome> {
  let value = match operand(ev, args)? {
    Value::Int(n) => Value::Int(n),
    Value::Float(n) => Value::Int(n.trunc() as i64),
    Value::Bool(b) => Value::Int(i64::from(b)),
    Value::String(s) => match s.trim().parse::<i64>() {
      Ok(n) => Value::Int(n),
      Err(_) => match s.trim().parse::<f64>() {
        Ok(n) => Value::Int(n.trunc() as i64),
        Err(_) => return Err(mismatch("int", "numeric String", &Value::String(s))),
      },
    },
    other => return Err(mismatch("int", "number or String", &other)),
  };
  Ok(Outcome::value(value))
}

pub(crate) fn float(ev: &mut Evaluator, _depth: usize, args: Vec<Value>) -> Result<Outcome> {
  let value = match operand(ev, args)? {
    Value::String(s) => match s.trim().parse::<f64>() {
      Ok(n) => Value::Float(n),
      Err(_) => return Err(mismatch("float", "numeric String", &Value::String(s))),
    },
    other => Value::Float(number("float", &other)?),
  };
  Ok(Outcome::value(value))
}

pub(crate) fn string(ev: &mut Evaluator, _depth: usize, args: Vec<Value>) -> Result<Outcome> {
  let value = operand(ev, args)?;
  Ok(Outcome::value(Value::String(value.to_string())))
}

/// Reads a string the way the tokenizer reads a bare word or string literal.
pub(crate) fn parse(ev: &mut Evaluator, _depth: usize, args: Vec<Value>) -> Result<Outcome> {
  let value = operand(ev, args)?;
  let source = text("parse", &value)?.trim();

  let kind = if source.len() >= 2 && source.starts_with('"') && source.ends_with('"') {
    TokenKind::StringLiteral
  } else {
    classify(source)
  };
  let parsed = match kind {
    TokenKind::Identifier => Value::String(source.to_owned()),
    kind => token_value(&Token::new(kind, source.to_owned(), Span(0, source.len())))?,
  };
  Ok(Outcome::value(parsed))
}

pub(crate) fn floor(ev: &mut Evaluator, _depth: usize, args: Vec<Value>) -> Result<Outcome> {
  let n = number("floor", &operand(ev, args)?)?;
  Ok(Outcome::value(Value::number(n.floor())))
}

pub(crate) fn ceil(ev: &mut Evaluator, _depth: usize, args: Vec<Value>) -> Result<Outcome> {
  let n = number("ceil", &operand(ev, args)?)?;
  Ok(Outcome::value(Value::number(n.ceil())))
}

pub(crate) fn type_of(ev: &mut Evaluator, _depth: usize, args: Vec<Value>) -> Result<Outcome> {
  let value = operand(ev, args)?;
  Ok(Outcome::value(Value::String(value.type_name().to_owned())))
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use crate::error::Error;
  use crate::test_support::{run, value};
  use crate::value::Value;

  #[test]
  fn int_truncates_and_parses() {
    assert_eq!(value("(int 3.9)"), Value::Int(3));
    assert_eq!(value("(int -3.9)"), Value::Int(-3));
    assert_eq!(value("(int \" 42 \")"), Value::Int(42));
    assert_eq!(value("(int \"2.5\")"), Value::Int(2));
    assert_eq!(value("(int true)"), Value::Int(1));
    assert!(matches!(run("(int \"abc\")"), Err(Error::TypeMismatch { .. })));
  }

  #[test]
  fn float_keeps_a_fraction() {
    assert!(matches!(value("(float 2)"), Value::Float(n) if n == 2.0));
    assert!(matches!(value("(float \"0.25\")"), Value::Float(n) if n == 0.25));
    assert!(matches!(run("(float nil)"), Err(Error::TypeMismatch { .. })));
  }

  #[test]
  fn string_uses_the_display_form() {
    assert_eq!(value("(string 2.0)"), Value::String("2.0".into()));
    assert_eq!(value("(string [1 \"a\"])"), Value::String("[1 \"a\"]".into()));
    assert_eq!(value("(string \"raw\")"), Value::String("raw".into()));
  }

  #[test]
  fn parse_reads_literals() {
    assert_eq!(value("(parse \"12\")"), Value::Int(12));
    assert!(matches!(value("(parse \"1.5\")"), Value::Float(n) if n == 1.5));
    assert_eq!(value("(parse \"true\")"), Value::Bool(true));
    assert_eq!(value("(parse \"nil\")"), Value::Nil);
    assert_eq!(value("(parse \"word\")"), Value::String("word".into()));
    assert_eq!(value("(parse \"\\\"q\\\"\")"), Value::String("q".into()));
  }

  #[test]
  fn floor_and_ceil_return_ints() {
    assert!(matches!(value("(floor 2.7)"), Value::Int(2)));
    assert!(matches!(value("(ceil 2.1)"), Value::Int(3)));
    assert!(matches!(value("(floor -0.5)"), Value::Int(-1)));
  }

  #[test]
  fn type_names() {
    let cases = [
      ("1", "Int"),
      ("1.5", "Float"),
      ("\"s\"", "String"),
      ("false", "Bool"),
      ("[]", "List"),
      ("(struct)", "Struct"),
      ("nil", "Nil"),
      ("(func (body))", "Func"),
      ("(body)", "Body"),
    ];
    for (source, expected) in cases {
      assert_eq!(value(&format!("(type {})", source)), Value::String(expected.into()), "{}", source);
    }
  }
}
