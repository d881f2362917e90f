use std::fmt;
use std::fmt::Formatter;
use std::rc::Rc;

use crate::lexer::escape_string;
use crate::token::{render, Token};

/// A captured, unevaluated token span. Loop, conditional and function bodies
/// are stored this way and evaluated on demand.
#[derive(Debug, Clone)]
pub struct Block {
  tokens: Rc<[Token]>,
}

impl Block {
  pub fn new(tokens: &[Token]) -> Self {
    Block {
      tokens: tokens.into(),
    }
  }

  pub fn tokens(&self) -> &[Token] {
    &self.tokens
  }
}

impl PartialEq for Block {
  fn eq(&self, other: &Self) -> bool {
    self.tokens.len() == other.tokens.len()
      && self.tokens.iter().zip(other.tokens.iter()).all(|(a, b)| a.same_text(b))
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Function {
  /// `None` for lambdas.
  pub name: Option<String>,
  pub params: Vec<String>,
  pub body: Block,
}

#[derive(Debug, Clone)]
pub enum Value {
  Int(i64),
  Float(f64),
  String(String),
  Bool(bool),
  List(Vec<Value>),
  Struct(Vec<(String, Value)>),
  Ident(String),
  Func(Rc<Function>),
  Nil,
  Tokens(Block),
}

impl Value {
  pub fn type_name(&self) -> &'static str {
    match self {
      Value::Int(_) => "Int",
      Value::Float(_) => "Float",
      Value::String(_) => "String",
      Value::Bool(_) => "Bool",
      Value::List(_) => "List",
      Value::Struct(_) => "Struct",
      Value::Ident(_) => "Ident",
      Value::Func(_) => "Func",
      Value::Nil => "Nil",
      Value::Tokens(_) => "Body",
    }
  }

  /// Builds a number from a float, collapsing integral results to `Int`.
  pub fn number(n: f64) -> Value {
    if n.is_finite() && n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 {
      Value::Int(n as i64)
    } else {
      Value::Float(n)
    }
  }

  pub fn as_f64(&self) -> Option<f64> {
    match self {
      Value::Int(n) => Some(*n as f64),
      Value::Float(n) => Some(*n),
      _ => None,
    }
  }

  /// Integer view of a number with no fractional part.
  pub fn as_integral(&self) -> Option<i64> {
    match self {
      Value::Int(n) => Some(*n),
      Value::Float(n) if n.fract() == 0.0 && (i64::MIN as f64..i64::MAX as f64).contains(n) => {
        Some(*n as i64)
      }
      _ => None,
    }
  }

  pub fn field(&self, name: &str) -> Option<&Value> {
    match self {
      Value::Struct(fields) => fields.iter().find(|(key, _)| key == name).map(|(_, v)| v),
      _ => None,
    }
  }

  /// The form that reads back as an equal value: strings quoted, floats with
  /// a decimal point.
  pub fn literal(&self) -> Literal<'_> {
    Literal(self)
  }
}

fn write_float(f: &mut Formatter<'_>, n: f64) -> fmt::Result {
  if n.is_finite() && n.fract() == 0.0 {
    write!(f, "{:.1}", n)
  } else {
    write!(f, "{}", n)
  }
}

fn write_items<'a>(f: &mut Formatter<'_>, items: impl Iterator<Item = &'a Value>) -> fmt::Result {
  for (i, item) in items.enumerate() {
    if i > 0 {
      f.write_str(" ")?;
    }
    write!(f, "{}", item.literal())?;
  }
  Ok(())
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    match self {
      Value::Int(n) => write!(f, "{}", n),
      Value::Float(n) => write_float(f, *n),
      Value::String(s) => f.write_str(s),
      Value::Bool(b) => write!(f, "{}", b),
      Value::List(items) => {
        f.write_str("[")?;
        write_items(f, items.iter())?;
        f.write_str("]")
      }
      Value::Struct(fields) => {
        f.write_str("(struct")?;
        for (name, value) in fields {
          write!(f, " {} {}", name, value.literal())?;
        }
        f.write_str(")")
      }
      Value::Ident(name) => f.write_str(name),
      Value::Func(func) => match &func.name {
        Some(name) => write!(f, "<func {}>", name),
        None => f.write_str("<lambda>"),
      },
      Value::Nil => f.write_str("nil"),
      Value::Tokens(block) => write!(f, "(body {})", render(block.tokens())),
    }
  }
}

pub struct Literal<'a>(&'a Value);

impl fmt::Display for Literal<'_> {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    match self.0 {
      Value::String(s) => f.write_str(&escape_string(s)),
      other => write!(f, "{}", other),
    }
  }
}

impl PartialEq for Value {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (Value::Int(a), Value::Int(b)) => a == b,
      (Value::Float(a), Value::Float(b)) => a == b,
      (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
      (Value::String(a), Value::String(b)) => a == b,
      (Value::Bool(a), Value::Bool(b)) => a == b,
      (Value::List(a), Value::List(b)) => a == b,
      (Value::Struct(a), Value::Struct(b)) => a == b,
      (Value::Ident(a), Value::Ident(b)) => a == b,
      (Value::Func(a), Value::Func(b)) => Rc::ptr_eq(a, b) || a == b,
      (Value::Nil, Value::Nil) => true,
      (Value::Tokens(a), Value::Tokens(b)) => a == b,
      _ => false,
    }
  }
}
