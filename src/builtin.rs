use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::evaluator::{Evaluator, Outcome};
use crate::value::Value;

mod arith;
mod bindings;
mod collections;
mod control;
mod convert;
mod logic;
mod strings;
mod system;

pub type NativeFn = fn(&mut Evaluator, usize, Vec<Value>) -> Result<Outcome>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
  Exact(usize),
  AtLeast(usize),
  Between(usize, usize),
}

impl Arity {
  pub fn accepts(self, found: usize) -> bool {
    match self {
      Arity::Exact(n) => found == n,
      Arity::AtLeast(n) => found >= n,
      Arity::Between(min, max) => (min..=max).contains(&found),
    }
  }

  pub fn check(self, op: &str, found: usize) -> Result<()> {
    if self.accepts(found) {
      return Ok(());
    }
    let expected = match self {
      Arity::Exact(n) => n.to_string(),
      Arity::AtLeast(n) => format!("at least {}", n),
      Arity::Between(min, max) => format!("{} to {}", min, max),
    };
    Err(Error::arity(op, expected, found))
  }
}

#[derive(Debug, Clone, Copy)]
pub struct Builtin {
  pub name: &'static str,
  pub arity: Arity,
  pub native: NativeFn,
}

/// Words the reader gives meaning to; like builtin names they cannot be
/// declared.
pub const SYNTAX_WORDS: &[&str] = &["body", "true", "false", "nil"];

pub fn builtins() -> HashMap<&'static str, Builtin> {
  use Arity::*;

  let mut native = HashMap::new();
  let mut add = |name: &'static str, arity: Arity, f: NativeFn| {
    native.insert(name, Builtin { name, arity, native: f });
  };

  add("+", AtLeast(1), arith::add);
  add("-", AtLeast(1), arith::sub);
  add("*", AtLeast(1), arith::mul);
  add("/", AtLeast(1), arith::div);
  add("^", Exact(2), arith::pow);
  add("%", Exact(2), arith::rem);
  add("++", Exact(1), arith::increment);
  add("--", Exact(1), arith::decrement);
  add("+=", Exact(2), arith::add_assign);
  add("-=", Exact(2), arith::sub_assign);

  add("eq", AtLeast(1), logic::eq);
  add("<", Exact(2), logic::lt);
  add("<=", Exact(2), logic::le);
  add(">", Exact(2), logic::gt);
  add(">=", Exact(2), logic::ge);
  add("and", AtLeast(1), logic::and);
  add("or", AtLeast(1), logic::or);
  add("not", Exact(1), logic::not);

  add("var", Exact(2), bindings::var);
  add("const", Exact(2), bindings::constant);
  add("set", Between(2, 3), bindings::set);
  add("free", Exact(1), bindings::free);

  add("if", Between(2, 3), control::if_);
  add("loop", Between(3, 4), control::loop_);
  add("while", Exact(2), control::while_);
  add("func", AtLeast(1), control::func);
  add("return", Between(0, 1), control::return_);
  add("break", Exact(0), control::break_);
  add("eval", AtLeast(1), control::eval);

  add("append", AtLeast(2), collections::append);
  add("prepend", AtLeast(2), collections::prepend);
  add("pop", Exact(1), collections::pop);
  add("shift", Exact(1), collections::shift);
  add("remove", Exact(2), collections::remove);
  add("len", Exact(1), collections::len);
  add("get", Exact(2), collections::get);
  add("struct", AtLeast(0), collections::structure);
  add(".", Exact(2), collections::field);
  add("keys", Exact(1), collections::keys);
  add("values", Exact(1), collections::values);

  add("concat", AtLeast(1), strings::concat);
  add("substr", Between(2, 3), strings::substr);
  add("split", Between(1, 2), strings::split);
  add("from-char-code", Exact(1), strings::from_char_code);
  add("char-code-from", Between(1, 2), strings::char_code_from);
  add("is-letter", Exact(1), strings::is_letter);

  add("int", Exact(1), convert::int);
  add("float", Exact(1), convert::float);
  add("string", Exact(1), convert::string);
  add("parse", Exact(1), convert::parse);
  add("floor", Exact(1), convert::floor);
  add("ceil", Exact(1), convert::ceil);
  add("type", Exact(1), convert::type_of);

  add("print", AtLeast(0), system::print);
  add("scan-line", Between(0, 1), system::scan_line);
  add("read", Exact(1), system::read);
  add("write", Exact(2), system::write);
  add("exit", Between(0, 1), system::exit);

  native
}

pub(crate) fn mismatch(op: &str, expected: &'static str, found: &Value) -> Error {
  Error::type_mismatch(op, expected, found.type_name())
}

/// The name carried by an identifier operand, without looking it up.
pub(crate) fn name_arg(op: &str, value: &Value) -> Result<String> {
  match value {
    Value::Ident(name) => Ok(name.clone()),
    other => Err(mismatch(op, "identifier", other)),
  }
}

/// A struct field named either bare or as a string.
pub(crate) fn field_name(op: &str, value: &Value) -> Result<String> {
  match value {
    Value::Ident(name) | Value::String(name) => Ok(name.clone()),
    other => Err(mismatch(op, "field name", other)),
  }
}

pub(crate) fn number(op: &str, value: &Value) -> Result<f64> {
  value.as_f64().ok_or_else(|| mismatch(op, "number", value))
}

pub(crate) fn integer(op: &str, value: &Value) -> Result<i64> {
  value.as_integral().ok_or_else(|| mismatch(op, "integer", value))
}

pub(crate) fn boolean(op: &str, value: &Value) -> Result<bool> {
  match value {
    Value::Bool(b) => Ok(*b),
    other => Err(mismatch(op, "Bool", other)),
  }
}

pub(crate) fn text<'a>(op: &str, value: &'a Value) -> Result<&'a str> {
  match value {
    Value::String(s) => Ok(s),
    other => Err(mismatch(op, "String", other)),
  }
}

pub(crate) fn index(index: i64, len: usize) -> Result<usize> {
  usize::try_from(index)
    .ok()
    .filter(|i| *i < len)
    .ok_or(Error::IndexOutOfBounds { index, len })
}

/// Edits the list named or given by `target`.
///
/// A list held by a variable is written back to it and `None` is returned
/// alongside the edit's result; a literal list is handed back edited.
pub(crate) fn with_list<R>(
  ev: &mut Evaluator,
  op: &str,
  target: Value,
  edit: impl FnOnce(&mut Vec<Value>) -> Result<R>,
) -> Result<(R, Option<Value>)> {
  let name = match &target {
    Value::Ident(name) if ev.env.is_bound(name) => Some(name.clone()),
    _ => None,
  };

  let mut items = match ev.resolve(target)? {
    Value::List(items) => items,
    other => return Err(mismatch(op, "List", &other)),
  };
  let result = edit(&mut items)?;

  match name {
    Some(name) => {
      ev.env.assign(&name, Value::List(items))?;
      Ok((result, None))
    }
    None => Ok((result, Some(Value::List(items)))),
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;

  #[test]
  fn arity_ranges() {
    assert!(Arity::Exact(2).accepts(2));
    assert!(!Arity::Exact(2).accepts(3));
    assert!(Arity::AtLeast(1).accepts(7));
    assert!(!Arity::AtLeast(1).accepts(0));
    assert!(Arity::Between(2, 3).accepts(3));
    assert!(!Arity::Between(2, 3).accepts(4));
  }

  #[test]
  fn arity_errors_describe_the_expectation() {
    let err = Arity::Between(2, 3).check("set", 1).unwrap_err();

    assert_eq!(err.to_string(), "wrong number of arguments to `set`: expected 2 to 3, found 1");
  }

  #[test]
  fn every_builtin_is_registered_under_its_own_name() {
    for (key, builtin) in builtins() {
      assert_eq!(key, builtin.name);
    }
  }

  #[test]
  fn index_rejects_negative_and_past_the_end() {
    assert_eq!(index(1, 3).unwrap(), 1);
    assert!(matches!(index(3, 3), Err(Error::IndexOutOfBounds { index: 3, len: 3 })));
    assert!(matches!(index(-1, 3), Err(Error::IndexOutOfBounds { index: -1, .. })));
  }
}
