use std::cmp::Ordering;

use crate::builtin::{boolean, mismatch};
use crate::error::Result;
use crate::evaluator::{Evaluator, Outcome};
use crate::value::Value;

pub(crate) fn eq(ev: &mut Evaluator, _depth: usize, args: Vec<Value>) -> Result<Outcome> {
  let values = ev.resolve_all(args)?;
  let equal = values.windows(2).all(|pair| pair[0] == pair[1]);
  Ok(Outcome::value(Value::Bool(equal)))
}

/// `None` when either side is NaN, which makes every ordering test false.
fn ordering(op: &str, lhs: &Value, rhs: &Value) -> Result<Option<Ordering>> {
  match (lhs, rhs) {
    (Value::String(a), Value::String(b)) => Ok(Some(a.cmp(b))),
    (Value::String(_), other) => Err(mismatch(op, "String", other)),
    _ => {
      let a = lhs.as_f64().ok_or_else(|| mismatch(op, "number", lhs))?;
      let b = rhs.as_f64().ok_or_else(|| mismatch(op, "number", rhs))?;
      Ok(a.partial_cmp(&b))
    }
  }
}

fn compare(ev: &Evaluator, op: &str, args: Vec<Value>, test: fn(Ordering) -> bool) -> Result<Outcome> {
  let values = ev.resolve_all(args)?;
  let result = ordering(op, &values[0], &values[1])?.map_or(false, test);
  Ok(Outcome::value(Value::Bool(result)))
}

pub(crate) fn lt(ev: &mut Evaluator, _depth: usize, args: Vec<Value>) -> Result<Outcome> {
  compare(ev, "<", args, Ordering::is_lt)
}

pub(crate) fn le(ev: &mut Evaluator, _depth: usize, args: Vec<Value>) -> Result<Outcome> {
  compare(ev, "<=", args, Ordering::is_le)
}

pub(crate) fn gt(ev: &mut Evaluator, _depth: usize, args: Vec<Value>) -> Result<Outcome> {
  compare(ev, ">", args, Ordering::is_gt)
}

pub(crate) fn ge(ev: &mut Evaluator, _depth: usize, args: Vec<Value>) -> Result<Outcome> {
  compare(ev, ">=", args, Ordering::is_ge)
}

fn booleans(ev: &Evaluator, op: &str, args: Vec<Value>) -> Result<Vec<bool>> {
  ev.resolve_all(args)?
    .iter()
    .map(|value| boolean(op, value))
    .collect()
}

pub(crate) fn and(ev: &mut Evaluator, _depth: usize, args: Vec<Value>) -> Result<Outcome> {
  let all = booleans(ev, "and", args)?.into_iter().all(|b| b);
  Ok(Outcome::value(Value::Bool(all)))
}

pub(crate) fn or(ev: &mut Evaluator, _depth: usize, args: Vec<Value>) -> Result<Outcome> {
  let any = booleans(ev, "or", args)?.into_iter().any(|b| b);
  Ok(Outcome::value(Value::Bool(any)))
}

pub(crate) fn not(ev: &mut Evaluator, _depth: usize, args: Vec<Value>) -> Result<Outcome> {
  let value = ev.resolve(args.into_iter().next().unwrap_or(Value::Nil))?;
  Ok(Outcome::value(Value::Bool(!boolean("not", &value)?)))
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use crate::error::Error;
  use crate::test_support::{run, value};
  use crate::value::Value;

  #[test]
  fn eq_compares_every_adjacent_pair() {
    assert_eq!(value("(eq 1 1 1)"), Value::Bool(true));
    assert_eq!(value("(eq 1 1 2)"), Value::Bool(false));
    assert_eq!(value("(eq 2 2.0)"), Value::Bool(true));
    assert_eq!(value("(eq [1 \"a\"] [1 \"a\"])"), Value::Bool(true));
    assert_eq!(value("(eq nil nil)"), Value::Bool(true));
    assert_eq!(value("(eq 1 \"1\")"), Value::Bool(false));
  }

  #[test]
  fn orderings_on_numbers() {
    assert_eq!(value("(< 1 2)"), Value::Bool(true));
    assert_eq!(value("(<= 2 2.0)"), Value::Bool(true));
    assert_eq!(value("(> 1.5 2)"), Value::Bool(false));
    assert_eq!(value("(>= -1 -1)"), Value::Bool(true));
  }

  #[test]
  fn orderings_on_strings_are_lexicographic() {
    assert_eq!(value("(< \"apple\" \"banana\")"), Value::Bool(true));
    assert_eq!(value("(>= \"b\" \"ab\")"), Value::Bool(true));
  }

  #[test]
  fn orderings_reject_mixed_operands() {
    assert!(matches!(run("(< \"a\" 1)"), Err(Error::TypeMismatch { .. })));
    assert!(matches!(run("(< 1 true)"), Err(Error::TypeMismatch { .. })));
  }

  #[test]
  fn connectives_need_booleans() {
    assert_eq!(value("(and true true false)"), Value::Bool(false));
    assert_eq!(value("(or false true)"), Value::Bool(true));
    assert_eq!(value("(not (< 1 2))"), Value::Bool(false));
    assert!(matches!(run("(and true 1)"), Err(Error::TypeMismatch { expected: "Bool", .. })));
  }
}
