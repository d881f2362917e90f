use crate::builtin::{integer, name_arg, number};
use crate::error::{Error, Result};
use crate::evaluator::{Evaluator, Outcome};
use crate::value::Value;

type IntOp = fn(i64, i64) -> Option<i64>;
type FloatOp = fn(f64, f64) -> f64;

fn operands(ev: &Evaluator, op: &str, args: Vec<Value>) -> Result<Vec<Value>> {
  let values = ev.resolve_all(args)?;
  for value in &values {
    number(op, value)?;
  }
  Ok(values)
}

/// Applies one step of an operator, staying in integers while the result is
/// exact and otherwise normalising through a float.
fn step(lhs: &Value, rhs: &Value, int_op: IntOp, float_op: FloatOp) -> Value {
  if let (Value::Int(a), Value::Int(b)) = (lhs, rhs) {
    if let Some(n) = int_op(*a, *b) {
      return Value::Int(n);
    }
  }
  let a = lhs.as_f64().unwrap_or(f64::NAN);
  let b = rhs.as_f64().unwrap_or(f64::NAN);
  Value::number(float_op(a, b))
}

fn fold(values: Vec<Value>, int_op: IntOp, float_op: FloatOp) -> Value {
  let mut values = values.into_iter();
  let first = values.next().unwrap_or(Value::Int(0));
  let first = match first {
    Value::Float(n) => Value::number(n),
    other => other,
  };
  values.fold(first, |acc, next| step(&acc, &next, int_op, float_op))
}

fn check_divisors(op: &str, values: &[Value]) -> Result<()> {
  if values.iter().skip(1).any(|v| v.as_f64() == Some(0.0)) {
    return Err(Error::DivisionByZero(op.to_owned()));
  }
  Ok(())
}

pub(crate) fn add(ev: &mut Evaluator, _depth: usize, args: Vec<Value>) -> Result<Outcome> {
  let values = operands(ev, "+", args)?;
  Ok(Outcome::value(fold(values, i64::checked_add, |a, b| a + b)))
}

pub(crate) fn sub(ev: &mut Evaluator, _depth: usize, args: Vec<Value>) -> Result<Outcome> {
  let mut values = operands(ev, "-", args)?;
  if values.len() == 1 {
    values.insert(0, Value::Int(0));
  }
  Ok(Outcome::value(fold(values, i64::checked_sub, |a, b| a - b)))
}

pub(crate) fn mul(ev: &mut Evaluator, _depth: usize, args: Vec<Value>) -> Result<Outcome> {
  let values = operands(ev, "*", args)?;
  Ok(Outcome::value(fold(values, i64::checked_mul, |a, b| a * b)))
}

pub(crate) fn div(ev: &mut Evaluator, _depth: usize, args: Vec<Value>) -> Result<Outcome> {
  let values = operands(ev, "/", args)?;
  check_divisors("/", &values)?;
  let exact = |a: i64, b: i64| match a.checked_rem(b) {
    Some(0) => a.checked_div(b),
    _ => None,
  };
  Ok(Outcome::value(fold(values, exact, |a, b| a / b)))
}

pub(crate) fn pow(ev: &mut Evaluator, _depth: usize, args: Vec<Value>) -> Result<Outcome> {
  let values = operands(ev, "^", args)?;
  let exact = |base: i64, exp: i64| u32::try_from(exp).ok().and_then(|exp| base.checked_pow(exp));
  Ok(Outcome::value(step(&values[0], &values[1], exact, f64::powf)))
}

pub(crate) fn rem(ev: &mut Evaluator, _depth: usize, args: Vec<Value>) -> Result<Outcome> {
  let values = operands(ev, "%", args)?;
  let a = integer("%", &values[0])?;
  let b = integer("%", &values[1])?;
  if b == 0 {
    return Err(Error::DivisionByZero("%".to_owned()));
  }
  Ok(Outcome::value(Value::Int(a.wrapping_rem(b))))
}

/// Reads a numeric variable, combines it with `delta` and stores the result.
fn update(ev: &mut Evaluator, op: &str, target: &Value, delta: Value, int_op: IntOp, float_op: FloatOp) -> Result<Outcome> {
  let name = name_arg(op, target)?;
  let current = ev.lookup(&name)?;
  number(op, &current)?;
  let delta = ev.resolve(delta)?;
  number(op, &delta)?;

  ev.env.assign(&name, step(&current, &delta, int_op, float_op))?;
  Ok(Outcome::none())
}

pub(crate) fn increment(ev: &mut Evaluator, _depth: usize, args: Vec<Value>) -> Result<Outcome> {
  update(ev, "++", &args[0], Value::Int(1), i64::checked_add, |a, b| a + b)
}

pub(crate) fn decrement(ev: &mut Evaluator, _depth: usize, args: Vec<Value>) -> Result<Outcome> {
  update(ev, "--", &args[0], Value::Int(1), i64::checked_sub, |a, b| a - b)
}

pub(crate) fn add_assign(ev: &mut Evaluator, _depth: usize, mut args: Vec<Value>) -> Result<Outcome> {
  let delta = args.pop().unwrap_or(Value::Nil);
  update(ev, "+=", &args[0], delta, i64::checked_add, |a, b| a + b)
}

pub(crate) fn sub_assign(ev: &mut Evaluator, _depth: usize, mut args: Vec<Value>) -> Result<Outcome> {
  let delta = args.pop().unwrap_or(Value::Nil);
  update(ev, "-=", &args[0], delta, i64::checked_sub, |a, b| a - b)
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use crate::error::Error;
  use crate::test_support::{evaluator, run, value};
  use crate::value::Value;

  #[test]
  fn integer_arithmetic_stays_integral() {
    assert_eq!(value("(+ 1 2 3)"), Value::Int(6));
    assert_eq!(value("(- 10 4 1)"), Value::Int(5));
    assert_eq!(value("(- 7)"), Value::Int(-7));
    assert_eq!(value("(* 2 3 4)"), Value::Int(24));
    assert_eq!(value("(^ 2 10)"), Value::Int(1024));
  }

  #[test]
  fn integral_results_normalise_to_int() {
    assert!(matches!(value("(+ 1.5 1.5)"), Value::Int(3)));
    assert!(matches!(value("(/ 10 4)"), Value::Float(n) if n == 2.5));
    assert!(matches!(value("(/ 12 4)"), Value::Int(3)));
    assert!(matches!(value("(^ 2 -1)"), Value::Float(n) if n == 0.5));
  }

  #[test]
  fn quotient_and_remainder_rebuild_the_dividend() {
    for (a, b) in [(17, 5), (100, 7), (9, 3), (1, 9)] {
      let rebuilt = value(&format!("(+ (* (floor (/ {a} {b})) {b}) (% {a} {b}))"));
      assert_eq!(rebuilt, Value::Int(a));
    }
  }

  #[test]
  fn remainder_needs_integral_operands() {
    assert!(matches!(run("(% 5.5 2)"), Err(Error::TypeMismatch { .. })));
    assert_eq!(value("(% 6.0 4)"), Value::Int(2));
    assert!(matches!(
      run("(% 100000000000000000000.0 3)"),
      Err(Error::TypeMismatch { .. })
    ));
  }

  #[test]
  fn dividing_by_zero_fails() {
    assert!(matches!(run("(/ 1 0)"), Err(Error::DivisionByZero(_))));
    assert!(matches!(run("(% 1 0)"), Err(Error::DivisionByZero(_))));
  }

  #[test]
  fn non_numbers_are_rejected() {
    assert!(matches!(
      run("(+ 1 \"2\")"),
      Err(Error::TypeMismatch { expected: "number", found: "String", .. })
    ));
  }

  #[test]
  fn identifiers_are_resolved() {
    let mut ev = evaluator();
    ev.run("(var a 4) (var b 0.5)").unwrap();

    assert_eq!(ev.run("(* a b)").unwrap(), vec![Value::Int(2)]);
  }

  #[test]
  fn compound_assignment_updates_the_variable() {
    let mut ev = evaluator();
    ev.run("(var n 1) (++ n) (++ n) (-- n) (+= n 10) (-= n 0.5)").unwrap();

    assert_eq!(ev.run("n").unwrap(), vec![Value::Float(11.5)]);
  }

  #[test]
  fn compound_assignment_respects_const() {
    assert!(matches!(run("(const k 1) (++ k)"), Err(Error::ConstViolation(_))));
    assert!(matches!(run("(++ missing)"), Err(Error::UnboundName(_))));
  }
}
