use crate::builtin::{field_name, index, integer, mismatch, name_arg};
use crate::error::{Error, Result};
use crate::evaluator::{Evaluator, Outcome};
use crate::value::Value;

fn declare(ev: &mut Evaluator, op: &str, depth: usize, args: Vec<Value>, is_const: bool) -> Result<Outcome> {
  let mut args = args.into_iter();
  let name = name_arg(op, &args.next().unwrap_or(Value::Nil))?;
  let value = ev.resolve(args.next().unwrap_or(Value::Nil))?;

  ev.env.declare(depth, &name, value, is_const)?;
  Ok(Outcome::none())
}

pub(crate) fn var(ev: &mut Evaluator, depth: usize, args: Vec<Value>) -> Result<Outcome> {
  declare(ev, "var", depth, args, false)
}

pub(crate) fn constant(ev: &mut Evaluator, depth: usize, args: Vec<Value>) -> Result<Outcome> {
  declare(ev, "const", depth, args, true)
}

/// `(set name value)` rebinds a variable; `(set name key value)` replaces one
/// element of the list or struct it holds.
pub(crate) fn set(ev: &mut Evaluator, _depth: usize, mut args: Vec<Value>) -> Result<Outcome> {
  let value = ev.resolve(args.pop().unwrap_or(Value::Nil))?;
  let name = name_arg("set", &args[0])?;

  let Some(key) = args.get(1).cloned() else {
    ev.env.assign(&name, value)?;
    return Ok(Outcome::none());
  };

  let updated = match ev.lookup(&name)? {
    Value::List(mut items) => {
      let i = integer("set", &ev.resolve(key)?)?;
      let i = index(i, items.len())?;
      items[i] = value;
      Value::List(items)
    }
    Value::Struct(mut fields) => {
      let field = field_name("set", &key)?;
      match fields.iter_mut().find(|(name, _)| *name == field) {
        Some((_, slot)) => *slot = value,
        None => return Err(Error::UnboundName(field)),
      }
      Value::Struct(fields)
    }
    other => return Err(mismatch("set", "List or Struct", &other)),
  };

  ev.env.assign(&name, updated)?;
  Ok(Outcome::none())
}

pub(crate) fn free(ev: &mut Evaluator, _depth: usize, args: Vec<Value>) -> Result<Outcome> {
  let name = name_arg("free", &args[0])?;
  ev.env.free(&name)?;
  Ok(Outcome::none())
}
