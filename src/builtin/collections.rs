use crate::builtin::{field_name, index, integer, mismatch, with_list};
use crate::error::{Error, Result};
use crate::evaluator::{Evaluator, Outcome};
use crate::value::Value;

/// A named list is edited in place and nothing is produced; a literal list
/// comes back edited.
fn edited(list: Option<Value>) -> Outcome {
  list.map_or_else(Outcome::none, Outcome::value)
}

/// Arguments to add, with list arguments contributing their items.
fn spread(ev: &Evaluator, args: Vec<Value>) -> Result<Vec<Value>> {
  let mut out = Vec::with_capacity(args.len());
  for value in ev.resolve_all(args)? {
    match value {
      Value::List(items) => out.extend(items),
      other => out.push(other),
    }
  }
  Ok(out)
}

pub(crate) fn append(ev: &mut Evaluator, _depth: usize, mut args: Vec<Value>) -> Result<Outcome> {
  let target = args.remove(0);
  let extra = spread(ev, args)?;
  let ((), list) = with_list(ev, "append", target, |items| {
    items.extend(extra);
    Ok(())
  })?;
  Ok(edited(list))
}

pub(crate) fn prepend(ev: &mut Evaluator, _depth: usize, mut args: Vec<Value>) -> Result<Outcome> {
  let target = args.remove(0);
  let extra = spread(ev, args)?;
  let ((), list) = with_list(ev, "prepend", target, |items| {
    items.splice(0..0, extra);
    Ok(())
  })?;
  Ok(edited(list))
}

pub(crate) fn pop(ev: &mut Evaluator, _depth: usize, mut args: Vec<Value>) -> Result<Outcome> {
  let (removed, _) = with_list(ev, "pop", args.remove(0), |items| Ok(items.pop().unwrap_or(Value::Nil)))?;
  Ok(Outcome::value(removed))
}

pub(crate) fn shift(ev: &mut Evaluator, _depth: usize, mut args: Vec<Value>) -> Result<Outcome> {
  let (removed, _) = with_list(ev, "shift", args.remove(0), |items| {
    Ok(if items.is_empty() { Value::Nil } else { items.remove(0) })
  })?;
  Ok(Outcome::value(removed))
}

pub(crate) fn remove(ev: &mut Evaluator, _depth: usize, mut args: Vec<Value>) -> Result<Outcome> {
  let at = integer("remove", &ev.resolve(args.pop().unwrap_or(Value::Nil))?)?;
  let (removed, _) = with_list(ev, "remove", args.remove(0), |items| {
    let i = index(at, items.len())?;
    Ok(items.remove(i))
  })?;
  Ok(Outcome::value(removed))
}

pub(crate) fn len(ev: &mut Evaluator, _depth: usize, mut args: Vec<Value>) -> Result<Outcome> {
  let len = match ev.resolve(args.remove(0))? {
    Value::List(items) => items.len(),
    Value::String(s) => s.chars().count(),
    Value::Struct(fields) => fields.len(),
    other => return Err(mismatch("len", "List, String or Struct", &other)),
  };
  Ok(Outcome::value(Value::Int(len as i64)))
}

/// Struct keys may be written bare; a bare key that names a variable is
/// looked up first.
fn struct_key(ev: &Evaluator, op: &str, key: Value) -> Result<String> {
  let key = match key {
    Value::Ident(name) if ev.env.is_bound(&name) => ev.lookup(&name)?,
    other => other,
  };
  field_name(op, &key)
}

pub(crate) fn get(ev: &mut Evaluator, _depth: usize, mut args: Vec<Value>) -> Result<Outcome> {
  let key = args.pop().unwrap_or(Value::Nil);
  let found = match ev.resolve(args.remove(0))? {
    Value::List(mut items) => {
      let i = index(integer("get", &ev.resolve(key)?)?, items.len())?;
      items.swap_remove(i)
    }
    Value::String(s) => {
      let at = integer("get", &ev.resolve(key)?)?;
      let len = s.chars().count();
      let c = s.chars().nth(index(at, len)?).unwrap_or_default();
      Value::String(c.to_string())
    }
    Value::Struct(fields) => {
      let name = struct_key(ev, "get", key)?;
      fields
        .into_iter()
        .find(|(field, _)| *field == name)
        .map(|(_, value)| value)
        .ok_or(Error::UnboundName(name))?
    }
    other => return Err(mismatch("get", "List, String or Struct", &other)),
  };
  Ok(Outcome::value(found))
}

/// `(struct name value ...)` builds a record from name/value pairs.
pub(crate) fn structure(ev: &mut Evaluator, _depth: usize, args: Vec<Value>) -> Result<Outcome> {
  if args.len() % 2 != 0 {
    return Err(Error::arity("struct", "an even number", args.len()));
  }

  let mut fields: Vec<(String, Value)> = Vec::with_capacity(args.len() / 2);
  let mut args = args.into_iter();
  while let (Some(key), Some(value)) = (args.next(), args.next()) {
    let name = field_name("struct", &key)?;
    if fields.iter().any(|(field, _)| *field == name) {
      return Err(Error::NameConflict {
        name,
        reason: "duplicate field",
      });
    }
    fields.push((name, ev.resolve(value)?));
  }
  Ok(Outcome::value(Value::Struct(fields)))
}

pub(crate) fn field(ev: &mut Evaluator, _depth: usize, mut args: Vec<Value>) -> Result<Outcome> {
  let name = field_name(".", &args.pop().unwrap_or(Value::Nil))?;
  let target = ev.resolve(args.remove(0))?;
  if !matches!(target, Value::Struct(_)) {
    return Err(mismatch(".", "Struct", &target));
  }
  let value = target.field(&name).cloned().ok_or(Error::UnboundName(name))?;
  Ok(Outcome::value(value))
}

fn fields(ev: &Evaluator, op: &str, target: Value) -> Result<Vec<(String, Value)>> {
  match ev.resolve(target)? {
    Value::Struct(fields) => Ok(fields),
    other => Err(mismatch(op, "Struct", &other)),
  }
}

pub(crate) fn keys(ev: &mut Evaluator, _depth: usize, mut args: Vec<Value>) -> Result<Outcome> {
  let keys = fields(ev, "keys", args.remove(0))?
    .into_iter()
    .map(|(name, _)| Value::String(name))
    .collect();
  Ok(Outcome::value(Value::List(keys)))
}

pub(crate) fn values(ev: &mut Evaluator, _depth: usize, mut args: Vec<Value>) -> Result<Outcome> {
  let values = fields(ev, "values", args.remove(0))?
    .into_iter()
    .map(|(_, value)| value)
    .collect();
  Ok(Outcome::value(Value::List(values)))
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use crate::error::Error;
  use crate::test_support::{evaluator, run, value};
  use crate::value::Value;

  fn ints(ns: &[i64]) -> Value {
    Value::List(ns.iter().copied().map(Value::Int).collect())
  }

  #[test]
  fn append_mutates_a_named_list() {
    let mut ev = evaluator();
    ev.run("(var xs [1 2 3])").unwrap();
    assert_eq!(ev.run("(len xs)").unwrap(), vec![Value::Int(3)]);

    assert!(ev.run("(append xs 4)").unwrap().is_empty());
    assert_eq!(ev.run("(len xs)").unwrap(), vec![Value::Int(4)]);
  }

  #[test]
  fn list_arguments_are_spliced_in() {
    let mut ev = evaluator();
    ev.run("(var xs [1]) (append xs [2 3] 4)").unwrap();

    assert_eq!(ev.run("(len xs)").unwrap(), vec![Value::Int(4)]);
    assert_eq!(ev.run("xs").unwrap(), vec![ints(&[1, 2, 3, 4])]);
    assert_eq!(value("(prepend [4] 1 [2 3])"), ints(&[1, 2, 3, 4]));
    assert_eq!(value("(append [1] [[2]])"), Value::List(vec![Value::Int(1), ints(&[2])]));
  }

  #[test]
  fn prepend_keeps_argument_order() {
    let mut ev = evaluator();
    ev.run("(var xs [3]) (prepend xs 1 2)").unwrap();

    assert_eq!(ev.run("xs").unwrap(), vec![ints(&[1, 2, 3])]);
  }

  #[test]
  fn pop_shift_and_remove_return_what_they_take() {
    let mut ev = evaluator();
    ev.run("(var xs [1 2 3 4])").unwrap();

    assert_eq!(ev.run("(pop xs)").unwrap(), vec![Value::Int(4)]);
    assert_eq!(ev.run("(shift xs)").unwrap(), vec![Value::Int(1)]);
    assert_eq!(ev.run("(remove xs 1)").unwrap(), vec![Value::Int(3)]);
    assert_eq!(ev.run("xs").unwrap(), vec![ints(&[2])]);
    assert!(matches!(ev.run("(remove xs 1)"), Err(Error::IndexOutOfBounds { index: 1, len: 1 })));
  }

  #[test]
  fn taking_from_an_empty_list_yields_nil() {
    assert_eq!(value("(pop [])"), Value::Nil);
    assert_eq!(value("(shift [])"), Value::Nil);
  }

  #[test]
  fn list_operations_need_a_list() {
    assert!(matches!(run("(append 1 2)"), Err(Error::TypeMismatch { expected: "List", .. })));
    assert!(matches!(run("(len 5)"), Err(Error::TypeMismatch { .. })));
  }

  #[test]
  fn len_and_get_work_on_strings() {
    assert_eq!(value("(len \"héllo\")"), Value::Int(5));
    assert_eq!(value("(get \"héllo\" 1)"), Value::String("é".into()));
    assert!(matches!(run("(get \"ab\" 2)"), Err(Error::IndexOutOfBounds { index: 2, len: 2 })));
  }

  #[test]
  fn get_indexes_lists_with_resolved_keys() {
    let mut ev = evaluator();
    ev.run("(var xs [10 20 30]) (var i 2)").unwrap();

    assert_eq!(ev.run("(get xs i)").unwrap(), vec![Value::Int(30)]);
    assert!(matches!(ev.run("(get xs -1)"), Err(Error::IndexOutOfBounds { .. })));
  }

  #[test]
  fn structs_hold_named_fields() {
    let mut ev = evaluator();
    ev.run("(var p (struct name \"ada\" age 36)) (var key \"age\")").unwrap();

    assert_eq!(ev.run("(. p name)").unwrap(), vec![Value::String("ada".into())]);
    assert_eq!(ev.run("(get p key)").unwrap(), vec![Value::Int(36)]);
    assert_eq!(ev.run("(get p \"name\")").unwrap(), vec![Value::String("ada".into())]);
    assert_eq!(ev.run("(len p)").unwrap(), vec![Value::Int(2)]);
    assert_eq!(
      ev.run("(keys p)").unwrap(),
      vec![Value::List(vec![Value::String("name".into()), Value::String("age".into())])]
    );
    assert_eq!(
      ev.run("(values p)").unwrap(),
      vec![Value::List(vec![Value::String("ada".into()), Value::Int(36)])]
    );
    assert!(matches!(ev.run("(. p email)"), Err(Error::UnboundName(_))));
  }

  #[test]
  fn struct_construction_is_checked() {
    assert!(matches!(run("(struct a 1 b)"), Err(Error::ArityMismatch { .. })));
    assert!(matches!(run("(struct a 1 a 2)"), Err(Error::NameConflict { .. })));
    assert!(matches!(run("(. [1] a)"), Err(Error::TypeMismatch { expected: "Struct", .. })));
    assert_eq!(value("(struct)"), Value::Struct(Vec::new()));
  }
}
