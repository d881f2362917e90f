use crate::builtin::{integer, mismatch, text};
use crate::error::{Error, Result};
use crate::evaluator::{Evaluator, Outcome};
use crate::value::Value;

pub(crate) fn concat(ev: &mut Evaluator, _depth: usize, args: Vec<Value>) -> Result<Outcome> {
  let joined: String = ev.resolve_all(args)?.iter().map(ToString::to_string).collect();
  Ok(Outcome::value(Value::String(joined)))
}

/// Characters `start..end` of a string; `end` defaults to its length.
pub(crate) fn substr(ev: &mut Evaluator, _depth: usize, args: Vec<Value>) -> Result<Outcome> {
  let args = ev.resolve_all(args)?;
  let s = text("substr", &args[0])?;
  let len = s.chars().count();

  let start = integer("substr", &args[1])?;
  let end = match args.get(2) {
    Some(end) => integer("substr", end)?,
    None => len as i64,
  };

  let out_of_bounds = |index: i64| Error::IndexOutOfBounds { index, len };
  let end_at = usize::try_from(end).ok().filter(|e| *e <= len).ok_or_else(|| out_of_bounds(end))?;
  let start_at = usize::try_from(start).ok().filter(|s| *s <= end_at).ok_or_else(|| out_of_bounds(start))?;

  let slice = s.chars().skip(start_at).take(end_at - start_at).collect();
  Ok(Outcome::value(Value::String(slice)))
}

/// Splits on a separator, into characters for `""`, or on whitespace when no
/// separator is given.
pub(crate) fn split(ev: &mut Evaluator, _depth: usize, args: Vec<Value>) -> Result<Outcome> {
  let args = ev.resolve_all(args)?;
  let s = text("split", &args[0])?;

  let parts: Vec<Value> = match args.get(1) {
    None => s.split_whitespace().map(|p| Value::String(p.to_owned())).collect(),
    Some(sep) => match text("split", sep)? {
      "" => s.chars().map(|c| Value::String(c.to_string())).collect(),
      sep => s.split(sep).map(|p| Value::String(p.to_owned())).collect(),
    },
  };
  Ok(Outcome::value(Value::List(parts)))
}

pub(crate) fn from_char_code(ev: &mut Evaluator, _depth: usize, mut args: Vec<Value>) -> Result<Outcome> {
  let code = ev.resolve(args.remove(0))?;
  let c = u32::try_from(integer("from-char-code", &code)?)
    .ok()
    .and_then(char::from_u32)
    .ok_or_else(|| mismatch("from-char-code", "character code", &code))?;
  Ok(Outcome::value(Value::String(c.to_string())))
}

pub(crate) fn char_code_from(ev: &mut Evaluator, _depth: usize, args: Vec<Value>) -> Result<Outcome> {
  let args = ev.resolve_all(args)?;
  let s = text("char-code-from", &args[0])?;
  let at = match args.get(1) {
    Some(at) => integer("char-code-from", at)?,
    None => 0,
  };

  let len = s.chars().count();
  let c = usize::try_from(at)
    .ok()
    .and_then(|i| s.chars().nth(i))
    .ok_or(Error::IndexOutOfBounds { index: at, len })?;
  Ok(Outcome::value(Value::Int(c as i64)))
}

/// True for a non-empty string made only of alphabetic characters.
pub(crate) fn is_letter(ev: &mut Evaluator, _depth: usize, mut args: Vec<Value>) -> Result<Outcome> {
  let value = ev.resolve(args.remove(0))?;
  let s = text("is-letter", &value)?;
  let letters = !s.is_empty() && s.chars().all(char::is_alphabetic);
  Ok(Outcome::value(Value::Bool(letters)))
}
