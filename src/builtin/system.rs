use std::fs;
use std::io::Write;

use crate::builtin::{integer, mismatch, name_arg, text};
use crate::error::{Error, Result};
use crate::evaluator::{Evaluator, Outcome};
use crate::value::Value;

const STDOUT: &str = "<stdout>";
const STDIN: &str = "<stdin>";

/// Prints its arguments on one line, separated by `, `.
pub(crate) fn print(ev: &mut Evaluator, _depth: usize, args: Vec<Value>) -> Result<Outcome> {
  let line = ev
    .resolve_all(args)?
    .iter()
    .map(ToString::to_string)
    .collect::<Vec<_>>()
    .join(", ");

  writeln!(ev.stdout, "{}", line).map_err(|e| Error::io(STDOUT, e))?;
  Ok(Outcome::none())
}

/// Reads one line from stdin. Given a variable name the line is stored there;
/// otherwise it is the result. End of input reads as `nil`.
pub(crate) fn scan_line(ev: &mut Evaluator, _depth: usize, args: Vec<Value>) -> Result<Outcome> {
  let target = args.first().map(|arg| name_arg("scan-line", arg)).transpose()?;
  ev.stdout.flush().map_err(|e| Error::io(STDOUT, e))?;

  let mut line = String::new();
  let read = ev.stdin.read_line(&mut line).map_err(|e| Error::io(STDIN, e))?;
  let value = if read == 0 {
    Value::Nil
  } else {
    Value::String(line.trim_end_matches(['\n', '\r']).to_owned())
  };

  match target {
    Some(name) => {
      ev.env.assign(&name, value)?;
      Ok(Outcome::none())
    }
    None => Ok(Outcome::value(value)),
  }
}

pub(crate) fn read(ev: &mut Evaluator, _depth: usize, mut args: Vec<Value>) -> Result<Outcome> {
  let path = ev.resolve(args.remove(0))?;
  let path = text("read", &path)?;

  let contents = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
  Ok(Outcome::value(Value::String(contents)))
}

/// Replaces a file's contents with the display form of a value.
pub(crate) fn write(ev: &mut Evaluator, _depth: usize, args: Vec<Value>) -> Result<Outcome> {
  let args = ev.resolve_all(args)?;
  let path = text("write", &args[0])?;

  fs::write(path, args[1].to_string()).map_err(|e| Error::io(path, e))?;
  Ok(Outcome::none())
}

pub(crate) fn exit(ev: &mut Evaluator, _depth: usize, args: Vec<Value>) -> Result<Outcome> {
  let code = match args.into_iter().next() {
    Some(code) => {
      let code = ev.resolve(code)?;
      let n = integer("exit", &code)?;
      i32::try_from(n).map_err(|_| mismatch("exit", "32-bit status", &code))?
    }
    None => 0,
  };
  ev.stdout.flush().map_err(|e| Error::io(STDOUT, e))?;
  Err(Error::Exit(code))
}
