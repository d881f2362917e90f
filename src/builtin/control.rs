use std::collections::HashSet;
use std::rc::Rc;

use crate::builtin::{boolean, integer, mismatch, name_arg};
use crate::env::DISCARD;
use crate::error::{Error, Result};
use crate::evaluator::{Evaluator, Outcome};
use crate::value::{Block, Function, Value};

fn block(op: &str, value: &Value) -> Result<Block> {
  match value {
    Value::Tokens(block) => Ok(block.clone()),
    other => Err(mismatch(op, "Body", other)),
  }
}

pub(crate) fn if_(ev: &mut Evaluator, depth: usize, args: Vec<Value>) -> Result<Outcome> {
  let mut args = args.into_iter();
  let cond = ev.resolve(args.next().unwrap_or(Value::Nil))?;
  let then_branch = args.next();
  let else_branch = args.next();

  let branch = if boolean("if", &cond)? { then_branch } else { else_branch };
  match branch {
    Some(Value::Tokens(block)) => ev.eval_block(&block, depth),
    Some(value) => Ok(Outcome::value(ev.resolve(value)?)),
    None => Ok(Outcome::none()),
  }
}

enum Source {
  Items(Vec<Value>),
  Range(i64, i64),
}

/// How a `loop` form binds its iterator names on each pass.
struct LoopPlan {
  index: Option<String>,
  item: Option<String>,
  source: Source,
}

/// One iterator name over a list's items, or over `0..count`.
fn single(name: &Value, source: Value) -> Result<LoopPlan> {
  let name = Some(name_arg("loop", name)?);
  match source {
    Value::List(items) => Ok(LoopPlan {
      index: None,
      item: name,
      source: Source::Items(items),
    }),
    count => Ok(LoopPlan {
      index: name,
      item: None,
      source: Source::Range(0, integer("loop", &count)?),
    }),
  }
}

/// `(loop i 5 ...)`, `(loop x xs ...)`, `(loop i x xs ...)`, `(loop i 2 5 ...)`.
fn names_first(ev: &Evaluator, args: &[Value]) -> Result<LoopPlan> {
  match args {
    [name, source] => single(name, ev.resolve(source.clone())?),
    [index, second, third] => match ev.resolve(third.clone())? {
      Value::List(items) => Ok(LoopPlan {
        index: Some(name_arg("loop", index)?),
        item: Some(name_arg("loop", second)?),
        source: Source::Items(items),
      }),
      end => {
        let start = integer("loop", &ev.resolve(second.clone())?)?;
        Ok(LoopPlan {
          index: Some(name_arg("loop", index)?),
          item: None,
          source: Source::Range(start, integer("loop", &end)?),
        })
      }
    },
    _ => Err(Error::arity("loop", "3 to 4", args.len() + 1)),
  }
}

/// `(loop 5 i ...)`, `(loop xs x ...)`, `(loop xs i x ...)`, `(loop 2 5 i ...)`.
fn source_first(ev: &Evaluator, args: &[Value]) -> Result<LoopPlan> {
  match args {
    [source, name] => single(name, ev.resolve(source.clone())?),
    [source, second, third] => match ev.resolve(source.clone())? {
      Value::List(items) => Ok(LoopPlan {
        index: Some(name_arg("loop", second)?),
        item: Some(name_arg("loop", third)?),
        source: Source::Items(items),
      }),
      start => {
        let end = integer("loop", &ev.resolve(second.clone())?)?;
        Ok(LoopPlan {
          index: Some(name_arg("loop", third)?),
          item: None,
          source: Source::Range(integer("loop", &start)?, end),
        })
      }
    },
    _ => Err(Error::arity("loop", "3 to 4", args.len() + 1)),
  }
}

/// Iterator names come first when the first operand is an identifier and the
/// rest reads as a source; otherwise the source comes first.
fn plan_loop(ev: &Evaluator, args: &[Value]) -> Result<LoopPlan> {
  if !matches!(args.first(), Some(Value::Ident(_))) {
    return source_first(ev, args);
  }
  names_first(ev, args).or_else(|err| source_first(ev, args).map_err(|_| err))
}

/// Runs one pass of a loop body with its iterator names bound one level below
/// the loop form. `None` means keep going.
fn iterate(ev: &mut Evaluator, depth: usize, body: &Block, bindings: [(Option<&str>, Value); 2]) -> Result<Option<Outcome>> {
  let scope = depth + 1;
  ev.env.enter_scope(scope);

  let mut outcome = Ok(Outcome::none());
  for (name, value) in bindings {
    if let Some(name) = name {
      if let Err(err) = ev.env.declare(scope, name, value, false) {
        outcome = Err(err);
        break;
      }
    }
  }
  if outcome.is_ok() {
    outcome = ev.eval(body.tokens(), scope);
  }
  ev.env.exit_scope(depth);

  match outcome? {
    Outcome::Values(_) => Ok(None),
    Outcome::Break => Ok(Some(Outcome::none())),
    signal => Ok(Some(signal)),
  }
}

pub(crate) fn loop_(ev: &mut Evaluator, depth: usize, mut args: Vec<Value>) -> Result<Outcome> {
  let body = block("loop", &args.pop().unwrap_or(Value::Nil))?;
  let plan = plan_loop(ev, &args)?;
  let index = plan.index.as_deref();
  let item = plan.item.as_deref();

  ev.in_loop(|ev| {
    match plan.source {
      Source::Items(items) => {
        for (i, value) in items.into_iter().enumerate() {
          let bindings = [(index, Value::Int(i as i64)), (item, value)];
          if let Some(done) = iterate(ev, depth, &body, bindings)? {
            return Ok(done);
          }
        }
      }
      Source::Range(start, end) => {
        for i in start..end {
          if let Some(done) = iterate(ev, depth, &body, [(index, Value::Int(i)), (None, Value::Nil)])? {
            return Ok(done);
          }
        }
      }
    }
    Ok(Outcome::none())
  })
}

pub(crate) fn while_(ev: &mut Evaluator, depth: usize, args: Vec<Value>) -> Result<Outcome> {
  let cond = block("while", &args[0])?;
  let body = block("while", &args[1])?;

  ev.in_loop(|ev| loop {
    let value = match ev.eval_block(&cond, depth)? {
      Outcome::Values(mut values) if values.len() == 1 => values.remove(0),
      Outcome::Values(_) => Value::Nil,
      signal => return Ok(signal),
    };
    if !boolean("while", &value)? {
      return Ok(Outcome::none());
    }

    match ev.eval_block(&body, depth)? {
      Outcome::Values(_) => {}
      Outcome::Break => return Ok(Outcome::none()),
      signal => return Ok(signal),
    }
  })
}

/// `(func name params... body)` declares a function. Naming it `_` or `nil`,
/// or giving only a body, yields an anonymous function value instead.
pub(crate) fn func(ev: &mut Evaluator, depth: usize, mut args: Vec<Value>) -> Result<Outcome> {
  let body = block("func", &args.pop().unwrap_or(Value::Nil))?;

  let mut args = args.into_iter();
  let name = match args.next() {
    None | Some(Value::Nil) => None,
    Some(Value::Ident(name)) if name == DISCARD => None,
    Some(Value::Ident(name)) => Some(name),
    Some(other) => return Err(mismatch("func", "identifier", &other)),
  };

  let mut seen = HashSet::new();
  let mut params = Vec::new();
  for param in args {
    let param = name_arg("func", &param)?;
    if param != DISCARD && !seen.insert(param.clone()) {
      return Err(Error::NameConflict {
        name: param,
        reason: "duplicate parameter",
      });
    }
    params.push(param);
  }

  let function = Rc::new(Function {
    name: name.clone(),
    params,
    body,
  });
  match name {
    Some(name) => {
      ev.env.declare_func(depth, &name, function)?;
      Ok(Outcome::none())
    }
    None => Ok(Outcome::value(Value::Func(function))),
  }
}

pub(crate) fn return_(ev: &mut Evaluator, _depth: usize, args: Vec<Value>) -> Result<Outcome> {
  if ev.func_depth == 0 {
    return Err(Error::ControlFlowMisuse("`return` outside a function"));
  }
  let value = ev.resolve(args.into_iter().next().unwrap_or(Value::Nil))?;
  Ok(Outcome::Return(value))
}

pub(crate) fn break_(ev: &mut Evaluator, _depth: usize, _args: Vec<Value>) -> Result<Outcome> {
  if ev.loop_depth == 0 {
    return Err(Error::ControlFlowMisuse("`break` outside a loop"));
  }
  Ok(Outcome::Break)
}

/// Evaluates captured bodies and source strings in the caller's scope.
pub(crate) fn eval(ev: &mut Evaluator, depth: usize, args: Vec<Value>) -> Result<Outcome> {
  let mut values = Vec::new();
  for arg in args {
    let outcome = match ev.resolve(arg)? {
      Value::Tokens(block) => ev.eval_block(&block, depth)?,
      Value::String(source) => ev.source_eval(&source, depth)?,
      other => Outcome::value(other),
    };
    match outcome {
      Outcome::Values(produced) => values.extend(produced),
      signal => return Ok(signal),
    }
  }
  Ok(Outcome::Values(values))
}
