use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, Write};
use std::rc::Rc;

use tracing::{debug, trace};

use crate::builtin::{self, Builtin};
use crate::config::Config;
use crate::env::Environment;
use crate::error::{Error, Result};
use crate::lexer::{tokenize, unescape_string};
use crate::token::{matching_close, Token, TokenKind};
use crate::value::{Block, Function, Value};

/// Form whose operand is captured instead of evaluated.
pub const BODY: &str = "body";
/// Form whose first operand is captured so it can be re-evaluated.
pub const WHILE: &str = "while";

/// Depth that a program's top-level forms are evaluated beneath.
pub const TOP_LEVEL: usize = 0;

const RED_ZONE: usize = 100 * 1024;
const STACK_PER_RECURSION: usize = 1024 * 1024;

/// What evaluating a span produced: plain values, or a control-flow signal
/// unwinding towards the nearest loop or function call.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
  Values(Vec<Value>),
  Break,
  Return(Value),
}

impl Outcome {
  pub fn none() -> Self {
    Outcome::Values(Vec::new())
  }

  pub fn value(value: Value) -> Self {
    Outcome::Values(vec![value])
  }
}

#[derive(Debug)]
enum Frame {
  Call {
    op: String,
    depth: usize,
    args: Vec<Value>,
    offset: usize,
  },
  List {
    items: Vec<Value>,
    offset: usize,
  },
}

impl Frame {
  fn offset(&self) -> usize {
    match self {
      Frame::Call { offset, .. } | Frame::List { offset, .. } => *offset,
    }
  }
}

#[derive(Debug, Default)]
struct TopLevel {
  values: Vec<Value>,
  items: usize,
}

fn deliver(frames: &mut [Frame], top: &mut TopLevel, values: Vec<Value>) {
  match frames.last_mut() {
    Some(Frame::Call { args, .. }) => args.extend(values),
    Some(Frame::List { items, .. }) => items.extend(values),
    None => {
      top.values.extend(values);
      top.items += 1;
    }
  }
}

fn unclosed(offset: usize) -> Error {
  Error::syntax("unclosed delimiter", offset)
}

/// Converts a literal or identifier token into a value.
pub fn token_value(token: &Token) -> Result<Value> {
  let value = match token.kind {
    TokenKind::IntLiteral => token
      .slice
      .parse()
      .map(Value::Int)
      .map_err(|_| Error::syntax(format!("invalid integer `{}`", token.slice), token.span.0))?,
    TokenKind::FloatLiteral => token
      .slice
      .parse()
      .map(Value::Float)
      .map_err(|_| Error::syntax(format!("invalid float `{}`", token.slice), token.span.0))?,
    TokenKind::StringLiteral => Value::String(unescape_string(&token.slice)),
    TokenKind::BoolLiteral => Value::Bool(token.slice == "true"),
    TokenKind::NilLiteral => Value::Nil,
    TokenKind::Identifier => Value::Ident(token.slice.clone()),
    TokenKind::OpenParen | TokenKind::CloseParen | TokenKind::OpenBracket | TokenKind::CloseBracket => {
      return Err(Error::syntax(format!("unexpected `{}`", token.slice), token.span.0));
    }
  };
  Ok(value)
}

pub struct Evaluator {
  pub(crate) env: Environment,
  builtins: HashMap<&'static str, Builtin>,
  config: Config,
  pub(crate) loop_depth: usize,
  pub(crate) func_depth: usize,
  call_depth: usize,
  pub(crate) stdout: Box<dyn Write>,
  pub(crate) stdin: Box<dyn BufRead>,
}

impl Default for Evaluator {
  fn default() -> Self {
    Self::new()
  }
}

impl Evaluator {
  pub fn new() -> Self {
    Self::with_config(Config::default())
  }

  pub fn with_config(config: Config) -> Self {
    Self::with_io(config, Box::new(io::stdout()), Box::new(BufReader::new(io::stdin())))
  }

  pub fn with_io(config: Config, stdout: Box<dyn Write>, stdin: Box<dyn BufRead>) -> Self {
    let builtins = builtin::builtins();
    let reserved = builtins
      .keys()
      .copied()
      .chain(builtin::SYNTAX_WORDS.iter().copied());

    Evaluator {
      env: Environment::with_reserved(reserved),
      builtins,
      config,
      loop_depth: 0,
      func_depth: 0,
      call_depth: 0,
      stdout,
      stdin,
    }
  }

  /// Tokenizes and evaluates `source` as a program.
  pub fn run(&mut self, source: &str) -> Result<Vec<Value>> {
    let tokens = tokenize(source)?;
    self.eval_program(&tokens)
  }

  /// Evaluates a whole program. Top-level declarations stay bound afterwards,
  /// so successive calls share state the way REPL lines do.
  pub fn eval_program(&mut self, tokens: &[Token]) -> Result<Vec<Value>> {
    let outcome = self.eval(tokens, TOP_LEVEL);
    self.env.exit_scope(TOP_LEVEL + 1);

    match outcome {
      Ok(Outcome::Values(values)) => Ok(values),
      Ok(Outcome::Break) => Err(Error::ControlFlowMisuse("`break` reached the top level")),
      Ok(Outcome::Return(_)) => Err(Error::ControlFlowMisuse("`return` reached the top level")),
      Err(err) => {
        self.reset();
        Err(err)
      }
    }
  }

  /// Forgets everything an aborted evaluation left behind, keeping top-level
  /// bindings.
  pub fn reset(&mut self) {
    self.env.exit_scope(TOP_LEVEL + 1);
    self.loop_depth = 0;
    self.func_depth = 0;
    self.call_depth = 0;
  }

  /// Evaluates `tokens` with its top-level forms one level below `depth`.
  ///
  /// A span holding a single item yields that item's values; a span holding
  /// several items is a block and yields nothing unless a `break` or
  /// `return` cuts it short. Bindings made deeper than `depth` are left for
  /// the caller to drop with [`Environment::exit_scope`].
  pub fn eval(&mut self, tokens: &[Token], depth: usize) -> Result<Outcome> {
    stacker::maybe_grow(RED_ZONE, STACK_PER_RECURSION, || self.walk(tokens, depth))
  }

  /// Evaluates a captured block and drops whatever it declared.
  pub fn eval_block(&mut self, block: &Block, depth: usize) -> Result<Outcome> {
    let outcome = self.eval(block.tokens(), depth);
    self.env.exit_scope(depth);
    outcome
  }

  fn walk(&mut self, tokens: &[Token], depth: usize) -> Result<Outcome> {
    let mut frames: Vec<Frame> = Vec::new();
    let mut top = TopLevel::default();
    let mut i = 0;

    while i < tokens.len() {
      let token = &tokens[i];

      match token.kind {
        TokenKind::OpenParen => {
          let op = match tokens.get(i + 1) {
            Some(next) if next.is(TokenKind::Identifier) => next.slice.clone(),
            _ => return Err(Error::syntax("expected an operator name after `(`", token.span.0)),
          };

          if op == BODY {
            let close = matching_close(tokens, i).ok_or_else(|| unclosed(token.span.0))?;
            let block = Value::Tokens(Block::new(&tokens[i + 2..close]));
            deliver(&mut frames, &mut top, vec![block]);
            i = close + 1;
            continue;
          }

          let mut args = Vec::new();
          i += 2;

          if op == WHILE {
            if let Some(next) = tokens.get(i) {
              let end = match next.kind {
                TokenKind::OpenParen | TokenKind::OpenBracket => {
                  matching_close(tokens, i).ok_or_else(|| unclosed(next.span.0))? + 1
                }
                TokenKind::CloseParen | TokenKind::CloseBracket => i,
                _ => i + 1,
              };
              if end > i {
                args.push(Value::Tokens(Block::new(&tokens[i..end])));
                i = end;
              }
            }
          }

          frames.push(Frame::Call {
            op,
            depth: depth + frames.len() + 1,
            args,
            offset: token.span.0,
          });
          continue;
        }
        TokenKind::CloseParen => {
          let (op, form_depth, args) = match frames.pop() {
            Some(Frame::Call { op, depth, args, .. }) => (op, depth, args),
            Some(Frame::List { offset, .. }) => {
              return Err(Error::syntax("`)` found before `[` was closed", offset));
            }
            None => return Err(Error::syntax("unexpected `)`", token.span.0)),
          };

          let outcome = self.dispatch(&op, args, form_depth);
          self.env.exit_scope(form_depth);

          match outcome? {
            Outcome::Values(values) => deliver(&mut frames, &mut top, values),
            signal => return Ok(signal),
          }
        }
        TokenKind::OpenBracket => frames.push(Frame::List {
          items: Vec::new(),
          offset: token.span.0,
        }),
        TokenKind::CloseBracket => {
          let items = match frames.pop() {
            Some(Frame::List { items, .. }) => items,
            Some(Frame::Call { offset, .. }) => {
              return Err(Error::syntax("`]` found before `(` was closed", offset));
            }
            None => return Err(Error::syntax("unexpected `]`", token.span.0)),
          };
          let items = self.resolve_all(items)?;
          deliver(&mut frames, &mut top, vec![Value::List(items)]);
        }
        _ => {
          let value = token_value(token)?;
          let value = if frames.is_empty() { self.resolve(value)? } else { value };
          deliver(&mut frames, &mut top, vec![value]);
        }
      }

      i += 1;
    }

    if let Some(frame) = frames.last() {
      return Err(unclosed(frame.offset()));
    }

    if top.items > 1 {
      Ok(Outcome::none())
    } else {
      Ok(Outcome::Values(top.values))
    }
  }

  /// Runs the operation named `op`: a builtin, then a named function, then a
  /// variable holding a function.
  pub fn dispatch(&mut self, op: &str, args: Vec<Value>, depth: usize) -> Result<Outcome> {
    if let Some(builtin) = self.builtins.get(op).copied() {
      builtin.arity.check(op, args.len())?;
      trace!(op, depth, args = args.len(), "builtin");
      return (builtin.native)(self, depth, args);
    }

    if let Some(func) = self.env.resolve_func(op) {
      return self.call_function(func, args, depth);
    }

    match self.env.resolve(op) {
      Some(Value::Func(func)) => {
        let func = Rc::clone(func);
        self.call_function(func, args, depth)
      }
      _ => Err(Error::UnknownOperator(op.to_owned())),
    }
  }

  pub fn call_function(&mut self, func: Rc<Function>, args: Vec<Value>, depth: usize) -> Result<Outcome> {
    let name = func.name.as_deref().unwrap_or("lambda");
    if args.len() != func.params.len() {
      return Err(Error::arity(name, func.params.len().to_string(), args.len()));
    }
    if self.call_depth >= self.config.max_call_depth {
      return Err(Error::RecursionLimit(self.config.max_call_depth));
    }

    let args = self.resolve_all(args)?;
    debug!(name, depth, "call");

    let saved_loop_depth = std::mem::replace(&mut self.loop_depth, 0);
    self.func_depth += 1;
    self.call_depth += 1;

    let result = self.run_function(&func, args, depth + 1);
    self.env.exit_scope(depth);

    self.loop_depth = saved_loop_depth;
    self.func_depth -= 1;
    self.call_depth -= 1;

    match result? {
      Outcome::Return(value) => Ok(Outcome::value(value)),
      Outcome::Break => Err(Error::ControlFlowMisuse("`break` escaped a function body")),
      values => Ok(values),
    }
  }

  fn run_function(&mut self, func: &Function, args: Vec<Value>, scope: usize) -> Result<Outcome> {
    self.env.enter_scope(scope);
    for (param, arg) in func.params.iter().zip(args) {
      self.env.declare(scope, param, arg, false)?;
    }
    self.eval(func.body.tokens(), scope)
  }

  /// Runs `f` with `break` permitted.
  pub(crate) fn in_loop(&mut self, f: impl FnOnce(&mut Self) -> Result<Outcome>) -> Result<Outcome> {
    self.loop_depth += 1;
    let outcome = f(self);
    self.loop_depth -= 1;
    outcome
  }

  pub fn lookup(&self, name: &str) -> Result<Value> {
    if let Some(value) = self.env.resolve(name) {
      return Ok(value.clone());
    }
    if let Some(func) = self.env.resolve_func(name) {
      return Ok(Value::Func(func));
    }
    Err(Error::UnboundName(name.to_owned()))
  }

  /// Looks identifiers up; every other value is returned unchanged.
  pub fn resolve(&self, value: Value) -> Result<Value> {
    match value {
      Value::Ident(name) => self.lookup(&name),
      other => Ok(other),
    }
  }

  pub fn resolve_all(&self, values: Vec<Value>) -> Result<Vec<Value>> {
    values.into_iter().map(|value| self.resolve(value)).collect()
  }

  pub fn source_eval(&mut self, source: &str, depth: usize) -> Result<Outcome> {
    let tokens = tokenize(source)?;
    let outcome = self.eval(&tokens, depth);
    self.env.exit_scope(depth);
    outcome
  }
}

#[cfg(test)]
mod tests {
  use pretty_assertions::assert_eq;

  use super::*;
  use crate::test_support::{run, run_with_output};

  #[test]
  fn single_form_yields_its_value() {
    assert_eq!(run("(+ 1 2)").unwrap(), vec![Value::Int(3)]);
  }

  #[test]
  fn nested_forms_reduce_inside_out() {
    assert_eq!(run("(* (+ 1 2) (- 10 4))").unwrap(), vec![Value::Int(18)]);
  }

  #[test]
  fn blocks_yield_nothing() {
    assert!(run("(var x 5) (set x 10) (+ x 1)").unwrap().is_empty());
  }

  #[test]
  fn set_then_compare() {
    let mut ev = crate::test_support::evaluator();
    ev.run("(var x 5) (set x 10)").unwrap();

    assert_eq!(ev.run("(eq x 10)").unwrap(), vec![Value::Bool(true)]);
  }

  #[test]
  fn bare_atoms_at_top_level_resolve() {
    let mut ev = crate::test_support::evaluator();
    ev.run("(var flag true)").unwrap();

    assert_eq!(ev.run("flag").unwrap(), vec![Value::Bool(true)]);
    assert_eq!(ev.run("\"hi\"").unwrap(), vec![Value::String("hi".into())]);
  }

  #[test]
  fn list_literals_nest_and_resolve_their_items() {
    let mut ev = crate::test_support::evaluator();
    ev.run("(var n 2)").unwrap();

    assert_eq!(
      ev.run("[1 n [(+ n 1) \"x\"]]").unwrap(),
      vec![Value::List(vec![
        Value::Int(1),
        Value::Int(2),
        Value::List(vec![Value::Int(3), Value::String("x".into())]),
      ])]
    );
  }

  #[test]
  fn arguments_declared_inside_a_form_do_not_outlive_it() {
    let mut ev = crate::test_support::evaluator();
    ev.run("(print (var tmp 1))").unwrap();

    assert!(matches!(ev.run("tmp"), Err(Error::UnboundName(_))));
  }

  #[test]
  fn body_is_captured_not_evaluated() {
    let (result, output) = run_with_output("(body (print 1))");

    assert!(matches!(result.unwrap().as_slice(), [Value::Tokens(_)]));
    assert_eq!(output, "");
  }

  #[test]
  fn loop_prints_each_index() {
    let (result, output) = run_with_output("(loop i 5 (body (print i)))");

    assert!(result.unwrap().is_empty());
    assert_eq!(output, "0\n1\n2\n3\n4\n");
  }

  #[test]
  fn named_function_returns_a_value() {
    let mut ev = crate::test_support::evaluator();
    ev.run("(func add a b (body (return (+ a b))))").unwrap();
    assert_eq!(ev.run("(add 2 3)").unwrap(), vec![Value::Int(5)]);
  }

  #[test]
  fn return_unwinds_through_loops_to_the_function() {
    let mut ev = crate::test_support::evaluator();
    ev.run(
      "(func first-over xs limit (body
         (loop xs x (body
           (if (> x limit) (body (return x)))))
         (return nil)))",
    )
    .unwrap();

    assert_eq!(ev.run("(first-over [1 5 9 12] 6)").unwrap(), vec![Value::Int(9)]);
    assert_eq!(ev.run("(first-over [1 2] 6)").unwrap(), vec![Value::Nil]);
  }

  #[test]
  fn recursion_uses_fresh_scopes() {
    let mut ev = crate::test_support::evaluator();
    ev.run(
      "(func fib n (body
         (if (< n 2) (body (return n)))
         (return (+ (fib (- n 1)) (fib (- n 2))))))",
    )
    .unwrap();

    assert_eq!(ev.run("(fib 15)").unwrap(), vec![Value::Int(610)]);
  }

  #[test]
  fn free_variables_resolve_at_call_time() {
    let mut ev = crate::test_support::evaluator();
    ev.run("(var scale 2) (func scaled x (body (* x scale)))").unwrap();
    assert_eq!(ev.run("(scaled 5)").unwrap(), vec![Value::Int(10)]);

    ev.run("(set scale 3)").unwrap();
    assert_eq!(ev.run("(scaled 5)").unwrap(), vec![Value::Int(15)]);
  }

  #[test]
  fn lambdas_are_values() {
    let mut ev = crate::test_support::evaluator();
    ev.run("(var sq (func _ x (body (* x x))))").unwrap();
    ev.run("(func twice f x (body (f (f x))))").unwrap();

    assert_eq!(ev.run("(sq 4)").unwrap(), vec![Value::Int(16)]);
    assert_eq!(ev.run("(twice sq 3)").unwrap(), vec![Value::Int(81)]);
  }

  #[test]
  fn break_outside_a_loop_is_misuse() {
    assert!(matches!(run("(break)"), Err(Error::ControlFlowMisuse(_))));
    assert!(matches!(run("(return 1)"), Err(Error::ControlFlowMisuse(_))));
  }

  #[test]
  fn break_inside_a_function_called_from_a_loop_is_misuse() {
    let result = run("(func stop (body (break))) (loop i 3 (body (stop)))");

    assert!(matches!(result, Err(Error::ControlFlowMisuse(_))));
  }

  #[test]
  fn unknown_operators_fail() {
    assert!(matches!(run("(frobnicate 1)"), Err(Error::UnknownOperator(op)) if op == "frobnicate"));
  }

  #[test]
  fn wrong_argument_counts_fail() {
    assert!(matches!(run("(func f a (body a)) (f 1 2)"), Err(Error::ArityMismatch { .. })));
    assert!(matches!(run("(% 1)"), Err(Error::ArityMismatch { .. })));
  }

  #[test]
  fn unbalanced_input_is_a_syntax_error() {
    assert!(matches!(run("(print 1"), Err(Error::Syntax { offset: 0, .. })));
    assert!(matches!(run("(print 1))"), Err(Error::Syntax { .. })));
    assert!(matches!(run("[1 2"), Err(Error::Syntax { .. })));
    assert!(matches!(run("()"), Err(Error::Syntax { .. })));
  }

  #[test]
  fn call_depth_is_bounded() {
    let mut ev = Evaluator::with_io(
      Config::default().with_max_call_depth(50),
      Box::new(io::sink()),
      Box::new(io::empty()),
    );
    let result = ev.run("(func down n (body (down (+ n 1)))) (down 0)");

    assert!(matches!(result, Err(Error::RecursionLimit(50))));
  }

  #[test]
  fn errors_reset_to_top_level_state() {
    let mut ev = crate::test_support::evaluator();
    ev.run("(var keep 1)").unwrap();
    assert!(ev.run("(loop i 3 (body (var inner i) (undefined-op)))").is_err());

    assert_eq!(ev.run("keep").unwrap(), vec![Value::Int(1)]);
    assert!(matches!(ev.run("inner"), Err(Error::UnboundName(_))));
    assert!(matches!(ev.run("(break)"), Err(Error::ControlFlowMisuse(_))));
  }

  #[test]
  fn printed_lists_read_back_equal() {
    let mut ev = crate::test_support::evaluator();
    let original = ev
      .run("[1 -2.5 \"q \\\"x\\\"\" true nil [3.0 []] (struct a 1 b [\"s\"])]")
      .unwrap()
      .remove(0);

    let reread = ev.run(&original.to_string()).unwrap().remove(0);
    assert_eq!(reread, original);
  }
}
