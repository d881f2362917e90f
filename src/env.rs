use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use tracing::trace;

use crate::error::{Error, Result};
use crate::value::{Function, Value};

/// Name that swallows any assignment.
pub const DISCARD: &str = "_";

#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
  pub value: Value,
  pub is_const: bool,
}

#[derive(Debug, Clone)]
struct Entry<T> {
  depth: usize,
  item: T,
}

/// Names that got a binding at one depth, split by whether an outer binding
/// was already visible when they were declared.
#[derive(Debug, Clone, Default)]
struct ScopeFrame {
  created: Vec<String>,
  shadowed: Vec<String>,
}

/// A stack of bindings per name plus one frame per depth recording which
/// names each depth touched.
#[derive(Debug, Clone)]
struct ScopedTable<T> {
  stacks: HashMap<String, Vec<Entry<T>>>,
  frames: Vec<ScopeFrame>,
}

impl<T> ScopedTable<T> {
  fn new() -> Self {
    Self {
      stacks: HashMap::new(),
      frames: vec![ScopeFrame::default()],
    }
  }

  fn grow_to(&mut self, depth: usize) {
    while self.frames.len() <= depth {
      self.frames.push(ScopeFrame::default());
    }
  }

  fn bound_at(&self, name: &str, depth: usize) -> bool {
    self
      .stacks
      .get(name)
      .map_or(false, |stack| stack.iter().any(|entry| entry.depth == depth))
  }

  fn push(&mut self, depth: usize, name: &str, item: T) {
    self.grow_to(depth);

    let stack = self.stacks.entry(name.to_owned()).or_default();
    let frame = &mut self.frames[depth];
    if stack.is_empty() {
      frame.created.push(name.to_owned());
    } else {
      frame.shadowed.push(name.to_owned());
    }
    stack.push(Entry { depth, item });
  }

  fn top(&self, name: &str) -> Option<&T> {
    self.stacks.get(name).and_then(|stack| stack.last()).map(|entry| &entry.item)
  }

  fn top_mut(&mut self, name: &str) -> Option<&mut T> {
    self
      .stacks
      .get_mut(name)
      .and_then(|stack| stack.last_mut())
      .map(|entry| &mut entry.item)
  }

  fn pop(&mut self, name: &str) -> Option<T> {
    let stack = self.stacks.get_mut(name)?;
    let entry = stack.pop();
    if stack.is_empty() {
      self.stacks.remove(name);
    }
    entry.map(|entry| entry.item)
  }

  fn forget(&mut self, name: &str, depth: usize) {
    if let Some(stack) = self.stacks.get_mut(name) {
      stack.retain(|entry| entry.depth != depth);
      if stack.is_empty() {
        self.stacks.remove(name);
      }
    }
  }

  fn exit_scope(&mut self, keep_depth: usize) -> (usize, usize) {
    let mut removed = (0, 0);

    while self.frames.len() > keep_depth + 1 {
      let depth = self.frames.len() - 1;
      let frame = match self.frames.pop() {
        Some(frame) => frame,
        None => break,
      };

      for name in &frame.created {
        self.forget(name, depth);
      }
      for name in &frame.shadowed {
        self.forget(name, depth);
      }
      removed.0 += frame.created.len();
      removed.1 += frame.shadowed.len();
    }

    removed
  }
}

/// Variable and function bindings for a running program.
///
/// Every binding remembers the depth it was declared at. Leaving a depth
/// removes exactly the bindings made there, which restores whatever the
/// names were bound to outside.
#[derive(Debug, Clone)]
pub struct Environment {
  vars: ScopedTable<Binding>,
  funcs: ScopedTable<Rc<Function>>,
  reserved: HashSet<String>,
}

impl Default for Environment {
  fn default() -> Self {
    Self::new()
  }
}

impl Environment {
  pub fn new() -> Self {
    Self {
      vars: ScopedTable::new(),
      funcs: ScopedTable::new(),
      reserved: HashSet::new(),
    }
  }

  pub fn with_reserved<I, S>(names: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      reserved: names.into_iter().map(Into::into).collect(),
      ..Self::new()
    }
  }

  pub fn is_reserved(&self, name: &str) -> bool {
    self.reserved.contains(name)
  }

  fn check_declarable(&self, depth: usize, name: &str, taken: bool) -> Result<()> {
    if self.is_reserved(name) {
      return Err(Error::NameConflict {
        name: name.to_owned(),
        reason: "name is reserved",
      });
    }
    if taken {
      return Err(Error::NameConflict {
        name: name.to_owned(),
        reason: "already declared in this scope",
      });
    }
    trace!(name, depth, "declare");
    Ok(())
  }

  pub fn declare(&mut self, depth: usize, name: &str, value: Value, is_const: bool) -> Result<()> {
    if name == DISCARD {
      return Ok(());
    }
    self.check_declarable(depth, name, self.vars.bound_at(name, depth))?;
    self.vars.push(depth, name, Binding { value, is_const });
    Ok(())
  }

  pub fn declare_func(&mut self, depth: usize, name: &str, func: Rc<Function>) -> Result<()> {
    self.check_declarable(depth, name, self.funcs.bound_at(name, depth))?;
    self.funcs.push(depth, name, func);
    Ok(())
  }

  pub fn assign(&mut self, name: &str, value: Value) -> Result<()> {
    if name == DISCARD {
      return Ok(());
    }

    match self.vars.top_mut(name) {
      None => Err(Error::UnboundName(name.to_owned())),
      Some(binding) if binding.is_const => Err(Error::ConstViolation(name.to_owned())),
      Some(binding) => {
        binding.value = value;
        Ok(())
      }
    }
  }

  pub fn resolve(&self, name: &str) -> Option<&Value> {
    self.vars.top(name).map(|binding| &binding.value)
  }

  pub fn resolve_func(&self, name: &str) -> Option<Rc<Function>> {
    self.funcs.top(name).cloned()
  }

  pub fn is_bound(&self, name: &str) -> bool {
    self.vars.top(name).is_some()
  }

  /// Drops the innermost binding of a variable.
  pub fn free(&mut self, name: &str) -> Result<Value> {
    self
      .vars
      .pop(name)
      .map(|binding| binding.value)
      .ok_or_else(|| Error::UnboundName(name.to_owned()))
  }

  pub fn enter_scope(&mut self, depth: usize) {
    self.vars.grow_to(depth);
    self.funcs.grow_to(depth);
  }

  /// Removes every binding declared deeper than `keep_depth`.
  pub fn exit_scope(&mut self, keep_depth: usize) {
    let (created, shadowed) = self.vars.exit_scope(keep_depth);
    let (funcs_created, funcs_shadowed) = self.funcs.exit_scope(keep_depth);

    if created + shadowed + funcs_created + funcs_shadowed > 0 {
      trace!(keep_depth, created, shadowed, funcs_created, funcs_shadowed, "exit scope");
    }
  }
}
