use std::cell::RefCell;
use std::io::{self, Cursor, Write};
use std::rc::Rc;

use crate::config::Config;
use crate::error::Result;
use crate::evaluator::Evaluator;
use crate::value::Value;

/// Writer whose contents stay readable after it is boxed into an evaluator.
#[derive(Clone, Default)]
pub struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
  pub fn contents(&self) -> String {
    String::from_utf8_lossy(&self.0.borrow()).into_owned()
  }
}

impl Write for SharedBuffer {
  fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
    self.0.borrow_mut().extend_from_slice(buf);
    Ok(buf.len())
  }

  fn flush(&mut self) -> io::Result<()> {
    Ok(())
  }
}

pub fn evaluator_with(input: &str) -> (Evaluator, SharedBuffer) {
  let out = SharedBuffer::default();
  let ev = Evaluator::with_io(
    Config::default(),
    Box::new(out.clone()),
    Box::new(Cursor::new(input.as_bytes().to_vec())),
  );
  (ev, out)
}

pub fn evaluator() -> Evaluator {
  evaluator_with("").0
}

pub fn run(source: &str) -> Result<Vec<Value>> {
  evaluator().run(source)
}

pub fn run_with_output(source: &str) -> (Result<Vec<Value>>, String) {
  let (mut ev, out) = evaluator_with("");
  let result = ev.run(source);
  (result, out.contents())
}

/// Evaluates `source` and returns its single value.
pub fn value(source: &str) -> Value {
  let mut values = run(source).unwrap_or_else(|err| panic!("`{}` failed: {}", source, err));
  assert_eq!(values.len(), 1, "`{}` produced {:?}", source, values);
  values.remove(0)
}
