use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
  #[error("syntax error at byte {offset}: {message}")]
  Syntax { message: String, offset: usize },

  #[error("type mismatch in `{op}`: expected {expected}, found {found}")]
  TypeMismatch {
    op: String,
    expected: &'static str,
    found: &'static str,
  },

  #[error("`{0}` is not defined")]
  UnboundName(String),

  #[error("cannot declare `{name}`: {reason}")]
  NameConflict { name: String, reason: &'static str },

  #[error("cannot assign to constant `{0}`")]
  ConstViolation(String),

  #[error("index {index} out of bounds for length {len}")]
  IndexOutOfBounds { index: i64, len: usize },

  #[error("wrong number of arguments to `{op}`: expected {expected}, found {found}")]
  ArityMismatch {
    op: String,
    expected: String,
    found: usize,
  },

  #[error("unknown operator `{0}`")]
  UnknownOperator(String),

  #[error("{0}")]
  ControlFlowMisuse(&'static str),

  #[error("division by zero in `{0}`")]
  DivisionByZero(String),

  #[error("maximum call depth of {0} exceeded")]
  RecursionLimit(usize),

  #[error("i/o error on {}: {source}", path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("exit with code {0}")]
  Exit(i32),
}

impl Error {
  pub fn syntax(message: impl Into<String>, offset: usize) -> Self {
    Error::Syntax {
      message: message.into(),
      offset,
    }
  }

  pub fn type_mismatch(op: &str, expected: &'static str, found: &'static str) -> Self {
    Error::TypeMismatch {
      op: op.to_owned(),
      expected,
      found,
    }
  }

  pub fn arity(op: &str, expected: impl Into<String>, found: usize) -> Self {
    Error::ArityMismatch {
      op: op.to_owned(),
      expected: expected.into(),
      found,
    }
  }

  pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    Error::Io {
      path: path.into(),
      source,
    }
  }

  /// Process status the binary should terminate with for this error.
  pub fn exit_code(&self) -> i32 {
    match self {
      Error::Exit(code) => *code,
      _ => 1,
    }
  }
}
