pub mod builtin;
pub mod config;
pub mod env;
pub mod error;
pub mod evaluator;
pub mod lexer;
pub mod token;
pub mod value;

#[cfg(test)]
mod test_support;

pub use config::Config;
pub use error::{Error, Result};
pub use evaluator::{Evaluator, Outcome};
pub use lexer::tokenize;
pub use value::Value;
