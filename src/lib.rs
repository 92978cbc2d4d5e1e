//! tcl-core - a Tcl-compatible scripting language interpreter core
//!
//! # Overview
//!
//! This crate is the embeddable evaluation core of a Tcl-compatible
//! scripting language: lexer, parser, substitution engine, expression
//! evaluator, and the command dispatcher (built-ins, user `proc`s, and
//! coroutines) that drives them. It does not own memory allocation,
//! variable storage, or I/O itself; those are supplied by a [`host::Host`]
//! implementation, so the same core can run embedded in very different
//! applications. [`host::memory::MemoryHost`] is the in-process reference
//! implementation used by this crate's own tests.
//!
//! # Example
//!
//! ```rust
//! use tcl_core::{Config, Host, Interpreter};
//! use tcl_core::host::memory::MemoryHost;
//!
//! let mut interp = Interpreter::new(MemoryHost::new(), Config::default());
//! let result = interp.eval("set x [expr {1 + 2}]; return $x").unwrap();
//! assert_eq!(interp.host.get_string(&result), "3");
//! ```

pub mod ast;
pub mod config;
pub mod errors;
pub mod escape;
pub mod eval;
pub mod expr;
pub mod frame;
pub mod host;
pub mod interp;
pub mod lexer;
pub mod parser;
pub mod subst;
pub mod value;

// Re-export commonly used items
pub use config::{Config, ConfigError};
pub use errors::{EvalError, ExprError, LexError, ParseError, ResultCode, SubstError};
pub use host::Host;
pub use interp::Interpreter;
pub use parser::parse_script;
pub use value::ExprValue;
