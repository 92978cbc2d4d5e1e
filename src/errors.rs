//! Rust-level error plumbing and Tcl-level result-code bookkeeping.
//!
//! These are two different things. `LexError`/`ParseError`/`EvalError`
//! are ordinary `thiserror` enums used with `?` inside this crate's own
//! Rust code. `ResultCode` is a *Tcl value* that scripts observe and set
//! themselves (via `catch`, `return -code`, the `errorInfo`/`errorCode`
//! variables) and is never a Rust `Err`.

use thiserror::Error;

/// Lexer-level failure (spec.md §4.1).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("missing close-brace")]
    MissingCloseBrace,
    #[error("missing \"")]
    MissingQuote,
}

/// Parser-level failure (spec.md §4.2).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error("missing close-bracket")]
    MissingCloseBracket,
    #[error("missing )")]
    MissingCloseParen,
}

/// Substitution-engine failure (spec.md §4.3).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubstError {
    #[error("can't read \"{0}\": no such variable")]
    NoSuchVariable(String),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("{0}")]
    Eval(String),
}

/// Expression-evaluator failure (spec.md §4.7). Every variant's message
/// is the bare Tcl error text; [`crate::expr::eval_str`] is responsible
/// for appending the normative `\nin expression "<expr-with-_@_>"`
/// position marker (spec.md §4.7, §6) before the error leaves the
/// expression evaluator, folding the result back into a single
/// `ExprError::Other(..)`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExprError {
    #[error("empty expression")]
    Empty,
    #[error("missing operand")]
    MissingOperand,
    #[error("invalid character \"{0}\"")]
    InvalidChar(char),
    #[error("missing operator \":\"")]
    MissingColon,
    #[error("unbalanced open parenthesis")]
    UnbalancedOpenParen,
    #[error("unbalanced close parenthesis")]
    UnbalancedCloseParen,
    #[error("divide by zero")]
    DivideByZero,
    #[error("can't use non-numeric string \"{0}\" as {1} of \"{2}\"")]
    NonNumericOperand(String, &'static str, String),
    #[error("can't use floating-point value \"{0}\" as {1} of \"{2}\"")]
    FloatOperand(String, &'static str, String),
    #[error("math functions not yet supported")]
    MathFunction,
    #[error("{0}")]
    Other(String),
}

/// Internal/host-boundary failure surfaced from [`crate::Interpreter`]
/// entry points. Ordinary Tcl errors (unknown command, bad arity,
/// divide-by-zero, no such variable, ...) *are* represented here,
/// wrapped in the `Lex`/`Parse`/`Subst`/`Expr` variants — but any script
/// evaluation nested under `catch` or `try` converts a caught `Err` of
/// one of those variants back into [`ResultCode::Error`] and reports it
/// as an integer rather than letting it propagate (spec.md §7). Only
/// `StackUnderflow`, `NoCurrentCoroutine`, and `Invariant` are true
/// Rust/host-level failures the evaluator cannot recover from as a
/// Tcl-level error (a corrupted continuation, runaway recursion, or a
/// Host contract violation) — `catch`/`try` never intercept these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Subst(#[from] SubstError),
    #[error(transparent)]
    Expr(#[from] ExprError),
    #[error("evaluator stack underflow in phase {0}")]
    StackUnderflow(&'static str),
    #[error("no current coroutine")]
    NoCurrentCoroutine,
    #[error("internal invariant violated: {0}")]
    Invariant(&'static str),
}

/// The five Tcl result codes (spec.md §6). `catch`/`try` convert any of
/// these to `Ok` and report the original as an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(i32)]
pub enum ResultCode {
    Ok = 0,
    Error = 1,
    Return = 2,
    Break = 3,
    Continue = 4,
}

impl ResultCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn from_i32(n: i32) -> Option<Self> {
        match n {
            0 => Some(Self::Ok),
            1 => Some(Self::Error),
            2 => Some(Self::Return),
            3 => Some(Self::Break),
            4 => Some(Self::Continue),
            _ => None,
        }
    }
}

/// Normative error-message constructors (spec.md §6).
pub mod messages {
    pub fn no_such_variable(name: &str) -> String {
        format!("can't read \"{}\": no such variable", name)
    }

    pub fn invalid_command_name(name: &str) -> String {
        format!("invalid command name \"{}\"", name)
    }

    pub fn wrong_num_args(usage: &str) -> String {
        format!("wrong # args: should be \"{}\"", usage)
    }

    pub fn command_already_exists(name: &str) -> String {
        format!("command already exists: \"{}\"", name)
    }
}
