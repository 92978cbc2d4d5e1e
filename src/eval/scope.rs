//! Scope-manipulation builtins (spec.md §4.8): `global`, `upvar`,
//! `uplevel`, and `proc` registration.
//!
//! Grounded on the teacher's `eval/local.rs` scope-stack handling,
//! generalized to Tcl's named-link (rather than lexical-nesting) model
//! of non-local variable access.

use crate::errors::{messages, EvalError, ResultCode, SubstError};
use crate::eval::{eval_script, Continuation, Signal};
use crate::host::{Host, ProcDef};
use crate::interp::Interpreter;

fn wrong_args<H>(usage: &str) -> Result<Signal<H>, EvalError>
where
    H: Host,
{
    Err(EvalError::Subst(SubstError::Eval(messages::wrong_num_args(usage))))
}

fn looks_like_level(s: &str) -> bool {
    s.starts_with('#') || s.chars().next().is_some_and(|c| c.is_ascii_digit() || c == '-')
}

/// Resolves an `upvar`/`uplevel` level argument to an absolute frame
/// index (0 = global scope). `#n` is already absolute; a bare `n` is
/// relative to the caller's current level.
fn parse_level<H: Host>(interp: &Interpreter<H>, text: &str) -> Result<usize, EvalError> {
    if let Some(rest) = text.strip_prefix('#') {
        let n: i64 = rest
            .trim()
            .parse()
            .map_err(|_| EvalError::Subst(SubstError::Eval(format!("bad level \"{}\"", text))))?;
        Ok(n.max(0) as usize)
    } else {
        let n: i64 = text
            .trim()
            .parse()
            .map_err(|_| EvalError::Subst(SubstError::Eval(format!("bad level \"{}\"", text))))?;
        Ok((interp.current_level() as i64 - n).max(0) as usize)
    }
}

pub fn cmd_global<H: Host>(
    interp: &mut Interpreter<H>,
    argv: &[H::Obj],
    _resume: Option<Continuation<H>>,
) -> Result<Signal<H>, EvalError> {
    if argv.len() < 2 {
        return wrong_args("global varName ?varName ...?");
    }
    for obj in &argv[1..] {
        let name = interp.host.get_string(obj);
        interp.link_global(&name);
    }
    Ok(Signal::Done(interp.host.new_string(""), ResultCode::Ok))
}

pub fn cmd_upvar<H: Host>(
    interp: &mut Interpreter<H>,
    argv: &[H::Obj],
    _resume: Option<Continuation<H>>,
) -> Result<Signal<H>, EvalError> {
    if argv.len() < 3 {
        return wrong_args("upvar ?level? otherVar localVar ?otherVar localVar ...?");
    }
    let first = interp.host.get_string(&argv[1]);
    let (level, start) = if looks_like_level(&first) {
        (parse_level(interp, &first)?, 2)
    } else {
        (interp.current_level().saturating_sub(1), 1)
    };
    let rest = &argv[start..];
    if rest.is_empty() || rest.len() % 2 != 0 {
        return wrong_args("upvar ?level? otherVar localVar ?otherVar localVar ...?");
    }
    let mut i = 0;
    while i < rest.len() {
        let other = interp.host.get_string(&rest[i]);
        let local = interp.host.get_string(&rest[i + 1]);
        interp.link_upvar(level, &other, &local)?;
        i += 2;
    }
    Ok(Signal::Done(interp.host.new_string(""), ResultCode::Ok))
}

pub fn cmd_uplevel<H: Host>(
    interp: &mut Interpreter<H>,
    argv: &[H::Obj],
    _resume: Option<Continuation<H>>,
) -> Result<Signal<H>, EvalError> {
    if argv.len() < 2 {
        return wrong_args("uplevel ?level? command ?arg ...?");
    }
    let first = interp.host.get_string(&argv[1]);
    let (level, start) = if looks_like_level(&first) {
        (parse_level(interp, &first)?, 2)
    } else {
        (interp.current_level().saturating_sub(1), 1)
    };
    if start >= argv.len() {
        return wrong_args("uplevel ?level? command ?arg ...?");
    }
    let text = argv[start..].iter().map(|o| interp.host.get_string(o)).collect::<Vec<_>>().join(" ");
    let script = crate::parser::parse_script(&text)?;

    let suffix = interp.truncate_frames_to(level);
    let result = eval_script(interp, &script, None);
    interp.restore_truncated_frames(suffix);

    match result? {
        Signal::Done(obj, code) => Ok(Signal::Done(obj, code)),
        Signal::Yield(..) => Err(EvalError::Invariant("yield not supported across uplevel")),
    }
}

pub fn cmd_proc<H: Host>(
    interp: &mut Interpreter<H>,
    argv: &[H::Obj],
    _resume: Option<Continuation<H>>,
) -> Result<Signal<H>, EvalError> {
    if argv.len() != 4 {
        return wrong_args("proc name args body");
    }
    let name = interp.host.get_string(&argv[1]);
    let params = super::parse_param_list(interp, &argv[2])?;
    let body = interp.host.get_string(&argv[3]);
    interp.host.proc_register(&name, ProcDef { params, body });
    Ok(Signal::Done(interp.host.new_string(""), ResultCode::Ok))
}
