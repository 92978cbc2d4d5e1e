//! Control-flow builtins (spec.md §4.8): `if`/`while`/`for`/`foreach`,
//! `break`/`continue`/`return`, and `catch`/`try`/`throw`/`error`.
//!
//! Grounded on the teacher's `eval/control.rs` (`if`/`then`/`else`
//! block dispatch over a stack machine), generalized to Tcl's
//! script-bodied looping constructs and their continuation-aware
//! bodies (see the module doc comment on [`super::Continuation`] for
//! the exact resumability contract).

use crate::errors::{messages, EvalError, ResultCode, SubstError};
use crate::eval::{eval_script, Continuation, Signal};
use crate::host::Host;
use crate::interp::Interpreter;
use crate::parser;

fn wrong_args<H>(usage: &str) -> Result<Signal<H>, EvalError>
where
    H: Host,
{
    Err(EvalError::Subst(SubstError::Eval(messages::wrong_num_args(usage))))
}

fn list_of<H: Host>(interp: &Interpreter<H>, obj: &H::Obj) -> Result<Vec<H::Obj>, EvalError> {
    interp.host.as_list(obj).map_err(|e| EvalError::Subst(SubstError::Eval(e.to_string())))
}

/// Parses and runs `text` to completion; used for `for`'s init/next
/// clauses and `try`'s handler/finally bodies, none of which support
/// suspending mid-execution (documented scope limitation).
fn run_to_completion<H: Host>(interp: &mut Interpreter<H>, text: &str) -> Result<(H::Obj, ResultCode), EvalError> {
    let script = parser::parse_script(text).map_err(EvalError::Parse)?;
    match eval_script(interp, &script, None)? {
        Signal::Done(obj, code) => Ok((obj, code)),
        Signal::Yield(..) => Err(EvalError::Invariant("yield not supported in this position")),
    }
}

/// Converts an `Err` from evaluating a `catch`/`try`-guarded body into a
/// caught `Signal::Done(message, Error)` (spec.md §6/§7: "`catch`/`try`
/// never propagate; every Tcl-level error — `error`/`throw` as well as
/// engine-raised errors like divide-by-zero, `no such variable`,
/// `invalid command name`, `wrong # args` — flows through
/// `ResultCode::Error`"). Rust/host-level invariant violations
/// (`StackUnderflow`, `NoCurrentCoroutine`, `Invariant`) are not Tcl
/// errors; they are never catchable and propagate unchanged.
fn catch_eval<H: Host>(interp: &mut Interpreter<H>, result: Result<Signal<H>, EvalError>) -> Result<Signal<H>, EvalError> {
    let err = match result {
        Ok(signal) => return Ok(signal),
        Err(e) => e,
    };
    if matches!(err, EvalError::StackUnderflow(_) | EvalError::NoCurrentCoroutine | EvalError::Invariant(_)) {
        return Err(err);
    }
    let message = err.to_string();
    interp.error_info = message.clone();
    Ok(Signal::Done(interp.host.new_string(&message), ResultCode::Error))
}

pub fn cmd_break<H: Host>(
    interp: &mut Interpreter<H>,
    argv: &[H::Obj],
    _resume: Option<Continuation<H>>,
) -> Result<Signal<H>, EvalError> {
    if argv.len() != 1 {
        return wrong_args("break");
    }
    Ok(Signal::Done(interp.host.new_string(""), ResultCode::Break))
}

pub fn cmd_continue<H: Host>(
    interp: &mut Interpreter<H>,
    argv: &[H::Obj],
    _resume: Option<Continuation<H>>,
) -> Result<Signal<H>, EvalError> {
    if argv.len() != 1 {
        return wrong_args("continue");
    }
    Ok(Signal::Done(interp.host.new_string(""), ResultCode::Continue))
}

pub fn cmd_return<H: Host>(
    interp: &mut Interpreter<H>,
    argv: &[H::Obj],
    _resume: Option<Continuation<H>>,
) -> Result<Signal<H>, EvalError> {
    let mut code = ResultCode::Return;
    let mut value_idx: Option<usize> = None;
    let mut i = 1;
    while i < argv.len() {
        let tok = interp.host.get_string(&argv[i]);
        if tok == "-code" && i + 1 < argv.len() {
            let code_word = interp.host.get_string(&argv[i + 1]);
            code = match code_word.as_str() {
                "ok" => ResultCode::Ok,
                "error" => ResultCode::Error,
                "return" => ResultCode::Return,
                "break" => ResultCode::Break,
                "continue" => ResultCode::Continue,
                other => other.parse::<i32>().ok().and_then(ResultCode::from_i32).unwrap_or(ResultCode::Return),
            };
            i += 2;
        } else {
            value_idx = Some(i);
            i += 1;
        }
    }
    let obj = match value_idx {
        Some(idx) => argv[idx].clone(),
        None => interp.host.new_string(""),
    };
    Ok(Signal::Done(obj, code))
}

pub fn cmd_error<H: Host>(
    interp: &mut Interpreter<H>,
    argv: &[H::Obj],
    _resume: Option<Continuation<H>>,
) -> Result<Signal<H>, EvalError> {
    if argv.len() < 2 || argv.len() > 4 {
        return wrong_args("error message ?errorInfo? ?errorCode?");
    }
    let message = interp.host.get_string(&argv[1]);
    if argv.len() >= 4 {
        interp.error_code = interp.host.get_string(&argv[3]);
    }
    interp.error_info = message.clone();
    Ok(Signal::Done(interp.host.new_string(&message), ResultCode::Error))
}

pub fn cmd_throw<H: Host>(
    interp: &mut Interpreter<H>,
    argv: &[H::Obj],
    _resume: Option<Continuation<H>>,
) -> Result<Signal<H>, EvalError> {
    if argv.len() != 3 {
        return wrong_args("throw type message");
    }
    interp.error_code = interp.host.get_string(&argv[1]);
    let message = interp.host.get_string(&argv[2]);
    interp.error_info = message.clone();
    Ok(Signal::Done(interp.host.new_string(&message), ResultCode::Error))
}

pub fn cmd_catch<H: Host>(
    interp: &mut Interpreter<H>,
    argv: &[H::Obj],
    resume: Option<Continuation<H>>,
) -> Result<Signal<H>, EvalError> {
    if argv.len() < 2 || argv.len() > 4 {
        return wrong_args("catch script ?resultVarName? ?optionsVarName?");
    }
    let script_text = interp.host.get_string(&argv[1]);
    let outcome = match parser::parse_script(&script_text) {
        Ok(script) => eval_script(interp, &script, resume),
        Err(e) => Err(EvalError::Parse(e)),
    };
    match catch_eval(interp, outcome)? {
        Signal::Yield(v, cont) => Ok(Signal::Yield(v, cont)),
        Signal::Done(obj, code) => {
            let code_num = code.as_i32();
            if argv.len() >= 3 {
                let var = interp.host.get_string(&argv[2]);
                interp.write_scalar(&var, obj);
            }
            if argv.len() == 4 {
                let flag = interp.host.new_string("-code");
                let num = interp.host.new_string(&code_num.to_string());
                let opts = interp.host.new_list(&[flag, num]);
                let var = interp.host.get_string(&argv[3]);
                interp.write_scalar(&var, opts);
            }
            Ok(Signal::Done(interp.host.new_int(code_num as i64), ResultCode::Ok))
        }
    }
}

/// `try body ?on code varName handlerBody?* ?finally cleanupBody?`.
/// Only the main body is resumable across a coroutine suspension;
/// handler and `finally` bodies run to completion (documented scope
/// limitation, matching [`run_to_completion`]'s other uses).
pub fn cmd_try<H: Host>(
    interp: &mut Interpreter<H>,
    argv: &[H::Obj],
    resume: Option<Continuation<H>>,
) -> Result<Signal<H>, EvalError> {
    if argv.len() < 2 {
        return wrong_args("try body ?handler ...? ?finally script?");
    }
    let body_text = interp.host.get_string(&argv[1]);
    let outcome = match parser::parse_script(&body_text) {
        Ok(body) => eval_script(interp, &body, resume),
        Err(e) => Err(EvalError::Parse(e)),
    };
    let (mut obj, mut code) = match catch_eval(interp, outcome)? {
        Signal::Yield(v, cont) => return Ok(Signal::Yield(v, cont)),
        Signal::Done(obj, code) => (obj, code),
    };

    let mut i = 2;
    let mut handled = false;
    let mut finally_text: Option<String> = None;
    while i < argv.len() {
        let kw = interp.host.get_string(&argv[i]);
        if kw == "on" && i + 3 < argv.len() {
            let cond = interp.host.get_string(&argv[i + 1]);
            let var = interp.host.get_string(&argv[i + 2]);
            let handler_text = interp.host.get_string(&argv[i + 3]);
            let matches = matches!((cond.as_str(), code), ("error", ResultCode::Error) | ("ok", ResultCode::Ok));
            if matches && !handled {
                handled = true;
                if !var.is_empty() {
                    interp.write_scalar(&var, obj.clone());
                }
                let (hobj, hcode) = run_to_completion(interp, &handler_text)?;
                obj = hobj;
                code = hcode;
            }
            i += 4;
        } else if kw == "finally" && i + 1 < argv.len() {
            finally_text = Some(interp.host.get_string(&argv[i + 1]));
            i += 2;
        } else {
            i += 1;
        }
    }
    if let Some(text) = finally_text {
        run_to_completion(interp, &text)?;
    }
    Ok(Signal::Done(obj, code))
}

pub fn cmd_if<H: Host>(
    interp: &mut Interpreter<H>,
    argv: &[H::Obj],
    resume: Option<Continuation<H>>,
) -> Result<Signal<H>, EvalError> {
    if argv.len() < 3 {
        return wrong_args("if expr body ?elseif expr body ...? ?else body?");
    }
    let mut chosen: Option<String> = None;
    let mut i = 1;
    let mut first = true;
    while i < argv.len() {
        let tok = interp.host.get_string(&argv[i]);
        if tok == "else" {
            if i + 1 >= argv.len() {
                return wrong_args("if ... else body");
            }
            if chosen.is_none() {
                chosen = Some(interp.host.get_string(&argv[i + 1]));
            }
            break;
        }
        let (cond_text, body_idx) = if first {
            (tok, i + 1)
        } else if tok == "elseif" {
            if i + 2 >= argv.len() {
                return wrong_args("if ... elseif expr body");
            }
            (interp.host.get_string(&argv[i + 1]), i + 2)
        } else {
            return Err(EvalError::Invariant("malformed if"));
        };
        first = false;
        if body_idx >= argv.len() {
            return wrong_args("if expr body");
        }
        if chosen.is_none() {
            let val = crate::expr::eval_str(interp, &cond_text)?;
            if val.truthy("if")? {
                chosen = Some(interp.host.get_string(&argv[body_idx]));
            }
        }
        i = body_idx + 1;
    }
    let body_text = chosen.unwrap_or_default();
    let body = parser::parse_script(&body_text).map_err(EvalError::Parse)?;
    eval_script(interp, &body, resume)
}

pub fn cmd_while<H: Host>(
    interp: &mut Interpreter<H>,
    argv: &[H::Obj],
    resume: Option<Continuation<H>>,
) -> Result<Signal<H>, EvalError> {
    if argv.len() != 3 {
        return wrong_args("while test body");
    }
    let cond_text = interp.host.get_string(&argv[1]);
    let body_text = interp.host.get_string(&argv[2]);
    let body = parser::parse_script(&body_text).map_err(EvalError::Parse)?;

    let mut pending = match resume {
        None => None,
        Some(Continuation::While { child }) => child,
        Some(other) => Some(Box::new(other)),
    };

    loop {
        let body_resume = pending.take().map(|b| *b);
        if body_resume.is_none() {
            let cond_val = crate::expr::eval_str(interp, &cond_text)?;
            if !cond_val.truthy("while")? {
                return Ok(Signal::Done(interp.host.new_string(""), ResultCode::Ok));
            }
        }
        match eval_script(interp, &body, body_resume)? {
            Signal::Yield(v, cont) => {
                return Ok(Signal::Yield(v, Continuation::While { child: Some(Box::new(cont)) }));
            }
            Signal::Done(_, ResultCode::Break) => return Ok(Signal::Done(interp.host.new_string(""), ResultCode::Ok)),
            Signal::Done(_, ResultCode::Continue) | Signal::Done(_, ResultCode::Ok) => continue,
            Signal::Done(obj, code) => return Ok(Signal::Done(obj, code)),
        }
    }
}

pub fn cmd_for<H: Host>(
    interp: &mut Interpreter<H>,
    argv: &[H::Obj],
    resume: Option<Continuation<H>>,
) -> Result<Signal<H>, EvalError> {
    if argv.len() != 5 {
        return wrong_args("for start test next command");
    }
    let init_text = interp.host.get_string(&argv[1]);
    let cond_text = interp.host.get_string(&argv[2]);
    let post_text = interp.host.get_string(&argv[3]);
    let body_text = interp.host.get_string(&argv[4]);
    let body = parser::parse_script(&body_text).map_err(EvalError::Parse)?;

    let mut pending = match resume {
        None => None,
        Some(Continuation::For { child }) => child,
        Some(other) => Some(Box::new(other)),
    };
    if pending.is_none() {
        run_to_completion(interp, &init_text)?;
    }

    loop {
        let body_resume = pending.take().map(|b| *b);
        if body_resume.is_none() {
            let cond_val = crate::expr::eval_str(interp, &cond_text)?;
            if !cond_val.truthy("for")? {
                return Ok(Signal::Done(interp.host.new_string(""), ResultCode::Ok));
            }
        }
        match eval_script(interp, &body, body_resume)? {
            Signal::Yield(v, cont) => {
                return Ok(Signal::Yield(v, Continuation::For { child: Some(Box::new(cont)) }));
            }
            Signal::Done(_, ResultCode::Break) => return Ok(Signal::Done(interp.host.new_string(""), ResultCode::Ok)),
            Signal::Done(_, ResultCode::Continue) | Signal::Done(_, ResultCode::Ok) => {
                run_to_completion(interp, &post_text)?;
            }
            Signal::Done(obj, code) => return Ok(Signal::Done(obj, code)),
        }
    }
}

pub fn cmd_foreach<H: Host>(
    interp: &mut Interpreter<H>,
    argv: &[H::Obj],
    resume: Option<Continuation<H>>,
) -> Result<Signal<H>, EvalError> {
    if argv.len() != 4 {
        return wrong_args("foreach varList list body");
    }
    let var_list = list_of(interp, &argv[1])?;
    let var_names: Vec<String> = var_list.iter().map(|o| interp.host.get_string(o)).collect();
    let body_text = interp.host.get_string(&argv[3]);
    let body = parser::parse_script(&body_text).map_err(EvalError::Parse)?;

    let (mut remaining, mut pending) = match resume {
        None => (list_of(interp, &argv[2])?, None),
        Some(Continuation::Foreach { remaining, child, .. }) => (remaining, child),
        Some(other) => (list_of(interp, &argv[2])?, Some(Box::new(other))),
    };

    loop {
        let body_resume = pending.take().map(|b| *b);
        if body_resume.is_none() {
            if remaining.is_empty() {
                return Ok(Signal::Done(interp.host.new_string(""), ResultCode::Ok));
            }
            let n = var_names.len().max(1);
            let take = n.min(remaining.len());
            let chunk: Vec<H::Obj> = remaining.drain(..take).collect();
            for (i, vn) in var_names.iter().enumerate() {
                let val = chunk.get(i).cloned().unwrap_or_else(|| interp.host.new_string(""));
                interp.write_scalar(vn, val);
            }
        }
        match eval_script(interp, &body, body_resume)? {
            Signal::Yield(v, cont) => {
                return Ok(Signal::Yield(
                    v,
                    Continuation::Foreach { var_names: var_names.clone(), remaining: remaining.clone(), child: Some(Box::new(cont)) },
                ));
            }
            Signal::Done(_, ResultCode::Break) => return Ok(Signal::Done(interp.host.new_string(""), ResultCode::Ok)),
            Signal::Done(_, ResultCode::Continue) | Signal::Done(_, ResultCode::Ok) => continue,
            Signal::Done(obj, code) => return Ok(Signal::Done(obj, code)),
        }
    }
}
