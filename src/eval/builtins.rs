//! Value and introspection builtins (spec.md §4.8): `set`/`unset`,
//! `append`/`incr`, list construction (`list`/`lappend`/`lindex`/
//! `llength`), `expr`, `subst`, `puts`, and `info`.
//!
//! Grounded on the teacher's `eval/list.rs`/`eval/string.rs` builtin
//! shape (one function per command, validating arity up front and
//! returning a Tcl-level error rather than panicking).

use crate::errors::{messages, EvalError, ResultCode, SubstError};
use crate::eval::{Continuation, Signal};
use crate::host::Host;
use crate::interp::Interpreter;
use crate::subst::{subst_string, SubstFlags};
use crate::value::ExprValue;

fn wrong_args<H>(usage: &str) -> Result<Signal<H>, EvalError>
where
    H: Host,
{
    Err(EvalError::Subst(SubstError::Eval(messages::wrong_num_args(usage))))
}

pub fn cmd_set<H: Host>(
    interp: &mut Interpreter<H>,
    argv: &[H::Obj],
    _resume: Option<Continuation<H>>,
) -> Result<Signal<H>, EvalError> {
    match argv.len() {
        2 => {
            let name = interp.host.get_string(&argv[1]);
            let val = interp
                .read_scalar(&name)
                .ok_or_else(|| EvalError::Subst(SubstError::NoSuchVariable(name)))?;
            Ok(Signal::Done(val, ResultCode::Ok))
        }
        3 => {
            let name = interp.host.get_string(&argv[1]);
            let val = interp.host.dup(&argv[2]);
            interp.write_scalar(&name, val.clone());
            Ok(Signal::Done(val, ResultCode::Ok))
        }
        _ => wrong_args("set varName ?newValue?"),
    }
}

pub fn cmd_unset<H: Host>(
    interp: &mut Interpreter<H>,
    argv: &[H::Obj],
    _resume: Option<Continuation<H>>,
) -> Result<Signal<H>, EvalError> {
    let mut i = 1;
    let mut nocomplain = false;
    if i < argv.len() {
        let tok = interp.host.get_string(&argv[i]);
        if tok == "-nocomplain" {
            nocomplain = true;
            i += 1;
        }
    }
    if i >= argv.len() {
        return wrong_args("unset ?-nocomplain? ?--? ?name ...?");
    }
    for obj in &argv[i..] {
        let name = interp.host.get_string(obj);
        let existed = interp.unset_scalar(&name);
        if !existed && !nocomplain {
            return Err(EvalError::Subst(SubstError::NoSuchVariable(name)));
        }
    }
    Ok(Signal::Done(interp.host.new_string(""), ResultCode::Ok))
}

pub fn cmd_incr<H: Host>(
    interp: &mut Interpreter<H>,
    argv: &[H::Obj],
    _resume: Option<Continuation<H>>,
) -> Result<Signal<H>, EvalError> {
    if argv.len() < 2 || argv.len() > 3 {
        return wrong_args("incr varName ?increment?");
    }
    let name = interp.host.get_string(&argv[1]);
    let delta = if argv.len() == 3 {
        parse_int(&interp.host.get_string(&argv[2]))?
    } else {
        1
    };
    let current = match interp.read_scalar(&name) {
        Some(obj) => parse_int(&interp.host.get_string(&obj))?,
        None => 0,
    };
    let obj = interp.host.new_int(current + delta);
    interp.write_scalar(&name, obj.clone());
    Ok(Signal::Done(obj, ResultCode::Ok))
}

fn parse_int(s: &str) -> Result<i64, EvalError> {
    s.trim()
        .parse::<i64>()
        .map_err(|_| EvalError::Subst(SubstError::Eval(format!("expected integer but got \"{}\"", s))))
}

pub fn cmd_append<H: Host>(
    interp: &mut Interpreter<H>,
    argv: &[H::Obj],
    _resume: Option<Continuation<H>>,
) -> Result<Signal<H>, EvalError> {
    if argv.len() < 2 {
        return wrong_args("append varName ?value value ...?");
    }
    let name = interp.host.get_string(&argv[1]);
    let mut text = interp.read_scalar(&name).map(|o| interp.host.get_string(&o)).unwrap_or_default();
    for v in &argv[2..] {
        text.push_str(&interp.host.get_string(v));
    }
    let obj = interp.host.new_string(&text);
    interp.write_scalar(&name, obj.clone());
    Ok(Signal::Done(obj, ResultCode::Ok))
}

pub fn cmd_lappend<H: Host>(
    interp: &mut Interpreter<H>,
    argv: &[H::Obj],
    _resume: Option<Continuation<H>>,
) -> Result<Signal<H>, EvalError> {
    if argv.len() < 2 {
        return wrong_args("lappend varName ?value value ...?");
    }
    let name = interp.host.get_string(&argv[1]);
    let mut list = match interp.read_scalar(&name) {
        Some(obj) => obj,
        None => interp.host.new_list(&[]),
    };
    for v in &argv[2..] {
        list = interp.host.list_append(&list, v.clone());
    }
    interp.write_scalar(&name, list.clone());
    Ok(Signal::Done(list, ResultCode::Ok))
}

pub fn cmd_list<H: Host>(
    interp: &mut Interpreter<H>,
    argv: &[H::Obj],
    _resume: Option<Continuation<H>>,
) -> Result<Signal<H>, EvalError> {
    Ok(Signal::Done(interp.host.new_list(&argv[1..]), ResultCode::Ok))
}

pub fn cmd_llength<H: Host>(
    interp: &mut Interpreter<H>,
    argv: &[H::Obj],
    _resume: Option<Continuation<H>>,
) -> Result<Signal<H>, EvalError> {
    if argv.len() != 2 {
        return wrong_args("llength list");
    }
    let n = interp.host.list_length(&argv[1]);
    Ok(Signal::Done(interp.host.new_int(n as i64), ResultCode::Ok))
}

pub fn cmd_lindex<H: Host>(
    interp: &mut Interpreter<H>,
    argv: &[H::Obj],
    _resume: Option<Continuation<H>>,
) -> Result<Signal<H>, EvalError> {
    if argv.len() < 2 {
        return wrong_args("lindex list ?index?");
    }
    if argv.len() == 2 {
        return Ok(Signal::Done(argv[1].clone(), ResultCode::Ok));
    }
    if argv.len() != 3 {
        return wrong_args("lindex list ?index?");
    }
    let idx_text = interp.host.get_string(&argv[2]);
    let idx: i64 = idx_text
        .trim()
        .parse()
        .map_err(|_| EvalError::Subst(SubstError::Eval(format!("bad index \"{}\"", idx_text))))?;
    let len = interp.host.list_length(&argv[1]) as i64;
    if idx < 0 || idx >= len {
        return Ok(Signal::Done(interp.host.new_string(""), ResultCode::Ok));
    }
    let item = interp.host.list_index(&argv[1], idx as usize).unwrap_or_else(|| interp.host.new_string(""));
    Ok(Signal::Done(item, ResultCode::Ok))
}

pub fn cmd_subst<H: Host>(
    interp: &mut Interpreter<H>,
    argv: &[H::Obj],
    _resume: Option<Continuation<H>>,
) -> Result<Signal<H>, EvalError> {
    if argv.len() < 2 {
        return wrong_args("subst ?-nobackslashes? ?-nocommands? ?-novariables? string");
    }
    let mut flags = SubstFlags::ALL;
    let mut i = 1;
    while i + 1 < argv.len() {
        let opt = interp.host.get_string(&argv[i]);
        match opt.as_str() {
            "-nobackslashes" => flags.backslash = false,
            "-nocommands" => flags.commands = false,
            "-novariables" => flags.variables = false,
            _ => break,
        }
        i += 1;
    }
    if i + 1 != argv.len() {
        return wrong_args("subst ?-nobackslashes? ?-nocommands? ?-novariables? string");
    }
    let text = interp.host.get_string(&argv[i]);
    let out = subst_string(interp, &text, flags)?;
    Ok(Signal::Done(interp.host.new_string(&out), ResultCode::Ok))
}

pub fn cmd_expr<H: Host>(
    interp: &mut Interpreter<H>,
    argv: &[H::Obj],
    _resume: Option<Continuation<H>>,
) -> Result<Signal<H>, EvalError> {
    if argv.len() < 2 {
        return wrong_args("expr arg ?arg ...?");
    }
    let text = argv[1..].iter().map(|o| interp.host.get_string(o)).collect::<Vec<_>>().join(" ");
    let val = crate::expr::eval_str(interp, &text)?;
    let obj = match val {
        ExprValue::Int(n) => interp.host.new_int(n),
        ExprValue::Double(d) => interp.host.new_double(d),
        ExprValue::Str(s) => interp.host.new_string(&s),
    };
    Ok(Signal::Done(obj, ResultCode::Ok))
}

pub fn cmd_puts<H: Host>(
    interp: &mut Interpreter<H>,
    argv: &[H::Obj],
    _resume: Option<Continuation<H>>,
) -> Result<Signal<H>, EvalError> {
    let mut i = 1;
    let mut newline = true;
    if i < argv.len() {
        let tok = interp.host.get_string(&argv[i]);
        if tok == "-nonewline" {
            newline = false;
            i += 1;
        }
    }
    let remaining = argv.len() - i;
    let (chan, mut text) = if remaining == 2 {
        let chan_name = interp.host.get_string(&argv[i]);
        let chan = if chan_name == "stderr" { interp.host.chan_stderr() } else { interp.host.chan_stdout() };
        (chan, interp.host.get_string(&argv[i + 1]))
    } else if remaining == 1 {
        (interp.host.chan_stdout(), interp.host.get_string(&argv[i]))
    } else {
        return wrong_args("puts ?-nonewline? ?channelId? string");
    };
    if newline {
        text.push('\n');
    }
    interp.host.chan_write(&chan, &text).map_err(|e| EvalError::Subst(SubstError::Eval(e.to_string())))?;
    Ok(Signal::Done(interp.host.new_string(""), ResultCode::Ok))
}

/// `apply {params body} ?arg ...?`: calls an anonymous lambda. Runs
/// like a `proc` call in every respect (its own frame, `return`/`break`/
/// `continue` handling) except it is never registered by name.
pub fn cmd_apply<H: Host>(
    interp: &mut Interpreter<H>,
    argv: &[H::Obj],
    _resume: Option<Continuation<H>>,
) -> Result<Signal<H>, EvalError> {
    if argv.len() < 2 {
        return wrong_args("apply {params body} ?arg ...?");
    }
    let lambda = interp.host.as_list(&argv[1]).map_err(|e| EvalError::Subst(SubstError::Eval(e.to_string())))?;
    if lambda.len() != 2 {
        return Err(EvalError::Subst(SubstError::Eval(format!(
            "can't interpret \"{}\" as a lambda expression",
            interp.host.get_string(&argv[1])
        ))));
    }
    let params = super::parse_param_list(interp, &lambda[0])?;
    let body = interp.host.get_string(&lambda[1]);
    let def = crate::host::ProcDef { params, body };
    let call_args: Vec<H::Obj> = std::iter::once(argv[0].clone()).chain(argv[2..].iter().cloned()).collect();
    super::call_proc(interp, "apply", &call_args, def)
}

pub fn cmd_info<H: Host>(
    interp: &mut Interpreter<H>,
    argv: &[H::Obj],
    _resume: Option<Continuation<H>>,
) -> Result<Signal<H>, EvalError> {
    if argv.len() < 2 {
        return wrong_args("info subcommand ?arg ...?");
    }
    let sub = interp.host.get_string(&argv[1]);
    match sub.as_str() {
        "level" => match argv.len() {
            2 => Ok(Signal::Done(interp.host.new_int(interp.current_level() as i64), ResultCode::Ok)),
            3 => {
                let n_text = interp.host.get_string(&argv[2]);
                let n = parse_int(&n_text)?;
                let level = interp.resolve_level(n);
                let cmd = interp
                    .frame_command_at_level(level)
                    .ok_or_else(|| EvalError::Subst(SubstError::Eval(format!("bad level \"{}\"", n_text))))?;
                Ok(Signal::Done(interp.host.new_string(&cmd), ResultCode::Ok))
            }
            _ => wrong_args("info level ?number?"),
        },
        "exists" => {
            if argv.len() != 3 {
                return wrong_args("info exists varName");
            }
            let name = interp.host.get_string(&argv[2]);
            let exists = interp.scalar_exists(&name);
            Ok(Signal::Done(interp.host.new_int(if exists { 1 } else { 0 }), ResultCode::Ok))
        }
        "commands" => {
            let names = interp.host.cmd_list();
            let objs: Vec<H::Obj> = names.iter().map(|n| interp.host.new_string(n)).collect();
            Ok(Signal::Done(interp.host.new_list(&objs), ResultCode::Ok))
        }
        other => Err(EvalError::Subst(SubstError::Eval(format!(
            "unknown or ambiguous subcommand \"{}\": must be commands, exists, or level",
            other
        )))),
    }
}
