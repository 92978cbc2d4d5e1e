//! Coroutines (spec.md §4.6): `coroutine`, `yield`, `yieldto`.
//!
//! Grounded on the teacher's `eval/async_ops.rs` suspend/resume
//! bookkeeping, replacing its OS-thread-backed channel with the
//! `Signal`/`Continuation` mechanism from `eval/mod.rs` — a coroutine
//! is just a saved frame stack plus a saved [`Continuation`] for its
//! body script, driven by [`eval_script`] the same way a plain script
//! is.
//!
//! `yieldto`'s full semantics (transferring control to another
//! coroutine and resuming *it*, rather than the caller, on its next
//! yield) are reduced here to: invoke the named command to completion,
//! then suspend with its result as the yielded value. A target that
//! itself yields instead of completing is not supported and is
//! reported as an error.
//!
//! `coroutine name command ?arg ...?`'s body is bound and run directly
//! in the coroutine's own root frame rather than through a separately
//! dispatched [`call_proc`](super::call_proc) call, specifically so
//! `yield` inside it is "directly inside a coroutine body" and not a
//! nested proc call (see the scope decision at the top of
//! `eval/mod.rs`).

use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::ScriptNode;
use crate::errors::{messages, EvalError, ResultCode, SubstError};
use crate::eval::{bind_proc_params, eval_script, parse_param_list, Continuation, Signal};
use crate::frame::{Frame, FrameFlags};
use crate::host::{CommandLookup, Host, ProcDef};
use crate::interp::Interpreter;

fn wrong_args<H>(usage: &str) -> Result<Signal<H>, EvalError>
where
    H: Host,
{
    Err(EvalError::Subst(SubstError::Eval(messages::wrong_num_args(usage))))
}

/// A coroutine currently parked at a `yield`/`yieldto`. Completed (or
/// errored) coroutines are removed from the manager entirely, matching
/// Tcl's auto-deletion of the command when its body finishes.
struct CoroState<H: Host> {
    body: Rc<ScriptNode>,
    frames: Vec<Frame<H>>,
    cont: Continuation<H>,
}

/// Owns every coroutine registered in an interpreter, keyed by name.
pub struct CoroutineManager<H: Host> {
    states: HashMap<String, CoroState<H>>,
    /// The value a blocked `yield`/`yieldto` call returns, set by
    /// [`CoroutineManager::resume`] just before driving the body and
    /// consumed by `cmd_yield`/`cmd_yieldto` on their resumed call.
    pending_input: Option<H::Obj>,
}

impl<H: Host> CoroutineManager<H> {
    pub fn new() -> Self {
        CoroutineManager { states: HashMap::new(), pending_input: None }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.states.contains_key(name)
    }

    /// Resumes a suspended coroutine, injecting `input` as the value
    /// its blocked `yield` call returns.
    pub fn resume(interp: &mut Interpreter<H>, name: &str, input: H::Obj) -> Result<Signal<H>, EvalError> {
        let CoroState { body, frames, cont } = interp
            .coroutines
            .states
            .remove(name)
            .ok_or_else(|| EvalError::Subst(SubstError::Eval(messages::invalid_command_name(name))))?;

        interp.coroutines.pending_input = Some(input);
        let saved = interp.swap_frames(frames);
        let result = eval_script(interp, &body, Some(cont));
        let frames_after = interp.swap_frames(saved);
        interp.coroutines.pending_input = None;

        match result {
            Ok(Signal::Done(obj, _code)) => {
                tracing::trace!(coroutine = name, "completed on resume");
                // Left absent from `states`: the body finished, so the
                // coroutine command no longer exists.
                for f in frames_after {
                    interp.host.free_var_handle(f.vars);
                }
                Ok(Signal::Done(obj, ResultCode::Ok))
            }
            Ok(Signal::Yield(obj, cont)) => {
                interp.coroutines.states.insert(name.to_string(), CoroState { body, frames: frames_after, cont });
                Ok(Signal::Done(obj, ResultCode::Ok))
            }
            Err(e) => {
                tracing::debug!(coroutine = name, error = %e, "errored on resume");
                // Left absent from `states`: a coroutine that errored
                // mid-body cannot be resumed again; the next call to it
                // surfaces as an ordinary "invalid command name".
                for f in frames_after {
                    interp.host.free_var_handle(f.vars);
                }
                Err(e)
            }
        }
    }
}

/// Resolves `coroutine name command ?arg ...?`'s `command` word to a
/// parameter list, a body script, and the arguments to bind against
/// them. `command` is either the literal word `apply` followed by a
/// `{params body}` lambda (the idiomatic generator form, spec.md §8
/// scenario 3), or the name of an already-registered `proc` (spec.md §8
/// scenario 6) — a Host extension cannot be a coroutine body, since its
/// implementation is opaque to the evaluator's suspend mechanism.
fn resolve_body<H: Host>(
    interp: &mut Interpreter<H>,
    argv: &[H::Obj],
) -> Result<(Vec<(String, Option<String>)>, String, Vec<H::Obj>), EvalError> {
    let command_name = interp.host.get_string(&argv[2]);
    if command_name == "apply" {
        if argv.len() < 4 {
            return Err(EvalError::Subst(SubstError::Eval(messages::wrong_num_args(
                "coroutine name apply {params body} ?arg ...?",
            ))));
        }
        let lambda = interp.host.as_list(&argv[3]).map_err(|e| EvalError::Subst(SubstError::Eval(e.to_string())))?;
        if lambda.len() != 2 {
            return Err(EvalError::Subst(SubstError::Eval(format!(
                "can't interpret \"{}\" as a lambda expression",
                interp.host.get_string(&argv[3])
            ))));
        }
        let params = parse_param_list(interp, &lambda[0])?;
        let body = interp.host.get_string(&lambda[1]);
        Ok((params, body, argv[4..].to_vec()))
    } else {
        match interp.host.cmd_lookup(&command_name) {
            CommandLookup::Proc(ProcDef { params, body }) => Ok((params, body, argv[3..].to_vec())),
            CommandLookup::Extension | CommandLookup::NotFound => {
                Err(EvalError::Subst(SubstError::Eval(messages::invalid_command_name(&command_name))))
            }
        }
    }
}

/// `coroutine name command ?arg ...?`: creates a coroutine and
/// immediately runs it until its first suspension or completion,
/// returning that result — matching a bare call to `name` having
/// already happened once.
pub fn cmd_coroutine<H: Host>(
    interp: &mut Interpreter<H>,
    argv: &[H::Obj],
    _resume: Option<Continuation<H>>,
) -> Result<Signal<H>, EvalError> {
    if argv.len() < 3 {
        return wrong_args("coroutine name command ?arg ...?");
    }
    let name = interp.host.get_string(&argv[1]);
    if interp.coroutines.contains(&name) || super::lookup_builtin::<H>(&name).is_some() {
        return Err(EvalError::Subst(SubstError::Eval(messages::command_already_exists(&name))));
    }
    let (params, body_text, call_args) = resolve_body(interp, argv)?;
    let body = crate::parser::parse_script(&body_text)?;

    let vars = interp.host.new_var_handle();
    let frame = Frame::new(1, FrameFlags::COROUTINE, Some(name.clone()), body_text, vars);
    let saved = interp.swap_frames(vec![frame]);
    if let Err(e) = bind_proc_params(interp, &name, &ProcDef { params, body: String::new() }, &call_args) {
        // `swap_frames(saved)` hands back the just-created coroutine
        // frame (still holding the var handle allocated above).
        for f in interp.swap_frames(saved) {
            interp.host.free_var_handle(f.vars);
        }
        return Err(e);
    }
    let result = eval_script(interp, &body, None);
    let coro_frames = interp.swap_frames(saved);

    match result {
        Ok(Signal::Done(obj, _code)) => {
            for f in coro_frames {
                interp.host.free_var_handle(f.vars);
            }
            Ok(Signal::Done(obj, ResultCode::Ok))
        }
        Ok(Signal::Yield(obj, cont)) => {
            interp.coroutines.states.insert(name, CoroState { body, frames: coro_frames, cont });
            Ok(Signal::Done(obj, ResultCode::Ok))
        }
        Err(e) => {
            for f in coro_frames {
                interp.host.free_var_handle(f.vars);
            }
            Err(e)
        }
    }
}

/// `yield ?value?`: the suspension point. On the cold call (no resume
/// token) it yields `value`; on the call that replays it after a
/// resume, it returns whatever [`CoroutineManager::resume`] was given.
pub fn cmd_yield<H: Host>(
    interp: &mut Interpreter<H>,
    argv: &[H::Obj],
    resume: Option<Continuation<H>>,
) -> Result<Signal<H>, EvalError> {
    if argv.len() > 2 {
        return wrong_args("yield ?value?");
    }
    if resume.is_some() {
        let input = interp.coroutines.pending_input.take().unwrap_or_else(|| interp.host.new_string(""));
        return Ok(Signal::Done(input, ResultCode::Ok));
    }
    let value = if argv.len() == 2 { argv[1].clone() } else { interp.host.new_string("") };
    Ok(Signal::Yield(value, Continuation::Script { next_index: 0, child: None }))
}

/// `yieldto command ?arg ...?`: runs `command` to completion and
/// suspends with its result (see module doc comment for the scope
/// reduction from full target-coroutine transfer semantics).
pub fn cmd_yieldto<H: Host>(
    interp: &mut Interpreter<H>,
    argv: &[H::Obj],
    resume: Option<Continuation<H>>,
) -> Result<Signal<H>, EvalError> {
    if resume.is_some() {
        let input = interp.coroutines.pending_input.take().unwrap_or_else(|| interp.host.new_string(""));
        return Ok(Signal::Done(input, ResultCode::Ok));
    }
    if argv.len() < 2 {
        return wrong_args("yieldto command ?arg ...?");
    }
    let target_name = interp.host.get_string(&argv[1]);
    match super::dispatch_by_name(interp, &target_name, &argv[1..])? {
        Signal::Done(obj, _code) => Ok(Signal::Yield(obj, Continuation::Script { next_index: 0, child: None })),
        Signal::Yield(..) => Err(EvalError::Invariant(
            "yieldto's target yielded instead of completing; nested suspension is not supported",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::host::memory::MemoryHost;

    fn interp() -> Interpreter<MemoryHost> {
        Interpreter::new(MemoryHost::new(), Config::default())
    }

    #[test]
    fn coroutine_generator_yields_each_loop_value_then_errors() {
        // spec.md §8 scenario 3.
        let mut ip = interp();
        let first = ip.eval("coroutine g apply {{} { foreach v {10 20 30} { yield $v } }}").unwrap();
        assert_eq!(ip.host.get_string(&first), "10");
        assert!(ip.has_coroutine("g"));

        assert_eq!(ip.host.get_string(&ip.eval("g").unwrap()), "20");
        assert_eq!(ip.host.get_string(&ip.eval("g").unwrap()), "30");

        let fourth = ip.eval("g").unwrap();
        assert_eq!(ip.host.get_string(&fourth), "");
        assert!(!ip.has_coroutine("g"));

        let err = ip.eval("g").unwrap_err();
        assert!(err.to_string().contains("invalid command name"));
    }

    #[test]
    fn coroutine_over_named_proc_matches_continuation_scenario() {
        // spec.md §8 scenario 6.
        let mut ip = interp();
        ip.eval("proc p {} { for {set i 0} {$i < 3} {incr i} { yield $i }; return done }").unwrap();
        assert_eq!(ip.host.get_string(&ip.eval("coroutine c p").unwrap()), "0");
        assert_eq!(ip.host.get_string(&ip.eval("c").unwrap()), "1");
        assert_eq!(ip.host.get_string(&ip.eval("c").unwrap()), "2");
        assert_eq!(ip.host.get_string(&ip.eval("c").unwrap()), "done");
        assert!(!ip.has_coroutine("c"));

        let err = ip.eval("c").unwrap_err();
        assert!(err.to_string().contains("invalid command name"));
    }

    #[test]
    fn coroutine_without_yield_completes_immediately() {
        // spec.md §8 boundary behavior: a coroutine that never yields.
        let mut ip = interp();
        let result = ip.eval("coroutine once apply {{} {return 42}}").unwrap();
        assert_eq!(ip.host.get_string(&result), "42");
        assert!(!ip.has_coroutine("once"));
    }

    #[test]
    fn creating_a_coroutine_with_a_taken_name_errors() {
        let mut ip = interp();
        ip.eval("coroutine gen apply {{} {yield 1}}").unwrap();
        let err = ip.eval("coroutine gen apply {{} {yield 1}}").unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }
}
