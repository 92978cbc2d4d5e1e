//! The interpreter (spec.md §3 Interpreter, §6): the public entry point
//! tying together the frame stack, the Host, and the evaluator.
//!
//! Grounded on the teacher's `shell::Shell` (state container driving
//! `execute`/`execute_interactive`), generalized to Tcl's
//! frame-stack-plus-coroutine-manager shape.

use std::rc::Rc;

use crate::ast::ScriptNode;
use crate::config::Config;
use crate::errors::EvalError;
use crate::eval::coroutine::CoroutineManager;
use crate::eval::{self, Signal};
use crate::frame::{Frame, FrameFlags, LinkTarget};
use crate::host::Host;
use crate::parser;

#[derive(Debug, Clone, Copy)]
enum Storage {
    Global,
    Frame(usize),
}

pub struct Interpreter<H: Host> {
    pub host: H,
    pub config: Config,
    global_vars: H::VarHandle,
    frames: Vec<Frame<H>>,
    pub error_info: String,
    pub error_code: String,
    pub safe: bool,
    pub(crate) coroutines: CoroutineManager<H>,
}

impl<H: Host> Interpreter<H> {
    pub fn new(mut host: H, config: Config) -> Self {
        let global_vars = host.new_var_handle();
        let safe = config.safe_by_default;
        let default_error_code = config.default_error_code.clone();
        Interpreter {
            host,
            config,
            global_vars,
            frames: Vec::new(),
            error_info: String::new(),
            error_code: default_error_code,
            safe,
            coroutines: CoroutineManager::new(),
        }
    }

    /// Parses and evaluates a full script, discarding any suspension:
    /// a `yield` reaching this entry point (i.e. invoked outside any
    /// coroutine) is reported as an error, matching spec.md §4.6
    /// ("yield outside a coroutine is an error").
    pub fn eval(&mut self, src: &str) -> Result<H::Obj, EvalError> {
        let script = parser::parse_script(src)?;
        self.eval_script_ast(&script)
    }

    pub fn eval_script_ast(&mut self, script: &Rc<ScriptNode>) -> Result<H::Obj, EvalError> {
        match eval::eval_script(self, script, None)? {
            Signal::Done(obj, _code) => Ok(obj),
            Signal::Yield(..) => Err(EvalError::NoCurrentCoroutine),
        }
    }

    // -- frame stack ----------------------------------------------------

    pub(crate) fn frames_len(&self) -> usize {
        self.frames.len()
    }

    pub(crate) fn push_frame(&mut self, frame: Frame<H>) {
        self.frames.push(frame);
    }

    pub(crate) fn pop_frame(&mut self) -> Frame<H> {
        self.frames.pop().expect("pop_frame on empty frame stack")
    }

    pub(crate) fn frame_at(&self, idx: usize) -> &Frame<H> {
        &self.frames[idx]
    }

    pub(crate) fn top_frame(&self) -> Option<&Frame<H>> {
        self.frames.last()
    }

    /// `info level` with no argument: the current call depth (0 at
    /// global scope).
    pub fn current_level(&self) -> usize {
        self.frames.len()
    }

    /// `info level N` (spec.md §9 Open Questions): non-positive `n` is
    /// relative to the current level, positive is absolute.
    pub fn resolve_level(&self, n: i64) -> usize {
        if n > 0 {
            n as usize
        } else {
            (self.current_level() as i64 + n).max(0) as usize
        }
    }

    pub fn frame_command_at_level(&self, level: usize) -> Option<String> {
        if level == 0 || level > self.frames.len() {
            return None;
        }
        Some(self.frames[level - 1].command.clone())
    }

    pub(crate) fn swap_frames(&mut self, new_frames: Vec<Frame<H>>) -> Vec<Frame<H>> {
        std::mem::replace(&mut self.frames, new_frames)
    }

    /// Truncates the frame stack to its first `n` frames, returning the
    /// removed suffix so `uplevel` can restore it afterward. Used
    /// instead of `swap_frames` because the suffix frames (and their
    /// `Host::VarHandle`s) must survive unchanged, not be dropped.
    pub(crate) fn truncate_frames_to(&mut self, n: usize) -> Vec<Frame<H>> {
        let n = n.min(self.frames.len());
        self.frames.split_off(n)
    }

    pub(crate) fn restore_truncated_frames(&mut self, mut suffix: Vec<Frame<H>>) {
        self.frames.append(&mut suffix);
    }

    // -- variable resolution ---------------------------------------------

    /// Resolves `name` to where it's stored. The third element is `true`
    /// when `name` carries no `global`/`upvar` link in the current frame
    /// (an ordinary local reference) — callers doing a *read* must then
    /// also consult the global frame on a miss there (spec.md §4.3 "on
    /// miss, falls back to the global frame"; §4.4 "SimpleVar → lookup
    /// (current then global)"). Writes never use this fallback: an
    /// unlinked `set` always creates/updates a frame-local variable.
    fn storage_for(&self, name: &str) -> (Storage, String, bool) {
        match self.frames.last() {
            None => (Storage::Global, name.to_string(), false),
            Some(f) => match f.links.get(name) {
                Some(LinkTarget::Global(real)) => (Storage::Global, real.clone(), false),
                Some(LinkTarget::Frame(idx, real)) => (Storage::Frame(*idx), real.clone(), false),
                None => (Storage::Frame(self.frames.len() - 1), name.to_string(), true),
            },
        }
    }

    pub fn read_scalar(&self, name: &str) -> Option<H::Obj> {
        let (storage, real, fallback) = self.storage_for(name);
        let found = match storage {
            Storage::Global => self.host.var_get(&self.global_vars, &real),
            Storage::Frame(idx) => self.host.var_get(&self.frames[idx].vars, &real),
        };
        if found.is_some() || !fallback {
            return found;
        }
        self.host.var_get(&self.global_vars, &real)
    }

    pub fn write_scalar(&mut self, name: &str, value: H::Obj) {
        let (storage, real, _) = self.storage_for(name);
        match storage {
            Storage::Global => self.host.var_set(&self.global_vars, &real, value),
            Storage::Frame(idx) => self.host.var_set(&self.frames[idx].vars, &real, value),
        }
    }

    pub fn unset_scalar(&mut self, name: &str) -> bool {
        let (storage, real, _) = self.storage_for(name);
        match storage {
            Storage::Global => self.host.var_unset(&self.global_vars, &real),
            Storage::Frame(idx) => self.host.var_unset(&self.frames[idx].vars, &real),
        }
    }

    pub fn scalar_exists(&self, name: &str) -> bool {
        let (storage, real, fallback) = self.storage_for(name);
        let exists = match storage {
            Storage::Global => self.host.var_exists(&self.global_vars, &real),
            Storage::Frame(idx) => self.host.var_exists(&self.frames[idx].vars, &real),
        };
        exists || (fallback && self.host.var_exists(&self.global_vars, &real))
    }

    pub fn read_array(&self, name: &str, key: &str) -> Option<H::Obj> {
        let (storage, real, fallback) = self.storage_for(name);
        let found = match storage {
            Storage::Global => self.host.array_get(&self.global_vars, &real, key),
            Storage::Frame(idx) => self.host.array_get(&self.frames[idx].vars, &real, key),
        };
        if found.is_some() || !fallback {
            return found;
        }
        self.host.array_get(&self.global_vars, &real, key)
    }

    pub fn write_array(&mut self, name: &str, key: &str, value: H::Obj) {
        let (storage, real, _) = self.storage_for(name);
        match storage {
            Storage::Global => self.host.array_set(&self.global_vars, &real, key, value),
            Storage::Frame(idx) => self.host.array_set(&self.frames[idx].vars, &real, key, value),
        }
    }

    /// `global name`: links `name` in the current frame to the global
    /// table entry of the same name. A no-op at global scope.
    pub fn link_global(&mut self, name: &str) {
        if let Some(f) = self.frames.last_mut() {
            f.links.insert(name.to_string(), LinkTarget::Global(name.to_string()));
        }
    }

    /// `upvar level otherName myName`: links `myName` in the current
    /// frame to `otherName` in the frame at absolute `level`, or to the
    /// global table when `level == 0`.
    pub fn link_upvar(&mut self, level: usize, other_name: &str, my_name: &str) -> Result<(), EvalError> {
        let cur = self.frames.len();
        if self.frames.is_empty() {
            return Err(EvalError::Invariant("upvar at global scope"));
        }
        let target = if level == 0 {
            LinkTarget::Global(other_name.to_string())
        } else if level <= cur {
            LinkTarget::Frame(level - 1, other_name.to_string())
        } else {
            return Err(EvalError::Invariant("upvar level out of range"));
        };
        self.frames.last_mut().unwrap().links.insert(my_name.to_string(), target);
        Ok(())
    }

    /// Whether a coroutine named `name` is currently registered
    /// (suspended or just created), per spec.md §4.6.
    pub fn has_coroutine(&self, name: &str) -> bool {
        self.coroutines.contains(name)
    }

    pub fn global_handle(&self) -> &H::VarHandle {
        &self.global_vars
    }

    pub fn global_var_names(&self) -> Vec<String> {
        self.host.var_names(&self.global_vars)
    }

    pub fn push_proc_frame(&mut self, proc_name: String, command: String, flags: FrameFlags) {
        let level = self.frames.len() + 1;
        let vars = self.host.new_var_handle();
        self.push_frame(Frame::new(level, flags | FrameFlags::PROC, Some(proc_name), command, vars));
    }

    pub fn pop_proc_frame(&mut self) {
        let frame = self.pop_frame();
        self.host.free_var_handle(frame.vars);
    }
}
