//! The Host capability set (spec.md §1, §6): everything the core
//! consumes but does not implement. Per spec.md §9 REDESIGN FLAGS
//! ("opaque handles passed as `void*` across the host boundary"), this
//! is a trait the core is generic over, rather than a function-pointer
//! record — every handle type becomes a concrete associated type chosen
//! by the implementor.
//!
//! [`memory`] ships a reference implementation used by this crate's own
//! tests (SPEC_FULL.md §5.4); it is not meant for production use.

pub mod memory;

use std::fmt;

/// Where a variable lookup should land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarScope {
    Local,
    Global,
}

/// A registered procedure definition (spec.md §4.8).
#[derive(Debug, Clone, PartialEq)]
pub struct ProcDef {
    /// Each spec is `(name, default)`; `default` is `None` for required
    /// parameters. The final entry may be named `args` to mean variadic.
    pub params: Vec<(String, Option<String>)>,
    pub body: String,
}

/// What a command name resolves to (spec.md §4.8 lookup order, minus
/// the core's own built-in table which the evaluator checks first).
#[derive(Debug, Clone, PartialEq)]
pub enum CommandLookup {
    Proc(ProcDef),
    Extension,
    NotFound,
}

/// The host capability set. The core never allocates memory or touches
/// process/filesystem/network state except through this trait.
pub trait Host {
    /// An opaque, reference-identified, string-shaped value. The core
    /// never matches on its representation; it calls back into `Host`.
    type Obj: Clone + fmt::Debug;
    /// Opaque per-frame variable storage handle.
    type VarHandle: Clone + fmt::Debug;
    /// Opaque channel handle (`stdout`, `stdin`, user-opened channels).
    type Channel: Clone + fmt::Debug + PartialEq;
    /// Host-reported failure (I/O error, extension panic, ...).
    type HostError: fmt::Display + fmt::Debug;

    // -- value construction / introspection --------------------------
    fn new_string(&mut self, s: &str) -> Self::Obj;
    fn new_int(&mut self, n: i64) -> Self::Obj;
    fn new_double(&mut self, d: f64) -> Self::Obj;
    fn new_list(&mut self, items: &[Self::Obj]) -> Self::Obj;
    /// Duplicate a value for storage (spec.md §5: "values are immutable
    /// by convention... when stored in a variable, it is duplicated").
    fn dup(&mut self, obj: &Self::Obj) -> Self::Obj;
    fn get_string(&self, obj: &Self::Obj) -> String;
    fn as_int(&self, obj: &Self::Obj) -> Result<i64, Self::HostError>;
    fn as_double(&self, obj: &Self::Obj) -> Result<f64, Self::HostError>;
    fn as_bool(&self, obj: &Self::Obj) -> Result<bool, Self::HostError>;
    fn as_list(&self, obj: &Self::Obj) -> Result<Vec<Self::Obj>, Self::HostError>;
    fn list_index(&self, obj: &Self::Obj, idx: usize) -> Option<Self::Obj>;
    fn list_length(&self, obj: &Self::Obj) -> usize;
    fn list_append(&mut self, obj: &Self::Obj, item: Self::Obj) -> Self::Obj;
    fn list_range(&self, obj: &Self::Obj, start: usize, end: usize) -> Self::Obj;
    fn list_sort(&mut self, obj: &Self::Obj) -> Self::Obj;

    // -- variable storage ---------------------------------------------
    fn var_get(&self, frame: &Self::VarHandle, name: &str) -> Option<Self::Obj>;
    fn var_set(&mut self, frame: &Self::VarHandle, name: &str, value: Self::Obj);
    fn var_unset(&mut self, frame: &Self::VarHandle, name: &str) -> bool;
    fn var_exists(&self, frame: &Self::VarHandle, name: &str) -> bool;
    fn var_names(&self, frame: &Self::VarHandle) -> Vec<String>;
    fn array_get(&self, frame: &Self::VarHandle, name: &str, key: &str) -> Option<Self::Obj>;
    fn array_set(&mut self, frame: &Self::VarHandle, name: &str, key: &str, value: Self::Obj);
    fn array_unset(&mut self, frame: &Self::VarHandle, name: &str, key: &str) -> bool;
    fn array_exists(&self, frame: &Self::VarHandle, name: &str, key: &str) -> bool;
    fn array_names(&self, frame: &Self::VarHandle, name: &str) -> Vec<String>;

    // -- frame / scratch storage ---------------------------------------
    /// Allocate a fresh variable-storage handle for a new call frame.
    fn new_var_handle(&mut self) -> Self::VarHandle;
    /// Release a frame's variable storage on proc/coroutine exit.
    fn free_var_handle(&mut self, handle: Self::VarHandle);

    // -- command registry -----------------------------------------------
    fn cmd_lookup(&self, name: &str) -> CommandLookup;
    fn cmd_list(&self) -> Vec<String>;
    fn proc_register(&mut self, name: &str, def: ProcDef);
    fn proc_get_def(&self, name: &str) -> Option<ProcDef>;
    fn ext_invoke(
        &mut self,
        name: &str,
        argv: &[Self::Obj],
    ) -> Result<Self::Obj, Self::HostError>;

    // -- channel I/O -----------------------------------------------------
    fn chan_stdout(&self) -> Self::Channel;
    fn chan_stderr(&self) -> Self::Channel;
    fn chan_stdin(&self) -> Self::Channel;
    fn chan_write(&mut self, chan: &Self::Channel, data: &str) -> Result<(), Self::HostError>;
    fn chan_flush(&mut self, chan: &Self::Channel) -> Result<(), Self::HostError>;
}
