//! In-memory reference [`Host`] implementation (SPEC_FULL.md §5.4).
//!
//! Grounded on `arthur-zhang-just-bash`'s `fs::in_memory_fs` pattern: a
//! capability the real spec leaves external is stood in with a plain
//! `HashMap`-backed implementation, good enough to drive every test in
//! this crate but never meant to ship as a production host.

use super::{CommandLookup, Host, ProcDef};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

/// A host-managed value. Strings are the authoritative representation;
/// int/double/bool/list views are derived on demand, matching spec.md
/// §3's "every value has an authoritative string form and may coerce...
/// on demand".
#[derive(Debug, Clone, PartialEq)]
pub struct TclObj(pub Rc<String>);

impl TclObj {
    pub fn from_string(s: impl Into<String>) -> Self {
        TclObj(Rc::new(s.into()))
    }
}

impl fmt::Display for TclObj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum MemoryHostError {
    #[error("expected integer but got \"{0}\"")]
    NotInt(String),
    #[error("expected floating-point number but got \"{0}\"")]
    NotDouble(String),
    #[error("expected boolean but got \"{0}\"")]
    NotBool(String),
    #[error("no such extension command \"{0}\"")]
    NoSuchExtension(String),
}

/// Minimal Tcl list encoding: elements separated by single spaces, an
/// element containing whitespace or braces is wrapped in `{...}`. Good
/// enough for this crate's tests; not a conformant full Tcl list parser.
fn list_to_string(items: &[TclObj]) -> String {
    items
        .iter()
        .map(|it| {
            let s = it.0.as_str();
            if s.is_empty() || s.chars().any(|c| c.is_whitespace() || c == '{' || c == '}') {
                format!("{{{}}}", s)
            } else {
                s.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn string_to_list(s: &str) -> Vec<TclObj> {
    let mut out = Vec::new();
    let bytes: Vec<char> = s.chars().collect();
    let mut i = 0;
    while i < bytes.len() {
        while i < bytes.len() && bytes[i].is_whitespace() {
            i += 1;
        }
        if i >= bytes.len() {
            break;
        }
        if bytes[i] == '{' {
            let mut depth = 1;
            let start = i + 1;
            i += 1;
            while i < bytes.len() && depth > 0 {
                match bytes[i] {
                    '{' => depth += 1,
                    '}' => depth -= 1,
                    _ => {}
                }
                if depth > 0 {
                    i += 1;
                }
            }
            let elem: String = bytes[start..i].iter().collect();
            out.push(TclObj::from_string(elem));
            i += 1; // skip closing brace
        } else {
            let start = i;
            while i < bytes.len() && !bytes[i].is_whitespace() {
                i += 1;
            }
            let elem: String = bytes[start..i].iter().collect();
            out.push(TclObj::from_string(elem));
        }
    }
    out
}

#[derive(Debug, Default, Clone)]
struct VarTable {
    scalars: HashMap<String, TclObj>,
    arrays: HashMap<String, HashMap<String, TclObj>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarHandleId(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelId {
    Stdout,
    Stderr,
    Stdin,
}

/// The in-memory reference host.
pub struct MemoryHost {
    vars: HashMap<u64, VarTable>,
    next_handle: u64,
    procs: HashMap<String, ProcDef>,
    extensions: HashMap<String, fn(&[TclObj]) -> TclObj>,
    pub stdout: String,
    pub stderr: String,
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryHost {
    pub fn new() -> Self {
        MemoryHost {
            vars: HashMap::new(),
            next_handle: 0,
            procs: HashMap::new(),
            extensions: HashMap::new(),
            stdout: String::new(),
            stderr: String::new(),
        }
    }

    pub fn register_extension(&mut self, name: &str, f: fn(&[TclObj]) -> TclObj) {
        self.extensions.insert(name.to_string(), f);
    }

    fn table(&self, handle: &VarHandleId) -> &VarTable {
        self.vars.get(&handle.0).expect("stale var handle")
    }

    fn table_mut(&mut self, handle: &VarHandleId) -> &mut VarTable {
        self.vars.get_mut(&handle.0).expect("stale var handle")
    }
}

impl Host for MemoryHost {
    type Obj = TclObj;
    type VarHandle = VarHandleId;
    type Channel = ChannelId;
    type HostError = MemoryHostError;

    fn new_string(&mut self, s: &str) -> TclObj {
        TclObj::from_string(s)
    }
    fn new_int(&mut self, n: i64) -> TclObj {
        TclObj::from_string(n.to_string())
    }
    fn new_double(&mut self, d: f64) -> TclObj {
        TclObj::from_string(format!("{}", d))
    }
    fn new_list(&mut self, items: &[TclObj]) -> TclObj {
        TclObj::from_string(list_to_string(items))
    }
    fn dup(&mut self, obj: &TclObj) -> TclObj {
        obj.clone()
    }
    fn get_string(&self, obj: &TclObj) -> String {
        obj.0.as_str().to_string()
    }
    fn as_int(&self, obj: &TclObj) -> Result<i64, MemoryHostError> {
        let s = obj.0.trim();
        if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
            return i64::from_str_radix(hex, 16).map_err(|_| MemoryHostError::NotInt(s.into()));
        }
        s.parse::<i64>().map_err(|_| MemoryHostError::NotInt(s.into()))
    }
    fn as_double(&self, obj: &TclObj) -> Result<f64, MemoryHostError> {
        obj.0.trim().parse::<f64>().map_err(|_| MemoryHostError::NotDouble(obj.0.to_string()))
    }
    fn as_bool(&self, obj: &TclObj) -> Result<bool, MemoryHostError> {
        match obj.0.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => other.parse::<i64>().map(|n| n != 0).map_err(|_| MemoryHostError::NotBool(obj.0.to_string())),
        }
    }
    fn as_list(&self, obj: &TclObj) -> Result<Vec<TclObj>, MemoryHostError> {
        Ok(string_to_list(&obj.0))
    }
    fn list_index(&self, obj: &TclObj, idx: usize) -> Option<TclObj> {
        string_to_list(&obj.0).into_iter().nth(idx)
    }
    fn list_length(&self, obj: &TclObj) -> usize {
        string_to_list(&obj.0).len()
    }
    fn list_append(&mut self, obj: &TclObj, item: TclObj) -> TclObj {
        let mut items = string_to_list(&obj.0);
        items.push(item);
        TclObj::from_string(list_to_string(&items))
    }
    fn list_range(&self, obj: &TclObj, start: usize, end: usize) -> TclObj {
        let items = string_to_list(&obj.0);
        let end = end.min(items.len());
        if start >= end {
            return TclObj::from_string("");
        }
        TclObj::from_string(list_to_string(&items[start..end]))
    }
    fn list_sort(&mut self, obj: &TclObj) -> TclObj {
        let mut items = string_to_list(&obj.0);
        items.sort_by(|a, b| a.0.cmp(&b.0));
        TclObj::from_string(list_to_string(&items))
    }

    fn var_get(&self, frame: &VarHandleId, name: &str) -> Option<TclObj> {
        self.table(frame).scalars.get(name).cloned()
    }
    fn var_set(&mut self, frame: &VarHandleId, name: &str, value: TclObj) {
        self.table_mut(frame).scalars.insert(name.to_string(), value);
    }
    fn var_unset(&mut self, frame: &VarHandleId, name: &str) -> bool {
        self.table_mut(frame).scalars.remove(name).is_some()
            | self.table_mut(frame).arrays.remove(name).is_some()
    }
    fn var_exists(&self, frame: &VarHandleId, name: &str) -> bool {
        let t = self.table(frame);
        t.scalars.contains_key(name) || t.arrays.contains_key(name)
    }
    fn var_names(&self, frame: &VarHandleId) -> Vec<String> {
        let t = self.table(frame);
        t.scalars.keys().chain(t.arrays.keys()).cloned().collect()
    }
    fn array_get(&self, frame: &VarHandleId, name: &str, key: &str) -> Option<TclObj> {
        self.table(frame).arrays.get(name)?.get(key).cloned()
    }
    fn array_set(&mut self, frame: &VarHandleId, name: &str, key: &str, value: TclObj) {
        self.table_mut(frame)
            .arrays
            .entry(name.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }
    fn array_unset(&mut self, frame: &VarHandleId, name: &str, key: &str) -> bool {
        self.table_mut(frame)
            .arrays
            .get_mut(name)
            .map(|m| m.remove(key).is_some())
            .unwrap_or(false)
    }
    fn array_exists(&self, frame: &VarHandleId, name: &str, key: &str) -> bool {
        self.table(frame)
            .arrays
            .get(name)
            .map(|m| m.contains_key(key))
            .unwrap_or(false)
    }
    fn array_names(&self, frame: &VarHandleId, name: &str) -> Vec<String> {
        self.table(frame)
            .arrays
            .get(name)
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn new_var_handle(&mut self) -> VarHandleId {
        let id = self.next_handle;
        self.next_handle += 1;
        self.vars.insert(id, VarTable::default());
        VarHandleId(id)
    }
    fn free_var_handle(&mut self, handle: VarHandleId) {
        self.vars.remove(&handle.0);
    }

    fn cmd_lookup(&self, name: &str) -> CommandLookup {
        if let Some(def) = self.procs.get(name) {
            CommandLookup::Proc(def.clone())
        } else if self.extensions.contains_key(name) {
            CommandLookup::Extension
        } else {
            CommandLookup::NotFound
        }
    }
    fn cmd_list(&self) -> Vec<String> {
        self.procs.keys().chain(self.extensions.keys()).cloned().collect()
    }
    fn proc_register(&mut self, name: &str, def: ProcDef) {
        self.procs.insert(name.to_string(), def);
    }
    fn proc_get_def(&self, name: &str) -> Option<ProcDef> {
        self.procs.get(name).cloned()
    }
    fn ext_invoke(&mut self, name: &str, argv: &[TclObj]) -> Result<TclObj, MemoryHostError> {
        let f = *self
            .extensions
            .get(name)
            .ok_or_else(|| MemoryHostError::NoSuchExtension(name.to_string()))?;
        Ok(f(argv))
    }

    fn chan_stdout(&self) -> ChannelId {
        ChannelId::Stdout
    }
    fn chan_stderr(&self) -> ChannelId {
        ChannelId::Stderr
    }
    fn chan_stdin(&self) -> ChannelId {
        ChannelId::Stdin
    }
    fn chan_write(&mut self, chan: &ChannelId, data: &str) -> Result<(), MemoryHostError> {
        match chan {
            ChannelId::Stdout => self.stdout.push_str(data),
            ChannelId::Stderr => self.stderr.push_str(data),
            ChannelId::Stdin => {}
        }
        Ok(())
    }
    fn chan_flush(&mut self, _chan: &ChannelId) -> Result<(), MemoryHostError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn var_get_after_set_round_trips() {
        let mut host = MemoryHost::new();
        let h = host.new_var_handle();
        let v = host.new_string("hello");
        host.var_set(&h, "x", v.clone());
        assert_eq!(host.var_get(&h, "x"), Some(v));
    }

    #[test]
    fn list_append_grows_length_by_one() {
        let mut host = MemoryHost::new();
        let list = host.new_list(&[host.new_string("a"), host.new_string("b")]);
        assert_eq!(host.list_length(&list), 2);
        let grown = host.list_append(&list, host.new_string("c"));
        assert_eq!(host.list_length(&grown), 3);
        assert_eq!(host.get_string(&host.list_index(&grown, 2).unwrap()), "c");
    }

    #[test]
    fn list_round_trips_elements_with_spaces() {
        let mut host = MemoryHost::new();
        let list = host.new_list(&[host.new_string("hello world"), host.new_string("plain")]);
        assert_eq!(host.list_length(&list), 2);
        assert_eq!(host.get_string(&host.list_index(&list, 0).unwrap()), "hello world");
    }
}
