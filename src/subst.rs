//! Substitution engine (spec.md §4.3): turns a `WordNode` into a Host
//! value, honoring the three independent BACKSLASH/VARIABLES/COMMANDS
//! flags used by the `subst` command, and always-on for ordinary
//! command-word evaluation.

use std::rc::Rc;

use crate::ast::{ScriptNode, WordNode};
use crate::errors::{messages, EvalError, SubstError};
use crate::host::Host;
use crate::interp::Interpreter;
use crate::parser;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubstFlags {
    pub backslash: bool,
    pub variables: bool,
    pub commands: bool,
}

impl SubstFlags {
    pub const ALL: SubstFlags = SubstFlags { backslash: true, variables: true, commands: true };
}

/// A word's evaluated form: `Expand` words splice a list into the
/// parent command's argv rather than contributing a single value
/// (spec.md §9 Open Questions: this crate performs the splice the
/// reference implementation was supposed to but never did).
pub enum WordResult<O> {
    Single(O),
    Spliced(Vec<O>),
}

pub fn eval_word<H: Host>(
    interp: &mut Interpreter<H>,
    word: &WordNode,
) -> Result<WordResult<H::Obj>, EvalError> {
    match word {
        WordNode::Expand { inner, .. } => {
            let obj = eval_word_part(interp, inner, SubstFlags::ALL)?;
            let items = interp
                .host
                .as_list(&obj)
                .map_err(|e| EvalError::Subst(SubstError::Eval(e.to_string())))?;
            Ok(WordResult::Spliced(items))
        }
        other => Ok(WordResult::Single(eval_word_part(interp, other, SubstFlags::ALL)?)),
    }
}

/// Evaluates a non-`Expand` word node into a single value, honoring
/// `flags` (spec.md §4.3). `Composite` parts are concatenated as
/// strings; a lone part is returned as-is, preserving its native type
/// (e.g. a variable holding a list stays a list, unconcatenated).
fn eval_word_part<H: Host>(
    interp: &mut Interpreter<H>,
    word: &WordNode,
    flags: SubstFlags,
) -> Result<H::Obj, EvalError> {
    match word {
        WordNode::Literal { text, .. } => Ok(interp.host.new_string(text)),
        WordNode::Backslash { value, .. } => {
            if flags.backslash {
                Ok(interp.host.new_string(value))
            } else {
                Ok(interp.host.new_string(&format!("\\{}", value)))
            }
        }
        WordNode::SimpleVar { name, .. } => {
            if !flags.variables {
                return Ok(interp.host.new_string(&format!("${}", name)));
            }
            interp
                .read_scalar(name)
                .ok_or_else(|| EvalError::Subst(SubstError::Eval(messages::no_such_variable(name))))
        }
        WordNode::ArrayVar { name, index, .. } => {
            if !flags.variables {
                return Ok(interp.host.new_string(&format!("${}(...)", name)));
            }
            let idx_obj = eval_word_part(interp, index, flags)?;
            let idx_str = interp.host.get_string(&idx_obj);
            interp.read_array(name, &idx_str).ok_or_else(|| {
                EvalError::Subst(SubstError::Eval(messages::no_such_variable(&format!(
                    "{}({})",
                    name, idx_str
                ))))
            })
        }
        WordNode::CmdSubst { script, .. } => {
            if !flags.commands {
                return Ok(interp.host.new_string("[...]"));
            }
            eval_cmdsubst(interp, script)
        }
        WordNode::Composite { parts, .. } => {
            let mut out = String::new();
            for part in parts {
                let v = eval_word_part(interp, part, flags)?;
                out.push_str(&interp.host.get_string(&v));
            }
            Ok(interp.host.new_string(&out))
        }
        WordNode::Expand { .. } => unreachable!("Expand is only valid at command-word position"),
    }
}

fn eval_cmdsubst<H: Host>(interp: &mut Interpreter<H>, script: &Rc<ScriptNode>) -> Result<H::Obj, EvalError> {
    interp.eval_script_ast(script)
}

/// Implements the `subst` command: re-decodes `text` as a composite
/// word and evaluates it under the given flags.
pub fn subst_string<H: Host>(
    interp: &mut Interpreter<H>,
    text: &str,
    flags: SubstFlags,
) -> Result<String, EvalError> {
    let word = parser::parse_composite(text, 0).map_err(EvalError::Parse)?;
    let obj = eval_word_part(interp, &word, flags)?;
    Ok(interp.host.get_string(&obj))
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
    fn literal_word_passes_through() {
        let mut ip = interp();
        let w = WordNode::Literal { text: Rc::from("abc"), line: 1 };
        match eval_word(&mut ip, &w).unwrap() {
            WordResult::Single(obj) => assert_eq!(ip.host.get_string(&obj), "abc"),
            _ => panic!("expected Single"),
        }
    }

    #[test]
    fn missing_variable_is_an_error() {
        let mut ip = interp();
        let w = WordNode::SimpleVar { name: Rc::from("nope"), line: 1 };
        let err = eval_word(&mut ip, &w).unwrap_err();
        assert!(err.to_string().contains("no such variable"));
    }

    #[test]
    fn subst_with_variables_disabled_is_literal() {
        let mut ip = interp();
        let flags = SubstFlags { backslash: true, variables: false, commands: true };
        let out = subst_string(&mut ip, "$x", flags).unwrap();
        assert_eq!(out, "$x");
    }
}
