//! Script → AST parser (spec.md §4.2).
//!
//! Grounded on the teacher's `src/parser.rs` driving loop shape, applied
//! to Tcl's two-nested-loop grammar: an outer loop over commands
//! (skipping blank lines, whitespace, and `#` comments at command
//! position) and an inner loop over words, each of which is decoded
//! according to its lexer-reported kind and then, for `Quotes`/`Bare`
//! words, re-scanned character-by-character for embedded substitutions.

use std::rc::Rc;

use crate::ast::{CommandNode, ScriptNode, WordNode};
use crate::errors::ParseError;
use crate::escape;
use crate::lexer::{Lexer, WordKind};

pub fn parse_script(src: &str) -> Result<Rc<ScriptNode>, ParseError> {
    let mut lex = Lexer::new(src);
    parse_script_body(&mut lex)
}

/// Parses commands until EOF. Used both for top-level scripts and for
/// the interior of a `[...]` command substitution (which calls this on
/// a fresh `Lexer` over the inner text).
fn parse_script_body(lex: &mut Lexer) -> Result<Rc<ScriptNode>, ParseError> {
    let mut commands = Vec::new();
    loop {
        skip_command_separators_and_comments(lex);
        if lex.at_eof() {
            break;
        }
        let line = lex.line();
        let mut words = Vec::new();
        loop {
            lex.skip_inter_word_whitespace();
            if lex.take_terminator().is_some() || lex.at_eof() {
                break;
            }
            let raw = lex.next_word().map_err(ParseError::from)?;
            words.push(parse_word(&raw)?);
        }
        if !words.is_empty() {
            commands.push(Rc::new(CommandNode { words, line }));
        }
    }
    Ok(ScriptNode::new(commands))
}

fn skip_command_separators_and_comments(lex: &mut Lexer) {
    loop {
        lex.skip_inter_word_whitespace();
        if lex.at_eof() {
            return;
        }
        if lex.take_terminator().is_some() {
            continue;
        }
        if lex.peek_char() == Some('#') {
            lex.skip_comment();
            continue;
        }
        break;
    }
}

fn parse_word(raw: &crate::lexer::RawWord) -> Result<Rc<WordNode>, ParseError> {
    match raw.kind {
        WordKind::Braces => Ok(Rc::new(WordNode::Literal {
            text: Rc::from(raw.text.as_str()),
            line: raw.line,
        })),
        WordKind::Quotes => parse_composite(&raw.text, raw.line),
        WordKind::Bare => {
            if let Some(rest) = raw.text.strip_prefix("{*}") {
                let inner = parse_composite(rest, raw.line)?;
                Ok(Rc::new(WordNode::Expand { inner, line: raw.line }))
            } else {
                parse_composite(&raw.text, raw.line)
            }
        }
    }
}

/// Scans raw word text character by character, producing interleaved
/// `Literal`/`Backslash`/`SimpleVar`/`ArrayVar`/`CmdSubst` parts
/// (spec.md §4.2). Collapses to a single `Literal` when there is
/// exactly one part, and to an empty `Literal` when there are none.
pub(crate) fn parse_composite(text: &str, line: u32) -> Result<Rc<WordNode>, ParseError> {
    let chars: Vec<char> = text.chars().collect();
    let mut parts: Vec<Rc<WordNode>> = Vec::new();
    let mut literal = String::new();
    let mut i = 0usize;

    macro_rules! flush_literal {
        () => {
            if !literal.is_empty() {
                parts.push(Rc::new(WordNode::Literal { text: Rc::from(literal.as_str()), line }));
                literal.clear();
            }
        };
    }

    while i < chars.len() {
        match chars[i] {
            '$' => {
                if let Some((node, next)) = parse_dollar(&chars, i, line)? {
                    flush_literal!();
                    parts.push(node);
                    i = next;
                } else {
                    literal.push('$');
                    i += 1;
                }
            }
            '[' => {
                let (node, next) = parse_cmdsubst(&chars, i, line)?;
                flush_literal!();
                parts.push(node);
                i = next;
            }
            '\\' => {
                let (value, next) = escape::resolve(&chars, i);
                flush_literal!();
                parts.push(Rc::new(WordNode::Backslash { value: Rc::from(value.as_str()), line }));
                i = next;
            }
            c => {
                literal.push(c);
                i += 1;
            }
        }
    }
    flush_literal!();

    Ok(match parts.len() {
        0 => Rc::new(WordNode::Literal { text: Rc::from(""), line }),
        1 => parts.into_iter().next().unwrap(),
        _ => Rc::new(WordNode::Composite { parts, line }),
    })
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Parses `${name}` or `$name` or `$name(index)`. Returns `None` (the
/// `$` should be treated as a literal) when not followed by a name
/// character or `{`.
fn parse_dollar(
    chars: &[char],
    i: usize,
    line: u32,
) -> Result<Option<(Rc<WordNode>, usize)>, ParseError> {
    if chars.get(i + 1) == Some(&'{') {
        let start = i + 2;
        let mut j = start;
        while chars.get(j).is_some_and(|&c| c != '}') {
            j += 1;
        }
        if chars.get(j) != Some(&'}') {
            return Err(ParseError::MissingCloseBracket);
        }
        let name: String = chars[start..j].iter().collect();
        return Ok(Some((
            Rc::new(WordNode::SimpleVar { name: Rc::from(name.as_str()), line }),
            j + 1,
        )));
    }
    if !chars.get(i + 1).is_some_and(|&c| is_name_char(c)) {
        return Ok(None);
    }
    let start = i + 1;
    let mut j = start;
    while chars.get(j).is_some_and(|&c| is_name_char(c)) {
        j += 1;
    }
    let name: String = chars[start..j].iter().collect();
    if chars.get(j) == Some(&'(') {
        let idx_start = j + 1;
        let mut depth = 1usize;
        let mut k = idx_start;
        while k < chars.len() && depth > 0 {
            match chars[k] {
                '(' => depth += 1,
                ')' => depth -= 1,
                _ => {}
            }
            if depth > 0 {
                k += 1;
            }
        }
        if depth != 0 {
            return Err(ParseError::MissingCloseParen);
        }
        let index_text: String = chars[idx_start..k].iter().collect();
        let index = parse_composite(&index_text, line)?;
        return Ok(Some((
            Rc::new(WordNode::ArrayVar { name: Rc::from(name.as_str()), index, line }),
            k + 1,
        )));
    }
    Ok(Some((
        Rc::new(WordNode::SimpleVar { name: Rc::from(name.as_str()), line }),
        j,
    )))
}

/// Parses `[...]`, respecting balanced `{...}`/`"..."` inside, and
/// recursively parses the interior as a nested script.
fn parse_cmdsubst(chars: &[char], i: usize, line: u32) -> Result<(Rc<WordNode>, usize), ParseError> {
    let mut depth = 1usize;
    let mut j = i + 1;
    let start = j;
    while j < chars.len() && depth > 0 {
        match chars[j] {
            '[' => {
                depth += 1;
                j += 1;
            }
            ']' => {
                depth -= 1;
                j += 1;
            }
            '{' => {
                let mut bdepth = 1usize;
                j += 1;
                while j < chars.len() && bdepth > 0 {
                    match chars[j] {
                        '{' => bdepth += 1,
                        '}' => bdepth -= 1,
                        _ => {}
                    }
                    j += 1;
                }
            }
            '"' => {
                j += 1;
                while j < chars.len() && chars[j] != '"' {
                    if chars[j] == '\\' {
                        j += 1;
                    }
                    j += 1;
                }
                j += 1;
            }
            _ => j += 1,
        }
    }
    if depth != 0 {
        return Err(ParseError::MissingCloseBracket);
    }
    let inner_text: String = chars[start..j - 1].iter().collect();
    let mut inner_lex = Lexer::new(&inner_text);
    let script = parse_script_body(&mut inner_lex)?;
    Ok((Rc::new(WordNode::CmdSubst { script, line }), j))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::WordNode;

    fn first_word(src: &str) -> Rc<WordNode> {
        let script = parse_script(src).unwrap();
        script.commands[0].words[1].clone()
    }

    #[test]
    fn braced_literal_has_no_substitution() {
        let script = parse_script("set x {a$b[c]}").unwrap();
        match &*script.commands[0].words[2] {
            WordNode::Literal { text, .. } => assert_eq!(&**text, "a$b[c]"),
            other => panic!("expected literal, got {:?}", other),
        }
    }

    #[test]
    fn simple_variable() {
        match &*first_word("set $x") {
            WordNode::SimpleVar { name, .. } => assert_eq!(&**name, "x"),
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn braced_variable_name() {
        match &*first_word("set ${x y}") {
            WordNode::SimpleVar { name, .. } => assert_eq!(&**name, "x y"),
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn array_variable_with_index() {
        match &*first_word("set $a(1)") {
            WordNode::ArrayVar { name, index, .. } => {
                assert_eq!(&**name, "a");
                match &**index {
                    WordNode::Literal { text, .. } => assert_eq!(&**text, "1"),
                    other => panic!("{:?}", other),
                }
            }
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn command_substitution_nests_scripts() {
        match &*first_word("set [expr 1+1]") {
            WordNode::CmdSubst { script, .. } => {
                assert_eq!(script.commands.len(), 1);
                assert_eq!(script.commands[0].words.len(), 2);
            }
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn expand_wraps_inner_word() {
        let script = parse_script("foo {*}$args").unwrap();
        match &*script.commands[0].words[1] {
            WordNode::Expand { inner, .. } => match &**inner {
                WordNode::SimpleVar { name, .. } => assert_eq!(&**name, "args"),
                other => panic!("{:?}", other),
            },
            other => panic!("{:?}", other),
        }
    }

    #[test]
    fn empty_commands_are_dropped() {
        let script = parse_script(";;;\n\n  \n").unwrap();
        assert!(script.commands.is_empty());
    }

    #[test]
    fn comment_at_command_position_is_skipped() {
        let script = parse_script("# a comment\nset x 1").unwrap();
        assert_eq!(script.commands.len(), 1);
    }

    #[test]
    fn missing_close_brace_is_a_parse_error() {
        assert!(parse_script("set x {abc").is_err());
    }
}
