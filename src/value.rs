//! Tagged numeric/string value used by the expression evaluator
//! (spec.md §4.7). Distinct from `Host::Obj`: the expression evaluator
//! needs to know whether a value is already a parsed int/double so it
//! can apply Tcl's numeric coercion and promotion rules without
//! re-parsing strings at every operator application.

use crate::errors::ExprError;

#[derive(Debug, Clone, PartialEq)]
pub enum ExprValue {
    Int(i64),
    Double(f64),
    Str(String),
}

impl ExprValue {
    pub fn from_str_coerced(s: &str) -> Self {
        let trimmed = s.trim();
        if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
            if let Ok(n) = i64::from_str_radix(hex, 16) {
                return ExprValue::Int(n);
            }
        }
        if let Ok(n) = trimmed.parse::<i64>() {
            return ExprValue::Int(n);
        }
        if let Ok(d) = trimmed.parse::<f64>() {
            return ExprValue::Double(d);
        }
        ExprValue::Str(s.to_string())
    }

    pub fn display(&self) -> String {
        match self {
            ExprValue::Int(n) => n.to_string(),
            ExprValue::Double(d) => format_double(*d),
            ExprValue::Str(s) => s.clone(),
        }
    }

    /// Tcl truthiness: nonzero numbers are true; `true`/`yes`/`on` /
    /// `false`/`no`/`off` are recognized string forms; anything else
    /// that isn't numeric is an error.
    pub fn truthy(&self, context: &str) -> Result<bool, ExprError> {
        match self {
            ExprValue::Int(n) => Ok(*n != 0),
            ExprValue::Double(d) => Ok(*d != 0.0),
            ExprValue::Str(s) => match s.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                other => other
                    .parse::<f64>()
                    .map(|d| d != 0.0)
                    .map_err(|_| ExprError::NonNumericOperand(s.clone(), "operand of", context.to_string())),
            },
        }
    }

    pub fn as_f64(&self, context: &str) -> Result<f64, ExprError> {
        match self {
            ExprValue::Int(n) => Ok(*n as f64),
            ExprValue::Double(d) => Ok(*d),
            ExprValue::Str(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| ExprError::NonNumericOperand(s.clone(), "operand of", context.to_string())),
        }
    }

    pub fn as_i64(&self, context: &str) -> Result<i64, ExprError> {
        match self {
            ExprValue::Int(n) => Ok(*n),
            ExprValue::Double(d) => Err(ExprError::FloatOperand(format_double(*d), "operand of", context.to_string())),
            ExprValue::Str(s) => match ExprValue::from_str_coerced(s) {
                ExprValue::Int(n) => Ok(n),
                ExprValue::Double(d) => Err(ExprError::FloatOperand(format_double(d), "operand of", context.to_string())),
                ExprValue::Str(_) => Err(ExprError::NonNumericOperand(s.clone(), "operand of", context.to_string())),
            },
        }
    }

    pub fn is_numeric(&self) -> bool {
        match self {
            ExprValue::Int(_) | ExprValue::Double(_) => true,
            ExprValue::Str(s) => !matches!(ExprValue::from_str_coerced(s), ExprValue::Str(_)),
        }
    }
}

/// Tcl formats doubles without a trailing `.0` only when the value has
/// no fractional part represented in the %.17g-ish default... this
/// crate uses a simpler, good-enough rule: integral doubles print with
/// one decimal place, matching the common case in test scripts.
fn format_double(d: f64) -> String {
    if d.fract() == 0.0 && d.is_finite() {
        format!("{:.1}", d)
    } else {
        format!("{}", d)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerces_decimal_and_hex_and_float() {
        assert_eq!(ExprValue::from_str_coerced("42"), ExprValue::Int(42));
        assert_eq!(ExprValue::from_str_coerced("0x2A"), ExprValue::Int(42));
        assert_eq!(ExprValue::from_str_coerced("3.5"), ExprValue::Double(3.5));
        assert_eq!(ExprValue::from_str_coerced("abc"), ExprValue::Str("abc".to_string()));
    }

    #[test]
    fn truthy_recognizes_word_forms() {
        assert!(ExprValue::Str("yes".to_string()).truthy("if").unwrap());
        assert!(!ExprValue::Str("off".to_string()).truthy("if").unwrap());
        assert!(ExprValue::Int(7).truthy("if").unwrap());
    }
}
