//! Classification of raw text tokens into the most specific [`Value`].
//!
//! Candidates are tried in order of increasing lenience: integer, float,
//! optionally a percentage, and finally text. A token wrapped in one matching
//! pair of quotes is always text, which is how `"007"` stays a string; an
//! unquoted `007` becomes the integer 7.

use crate::value::Value;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InferOptions {
    /// Read `34.4%` as the float `0.344`.
    pub percent: bool,
}

pub fn besttype(token: &str) -> Value {
    besttype_with(token, InferOptions::default())
}

pub fn besttype_with(token: &str, options: InferOptions) -> Value {
    let x = token.trim();
    if let Some(inner) = unquote(x) {
        return Value::Text(inner.to_owned());
    }
    // i64 overflow falls through to f64
    if let Ok(i) = x.parse::<i64>() {
        return Value::Integer(i);
    }
    if let Ok(f) = x.parse::<f64>() {
        return Value::Float(f);
    }
    if options.percent {
        if let Some(f) = percentage(x) {
            return Value::Float(f);
        }
    }
    Value::Text(x.to_owned())
}

fn unquote(x: &str) -> Option<&str> {
    let bytes = x.as_bytes();
    if bytes.len() < 2 {
        return None;
    }
    let quote = bytes[0];
    if (quote == b'"' || quote == b'\'') && bytes[bytes.len() - 1] == quote {
        Some(&x[1..x.len() - 1])
    } else {
        None
    }
}

fn percentage(x: &str) -> Option<f64> {
    let number = x.strip_suffix('%')?.trim_end();
    number.parse::<f64>().ok().map(|f| f / 100.0)
}
