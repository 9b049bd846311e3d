//! SQL functions registered on every connection a [`crate::store::Store`] opens.
//!
//! Scalars: `sqrt(x)`, `sqr(x)`, `pow(x, y)`, `periodic(angle)` (degrees
//! wrapped into `[-180, 180)`), `fformat(format, x)` (printf style, see
//! [`fformat`]), `regexp(pattern, text)` (which also backs the
//! `text REGEXP pattern` operator) and `match(pattern, text)` (anchored at the
//! start of `text`).
//! Aggregates: `std(x)` (sample standard deviation), `stdN(x)` (population
//! standard deviation), `median(x)` and `array(x)`, which collects its inputs
//! into JSON array text; alias it as `"name [Array]"` to get a sequence back.
//! NULL inputs are ignored by the numeric aggregates and propagate through the
//! scalars.

use std::sync::Arc;

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use rusqlite::functions::{Aggregate, Context, FunctionFlags};
use rusqlite::{Connection, Result};

use crate::value::Value;

lazy_static! {
    static ref CONVERSION: Regex =
        Regex::new(r"%(-)?(0)?(\d+)?(?:\.(\d+))?([dfeEs%])").unwrap();
}

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub fn register(connection: &Connection) -> Result<()> {
    let flags = FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC;
    connection.create_scalar_function("sqrt", 1, flags, |ctx| {
        let x: Option<f64> = ctx.get(0)?;
        Ok(x.filter(|x| *x >= 0.0).map(f64::sqrt))
    })?;
    connection.create_scalar_function("sqr", 1, flags, |ctx| {
        let x: Option<f64> = ctx.get(0)?;
        Ok(x.map(|x| x * x))
    })?;
    connection.create_scalar_function("pow", 2, flags, |ctx| {
        let x: Option<f64> = ctx.get(0)?;
        let y: Option<f64> = ctx.get(1)?;
        Ok(x.zip(y).map(|(x, y)| x.powf(y)))
    })?;
    connection.create_scalar_function("periodic", 1, flags, |ctx| {
        let x: Option<f64> = ctx.get(0)?;
        Ok(x.map(periodic))
    })?;
    connection.create_scalar_function("fformat", 2, flags, |ctx| {
        let format: Option<String> = ctx.get(0)?;
        let x: Value = ctx.get(1)?;
        Ok(format.map(|f| fformat(&f, &x)))
    })?;
    connection.create_scalar_function("regexp", 2, flags, |ctx| {
        let pattern = pattern(ctx, false)?;
        let text: Option<String> = ctx.get(1)?;
        Ok(text.map(|t| pattern.is_match(&t)))
    })?;
    connection.create_scalar_function("match", 2, flags, |ctx| {
        let pattern = pattern(ctx, true)?;
        let text: Option<String> = ctx.get(1)?;
        Ok(text.map(|t| pattern.is_match(&t)))
    })?;
    connection.create_aggregate_function("std", 1, flags, Stdev { population: false })?;
    connection.create_aggregate_function("stdN", 1, flags, Stdev { population: true })?;
    connection.create_aggregate_function("median", 1, flags, Median)?;
    connection.create_aggregate_function("array", 1, flags, Collect)?;
    Ok(())
}

pub fn periodic(angle: f64) -> f64 {
    (angle + 180.0).rem_euclid(360.0) - 180.0
}

/// Formats `x` with every `%d`, `%f`, `%e`, `%E` or `%s` conversion in
/// `format`, honouring `-` (left align), `0` (zero pad), width and precision.
/// `%%` is a literal percent sign. A NULL `x` renders as an empty string.
///
/// ```
/// use recsql::functions::fformat;
/// use recsql::Value;
/// assert_eq!(fformat("%6.2f", &Value::Float(3.14159)), "  3.14");
/// assert_eq!(fformat("%03d%%", &Value::Integer(7)), "007%");
/// ```
pub fn fformat(format: &str, x: &Value) -> String {
    CONVERSION
        .replace_all(format, |caps: &Captures<'_>| {
            let precision = caps.get(4).and_then(|p| p.as_str().parse::<usize>().ok());
            let body = match &caps[5] {
                "%" => return "%".to_owned(),
                _ if x.is_null() => String::new(),
                "d" => match x {
                    Value::Float(f) => format!("{}", f.trunc() as i64),
                    other => other.as_i64().map(|i| i.to_string()).unwrap_or_else(|| other.to_string()),
                },
                "f" => match x.as_f64() {
                    Some(f) => format!("{:.*}", precision.unwrap_or(6), f),
                    None => x.to_string(),
                },
                conversion @ ("e" | "E") => match x.as_f64() {
                    Some(f) => {
                        let e = exponent(f, precision.unwrap_or(6));
                        if conversion == "E" { e.to_uppercase() } else { e }
                    }
                    None => x.to_string(),
                },
                _ => {
                    let text = x.to_string();
                    match precision {
                        Some(p) => text.chars().take(p).collect(),
                        None => text,
                    }
                }
            };
            let width = caps.get(3).and_then(|w| w.as_str().parse::<usize>().ok()).unwrap_or(0);
            if caps.get(1).is_some() {
                format!("{:<width$}", body)
            } else if caps.get(2).is_some() && &caps[5] != "s" {
                match body.strip_prefix('-') {
                    Some(digits) => format!("-{:0>w$}", digits, w = width.saturating_sub(1)),
                    None => format!("{:0>width$}", body),
                }
            } else {
                format!("{:>width$}", body)
            }
        })
        .into_owned()
}

// C style exponent with a sign and at least two digits
fn exponent(f: f64, precision: usize) -> String {
    let rendered = format!("{:.*e}", precision, f);
    match rendered.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exp),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => rendered,
    }
}

// compiled once per statement and kept as auxiliary data of the pattern argument
fn pattern(ctx: &Context<'_>, anchored: bool) -> Result<Arc<Regex>> {
    ctx.get_or_create_aux(0, |vr| -> std::result::Result<_, BoxError> {
        let source = vr.as_str()?;
        let regex = if anchored {
            Regex::new(&format!("^(?:{})", source))?
        } else {
            Regex::new(source)?
        };
        Ok(regex)
    })
}

fn push_value(ctx: &mut Context<'_>, acc: &mut Vec<f64>) -> Result<()> {
    if let Some(x) = ctx.get::<Option<f64>>(0)? {
        acc.push(x);
    }
    Ok(())
}

struct Stdev {
    population: bool,
}

impl Aggregate<Vec<f64>, Option<f64>> for Stdev {
    fn init(&self, _: &mut Context<'_>) -> Result<Vec<f64>> {
        Ok(Vec::new())
    }
    fn step(&self, ctx: &mut Context<'_>, acc: &mut Vec<f64>) -> Result<()> {
        push_value(ctx, acc)
    }
    fn finalize(&self, _: &mut Context<'_>, acc: Option<Vec<f64>>) -> Result<Option<f64>> {
        let values = acc.unwrap_or_default();
        let n = values.len();
        let dof = if self.population { n } else { n.saturating_sub(1) };
        if dof == 0 {
            return Ok(None);
        }
        let mean = values.iter().sum::<f64>() / n as f64;
        let squares: f64 = values.iter().map(|x| (x - mean) * (x - mean)).sum();
        Ok(Some((squares / dof as f64).sqrt()))
    }
}

struct Median;

impl Aggregate<Vec<f64>, Option<f64>> for Median {
    fn init(&self, _: &mut Context<'_>) -> Result<Vec<f64>> {
        Ok(Vec::new())
    }
    fn step(&self, ctx: &mut Context<'_>, acc: &mut Vec<f64>) -> Result<()> {
        push_value(ctx, acc)
    }
    fn finalize(&self, _: &mut Context<'_>, acc: Option<Vec<f64>>) -> Result<Option<f64>> {
        let mut values = acc.unwrap_or_default();
        if values.is_empty() {
            return Ok(None);
        }
        values.sort_by(f64::total_cmp);
        let mid = values.len() / 2;
        let median = if values.len() % 2 == 0 {
            (values[mid - 1] + values[mid]) / 2.0
        } else {
            values[mid]
        };
        Ok(Some(median))
    }
}

struct Collect;

impl Aggregate<Vec<Value>, String> for Collect {
    fn init(&self, _: &mut Context<'_>) -> Result<Vec<Value>> {
        Ok(Vec::new())
    }
    fn step(&self, ctx: &mut Context<'_>, acc: &mut Vec<Value>) -> Result<()> {
        acc.push(ctx.get::<Value>(0)?);
        Ok(())
    }
    fn finalize(&self, _: &mut Context<'_>, acc: Option<Vec<Value>>) -> Result<String> {
        Ok(Value::Sequence(acc.unwrap_or_default()).to_json().to_string())
    }
}
