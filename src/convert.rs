// used for the sentinel mapping
use core::hash::BuildHasherDefault;
use seahash::SeaHasher;
use std::collections::HashMap;

use serde::Deserialize;

use crate::infer::{besttype_with, InferOptions};
use crate::value::Value;

pub type MappingHasher = BuildHasherDefault<SeaHasher>;

/// Sentinel tokens and the values they stand for. Keys are compared against
/// the text produced by type inference, so quoting does not hide a token.
pub type Mapping = HashMap<String, Value, MappingHasher>;

pub fn default_mapping() -> Mapping {
    let mut mapping = Mapping::default();
    for token in ["---", "none", "None", ""] {
        mapping.insert(token.to_owned(), Value::Null);
    }
    for token in ["True", "x", "X", "yes"] {
        mapping.insert(token.to_owned(), Value::Bool(true));
    }
    for token in ["False", "-", "no"] {
        mapping.insert(token.to_owned(), Value::Bool(false));
    }
    mapping
}

/// Which transforms a [`Converter`] applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Conversion switched off: the raw field comes back untouched.
    Off,
    /// Type inference only.
    Simple,
    /// Type inference followed by the sentinel mapping.
    Singlet,
    /// Decomposition on the separator, then inference and mapping per piece.
    Fancy,
    /// Everything is text.
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Separator {
    None,
    /// Runs of any whitespace; empty pieces are dropped.
    Whitespace,
    /// A literal separator; empty pieces are kept.
    Literal(String),
}

impl Separator {
    /// `"whitespace"` selects [`Separator::Whitespace`].
    pub fn parse(s: &str) -> Separator {
        match s {
            "" => Separator::None,
            "whitespace" => Separator::Whitespace,
            other => Separator::Literal(other.to_owned()),
        }
    }
}

/// Converts raw field text into values. Never fails; anything that is not
/// recognized comes back as text.
#[derive(Debug, Clone)]
pub struct Converter {
    pub mode: Mode,
    pub mapping: Mapping,
    pub separator: Separator,
    pub infer: InferOptions,
}

impl Converter {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            mapping: default_mapping(),
            separator: Separator::None,
            infer: InferOptions::default(),
        }
    }
    pub fn with_separator(mut self, separator: Separator) -> Self {
        self.separator = separator;
        self
    }
    pub fn with_mapping(mut self, mapping: Mapping) -> Self {
        self.mapping = mapping;
        self
    }
    pub fn with_percent(mut self, percent: bool) -> Self {
        self.infer.percent = percent;
        self
    }
    pub fn convert(&self, raw: &str) -> Value {
        match self.mode {
            Mode::Off | Mode::Text => Value::Text(raw.to_owned()),
            Mode::Simple => besttype_with(raw, self.infer),
            Mode::Singlet => self.singlet(raw),
            Mode::Fancy => self.fancy(raw),
        }
    }
    fn singlet(&self, raw: &str) -> Value {
        let x = besttype_with(raw, self.infer);
        let mapped = match &x {
            Value::Text(t) => self.mapping.get(t).cloned(),
            _ => None,
        };
        mapped.unwrap_or(x)
    }
    fn fancy(&self, raw: &str) -> Value {
        let pieces: Vec<&str> = match &self.separator {
            Separator::None => return self.singlet(raw),
            Separator::Literal(s) if s.is_empty() => return self.singlet(raw),
            Separator::Whitespace => raw.split_whitespace().collect(),
            Separator::Literal(s) => raw.split(s.as_str()).collect(),
        };
        match pieces.len() {
            0 => Value::Text(String::new()),
            1 => self.singlet(pieces[0]),
            _ => Value::Sequence(pieces.into_iter().map(|p| self.singlet(p)).collect()),
        }
    }
}

impl Default for Converter {
    fn default() -> Self {
        Converter::new(Mode::Simple)
    }
}
