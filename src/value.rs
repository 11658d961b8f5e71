//! Typed values produced by `load` and consumed by `represent`.
use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value as Json;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Decimal(Decimal),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Enum(EnumValue),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    /// Typed keys; insertion order is the input order.
    Map(Vec<(Value, Value)>),
    /// `Any` and untyped `dict` pass input through untouched.
    Raw(Json),
    Record(Instance),
}

/// A member of an enum together with its backing literal.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumValue {
    pub enum_name: String,
    pub member: String,
    pub literal: EnumLiteral,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum EnumLiteral {
    Int(i64),
    Str(String),
}

/// One loaded record: its name and the fields that were set, in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct Instance {
    pub record: String,
    pub fields: IndexMap<String, Value>,
}

/// Exact decimal kept in its textual form.
#[derive(Debug, Clone)]
pub struct Decimal(String);

// ------------------------------- Decimal --------------------------------- //

static DECIMAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[+-]?(\d+\.?\d*|\.\d+)([eE][+-]?\d+)?$").expect("decimal pattern")
});

impl Decimal {
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        DECIMAL_RE.is_match(text).then(|| Decimal(text.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_f64(&self) -> f64 {
        self.0.parse().unwrap_or(f64::NAN)
    }

    /// Canonical spelling without exponent: no sign noise, no redundant zeros.
    fn canonical(&self) -> Option<String> {
        if self.0.contains(['e', 'E']) {
            return None;
        }
        let (negative, digits) = match self.0.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, self.0.trim_start_matches('+')),
        };
        let (int, frac) = digits.split_once('.').unwrap_or((digits, ""));
        let int = int.trim_start_matches('0');
        let frac = frac.trim_end_matches('0');
        let int = if int.is_empty() { "0" } else { int };
        let body = if frac.is_empty() { int.to_string() } else { format!("{int}.{frac}") };
        if negative && body != "0" { Some(format!("-{body}")) } else { Some(body) }
    }
}

impl PartialEq for Decimal {
    fn eq(&self, other: &Self) -> bool {
        match (self.canonical(), other.canonical()) {
            (Some(a), Some(b)) => a == b,
            _ => self.to_f64() == other.to_f64(),
        }
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ------------------------------- Enums ----------------------------------- //

impl EnumLiteral {
    pub fn to_json(&self) -> Json {
        match self {
            EnumLiteral::Int(i) => Json::from(*i),
            EnumLiteral::Str(s) => Json::from(s.as_str()),
        }
    }
    pub fn is_str(&self) -> bool {
        matches!(self, EnumLiteral::Str(_))
    }
}

impl fmt::Display for EnumLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnumLiteral::Int(i) => write!(f, "{i}"),
            EnumLiteral::Str(s) => f.write_str(s),
        }
    }
}

// ------------------------------ Instance --------------------------------- //

impl Instance {
    pub fn new(record: impl Into<String>) -> Self {
        Self { record: record.into(), fields: IndexMap::new() }
    }

    pub fn with(mut self, name: &str, value: Value) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

// ------------------------------- Value ----------------------------------- //

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn str(s: impl Into<String>) -> Self {
        Value::Str(s.into())
    }

    /// Runtime kind name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Decimal(_) => "decimal",
            Value::Date(_) => "date",
            Value::DateTime(_) => "datetime",
            Value::Enum(_) => "enum",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Map(_) => "dict",
            Value::Raw(json) => json_kind(json),
            Value::Record(_) => "record",
        }
    }

    /// Structural conversion with no type information; handlers use this for
    /// scalars and pass-through values.
    pub fn to_plain_json(&self) -> Json {
        match self {
            Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::Float(f) => float_json(*f),
            Value::Str(s) => Json::String(s.clone()),
            Value::Decimal(d) => float_json(d.to_f64()),
            Value::Date(d) => Json::String(crate::datetime::format_date(d, false)),
            Value::DateTime(dt) => Json::String(crate::datetime::format_datetime(dt, false)),
            Value::Enum(e) => e.literal.to_json(),
            Value::List(xs) | Value::Tuple(xs) => Json::Array(xs.iter().map(Value::to_plain_json).collect()),
            Value::Map(entries) => Json::Object(
                entries
                    .iter()
                    .map(|(k, v)| (json_key(&k.to_plain_json()), v.to_plain_json()))
                    .collect(),
            ),
            Value::Raw(json) => json.clone(),
            Value::Record(instance) => Json::Object(
                instance
                    .fields
                    .iter()
                    .filter(|(_, v)| !v.is_null())
                    .map(|(k, v)| (k.clone(), v.to_plain_json()))
                    .collect(),
            ),
        }
    }
}

pub(crate) fn float_json(f: f64) -> Json {
    serde_json::Number::from_f64(f).map(Json::Number).unwrap_or(Json::Null)
}

/// Object keys must be strings; scalars keep their JSON spelling.
pub(crate) fn json_key(key: &Json) -> String {
    match key {
        Json::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Runtime kind name of raw input, for diagnostics.
pub fn json_kind(v: &Json) -> &'static str {
    match v {
        Json::Null => "null",
        Json::Bool(_) => "bool",
        Json::Number(n) if n.is_f64() => "float",
        Json::Number(_) => "int",
        Json::String(_) => "str",
        Json::Array(_) => "list",
        Json::Object(_) => "dict",
    }
}

/// Truthiness of raw input: null, false, zero and empty containers are falsy.
pub(crate) fn json_truthy(v: &Json) -> bool {
    match v {
        Json::Null => false,
        Json::Bool(b) => *b,
        Json::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Json::String(s) => !s.is_empty(),
        Json::Array(xs) => !xs.is_empty(),
        Json::Object(m) => !m.is_empty(),
    }
}
