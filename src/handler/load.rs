use serde_json::Value as Json;
use tracing::debug;

use super::{FieldHandler, HandlerKind};
use crate::error::{Error, LoadError, LoadErrorKind, Result};
use crate::schema::{EnumDef, FieldDefault, Record};
use crate::types::TypeRef;
use crate::value::{json_kind, json_truthy, Decimal, EnumLiteral, Value};

impl FieldHandler<'_> {
    /// Validates and converts raw input. `null` input with a declared default
    /// yields that default before any type check.
    pub fn load(&self, raw: &Json) -> Result<Value> {
        if raw.is_null() {
            if let FieldDefault::Value(default) = &self.descriptor.default {
                return Ok(default.clone());
            }
        }
        match self.kind {
            HandlerKind::Forced | HandlerKind::Any => Ok(Value::Raw(raw.clone())),
            HandlerKind::Union => self.load_union(raw),
            HandlerKind::List => self.load_list(raw),
            HandlerKind::Tuple => self.load_tuple(raw),
            HandlerKind::RawMap => match raw {
                Json::Object(_) => Ok(Value::Raw(raw.clone())),
                other => Err(self.mismatch("dict", other)),
            },
            HandlerKind::TypedMap => self.load_map(raw),
            HandlerKind::String => match raw {
                Json::String(s) => Ok(Value::Str(s.clone())),
                other => Err(self.mismatch("str", other)),
            },
            HandlerKind::Number => self.load_number(raw),
            HandlerKind::Decimal => self.load_decimal(raw),
            HandlerKind::Boolean => match raw {
                Json::Bool(b) => Ok(Value::Bool(*b)),
                other => Err(self.mismatch("bool", other)),
            },
            HandlerKind::Enum => self.load_enum(raw),
            HandlerKind::Date => self.load_date(raw),
            HandlerKind::ForwardReference | HandlerKind::NestedRecord | HandlerKind::PartialRecord => {
                let record = self.record()?;
                Ok(Value::Record(record.load_at(self.schema, raw, &self.path)?))
            }
        }
    }

    fn mismatch(&self, expected: impl Into<String>, found: &Json) -> Error {
        LoadError::mismatch(&self.path, expected, json_kind(found)).into()
    }

    fn invalid(&self, value: impl Into<String>, expected: impl Into<String>) -> Error {
        let kind = LoadErrorKind::InvalidValue { value: value.into(), expected: expected.into() };
        LoadError::new(&self.path, kind).into()
    }

    fn load_union(&self, raw: &Json) -> Result<Value> {
        if raw.is_null() && self.descriptor.is_optional() {
            return Ok(Value::Null);
        }
        let arms: Vec<&TypeRef> =
            self.descriptor.generic_args.iter().filter(|t| **t != TypeRef::NoneType).collect();
        for arm in &arms {
            let handler = self.child(arm, self.path.clone())?;
            match handler.load(raw) {
                Ok(value) => return Ok(value),
                Err(Error::Load(error)) => {
                    debug!(path = %self.path, arm = %arm, %error, "union arm rejected input");
                }
                Err(other) => return Err(other),
            }
        }
        let kind = LoadErrorKind::NoMatchingArm {
            found: json_kind(raw).to_string(),
            arms: arms.iter().map(|t| t.to_string()).collect(),
        };
        Err(LoadError::new(&self.path, kind).into())
    }

    fn load_list(&self, raw: &Json) -> Result<Value> {
        let Json::Array(items) = raw else {
            return Err(self.mismatch("list", raw));
        };
        let item_ty = self.arg(0)?;
        let values = items
            .iter()
            .enumerate()
            .map(|(i, item)| self.child(item_ty, self.path.index(i))?.load(item))
            .collect::<Result<Vec<_>>>()?;
        Ok(Value::List(values))
    }

    fn load_tuple(&self, raw: &Json) -> Result<Value> {
        let Json::Array(items) = raw else {
            return Err(self.mismatch("list", raw));
        };
        let types = &self.descriptor.generic_args;
        if items.len() != types.len() {
            let kind = LoadErrorKind::LengthMismatch { expected: types.len(), actual: items.len() };
            return Err(LoadError::new(&self.path, kind).into());
        }
        let values = types
            .iter()
            .zip(items)
            .enumerate()
            .map(|(i, (ty, item))| self.child(ty, self.path.index(i))?.load(item))
            .collect::<Result<Vec<_>>>()?;
        Ok(Value::Tuple(values))
    }

    fn load_map(&self, raw: &Json) -> Result<Value> {
        let Json::Object(map) = raw else {
            return Err(self.mismatch("dict", raw));
        };
        let key_ty = self.arg(0)?;
        let value_ty = self.arg(1)?;
        // a union key accepts any of its non-null arms
        let key_arms = key_ty.non_null_arms();
        let mut entries = Vec::with_capacity(map.len());
        for (key, value) in map {
            let key = self.load_key(key, &key_arms)?;
            let path = self.path.key(&key_label(&key));
            entries.push((key, self.child(value_ty, path)?.load(value)?));
        }
        Ok(Value::Map(entries))
    }

    /// Object keys arrive as text; numeric and boolean key types accept their
    /// textual spelling.
    fn load_key(&self, key: &str, arms: &[&TypeRef]) -> Result<Value> {
        for arm in arms {
            let parsed = match arm {
                TypeRef::Str => Some(Value::Str(key.to_string())),
                TypeRef::Int => key.parse().ok().map(Value::Int),
                TypeRef::Float => key.parse().ok().map(Value::Float),
                TypeRef::Bool => key.parse().ok().map(Value::Bool),
                _ => None,
            };
            if let Some(value) = parsed {
                return Ok(value);
            }
        }
        if let [TypeRef::Named(name)] = arms {
            if let Some(def) = self.schema.enum_def(name) {
                if let Some(value) = enum_from_text(def, key) {
                    return Ok(Value::Enum(value));
                }
            }
        }
        let expected = arms.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(" | ");
        let kind = LoadErrorKind::KeyMismatch { key: key.to_string(), expected };
        Err(LoadError::new(&self.path, kind).into())
    }

    fn load_number(&self, raw: &Json) -> Result<Value> {
        let is_int = self.descriptor.declared_type == TypeRef::Int;
        match raw {
            Json::Number(n) if is_int => {
                let int = n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64));
                int.map(Value::Int).ok_or_else(|| self.invalid(n.to_string(), "int"))
            }
            Json::Number(n) => {
                n.as_f64().map(Value::Float).ok_or_else(|| self.invalid(n.to_string(), "float"))
            }
            other => Err(self.mismatch(if is_int { "int" } else { "float" }, other)),
        }
    }

    fn load_decimal(&self, raw: &Json) -> Result<Value> {
        if !json_truthy(raw) {
            return Ok(Value::Null);
        }
        let text = match raw {
            Json::Number(n) => n.to_string(),
            Json::String(s) => s.clone(),
            Json::Bool(true) => "1".to_string(),
            other => return Err(self.mismatch("decimal", other)),
        };
        Decimal::parse(&text)
            .map(Value::Decimal)
            .ok_or_else(|| self.invalid(text, "decimal"))
    }

    fn load_enum(&self, raw: &Json) -> Result<Value> {
        let TypeRef::Named(name) = &self.descriptor.declared_type else {
            return Err(Error::unknown(&self.path, &self.descriptor.declared_type));
        };
        let def = self
            .schema
            .enum_def(name)
            .ok_or_else(|| Error::unknown(&self.path, name))?;
        let found = match raw {
            Json::String(s) => def.parse(s),
            Json::Number(n) if !def.is_str_backed() => {
                n.as_i64().and_then(|i| def.from_literal(&EnumLiteral::Int(i)))
            }
            other => return Err(self.mismatch(format!("str or {name}"), other)),
        };
        found.map(Value::Enum).ok_or_else(|| self.invalid(raw.to_string(), name.as_str()))
    }

    fn load_date(&self, raw: &Json) -> Result<Value> {
        let Json::String(text) = raw else {
            return Err(self.mismatch(self.descriptor.declared_type.to_string(), raw));
        };
        let value = match self.descriptor.declared_type {
            TypeRef::DateTime => crate::datetime::parse_datetime(text).map(Value::DateTime),
            _ => crate::datetime::parse_date(text).map(Value::Date),
        };
        Ok(value.unwrap_or(Value::Null))
    }
}

/// String-backed members by value; integer-backed members by their decimal text.
fn enum_from_text(def: &EnumDef, text: &str) -> Option<crate::value::EnumValue> {
    def.parse(text)
        .or_else(|| text.parse().ok().and_then(|i| def.from_literal(&EnumLiteral::Int(i))))
}

fn key_label(key: &Value) -> String {
    match key {
        Value::Str(s) => s.clone(),
        Value::Enum(e) => e.literal.to_string(),
        other => other.to_plain_json().to_string(),
    }
}
