use serde_json::{Map, Value as Json};
use tracing::error;

use super::{FieldHandler, HandlerKind};
use crate::error::{LoadError, LoadErrorKind, Result};
use crate::schema::{Record, Schema};
use crate::types::TypeRef;
use crate::value::{float_json, json_key, Value};

impl FieldHandler<'_> {
    /// Converts a loaded value back to JSON. `null` is always represented as `null`.
    pub fn represent(&self, value: &Value) -> Result<Json> {
        if value.is_null() {
            return Ok(Json::Null);
        }
        match self.kind {
            HandlerKind::Forced
            | HandlerKind::Any
            | HandlerKind::RawMap
            | HandlerKind::String
            | HandlerKind::Number
            | HandlerKind::Boolean => Ok(value.to_plain_json()),
            HandlerKind::Union => self.represent_union(value),
            HandlerKind::List => self.represent_list(value),
            HandlerKind::Tuple => self.represent_tuple(value),
            HandlerKind::TypedMap => self.represent_map(value),
            HandlerKind::Decimal => match value {
                Value::Decimal(d) => Ok(float_json(d.to_f64())),
                Value::Int(i) => Ok(float_json(*i as f64)),
                Value::Float(f) => Ok(float_json(*f)),
                other => Err(self.unrepresentable(other, "decimal")),
            },
            HandlerKind::Enum => match value {
                Value::Enum(e) => Ok(e.literal.to_json()),
                Value::Str(s) => Ok(Json::String(s.clone())),
                other => Err(self.unrepresentable(other, &self.descriptor.declared_type.to_string())),
            },
            HandlerKind::Date => self.represent_date(value),
            HandlerKind::ForwardReference | HandlerKind::NestedRecord | HandlerKind::PartialRecord => {
                let Value::Record(instance) = value else {
                    return Err(self.unrepresentable(value, "record"));
                };
                // the instance's own definition, unless this is a partial view
                let own = match self.kind {
                    HandlerKind::PartialRecord => None,
                    _ => self.schema.record(&instance.record),
                };
                match own {
                    Some(record) => record.represent(self.schema, instance),
                    None => self.record()?.represent(self.schema, instance),
                }
            }
        }
    }

    fn unrepresentable(&self, value: &Value, expected: &str) -> crate::error::Error {
        let kind = LoadErrorKind::InvalidValue { value: value.kind().to_string(), expected: expected.to_string() };
        LoadError::new(&self.path, kind).into()
    }

    /// First arm whose runtime type fits the value; no fit represents as `null`.
    fn represent_union(&self, value: &Value) -> Result<Json> {
        for arm in &self.descriptor.generic_args {
            if arm_accepts(self.schema, arm, value) {
                return self.child(arm, self.path.clone())?.represent(value);
            }
        }
        Ok(Json::Null)
    }

    fn represent_list(&self, value: &Value) -> Result<Json> {
        let (Value::List(items) | Value::Tuple(items)) = value else {
            return Err(self.unrepresentable(value, "list"));
        };
        let item = self.child(self.arg(0)?, self.path.clone())?;
        let out = items.iter().map(|v| item.represent(v)).collect::<Result<Vec<_>>>()?;
        Ok(Json::Array(out))
    }

    fn represent_tuple(&self, value: &Value) -> Result<Json> {
        let (Value::List(items) | Value::Tuple(items)) = value else {
            return Err(self.unrepresentable(value, "tuple"));
        };
        let out = self
            .descriptor
            .generic_args
            .iter()
            .zip(items)
            .enumerate()
            .map(|(i, (ty, v))| self.child(ty, self.path.index(i))?.represent(v))
            .collect::<Result<Vec<_>>>()?;
        Ok(Json::Array(out))
    }

    fn represent_map(&self, value: &Value) -> Result<Json> {
        let entries = match value {
            Value::Map(entries) => entries,
            Value::Raw(Json::Object(_)) => return Ok(value.to_plain_json()),
            other => return Err(self.unrepresentable(other, "dict")),
        };
        let key = self.child(self.arg(0)?, self.path.clone())?;
        let val = self.child(self.arg(1)?, self.path.clone())?;
        let mut out = Map::with_capacity(entries.len());
        for (k, v) in entries {
            out.insert(json_key(&key.represent(k)?), val.represent(v)?);
        }
        Ok(Json::Object(out))
    }

    fn represent_date(&self, value: &Value) -> Result<Json> {
        let text = match (value, &self.descriptor.declared_type) {
            (Value::DateTime(dt), TypeRef::DateTime) => crate::datetime::format_datetime(dt, false),
            (Value::DateTime(dt), _) => crate::datetime::format_date(&dt.date(), false),
            (Value::Date(d), _) => crate::datetime::format_date(d, false),
            (other, _) => {
                let err = self.unrepresentable(other, "date");
                error!(path = %self.path, %err, "failed to format date");
                return Err(err);
            }
        };
        Ok(Json::String(text))
    }
}

/// Runtime type check used to pick a union arm on the way out.
fn arm_accepts(schema: &Schema, arm: &TypeRef, value: &Value) -> bool {
    match (arm, value) {
        (TypeRef::Any, _) => true,
        (TypeRef::Union(arms), _) => arms.iter().any(|a| arm_accepts(schema, a, value)),
        (TypeRef::Str, Value::Str(_))
        | (TypeRef::Int, Value::Int(_))
        | (TypeRef::Float, Value::Float(_))
        | (TypeRef::Bool, Value::Bool(_))
        | (TypeRef::Decimal, Value::Decimal(_))
        | (TypeRef::List(_), Value::List(_))
        | (TypeRef::Tuple(_), Value::Tuple(_)) => true,
        // a datetime is also a date
        (TypeRef::Date | TypeRef::DateTime, Value::Date(_) | Value::DateTime(_)) => true,
        (TypeRef::Dict(..) | TypeRef::RawMap, Value::Map(_) | Value::Raw(Json::Object(_))) => true,
        (TypeRef::Named(n) | TypeRef::ForwardRef(n), Value::Record(i)) => i.record == *n,
        (TypeRef::Partial(args), Value::Record(i)) => {
            matches!(args.first(), Some(TypeRef::Named(n) | TypeRef::ForwardRef(n)) if i.record == *n)
        }
        (TypeRef::Named(n), Value::Enum(e)) => e.enum_name == *n,
        // string-backed enum members are strings
        (TypeRef::Named(n), Value::Str(_)) => schema.enum_def(n).is_some_and(|e| e.is_str_backed()),
        _ => false,
    }
}
