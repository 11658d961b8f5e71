//! Record-level load and represent, shared by every [`Record`] implementation.
use serde_json::{json, Map, Value as Json};
use tracing::trace;

use crate::error::{Error, FieldPath, LoadError, Result};
use crate::handler;
use crate::schema::{FieldDef, FieldDefault, Record, Schema};
use crate::types::TypeRef;
use crate::value::{json_kind, Instance};

pub(crate) fn load_record<R: Record + ?Sized>(
    record: &R,
    schema: &Schema,
    raw: &Json,
    path: &FieldPath,
) -> Result<Instance> {
    let Json::Object(input) = raw else {
        let expected = format!("dict while loading {}", record.name());
        return Err(LoadError::mismatch(path, expected, json_kind(raw)).into());
    };

    let mut instance = Instance::new(record.name());
    for field in record.fields() {
        let field_path = path.field(&field.name);

        if !field.init {
            if let FieldDefault::Value(v) = &field.default {
                instance.fields.insert(field.name.clone(), v.clone());
            }
            continue;
        }

        if let Some(loader) = record.hooks().loaders.get(&field.name) {
            if let Some(loader) = loader {
                let value = loader(input, &field_path)?;
                instance.fields.insert(field.name.clone(), value);
            }
            continue;
        }

        if matches!(field.ty, TypeRef::Union(_)) && !field.ty.is_optional() {
            return Err(Error::unknown(
                &field_path,
                format_args!("{} (a non-optional union needs a custom loader)", field.ty),
            ));
        }

        let filled;
        let raw_value = match input.get(&field.name) {
            Some(v) => v,
            None => {
                filled = auto_fill(record, field).unwrap_or(Json::Null);
                &filled
            }
        };
        trace!(path = %field_path, "loading field");
        let value = handler::resolve(field.descriptor(), schema, &field_path)?.load(raw_value)?;
        instance.fields.insert(field.name.clone(), value);
    }
    Ok(instance)
}

/// Empty container for an absent collection field of a non-strict record.
fn auto_fill<R: Record + ?Sized>(record: &R, field: &FieldDef) -> Option<Json> {
    if record.options().strict || field.default != FieldDefault::Absent {
        return None;
    }
    match field.ty {
        TypeRef::List(_) => Some(json!([])),
        TypeRef::Dict(..) | TypeRef::RawMap => Some(json!({})),
        _ => None,
    }
}

pub(crate) fn represent_record<R: Record + ?Sized>(
    record: &R,
    schema: &Schema,
    instance: &Instance,
) -> Result<Json> {
    let options = record.options();
    let path = FieldPath::root(record.name());
    let mut out = Map::new();
    for field in record.fields() {
        if options.omit.contains(&field.name) {
            continue;
        }
        let value = instance.get(&field.name).unwrap_or(&crate::value::Value::Null);
        if value.is_null() && !options.force_null.contains(&field.name) {
            continue;
        }
        let json = match record.hooks().representers.get(&field.name) {
            Some(custom) => (custom.func)(value)?,
            None => handler::resolve(field.descriptor(), schema, &path.field(&field.name))?.represent(value)?,
        };
        out.insert(field.name.clone(), json);
    }
    Ok(Json::Object(out))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::error::{Error, LoadError};
    use crate::schema::{FieldDef, Record, RecordDef, RecordOptions, Schema};
    use crate::types::TypeRef;
    use crate::value::{Instance, Value};

    fn with(records: Vec<RecordDef>) -> Schema {
        Schema::from_parts(vec![], records).unwrap()
    }

    #[test]
    fn undeclared_input_keys_are_ignored() {
        let rec = RecordDef::new("A").field(FieldDef::new("x", TypeRef::Int));
        let schema = with(vec![rec.clone()]);
        let inst = rec.load(&schema, &json!({"x": 1, "junk": true})).unwrap();
        assert_eq!(inst.fields.len(), 1);
    }

    #[test]
    fn non_init_fields_take_their_default() {
        let rec = RecordDef::new("A")
            .field(FieldDef::new("kind", TypeRef::Str).with_default(Value::str("a")).not_init());
        let schema = with(vec![rec.clone()]);
        let inst = rec.load(&schema, &json!({"kind": "zzz"})).unwrap();
        assert_eq!(inst.get("kind"), Some(&Value::str("a")));
    }

    #[test]
    fn custom_loader_sees_the_whole_input() {
        let rec = RecordDef::new("A")
            .field(FieldDef::new("a", TypeRef::Int))
            .field(FieldDef::new("total", TypeRef::Int))
            .loader("total", |input, path| {
                let a = input.get("a").and_then(|v| v.as_i64()).ok_or_else(|| LoadError::custom(path, "no a"))?;
                let b = input.get("b").and_then(|v| v.as_i64()).unwrap_or(0);
                Ok(Value::Int(a + b))
            });
        let schema = with(vec![rec.clone()]);
        let inst = rec.load(&schema, &json!({"a": 2, "b": 3})).unwrap();
        assert_eq!(inst.get("total"), Some(&Value::Int(5)));
    }

    #[test]
    fn skipped_fields_are_not_loaded() {
        let rec = RecordDef::new("A").field(FieldDef::new("secret", TypeRef::Int)).skip_on_load("secret");
        let schema = with(vec![rec.clone()]);
        let inst = rec.load(&schema, &json!({"secret": "not an int"})).unwrap();
        assert!(inst.get("secret").is_none());
    }

    #[test]
    fn bare_union_field_needs_a_loader() {
        let rec = RecordDef::new("A").field(FieldDef::new("u", "Union[int, str]".parse().unwrap()));
        let schema = with(vec![rec.clone()]);
        let err = rec.load(&schema, &json!({"u": 1})).unwrap_err();
        assert!(matches!(err, Error::UnknownFieldType { .. }));
    }

    #[test]
    fn absent_collections_are_filled_unless_strict() {
        let rec = RecordDef::new("A")
            .field(FieldDef::new("tags", TypeRef::list(TypeRef::Str)))
            .field(FieldDef::new("meta", TypeRef::RawMap));
        let schema = with(vec![rec.clone()]);
        let inst = rec.load(&schema, &json!({})).unwrap();
        assert_eq!(inst.get("tags"), Some(&Value::List(vec![])));
        assert_eq!(inst.get("meta"), Some(&Value::Raw(json!({}))));

        let strict = RecordDef::new("B")
            .field(FieldDef::new("tags", TypeRef::list(TypeRef::Str)))
            .with_options(RecordOptions { strict: true, ..RecordOptions::default() });
        let schema = with(vec![strict.clone()]);
        assert!(strict.load(&schema, &json!({})).unwrap_err().as_load().is_some());
    }

    #[test]
    fn represent_drops_nulls_and_omitted_fields() {
        let options = RecordOptions {
            omit: vec!["internal".into()],
            force_null: vec!["note".into()],
            ..RecordOptions::default()
        };
        let rec = RecordDef::new("A")
            .field(FieldDef::new("internal", TypeRef::Int))
            .field(FieldDef::new("nick", TypeRef::optional(TypeRef::Str)))
            .field(FieldDef::new("note", TypeRef::optional(TypeRef::Str)))
            .with_options(options);
        let schema = with(vec![rec.clone()]);
        let inst = Instance::new("A")
            .with("internal", Value::Int(1))
            .with("nick", Value::Null)
            .with("note", Value::Null);
        assert_eq!(rec.represent(&schema, &inst).unwrap(), json!({"note": null}));
    }

    #[test]
    fn custom_representer_replaces_the_handler() {
        let rec = RecordDef::new("A")
            .field(FieldDef::new("n", TypeRef::Int))
            .representer("n", Some(TypeRef::Str), |v| Ok(json!(format!("#{}", v.to_plain_json()))));
        let schema = with(vec![rec.clone()]);
        let inst = Instance::new("A").with("n", Value::Int(4));
        assert_eq!(rec.represent(&schema, &inst).unwrap(), json!({"n": "#4"}));
    }

    #[test]
    fn non_object_input_is_a_load_error() {
        let rec = RecordDef::new("A");
        let schema = with(vec![rec.clone()]);
        assert!(rec.load(&schema, &json!([1])).unwrap_err().as_load().is_some());
    }
}
