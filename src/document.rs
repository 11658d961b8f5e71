//! JSON schema documents: the data form of enums, records, unions and the
//! modules that group them.
//!
//! ```json
//! {
//!   "modules": [{
//!     "name": "users",
//!     "enums":   [{ "name": "Role", "members": { "Admin": "admin" } }],
//!     "records": [{ "name": "User", "fields": [{ "name": "role", "type": "Role" }] }]
//!   }]
//! }
//! ```
use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer};
use serde_json::Value as Json;
use tracing::debug;

use crate::error::{Error, FieldPath, Result};
use crate::handler;
use crate::schema::{EnumDef, FieldDef, FieldDefault, ModuleDef, RecordDef, RecordOptions, Schema, UnionDef};
use crate::types::TypeRef;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDocument {
    #[serde(default)]
    pub modules: Vec<ModuleDocument>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleDocument {
    pub name: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub standalone: bool,
    #[serde(default)]
    pub enums: Vec<EnumDef>,
    #[serde(default)]
    pub records: Vec<RecordDocument>,
    #[serde(default)]
    pub unions: Vec<UnionDef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordDocument {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDocument>,
    #[serde(flatten)]
    pub options: RecordOptions,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDocument {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeRef,
    /// `Some(Json::Null)` is an explicit `null` default; `None` means no default.
    #[serde(default, deserialize_with = "present")]
    pub default: Option<Json>,
    #[serde(default = "yes")]
    pub init: bool,
}

fn present<'de, D: Deserializer<'de>>(de: D) -> std::result::Result<Option<Json>, D::Error> {
    Json::deserialize(de).map(Some)
}

fn yes() -> bool {
    true
}

impl SchemaDocument {
    pub fn from_file(file: &Path) -> anyhow::Result<Self> {
        crate::path_de::from_file_with_path(file)
    }

    pub fn merge(documents: impl IntoIterator<Item = SchemaDocument>) -> Self {
        Self { modules: documents.into_iter().flat_map(|d| d.modules).collect() }
    }

    /// Builds and validates the registry. Field defaults are loaded against
    /// their declared type once every name is known.
    pub fn into_schema(self) -> Result<Schema> {
        let mut schema = Schema::new();
        let mut modules = Vec::with_capacity(self.modules.len());
        let mut pending: Vec<(String, String, Json)> = Vec::new();

        for module in self.modules {
            let mut contents = Vec::new();
            for def in module.enums {
                contents.push(def.name.clone());
                schema.add_enum(def)?;
            }
            for record in module.records {
                contents.push(record.name.clone());
                let mut def = RecordDef::new(&record.name).with_options(record.options);
                for field in record.fields {
                    if let Some(raw) = field.default {
                        pending.push((record.name.clone(), field.name.clone(), raw));
                    }
                    let mut fd = FieldDef::new(field.name, field.ty);
                    fd.init = field.init;
                    def = def.field(fd);
                }
                schema.add_record(def)?;
            }
            for def in module.unions {
                contents.push(def.name.clone());
                schema.add_union(def)?;
            }
            modules.push(ModuleDef {
                name: module.name,
                prefix: module.prefix,
                path: module.path,
                standalone: module.standalone,
                contents,
            });
        }

        for (record, field, raw) in pending {
            let default = typed_default(&schema, &record, &field, &raw)?;
            if let Some(fd) = schema.record_mut(&record).and_then(|r| r.fields.iter_mut().find(|f| f.name == field)) {
                fd.default = FieldDefault::Value(default);
            }
        }
        for module in modules {
            schema.add_module(module)?;
        }
        schema.validate()?;
        debug!(records = schema.records().count(), enums = schema.enums().count(), "schema built");
        Ok(schema)
    }
}

fn typed_default(schema: &Schema, record: &str, field: &str, raw: &Json) -> Result<crate::value::Value> {
    let path = FieldPath::root(record).field(field);
    let def = schema
        .record(record)
        .and_then(|r| r.fields.iter().find(|f| f.name == field))
        .ok_or_else(|| Error::Configuration(format!("no field {path}")))?;
    if raw.is_null() {
        return Ok(crate::value::Value::Null);
    }
    let value = handler::resolve(def.descriptor(), schema, &path)?
        .load(raw)
        .map_err(|e| Error::Configuration(format!("default of {path} does not fit its type: {e}")))?;
    Ok(value)
}

/// Reads, merges and builds every document.
pub fn load_schema(files: &[PathBuf]) -> anyhow::Result<Schema> {
    let documents = files.iter().map(|f| SchemaDocument::from_file(f)).collect::<anyhow::Result<Vec<_>>>()?;
    Ok(SchemaDocument::merge(documents).into_schema()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Record;
    use crate::value::Value;
    use serde_json::json;

    fn build(doc: Json) -> Result<Schema> {
        let doc: SchemaDocument = crate::path_de::from_str_with_path(&doc.to_string()).unwrap();
        doc.into_schema()
    }

    #[test]
    fn document_builds_modules_in_declaration_order() {
        let schema = build(json!({
            "modules": [{
                "name": "users",
                "prefix": "api_",
                "enums": [{ "name": "Role", "members": { "Admin": "admin", "Guest": "guest" } }],
                "records": [{
                    "name": "User",
                    "ts_name": "UserDTO",
                    "omit": ["password"],
                    "fields": [
                        { "name": "role", "type": "Role", "default": "guest" },
                        { "name": "password", "type": "str" },
                        { "name": "nick", "type": "Optional[str]", "default": null },
                        { "name": "tags", "type": "list[str]" }
                    ]
                }]
            }]
        }))
        .unwrap();
        let module = &schema.modules()[0];
        assert_eq!(module.contents, vec!["Role", "User"]);
        let user = schema.record("User").unwrap();
        assert_eq!(user.external_name(), "UserDTO");
        assert!(matches!(&user.fields[0].default, FieldDefault::Value(Value::Enum(e)) if e.member == "Guest"));
        assert_eq!(user.fields[2].default, FieldDefault::Value(Value::Null));
        assert_eq!(user.fields[3].default, FieldDefault::Absent);
    }

    #[test]
    fn defaults_must_fit_their_type() {
        let err = build(json!({
            "modules": [{ "name": "m", "records": [{
                "name": "A", "fields": [{ "name": "n", "type": "int", "default": "x" }]
            }]}]
        }))
        .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)), "{err}");
    }

    #[test]
    fn forward_references_resolve_across_modules() {
        let schema = build(json!({
            "modules": [
                { "name": "a", "records": [{ "name": "Node", "fields": [{ "name": "next", "type": "Optional['Leaf']" }] }] },
                { "name": "b", "records": [{ "name": "Leaf", "fields": [] }] }
            ]
        }))
        .unwrap();
        let node = schema.record("Node").unwrap();
        let inst = node.load(&schema, &json!({"next": {}})).unwrap();
        assert!(matches!(inst.get("next"), Some(Value::Record(i)) if i.record == "Leaf"));
    }

    #[test]
    fn malformed_type_strings_report_their_path() {
        let src = r#"{"modules": [{"name": "m", "records": [{"name": "A", "fields": [{"name": "x", "type": "list[int"}]}]}]}"#;
        let err = crate::path_de::from_str_with_path::<SchemaDocument>(src).unwrap_err();
        assert!(err.contains("records[0].fields[0].type"), "{err}");
    }
}
