//! Record, enum and union definitions, and the [`Schema`] registry that owns them.
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{Map, Value as Json};

use crate::descriptor::TypeDescriptor;
use crate::error::{Error, FieldPath, LoadError, Result};
use crate::types::TypeRef;
use crate::value::{EnumLiteral, EnumValue, Instance, Value};

// ------------------------------- Fields ---------------------------------- //

/// Fallback for absent or `null` input. `Absent` is not the same as a `null`
/// default: `Value(Value::Null)` short-circuits to `null`, `Absent` validates.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum FieldDefault {
    #[default]
    Absent,
    Value(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub ty: TypeRef,
    pub default: FieldDefault,
    /// `false` = never read from input; takes its default.
    pub init: bool,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self { name: name.into(), ty, default: FieldDefault::Absent, init: true }
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = FieldDefault::Value(value);
        self
    }

    pub fn not_init(mut self) -> Self {
        self.init = false;
        self
    }

    pub fn descriptor(&self) -> TypeDescriptor {
        TypeDescriptor::new(&self.name, &self.ty).with_default(self.default.clone())
    }
}

// ------------------------------- Hooks ----------------------------------- //

/// Receives the whole input mapping of the enclosing record.
pub type CustomLoader = Arc<dyn Fn(&Map<String, Json>, &FieldPath) -> Result<Value, LoadError> + Send + Sync>;
pub type RepresentFn = Arc<dyn Fn(&Value) -> Result<Json> + Send + Sync>;

#[derive(Clone)]
pub struct CustomRepresenter {
    /// Declared return type; needed to derive the field's external type.
    pub returns: Option<TypeRef>,
    pub func: RepresentFn,
}

/// Per-field code hooks. Only reachable through the library API.
#[derive(Clone, Default)]
pub struct RecordHooks {
    /// `None` skips the field on load entirely.
    pub loaders: IndexMap<String, Option<CustomLoader>>,
    pub representers: IndexMap<String, CustomRepresenter>,
}

impl fmt::Debug for RecordHooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordHooks")
            .field("loaders", &self.loaders.keys().collect::<Vec<_>>())
            .field("representers", &self.representers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Data-expressible per-record configuration.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RecordOptions {
    /// skipped by represent and by type generation
    pub omit: Vec<String>,
    /// represented as `null` instead of being dropped
    pub force_null: Vec<String>,
    /// field -> literal external type
    pub custom_ts_types: IndexMap<String, String>,
    /// extra output-only fields -> literal external type
    pub custom_ts_fields: IndexMap<String, String>,
    /// module path -> imported names
    pub custom_imports: IndexMap<String, Vec<String>>,
    pub compound: Vec<String>,
    pub strict: bool,
    pub ts_name: Option<String>,
    /// `false`: no output unit owns it; embedded wherever it is used
    pub export: bool,
}

impl Default for RecordOptions {
    fn default() -> Self {
        Self {
            omit: Vec::new(),
            force_null: Vec::new(),
            custom_ts_types: IndexMap::new(),
            custom_ts_fields: IndexMap::new(),
            custom_imports: IndexMap::new(),
            compound: Vec::new(),
            strict: false,
            ts_name: None,
            export: true,
        }
    }
}

// ------------------------------- Record ---------------------------------- //

/// Anything that can be validated from input and represented back.
pub trait Record {
    fn name(&self) -> &str;
    fn fields(&self) -> &[FieldDef];
    fn options(&self) -> &RecordOptions;
    fn hooks(&self) -> &RecordHooks;

    fn external_name(&self) -> &str {
        self.options().ts_name.as_deref().unwrap_or(self.name())
    }

    fn field_def(&self, name: &str) -> Option<&FieldDef> {
        self.fields().iter().find(|f| f.name == name)
    }

    fn load(&self, schema: &Schema, raw: &Json) -> Result<Instance> {
        self.load_at(schema, raw, &FieldPath::root(self.name()))
    }

    fn load_at(&self, schema: &Schema, raw: &Json, path: &FieldPath) -> Result<Instance> {
        crate::record::load_record(self, schema, raw, path)
    }

    fn represent(&self, schema: &Schema, instance: &Instance) -> Result<Json> {
        crate::record::represent_record(self, schema, instance)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecordDef {
    pub name: String,
    pub fields: Vec<FieldDef>,
    pub options: RecordOptions,
    pub hooks: RecordHooks,
}

impl Record for RecordDef {
    fn name(&self) -> &str {
        &self.name
    }
    fn fields(&self) -> &[FieldDef] {
        &self.fields
    }
    fn options(&self) -> &RecordOptions {
        &self.options
    }
    fn hooks(&self) -> &RecordHooks {
        &self.hooks
    }
}

impl RecordDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Self::default() }
    }

    pub fn field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_options(mut self, options: RecordOptions) -> Self {
        self.options = options;
        self
    }

    pub fn loader<F>(mut self, field: &str, loader: F) -> Self
    where
        F: Fn(&Map<String, Json>, &FieldPath) -> Result<Value, LoadError> + Send + Sync + 'static,
    {
        self.hooks.loaders.insert(field.to_string(), Some(Arc::new(loader)));
        self
    }

    pub fn skip_on_load(mut self, field: &str) -> Self {
        self.hooks.loaders.insert(field.to_string(), None);
        self
    }

    pub fn representer<F>(mut self, field: &str, returns: Option<TypeRef>, func: F) -> Self
    where
        F: Fn(&Value) -> Result<Json> + Send + Sync + 'static,
    {
        self.hooks.representers.insert(field.to_string(), CustomRepresenter { returns, func: Arc::new(func) });
        self
    }

    /// Same record with every field optional and defaulting to `null`.
    pub fn partial(&self) -> RecordDef {
        let fields = self
            .fields
            .iter()
            .map(|f| FieldDef {
                name: f.name.clone(),
                ty: if f.ty.is_optional() { f.ty.clone() } else { TypeRef::optional(f.ty.clone()) },
                default: FieldDefault::Value(Value::Null),
                init: true,
            })
            .collect();
        RecordDef {
            name: self.name.clone(),
            fields,
            options: self.options.clone(),
            hooks: self.hooks.clone(),
        }
    }
}

// -------------------------------- Enums ---------------------------------- //

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct EnumDef {
    pub name: String,
    /// member name -> backing literal, in declaration order
    pub members: IndexMap<String, EnumLiteral>,
    #[serde(default)]
    pub export_values: bool,
    #[serde(default)]
    pub export_values_name: Option<String>,
}

impl EnumDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            members: IndexMap::new(),
            export_values: false,
            export_values_name: None,
        }
    }

    pub fn member(mut self, name: &str, literal: impl Into<EnumLiteral>) -> Self {
        self.members.insert(name.to_string(), literal.into());
        self
    }

    pub fn exported(mut self, const_name: Option<&str>) -> Self {
        self.export_values = true;
        self.export_values_name = const_name.map(str::to_string);
        self
    }

    pub fn is_str_backed(&self) -> bool {
        self.members.values().all(EnumLiteral::is_str)
    }

    fn value_of(&self, member: &str, literal: &EnumLiteral) -> EnumValue {
        EnumValue {
            enum_name: self.name.clone(),
            member: member.to_string(),
            literal: literal.clone(),
        }
    }

    /// Exact, case-sensitive lookup by backing string. Empty text never matches.
    pub fn parse(&self, text: &str) -> Option<EnumValue> {
        if text.is_empty() {
            return None;
        }
        self.members
            .iter()
            .find(|(_, lit)| matches!(lit, EnumLiteral::Str(s) if s == text))
            .map(|(member, lit)| self.value_of(member, lit))
    }

    pub fn from_literal(&self, literal: &EnumLiteral) -> Option<EnumValue> {
        self.members
            .iter()
            .find(|(_, lit)| *lit == literal)
            .map(|(member, lit)| self.value_of(member, lit))
    }

    pub fn value(&self, member: &str) -> Option<EnumValue> {
        self.members.get_key_value(member).map(|(m, lit)| self.value_of(m, lit))
    }
}

impl From<&str> for EnumLiteral {
    fn from(value: &str) -> Self {
        EnumLiteral::Str(value.to_string())
    }
}

impl From<i64> for EnumLiteral {
    fn from(value: i64) -> Self {
        EnumLiteral::Int(value)
    }
}

// ------------------------------- Unions ---------------------------------- //

/// A module-level named union of external types.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct UnionDef {
    pub name: String,
    #[serde(default)]
    pub types: Vec<String>,
    /// When present, replaces `types` and adds one type guard per arm.
    #[serde(default)]
    pub differentiators: Vec<Differentiator>,
    #[serde(default)]
    pub additional_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Differentiator {
    #[serde(rename = "type")]
    pub ty: String,
    pub check: String,
}

impl UnionDef {
    pub fn members(&self) -> Vec<&str> {
        if self.differentiators.is_empty() {
            self.types.iter().map(String::as_str).collect()
        } else {
            self.differentiators.iter().map(|d| d.ty.as_str()).collect()
        }
    }
}

// ------------------------------- Modules --------------------------------- //

/// One output unit's declared contents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModuleDef {
    pub name: String,
    pub prefix: String,
    /// custom output directory
    pub path: Option<PathBuf>,
    /// embed every dependency instead of importing it
    pub standalone: bool,
    /// type names in declaration order
    pub contents: Vec<String>,
}

// ------------------------------- Registry -------------------------------- //

/// What a name in the schema refers to.
#[derive(Debug, Clone, Copy)]
pub enum Definition<'a> {
    Record(&'a RecordDef),
    Enum(&'a EnumDef),
    Union(&'a UnionDef),
}

#[derive(Debug, Clone, Default)]
pub struct Schema {
    records: IndexMap<String, RecordDef>,
    enums: IndexMap<String, EnumDef>,
    unions: IndexMap<String, UnionDef>,
    modules: Vec<ModuleDef>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers everything and validates the result.
    pub fn from_parts(enums: Vec<EnumDef>, records: Vec<RecordDef>) -> Result<Self> {
        let mut schema = Schema::new();
        for e in enums {
            schema.add_enum(e)?;
        }
        for r in records {
            schema.add_record(r)?;
        }
        schema.validate()?;
        Ok(schema)
    }

    fn ensure_free(&self, name: &str) -> Result<()> {
        if self.lookup(name).is_some() {
            return Err(Error::Configuration(format!("`{name}` is defined twice")));
        }
        Ok(())
    }

    pub fn add_record(&mut self, record: RecordDef) -> Result<()> {
        self.ensure_free(&record.name)?;
        self.records.insert(record.name.clone(), record);
        Ok(())
    }

    pub fn add_enum(&mut self, def: EnumDef) -> Result<()> {
        self.ensure_free(&def.name)?;
        if def.members.is_empty() {
            return Err(Error::Configuration(format!("enum `{}` has no members", def.name)));
        }
        let str_backed = def.members.values().filter(|l| l.is_str()).count();
        if str_backed != 0 && str_backed != def.members.len() {
            return Err(Error::Configuration(format!(
                "enum `{}` mixes string and integer values",
                def.name
            )));
        }
        self.enums.insert(def.name.clone(), def);
        Ok(())
    }

    pub fn add_union(&mut self, def: UnionDef) -> Result<()> {
        self.ensure_free(&def.name)?;
        self.unions.insert(def.name.clone(), def);
        Ok(())
    }

    pub fn add_module(&mut self, module: ModuleDef) -> Result<()> {
        if let Some(missing) = module.contents.iter().find(|n| self.lookup(n).is_none()) {
            return Err(Error::Configuration(format!(
                "module `{}` lists unknown type `{missing}`",
                module.name
            )));
        }
        self.modules.push(module);
        Ok(())
    }

    pub fn record(&self, name: &str) -> Option<&RecordDef> {
        self.records.get(name)
    }

    pub(crate) fn record_mut(&mut self, name: &str) -> Option<&mut RecordDef> {
        self.records.get_mut(name)
    }

    pub fn enum_def(&self, name: &str) -> Option<&EnumDef> {
        self.enums.get(name)
    }

    pub fn union_def(&self, name: &str) -> Option<&UnionDef> {
        self.unions.get(name)
    }

    pub fn records(&self) -> impl Iterator<Item = &RecordDef> {
        self.records.values()
    }

    pub fn enums(&self) -> impl Iterator<Item = &EnumDef> {
        self.enums.values()
    }

    pub fn modules(&self) -> &[ModuleDef] {
        &self.modules
    }

    pub fn lookup(&self, name: &str) -> Option<Definition<'_>> {
        if let Some(r) = self.records.get(name) {
            Some(Definition::Record(r))
        } else if let Some(e) = self.enums.get(name) {
            Some(Definition::Enum(e))
        } else {
            self.unions.get(name).map(Definition::Union)
        }
    }

    /// Name a type is emitted under.
    pub fn external_name<'a>(&'a self, name: &'a str) -> &'a str {
        match self.records.get(name) {
            Some(r) => r.external_name(),
            None => name,
        }
    }

    /// Whether an output unit may own `name`.
    pub fn is_exported(&self, name: &str) -> bool {
        self.records.get(name).is_none_or(|r| r.options.export)
    }

    /// Dispatches every declared field type once, so unresolvable types and
    /// misapplied `Partial` surface here instead of on first load.
    pub fn validate(&self) -> Result<()> {
        for record in self.records.values() {
            let path = FieldPath::root(&record.name);
            for field in &record.fields {
                crate::handler::check_type(self, &field.ty, &path.field(&field.name))?;
            }
            for name in record.hooks.representers.keys().chain(record.hooks.loaders.keys()) {
                if record.field_def(name).is_none() {
                    return Err(Error::Configuration(format!(
                        "hook for unknown field `{name}` on `{}`",
                        record.name
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status() -> EnumDef {
        EnumDef::new("Status").member("Active", "active").member("Closed", "closed")
    }

    #[test]
    fn enum_lookup_is_exact() {
        let def = status();
        assert_eq!(def.parse("active").map(|v| v.member), Some("Active".to_string()));
        assert!(def.parse("Active").is_none());
        assert!(def.parse("").is_none());
    }

    #[test]
    fn mixed_enum_backing_is_rejected() {
        let mut schema = Schema::new();
        let bad = EnumDef::new("Mixed").member("A", "a").member("B", 2i64);
        assert!(matches!(schema.add_enum(bad), Err(Error::Configuration(_))));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut schema = Schema::new();
        schema.add_enum(status()).unwrap();
        assert!(schema.add_record(RecordDef::new("Status")).is_err());
    }

    #[test]
    fn partial_makes_every_field_optional() {
        let user = RecordDef::new("User")
            .field(FieldDef::new("id", TypeRef::Int))
            .field(FieldDef::new("nick", TypeRef::optional(TypeRef::Str)));
        let partial = user.partial();
        assert_eq!(partial.name, "User");
        assert!(partial.fields.iter().all(|f| f.ty.is_optional()));
        assert!(partial.fields.iter().all(|f| f.default == FieldDefault::Value(Value::Null)));
        // already optional fields are not wrapped twice
        assert_eq!(partial.fields[1].ty, TypeRef::optional(TypeRef::Str));
    }

    #[test]
    fn partial_union_fields_stay_flat() {
        let score = RecordDef::new("Score").field(FieldDef::new("value", TypeRef::Union(vec![TypeRef::Int, TypeRef::Str])));
        assert_eq!(
            score.partial().fields[0].ty,
            TypeRef::Union(vec![TypeRef::Int, TypeRef::Str, TypeRef::NoneType])
        );
    }

    #[test]
    fn validate_rejects_unknown_field_types() {
        let rec = RecordDef::new("Order").field(FieldDef::new("owner", TypeRef::named("Ghost")));
        let err = Schema::from_parts(vec![], vec![rec]).unwrap_err();
        assert!(matches!(err, Error::UnknownFieldType { .. }), "{err}");
    }

    #[test]
    fn validate_rejects_partial_of_scalar() {
        let rec = RecordDef::new("Patch").field(FieldDef::new("body", TypeRef::Partial(vec![TypeRef::Int])));
        let err = Schema::from_parts(vec![], vec![rec]).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)), "{err}");
    }
}
