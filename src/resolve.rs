//! Turns schema definitions into [`Declaration`]s plus what they depend on.
use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::declaration::{lower_first, Declaration, DeclarationBody, ProcessedField};
use crate::descriptor::TypeDescriptor;
use crate::error::{Error, FieldPath, Result};
use crate::handler::{self, ProcessingResult};
use crate::schema::{Definition, EnumDef, Record, RecordDef, Schema, UnionDef};
use crate::types::TypeRef;

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub declaration: Declaration,
    /// schema names to embed or import
    pub dependencies: IndexSet<String>,
    /// custom import directives: path -> names
    pub imports: IndexMap<String, IndexSet<String>>,
}

impl Resolution {
    fn standalone(declaration: Declaration) -> Self {
        Self { declaration, dependencies: IndexSet::new(), imports: IndexMap::new() }
    }
}

pub fn resolve_type(schema: &Schema, name: &str) -> Result<Resolution> {
    match schema.lookup(name) {
        Some(Definition::Record(r)) => resolve_record(schema, r),
        Some(Definition::Enum(e)) => Ok(Resolution::standalone(resolve_enum(e))),
        Some(Definition::Union(u)) => Ok(Resolution::standalone(resolve_union(u))),
        None => Err(Error::unknown(&FieldPath::root(name), name)),
    }
}

pub fn resolve_record(schema: &Schema, record: &RecordDef) -> Result<Resolution> {
    let options = &record.options;
    let root = FieldPath::root(&record.name);
    let mut acc = ProcessingResult::default();
    for (path, names) in &options.custom_imports {
        acc.imports.entry(path.clone()).or_default().extend(names.iter().cloned());
    }

    let mut fields: Vec<ProcessedField> = Vec::with_capacity(record.fields.len());
    for field in &record.fields {
        if options.omit.contains(&field.name) {
            continue;
        }
        let path = root.field(&field.name);
        if let Some(forced) = options.custom_ts_types.get(&field.name) {
            fields.push(ProcessedField { name: field.name.clone(), required: true, ty: forced.clone() });
            continue;
        }
        let descriptor = match record.hooks.representers.get(&field.name) {
            Some(custom) => {
                let returns = custom
                    .returns
                    .as_ref()
                    .ok_or_else(|| Error::FieldWithoutDefinition { path: path.clone() })?;
                TypeDescriptor::new(&field.name, returns)
            }
            None => field.descriptor(),
        };
        let processed = handler::resolve(descriptor, schema, &path)?.process()?;
        let optional = processed.optional;
        let ty = acc.absorb(processed);
        fields.push(ProcessedField { name: field.name.clone(), required: !optional, ty });
    }

    for (name, forced) in &options.custom_ts_fields {
        let processed = handler::resolve(TypeDescriptor::forced(name, forced), schema, &root.field(name))?.process()?;
        let field = ProcessedField { name: name.clone(), required: true, ty: acc.absorb(processed) };
        match fields.iter_mut().find(|f| f.name == *name) {
            Some(existing) => *existing = field,
            None => fields.push(field),
        }
    }

    debug!(record = %record.name, fields = fields.len(), deps = acc.dependencies.len(), "resolved record");
    acc.dependencies.shift_remove(&record.name);
    Ok(Resolution {
        declaration: Declaration {
            type_name: record.external_name().to_string(),
            body: DeclarationBody::Object { fields, compound: options.compound.clone() },
            additional_code: None,
        },
        dependencies: acc.dependencies,
        imports: acc.imports,
    })
}

pub fn resolve_enum(def: &EnumDef) -> Declaration {
    if def.export_values {
        let const_name = def.export_values_name.clone().unwrap_or_else(|| lower_first(&def.name));
        return Declaration {
            type_name: def.name.clone(),
            body: DeclarationBody::ConstValues { const_name, values: def.members.values().cloned().collect() },
            additional_code: None,
        };
    }
    let expr = def
        .members
        .values()
        .map(|lit| lit.to_json().to_string())
        .collect::<Vec<_>>()
        .join(" | ");
    Declaration::alias(&def.name, expr)
}

pub fn resolve_union(def: &UnionDef) -> Declaration {
    let mut decl = Declaration::alias(&def.name, def.members().join(" | "));
    let guards = def
        .differentiators
        .iter()
        .map(|d| format!("export function Is__{ty}(obj: {union}): obj is {ty} {{return ({check})(obj);}}",
            ty = d.ty, union = def.name, check = d.check))
        .collect::<Vec<_>>();
    let code = guards
        .into_iter()
        .chain(def.additional_code.clone())
        .collect::<Vec<_>>()
        .join("\n");
    decl.additional_code = (!code.is_empty()).then_some(code);
    decl
}

/// External type string of a standalone type expression.
pub fn type_string(schema: &Schema, ty: &TypeRef) -> Result<ProcessingResult> {
    let path = FieldPath::root(ty.to_string());
    handler::resolve(TypeDescriptor::new("type", ty), schema, &path)?.process()
}
