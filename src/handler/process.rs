use indexmap::{IndexMap, IndexSet};

use super::{FieldHandler, HandlerKind};
use crate::error::{Error, Result};
use crate::schema::Record;
use crate::types::TypeRef;

/// External type of one field, plus what it pulls in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProcessingResult {
    pub type_string: String,
    /// a `None` union arm was present
    pub optional: bool,
    /// schema names of records and enums the type refers to
    pub dependencies: IndexSet<String>,
    /// import path -> names
    pub imports: IndexMap<String, IndexSet<String>>,
}

impl ProcessingResult {
    fn plain(type_string: impl Into<String>) -> Self {
        Self { type_string: type_string.into(), ..Self::default() }
    }

    fn depending_on(type_string: impl Into<String>, dependency: &str) -> Self {
        let mut out = Self::plain(type_string);
        out.dependencies.insert(dependency.to_string());
        out
    }

    /// Folds a child's dependencies and imports into `self`, handing back its type.
    pub fn absorb(&mut self, child: ProcessingResult) -> String {
        self.dependencies.extend(child.dependencies);
        for (path, names) in child.imports {
            self.imports.entry(path).or_default().extend(names);
        }
        child.type_string
    }
}

impl FieldHandler<'_> {
    /// Derives the external type. Each nested call builds its own result and
    /// the parent absorbs it.
    pub fn process(&self) -> Result<ProcessingResult> {
        let result = match self.kind {
            HandlerKind::Forced => ProcessingResult::plain(self.descriptor.forced_type.clone().unwrap_or_default()),
            HandlerKind::Any => ProcessingResult::plain("any"),
            HandlerKind::RawMap => ProcessingResult::plain("Record<string, any>"),
            HandlerKind::String | HandlerKind::Date => ProcessingResult::plain("string"),
            HandlerKind::Number | HandlerKind::Decimal => ProcessingResult::plain("number"),
            HandlerKind::Boolean => ProcessingResult::plain("boolean"),
            HandlerKind::Union => self.process_union()?,
            HandlerKind::List => {
                let mut out = ProcessingResult::default();
                let item = out.absorb(self.child(self.arg(0)?, self.path.key("item"))?.process()?);
                out.type_string = if item.contains('|') { format!("({item})[]") } else { format!("{item}[]") };
                out
            }
            HandlerKind::Tuple => {
                let mut out = ProcessingResult::default();
                let mut parts = Vec::with_capacity(self.descriptor.generic_args.len());
                for (i, ty) in self.descriptor.generic_args.iter().enumerate() {
                    parts.push(out.absorb(self.child(ty, self.path.index(i))?.process()?));
                }
                out.type_string = format!("[{}]", parts.join(", "));
                out
            }
            HandlerKind::TypedMap => {
                let mut out = ProcessingResult::default();
                let key = out.absorb(self.child(self.arg(0)?, self.path.key("key"))?.process()?);
                let value = out.absorb(self.child(self.arg(1)?, self.path.key("value"))?.process()?);
                out.type_string = format!("Record<{key}, {value}>");
                out
            }
            HandlerKind::Enum => match &self.descriptor.declared_type {
                TypeRef::Named(name) => ProcessingResult::depending_on(name.as_str(), name),
                other => return Err(Error::unknown(&self.path, other)),
            },
            HandlerKind::ForwardReference | HandlerKind::NestedRecord => {
                let record = self.record()?;
                ProcessingResult::depending_on(record.external_name(), record.name())
            }
            HandlerKind::PartialRecord => {
                let record = self.record()?;
                ProcessingResult::depending_on(format!("Partial<{}>", record.external_name()), record.name())
            }
        };
        Ok(result)
    }

    /// Arms are de-duplicated by external type and sorted; `None` only marks
    /// the result optional.
    fn process_union(&self) -> Result<ProcessingResult> {
        let mut out = ProcessingResult::default();
        let mut arms: Vec<String> = Vec::new();
        for (i, ty) in self.descriptor.generic_args.iter().enumerate() {
            if *ty == TypeRef::NoneType {
                out.optional = true;
                continue;
            }
            let arm = out.absorb(self.child(ty, self.path.index(i))?.process()?);
            if !arms.contains(&arm) {
                arms.push(arm);
            }
        }
        arms.sort();
        out.type_string = arms.join(" | ");
        Ok(out)
    }
}
