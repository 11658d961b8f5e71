//! Output units and the ownership graph between them.
//!
//! Every exported type is owned by the first unit that lists it. While a unit
//! is digested, each dependency either becomes an import edge (owned
//! elsewhere) or is embedded in the unit itself, at most once per unit.
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::PathBuf;

use indexmap::IndexMap;
use tracing::{debug, info_span};

use crate::declaration::Declaration;
use crate::error::Result;
use crate::output::OutputFile;
use crate::resolve::resolve_type;
use crate::schema::{ModuleDef, Schema};
use crate::settings::Settings;

#[derive(Debug, Clone)]
pub struct OutputUnit {
    pub key: String,
    pub name: String,
    pub prefix: String,
    pub custom_path: Option<PathBuf>,
    pub standalone: bool,
    pub contents: Vec<String>,
    import_path: String,
    /// owned types pulled from other units: import path -> external names
    imports: IndexMap<String, BTreeSet<String>>,
    /// custom import directives collected from records
    additional_imports: IndexMap<String, BTreeSet<String>>,
    declarations: Vec<Declaration>,
    already_processed: HashSet<String>,
}

/// Who owns what; read-only while units are digested.
#[derive(Debug, Default)]
struct Ownership {
    /// type name -> unit key
    owners: HashMap<String, String>,
    /// unit key -> import path
    import_paths: HashMap<String, String>,
}

impl Ownership {
    /// Import path of the unit owning `type_name`, unless that unit is `unit_key`.
    fn foreign_owner(&self, type_name: &str, unit_key: &str) -> Option<&str> {
        let owner = self.owners.get(type_name)?;
        if owner == unit_key {
            return None;
        }
        self.import_paths.get(owner).map(String::as_str)
    }
}

#[derive(Debug)]
pub struct ModuleGraph<'s> {
    schema: &'s Schema,
    settings: Settings,
    units: IndexMap<String, OutputUnit>,
    ownership: Ownership,
}

impl<'s> ModuleGraph<'s> {
    pub fn new(schema: &'s Schema, settings: Settings) -> Self {
        Self { schema, settings, units: IndexMap::new(), ownership: Ownership::default() }
    }

    /// Registers every module declared in the schema, in order.
    pub fn from_schema(schema: &'s Schema, settings: Settings) -> Self {
        let mut graph = Self::new(schema, settings);
        for module in schema.modules() {
            graph.add_unit(module);
        }
        graph
    }

    /// Registers a unit and claims its contents. A second unit under an
    /// existing key is ignored, as is a claim on an already-owned type.
    pub fn add_unit(&mut self, module: &ModuleDef) -> &str {
        let key = self.settings.unit_key(&module.prefix, &module.name);
        if !self.units.contains_key(&key) {
            let import_path = self.settings.import_path(&module.prefix, &module.name);
            self.ownership.import_paths.insert(key.clone(), import_path.clone());
            self.units.insert(key.clone(), OutputUnit {
                key: key.clone(),
                name: module.name.clone(),
                prefix: module.prefix.clone(),
                custom_path: module.path.clone(),
                standalone: module.standalone || module.path.is_some(),
                contents: Vec::new(),
                import_path,
                imports: IndexMap::new(),
                additional_imports: IndexMap::new(),
                declarations: Vec::new(),
                already_processed: HashSet::new(),
            });
        }
        for name in &module.contents {
            if self.schema.is_exported(name) {
                self.ownership.owners.entry(name.clone()).or_insert_with(|| key.clone());
            }
        }
        if let Some(unit) = self.units.get_mut(&key) {
            unit.contents.extend(module.contents.iter().cloned());
        }
        &self.units[&key].key
    }

    pub fn owner_of(&self, type_name: &str) -> Option<&OutputUnit> {
        self.ownership.owners.get(type_name).and_then(|key| self.units.get(key))
    }

    pub fn units(&self) -> impl Iterator<Item = &OutputUnit> {
        self.units.values()
    }

    /// Resolves every unit's contents into declarations and import edges.
    pub fn digest(&mut self) -> Result<()> {
        for unit in self.units.values_mut() {
            let _span = info_span!("digest", unit = %unit.key).entered();
            for name in unit.contents.clone() {
                unit.emit(self.schema, &self.ownership, &name)?;
            }
            debug!(declarations = unit.declarations.len(), imports = unit.imports.len(), "digested");
        }
        Ok(())
    }

    pub fn files(&self) -> Vec<OutputFile> {
        self.units.values().map(|u| u.to_file(&self.settings)).collect()
    }
}

impl OutputUnit {
    fn emit(&mut self, schema: &Schema, ownership: &Ownership, name: &str) -> Result<()> {
        if !self.already_processed.insert(name.to_string()) {
            return Ok(());
        }
        let resolution = resolve_type(schema, name)?;
        for (path, names) in resolution.imports {
            self.additional_imports.entry(path).or_default().extend(names);
        }
        for dep in &resolution.dependencies {
            match ownership.foreign_owner(dep, &self.key).filter(|_| !self.standalone) {
                Some(path) => self.import(path, schema.external_name(dep)),
                None => self.emit(schema, ownership, dep)?,
            }
        }
        match ownership.foreign_owner(name, &self.key).filter(|_| !self.standalone) {
            Some(path) => self.import(path, schema.external_name(name)),
            None => self.declarations.push(resolution.declaration),
        }
        Ok(())
    }

    fn import(&mut self, path: &str, name: &str) {
        self.imports.entry(path.to_string()).or_default().insert(name.to_string());
    }

    pub fn import_path(&self) -> &str {
        &self.import_path
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    /// Import edges to other units, by import path.
    pub fn imports(&self) -> &IndexMap<String, BTreeSet<String>> {
        &self.imports
    }

    pub fn file_path(&self, settings: &Settings) -> PathBuf {
        let file = format!("{}{}.ts", self.prefix, self.name);
        match &self.custom_path {
            Some(dir) => dir.join(file),
            None => settings.output_path.join(format!("{}{file}", settings.default_folder)),
        }
    }

    /// Standalone units (any unit with a custom path) carry no import section.
    fn import_section(&self) -> String {
        if self.standalone {
            return String::new();
        }
        let mut merged: IndexMap<&str, BTreeSet<&str>> = IndexMap::new();
        for (path, names) in self.additional_imports.iter().chain(&self.imports) {
            merged.entry(path.as_str()).or_default().extend(names.iter().map(String::as_str));
        }
        merged
            .iter()
            .map(|(path, names)| {
                let names = names.iter().copied().collect::<Vec<_>>().join(", ");
                format!("import {{ {names} }} from \"{path}\";")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn to_file(&self, settings: &Settings) -> OutputFile {
        let body = self.declarations.iter().map(Declaration::render).collect::<Vec<_>>().join("\n\n");
        OutputFile::new(self.file_path(settings), vec![self.import_section(), body])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EnumDef, FieldDef, RecordDef, RecordOptions};
    use crate::types::TypeRef;

    fn module(name: &str, contents: &[&str]) -> ModuleDef {
        ModuleDef {
            name: name.into(),
            contents: contents.iter().map(|s| s.to_string()).collect(),
            ..ModuleDef::default()
        }
    }

    fn schema() -> Schema {
        let hidden = RecordOptions { export: false, ..RecordOptions::default() };
        let mut schema = Schema::from_parts(
            vec![EnumDef::new("Role").member("Admin", "admin")],
            vec![
                RecordDef::new("Address").field(FieldDef::new("city", TypeRef::Str)),
                RecordDef::new("Stamp").field(FieldDef::new("at", TypeRef::DateTime)).with_options(hidden),
                RecordDef::new("User")
                    .field(FieldDef::new("role", TypeRef::named("Role")))
                    .field(FieldDef::new("home", TypeRef::named("Address")))
                    .field(FieldDef::new("work", TypeRef::optional(TypeRef::named("Address"))))
                    .field(FieldDef::new("created", TypeRef::named("Stamp"))),
            ],
        )
        .unwrap();
        schema.add_module(module("common", &["Role", "Address", "Stamp"])).unwrap();
        schema.add_module(module("users", &["User", "Address"])).unwrap();
        schema
    }

    #[test]
    fn first_unit_to_list_a_type_owns_it() {
        let schema = schema();
        let graph = ModuleGraph::from_schema(&schema, Settings::default());
        assert_eq!(graph.owner_of("Address").map(|u| u.name.as_str()), Some("common"));
        assert_eq!(graph.owner_of("User").map(|u| u.name.as_str()), Some("users"));
        // not exported: nobody owns it
        assert!(graph.owner_of("Stamp").is_none());
    }

    #[test]
    fn foreign_dependencies_are_imported_once() {
        let schema = schema();
        let mut graph = ModuleGraph::from_schema(&schema, Settings::default());
        graph.digest().unwrap();
        let users = graph.units().find(|u| u.name == "users").unwrap();
        let names: Vec<_> = users.imports()["@/common"].iter().cloned().collect();
        assert_eq!(names, vec!["Address", "Role"]);
        // the unexported record is embedded, the owned one declared
        let declared: Vec<_> = users.declarations().iter().map(|d| d.type_name.as_str()).collect();
        assert_eq!(declared, vec!["Stamp", "User"]);
    }

    #[test]
    fn standalone_units_embed_everything() {
        let mut schema = schema();
        schema
            .add_module(ModuleDef { standalone: true, path: Some("out".into()), ..module("bundle", &["User"]) })
            .unwrap();
        let mut graph = ModuleGraph::from_schema(&schema, Settings::default());
        graph.digest().unwrap();
        let bundle = graph.units().find(|u| u.name == "bundle").unwrap();
        assert!(bundle.imports().is_empty());
        let declared: Vec<_> = bundle.declarations().iter().map(|d| d.type_name.as_str()).collect();
        assert_eq!(declared, vec!["Role", "Address", "Stamp", "User"]);
        assert_eq!(bundle.file_path(&Settings::default()), PathBuf::from("out/bundle.ts"));
    }

    #[test]
    fn rendered_unit_starts_with_sorted_imports() {
        let schema = schema();
        let mut graph = ModuleGraph::from_schema(&schema, Settings::default());
        graph.digest().unwrap();
        let file = graph.files().into_iter().find(|f| f.path.ends_with("users.ts")).unwrap();
        assert!(file.code().starts_with("import { Address, Role } from \"@/common\";\n\nexport type Stamp = {"));
        assert_eq!(file.path, PathBuf::from("generated/users.ts"));
    }

    #[test]
    fn custom_imports_share_a_line_with_owned_imports() {
        let extra = RecordOptions {
            custom_imports: IndexMap::from([("@/common".to_string(), vec!["Shared".to_string()])]),
            ..RecordOptions::default()
        };
        let mut schema = Schema::from_parts(
            vec![EnumDef::new("Role").member("Admin", "admin")],
            vec![RecordDef::new("User").field(FieldDef::new("role", TypeRef::named("Role"))).with_options(extra)],
        )
        .unwrap();
        schema.add_module(module("common", &["Role"])).unwrap();
        schema.add_module(module("users", &["User"])).unwrap();
        let mut graph = ModuleGraph::from_schema(&schema, Settings::default());
        graph.digest().unwrap();
        let file = graph.files().into_iter().find(|f| f.path.ends_with("users.ts")).unwrap();
        let code = file.code();
        assert_eq!(code.matches("from \"@/common\"").count(), 1, "{code}");
        assert!(code.starts_with("import { Role, Shared } from \"@/common\";"));
    }
}
