use std::path::PathBuf;

use serde_json::json;
use typeshape::document::load_schema;
use typeshape::{generate, FieldDef, ModuleDef, RecordDef, Schema, Settings, TypeRef, WriteOutcome};

fn settings(root: &std::path::Path) -> Settings {
    Settings { output_path: root.join("generated"), ..Settings::default() }
}

fn module(name: &str, contents: &[&str]) -> ModuleDef {
    ModuleDef {
        name: name.into(),
        contents: contents.iter().map(|s| s.to_string()).collect(),
        ..ModuleDef::default()
    }
}

fn write_document(dir: &std::path::Path) -> PathBuf {
    let doc = json!({
        "modules": [
            {
                "name": "common",
                "enums": [{ "name": "Role", "members": { "Admin": "admin", "Guest": "guest" } }],
                "records": [{ "name": "Address", "fields": [{ "name": "city", "type": "str" }] }]
            },
            {
                "name": "users",
                "records": [{
                    "name": "User",
                    "fields": [
                        { "name": "id", "type": "int" },
                        { "name": "role", "type": "Role" },
                        { "name": "home", "type": "Address" },
                        { "name": "work", "type": "Optional[Address]" },
                        { "name": "visited", "type": "list[Address]" }
                    ]
                }]
            }
        ]
    });
    let path = dir.join("schema.json");
    std::fs::write(&path, serde_json::to_string_pretty(&doc).unwrap()).unwrap();
    path
}

#[test]
fn regenerating_identical_input_leaves_files_alone() {
    let dir = tempfile::tempdir().unwrap();
    let schema = load_schema(&[write_document(dir.path())]).unwrap();
    let settings = settings(dir.path());

    let first = generate(&schema, &settings).unwrap();
    let outcomes: Vec<_> = first.iter().map(|f| f.update().unwrap()).collect();
    assert_eq!(outcomes, vec![WriteOutcome::Written, WriteOutcome::Written]);

    let second = generate(&schema, &settings).unwrap();
    let outcomes: Vec<_> = second.iter().map(|f| f.update().unwrap()).collect();
    assert_eq!(outcomes, vec![WriteOutcome::Unchanged, WriteOutcome::Unchanged]);
}

#[test]
fn header_edits_alone_do_not_trigger_a_write() {
    let dir = tempfile::tempdir().unwrap();
    let schema = load_schema(&[write_document(dir.path())]).unwrap();
    let files = generate(&schema, &settings(dir.path())).unwrap();
    let users = &files[1];
    users.update().unwrap();

    let on_disk = std::fs::read_to_string(&users.path).unwrap();
    let edited = on_disk.replacen("// ALL CHANGES WILL BE LOST", "// edited by hand", 1);
    std::fs::write(&users.path, &edited).unwrap();
    assert_eq!(users.update().unwrap(), WriteOutcome::Unchanged);
    assert_eq!(std::fs::read_to_string(&users.path).unwrap(), edited);

    std::fs::write(&users.path, edited.replace("id: number", "id: string")).unwrap();
    assert_eq!(users.update().unwrap(), WriteOutcome::Written);
    assert_eq!(std::fs::read_to_string(&users.path).unwrap(), users.render());
}

#[test]
fn files_land_under_the_output_path() {
    let dir = tempfile::tempdir().unwrap();
    let schema = load_schema(&[write_document(dir.path())]).unwrap();
    let files = generate(&schema, &settings(dir.path())).unwrap();
    let paths: Vec<_> = files.iter().map(|f| f.path.clone()).collect();
    assert_eq!(paths, vec![
        dir.path().join("generated/common.ts"),
        dir.path().join("generated/users.ts"),
    ]);
    assert!(files[1].render().starts_with("// This file is generated automatically!"));
    assert!(files[1].render().ends_with("};\n"));
}

#[test]
fn a_type_owned_elsewhere_is_imported_once() {
    let dir = tempfile::tempdir().unwrap();
    let schema = load_schema(&[write_document(dir.path())]).unwrap();
    let files = generate(&schema, &settings(dir.path())).unwrap();
    let users = files[1].code();
    assert_eq!(users.matches("import { Address, Role } from \"@/common\";").count(), 1);
    assert!(!users.contains("export type Address"));
    assert!(users.contains("    work?: Address,"));
    assert!(users.contains("    visited: Address[],"));
}

#[test]
fn an_unowned_dependency_is_embedded_once() {
    let mut schema = Schema::from_parts(
        vec![],
        vec![
            RecordDef::new("Point").field(FieldDef::new("x", TypeRef::Float)),
            RecordDef::new("Path")
                .field(FieldDef::new("start", TypeRef::named("Point")))
                .field(FieldDef::new("end", TypeRef::named("Point")))
                .field(FieldDef::new("via", TypeRef::list(TypeRef::named("Point")))),
        ],
    )
    .unwrap();
    schema.add_module(module("shapes", &["Path"])).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let files = generate(&schema, &settings(dir.path())).unwrap();
    let code = files[0].code();
    assert_eq!(code.matches("export type Point = {").count(), 1);
    // dependencies are declared before their dependents
    assert!(code.find("export type Point").unwrap() < code.find("export type Path").unwrap());
    assert!(!code.contains("import"));
}

#[test]
fn standalone_units_embed_everything() {
    let dir = tempfile::tempdir().unwrap();
    let mut schema = load_schema(&[write_document(dir.path())]).unwrap();
    schema
        .add_module(ModuleDef { standalone: true, ..module("bundle", &["User"]) })
        .unwrap();
    let files = generate(&schema, &settings(dir.path())).unwrap();
    let bundle = files.iter().find(|f| f.path.ends_with("bundle.ts")).unwrap().code();
    assert!(!bundle.contains("import"));
    for name in ["Role", "Address", "User"] {
        assert_eq!(bundle.matches(&format!("export type {name} =")).count(), 1, "{name}");
    }
}
