//! Schema-driven records: validate JSON input into typed values, represent
//! them back, and generate external type declarations grouped into files.
//!
//! ```text
//! Schema ──► FieldHandler ──► load / represent / process
//!    │                                        │
//!    └────► ModuleGraph ──► OutputUnit ──► OutputFile (idempotent write)
//! ```
pub mod cli;
pub mod datetime;
pub mod declaration;
pub mod descriptor;
pub mod document;
pub mod error;
pub mod graph;
pub mod handler;
pub mod jq_exec;
pub mod output;
pub mod path_de;
pub mod record;
pub mod resolve;
pub mod schema;
pub mod settings;
pub mod types;
pub mod value;

pub use error::{Error, FieldPath, LoadError, LoadErrorKind, Result};
pub use graph::{ModuleGraph, OutputUnit};
pub use handler::{FieldHandler, HandlerKind, ProcessingResult};
pub use output::{OutputFile, WriteOutcome};
pub use schema::{EnumDef, FieldDef, FieldDefault, ModuleDef, Record, RecordDef, RecordOptions, Schema, UnionDef};
pub use settings::Settings;
pub use types::TypeRef;
pub use value::{Instance, Value};

/// Digests every module of `schema` and returns the files it would produce.
pub fn generate(schema: &Schema, settings: &Settings) -> Result<Vec<OutputFile>> {
    let mut graph = ModuleGraph::from_schema(schema, settings.clone());
    graph.digest()?;
    Ok(graph.files())
}
