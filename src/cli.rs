//! CLI: schema documents → (generated type files | validated payloads | type strings)
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use tracing::{info, warn};

use crate::graph::ModuleGraph;
use crate::output::WriteOutcome;
use crate::schema::{Record, Schema};
use crate::settings::Settings;

// ————————————————————————————————————————————————————————————————————————————
// TYPES
// ————————————————————————————————————————————————————————————————————————————

/// generate external type declarations from record schemas, and validate payloads against them
#[derive(Parser, Debug)]
#[command(name = "typeshape", version)]
pub struct CommandLineInterface {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// write one file per output unit
    Generate(GenerateOut),
    /// load payloads through a record and report (or re-emit) the result
    Validate(ValidateRun),
    /// print the declaration of a record, or the external type of a type expression
    Types(TypesOut),
}

#[derive(Args, Debug, Clone)]
struct SchemaSettings {
    /// One or more schema documents. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    schema: Vec<String>,

    /// JSON settings file (output_path, import_root, default_folder, write_output)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
struct InputSettings {
    /// treat input as newline-delimited JSON (NDJSON)
    #[arg(long, default_value_t = false)]
    ndjson: bool,

    /// JQ pre-process filter for each document.
    #[arg(long)]
    jq_expr: Option<String>,

    /// One or more inputs. May be literal paths or quoted glob patterns
    #[arg(long, short, num_args = 1.., required = true)]
    input: Vec<String>,
}

#[derive(clap::Parser, Debug)]
struct GenerateOut {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    /// output directory; overrides `output_path` from the settings file
    #[arg(long)]
    out: Option<PathBuf>,

    /// print rendered files instead of writing them
    #[arg(long)]
    dry_run: bool,
}

#[derive(clap::Parser, Debug)]
struct ValidateRun {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    #[command(flatten)]
    input_settings: InputSettings,

    /// record every document is loaded as
    #[arg(long)]
    record: String,
}

#[derive(clap::Parser, Debug)]
struct TypesOut {
    #[command(flatten)]
    schema_settings: SchemaSettings,

    /// records whose declarations are printed
    #[arg(long, num_args = 1..)]
    record: Vec<String>,

    /// type expressions (e.g. "dict[str, list[User]]")
    #[arg(required_unless_present = "record")]
    types: Vec<String>,
}

// ————————————————————————————————————————————————————————————————————————————
// IMPLEMENTATION
// ————————————————————————————————————————————————————————————————————————————

impl SchemaSettings {
    fn load_schema(&self) -> anyhow::Result<Schema> {
        let files = resolve_file_path_patterns(&self.schema)?;
        let schema = crate::document::load_schema(&files)?;
        info!(files = files.len(), modules = schema.modules().len(), "schema loaded");
        Ok(schema)
    }

    fn load_settings(&self) -> anyhow::Result<Settings> {
        match &self.config {
            Some(path) => Settings::load(path),
            None => Ok(Settings::default()),
        }
    }
}

impl InputSettings {
    /// Calls `apply` with every document, labelled `file` or `file:line`.
    fn load_process(&self, mut apply: impl FnMut(&str, serde_json::Value)) -> anyhow::Result<()> {
        let source_paths = resolve_file_path_patterns(&self.input)?;
        let filter = self
            .jq_expr
            .as_deref()
            .map(crate::jq_exec::JqFilter::compile)
            .transpose()
            .context("invalid --jq-expr")?;
        for source_path in source_paths {
            let source_path_str = source_path.to_string_lossy().to_string();
            let source = std::fs::read_to_string(&source_path)
                .with_context(|| format!("failed to read source file {source_path_str}"))?;
            let documents: Vec<(String, &str)> = if self.ndjson {
                source
                    .lines()
                    .enumerate()
                    .filter(|(_, line)| !line.trim().is_empty())
                    .map(|(i, line)| (format!("{source_path_str}:{}", i + 1), line))
                    .collect()
            } else {
                vec![(source_path_str.clone(), source.as_str())]
            };
            for (label, text) in documents {
                let json_value = serde_json::from_str::<serde_json::Value>(text)
                    .with_context(|| format!("failed to parse JSON source ({label})"))?;
                match &filter {
                    None => apply(&label, json_value),
                    Some(filter) => {
                        let results = filter
                            .apply(&json_value)
                            .with_context(|| format!("failed to apply jq expression to {label}"))?;
                        for json_value in results {
                            apply(&label, json_value);
                        }
                    }
                }
            }
        }
        Ok(())
    }
}

impl CommandLineInterface {
    pub fn load() -> Self {
        Self::parse()
    }

    pub fn run(&self) -> anyhow::Result<()> {
        match &self.cmd {
            Command::Generate(target) => {
                let schema = target.schema_settings.load_schema()?;
                let mut settings = target.schema_settings.load_settings()?;
                if let Some(output_path) = target.out.clone() {
                    settings.output_path = output_path;
                }
                let write = settings.write_output && !target.dry_run;

                let mut graph = ModuleGraph::from_schema(&schema, settings);
                graph.digest()?;
                for file in graph.files() {
                    if !write {
                        println!("{}", format!("// --- {} ---", file.path.display()).dimmed());
                        print!("{}", file.render());
                        continue;
                    }
                    let outcome = file
                        .update()
                        .with_context(|| format!("failed to write {}", file.path.display()))?;
                    let status = match outcome {
                        WriteOutcome::Written => "written".green(),
                        WriteOutcome::Unchanged => "unchanged".dimmed(),
                    };
                    eprintln!("{status:>10} {}", file.path.display());
                }
                Ok(())
            }
            Command::Validate(target) => {
                let schema = target.schema_settings.load_schema()?;
                let Some(record) = schema.record(&target.record) else {
                    bail!("no record named `{}` in the schema", target.record);
                };
                let (mut passed, mut failed) = (0usize, 0usize);
                target.input_settings.load_process(|label, value| {
                    let outcome = record
                        .load(&schema, &value)
                        .and_then(|instance| record.represent(&schema, &instance));
                    match outcome {
                        Ok(represented) => {
                            passed += 1;
                            println!("{represented}");
                        }
                        Err(error) => {
                            failed += 1;
                            warn!(%label, %error, "document rejected");
                            eprintln!("{} {label}: {error}", "failed".red().bold());
                        }
                    }
                })?;
                eprintln!("{passed} passed, {failed} failed");
                if failed > 0 {
                    bail!("{failed} document(s) did not load as `{}`", target.record);
                }
                Ok(())
            }
            Command::Types(target) => {
                let schema = target.schema_settings.load_schema()?;
                for name in &target.record {
                    let Some(record) = schema.record(name) else {
                        bail!("no record named `{name}` in the schema");
                    };
                    let resolution = crate::resolve::resolve_record(&schema, record)?;
                    println!("{}", resolution.declaration.render());
                    for dep in &resolution.dependencies {
                        println!("{} {dep}", "// depends on".dimmed());
                    }
                }
                for src in &target.types {
                    let ty: crate::types::TypeRef = src.parse()?;
                    let result = crate::resolve::type_string(&schema, &ty)?;
                    let optional = if result.optional { " (optional)".dimmed().to_string() } else { String::new() };
                    println!("{}{optional}", result.type_string);
                }
                Ok(())
            }
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn resolve_file_path_patterns<I>(patterns: I) -> anyhow::Result<Vec<PathBuf>>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    fn has_glob_chars(s: &str) -> bool {
        // Minimal glob detection for the `glob` crate syntax.
        s.bytes().any(|b| matches!(b, b'*' | b'?' | b'[' | b'{'))
    }

    let mut out = Vec::<PathBuf>::new();

    for raw in patterns {
        let pattern = raw.as_ref();

        if has_glob_chars(pattern) {
            let mut matched_any = false;
            for entry in glob::glob(pattern)? {
                out.push(entry?);
                matched_any = true;
            }
            if !matched_any {
                // explicit glob matching nothing is an error, not an empty run
                bail!("glob pattern matched no files: {pattern}");
            }
        } else {
            out.push(PathBuf::from(pattern));
        }
    }

    Ok(out)
}
