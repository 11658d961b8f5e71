//! `jaq` pre-filter for validation input: one compiled filter, many documents.
use anyhow::{anyhow, Context, Result};
use jaq_core::{compile::Undefined, load, Compiler, Ctx, Native, RcIter};
use jaq_json::Val;
use serde_json::Value;

type Filter = jaq_core::Filter<Native<Val>>;

pub struct JqFilter {
    source: String,
    filter: Filter,
}

impl std::fmt::Debug for JqFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JqFilter").field("source", &self.source).finish_non_exhaustive()
    }
}

impl JqFilter {
    pub fn compile(source: &str) -> Result<Self> {
        let loader = load::Loader::new(jaq_std::defs().chain(jaq_json::defs()));
        let arena = load::Arena::default();
        let modules = loader
            .load(&arena, load::File { code: source, path: () })
            .map_err(parse_errors)?;
        let filter = Compiler::default()
            .with_funs(jaq_std::funs().chain(jaq_json::funs()))
            .compile(modules)
            .map_err(undefined_errors)?;
        Ok(Self { source: source.to_string(), filter })
    }

    /// Every output of the filter becomes its own document.
    pub fn apply(&self, input: &Value) -> Result<Vec<Value>> {
        let inputs = RcIter::new(core::iter::empty());
        let outputs = self.filter.run((Ctx::new([], &inputs), Val::from(input.clone())));
        outputs
            .map(|item| {
                let val = item.map_err(|e| anyhow!("`{}` failed: {e:?}", self.source))?;
                // Val displays as JSON text
                serde_json::from_str(&val.to_string())
                    .with_context(|| format!("`{}` produced a non-JSON value: {val}", self.source))
            })
            .collect()
    }
}

fn parse_errors(errs: Vec<(load::File<&str, ()>, load::Error<&str>)>) -> anyhow::Error {
    let lines: Vec<String> = errs
        .into_iter()
        .map(|(file, err)| format!("cannot parse jq filter `{}`: {err:?}", file.code))
        .collect();
    anyhow!(lines.join("\n"))
}

fn undefined_errors(errs: Vec<(load::File<&str, ()>, Vec<(&str, Undefined)>)>) -> anyhow::Error {
    let lines: Vec<String> = errs
        .into_iter()
        .flat_map(|(file, list)| {
            list.into_iter()
                .map(move |(name, undef)| format!("jq filter `{}` uses undefined `{name}` ({undef:?})", file.code))
        })
        .collect();
    anyhow!(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filter_fans_out_into_documents() {
        let input = json!({"items": [{"id": 1}, {"id": 2}]});
        let out = JqFilter::compile(".items[]").unwrap().apply(&input).unwrap();
        assert_eq!(out, vec![json!({"id": 1}), json!({"id": 2})]);
    }

    #[test]
    fn a_compiled_filter_is_reused() {
        let filter = JqFilter::compile(".user").unwrap();
        assert_eq!(filter.apply(&json!({"user": {"id": 1}})).unwrap(), vec![json!({"id": 1})]);
        assert_eq!(filter.apply(&json!({})).unwrap(), vec![json!(null)]);
    }

    #[test]
    fn unknown_functions_are_reported() {
        let err = JqFilter::compile("nosuchfn").unwrap_err();
        assert!(err.to_string().contains("nosuchfn"), "{err}");
    }
}
