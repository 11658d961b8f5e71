//! Rendered external type declarations.
use std::fmt::Write as _;

use crate::value::EnumLiteral;

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedField {
    pub name: String,
    pub required: bool,
    pub ty: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeclarationBody {
    /// `export type Name = expr;`
    Alias(String),
    /// object type, optionally intersected with `compound` types
    Object { fields: Vec<ProcessedField>, compound: Vec<String> },
    /// value list exported as a constant, type derived from it
    ConstValues { const_name: String, values: Vec<EnumLiteral> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    /// external name
    pub type_name: String,
    pub body: DeclarationBody,
    pub additional_code: Option<String>,
}

impl Declaration {
    pub fn alias(type_name: impl Into<String>, expr: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            body: DeclarationBody::Alias(expr.into()),
            additional_code: None,
        }
    }

    pub fn render(&self) -> String {
        let name = &self.type_name;
        let mut out = String::new();
        match &self.body {
            DeclarationBody::Alias(expr) => {
                let _ = write!(out, "export type {name} = {expr};");
            }
            DeclarationBody::ConstValues { const_name, values } => {
                let list = values.iter().map(|v| v.to_json().to_string()).collect::<Vec<_>>().join(", ");
                let _ = writeln!(out, "export const {const_name} = [{list}] as const;");
                let _ = write!(out, "export type {name} = typeof {const_name}[number];");
            }
            DeclarationBody::Object { fields, compound } => {
                let compound: String = compound.iter().map(|c| format!("{c} & ")).collect();
                let _ = writeln!(out, "export type {name} = {compound}{{");
                for field in fields {
                    let mark = if field.required { "" } else { "?" };
                    let _ = writeln!(out, "    {}{mark}: {},", field.name, field.ty);
                }
                out.push_str("};");
            }
        }
        if let Some(code) = self.additional_code.as_deref().filter(|c| !c.is_empty()) {
            out.push('\n');
            out.push_str(code);
        }
        out
    }
}

/// `Status` -> `status`
pub fn lower_first(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_declaration_layout() {
        let decl = Declaration {
            type_name: "User".into(),
            body: DeclarationBody::Object {
                fields: vec![
                    ProcessedField { name: "id".into(), required: true, ty: "number".into() },
                    ProcessedField { name: "nick".into(), required: false, ty: "string".into() },
                ],
                compound: vec!["Base".into(), "Audit".into()],
            },
            additional_code: None,
        };
        assert_eq!(
            decl.render(),
            "export type User = Base & Audit & {\n    id: number,\n    nick?: string,\n};"
        );
    }

    #[test]
    fn const_values_declaration() {
        let decl = Declaration {
            type_name: "Color".into(),
            body: DeclarationBody::ConstValues {
                const_name: lower_first("Color"),
                values: vec![EnumLiteral::Str("red".into()), EnumLiteral::Str("blue".into())],
            },
            additional_code: None,
        };
        assert_eq!(
            decl.render(),
            "export const color = [\"red\", \"blue\"] as const;\nexport type Color = typeof color[number];"
        );
    }

    #[test]
    fn additional_code_follows_the_declaration() {
        let mut decl = Declaration::alias("Shape", "Circle | Square");
        decl.additional_code = Some("export const x = 1;".into());
        assert_eq!(decl.render(), "export type Shape = Circle | Square;\nexport const x = 1;");
    }
}
