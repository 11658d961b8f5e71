//! Error taxonomy shared by load, represent and type resolution.
//!
//! - [`LoadError`]: input does not fit the declared type. Recoverable; union
//!   arms catch it and move on to the next arm.
//! - [`Error::UnknownFieldType`] / [`Error::Configuration`]: the schema itself
//!   is defective. Raised while building handlers, before any input is read.
//! - [`Error::FieldWithoutDefinition`]: a custom representer has no declared
//!   return type, so the field's external type cannot be derived.
use std::fmt;

/// Location of a value inside a record graph, rendered as `User.items[2].name`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath(Vec<String>);

impl FieldPath {
    pub fn root(name: impl Into<String>) -> Self {
        Self(vec![name.into()])
    }
    pub fn field(&self, name: &str) -> Self {
        let mut out = self.clone();
        out.0.push(name.to_string());
        out
    }
    pub fn index(&self, index: usize) -> Self {
        let mut out = self.clone();
        out.0.push(format!("[{index}]"));
        out
    }
    pub fn key(&self, key: &str) -> Self {
        let mut out = self.clone();
        out.0.push(format!("[{key}]"));
        out
    }
    pub fn segments(&self) -> &[String] {
        &self.0
    }
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("<root>");
        }
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 && !segment.starts_with('[') {
                f.write_str(".")?;
            }
            f.write_str(segment)?;
        }
        Ok(())
    }
}

/// Input failed validation against its declared type.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{path}: {kind}")]
pub struct LoadError {
    pub path: FieldPath,
    pub kind: LoadErrorKind,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LoadErrorKind {
    #[error("type mismatch: {found} is not a {expected}")]
    TypeMismatch { expected: String, found: String },
    #[error("length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
    #[error("value error: {value} is not a {expected}")]
    InvalidValue { value: String, expected: String },
    #[error("type mismatch: key {key} is not {expected}")]
    KeyMismatch { key: String, expected: String },
    #[error("type mismatch: {found} is not in Union[{}]", .arms.join(", "))]
    NoMatchingArm { found: String, arms: Vec<String> },
    #[error("{0}")]
    Custom(String),
}

impl LoadError {
    pub fn new(path: &FieldPath, kind: LoadErrorKind) -> Self {
        Self { path: path.clone(), kind }
    }

    pub fn mismatch(path: &FieldPath, expected: impl Into<String>, found: impl Into<String>) -> Self {
        Self::new(path, LoadErrorKind::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        })
    }

    pub fn custom(path: &FieldPath, message: impl Into<String>) -> Self {
        Self::new(path, LoadErrorKind::Custom(message.into()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("unknown field type: {path}: {ty}")]
    UnknownFieldType { path: FieldPath, ty: String },
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("define a return type for the custom representer of {path}")]
    FieldWithoutDefinition { path: FieldPath },
}

impl Error {
    pub fn unknown(path: &FieldPath, ty: impl fmt::Display) -> Self {
        Self::UnknownFieldType { path: path.clone(), ty: ty.to_string() }
    }

    pub fn as_load(&self) -> Option<&LoadError> {
        match self {
            Error::Load(error) => Some(error),
            _ => None,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_renders_fields_and_indices() {
        let path = FieldPath::root("User").field("items").index(2).field("name");
        assert_eq!(path.to_string(), "User.items[2].name");
        assert_eq!(path.last(), Some("name"));
    }

    #[test]
    fn union_error_lists_every_arm() {
        let err = LoadError::new(&FieldPath::root("Shape").field("size"), LoadErrorKind::NoMatchingArm {
            found: "string".into(),
            arms: vec!["int".into(), "bool".into()],
        });
        assert_eq!(
            err.to_string(),
            "Shape.size: type mismatch: string is not in Union[int, bool]"
        );
    }
}
