//! Declared field types. No `serde_json::Value` here.
//!
//! A [`TypeRef`] is the closed description of what a field was declared as.
//! Schema documents spell it in a compact textual form:
//!
//! ```text
//! str | int | float | bool | decimal | date | datetime | Any | dict | None
//! list[T]  tuple[A, B]  dict[K, V]  Optional[T]  Union[A, B]  A | B
//! Partial[Record]  Record  'Record'   (quoted = forward reference)
//! ```
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum TypeRef {
    Any,
    Str,
    Int,
    Float,
    Bool,
    Decimal,
    Date,
    DateTime,
    /// untyped `dict`
    RawMap,
    /// the `None` arm of an optional
    NoneType,
    List(Box<TypeRef>),
    Tuple(Vec<TypeRef>),
    Dict(Box<TypeRef>, Box<TypeRef>),
    Union(Vec<TypeRef>),
    /// Arity is checked at dispatch, not here, so a bad `Partial[...]` is a
    /// configuration error rather than a parse error.
    Partial(Vec<TypeRef>),
    /// a record or an enum, looked up in the schema
    Named(String),
    ForwardRef(String),
}

impl TypeRef {
    pub fn list(item: TypeRef) -> Self {
        TypeRef::List(Box::new(item))
    }
    pub fn dict(key: TypeRef, value: TypeRef) -> Self {
        TypeRef::Dict(Box::new(key), Box::new(value))
    }
    pub fn optional(inner: TypeRef) -> Self {
        TypeRef::union(vec![inner, TypeRef::NoneType])
    }
    /// Nested unions are spliced in, repeated arms dropped; one arm is just that arm.
    pub fn union(arms: Vec<TypeRef>) -> Self {
        let mut flat: Vec<TypeRef> = Vec::with_capacity(arms.len());
        for arm in arms {
            let nested = match arm {
                TypeRef::Union(inner) => inner,
                other => vec![other],
            };
            for ty in nested {
                if !flat.contains(&ty) {
                    flat.push(ty);
                }
            }
        }
        if flat.len() == 1 {
            return flat.remove(0);
        }
        TypeRef::Union(flat)
    }
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Named(name.into())
    }
    pub fn forward(name: impl Into<String>) -> Self {
        TypeRef::ForwardRef(name.into())
    }
    pub fn partial(name: impl Into<String>) -> Self {
        TypeRef::Partial(vec![TypeRef::Named(name.into())])
    }

    /// A union with a `None` arm.
    pub fn is_optional(&self) -> bool {
        matches!(self, TypeRef::Union(arms) if arms.contains(&TypeRef::NoneType))
    }

    /// Union arms minus `None`; a non-union is its own single arm.
    pub fn non_null_arms(&self) -> Vec<&TypeRef> {
        match self {
            TypeRef::Union(arms) => arms.iter().filter(|t| **t != TypeRef::NoneType).collect(),
            other => vec![other],
        }
    }

    /// Nested type references, in declaration order.
    pub fn args(&self) -> Vec<TypeRef> {
        match self {
            TypeRef::List(item) => vec![(**item).clone()],
            TypeRef::Dict(k, v) => vec![(**k).clone(), (**v).clone()],
            TypeRef::Tuple(xs) | TypeRef::Union(xs) | TypeRef::Partial(xs) => xs.clone(),
            _ => Vec::new(),
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(xs: &[TypeRef], sep: &str) -> String {
            xs.iter().map(ToString::to_string).collect::<Vec<_>>().join(sep)
        }
        match self {
            TypeRef::Any => f.write_str("Any"),
            TypeRef::Str => f.write_str("str"),
            TypeRef::Int => f.write_str("int"),
            TypeRef::Float => f.write_str("float"),
            TypeRef::Bool => f.write_str("bool"),
            TypeRef::Decimal => f.write_str("decimal"),
            TypeRef::Date => f.write_str("date"),
            TypeRef::DateTime => f.write_str("datetime"),
            TypeRef::RawMap => f.write_str("dict"),
            TypeRef::NoneType => f.write_str("None"),
            TypeRef::List(item) => write!(f, "list[{item}]"),
            TypeRef::Tuple(xs) => write!(f, "tuple[{}]", join(xs, ", ")),
            TypeRef::Dict(k, v) => write!(f, "dict[{k}, {v}]"),
            TypeRef::Union(xs) => write!(f, "Union[{}]", join(xs, ", ")),
            TypeRef::Partial(xs) => write!(f, "Partial[{}]", join(xs, ", ")),
            TypeRef::Named(name) => f.write_str(name),
            TypeRef::ForwardRef(name) => write!(f, "'{name}'"),
        }
    }
}

impl From<TypeRef> for String {
    fn from(value: TypeRef) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for TypeRef {
    type Error = TypeParseError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl FromStr for TypeRef {
    type Err = TypeParseError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parser = Parser { src: s, pos: 0 };
        let ty = parser.expr()?;
        parser.skip_ws();
        if parser.pos != s.len() {
            return Err(parser.error("unexpected trailing input"));
        }
        Ok(ty)
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("cannot parse type `{input}` at offset {offset}: {message}")]
pub struct TypeParseError {
    pub input: String,
    pub offset: usize,
    pub message: String,
}

// ------------------------------- Parser ---------------------------------- //

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, message: &str) -> TypeParseError {
        TypeParseError {
            input: self.src.to_string(),
            offset: self.pos,
            message: message.to_string(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn skip_ws(&mut self) {
        while let Some(c) = self.peek() {
            if !c.is_whitespace() { break }
            self.pos += c.len_utf8();
        }
    }

    fn eat(&mut self, c: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    /// expr := term ('|' term)*
    fn expr(&mut self) -> Result<TypeRef, TypeParseError> {
        let first = self.term()?;
        let mut arms = vec![first];
        while self.eat('|') {
            arms.push(self.term()?);
        }
        if arms.len() == 1 {
            Ok(arms.remove(0))
        } else {
            Ok(TypeRef::union(arms))
        }
    }

    fn ident(&mut self) -> Result<&'a str, TypeParseError> {
        self.skip_ws();
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_alphanumeric() || c == '_' || c == '.' {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        if start == self.pos {
            return Err(self.error("expected a type name"));
        }
        Ok(&self.src[start..self.pos])
    }

    fn args(&mut self) -> Result<Vec<TypeRef>, TypeParseError> {
        let mut out = vec![self.expr()?];
        while self.eat(',') {
            out.push(self.expr()?);
        }
        if !self.eat(']') {
            return Err(self.error("expected `]`"));
        }
        Ok(out)
    }

    fn term(&mut self) -> Result<TypeRef, TypeParseError> {
        self.skip_ws();
        if let Some(quote @ ('\'' | '"')) = self.peek() {
            self.pos += 1;
            let name = self.ident()?;
            if self.peek() != Some(quote) {
                return Err(self.error("unterminated forward reference"));
            }
            self.pos += 1;
            return Ok(TypeRef::ForwardRef(name.to_string()));
        }

        let name = self.ident()?;
        let args = if self.eat('[') { Some(self.args()?) } else { None };
        let arity = |n: usize, args: &Option<Vec<TypeRef>>| -> Result<Vec<TypeRef>, TypeParseError> {
            match args {
                Some(xs) if xs.len() == n => Ok(xs.clone()),
                _ => Err(self.error(&format!("`{name}` takes {n} type argument(s)"))),
            }
        };

        let ty = match (name, &args) {
            ("str" | "string", None) => TypeRef::Str,
            ("int", None) => TypeRef::Int,
            ("float", None) => TypeRef::Float,
            ("bool", None) => TypeRef::Bool,
            ("decimal" | "Decimal", None) => TypeRef::Decimal,
            ("date", None) => TypeRef::Date,
            ("datetime", None) => TypeRef::DateTime,
            ("Any" | "any", None) => TypeRef::Any,
            ("None" | "null", None) => TypeRef::NoneType,
            ("dict" | "Dict", None) => TypeRef::RawMap,
            ("dict" | "Dict", Some(_)) => {
                let mut xs = arity(2, &args)?;
                let v = xs.pop().unwrap_or(TypeRef::Any);
                let k = xs.pop().unwrap_or(TypeRef::Any);
                TypeRef::dict(k, v)
            }
            ("list" | "List", _) => {
                let mut xs = arity(1, &args)?;
                TypeRef::list(xs.remove(0))
            }
            ("Optional" | "optional", _) => {
                let mut xs = arity(1, &args)?;
                TypeRef::optional(xs.remove(0))
            }
            ("tuple" | "Tuple", Some(xs)) => TypeRef::Tuple(xs.clone()),
            ("Union" | "union", Some(xs)) => TypeRef::union(xs.clone()),
            ("Partial", Some(xs)) => TypeRef::Partial(xs.clone()),
            ("tuple" | "Tuple" | "Union" | "union" | "Partial", None) => {
                return Err(self.error(&format!("`{name}` needs type arguments")));
            }
            (_, Some(_)) => return Err(self.error(&format!("`{name}` is not generic"))),
            (_, None) => TypeRef::Named(name.to_string()),
        };
        Ok(ty)
    }
}
