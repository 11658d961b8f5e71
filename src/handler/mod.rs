//! Field handlers: one per declared-type category.
//!
//! [`resolve`] walks a fixed, ordered predicate table and picks the first
//! handler whose predicate accepts the descriptor. Order matters: `Optional`
//! fields are unions, so `Union` sits before every scalar; forced types sit
//! before everything. The three behaviours of a handler live in sibling
//! modules:
//!
//! - [`load`](FieldHandler::load): raw JSON to [`Value`](crate::value::Value)
//! - [`represent`](FieldHandler::represent): `Value` back to JSON
//! - [`process`](FieldHandler::process): external type string plus dependencies
mod load;
mod process;
mod represent;

pub use process::ProcessingResult;

use crate::descriptor::{GenericOrigin, TypeDescriptor};
use crate::error::{Error, FieldPath, Result};
use crate::schema::{RecordDef, Schema};
use crate::types::TypeRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerKind {
    Forced,
    Union,
    List,
    Tuple,
    Any,
    RawMap,
    TypedMap,
    String,
    Number,
    Decimal,
    Boolean,
    Enum,
    Date,
    ForwardReference,
    NestedRecord,
    PartialRecord,
}

type Predicate = fn(&TypeDescriptor, &Schema, &FieldPath) -> Result<bool>;

// ---------------------------- Dispatch table ----------------------------- //

const DISPATCH: &[(HandlerKind, Predicate)] = &[
    (HandlerKind::Forced, |d, _, _| Ok(d.forced_type.is_some())),
    (HandlerKind::Union, |d, _, _| Ok(d.generic_origin == Some(GenericOrigin::Union))),
    (HandlerKind::List, |d, _, _| Ok(d.generic_origin == Some(GenericOrigin::List))),
    (HandlerKind::Tuple, |d, _, _| Ok(d.generic_origin == Some(GenericOrigin::Tuple))),
    (HandlerKind::Any, |d, _, _| Ok(d.declared_type == TypeRef::Any)),
    (HandlerKind::RawMap, |d, _, _| Ok(d.declared_type == TypeRef::RawMap)),
    (HandlerKind::TypedMap, |d, _, _| Ok(d.generic_origin == Some(GenericOrigin::Dict))),
    (HandlerKind::String, |d, _, _| Ok(d.declared_type == TypeRef::Str)),
    (HandlerKind::Number, |d, _, _| Ok(matches!(d.declared_type, TypeRef::Int | TypeRef::Float))),
    (HandlerKind::Decimal, |d, _, _| Ok(d.declared_type == TypeRef::Decimal)),
    (HandlerKind::Boolean, |d, _, _| Ok(d.declared_type == TypeRef::Bool)),
    (HandlerKind::Enum, |d, s, _| {
        Ok(matches!(&d.declared_type, TypeRef::Named(n) if s.enum_def(n).is_some()))
    }),
    (HandlerKind::Date, |d, _, _| Ok(matches!(d.declared_type, TypeRef::Date | TypeRef::DateTime))),
    (HandlerKind::ForwardReference, |d, s, _| {
        Ok(matches!(&d.declared_type, TypeRef::ForwardRef(n) if s.record(n).is_some()))
    }),
    (HandlerKind::PartialRecord, is_partial),
    (HandlerKind::NestedRecord, |d, s, _| {
        Ok(matches!(&d.declared_type, TypeRef::Named(n) if s.record(n).is_some()))
    }),
];

/// `Partial[...]` must wrap exactly one record; anything else is a schema bug.
fn is_partial(d: &TypeDescriptor, schema: &Schema, path: &FieldPath) -> Result<bool> {
    if d.generic_origin != Some(GenericOrigin::Partial) {
        return Ok(false);
    }
    match d.generic_args.as_slice() {
        [single] if partial_target(single, schema).is_some() => Ok(true),
        _ => Err(Error::Configuration(format!(
            "Partial[] can only be applied to a single record: {path}: {}",
            d.declared_type
        ))),
    }
}

fn partial_target<'s>(ty: &TypeRef, schema: &'s Schema) -> Option<&'s RecordDef> {
    match ty {
        TypeRef::Named(n) | TypeRef::ForwardRef(n) => schema.record(n),
        _ => None,
    }
}

// ------------------------------- Handler --------------------------------- //

/// A descriptor bound to the handler chosen for it.
#[derive(Debug, Clone)]
pub struct FieldHandler<'s> {
    kind: HandlerKind,
    descriptor: TypeDescriptor,
    schema: &'s Schema,
    path: FieldPath,
    /// derived record for `Partial[X]`
    partial: Option<RecordDef>,
}

/// First predicate to accept wins; none accepting is `UnknownFieldType`.
pub fn resolve<'s>(descriptor: TypeDescriptor, schema: &'s Schema, path: &FieldPath) -> Result<FieldHandler<'s>> {
    for (kind, accepts) in DISPATCH {
        if accepts(&descriptor, schema, path)? {
            let partial = match kind {
                HandlerKind::PartialRecord => descriptor
                    .generic_args
                    .first()
                    .and_then(|t| partial_target(t, schema))
                    .map(RecordDef::partial),
                _ => None,
            };
            return Ok(FieldHandler {
                kind: *kind,
                descriptor,
                schema,
                path: path.clone(),
                partial,
            });
        }
    }
    Err(Error::unknown(path, &descriptor.declared_type))
}

/// Resolves `ty` and every type nested in it, without reading any input.
pub fn check_type(schema: &Schema, ty: &TypeRef, path: &FieldPath) -> Result<()> {
    let handler = resolve(TypeDescriptor::new(path.last().unwrap_or_default(), ty), schema, path)?;
    match handler.kind {
        HandlerKind::Union | HandlerKind::List | HandlerKind::Tuple | HandlerKind::TypedMap => {
            for (i, arg) in ty.args().iter().enumerate() {
                if *arg != TypeRef::NoneType {
                    check_type(schema, arg, &path.index(i))?;
                }
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

impl<'s> FieldHandler<'s> {
    pub fn kind(&self) -> HandlerKind {
        self.kind
    }

    pub fn descriptor(&self) -> &TypeDescriptor {
        &self.descriptor
    }

    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    fn child(&self, ty: &TypeRef, path: FieldPath) -> Result<FieldHandler<'s>> {
        let name = path.last().unwrap_or(self.descriptor.name.as_str()).to_string();
        resolve(TypeDescriptor::new(&name, ty), self.schema, &path)
    }

    fn record(&self) -> Result<&RecordDef> {
        if let Some(partial) = &self.partial {
            return Ok(partial);
        }
        let found = match &self.descriptor.declared_type {
            TypeRef::Named(n) | TypeRef::ForwardRef(n) => self.schema.record(n),
            _ => None,
        };
        found.ok_or_else(|| Error::unknown(&self.path, &self.descriptor.declared_type))
    }

    fn arg(&self, i: usize) -> Result<&TypeRef> {
        self.descriptor
            .generic_args
            .get(i)
            .ok_or_else(|| Error::unknown(&self.path, &self.descriptor.declared_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EnumDef, FieldDef};

    fn schema() -> Schema {
        Schema::from_parts(
            vec![EnumDef::new("Color").member("Red", "red")],
            vec![RecordDef::new("User").field(FieldDef::new("id", TypeRef::Int))],
        )
        .unwrap()
    }

    fn kind_of(ty: &str) -> HandlerKind {
        let schema = schema();
        let ty: TypeRef = ty.parse().unwrap();
        resolve(TypeDescriptor::new("f", &ty), &schema, &FieldPath::root("T")).unwrap().kind()
    }

    #[test]
    fn first_matching_predicate_wins() {
        assert_eq!(kind_of("Optional[str]"), HandlerKind::Union);
        assert_eq!(kind_of("list[int]"), HandlerKind::List);
        assert_eq!(kind_of("tuple[int, str]"), HandlerKind::Tuple);
        assert_eq!(kind_of("dict"), HandlerKind::RawMap);
        assert_eq!(kind_of("dict[str, int]"), HandlerKind::TypedMap);
        assert_eq!(kind_of("float"), HandlerKind::Number);
        assert_eq!(kind_of("decimal"), HandlerKind::Decimal);
        assert_eq!(kind_of("Color"), HandlerKind::Enum);
        assert_eq!(kind_of("datetime"), HandlerKind::Date);
        assert_eq!(kind_of("'User'"), HandlerKind::ForwardReference);
        assert_eq!(kind_of("User"), HandlerKind::NestedRecord);
        assert_eq!(kind_of("Partial[User]"), HandlerKind::PartialRecord);
    }

    #[test]
    fn forced_type_beats_declared_type() {
        let schema = schema();
        let d = TypeDescriptor::forced("x", "Foo");
        let h = resolve(d, &schema, &FieldPath::root("T")).unwrap();
        assert_eq!(h.kind(), HandlerKind::Forced);
    }

    #[test]
    fn unknown_names_fail_with_their_path() {
        let schema = schema();
        let path = FieldPath::root("T").field("ghost");
        let err = resolve(TypeDescriptor::new("ghost", &TypeRef::named("Ghost")), &schema, &path).unwrap_err();
        assert_eq!(err.to_string(), "unknown field type: T.ghost: Ghost");
    }

    #[test]
    fn partial_with_two_args_is_a_configuration_error() {
        let schema = schema();
        let ty = TypeRef::Partial(vec![TypeRef::named("User"), TypeRef::named("User")]);
        let err = resolve(TypeDescriptor::new("p", &ty), &schema, &FieldPath::root("T")).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn check_type_descends_into_arguments() {
        let schema = schema();
        let ty: TypeRef = "dict[str, list[Ghost]]".parse().unwrap();
        let err = check_type(&schema, &ty, &FieldPath::root("T").field("f")).unwrap_err();
        assert!(matches!(err, Error::UnknownFieldType { .. }));
    }
}
