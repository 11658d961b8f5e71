use crate::schema::FieldDefault;
use crate::types::TypeRef;

/// Which generic constructor a declared type came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenericOrigin {
    Union,
    List,
    Tuple,
    Dict,
    Partial,
}

/// Everything dispatch needs to know about one field or sub-field.
///
/// `generic_args` is non-empty whenever `generic_origin` is set (an empty
/// `Partial[]` is reported at dispatch).
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    pub name: String,
    pub declared_type: TypeRef,
    pub generic_origin: Option<GenericOrigin>,
    pub generic_args: Vec<TypeRef>,
    pub default: FieldDefault,
    /// Literal external type; bypasses all other dispatch.
    pub forced_type: Option<String>,
}

impl TypeDescriptor {
    pub fn new(name: &str, ty: &TypeRef) -> Self {
        let generic_origin = match ty {
            TypeRef::Union(_) => Some(GenericOrigin::Union),
            TypeRef::List(_) => Some(GenericOrigin::List),
            TypeRef::Tuple(_) => Some(GenericOrigin::Tuple),
            TypeRef::Dict(..) => Some(GenericOrigin::Dict),
            TypeRef::Partial(_) => Some(GenericOrigin::Partial),
            _ => None,
        };
        Self {
            name: name.to_string(),
            declared_type: ty.clone(),
            generic_origin,
            generic_args: ty.args(),
            default: FieldDefault::Absent,
            forced_type: None,
        }
    }

    pub fn forced(name: &str, forced: &str) -> Self {
        Self {
            forced_type: Some(forced.to_string()),
            ..Self::new(name, &TypeRef::Any)
        }
    }

    pub fn with_default(mut self, default: FieldDefault) -> Self {
        self.default = default;
        self
    }

    pub fn is_optional(&self) -> bool {
        self.declared_type.is_optional()
    }
}
