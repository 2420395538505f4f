use openir_pointer::JsonPointee;
use rustc_hash::FxHashSet;

use crate::parse::{
    ComponentRef, Document, Parameter, RefOr, RefOrSchema, RequestBody, Response, Schema,
};

use super::error::{IrError, UnresolvedReason};

/// A kind of component that a `$ref` can point to.
pub trait Resolvable: JsonPointee {
    /// A human-readable name for this kind, for errors.
    const KIND: &'static str;

    /// If `pointee` is a reference in a position where this kind
    /// is expected, returns the reference to follow.
    fn follow(pointee: &dyn JsonPointee) -> Option<&ComponentRef>;
}

macro_rules! impl_resolvable {
    ($ty:ty, $ref_or:ty, $kind:literal) => {
        impl Resolvable for $ty {
            const KIND: &'static str = $kind;

            fn follow(pointee: &dyn JsonPointee) -> Option<&ComponentRef> {
                match pointee.downcast_ref::<$ref_or>()? {
                    RefOr::Ref(r) => Some(&r.path),
                    RefOr::Other(_) => None,
                }
            }
        }
    };
}

impl_resolvable!(Schema, RefOrSchema, "schema");
impl_resolvable!(Parameter, RefOr<Parameter>, "parameter");
impl_resolvable!(RequestBody, RefOr<RequestBody>, "request body");
impl_resolvable!(Response, RefOr<Response>, "response");

/// Resolves a same-document reference to a component of kind `T`.
///
/// The reference's URI fragment is percent-decoded and unescaped, then
/// walked through the typed document. If the target is itself a `$ref`,
/// that reference is followed in turn.
pub fn resolve<'a, T: Resolvable>(doc: &'a Document, r: &'a ComponentRef) -> Result<&'a T, IrError> {
    let unresolved = |reason: UnresolvedReason| IrError::UnresolvedReference {
        reference: r.to_string(),
        reason,
    };
    let mut visited = FxHashSet::default();
    let mut current = r;
    loop {
        if !visited.insert(current.as_str()) {
            return Err(unresolved(UnresolvedReason::Cycle(current.to_string())));
        }
        let pointer = current.pointer().map_err(|err| unresolved(err.into()))?;
        let target = doc.resolve(pointer).map_err(|err| unresolved(err.into()))?;
        if let Some(value) = target.downcast_ref::<T>() {
            return Ok(value);
        }
        match T::follow(target) {
            Some(next) => current = next,
            None => {
                return Err(unresolved(UnresolvedReason::WrongKind { expected: T::KIND }));
            }
        }
    }
}

/// Returns an inline component, or resolves a referenced one.
pub fn resolve_ref_or<'a, T: Resolvable>(
    doc: &'a Document,
    value: &'a RefOr<T>,
) -> Result<&'a T, IrError> {
    match value {
        RefOr::Ref(r) => resolve(doc, &r.path),
        RefOr::Other(value) => Ok(value),
    }
}

/// Returns an inline schema, or resolves a referenced one.
pub fn resolve_schema<'a>(doc: &'a Document, schema: &'a RefOrSchema) -> Result<&'a Schema, IrError> {
    match schema {
        RefOr::Ref(r) => resolve(doc, &r.path),
        RefOr::Other(schema) => Ok(schema),
    }
}
