use openir_pointer::BadJsonPointer;

use crate::parse::BadComponentRef;

/// A fatal error that aborts normalization.
#[derive(Debug, miette::Diagnostic, thiserror::Error)]
pub enum IrError {
    #[error("can't resolve reference `{reference}`")]
    #[diagnostic(code(openir::unresolved_reference))]
    UnresolvedReference {
        reference: String,
        #[source]
        reason: UnresolvedReason,
    },
    #[error("operation ID `{id}` is used by both `{first}` and `{second}`")]
    #[diagnostic(
        code(openir::duplicate_operation_id),
        help("operation IDs must be unique when `strict-operation-ids` is set")
    )]
    DuplicateOperationId {
        id: String,
        first: String,
        second: String,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum UnresolvedReason {
    #[error(transparent)]
    BadRef(#[from] BadComponentRef),
    #[error(transparent)]
    Pointer(#[from] BadJsonPointer),
    #[error("expected a {expected}")]
    WrongKind { expected: &'static str },
    #[error("reference chain loops back to `{0}`")]
    Cycle(String),
}
