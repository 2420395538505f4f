mod context;
mod dedupe;
mod diagnostic;
mod error;
mod fields;
mod graph;
mod operation;
mod primitive;
mod resolve;
mod spec;
mod transform;
mod types;

#[cfg(test)]
mod tests;

pub use context::Context;
pub use dedupe::dedupe;
pub use diagnostic::{Diagnostic, DiagnosticKind, Diagnostics};
pub use error::{IrError, UnresolvedReason};
pub use fields::{Ancestor, Ancestors, inherited_property};
pub use graph::IrGraph;
pub use operation::{StatusGroup, parse_paths, responses_map};
pub use primitive::MAX_TUPLE_LEN;
pub use resolve::{Resolvable, resolve, resolve_ref_or, resolve_schema};
pub use spec::IrSpec;
pub use transform::{transform, transform_component};
pub use types::*;
