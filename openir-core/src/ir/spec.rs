use serde::Serialize;

use crate::{config::ParserConfig, parse::Document};

use super::{
    context::Context, diagnostic::Diagnostics, error::IrError, operation::parse_paths,
    transform::transform_component, types::IrDocument,
};

/// A normalized document, and the diagnostics recorded
/// while normalizing it.
#[derive(Debug, Serialize)]
pub struct IrSpec {
    pub document: IrDocument,
    pub diagnostics: Diagnostics,
}

impl IrSpec {
    /// Normalizes a document with the default configuration.
    #[inline]
    pub fn from_doc(doc: &Document) -> Result<Self, IrError> {
        Self::from_doc_with_config(doc, &ParserConfig::default())
    }

    pub fn from_doc_with_config(doc: &Document, config: &ParserConfig) -> Result<Self, IrError> {
        let mut cx = Context::new(doc, config);

        for (name, schema, location) in doc.schemas() {
            tracing::trace!(name, "parsing schema");
            let node = transform_component(&mut cx, name, schema, &location)?;
            cx.ir.components.schemas.insert(name.to_owned(), node);
        }
        tracing::debug!(count = cx.ir.components.schemas.len(), "parsed schemas");

        parse_paths(&mut cx)?;

        Ok(cx.finish())
    }
}
