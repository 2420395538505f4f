use crate::{config::ParserConfig, parse::Document};

use super::{
    diagnostic::{DiagnosticKind, Diagnostics},
    spec::IrSpec,
    types::IrDocument,
};

/// State for a single normalization pass.
///
/// The context is threaded by mutable borrow through every
/// parsing call, and is never shared.
#[derive(Debug)]
pub struct Context<'a> {
    /// The source document.
    pub doc: &'a Document,
    pub config: &'a ParserConfig,
    /// The IR document being built.
    pub ir: IrDocument,
    pub diagnostics: Diagnostics,
}

impl<'a> Context<'a> {
    pub fn new(doc: &'a Document, config: &'a ParserConfig) -> Self {
        Self {
            doc,
            config,
            ir: IrDocument {
                info: doc.info.clone(),
                ..Default::default()
            },
            diagnostics: Diagnostics::default(),
        }
    }

    #[inline]
    pub fn diagnostic(
        &mut self,
        kind: DiagnosticKind,
        location: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.diagnostics.push(kind, location, message);
    }

    /// Consumes this context, and returns the finished IR.
    pub fn finish(self) -> IrSpec {
        IrSpec {
            document: self.ir,
            diagnostics: self.diagnostics,
        }
    }
}
