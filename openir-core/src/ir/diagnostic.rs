use serde::Serialize;

/// A recoverable anomaly in the source document.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    /// A JSON Pointer URI fragment for the offending node,
    /// like `#/components/schemas/Pet/enum/2`.
    pub location: String,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
pub enum DiagnosticKind {
    /// An `operationId` that's already taken. The repeat is renamed.
    DuplicateOperationId,
    /// An `enum` value that isn't a string, number, boolean, or `null`.
    /// The value is skipped.
    UnsupportedEnumValueType,
    /// A response key that isn't a status code, range, or `default`.
    /// The response is left out of the success and error unions.
    UnrecognizedStatusCode,
    /// A path that isn't a valid template.
    BadPathTemplate,
    /// A security requirement that names an undefined scheme,
    /// or a scheme of an unknown type.
    UnknownSecurityScheme,
}

/// Collects diagnostics in the order they're found.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(transparent)]
pub struct Diagnostics(Vec<Diagnostic>);

impl Diagnostics {
    /// Records a diagnostic, and emits it as a `warn` event.
    pub fn push(
        &mut self,
        kind: DiagnosticKind,
        location: impl Into<String>,
        message: impl Into<String>,
    ) {
        let diagnostic = Diagnostic {
            kind,
            message: message.into(),
            location: location.into(),
        };
        tracing::warn!(
            kind = ?diagnostic.kind,
            location = %diagnostic.location,
            "{}",
            diagnostic.message,
        );
        self.0.push(diagnostic);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns an iterator over diagnostics of one kind.
    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.0.iter().filter(move |d| d.kind == kind)
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
