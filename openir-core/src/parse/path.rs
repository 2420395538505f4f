use std::borrow::Cow;

use miette::SourceSpan;
use winnow::{
    Parser,
    combinator::eof,
    error::{ContextError, ParseError},
};

/// Parses a path template, like `/v1/pets/{petId}/toy`.
///
/// Literal text is percent-decoded. Empty segments are only allowed
/// at the end, so `/pets/` parses, but `/pets//toy` doesn't.
pub fn parse(input: &str) -> Result<PathTemplate<'_>, BadPathTemplate> {
    (self::parser::template, eof)
        .map(|(segments, _)| PathTemplate(segments))
        .parse(input)
        .map_err(BadPathTemplate::from_parse_error)
}

/// A parsed path template.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PathTemplate<'input>(Vec<PathSegment<'input>>);

impl<'input> PathTemplate<'input> {
    pub fn segments(&self) -> &[PathSegment<'input>] {
        &self.0
    }

    /// Returns the names of all template parameters, in order.
    pub fn params(&self) -> impl Iterator<Item = &'input str> + '_ {
        self.0
            .iter()
            .flat_map(|segment| &segment.0)
            .filter_map(|fragment| match fragment {
                PathFragment::Param(name) => Some(*name),
                PathFragment::Literal(_) => None,
            })
    }
}

/// A slash-delimited path segment that contains zero or more
/// template fragments.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PathSegment<'input>(Vec<PathFragment<'input>>);

impl<'input> PathSegment<'input> {
    pub fn fragments(&self) -> &[PathFragment<'input>] {
        &self.0
    }
}

/// A fragment within a path segment.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PathFragment<'input> {
    /// Literal text.
    Literal(Cow<'input, str>),
    /// Template parameter name.
    Param(&'input str),
}

mod parser {
    use super::*;

    use winnow::{
        combinator::{alt, delimited, preceded, repeat, separated},
        token::take_while,
    };

    pub fn template<'a>(input: &mut &'a str) -> winnow::Result<Vec<PathSegment<'a>>> {
        preceded('/', separated(1.., segment, '/')).parse_next(input)
    }

    fn segment<'a>(input: &mut &'a str) -> winnow::Result<PathSegment<'a>> {
        alt((
            repeat(1.., fragment).map(PathSegment),
            // A trailing slash ends the template with an empty segment.
            eof.value(PathSegment::default()),
        ))
        .parse_next(input)
    }

    fn fragment<'a>(input: &mut &'a str) -> winnow::Result<PathFragment<'a>> {
        alt((param, literal)).parse_next(input)
    }

    fn param<'a>(input: &mut &'a str) -> winnow::Result<PathFragment<'a>> {
        delimited('{', take_while(1.., |c| c != '{' && c != '}'), '}')
            .map(PathFragment::Param)
            .parse_next(input)
    }

    fn literal<'a>(input: &mut &'a str) -> winnow::Result<PathFragment<'a>> {
        take_while(1.., is_pchar)
            .verify_map(|text| {
                percent_encoding::percent_decode_str(text)
                    .decode_utf8()
                    .ok()
                    .map(PathFragment::Literal)
            })
            .parse_next(input)
    }

    /// Unreserved characters, sub-delimiters, `:`, `@`, and `%`
    /// for percent-encoded octets.
    fn is_pchar(c: char) -> bool {
        c.is_ascii_alphanumeric()
            || matches!(
                c,
                '-' | '.'
                    | '_'
                    | '~'
                    | '!'
                    | '$'
                    | '&'
                    | '\''
                    | '('
                    | ')'
                    | '*'
                    | '+'
                    | ','
                    | ';'
                    | '='
                    | ':'
                    | '@'
                    | '%'
            )
    }
}

#[derive(Debug, miette::Diagnostic, thiserror::Error)]
#[error("invalid URL path template")]
#[diagnostic(code(openir::path_template))]
pub struct BadPathTemplate {
    #[source_code]
    code: String,
    #[label("unexpected input here")]
    span: SourceSpan,
}

impl BadPathTemplate {
    fn from_parse_error(error: ParseError<&str, ContextError>) -> Self {
        Self {
            code: (*error.input()).to_owned(),
            span: error.char_span().into(),
        }
    }

    /// Returns the byte offset where parsing failed.
    pub fn offset(&self) -> usize {
        self.span.offset()
    }
}
