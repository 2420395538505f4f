use std::{borrow::Cow, fmt::Display, str::FromStr};

use indexmap::IndexMap;
use openir_pointer::{BadJsonPointerSyntax, JsonPointer};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::SerdeError;

/// An OpenAPI 3.x or Swagger 2.0 document.
///
/// Both shapes deserialize into the same model: 3.x documents populate
/// [`Document::components`], and 2.0 documents populate the top-level
/// [`Document::definitions`], [`Document::parameters`],
/// [`Document::responses`], and [`Document::security_definitions`] maps.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(default)]
    pub openapi: Option<String>,
    #[serde(default)]
    pub swagger: Option<String>,
    #[serde(default)]
    pub info: Info,
    #[serde(default)]
    pub paths: IndexMap<String, PathItem>,
    #[serde(default)]
    pub components: Option<Components>,
    #[serde(default)]
    pub definitions: IndexMap<String, RefOrSchema>,
    #[serde(default)]
    pub parameters: IndexMap<String, Parameter>,
    #[serde(default)]
    pub responses: IndexMap<String, Response>,
    #[serde(default)]
    pub security_definitions: IndexMap<String, SecurityScheme>,
    #[serde(default)]
    pub security: Option<Vec<SecurityRequirement>>,
    #[serde(default)]
    pub consumes: Vec<String>,
    #[serde(default)]
    pub produces: Vec<String>,
}

impl Document {
    /// Parse an OpenAPI document from a YAML or JSON string.
    pub fn from_yaml(yaml: &str) -> Result<Self, SerdeError> {
        let deserializer = serde_yaml::Deserializer::from_str(yaml);
        let result = serde_path_to_error::deserialize(deserializer)?;
        Ok(result)
    }

    /// Parse an OpenAPI document from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, SerdeError> {
        let mut deserializer = serde_json::Deserializer::from_str(json);
        let result = serde_path_to_error::deserialize(&mut deserializer)?;
        Ok(result)
    }

    /// Returns an iterator over all named schemas, with their locations.
    pub fn schemas(&self) -> impl Iterator<Item = (&str, &RefOrSchema, String)> {
        let components = self
            .components
            .iter()
            .flat_map(|c| &c.schemas)
            .map(|(name, schema)| (name, schema, "#/components/schemas"));
        let definitions = self
            .definitions
            .iter()
            .map(|(name, schema)| (name, schema, "#/definitions"));
        components
            .chain(definitions)
            .map(|(name, schema, root)| {
                let location = format!("{root}/{}", openir_pointer::JsonPointerSegment::new(name));
                (name.as_str(), schema, location)
            })
    }

    /// Looks up a security scheme by name, in either
    /// `components.securitySchemes` or `securityDefinitions`.
    pub fn security_scheme(&self, name: &str) -> Option<&SecurityScheme> {
        self.components
            .as_ref()
            .and_then(|c| c.security_schemes.get(name))
            .or_else(|| self.security_definitions.get(name))
    }
}

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Info {
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub version: String,
}

/// Operation definitions for a single path.
#[derive(Debug, Default, Deserialize)]
pub struct PathItem {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub get: Option<Operation>,
    #[serde(default)]
    pub put: Option<Operation>,
    #[serde(default)]
    pub post: Option<Operation>,
    #[serde(default)]
    pub delete: Option<Operation>,
    #[serde(default)]
    pub options: Option<Operation>,
    #[serde(default)]
    pub head: Option<Operation>,
    #[serde(default)]
    pub patch: Option<Operation>,
    #[serde(default)]
    pub trace: Option<Operation>,
    #[serde(default)]
    pub parameters: Vec<RefOrParameter>,
}

impl PathItem {
    /// Returns an iterator over the operations for each HTTP method.
    pub fn operations(&self) -> impl Iterator<Item = (Method, &Operation)> {
        [
            (Method::Get, self.get.as_ref()),
            (Method::Put, self.put.as_ref()),
            (Method::Post, self.post.as_ref()),
            (Method::Delete, self.delete.as_ref()),
            (Method::Options, self.options.as_ref()),
            (Method::Head, self.head.as_ref()),
            (Method::Patch, self.patch.as_ref()),
            (Method::Trace, self.trace.as_ref()),
        ]
        .into_iter()
        .filter_map(|(method, op)| op.map(|o| (method, o)))
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Put => "put",
            Self::Post => "post",
            Self::Delete => "delete",
            Self::Options => "options",
            Self::Head => "head",
            Self::Patch => "patch",
            Self::Trace => "trace",
        }
    }
}

impl Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP operation.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    #[serde(default)]
    pub operation_id: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub deprecated: Option<bool>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub parameters: Vec<RefOrParameter>,
    #[serde(default)]
    pub request_body: Option<RefOrRequestBody>,
    #[serde(default)]
    pub responses: IndexMap<String, RefOrResponse>,
    #[serde(default)]
    pub security: Option<Vec<SecurityRequirement>>,
    #[serde(default)]
    pub consumes: Option<Vec<String>>,
    #[serde(default)]
    pub produces: Option<Vec<String>>,
    #[serde(flatten)]
    pub extensions: IndexMap<String, serde_json::Value>,
}

/// A map of security scheme names to their required scopes.
pub type SecurityRequirement = IndexMap<String, Vec<String>>;

/// A path, query, header, cookie, body, or form parameter.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub deprecated: Option<bool>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub style: Option<ParameterStyle>,
    #[serde(default)]
    pub explode: Option<bool>,
    #[serde(default)]
    pub allow_reserved: Option<bool>,
    #[serde(default)]
    pub schema: Option<RefOrSchema>,

    // Swagger 2.0 non-body parameters describe their type inline.
    #[serde(rename = "type", default, deserialize_with = "deserialize_type")]
    pub ty: Vec<Ty>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub items: Option<RefOrSchema>,
    #[serde(rename = "enum", default)]
    pub variants: Option<Vec<serde_json::Value>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub default: Option<serde_json::Value>,
}

impl Parameter {
    /// Returns the parameter's schema, synthesizing one from the
    /// inline Swagger 2.0 fields if there's no `schema`.
    pub fn schema(&self) -> Option<Cow<'_, RefOrSchema>> {
        if let Some(schema) = &self.schema {
            return Some(Cow::Borrowed(schema));
        }
        if self.ty.is_empty() && self.variants.is_none() {
            return None;
        }
        let schema = Schema {
            ty: self.ty.clone(),
            format: self.format.clone(),
            items: self.items.clone(),
            variants: self.variants.clone(),
            default: self.default.clone(),
            ..Default::default()
        };
        Some(Cow::Owned(RefOr::Other(Box::new(schema))))
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
    Body,
    FormData,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterStyle {
    Matrix,
    Label,
    Form,
    Simple,
    SpaceDelimited,
    PipeDelimited,
    DeepObject,
}

/// Request body definition.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RequestBody {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub content: IndexMap<String, MediaType>,
}

/// Response definition.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub content: Option<IndexMap<String, MediaType>>,
    /// The Swagger 2.0 response body schema.
    #[serde(default)]
    pub schema: Option<RefOrSchema>,
}

/// Media type content.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct MediaType {
    #[serde(default)]
    pub schema: Option<RefOrSchema>,
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityScheme {
    #[serde(rename = "type", default)]
    pub ty: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "in", default)]
    pub location: Option<String>,
    #[serde(default)]
    pub scheme: Option<String>,
    #[serde(default)]
    pub bearer_format: Option<String>,
    #[serde(default)]
    pub flows: IndexMap<String, serde_json::Value>,
    /// The Swagger 2.0 OAuth flow.
    #[serde(default)]
    pub flow: Option<String>,
    #[serde(default)]
    pub open_id_connect_url: Option<String>,
}

/// Components section containing reusable schemas.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Components {
    #[serde(default)]
    pub schemas: IndexMap<String, RefOrSchema>,
    #[serde(default)]
    pub responses: IndexMap<String, Response>,
    #[serde(default)]
    pub parameters: IndexMap<String, Parameter>,
    #[serde(default)]
    pub request_bodies: IndexMap<String, RequestBody>,
    #[serde(default)]
    pub security_schemes: IndexMap<String, SecurityScheme>,
}

/// Either a reference to a component or an inline component definition.
///
/// This generic type is used throughout the parse tree to represent
/// locations where a component can either be defined inline, or referenced
/// via `$ref`. Any object with a `$ref` key is a reference; sibling keys
/// are ignored.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum RefOr<T> {
    /// A reference to a component definition via `$ref`.
    Ref(Ref),
    /// An inline component definition.
    Other(T),
}

/// Either a reference or a schema definition.
pub type RefOrSchema = RefOr<Box<Schema>>;

/// Either a reference or a parameter definition.
pub type RefOrParameter = RefOr<Parameter>;

/// Either a reference or a request body definition.
pub type RefOrRequestBody = RefOr<RequestBody>;

/// Either a reference or a response definition.
pub type RefOrResponse = RefOr<Response>;

/// A reference to another component.
#[derive(Clone, Debug, Deserialize)]
pub struct Ref {
    #[serde(rename = "$ref")]
    pub path: ComponentRef,
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Ty {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
    Null,
    /// A type name that isn't part of JSON Schema.
    #[serde(other)]
    Other,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Bool(bool),
    RefOrSchema(RefOrSchema),
}

/// OpenAPI 3.0 spells exclusive bounds as booleans that modify
/// `minimum` and `maximum`; 3.1 spells them as numbers.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum ExclusiveBound {
    Bool(bool),
    Value(serde_json::Number),
}

/// An OpenAPI schema definition.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    #[serde(rename = "type", default, deserialize_with = "deserialize_type")]
    pub ty: Vec<Ty>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub deprecated: Option<bool>,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub default: Option<serde_json::Value>,

    // Constraints.
    #[serde(default)]
    pub minimum: Option<serde_json::Number>,
    #[serde(default)]
    pub maximum: Option<serde_json::Number>,
    #[serde(default)]
    pub exclusive_minimum: Option<ExclusiveBound>,
    #[serde(default)]
    pub exclusive_maximum: Option<ExclusiveBound>,
    #[serde(default)]
    pub min_length: Option<u64>,
    #[serde(default)]
    pub max_length: Option<u64>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub min_items: Option<u64>,
    #[serde(default)]
    pub max_items: Option<u64>,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub write_only: bool,

    // Object properties.
    #[serde(default)]
    pub properties: Option<IndexMap<String, RefOrSchema>>,
    #[serde(default, deserialize_with = "deserialize_required")]
    pub required: Vec<String>,
    #[serde(default)]
    pub additional_properties: Option<AdditionalProperties>,

    // Array items.
    #[serde(default)]
    pub items: Option<RefOrSchema>,

    // Literals.
    #[serde(rename = "enum", default)]
    pub variants: Option<Vec<serde_json::Value>>,
    #[serde(rename = "const", default, deserialize_with = "deserialize_some")]
    pub constant: Option<serde_json::Value>,

    // Composition.
    #[serde(default)]
    pub all_of: Option<Vec<RefOrSchema>>,
    #[serde(default)]
    pub any_of: Option<Vec<RefOrSchema>>,
    #[serde(default)]
    pub one_of: Option<Vec<RefOrSchema>>,
    #[serde(default)]
    pub discriminator: Option<Discriminator>,

    // Extensions.
    #[serde(flatten)]
    pub extensions: IndexMap<String, serde_json::Value>,
}

impl Schema {
    /// Returns the value of an extension field.
    pub fn extension<'a, X: FromExtension<'a>>(&'a self, name: &str) -> Option<X> {
        X::from_extension(self.extensions.get(name)?)
    }

    /// Returns `true` if any of the ways to spell nullability are present:
    /// `nullable: true`, a `null` entry in `type`, or `x-nullable: true`.
    pub fn is_nullable(&self) -> bool {
        self.nullable || self.ty.contains(&Ty::Null) || self.extension("x-nullable") == Some(true)
    }
}

/// A discriminator for a polymorphic type.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discriminator {
    pub property_name: String,
    /// Tag values to references or bare schema names.
    #[serde(default)]
    pub mapping: IndexMap<String, String>,
}

/// A `$ref` string that points into the current document.
///
/// The reference is kept as written, and only checked when it's
/// resolved, so that a bad reference surfaces as an unresolved
/// reference rather than a deserialization error.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[serde(transparent)]
pub struct ComponentRef(String);

impl ComponentRef {
    /// Returns the reference as written.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parses the URI fragment of this reference into a pointer.
    pub fn pointer(&self) -> Result<JsonPointer<'_>, BadComponentRef> {
        let Some(fragment) = self.0.trim().strip_prefix('#') else {
            return Err(BadComponentRef::NotSameDocument);
        };
        Ok(JsonPointer::parse_fragment(fragment)?)
    }

    /// Extracts the component name: the final segment, decoded
    /// and unescaped.
    pub fn name(&self) -> Cow<'_, str> {
        match self.pointer() {
            Ok(pointer) => match pointer.last() {
                Some(segment) => Cow::Owned(segment.as_str().to_owned()),
                None => Cow::Borrowed(""),
            },
            Err(_) => Cow::Borrowed(self.0.rsplit('/').next().unwrap_or(&self.0)),
        }
    }

    /// Returns the name of the schema that this reference points to,
    /// if it points directly at a named schema in either
    /// `#/components/schemas` or `#/definitions`.
    pub fn schema_name(&self) -> Option<String> {
        let pointer = self.pointer().ok()?;
        let names = pointer.segments().map(|s| s.as_str()).collect::<Vec<_>>();
        match &*names {
            ["components", "schemas", name] | ["definitions", name] => Some((*name).to_owned()),
            _ => None,
        }
    }
}

impl FromStr for ComponentRef {
    type Err = BadComponentRef;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let r = Self(s.to_owned());
        r.pointer()?;
        Ok(r)
    }
}

impl Display for ComponentRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Reads a single `type` name, or an OpenAPI 3.1-style array of names.
/// Values that aren't type names degrade to [`Ty::Other`].
fn deserialize_type<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Ty>, D::Error> {
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Array(values) => values.into_iter().map(type_name).collect(),
        value => vec![type_name(value)],
    })
}

fn type_name(value: serde_json::Value) -> Ty {
    match value {
        serde_json::Value::String(_) => Ty::deserialize(value).unwrap_or(Ty::Other),
        _ => Ty::Other,
    }
}

/// Reads `required` as a list of property names. The draft 3
/// `required: true` on a property, and any other shape, is ignored.
fn deserialize_required<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Vec<String>, D::Error> {
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Array(values) => values
            .into_iter()
            .filter_map(|value| match value {
                serde_json::Value::String(name) => Some(name),
                _ => None,
            })
            .collect(),
        _ => vec![],
    })
}

/// Distinguishes an explicit `null` from an absent field.
fn deserialize_some<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<serde_json::Value>, D::Error> {
    serde_json::Value::deserialize(deserializer).map(Some)
}

#[derive(Debug, miette::Diagnostic, thiserror::Error)]
pub enum BadComponentRef {
    #[error("references must start with `#`; external references aren't supported")]
    NotSameDocument,
    #[error("invalid JSON Pointer syntax: {0}")]
    Syntax(#[from] BadJsonPointerSyntax),
}

pub trait FromExtension<'a>: Sized {
    fn from_extension(value: &'a serde_json::Value) -> Option<Self>;
}

impl<'a> FromExtension<'a> for &'a str {
    fn from_extension(value: &'a serde_json::Value) -> Option<&'a str> {
        value.as_str()
    }
}

impl<'a> FromExtension<'a> for bool {
    fn from_extension(value: &'a serde_json::Value) -> Option<bool> {
        value.as_bool()
    }
}

impl<'a> FromExtension<'a> for &'a [serde_json::Value] {
    fn from_extension(value: &'a serde_json::Value) -> Option<&'a [serde_json::Value]> {
        value.as_array().map(Vec::as_slice)
    }
}
