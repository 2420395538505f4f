use indexmap::{IndexMap, IndexSet};
use openir_pointer::JsonPointer;
use serde::Serialize;

use crate::parse::{Info, Method, ParameterStyle};

/// The closed set of IR node types.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IrSchemaType {
    String,
    Number,
    Boolean,
    Object,
    Array,
    Tuple,
    Enum,
    Null,
    Unknown,
    Never,
    Void,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOperator {
    And,
    Or,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessScope {
    Read,
    Write,
}

/// A normalized schema node.
///
/// Every field is optional. A node with a [`logical_operator`] is a
/// composition of its [`items`]; a node with a [`reference`] is pure
/// indirection to a named component, and carries nothing but
/// documentation besides.
///
/// [`logical_operator`]: IrSchema::logical_operator
/// [`items`]: IrSchema::items
/// [`reference`]: IrSchema::reference
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IrSchema {
    #[serde(rename = "$ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<IrSchemaType>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<IrSchema>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logical_operator: Option<LogicalOperator>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub properties: IndexMap<String, IrSchema>,
    #[serde(skip_serializing_if = "IndexSet::is_empty")]
    pub required: IndexSet<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub additional_properties: Option<Box<IrSchema>>,
    #[serde(rename = "const", skip_serializing_if = "Option::is_none")]
    pub constant: Option<serde_json::Value>,
    #[serde(flatten)]
    pub doc: IrDoc,
    #[serde(flatten)]
    pub constraints: IrConstraints,
}

/// Documentation metadata, which doesn't affect the shape of a node.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct IrDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
}

impl IrDoc {
    /// Fills in the description, title, and deprecation status
    /// from `other` where this node lacks them.
    pub fn inherit(&mut self, other: &IrDoc) {
        if self.description.is_none() {
            self.description.clone_from(&other.description);
        }
        if self.title.is_none() {
            self.title.clone_from(&other.title);
        }
        if self.deprecated.is_none() {
            self.deprecated = other.deprecated;
        }
    }
}

/// Validation keywords, copied verbatim from the source schema.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IrConstraints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<serde_json::Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<serde_json::Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_minimum: Option<serde_json::Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_maximum: Option<serde_json::Number>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_scope: Option<AccessScope>,
}

impl IrSchema {
    /// Returns a leaf node of the given type.
    pub fn of_type(ty: IrSchemaType) -> Self {
        Self {
            ty: Some(ty),
            ..Default::default()
        }
    }

    /// Returns a reference node.
    pub fn of_ref(reference: impl Into<String>) -> Self {
        Self {
            reference: Some(reference.into()),
            ..Default::default()
        }
    }

    /// Returns a composition of `items` under `op`.
    pub fn composition(op: LogicalOperator, items: Vec<IrSchema>) -> Self {
        Self {
            logical_operator: Some(op),
            items,
            ..Default::default()
        }
    }

    /// Returns `true` if this node has no fields at all,
    /// and so doesn't constrain anything.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Returns `true` if this node is a composition.
    pub fn is_composition(&self) -> bool {
        self.logical_operator.is_some()
    }

    /// Returns `true` if this node is `{type: unknown}`,
    /// ignoring documentation.
    pub fn is_bare_unknown(&self) -> bool {
        self.ty == Some(IrSchemaType::Unknown) && self.is_shapeless()
    }

    /// Returns `true` if nothing but the type and documentation is set.
    fn is_shapeless(&self) -> bool {
        self.reference.is_none()
            && self.items.is_empty()
            && self.logical_operator.is_none()
            && self.properties.is_empty()
            && self.required.is_empty()
            && self.additional_properties.is_none()
            && self.constant.is_none()
            && self.constraints == IrConstraints::default()
    }

    /// Compares two nodes structurally, ignoring documentation
    /// metadata at every level.
    pub fn structurally_eq(&self, other: &IrSchema) -> bool {
        self.reference == other.reference
            && self.ty == other.ty
            && self.logical_operator == other.logical_operator
            && self.constant == other.constant
            && self.constraints == other.constraints
            && self.required == other.required
            && self.items.len() == other.items.len()
            && std::iter::zip(&self.items, &other.items).all(|(a, b)| a.structurally_eq(b))
            && self.properties.len() == other.properties.len()
            && self.properties.iter().all(|(name, a)| {
                other
                    .properties
                    .get(name)
                    .is_some_and(|b| a.structurally_eq(b))
            })
            && match (&self.additional_properties, &other.additional_properties) {
                (Some(a), Some(b)) => a.structurally_eq(b),
                (None, None) => true,
                _ => false,
            }
    }

    /// Returns the name of the component that this node refers to,
    /// if it's a reference to a named schema.
    pub fn component_name(&self) -> Option<String> {
        let reference = self.reference.as_deref()?.strip_prefix('#')?;
        let pointer = JsonPointer::parse(reference).ok()?;
        let segments = pointer.segments().map(|s| s.as_str()).collect::<Vec<_>>();
        match &*segments {
            ["components", "schemas", name] => Some((*name).to_owned()),
            _ => None,
        }
    }

    /// Returns an iterator over this node's immediate children:
    /// items, property schemas, and additional properties.
    pub fn children(&self) -> impl Iterator<Item = &IrSchema> {
        itertools::chain!(
            &self.items,
            self.properties.values(),
            self.additional_properties.as_deref(),
        )
    }

    /// Returns a mutable iterator over this node's immediate children.
    pub fn children_mut(&mut self) -> impl Iterator<Item = &mut IrSchema> {
        itertools::chain!(
            &mut self.items,
            self.properties.values_mut(),
            self.additional_properties.as_deref_mut(),
        )
    }
}

/// The normalized document that emitters consume.
#[derive(Clone, Debug, Default, Serialize)]
pub struct IrDocument {
    pub info: Info,
    pub components: IrComponents,
    pub paths: IndexMap<String, IndexMap<Method, IrOperation>>,
}

impl IrDocument {
    /// Returns an iterator over every operation, in path order.
    pub fn operations(&self) -> impl Iterator<Item = &IrOperation> {
        self.paths.values().flat_map(|methods| methods.values())
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct IrComponents {
    pub schemas: IndexMap<String, IrSchema>,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IrOperation {
    pub id: String,
    pub method: Method,
    pub path: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub path_params: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<IrParameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<IrRequestBody>,
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub responses: IndexMap<String, IrResponse>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub security: Vec<IrSecurityScheme>,
    /// Success and error unions derived from [`IrOperation::responses`].
    pub response_map: IrResponsesMap,
}

impl IrOperation {
    /// Returns `true` if calling this operation needs any data:
    /// a required parameter, or a required body.
    pub fn has_required_data(&self) -> bool {
        self.parameters.iter().any(|param| param.required)
            || self.body.as_ref().is_some_and(|body| body.required)
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IrParameter {
    pub name: String,
    pub location: IrParameterLocation,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deprecated: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<ParameterStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_reserved: Option<bool>,
    pub schema: IrSchema,
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IrParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IrRequestBody {
    pub media_type: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<MediaKind>,
    pub schema: IrSchema,
    pub required: bool,
}

/// How a body is encoded on the wire.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MediaKind {
    Json,
    FormData,
    UrlSearchParams,
    Text,
    OctetStream,
}

impl MediaKind {
    /// Classifies a media type, ignoring parameters after `;`.
    pub fn from_media_type(media_type: &str) -> Option<Self> {
        let essence = media_type
            .split(';')
            .next()
            .unwrap_or(media_type)
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "application/json" => Some(Self::Json),
            "multipart/form-data" => Some(Self::FormData),
            "application/x-www-form-urlencoded" => Some(Self::UrlSearchParams),
            "application/octet-stream" => Some(Self::OctetStream),
            s if s.ends_with("+json") => Some(Self::Json),
            s if s.starts_with("text/") => Some(Self::Text),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IrResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    pub schema: IrSchema,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum IrSecurityScheme {
    #[serde(rename = "apiKey")]
    ApiKey {
        name: String,
        #[serde(rename = "in")]
        location: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    #[serde(rename = "http", rename_all = "camelCase")]
    Http {
        scheme: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        bearer_format: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    #[serde(rename = "oauth2")]
    OAuth2 {
        flows: Vec<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
    #[serde(rename = "openIdConnect", rename_all = "camelCase")]
    OpenIdConnect {
        open_id_connect_url: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        description: Option<String>,
    },
}

/// Per-operation unions of success and error responses.
#[derive(Clone, Debug, Default, Serialize)]
pub struct IrResponsesMap {
    /// An object of success schemas, keyed by status code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responses: Option<IrSchema>,
    /// The deduplicated union of all success schemas.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<IrSchema>,
    /// An object of error schemas, keyed by status code.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<IrSchema>,
    /// The deduplicated union of all error schemas.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<IrSchema>,
}
