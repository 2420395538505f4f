use heck::ToLowerCamelCase;
use indexmap::{IndexMap, IndexSet};
use itertools::Itertools;
use openir_pointer::JsonPointerSegment;
use rustc_hash::FxHashMap;

use crate::{
    config::ParserConfig,
    parse::{
        MediaType, Method, Operation, Parameter, ParameterLocation, PathItem, RefOrRequestBody,
        SecurityScheme, Ty, path,
    },
};

use super::{
    context::Context,
    dedupe::dedupe,
    diagnostic::{DiagnosticKind, Diagnostics},
    error::IrError,
    resolve::resolve_ref_or,
    transform::transform,
    types::{
        IrOperation, IrParameter, IrParameterLocation, IrRequestBody, IrResponse,
        IrResponsesMap, IrSchema, IrSchemaType, IrSecurityScheme, LogicalOperator, MediaKind,
    },
};

/// Builds an IR operation for every method of every path,
/// in document order.
pub fn parse_paths(cx: &mut Context<'_>) -> Result<(), IrError> {
    let doc = cx.doc;
    // Maps each operation ID to the operation that claimed it.
    let mut ids = FxHashMap::<String, String>::default();
    for (path, item) in &doc.paths {
        let location = format!("#/paths/{}", JsonPointerSegment::new(path.as_str()));
        let path_params = match path::parse(path) {
            Ok(template) => template.params().map(str::to_owned).collect_vec(),
            Err(err) => {
                cx.diagnostic(
                    DiagnosticKind::BadPathTemplate,
                    &location,
                    format!("{err} at offset {}", err.offset()),
                );
                vec![]
            }
        };

        for (method, operation) in item.operations() {
            let location = format!("{location}/{method}");
            let id = operation_id(cx, &mut ids, path, method, operation, &location)?;
            let op = OperationParser {
                cx: &mut *cx,
                item,
                operation,
                location,
            }
            .parse(id, method, path, path_params.clone())?;
            tracing::debug!(id = %op.id, %method, %path, "parsed operation");
            cx.ir
                .paths
                .entry(path.clone())
                .or_default()
                .insert(method, op);
        }
    }
    Ok(())
}

/// Picks a unique ID for an operation.
fn operation_id(
    cx: &mut Context<'_>,
    ids: &mut FxHashMap<String, String>,
    path: &str,
    method: Method,
    operation: &Operation,
    location: &str,
) -> Result<String, IrError> {
    let claimant = format!("{} {path}", method.as_str().to_ascii_uppercase());
    let id = match &operation.operation_id {
        Some(id) => id.clone(),
        None => fallback_operation_id(method, path),
    };
    let Some(first) = ids.get(&id) else {
        ids.insert(id.clone(), claimant);
        return Ok(id);
    };
    if cx.config.strict_operation_ids {
        return Err(IrError::DuplicateOperationId {
            id,
            first: first.clone(),
            second: claimant,
        });
    }
    let renamed = (2..)
        .map(|suffix| format!("{id}{suffix}"))
        .find(|candidate| !ids.contains_key(candidate))
        .unwrap_or_default();
    cx.diagnostic(
        DiagnosticKind::DuplicateOperationId,
        format!("{location}/operationId"),
        format!("operation ID `{id}` is already used by `{first}`; renaming to `{renamed}`"),
    );
    ids.insert(renamed.clone(), claimant);
    Ok(renamed)
}

/// Derives an operation ID from a method and a path template,
/// like `getUsersById` for `GET /users/{id}`.
fn fallback_operation_id(method: Method, path: &str) -> String {
    let path = path.replace('{', " by ").replace('}', " ");
    format!("{method} {path}").to_lower_camel_case()
}

struct OperationParser<'c, 'a> {
    cx: &'c mut Context<'a>,
    item: &'a PathItem,
    operation: &'a Operation,
    location: String,
}

impl<'a> OperationParser<'_, 'a> {
    fn parse(
        mut self,
        id: String,
        method: Method,
        path: &str,
        path_params: Vec<String>,
    ) -> Result<IrOperation, IrError> {
        let operation = self.operation;

        let mut body_param = None;
        let mut form_params = vec![];
        let mut parameters = vec![];
        for (param, location) in self.merged_parameters()?.into_values() {
            let location_kind = match param.location {
                ParameterLocation::Path => IrParameterLocation::Path,
                ParameterLocation::Query => IrParameterLocation::Query,
                ParameterLocation::Header => IrParameterLocation::Header,
                ParameterLocation::Cookie => IrParameterLocation::Cookie,
                ParameterLocation::Body => {
                    body_param = Some((param, location));
                    continue;
                }
                ParameterLocation::FormData => {
                    form_params.push((param, location));
                    continue;
                }
            };
            let schema = self.parameter_schema(param, &location)?;
            parameters.push(IrParameter {
                name: param.name.clone(),
                location: location_kind,
                required: param.required,
                deprecated: param.deprecated,
                description: param.description.clone(),
                style: param.style,
                explode: param.explode,
                allow_reserved: param.allow_reserved,
                schema,
            });
        }

        let body = match (&operation.request_body, body_param) {
            (Some(body), _) => self.request_body(body)?,
            (None, Some((param, location))) => Some(self.body_parameter(param, &location)?),
            (None, None) if !form_params.is_empty() => Some(self.form_body(&form_params)?),
            (None, None) => None,
        };

        let responses = self.responses()?;
        let security = self.security();
        let response_map = responses_map(
            &responses,
            self.cx.config,
            &mut self.cx.diagnostics,
            &format!("{}/responses", self.location),
        );

        Ok(IrOperation {
            id,
            method,
            path: path.to_owned(),
            path_params,
            summary: operation.summary.clone().or_else(|| self.item.summary.clone()),
            description: operation
                .description
                .clone()
                .or_else(|| self.item.description.clone()),
            deprecated: operation.deprecated,
            tags: operation.tags.clone(),
            parameters,
            body,
            responses,
            security,
            response_map,
        })
    }

    /// Merges path item and operation parameters, keyed by name and
    /// location. Operation parameters replace path item parameters
    /// with the same key.
    fn merged_parameters(
        &self,
    ) -> Result<IndexMap<(&'a str, ParameterLocation), (&'a Parameter, String)>, IrError> {
        let doc = self.cx.doc;
        let item_location = self
            .location
            .rsplit_once('/')
            .map_or(self.location.as_str(), |(head, _)| head);
        let sources = [
            (&self.item.parameters, item_location),
            (&self.operation.parameters, self.location.as_str()),
        ];
        let mut merged = IndexMap::new();
        for (params, location) in sources {
            for (index, param) in params.iter().enumerate() {
                let param = resolve_ref_or(doc, param)?;
                merged.insert(
                    (param.name.as_str(), param.location),
                    (param, format!("{location}/parameters/{index}")),
                );
            }
        }
        Ok(merged)
    }

    fn parameter_schema(&mut self, param: &Parameter, location: &str) -> Result<IrSchema, IrError> {
        match param.schema() {
            Some(schema) => transform(self.cx, &schema, &format!("{location}/schema")),
            None => Ok(IrSchema::of_type(IrSchemaType::Unknown)),
        }
    }

    fn request_body(&mut self, body: &RefOrRequestBody) -> Result<Option<IrRequestBody>, IrError> {
        let body = resolve_ref_or(self.cx.doc, body)?;
        let Some((media_type, content)) = pick_content(self.cx.config, &body.content) else {
            return Ok(None);
        };
        let location = format!(
            "{}/requestBody/content/{}/schema",
            self.location,
            JsonPointerSegment::new(media_type.as_str()),
        );
        let schema = match &content.schema {
            Some(schema) => transform(self.cx, schema, &location)?,
            None => IrSchema::of_type(IrSchemaType::Unknown),
        };
        Ok(Some(IrRequestBody {
            kind: MediaKind::from_media_type(media_type),
            media_type: media_type.clone(),
            schema: described(schema, body.description.as_deref()),
            required: body.required,
        }))
    }

    /// Builds a request body from a Swagger 2.0 `in: body` parameter.
    fn body_parameter(&mut self, param: &Parameter, location: &str) -> Result<IrRequestBody, IrError> {
        let media_type = pick_media_type(self.cx.config, self.consumes())
            .unwrap_or("application/json")
            .to_owned();
        let schema = self.parameter_schema(param, location)?;
        Ok(IrRequestBody {
            kind: MediaKind::from_media_type(&media_type),
            media_type,
            schema: described(schema, param.description.as_deref()),
            required: param.required,
        })
    }

    /// Builds an object request body from Swagger 2.0
    /// `in: formData` parameters.
    fn form_body(&mut self, params: &[(&Parameter, String)]) -> Result<IrRequestBody, IrError> {
        let multipart = self
            .consumes()
            .iter()
            .any(|media_type| media_type.eq_ignore_ascii_case("multipart/form-data"))
            || params.iter().any(|(param, _)| param.ty.contains(&Ty::Other));
        let media_type = if multipart {
            "multipart/form-data"
        } else {
            "application/x-www-form-urlencoded"
        };

        let mut schema = IrSchema::of_type(IrSchemaType::Object);
        for (param, location) in params {
            let property = self.parameter_schema(param, location)?;
            schema
                .properties
                .insert(param.name.clone(), described(property, param.description.as_deref()));
            if param.required {
                schema.required.insert(param.name.clone());
            }
        }
        Ok(IrRequestBody {
            kind: MediaKind::from_media_type(media_type),
            media_type: media_type.to_owned(),
            required: !schema.required.is_empty(),
            schema,
        })
    }

    fn responses(&mut self) -> Result<IndexMap<String, IrResponse>, IrError> {
        let doc = self.cx.doc;
        let mut responses = IndexMap::new();
        for (code, response) in &self.operation.responses {
            let location = format!(
                "{}/responses/{}",
                self.location,
                JsonPointerSegment::new(code.as_str()),
            );
            let response = resolve_ref_or(doc, response)?;
            let (media_type, schema, location) = match &response.content {
                Some(content) => match pick_content(self.cx.config, content) {
                    Some((media_type, content)) => (
                        Some(media_type.clone()),
                        content.schema.as_ref(),
                        format!(
                            "{location}/content/{}/schema",
                            JsonPointerSegment::new(media_type.as_str()),
                        ),
                    ),
                    None => (None, None, location),
                },
                None => {
                    let media_type = response.schema.as_ref().map(|_| {
                        pick_media_type(self.cx.config, self.produces())
                            .unwrap_or("application/json")
                            .to_owned()
                    });
                    (media_type, response.schema.as_ref(), format!("{location}/schema"))
                }
            };
            let schema = match schema {
                Some(schema) => transform(self.cx, schema, &location)?,
                None if code == "204" => IrSchema::of_type(IrSchemaType::Void),
                None => IrSchema::of_type(IrSchemaType::Unknown),
            };
            responses.insert(
                code.clone(),
                IrResponse {
                    media_type,
                    schema: described(schema, response.description.as_deref()),
                },
            );
        }
        Ok(responses)
    }

    /// Resolves the operation's security requirements, or the document's
    /// if the operation doesn't have its own. Each scheme is listed once.
    fn security(&mut self) -> Vec<IrSecurityScheme> {
        let doc = self.cx.doc;
        let (requirements, location) = match &self.operation.security {
            Some(requirements) => (requirements, format!("{}/security", self.location)),
            None => match &doc.security {
                Some(requirements) => (requirements, "#/security".to_owned()),
                None => return vec![],
            },
        };
        let mut seen = IndexSet::new();
        let mut schemes = vec![];
        for (index, requirement) in requirements.iter().enumerate() {
            for name in requirement.keys() {
                if !seen.insert(name.as_str()) {
                    continue;
                }
                match doc.security_scheme(name) {
                    Some(scheme) => match security_scheme(scheme) {
                        Some(scheme) => schemes.push(scheme),
                        None => self.cx.diagnostic(
                            DiagnosticKind::UnknownSecurityScheme,
                            format!("{location}/{index}"),
                            format!("security scheme `{name}` has unsupported type `{}`", scheme.ty),
                        ),
                    },
                    None => self.cx.diagnostic(
                        DiagnosticKind::UnknownSecurityScheme,
                        format!("{location}/{index}"),
                        format!("security scheme `{name}` isn't defined"),
                    ),
                }
            }
        }
        schemes
    }

    fn consumes(&self) -> &'a [String] {
        match &self.operation.consumes {
            Some(consumes) => consumes,
            None => &self.cx.doc.consumes,
        }
    }

    fn produces(&self) -> &'a [String] {
        match &self.operation.produces {
            Some(produces) => produces,
            None => &self.cx.doc.produces,
        }
    }
}

/// Converts a security scheme definition, or returns `None`
/// if it's of an unknown type, or incomplete.
fn security_scheme(scheme: &SecurityScheme) -> Option<IrSecurityScheme> {
    let description = scheme.description.clone();
    Some(match scheme.ty.as_str() {
        "apiKey" => IrSecurityScheme::ApiKey {
            name: scheme.name.clone()?,
            location: scheme.location.clone()?,
            description,
        },
        "http" => IrSecurityScheme::Http {
            scheme: scheme.scheme.clone()?.to_ascii_lowercase(),
            bearer_format: scheme.bearer_format.clone(),
            description,
        },
        "basic" => IrSecurityScheme::Http {
            scheme: "basic".to_owned(),
            bearer_format: None,
            description,
        },
        "oauth2" => IrSecurityScheme::OAuth2 {
            flows: match &scheme.flow {
                Some(flow) => vec![flow.clone()],
                None => scheme.flows.keys().cloned().collect(),
            },
            description,
        },
        "openIdConnect" => IrSecurityScheme::OpenIdConnect {
            open_id_connect_url: scheme.open_id_connect_url.clone()?,
            description,
        },
        _ => return None,
    })
}

/// Fills in a node's description, if it doesn't have one.
fn described(mut node: IrSchema, description: Option<&str>) -> IrSchema {
    if node.doc.description.is_none() {
        node.doc.description = description.map(str::to_owned);
    }
    node
}

/// Picks the most preferred entry from a `content` map, or the first
/// entry if no preference matches.
fn pick_content<'m>(
    config: &ParserConfig,
    content: &'m IndexMap<String, MediaType>,
) -> Option<(&'m String, &'m MediaType)> {
    content
        .iter()
        .min_by_key(|(media_type, _)| config.media_type_rank(media_type).unwrap_or(usize::MAX))
}

/// Picks the most preferred media type from a `consumes`
/// or `produces` list.
fn pick_media_type<'m>(config: &ParserConfig, media_types: &'m [String]) -> Option<&'m str> {
    media_types
        .iter()
        .min_by_key(|media_type| config.media_type_rank(media_type).unwrap_or(usize::MAX))
        .map(String::as_str)
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum StatusGroup {
    Informational,
    Success,
    Redirection,
    ClientError,
    ServerError,
    Default,
}

impl StatusGroup {
    /// Classifies a response key. Literal ranges like `4XX`
    /// and `default` map to themselves; other keys map to
    /// the range of their first digit.
    pub fn of(code: &str) -> Option<Self> {
        if code == "default" {
            return Some(Self::Default);
        }
        Some(match code.as_bytes().first()? {
            b'1' => Self::Informational,
            b'2' => Self::Success,
            b'3' => Self::Redirection,
            b'4' => Self::ClientError,
            b'5' => Self::ServerError,
            _ => return None,
        })
    }
}

/// Groups an operation's responses into success and error sets,
/// and derives a union for each.
///
/// Informational and redirection responses are left out. The `default`
/// response is assigned last: it's a success if there are no other
/// successes, or if its description or reference mentions a success
/// keyword; and an error if it mentions an error keyword, or if
/// it wasn't assigned otherwise.
pub fn responses_map(
    responses: &IndexMap<String, IrResponse>,
    config: &ParserConfig,
    diagnostics: &mut Diagnostics,
    location: &str,
) -> IrResponsesMap {
    let mut successes = IndexMap::new();
    let mut errors = IndexMap::new();
    let mut default = None;
    for (code, response) in responses {
        match StatusGroup::of(code) {
            Some(StatusGroup::Success) => {
                successes.insert(code.as_str(), &response.schema);
            }
            Some(StatusGroup::ClientError | StatusGroup::ServerError) => {
                errors.insert(code.as_str(), &response.schema);
            }
            Some(StatusGroup::Default) => default = Some(&response.schema),
            Some(StatusGroup::Informational | StatusGroup::Redirection) => (),
            None => diagnostics.push(
                DiagnosticKind::UnrecognizedStatusCode,
                format!("{location}/{}", JsonPointerSegment::new(code.as_str())),
                format!("`{code}` isn't a status code, range, or `default`"),
            ),
        }
    }

    if let Some(schema) = default {
        let mut inferred = false;
        if successes.is_empty() {
            successes.insert("default", schema);
            inferred = true;
        }
        let description = schema.doc.description.as_deref().unwrap_or("").to_lowercase();
        let reference = schema.reference.as_deref().unwrap_or("").to_lowercase();
        let mentions = |keywords: &[String]| {
            keywords.iter().any(|keyword| {
                let keyword = keyword.to_lowercase();
                description.contains(&keyword) || reference.contains(&keyword)
            })
        };
        if mentions(&config.success_keywords) {
            successes.insert("default", schema);
            inferred = true;
        }
        if mentions(&config.error_keywords) {
            errors.insert("default", schema);
            inferred = true;
        }
        if !inferred {
            errors.insert("default", schema);
        }
    }

    let (responses, response) = group(&successes);
    let (errors, error) = group(&errors);
    IrResponsesMap {
        responses,
        response,
        errors,
        error,
    }
}

/// Returns an object of schemas by status code, and their union.
fn group(schemas: &IndexMap<&str, &IrSchema>) -> (Option<IrSchema>, Option<IrSchema>) {
    if schemas.is_empty() {
        return (None, None);
    }
    let object = IrSchema {
        ty: Some(IrSchemaType::Object),
        properties: schemas
            .iter()
            .map(|(&code, &schema)| (code.to_owned(), schema.clone()))
            .collect(),
        required: schemas.keys().map(|&code| code.to_owned()).collect(),
        ..Default::default()
    };
    let union = dedupe(IrSchema::composition(
        LogicalOperator::Or,
        schemas.values().map(|&schema| schema.clone()).collect(),
    ));
    let union = (!union.is_empty() && union.ty != Some(IrSchemaType::Unknown)).then_some(union);
    (Some(object), union)
}
