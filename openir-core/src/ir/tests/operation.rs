//! Operation parsing tests.

use indexmap::IndexMap;
use pretty_assertions::assert_eq;

use crate::{
    config::ParserConfig,
    ir::{
        DiagnosticKind, Diagnostics, IrError, IrOperation, IrParameterLocation, IrResponse,
        IrSchema, IrSchemaType, IrSecurityScheme, IrSpec, LogicalOperator, MediaKind,
        StatusGroup, responses_map,
    },
    parse::Method,
    tests::{assert_matches, doc, spec},
};

fn operation<'a>(spec: &'a IrSpec, path: &str, method: Method) -> &'a IrOperation {
    match spec
        .document
        .paths
        .get(path)
        .and_then(|methods| methods.get(&method))
    {
        Some(op) => op,
        None => panic!("no operation `{method} {path}`"),
    }
}

fn described(mut schema: IrSchema, description: &str) -> IrSchema {
    schema.doc.description = Some(description.to_owned());
    schema
}

// MARK: IDs

#[test]
fn test_fallback_operation_ids() {
    let spec = spec(indoc::indoc! {"
        openapi: 3.0.0
        info:
          title: Test
          version: 1.0.0
        paths:
          /users/{id}:
            get:
              responses: {}
          /users/{userId}/posts:
            post:
              responses: {}
    "});

    assert_eq!(operation(&spec, "/users/{id}", Method::Get).id, "getUsersById");
    assert_eq!(
        operation(&spec, "/users/{userId}/posts", Method::Post).id,
        "postUsersByUserIdPosts"
    );
}

#[test]
fn test_duplicate_operation_ids_renamed() {
    let spec = spec(indoc::indoc! {"
        openapi: 3.0.0
        info:
          title: Test
          version: 1.0.0
        paths:
          /users:
            get:
              operationId: listUsers
              responses: {}
          /people:
            get:
              operationId: listUsers
              responses: {}
          /folks:
            get:
              operationId: listUsers
              responses: {}
    "});

    let ids = spec
        .document
        .operations()
        .map(|op| op.id.as_str())
        .collect::<Vec<_>>();
    assert_eq!(ids, ["listUsers", "listUsers2", "listUsers3"]);

    let locations = spec
        .diagnostics
        .of_kind(DiagnosticKind::DuplicateOperationId)
        .map(|diagnostic| diagnostic.location.as_str())
        .collect::<Vec<_>>();
    assert_eq!(
        locations,
        [
            "#/paths/~1people/get/operationId",
            "#/paths/~1folks/get/operationId",
        ]
    );
}

#[test]
fn test_duplicate_operation_ids_strict() {
    let config = ParserConfig::from_toml("strict-operation-ids = true").unwrap();
    let result = IrSpec::from_doc_with_config(
        &doc(indoc::indoc! {"
            openapi: 3.0.0
            info:
              title: Test
              version: 1.0.0
            paths:
              /users:
                get:
                  operationId: listUsers
                  responses: {}
                post:
                  operationId: listUsers
                  responses: {}
        "}),
        &config,
    );

    assert_matches!(
        result,
        Err(IrError::DuplicateOperationId { id, first, second })
            if id == "listUsers" && first == "GET /users" && second == "POST /users",
    );
}

// MARK: Paths

#[test]
fn test_path_params() {
    let spec = spec(indoc::indoc! {"
        openapi: 3.0.0
        info:
          title: Test
          version: 1.0.0
        paths:
          /pets/{petId}/toys/{toyId}:
            get:
              operationId: getToy
              responses: {}
    "});

    let op = operation(&spec, "/pets/{petId}/toys/{toyId}", Method::Get);
    assert_eq!(op.path_params, ["petId", "toyId"]);
    assert!(spec.diagnostics.is_empty());
}

#[test]
fn test_bad_path_template() {
    let spec = spec(indoc::indoc! {"
        openapi: 3.0.0
        info:
          title: Test
          version: 1.0.0
        paths:
          '/pets/{petId':
            get:
              responses: {}
    "});

    let op = operation(&spec, "/pets/{petId", Method::Get);
    assert!(op.path_params.is_empty());
    assert_eq!(op.id, "getPetsByPetId");

    let locations = spec
        .diagnostics
        .of_kind(DiagnosticKind::BadPathTemplate)
        .map(|diagnostic| diagnostic.location.as_str())
        .collect::<Vec<_>>();
    assert_eq!(locations, ["#/paths/~1pets~1{petId"]);
}

// MARK: Parameters

#[test]
fn test_parameters_merged() {
    let spec = spec(indoc::indoc! {"
        openapi: 3.0.0
        info:
          title: Test
          version: 1.0.0
        paths:
          /pets/{petId}:
            parameters:
              - name: petId
                in: path
                required: true
                schema:
                  type: string
              - name: limit
                in: query
                schema:
                  type: integer
            get:
              operationId: getPet
              parameters:
                - name: limit
                  in: query
                  required: true
                  description: page size
                  schema:
                    type: integer
                - name: limit
                  in: header
                  schema:
                    type: string
                - $ref: '#/components/parameters/Verbose'
              responses: {}
        components:
          parameters:
            Verbose:
              name: verbose
              in: query
              deprecated: true
              style: form
              explode: false
              schema:
                type: boolean
    "});

    let op = operation(&spec, "/pets/{petId}", Method::Get);
    let params = op
        .parameters
        .iter()
        .map(|param| (param.name.as_str(), param.location, param.required))
        .collect::<Vec<_>>();
    assert_eq!(
        params,
        [
            ("petId", IrParameterLocation::Path, true),
            ("limit", IrParameterLocation::Query, true),
            ("limit", IrParameterLocation::Header, false),
            ("verbose", IrParameterLocation::Query, false),
        ]
    );
    assert_eq!(op.parameters[1].description.as_deref(), Some("page size"));
    assert_eq!(
        op.parameters[1].schema,
        IrSchema::of_type(IrSchemaType::Number)
    );
    assert_eq!(op.parameters[3].deprecated, Some(true));
    assert_eq!(op.parameters[3].explode, Some(false));
    assert!(op.has_required_data());
}

#[test]
fn test_swagger_inline_parameter_types() {
    let spec = spec(indoc::indoc! {"
        swagger: '2.0'
        info:
          title: Test
          version: 1.0.0
        paths:
          /pets:
            get:
              operationId: listPets
              parameters:
                - name: tags
                  in: query
                  type: array
                  items:
                    type: string
                - name: sort
                  in: query
                  type: string
                  enum: [asc, desc]
              responses: {}
    "});

    let op = operation(&spec, "/pets", Method::Get);
    assert_eq!(op.parameters[0].schema.ty, Some(IrSchemaType::Array));
    assert_eq!(
        op.parameters[0].schema.items,
        [IrSchema::of_type(IrSchemaType::String)]
    );
    assert_eq!(op.parameters[1].schema.ty, Some(IrSchemaType::Enum));
    assert!(!op.has_required_data());
}

// MARK: Request bodies

#[test]
fn test_request_body_media_type_preference() {
    let spec = spec(indoc::indoc! {"
        openapi: 3.0.0
        info:
          title: Test
          version: 1.0.0
        paths:
          /pets:
            post:
              operationId: createPet
              requestBody:
                description: the pet
                required: true
                content:
                  application/xml:
                    schema:
                      type: string
                  application/json; charset=utf-8:
                    schema:
                      $ref: '#/components/schemas/Pet'
              responses: {}
        components:
          schemas:
            Pet:
              type: object
    "});

    let op = operation(&spec, "/pets", Method::Post);
    let body = op.body.as_ref().unwrap();
    assert_eq!(body.media_type, "application/json; charset=utf-8");
    assert_eq!(body.kind, Some(MediaKind::Json));
    assert!(body.required);
    assert_eq!(
        body.schema,
        described(IrSchema::of_ref("#/components/schemas/Pet"), "the pet")
    );
    assert!(op.has_required_data());
}

#[test]
fn test_request_body_falls_back_to_first_entry() {
    let config = ParserConfig::from_toml(r#"media-types = ["application/json"]"#).unwrap();
    let spec = IrSpec::from_doc_with_config(
        &doc(indoc::indoc! {"
            openapi: 3.0.0
            info:
              title: Test
              version: 1.0.0
            paths:
              /upload:
                put:
                  operationId: upload
                  requestBody:
                    $ref: '#/components/requestBodies/Upload'
                  responses: {}
            components:
              requestBodies:
                Upload:
                  content:
                    application/octet-stream:
                      schema:
                        type: string
                        format: binary
                    text/plain:
                      schema:
                        type: string
        "}),
        &config,
    )
    .unwrap();

    let body = operation(&spec, "/upload", Method::Put).body.as_ref().unwrap();
    assert_eq!(body.media_type, "application/octet-stream");
    assert_eq!(body.kind, Some(MediaKind::OctetStream));
    assert!(!body.required);
}

#[test]
fn test_swagger_body_parameter() {
    let spec = spec(indoc::indoc! {"
        swagger: '2.0'
        info:
          title: Test
          version: 1.0.0
        consumes: [application/json]
        paths:
          /pets:
            post:
              operationId: createPet
              parameters:
                - name: body
                  in: body
                  required: true
                  description: the pet
                  schema:
                    $ref: '#/definitions/Pet'
              responses: {}
        definitions:
          Pet:
            type: object
    "});

    let op = operation(&spec, "/pets", Method::Post);
    assert!(op.parameters.is_empty());
    let body = op.body.as_ref().unwrap();
    assert_eq!(body.media_type, "application/json");
    assert_eq!(
        body.schema,
        described(IrSchema::of_ref("#/components/schemas/Pet"), "the pet")
    );
    assert!(body.required);
}

#[test]
fn test_swagger_form_data() {
    let spec = spec(indoc::indoc! {"
        swagger: '2.0'
        info:
          title: Test
          version: 1.0.0
        paths:
          /login:
            post:
              operationId: login
              parameters:
                - name: user
                  in: formData
                  type: string
                  required: true
                - name: remember
                  in: formData
                  type: boolean
              responses: {}
          /avatar:
            post:
              operationId: uploadAvatar
              parameters:
                - name: file
                  in: formData
                  type: file
              responses: {}
    "});

    let login = operation(&spec, "/login", Method::Post).body.as_ref().unwrap();
    assert_eq!(login.kind, Some(MediaKind::UrlSearchParams));
    assert_eq!(login.schema.ty, Some(IrSchemaType::Object));
    assert_eq!(
        login.schema.properties.keys().collect::<Vec<_>>(),
        ["user", "remember"]
    );
    assert_eq!(
        login.schema.required.iter().collect::<Vec<_>>(),
        ["user"]
    );
    assert!(login.required);

    let avatar = operation(&spec, "/avatar", Method::Post).body.as_ref().unwrap();
    assert_eq!(avatar.kind, Some(MediaKind::FormData));
    assert!(!avatar.required);
}

// MARK: Responses

#[test]
fn test_responses() {
    let spec = spec(indoc::indoc! {"
        openapi: 3.0.0
        info:
          title: Test
          version: 1.0.0
        paths:
          /pets/{petId}:
            delete:
              operationId: deletePet
              responses:
                '200':
                  description: the deleted pet
                  content:
                    application/json:
                      schema:
                        $ref: '#/components/schemas/Pet'
                '204':
                  description: nothing
                '404':
                  $ref: '#/components/responses/NotFound'
        components:
          schemas:
            Pet:
              type: object
          responses:
            NotFound:
              description: not found
    "});

    let op = operation(&spec, "/pets/{petId}", Method::Delete);
    assert_eq!(
        op.responses.keys().collect::<Vec<_>>(),
        ["200", "204", "404"]
    );
    assert_eq!(op.responses["200"].media_type.as_deref(), Some("application/json"));
    assert_eq!(
        op.responses["200"].schema,
        described(IrSchema::of_ref("#/components/schemas/Pet"), "the deleted pet")
    );
    assert_eq!(op.responses["204"].media_type, None);
    assert_eq!(
        op.responses["204"].schema,
        described(IrSchema::of_type(IrSchemaType::Void), "nothing")
    );
    assert_eq!(
        op.responses["404"].schema,
        described(IrSchema::of_type(IrSchemaType::Unknown), "not found")
    );

    // The union of successes contains both the pet and `void`.
    let response = op.response_map.response.as_ref().unwrap();
    assert_eq!(response.logical_operator, Some(LogicalOperator::Or));
    assert_eq!(response.items.len(), 2);
    // The only error is `unknown`, so there's no error union.
    assert!(op.response_map.errors.is_some());
    assert!(op.response_map.error.is_none());
}

#[test]
fn test_swagger_response_schema() {
    let spec = spec(indoc::indoc! {"
        swagger: '2.0'
        info:
          title: Test
          version: 1.0.0
        produces: [application/xml, application/json]
        paths:
          /pets:
            get:
              operationId: listPets
              responses:
                '200':
                  description: pets
                  schema:
                    type: array
                    items:
                      $ref: '#/definitions/Pet'
        definitions:
          Pet:
            type: object
    "});

    let response = &operation(&spec, "/pets", Method::Get).responses["200"];
    assert_eq!(response.media_type.as_deref(), Some("application/json"));
    assert_eq!(response.schema.ty, Some(IrSchemaType::Array));
    assert_eq!(
        response.schema.items,
        [IrSchema::of_ref("#/components/schemas/Pet")]
    );
}

#[test]
fn test_default_error_response_without_success() {
    let spec = spec(indoc::indoc! {"
        openapi: 3.0.0
        info:
          title: Test
          version: 1.0.0
        paths:
          /pets:
            get:
              operationId: listPets
              responses:
                default:
                  description: unexpected error
                  content:
                    application/json:
                      schema:
                        $ref: '#/components/schemas/Error'
        components:
          schemas:
            Error:
              type: object
    "});

    let map = &operation(&spec, "/pets", Method::Get).response_map;
    let expected = described(
        IrSchema::of_ref("#/components/schemas/Error"),
        "unexpected error",
    );
    assert_eq!(map.response.as_ref(), Some(&expected));
    assert_eq!(map.error.as_ref(), Some(&expected));
    let responses = map.responses.as_ref().unwrap();
    assert_eq!(responses.required.iter().collect::<Vec<_>>(), ["default"]);
}

#[test]
fn test_status_groups() {
    assert_eq!(StatusGroup::of("200"), Some(StatusGroup::Success));
    assert_eq!(StatusGroup::of("2XX"), Some(StatusGroup::Success));
    assert_eq!(StatusGroup::of("404"), Some(StatusGroup::ClientError));
    assert_eq!(StatusGroup::of("4XX"), Some(StatusGroup::ClientError));
    assert_eq!(StatusGroup::of("5XX"), Some(StatusGroup::ServerError));
    assert_eq!(StatusGroup::of("default"), Some(StatusGroup::Default));
    assert_eq!(StatusGroup::of("101"), Some(StatusGroup::Informational));
    assert_eq!(StatusGroup::of("302"), Some(StatusGroup::Redirection));
    assert_eq!(StatusGroup::of("ok"), None);
    assert_eq!(StatusGroup::of(""), None);
}

fn responses(entries: &[(&str, IrSchema)]) -> IndexMap<String, IrResponse> {
    entries
        .iter()
        .map(|(code, schema)| {
            let response = IrResponse {
                media_type: None,
                schema: schema.clone(),
            };
            (code.to_string(), response)
        })
        .collect()
}

#[test]
fn test_responses_map_groups() {
    let string = IrSchema::of_type(IrSchemaType::String);
    let number = IrSchema::of_type(IrSchemaType::Number);
    let mut diagnostics = Diagnostics::default();
    let map = responses_map(
        &responses(&[
            ("100", IrSchema::of_type(IrSchemaType::Boolean)),
            ("200", string.clone()),
            ("2XX", string.clone()),
            ("301", IrSchema::of_type(IrSchemaType::Boolean)),
            ("404", number.clone()),
            ("5XX", number.clone()),
            ("oops", IrSchema::of_type(IrSchemaType::Boolean)),
        ]),
        &ParserConfig::default(),
        &mut diagnostics,
        "#/paths/~1pets/get/responses",
    );

    let responses = map.responses.unwrap();
    assert_eq!(responses.properties.keys().collect::<Vec<_>>(), ["200", "2XX"]);
    assert_eq!(map.response, Some(string));
    let errors = map.errors.unwrap();
    assert_eq!(errors.properties.keys().collect::<Vec<_>>(), ["404", "5XX"]);
    assert_eq!(map.error, Some(number));

    let diagnostics = diagnostics.iter().collect::<Vec<_>>();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].kind, DiagnosticKind::UnrecognizedStatusCode);
    assert_eq!(diagnostics[0].location, "#/paths/~1pets/get/responses/oops");
}

#[test]
fn test_responses_map_default_inference() {
    let config = ParserConfig::default();
    let success = IrSchema::of_type(IrSchemaType::String);
    let infer = |default: IrSchema| {
        responses_map(
            &responses(&[("200", success.clone()), ("default", default)]),
            &config,
            &mut Diagnostics::default(),
            "#",
        )
    };
    let groups = |default: IrSchema| {
        let map = infer(default);
        let in_responses = map
            .responses
            .is_some_and(|responses| responses.properties.contains_key("default"));
        let in_errors = map
            .errors
            .is_some_and(|errors| errors.properties.contains_key("default"));
        (in_responses, in_errors)
    };

    // With other successes, an unremarkable default is an error.
    assert_eq!(
        groups(IrSchema::of_type(IrSchemaType::Number)),
        (false, true)
    );
    assert_eq!(
        groups(described(
            IrSchema::of_type(IrSchemaType::Number),
            "Successful operation"
        )),
        (true, false)
    );
    assert_eq!(
        groups(IrSchema::of_ref("#/components/schemas/Problem")),
        (false, true)
    );
    assert_eq!(
        groups(described(
            IrSchema::of_ref("#/components/schemas/SuccessOrError"),
            "either"
        )),
        (true, true)
    );
}

#[test]
fn test_responses_map_custom_keywords() {
    let config = ParserConfig::from_toml(indoc::indoc! {r#"
        success-keywords = ["ok"]
        error-keywords = ["fault"]
    "#})
    .unwrap();
    let map = responses_map(
        &responses(&[
            ("201", IrSchema::of_type(IrSchemaType::String)),
            (
                "default",
                described(IrSchema::of_type(IrSchemaType::Number), "Everything OK"),
            ),
        ]),
        &config,
        &mut Diagnostics::default(),
        "#",
    );
    assert!(map.errors.is_none());
    assert_eq!(
        map.responses
            .unwrap()
            .properties
            .keys()
            .collect::<Vec<_>>(),
        ["201", "default"]
    );
}

#[test]
fn test_responses_map_empty() {
    let map = responses_map(
        &IndexMap::new(),
        &ParserConfig::default(),
        &mut Diagnostics::default(),
        "#",
    );
    assert!(map.responses.is_none());
    assert!(map.response.is_none());
    assert!(map.errors.is_none());
    assert!(map.error.is_none());
}

// MARK: Security

#[test]
fn test_security_schemes() {
    let spec = spec(indoc::indoc! {"
        openapi: 3.0.0
        info:
          title: Test
          version: 1.0.0
        security:
          - apiKey: []
        paths:
          /pets:
            get:
              operationId: listPets
              responses: {}
            post:
              operationId: createPet
              security:
                - bearer: []
                  oauth: [write]
                - bearer: []
                - missing: []
              responses: {}
        components:
          securitySchemes:
            apiKey:
              type: apiKey
              name: X-Api-Key
              in: header
            bearer:
              type: http
              scheme: Bearer
              bearerFormat: JWT
            oauth:
              type: oauth2
              flows:
                authorizationCode:
                  authorizationUrl: https://example.com/auth
                  tokenUrl: https://example.com/token
                  scopes: {}
    "});

    assert_eq!(
        operation(&spec, "/pets", Method::Get).security,
        [IrSecurityScheme::ApiKey {
            name: "X-Api-Key".to_owned(),
            location: "header".to_owned(),
            description: None,
        }]
    );
    assert_eq!(
        operation(&spec, "/pets", Method::Post).security,
        [
            IrSecurityScheme::Http {
                scheme: "bearer".to_owned(),
                bearer_format: Some("JWT".to_owned()),
                description: None,
            },
            IrSecurityScheme::OAuth2 {
                flows: vec!["authorizationCode".to_owned()],
                description: None,
            },
        ]
    );

    let locations = spec
        .diagnostics
        .of_kind(DiagnosticKind::UnknownSecurityScheme)
        .map(|diagnostic| diagnostic.location.as_str())
        .collect::<Vec<_>>();
    assert_eq!(locations, ["#/paths/~1pets/post/security/2"]);
}

#[test]
fn test_swagger_security_definitions() {
    let spec = spec(indoc::indoc! {"
        swagger: '2.0'
        info:
          title: Test
          version: 1.0.0
        paths:
          /pets:
            get:
              operationId: listPets
              security:
                - basic: []
                - petstore: []
              responses: {}
        securityDefinitions:
          basic:
            type: basic
          petstore:
            type: oauth2
            flow: implicit
            authorizationUrl: https://example.com/auth
    "});

    assert_eq!(
        operation(&spec, "/pets", Method::Get).security,
        [
            IrSecurityScheme::Http {
                scheme: "basic".to_owned(),
                bearer_format: None,
                description: None,
            },
            IrSecurityScheme::OAuth2 {
                flows: vec!["implicit".to_owned()],
                description: None,
            },
        ]
    );
}
