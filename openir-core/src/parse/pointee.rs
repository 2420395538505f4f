//! [`JsonPointee`] impls for the document model, so that `$ref`
//! pointers can walk it without going through untyped JSON.

use openir_pointer::{BadJsonPointer, BadJsonPointerKey, BadJsonPointerTy, JsonPointee, JsonPointer};

use super::types::{
    AdditionalProperties, Components, Document, MediaType, Operation, Parameter, PathItem, RefOr,
    RequestBody, Response, Schema, SecurityScheme,
};

/// Implements [`JsonPointee`] for a struct, mapping each
/// document key to the field that holds its value.
macro_rules! impl_pointee {
    ($ty:ty { $($key:literal => $field:ident),+ $(,)? }) => {
        impl JsonPointee for $ty {
            fn resolve(&self, pointer: JsonPointer<'_>) -> Result<&dyn JsonPointee, BadJsonPointer> {
                let Some(key) = pointer.head() else {
                    return Ok(self);
                };
                match key.as_str() {
                    $($key => self.$field.resolve(pointer.tail()),)+
                    _ => Err(BadJsonPointerKey::with_suggestions(key, [$($key),+]).into()),
                }
            }
        }
    };
}

impl_pointee!(Document {
    "paths" => paths,
    "components" => components,
    "definitions" => definitions,
    "parameters" => parameters,
    "responses" => responses,
    "securityDefinitions" => security_definitions,
});

impl_pointee!(Components {
    "schemas" => schemas,
    "responses" => responses,
    "parameters" => parameters,
    "requestBodies" => request_bodies,
    "securitySchemes" => security_schemes,
});

impl_pointee!(PathItem {
    "get" => get,
    "put" => put,
    "post" => post,
    "delete" => delete,
    "options" => options,
    "head" => head,
    "patch" => patch,
    "trace" => trace,
    "parameters" => parameters,
});

impl_pointee!(Operation {
    "parameters" => parameters,
    "requestBody" => request_body,
    "responses" => responses,
});

impl_pointee!(Parameter {
    "schema" => schema,
    "items" => items,
});

impl_pointee!(RequestBody {
    "content" => content,
});

impl_pointee!(Response {
    "content" => content,
    "schema" => schema,
});

impl_pointee!(MediaType {
    "schema" => schema,
});

impl_pointee!(Schema {
    "properties" => properties,
    "additionalProperties" => additional_properties,
    "items" => items,
    "enum" => variants,
    "allOf" => all_of,
    "anyOf" => any_of,
    "oneOf" => one_of,
});

impl JsonPointee for SecurityScheme {
    fn resolve(&self, pointer: JsonPointer<'_>) -> Result<&dyn JsonPointee, BadJsonPointer> {
        if pointer.is_empty() {
            Ok(self)
        } else {
            Err(BadJsonPointerTy::new(&pointer, "security scheme").into())
        }
    }
}

impl<T: JsonPointee> JsonPointee for RefOr<T> {
    fn resolve(&self, pointer: JsonPointer<'_>) -> Result<&dyn JsonPointee, BadJsonPointer> {
        match self {
            Self::Other(value) => value.resolve(pointer),
            // Pointers don't follow references; the caller sees the
            // reference itself, and decides whether to follow it.
            Self::Ref(_) if pointer.is_empty() => Ok(self),
            Self::Ref(_) => Err(BadJsonPointerTy::new(&pointer, "reference").into()),
        }
    }
}

impl JsonPointee for AdditionalProperties {
    fn resolve(&self, pointer: JsonPointer<'_>) -> Result<&dyn JsonPointee, BadJsonPointer> {
        match self {
            Self::RefOrSchema(schema) => schema.resolve(pointer),
            Self::Bool(_) if pointer.is_empty() => Ok(self),
            Self::Bool(_) => Err(BadJsonPointerTy::new(&pointer, "boolean").into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::{parse::RefOrSchema, tests::assert_matches};

    fn doc() -> Document {
        Document::from_yaml(indoc::indoc! {"
            openapi: 3.0.0
            info:
              title: Test
              version: 1.0.0
            paths:
              /pets:
                get:
                  responses:
                    '200':
                      description: OK
                      content:
                        application/json:
                          schema:
                            type: array
                            items:
                              $ref: '#/components/schemas/Pet'
            components:
              schemas:
                Pet:
                  type: object
                  properties:
                    id:
                      type: string
                    owner:
                      $ref: '#/components/schemas/Owner'
                Owner:
                  type: object
        "})
        .unwrap()
    }

    #[test]
    fn test_resolve_component_schema() {
        let doc = doc();
        let pointer = JsonPointer::parse("/components/schemas/Pet").unwrap();
        let schema = doc.resolve(pointer).unwrap().downcast_ref::<Schema>();
        assert_matches!(schema, Some(schema) if schema.properties.is_some());
    }

    #[test]
    fn test_resolve_nested_property() {
        let doc = doc();
        let pointer = JsonPointer::parse("/components/schemas/Pet/properties/id").unwrap();
        assert!(doc.resolve(pointer).unwrap().is::<Schema>());
    }

    #[test]
    fn test_resolve_stops_at_reference() {
        let doc = doc();
        let pointer = JsonPointer::parse("/components/schemas/Pet/properties/owner").unwrap();
        assert!(doc.resolve(pointer).unwrap().is::<RefOrSchema>());

        let pointer =
            JsonPointer::parse("/components/schemas/Pet/properties/owner/properties").unwrap();
        assert_matches!(doc.resolve(pointer).map(|_| ()), Err(BadJsonPointer::Ty(_)));
    }

    #[test]
    fn test_resolve_path_escaping() {
        let doc = doc();
        let pointer = JsonPointer::parse(
            "/paths/~1pets/get/responses/200/content/application~1json/schema/items",
        )
        .unwrap();
        assert!(doc.resolve(pointer).unwrap().is::<RefOrSchema>());
    }

    #[test]
    fn test_resolve_unknown_key_suggests() {
        let doc = doc();
        let pointer = JsonPointer::parse("/components/schemes/Pet").unwrap();
        assert_matches!(
            doc.resolve(pointer).map(|_| ()),
            Err(BadJsonPointer::Key(err)) if err.suggestion.as_deref() == Some("schemas"),
        );
    }
}
