use indexmap::IndexMap;
use openir_pointer::JsonPointerSegment;
use serde_json::Value;

use crate::parse::{ComponentRef, RefOr, RefOrSchema, Schema, Ty};

use super::{
    context::Context,
    dedupe::dedupe,
    diagnostic::DiagnosticKind,
    error::IrError,
    fields::inherited_property,
    resolve::resolve,
    types::{IrDoc, IrSchema, IrSchemaType, LogicalOperator},
};

/// Normalizes a schema that appears anywhere in the document.
///
/// `location` is the URI fragment of the schema, for diagnostics.
#[inline]
pub fn transform(
    cx: &mut Context<'_>,
    schema: &RefOrSchema,
    location: &str,
) -> Result<IrSchema, IrError> {
    IrTransformer::new(cx, None, location.to_owned()).transform(schema)
}

/// Normalizes a named component schema.
///
/// Only named components receive discriminator tags from their
/// `allOf` parents, because the tag value is derived from the name.
#[inline]
pub fn transform_component(
    cx: &mut Context<'_>,
    name: &str,
    schema: &RefOrSchema,
    location: &str,
) -> Result<IrSchema, IrError> {
    IrTransformer::new(cx, Some(name), location.to_owned()).transform(schema)
}

/// The single shape that a schema is normalized as.
///
/// A schema that uses several composition keywords is classified
/// by the first one that matches, in variant order.
#[derive(Clone, Copy, Debug)]
enum SchemaShape<'s> {
    Ref(&'s ComponentRef),
    Enum(&'s Schema, &'s [Value]),
    AllOf(&'s Schema, &'s [RefOrSchema]),
    AnyOf(&'s Schema, &'s [RefOrSchema]),
    OneOf(&'s Schema, &'s [RefOrSchema]),
    Typed(&'s Schema),
    Untyped(&'s Schema),
}

impl<'s> SchemaShape<'s> {
    fn classify(schema: &'s RefOrSchema) -> Self {
        let schema = match schema {
            RefOr::Ref(r) => return Self::Ref(&r.path),
            RefOr::Other(schema) => schema.as_ref(),
        };
        if let Some(values) = &schema.variants {
            Self::Enum(schema, values)
        } else if let Some(branches) = &schema.all_of {
            Self::AllOf(schema, branches)
        } else if let Some(branches) = &schema.any_of {
            Self::AnyOf(schema, branches)
        } else if let Some(branches) = &schema.one_of {
            Self::OneOf(schema, branches)
        } else if !schema.ty.is_empty() || schema.properties.is_some() || schema.constant.is_some()
        {
            Self::Typed(schema)
        } else {
            Self::Untyped(schema)
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum UnionKind {
    AnyOf,
    OneOf,
}

impl UnionKind {
    fn keyword(self) -> &'static str {
        match self {
            Self::AnyOf => "anyOf",
            Self::OneOf => "oneOf",
        }
    }
}

#[derive(Debug)]
pub(super) struct IrTransformer<'c, 'a> {
    pub(super) cx: &'c mut Context<'a>,
    /// The name of the component being parsed, set only
    /// for the component's own top-level schema.
    root: Option<&'c str>,
    location: String,
}

impl<'c, 'a> IrTransformer<'c, 'a> {
    fn new(cx: &'c mut Context<'a>, root: Option<&'c str>, location: String) -> Self {
        Self { cx, root, location }
    }

    fn transform(mut self, schema: &RefOrSchema) -> Result<IrSchema, IrError> {
        match SchemaShape::classify(schema) {
            SchemaShape::Ref(r) => self.reference(r),
            SchemaShape::Enum(schema, values) => Ok(self.enumeration(schema, values)),
            SchemaShape::AllOf(schema, branches) => self.all_of(schema, branches),
            SchemaShape::AnyOf(schema, branches) => self.union(schema, branches, UnionKind::AnyOf),
            SchemaShape::OneOf(schema, branches) => self.union(schema, branches, UnionKind::OneOf),
            SchemaShape::Typed(schema) => self.typed(schema),
            SchemaShape::Untyped(schema) => Ok(IrSchema {
                ty: Some(IrSchemaType::Unknown),
                doc: docs(schema),
                constraints: super::primitive::constraints(schema),
                ..Default::default()
            }),
        }
    }

    /// Normalizes a schema nested under this one.
    pub(super) fn nested(
        &mut self,
        schema: &RefOrSchema,
        path: &[&str],
    ) -> Result<IrSchema, IrError> {
        let location = self.location_of(path);
        self.at(schema, location)
    }

    /// Normalizes a schema found elsewhere in the document.
    fn at(&mut self, schema: &RefOrSchema, location: String) -> Result<IrSchema, IrError> {
        IrTransformer::new(&mut *self.cx, None, location).transform(schema)
    }

    /// Returns the location of a node nested under this one.
    pub(super) fn location_of(&self, path: &[&str]) -> String {
        path.iter().fold(self.location.clone(), |mut location, segment| {
            location.push('/');
            location.push_str(&JsonPointerSegment::new(*segment).to_string());
            location
        })
    }

    fn reference(&mut self, r: &ComponentRef) -> Result<IrSchema, IrError> {
        // Validate the reference, but never inline the target.
        resolve::<Schema>(self.cx.doc, r)?;
        Ok(IrSchema::of_ref(ir_reference(r)))
    }

    fn enumeration(&mut self, schema: &Schema, values: &[Value]) -> IrSchema {
        let nullable = schema.is_nullable();
        let var_names = schema.extension::<&[Value]>("x-enum-varnames");
        let enum_names = schema.extension::<&[Value]>("x-enumNames");
        let descriptions = schema.extension::<&[Value]>("x-enum-descriptions");
        let nth = |values: Option<&[Value]>, index: usize| {
            values
                .and_then(|values| values.get(index))
                .and_then(Value::as_str)
                .map(str::to_owned)
        };

        let mut items = Vec::with_capacity(values.len());
        for (index, value) in values.iter().enumerate() {
            let ty = match value {
                Value::String(_) => IrSchemaType::String,
                Value::Number(_) => IrSchemaType::Number,
                Value::Bool(_) => IrSchemaType::Boolean,
                Value::Null if nullable => IrSchemaType::Null,
                Value::Null => continue,
                Value::Array(_) | Value::Object(_) => {
                    let location = self.location_of(&["enum", &index.to_string()]);
                    self.cx.diagnostic(
                        DiagnosticKind::UnsupportedEnumValueType,
                        location,
                        format!("skipping enum value `{value}`; only strings, numbers, booleans, and `null` are supported"),
                    );
                    continue;
                }
            };
            items.push(IrSchema {
                ty: Some(ty),
                constant: Some(value.clone()),
                doc: IrDoc {
                    title: nth(var_names, index).or_else(|| nth(enum_names, index)),
                    description: nth(descriptions, index),
                    ..Default::default()
                },
                ..Default::default()
            });
        }

        IrSchema {
            ty: Some(IrSchemaType::Enum),
            logical_operator: Some(LogicalOperator::Or),
            items,
            doc: docs(schema),
            ..Default::default()
        }
    }

    fn all_of(&mut self, schema: &Schema, branches: &[RefOrSchema]) -> Result<IrSchema, IrError> {
        let doc = self.cx.doc;
        let mut items = Vec::with_capacity(branches.len() + 1);
        for (index, branch) in branches.iter().enumerate() {
            let mut node = self.nested(branch, &["allOf", &index.to_string()])?;
            if let RefOr::Other(_) = branch {
                // Promote the parent's required properties onto
                // the branches that declare them.
                for name in &schema.required {
                    if node.properties.contains_key(name) {
                        node.required.insert(name.clone());
                    }
                }
            }
            items.push(node);

            if let (RefOr::Ref(r), Some(root)) = (branch, self.root) {
                let parent = resolve::<Schema>(doc, &r.path)?;
                if let Some(discriminator) = &parent.discriminator {
                    let tag = tag_for_name(&discriminator.mapping, root);
                    let required = parent.required.contains(&discriminator.property_name);
                    items.push(tag_object(&discriminator.property_name, tag, required));
                }
            }
        }

        if infers_object(schema) {
            let shape = self.object_shape(schema, true)?;
            if !shape.properties.is_empty() {
                items.push(shape);
            }
        }

        let node = dedupe(IrSchema {
            doc: docs(schema),
            ..IrSchema::composition(LogicalOperator::And, items)
        });
        Ok(if schema.is_nullable() {
            nullable(node)
        } else {
            node
        })
    }

    fn union(
        &mut self,
        schema: &Schema,
        branches: &[RefOrSchema],
        kind: UnionKind,
    ) -> Result<IrSchema, IrError> {
        let mut items = Vec::with_capacity(branches.len() + 1);
        for (index, branch) in branches.iter().enumerate() {
            let mut node = self.nested(branch, &[kind.keyword(), &index.to_string()])?;
            if let (Some(discriminator), RefOr::Ref(r)) = (&schema.discriminator, branch) {
                let tag = tag_for_ref(&discriminator.mapping, &r.path);
                node = IrSchema::composition(
                    LogicalOperator::And,
                    vec![tag_object(&discriminator.property_name, tag, false), node],
                );
            }
            match node {
                // Lift nested unions, including enums, into this one.
                IrSchema {
                    logical_operator: Some(LogicalOperator::Or),
                    items: members,
                    ..
                } if kind == UnionKind::OneOf => items.extend(members),
                node => items.push(node),
            }
        }
        if schema.is_nullable() {
            items.push(IrSchema::of_type(IrSchemaType::Null));
        }

        let node = dedupe(IrSchema {
            doc: docs(schema),
            ..IrSchema::composition(LogicalOperator::Or, items)
        });
        if infers_object(schema) && schema.properties.is_some() {
            let shape = self.object_shape(schema, false)?;
            if !shape.properties.is_empty() {
                return Ok(IrSchema::composition(
                    LogicalOperator::And,
                    vec![node, shape],
                ));
            }
        }
        Ok(node)
    }

    /// Builds the object shape that a composition's own `properties`
    /// and `required` keywords describe.
    ///
    /// With `backfill`, required properties that the shape doesn't
    /// declare are looked up in its `allOf` ancestors.
    fn object_shape(&mut self, schema: &Schema, backfill: bool) -> Result<IrSchema, IrError> {
        let mut properties = self.properties(schema)?;
        if backfill {
            let doc = self.cx.doc;
            for name in &schema.required {
                if properties.contains_key(name) {
                    continue;
                }
                if let Some((property, location)) =
                    inherited_property(doc, schema, &self.location, name)
                {
                    let node = self.at(property, location)?;
                    properties.insert(name.clone(), node);
                }
            }
        }
        self.object(schema, properties)
    }

    /// Normalizes a schema's declared properties, in order.
    pub(super) fn properties(
        &mut self,
        schema: &Schema,
    ) -> Result<IndexMap<String, IrSchema>, IrError> {
        schema
            .properties
            .iter()
            .flatten()
            .map(|(name, property)| {
                let node = self.nested(property, &["properties", name])?;
                Ok((name.clone(), node))
            })
            .collect()
    }
}

/// Returns the `$ref` string for a reference node. References to
/// named schemas are rewritten to `#/components/schemas/{name}`, so
/// that Swagger 2.0 `#/definitions` references look the same.
pub(super) fn ir_reference(r: &ComponentRef) -> String {
    match r.schema_name() {
        Some(name) => format!("#/components/schemas/{}", JsonPointerSegment::new(name)),
        None => percent_encoding::percent_decode_str(r.as_str())
            .decode_utf8_lossy()
            .into_owned(),
    }
}

/// Returns the documentation metadata of a schema.
pub(super) fn docs(schema: &Schema) -> IrDoc {
    IrDoc {
        description: schema.description.clone(),
        title: schema.title.clone(),
        deprecated: schema.deprecated,
        default: schema.default.clone(),
    }
}

/// Returns `true` if a schema describes an object, either explicitly,
/// or by declaring properties or required property names.
fn infers_object(schema: &Schema) -> bool {
    schema.ty.contains(&Ty::Object) || schema.properties.is_some() || !schema.required.is_empty()
}

/// Wraps a node in a union with `null`, lifting its documentation
/// onto the union.
fn nullable(mut node: IrSchema) -> IrSchema {
    let doc = IrDoc {
        description: node.doc.description.take(),
        title: node.doc.title.take(),
        deprecated: node.doc.deprecated.take(),
        default: None,
    };
    dedupe(IrSchema {
        doc,
        ..IrSchema::composition(
            LogicalOperator::Or,
            vec![node, IrSchema::of_type(IrSchemaType::Null)],
        )
    })
}

/// Returns an object with a single string literal property.
fn tag_object(property: &str, tag: String, required: bool) -> IrSchema {
    let literal = IrSchema {
        ty: Some(IrSchemaType::String),
        constant: Some(Value::String(tag)),
        ..Default::default()
    };
    IrSchema {
        ty: Some(IrSchemaType::Object),
        properties: IndexMap::from_iter([(property.to_owned(), literal)]),
        required: if required {
            std::iter::once(property.to_owned()).collect()
        } else {
            Default::default()
        },
        ..Default::default()
    }
}

/// Returns the discriminator tag for the named schema: the mapping key
/// whose value names the schema, or the name itself.
fn tag_for_name(mapping: &IndexMap<String, String>, name: &str) -> String {
    mapping
        .iter()
        .find(|(_, value)| mapping_names(value, name))
        .map(|(tag, _)| tag.clone())
        .unwrap_or_else(|| name.to_owned())
}

/// Returns the discriminator tag for a reference: the mapping key whose
/// value is the reference, or names the same schema; or else the final
/// segment of the reference.
fn tag_for_ref(mapping: &IndexMap<String, String>, r: &ComponentRef) -> String {
    match mapping.iter().find(|(_, value)| *value == r.as_str()) {
        Some((tag, _)) => tag.clone(),
        None => tag_for_name(mapping, &r.name()),
    }
}

/// Returns `true` if a discriminator mapping value, which can be
/// a reference or a bare schema name, names the schema `name`.
fn mapping_names(value: &str, name: &str) -> bool {
    match value.parse::<ComponentRef>() {
        Ok(r) => r.schema_name().as_deref() == Some(name),
        Err(_) => value == name,
    }
}
