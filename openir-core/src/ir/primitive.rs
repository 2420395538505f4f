use indexmap::IndexMap;
use itertools::Itertools;
use serde_json::{Number, Value};

use crate::parse::{AdditionalProperties, ExclusiveBound, Schema, Ty};

use super::{
    dedupe::dedupe,
    error::IrError,
    transform::{IrTransformer, docs},
    types::{AccessScope, IrConstraints, IrSchema, IrSchemaType, LogicalOperator},
};

/// The longest fixed-length array that's normalized as a tuple.
/// Longer ones stay arrays.
pub const MAX_TUPLE_LEN: usize = 256;

impl IrTransformer<'_, '_> {
    /// Normalizes a schema with an explicit or inferred `type`.
    pub(super) fn typed(&mut self, schema: &Schema) -> Result<IrSchema, IrError> {
        let nullable = schema.is_nullable();
        let mut types = schema
            .ty
            .iter()
            .copied()
            .filter(|&ty| ty != Ty::Null)
            .unique()
            .collect_vec();
        if types.is_empty() {
            if schema.properties.is_some() {
                types.push(Ty::Object);
            } else if let Some(ty) = schema.constant.as_ref().and_then(literal_type) {
                types.push(ty);
            }
        }

        let mut nodes = types
            .into_iter()
            .map(|ty| self.primitive(schema, ty))
            .collect::<Result<Vec<_>, _>>()?;

        if nodes.is_empty() {
            // Only `null` remains.
            return Ok(IrSchema {
                ty: Some(IrSchemaType::Null),
                constant: schema.constant.clone(),
                doc: docs(schema),
                ..Default::default()
            });
        }
        if nodes.len() == 1 && !nullable {
            let mut node = nodes.remove(0);
            node.doc = docs(schema);
            return Ok(node);
        }
        if nullable {
            nodes.push(IrSchema::of_type(IrSchemaType::Null));
        }
        Ok(dedupe(IrSchema {
            doc: docs(schema),
            ..IrSchema::composition(LogicalOperator::Or, nodes)
        }))
    }

    /// Normalizes one of a schema's types, without documentation.
    fn primitive(&mut self, schema: &Schema, ty: Ty) -> Result<IrSchema, IrError> {
        let mut node = match ty {
            Ty::String => IrSchema::of_type(IrSchemaType::String),
            Ty::Integer | Ty::Number => IrSchema::of_type(IrSchemaType::Number),
            Ty::Boolean => IrSchema::of_type(IrSchemaType::Boolean),
            Ty::Null => IrSchema::of_type(IrSchemaType::Null),
            Ty::Array => self.array(schema)?,
            Ty::Object => {
                let properties = self.properties(schema)?;
                self.object(schema, properties)?
            }
            Ty::Other => IrSchema::of_type(IrSchemaType::Unknown),
        };
        node.constraints = constraints(schema);
        node.constant = schema.constant.clone();
        Ok(node)
    }

    fn array(&mut self, schema: &Schema) -> Result<IrSchema, IrError> {
        let item = schema
            .items
            .as_ref()
            .map(|items| self.nested(items, &["items"]))
            .transpose()?;
        if let (Some(min), Some(max)) = (schema.min_items, schema.max_items)
            && min == max
            && let Ok(len) = usize::try_from(max)
            && (1..=MAX_TUPLE_LEN).contains(&len)
        {
            let item = item.unwrap_or_else(|| IrSchema::of_type(IrSchemaType::Unknown));
            return Ok(IrSchema {
                ty: Some(IrSchemaType::Tuple),
                items: vec![item; len],
                ..Default::default()
            });
        }
        Ok(IrSchema {
            ty: Some(IrSchemaType::Array),
            items: item.into_iter().collect(),
            ..Default::default()
        })
    }

    /// Builds an object node from already-normalized `properties`.
    pub(super) fn object(
        &mut self,
        schema: &Schema,
        properties: IndexMap<String, IrSchema>,
    ) -> Result<IrSchema, IrError> {
        let additional_properties = match &schema.additional_properties {
            None if properties.is_empty() => Some(IrSchema::of_type(IrSchemaType::Unknown)),
            None => None,
            Some(AdditionalProperties::Bool(true)) => {
                Some(IrSchema::of_type(IrSchemaType::Unknown))
            }
            Some(AdditionalProperties::Bool(false)) => {
                Some(IrSchema::of_type(IrSchemaType::Never))
            }
            Some(AdditionalProperties::RefOrSchema(values)) => {
                Some(self.nested(values, &["additionalProperties"])?)
            }
        };
        let required = schema
            .required
            .iter()
            .filter(|name| properties.contains_key(*name))
            .cloned()
            .collect();
        Ok(IrSchema {
            ty: Some(IrSchemaType::Object),
            properties,
            required,
            additional_properties: additional_properties.map(Box::new),
            ..Default::default()
        })
    }
}

/// Copies a schema's validation keywords.
pub(super) fn constraints(schema: &Schema) -> IrConstraints {
    let (minimum, exclusive_minimum) = bound(&schema.minimum, &schema.exclusive_minimum);
    let (maximum, exclusive_maximum) = bound(&schema.maximum, &schema.exclusive_maximum);
    IrConstraints {
        format: schema.format.clone(),
        pattern: schema.pattern.clone(),
        minimum,
        maximum,
        exclusive_minimum,
        exclusive_maximum,
        min_length: schema.min_length,
        max_length: schema.max_length,
        min_items: schema.min_items,
        max_items: schema.max_items,
        access_scope: if schema.read_only {
            Some(AccessScope::Read)
        } else if schema.write_only {
            Some(AccessScope::Write)
        } else {
            None
        },
    }
}

/// Returns the inclusive and exclusive forms of a bound. The boolean
/// `exclusiveMinimum` and `exclusiveMaximum` of OpenAPI 3.0 make the
/// inclusive bound exclusive.
fn bound(
    value: &Option<Number>,
    exclusive: &Option<ExclusiveBound>,
) -> (Option<Number>, Option<Number>) {
    match exclusive {
        Some(ExclusiveBound::Bool(true)) => (None, value.clone()),
        Some(ExclusiveBound::Value(exclusive)) => (value.clone(), Some(exclusive.clone())),
        Some(ExclusiveBound::Bool(false)) | None => (value.clone(), None),
    }
}

/// Infers the type of a `const` literal.
fn literal_type(value: &Value) -> Option<Ty> {
    match value {
        Value::String(_) => Some(Ty::String),
        Value::Number(_) => Some(Ty::Number),
        Value::Bool(_) => Some(Ty::Boolean),
        Value::Null => None,
        Value::Array(_) => Some(Ty::Array),
        Value::Object(_) => Some(Ty::Object),
    }
}
