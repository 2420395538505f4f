use openir_pointer::JsonPointerSegment;
use rustc_hash::FxHashSet;

use crate::parse::{ComponentRef, Document, RefOrSchema, Schema};

use super::resolve::resolve;

/// Finds the schema for a property that `schema` doesn't declare itself,
/// from the first ancestor that does.
///
/// `location` is the URI fragment of `schema`. Returns the property
/// schema, and its own URI fragment.
pub fn inherited_property<'a>(
    doc: &'a Document,
    schema: &'a Schema,
    location: &str,
    name: &str,
) -> Option<(&'a RefOrSchema, String)> {
    Ancestors::new(doc, schema, location).find_map(|ancestor| {
        let property = ancestor.schema.properties.as_ref()?.get(name)?;
        let location = format!(
            "{}/properties/{}",
            ancestor.location,
            JsonPointerSegment::new(name)
        );
        Some((property, location))
    })
}

/// An `allOf` ancestor, and where it's declared.
#[derive(Clone, Debug)]
pub struct Ancestor<'a> {
    pub schema: &'a Schema,
    /// The URI fragment of the ancestor: the target of a reference,
    /// or the inline branch.
    pub location: String,
}

/// An iterator over all the `allOf` ancestors of a schema, depth-first,
/// in branch order.
///
/// References are resolved as they're reached. Each referenced schema is
/// visited at most once, so cyclic hierarchies terminate, and references
/// that don't resolve are skipped.
pub struct Ancestors<'a> {
    doc: &'a Document,
    stack: Vec<(&'a RefOrSchema, String)>,
    visited: FxHashSet<&'a ComponentRef>,
}

impl<'a> Ancestors<'a> {
    /// `location` is the URI fragment of `schema`.
    #[inline]
    pub fn new(doc: &'a Document, schema: &'a Schema, location: &str) -> Self {
        let mut ancestors = Self {
            doc,
            stack: vec![],
            visited: FxHashSet::default(),
        };
        ancestors.push_parents(schema, location);
        ancestors
    }

    fn push_parents(&mut self, schema: &'a Schema, location: &str) {
        if let Some(all_of) = &schema.all_of {
            // Push parents in reverse, so that the iterator will pop and
            // visit them in left-to-right order.
            self.stack.extend(
                all_of
                    .iter()
                    .enumerate()
                    .rev()
                    .map(|(index, parent)| (parent, format!("{location}/allOf/{index}"))),
            );
        }
    }
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = Ancestor<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some((item, location)) = self.stack.pop() {
            let (schema, location) = match item {
                RefOrSchema::Ref(r) => {
                    if !self.visited.insert(&r.path) {
                        continue;
                    }
                    let Ok(schema) = resolve::<Schema>(self.doc, &r.path) else {
                        continue;
                    };
                    let location = match r.path.pointer() {
                        Ok(pointer) => format!("#{pointer}"),
                        Err(_) => location,
                    };
                    (schema, location)
                }
                RefOrSchema::Other(schema) => (schema.as_ref(), location),
            };
            self.push_parents(schema, &location);
            return Some(Ancestor { schema, location });
        }
        None
    }
}
