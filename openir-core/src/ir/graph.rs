use indexmap::IndexMap;
use petgraph::{
    Direction,
    algo::tarjan_scc,
    graph::{DiGraph, NodeIndex},
};
use rustc_hash::FxHashSet;

use super::types::{IrDocument, IrSchema};

/// A graph of the named schemas in an [`IrDocument`], where each arc
/// is a `$ref` from one schema to another.
#[derive(Debug)]
pub struct IrGraph<'a> {
    doc: &'a IrDocument,
    refs: DiGraph<&'a str, ()>,
    /// An inverted mapping of schema names to graph indices.
    nodes: IndexMap<&'a str, NodeIndex>,
    /// Schemas that can reach themselves.
    recursive: FxHashSet<NodeIndex>,
}

impl<'a> IrGraph<'a> {
    pub fn new(doc: &'a IrDocument) -> Self {
        let mut refs = DiGraph::new();
        let nodes: IndexMap<_, _> = doc
            .components
            .schemas
            .keys()
            .map(|name| (name.as_str(), refs.add_node(name.as_str())))
            .collect();

        for (name, schema) in &doc.components.schemas {
            let from = nodes[name.as_str()];
            let mut stack = vec![schema];
            while let Some(node) = stack.pop() {
                // References to schemas that aren't in the document
                // are left out of the graph.
                if let Some(&to) = node
                    .component_name()
                    .and_then(|target| nodes.get(target.as_str()))
                {
                    refs.update_edge(from, to, ());
                }
                stack.extend(node.children());
            }
        }

        // Run Tarjan's algorithm over the graph once, instead of
        // searching from every schema.
        let recursive = tarjan_scc(&refs)
            .into_iter()
            .filter(|scc| match scc.as_slice() {
                [node] => refs.contains_edge(*node, *node),
                _ => true,
            })
            .flatten()
            .collect();

        Self {
            doc,
            refs,
            nodes,
            recursive,
        }
    }

    #[inline]
    pub fn document(&self) -> &'a IrDocument {
        self.doc
    }

    /// Returns the names of the schemas that `name` refers to directly.
    pub fn dependencies(&self, name: &str) -> impl Iterator<Item = &'a str> + '_ {
        self.neighbors(name, Direction::Outgoing)
    }

    /// Returns the names of the schemas that refer to `name` directly.
    pub fn dependents(&self, name: &str) -> impl Iterator<Item = &'a str> + '_ {
        self.neighbors(name, Direction::Incoming)
    }

    /// Returns `true` if the schema `name` refers back to itself,
    /// directly or through other schemas.
    pub fn is_recursive(&self, name: &str) -> bool {
        self.nodes
            .get(name)
            .is_some_and(|index| self.recursive.contains(index))
    }

    /// Returns the schema `name` with its references replaced
    /// by their targets, recursively.
    ///
    /// A reference to a schema that's already being inlined further up
    /// is kept as is, so recursive schemas stay finite. Documentation on
    /// a reference node wins over the target's own.
    pub fn inline(&self, name: &str) -> Option<IrSchema> {
        let (name, schema) = self.doc.components.schemas.get_key_value(name)?;
        let mut path = vec![name.as_str()];
        Some(self.inline_node(schema.clone(), &mut path))
    }

    fn inline_node(&self, mut node: IrSchema, path: &mut Vec<&'a str>) -> IrSchema {
        if node.reference.is_some() {
            let target = node
                .component_name()
                .and_then(|target| self.doc.components.schemas.get_key_value(target.as_str()))
                .filter(|(target, _)| !path.contains(&target.as_str()));
            let Some((target, schema)) = target else {
                return node;
            };
            path.push(target.as_str());
            let mut inlined = self.inline_node(schema.clone(), path);
            path.pop();

            let mut doc = node.doc;
            doc.inherit(&inlined.doc);
            if doc.default.is_none() {
                doc.default = inlined.doc.default.take();
            }
            inlined.doc = doc;
            return inlined;
        }
        for child in node.children_mut() {
            let taken = std::mem::take(child);
            *child = self.inline_node(taken, path);
        }
        node
    }

    fn neighbors(&self, name: &str, direction: Direction) -> impl Iterator<Item = &'a str> + '_ {
        self.nodes
            .get(name)
            .into_iter()
            .flat_map(move |&index| self.refs.neighbors_directed(index, direction))
            .map(|index| self.refs[index])
    }
}
