use super::types::{IrSchema, LogicalOperator};

/// Simplifies a composition node.
///
/// Drops empty members, and `{type: unknown}` members of an `and`,
/// since they don't constrain the intersection. Folds structurally
/// equal members, keeping the first. A composition that's left with a
/// single member is replaced by that member, which inherits any
/// documentation it lacks; the replacement is simplified in turn.
///
/// Enums are simplified like compositions of their literals.
/// Non-composition nodes, and the internals of members, are returned
/// unchanged, so that `dedupe(dedupe(node)) == dedupe(node)`.
pub fn dedupe(mut node: IrSchema) -> IrSchema {
    loop {
        let Some(op) = node.logical_operator else {
            return node;
        };
        let mut members: Vec<IrSchema> = Vec::with_capacity(node.items.len());
        for item in std::mem::take(&mut node.items) {
            if item.is_empty() || (op == LogicalOperator::And && item.is_bare_unknown()) {
                continue;
            }
            if members.iter().any(|member| member.structurally_eq(&item)) {
                continue;
            }
            members.push(item);
        }
        let mut member = match <[IrSchema; 1]>::try_from(members) {
            Ok([member]) => member,
            Err(members) if members.is_empty() => return IrSchema::default(),
            Err(members) => {
                node.items = members;
                return node;
            }
        };
        if member.is_bare_unknown() {
            return IrSchema::default();
        }
        member.doc.inherit(&node.doc);
        node = member;
    }
}
