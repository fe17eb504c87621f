use tree_sitter::Node;

use crate::TextRange;

/// Extract the source text for a tree-sitter node.
pub fn node_text<'a>(node: Node<'_>, source: &'a str) -> &'a str {
    &source[node.byte_range()]
}

/// Find a child by field name.
pub fn child_by_field<'a>(node: Node<'a>, field: &str) -> Option<Node<'a>> {
    node.child_by_field_name(field)
}

/// Convert a tree-sitter node to a `TextRange`.
pub fn node_range(node: Node<'_>) -> TextRange {
    node.range().into()
}

/// Text of the node's `operator` field, if the grammar gives it one.
pub fn operator_text<'a>(node: Node<'_>, source: &'a str) -> Option<&'a str> {
    child_by_field(node, "operator").map(|op| node_text(op, source))
}

/// Named children in source order, without comments or MISSING placeholders.
pub fn significant_children<'a>(node: Node<'a>) -> Vec<Node<'a>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind() != "comment" && !child.is_missing())
        .collect()
}
