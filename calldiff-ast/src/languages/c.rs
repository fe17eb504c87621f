use tree_sitter::Node as TsNode;

use crate::tree::{NodeId, NodeKind, Tree, TreeBuilder};

use super::LanguageSupport;
use super::helpers::{child_by_field, node_range, node_text, operator_text, significant_children};

/// C lowering.
///
/// Shapes produced:
/// - `identifier` → `IdentifierWrapper("identifier")` holding one
///   `TokenLeaf("token")` whose label is the spelling.
/// - `call_expression` → `CallExpression` whose children are the callee
///   followed by each argument expression; the `argument_list` level is
///   flattened away.
/// - any other named node keeps its grammar type. Leaves are labelled with
///   their source text, inner nodes with their `operator` field if present.
///
/// Comments, anonymous tokens and MISSING nodes are dropped.
#[derive(Debug)]
pub struct CSupport;

impl LanguageSupport for CSupport {
    fn id(&self) -> &'static str {
        "c"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["c", "h"]
    }

    fn tree_sitter_language(&self) -> tree_sitter::Language {
        tree_sitter_c::LANGUAGE.into()
    }

    fn lower(&self, tree: &tree_sitter::Tree, source: &str) -> Tree {
        let root = tree.root_node();
        let mut builder =
            TreeBuilder::with_root_span(NodeKind::Other, root.kind(), None, Some(node_range(root)));
        let root_id = builder.root();
        for child in significant_children(root) {
            lower_node(child, source, root_id, &mut builder);
        }
        builder.build()
    }
}

fn lower_node(node: TsNode<'_>, source: &str, parent: NodeId, builder: &mut TreeBuilder) {
    let span = Some(node_range(node));
    match node.kind() {
        "identifier" => {
            let wrapper =
                builder.add_with_span(parent, NodeKind::IdentifierWrapper, "identifier", None, span);
            builder.add_with_span(
                wrapper,
                NodeKind::TokenLeaf,
                "token",
                Some(node_text(node, source)),
                span,
            );
        }
        "call_expression" => {
            let call =
                builder.add_with_span(parent, NodeKind::CallExpression, "call_expression", None, span);
            if let Some(function) = child_by_field(node, "function") {
                lower_node(function, source, call, builder);
            }
            if let Some(arguments) = child_by_field(node, "arguments") {
                for arg in significant_children(arguments) {
                    lower_node(arg, source, call, builder);
                }
            }
        }
        kind => {
            let children = significant_children(node);
            let label = if children.is_empty() {
                Some(node_text(node, source))
            } else {
                operator_text(node, source)
            };
            let id = builder.add_with_span(parent, NodeKind::Other, kind, label, span);
            for child in children {
                lower_node(child, source, id, builder);
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::{SourceParser, TreeSitterParser};

    fn parse(source: &str) -> Tree {
        TreeSitterParser::c().parse(source).unwrap()
    }

    fn first_of_type(tree: &Tree, type_name: &str) -> NodeId {
        tree.pre_order(tree.root())
            .find(|id| tree.get(*id).unwrap().type_name == type_name)
            .unwrap_or_else(|| panic!("no {type_name} in tree:\n{}", tree.to_tree_string()))
    }

    #[test]
    fn call_children_are_callee_then_arguments() {
        let tree = parse("void f(void) { foo(a, b); }\n");
        let call = first_of_type(&tree, "call_expression");
        assert_eq!(tree.kind(call), Some(NodeKind::CallExpression));

        let children = tree.children(call);
        assert_eq!(children.len(), 3, "{}", tree.to_tree_string());

        let spellings: Vec<&str> = children
            .iter()
            .map(|wrapper| {
                assert_eq!(tree.kind(*wrapper), Some(NodeKind::IdentifierWrapper));
                let token = tree.children(*wrapper)[0];
                assert_eq!(tree.kind(token), Some(NodeKind::TokenLeaf));
                tree.label(token).unwrap()
            })
            .collect();
        assert_eq!(spellings, vec!["foo", "a", "b"]);
    }

    #[test]
    fn operators_label_inner_nodes() {
        let tree = parse("int g(int x) { return x == 3; }\n");
        let binary = first_of_type(&tree, "binary_expression");
        assert_eq!(tree.label(binary), Some("=="));

        let literal = first_of_type(&tree, "number_literal");
        assert_eq!(tree.label(literal), Some("3"));
    }

    #[test]
    fn comments_are_dropped() {
        let tree = parse("void f(void) {\n  // note\n  foo();\n}\n");
        assert!(
            tree.pre_order(tree.root())
                .all(|id| tree.get(id).unwrap().type_name != "comment")
        );
    }

    #[test]
    fn spans_point_into_source() {
        let source = "void f(void) { foo(a); }\n";
        let tree = parse(source);
        let call = first_of_type(&tree, "call_expression");
        let span = tree.get(call).unwrap().span.unwrap();
        assert_eq!(&source[span.start_byte..span.end_byte], "foo(a)");
    }

    #[test]
    fn syntax_errors_still_produce_a_tree() {
        let tree = parse("void f( { foo(a; }\n");
        assert_eq!(tree.get(tree.root()).unwrap().type_name, "translation_unit");
    }
}
