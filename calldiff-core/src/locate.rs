use calldiff_ast::{NodeId, NodeKind, Tree};

/// Every call expression reachable from `root`, `root` included, in
/// pre-order. A located call is not descended into, so calls nested in its
/// arguments are not reported separately.
///
/// `None` or an id outside the tree yields an empty list.
pub fn locate_calls(tree: &Tree, root: Option<NodeId>) -> Vec<NodeId> {
    let Some(root) = root else {
        return Vec::new();
    };
    let mut calls = Vec::new();
    let mut stack = if tree.get(root).is_some() {
        vec![root]
    } else {
        Vec::new()
    };
    while let Some(id) = stack.pop() {
        if tree.kind(id) == Some(NodeKind::CallExpression) {
            calls.push(id);
            continue;
        }
        stack.extend(tree.children(id).iter().rev().copied());
    }
    calls
}
