// Arena-backed syntax tree.
//
// Every node lives in a single `Vec` owned by the `Tree` and is addressed by
// its `NodeId`. Parent links are plain ids, so upward queries are O(1) and the
// structure has no reference cycles. Nodes are appended parent-first: a
// node's id is always greater than its parent's id.

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::TextRange;

// ── Node IDs ──────────────────────────────────────────────────────────

/// Opaque index of a node inside one `Tree`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

// ── Node kinds ────────────────────────────────────────────────────────

/// Syntactic categories the call annotator cares about.
///
/// Parsers tag every node into one of these; the grammar's own type string is
/// kept separately in [`Node::type_name`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// A function invocation. Children are the callee followed by the arguments.
    CallExpression,
    /// An identifier occurrence. Holds exactly one [`NodeKind::TokenLeaf`].
    IdentifierWrapper,
    /// The raw spelling of an identifier.
    TokenLeaf,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub kind: NodeKind,
    /// Grammar node type, e.g. `call_expression`.
    pub type_name: String,
    pub label: Option<String>,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub span: Option<TextRange>,
}

impl Node {
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

// ── Tree ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Node>,
}

impl Tree {
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// A tree always has its root.
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.get(id).map(|n| n.kind)
    }

    pub fn label(&self, id: NodeId) -> Option<&str> {
        self.get(id).and_then(|n| n.label.as_deref())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(|n| n.parent)
    }

    /// Children of `id`, or an empty slice for unknown ids.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(|n| n.children.as_slice()).unwrap_or_default()
    }

    /// All ids in allocation order. Ancestors always precede descendants.
    pub fn ids(&self) -> impl DoubleEndedIterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(|i| NodeId(i as u32))
    }

    /// Depth-first, left-to-right traversal of the subtree rooted at `from`.
    pub fn pre_order(&self, from: NodeId) -> PreOrder<'_> {
        let stack = if self.get(from).is_some() {
            vec![from]
        } else {
            Vec::new()
        };
        PreOrder { tree: self, stack }
    }

    /// Left-to-right post-order of the subtree rooted at `from`.
    pub fn post_order(&self, from: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = if self.get(from).is_some() {
            vec![from]
        } else {
            Vec::new()
        };
        // Root-first with children pushed left to right yields the exact
        // reverse of a left-to-right post-order.
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.children(id).iter().copied());
        }
        out.reverse();
        out
    }

    /// Proper descendants of `id` in pre-order.
    pub fn descendants(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.pre_order(id).skip(1)
    }

    /// Whether `ancestor` is a proper ancestor of `id`.
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = self.parent(id);
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            // Parents always have smaller ids; stop early once we pass it.
            if p < ancestor {
                return false;
            }
            current = self.parent(p);
        }
        false
    }

    pub fn depth(&self, id: NodeId) -> usize {
        let mut depth = 0;
        let mut current = self.parent(id);
        while let Some(p) = current {
            depth += 1;
            current = self.parent(p);
        }
        depth
    }

    /// Render the tree one node per line, two spaces of indent per level.
    pub fn to_tree_string(&self) -> String {
        let mut out = String::new();
        for id in self.pre_order(self.root()) {
            let Some(node) = self.get(id) else { continue };
            let indent = "  ".repeat(self.depth(id));
            let _ = write!(out, "{indent}{}", node.type_name);
            if let Some(label) = &node.label {
                let _ = write!(out, ": {label}");
            }
            if let Some(span) = node.span {
                let _ = write!(out, " {span}");
            }
            out.push('\n');
        }
        out
    }
}

/// Iterator returned by [`Tree::pre_order`].
#[derive(Debug)]
pub struct PreOrder<'a> {
    tree: &'a Tree,
    stack: Vec<NodeId>,
}

impl Iterator for PreOrder<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(id).iter().rev().copied());
        Some(id)
    }
}

// ── Builder ───────────────────────────────────────────────────────────

/// Builder for constructing `Tree` instances, either from a parser or by hand
/// in tests.
#[derive(Debug)]
pub struct TreeBuilder {
    nodes: Vec<Node>,
}

impl TreeBuilder {
    /// Start a tree with the given root node.
    pub fn new(kind: NodeKind, type_name: &str, label: Option<&str>) -> Self {
        Self::with_root_span(kind, type_name, label, None)
    }

    pub fn with_root_span(
        kind: NodeKind,
        type_name: &str,
        label: Option<&str>,
        span: Option<TextRange>,
    ) -> Self {
        let root = Node {
            kind,
            type_name: type_name.to_string(),
            label: label.map(str::to_string),
            parent: None,
            children: Vec::new(),
            span,
        };
        Self { nodes: vec![root] }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Append a child as the last child of `parent`.
    ///
    /// # Panics
    /// If `parent` was not allocated by this builder.
    pub fn add(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        type_name: &str,
        label: Option<&str>,
    ) -> NodeId {
        self.add_with_span(parent, kind, type_name, label, None)
    }

    /// # Panics
    /// If `parent` was not allocated by this builder.
    pub fn add_with_span(
        &mut self,
        parent: NodeId,
        kind: NodeKind,
        type_name: &str,
        label: Option<&str>,
        span: Option<TextRange>,
    ) -> NodeId {
        let id = NodeId(u32::try_from(self.nodes.len()).expect("tree exceeds u32::MAX nodes"));
        self.nodes[parent.index()].children.push(id);
        self.nodes.push(Node {
            kind,
            type_name: type_name.to_string(),
            label: label.map(str::to_string),
            parent: Some(parent),
            children: Vec::new(),
            span,
        });
        id
    }

    /// Add an `identifier` wrapper holding a single `token` leaf. Returns the
    /// wrapper's id.
    pub fn identifier(&mut self, parent: NodeId, name: &str) -> NodeId {
        let wrapper = self.add(parent, NodeKind::IdentifierWrapper, "identifier", None);
        self.add(wrapper, NodeKind::TokenLeaf, "token", Some(name));
        wrapper
    }

    /// Add a call node with an identifier callee and identifier arguments.
    pub fn call(&mut self, parent: NodeId, callee: &str, args: &[&str]) -> NodeId {
        let call = self.add(parent, NodeKind::CallExpression, "call_expression", None);
        self.identifier(call, callee);
        for arg in args {
            self.identifier(call, arg);
        }
        call
    }

    pub fn build(self) -> Tree {
        Tree { nodes: self.nodes }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
