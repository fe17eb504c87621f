// Edit scripts derived from a mapping.
//
// Insertions reference nodes of the destination tree. Deletions, updates and
// moves reference nodes of the source tree.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::matcher::Mapping;
use crate::tree::{NodeId, Tree};

/// Which tree of a [`crate::TreePair`] a node id belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Source,
    Destination,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    InsertTree,
    DeleteTree,
    InsertNode,
    DeleteNode,
    UpdateNode,
    Move,
}

impl ActionKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::InsertTree => "insert-tree",
            Self::DeleteTree => "delete-tree",
            Self::InsertNode => "insert-node",
            Self::DeleteNode => "delete-node",
            Self::UpdateNode => "update-node",
            Self::Move => "move",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One step of an edit script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Action {
    /// A whole subtree that exists only in the destination.
    InsertTree {
        node: NodeId,
        parent: Option<NodeId>,
        position: usize,
    },
    /// A whole subtree that exists only in the source.
    DeleteTree { node: NodeId },
    /// A single destination node whose descendants are at least partly mapped.
    InsertNode {
        node: NodeId,
        parent: Option<NodeId>,
        position: usize,
    },
    DeleteNode { node: NodeId },
    /// A mapped node whose label changed.
    UpdateNode {
        node: NodeId,
        new_label: Option<String>,
    },
    /// A mapped source node now living under a different destination parent.
    Move {
        node: NodeId,
        parent: NodeId,
        position: usize,
    },
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::InsertTree { .. } => ActionKind::InsertTree,
            Self::DeleteTree { .. } => ActionKind::DeleteTree,
            Self::InsertNode { .. } => ActionKind::InsertNode,
            Self::DeleteNode { .. } => ActionKind::DeleteNode,
            Self::UpdateNode { .. } => ActionKind::UpdateNode,
            Self::Move { .. } => ActionKind::Move,
        }
    }

    /// The node the action is about.
    pub fn node(&self) -> NodeId {
        match self {
            Self::InsertTree { node, .. }
            | Self::DeleteTree { node }
            | Self::InsertNode { node, .. }
            | Self::DeleteNode { node }
            | Self::UpdateNode { node, .. }
            | Self::Move { node, .. } => *node,
        }
    }

    /// The tree [`Action::node`] belongs to.
    pub fn side(&self) -> Side {
        match self {
            Self::InsertTree { .. } | Self::InsertNode { .. } => Side::Destination,
            Self::DeleteTree { .. }
            | Self::DeleteNode { .. }
            | Self::UpdateNode { .. }
            | Self::Move { .. } => Side::Source,
        }
    }
}

/// Ordered list of actions transforming the source tree into the destination.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EditScript {
    actions: Vec<Action>,
}

impl EditScript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, action: Action) {
        self.actions.push(action);
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Action> {
        self.actions.iter()
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    /// Count of actions of the given kind.
    pub fn count(&self, kind: ActionKind) -> usize {
        self.actions.iter().filter(|a| a.kind() == kind).count()
    }
}

impl<'a> IntoIterator for &'a EditScript {
    type Item = &'a Action;
    type IntoIter = std::slice::Iter<'a, Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.iter()
    }
}

impl FromIterator<Action> for EditScript {
    fn from_iter<I: IntoIterator<Item = Action>>(iter: I) -> Self {
        Self {
            actions: iter.into_iter().collect(),
        }
    }
}

/// Derives an [`EditScript`] from two trees and a mapping between them.
pub trait EditScriptGenerator: Send + Sync + fmt::Debug {
    fn compute_actions(&self, src: &Tree, dst: &Tree, mapping: &Mapping) -> EditScript;
}

/// Chawathe-style generator without sibling reordering.
///
/// Destination nodes are visited breadth-first to emit inserts, updates and
/// moves; source nodes are then visited in post-order to emit deletes. A
/// subtree with no mapped node at all is reported once, at its top, as an
/// `InsertTree`/`DeleteTree`. Moves among siblings of the same parent are not
/// reported.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimplifiedChawathe;

impl EditScriptGenerator for SimplifiedChawathe {
    fn compute_actions(&self, src: &Tree, dst: &Tree, mapping: &Mapping) -> EditScript {
        let src_free = unmapped_subtrees(src, |id| mapping.has_src(id));
        let dst_free = unmapped_subtrees(dst, |id| mapping.has_dst(id));
        let mut script = EditScript::new();

        let mut queue = VecDeque::from([dst.root()]);
        while let Some(x) = queue.pop_front() {
            queue.extend(dst.children(x).iter().copied());
            let parent = dst.parent(x);
            let position = position_in_parent(dst, x);

            let Some(s) = mapping.src_of(x) else {
                if !dst_free[x.0 as usize] {
                    script.push(Action::InsertNode {
                        node: x,
                        parent,
                        position,
                    });
                } else if !parent.is_some_and(|p| dst_free[p.0 as usize]) {
                    script.push(Action::InsertTree {
                        node: x,
                        parent,
                        position,
                    });
                }
                continue;
            };

            if src.label(s) != dst.label(x) {
                script.push(Action::UpdateNode {
                    node: s,
                    new_label: dst.label(x).map(str::to_string),
                });
            }
            if let (Some(px), Some(ps)) = (parent, src.parent(s)) {
                if mapping.dst_of(ps) != Some(px) {
                    script.push(Action::Move {
                        node: s,
                        parent: px,
                        position,
                    });
                }
            }
        }

        for s in src.post_order(src.root()) {
            if mapping.has_src(s) {
                continue;
            }
            if !src_free[s.0 as usize] {
                script.push(Action::DeleteNode { node: s });
            } else if !src.parent(s).is_some_and(|p| src_free[p.0 as usize]) {
                script.push(Action::DeleteTree { node: s });
            }
        }

        debug!(actions = script.len(), "edit script computed");
        script
    }
}

/// `free[i]` is true when node `i` and all of its descendants are unmapped.
fn unmapped_subtrees(tree: &Tree, is_mapped: impl Fn(NodeId) -> bool) -> Vec<bool> {
    let mut free = vec![false; tree.len()];
    for id in tree.ids().rev() {
        free[id.0 as usize] =
            !is_mapped(id) && tree.children(id).iter().all(|c| free[c.0 as usize]);
    }
    free
}

fn position_in_parent(tree: &Tree, id: NodeId) -> usize {
    tree.parent(id)
        .and_then(|p| tree.children(p).iter().position(|c| *c == id))
        .unwrap_or(0)
}

// ── Tests ─────────────────────────────────────────────────────────────
