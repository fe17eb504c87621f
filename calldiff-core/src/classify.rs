use tracing::debug;

use calldiff_ast::{Action, ActionKind, EditScript, NodeId, NodeKind, TreePair};

use crate::locate::locate_calls;

/// What a single edit action means for function calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    /// Calls inside an inserted or deleted subtree.
    Calls(Vec<NodeId>),
    /// A callee token updated in place.
    Rename { old_name: String, new_name: String },
    Ignore,
}

/// One classified fact, tied back to the action it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    Call {
        /// Zero-based position of the action in its script.
        action_index: usize,
        action: ActionKind,
        /// The action's own node, on the action's side.
        action_node: NodeId,
        call: NodeId,
    },
    Rename {
        action_index: usize,
        action_node: NodeId,
        old_name: String,
        new_name: String,
    },
}

impl ChangeEvent {
    pub fn action_index(&self) -> usize {
        match self {
            Self::Call { action_index, .. } | Self::Rename { action_index, .. } => *action_index,
        }
    }
}

/// Classify one action. Never fails: ids that do not resolve in their tree
/// degrade to [`Classification::Ignore`].
pub fn classify(action: &Action, trees: &TreePair) -> Classification {
    let tree = trees.side(action.side());
    match action {
        Action::InsertTree { node, .. }
        | Action::DeleteTree { node }
        | Action::InsertNode { node, .. } => {
            let calls = locate_calls(tree, Some(*node));
            if calls.is_empty() {
                Classification::Ignore
            } else {
                Classification::Calls(calls)
            }
        }
        Action::UpdateNode { node, new_label } => {
            // Only the callee slot: arguments share the same grandparent.
            let in_callee_slot = tree.parent(*node).is_some_and(|wrapper| {
                tree.parent(wrapper).is_some_and(|call| {
                    tree.kind(call) == Some(NodeKind::CallExpression)
                        && tree.children(call).first() == Some(&wrapper)
                })
            });
            match new_label {
                Some(new_name) if in_callee_slot => Classification::Rename {
                    old_name: tree.label(*node).unwrap_or_default().to_string(),
                    new_name: new_name.clone(),
                },
                _ => Classification::Ignore,
            }
        }
        Action::DeleteNode { .. } | Action::Move { .. } => Classification::Ignore,
    }
}

/// Classify a whole script, flattening calls into one event each. Events
/// keep script order.
pub fn classify_script(script: &EditScript, trees: &TreePair) -> Vec<ChangeEvent> {
    let mut events = Vec::new();
    for (action_index, action) in script.iter().enumerate() {
        let classification = classify(action, trees);
        debug!(
            index = action_index,
            kind = %action.kind(),
            node = action.node().0,
            ?classification,
            "action classified"
        );
        match classification {
            Classification::Calls(calls) => {
                events.extend(calls.into_iter().map(|call| ChangeEvent::Call {
                    action_index,
                    action: action.kind(),
                    action_node: action.node(),
                    call,
                }));
            }
            Classification::Rename { old_name, new_name } => events.push(ChangeEvent::Rename {
                action_index,
                action_node: action.node(),
                old_name,
                new_name,
            }),
            Classification::Ignore => {}
        }
    }
    events
}
