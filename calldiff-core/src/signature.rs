use serde::{Deserialize, Serialize};

use calldiff_ast::{NodeId, NodeKind, Tree};

/// Callee name and argument identifiers of one call expression.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallSignature {
    pub callee: String,
    pub arguments: Vec<String>,
}

impl CallSignature {
    /// A call with no identifier at all has nothing worth reporting.
    pub fn is_reportable(&self) -> bool {
        !self.callee.is_empty()
    }
}

/// Collect the spelling of every token that sits directly inside an
/// identifier, depth-first and left to right over the subtree of `call`.
/// The first spelling is the callee, the rest are arguments.
///
/// Calls nested in the arguments are not special-cased: their identifiers
/// become arguments of `call`. Field names are not identifiers, so
/// `ops->release(buf)` has callee `ops` and argument `buf`.
pub fn extract_signature(tree: &Tree, call: NodeId) -> CallSignature {
    let mut names = tree.pre_order(call).filter_map(|id| {
        let node = tree.get(id)?;
        let parent = node.parent?;
        (node.kind == NodeKind::TokenLeaf
            && tree.kind(parent) == Some(NodeKind::IdentifierWrapper))
        .then(|| node.label.clone().unwrap_or_default())
    });

    let Some(callee) = names.next() else {
        return CallSignature::default();
    };
    CallSignature {
        callee,
        arguments: names.collect(),
    }
}
