// Node mapping between two trees.
//
// `GreedyMatcher` runs in three phases:
//
// 1. Top-down: isomorphic subtrees whose structural hash is unique on both
//    sides are mapped wholesale, tallest first.
// 2. Bottom-up: an unmapped inner node is mapped to the dst ancestor that
//    shares the most mapped descendants with it (dice coefficient).
// 3. Recovery: after each bottom-up mapping, unmapped children of the pair
//    are matched by isomorphism (LCS), then by unique type.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeSet, HashMap};
use std::hash::{Hash, Hasher};

use tracing::debug;

use crate::tree::{NodeId, Tree};

// ── Mapping ───────────────────────────────────────────────────────────

/// One-to-one correspondence between source and destination node ids.
#[derive(Debug, Clone, Default)]
pub struct Mapping {
    src_to_dst: HashMap<NodeId, NodeId>,
    dst_to_src: HashMap<NodeId, NodeId>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `src ↔ dst`. Either side that is already mapped is left as is
    /// and the call returns `false`.
    pub fn link(&mut self, src: NodeId, dst: NodeId) -> bool {
        if self.src_to_dst.contains_key(&src) || self.dst_to_src.contains_key(&dst) {
            return false;
        }
        self.src_to_dst.insert(src, dst);
        self.dst_to_src.insert(dst, src);
        true
    }

    pub fn dst_of(&self, src: NodeId) -> Option<NodeId> {
        self.src_to_dst.get(&src).copied()
    }

    pub fn src_of(&self, dst: NodeId) -> Option<NodeId> {
        self.dst_to_src.get(&dst).copied()
    }

    pub fn has_src(&self, src: NodeId) -> bool {
        self.src_to_dst.contains_key(&src)
    }

    pub fn has_dst(&self, dst: NodeId) -> bool {
        self.dst_to_src.contains_key(&dst)
    }

    pub fn len(&self) -> usize {
        self.src_to_dst.len()
    }

    pub fn is_empty(&self) -> bool {
        self.src_to_dst.is_empty()
    }

    /// All pairs, ordered by source id.
    pub fn pairs(&self) -> Vec<(NodeId, NodeId)> {
        let mut pairs: Vec<_> = self.src_to_dst.iter().map(|(s, d)| (*s, *d)).collect();
        pairs.sort_unstable();
        pairs
    }
}

// ── Matcher trait ─────────────────────────────────────────────────────

/// Computes a [`Mapping`] between a source and a destination tree.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    fn match_trees(&self, src: &Tree, dst: &Tree) -> Mapping;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatcherOptions {
    /// Smallest subtree height considered by the top-down phase. Leaves have
    /// height 1.
    pub min_height: usize,
    /// Minimum dice coefficient for a bottom-up mapping.
    pub similarity_threshold: f64,
}

impl Default for MatcherOptions {
    fn default() -> Self {
        Self {
            min_height: 2,
            similarity_threshold: 0.5,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GreedyMatcher {
    options: MatcherOptions,
}

impl GreedyMatcher {
    pub fn new(options: MatcherOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> MatcherOptions {
        self.options
    }
}

impl Matcher for GreedyMatcher {
    fn match_trees(&self, src: &Tree, dst: &Tree) -> Mapping {
        let mut run = Run {
            src,
            dst,
            src_metrics: Metrics::compute(src),
            dst_metrics: Metrics::compute(dst),
            mapping: Mapping::new(),
            options: self.options,
        };
        run.top_down();
        let after_top_down = run.mapping.len();
        run.bottom_up();
        debug!(
            src_nodes = src.len(),
            dst_nodes = dst.len(),
            top_down = after_top_down,
            total = run.mapping.len(),
            "trees matched"
        );
        run.mapping
    }
}

// ── Per-node metrics ──────────────────────────────────────────────────

struct Metrics {
    height: Vec<usize>,
    /// Number of nodes in the subtree, the node included.
    size: Vec<usize>,
    hash: Vec<u64>,
}

impl Metrics {
    fn compute(tree: &Tree) -> Self {
        let n = tree.len();
        let mut height = vec![1; n];
        let mut size = vec![1; n];
        let mut hash = vec![0; n];

        // Children have larger ids than their parent.
        for id in tree.ids().rev() {
            let i = id.0 as usize;
            let Some(node) = tree.get(id) else { continue };
            let mut hasher = DefaultHasher::new();
            node.type_name.hash(&mut hasher);
            node.label.hash(&mut hasher);
            for child in &node.children {
                let c = child.0 as usize;
                height[i] = height[i].max(height[c] + 1);
                size[i] += size[c];
                hash[c].hash(&mut hasher);
            }
            node.children.len().hash(&mut hasher);
            hash[i] = hasher.finish();
        }

        Self { height, size, hash }
    }

    fn height(&self, id: NodeId) -> usize {
        self.height[id.0 as usize]
    }

    fn descendants(&self, id: NodeId) -> usize {
        self.size[id.0 as usize] - 1
    }

    fn hash(&self, id: NodeId) -> u64 {
        self.hash[id.0 as usize]
    }
}

// ── Matching run ──────────────────────────────────────────────────────

struct Run<'a> {
    src: &'a Tree,
    dst: &'a Tree,
    src_metrics: Metrics,
    dst_metrics: Metrics,
    mapping: Mapping,
    options: MatcherOptions,
}

impl Run<'_> {
    fn top_down(&mut self) {
        let max_height = self
            .src_metrics
            .height(self.src.root())
            .max(self.dst_metrics.height(self.dst.root()));
        let min_height = self.options.min_height.max(1);

        for height in (min_height..=max_height).rev() {
            let src_candidates: Vec<NodeId> = self
                .src
                .ids()
                .filter(|id| !self.mapping.has_src(*id) && self.src_metrics.height(*id) == height)
                .collect();
            if src_candidates.is_empty() {
                continue;
            }

            let mut groups: HashMap<u64, (usize, Vec<NodeId>)> = HashMap::new();
            for id in &src_candidates {
                groups.entry(self.src_metrics.hash(*id)).or_default().0 += 1;
            }
            for id in self.dst.ids() {
                if !self.mapping.has_dst(id) && self.dst_metrics.height(id) == height {
                    if let Some(group) = groups.get_mut(&self.dst_metrics.hash(id)) {
                        group.1.push(id);
                    }
                }
            }

            // Same-height subtrees never nest, so mapping one candidate cannot
            // invalidate another.
            for s in src_candidates {
                let Some((src_count, dsts)) = groups.get(&self.src_metrics.hash(s)) else {
                    continue;
                };
                if *src_count != 1 || dsts.len() != 1 {
                    continue;
                }
                let d = dsts[0];
                if isomorphic(self.src, s, self.dst, d) {
                    self.link_subtree(s, d);
                }
            }
        }
    }

    fn bottom_up(&mut self) {
        let src_root = self.src.root();
        let dst_root = self.dst.root();

        for s in self.src.ids().rev() {
            if self.mapping.has_src(s) {
                continue;
            }
            if s == src_root {
                if !self.mapping.has_dst(dst_root) && same_type(self.src, s, self.dst, dst_root) {
                    self.mapping.link(s, dst_root);
                    self.last_chance(s, dst_root);
                }
                continue;
            }
            if self.src.children(s).is_empty() {
                continue;
            }

            let mut best: Option<(NodeId, f64)> = None;
            for d in self.candidates(s) {
                let score = self.dice(s, d);
                if best.is_none_or(|(_, b)| score > b) {
                    best = Some((d, score));
                }
            }
            if let Some((d, score)) = best {
                if score >= self.options.similarity_threshold {
                    self.mapping.link(s, d);
                    self.last_chance(s, d);
                }
            }
        }
    }

    /// Unmapped dst ancestors, of the same type as `s`, of the partners of
    /// `s`'s mapped descendants.
    fn candidates(&self, s: NodeId) -> BTreeSet<NodeId> {
        let mut out = BTreeSet::new();
        for t in self.src.descendants(s) {
            let Some(partner) = self.mapping.dst_of(t) else {
                continue;
            };
            let mut current = self.dst.parent(partner);
            while let Some(a) = current {
                if !self.mapping.has_dst(a) && same_type(self.src, s, self.dst, a) {
                    out.insert(a);
                }
                current = self.dst.parent(a);
            }
        }
        out
    }

    #[allow(clippy::cast_precision_loss)]
    fn dice(&self, s: NodeId, d: NodeId) -> f64 {
        let total = self.src_metrics.descendants(s) + self.dst_metrics.descendants(d);
        if total == 0 {
            return 0.0;
        }
        let common = self
            .src
            .descendants(s)
            .filter_map(|t| self.mapping.dst_of(t))
            .filter(|partner| self.dst.is_ancestor(d, *partner))
            .count();
        (2 * common) as f64 / total as f64
    }

    /// Recover mappings among the children of a freshly mapped pair.
    fn last_chance(&mut self, s: NodeId, d: NodeId) {
        // Pass 1: isomorphic, fully unmapped children in matching order.
        let (src, dst) = (self.src, self.dst);
        let src_children = self.unmapped_src_children(s);
        let dst_children = self.unmapped_dst_children(d);
        let pairs = lcs(&src_children, &dst_children, |a, b| {
            self.subtree_unmapped_src(a)
                && self.subtree_unmapped_dst(b)
                && self.src_metrics.hash(a) == self.dst_metrics.hash(b)
                && isomorphic(src, a, dst, b)
        });
        for (sc, dc) in pairs {
            self.link_subtree(sc, dc);
        }

        // Pass 2: a type with exactly one unmapped child on each side.
        let src_children = self.unmapped_src_children(s);
        let dst_children = self.unmapped_dst_children(d);
        let mut order: Vec<&str> = Vec::new();
        let mut by_type: HashMap<&str, (Vec<NodeId>, Vec<NodeId>)> = HashMap::new();
        for &c in &src_children {
            let ty = type_name(src, c);
            if !by_type.contains_key(ty) {
                order.push(ty);
            }
            by_type.entry(ty).or_default().0.push(c);
        }
        for &c in &dst_children {
            if let Some(group) = by_type.get_mut(type_name(dst, c)) {
                group.1.push(c);
            }
        }
        for ty in order {
            let (sc, dc) = match &by_type[ty] {
                (srcs, dsts) if srcs.len() == 1 && dsts.len() == 1 => (srcs[0], dsts[0]),
                _ => continue,
            };
            self.mapping.link(sc, dc);
            self.link_single_leaf_child(sc, dc);
        }
    }

    /// A pair that each hold exactly one leaf of the same type gets that leaf
    /// mapped as well. This is what turns a renamed callee into a label
    /// update on its token.
    fn link_single_leaf_child(&mut self, s: NodeId, d: NodeId) {
        let (&[sc], &[dc]) = (self.src.children(s), self.dst.children(d)) else {
            return;
        };
        if self.src.children(sc).is_empty()
            && self.dst.children(dc).is_empty()
            && same_type(self.src, sc, self.dst, dc)
        {
            self.mapping.link(sc, dc);
        }
    }

    fn link_subtree(&mut self, s: NodeId, d: NodeId) {
        for (a, b) in self.src.pre_order(s).zip(self.dst.pre_order(d)) {
            self.mapping.link(a, b);
        }
    }

    fn unmapped_src_children(&self, s: NodeId) -> Vec<NodeId> {
        self.src
            .children(s)
            .iter()
            .copied()
            .filter(|c| !self.mapping.has_src(*c))
            .collect()
    }

    fn unmapped_dst_children(&self, d: NodeId) -> Vec<NodeId> {
        self.dst
            .children(d)
            .iter()
            .copied()
            .filter(|c| !self.mapping.has_dst(*c))
            .collect()
    }

    fn subtree_unmapped_src(&self, s: NodeId) -> bool {
        self.src.pre_order(s).all(|id| !self.mapping.has_src(id))
    }

    fn subtree_unmapped_dst(&self, d: NodeId) -> bool {
        self.dst.pre_order(d).all(|id| !self.mapping.has_dst(id))
    }
}

// ── Helpers ───────────────────────────────────────────────────────────

fn type_name(tree: &Tree, id: NodeId) -> &str {
    tree.get(id).map_or("", |n| n.type_name.as_str())
}

fn same_type(src: &Tree, s: NodeId, dst: &Tree, d: NodeId) -> bool {
    type_name(src, s) == type_name(dst, d)
}

/// Structural equality: same type, label and children, recursively.
pub fn isomorphic(src: &Tree, s: NodeId, dst: &Tree, d: NodeId) -> bool {
    let (Some(a), Some(b)) = (src.get(s), dst.get(d)) else {
        return false;
    };
    a.type_name == b.type_name
        && a.label == b.label
        && a.children.len() == b.children.len()
        && a
            .children
            .iter()
            .zip(&b.children)
            .all(|(x, y)| isomorphic(src, *x, dst, *y))
}

/// Longest common subsequence of two id lists under `eq`.
fn lcs(
    left: &[NodeId],
    right: &[NodeId],
    mut eq: impl FnMut(NodeId, NodeId) -> bool,
) -> Vec<(NodeId, NodeId)> {
    let (n, m) = (left.len(), right.len());
    let mut table = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            table[i][j] = if eq(left[i], right[j]) {
                table[i + 1][j + 1] + 1
            } else {
                table[i + 1][j].max(table[i][j + 1])
            };
        }
    }

    let mut out = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if table[i][j] == table[i + 1][j + 1] + 1 && eq(left[i], right[j]) {
            out.push((left[i], right[j]));
            i += 1;
            j += 1;
        } else if table[i + 1][j] >= table[i][j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{NodeKind, TreeBuilder};
    use proptest::prelude::*;

    /// `block { stmt { call } ... }` with one expression statement per call.
    fn calls(list: &[(&str, &[&str])]) -> Tree {
        let mut b = TreeBuilder::new(NodeKind::Other, "compound_statement", None);
        let root = b.root();
        for (callee, args) in list {
            let stmt = b.add(root, NodeKind::Other, "expression_statement", None);
            b.call(stmt, callee, args);
        }
        b.build()
    }

    fn token_of_callee(tree: &Tree, stmt_index: usize) -> NodeId {
        let stmt = tree.children(tree.root())[stmt_index];
        let call = tree.children(stmt)[0];
        let wrapper = tree.children(call)[0];
        tree.children(wrapper)[0]
    }

    #[test]
    fn identical_trees_map_every_node() {
        let src = calls(&[("foo", &["a", "b"]), ("bar", &["c"])]);
        let dst = calls(&[("foo", &["a", "b"]), ("bar", &["c"])]);
        let mapping = GreedyMatcher::default().match_trees(&src, &dst);
        assert_eq!(mapping.len(), src.len());
        for (s, d) in mapping.pairs() {
            assert_eq!(s, d);
        }
    }

    #[test]
    fn renamed_callee_maps_token_to_token() {
        let src = calls(&[("foo", &["a", "b"]), ("keep", &["x"])]);
        let dst = calls(&[("bar", &["a", "b"]), ("keep", &["x"])]);
        let mapping = GreedyMatcher::default().match_trees(&src, &dst);

        let old = token_of_callee(&src, 0);
        let new = token_of_callee(&dst, 0);
        assert_eq!(mapping.dst_of(old), Some(new));
        assert_eq!(mapping.len(), src.len());
    }

    #[test]
    fn unrelated_call_is_left_unmapped() {
        let src = calls(&[("keep", &["x"]), ("vim_free", &["p"])]);
        let dst = calls(&[("keep", &["x"]), ("VIM_CLEAR", &["q"])]);
        let mapping = GreedyMatcher::default().match_trees(&src, &dst);

        let stmt = src.children(src.root())[1];
        let call = src.children(stmt)[0];
        assert!(!mapping.has_src(call));
        assert!(!mapping.has_src(token_of_callee(&src, 1)));
    }

    #[test]
    fn duplicate_subtrees_are_not_mapped_top_down() {
        // Two identical `f(x)` statements on each side: ambiguous hashes.
        let src = calls(&[("f", &["x"]), ("f", &["x"])]);
        let dst = calls(&[("f", &["x"]), ("f", &["x"]), ("g", &[])]);
        let mapping = GreedyMatcher::default().match_trees(&src, &dst);
        // Roots still map; the LCS recovery pairs the statements in order.
        assert_eq!(mapping.dst_of(src.root()), Some(dst.root()));
        let src_stmts = src.children(src.root());
        let dst_stmts = dst.children(dst.root());
        assert_eq!(mapping.dst_of(src_stmts[0]), Some(dst_stmts[0]));
        assert_eq!(mapping.dst_of(src_stmts[1]), Some(dst_stmts[1]));
        assert!(!mapping.has_dst(dst_stmts[2]));
    }

    #[test]
    fn roots_of_different_types_stay_apart() {
        let src = TreeBuilder::new(NodeKind::Other, "translation_unit", None).build();
        let dst = TreeBuilder::new(NodeKind::Other, "compound_statement", None).build();
        let mapping = GreedyMatcher::default().match_trees(&src, &dst);
        assert!(mapping.is_empty());
    }

    #[test]
    fn link_refuses_remapping() {
        let mut mapping = Mapping::new();
        assert!(mapping.link(NodeId(1), NodeId(2)));
        assert!(!mapping.link(NodeId(1), NodeId(3)));
        assert!(!mapping.link(NodeId(4), NodeId(2)));
        assert_eq!(mapping.dst_of(NodeId(1)), Some(NodeId(2)));
        assert_eq!(mapping.src_of(NodeId(2)), Some(NodeId(1)));
    }

    #[test]
    fn lcs_keeps_order() {
        let left = [NodeId(1), NodeId(2), NodeId(3)];
        let right = [NodeId(3), NodeId(1), NodeId(3)];
        let pairs = lcs(&left, &right, |a, b| a == b);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0], (NodeId(1), NodeId(1)));
        assert_eq!(pairs[1], (NodeId(3), NodeId(3)));
    }

    fn name() -> impl Strategy<Value = String> {
        prop::sample::select(vec!["f", "g", "h", "x", "y"]).prop_map(str::to_string)
    }

    fn arb_calls() -> impl Strategy<Value = Vec<(String, Vec<String>)>> {
        prop::collection::vec((name(), prop::collection::vec(name(), 0..3)), 0..6)
    }

    fn build(list: &[(String, Vec<String>)]) -> Tree {
        let mut b = TreeBuilder::new(NodeKind::Other, "compound_statement", None);
        let root = b.root();
        for (callee, args) in list {
            let stmt = b.add(root, NodeKind::Other, "expression_statement", None);
            let args: Vec<&str> = args.iter().map(String::as_str).collect();
            b.call(stmt, callee, &args);
        }
        b.build()
    }

    proptest! {
        #[test]
        fn mapping_is_one_to_one(a in arb_calls(), b in arb_calls()) {
            let src = build(&a);
            let dst = build(&b);
            let mapping = GreedyMatcher::default().match_trees(&src, &dst);
            for (s, d) in mapping.pairs() {
                prop_assert_eq!(mapping.src_of(d), Some(s));
                prop_assert!(s.0 < src.len() as u32);
                prop_assert!(d.0 < dst.len() as u32);
            }
        }

        #[test]
        fn mapped_pairs_share_a_type(a in arb_calls(), b in arb_calls()) {
            let src = build(&a);
            let dst = build(&b);
            let mapping = GreedyMatcher::default().match_trees(&src, &dst);
            for (s, d) in mapping.pairs() {
                prop_assert_eq!(
                    &src.get(s).unwrap().type_name,
                    &dst.get(d).unwrap().type_name
                );
            }
        }

        #[test]
        fn self_match_is_total(a in arb_calls()) {
            let src = build(&a);
            let dst = build(&a);
            let mapping = GreedyMatcher::default().match_trees(&src, &dst);
            prop_assert_eq!(mapping.len(), src.len());
        }
    }
}
