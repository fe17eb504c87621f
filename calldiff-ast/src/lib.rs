pub mod actions;
pub mod languages;
pub mod matcher;
pub mod tree;

use serde::{Deserialize, Serialize};

pub use actions::{Action, ActionKind, EditScript, EditScriptGenerator, Side, SimplifiedChawathe};
pub use languages::{LanguageRegistry, SourceParser};
pub use matcher::{GreedyMatcher, Mapping, Matcher, MatcherOptions};
pub use tree::{Node, NodeId, NodeKind, Tree, TreeBuilder};

/// Error type for the syntax tree engine.
#[derive(thiserror::Error, Debug)]
pub enum AstError {
    #[error("Parse error in {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Tree-sitter error: {0}")]
    TreeSitter(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AstError>;

// ── Span type ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextRange {
    pub start_byte: usize,
    pub end_byte: usize,
    pub start_row: usize,
    pub start_col: usize,
    pub end_row: usize,
    pub end_col: usize,
}

impl From<tree_sitter::Range> for TextRange {
    fn from(r: tree_sitter::Range) -> Self {
        Self {
            start_byte: r.start_byte,
            end_byte: r.end_byte,
            start_row: r.start_point.row,
            start_col: r.start_point.column,
            end_row: r.end_point.row,
            end_col: r.end_point.column,
        }
    }
}

impl std::fmt::Display for TextRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{},{}]", self.start_byte, self.end_byte)
    }
}

// ── Pair of trees under comparison ─────────────────────────────────

/// The "before" (source) and "after" (destination) trees of one diff.
#[derive(Debug, Clone)]
pub struct TreePair {
    pub src: Tree,
    pub dst: Tree,
}

impl TreePair {
    pub fn new(src: Tree, dst: Tree) -> Self {
        Self { src, dst }
    }

    /// The tree an action's node lives in.
    pub fn side(&self, side: Side) -> &Tree {
        match side {
            Side::Source => &self.src,
            Side::Destination => &self.dst,
        }
    }
}
