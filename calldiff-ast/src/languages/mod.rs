pub mod c;
mod helpers;

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use tracing::warn;

use crate::tree::Tree;
use crate::{AstError, Result};

/// Turns source text into a lowered [`Tree`].
pub trait SourceParser: Send + Sync + std::fmt::Debug {
    fn parse(&self, source: &str) -> Result<Tree>;
}

/// Trait implemented by each language's lowering support.
pub trait LanguageSupport: Send + Sync + std::fmt::Debug {
    /// Language identifier (e.g., "c").
    fn id(&self) -> &'static str;

    /// File extensions this language handles.
    fn extensions(&self) -> &'static [&'static str];

    /// Tree-sitter language for parsing.
    fn tree_sitter_language(&self) -> tree_sitter::Language;

    /// Convert a tree-sitter parse into the arena tree, tagging node kinds.
    fn lower(&self, tree: &tree_sitter::Tree, source: &str) -> Tree;
}

/// A [`SourceParser`] backed by tree-sitter and a [`LanguageSupport`].
///
/// A fresh `tree_sitter::Parser` is created per call, so one instance can be
/// shared across threads.
#[derive(Debug, Clone)]
pub struct TreeSitterParser {
    language: Arc<dyn LanguageSupport>,
}

impl TreeSitterParser {
    pub fn new(language: Arc<dyn LanguageSupport>) -> Self {
        Self { language }
    }

    /// Parser for the C grammar.
    pub fn c() -> Self {
        Self::new(Arc::new(c::CSupport))
    }

    pub fn language_id(&self) -> &'static str {
        self.language.id()
    }
}

impl SourceParser for TreeSitterParser {
    fn parse(&self, source: &str) -> Result<Tree> {
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&self.language.tree_sitter_language())
            .map_err(|e| AstError::TreeSitter(e.to_string()))?;

        let ts_tree = parser.parse(source, None).ok_or_else(|| AstError::Parse {
            path: "<source>".to_string(),
            message: format!("{} parser returned no tree", self.language.id()),
        })?;

        if ts_tree.root_node().has_error() {
            warn!(
                language = self.language.id(),
                "source contains syntax errors; ERROR nodes kept in tree"
            );
        }

        Ok(self.language.lower(&ts_tree, source))
    }
}

/// Registry of all supported languages.
#[derive(Debug)]
pub struct LanguageRegistry {
    languages: HashMap<String, Arc<dyn LanguageSupport>>,
    extension_map: HashMap<String, String>,
}

impl LanguageRegistry {
    pub fn new() -> Self {
        let mut reg = Self {
            languages: HashMap::new(),
            extension_map: HashMap::new(),
        };
        reg.register(Arc::new(c::CSupport));
        reg
    }

    fn register(&mut self, lang: Arc<dyn LanguageSupport>) {
        for ext in lang.extensions() {
            self.extension_map
                .insert((*ext).to_string(), lang.id().to_string());
        }
        self.languages.insert(lang.id().to_string(), lang);
    }

    /// Look up the language support for a file by its extension.
    pub fn for_file(&self, path: &Path) -> Option<Arc<dyn LanguageSupport>> {
        let ext = path.extension()?.to_str()?;
        let lang_id = self.extension_map.get(ext)?;
        self.languages.get(lang_id).cloned()
    }

    /// Parser for a file, or `UnsupportedLanguage` when its extension is unknown.
    pub fn parser_for(&self, path: &Path) -> Result<TreeSitterParser> {
        self.for_file(path)
            .map(TreeSitterParser::new)
            .ok_or_else(|| AstError::UnsupportedLanguage(path.display().to_string()))
    }

    /// Get a language by its identifier.
    pub fn get(&self, id: &str) -> Option<Arc<dyn LanguageSupport>> {
        self.languages.get(id).cloned()
    }

    /// List all registered language IDs.
    pub fn language_ids(&self) -> Vec<&str> {
        self.languages.keys().map(String::as_str).collect()
    }
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        Self::new()
    }
}
