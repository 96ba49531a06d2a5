// html2blocks — HTML to block-model converter using tree-to-document transformation.
//
// Architecture:
//   HTML string → preprocess → tree builder (html5ever) → node tree
//     → block tree builder (recursive walk) → descriptor forest
//     → finalizer → { blocks, entity map }
//
// The engine consumes a generic node tree, so any sanitization pipeline can
// supply its own tree builder through `convert_node_tree`.

pub mod document;
pub mod dom;
mod error;
mod tree_to_blocks;

use std::collections::BTreeSet;

pub use document::{
    Block, BlockKey, BlockType, CellSpan, CharacterMetadata, Document, Entity, EntityData,
    EntityKey, EntityKind, EntityMap, FileData, ImageData, LinkData, Mutability, TableCell,
    TableData, ENTITY_SENTINEL,
};
pub use error::ConvertError;
pub use tree_to_blocks::styles::{
    BOLD, CODE, HIGHLIGHT, ITALIC, STRIKETHROUGH, SUBSCRIPT, SUPERSCRIPT, UNDERLINE,
};
pub use tree_to_blocks::{BlockTreeBuilder, BlockTypeConfig, TagMapping};

/// Conversion options.
#[derive(Debug, Clone, Default)]
pub struct Options {
    /// Allow-list of color/background style flags (`color-*` / `bgcolor-*`)
    /// that may be attached to characters.
    pub custom_style_map: BTreeSet<String>,
    /// Force preformatted handling on the whole subtree.
    pub is_code_block: bool,
    /// Emit hierarchical blocks (parent/children/sibling links) instead of
    /// the flattened sequence.
    pub tree_blocks: bool,
}

impl Options {
    /// Create a new Options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit one color/background style flag.
    pub fn with_allowed_style(mut self, flag: &str) -> Self {
        self.custom_style_map.insert(flag.to_string());
        self
    }

    /// Replace the whole color/background allow-list.
    pub fn with_custom_style_map(mut self, flags: BTreeSet<String>) -> Self {
        self.custom_style_map = flags;
        self
    }

    /// Set whether the input is treated as one preformatted code region.
    pub fn with_code_block(mut self, is_code_block: bool) -> Self {
        self.is_code_block = is_code_block;
        self
    }

    /// Set whether output blocks keep their hierarchy.
    pub fn with_tree_blocks(mut self, tree_blocks: bool) -> Self {
        self.tree_blocks = tree_blocks;
        self
    }
}

/// Convert an HTML string to a block document using default options.
///
/// # Examples
///
/// ```
/// let doc = html2blocks::convert("<h1>Hello</h1><p>World</p>").unwrap();
/// assert_eq!(doc.blocks.len(), 2);
/// assert_eq!(doc.blocks[0].text, "Hello");
/// ```
pub fn convert(html: &str) -> Result<Document, ConvertError> {
    convert_with(html, &Options::default())
}

/// Convert an HTML string to a block document with custom options.
///
/// # Examples
///
/// ```
/// use html2blocks::{convert_with, Options};
///
/// let options = Options::new().with_code_block(true);
/// let doc = convert_with("one\ntwo", &options).unwrap();
/// assert_eq!(doc.blocks.len(), 2);
/// ```
pub fn convert_with(html: &str, options: &Options) -> Result<Document, ConvertError> {
    convert_node_tree(html, dom::build_tree, &BlockTypeConfig::default(), options)
}

/// Convert markup through an arbitrary tree builder and block-type table.
///
/// The markup is preprocessed (carriage returns stripped, non-breaking-space
/// markers replaced, literal escape sequences removed) before the tree
/// builder runs. A tree builder returning `None` fails the whole conversion.
pub fn convert_node_tree<F>(
    markup: &str,
    tree_builder: F,
    config: &BlockTypeConfig,
    options: &Options,
) -> Result<Document, ConvertError>
where
    F: FnOnce(&str) -> Option<dom::Node>,
{
    let markup = dom::preprocess(markup);
    let root = tree_builder(&markup).ok_or(ConvertError::Tree)?;
    let mut builder = BlockTreeBuilder::new(config, options);
    builder.add_node(&root);
    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_convert_empty() {
        let doc = convert("").unwrap();
        assert!(doc.blocks.is_empty());
        assert!(doc.entity_map.is_empty());
    }

    #[test]
    fn test_convert_simple_paragraph() {
        let doc = convert("<p>Hello, world!</p>").unwrap();
        assert_eq!(doc.blocks.len(), 1);
        assert_eq!(doc.blocks[0].text, "Hello, world!");
        assert_eq!(doc.blocks[0].kind, BlockType::Unstyled);
    }

    #[test]
    fn test_convert_heading() {
        let doc = convert("<h1>Title</h1>").unwrap();
        assert_eq!(doc.blocks[0].kind, BlockType::HeaderOne);
        assert_eq!(doc.blocks[0].text, "Title");
    }

    #[test]
    fn test_options_builder() {
        let options = Options::new()
            .with_allowed_style("color-#ff0000")
            .with_code_block(true)
            .with_tree_blocks(true);
        assert!(options.custom_style_map.contains("color-#ff0000"));
        assert!(options.is_code_block);
        assert!(options.tree_blocks);
    }

    #[test]
    fn test_default_options() {
        let options = Options::default();
        assert!(options.custom_style_map.is_empty());
        assert!(!options.is_code_block);
        assert!(!options.tree_blocks);
    }

    #[test]
    fn test_failing_tree_builder_fails_conversion() {
        let result = convert_node_tree(
            "<p>x</p>",
            |_| None,
            &BlockTypeConfig::default(),
            &Options::default(),
        );
        assert!(matches!(result, Err(ConvertError::Tree)));
    }

    #[test]
    fn test_preprocessing_reaches_the_tree_builder() {
        let result = convert_node_tree(
            "a\rb&nbsp;c",
            |markup| {
                assert_eq!(markup, "ab c");
                dom::build_tree(markup)
            },
            &BlockTypeConfig::default(),
            &Options::default(),
        );
        assert_eq!(result.unwrap().blocks[0].text, "ab c");
    }
}
