// Tag → block-type resolution.
//
// The render configuration maps each block type to a primary tag plus alias
// tags. The resolver inverts that table into tag → ordered candidate list
// and disambiguates shared tags from traversal context.

use std::collections::HashMap;

use crate::document::BlockType;
use crate::dom::{self, Node};

use super::ListKind;

/// One block type's tag mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagMapping {
    pub tag: String,
    pub aliases: Vec<String>,
}

impl TagMapping {
    fn new(tag: &str, aliases: &[&str]) -> Self {
        Self {
            tag: tag.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// Block-type → tag table plus its inverse, built once up front.
#[derive(Debug, Clone)]
pub struct BlockTypeConfig {
    mappings: Vec<(BlockType, TagMapping)>,
    by_tag: HashMap<String, Vec<BlockType>>,
}

impl BlockTypeConfig {
    /// An empty configuration: no tag maps to a block type.
    pub fn empty() -> Self {
        Self {
            mappings: Vec::new(),
            by_tag: HashMap::new(),
        }
    }

    /// Add or extend a mapping. Candidate order for a shared tag follows
    /// insertion order.
    pub fn map(mut self, kind: BlockType, tag: &str, aliases: &[&str]) -> Self {
        let mapping = TagMapping::new(tag, aliases);
        self.by_tag
            .entry(mapping.tag.clone())
            .or_default()
            .push(kind);
        for alias in &mapping.aliases {
            self.by_tag.entry(alias.clone()).or_default().push(kind);
        }
        self.mappings.push((kind, mapping));
        self
    }

    /// The configured mappings, in insertion order.
    pub fn mappings(&self) -> &[(BlockType, TagMapping)] {
        &self.mappings
    }

    /// Resolve a tag to a concrete block type, or `None` when the tag is
    /// not block-level. Pure function of the tag, the ambient wrapper
    /// context, and the node itself.
    pub(crate) fn resolve(
        &self,
        tag: &str,
        list: Option<ListKind>,
        node: &Node,
    ) -> Option<BlockType> {
        let candidates = self.by_tag.get(tag)?;
        if candidates.len() == 1 {
            return Some(candidates[0]);
        }
        Some(disambiguate(candidates, list, node))
    }
}

/// Choose one type among candidates sharing a tag: list items follow the
/// ambient list wrapper, preformatted candidates win when the node declares
/// preserve-whitespace, otherwise the first candidate stands.
fn disambiguate(candidates: &[BlockType], list: Option<ListKind>, node: &Node) -> BlockType {
    for candidate in candidates {
        match candidate {
            BlockType::OrderedListItem if list == Some(ListKind::Ordered) => return *candidate,
            BlockType::UnorderedListItem if list == Some(ListKind::Unordered) => {
                return *candidate
            }
            BlockType::CodeBlock if dom::is_preformatted(node) => return *candidate,
            _ => {}
        }
    }
    candidates[0]
}

impl Default for BlockTypeConfig {
    fn default() -> Self {
        Self::empty()
            .map(BlockType::HeaderOne, "h1", &[])
            .map(BlockType::HeaderTwo, "h2", &[])
            .map(BlockType::HeaderThree, "h3", &[])
            .map(BlockType::HeaderFour, "h4", &[])
            .map(BlockType::HeaderFive, "h5", &[])
            .map(BlockType::HeaderSix, "h6", &[])
            .map(BlockType::Blockquote, "blockquote", &[])
            .map(BlockType::CodeBlock, "pre", &[])
            .map(BlockType::Atomic, "figure", &[])
            .map(BlockType::UnorderedListItem, "li", &[])
            .map(BlockType::OrderedListItem, "li", &[])
            .map(BlockType::Unstyled, "div", &["p"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn li() -> Node {
        Node::element("li", vec![], vec![])
    }

    #[test]
    fn resolves_unshared_tags_directly() {
        let config = BlockTypeConfig::default();
        let node = Node::element("h2", vec![], vec![]);
        assert_eq!(config.resolve("h2", None, &node), Some(BlockType::HeaderTwo));
        assert_eq!(config.resolve("span", None, &node), None);
    }

    #[test]
    fn aliases_resolve_to_the_same_type() {
        let config = BlockTypeConfig::default();
        let node = Node::element("p", vec![], vec![]);
        assert_eq!(config.resolve("p", None, &node), Some(BlockType::Unstyled));
        assert_eq!(config.resolve("div", None, &node), Some(BlockType::Unstyled));
    }

    #[test]
    fn list_items_follow_the_wrapper() {
        let config = BlockTypeConfig::default();
        assert_eq!(
            config.resolve("li", Some(ListKind::Ordered), &li()),
            Some(BlockType::OrderedListItem)
        );
        assert_eq!(
            config.resolve("li", Some(ListKind::Unordered), &li()),
            Some(BlockType::UnorderedListItem)
        );
    }

    #[test]
    fn shared_tags_fall_back_to_first_candidate() {
        let config = BlockTypeConfig::default();
        assert_eq!(
            config.resolve("li", None, &li()),
            Some(BlockType::UnorderedListItem)
        );
    }

    #[test]
    fn preserve_whitespace_prefers_code_candidates() {
        let config = BlockTypeConfig::empty()
            .map(BlockType::Paragraph, "div", &[])
            .map(BlockType::CodeBlock, "div", &[]);
        let plain = Node::element("div", vec![], vec![]);
        assert_eq!(config.resolve("div", None, &plain), Some(BlockType::Paragraph));
        let pre = Node::element(
            "div",
            vec![("style".into(), "white-space: pre".into())],
            vec![],
        );
        assert_eq!(config.resolve("div", None, &pre), Some(BlockType::CodeBlock));
    }
}
