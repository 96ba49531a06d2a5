// Whitespace trimming over the descriptor forest.
//
// Post-processing pass run after every `add_node`: trims leading and
// trailing whitespace on each descriptor, recursively. Trimming never
// removes a character carrying an entity, so placeholder anchors and link
// text survive; leading trim is skipped for preformatted blocks so
// indentation survives.

use crate::document::BlockType;

use super::BlockDescriptor;

pub(crate) fn trim_descriptors(nodes: &mut [BlockDescriptor]) {
    for node in nodes {
        trim_leading(node);
        trim_trailing(node);
        trim_descriptors(&mut node.children);
    }
}

fn trim_leading(node: &mut BlockDescriptor) {
    if node.kind == Some(BlockType::CodeBlock) {
        return;
    }
    let strip = node
        .text
        .chars()
        .zip(&node.chars)
        .take_while(|(c, meta)| c.is_whitespace() && meta.entity.is_none())
        .count();
    if strip > 0 {
        node.text = node.text.chars().skip(strip).collect();
        node.chars.drain(..strip);
    }
}

fn trim_trailing(node: &mut BlockDescriptor) {
    while let Some(meta) = node.chars.last() {
        if meta.entity.is_some() {
            break;
        }
        match node.text.chars().last() {
            Some(c) if c.is_whitespace() => {
                node.text.pop();
                node.chars.pop();
            }
            _ => break,
        }
    }
}
