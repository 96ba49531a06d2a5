// Forest finalization.
//
// Two mutually exclusive passes over the completed descriptor forest:
// hierarchical (structure preserved, tree links assigned by position) and
// flattened (meaningless wrappers hoisted away, edge atomic blocks guarded
// by empty text blocks, descendant runs folded into their top-level
// ancestor). Output records are immutable once emitted.

use crate::document::{Block, BlockKey, BlockType};

use super::{BlockDescriptor, KeyGenerator};

/// Emit one block per descriptor, preserving the tree. Pre-order: parents
/// precede their children.
pub(crate) fn hierarchy(forest: &[BlockDescriptor]) -> Vec<Block> {
    let mut out = Vec::new();
    emit(forest, None, &mut out);
    out
}

fn emit(nodes: &[BlockDescriptor], parent: Option<&BlockKey>, out: &mut Vec<Block>) {
    for (i, node) in nodes.iter().enumerate() {
        let prev_sibling = i.checked_sub(1).map(|j| nodes[j].key.clone());
        let next_sibling = nodes.get(i + 1).map(|n| n.key.clone());
        out.push(Block {
            key: node.key.clone(),
            kind: node.kind.unwrap_or_default(),
            text: node.text.clone(),
            character_list: node.chars.clone(),
            depth: node.depth,
            parent: parent.cloned(),
            children: node.children.iter().map(|c| c.key.clone()).collect(),
            prev_sibling,
            next_sibling,
        });
        emit(&node.children, Some(&node.key), out);
    }
}

/// Collapse the forest to a flat block sequence.
pub(crate) fn flatten(forest: Vec<BlockDescriptor>, mut keys: KeyGenerator) -> Vec<Block> {
    let mut survivors = hoist(forest);

    // An embedded-object block at either edge gets an empty text neighbor
    // so adjacent embedded objects cannot merge with surrounding content.
    if survivors.first().is_some_and(is_atomic) {
        survivors.insert(0, empty_text(&mut keys));
    }
    if survivors.last().is_some_and(is_atomic) {
        survivors.push(empty_text(&mut keys));
    }

    survivors.into_iter().map(|d| to_flat_block(fold(d))).collect()
}

fn is_atomic(descriptor: &BlockDescriptor) -> bool {
    descriptor.kind.is_some_and(BlockType::is_atomic)
}

fn empty_text(keys: &mut KeyGenerator) -> BlockDescriptor {
    BlockDescriptor {
        key: keys.next_key(),
        kind: None,
        text: String::new(),
        chars: Vec::new(),
        depth: 0,
        children: Vec::new(),
    }
}

/// Replace untyped, empty-text, pure-container descriptors with their own
/// children, bottom-up.
fn hoist(nodes: Vec<BlockDescriptor>) -> Vec<BlockDescriptor> {
    let mut out = Vec::new();
    for mut node in nodes {
        node.children = hoist(std::mem::take(&mut node.children));
        if node.kind.is_none() && node.text.is_empty() {
            out.extend(node.children);
        } else {
            out.push(node);
        }
    }
    out
}

/// Fold descendant text/metadata runs into the descriptor. A one-character
/// gap duplicating the last accumulated character's metadata marks each
/// boundary where the descendant is typed and text has already accumulated.
fn fold(mut node: BlockDescriptor) -> BlockDescriptor {
    for child in std::mem::take(&mut node.children) {
        let child = fold(child);
        if child.kind.is_some() && !node.text.is_empty() {
            let gap = node.chars.last().cloned().unwrap_or_default();
            node.text.push('\n');
            node.chars.push(gap);
        }
        node.text.push_str(&child.text);
        node.chars.extend(child.chars);
    }
    node
}

fn to_flat_block(descriptor: BlockDescriptor) -> Block {
    Block {
        key: descriptor.key,
        kind: descriptor.kind.unwrap_or_default(),
        text: descriptor.text,
        character_list: descriptor.chars,
        depth: descriptor.depth,
        parent: None,
        children: Vec::new(),
        prev_sibling: None,
        next_sibling: None,
    }
}
