// Node tree → block forest transform.
//
// Walks the input node tree with a single mutable traversal state, emitting
// an intermediate forest of block descriptors. Dispatch per node, highest
// priority first: container, ignorable, block-level tag, text, line break,
// rich node (file / table / image / anchor), generic inline. The finalizer
// then turns the forest into output blocks, hierarchical or flattened.

pub(crate) mod block_types;
pub(crate) mod entities;
pub(crate) mod finalize;
pub(crate) mod styles;
pub(crate) mod whitespace;

use crate::document::{
    BlockKey, BlockType, CharacterMetadata, Document, EntityKey, EntityMap, ENTITY_SENTINEL,
};
use crate::dom::{self, Node};
use crate::Options;

pub use block_types::{BlockTypeConfig, TagMapping};

use styles::StyleSet;

/// The kind of list container currently wrapping traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ListKind {
    Unordered,
    Ordered,
}

/// Ambient mode inherited by descendants until restored.
#[derive(Debug, Clone, Copy, Default)]
struct WrapperMode {
    list: Option<ListKind>,
    preformatted: bool,
}

/// Mutable traversal state. Drained into a descriptor at every block
/// boundary; `chars` always parallels `text` character for character.
#[derive(Debug, Default)]
struct TraversalState {
    text: String,
    chars: Vec<CharacterMetadata>,
    kind: Option<BlockType>,
    depth: usize,
    entity: Option<EntityKey>,
    wrapper: WrapperMode,
}

impl TraversalState {
    fn for_options(options: &Options) -> Self {
        Self {
            wrapper: WrapperMode {
                preformatted: options.is_code_block,
                ..WrapperMode::default()
            },
            ..Self::default()
        }
    }
}

/// One node of the intermediate descriptor forest.
#[derive(Debug, Clone)]
pub(crate) struct BlockDescriptor {
    pub key: BlockKey,
    /// `None` marks an untyped wrapper; finalization maps it to the
    /// generic default type if it survives.
    pub kind: Option<BlockType>,
    pub text: String,
    pub chars: Vec<CharacterMetadata>,
    pub depth: usize,
    pub children: Vec<BlockDescriptor>,
}

impl BlockDescriptor {
    fn new(
        key: BlockKey,
        kind: Option<BlockType>,
        text: String,
        chars: Vec<CharacterMetadata>,
        depth: usize,
    ) -> Self {
        debug_assert_eq!(chars.len(), text.chars().count());
        Self {
            key,
            kind,
            text,
            chars,
            depth,
            children: Vec::new(),
        }
    }
}

/// Deterministic fresh-identifier generator: five base-36 digits.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct KeyGenerator {
    next: u32,
}

impl KeyGenerator {
    pub(crate) fn next_key(&mut self) -> BlockKey {
        let mut n = self.next;
        self.next += 1;
        let mut digits = ['0'; 5];
        for slot in digits.iter_mut().rev() {
            *slot = char::from_digit(n % 36, 36).unwrap_or('0');
            n /= 36;
        }
        BlockKey::new(digits.iter().collect())
    }
}

/// Recursive-descent conversion engine.
///
/// Feed subtrees with [`add_node`](Self::add_node), then produce the
/// document with [`build`](Self::build). One builder serves one logical
/// conversion; call [`reset`](Self::reset) before reusing it for an
/// unrelated one.
pub struct BlockTreeBuilder<'a> {
    config: &'a BlockTypeConfig,
    options: &'a Options,
    forest: Vec<BlockDescriptor>,
    entities: EntityMap,
    keys: KeyGenerator,
    state: TraversalState,
}

impl<'a> BlockTreeBuilder<'a> {
    pub fn new(config: &'a BlockTypeConfig, options: &'a Options) -> Self {
        Self {
            config,
            options,
            forest: Vec::new(),
            entities: EntityMap::new(),
            keys: KeyGenerator::default(),
            state: TraversalState::for_options(options),
        }
    }

    /// Append the subtree under `node` to the accumulating forest. Pending
    /// free text is flushed into trailing text descriptors, then the whole
    /// forest gets its whitespace trim. Chainable.
    pub fn add_node(&mut self, node: &Node) -> &mut Self {
        let mut out = std::mem::take(&mut self.forest);
        self.walk(std::slice::from_ref(node), &StyleSet::new(), &mut out);
        self.flush_into(&mut out);
        whitespace::trim_descriptors(&mut out);
        self.forest = out;
        self
    }

    /// Finalize the forest into a document. Pure over the accumulated
    /// forest, so repeated calls without new `add_node` calls return the
    /// same document.
    pub fn build(&self) -> Document {
        let blocks = if self.options.tree_blocks {
            finalize::hierarchy(&self.forest)
        } else {
            finalize::flatten(self.forest.clone(), self.keys)
        };
        Document {
            blocks,
            entity_map: self.entities.clone(),
        }
    }

    /// Clear all accumulated state for reuse on an unrelated conversion.
    pub fn reset(&mut self) {
        self.forest.clear();
        self.entities = EntityMap::new();
        self.keys = KeyGenerator::default();
        self.state = TraversalState::for_options(self.options);
    }

    // -- traversal ----------------------------------------------------------

    fn walk(&mut self, nodes: &[Node], inline: &StyleSet, out: &mut Vec<BlockDescriptor>) {
        for node in nodes {
            // Root containers: recurse, flushing trailing text afterwards.
            if dom::is_root(node) {
                self.flush_into(out);
                self.walk(node.children(), inline, out);
                self.flush_into(out);
                continue;
            }

            // List containers: depth grows only when one list nests inside
            // another.
            if dom::is_list(node) {
                self.flush_into(out);
                let saved_depth = self.state.depth;
                let saved_wrapper = self.state.wrapper;
                if self.state.wrapper.list.is_some() {
                    self.state.depth += 1;
                }
                self.state.wrapper.list = Some(if dom::is_ordered_list(node) {
                    ListKind::Ordered
                } else {
                    ListKind::Unordered
                });
                self.walk(node.children(), inline, out);
                self.state.depth = saved_depth;
                self.state.wrapper = saved_wrapper;
                continue;
            }

            if dom::is_ignorable(node) {
                continue;
            }

            // Block-level tags.
            if let Some(kind) = node
                .tag()
                .and_then(|tag| self.config.resolve(tag, self.state.wrapper.list, node))
            {
                self.flush_into(out);
                let saved_depth = self.state.depth;
                let saved_wrapper = self.state.wrapper;
                let prev_kind = self.state.kind.replace(kind);
                if dom::is_preformatted(node) {
                    self.state.wrapper.preformatted = true;
                }
                let mut inner = Vec::new();
                self.walk(node.children(), inline, &mut inner);
                self.close_block(inner, out);
                self.state.kind = prev_kind;
                self.state.depth = saved_depth;
                self.state.wrapper = saved_wrapper;
                continue;
            }

            // Text nodes.
            if let Some(raw) = node.as_text() {
                let text = self.normalized_text(raw);
                if !text.is_empty() {
                    self.append_text(&text, inline);
                }
                continue;
            }

            if dom::is_line_break(node) {
                self.append_char('\n', inline);
                continue;
            }

            // Rich nodes; a failed classifier falls through to the next
            // dispatch rule, ending at generic inline.
            if self.try_file(node, inline, out) {
                continue;
            }
            if self.try_table(node, inline, out) {
                continue;
            }
            if self.try_image(node, inline, out) {
                continue;
            }
            if self.try_anchor(node, inline, out) {
                continue;
            }

            // Generic inline content.
            let styles = styles::from_node(node, inline, &self.options.custom_style_map);
            if matches!(node.tag(), Some("pre" | "code")) && dom::has_monospace_font(node) {
                // Preformatted wrapper persists for following siblings; the
                // enclosing block dispatch restores it.
                self.state.wrapper.preformatted = true;
            }
            self.walk(node.children(), &styles, out);
        }
    }

    // -- state transitions --------------------------------------------------

    /// Drain pending text into descriptors: trailing-whitespace trim, split
    /// on embedded newlines, one descriptor per line under the pending type
    /// (preformatted mode supplies the default). Flushing nothing keeps the
    /// pending type for the enclosing block.
    fn flush_into(&mut self, out: &mut Vec<BlockDescriptor>) {
        self.trim_trailing_run();
        if self.state.text.is_empty() {
            self.state.chars.clear();
            return;
        }
        let kind = self.state.kind.take();
        let text = std::mem::take(&mut self.state.text);
        let chars = std::mem::take(&mut self.state.chars);
        let lines = split_lines(text, chars);
        #[cfg(feature = "tracing")]
        tracing::trace!(lines = lines.len(), ?kind, "flush");
        for (text, chars) in lines {
            let kind = kind.or(self.preformatted_default());
            let descriptor =
                BlockDescriptor::new(self.keys.next_key(), kind, text, chars, self.state.depth);
            out.push(descriptor);
        }
    }

    /// Close a block-level element. With no nested descriptors, the
    /// accumulated text drains into one descriptor per line under the
    /// block's type. With nested descriptors, remaining text drains after
    /// them in document order and the block closes as one wrapper
    /// descriptor; a wrapper whose pending type was consumed by a
    /// descendant flush stays untyped, which is what lets the flattened
    /// pass hoist it away.
    fn close_block(&mut self, children: Vec<BlockDescriptor>, out: &mut Vec<BlockDescriptor>) {
        if children.is_empty() {
            self.trim_trailing_run();
            let kind = self.state.kind.take();
            let text = std::mem::take(&mut self.state.text);
            let chars = std::mem::take(&mut self.state.chars);
            if text.is_empty() {
                if kind.is_some() {
                    out.push(BlockDescriptor::new(
                        self.keys.next_key(),
                        kind,
                        String::new(),
                        Vec::new(),
                        self.state.depth,
                    ));
                }
                return;
            }
            for (text, chars) in split_lines(text, chars) {
                let kind = kind.or(self.preformatted_default());
                out.push(BlockDescriptor::new(
                    self.keys.next_key(),
                    kind,
                    text,
                    chars,
                    self.state.depth,
                ));
            }
            return;
        }

        let mut children = children;
        self.flush_into(&mut children);
        let kind = self.state.kind.take();
        let mut wrapper = BlockDescriptor::new(
            self.keys.next_key(),
            kind,
            String::new(),
            Vec::new(),
            self.state.depth,
        );
        wrapper.children = children;
        out.push(wrapper);
    }

    /// Emit one atomic descriptor anchoring `key` to a placeholder
    /// character, leaving the pending type untouched for the enclosing
    /// block.
    pub(crate) fn emit_atomic(
        &mut self,
        key: EntityKey,
        inline: &StyleSet,
        out: &mut Vec<BlockDescriptor>,
    ) {
        self.flush_into(out);
        let prev_kind = self.state.kind.take();
        self.with_current_entity(key, |builder| {
            builder.append_char(ENTITY_SENTINEL, inline);
        });
        let text = std::mem::take(&mut self.state.text);
        let chars = std::mem::take(&mut self.state.chars);
        out.push(BlockDescriptor::new(
            self.keys.next_key(),
            Some(BlockType::Atomic),
            text,
            chars,
            self.state.depth,
        ));
        self.state.kind = prev_kind;
    }

    /// Run `f` with `key` as the current entity, restoring the previous
    /// current entity on every exit path.
    pub(crate) fn with_current_entity<F>(&mut self, key: EntityKey, f: F)
    where
        F: FnOnce(&mut Self),
    {
        let prev = self.state.entity.replace(key);
        f(self);
        self.state.entity = prev;
    }

    fn preformatted_default(&self) -> Option<BlockType> {
        self.state.wrapper.preformatted.then_some(BlockType::CodeBlock)
    }

    // -- text accumulation --------------------------------------------------

    fn append_text(&mut self, text: &str, styles: &StyleSet) {
        for c in text.chars() {
            self.append_char(c, styles);
        }
    }

    fn append_char(&mut self, c: char, styles: &StyleSet) {
        self.state.text.push(c);
        self.state
            .chars
            .push(CharacterMetadata::new(styles.clone(), self.state.entity));
    }

    /// Text-node normalization. Outside preformatted mode: drop one leading
    /// line break, turn remaining line breaks into spaces, and coerce
    /// whitespace-only content to a single space.
    fn normalized_text(&self, raw: &str) -> String {
        if self.state.wrapper.preformatted {
            return raw.to_string();
        }
        let raw = raw.strip_prefix('\n').unwrap_or(raw);
        let collapsed: String = raw
            .chars()
            .map(|c| if c == '\n' { ' ' } else { c })
            .collect();
        if !collapsed.is_empty() && collapsed.chars().all(char::is_whitespace) {
            " ".to_string()
        } else {
            collapsed
        }
    }

    /// Remove trailing whitespace from the pending run. Never touches a
    /// character carrying an entity.
    fn trim_trailing_run(&mut self) {
        while let Some(meta) = self.state.chars.last() {
            if meta.entity.is_some() {
                break;
            }
            match self.state.text.chars().last() {
                Some(c) if c.is_whitespace() => {
                    self.state.text.pop();
                    self.state.chars.pop();
                }
                _ => break,
            }
        }
    }
}

/// Split a text/metadata run on embedded newlines, one segment per line.
/// The newline characters themselves are dropped with their metadata.
fn split_lines(
    text: String,
    chars: Vec<CharacterMetadata>,
) -> Vec<(String, Vec<CharacterMetadata>)> {
    let mut segments: Vec<(String, Vec<CharacterMetadata>)> = vec![(String::new(), Vec::new())];
    for (c, meta) in text.chars().zip(chars) {
        if c == '\n' {
            segments.push((String::new(), Vec::new()));
        } else if let Some((text, chars)) = segments.last_mut() {
            text.push(c);
            chars.push(meta);
        }
    }
    segments
}
