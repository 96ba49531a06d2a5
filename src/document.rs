// Block document model — the normalized output of conversion.
//
// A document is an ordered list of typed blocks plus an entity map. Each
// block carries plain text and a per-character metadata run of the same
// length. Rich inline objects (links, images, files, tables) live in the
// entity map and are referenced from individual character positions.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Placeholder character anchoring a block-level entity (image, file,
/// table) to exactly one text position. U+FFFC OBJECT REPLACEMENT CHARACTER.
pub const ENTITY_SENTINEL: char = '\u{fffc}';

// ---------------------------------------------------------------------------
// Keys
// ---------------------------------------------------------------------------

/// Unique identifier of a block within one conversion.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockKey(String);

impl BlockKey {
    pub(crate) fn new(value: String) -> Self {
        Self(value)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BlockKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key of an entity in the [`EntityMap`]. Monotonically assigned.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EntityKey(pub(crate) u32);

impl std::fmt::Display for EntityKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Blocks
// ---------------------------------------------------------------------------

/// Semantic type of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockType {
    #[default]
    Unstyled,
    Paragraph,
    HeaderOne,
    HeaderTwo,
    HeaderThree,
    HeaderFour,
    HeaderFive,
    HeaderSix,
    Blockquote,
    CodeBlock,
    /// A block holding a single embedded object (image, file, table).
    Atomic,
    UnorderedListItem,
    OrderedListItem,
}

impl BlockType {
    /// Whether blocks of this type hold an embedded object rather than text.
    pub fn is_atomic(self) -> bool {
        matches!(self, BlockType::Atomic)
    }
}

/// Per-character annotation: style flags plus an optional entity reference.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CharacterMetadata {
    pub styles: BTreeSet<String>,
    pub entity: Option<EntityKey>,
}

impl CharacterMetadata {
    pub fn new(styles: BTreeSet<String>, entity: Option<EntityKey>) -> Self {
        Self { styles, entity }
    }
}

/// One finalized content block.
///
/// `character_list` always has exactly one element per character of `text`.
/// The tree fields (`parent`, `children`, siblings) are populated in
/// hierarchical output mode and empty in flattened mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub key: BlockKey,
    #[serde(rename = "type")]
    pub kind: BlockType,
    pub text: String,
    pub character_list: Vec<CharacterMetadata>,
    pub depth: usize,
    pub parent: Option<BlockKey>,
    pub children: Vec<BlockKey>,
    pub prev_sibling: Option<BlockKey>,
    pub next_sibling: Option<BlockKey>,
}

impl Block {
    /// Number of characters in this block's text.
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// Whether editing the anchored text updates or removes the entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Mutability {
    Mutable,
    Immutable,
}

/// A rich inline object referenced from character positions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entity {
    #[serde(rename = "type")]
    pub kind: EntityKind,
    pub mutability: Mutability,
    pub data: EntityData,
}

// The data record's shape follows the `type` field, so deserialization
// routes through it; a shape-guessing untagged decode would confuse LINK
// and IMAGE records, which can both be a bare `url`.
impl<'de> Deserialize<'de> for Entity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            #[serde(rename = "type")]
            kind: EntityKind,
            mutability: Mutability,
            data: serde_json::Value,
        }
        let raw = Raw::deserialize(deserializer)?;
        let data = match raw.kind {
            EntityKind::Link => EntityData::Link(
                serde_json::from_value(raw.data).map_err(serde::de::Error::custom)?,
            ),
            EntityKind::Image => EntityData::Image(
                serde_json::from_value(raw.data).map_err(serde::de::Error::custom)?,
            ),
            EntityKind::File => EntityData::File(
                serde_json::from_value(raw.data).map_err(serde::de::Error::custom)?,
            ),
            EntityKind::Table => EntityData::Table(
                serde_json::from_value(raw.data).map_err(serde::de::Error::custom)?,
            ),
        };
        Ok(Entity {
            kind: raw.kind,
            mutability: raw.mutability,
            data,
        })
    }
}

impl Entity {
    pub fn link(data: LinkData) -> Self {
        Self {
            kind: EntityKind::Link,
            mutability: Mutability::Mutable,
            data: EntityData::Link(data),
        }
    }

    pub fn image(data: ImageData) -> Self {
        Self {
            kind: EntityKind::Image,
            mutability: Mutability::Immutable,
            data: EntityData::Image(data),
        }
    }

    pub fn file(data: FileData) -> Self {
        Self {
            kind: EntityKind::File,
            mutability: Mutability::Immutable,
            data: EntityData::File(data),
        }
    }

    pub fn table(data: TableData) -> Self {
        Self {
            kind: EntityKind::Table,
            mutability: Mutability::Immutable,
            data: EntityData::Table(data),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntityKind {
    Link,
    Image,
    File,
    Table,
}

/// Kind-specific entity attributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EntityData {
    Link(LinkData),
    Image(ImageData),
    File(FileData),
    Table(TableData),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LinkData {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rel: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageData {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileData {
    pub bucket_name: String,
    pub object_key: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// Grid metadata plus per-cell sub-documents for a TABLE entity.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableData {
    pub row_count: usize,
    pub column_count: usize,
    /// Row identifiers in display order.
    pub rows: Vec<String>,
    /// Column identifiers in display order.
    pub columns: Vec<String>,
    /// row id → column id → cell.
    pub cells: BTreeMap<String, BTreeMap<String, TableCell>>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub merged: Vec<CellSpan>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub column_widths: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableCell {
    pub id: String,
    pub row_span: usize,
    pub col_span: usize,
    pub document: Document,
}

/// Zero-based inclusive bounds of a merged cell region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellSpan {
    pub first_row: usize,
    pub last_row: usize,
    pub first_col: usize,
    pub last_col: usize,
}

/// Append-only key → entity mapping with monotonically assigned keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityMap {
    entities: BTreeMap<EntityKey, Entity>,
    #[serde(skip)]
    next: u32,
}

// Key assignment state is bookkeeping, not content.
impl PartialEq for EntityMap {
    fn eq(&self, other: &Self) -> bool {
        self.entities == other.entities
    }
}

impl EntityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an entity and return its freshly assigned key.
    pub fn add(&mut self, entity: Entity) -> EntityKey {
        let key = EntityKey(self.next);
        self.next += 1;
        self.entities.insert(key, entity);
        key
    }

    pub fn get(&self, key: EntityKey) -> Option<&Entity> {
        self.entities.get(&key)
    }

    pub fn contains(&self, key: EntityKey) -> bool {
        self.entities.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityKey, &Entity)> {
        self.entities.iter().map(|(k, v)| (*k, v))
    }
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// The finished conversion result: ordered blocks plus the entity map.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub blocks: Vec<Block>,
    pub entity_map: EntityMap,
}

impl Document {
    /// Concatenated text of all blocks, newline-separated.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        for (i, block) in self.blocks.iter().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&block.text);
        }
        out
    }
}
