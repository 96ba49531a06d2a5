// End-to-end API tests for html2blocks.

use pretty_assertions::assert_eq;

use html2blocks::{
    convert, convert_node_tree, convert_with, dom, Block, BlockTreeBuilder, BlockType,
    BlockTypeConfig, ConvertError, Document, Options,
};

/// Every block keeps its text and character list aligned.
fn assert_aligned(doc: &Document) {
    for block in &doc.blocks {
        assert_eq!(
            block.character_list.len(),
            block.text.chars().count(),
            "misaligned block {}: {:?}",
            block.key,
            block.text
        );
    }
}

/// Every entity key referenced from a character exists in the entity map.
fn assert_entities_resolve(doc: &Document) {
    for block in &doc.blocks {
        for meta in &block.character_list {
            if let Some(key) = meta.entity {
                assert!(
                    doc.entity_map.contains(key),
                    "dangling entity key {key} in block {}",
                    block.key
                );
            }
        }
    }
}

#[test]
fn test_empty_input() {
    let doc = convert("").unwrap();
    assert!(doc.blocks.is_empty());
}

#[test]
fn test_plain_text() {
    let doc = convert("Hello, world!").unwrap();
    assert_eq!(doc.blocks.len(), 1);
    assert_eq!(doc.blocks[0].text, "Hello, world!");
    assert_eq!(doc.blocks[0].kind, BlockType::Unstyled);
}

#[test]
fn test_character_alignment_on_mixed_document() {
    let doc = convert(
        "<h2>Title</h2>\
         <p>Some <b>bold</b> and <a href=\"https://example.com\">linked</a> text</p>\
         <ul><li>one</li><li>two<ul><li>deep</li></ul></li></ul>\
         <pre>code\nmore code</pre>\
         <img src=\"pic.png\" alt=\"pic\">",
    )
    .unwrap();
    assert_aligned(&doc);
    assert_entities_resolve(&doc);
}

#[test]
fn test_failing_tree_builder_short_circuits() {
    let result = convert_node_tree(
        "<p>ignored</p>",
        |_| None,
        &BlockTypeConfig::default(),
        &Options::default(),
    );
    assert!(matches!(result, Err(ConvertError::Tree)));
}

#[test]
fn test_custom_tree_builder_receives_preprocessed_markup() {
    let doc = convert_node_tree(
        "line&nbsp;one\r\n",
        |markup| {
            assert_eq!(markup, "line one\n");
            dom::build_tree(markup)
        },
        &BlockTypeConfig::default(),
        &Options::default(),
    )
    .unwrap();
    assert_eq!(doc.blocks[0].text, "line one");
}

#[test]
fn test_builder_is_chainable_and_accumulates() {
    let config = BlockTypeConfig::default();
    let options = Options::default();
    let first = dom::Node::element("p", vec![], vec![dom::Node::text("first")]);
    let second = dom::Node::element("p", vec![], vec![dom::Node::text("second")]);

    let mut builder = BlockTreeBuilder::new(&config, &options);
    builder.add_node(&first).add_node(&second);
    let doc = builder.build();
    assert_eq!(doc.blocks.len(), 2);
    assert_eq!(doc.blocks[0].text, "first");
    assert_eq!(doc.blocks[1].text, "second");
}

#[test]
fn test_build_is_idempotent() {
    let config = BlockTypeConfig::default();
    let options = Options::default();
    let node = dom::Node::element("p", vec![], vec![dom::Node::text("stable")]);

    let mut builder = BlockTreeBuilder::new(&config, &options);
    builder.add_node(&node);
    let first = builder.build();
    let second = builder.build();
    assert_eq!(first, second);
}

#[test]
fn test_reset_clears_accumulated_state() {
    let config = BlockTypeConfig::default();
    let options = Options::default();
    let node = dom::Node::element("p", vec![], vec![dom::Node::text("old")]);

    let mut builder = BlockTreeBuilder::new(&config, &options);
    builder.add_node(&node);
    builder.reset();
    let doc = builder.build();
    assert!(doc.blocks.is_empty());
    assert!(doc.entity_map.is_empty());
}

#[test]
fn test_conversion_is_deterministic() {
    let html = "<ul><li>a</li></ul><p><a href=\"https://example.com\">x</a></p>";
    let first = convert(html).unwrap();
    let second = convert(html).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_block_keys_are_unique() {
    let doc = convert("<p>a</p><p>b</p><ul><li>c</li><li>d</li></ul>").unwrap();
    let mut keys: Vec<_> = doc.blocks.iter().map(|b| b.key.clone()).collect();
    keys.sort();
    keys.dedup();
    assert_eq!(keys.len(), doc.blocks.len());
}

#[test]
fn test_document_json_round_trip() {
    let doc = convert(
        "<p><b>bold</b> <a href=\"https://example.com\">link</a></p>\
         <img src=\"pic.png\" width=\"40\">\
         <table><tr><td>cell</td></tr></table>",
    )
    .unwrap();
    let json = serde_json::to_string(&doc).unwrap();
    let back: Document = serde_json::from_str(&json).unwrap();
    assert_eq!(doc, back);
}

#[test]
fn test_code_block_option_forces_preformatted() {
    let options = Options::new().with_code_block(true);
    let doc = convert_with("  indented\nsecond line", &options).unwrap();
    assert_eq!(doc.blocks.len(), 2);
    assert_eq!(doc.blocks[0].kind, BlockType::CodeBlock);
    assert_eq!(doc.blocks[0].text, "  indented");
    assert_eq!(doc.blocks[1].text, "second line");
}

#[test]
fn test_hierarchical_output_links_blocks() {
    let options = Options::new().with_tree_blocks(true);
    let doc = convert_with("<blockquote><p>quoted</p></blockquote>", &options).unwrap();
    assert_eq!(doc.blocks.len(), 2);

    let wrapper: &Block = &doc.blocks[0];
    let inner: &Block = &doc.blocks[1];
    assert_eq!(wrapper.kind, BlockType::Blockquote);
    assert_eq!(wrapper.children, vec![inner.key.clone()]);
    assert_eq!(inner.parent.as_ref(), Some(&wrapper.key));
    assert_eq!(inner.text, "quoted");
}
