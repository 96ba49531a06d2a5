// Entity extraction: links, images, files, tables.

use pretty_assertions::assert_eq;

use html2blocks::{
    convert, BlockType, EntityData, EntityKind, Mutability, BOLD, ENTITY_SENTINEL,
};

#[test]
fn link_creates_a_mutable_entity_over_its_text() {
    let doc = convert(
        "<p><a href=\"https://example.com\" title=\"Example\" target=\"_blank\">link</a></p>",
    )
    .unwrap();
    let block = &doc.blocks[0];
    assert_eq!(block.text, "link");

    let key = block.character_list[0].entity.expect("entity attached");
    for meta in &block.character_list {
        assert_eq!(meta.entity, Some(key));
    }

    let entity = doc.entity_map.get(key).unwrap();
    assert_eq!(entity.kind, EntityKind::Link);
    assert_eq!(entity.mutability, Mutability::Mutable);
    let EntityData::Link(data) = &entity.data else {
        panic!("expected link data");
    };
    assert_eq!(data.url, "https://example.com");
    assert_eq!(data.title.as_deref(), Some("Example"));
    assert_eq!(data.target.as_deref(), Some("_blank"));
    assert_eq!(data.rel, None);
}

#[test]
fn link_attachment_does_not_leak_past_the_anchor() {
    let doc = convert("<p><a href=\"https://example.com\">in</a>out</p>").unwrap();
    let block = &doc.blocks[0];
    assert_eq!(block.text, "inout");
    assert!(block.character_list[0].entity.is_some());
    assert!(block.character_list[1].entity.is_some());
    assert!(block.character_list[2].entity.is_none());
}

#[test]
fn styled_link_text_keeps_both_style_and_entity() {
    let doc = convert("<p><a href=\"https://example.com\"><b>x</b></a></p>").unwrap();
    let meta = &doc.blocks[0].character_list[0];
    assert!(meta.styles.contains(BOLD));
    assert!(meta.entity.is_some());
}

#[test]
fn anchor_without_reference_creates_no_entity() {
    let doc = convert("<p><a>plain</a></p>").unwrap();
    assert_eq!(doc.blocks[0].text, "plain");
    assert!(doc.entity_map.is_empty());
}

#[test]
fn disallowed_scheme_creates_no_entity() {
    let doc = convert("<p><a href=\"javascript:alert(1)\">evil</a></p>").unwrap();
    assert_eq!(doc.blocks[0].text, "evil");
    assert!(doc.entity_map.is_empty());
    assert!(doc.blocks[0].character_list[0].entity.is_none());
}

#[test]
fn image_becomes_an_atomic_block_with_entity() {
    let doc = convert("<img src=\"pic.png\" alt=\"a pic\" width=\"40\">").unwrap();
    // Edge atomic blocks are guarded by empty text blocks.
    assert_eq!(doc.blocks.len(), 3);
    let atomic = &doc.blocks[1];
    assert_eq!(atomic.kind, BlockType::Atomic);
    assert_eq!(atomic.text, ENTITY_SENTINEL.to_string());

    let key = atomic.character_list[0].entity.unwrap();
    let entity = doc.entity_map.get(key).unwrap();
    assert_eq!(entity.kind, EntityKind::Image);
    assert_eq!(entity.mutability, Mutability::Immutable);
    let EntityData::Image(data) = &entity.data else {
        panic!("expected image data");
    };
    assert_eq!(data.url, "pic.png");
    assert_eq!(data.alt.as_deref(), Some("a pic"));
    assert_eq!(data.width.as_deref(), Some("40"));
    assert_eq!(data.height, None);
}

#[test]
fn image_without_source_is_plain_inline_content() {
    let doc = convert("<p><img alt=\"x\"></p>").unwrap();
    assert!(doc.entity_map.is_empty());
    assert_eq!(doc.blocks.len(), 1);
    assert_eq!(doc.blocks[0].text, "");
}

#[test]
fn consecutive_leading_images_get_a_leading_empty_block() {
    let doc = convert("<img src=\"a.png\"><img src=\"b.png\"><p>tail</p>").unwrap();
    assert_eq!(doc.blocks[0].text, "");
    assert_eq!(doc.blocks[0].kind, BlockType::Unstyled);
    assert_eq!(doc.blocks[1].kind, BlockType::Atomic);
    assert_eq!(doc.blocks[2].kind, BlockType::Atomic);
    assert_eq!(doc.blocks[3].text, "tail");
}

#[test]
fn trailing_image_gets_a_trailing_empty_block() {
    let doc = convert("<p>head</p><img src=\"a.png\">").unwrap();
    let last = doc.blocks.last().unwrap();
    assert_eq!(last.text, "");
    assert_eq!(doc.blocks[doc.blocks.len() - 2].kind, BlockType::Atomic);
}

#[test]
fn file_reference_becomes_a_file_entity() {
    let doc = convert(
        "<a data-bucket-name=\"uploads\" data-object-key=\"2024/doc.pdf\" \
         data-name=\"doc.pdf\" data-size=\"2048\" data-type=\"application/pdf\" \
         href=\"https://example.com/doc.pdf\">doc.pdf</a>",
    )
    .unwrap();
    assert_eq!(doc.blocks.len(), 3);
    let atomic = &doc.blocks[1];
    assert_eq!(atomic.kind, BlockType::Atomic);

    let key = atomic.character_list[0].entity.unwrap();
    let entity = doc.entity_map.get(key).unwrap();
    assert_eq!(entity.kind, EntityKind::File);
    let EntityData::File(data) = &entity.data else {
        panic!("expected file data");
    };
    assert_eq!(data.bucket_name, "uploads");
    assert_eq!(data.object_key, "2024/doc.pdf");
    assert_eq!(data.name.as_deref(), Some("doc.pdf"));
    assert_eq!(data.size, Some(2048));
    assert_eq!(data.file_type.as_deref(), Some("application/pdf"));
}

#[test]
fn table_produces_grid_metadata_and_cell_documents() {
    let doc = convert(
        "<table>\
           <tr><td>a</td><td>b</td></tr>\
           <tr><td>c</td><td>d</td></tr>\
         </table>",
    )
    .unwrap();
    let atomic = &doc.blocks[1];
    let key = atomic.character_list[0].entity.unwrap();
    let entity = doc.entity_map.get(key).unwrap();
    assert_eq!(entity.kind, EntityKind::Table);
    let EntityData::Table(data) = &entity.data else {
        panic!("expected table data");
    };
    assert_eq!(data.row_count, 2);
    assert_eq!(data.column_count, 2);
    assert_eq!(data.rows.len(), 2);
    assert_eq!(data.columns.len(), 2);
    assert!(data.merged.is_empty());

    let first_row = &data.cells[&data.rows[0]];
    assert_eq!(first_row[&data.columns[0]].document.blocks[0].text, "a");
    assert_eq!(first_row[&data.columns[1]].document.blocks[0].text, "b");
    let second_row = &data.cells[&data.rows[1]];
    assert_eq!(second_row[&data.columns[1]].document.blocks[0].text, "d");
}

#[test]
fn merged_cell_yields_one_span_record_with_correct_bounds() {
    let doc = convert(
        "<table>\
           <tr><td rowspan=\"2\">a</td><td>b</td></tr>\
           <tr><td>c</td></tr>\
         </table>",
    )
    .unwrap();
    let key = doc.blocks[1].character_list[0].entity.unwrap();
    let EntityData::Table(data) = &doc.entity_map.get(key).unwrap().data else {
        panic!("expected table data");
    };
    assert_eq!(data.merged.len(), 1);
    let span = data.merged[0];
    assert_eq!(span.first_row, 0);
    assert_eq!(span.last_row, 1);
    assert_eq!(span.first_col, 0);
    assert_eq!(span.last_col, 0);

    // The spanned slot shifts the second-row cell to the next column.
    let second_row = &data.cells[&data.rows[1]];
    assert!(!second_row.contains_key(&data.columns[0]));
    assert_eq!(second_row[&data.columns[1]].document.blocks[0].text, "c");
    assert_eq!(
        data.cells[&data.rows[0]][&data.columns[0]].row_span,
        2
    );
}

#[test]
fn column_widths_come_from_colgroup() {
    let doc = convert(
        "<table>\
           <colgroup><col width=\"100\"><col width=\"200\"></colgroup>\
           <tr><td>a</td><td>b</td></tr>\
         </table>",
    )
    .unwrap();
    let key = doc.blocks[1].character_list[0].entity.unwrap();
    let EntityData::Table(data) = &doc.entity_map.get(key).unwrap().data else {
        panic!("expected table data");
    };
    assert_eq!(data.column_widths[&data.columns[0]], "100");
    assert_eq!(data.column_widths[&data.columns[1]], "200");
}

#[test]
fn table_without_rows_is_not_an_entity() {
    let doc = convert("<table></table>").unwrap();
    assert!(doc.entity_map.is_empty());
    assert!(doc.blocks.is_empty());
}

#[test]
fn nested_table_converts_inside_its_cell() {
    let doc = convert(
        "<table><tr><td>\
           <table><tr><td>inner</td></tr></table>\
         </td></tr></table>",
    )
    .unwrap();
    let key = doc.blocks[1].character_list[0].entity.unwrap();
    let EntityData::Table(outer) = &doc.entity_map.get(key).unwrap().data else {
        panic!("expected table data");
    };
    let cell = &outer.cells[&outer.rows[0]][&outer.columns[0]];
    let inner_doc = &cell.document;
    // The cell's own document carries its own entity map and blocks.
    let inner_atomic = inner_doc
        .blocks
        .iter()
        .find(|b| b.kind == BlockType::Atomic)
        .expect("nested table block");
    let inner_key = inner_atomic.character_list[0].entity.unwrap();
    let EntityData::Table(inner) = &inner_doc.entity_map.get(inner_key).unwrap().data else {
        panic!("expected nested table data");
    };
    assert_eq!(inner.cells[&inner.rows[0]][&inner.columns[0]].document.blocks[0].text, "inner");
}

#[test]
fn file_takes_priority_over_link_extraction() {
    let doc = convert(
        "<p><a href=\"https://example.com\" data-bucket-name=\"b\" data-object-key=\"k\">f</a></p>",
    )
    .unwrap();
    assert_eq!(doc.entity_map.len(), 1);
    let (_, entity) = doc.entity_map.iter().next().unwrap();
    assert_eq!(entity.kind, EntityKind::File);
}
