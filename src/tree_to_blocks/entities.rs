// Entity extraction — link, image, file, and table nodes.
//
// The four extractors share one protocol: validate the node shape, build
// the attribute record from a fixed allow-list, create the entity, mark it
// current, anchor characters, clear current. `with_current_entity` restores
// the previous key on every exit path, so attachment never leaks into
// unrelated text. A node failing validation is reported back to the walk,
// which falls through to the next dispatch rule.

use std::collections::BTreeMap;

use url::Url;

use crate::document::{
    CellSpan, Document, Entity, FileData, ImageData, LinkData, TableCell, TableData,
};
use crate::dom::{self, Node};

use super::styles::StyleSet;
use super::{BlockDescriptor, BlockTreeBuilder};

const ALLOWED_SCHEMES: &[&str] = &["http", "https", "mailto", "tel", "ftp"];

impl BlockTreeBuilder<'_> {
    /// Anchors wrap real text: recurse into the children with the entity
    /// current instead of anchoring a placeholder.
    pub(crate) fn try_anchor(
        &mut self,
        node: &Node,
        inline: &StyleSet,
        out: &mut Vec<BlockDescriptor>,
    ) -> bool {
        if !dom::is_anchor(node) {
            return false;
        }
        let Some(data) = link_data(node) else {
            return false;
        };
        let key = self.entities.add(Entity::link(data));
        self.with_current_entity(key, |builder| {
            builder.walk(node.children(), inline, out);
        });
        true
    }

    pub(crate) fn try_image(
        &mut self,
        node: &Node,
        inline: &StyleSet,
        out: &mut Vec<BlockDescriptor>,
    ) -> bool {
        if !dom::is_image(node) {
            return false;
        }
        let Some(data) = image_data(node) else {
            return false;
        };
        let key = self.entities.add(Entity::image(data));
        self.emit_atomic(key, inline, out);
        true
    }

    pub(crate) fn try_file(
        &mut self,
        node: &Node,
        inline: &StyleSet,
        out: &mut Vec<BlockDescriptor>,
    ) -> bool {
        if !dom::is_file_reference(node) {
            return false;
        }
        let Some(data) = file_data(node) else {
            return false;
        };
        let key = self.entities.add(Entity::file(data));
        self.emit_atomic(key, inline, out);
        true
    }

    pub(crate) fn try_table(
        &mut self,
        node: &Node,
        inline: &StyleSet,
        out: &mut Vec<BlockDescriptor>,
    ) -> bool {
        if !dom::is_table(node) {
            return false;
        }
        let Some(data) = self.table_data(node) else {
            return false;
        };
        let key = self.entities.add(Entity::table(data));
        self.emit_atomic(key, inline, out);
        true
    }

    /// Assemble grid metadata and per-cell sub-documents. `None` when the
    /// table has no usable grid, in which case its content is processed as
    /// generic inline markup.
    fn table_data(&mut self, node: &Node) -> Option<TableData> {
        let rows = collect_rows(node);
        if rows.is_empty() {
            return None;
        }
        let counted_columns = rows.iter().map(|row| row_width(row)).max().unwrap_or(0);
        if counted_columns == 0 {
            return None;
        }
        let row_count = count_attr(node, "data-row-count").unwrap_or(rows.len());
        let column_count = count_attr(node, "data-column-count").unwrap_or(counted_columns);
        if row_count == 0 || column_count == 0 {
            return None;
        }

        let row_ids: Vec<String> = (0..row_count).map(|_| self.keys.next_key().to_string()).collect();
        let column_ids: Vec<String> =
            (0..column_count).map(|_| self.keys.next_key().to_string()).collect();

        let mut occupied = vec![vec![false; column_count]; row_count];
        let mut cells: BTreeMap<String, BTreeMap<String, TableCell>> = BTreeMap::new();
        let mut merged = Vec::new();

        for (r, row) in rows.iter().take(row_count).enumerate() {
            let mut c = 0;
            for cell in row_cells(row) {
                while c < column_count && occupied[r][c] {
                    c += 1;
                }
                if c >= column_count {
                    break;
                }
                let row_span = span_attr(cell, "rowspan");
                let col_span = span_attr(cell, "colspan");
                let last_row = (r + row_span).min(row_count) - 1;
                let last_col = (c + col_span).min(column_count) - 1;
                for occupied_row in occupied.iter_mut().take(last_row + 1).skip(r) {
                    for slot in occupied_row.iter_mut().take(last_col + 1).skip(c) {
                        *slot = true;
                    }
                }
                if row_span > 1 || col_span > 1 {
                    merged.push(CellSpan {
                        first_row: r,
                        last_row,
                        first_col: c,
                        last_col,
                    });
                }
                let id = self.keys.next_key().to_string();
                let document = self.cell_document(cell);
                cells.entry(row_ids[r].clone()).or_default().insert(
                    column_ids[c].clone(),
                    TableCell {
                        id,
                        row_span,
                        col_span,
                        document,
                    },
                );
                c = last_col + 1;
            }
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(rows = row_count, columns = column_count, "table entity");

        Some(TableData {
            row_count,
            column_count,
            column_widths: column_widths(node, &column_ids),
            rows: row_ids,
            columns: column_ids,
            cells,
            merged,
        })
    }

    /// Convert a cell's inner fragment with an independent pipeline
    /// instance. A cell that cannot be converted degrades to an empty
    /// document rather than aborting the parent conversion.
    fn cell_document(&self, cell: &Node) -> Document {
        if !cell.is_element() {
            return Document::default();
        }
        let mut builder = BlockTreeBuilder::new(self.config, self.options);
        for child in cell.children() {
            builder.add_node(child);
        }
        builder.build()
    }
}

// ---------------------------------------------------------------------------
// Attribute records
// ---------------------------------------------------------------------------

fn link_data(node: &Node) -> Option<LinkData> {
    let href = node.attr("href").filter(|href| !href.is_empty())?;
    if !scheme_allowed(href) {
        return None;
    }
    Some(LinkData {
        url: href.to_string(),
        class: owned_attr(node, "class"),
        href: Some(href.to_string()),
        rel: owned_attr(node, "rel"),
        target: owned_attr(node, "target"),
        title: owned_attr(node, "title"),
    })
}

fn image_data(node: &Node) -> Option<ImageData> {
    let src = node.attr("src").filter(|src| !src.is_empty())?;
    Some(ImageData {
        url: src.to_string(),
        alt: owned_attr(node, "alt"),
        class: owned_attr(node, "class"),
        height: owned_attr(node, "height"),
        width: owned_attr(node, "width"),
    })
}

fn file_data(node: &Node) -> Option<FileData> {
    let bucket_name = node.attr("data-bucket-name").filter(|v| !v.is_empty())?;
    let object_key = node.attr("data-object-key").filter(|v| !v.is_empty())?;
    Some(FileData {
        bucket_name: bucket_name.to_string(),
        object_key: object_key.to_string(),
        file_type: owned_attr(node, "data-type"),
        name: owned_attr(node, "data-name"),
        size: node.attr("data-size").and_then(|v| v.parse().ok()),
    })
}

fn owned_attr(node: &Node, name: &str) -> Option<String> {
    node.attr(name).filter(|v| !v.is_empty()).map(str::to_string)
}

/// A reference is acceptable when relative or carrying an allowed scheme.
fn scheme_allowed(href: &str) -> bool {
    match Url::parse(href) {
        Ok(url) => ALLOWED_SCHEMES.contains(&url.scheme()),
        Err(url::ParseError::RelativeUrlWithoutBase) => true,
        Err(_) => false,
    }
}

// ---------------------------------------------------------------------------
// Table shape helpers
// ---------------------------------------------------------------------------

/// Rows in document order: direct `tr` children plus those nested in
/// section wrappers.
fn collect_rows(table: &Node) -> Vec<&Node> {
    let mut rows = Vec::new();
    for child in table.children() {
        match child.tag() {
            Some("tr") => rows.push(child),
            Some("thead" | "tbody" | "tfoot") => {
                rows.extend(child.children().iter().filter(|n| n.tag() == Some("tr")));
            }
            _ => {}
        }
    }
    rows
}

fn row_cells(row: &Node) -> impl Iterator<Item = &Node> {
    row.children()
        .iter()
        .filter(|n| matches!(n.tag(), Some("td" | "th")))
}

/// Spanned width of a row, counting colspans.
fn row_width(row: &Node) -> usize {
    row_cells(row).map(|cell| span_attr(cell, "colspan")).sum()
}

fn span_attr(cell: &Node, name: &str) -> usize {
    cell.attr(name)
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&v| v >= 1)
        .unwrap_or(1)
}

fn count_attr(node: &Node, name: &str) -> Option<usize> {
    node.attr(name).and_then(|v| v.parse().ok())
}

/// Column widths from `colgroup > col`, mapped by column id.
fn column_widths(table: &Node, column_ids: &[String]) -> BTreeMap<String, String> {
    let mut widths = BTreeMap::new();
    let Some(colgroup) = table
        .children()
        .iter()
        .find(|n| n.tag() == Some("colgroup"))
    else {
        return widths;
    };
    let cols = colgroup.children().iter().filter(|n| n.tag() == Some("col"));
    for (id, col) in column_ids.iter().zip(cols) {
        let width = col.attr("width").or_else(|| col.style("width"));
        if let Some(width) = width.filter(|w| !w.is_empty()) {
            widths.insert(id.clone(), width.to_string());
        }
    }
    widths
}
