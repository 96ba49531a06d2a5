// Inline style derivation.
//
// Folds a node's tag and css properties into the ambient style-flag set.
// Nested formatting elements accumulate flags; css can both add and remove
// them (font-weight: normal inside <b> clears BOLD). Color and background
// flags are admitted only through the caller-supplied allow-list, which
// bounds style-flag growth. Everything here is pure.

use std::collections::BTreeSet;

use crate::dom::{self, Node};

pub const BOLD: &str = "BOLD";
pub const ITALIC: &str = "ITALIC";
pub const UNDERLINE: &str = "UNDERLINE";
pub const STRIKETHROUGH: &str = "STRIKETHROUGH";
pub const CODE: &str = "CODE";
pub const SUBSCRIPT: &str = "SUBSCRIPT";
pub const SUPERSCRIPT: &str = "SUPERSCRIPT";
pub const HIGHLIGHT: &str = "HIGHLIGHT";

/// The set of style flags active for a run of characters.
pub type StyleSet = BTreeSet<String>;

/// Derive the style set for a node's subtree from the ambient set.
pub(crate) fn from_node(node: &Node, ambient: &StyleSet, allowed: &BTreeSet<String>) -> StyleSet {
    let mut styles = ambient.clone();

    if let Some(flag) = tag_style(node) {
        styles.insert(flag.to_string());
    }

    apply_font_weight(node, &mut styles);
    apply_font_style(node, &mut styles);
    apply_text_decoration(node, &mut styles);
    apply_colors(node, &mut styles, allowed);

    if dom::has_monospace_font(node) {
        styles.insert(CODE.to_string());
    }

    styles
}

/// Style flag implied by the element tag itself.
fn tag_style(node: &Node) -> Option<&'static str> {
    match node.tag()? {
        "b" | "strong" => Some(BOLD),
        "i" | "em" => Some(ITALIC),
        "u" | "ins" => Some(UNDERLINE),
        "s" | "del" | "strike" => Some(STRIKETHROUGH),
        "code" | "kbd" | "samp" | "tt" => Some(CODE),
        "sub" => Some(SUBSCRIPT),
        "sup" => Some(SUPERSCRIPT),
        "mark" => Some(HIGHLIGHT),
        _ => None,
    }
}

fn apply_font_weight(node: &Node, styles: &mut StyleSet) {
    let Some(weight) = node.style("font-weight") else {
        return;
    };
    let weight = weight.to_ascii_lowercase();
    let bold = match weight.as_str() {
        "bold" | "bolder" => true,
        "normal" | "lighter" => false,
        numeric => match numeric.parse::<u16>() {
            Ok(n) => n >= 600,
            Err(_) => return,
        },
    };
    if bold {
        styles.insert(BOLD.to_string());
    } else {
        styles.remove(BOLD);
    }
}

fn apply_font_style(node: &Node, styles: &mut StyleSet) {
    let Some(slant) = node.style("font-style") else {
        return;
    };
    match slant.to_ascii_lowercase().as_str() {
        "italic" | "oblique" => {
            styles.insert(ITALIC.to_string());
        }
        "normal" => {
            styles.remove(ITALIC);
        }
        _ => {}
    }
}

fn apply_text_decoration(node: &Node, styles: &mut StyleSet) {
    let decoration = node
        .style("text-decoration")
        .or_else(|| node.style("text-decoration-line"));
    let Some(decoration) = decoration else {
        return;
    };
    let decoration = decoration.to_ascii_lowercase();
    if decoration.contains("underline") {
        styles.insert(UNDERLINE.to_string());
    }
    if decoration.contains("line-through") {
        styles.insert(STRIKETHROUGH.to_string());
    }
    if decoration.split_whitespace().any(|part| part == "none") {
        styles.remove(UNDERLINE);
        styles.remove(STRIKETHROUGH);
    }
}

/// Color and background flags, admitted only through the allow-list.
fn apply_colors(node: &Node, styles: &mut StyleSet, allowed: &BTreeSet<String>) {
    if let Some(color) = node.style("color") {
        let flag = format!("color-{color}");
        if allowed.contains(&flag) {
            styles.insert(flag);
        }
    }
    if let Some(background) = node.style("background-color") {
        let flag = format!("bgcolor-{background}");
        if allowed.contains(&flag) {
            styles.insert(flag);
        }
    }
}
