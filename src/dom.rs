// Input node model and the default tree builder.
//
// Conversion operates on a generic, already-sanitized node tree: elements
// with a tag name, attributes, parsed inline style properties, and ordered
// children, plus text leaves. `build_tree` produces such a tree from an HTML
// string via html5ever; callers with their own sanitization pipeline can
// hand `convert_node_tree` any tree built through the `Node` constructors.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use html5ever::tendril::TendrilSink;
use html5ever::tree_builder::TreeBuilderOpts;
use html5ever::{parse_document, ParseOpts};
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use regex::Regex;

/// A node in the input tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeKind {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Element {
    tag: String,
    attrs: Vec<(String, String)>,
    styles: BTreeMap<String, String>,
    children: Vec<Node>,
}

impl Node {
    /// Build an element node. The `style` attribute, if present, is parsed
    /// into inline style properties.
    pub fn element(tag: &str, attrs: Vec<(String, String)>, children: Vec<Node>) -> Self {
        let styles = attrs
            .iter()
            .find(|(name, _)| name == "style")
            .map(|(_, value)| parse_inline_styles(value))
            .unwrap_or_default();
        Self {
            kind: NodeKind::Element(Element {
                tag: tag.to_ascii_lowercase(),
                attrs,
                styles,
                children,
            }),
        }
    }

    /// Build a text node.
    pub fn text(value: &str) -> Self {
        Self {
            kind: NodeKind::Text(value.to_string()),
        }
    }

    pub fn is_element(&self) -> bool {
        matches!(self.kind, NodeKind::Element(_))
    }

    /// Tag name of an element node, lowercase.
    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Element(el) => Some(&el.tag),
            NodeKind::Text(_) => None,
        }
    }

    /// Value of the first attribute with the given name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        match &self.kind {
            NodeKind::Element(el) => el
                .attrs
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    /// Value of an inline style property, lowercase key.
    pub fn style(&self, property: &str) -> Option<&str> {
        match &self.kind {
            NodeKind::Element(el) => el.styles.get(property).map(String::as_str),
            NodeKind::Text(_) => None,
        }
    }

    pub fn children(&self) -> &[Node] {
        match &self.kind {
            NodeKind::Element(el) => &el.children,
            NodeKind::Text(_) => &[],
        }
    }

    /// Text content of a text node.
    pub fn as_text(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Text(value) => Some(value),
            NodeKind::Element(_) => None,
        }
    }
}

/// Parse a `style` attribute value into property → value pairs.
fn parse_inline_styles(style: &str) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for declaration in style.split(';') {
        if let Some((prop, value)) = declaration.split_once(':') {
            let prop = prop.trim().to_ascii_lowercase();
            let value = value.trim().to_string();
            if !prop.is_empty() && !value.is_empty() {
                map.insert(prop, value);
            }
        }
    }
    map
}

// ---------------------------------------------------------------------------
// Classifiers
// ---------------------------------------------------------------------------

/// Elements that contribute nothing to the document.
const IGNORED_TAGS: &[&str] = &[
    "applet", "area", "base", "basefont", "col", "colgroup", "datalist", "embed",
    "frame", "frameset", "head", "link", "meta", "noscript", "object", "param",
    "script", "source", "style", "template", "title", "track",
];

/// Root containers: recursion passes through without producing a block.
pub fn is_root(node: &Node) -> bool {
    matches!(node.tag(), Some("html" | "body"))
}

/// List containers. Nesting one inside another increments list depth.
pub fn is_list(node: &Node) -> bool {
    matches!(node.tag(), Some("ul" | "ol"))
}

/// Whether a list container is ordered.
pub fn is_ordered_list(node: &Node) -> bool {
    node.tag() == Some("ol")
}

pub fn is_line_break(node: &Node) -> bool {
    node.tag() == Some("br")
}

pub fn is_anchor(node: &Node) -> bool {
    node.tag() == Some("a")
}

pub fn is_image(node: &Node) -> bool {
    node.tag() == Some("img")
}

pub fn is_table(node: &Node) -> bool {
    node.tag() == Some("table")
}

/// A file-attachment reference: any element carrying storage coordinates.
pub fn is_file_reference(node: &Node) -> bool {
    node.attr("data-bucket-name").is_some() && node.attr("data-object-key").is_some()
}

/// Decorative or invisible nodes, skipped without recursion.
pub fn is_ignorable(node: &Node) -> bool {
    let Some(tag) = node.tag() else {
        return false;
    };
    if IGNORED_TAGS.contains(&tag) {
        return true;
    }
    if node.style("display").is_some_and(|v| v.eq_ignore_ascii_case("none")) {
        return true;
    }
    node.attr("aria-hidden").is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

/// Whether an element declares preformatted whitespace, by tag or style.
pub fn is_preformatted(node: &Node) -> bool {
    if node.tag() == Some("pre") {
        return true;
    }
    node.style("white-space")
        .is_some_and(|v| v.to_ascii_lowercase().starts_with("pre"))
}

/// Whether an element declares a monospace font family.
pub fn has_monospace_font(node: &Node) -> bool {
    const MONOSPACE_FAMILIES: &[&str] = &[
        "monospace", "courier", "courier new", "consolas", "menlo", "monaco",
        "source code pro", "roboto mono", "sfmono-regular",
    ];
    let Some(families) = node.style("font-family") else {
        return false;
    };
    families.split(',').any(|family| {
        let family = family.trim().trim_matches(['"', '\'']).to_ascii_lowercase();
        MONOSPACE_FAMILIES.contains(&family.as_str())
    })
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

static NBSP_MARKERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&nbsp;|&#0*160;|&#[xX]0*[aA]0;").unwrap());

static LITERAL_ESCAPES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\r|\\u200[bB]").unwrap());

/// Normalize raw markup before tree construction: strip carriage returns,
/// replace non-breaking-space entity markers with plain spaces, and strip
/// literal `\r` / `​` escape sequences left behind by upstream tooling.
pub fn preprocess(markup: &str) -> String {
    let markup = markup.replace('\r', "");
    let markup = NBSP_MARKERS.replace_all(&markup, " ");
    LITERAL_ESCAPES.replace_all(&markup, "").into_owned()
}

// ---------------------------------------------------------------------------
// Default tree builder
// ---------------------------------------------------------------------------

/// Parse an HTML string into a node tree rooted at `<body>`.
///
/// This is the default tree builder used by [`crate::convert`]. Comments,
/// doctypes, and processing instructions are dropped; element tags arrive
/// lowercase from the parser.
pub fn build_tree(html: &str) -> Option<Node> {
    let opts = ParseOpts {
        tree_builder: TreeBuilderOpts {
            drop_doctype: true,
            ..Default::default()
        },
        ..Default::default()
    };
    let dom = parse_document(RcDom::default(), opts)
        .from_utf8()
        .one(html.as_bytes());
    find_body(&dom.document).map(|body| from_rcdom(&body))
}

/// Locate the `<body>` element under the document node.
fn find_body(document: &Handle) -> Option<Handle> {
    let html = document.children.borrow().iter().find(|child| {
        matches!(&child.data, NodeData::Element { name, .. } if name.local.as_ref() == "html")
    })?.clone();
    let body = html.children.borrow().iter().find(|child| {
        matches!(&child.data, NodeData::Element { name, .. } if name.local.as_ref() == "body")
    })?.clone();
    Some(body)
}

/// Convert an rcdom subtree into the generic node model.
fn from_rcdom(handle: &Handle) -> Node {
    match &handle.data {
        NodeData::Element { name, attrs, .. } => {
            let attrs: Vec<(String, String)> = attrs
                .borrow()
                .iter()
                .map(|attr| (attr.name.local.as_ref().to_string(), attr.value.to_string()))
                .collect();
            let children: Vec<Node> = handle
                .children
                .borrow()
                .iter()
                .filter(|child| {
                    matches!(
                        child.data,
                        NodeData::Element { .. } | NodeData::Text { .. }
                    )
                })
                .map(from_rcdom)
                .collect();
            Node::element(name.local.as_ref(), attrs, children)
        }
        NodeData::Text { contents } => Node::text(&contents.borrow()),
        // Filtered out by the caller.
        _ => Node::text(""),
    }
}
