//! Owned markup tree used by extraction and word synchronization.
//!
//! Parsing is delegated to scraper/html5ever; everything after that works on
//! this small tree: ordered walks over text nodes, in-place rewriting of text,
//! and serialization back to HTML.

use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::Html;

/// Elements that never close (`<br>`, `<img>`, ...).
const VOID_ELEMENTS: [&str; 9] = ["area", "br", "col", "hr", "img", "input", "meta", "source", "wbr"];

/// Phrasing elements; punctuation rendered right after one of these belongs
/// to the word inside it.
const INLINE_ELEMENTS: [&str; 26] = [
    "a", "abbr", "b", "bdi", "bdo", "cite", "code", "data", "del", "dfn", "em", "i", "ins", "kbd",
    "mark", "q", "s", "samp", "small", "span", "strong", "sub", "sup", "time", "u", "var",
];

/// Elements whose text is not prose.
const OPAQUE_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkupNode {
    Element(MarkupElement),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkupElement {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<MarkupNode>,
}

impl MarkupNode {
    pub fn text(text: impl Into<String>) -> Self {
        MarkupNode::Text(text.into())
    }

    pub fn element(name: &str, attrs: Vec<(String, String)>, children: Vec<MarkupNode>) -> Self {
        MarkupNode::Element(MarkupElement {
            name: name.to_ascii_lowercase(),
            attrs,
            children,
        })
    }
}

impl MarkupElement {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn is_inline(&self) -> bool {
        INLINE_ELEMENTS.contains(&self.name.as_str())
    }

    pub fn is_void(&self) -> bool {
        VOID_ELEMENTS.contains(&self.name.as_str())
    }

    /// Text inside opaque elements is never treated as words.
    pub fn is_opaque(&self) -> bool {
        OPAQUE_ELEMENTS.contains(&self.name.as_str())
    }
}

/// Parse an HTML fragment (e.g. article content) into owned nodes.
pub fn parse_fragment(html: &str) -> Vec<MarkupNode> {
    let fragment = Html::parse_fragment(html);
    fragment
        .root_element()
        .children()
        .filter_map(convert_node)
        .collect()
}

/// Convert a scraper node, dropping comments and doctypes.
pub fn convert_node(node: NodeRef<'_, Node>) -> Option<MarkupNode> {
    match node.value() {
        Node::Text(text) => {
            let text: &str = text;
            Some(MarkupNode::text(text))
        }
        Node::Element(element) => Some(MarkupNode::element(
            element.name(),
            element
                .attrs()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
            node.children().filter_map(convert_node).collect(),
        )),
        _ => None,
    }
}

/// Visit every text node outside opaque elements, in document order.
pub fn for_each_text<'a>(nodes: &'a [MarkupNode], visit: &mut impl FnMut(&'a str)) {
    for node in nodes {
        match node {
            MarkupNode::Text(text) => visit(text),
            MarkupNode::Element(element) if !element.is_opaque() => {
                for_each_text(&element.children, visit);
            }
            MarkupNode::Element(_) => {}
        }
    }
}

pub fn render(nodes: &[MarkupNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        render_node(node, &mut out);
    }
    out
}

fn render_node(node: &MarkupNode, out: &mut String) {
    match node {
        MarkupNode::Text(text) => push_escaped(out, text, false),
        MarkupNode::Element(element) => {
            out.push('<');
            out.push_str(&element.name);
            for (key, value) in &element.attrs {
                out.push(' ');
                out.push_str(key);
                out.push_str("=\"");
                push_escaped(out, value, true);
                out.push('"');
            }
            out.push('>');
            if element.is_void() {
                return;
            }
            for child in &element.children {
                render_node(child, out);
            }
            out.push_str("</");
            out.push_str(&element.name);
            out.push('>');
        }
    }
}

fn push_escaped(out: &mut String, text: &str, attribute: bool) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn fragment_round_trips_through_render() {
        let html = r#"<p class="x">A &amp; B <a href="/q?a=1&amp;b=2">link</a><br>tail</p>"#;
        let nodes = parse_fragment(html);
        assert_eq!(render(&nodes), html);
    }

    #[test]
    fn text_walk_skips_scripts() {
        let nodes = parse_fragment("<p>one<script>var x;</script> two</p>");
        let mut seen = Vec::new();
        for_each_text(&nodes, &mut |text| seen.push(text));
        assert_eq!(seen, vec!["one", " two"]);
    }
}
