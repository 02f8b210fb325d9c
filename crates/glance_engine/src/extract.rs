use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::markup::{for_each_text, MarkupNode};

const EXCERPT_MAX_CHARS: usize = 200;

/// Dropped together with their content. A `form` is unwrapped like any other
/// container; only its controls are dropped.
const DROPPED_ELEMENTS: [&str; 19] = [
    "script", "style", "noscript", "iframe", "template", "button", "input", "select", "textarea",
    "nav", "aside", "footer", "svg", "canvas", "object", "embed", "link", "meta", "head",
];

/// Kept as elements; anything else is unwrapped to its children. Table parts
/// must all be kept: text left loose inside `<table>` gets moved by the parser.
const KEPT_ELEMENTS: [&str; 53] = [
    "p", "h1", "h2", "h3", "h4", "h5", "h6", "a", "em", "strong", "b", "i", "u", "s", "blockquote",
    "ul", "ol", "li", "pre", "code", "br", "hr", "figure", "figcaption", "img", "span", "div",
    "section", "article", "header", "table", "caption", "colgroup", "col", "thead", "tbody",
    "tfoot", "tr", "td", "th", "sup", "sub", "small", "mark", "q", "cite", "abbr", "time", "dl",
    "dt", "dd", "del", "ins",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedContent {
    pub title: Option<String>,
    pub byline: Option<String>,
    pub site_name: Option<String>,
    pub excerpt: Option<String>,
    /// Sanitized article body.
    pub content: Vec<MarkupNode>,
}

pub trait Extractor: Send + Sync {
    /// `None` when the document holds no readable text.
    fn extract(&self, html: &str, base_url: Option<&Url>) -> Option<ExtractedContent>;
}

/// Lightweight "readability-like" extractor:
/// - metadata from OpenGraph / `<meta>` tags, falling back to `<title>` and `<h1>`
/// - content from `<article>`, then `<main>` / `[role=main]`, then `<body>`
/// - content reduced to an allow-list of structural and inline tags, with
///   links and images resolved against the page URL.
#[derive(Debug, Default)]
pub struct ReadabilityLikeExtractor;

impl Extractor for ReadabilityLikeExtractor {
    fn extract(&self, html: &str, base_url: Option<&Url>) -> Option<ExtractedContent> {
        let doc = Html::parse_document(html);

        let title = meta_content(&doc, r#"meta[property="og:title"]"#)
            .or_else(|| first_text(&doc, "title"))
            .or_else(|| first_text(&doc, "h1"));
        let byline = meta_content(&doc, r#"meta[name="author"]"#)
            .or_else(|| first_text(&doc, r#"[rel="author"]"#))
            .or_else(|| first_text(&doc, ".byline"))
            .or_else(|| first_text(&doc, r#"[itemprop="author"]"#));
        let site_name = meta_content(&doc, r#"meta[property="og:site_name"]"#);

        let root = ["article", "main", r#"[role="main"]"#, "body"]
            .iter()
            .find_map(|css| select_first(&doc, css))
            .unwrap_or_else(|| doc.root_element());

        let sanitizer = Sanitizer { base_url };
        let content = sanitizer.visit_children(root);

        let mut has_words = false;
        for_each_text(&content, &mut |text| {
            has_words |= !text.trim().is_empty();
        });
        if !has_words {
            return None;
        }

        let excerpt = meta_content(&doc, r#"meta[name="description"]"#)
            .or_else(|| meta_content(&doc, r#"meta[property="og:description"]"#))
            .or_else(|| first_paragraph(root).map(|text| truncate_chars(&text, EXCERPT_MAX_CHARS)));

        Some(ExtractedContent {
            title,
            byline,
            site_name,
            excerpt,
            content,
        })
    }
}

struct Sanitizer<'u> {
    base_url: Option<&'u Url>,
}

impl Sanitizer<'_> {
    fn visit_node(&self, node: NodeRef<'_, Node>, out: &mut Vec<MarkupNode>) {
        match node.value() {
            Node::Text(text) => {
                let text: &str = text;
                out.push(MarkupNode::text(text));
            }
            Node::Element(_) => {
                if let Some(element) = ElementRef::wrap(node) {
                    self.visit_element(element, out);
                }
            }
            _ => {}
        }
    }

    fn visit_children(&self, element: ElementRef<'_>) -> Vec<MarkupNode> {
        let mut children = Vec::new();
        for child in element.children() {
            self.visit_node(child, &mut children);
        }
        children
    }

    fn visit_element(&self, element: ElementRef<'_>, out: &mut Vec<MarkupNode>) {
        let tag = element.value().name().to_ascii_lowercase();
        if DROPPED_ELEMENTS.contains(&tag.as_str()) || is_hidden(element) {
            return;
        }

        let children = self.visit_children(element);
        // Unknown wrappers (`<font>`, custom elements) contribute only their children.
        if !KEPT_ELEMENTS.contains(&tag.as_str()) {
            out.extend(children);
            return;
        }

        let attrs = self.kept_attributes(&tag, element);
        if tag == "img" && attrs.is_empty() {
            return;
        }
        out.push(MarkupNode::element(&tag, attrs, children));
    }

    fn kept_attributes(&self, tag: &str, element: ElementRef<'_>) -> Vec<(String, String)> {
        let value = element.value();
        let mut attrs = Vec::new();
        match tag {
            "a" => {
                if let Some(href) = value.attr("href").and_then(|h| resolve_url(h, self.base_url)) {
                    attrs.push(("href".to_string(), href.to_string()));
                }
                if let Some(title) = value.attr("title") {
                    attrs.push(("title".to_string(), title.to_string()));
                }
            }
            "img" => {
                let Some(src) = value.attr("src").and_then(|s| resolve_url(s, self.base_url)) else {
                    return attrs;
                };
                attrs.push(("src".to_string(), src.to_string()));
                if let Some(alt) = value.attr("alt") {
                    attrs.push(("alt".to_string(), alt.to_string()));
                }
            }
            "td" | "th" => {
                for key in ["colspan", "rowspan"] {
                    if let Some(span) = value.attr(key) {
                        attrs.push((key.to_string(), span.to_string()));
                    }
                }
            }
            _ => {}
        }
        attrs
    }
}

fn is_hidden(element: ElementRef<'_>) -> bool {
    let value = element.value();
    value.attr("hidden").is_some()
        || value.attr("aria-hidden") == Some("true")
        || value
            .attr("style")
            .map(|style| style.replace(' ', "").contains("display:none"))
            .unwrap_or(false)
}

fn resolve_url(reference: &str, base: Option<&Url>) -> Option<Url> {
    let trimmed = reference.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let url = match Url::parse(trimmed) {
        Ok(url) => url,
        Err(_) => base?.join(trimmed).ok()?,
    };
    matches!(url.scheme(), "http" | "https" | "mailto").then_some(url)
}

fn select_first<'a>(doc: &'a Html, css: &str) -> Option<ElementRef<'a>> {
    let selector = Selector::parse(css).ok()?;
    doc.select(&selector).next()
}

fn first_text(doc: &Html, css: &str) -> Option<String> {
    select_first(doc, css)
        .map(|el| normalize(&el.text().collect::<String>()))
        .filter(|t| !t.is_empty())
}

fn meta_content(doc: &Html, css: &str) -> Option<String> {
    select_first(doc, css)
        .and_then(|el| el.value().attr("content"))
        .map(normalize)
        .filter(|t| !t.is_empty())
}

fn first_paragraph(root: ElementRef<'_>) -> Option<String> {
    let selector = Selector::parse("p").ok()?;
    root.select(&selector)
        .map(|p| normalize(&p.text().collect::<String>()))
        .find(|text| !text.is_empty())
}

fn normalize(text: &str) -> String {
    glance_core::collapse_whitespace(text)
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}\u{2026}", cut.trim_end())
}
