//! Rendered preview document
//!
//! The render service returns an HTML fragment. The preview pane does not
//! embed a browser, so the fragment is parsed into an element tree and
//! reduced to blocks the widget tree can draw: headings, paragraphs, lists
//! and quotes (which nest), table rows, code blocks and display math. Math
//! regions are located by their delimiters (`$$..$$`, `\[..\]`, `$..$`,
//! `\(..\)`) and typeset separately.

use super::highlight::{CodeHighlighter, HighlightedLine};
use super::markup::{self, Element, Node};
use super::math::MathTypesetter;
use crate::error::MathError;
use regex::Regex;
use std::sync::OnceLock;

/// Elements that start a block of their own
const BLOCK_ELEMENTS: &[&str] = &[
    "h1", "h2", "h3", "h4", "h5", "h6", "p", "pre", "ul", "ol", "li", "blockquote", "table",
    "thead", "tbody", "tfoot", "tr", "hr", "div", "section", "article", "aside", "header",
    "footer", "main", "nav", "figure", "details", "dl", "dt", "dd",
];

/// Index of a math region within its document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MathId(pub usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MathRegion {
    pub latex: String,
    pub display: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    Text(String),
    Strong(String),
    Emphasis(String),
    Code(String),
    Math(MathId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewBlock {
    Heading { level: u8, content: Vec<Inline> },
    Paragraph(Vec<Inline>),
    /// Each item holds its own blocks, so lists nest
    List {
        ordered: bool,
        start: u32,
        items: Vec<Vec<PreviewBlock>>,
    },
    Quote(Vec<PreviewBlock>),
    TableRow(Vec<Vec<Inline>>),
    Code {
        language: Option<String>,
        source: String,
        highlighted: Option<Vec<HighlightedLine>>,
    },
    DisplayMath(MathId),
    Rule,
}

/// Counts from one typeset pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TypesetReport {
    pub rendered: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreviewDocument {
    blocks: Vec<PreviewBlock>,
    math: Vec<MathRegion>,
    typeset: Vec<Option<Result<String, MathError>>>,
}

impl PreviewDocument {
    /// Parse an HTML fragment from the render service
    pub fn from_html(html: &str) -> Self {
        let mut doc = Self::default();
        doc.blocks = doc.collect_blocks(&markup::parse(html));
        doc
    }

    pub fn blocks(&self) -> &[PreviewBlock] {
        &self.blocks
    }

    pub fn math(&self, id: MathId) -> Option<&MathRegion> {
        self.math.get(id.0)
    }

    /// Typeset output for a region, `None` until a pass has run
    pub fn typeset_for(&self, id: MathId) -> Option<&Result<String, MathError>> {
        self.typeset.get(id.0).and_then(Option::as_ref)
    }

    pub fn is_typeset(&self) -> bool {
        self.math.is_empty() || self.typeset.iter().all(Option::is_some)
    }

    /// Drop all typeset output
    pub fn clear_typeset(&mut self) {
        self.typeset = vec![None; self.math.len()];
    }

    /// Clear and retypeset every math region. A region that fails keeps
    /// its error and does not affect the others.
    pub fn typeset(&mut self, engine: &dyn MathTypesetter) -> TypesetReport {
        self.clear_typeset();
        let mut report = TypesetReport::default();
        for (slot, region) in self.typeset.iter_mut().zip(&self.math) {
            let outcome = engine.typeset(&region.latex);
            match &outcome {
                Ok(_) => report.rendered += 1,
                Err(e) => {
                    log::warn!("could not typeset '{}': {}", region.latex, e);
                    report.failed += 1;
                }
            }
            *slot = Some(outcome);
        }
        report
    }

    /// Attach syntax highlighting to every code block, including nested ones
    pub fn highlight(&mut self, highlighter: &CodeHighlighter) {
        highlight_blocks(&mut self.blocks, highlighter);
    }

    /// Turn sibling nodes into blocks. Loose inline content between block
    /// elements becomes a paragraph.
    fn collect_blocks(&mut self, nodes: &[Node]) -> Vec<PreviewBlock> {
        let mut blocks = Vec::new();
        let mut pending: Vec<&Node> = Vec::new();
        for node in nodes {
            match node {
                Node::Element(el) if BLOCK_ELEMENTS.contains(&el.name.as_str()) => {
                    self.flush_paragraph(&mut pending, &mut blocks);
                    self.push_block(el, &mut blocks);
                }
                _ => pending.push(node),
            }
        }
        self.flush_paragraph(&mut pending, &mut blocks);
        blocks
    }

    fn flush_paragraph(&mut self, pending: &mut Vec<&Node>, blocks: &mut Vec<PreviewBlock>) {
        if pending.is_empty() {
            return;
        }
        let content = self.inlines(pending.drain(..));
        blocks.extend(self.paragraph(content));
    }

    fn paragraph(&self, content: Vec<Inline>) -> Option<PreviewBlock> {
        match content.as_slice() {
            [] => None,
            [Inline::Math(id)] if self.math[id.0].display => Some(PreviewBlock::DisplayMath(*id)),
            _ => Some(PreviewBlock::Paragraph(content)),
        }
    }

    fn push_block(&mut self, el: &Element, blocks: &mut Vec<PreviewBlock>) {
        let name = el.name.as_str();
        match name {
            "hr" => blocks.push(PreviewBlock::Rule),
            "pre" => {
                let code = el.elements().find(|c| c.name == "code");
                let language = code
                    .and_then(|c| c.attr("class"))
                    .and_then(language_of)
                    .or_else(|| el.attr("class").and_then(language_of));
                let source = el.text();
                blocks.push(PreviewBlock::Code {
                    language,
                    source: source.trim_end_matches('\n').to_string(),
                    highlighted: None,
                });
            }
            "ul" | "ol" => {
                let mut items = Vec::new();
                for item in el.elements().filter(|c| c.name == "li") {
                    items.push(self.collect_blocks(&item.children));
                }
                if !items.is_empty() {
                    blocks.push(PreviewBlock::List {
                        ordered: name == "ol",
                        start: el.attr("start").and_then(|s| s.trim().parse().ok()).unwrap_or(1),
                        items,
                    });
                }
            }
            "blockquote" => {
                let inner = self.collect_blocks(&el.children);
                if !inner.is_empty() {
                    blocks.push(PreviewBlock::Quote(inner));
                }
            }
            "tr" => {
                let mut cells = Vec::new();
                for cell in el.elements().filter(|c| c.name == "td" || c.name == "th") {
                    cells.push(self.inlines(&cell.children));
                }
                blocks.push(PreviewBlock::TableRow(cells));
            }
            "p" => {
                let content = self.inlines(&el.children);
                blocks.extend(self.paragraph(content));
            }
            h if h.len() == 2 && h.starts_with('h') => {
                let content = self.inlines(&el.children);
                if !content.is_empty() {
                    blocks.push(PreviewBlock::Heading {
                        level: h[1..].parse().unwrap_or(1),
                        content,
                    });
                }
            }
            // tables, stray list items and layout containers
            _ => blocks.extend(self.collect_blocks(&el.children)),
        }
    }

    fn inlines<'n>(&mut self, nodes: impl IntoIterator<Item = &'n Node>) -> Vec<Inline> {
        let mut out = Vec::new();
        let mut plain = String::new();
        for node in nodes {
            self.collect_inline(node, &mut plain, &mut out);
        }
        self.push_text(&plain, &mut out);
        trim_edges(&mut out);
        out
    }

    /// Plain text accumulates in `plain` so math delimiters are matched
    /// across adjacent text nodes; styled runs flush it first.
    fn collect_inline(&mut self, node: &Node, plain: &mut String, out: &mut Vec<Inline>) {
        let el = match node {
            Node::Text(t) => {
                plain.push_str(t);
                return;
            }
            Node::Element(el) => el,
        };
        match el.name.as_str() {
            "br" => plain.push(' '),
            "img" => plain.push_str(el.attr("alt").unwrap_or_default()),
            "script" | "style" => {}
            tag @ ("code" | "strong" | "b" | "em" | "i") => {
                self.push_text(&std::mem::take(plain), out);
                let text = collapse_whitespace(&el.text());
                if !text.is_empty() {
                    out.push(match tag {
                        "code" => Inline::Code(text),
                        "strong" | "b" => Inline::Strong(text),
                        _ => Inline::Emphasis(text),
                    });
                }
            }
            _ => {
                for child in &el.children {
                    self.collect_inline(child, plain, out);
                }
            }
        }
    }

    /// Split plain text into text and math runs
    fn push_text(&mut self, text: &str, out: &mut Vec<Inline>) {
        let text = collapse_whitespace(text);
        let mut cursor = 0;
        for caps in math_re().captures_iter(&text) {
            let Some(whole) = caps.get(0) else { continue };
            let (latex, display) = match (caps.get(1), caps.get(2), caps.get(3), caps.get(4)) {
                (Some(m), ..) => (m.as_str(), true),
                (_, Some(m), ..) => (m.as_str(), true),
                (_, _, Some(m), _) => (m.as_str(), false),
                (_, _, _, Some(m)) => (m.as_str(), false),
                _ => continue,
            };
            push_plain(&text[cursor..whole.start()], out);
            let id = MathId(self.math.len());
            self.math.push(MathRegion {
                latex: latex.trim().to_string(),
                display,
            });
            self.typeset.push(None);
            out.push(Inline::Math(id));
            cursor = whole.end();
        }
        push_plain(&text[cursor..], out);
    }
}

fn highlight_blocks(blocks: &mut [PreviewBlock], highlighter: &CodeHighlighter) {
    for block in blocks {
        match block {
            PreviewBlock::Code {
                language,
                source,
                highlighted,
            } => *highlighted = Some(highlighter.highlight(language.as_deref(), source)),
            PreviewBlock::List { items, .. } => {
                for item in items {
                    highlight_blocks(item, highlighter);
                }
            }
            PreviewBlock::Quote(inner) => highlight_blocks(inner, highlighter),
            _ => {}
        }
    }
}

fn push_plain(text: &str, out: &mut Vec<Inline>) {
    if text.is_empty() {
        return;
    }
    if let Some(Inline::Text(prev)) = out.last_mut() {
        prev.push_str(text);
    } else {
        out.push(Inline::Text(text.to_string()));
    }
}

/// Drop leading and trailing whitespace of the whole run
fn trim_edges(out: &mut Vec<Inline>) {
    if let Some(Inline::Text(first)) = out.first_mut() {
        *first = first.trim_start().to_string();
    }
    if let Some(Inline::Text(last)) = out.last_mut() {
        *last = last.trim_end().to_string();
    }
    out.retain(|i| !matches!(i, Inline::Text(t) if t.is_empty()));
}

fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}

/// `language-rust` or `lang-rust` from a class list
fn language_of(class: &str) -> Option<String> {
    class
        .split_whitespace()
        .find_map(|c| c.strip_prefix("language-").or_else(|| c.strip_prefix("lang-")))
        .filter(|lang| !lang.is_empty())
        .map(str::to_string)
}

fn math_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)\$\$(.+?)\$\$|\\\[(.+?)\\\]|\\\((.+?)\\\)|\$([^$\n]+?)\$")
            .expect("math pattern")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preview::math::UnicodeTypesetter;

    #[test]
    fn test_blocks_in_order() {
        let doc = PreviewDocument::from_html(
            "<h1>Title</h1>\n<p>Some <strong>bold</strong> text</p>\n<hr />\n<ul>\n<li>one</li>\n<li>two</li>\n</ul>",
        );
        assert_eq!(
            doc.blocks(),
            &[
                PreviewBlock::Heading {
                    level: 1,
                    content: vec![Inline::Text("Title".into())]
                },
                PreviewBlock::Paragraph(vec![
                    Inline::Text("Some ".into()),
                    Inline::Strong("bold".into()),
                    Inline::Text(" text".into()),
                ]),
                PreviewBlock::Rule,
                PreviewBlock::List {
                    ordered: false,
                    start: 1,
                    items: vec![
                        vec![PreviewBlock::Paragraph(vec![Inline::Text("one".into())])],
                        vec![PreviewBlock::Paragraph(vec![Inline::Text("two".into())])],
                    ],
                },
            ]
        );
    }

    #[test]
    fn test_nested_list_keeps_structure() {
        let doc = PreviewDocument::from_html(
            "<ol start=\"3\">\n<li>outer\n<ul>\n<li>inner $x$</li>\n</ul>\n</li>\n<li>next</li>\n</ol>",
        );
        assert_eq!(
            doc.blocks(),
            &[PreviewBlock::List {
                ordered: true,
                start: 3,
                items: vec![
                    vec![
                        PreviewBlock::Paragraph(vec![Inline::Text("outer".into())]),
                        PreviewBlock::List {
                            ordered: false,
                            start: 1,
                            items: vec![vec![PreviewBlock::Paragraph(vec![
                                Inline::Text("inner ".into()),
                                Inline::Math(MathId(0)),
                            ])]],
                        },
                    ],
                    vec![PreviewBlock::Paragraph(vec![Inline::Text("next".into())])],
                ],
            }]
        );
    }

    #[test]
    fn test_blockquote_keeps_paragraphs() {
        let doc = PreviewDocument::from_html(
            "<blockquote>\n<p>first</p>\n<p>second</p>\n</blockquote>",
        );
        assert_eq!(
            doc.blocks(),
            &[PreviewBlock::Quote(vec![
                PreviewBlock::Paragraph(vec![Inline::Text("first".into())]),
                PreviewBlock::Paragraph(vec![Inline::Text("second".into())]),
            ])]
        );
    }

    #[test]
    fn test_line_breaks_and_unclosed_rule() {
        let doc = PreviewDocument::from_html("<p>a<br>b</p><hr><p>c</p>");
        assert_eq!(
            doc.blocks(),
            &[
                PreviewBlock::Paragraph(vec![Inline::Text("a b".into())]),
                PreviewBlock::Rule,
                PreviewBlock::Paragraph(vec![Inline::Text("c".into())]),
            ]
        );
    }

    #[test]
    fn test_code_block_language_and_entities() {
        let doc = PreviewDocument::from_html(
            "<pre><code class=\"language-rust\">if a &lt; b &amp;&amp; c {\n}\n</code></pre>",
        );
        match &doc.blocks()[0] {
            PreviewBlock::Code {
                language, source, ..
            } => {
                assert_eq!(language.as_deref(), Some("rust"));
                assert_eq!(source, "if a < b && c {\n}");
            }
            other => panic!("unexpected block {other:?}"),
        }
    }

    #[test]
    fn test_math_regions_located() {
        let doc = PreviewDocument::from_html(
            "<p>Inline $x^2$ and \\(y\\)</p><p>$$\\frac{a}{b}$$</p><p>\\[z\\]</p>",
        );
        let regions = &doc.math;
        assert_eq!(regions.len(), 4);
        assert_eq!(regions[0].latex, "x^2");
        assert!(!regions[0].display);
        assert!(!regions[1].display);
        assert!(regions[2].display);
        assert_eq!(doc.blocks()[1], PreviewBlock::DisplayMath(MathId(2)));
        assert_eq!(doc.blocks()[2], PreviewBlock::DisplayMath(MathId(3)));
    }

    #[test]
    fn test_code_spans_hide_math() {
        let doc = PreviewDocument::from_html("<p>Use <code>$x$</code> for math</p>");
        assert!(doc.math.is_empty());
    }

    #[test]
    fn test_plain_text_fragment() {
        let doc = PreviewDocument::from_html("just text");
        assert_eq!(
            doc.blocks(),
            &[PreviewBlock::Paragraph(vec![Inline::Text("just text".into())])]
        );
    }

    #[test]
    fn test_table_rows() {
        let doc = PreviewDocument::from_html(
            "<table><tr><th>A</th><th>B</th></tr><tr><td>1</td><td>$x$</td></tr></table>",
        );
        assert_eq!(doc.blocks().len(), 2);
        match &doc.blocks()[1] {
            PreviewBlock::TableRow(cells) => {
                assert_eq!(cells[0], vec![Inline::Text("1".into())]);
                assert_eq!(cells[1], vec![Inline::Math(MathId(0))]);
            }
            other => panic!("unexpected block {other:?}"),
        }
    }

    #[test]
    fn test_typeset_twice_is_idempotent() {
        let mut doc = PreviewDocument::from_html("<p>$\\alpha$ and $\\frac{1}{2}$</p>");
        let engine = UnicodeTypesetter::new();
        let first = doc.typeset(&engine);
        let snapshot = doc.clone();
        let second = doc.typeset(&engine);
        assert_eq!(first, second);
        assert_eq!(doc, snapshot);
        assert_eq!(doc.typeset_for(MathId(0)), Some(&Ok("α".to_string())));
    }

    #[test]
    fn test_failed_region_does_not_affect_others() {
        let mut doc = PreviewDocument::from_html("<p>$\\frac{a}{b$ then $\\beta$</p>");
        let report = doc.typeset(&UnicodeTypesetter::new());
        assert_eq!(report, TypesetReport { rendered: 1, failed: 1 });
        assert!(matches!(doc.typeset_for(MathId(0)), Some(Err(_))));
        assert_eq!(doc.typeset_for(MathId(1)), Some(&Ok("β".to_string())));
    }

    #[test]
    fn test_clear_typeset() {
        let mut doc = PreviewDocument::from_html("<p>$x$</p>");
        doc.typeset(&UnicodeTypesetter::new());
        assert!(doc.is_typeset());
        doc.clear_typeset();
        assert!(!doc.is_typeset());
        assert_eq!(doc.typeset_for(MathId(0)), None);
    }

    #[test]
    fn test_highlight_code_blocks() {
        let mut doc = PreviewDocument::from_html(
            "<pre><code class=\"language-python\">x = 1</code></pre><blockquote><pre><code>y</code></pre></blockquote>",
        );
        doc.highlight(&CodeHighlighter::new(true));
        match &doc.blocks()[0] {
            PreviewBlock::Code { highlighted, .. } => assert!(highlighted.is_some()),
            other => panic!("unexpected block {other:?}"),
        }
        match &doc.blocks()[1] {
            PreviewBlock::Quote(inner) => {
                assert!(matches!(&inner[0], PreviewBlock::Code { highlighted: Some(_), .. }))
            }
            other => panic!("unexpected block {other:?}"),
        }
    }
}
