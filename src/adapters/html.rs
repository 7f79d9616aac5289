// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 assetflow contributors

//! HTML reformatting
//!
//! A small, forgiving formatter for rendered pages. The input is parsed into
//! a tree; block elements go on their own lines with fixed indentation,
//! inline elements and text flow on the current line, and elements listed
//! as unformatted (plus `script`, `style`, `textarea`) keep their inner
//! markup byte for byte.

use crate::pipeline::HtmlFormatConfig;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style", "textarea", "pre"];

#[derive(Debug)]
enum Node {
    Text(String),
    /// Comments, doctypes and processing instructions
    Markup(String),
    Element(Element),
}

#[derive(Debug)]
struct Element {
    name: String,
    start: String,
    children: Vec<Node>,
    /// Verbatim inner content for raw and unformatted elements
    raw: Option<String>,
    void: bool,
}

impl Element {
    fn new(name: String, start: String) -> Self {
        Self {
            name,
            start,
            children: Vec::new(),
            raw: None,
            void: false,
        }
    }
}

/// Reformats HTML with fixed indentation
#[derive(Debug, Clone, Default)]
pub struct HtmlFormatter {
    config: HtmlFormatConfig,
}

impl HtmlFormatter {
    pub fn new(config: HtmlFormatConfig) -> Self {
        Self { config }
    }

    /// Reformat a document. Output always ends with a single newline.
    pub fn format(&self, html: &str) -> String {
        let nodes = self.parse(html);
        let mut lines = Vec::new();
        self.render_block(&nodes, 0, &mut lines);

        let mut out = lines.join("\n");
        out.push('\n');
        out
    }

    fn is_inline(&self, name: &str) -> bool {
        self.config.inline.iter().any(|t| t == name)
    }

    fn is_unformatted(&self, name: &str) -> bool {
        self.config.unformatted.iter().any(|t| t == name)
    }

    fn keeps_raw(&self, name: &str) -> bool {
        RAW_TEXT_ELEMENTS.contains(&name) || self.is_unformatted(name)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Parsing
    // ─────────────────────────────────────────────────────────────────────

    fn parse(&self, html: &str) -> Vec<Node> {
        // ASCII lowercasing keeps byte offsets aligned with `html`.
        let lower = html.to_ascii_lowercase();
        let mut stack: Vec<Element> = vec![Element::new(String::new(), String::new())];
        let mut pos = 0;

        while pos < html.len() {
            let rest = &html[pos..];

            if rest.starts_with("<!--") {
                let end = rest.find("-->").map(|i| i + 3).unwrap_or(rest.len());
                push_node(&mut stack, Node::Markup(rest[..end].to_string()));
                pos += end;
            } else if rest.starts_with("<!") || rest.starts_with("<?") {
                let end = rest.find('>').map(|i| i + 1).unwrap_or(rest.len());
                push_node(&mut stack, Node::Markup(rest[..end].to_string()));
                pos += end;
            } else if rest.starts_with("</") {
                let end = rest.find('>').map(|i| i + 1).unwrap_or(rest.len());
                let name = tag_name(&lower[pos + 2..pos + end]);
                close_element(&mut stack, &name);
                pos += end;
            } else if starts_tag(rest) {
                let end = tag_end(rest);
                let start = normalize_tag(&rest[..end]);
                let name = tag_name(&lower[pos + 1..pos + end]);
                pos += end;

                let mut element = Element::new(name.clone(), start);
                if VOID_ELEMENTS.contains(&name.as_str()) || element.start.ends_with("/>") {
                    element.void = true;
                    push_node(&mut stack, Node::Element(element));
                } else if self.keeps_raw(&name) {
                    let nested = !RAW_TEXT_ELEMENTS.contains(&name.as_str());
                    let (content_len, close_len) = find_close(&lower[pos..], &name, nested);
                    element.raw = Some(html[pos..pos + content_len].to_string());
                    pos += content_len + close_len;
                    push_node(&mut stack, Node::Element(element));
                } else {
                    stack.push(element);
                }
            } else {
                // Text runs to the next tag; a stray '<' is treated as text.
                let skip = usize::from(rest.starts_with('<'));
                let end = rest[skip..].find('<').map(|i| i + skip).unwrap_or(rest.len());
                push_node(&mut stack, Node::Text(rest[..end].to_string()));
                pos += end;
            }
        }

        while stack.len() > 1 {
            pop_into_parent(&mut stack);
        }
        stack.pop().map(|root| root.children).unwrap_or_default()
    }

    // ─────────────────────────────────────────────────────────────────────
    // Rendering
    // ─────────────────────────────────────────────────────────────────────

    fn indent(&self, depth: usize) -> String {
        " ".repeat(depth * self.config.indent_size)
    }

    /// Whether a node flows with surrounding text
    fn flows_inline(&self, node: &Node) -> bool {
        match node {
            Node::Text(_) => true,
            Node::Markup(_) => false,
            Node::Element(el) => self.is_inline(&el.name),
        }
    }

    fn render_block(&self, nodes: &[Node], depth: usize, lines: &mut Vec<String>) {
        let mut run = String::new();

        for node in nodes {
            if self.flows_inline(node) {
                self.render_inline(node, &mut run);
                continue;
            }
            self.flush_run(&mut run, depth, lines);

            match node {
                Node::Markup(markup) => lines.push(format!("{}{}", self.indent(depth), markup.trim())),
                Node::Element(el) => self.render_element(el, depth, lines),
                Node::Text(_) => {}
            }
        }

        self.flush_run(&mut run, depth, lines);
    }

    fn flush_run(&self, run: &mut String, depth: usize, lines: &mut Vec<String>) {
        let text = run.trim();
        if !text.is_empty() {
            lines.push(format!("{}{}", self.indent(depth), text));
        }
        run.clear();
    }

    fn render_element(&self, el: &Element, depth: usize, lines: &mut Vec<String>) {
        if self.config.extra_liners.iter().any(|t| t == &el.name) && !lines.is_empty() {
            lines.push(String::new());
        }

        let indent = self.indent(depth);
        if el.void {
            lines.push(format!("{}{}", indent, el.start));
            return;
        }
        if let Some(raw) = &el.raw {
            lines.push(format!("{}{}{}</{}>", indent, el.start, raw, el.name));
            return;
        }

        if el.children.iter().all(|child| self.flows_inline(child)) {
            let mut inner = String::new();
            for child in &el.children {
                self.render_inline(child, &mut inner);
            }
            lines.push(format!("{}{}{}</{}>", indent, el.start, inner.trim(), el.name));
            return;
        }

        lines.push(format!("{}{}", indent, el.start));
        self.render_block(&el.children, depth + 1, lines);
        lines.push(format!("{}</{}>", indent, el.name));
    }

    fn render_inline(&self, node: &Node, out: &mut String) {
        match node {
            Node::Text(text) => push_collapsed(out, text),
            Node::Markup(markup) => out.push_str(markup),
            Node::Element(el) => {
                out.push_str(&el.start);
                if el.void {
                    return;
                }
                match &el.raw {
                    Some(raw) => out.push_str(raw),
                    None => {
                        for child in &el.children {
                            self.render_inline(child, out);
                        }
                    }
                }
                out.push_str("</");
                out.push_str(&el.name);
                out.push('>');
            }
        }
    }
}

fn push_node(stack: &mut [Element], node: Node) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}

fn pop_into_parent(stack: &mut Vec<Element>) {
    if let Some(element) = stack.pop() {
        push_node(stack, Node::Element(element));
    }
}

/// Close the innermost open element with this name; stray end tags are dropped
fn close_element(stack: &mut Vec<Element>, name: &str) {
    let Some(index) = stack
        .iter()
        .rposition(|el| el.name == name)
        .filter(|&i| i > 0)
    else {
        return;
    };
    while stack.len() > index {
        pop_into_parent(stack);
    }
}

fn starts_tag(rest: &str) -> bool {
    let mut chars = rest.chars();
    chars.next() == Some('<') && chars.next().is_some_and(|c| c.is_ascii_alphabetic())
}

/// Byte length of the tag at the start of `rest`, honouring quoted values
fn tag_end(rest: &str) -> usize {
    let mut quote = None;
    for (i, c) in rest.char_indices() {
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(q), _) if c == q => quote = None,
            (None, '>') => return i + 1,
            _ => {}
        }
    }
    rest.len()
}

fn tag_name(tag: &str) -> String {
    tag.trim_start_matches(['<', '/'])
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == ':')
        .collect()
}

/// Collapse whitespace runs outside quoted attribute values
fn normalize_tag(tag: &str) -> String {
    let mut out = String::with_capacity(tag.len());
    let mut quote = None;
    let mut pending_space = false;

    for c in tag.chars() {
        if quote.is_none() && c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if pending_space && c != '>' {
            out.push(' ');
        }
        pending_space = false;
        match (quote, c) {
            (None, '"' | '\'') => quote = Some(c),
            (Some(q), _) if c == q => quote = None,
            _ => {}
        }
        out.push(c);
    }
    out
}

/// Find the end tag for a raw element.
///
/// Returns the content length and the length of the end tag. Unformatted
/// elements may nest (`<span><span></span></span>`); raw text elements end
/// at the first matching end tag.
fn find_close(lower: &str, name: &str, nested: bool) -> (usize, usize) {
    let open = format!("<{}", name);
    let close = format!("</{}", name);
    let mut depth = 0usize;
    let mut pos = 0;

    while pos < lower.len() {
        let rest = &lower[pos..];
        if rest.starts_with(&close) && name_ends(rest, close.len()) {
            if depth == 0 {
                let end_len = rest.find('>').map(|i| i + 1).unwrap_or(rest.len());
                return (pos, end_len);
            }
            depth -= 1;
            pos += close.len();
        } else if nested && rest.starts_with(&open) && name_ends(rest, open.len()) {
            depth += 1;
            pos += open.len();
        } else {
            pos += rest.chars().next().map(char::len_utf8).unwrap_or(1);
        }
    }

    (lower.len(), 0)
}

fn name_ends(rest: &str, at: usize) -> bool {
    rest[at..]
        .chars()
        .next()
        .map_or(true, |c| c.is_whitespace() || c == '>' || c == '/')
}

fn push_collapsed(out: &mut String, text: &str) {
    let mut last_space = out.ends_with(' ');
    for c in text.chars() {
        if c.is_whitespace() {
            if !last_space {
                out.push(' ');
                last_space = true;
            }
        } else {
            out.push(c);
            last_space = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn format(html: &str) -> String {
        HtmlFormatter::default().format(html)
    }

    #[test]
    fn test_indents_block_structure() {
        let html = "<!DOCTYPE html>\n<html><head><title>Home</title>\n\
            <link rel=\"stylesheet\" href=\"css/main.min.css\"></head>\n\
            <body><div class=\"card card--big\"><h1>Hi <em>there</em></h1><pre>\n  keep   this\n</pre>\
            <p>one\ntwo</p></div></body></html>";

        let expected = "\
<!DOCTYPE html>
<html>
  <head>
    <title>Home</title>
    <link rel=\"stylesheet\" href=\"css/main.min.css\">
  </head>
  <body>
    <div class=\"card card--big\">
      <h1>Hi <em>there</em></h1>
      <pre>
  keep   this
</pre>
      <p>one two</p>
    </div>
  </body>
</html>
";
        assert_eq!(format(html), expected);
    }

    #[test]
    fn test_unformatted_content_is_verbatim() {
        let html = "<p>a <span>  two   spaces <b>x</b> </span> b</p>";
        assert_eq!(format(html), "<p>a <span>  two   spaces <b>x</b> </span> b</p>\n");
    }

    #[test]
    fn test_nested_unformatted_tags() {
        let html = "<div><span><span>in</span> out</span></div>";
        assert_eq!(format(html), "<div><span><span>in</span> out</span></div>\n");
    }

    #[test]
    fn test_script_is_kept_raw() {
        let html = "<body><script>if (a < b) { go(); }</script></body>";
        assert_eq!(
            format(html),
            "<body>\n  <script>if (a < b) { go(); }</script>\n</body>\n"
        );
    }

    #[test]
    fn test_mixed_text_and_blocks() {
        let html = "<div>Intro<ul><li><a href=\"#\">One</a></li></ul></div>";
        let expected = "<div>\n  Intro\n  <ul>\n    <li><a href=\"#\">One</a></li>\n  </ul>\n</div>\n";
        assert_eq!(format(html), expected);
    }

    #[test]
    fn test_stray_and_missing_end_tags() {
        assert_eq!(format("<div><p>x</div></section>"), "<div>\n  <p>x</p>\n</div>\n");
    }

    #[test]
    fn test_attribute_whitespace_is_normalized() {
        let html = "<img   src=\"a b.png\"\n   alt='x'  >";
        assert_eq!(format(html), "<img src=\"a b.png\" alt='x'>\n");
    }

    #[test]
    fn test_extra_liners() {
        let formatter = HtmlFormatter::new(HtmlFormatConfig {
            extra_liners: vec!["section".into()],
            ..HtmlFormatConfig::default()
        });
        assert_eq!(
            formatter.format("<main><h1>T</h1><section>s</section></main>"),
            "<main>\n  <h1>T</h1>\n\n  <section>s</section>\n</main>\n"
        );
    }

    #[test]
    fn test_formatting_is_stable() {
        let once = format("<ul><li>a</li><li>b <i>c</i></li></ul>");
        assert_eq!(format(&once), once);
    }
}
