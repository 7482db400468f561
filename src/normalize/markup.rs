//! HTML fragment → lightweight markup conversion.
//!
//! The fragment is parsed with `scraper` (html5ever underneath, so entity
//! decoding and error recovery come for free) and then walked once, appending
//! to a block buffer:
//!
//! | HTML | Markup |
//! |------|--------|
//! | `<h1>`…`<h6>` | `#`…`######` heading block |
//! | `<p>`, `<div>` and other block containers | paragraph separated by a blank line |
//! | `<br>` | line break inside the paragraph |
//! | `<a href="u">t</a>` | `[t](u)`; just `t` without an `href` |
//! | `<strong>`, `<b>` | `**t**` |
//! | `<em>`, `<i>` | `*t*` |
//! | `<ul>`/`<ol>` + `<li>` | `- t` / `1. t` lines |
//! | `<blockquote>` | `> ` prefixed lines |
//! | `<script>`, `<style>`, `<noscript>`, `<template>` | dropped with their content |
//! | anything else | unwrapped, content kept |
//!
//! Block elements nested inside an inline element (a heading inside a link,
//! a `<div>` inside `<em>`) are rendered as inline text separated by spaces,
//! so the inline wrapper stays intact and text keeps its order.
//!
//! Whitespace collapses within a paragraph. Nesting deeper than
//! [`MAX_DEPTH`] abandons the walk and falls back to plain text extraction
//! (see [`Converted::degraded`]).

use crate::utils::collapse_whitespace;
use scraper::{ElementRef, Html, Node};

/// Maximum element nesting the structured walk will follow.
pub const MAX_DEPTH: usize = 256;

/// Result of a conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Converted {
    pub text: String,
    /// `true` when the structured walk was abandoned and `text` is a
    /// best-effort plain-text extraction.
    pub degraded: bool,
}

/// Convert an HTML fragment to lightweight markup.
///
/// Never fails; see [`convert_with_status`] to learn whether the output was
/// produced by the plain-text fallback.
pub fn convert(html: &str) -> String {
    convert_with_status(html).text
}

/// Convert an HTML fragment, reporting whether the fallback was used.
pub fn convert_with_status(html: &str) -> Converted {
    let fragment = Html::parse_fragment(html);
    let mut writer = MarkupWriter::default();
    match writer.walk_children(fragment.root_element(), 0) {
        Ok(()) => Converted {
            text: writer.finish(),
            degraded: false,
        },
        Err(TooDeep) => Converted {
            text: plain_text_of(&fragment),
            degraded: true,
        },
    }
}

/// Strip all markup and decode entities, collapsing whitespace.
///
/// Used for short single-line fields such as titles and bylines.
pub fn plain_text(html: &str) -> String {
    plain_text_of(&Html::parse_fragment(html))
}

fn plain_text_of(fragment: &Html) -> String {
    let root = fragment.root_element();
    let mut out = String::new();
    for node in root.descendants() {
        if let Node::Text(text) = node.value() {
            let inside_dropped = node.ancestors().any(|a| {
                a.value()
                    .as_element()
                    .is_some_and(|el| is_dropped(el.name()))
            });
            if !inside_dropped {
                out.push_str(text);
            }
        }
    }
    collapse_whitespace(&out)
}

struct TooDeep;

#[derive(Clone, Copy)]
enum ListKind {
    Unordered,
    Ordered,
}

/// Append-only buffer of finished blocks plus the paragraph being built.
///
/// `line` holds inline text; whitespace inside it is collapsed when the
/// paragraph is flushed, except for the `\n` written by `<br>`.
#[derive(Default)]
struct MarkupWriter {
    blocks: Vec<String>,
    line: String,
    /// Number of inline renders in progress; blocks must not flush while non-zero.
    inline_depth: usize,
}

impl MarkupWriter {
    fn finish(mut self) -> String {
        self.flush();
        self.blocks.join("\n\n")
    }

    fn flush(&mut self) {
        let paragraph = tidy_paragraph(&std::mem::take(&mut self.line));
        if !paragraph.is_empty() {
            self.blocks.push(paragraph);
        }
    }

    fn walk_children(&mut self, el: ElementRef<'_>, depth: usize) -> Result<(), TooDeep> {
        if depth > MAX_DEPTH {
            return Err(TooDeep);
        }
        for child in el.children() {
            match child.value() {
                Node::Text(text) => {
                    // Raw newlines are ordinary whitespace; only <br> breaks a line.
                    self.line.push_str(&text.replace(['\n', '\r'], " "));
                }
                Node::Element(_) => {
                    if let Some(child_el) = ElementRef::wrap(child) {
                        self.walk_element(child_el, depth + 1)?;
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn walk_element(&mut self, el: ElementRef<'_>, depth: usize) -> Result<(), TooDeep> {
        let name = el.value().name();
        if is_dropped(name) {
            return Ok(());
        }
        if self.inline_depth > 0 && is_structural(name) {
            self.line.push(' ');
            self.walk_children(el, depth)?;
            self.line.push(' ');
            return Ok(());
        }
        match name {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = usize::from(name.as_bytes()[1] - b'0');
                self.flush();
                let text = collapse_whitespace(&self.render_inline(el, depth)?);
                if !text.is_empty() {
                    self.blocks.push(format!("{} {}", "#".repeat(level), text));
                }
            }
            "br" => self.line.push('\n'),
            "hr" => {
                self.flush();
                self.blocks.push("---".to_string());
            }
            "strong" | "b" => self.wrap_inline(el, depth, "**")?,
            "em" | "i" => self.wrap_inline(el, depth, "*")?,
            "a" => self.link(el, depth)?,
            "ul" => self.list(el, depth, ListKind::Unordered)?,
            "ol" => self.list(el, depth, ListKind::Ordered)?,
            "blockquote" => {
                self.flush();
                let inner = self.render_blocks(el, depth)?;
                if !inner.is_empty() {
                    self.blocks.push(prefix_lines(&inner, "> ", "> "));
                }
            }
            "td" | "th" => {
                self.walk_children(el, depth)?;
                self.line.push(' ');
            }
            _ if is_block(name) => {
                self.flush();
                self.walk_children(el, depth)?;
                self.flush();
            }
            _ => self.walk_children(el, depth)?,
        }
        Ok(())
    }

    /// Render `el`'s children into a detached inline buffer.
    fn render_inline(&mut self, el: ElementRef<'_>, depth: usize) -> Result<String, TooDeep> {
        let outer = std::mem::take(&mut self.line);
        self.inline_depth += 1;
        let result = self.walk_children(el, depth);
        self.inline_depth -= 1;
        let inner = std::mem::replace(&mut self.line, outer);
        result.map(|()| inner)
    }

    /// Render `el`'s children as standalone blocks joined by blank lines.
    fn render_blocks(&mut self, el: ElementRef<'_>, depth: usize) -> Result<String, TooDeep> {
        let mut inner = MarkupWriter::default();
        inner.walk_children(el, depth)?;
        Ok(inner.finish())
    }

    fn wrap_inline(&mut self, el: ElementRef<'_>, depth: usize, marker: &str) -> Result<(), TooDeep> {
        let raw = self.render_inline(el, depth)?;
        let text = collapse_whitespace(&raw);
        if text.is_empty() {
            self.line.push_str(&raw);
            return Ok(());
        }
        self.push_spaced(&raw, &format!("{marker}{text}{marker}"));
        Ok(())
    }

    fn link(&mut self, el: ElementRef<'_>, depth: usize) -> Result<(), TooDeep> {
        let raw = self.render_inline(el, depth)?;
        let text = collapse_whitespace(&raw);
        let href = el
            .value()
            .attr("href")
            .map(str::trim)
            .filter(|h| !h.is_empty());
        let rendered = match (href, text.is_empty()) {
            (Some(href), false) => format!("[{text}]({href})"),
            (Some(href), true) => format!("[{href}]({href})"),
            (None, _) => text,
        };
        if rendered.is_empty() {
            self.line.push_str(&raw);
        } else {
            self.push_spaced(&raw, &rendered);
        }
        Ok(())
    }

    fn list(&mut self, el: ElementRef<'_>, depth: usize, kind: ListKind) -> Result<(), TooDeep> {
        self.flush();
        let mut items = Vec::new();
        for child in el.child_elements() {
            let item = if child.value().name() == "li" {
                self.render_blocks(child, depth + 1)?
            } else {
                let mut inner = MarkupWriter::default();
                inner.walk_element(child, depth + 1)?;
                inner.finish()
            };
            if item.is_empty() {
                continue;
            }
            let marker = match kind {
                ListKind::Unordered => "- ".to_string(),
                ListKind::Ordered => format!("{}. ", items.len() + 1),
            };
            let indent = " ".repeat(marker.len());
            items.push(prefix_lines(&item, &marker, &indent));
        }
        if !items.is_empty() {
            self.blocks.push(items.join("\n"));
        }
        Ok(())
    }

    /// Append `rendered`, keeping the leading/trailing whitespace `raw` had.
    fn push_spaced(&mut self, raw: &str, rendered: &str) {
        if raw.starts_with(char::is_whitespace) {
            self.line.push(' ');
        }
        self.line.push_str(rendered);
        if raw.ends_with(char::is_whitespace) {
            self.line.push(' ');
        }
    }
}

fn is_dropped(name: &str) -> bool {
    matches!(name, "script" | "style" | "noscript" | "template" | "head")
}

/// Elements that start a new block when met outside an inline render.
fn is_structural(name: &str) -> bool {
    is_block(name)
        || matches!(
            name,
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "hr" | "ul" | "ol" | "li" | "blockquote"
        )
}

fn is_block(name: &str) -> bool {
    matches!(
        name,
        "p" | "div"
            | "section"
            | "article"
            | "header"
            | "footer"
            | "aside"
            | "main"
            | "figure"
            | "figcaption"
            | "pre"
            | "table"
            | "tr"
            | "dl"
            | "dt"
            | "dd"
            | "address"
    )
}

/// Collapse whitespace on every line of a paragraph and drop blank lines.
fn tidy_paragraph(raw: &str) -> String {
    raw.split('\n')
        .map(collapse_whitespace)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn prefix_lines(text: &str, first: &str, rest: &str) -> String {
    text.lines()
        .enumerate()
        .map(|(i, line)| {
            let prefix = if i == 0 { first } else { rest };
            if line.is_empty() {
                prefix.trim_end().to_string()
            } else {
                format!("{prefix}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraph_with_entity() {
        assert_eq!(convert("<p>A &amp; B</p>"), "A & B");
    }

    #[test]
    fn test_paragraph_breaks_and_whitespace() {
        let html = "<p>First   line\n  continues.</p>\n\n<p>Second.</p>";
        assert_eq!(convert(html), "First line continues.\n\nSecond.");
    }

    #[test]
    fn test_headings_match_depth() {
        let html = "<h1>Top</h1><h3> Third  level </h3><p>Body</p>";
        assert_eq!(convert(html), "# Top\n\n### Third level\n\nBody");
    }

    #[test]
    fn test_emphasis_and_links() {
        let html = r#"<p>Read <strong>this</strong> and <em>that</em> at <a href="https://example.com/x">our site</a>.</p>"#;
        assert_eq!(
            convert(html),
            "Read **this** and *that* at [our site](https://example.com/x)."
        );
    }

    #[test]
    fn test_bold_italic_short_tags_and_inner_spaces() {
        assert_eq!(convert("<p>a<b> bold </b>b <i>it</i></p>"), "a **bold** b *it*");
    }

    #[test]
    fn test_anchor_without_href_keeps_text() {
        assert_eq!(convert(r#"<p>See <a name="x">here</a> now</p>"#), "See here now");
    }

    #[test]
    fn test_anchor_without_text_uses_href() {
        assert_eq!(
            convert(r#"<p><a href="https://example.com"></a></p>"#),
            "[https://example.com](https://example.com)"
        );
    }

    #[test]
    fn test_unknown_tags_are_unwrapped() {
        let html = "<p>Hello <span class=\"x\">big <custom-tag>wide</custom-tag></span> world</p>";
        let out = convert(html);
        assert_eq!(out, "Hello big wide world");
        assert!(!out.contains('<'));
    }

    #[test]
    fn test_script_and_style_are_dropped() {
        let html = "<p>Keep</p><script>var x = 1 < 2;</script><style>p { color: red }</style>";
        assert_eq!(convert(html), "Keep");
    }

    #[test]
    fn test_line_breaks_inside_paragraph() {
        assert_eq!(convert("<p>Line one<br>Line two</p>"), "Line one\nLine two");
    }

    #[test]
    fn test_lists() {
        let html = "<ul><li>One</li><li><b>Two</b></li></ul><ol><li>First</li><li>Second</li></ol>";
        assert_eq!(convert(html), "- One\n- **Two**\n\n1. First\n2. Second");
    }

    #[test]
    fn test_blockquote() {
        let html = "<blockquote><p>Quoted one.</p><p>Quoted two.</p></blockquote><p>After</p>";
        assert_eq!(convert(html), "> Quoted one.\n>\n> Quoted two.\n\nAfter");
    }

    #[test]
    fn test_plain_text_input_passes_through() {
        assert_eq!(convert("Just text, no tags."), "Just text, no tags.");
        assert_eq!(convert(""), "");
    }

    #[test]
    fn test_malformed_html_still_converts() {
        let out = convert("<p>Open <b>bold <i>both</p><p>next &copy; 2025");
        assert!(!out.contains('<'));
        assert!(out.contains("Open"));
        assert!(out.contains("next © 2025"));
    }

    #[test]
    fn test_numeric_entities_decoded() {
        assert_eq!(convert("<p>caf&#233; &#x2014; &quot;ok&quot;</p>"), "café — \"ok\"");
    }

    #[test]
    fn test_deep_nesting_degrades_to_plain_text() {
        let depth = MAX_DEPTH + 10;
        let html = format!(
            "{}deep &amp; text{}",
            "<span>".repeat(depth),
            "</span>".repeat(depth)
        );
        let converted = convert_with_status(&html);
        assert!(converted.degraded);
        assert_eq!(converted.text, "deep & text");
    }

    #[test]
    fn test_block_inside_emphasis_keeps_order() {
        assert_eq!(
            convert("<div>Intro <em>emph <p>Inside</p></em></div>"),
            "Intro *emph Inside*"
        );
        assert_eq!(
            convert("<p>Lead</p><strong><div>Bold card</div></strong><p>Tail</p>"),
            "Lead\n\n**Bold card**\n\nTail"
        );
    }

    #[test]
    fn test_link_wrapping_block_content() {
        assert_eq!(
            convert(r#"<div>Lead text <a href="/x"><span>ok</span><div>Card title</div></a> tail</div>"#),
            "Lead text [ok Card title](/x) tail"
        );
        assert_eq!(
            convert(r#"<a href="/story"><p>Para one</p><p>Para two</p></a>"#),
            "[Para one Para two](/story)"
        );
    }

    #[test]
    fn test_heading_inside_inline_is_plain_text() {
        assert_eq!(
            convert(r#"<p>Before</p><a href="/story"><h2>Headline</h2></a><p>After</p>"#),
            "Before\n\n[Headline](/story)\n\nAfter"
        );
        assert_eq!(convert("<strong><h2>Big news</h2></strong>"), "**Big news**");
        assert_eq!(convert("<em><h3>Quiet</h3> news</em>"), "*Quiet news*");
    }

    #[test]
    fn test_regular_input_is_not_degraded() {
        assert!(!convert_with_status("<p>fine</p>").degraded);
    }

    #[test]
    fn test_plain_text_strips_markup() {
        assert_eq!(plain_text("Council approves &amp; signs <em>budget</em>"), "Council approves & signs budget");
    }
}
