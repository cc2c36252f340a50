//! Zendesk help-center HTML emitter
//!
//! Produces clean article HTML: no classes except callouts, lists styled with
//! `type`, links rewritten to `.html`. Variables are always written as values
//! since articles have no variable syntax.

use crate::ast::{
    AdmonitionKind, Block, DefinitionItem, Image, Inline, LinkTarget, List, ListStyle, Table,
    TableCell,
};
use crate::options::{ConversionOptions, OutputFormat};

/// Serialize a block to Zendesk HTML
pub fn serialize(block: &Block, options: &ConversionOptions) -> String {
    let mut out = String::with_capacity(4096);
    serialize_block(block, options, &mut out);
    out
}

fn serialize_blocks(blocks: &[Block], options: &ConversionOptions, out: &mut String) {
    for block in blocks.iter().filter(|b| !b.is_blank()) {
        serialize_block(block, options, out);
    }
}

fn serialize_block(block: &Block, options: &ConversionOptions, out: &mut String) {
    match block {
        Block::Document(blocks) => serialize_blocks(blocks, options, out),

        Block::Heading { level, content, id } => {
            let level = (*level).clamp(1, 6);
            out.push_str(&format!("<h{}", level));
            if let Some(id) = id {
                out.push_str(&format!(" id=\"{}\"", escape_attr(id)));
            }
            out.push('>');
            serialize_inlines(content, options, out);
            out.push_str(&format!("</h{}>\n", level));
        }

        Block::Paragraph(inlines) => {
            out.push_str("<p>");
            serialize_inlines(inlines, options, out);
            out.push_str("</p>\n");
        }

        Block::BlockQuote(blocks) => {
            out.push_str("<blockquote>\n");
            serialize_blocks(blocks, options, out);
            out.push_str("</blockquote>\n");
        }

        Block::List(list) => serialize_list(list, options, out),

        Block::CodeBlock { language, code } => {
            out.push_str("<pre><code");
            if let Some(lang) = language.as_deref().filter(|l| !l.is_empty()) {
                out.push_str(&format!(" class=\"language-{}\"", escape_attr(lang)));
            }
            out.push('>');
            out.push_str(&escape_html(code.trim_end_matches('\n')));
            out.push_str("</code></pre>\n");
        }

        Block::ThematicBreak => out.push_str("<hr>\n"),

        Block::Table(table) => serialize_table(table, options, out),

        Block::Image(image) => {
            out.push_str("<p>");
            serialize_image(image, out);
            out.push_str("</p>\n");
        }

        Block::Admonition { kind, content } => {
            let class = &options.zendesk_options.callout_class;
            out.push_str(&format!(
                "<div class=\"{} {}-{}\">\n",
                class,
                class,
                kind.as_str()
            ));
            if !matches!(content.first(), Some(Block::Paragraph(p)) if starts_with_label(p, *kind)) {
                out.push_str(&format!("<p><strong>{}</strong></p>\n", title_case(kind.label())));
            }
            serialize_blocks(content, options, out);
            out.push_str("</div>\n");
        }

        Block::DefinitionList(items) => serialize_definitions(items, options, out),

        Block::Collapsible { title, content } => {
            out.push_str("<details>\n<summary>");
            serialize_inlines(title, options, out);
            out.push_str("</summary>\n");
            serialize_blocks(content, options, out);
            out.push_str("</details>\n");
        }

        // Unresolved snippets have no article equivalent
        Block::Include { .. } => {}

        Block::HtmlBlock(html) => {
            out.push_str(html.trim());
            out.push('\n');
        }
    }
}

fn starts_with_label(inlines: &[Inline], kind: AdmonitionKind) -> bool {
    match inlines.first() {
        Some(Inline::Strong(inner)) => {
            AdmonitionKind::from_name(&crate::ast::inlines_text(inner)) == Some(kind)
        }
        _ => false,
    }
}

fn title_case(label: &str) -> String {
    let lower = label.to_ascii_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

fn serialize_list(list: &List, options: &ConversionOptions, out: &mut String) {
    if list.style.is_ordered() {
        out.push_str("<ol");
        let type_attr = match list.style {
            ListStyle::LowerAlpha => Some("a"),
            ListStyle::UpperAlpha => Some("A"),
            ListStyle::LowerRoman => Some("i"),
            ListStyle::UpperRoman => Some("I"),
            ListStyle::Numeric | ListStyle::Bullet => None,
        };
        if let Some(t) = type_attr {
            out.push_str(&format!(
                " type=\"{}\" style=\"list-style-type: {};\"",
                t,
                list.style.css_type()
            ));
        }
        if list.start > 1 {
            out.push_str(&format!(" start=\"{}\"", list.start));
        }
        out.push_str(">\n");
    } else {
        out.push_str("<ul>\n");
    }

    for item in &list.items {
        out.push_str("<li>");
        match item.content.as_slice() {
            [Block::Paragraph(inlines)] => serialize_inlines(inlines, options, out),
            blocks => {
                let mut rest = blocks;
                if let Some(Block::Paragraph(inlines)) = rest.first() {
                    serialize_inlines(inlines, options, out);
                    rest = &rest[1..];
                }
                out.push('\n');
                serialize_blocks(rest, options, out);
            }
        }
        out.push_str("</li>\n");
    }

    out.push_str(if list.style.is_ordered() { "</ol>\n" } else { "</ul>\n" });
}

fn serialize_definitions(items: &[DefinitionItem], options: &ConversionOptions, out: &mut String) {
    out.push_str("<dl>\n");
    for item in items {
        out.push_str("<dt>");
        serialize_inlines(&item.term, options, out);
        out.push_str("</dt>\n<dd>");
        match item.definition.as_slice() {
            [Block::Paragraph(inlines)] => serialize_inlines(inlines, options, out),
            blocks => {
                out.push('\n');
                serialize_blocks(blocks, options, out);
            }
        }
        out.push_str("</dd>\n");
    }
    out.push_str("</dl>\n");
}

fn serialize_table(table: &Table, options: &ConversionOptions, out: &mut String) {
    out.push_str("<table>\n");
    if let Some(title) = &table.title {
        out.push_str("<caption>");
        serialize_inlines(title, options, out);
        out.push_str("</caption>\n");
    }

    let header_rows = table.header_rows();
    if header_rows > 0 {
        out.push_str("<thead>\n");
        for row in &table.rows[..header_rows] {
            serialize_row(&row.cells, true, options, out);
        }
        out.push_str("</thead>\n");
    }
    if table.rows.len() > header_rows {
        out.push_str("<tbody>\n");
        for row in &table.rows[header_rows..] {
            serialize_row(&row.cells, false, options, out);
        }
        out.push_str("</tbody>\n");
    }
    out.push_str("</table>\n");
}

fn serialize_row(cells: &[TableCell], header: bool, options: &ConversionOptions, out: &mut String) {
    out.push_str("<tr>");
    for cell in cells {
        let tag = if header || cell.header { "th" } else { "td" };
        out.push('<');
        out.push_str(tag);
        if cell.colspan > 1 {
            out.push_str(&format!(" colspan=\"{}\"", cell.colspan));
        }
        if cell.rowspan > 1 {
            out.push_str(&format!(" rowspan=\"{}\"", cell.rowspan));
        }
        out.push('>');
        if cell.is_simple() {
            serialize_inlines(cell.inlines(), options, out);
        } else {
            serialize_blocks(&cell.content, options, out);
        }
        out.push_str(&format!("</{}>", tag));
    }
    out.push_str("</tr>\n");
}

fn serialize_image(image: &Image, out: &mut String) {
    out.push_str(&format!(
        "<img src=\"{}\" alt=\"{}\"",
        escape_attr(&image.src),
        escape_attr(&image.alt)
    ));
    if let Some(t) = &image.title {
        out.push_str(&format!(" title=\"{}\"", escape_attr(t)));
    }
    if let Some(w) = image.width {
        out.push_str(&format!(" width=\"{}\"", w));
    }
    if let Some(h) = image.height {
        out.push_str(&format!(" height=\"{}\"", h));
    }
    out.push('>');
}

fn serialize_inlines(inlines: &[Inline], options: &ConversionOptions, out: &mut String) {
    for inline in inlines {
        serialize_inline(inline, options, out);
    }
}

fn serialize_wrapped(content: &[Inline], tag: &str, options: &ConversionOptions, out: &mut String) {
    let mut inner = String::new();
    serialize_inlines(content, options, &mut inner);
    let body = inner.trim();
    if body.is_empty() {
        if !inner.is_empty() && !out.ends_with(' ') {
            out.push(' ');
        }
        return;
    }
    if inner.starts_with(char::is_whitespace) && !out.ends_with(char::is_whitespace) {
        out.push(' ');
    }
    out.push_str(&format!("<{tag}>{body}</{tag}>"));
    if inner.ends_with(char::is_whitespace) {
        out.push(' ');
    }
}

fn serialize_inline(inline: &Inline, options: &ConversionOptions, out: &mut String) {
    match inline {
        Inline::Text(text) => out.push_str(&escape_html(text)),
        Inline::Strong(content) => serialize_wrapped(content, "strong", options, out),
        Inline::Emphasis(content) => serialize_wrapped(content, "em", options, out),
        Inline::Underline(content) => serialize_wrapped(content, "u", options, out),
        Inline::Strikethrough(content) => serialize_wrapped(content, "s", options, out),
        Inline::Superscript(content) => serialize_wrapped(content, "sup", options, out),
        Inline::Subscript(content) => serialize_wrapped(content, "sub", options, out),
        Inline::Code(code) => {
            out.push_str("<code>");
            out.push_str(&escape_html(code));
            out.push_str("</code>");
        }
        Inline::Keyboard(keys) => {
            out.push_str("<kbd>");
            out.push_str(&escape_html(keys.trim()));
            out.push_str("</kbd>");
        }
        Inline::Link {
            content,
            target,
            title,
        } => {
            let href = target.href(OutputFormat::Zendesk.target_extension());
            out.push_str(&format!("<a href=\"{}\"", escape_attr(&href)));
            if let Some(t) = title {
                out.push_str(&format!(" title=\"{}\"", escape_attr(t)));
            }
            if matches!(target, LinkTarget::External(_)) && options.zendesk_options.external_links_new_tab {
                out.push_str(" target=\"_blank\" rel=\"noopener noreferrer\"");
            }
            out.push('>');
            serialize_inlines(content, options, out);
            out.push_str("</a>");
        }
        Inline::Image(image) => serialize_image(image, out),
        Inline::Anchor(id) => out.push_str(&format!("<a id=\"{}\"></a>", escape_attr(id))),
        Inline::Variable { value, .. } => out.push_str(&escape_html(value)),
        Inline::LineBreak => out.push_str("<br>"),
        Inline::HtmlInline(html) => out.push_str(html),
    }
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn escape_attr(text: &str) -> String {
    escape_html(text).replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ListItem, TableRow};

    fn text(s: &str) -> Inline {
        Inline::Text(s.to_string())
    }

    fn options() -> ConversionOptions {
        ConversionOptions::new(OutputFormat::Zendesk)
    }

    #[test]
    fn test_alpha_list_keeps_type() {
        let block = Block::List(List {
            style: ListStyle::LowerAlpha,
            depth: 1,
            start: 1,
            items: vec![ListItem::from_inlines(vec![text("one")])],
        });
        assert_eq!(
            serialize(&block, &options()),
            "<ol type=\"a\" style=\"list-style-type: lower-alpha;\">\n<li>one</li>\n</ol>\n"
        );
    }

    #[test]
    fn test_callout() {
        let block = Block::Admonition {
            kind: AdmonitionKind::Warning,
            content: vec![Block::Paragraph(vec![text("Careful & slow")])],
        };
        assert_eq!(
            serialize(&block, &options()),
            "<div class=\"callout callout-warning\">\n<p><strong>Warning</strong></p>\n<p>Careful &amp; slow</p>\n</div>\n"
        );
    }

    #[test]
    fn test_external_link_new_tab() {
        let block = Block::Paragraph(vec![Inline::Link {
            content: vec![text("Docs")],
            target: LinkTarget::External("https://example.com".to_string()),
            title: None,
        }]);
        assert_eq!(
            serialize(&block, &options()),
            "<p><a href=\"https://example.com\" target=\"_blank\" rel=\"noopener noreferrer\">Docs</a></p>\n"
        );
    }

    #[test]
    fn test_document_link_rewritten() {
        let block = Block::Paragraph(vec![Inline::Link {
            content: vec![text("Next")],
            target: LinkTarget::Document {
                path: "topics/next".to_string(),
                fragment: Some("a".to_string()),
            },
            title: None,
        }]);
        assert_eq!(
            serialize(&block, &options()),
            "<p><a href=\"topics/next.html#a\">Next</a></p>\n"
        );
    }

    #[test]
    fn test_table_spans() {
        let mut cell = TableCell::new(vec![Block::Paragraph(vec![text("x")])]);
        cell.rowspan = 2;
        let table = Table {
            title: None,
            rows: vec![TableRow {
                cells: vec![cell],
                header: false,
            }],
        };
        assert_eq!(
            serialize(&Block::Table(table), &options()),
            "<table>\n<tbody>\n<tr><td rowspan=\"2\">x</td></tr>\n</tbody>\n</table>\n"
        );
    }

    #[test]
    fn test_variable_renders_value() {
        let block = Block::Paragraph(vec![Inline::Variable {
            name: "product".to_string(),
            value: "Flare".to_string(),
        }]);
        assert_eq!(serialize(&block, &options()), "<p>Flare</p>\n");
    }
}
