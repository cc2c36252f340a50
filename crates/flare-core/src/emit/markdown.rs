//! Writerside Markdown emitter
//!
//! CommonMark with the Writerside extensions: `{style="note"}` after callout
//! blockquotes, `{type="alpha-lower"}` after lettered lists, `%var%` variables
//! and `<shortcut>` for keys.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ast::{
    inlines_text, AdmonitionKind, Block, DefinitionItem, Image, Inline, List, ListItem, ListStyle,
    Table, TableGrid,
};
use crate::options::{ConversionOptions, HeadingStyle, MarkdownOptions, OutputFormat};

static BLOCK_LIKE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:#{1,6}(?:\s|$)|>|[-+*]\s|\d+[.)]\s|=+\s*$|-+\s*$|\{[a-z-]+=)")
        .expect("markdown block-like pattern is valid")
});

/// Serialize a block to Writerside Markdown
pub fn serialize(block: &Block, options: &ConversionOptions) -> String {
    let mut out = String::with_capacity(4096);
    serialize_block(block, options, &mut out);
    out
}

fn md(options: &ConversionOptions) -> &MarkdownOptions {
    &options.markdown_options
}

fn serialize_blocks(blocks: &[Block], options: &ConversionOptions, out: &mut String) {
    let mut previous: Option<&Block> = None;
    for block in blocks.iter().filter(|b| !b.is_blank()) {
        if let Some(prev) = previous {
            out.push('\n');
            if matches!(prev, Block::List(_)) && matches!(block, Block::List(_)) {
                out.push_str("<!-- -->\n\n");
            }
        }
        serialize_block(block, options, out);
        previous = Some(block);
    }
}

fn serialize_block(block: &Block, options: &ConversionOptions, out: &mut String) {
    match block {
        Block::Document(blocks) => serialize_blocks(blocks, options, out),

        Block::Heading { level, content, id } => serialize_heading(*level, content, id.as_deref(), options, out),

        Block::Paragraph(inlines) => {
            let text = paragraph_text(inlines, options);
            if !text.is_empty() {
                out.push_str(&text);
                out.push('\n');
            }
        }

        Block::BlockQuote(blocks) => {
            let mut inner = String::new();
            serialize_blocks(blocks, options, &mut inner);
            quote_lines(&inner, out);
        }

        Block::List(list) => serialize_list(list, options, out),

        Block::CodeBlock { language, code } => {
            let fence = code_fence(&md(options).fence, code);
            out.push_str(&fence);
            out.push_str(language.as_deref().unwrap_or(""));
            out.push('\n');
            out.push_str(code.trim_end_matches('\n'));
            out.push('\n');
            out.push_str(&fence);
            out.push('\n');
        }

        Block::ThematicBreak => {
            out.push_str(&md(options).hr);
            out.push('\n');
        }

        Block::Table(table) => serialize_table(table, options, out),

        Block::Image(image) => {
            serialize_image(image, out);
            out.push('\n');
            if let Some(w) = image.width {
                out.push_str(&format!("{{width=\"{}\"}}\n", w));
            }
        }

        Block::Admonition { kind, content } => {
            let mut inner = String::new();
            serialize_blocks(content, options, &mut inner);
            quote_lines(&inner, out);
            out.push_str(&format!("{{style=\"{}\"}}\n", callout_style(*kind)));
        }

        Block::DefinitionList(items) => serialize_definitions(items, options, out),

        Block::Collapsible { title, content } => {
            out.push_str("<details>\n<summary>");
            out.push_str(&escape_html(&inlines_text(title)));
            out.push_str("</summary>\n\n");
            serialize_blocks(content, options, out);
            out.push_str("\n</details>\n");
        }

        // Writerside has no counterpart for an unresolved snippet
        Block::Include { .. } => {}

        Block::HtmlBlock(html) => {
            out.push_str(html.trim_end());
            out.push('\n');
        }
    }
}

fn callout_style(kind: AdmonitionKind) -> &'static str {
    match kind {
        AdmonitionKind::Note => "note",
        AdmonitionKind::Tip => "tip",
        AdmonitionKind::Important | AdmonitionKind::Warning | AdmonitionKind::Caution => "warning",
    }
}

fn quote_lines(content: &str, out: &mut String) {
    for line in content.trim_end().lines() {
        out.push('>');
        if !line.is_empty() {
            out.push(' ');
            out.push_str(line);
        }
        out.push('\n');
    }
}

fn code_fence(configured: &str, code: &str) -> String {
    let ch = configured.chars().next().unwrap_or('`');
    let longest = code
        .lines()
        .map(|l| l.trim_start().chars().take_while(|&c| c == ch).count())
        .max()
        .unwrap_or(0);
    if longest >= configured.len() {
        ch.to_string().repeat(longest + 1)
    } else {
        configured.to_string()
    }
}

fn serialize_heading(
    level: u8,
    content: &[Inline],
    id: Option<&str>,
    options: &ConversionOptions,
    out: &mut String,
) {
    let text = single_line(&render_inlines(content, options));
    if text.is_empty() {
        return;
    }
    let level = level.clamp(1, 6);

    match md(options).heading_style {
        HeadingStyle::Setext if level <= 2 && id.is_none() => {
            out.push_str(&text);
            out.push('\n');
            let underline = if level == 1 { '=' } else { '-' };
            out.push_str(&underline.to_string().repeat(text.chars().count().max(3)));
            out.push('\n');
        }
        _ => {
            out.push_str(&"#".repeat(level as usize));
            out.push(' ');
            out.push_str(&text);
            if let Some(id) = id {
                out.push_str(&format!(" {{id=\"{}\"}}", id));
            }
            out.push('\n');
        }
    }
}

fn serialize_list(list: &List, options: &ConversionOptions, out: &mut String) {
    for (i, item) in list.items.iter().enumerate() {
        let marker = if list.style.is_ordered() {
            format!("{}. ", u64::from(list.start) + i as u64)
        } else {
            format!("{} ", md(options).bullet_list_marker)
        };
        serialize_list_item(item, &marker, options, out);
    }

    let list_type = match list.style {
        ListStyle::LowerAlpha => Some("alpha-lower"),
        ListStyle::UpperAlpha => Some("alpha-upper"),
        ListStyle::LowerRoman => Some("roman-lower"),
        ListStyle::UpperRoman => Some("roman-upper"),
        ListStyle::Numeric | ListStyle::Bullet => None,
    };
    if let Some(t) = list_type {
        out.push_str(&format!("{{type=\"{}\"}}\n", t));
    }
}

fn serialize_list_item(item: &ListItem, marker: &str, options: &ConversionOptions, out: &mut String) {
    let mut content = String::new();
    let blocks: Vec<&Block> = item.content.iter().filter(|b| !b.is_blank()).collect();
    let mut rest = blocks.as_slice();
    let mut after_lead = false;

    if let Some(Block::Paragraph(inlines)) = rest.first() {
        content.push_str(&paragraph_text(inlines, options));
        content.push('\n');
        rest = &rest[1..];
        after_lead = true;
    }

    for block in rest {
        // A nested list directly under the lead keeps the item tight
        let tight = after_lead && matches!(block, Block::List(_));
        if !content.is_empty() && !tight {
            content.push('\n');
        }
        serialize_block(block, options, &mut content);
        after_lead = false;
    }

    let indent = " ".repeat(marker.len());
    out.push_str(marker);
    for (i, line) in content.trim_end().lines().enumerate() {
        if i > 0 {
            out.push('\n');
            if !line.is_empty() {
                out.push_str(&indent);
            }
        }
        out.push_str(line);
    }
    out.push('\n');
}

fn serialize_definitions(items: &[DefinitionItem], options: &ConversionOptions, out: &mut String) {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&single_line(&render_inlines(&item.term, options)));
        out.push('\n');
        let mut inner = String::new();
        serialize_blocks(&item.definition, options, &mut inner);
        for (j, line) in inner.trim_end().lines().enumerate() {
            out.push_str(if j == 0 { ": " } else if line.is_empty() { "" } else { "  " });
            out.push_str(line);
            out.push('\n');
        }
    }
}

fn serialize_table(table: &Table, options: &ConversionOptions, out: &mut String) {
    let columns = table.column_count();

    // Lay cells onto the grid; spanned positions stay empty
    let mut grid = TableGrid::new();
    let mut rows: Vec<Vec<String>> = Vec::with_capacity(table.rows.len());
    for row in &table.rows {
        let positions = grid.place_row(row);
        let mut cells = vec![String::new(); columns];
        for (cell, &col) in row.cells.iter().zip(&positions) {
            if col < columns {
                cells[col] = cell_text(&cell.content, options);
            }
        }
        rows.push(cells);
    }
    if rows.is_empty() {
        return;
    }

    let mut widths = vec![3usize; columns];
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    if let Some(title) = &table.title {
        let title = single_line(&render_inlines(title, options));
        if !title.is_empty() {
            out.push_str(&format!("**{}**\n\n", title));
        }
    }

    for (r, row) in rows.iter().enumerate() {
        out.push('|');
        for (i, cell) in row.iter().enumerate() {
            out.push(' ');
            out.push_str(cell);
            let padding = widths[i].saturating_sub(cell.chars().count());
            out.push_str(&" ".repeat(padding));
            out.push_str(" |");
        }
        out.push('\n');

        if r == 0 {
            out.push('|');
            for &width in &widths {
                out.push(' ');
                out.push_str(&"-".repeat(width));
                out.push_str(" |");
            }
            out.push('\n');
        }
    }
}

fn cell_text(blocks: &[Block], options: &ConversionOptions) -> String {
    let mut inner = String::new();
    serialize_blocks(blocks, options, &mut inner);
    inner
        .trim()
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("<br/>")
        .replace('|', "\\|")
}

fn serialize_image(image: &Image, out: &mut String) {
    out.push_str("![");
    out.push_str(&escape_text(&image.alt));
    out.push_str("](");
    out.push_str(&image.src.replace(' ', "%20"));
    if let Some(t) = &image.title {
        out.push_str(" \"");
        out.push_str(&t.replace('"', "\\\""));
        out.push('"');
    }
    out.push(')');
}

fn paragraph_text(inlines: &[Inline], options: &ConversionOptions) -> String {
    let rendered = render_inlines(inlines, options);
    let lines: Vec<String> = rendered
        .split('\n')
        .map(|l| l.trim_start())
        .filter(|l| !l.trim().is_empty())
        .map(escape_line_start)
        .collect();
    let mut text = lines.join("\n");
    text.truncate(text.trim_end().len());
    text
}

fn escape_line_start(line: &str) -> String {
    if !BLOCK_LIKE_LINE.is_match(line) {
        return line.to_string();
    }
    // Digits are not escapable, the punctuation after them is
    match line.find(|c: char| !c.is_ascii_digit()) {
        Some(pos) if pos > 0 => format!("{}\\{}", &line[..pos], &line[pos..]),
        _ => format!("\\{}", line),
    }
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn render_inlines(inlines: &[Inline], options: &ConversionOptions) -> String {
    let mut out = String::new();
    for inline in inlines {
        serialize_inline(inline, options, &mut out);
    }
    out
}

fn serialize_inline(inline: &Inline, options: &ConversionOptions, out: &mut String) {
    let md = md(options);
    match inline {
        Inline::Text(text) => out.push_str(&escape_text(text)),

        Inline::Strong(content) => serialize_delimited(content, &md.strong_delimiter, options, out),

        Inline::Emphasis(content) => {
            serialize_delimited(content, &md.em_delimiter.to_string(), options, out)
        }

        Inline::Strikethrough(content) => serialize_delimited(content, "~~", options, out),

        Inline::Underline(content) => serialize_tagged(content, "u", options, out),

        Inline::Superscript(content) => serialize_tagged(content, "sup", options, out),

        Inline::Subscript(content) => serialize_tagged(content, "sub", options, out),

        Inline::Code(code) => {
            if !code.is_empty() {
                let backticks = if code.contains('`') { "``" } else { "`" };
                let space = if code.starts_with('`') || code.ends_with('`') {
                    " "
                } else {
                    ""
                };
                out.push_str(backticks);
                out.push_str(space);
                out.push_str(code);
                out.push_str(space);
                out.push_str(backticks);
            }
        }

        Inline::Keyboard(keys) => {
            out.push_str("<shortcut>");
            out.push_str(&escape_html(keys.trim()));
            out.push_str("</shortcut>");
        }

        Inline::Link {
            content,
            target,
            title,
        } => {
            out.push('[');
            out.push_str(&single_line(&render_inlines(content, options)));
            out.push_str("](");
            out.push_str(&target.href(OutputFormat::WritersideMarkdown.target_extension()).replace(' ', "%20"));
            if let Some(t) = title {
                out.push_str(" \"");
                out.push_str(&t.replace('"', "\\\""));
                out.push('"');
            }
            out.push(')');
        }

        Inline::Image(image) => serialize_image(image, out),

        Inline::Anchor(id) => {
            out.push_str("<a name=\"");
            out.push_str(id);
            out.push_str("\"></a>");
        }

        Inline::Variable { name, .. } => {
            out.push('%');
            out.push_str(name);
            out.push('%');
        }

        Inline::LineBreak => {
            let trimmed = out.trim_end_matches(' ').len();
            out.truncate(trimmed);
            if !out.is_empty() {
                out.push_str("  \n");
            }
        }

        Inline::HtmlInline(html) => out.push_str(html),
    }
}

fn serialize_delimited(content: &[Inline], delimiter: &str, options: &ConversionOptions, out: &mut String) {
    let inner = render_inlines(content, options);
    let body = inner.trim();
    if body.is_empty() {
        if !inner.is_empty() && !out.ends_with(' ') {
            out.push(' ');
        }
        return;
    }
    if inner.starts_with(char::is_whitespace) && !out.is_empty() && !out.ends_with(char::is_whitespace) {
        out.push(' ');
    }
    out.push_str(delimiter);
    out.push_str(body);
    out.push_str(delimiter);
    if inner.ends_with(char::is_whitespace) {
        out.push(' ');
    }
}

fn serialize_tagged(content: &[Inline], tag: &str, options: &ConversionOptions, out: &mut String) {
    let inner = render_inlines(content, options);
    if inner.trim().is_empty() {
        return;
    }
    out.push_str(&format!("<{tag}>{}</{tag}>", inner.trim()));
}

fn escape_text(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '*' | '_' | '[' | ']' | '`' | '<' | '%') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{LinkTarget, TableCell, TableRow};

    fn text(s: &str) -> Inline {
        Inline::Text(s.to_string())
    }

    fn para(s: &str) -> Block {
        Block::Paragraph(vec![text(s)])
    }

    fn options() -> ConversionOptions {
        ConversionOptions::new(OutputFormat::WritersideMarkdown)
    }

    #[test]
    fn test_heading_atx_with_id() {
        let block = Block::Heading {
            level: 2,
            content: vec![text("Setup")],
            id: Some("setup".to_string()),
        };
        assert_eq!(serialize(&block, &options()), "## Setup {id=\"setup\"}\n");
    }

    #[test]
    fn test_heading_setext() {
        let mut opts = options();
        opts.markdown_options.heading_style = HeadingStyle::Setext;
        let block = Block::Heading {
            level: 1,
            content: vec![text("Title")],
            id: None,
        };
        assert_eq!(serialize(&block, &opts), "Title\n=====\n");
    }

    #[test]
    fn test_strong_and_emphasis() {
        let block = Block::Paragraph(vec![
            Inline::Strong(vec![text("bold")]),
            text(" and "),
            Inline::Emphasis(vec![text("italic ")]),
            text("text"),
        ]);
        assert_eq!(serialize(&block, &options()), "**bold** and _italic_ text\n");
    }

    #[test]
    fn test_nested_alpha_list() {
        let inner = Block::List(List {
            style: ListStyle::LowerAlpha,
            depth: 1,
            start: 1,
            items: vec![
                ListItem::from_inlines(vec![text("Sub one")]),
                ListItem::from_inlines(vec![text("Sub two")]),
            ],
        });
        let outer = Block::List(List {
            style: ListStyle::Numeric,
            depth: 0,
            start: 1,
            items: vec![
                ListItem::new(vec![para("Do this:"), inner]),
                ListItem::from_inlines(vec![text("Then this")]),
            ],
        });
        assert_eq!(
            serialize(&outer, &options()),
            "1. Do this:\n   1. Sub one\n   2. Sub two\n   {type=\"alpha-lower\"}\n2. Then this\n"
        );
    }

    #[test]
    fn test_list_item_with_paragraphs() {
        let block = Block::List(List {
            style: ListStyle::Bullet,
            depth: 0,
            start: 1,
            items: vec![ListItem::new(vec![para("First"), para("More detail")])],
        });
        assert_eq!(serialize(&block, &options()), "- First\n\n  More detail\n");
    }

    #[test]
    fn test_admonition() {
        let block = Block::Admonition {
            kind: AdmonitionKind::Tip,
            content: vec![para("Use shortcuts.")],
        };
        assert_eq!(serialize(&block, &options()), "> Use shortcuts.\n{style=\"tip\"}\n");
    }

    #[test]
    fn test_link_rewritten_to_md() {
        let block = Block::Paragraph(vec![Inline::Link {
            content: vec![text("Guide")],
            target: LinkTarget::Document {
                path: "guide".to_string(),
                fragment: None,
            },
            title: None,
        }]);
        assert_eq!(serialize(&block, &options()), "[Guide](guide.md)\n");
    }

    #[test]
    fn test_table_pads_spans() {
        let mut wide = TableCell::new(vec![para("Both")]);
        wide.colspan = 2;
        let table = Table {
            title: None,
            rows: vec![
                TableRow {
                    cells: vec![TableCell::new(vec![para("A")]), TableCell::new(vec![para("B")])],
                    header: true,
                },
                TableRow {
                    cells: vec![wide],
                    header: false,
                },
            ],
        };
        assert_eq!(
            serialize(&Block::Table(table), &options()),
            "| A    | B   |\n| ---- | --- |\n| Both |     |\n"
        );
    }

    #[test]
    fn test_escapes_markdown_characters() {
        let block = para("Use *args and 100% of [x]");
        assert_eq!(serialize(&block, &options()), "Use \\*args and 100\\% of \\[x\\]\n");
    }

    #[test]
    fn test_variable_and_keyboard() {
        let block = Block::Paragraph(vec![
            Inline::Variable {
                name: "product_name".to_string(),
                value: "Flare".to_string(),
            },
            text(" uses "),
            Inline::Keyboard("Ctrl+S".to_string()),
        ]);
        assert_eq!(
            serialize(&block, &options()),
            "%product_name% uses <shortcut>Ctrl+S</shortcut>\n"
        );
    }
}
