//! AsciiDoc emitter
//!
//! Every block writes complete lines ending in `\n`; `serialize_blocks` puts one
//! blank line between siblings. List items attach following blocks with `+`
//! continuation lines and never emit literal item numbers.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::ast::{
    AdmonitionKind, Block, DefinitionItem, Image, Inline, LinkTarget, List,
    ListItem, Table, TableCell,
};
use crate::options::{ConversionOptions, OutputFormat, TableFrame, TableGridLines, VariableMode};

/// Tables nest one level (`!===`) inside an `a|` cell
const MAX_TABLE_DEPTH: usize = 2;

static BLOCK_LIKE_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:[*.]{1,5}\s|-\s|\d+\.\s|[A-Za-z]\.\s|={1,6}\s|(?:NOTE|TIP|IMPORTANT|WARNING|CAUTION):\s|//|\.[^\s.]|:[\w-]+:(?:\s|$)|\+$|'''|<\d+>\s|(?:-{4,}|={4,}|_{4,}|\*{4,}|\.{4,}|\+{4,}|/{4,}|\|===|!===)\s*$)",
    )
    .expect("block-like line pattern is valid")
});

static ATTRIBUTE_REF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z0-9_][\w-]*)\}").expect("attribute reference pattern is valid"));

#[derive(Clone, Copy)]
struct Ctx<'a> {
    options: &'a ConversionOptions,
    /// Depth of nested example blocks, sets the `====` delimiter length
    nesting: usize,
    /// Number of enclosing table cells; 0 outside tables
    table_depth: usize,
}

impl<'a> Ctx<'a> {
    fn nested(self) -> Self {
        Self {
            nesting: self.nesting + 1,
            ..self
        }
    }

    fn in_cell(self) -> Self {
        Self {
            table_depth: self.table_depth + 1,
            ..self
        }
    }

    fn extension(self) -> &'static str {
        OutputFormat::Asciidoc.target_extension()
    }
}

/// Serialize a block to AsciiDoc
pub fn serialize(block: &Block, options: &ConversionOptions) -> String {
    let ctx = Ctx {
        options,
        nesting: 0,
        table_depth: 0,
    };
    let mut out = String::with_capacity(4096);
    match block {
        Block::Document(blocks) => serialize_document(blocks, ctx, &mut out),
        other => serialize_block(other, ctx, &mut out),
    }
    out
}

fn serialize_document(blocks: &[Block], ctx: Ctx, out: &mut String) {
    let adoc = &ctx.options.asciidoc_options;
    if ctx.options.variable_options.variable_mode == VariableMode::Include {
        if let Some(file) = adoc.variables_file.as_deref().filter(|f| !f.trim().is_empty()) {
            out.push_str("include::");
            out.push_str(file.trim());
            out.push_str("[]\n\n");
        }
    }

    let title_index = blocks.iter().position(|b| !b.is_blank());
    let has_title = matches!(
        title_index.map(|i| &blocks[i]),
        Some(Block::Heading { level, .. }) if heading_level(*level, ctx) == 1
    );

    if has_title {
        let i = title_index.unwrap_or(0);
        serialize_block(&blocks[i], ctx, out);
        serialize_attributes(ctx, out);
        if blocks[i + 1..].iter().any(|b| !b.is_blank()) {
            out.push('\n');
            serialize_blocks(&blocks[i + 1..], ctx, out);
        }
    } else {
        if !adoc.document_attributes.is_empty() {
            serialize_attributes(ctx, out);
            out.push('\n');
        }
        serialize_blocks(blocks, ctx, out);
    }
}

fn serialize_attributes(ctx: Ctx, out: &mut String) {
    for (name, value) in &ctx.options.asciidoc_options.document_attributes {
        out.push(':');
        out.push_str(name.trim());
        out.push(':');
        if !value.is_empty() {
            out.push(' ');
            out.push_str(value);
        }
        out.push('\n');
    }
}

fn serialize_blocks(blocks: &[Block], ctx: Ctx, out: &mut String) {
    let mut previous: Option<&Block> = None;
    for block in blocks.iter().filter(|b| !b.is_blank()) {
        if let Some(prev) = previous {
            out.push('\n');
            // Adjacent lists would otherwise merge into one
            if matches!(prev, Block::List(_)) && matches!(block, Block::List(_)) {
                out.push_str("//-\n\n");
            }
        }
        serialize_block(block, ctx, out);
        previous = Some(block);
    }
}

fn serialize_block(block: &Block, ctx: Ctx, out: &mut String) {
    match block {
        Block::Document(blocks) => serialize_blocks(blocks, ctx, out),

        Block::Heading { level, content, id } => {
            let text = single_line(&render_inlines(content, ctx));
            if text.is_empty() {
                return;
            }
            if let Some(id) = id {
                out.push_str("[[");
                out.push_str(id);
                out.push_str("]]\n");
            }
            out.push_str(&"=".repeat(heading_level(*level, ctx)));
            out.push(' ');
            out.push_str(&text);
            out.push('\n');
        }

        Block::Paragraph(inlines) => {
            let text = paragraph_text(inlines, ctx);
            if !text.is_empty() {
                out.push_str(&text);
                out.push('\n');
            }
        }

        Block::BlockQuote(blocks) => {
            out.push_str("____\n");
            serialize_blocks(blocks, ctx, out);
            out.push_str("____\n");
        }

        Block::List(list) => serialize_list(list, ctx, out),

        Block::CodeBlock { language, code } => {
            if let Some(lang) = language.as_deref().filter(|l| !l.is_empty()) {
                out.push_str("[source,");
                out.push_str(lang);
                out.push_str("]\n");
            }
            let longest = code
                .lines()
                .filter(|l| !l.is_empty() && l.chars().all(|c| c == '-'))
                .map(str::len)
                .max()
                .unwrap_or(0);
            let fence = "-".repeat((longest + 1).max(4));
            out.push_str(&fence);
            out.push('\n');
            out.push_str(code.trim_end_matches('\n'));
            out.push('\n');
            out.push_str(&fence);
            out.push('\n');
        }

        Block::ThematicBreak => out.push_str("'''\n"),

        Block::Table(table) => serialize_table(table, ctx, out),

        Block::Image(image) => serialize_block_image(image, out),

        Block::Admonition { kind, content } => serialize_admonition(*kind, content, ctx, out),

        Block::DefinitionList(items) => serialize_definitions(items, ctx, out),

        Block::Collapsible { title, content } => {
            let title = single_line(&render_inlines(title, ctx));
            if !title.is_empty() {
                out.push('.');
                out.push_str(&title);
                out.push('\n');
            }
            let delim = "=".repeat(4 + ctx.nesting);
            out.push_str("[%collapsible]\n");
            out.push_str(&delim);
            out.push('\n');
            serialize_blocks(content, ctx.nested(), out);
            out.push_str(&delim);
            out.push('\n');
        }

        Block::Include { target } => {
            out.push_str("include::");
            out.push_str(&include_target(target));
            out.push_str("[]\n");
        }

        Block::HtmlBlock(html) => {
            out.push_str("++++\n");
            out.push_str(html.trim_end());
            out.push_str("\n++++\n");
        }
    }
}

fn heading_level(level: u8, ctx: Ctx) -> usize {
    (level as usize + ctx.options.asciidoc_options.heading_offset as usize).clamp(1, 6)
}

fn include_target(target: &str) -> String {
    let (path, _) = target.split_once('#').unwrap_or((target, ""));
    let stem = match path.rfind('.') {
        Some(dot) if !path[dot..].contains('/') => &path[..dot],
        _ => path,
    };
    format!("{}.adoc", stem)
}

fn serialize_list(list: &List, ctx: Ctx, out: &mut String) {
    let mut attrs: Vec<String> = Vec::new();
    if let Some(style) = list.style.asciidoc_style() {
        attrs.push(style.to_string());
    }
    if list.style.is_ordered() && list.start > 1 {
        attrs.push(format!("start={}", list.start));
    }
    if !attrs.is_empty() {
        out.push('[');
        out.push_str(&attrs.join(","));
        out.push_str("]\n");
    }

    let marker = list.asciidoc_marker();

    for item in &list.items {
        serialize_list_item(item, &marker, ctx, out);
    }
}

fn serialize_list_item(item: &ListItem, marker: &str, ctx: Ctx, out: &mut String) {
    out.push_str(marker);
    out.push(' ');

    let mut rest: &[Block] = &item.content;
    let lead = match rest.first() {
        Some(Block::Paragraph(inlines)) => paragraph_text(inlines, ctx),
        _ => String::new(),
    };
    if lead.is_empty() {
        out.push_str("{empty}\n");
        if matches!(rest.first(), Some(Block::Paragraph(_))) {
            rest = &rest[1..];
        }
    } else {
        out.push_str(&lead);
        out.push('\n');
        rest = &rest[1..];
    }

    let attached: Vec<&Block> = rest.iter().filter(|b| !b.is_blank()).collect();
    let first_list = attached.iter().position(|b| matches!(b, Block::List(_)));
    let block_after_list = first_list
        .map(|i| attached[i + 1..].iter().any(|b| !matches!(b, Block::List(_))))
        .unwrap_or(false);

    if block_after_list {
        // An open block keeps trailing paragraphs on this item instead of the nested one
        out.push_str("+\n--\n");
        serialize_blocks(rest, ctx, out);
        out.push_str("--\n");
        return;
    }

    for block in attached {
        if !matches!(block, Block::List(_)) {
            out.push_str("+\n");
        }
        serialize_block(block, ctx, out);
    }
}

fn serialize_admonition(kind: AdmonitionKind, content: &[Block], ctx: Ctx, out: &mut String) {
    let blocks: Vec<&Block> = content.iter().filter(|b| !b.is_blank()).collect();
    if let [Block::Paragraph(inlines)] = blocks.as_slice() {
        let text = paragraph_text(inlines, ctx);
        out.push_str(kind.label());
        out.push_str(": ");
        out.push_str(&text);
        out.push('\n');
        return;
    }

    let delim = "=".repeat(4 + ctx.nesting);
    out.push('[');
    out.push_str(kind.label());
    out.push_str("]\n");
    out.push_str(&delim);
    out.push('\n');
    serialize_blocks(content, ctx.nested(), out);
    out.push_str(&delim);
    out.push('\n');
}

fn serialize_definitions(items: &[DefinitionItem], ctx: Ctx, out: &mut String) {
    for item in items {
        let term = single_line(&render_inlines(&item.term, ctx));
        out.push_str(if term.is_empty() { "{empty}" } else { &term });
        out.push_str("::");

        let blocks: Vec<&Block> = item.definition.iter().filter(|b| !b.is_blank()).collect();
        let mut rest = blocks.as_slice();
        if let Some(Block::Paragraph(inlines)) = rest.first() {
            out.push(' ');
            out.push_str(&paragraph_text(inlines, ctx));
            rest = &rest[1..];
        }
        out.push('\n');
        for block in rest {
            if !matches!(block, Block::List(_)) {
                out.push_str("+\n");
            }
            serialize_block(block, ctx, out);
        }
    }
}

fn serialize_block_image(image: &Image, out: &mut String) {
    if let Some(title) = image.title.as_deref().filter(|t| !t.trim().is_empty()) {
        out.push('.');
        out.push_str(title.trim());
        out.push('\n');
    }
    out.push_str("image::");
    out.push_str(&image_target(&image.src));
    out.push('[');
    out.push_str(&image_attributes(image));
    out.push_str("]\n");
}

fn image_target(src: &str) -> String {
    src.replace(' ', "%20")
}

fn image_attributes(image: &Image) -> String {
    let mut attrs = Vec::new();
    let alt = image.alt.trim();
    if alt.contains([',', '"', ']', '=']) {
        attrs.push(format!("\"{}\"", alt.replace('"', "\\\"").replace(']', "\\]")));
    } else if !alt.is_empty() {
        attrs.push(alt.to_string());
    } else if image.width.is_some() || image.height.is_some() {
        attrs.push(String::new());
    }
    if let Some(w) = image.width {
        attrs.push(format!("width={}", w));
    }
    if let Some(h) = image.height {
        attrs.push(format!("height={}", h));
    }
    attrs.join(",")
}

fn serialize_table(table: &Table, ctx: Ctx, out: &mut String) {
    // AsciiDoc nests tables one level deep; deeper tables keep their cell content in order
    if ctx.table_depth >= MAX_TABLE_DEPTH {
        let cells: Vec<Block> = table
            .rows
            .iter()
            .flat_map(|row| &row.cells)
            .flat_map(|cell| cell.content.iter().cloned())
            .collect();
        serialize_blocks(&cells, ctx, out);
        return;
    }

    let sep = if ctx.table_depth == 0 { '|' } else { '!' };
    let cell_ctx = ctx.in_cell();
    let adoc = &ctx.options.asciidoc_options;
    let columns = table.column_count();
    let mut header_rows = table.header_rows();
    if header_rows == 0 && adoc.first_row_header && table.rows.len() > 1 {
        header_rows = 1;
    }

    if let Some(title) = &table.title {
        let title = single_line(&render_inlines(title, ctx));
        if !title.is_empty() {
            out.push('.');
            out.push_str(&title);
            out.push('\n');
        }
    }

    let mut attrs = vec![format!("cols=\"{}\"", column_spec(table, columns, adoc.auto_column_widths))];
    if header_rows > 0 {
        attrs.push("options=\"header\"".to_string());
    }
    if adoc.table_frame != TableFrame::All {
        attrs.push(format!("frame={}", adoc.table_frame.as_str()));
    }
    if adoc.table_grid != TableGridLines::All {
        attrs.push(format!("grid={}", adoc.table_grid.as_str()));
    }
    let delimiter = format!("{}===\n", sep);
    out.push('[');
    out.push_str(&attrs.join(","));
    out.push_str("]\n");
    out.push_str(&delimiter);

    for (r, row) in table.rows.iter().enumerate() {
        let header_row = r == 0 && header_rows > 0;
        let simple = row.cells.iter().all(TableCell::is_simple);
        if simple {
            let cells: Vec<String> = row
                .cells
                .iter()
                .map(|c| format!("{}{}{}", cell_spec(c, header_row), sep, cell_text(c, cell_ctx)))
                .map(|c| c.trim_end().to_string())
                .collect();
            out.push_str(&cells.join(" "));
            out.push('\n');
        } else {
            for cell in &row.cells {
                out.push_str(&cell_spec(cell, header_row));
                if cell.is_simple() {
                    out.push(sep);
                    out.push_str(&cell_text(cell, cell_ctx));
                    out.push('\n');
                } else {
                    out.push('a');
                    out.push(sep);
                    out.push('\n');
                    let mut inner = String::new();
                    serialize_blocks(&cell.content, cell_ctx.nested(), &mut inner);
                    out.push_str(&escape_cell_blocks(&inner, cell_ctx.table_depth));
                }
            }
        }
        if header_row || r + 1 < table.rows.len() {
            out.push('\n');
        }
    }
    out.push_str(&delimiter);
}

fn cell_spec(cell: &TableCell, header_row: bool) -> String {
    let mut spec = String::new();
    match (cell.colspan.max(1), cell.rowspan.max(1)) {
        (1, 1) => {}
        (c, 1) => spec.push_str(&format!("{}+", c)),
        (1, r) => spec.push_str(&format!(".{}+", r)),
        (c, r) => spec.push_str(&format!("{}.{}+", c, r)),
    }
    if cell.header && !header_row {
        spec.push('h');
    }
    spec
}

fn cell_text(cell: &TableCell, ctx: Ctx) -> String {
    let text = single_line(&render_inlines(cell.inlines(), ctx));
    escape_cell(&text, ctx.table_depth)
}

/// Escape the separators of every table enclosing a cell at `depth`
fn escape_cell(text: &str, depth: usize) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if c == '|' || (c == '!' && depth > 1) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Escape block content of an `a|` cell. A nested `!===` table was
/// escaped when it was written and is copied through unchanged.
fn escape_cell_blocks(text: &str, depth: usize) -> String {
    let mut escaped = String::with_capacity(text.len());
    let mut in_nested = false;
    for line in text.split_inclusive('\n') {
        let delimiter = line.trim_end() == "!===";
        if in_nested || delimiter {
            escaped.push_str(line);
        } else {
            escaped.push_str(&escape_cell(line, depth));
        }
        if delimiter {
            in_nested = !in_nested;
        }
    }
    escaped
}

fn column_spec(table: &Table, columns: usize, auto_widths: bool) -> String {
    if !auto_widths {
        return vec!["1"; columns].join(",");
    }

    let mut lengths = vec![1usize; columns];
    let mut grid = crate::ast::TableGrid::new();
    for row in &table.rows {
        let positions = grid.place_row(row);
        for (cell, &col) in row.cells.iter().zip(&positions) {
            if cell.colspan <= 1 && col < columns {
                lengths[col] = lengths[col].max(cell.text_len());
            }
        }
    }

    let max = lengths.iter().copied().max().unwrap_or(1).max(1);
    let weights: Vec<usize> = lengths
        .iter()
        .map(|&len| ((len * 10 + max / 2) / max).max(1))
        .collect();
    let divisor = weights.iter().copied().fold(0, gcd).max(1);
    weights
        .iter()
        .map(|w| (w / divisor).to_string())
        .collect::<Vec<_>>()
        .join(",")
}

fn gcd(a: usize, b: usize) -> usize {
    if b == 0 {
        a
    } else {
        gcd(b, a % b)
    }
}

/// Paragraph body: one output line per hard break, no empty lines, block-like
/// line starts neutralised with `{empty}`
fn paragraph_text(inlines: &[Inline], ctx: Ctx) -> String {
    let rendered = render_inlines(inlines, ctx);
    let lines: Vec<String> = rendered
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty() && *l != "+")
        .map(escape_line_start)
        .collect();

    let mut text = lines.join("\n");
    while text.ends_with(" +") {
        text.truncate(text.len() - 2);
        text.truncate(text.trim_end().len());
    }
    text
}

fn escape_line_start(line: &str) -> String {
    let attribute_line = line.starts_with('[') && !line.starts_with("[[") && line.ends_with(']');
    if attribute_line || BLOCK_LIKE_LINE.is_match(line) {
        format!("{{empty}}{}", line)
    } else {
        line.to_string()
    }
}

fn single_line(text: &str) -> String {
    text.lines()
        .map(|l| l.trim().trim_end_matches(" +").trim_end_matches('+').trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn render_inlines(inlines: &[Inline], ctx: Ctx) -> String {
    let mut out = String::new();
    serialize_inlines(inlines, ctx, None, &mut out);
    out
}

fn serialize_inlines(inlines: &[Inline], ctx: Ctx, trailing: Option<char>, out: &mut String) {
    for (i, inline) in inlines.iter().enumerate() {
        let next = match inlines.get(i + 1) {
            Some(n) => first_char(n).or(trailing),
            None => trailing,
        };
        serialize_inline(inline, ctx, next, out);
    }
}

/// First character an inline renders to, close enough for boundary checks
fn first_char(inline: &Inline) -> Option<char> {
    match inline {
        Inline::Text(t) => t.chars().next(),
        Inline::Strong(_) => Some('*'),
        Inline::Emphasis(_) => Some('_'),
        Inline::Code(_) => Some('`'),
        Inline::Superscript(_) => Some('^'),
        Inline::Subscript(_) => Some('~'),
        Inline::Underline(_) | Inline::Strikethrough(_) | Inline::Anchor(_) => Some('['),
        Inline::Variable { .. } => Some('{'),
        Inline::LineBreak => Some(' '),
        Inline::Link {
            target: LinkTarget::Anchor(_),
            ..
        } => Some('<'),
        Inline::Link { .. } | Inline::Image(_) | Inline::Keyboard(_) | Inline::HtmlInline(_) => {
            Some('x')
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Constrained marks need a non-word boundary on both sides
fn is_constrained(prev: Option<char>, next: Option<char>) -> bool {
    let prev_ok = prev.map_or(true, |c| !is_word_char(c) && !matches!(c, ';' | ':' | '}'));
    let next_ok = next.map_or(true, |c| !is_word_char(c));
    prev_ok && next_ok
}

fn serialize_inline(inline: &Inline, ctx: Ctx, next: Option<char>, out: &mut String) {
    match inline {
        Inline::Text(text) => out.push_str(&escape_text(text)),

        Inline::Strong(content) => serialize_marked(content, "*", "", ctx, next, out),

        Inline::Emphasis(content) => serialize_marked(content, "_", "", ctx, next, out),

        Inline::Underline(content) => serialize_marked(content, "#", "[.underline]", ctx, next, out),

        Inline::Strikethrough(content) => {
            serialize_marked(content, "#", "[.line-through]", ctx, next, out)
        }

        Inline::Superscript(content) | Inline::Subscript(content) => {
            let text = render_inlines(content, ctx);
            let text = text.trim();
            if text.is_empty() {
                return;
            }
            let (mark, tag) = match inline {
                Inline::Superscript(_) => ('^', "sup"),
                _ => ('~', "sub"),
            };
            if text.contains(char::is_whitespace) {
                out.push_str(&format!("pass:[<{tag}>{text}</{tag}>]"));
            } else {
                out.push(mark);
                out.push_str(text);
                out.push(mark);
            }
        }

        Inline::Code(code) => {
            if code.is_empty() {
                return;
            }
            let constrained = is_constrained(out.chars().last(), next);
            let ticks = if constrained { "`" } else { "``" };
            out.push_str(ticks);
            if code.contains('`') {
                out.push_str("pass:c[");
                out.push_str(&code.replace(']', "\\]"));
                out.push(']');
            } else if code.contains(['*', '_', '#', '^', '~', '{', '[', '<', '+', '\\']) {
                out.push('+');
                out.push_str(code);
                out.push('+');
            } else {
                out.push_str(code);
            }
            out.push_str(ticks);
        }

        Inline::Keyboard(keys) => {
            out.push_str("kbd:[");
            out.push_str(&keys.trim().replace(']', "\\]"));
            out.push(']');
        }

        Inline::Link {
            content, target, ..
        } => serialize_link(content, target, ctx, out),

        Inline::Image(image) => {
            out.push_str("image:");
            out.push_str(&image_target(&image.src));
            out.push('[');
            out.push_str(&image_attributes(image));
            out.push(']');
        }

        Inline::Anchor(id) => {
            out.push_str("[[");
            out.push_str(id);
            out.push_str("]]");
        }

        Inline::Variable { name, .. } => {
            out.push('{');
            out.push_str(name);
            out.push('}');
        }

        Inline::LineBreak => {
            let trimmed = out.trim_end_matches([' ', '\t']).len();
            out.truncate(trimmed);
            if !out.is_empty() && !out.ends_with('\n') {
                out.push_str(" +\n");
            }
        }

        Inline::HtmlInline(html) => {
            out.push_str("pass:[");
            out.push_str(&html.replace(']', "\\]"));
            out.push(']');
        }
    }
}

/// Wrap content in a formatting mark, hoisting edge whitespace outside it
fn serialize_marked(
    content: &[Inline],
    mark: &str,
    role: &str,
    ctx: Ctx,
    next: Option<char>,
    out: &mut String,
) {
    let inner = render_inlines(content, ctx);
    let body = inner.trim();
    if body.is_empty() {
        if !inner.is_empty() && !out.ends_with(char::is_whitespace) {
            out.push(' ');
        }
        return;
    }

    if inner.starts_with(char::is_whitespace) && !out.is_empty() && !out.ends_with(char::is_whitespace) {
        out.push(' ');
    }
    let trailing_space = inner.ends_with(char::is_whitespace);
    let next_is_space = next.map_or(true, char::is_whitespace);
    let boundary = if trailing_space { Some(' ') } else { next };

    let mark = if is_constrained(out.chars().last(), boundary) {
        mark.to_string()
    } else {
        mark.repeat(2)
    };
    out.push_str(role);
    out.push_str(&mark);
    out.push_str(body);
    out.push_str(&mark);

    if trailing_space && !next_is_space {
        out.push(' ');
    }
}

fn serialize_link(content: &[Inline], target: &LinkTarget, ctx: Ctx, out: &mut String) {
    let text = single_line(&render_inlines(content, ctx)).replace(']', "\\]");
    match target {
        LinkTarget::External(url) => {
            let has_scheme = ["http://", "https://", "ftp://", "irc://"]
                .iter()
                .any(|s| url.starts_with(s));
            let url = if url.contains([' ', '[', ']']) {
                format!("++{}++", url)
            } else {
                url.clone()
            };
            if !has_scheme || url.starts_with("++") {
                out.push_str("link:");
            }
            out.push_str(&url);
            if text != url || !has_scheme {
                out.push('[');
                if text != url {
                    out.push_str(&text);
                }
                out.push(']');
            }
        }
        LinkTarget::Document { .. } => {
            out.push_str("xref:");
            out.push_str(&target.href(ctx.extension()));
            out.push('[');
            out.push_str(&text);
            out.push(']');
        }
        LinkTarget::Anchor(id) => {
            out.push_str("<<");
            out.push_str(id);
            if !text.is_empty() {
                out.push(',');
                out.push_str(&text);
            }
            out.push_str(">>");
        }
        LinkTarget::File(path) => {
            out.push_str("link:");
            out.push_str(&path.replace(' ', "%20"));
            out.push('[');
            out.push_str(&text);
            out.push(']');
        }
        LinkTarget::Email(addr) => {
            out.push_str("mailto:");
            out.push_str(addr);
            out.push('[');
            if text != *addr {
                out.push_str(&text);
            }
            out.push(']');
        }
    }
}

fn escape_text(text: &str) -> String {
    let escaped = ATTRIBUTE_REF.replace_all(text, r"\{${1}}");
    escaped.replace("[[", "\\[[").replace("<<", "\\<<")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{ListStyle, TableRow};

    fn text(s: &str) -> Inline {
        Inline::Text(s.to_string())
    }

    fn para(s: &str) -> Block {
        Block::Paragraph(vec![text(s)])
    }

    fn options() -> ConversionOptions {
        ConversionOptions::default()
    }

    fn list(style: ListStyle, depth: usize, items: Vec<ListItem>) -> Block {
        Block::List(List {
            style,
            depth,
            start: 1,
            items,
        })
    }

    #[test]
    fn test_heading_with_offset() {
        let mut opts = options();
        opts.asciidoc_options.heading_offset = 1;
        let block = Block::Heading {
            level: 2,
            content: vec![text("Install")],
            id: Some("install".to_string()),
        };
        assert_eq!(serialize(&block, &opts), "[[install]]\n=== Install\n");
    }

    #[test]
    fn test_constrained_strong() {
        let block = Block::Paragraph(vec![
            text("Click "),
            Inline::Strong(vec![text("Save")]),
            text(" now."),
        ]);
        assert_eq!(serialize(&block, &options()), "Click *Save* now.\n");
    }

    #[test]
    fn test_unconstrained_strong_mid_word() {
        let block = Block::Paragraph(vec![text("re"), Inline::Strong(vec![text("set")]), text("ting")]);
        assert_eq!(serialize(&block, &options()), "re**set**ting\n");
    }

    #[test]
    fn test_emphasis_whitespace_hoisted() {
        let block = Block::Paragraph(vec![
            text("The "),
            Inline::Emphasis(vec![text("panel ")]),
            text("is not showing"),
        ]);
        assert_eq!(serialize(&block, &options()), "The _panel_ is not showing\n");
    }

    #[test]
    fn test_nested_list_markers_and_style() {
        let inner = list(
            ListStyle::LowerAlpha,
            1,
            vec![
                ListItem::from_inlines(vec![text("Sub one")]),
                ListItem::from_inlines(vec![text("Sub two")]),
            ],
        );
        let outer = list(
            ListStyle::Numeric,
            0,
            vec![
                ListItem::new(vec![para("Do this:"), inner]),
                ListItem::from_inlines(vec![text("Then this")]),
            ],
        );
        let expected = ". Do this:\n[loweralpha]\n.. Sub one\n.. Sub two\n. Then this\n";
        assert_eq!(serialize(&outer, &options()), expected);
    }

    #[test]
    fn test_continuation_only_before_non_list_blocks() {
        let item = ListItem::new(vec![
            para("Open the file."),
            para("It opens in the editor."),
            Block::Image(Image {
                src: "images/editor.png".to_string(),
                ..Default::default()
            }),
        ]);
        let block = list(ListStyle::Numeric, 0, vec![item]);
        assert_eq!(
            serialize(&block, &options()),
            ". Open the file.\n+\nIt opens in the editor.\n+\nimage::images/editor.png[]\n"
        );
    }

    #[test]
    fn test_start_attribute() {
        let block = Block::List(List {
            style: ListStyle::Numeric,
            depth: 0,
            start: 4,
            items: vec![ListItem::from_inlines(vec![text("Fourth")])],
        });
        assert_eq!(serialize(&block, &options()), "[start=4]\n. Fourth\n");
    }

    #[test]
    fn test_single_paragraph_admonition() {
        let block = Block::Admonition {
            kind: AdmonitionKind::Warning,
            content: vec![para("Back up first.")],
        };
        assert_eq!(serialize(&block, &options()), "WARNING: Back up first.\n");
    }

    #[test]
    fn test_multi_block_admonition() {
        let block = Block::Admonition {
            kind: AdmonitionKind::Note,
            content: vec![para("One."), para("Two.")],
        };
        assert_eq!(serialize(&block, &options()), "[NOTE]\n====\nOne.\n\nTwo.\n====\n");
    }

    #[test]
    fn test_links() {
        let block = Block::Paragraph(vec![
            Inline::Link {
                content: vec![text("Guide")],
                target: LinkTarget::Document {
                    path: "topics/guide".to_string(),
                    fragment: Some("setup".to_string()),
                },
                title: None,
            },
            text(" and "),
            Inline::Link {
                content: vec![text("top")],
                target: LinkTarget::Anchor("top".to_string()),
                title: None,
            },
            text(" and "),
            Inline::Link {
                content: vec![text("site")],
                target: LinkTarget::External("https://example.com".to_string()),
                title: None,
            },
        ]);
        assert_eq!(
            serialize(&block, &options()),
            "xref:topics/guide.adoc#setup[Guide] and <<top,top>> and https://example.com[site]\n"
        );
    }

    fn table(rows: Vec<Vec<TableCell>>) -> Table {
        Table {
            title: None,
            rows: rows
                .into_iter()
                .map(|cells| TableRow { cells, header: false })
                .collect(),
        }
    }

    #[test]
    fn test_nested_table_uses_exclamation_separator() {
        let inner = table(vec![vec![TableCell::new(vec![para("x|1")]), TableCell::new(vec![para("y!")])]]);
        let outer = table(vec![vec![TableCell::new(vec![para("Outer a|b"), Block::Table(inner)])]]);
        let out = serialize(&Block::Table(outer), &options());

        assert!(out.contains("a|\nOuter a\\|b\n\n[cols="), "{out}");
        assert!(out.contains("]\n!===\n!x\\|1 !y\\!\n!===\n"), "{out}");
        assert!(out.ends_with("\n|===\n"), "{out}");
        assert_eq!(out.matches("|===").count(), 2, "{out}");
    }

    #[test]
    fn test_third_level_table_keeps_cell_content() {
        let deepest = table(vec![vec![TableCell::new(vec![para("deep")])]]);
        let inner = table(vec![vec![TableCell::new(vec![para("mid"), Block::Table(deepest)])]]);
        let outer = table(vec![vec![TableCell::new(vec![para("top"), Block::Table(inner)])]]);
        let out = serialize(&Block::Table(outer), &options());

        assert!(out.contains("a!\nmid\n\ndeep\n"), "{out}");
        assert_eq!(out.matches("!===").count(), 2, "{out}");
    }

    #[test]
    fn test_list_marker_stops_at_five_levels() {
        let item = |t: &str| ListItem::from_inlines(vec![text(t)]);
        assert_eq!(ListStyle::Bullet.asciidoc_marker(4), "*****");
        assert_eq!(ListStyle::Numeric.asciidoc_marker(6), ".....");
        let deep = list(ListStyle::Bullet, 5, vec![item("L5")]);
        assert_eq!(serialize(&deep, &options()), "***** L5\n");
    }

    #[test]
    fn test_table_with_header_and_spans() {
        let mut wide = TableCell::new(vec![para("Wide")]);
        wide.colspan = 2;
        let table = Table {
            title: Some(vec![text("Options")]),
            rows: vec![
                TableRow {
                    cells: vec![
                        TableCell::new(vec![para("Name")]),
                        TableCell::new(vec![para("Description")]),
                    ],
                    header: true,
                },
                TableRow {
                    cells: vec![wide],
                    header: false,
                },
            ],
        };
        let out = serialize(&Block::Table(table), &options());
        assert_eq!(
            out,
            ".Options\n[cols=\"2,5\",options=\"header\"]\n|===\n|Name |Description\n\n2+|Wide\n|===\n"
        );
    }

    #[test]
    fn test_paragraph_escapes_list_like_start() {
        let block = para("1. Not a list");
        assert_eq!(serialize(&block, &options()), "{empty}1. Not a list\n");
    }

    #[test]
    fn test_inline_image_and_variable() {
        let block = Block::Paragraph(vec![
            text("Press "),
            Inline::Image(Image {
                src: "icons/save.png".to_string(),
                alt: "Save".to_string(),
                width: Some(16),
                ..Default::default()
            }),
            text(" in "),
            Inline::Variable {
                name: "general_product_name".to_string(),
                value: "Flare".to_string(),
            },
        ]);
        assert_eq!(
            serialize(&block, &options()),
            "Press image:icons/save.png[Save,width=16] in {general_product_name}\n"
        );
    }

    #[test]
    fn test_document_title_and_attributes() {
        let mut opts = options();
        opts.asciidoc_options
            .document_attributes
            .insert("toc".to_string(), String::new());
        let doc = Block::Document(vec![
            Block::Heading {
                level: 1,
                content: vec![text("Guide")],
                id: None,
            },
            para("Body."),
        ]);
        assert_eq!(serialize(&doc, &opts), "= Guide\n:toc:\n\nBody.\n");
    }

    #[test]
    fn test_adjacent_lists_are_separated() {
        let doc = Block::Document(vec![
            list(ListStyle::Bullet, 0, vec![ListItem::from_inlines(vec![text("a")])]),
            list(ListStyle::Numeric, 0, vec![ListItem::from_inlines(vec![text("b")])]),
        ]);
        assert_eq!(serialize(&doc, &options()), "* a\n\n//-\n\n. b\n");
    }

    #[test]
    fn test_include_target_rewritten() {
        let block = Block::Include {
            target: "../Snippets/Warning.flsnp".to_string(),
        };
        assert_eq!(serialize(&block, &options()), "include::../Snippets/Warning.adoc[]\n");
    }
}
