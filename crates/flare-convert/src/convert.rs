//! Convert a preprocessed node tree to the document AST
//!
//! Block elements become [`Block`]s; everything between them is gathered into
//! inline runs that become paragraphs. Elements with no mapping fall back to
//! their children, so unknown markup still contributes its text.

use std::mem;

use flare_core::{
    inlines_text, AdmonitionKind, Block, ConversionOptions, DefinitionItem, Inline, List, ListItem,
    OutputFormat, Table, TableCell, TableRow, ASCIIDOC_MAX_LIST_DEPTH,
};
use indexmap::IndexSet;

use crate::images::{image_from_element, is_inline};
use crate::links::classify_href;
use crate::lists::{lead_ends_with_colon, list_start, ListContext};
use crate::node::{Element, Node};
use crate::preprocess::madcap::INCLUDE_ATTR;
use crate::preprocess::VARIABLE_ATTR;
use crate::utilities::{collapse_whitespace, is_block, is_html_whitespace};

/// Elements whose content is converted in place
const CONTAINERS: &[&str] = &[
    "div", "section", "article", "main", "aside", "header", "footer", "nav", "figure", "figcaption",
    "address", "form", "fieldset", "center", "body", "html", "hgroup", "menu", "dir",
];

/// Bold lead words that turn a paragraph into an admonition
const LABELS: &[&str] = &[
    "note", "tip", "hint", "important", "attention", "warning", "danger", "caution",
];

/// Per-call conversion state
pub struct ConvertContext<'a> {
    pub options: &'a ConversionOptions,
    pub lists: ListContext,
    pub warnings: Vec<String>,
    /// Image sources in document order
    pub images: IndexSet<String>,
    in_admonition: bool,
}

impl<'a> ConvertContext<'a> {
    pub fn new(options: &'a ConversionOptions) -> Self {
        Self {
            options,
            lists: ListContext::new(),
            warnings: Vec::new(),
            images: IndexSet::new(),
            in_admonition: false,
        }
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        if !self.warnings.contains(&message) {
            self.warnings.push(message);
        }
    }
}

/// Convert the children of `root` to a document
pub fn convert_document(root: &Element, ctx: &mut ConvertContext) -> Block {
    let blocks = convert_flow(&root.children, ctx);
    tracing::debug!(blocks = blocks.len(), images = ctx.images.len(), "converted document tree");
    Block::Document(blocks)
}

/// Convert mixed block and inline content
fn convert_flow<'n>(nodes: impl IntoIterator<Item = &'n Node>, ctx: &mut ConvertContext) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut run = Vec::new();

    for node in nodes {
        match node {
            Node::Element(el) if is_block_element(el) => {
                blocks.extend(paragraph_blocks(mem::take(&mut run)));
                convert_block(el, ctx, &mut blocks);
            }
            Node::Comment(_) => {}
            other => convert_inline(other, ctx, &mut run),
        }
    }
    blocks.extend(paragraph_blocks(run));
    blocks
}

/// Block-level tag, include placeholder, or anything wrapping one
fn is_block_element(el: &Element) -> bool {
    is_block(&el.name)
        || (el.name == "div" && el.has_attr(INCLUDE_ATTR))
        || el.element_children().any(is_block_element)
}

fn convert_block(el: &Element, ctx: &mut ConvertContext, out: &mut Vec<Block>) {
    match el.name.as_str() {
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            let level = el.name[1..].parse().unwrap_or(1);
            let content = tidy_inlines(collect_inlines(&el.children, ctx));
            if !content.iter().all(Inline::is_blank) {
                out.push(Block::Heading {
                    level,
                    content,
                    id: el.attr_trimmed("id").map(str::to_string),
                });
            }
        }

        "p" => convert_paragraph(el, ctx, out),

        "ul" | "ol" => {
            if let Some(list) = convert_list(el, ctx) {
                out.push(Block::List(list));
            }
        }

        "blockquote" => match admonition_class(el) {
            Some(kind) if !ctx.in_admonition => out.extend(convert_admonition(kind, el, ctx)),
            _ => {
                let blocks = convert_flow(&el.children, ctx);
                if !blocks.is_empty() {
                    out.push(Block::BlockQuote(blocks));
                }
            }
        },

        "pre" => out.extend(convert_code_block(el)),

        "hr" => out.push(Block::ThematicBreak),

        "table" => {
            if let Some(table) = convert_table(el, ctx) {
                out.push(Block::Table(table));
            }
        }

        "dl" => {
            let mut items = Vec::new();
            collect_definitions(el, ctx, &mut items);
            if !items.is_empty() {
                out.push(Block::DefinitionList(items));
            }
        }

        "details" => {
            let title = el
                .element_children()
                .find(|c| c.name == "summary")
                .map(|summary| tidy_inlines(collect_inlines(&summary.children, ctx)))
                .unwrap_or_default();
            let content = convert_flow(el.children.iter().filter(|n| !n.is_tag("summary")), ctx);
            let block = Block::Collapsible { title, content };
            if !block.is_blank() {
                out.push(block);
            }
        }

        "div" if el.has_attr(INCLUDE_ATTR) => {
            let target = el.attr_trimmed(INCLUDE_ATTR).unwrap_or_default();
            if !target.is_empty() {
                out.push(Block::Include {
                    target: target.to_string(),
                });
            }
        }

        name if CONTAINERS.contains(&name) => match admonition_class(el) {
            Some(kind) if !ctx.in_admonition => out.extend(convert_admonition(kind, el, ctx)),
            _ => out.extend(convert_flow(&el.children, ctx)),
        },

        // dd, li, tr, summary ... outside their parents
        _ => out.extend(convert_flow(&el.children, ctx)),
    }
}

fn convert_paragraph(el: &Element, ctx: &mut ConvertContext, out: &mut Vec<Block>) {
    if el.element_children().any(is_block_element) {
        out.extend(convert_flow(&el.children, ctx));
        return;
    }

    let mut inlines = collect_inlines(&el.children, ctx);
    if !ctx.in_admonition {
        if let Some(kind) = admonition_class(el).or_else(|| label_kind(&inlines)) {
            strip_label(&mut inlines, kind);
            let content = paragraph_blocks(inlines);
            if !content.is_empty() {
                out.push(Block::Admonition { kind, content });
            }
            return;
        }
    }
    out.extend(paragraph_blocks(inlines));
}

fn admonition_class(el: &Element) -> Option<AdmonitionKind> {
    el.classes().find_map(AdmonitionKind::from_name)
}

fn convert_admonition(kind: AdmonitionKind, el: &Element, ctx: &mut ConvertContext) -> Option<Block> {
    let outer = mem::replace(&mut ctx.in_admonition, true);
    let mut content = convert_flow(&el.children, ctx);
    ctx.in_admonition = outer;

    if let Some(Block::Paragraph(inlines)) = content.first_mut() {
        strip_label(inlines, kind);
        *inlines = tidy_inlines(mem::take(inlines));
    }
    content.retain(|b| !b.is_blank());
    (!content.is_empty()).then_some(Block::Admonition { kind, content })
}

/// Kind named by a leading `<b>Note:</b>` style label
fn label_kind(inlines: &[Inline]) -> Option<AdmonitionKind> {
    let mut rest = inlines.iter().skip_while(|i| i.is_blank());
    let Some(Inline::Strong(label)) = rest.next() else {
        return None;
    };
    let label = inlines_text(label);
    let label = label.trim();
    let colon =
        label.ends_with(':') || matches!(rest.next(), Some(Inline::Text(t)) if t.trim_start().starts_with(':'));
    let word = label.trim_end_matches(':').trim();
    if !colon || !LABELS.contains(&word.to_ascii_lowercase().as_str()) {
        return None;
    }
    AdmonitionKind::from_name(word)
}

/// Drop a leading label naming `kind`, with its colon
fn strip_label(inlines: &mut Vec<Inline>, kind: AdmonitionKind) {
    let Some(pos) = inlines.iter().position(|i| !i.is_blank()) else {
        return;
    };
    let Inline::Strong(label) = &inlines[pos] else {
        return;
    };
    let label = inlines_text(label);
    let word = label.trim().trim_end_matches(':').trim().to_ascii_lowercase();
    if !LABELS.contains(&word.as_str()) || AdmonitionKind::from_name(&word) != Some(kind) {
        return;
    }

    inlines.drain(..=pos);
    if let Some(Inline::Text(text)) = inlines.first_mut() {
        let rest = text.trim_start();
        *text = rest.strip_prefix(':').unwrap_or(rest).to_string();
    }
}

fn convert_list(el: &Element, ctx: &mut ConvertContext) -> Option<List> {
    let frame = ctx.lists.enter(el);
    if frame.depth >= ASCIIDOC_MAX_LIST_DEPTH && ctx.options.format == OutputFormat::Asciidoc {
        ctx.warn(format!(
            "Lists nested deeper than {} levels are written at level {} in AsciiDoc",
            ASCIIDOC_MAX_LIST_DEPTH, ASCIIDOC_MAX_LIST_DEPTH
        ));
    }
    let mut items: Vec<ListItem> = Vec::new();

    for child in &el.children {
        match child {
            Node::Element(li) if li.name == "li" => {
                ctx.lists.next_item(lead_ends_with_colon(li));
                items.push(ListItem::new(convert_flow(&li.children, ctx)));
            }
            Node::Comment(_) => {}
            node if node.is_whitespace() => {}
            // Stray content between items belongs to the item before it
            stray => {
                let blocks = convert_flow(std::slice::from_ref(stray), ctx);
                match items.last_mut() {
                    Some(item) => item.content.extend(blocks),
                    None if !blocks.is_empty() => items.push(ListItem::new(blocks)),
                    None => {}
                }
            }
        }
    }
    ctx.lists.exit();

    if items.is_empty() {
        return None;
    }
    Some(List {
        style: frame.style,
        depth: frame.depth,
        start: list_start(el),
        items,
    })
}

fn convert_code_block(el: &Element) -> Option<Block> {
    let code_el = el.element_children().find(|c| c.name == "code");
    let language = language_class(el).or_else(|| code_el.and_then(language_class));

    let text = el.text_content();
    let code = text.trim_end_matches(['\n', '\r']);
    if code.trim().is_empty() {
        return None;
    }
    Some(Block::CodeBlock {
        language,
        code: code.to_string(),
    })
}

fn language_class(el: &Element) -> Option<String> {
    el.classes()
        .find_map(|c| c.strip_prefix("language-").or_else(|| c.strip_prefix("lang-")))
        .filter(|lang| !lang.is_empty())
        .map(str::to_string)
}

fn convert_table(el: &Element, ctx: &mut ConvertContext) -> Option<Table> {
    // Lists inside cells restart at depth 0
    let outer_lists = mem::take(&mut ctx.lists);
    let mut table = Table::default();

    for child in el.element_children() {
        match child.name.as_str() {
            "caption" => {
                let title = tidy_inlines(collect_inlines(&child.children, ctx));
                if !title.iter().all(Inline::is_blank) {
                    table.title = Some(title);
                }
            }
            "thead" => convert_rows(child, true, ctx, &mut table),
            "tbody" | "tfoot" => convert_rows(child, false, ctx, &mut table),
            "tr" => table.rows.push(convert_row(child, false, ctx)),
            _ => {}
        }
    }
    ctx.lists = outer_lists;

    table.rows.retain(|row| !row.cells.is_empty());
    if table.rows.is_empty() {
        return None;
    }
    if table.header_rows() == 0 {
        let first = &mut table.rows[0];
        if first.cells.iter().all(|c| c.header) {
            first.header = true;
        }
    }

    let spans = table
        .rows
        .iter()
        .flat_map(|r| &r.cells)
        .any(|c| c.colspan > 1 || c.rowspan > 1);
    if spans && ctx.options.format == OutputFormat::WritersideMarkdown {
        ctx.warn("Merged table cells are not supported in Markdown; spanned cells were padded with empty cells");
    }
    Some(table)
}

fn convert_rows(section: &Element, header: bool, ctx: &mut ConvertContext, table: &mut Table) {
    for tr in section.element_children().filter(|c| c.name == "tr") {
        table.rows.push(convert_row(tr, header, ctx));
    }
}

fn convert_row(tr: &Element, header: bool, ctx: &mut ConvertContext) -> TableRow {
    let mut cells = Vec::new();
    for cell in tr.element_children().filter(|c| matches!(c.name.as_str(), "td" | "th")) {
        let mut converted = TableCell::new(convert_flow(&cell.children, ctx));
        converted.colspan = span(cell, "colspan");
        converted.rowspan = span(cell, "rowspan");
        converted.header = header || cell.name == "th";
        cells.push(converted);
    }
    TableRow { cells, header }
}

/// Largest span browsers honour for each attribute
fn span(cell: &Element, attr: &str) -> u32 {
    let limit = if attr == "colspan" { 1000 } else { 65534 };
    cell.attr_trimmed(attr)
        .and_then(|v| v.parse::<u32>().ok())
        .filter(|&n| n >= 1)
        .map_or(1, |n| n.min(limit))
}

fn collect_definitions(el: &Element, ctx: &mut ConvertContext, items: &mut Vec<DefinitionItem>) {
    for child in el.element_children() {
        match child.name.as_str() {
            "dt" => items.push(DefinitionItem {
                term: tidy_inlines(collect_inlines(&child.children, ctx)),
                definition: Vec::new(),
            }),
            "dd" => {
                let blocks = convert_flow(&child.children, ctx);
                match items.last_mut() {
                    Some(item) => item.definition.extend(blocks),
                    None => items.push(DefinitionItem {
                        term: Vec::new(),
                        definition: blocks,
                    }),
                }
            }
            "div" => collect_definitions(child, ctx, items),
            _ => {}
        }
    }
}

/// Paragraphs from an inline run, with block images split out
fn paragraph_blocks(inlines: Vec<Inline>) -> Vec<Block> {
    let inlines = tidy_inlines(inlines);
    if inlines.iter().all(Inline::is_blank) {
        return Vec::new();
    }

    let text_len = inlines
        .iter()
        .filter(|i| !matches!(i, Inline::Image(_)))
        .map(Inline::plain_text)
        .collect::<String>()
        .trim()
        .chars()
        .count();

    let mut blocks = Vec::new();
    let mut current = Vec::new();
    for inline in inlines {
        match inline {
            Inline::Image(image) if !is_inline(&image, text_len) => {
                push_paragraph(&mut current, &mut blocks);
                blocks.push(Block::Image(image));
            }
            other => current.push(other),
        }
    }
    push_paragraph(&mut current, &mut blocks);
    blocks
}

fn push_paragraph(current: &mut Vec<Inline>, blocks: &mut Vec<Block>) {
    let inlines = tidy_inlines(mem::take(current));
    if !inlines.iter().all(Inline::is_blank) {
        blocks.push(Block::Paragraph(inlines));
    }
}

/// Merge text runs, collapse whitespace across run boundaries and trim the
/// edges of the sequence and of each line
fn tidy_inlines(inlines: Vec<Inline>) -> Vec<Inline> {
    let mut out: Vec<Inline> = Vec::with_capacity(inlines.len());
    for inline in inlines {
        match inline {
            Inline::Text(text) => {
                let text = collapse_whitespace(&text);
                let after_space = match out.last() {
                    None | Some(Inline::LineBreak) => true,
                    Some(Inline::Text(prev)) => prev.ends_with(' '),
                    Some(_) => false,
                };
                let text = if after_space { text.trim_start_matches(is_html_whitespace) } else { text.as_str() };
                if text.is_empty() {
                    continue;
                }
                match out.last_mut() {
                    Some(Inline::Text(prev)) => prev.push_str(text),
                    _ => out.push(Inline::Text(text.to_string())),
                }
            }
            Inline::LineBreak => {
                trim_trailing_space(&mut out);
                out.push(Inline::LineBreak);
            }
            other => out.push(other),
        }
    }
    trim_trailing_space(&mut out);
    out
}

fn trim_trailing_space(out: &mut Vec<Inline>) {
    if let Some(Inline::Text(text)) = out.last_mut() {
        let len = text.trim_end_matches(is_html_whitespace).len();
        text.truncate(len);
        if text.is_empty() {
            out.pop();
        }
    }
}

fn collect_inlines(nodes: &[Node], ctx: &mut ConvertContext) -> Vec<Inline> {
    let mut run = Vec::new();
    for node in nodes {
        convert_inline(node, ctx, &mut run);
    }
    run
}

fn convert_inline(node: &Node, ctx: &mut ConvertContext, run: &mut Vec<Inline>) {
    match node {
        Node::Text(text) => run.push(Inline::Text(text.clone())),
        Node::Comment(_) => {}
        Node::Element(el) => convert_inline_element(el, ctx, run),
    }
}

fn convert_inline_element(el: &Element, ctx: &mut ConvertContext, run: &mut Vec<Inline>) {
    match el.name.as_str() {
        "strong" | "b" => push_marked(collect_inlines(&el.children, ctx), Inline::Strong, run),
        "em" | "i" | "cite" | "dfn" => push_marked(collect_inlines(&el.children, ctx), Inline::Emphasis, run),
        "u" | "ins" => push_marked(collect_inlines(&el.children, ctx), Inline::Underline, run),
        "s" | "strike" | "del" => push_marked(collect_inlines(&el.children, ctx), Inline::Strikethrough, run),
        "sup" => push_marked(collect_inlines(&el.children, ctx), Inline::Superscript, run),
        "sub" => push_marked(collect_inlines(&el.children, ctx), Inline::Subscript, run),

        "code" | "tt" | "samp" | "var" => push_literal(&el.text_content(), Inline::Code, run),
        "kbd" => push_literal(&el.text_content(), Inline::Keyboard, run),
        "span" if el.classes().any(|c| c.eq_ignore_ascii_case("keyboard")) => {
            push_literal(&el.text_content(), Inline::Keyboard, run)
        }

        "span" if el.has_attr(VARIABLE_ATTR) => {
            let name = el.attr_trimmed(VARIABLE_ATTR).unwrap_or_default();
            run.push(Inline::Variable {
                name: name.to_string(),
                value: collapse_whitespace(&el.text_content()).trim().to_string(),
            });
        }

        // Unresolved inline snippet; the preprocessor already reported it
        "span" if el.has_attr(INCLUDE_ATTR) => {}

        "a" => convert_link(el, ctx, run),

        "img" => {
            let image = image_from_element(el, ctx.options);
            if let Some(src) = el.attr_trimmed("src").filter(|s| !s.is_empty()) {
                ctx.images.insert(src.replace('\\', "/"));
            }
            run.push(Inline::Image(image));
        }

        "br" => run.push(Inline::LineBreak),
        "wbr" => {}

        // Block tags reached in inline context keep word boundaries
        name if is_block(name) => {
            run.push(Inline::Text(" ".to_string()));
            run.extend(collect_inlines(&el.children, ctx));
            run.push(Inline::Text(" ".to_string()));
        }

        _ => run.extend(collect_inlines(&el.children, ctx)),
    }
}

fn convert_link(el: &Element, ctx: &mut ConvertContext, run: &mut Vec<Inline>) {
    let content = collect_inlines(&el.children, ctx);

    let Some(target) = el.attr("href").and_then(classify_href) else {
        if let Some(id) = el.attr_trimmed("id").or_else(|| el.attr_trimmed("name")) {
            if !id.is_empty() {
                run.push(Inline::Anchor(id.to_string()));
            }
        }
        run.extend(content);
        return;
    };

    let title = el.attr_trimmed("title").filter(|t| !t.is_empty()).map(str::to_string);
    push_marked(content, |content| Inline::Link { content, target, title }, run);
}

/// Push `wrap(inner)` with boundary whitespace moved outside the mark
fn push_marked(inner: Vec<Inline>, wrap: impl FnOnce(Vec<Inline>) -> Inline, run: &mut Vec<Inline>) {
    let leading = matches!(inner.first(), Some(Inline::Text(t)) if t.starts_with(is_html_whitespace));
    let trailing = matches!(inner.last(), Some(Inline::Text(t)) if t.ends_with(is_html_whitespace));

    let inner = tidy_inlines(inner);
    if inner.iter().all(Inline::is_blank) {
        if leading || trailing {
            run.push(Inline::Text(" ".to_string()));
        }
        return;
    }
    if leading {
        run.push(Inline::Text(" ".to_string()));
    }
    run.push(wrap(inner));
    if trailing {
        run.push(Inline::Text(" ".to_string()));
    }
}

fn push_literal(raw: &str, wrap: fn(String) -> Inline, run: &mut Vec<Inline>) {
    let text = collapse_whitespace(raw);
    let trimmed = text.trim_matches(is_html_whitespace);
    if trimmed.is_empty() {
        if !raw.is_empty() {
            run.push(Inline::Text(" ".to_string()));
        }
        return;
    }
    if raw.starts_with(is_html_whitespace) {
        run.push(Inline::Text(" ".to_string()));
    }
    run.push(wrap(trimmed.to_string()));
    if raw.ends_with(is_html_whitespace) {
        run.push(Inline::Text(" ".to_string()));
    }
}
