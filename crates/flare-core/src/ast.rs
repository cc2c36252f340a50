//! Document Abstract Syntax Tree
//!
//! This module defines the format-neutral document tree produced from a
//! normalized HTML topic. Every target emitter (AsciiDoc, Markdown, Zendesk)
//! consumes the same tree, so adding a node kind here forces each emitter to
//! handle it.

/// A block-level document node
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// Root document container
    Document(Vec<Block>),

    /// Heading with level (1-6), inline content and an optional anchor id
    Heading {
        level: u8,
        content: Vec<Inline>,
        id: Option<String>,
    },

    /// Paragraph containing inline content
    Paragraph(Vec<Inline>),

    /// Block quote containing nested blocks
    BlockQuote(Vec<Block>),

    /// Ordered or unordered list with resolved depth and style
    List(List),

    /// Preformatted code
    CodeBlock {
        language: Option<String>,
        code: String,
    },

    /// Thematic break (horizontal rule)
    ThematicBreak,

    /// Table with spans and header rows
    Table(Table),

    /// Image that stands on its own line
    Image(Image),

    /// Callout block (note, tip, warning, ...)
    Admonition {
        kind: AdmonitionKind,
        content: Vec<Block>,
    },

    /// Definition list (`dl`)
    DefinitionList(Vec<DefinitionItem>),

    /// Collapsible section, produced from drop-downs
    Collapsible {
        title: Vec<Inline>,
        content: Vec<Block>,
    },

    /// Reference to content that could not be inlined (unresolved snippet)
    Include { target: String },

    /// Raw HTML block
    HtmlBlock(String),
}

/// Deepest list level AsciiDoc markers can express (`.....`, `*****`)
pub const ASCIIDOC_MAX_LIST_DEPTH: usize = 5;

/// Marker style of a list level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListStyle {
    Numeric,
    LowerAlpha,
    UpperAlpha,
    LowerRoman,
    UpperRoman,
    Bullet,
}

impl ListStyle {
    pub fn is_ordered(self) -> bool {
        !matches!(self, ListStyle::Bullet)
    }

    /// Nesting rank used to decide whether a style reads as a sub-level of another.
    /// Bullets have no rank.
    pub fn rank(self) -> Option<u8> {
        match self {
            ListStyle::Numeric => Some(0),
            ListStyle::LowerAlpha | ListStyle::UpperAlpha => Some(1),
            ListStyle::LowerRoman | ListStyle::UpperRoman => Some(2),
            ListStyle::Bullet => None,
        }
    }

    /// Repeated AsciiDoc marker for a list at `depth` (`.`, `..`, `*`, `**`, ...).
    /// Levels past [`ASCIIDOC_MAX_LIST_DEPTH`] share the deepest marker.
    pub fn asciidoc_marker(self, depth: usize) -> String {
        let marker = if self.is_ordered() { "." } else { "*" };
        marker.repeat((depth + 1).min(ASCIIDOC_MAX_LIST_DEPTH))
    }

    /// AsciiDoc list style attribute, `None` for the renderer default
    pub fn asciidoc_style(self) -> Option<&'static str> {
        match self {
            ListStyle::LowerAlpha => Some("loweralpha"),
            ListStyle::UpperAlpha => Some("upperalpha"),
            ListStyle::LowerRoman => Some("lowerroman"),
            ListStyle::UpperRoman => Some("upperroman"),
            ListStyle::Numeric | ListStyle::Bullet => None,
        }
    }

    /// CSS `list-style-type` value
    pub fn css_type(self) -> &'static str {
        match self {
            ListStyle::Numeric => "decimal",
            ListStyle::LowerAlpha => "lower-alpha",
            ListStyle::UpperAlpha => "upper-alpha",
            ListStyle::LowerRoman => "lower-roman",
            ListStyle::UpperRoman => "upper-roman",
            ListStyle::Bullet => "disc",
        }
    }

    /// Parse a CSS `list-style-type` or HTML `type` attribute value
    pub fn from_hint(hint: &str) -> Option<Self> {
        match hint.trim() {
            "a" => return Some(ListStyle::LowerAlpha),
            "A" => return Some(ListStyle::UpperAlpha),
            "i" => return Some(ListStyle::LowerRoman),
            "I" => return Some(ListStyle::UpperRoman),
            "1" => return Some(ListStyle::Numeric),
            _ => {}
        }
        match hint.trim().to_ascii_lowercase().as_str() {
            "lower-alpha" | "lower-latin" | "loweralpha" => Some(ListStyle::LowerAlpha),
            "upper-alpha" | "upper-latin" | "upperalpha" => Some(ListStyle::UpperAlpha),
            "lower-roman" | "lowerroman" => Some(ListStyle::LowerRoman),
            "upper-roman" | "upperroman" => Some(ListStyle::UpperRoman),
            "decimal" | "decimal-leading-zero" | "arabic" => Some(ListStyle::Numeric),
            "disc" | "circle" | "square" | "none" => Some(ListStyle::Bullet),
            _ => None,
        }
    }
}

/// A list with its structural depth (outermost list = 0)
#[derive(Debug, Clone, PartialEq)]
pub struct List {
    pub style: ListStyle,
    pub depth: usize,
    pub start: u32,
    pub items: Vec<ListItem>,
}

impl List {
    pub fn asciidoc_marker(&self) -> String {
        self.style.asciidoc_marker(self.depth)
    }
}

/// A list item containing blocks
#[derive(Debug, Clone, PartialEq)]
pub struct ListItem {
    pub content: Vec<Block>,
}

impl ListItem {
    pub fn new(content: Vec<Block>) -> Self {
        Self { content }
    }

    pub fn from_inlines(inlines: Vec<Inline>) -> Self {
        Self {
            content: vec![Block::Paragraph(inlines)],
        }
    }
}

/// Admonition categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmonitionKind {
    Note,
    Tip,
    Important,
    Warning,
    Caution,
}

impl AdmonitionKind {
    /// AsciiDoc label (`NOTE`, `TIP`, ...)
    pub fn label(self) -> &'static str {
        match self {
            AdmonitionKind::Note => "NOTE",
            AdmonitionKind::Tip => "TIP",
            AdmonitionKind::Important => "IMPORTANT",
            AdmonitionKind::Warning => "WARNING",
            AdmonitionKind::Caution => "CAUTION",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AdmonitionKind::Note => "note",
            AdmonitionKind::Tip => "tip",
            AdmonitionKind::Important => "important",
            AdmonitionKind::Warning => "warning",
            AdmonitionKind::Caution => "caution",
        }
    }

    /// Map a class name or label word to a kind
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().trim_end_matches(':').to_ascii_lowercase();
        let kind = if name.starts_with("note") {
            AdmonitionKind::Note
        } else if name.starts_with("tip") || name.starts_with("hint") {
            AdmonitionKind::Tip
        } else if name.starts_with("important") || name.starts_with("attention") {
            AdmonitionKind::Important
        } else if name.starts_with("warning") || name.starts_with("danger") {
            AdmonitionKind::Warning
        } else if name.starts_with("caution") {
            AdmonitionKind::Caution
        } else {
            return None;
        };
        Some(kind)
    }
}

/// Image reference
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Image {
    pub src: String,
    pub alt: String,
    pub title: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// Source class attribute, kept for classification
    pub class: Option<String>,
}

/// Table with rows of cells
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub title: Option<Vec<Inline>>,
    pub rows: Vec<TableRow>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TableRow {
    pub cells: Vec<TableCell>,
    pub header: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableCell {
    pub content: Vec<Block>,
    pub colspan: u32,
    pub rowspan: u32,
    pub header: bool,
}

impl TableCell {
    pub fn new(content: Vec<Block>) -> Self {
        Self {
            content,
            colspan: 1,
            rowspan: 1,
            header: false,
        }
    }

    /// Cell content is a single paragraph (or nothing)
    pub fn is_simple(&self) -> bool {
        match self.content.as_slice() {
            [] | [Block::Paragraph(_)] => true,
            _ => false,
        }
    }

    /// Inline content of a simple cell
    pub fn inlines(&self) -> &[Inline] {
        match self.content.as_slice() {
            [Block::Paragraph(inlines)] => inlines,
            _ => &[],
        }
    }

    pub fn text_len(&self) -> usize {
        self.content.iter().map(|b| b.plain_text().chars().count()).sum()
    }
}

impl Table {
    /// Number of grid columns, accounting for colspans
    pub fn column_count(&self) -> usize {
        let mut grid = TableGrid::new();
        for row in &self.rows {
            grid.place_row(row);
        }
        grid.width.max(1)
    }

    /// Leading rows marked as header
    pub fn header_rows(&self) -> usize {
        self.rows.iter().take_while(|r| r.header).count()
    }
}

/// Occupancy grid for laying out cells with row and column spans.
///
/// `place_row` returns the starting column of each cell in the row.
#[derive(Debug, Default)]
pub struct TableGrid {
    /// Remaining rowspan per column carried into the next row
    carry: Vec<u32>,
    pub width: usize,
}

impl TableGrid {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn place_row(&mut self, row: &TableRow) -> Vec<usize> {
        let mut occupied: Vec<bool> = self.carry.iter().map(|&c| c > 0).collect();
        let mut positions = Vec::with_capacity(row.cells.len());
        let mut col = 0;

        for cell in &row.cells {
            while occupied.get(col).copied().unwrap_or(false) {
                col += 1;
            }
            positions.push(col);
            let span = cell.colspan.max(1) as usize;
            for c in col..col + span {
                if c >= occupied.len() {
                    occupied.resize(c + 1, false);
                    self.carry.resize(c + 1, 0);
                }
                occupied[c] = true;
                if cell.rowspan > 1 {
                    self.carry[c] = self.carry[c].max(cell.rowspan);
                }
            }
            col += span;
        }

        self.width = self.width.max(occupied.len());
        for c in self.carry.iter_mut() {
            *c = c.saturating_sub(1);
        }
        positions
    }

    /// Columns still covered by a rowspan from an earlier row
    pub fn covered_columns(&self) -> Vec<usize> {
        self.carry
            .iter()
            .enumerate()
            .filter(|(_, &c)| c > 0)
            .map(|(i, _)| i)
            .collect()
    }
}

/// A definition list entry
#[derive(Debug, Clone, PartialEq)]
pub struct DefinitionItem {
    pub term: Vec<Inline>,
    pub definition: Vec<Block>,
}

/// Resolved link destination
#[derive(Debug, Clone, PartialEq)]
pub enum LinkTarget {
    /// Absolute URL (`https://…`)
    External(String),
    /// Another topic; `path` has its source extension removed
    Document {
        path: String,
        fragment: Option<String>,
    },
    /// Anchor in the current document
    Anchor(String),
    /// Any other relative file (PDF, ZIP, ...)
    File(String),
    /// `mailto:` address
    Email(String),
}

impl LinkTarget {
    /// Href for a document target using the emitter's file extension
    pub fn href(&self, extension: &str) -> String {
        match self {
            LinkTarget::External(url) | LinkTarget::File(url) => url.clone(),
            LinkTarget::Document { path, fragment } => match fragment {
                Some(f) => format!("{}{}#{}", path, extension, f),
                None => format!("{}{}", path, extension),
            },
            LinkTarget::Anchor(id) => format!("#{}", id),
            LinkTarget::Email(addr) => format!("mailto:{}", addr),
        }
    }
}

/// An inline document node
#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    /// Plain text
    Text(String),

    /// Strong emphasis (bold)
    Strong(Vec<Inline>),

    /// Emphasis (italic)
    Emphasis(Vec<Inline>),

    Underline(Vec<Inline>),

    Strikethrough(Vec<Inline>),

    Superscript(Vec<Inline>),

    Subscript(Vec<Inline>),

    /// Inline code
    Code(String),

    /// Keyboard shortcut
    Keyboard(String),

    /// Link with text, target, and optional title
    Link {
        content: Vec<Inline>,
        target: LinkTarget,
        title: Option<String>,
    },

    /// Image inside running text
    Image(Image),

    /// Anchor point (`id`/`name` without href)
    Anchor(String),

    /// Named variable placeholder; `value` is the resolved text
    Variable { name: String, value: String },

    /// Hard line break
    LineBreak,

    /// Raw HTML inline
    HtmlInline(String),
}

impl Block {
    /// Check if this block is empty/blank
    pub fn is_blank(&self) -> bool {
        match self {
            Block::Document(blocks) => blocks.iter().all(|b| b.is_blank()),
            Block::Paragraph(inlines) => inlines.iter().all(|i| i.is_blank()),
            Block::Heading { content, .. } => content.iter().all(|i| i.is_blank()),
            Block::BlockQuote(blocks) => blocks.iter().all(|b| b.is_blank()),
            Block::List(list) => list.items.iter().all(|i| i.is_blank()),
            Block::CodeBlock { code, .. } => code.trim().is_empty(),
            Block::Table(table) => table
                .rows
                .iter()
                .all(|r| r.cells.iter().all(|c| c.content.iter().all(|b| b.is_blank()))),
            Block::Image(image) => image.src.is_empty() && image.alt.is_empty(),
            Block::Admonition { content, .. } => content.iter().all(|b| b.is_blank()),
            Block::DefinitionList(items) => items.is_empty(),
            Block::Collapsible { title, content } => {
                title.iter().all(|i| i.is_blank()) && content.iter().all(|b| b.is_blank())
            }
            Block::ThematicBreak | Block::Include { .. } => false,
            Block::HtmlBlock(html) => html.trim().is_empty(),
        }
    }

    /// Visible text of this block, blocks separated by newlines
    pub fn plain_text(&self) -> String {
        match self {
            Block::Document(blocks) | Block::BlockQuote(blocks) => blocks_text(blocks),
            Block::Admonition { content, .. } => blocks_text(content),
            Block::Paragraph(inlines) | Block::Heading { content: inlines, .. } => {
                inlines_text(inlines)
            }
            Block::List(list) => list
                .items
                .iter()
                .map(|i| blocks_text(&i.content))
                .collect::<Vec<_>>()
                .join("\n"),
            Block::CodeBlock { code, .. } => code.clone(),
            Block::Table(table) => table
                .rows
                .iter()
                .map(|r| {
                    r.cells
                        .iter()
                        .map(|c| blocks_text(&c.content))
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .collect::<Vec<_>>()
                .join("\n"),
            Block::Image(image) => image.alt.clone(),
            Block::DefinitionList(items) => items
                .iter()
                .map(|i| format!("{}\n{}", inlines_text(&i.term), blocks_text(&i.definition)))
                .collect::<Vec<_>>()
                .join("\n"),
            Block::Collapsible { title, content } => {
                format!("{}\n{}", inlines_text(title), blocks_text(content))
            }
            Block::ThematicBreak | Block::Include { .. } | Block::HtmlBlock(_) => String::new(),
        }
    }

    /// Number of whitespace-separated words of visible text
    pub fn word_count(&self) -> usize {
        self.plain_text().split_whitespace().count()
    }
}

impl ListItem {
    pub fn is_blank(&self) -> bool {
        self.content.iter().all(|b| b.is_blank())
    }
}

impl Inline {
    /// Check if this inline is empty/blank
    pub fn is_blank(&self) -> bool {
        match self {
            Inline::Text(text) => text.trim().is_empty(),
            Inline::Strong(inlines)
            | Inline::Emphasis(inlines)
            | Inline::Underline(inlines)
            | Inline::Strikethrough(inlines)
            | Inline::Superscript(inlines)
            | Inline::Subscript(inlines) => inlines.iter().all(|i| i.is_blank()),
            Inline::Code(code) | Inline::Keyboard(code) => code.is_empty(),
            Inline::Link { content, .. } => content.iter().all(|i| i.is_blank()),
            Inline::Variable { name, .. } => name.is_empty(),
            Inline::Image(_) | Inline::LineBreak | Inline::Anchor(_) => false,
            Inline::HtmlInline(html) => html.trim().is_empty(),
        }
    }

    /// Visible text of this inline
    pub fn plain_text(&self) -> String {
        match self {
            Inline::Text(t) => t.clone(),
            Inline::Strong(inner)
            | Inline::Emphasis(inner)
            | Inline::Underline(inner)
            | Inline::Strikethrough(inner)
            | Inline::Superscript(inner)
            | Inline::Subscript(inner) => inlines_text(inner),
            Inline::Code(c) | Inline::Keyboard(c) => c.clone(),
            Inline::Link { content, .. } => inlines_text(content),
            Inline::Image(image) => image.alt.clone(),
            Inline::Variable { value, .. } => value.clone(),
            Inline::LineBreak => "\n".to_string(),
            Inline::Anchor(_) | Inline::HtmlInline(_) => String::new(),
        }
    }
}

/// Plain text of an inline sequence
pub fn inlines_text(inlines: &[Inline]) -> String {
    inlines.iter().map(|i| i.plain_text()).collect()
}

fn blocks_text(blocks: &[Block]) -> String {
    blocks
        .iter()
        .map(|b| b.plain_text())
        .collect::<Vec<_>>()
        .join("\n")
}
