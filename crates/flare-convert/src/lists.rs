//! List structure resolution.
//!
//! The converter keeps a [`ListContext`] while walking the tree. Entering a
//! list pushes a frame one level deeper than its parent; the frame's style is
//! resolved from explicit markup first, then from the list it continues, then
//! from the parent item, then from the tag.

use flare_core::ListStyle;
use smallvec::SmallVec;

use crate::node::{Element, Node};

/// One open list level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListFrame {
    /// Structural depth, outermost list = 0
    pub depth: usize,
    pub style: ListStyle,
    /// Items entered so far; 1-based once the first item starts
    pub item_index: usize,
    /// Lead text of the current item ends with `:`
    pub lead_ends_with_colon: bool,
}

impl ListFrame {
    /// Repeated AsciiDoc marker for this depth (`.`, `..`, `*`, `**`, ...)
    pub fn asciidoc_marker(&self) -> String {
        self.style.asciidoc_marker(self.depth)
    }
}

/// Stack of open lists for one conversion
#[derive(Debug, Clone, Default)]
pub struct ListContext {
    stack: SmallVec<[ListFrame; 8]>,
    /// Style of the most recently closed list per depth
    closed: SmallVec<[Option<ListStyle>; 8]>,
}

impl ListContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a frame for `list` and return it
    pub fn enter(&mut self, list: &Element) -> ListFrame {
        let depth = self.stack.len();
        let style = self.resolve_style(list, depth);
        let frame = ListFrame {
            depth,
            style,
            item_index: 0,
            lead_ends_with_colon: false,
        };
        tracing::trace!(depth, style = ?style, "entering list");
        self.stack.push(frame);
        frame
    }

    /// Advance to the next item of the innermost list
    pub fn next_item(&mut self, lead_ends_with_colon: bool) {
        if let Some(frame) = self.stack.last_mut() {
            frame.item_index += 1;
            frame.lead_ends_with_colon = lead_ends_with_colon;
        }
    }

    /// Pop the innermost frame
    pub fn exit(&mut self) -> Option<ListFrame> {
        let frame = self.stack.pop()?;
        if self.closed.len() <= frame.depth {
            self.closed.resize(frame.depth + 1, None);
        }
        self.closed[frame.depth] = Some(frame.style);
        self.closed.truncate(frame.depth + 1);
        Some(frame)
    }

    /// Depth a list entered now would get
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn current(&self) -> Option<&ListFrame> {
        self.stack.last()
    }

    fn resolve_style(&self, list: &Element, depth: usize) -> ListStyle {
        if let Some(style) = explicit_style(list) {
            return style;
        }
        if is_continuation(list) {
            if let Some(Some(style)) = self.closed.get(depth) {
                return *style;
            }
        }
        if list.name == "ol" {
            // Numbered sub-steps introduced by "...:" read as a., b., c.
            if let Some(parent) = self.stack.last() {
                if parent.style == ListStyle::Numeric && parent.lead_ends_with_colon {
                    return ListStyle::LowerAlpha;
                }
            }
        }
        default_style(list)
    }
}

/// Style from `style="list-style-type"`, the `type` attribute or a class name
pub fn explicit_style(list: &Element) -> Option<ListStyle> {
    if let Some(style) = list
        .style_property("list-style-type")
        .and_then(ListStyle::from_hint)
    {
        return Some(style);
    }
    if let Some(style) = list.attr("type").and_then(ListStyle::from_hint) {
        return Some(style);
    }
    list.classes().find_map(class_style)
}

fn class_style(class: &str) -> Option<ListStyle> {
    let class = class.to_ascii_lowercase().replace(['-', '_'], "");
    let upper = class.contains("upper");
    if class.contains("alpha") || class.contains("latin") {
        Some(if upper { ListStyle::UpperAlpha } else { ListStyle::LowerAlpha })
    } else if class.contains("roman") {
        Some(if upper { ListStyle::UpperRoman } else { ListStyle::LowerRoman })
    } else {
        None
    }
}

/// Style implied by the tag alone
pub fn default_style(list: &Element) -> ListStyle {
    if list.name == "ul" {
        ListStyle::Bullet
    } else {
        ListStyle::Numeric
    }
}

/// Explicit style or the tag default
pub fn effective_style(list: &Element) -> ListStyle {
    explicit_style(list).unwrap_or_else(|| default_style(list))
}

/// `start` attribute, at least 1
pub fn list_start(list: &Element) -> u32 {
    list.attr("start")
        .and_then(|s| s.trim().parse::<u32>().ok())
        .unwrap_or(1)
        .max(1)
}

/// List that picks up the numbering of an earlier one
pub fn is_continuation(list: &Element) -> bool {
    list_start(list) > 1 || list.has_class("continue") || list.has_attr("data-list-continue")
}

pub fn is_list(element: &Element) -> bool {
    matches!(element.name.as_str(), "ul" | "ol")
}

/// Item text outside nested lists ends with `:` ("Do one of the following:")
pub fn lead_ends_with_colon(item: &Element) -> bool {
    let mut lead = String::new();
    for child in &item.children {
        match child {
            Node::Element(el) if is_list(el) => {}
            other => lead.push_str(&other.text_content()),
        }
    }
    lead.trim_end().ends_with(':')
}
