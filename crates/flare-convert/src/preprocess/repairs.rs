//! Built-in list repairs.
//!
//! Flare output often flattens nested steps into sibling lists or plain
//! numbered paragraphs. Each repair below recognises one such shape and
//! restores the nesting the author meant. They run in this order:
//!
//! 1. `wrap-orphan-list-items`
//! 2. `nest-styled-sibling-lists`
//! 3. `nest-lists-after-colon`
//! 4. `nest-text-numbered-paragraphs`
//! 5. `merge-continued-lists`
//! 6. `adopt-sandwiched-single-items`

use flare_core::ListStyle;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::lists::{effective_style, explicit_style, is_continuation, is_list, lead_ends_with_colon, list_start};
use crate::node::{Element, Node};

use super::madcap::CONTINUE_ATTR;
use super::rules::{Filter, RepairRule};

static TEXT_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:(\d{1,3})|([A-Za-z]))[.)]\s+\S").expect("hardcoded text marker regex")
});

static TEXT_MARKER_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:\d{1,3}|[A-Za-z])[.)]\s*").expect("hardcoded text marker regex"));

/// Narrative elements allowed between list fragments
const NARRATIVE: &[&str] = &["p", "div"];

pub(super) fn builtin_rules() -> Vec<(&'static str, RepairRule)> {
    vec![
        (
            "wrap-orphan-list-items",
            RepairRule::new(container(), "wrap <li> found outside a list in <ul>", wrap_orphan_list_items),
        ),
        (
            "nest-styled-sibling-lists",
            RepairRule::new(
                container(),
                "move a sibling list with a deeper marker style into the previous item",
                nest_styled_sibling_lists,
            ),
        ),
        (
            "nest-lists-after-colon",
            RepairRule::new(
                container(),
                "move a list that follows an item ending in ':' into that item",
                nest_lists_after_colon,
            ),
        ),
        (
            "nest-text-numbered-paragraphs",
            RepairRule::new(
                container(),
                "turn paragraphs starting with '1.', 'a)' ... into a list",
                nest_text_numbered_paragraphs,
            ),
        ),
        (
            "merge-continued-lists",
            RepairRule::new(
                container(),
                "merge a list that continues the numbering of an earlier one",
                merge_continued_lists,
            ),
        ),
        (
            "adopt-sandwiched-single-items",
            RepairRule::new(
                container(),
                "nest a single-item list found between narrative and the next list",
                adopt_sandwiched_single_items,
            ),
        ),
    ]
}

fn container() -> Filter {
    Filter::predicate(|el| !is_list(el))
}

/// Rule 1: runs of `<li>` outside any list are wrapped in `<ul>`
pub fn wrap_orphan_list_items(parent: &mut Element) -> usize {
    let mut changes = 0;
    let mut i = 0;
    while i < parent.children.len() {
        if !parent.children[i].is_tag("li") {
            i += 1;
            continue;
        }
        let mut end = i;
        for (k, node) in parent.children.iter().enumerate().skip(i + 1) {
            if node.is_tag("li") {
                end = k;
            } else if !is_skippable(node) {
                break;
            }
        }
        let mut list = Element::new("ul");
        list.children = parent.children.drain(i..=end).filter(Node::is_element).collect();
        parent.children.insert(i, list.into());
        changes += 1;
        i += 1;
    }
    changes
}

/// Rule 2: `<ol>` followed by `<ol style="list-style-type: lower-alpha">`
/// nests the second list in the first list's last item
pub fn nest_styled_sibling_lists(parent: &mut Element) -> usize {
    let mut changes = 0;
    let mut i = 0;
    while i < parent.children.len() {
        let Some(j) = sibling_list_pair(&parent.children, i) else {
            i += 1;
            continue;
        };
        let (Some(prev), Some(next)) = (list_at(&parent.children, i), list_at(&parent.children, j)) else {
            i += 1;
            continue;
        };
        let next_rank = explicit_style(next).and_then(ListStyle::rank);
        if is_continuation(next) || !is_deeper(effective_style(prev).rank(), next_rank) {
            i += 1;
            continue;
        }
        move_into_last_item(&mut parent.children, i, j, next_rank);
        changes += 1;
    }
    changes
}

/// Rule 3: a list directly after an item ending with `:` belongs to that item
pub fn nest_lists_after_colon(parent: &mut Element) -> usize {
    let mut changes = 0;
    let mut i = 0;
    while i < parent.children.len() {
        let Some(j) = sibling_list_pair(&parent.children, i) else {
            i += 1;
            continue;
        };
        let (Some(prev), Some(next)) = (list_at(&parent.children, i), list_at(&parent.children, j)) else {
            i += 1;
            continue;
        };
        let introduces = items(prev)
            .last()
            .is_some_and(|li| lead_ends_with_colon(li) && !has_nested_list(li));
        if !introduces || is_continuation(next) {
            i += 1;
            continue;
        }
        move_into_last_item(&mut parent.children, i, j, None);
        changes += 1;
    }
    changes
}

/// Rule 4: consecutive `<p>1. ...</p><p>2. ...</p>` become a list, nested
/// in the previous list when its last item ends with `:`
pub fn nest_text_numbered_paragraphs(parent: &mut Element) -> usize {
    let mut changes = 0;
    let mut i = 0;
    while i < parent.children.len() {
        let Some(first) = paragraph_marker(&parent.children[i]) else {
            i += 1;
            continue;
        };

        let mut end = i;
        let mut last = first;
        while let Some(k) = next_element(&parent.children, end) {
            match paragraph_marker(&parent.children[k]) {
                Some(marker) if marker.follows(&last) => {
                    last = marker;
                    end = k;
                }
                _ => break,
            }
        }
        let run_len = parent.children[i..=end].iter().filter(|n| n.is_element()).count();

        let host = previous_element(&parent.children, i).filter(|&h| {
            list_at(&parent.children, h)
                .and_then(|list| items(list).last())
                .is_some_and(lead_ends_with_colon)
        });
        if host.is_none() && (run_len < 2 || first.ordinal != 1) {
            i = end + 1;
            continue;
        }

        let parent_style = host
            .and_then(|h| list_at(&parent.children, h))
            .map(effective_style);
        let style = match first.upper {
            Some(true) => ListStyle::UpperAlpha,
            Some(false) => ListStyle::LowerAlpha,
            // Digits under a numbered step are its sub-steps
            None if parent_style == Some(ListStyle::Numeric) => ListStyle::LowerAlpha,
            None => ListStyle::Numeric,
        };

        let mut list = Element::new("ol");
        if let Some(marker_type) = type_attribute(style) {
            list.set_attr("type", marker_type);
        }
        for node in parent.children.drain(i..=end) {
            if let Node::Element(mut paragraph) = node {
                strip_text_marker(&mut paragraph);
                let mut item = Element::new("li");
                item.children = paragraph.children;
                list.add_child(item.into());
            }
        }

        match host {
            Some(h) => {
                parent.children.drain(h + 1..i);
                if let Some(host_list) = parent.children[h].as_element_mut() {
                    adopt(host_list, list.into(), None);
                }
                i = h + 1;
            }
            None => {
                parent.children.insert(i, list.into());
                i += 1;
            }
        }
        changes += 1;
    }
    changes
}

/// Rule 5: `<ol>` (n items), optional narrative, `<ol start="n+1">` merge into
/// one list; the narrative joins the last item
pub fn merge_continued_lists(parent: &mut Element) -> usize {
    let mut changes = 0;
    let mut i = 0;
    while i < parent.children.len() {
        let Some(prev) = list_at(&parent.children, i).filter(|l| l.name == "ol") else {
            i += 1;
            continue;
        };
        let count = items(prev).count() as u32;
        let prev_style = effective_style(prev);
        let start = list_start(prev);

        let mut cursor = i;
        let mut target = None;
        while let Some(k) = next_element(&parent.children, cursor) {
            let Some(el) = parent.children[k].as_element() else { break };
            if el.name == "ol" {
                target = Some(k);
                break;
            }
            if !NARRATIVE.contains(&el.name.as_str()) {
                break;
            }
            cursor = k;
        }
        let Some(k) = target else {
            i += 1;
            continue;
        };
        let Some(next) = list_at(&parent.children, k) else {
            i += 1;
            continue;
        };

        let continues = start.checked_add(count) == Some(list_start(next))
            || next.has_attr(CONTINUE_ATTR)
            || next.has_class("continue");
        let same_style = explicit_style(next).map_or(true, |s| s == prev_style);
        if count == 0 || !continues || !same_style {
            i += 1;
            continue;
        }

        let removed: Vec<Node> = parent.children.drain(i + 1..=k).collect();
        let Some(Node::Element(prev)) = parent.children.get_mut(i) else { break };
        let mut moved_items = Vec::new();
        for node in removed {
            let Node::Element(el) = node else { continue };
            if el.name == "ol" {
                moved_items.extend(el.children.into_iter().filter(Node::is_element));
            } else if let Some(item) = last_item_mut(prev) {
                item.add_child(el.into());
            }
        }
        prev.children.extend(moved_items);
        changes += 1;
    }
    changes
}

/// Rule 6: `<ol>...</ol><p>narrative</p><ol><li>one</li></ol><ol>...` moves
/// the narrative and the single-item list into the first list's last item
pub fn adopt_sandwiched_single_items(parent: &mut Element) -> usize {
    let mut changes = 0;
    let mut i = 0;
    while i < parent.children.len() {
        let Some(host) = list_at(&parent.children, i).filter(|l| l.name == "ol" && items(l).next().is_some())
        else {
            i += 1;
            continue;
        };
        let host_style = effective_style(host);

        let mut cursor = i;
        let mut narrative = 0;
        let mut single = None;
        while let Some(k) = next_element(&parent.children, cursor) {
            let Some(el) = parent.children[k].as_element() else { break };
            if el.name == "p" {
                narrative += 1;
                cursor = k;
                continue;
            }
            if el.name == "ol" && items(el).count() == 1 && !is_continuation(el) {
                single = Some(k);
            }
            break;
        }
        let Some(s) = single.filter(|_| narrative > 0) else {
            i += 1;
            continue;
        };
        let before_next_list = next_element(&parent.children, s)
            .and_then(|n| list_at(&parent.children, n))
            .is_some_and(|l| l.name == "ol");
        if !before_next_list {
            i += 1;
            continue;
        }

        let removed: Vec<Node> = parent.children.drain(i + 1..=s).collect();
        let Some(Node::Element(host)) = parent.children.get_mut(i) else { break };
        let Some(item) = last_item_mut(host) else { break };
        for node in removed {
            let Node::Element(mut el) = node else { continue };
            if el.name == "ol" && explicit_style(&el).is_none() && host_style == ListStyle::Numeric {
                el.set_attr("type", "a");
            }
            item.add_child(el.into());
        }
        changes += 1;
    }
    changes
}

/// Numbering found at the start of a paragraph's text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TextMarker {
    ordinal: u32,
    /// `None` for digits, `Some(uppercase)` for letters
    upper: Option<bool>,
}

impl TextMarker {
    fn parse(text: &str) -> Option<Self> {
        let caps = TEXT_MARKER.captures(text)?;
        if let Some(digits) = caps.get(1) {
            return Some(Self {
                ordinal: digits.as_str().parse().ok()?,
                upper: None,
            });
        }
        let letter = caps.get(2)?.as_str().chars().next()?;
        Some(Self {
            ordinal: letter.to_ascii_lowercase() as u32 - 'a' as u32 + 1,
            upper: Some(letter.is_ascii_uppercase()),
        })
    }

    fn follows(&self, previous: &TextMarker) -> bool {
        self.upper == previous.upper && self.ordinal == previous.ordinal + 1
    }
}

fn paragraph_marker(node: &Node) -> Option<TextMarker> {
    let el = node.as_element().filter(|el| el.name == "p")?;
    TextMarker::parse(&el.text_content())
}

fn strip_text_marker(element: &mut Element) -> bool {
    for child in element.children.iter_mut() {
        match child {
            Node::Text(text) if !text.trim().is_empty() => {
                *text = TEXT_MARKER_PREFIX.replace(text, "").into_owned();
                return true;
            }
            Node::Element(el) => {
                if strip_text_marker(el) {
                    return true;
                }
            }
            _ => {}
        }
    }
    false
}

fn type_attribute(style: ListStyle) -> Option<&'static str> {
    match style {
        ListStyle::LowerAlpha => Some("a"),
        ListStyle::UpperAlpha => Some("A"),
        ListStyle::LowerRoman => Some("i"),
        ListStyle::UpperRoman => Some("I"),
        ListStyle::Numeric | ListStyle::Bullet => None,
    }
}

fn is_skippable(node: &Node) -> bool {
    match node {
        Node::Text(t) => t.trim().is_empty(),
        Node::Comment(_) => true,
        Node::Element(_) => false,
    }
}

/// Next element child after `from`, looking past whitespace and comments only
fn next_element(children: &[Node], from: usize) -> Option<usize> {
    for (k, node) in children.iter().enumerate().skip(from + 1) {
        if node.is_element() {
            return Some(k);
        }
        if !is_skippable(node) {
            return None;
        }
    }
    None
}

fn previous_element(children: &[Node], before: usize) -> Option<usize> {
    for k in (0..before).rev() {
        if children[k].is_element() {
            return Some(k);
        }
        if !is_skippable(&children[k]) {
            return None;
        }
    }
    None
}

fn list_at(children: &[Node], index: usize) -> Option<&Element> {
    children.get(index)?.as_element().filter(|el| is_list(el))
}

/// Index of the list right after the list at `i`, when both are lists
fn sibling_list_pair(children: &[Node], i: usize) -> Option<usize> {
    let prev = list_at(children, i)?;
    items(prev).next()?;
    let j = next_element(children, i)?;
    list_at(children, j).map(|_| j)
}

fn is_deeper(parent: Option<u8>, child: Option<u8>) -> bool {
    matches!((parent, child), (Some(p), Some(c)) if c > p)
}

fn items(list: &Element) -> impl Iterator<Item = &Element> {
    list.element_children().filter(|el| el.name == "li")
}

fn last_item_mut(list: &mut Element) -> Option<&mut Element> {
    list.children
        .iter_mut()
        .rev()
        .filter_map(Node::as_element_mut)
        .find(|el| el.name == "li")
}

fn has_nested_list(item: &Element) -> bool {
    item.element_children().any(is_list)
}

/// Remove the list at `j` (and the whitespace before it) and append it to
/// the last item of the list at `i`
fn move_into_last_item(children: &mut Vec<Node>, i: usize, j: usize, rank: Option<u8>) {
    let moved = children.remove(j);
    children.drain(i + 1..j);
    if let Some(host) = children[i].as_element_mut() {
        adopt(host, moved, rank);
    }
}

/// Append `node` to the last item of `list`, descending into a trailing nested
/// list whose rank is still above `rank`
fn adopt(list: &mut Element, node: Node, rank: Option<u8>) {
    let Some(item) = last_item_mut(list) else {
        list.add_child(node);
        return;
    };
    if let Some(k) = item.children.iter().rposition(Node::is_element) {
        if let Node::Element(inner) = &mut item.children[k] {
            let descend =
                is_list(inner) && items(inner).next().is_some() && is_deeper(effective_style(inner).rank(), rank);
            if descend {
                adopt(inner, node, rank);
                return;
            }
        }
    }
    item.add_child(node);
}
