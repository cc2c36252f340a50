//! Registry of named DOM repair rules.
//!
//! A rule pairs a [`Filter`] choosing the container elements it looks at with
//! a repair that rewrites the container's children and returns how many
//! changes it made. Rules run in registration order, each over the whole tree
//! bottom-up.

use indexmap::IndexMap;

use crate::node::{Element, Node};

use super::repairs;

/// Type alias for repair functions
pub type RepairFn = Box<dyn Fn(&mut Element) -> usize + Send + Sync>;

/// Selects the container elements a repair rule applies to
pub enum Filter {
    /// Match a single tag name
    TagName(String),
    /// Match any of multiple tag names
    TagNames(Vec<String>),
    /// Match using a predicate function
    Predicate(Box<dyn Fn(&Element) -> bool + Send + Sync>),
}

impl Filter {
    pub fn tag(name: &str) -> Self {
        Filter::TagName(name.to_lowercase())
    }

    pub fn tags(names: &[&str]) -> Self {
        Filter::TagNames(names.iter().map(|s| s.to_lowercase()).collect())
    }

    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&Element) -> bool + Send + Sync + 'static,
    {
        Filter::Predicate(Box::new(f))
    }

    /// Every element
    pub fn any() -> Self {
        Self::predicate(|_| true)
    }

    pub fn matches(&self, element: &Element) -> bool {
        match self {
            Filter::TagName(t) => element.name == *t,
            Filter::TagNames(tags) => tags.contains(&element.name),
            Filter::Predicate(f) => f(element),
        }
    }
}

/// A single named structural repair
pub struct RepairRule {
    pub filter: Filter,
    /// One-line description for logs and listings
    pub description: &'static str,
    pub repair: RepairFn,
}

impl RepairRule {
    pub fn new<F>(filter: Filter, description: &'static str, repair: F) -> Self
    where
        F: Fn(&mut Element) -> usize + Send + Sync + 'static,
    {
        Self {
            filter,
            description,
            repair: Box::new(repair),
        }
    }

    /// Run the repair on every matching element below and including `root`,
    /// children before parents
    pub fn apply(&self, root: &mut Element) -> usize {
        let mut changes = 0;
        for child in root.children.iter_mut() {
            if let Node::Element(el) = child {
                changes += self.apply(el);
            }
        }
        if self.filter.matches(root) {
            changes += (self.repair)(root);
        }
        changes
    }
}

/// Ordered collection of repair rules
pub struct RepairRules {
    rules: IndexMap<String, RepairRule>,
}

impl RepairRules {
    /// Empty registry
    pub fn new() -> Self {
        Self { rules: IndexMap::new() }
    }

    /// The built-in list repairs in their fixed order
    pub fn builtin() -> Self {
        let mut rules = Self::new();
        for (name, rule) in repairs::builtin_rules() {
            rules.add(name, rule);
        }
        rules
    }

    /// Append a rule; replacing an existing name keeps its position
    pub fn add(&mut self, name: &str, rule: RepairRule) {
        self.rules.insert(name.to_string(), rule);
    }

    pub fn remove(&mut self, name: &str) -> Option<RepairRule> {
        self.rules.shift_remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&RepairRule> {
        self.rules.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Run every rule once, in order. Returns the rules that changed the
    /// tree with their change counts.
    pub fn apply_all(&self, root: &mut Element) -> Vec<(&str, usize)> {
        let mut applied = Vec::new();
        for (name, rule) in &self.rules {
            let changes = rule.apply(root);
            if changes > 0 {
                tracing::debug!(rule = %name, changes, "applied list repair");
                applied.push((name.as_str(), changes));
            }
        }
        applied
    }
}

impl Default for RepairRules {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_order() {
        let rules = RepairRules::builtin();
        let names: Vec<&str> = rules.names().collect();
        assert_eq!(
            names,
            vec![
                "wrap-orphan-list-items",
                "nest-styled-sibling-lists",
                "nest-lists-after-colon",
                "nest-text-numbered-paragraphs",
                "merge-continued-lists",
                "adopt-sandwiched-single-items",
            ]
        );
    }

    #[test]
    fn test_filter_matching() {
        let ul = Element::new("ul");
        assert!(Filter::tag("UL").matches(&ul));
        assert!(Filter::tags(&["ol", "ul"]).matches(&ul));
        assert!(!Filter::tag("ol").matches(&ul));
        assert!(Filter::predicate(|el| el.children.is_empty()).matches(&ul));
    }

    #[test]
    fn test_custom_rule_runs_bottom_up() {
        let mut rules = RepairRules::new();
        rules.add(
            "drop-empty-spans",
            RepairRule::new(Filter::any(), "remove empty spans", |el| {
                let before = el.children.len();
                el.children
                    .retain(|n| !matches!(n, Node::Element(e) if e.name == "span" && e.children.is_empty()));
                before - el.children.len()
            }),
        );

        let mut inner = Element::new("p");
        inner.add_child(Node::element("span"));
        let mut root = Element::new("div");
        root.add_child(inner.into());
        root.add_child(Node::element("span"));

        let applied = rules.apply_all(&mut root);
        assert_eq!(applied, vec![("drop-empty-spans", 2)]);
        assert_eq!(root.outer_html(), "<div><p></p></div>");
    }

    #[test]
    fn test_remove_rule() {
        let mut rules = RepairRules::builtin();
        assert!(rules.remove("merge-continued-lists").is_some());
        assert_eq!(rules.len(), 5);
        assert!(rules.get("merge-continued-lists").is_none());
    }
}
