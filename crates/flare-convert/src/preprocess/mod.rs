//! HTML preprocessing.
//!
//! Turns a raw Flare topic into a clean [`Element`] tree: text repairs,
//! parsing, metadata removal, conditional-text exclusion, variable and snippet
//! resolution, MadCap element rewriting and the list repair rules.

mod conditions;
pub mod madcap;
pub mod repairs;
pub mod rules;
mod text;
mod variables;

use std::mem;

use flare_core::{ConversionOptions, InputType};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::html::{parse_document, parse_fragment, strip_tags};
use crate::node::{Element, Node};
use crate::Result;

pub use conditions::{split_conditions, ConditionMatcher};
pub use rules::{Filter, RepairRule, RepairRules};
pub use variables::{placeholder_key, ExtractedVariable, VariableResolver, VARIABLE_ATTR};

/// Rule passes before the tree is taken as stable
const MAX_REPAIR_PASSES: usize = 4;

/// Nested snippet expansion limit
const MAX_SNIPPET_DEPTH: usize = 8;

/// MadCap elements that are unwrapped without a warning
const KNOWN_WRAPPERS: &[&str] = &[
    "madcap:toggler",
    "madcap:popup",
    "madcap:popuphead",
    "madcap:popupbody",
    "madcap:conditionaltext",
    "madcap:glossaryterm",
    "madcap:dropdownhead",
    "madcap:dropdownhotspot",
    "madcap:dropdownbody",
    "madcap:expandinghead",
    "madcap:expandingbody",
];

static HIDDEN_SECTIONS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(?:head|script|style|title)\b.*?</(?:head|script|style|title)\s*>")
        .expect("hardcoded hidden section regex")
});

static BUILTIN_REPAIRS: Lazy<RepairRules> = Lazy::new(RepairRules::builtin);

/// Result of preprocessing one document
#[derive(Debug, Clone)]
pub struct PreprocessOutput {
    /// The cleaned `<body>` element
    pub root: Element,
    pub warnings: Vec<String>,
    /// Condition that removed the whole document, if any
    pub excluded: Option<String>,
    /// Conditions whose content was removed, in first-seen order
    pub removed_conditions: Vec<String>,
    /// Variables referenced in include mode
    pub variables: Vec<ExtractedVariable>,
}

impl PreprocessOutput {
    /// Normalised HTML of the body content
    pub fn to_html(&self) -> String {
        self.root.inner_html()
    }
}

#[derive(Debug, Default)]
struct Collected {
    warnings: Vec<String>,
    removed_conditions: Vec<String>,
    variables: Vec<ExtractedVariable>,
    snippet_depth: usize,
}

impl Collected {
    fn warn(&mut self, message: String) {
        if !self.warnings.contains(&message) {
            self.warnings.push(message);
        }
    }
}

/// Preprocessor configured for one set of options
pub struct Preprocessor<'a> {
    options: &'a ConversionOptions,
    conditions: ConditionMatcher,
    variables: VariableResolver<'a>,
    repairs: &'a RepairRules,
}

impl<'a> Preprocessor<'a> {
    /// Preprocessor with the built-in repair rules
    pub fn new(options: &'a ConversionOptions) -> Result<Self> {
        Self::with_repairs(options, &BUILTIN_REPAIRS)
    }

    pub fn with_repairs(options: &'a ConversionOptions, repairs: &'a RepairRules) -> Result<Self> {
        Ok(Self {
            options,
            conditions: ConditionMatcher::new(&options.conditions)?,
            variables: VariableResolver::new(&options.variable_options, options.format),
            repairs,
        })
    }

    /// Preprocess raw markup
    pub fn run(&self, raw: &str) -> PreprocessOutput {
        let repaired = text::repair(raw);
        let parsed = parse_document(&repaired);

        let root_condition = parsed
            .html_attrs
            .get("madcap:conditions")
            .and_then(|c| self.conditions.excluded(c))
            .map(str::to_string);

        let mut body = parsed.body;
        let mut warnings = Vec::new();
        if parsed.errors > 0 {
            tracing::debug!(errors = parsed.errors, "html parser recovered from errors");
            warnings.push(format!(
                "Malformed markup repaired ({} parser error{})",
                parsed.errors,
                if parsed.errors == 1 { "" } else { "s" }
            ));
        }
        if body.is_empty_of_content() {
            let text = strip_tags(&HIDDEN_SECTIONS.replace_all(&repaired, " "));
            if !text.is_empty() {
                let mut paragraph = Element::new("p");
                paragraph.add_child(Node::Text(text));
                body.children = vec![paragraph.into()];
                warnings.push("Document structure could not be parsed; converted as plain text".to_string());
            }
        }

        let mut output = self.run_tree(body);
        warnings.append(&mut output.warnings);
        output.warnings = warnings;
        if root_condition.is_some() {
            output.excluded = root_condition;
        }
        output
    }

    /// Preprocess an already parsed tree; `root` is usually `<body>`
    pub fn run_tree(&self, mut root: Element) -> PreprocessOutput {
        let mut state = Collected::default();
        let had_content = !root.is_empty_of_content();
        let root_condition = root
            .attr("madcap:conditions")
            .and_then(|c| self.conditions.excluded(c))
            .map(str::to_string);

        madcap::strip_attributes(&mut root);
        let children = mem::take(&mut root.children);
        root.children = self.process_children(children, &mut state);

        for pass in 0..MAX_REPAIR_PASSES {
            let applied = self.repairs.apply_all(&mut root);
            if applied.is_empty() {
                break;
            }
            tracing::trace!(pass, rules = applied.len(), "list repair pass changed the tree");
            for (name, changes) in applied {
                let plural = if changes == 1 { "" } else { "s" };
                state.warn(format!("Applied list repair '{}' ({} change{})", name, changes, plural));
            }
        }

        let excluded = root_condition.or_else(|| {
            if had_content && root.is_empty_of_content() {
                state.removed_conditions.first().cloned()
            } else {
                None
            }
        });

        tracing::debug!(
            source = self.options.source(),
            warnings = state.warnings.len(),
            removed = state.removed_conditions.len(),
            excluded = excluded.is_some(),
            "preprocessed document"
        );

        PreprocessOutput {
            root,
            warnings: state.warnings,
            excluded,
            removed_conditions: state.removed_conditions,
            variables: state.variables,
        }
    }

    fn process_children(&self, children: Vec<Node>, state: &mut Collected) -> Vec<Node> {
        let mut out = Vec::with_capacity(children.len());
        for child in children {
            match child {
                Node::Comment(_) => {}
                Node::Text(text) => out.push(Node::Text(text)),
                Node::Element(el) => out.extend(self.process_element(el, state)),
            }
        }
        out
    }

    fn process_element(&self, mut el: Element, state: &mut Collected) -> Vec<Node> {
        if madcap::is_metadata(&el.name) {
            return Vec::new();
        }

        if let Some(condition) = el
            .attr("madcap:conditions")
            .and_then(|c| self.conditions.excluded(c))
        {
            tracing::debug!(element = %el.name, condition, "removed conditional content");
            if !state.removed_conditions.iter().any(|c| c == condition) {
                state.removed_conditions.push(condition.to_string());
            }
            return Vec::new();
        }

        let name = el.name.clone();
        match name.as_str() {
            "madcap:variable" => {
                let resolved = self.variables.resolve(&el);
                if let Some(warning) = resolved.warning {
                    state.warn(warning);
                }
                if let Some(variable) = resolved.extracted {
                    if !state.variables.iter().any(|v| v.name == variable.name) {
                        state.variables.push(variable);
                    }
                }
                return vec![resolved.node];
            }
            name if madcap::is_snippet(name) => return self.snippet(&el, state),
            "madcap:dropdown" => el = madcap::drop_down(el),
            "madcap:expanding" => el = madcap::expanding(el),
            "madcap:xref" => el = madcap::xref(el),
            name if madcap::is_madcap(name) => {
                if self.options.input_type == InputType::Madcap && !KNOWN_WRAPPERS.contains(&name) {
                    state.warn(format!("Unsupported MadCap element '{}' unwrapped", name));
                }
                return self.process_children(el.children, state);
            }
            _ => {}
        }

        madcap::strip_attributes(&mut el);
        let children = mem::take(&mut el.children);
        el.children = self.process_children(children, state);
        vec![Node::Element(el)]
    }

    fn snippet(&self, el: &Element, state: &mut Collected) -> Vec<Node> {
        let src = el.attr_trimmed("src").unwrap_or_default();
        let Some(html) = madcap::find_snippet(&self.options.snippets, src).filter(|_| !src.is_empty()) else {
            state.warn(format!("Snippet '{}' is not available; emitted as an include reference", src));
            return vec![madcap::unresolved_snippet(el).into()];
        };
        if state.snippet_depth >= MAX_SNIPPET_DEPTH {
            state.warn(format!("Snippet '{}' is nested too deeply; not expanded", src));
            return vec![madcap::unresolved_snippet(el).into()];
        }

        let markup = text::repair(html);
        let mut nodes = if markup.contains("<body") || markup.contains("<BODY") {
            parse_document(&markup).body.children
        } else {
            parse_fragment(&markup)
        };
        if el.name == "madcap:snippettext" {
            nodes = unwrap_paragraphs(nodes);
        }

        state.snippet_depth += 1;
        let nodes = self.process_children(nodes, state);
        state.snippet_depth -= 1;
        tracing::trace!(src, nodes = nodes.len(), "expanded snippet");
        nodes
    }
}

/// Inline snippets lose their paragraph wrappers
fn unwrap_paragraphs(nodes: Vec<Node>) -> Vec<Node> {
    let mut out = Vec::with_capacity(nodes.len());
    for node in nodes {
        match node {
            Node::Element(el) if el.name == "p" => out.extend(el.children),
            other => out.push(other),
        }
    }
    out
}

/// Preprocess raw markup with the built-in repair rules
pub fn preprocess(raw: &str, options: &ConversionOptions) -> Result<PreprocessOutput> {
    Ok(Preprocessor::new(options)?.run(raw))
}

/// Preprocess an owned tree with the built-in repair rules
pub fn preprocess_tree(root: Element, options: &ConversionOptions) -> Result<PreprocessOutput> {
    Ok(Preprocessor::new(options)?.run_tree(root))
}
