//! MadCap variable resolution.
//!
//! Flatten mode replaces `<MadCap:variable name="Set.Name">` with its value.
//! Reference and include modes leave a `<span data-flare-variable="set_name">`
//! placeholder that the converter turns into the target's attribute syntax.

use flare_core::{OutputFormat, VariableMode, VariableOptions};
use serde::Serialize;

use crate::node::{Element, Node};

/// Attribute carrying the placeholder name on resolved variable spans
pub const VARIABLE_ATTR: &str = "data-flare-variable";

/// A variable referenced by the document, reported in include mode
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedVariable {
    /// Flare name, `Set.Name`
    pub name: String,
    /// Placeholder / attribute name, `set_name`
    pub key: String,
    pub value: String,
}

/// Outcome of resolving one variable element
#[derive(Debug)]
pub struct Resolved {
    pub node: Node,
    pub warning: Option<String>,
    pub extracted: Option<ExtractedVariable>,
}

pub struct VariableResolver<'a> {
    options: &'a VariableOptions,
    format: OutputFormat,
}

impl<'a> VariableResolver<'a> {
    pub fn new(options: &'a VariableOptions, format: OutputFormat) -> Self {
        Self { options, format }
    }

    /// Effective mode; Zendesk has no variable syntax and always flattens
    pub fn mode(&self) -> VariableMode {
        match self.format {
            OutputFormat::Zendesk => VariableMode::Flatten,
            _ => self.options.variable_mode,
        }
    }

    pub fn resolve(&self, element: &Element) -> Resolved {
        let name = element.attr_trimmed("name").unwrap_or_default();
        let fallback_text = element.text_content();
        let fallback_text = fallback_text.trim();

        let (value, warning) = match self.lookup(name) {
            Some(value) => (value.to_string(), None),
            None => {
                let value = if !fallback_text.is_empty() {
                    fallback_text.to_string()
                } else {
                    bare_name(name).to_string()
                };
                let warning = format!("Variable '{}' has no value; using '{}'", name, value);
                (value, Some(warning))
            }
        };

        if name.is_empty() || self.mode() == VariableMode::Flatten {
            return Resolved {
                node: Node::Text(value),
                warning,
                extracted: None,
            };
        }

        let key = placeholder_key(name);
        let mut span = Element::with_attrs("span", vec![(VARIABLE_ATTR, key.as_str())]);
        span.add_child(Node::Text(value.clone()));
        let extracted = (self.mode() == VariableMode::Include).then(|| ExtractedVariable {
            name: name.to_string(),
            key,
            value,
        });
        Resolved {
            node: Node::Element(span),
            warning,
            extracted,
        }
    }

    /// Exact key, then case-insensitive key, then the bare name
    fn lookup(&self, name: &str) -> Option<&str> {
        if name.is_empty() {
            return None;
        }
        let variables = &self.options.variables;
        if let Some(value) = variables.get(name) {
            return Some(value.as_str());
        }
        if let Some((_, value)) = variables.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)) {
            return Some(value.as_str());
        }
        let bare = bare_name(name);
        variables
            .iter()
            .find(|(k, _)| bare_name(k).eq_ignore_ascii_case(bare))
            .map(|(_, v)| v.as_str())
    }
}

fn bare_name(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

/// `General.ProductName` becomes `general_product_name`
pub fn placeholder_key(name: &str) -> String {
    name.split('.')
        .map(snake_case)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

fn snake_case(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len() + 4);
    let chars: Vec<char> = segment.chars().collect();
    for (i, &c) in chars.iter().enumerate() {
        if c.is_alphanumeric() {
            if c.is_uppercase() && i > 0 {
                let prev = chars[i - 1];
                let next_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
                if prev.is_lowercase() || prev.is_ascii_digit() || (prev.is_uppercase() && next_lower) {
                    out.push('_');
                }
            }
            out.extend(c.to_lowercase());
        } else if !out.ends_with('_') && !out.is_empty() {
            out.push('_');
        }
    }
    out.trim_end_matches('_').to_string()
}
