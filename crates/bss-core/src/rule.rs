//! Output rule records.
//!
//! The expander never touches the parsed tree. It builds [`Rule`] records in
//! an arena owned by the compiler and refers to them by [`RuleId`], so extend
//! targets, media containers and the output list can all point at the same
//! record. Once compiled, the arena is turned into a tree of [`FlatRule`]s.

use crate::ast::{selector_string, Attribute, FuncReference, Section, Selector};
use crate::output::Output;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RuleId(pub(crate) usize);

#[derive(Debug, Clone, Default)]
pub(crate) struct Rule {
    pub selectors: Vec<Selector>,
    pub attributes: Vec<Attribute>,
    pub children: Vec<RuleId>,
    pub extends: Vec<String>,
    pub references: Vec<FuncReference>,
}

impl Rule {
    pub fn with_selectors(selectors: Vec<Selector>) -> Self {
        Self {
            selectors,
            ..Self::default()
        }
    }

    /// Copies everything except selectors and children from a parsed section.
    pub fn from_section(section: &Section) -> Self {
        Self {
            selectors: Vec::new(),
            attributes: section.attributes.clone(),
            children: Vec::new(),
            extends: section.extends.clone(),
            references: section.references.clone(),
        }
    }

    pub fn selector_string(&self) -> String {
        selector_string(&self.selectors)
    }
}

/// A compiled rule: selectors, evaluated attributes and, for media
/// containers and at-rules, nested rules.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatRule {
    pub selectors: Vec<Selector>,
    pub attributes: Vec<Attribute>,
    pub children: Vec<FlatRule>,
}

impl FlatRule {
    pub fn selector_string(&self) -> String {
        selector_string(&self.selectors)
    }

    pub fn generate(&self, out: &mut Output) {
        let separator = if out.is_minified() { "," } else { ", " };
        let selectors = self
            .selectors
            .iter()
            .map(|selector| selector.join(" "))
            .collect::<Vec<_>>()
            .join(separator);
        out.output(&selectors);
        out.output(if out.is_minified() { "{" } else { " {" });
        out.optional_line_break();
        out.increase_indent();

        for attr in &self.attributes {
            out.output(&attr.name);
            out.output(if out.is_minified() { ":" } else { ": " });
            out.output(&attr.expression.to_string());
            out.output(";");
            out.optional_line_break();
        }
        for child in &self.children {
            child.generate(out);
            out.optional_line_break();
        }

        out.decrease_indent();
        out.output("}");
    }
}
