//! Lowering of nested sections into flat rules.
//!
//! Every section with selectors becomes one [`Rule`] whose selectors are the
//! cross product with its parent's; `@media` wrappers only extend the media
//! path that decides which container the nested rules land in.

use crate::ast::{Section, Selector};
use crate::compiler::Compiler;
use crate::eval::FunctionEvaluator;
use crate::rule::{Rule, RuleId};

pub const AMPERSAND: &str = "&";

impl Compiler {
    pub(crate) fn expand(&mut self, media_path: Option<&str>, section: &Section, stack: &[RuleId]) {
        let mut stack = stack.to_vec();
        let mut media_path = media_path.map(str::to_string);

        if section.selectors.is_empty() {
            media_path = Some(self.expand_media_query(media_path.as_deref(), section, &stack));
        } else {
            let id = self.expand_section(media_path.as_deref(), section, &mut stack);
            if self.rules[id.0].selector_string().starts_with('@') {
                // at-rules such as @font-face or @keyframes keep their body nested
                for child in &section.sub_sections {
                    let nested = self.nested_rule(child);
                    self.rules[id.0].children.push(nested);
                }
                return;
            }
        }

        for child in &section.sub_sections {
            self.expand(media_path.as_deref(), child, &stack);
        }
    }

    fn expand_section(
        &mut self,
        media_path: Option<&str>,
        section: &Section,
        stack: &mut Vec<RuleId>,
    ) -> RuleId {
        let id = self.alloc(Rule::from_section(section));
        match media_path {
            None => self.sections.push(id),
            Some(path) => self.add_result_section(path, id),
        }

        let parent_selectors = stack.last().map(|parent| self.rules[parent.0].selectors.clone());
        let mut selectors = Vec::new();
        for selector in &section.selectors {
            match &parent_selectors {
                None => selectors.push(self.expand_selector(id, selector.clone(), None)),
                Some(parents) => {
                    for parent in parents {
                        selectors.push(self.expand_selector(id, selector.clone(), Some(parent)));
                    }
                }
            }
        }
        self.rules[id.0].selectors = selectors;

        stack.push(id);
        id
    }

    fn expand_media_query(
        &mut self,
        media_path: Option<&str>,
        section: &Section,
        stack: &[RuleId],
    ) -> String {
        let query = self.media_query_text(section);
        let path = match media_path {
            None => format!("@media {}", query),
            Some(path) => format!("{} and {}", path, query),
        };

        if !section.attributes.is_empty() {
            self.transfer_implicit_attributes(&path, &query, section, stack);
        }
        path
    }

    fn media_query_text(&mut self, section: &Section) -> String {
        let engine: &dyn FunctionEvaluator = &*self.functions;
        section
            .media_query
            .as_ref()
            .map(|query| query.eval(&self.scope, engine, &mut self.diagnostics).to_string())
            .unwrap_or_default()
    }

    /// Attributes written straight inside `@media` are hosted by a copy of
    /// the nearest enclosing rule's selectors.
    fn transfer_implicit_attributes(
        &mut self,
        path: &str,
        query: &str,
        section: &Section,
        stack: &[RuleId],
    ) {
        let selectors = stack
            .last()
            .map(|parent| self.rules[parent.0].selectors.clone())
            .unwrap_or_default();
        if selectors.is_empty() {
            self.diagnostics.warn(format!(
                "Cannot define attributes in @media selector '{}'",
                query
            ));
            return;
        }

        let mut host = Rule::with_selectors(selectors);
        host.attributes = section.attributes.clone();
        let id = self.alloc(host);
        self.add_result_section(path, id);
    }

    fn add_result_section(&mut self, path: &str, id: RuleId) {
        let container = match self.media_queries.get(path) {
            Some(container) => *container,
            None => {
                let container = self.alloc(Rule::with_selectors(vec![vec![path.to_string()]]));
                self.media_queries.insert(path.to_string(), container);
                container
            }
        };
        self.rules[container.0].children.push(id);
    }

    /// Copies a section below an at-rule without combining selectors.
    fn nested_rule(&mut self, section: &Section) -> RuleId {
        let mut rule = Rule::from_section(section);
        rule.selectors = section.selectors.clone();
        rule.children = section
            .sub_sections
            .iter()
            .map(|child| self.nested_rule(child))
            .collect();
        self.alloc(rule)
    }

    fn expand_selector(
        &mut self,
        id: RuleId,
        mut selector: Selector,
        parent: Option<&Selector>,
    ) -> Selector {
        if let Some(parent) = parent {
            if selector.len() > 1 && !parent.is_empty() && selector[0] == AMPERSAND {
                combine_selectors(&mut selector, parent);
            } else if selector.last().is_some_and(|last| last == AMPERSAND) {
                selector.pop();
                selector.extend(parent.iter().cloned());
            } else {
                selector.splice(0..0, parent.iter().cloned());
            }
        }

        if selector.len() == 1 {
            self.extensible_sections.insert(selector[0].clone(), id);
        }
        selector
    }
}

/// Glues `& x ...` onto the parent: the parent's last part and `x` become one
/// part, e.g. `.btn` with `& --active` gives `.btn--active`.
pub fn combine_selectors(selector: &mut Selector, parent: &[String]) {
    let Some((last_parent, leading)) = parent.split_last() else {
        return;
    };
    if selector.len() < 2 {
        return;
    }
    let rest = selector.split_off(2);
    let first_child = &selector[1];

    let mut combined = leading.to_vec();
    combined.push(format!("{}{}", last_parent, first_child));
    combined.extend(rest);
    *selector = combined;
}

/// Selector of a `@func` template child applied to one caller selector.
/// A trailing `&` is checked before a leading one.
pub fn combine_with_caller(outer: &Selector, inner: &Selector) -> Selector {
    let mut full = outer.clone();
    if outer.last().is_some_and(|last| last == AMPERSAND) {
        full.pop();
        full.extend(inner.iter().cloned());
    } else if outer.first().is_some_and(|first| first == AMPERSAND) {
        combine_selectors(&mut full, inner);
    } else {
        full.splice(0..0, inner.iter().cloned());
    }
    full
}
