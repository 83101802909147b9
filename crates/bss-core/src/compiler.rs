//! Compile session: import resolution, declaration merging, the compiler
//! pass over expanded rules, and pruning.
//!
//! All state of one compile lives in a [`Compiler`]; nothing is global, so
//! independent compiles never interfere.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use indexmap::IndexMap;

use crate::ast::{Attribute, Func, FuncReference, Selector, Stylesheet};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::Result;
use crate::eval::{Builtins, FunctionEvaluator};
use crate::expand::combine_with_caller;
use crate::loader::{with_suffix, SourceLoader, DEFAULT_SUFFIX};
use crate::output::Output;
use crate::parser;
use crate::rule::{FlatRule, Rule, RuleId};
use crate::scope::Scope;

pub struct Compiler {
    loader: Box<dyn SourceLoader>,
    pub(crate) functions: Box<dyn FunctionEvaluator>,
    suffix: String,
    imported_sheets: HashSet<String>,
    funcs: HashMap<String, Rc<Func>>,
    pub(crate) scope: Scope<'static>,
    pub(crate) rules: Vec<Rule>,
    /// Top-level output, in discovery order.
    pub(crate) sections: Vec<RuleId>,
    /// Single-token selectors addressable by `@extend`.
    pub(crate) extensible_sections: HashMap<String, RuleId>,
    /// Media path to container rule, in creation order.
    pub(crate) media_queries: IndexMap<String, RuleId>,
    pub(crate) diagnostics: Diagnostics,
}

impl Compiler {
    pub fn new(loader: impl SourceLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            functions: Box::new(Builtins),
            suffix: DEFAULT_SUFFIX.to_string(),
            imported_sheets: HashSet::new(),
            funcs: HashMap::new(),
            scope: Scope::new(),
            rules: Vec::new(),
            sections: Vec::new(),
            extensible_sections: HashMap::new(),
            media_queries: IndexMap::new(),
            diagnostics: Diagnostics::default(),
        }
    }

    /// Replaces the evaluator used for calls inside expressions.
    pub fn with_functions(mut self, functions: impl FunctionEvaluator + 'static) -> Self {
        self.functions = Box::new(functions);
        self
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = suffix.into();
        self
    }

    /// Loads, parses and imports a stylesheet by logical name. Names that
    /// were already imported are skipped.
    pub fn import_by_name(&mut self, name: &str) -> Result<()> {
        let file = with_suffix(name, &self.suffix);
        if self.imported_sheets.contains(&file) {
            tracing::debug!("{} already imported", file);
            return Ok(());
        }
        let source = self.loader.load(&file).map_err(|err| {
            tracing::error!("Cannot read file {}", file);
            err
        })?;
        let sheet = parser::parse(&file, &source)?;
        self.import_parsed(sheet)
    }

    /// Imports an already parsed stylesheet: its imports first (depth first,
    /// in order), then its functions and variables, then its sections.
    pub fn import_parsed(&mut self, sheet: Stylesheet) -> Result<()> {
        if !self.imported_sheets.insert(sheet.name.clone()) {
            tracing::debug!("{} already imported", sheet.name);
            return Ok(());
        }
        tracing::debug!("importing {}", sheet.name);

        for import in &sheet.imports {
            self.import_by_name(import)?;
        }

        for func in sheet.funcs {
            self.funcs.insert(func.name.clone(), Rc::new(func));
        }

        for variable in sheet.variables {
            if !self.scope.has(&variable.name) || !variable.is_default {
                self.scope.set(variable.name, variable.value);
            } else {
                self.diagnostics.warn(format!(
                    "will skip redundant variable definition: '{}'",
                    variable
                ));
            }
        }

        for section in &sheet.sections {
            self.expand(None, section, &[]);
        }
        Ok(())
    }

    /// Runs the compiler pass and pruning, consuming the session.
    pub fn compile(mut self) -> Compilation {
        let mut ordered: Vec<RuleId> = self.media_queries.values().copied().collect();
        ordered.append(&mut self.sections);
        self.sections = ordered;

        // rules appended by function expansion are already evaluated
        let snapshot = self.sections.clone();
        for id in snapshot {
            self.compile_rule(id);
        }

        let rules = self
            .sections
            .iter()
            .filter_map(|id| self.finish(*id))
            .collect();
        Compilation {
            rules,
            diagnostics: self.diagnostics.into_entries(),
        }
    }

    pub(crate) fn alloc(&mut self, rule: Rule) -> RuleId {
        self.rules.push(rule);
        RuleId(self.rules.len() - 1)
    }

    fn compile_rule(&mut self, id: RuleId) {
        let own_attributes = self.rules[id.0].attributes.len();

        let extends = self.rules[id.0].extends.clone();
        for name in &extends {
            match self.extensible_sections.get(name).copied() {
                Some(target) => {
                    let mut selectors = self.rules[id.0].selectors.clone();
                    selectors.append(&mut self.rules[target.0].selectors);
                    self.rules[target.0].selectors = selectors;
                }
                None => {
                    let selector = self.rules[id.0].selector_string();
                    self.diagnostics.warn(format!(
                        "Skipping unknown @extend '{}' referenced by selector '{}'",
                        name, selector
                    ));
                }
            }
        }

        self.compile_funcs(id);

        let Self {
            rules,
            scope,
            functions,
            diagnostics,
            ..
        } = self;
        let engine: &dyn FunctionEvaluator = &**functions;
        for attr in &mut rules[id.0].attributes[..own_attributes] {
            attr.expression = attr.expression.eval(scope, engine, diagnostics);
        }

        let children = self.rules[id.0].children.clone();
        for child in children {
            self.compile_rule(child);
        }
    }

    fn compile_funcs(&mut self, id: RuleId) {
        let references = self.rules[id.0].references.clone();
        for reference in &references {
            let Some(func) = self.funcs.get(&reference.name).cloned() else {
                let selector = self.rules[id.0].selector_string();
                self.diagnostics.warn(format!(
                    "Skipping unknown @func '{}' referenced by selector '{}'",
                    reference.name, selector
                ));
                return;
            };
            self.compile_func(id, reference, &func);
        }
    }

    fn compile_func(&mut self, id: RuleId, reference: &FuncReference, func: &Func) {
        if func.parameters.len() != reference.parameters.len() {
            let selector = self.rules[id.0].selector_string();
            self.diagnostics.warn(format!(
                "@func call '{}' by selector '{}' does not match expected number of parameters. Found: {}, expected: {}",
                reference.name,
                selector,
                reference.parameters.len(),
                func.parameters.len()
            ));
        }

        let Self {
            rules,
            scope,
            functions,
            sections,
            diagnostics,
            ..
        } = self;
        let scope: &Scope<'static> = scope;
        let engine: &dyn FunctionEvaluator = &**functions;

        // surplus formals stay unbound
        let mut sub_scope = Scope::child(scope);
        for (name, value) in func.parameters.iter().zip(&reference.parameters) {
            sub_scope.set(name.clone(), value.eval(scope, engine, diagnostics));
        }

        for attr in &func.attributes {
            let attr = if attr.expression.is_constant() {
                attr.clone()
            } else {
                let value = attr.expression.eval(&sub_scope, engine, diagnostics);
                Attribute::new(attr.name.clone(), value)
            };
            rules[id.0].attributes.push(attr);
        }

        let callers = rules[id.0].selectors.clone();
        for child in &func.sub_sections {
            let selectors: Vec<Selector> = child
                .selectors
                .iter()
                .flat_map(|outer| callers.iter().map(move |inner| combine_with_caller(outer, inner)))
                .collect();
            let attributes = child
                .attributes
                .iter()
                .map(|attr| {
                    let value = attr.expression.eval(&sub_scope, engine, diagnostics);
                    Attribute::new(attr.name.clone(), value)
                })
                .collect();
            rules.push(Rule {
                selectors,
                attributes,
                ..Rule::default()
            });
            sections.push(RuleId(rules.len() - 1));
        }
    }

    /// Builds the output tree for a rule, dropping rules left without
    /// attributes and children.
    fn finish(&self, id: RuleId) -> Option<FlatRule> {
        let rule = &self.rules[id.0];
        let children: Vec<FlatRule> = rule
            .children
            .iter()
            .filter_map(|child| self.finish(*child))
            .collect();
        if rule.attributes.is_empty() && children.is_empty() {
            tracing::trace!("pruning empty rule '{}'", rule.selector_string());
            return None;
        }
        Some(FlatRule {
            selectors: rule.selectors.clone(),
            attributes: rule.attributes.clone(),
            children,
        })
    }
}

/// Result of a compile: the flat rule list plus every recoverable problem
/// met on the way.
#[derive(Debug, Clone, PartialEq)]
pub struct Compilation {
    pub rules: Vec<FlatRule>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Compilation {
    pub fn generate(&self, out: &mut Output) {
        for rule in &self.rules {
            rule.generate(out);
            out.line_break();
            out.optional_line_break();
        }
    }

    pub fn to_css(&self, minify: bool) -> String {
        let mut out = Output::new(minify);
        self.generate(&mut out);
        out.into_string()
    }
}
