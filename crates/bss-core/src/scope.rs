//! Variable environments.
//!
//! A scope only owns its local bindings; the parent is borrowed, so a chain
//! is built on the stack (global scope, then one child per function call)
//! and torn down with the call that created it.

use std::collections::HashMap;

use crate::ast::Expression;

#[derive(Debug, Default)]
pub struct Scope<'p> {
    parent: Option<&'p Scope<'p>>,
    bindings: HashMap<String, Expression>,
}

impl<'p> Scope<'p> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn child(parent: &'p Scope<'p>) -> Self {
        Self {
            parent: Some(parent),
            bindings: HashMap::new(),
        }
    }

    /// True if the name is bound here or in any parent.
    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&Expression> {
        self.lookup(name).map(|(value, _)| value)
    }

    /// Like [`Scope::get`] but also returns the scope holding the binding,
    /// which is where the bound expression has to be evaluated.
    pub fn lookup(&self, name: &str) -> Option<(&Expression, &Scope<'p>)> {
        let mut current = Some(self);
        while let Some(scope) = current {
            if let Some(value) = scope.bindings.get(name) {
                return Some((value, scope));
            }
            current = scope.parent;
        }
        None
    }

    /// Binds locally, shadowing any parent binding.
    pub fn set(&mut self, name: impl Into<String>, value: Expression) {
        self.bindings.insert(name.into(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_walks_parent_chain() {
        let mut global = Scope::new();
        global.set("color", Expression::value("red"));

        let mut local = Scope::child(&global);
        local.set("width", Expression::value("1px"));

        assert_eq!(local.get("color"), Some(&Expression::value("red")));
        assert_eq!(local.get("width"), Some(&Expression::value("1px")));
        assert!(!global.has("width"));
        assert!(!local.has("missing"));
    }

    #[test]
    fn set_shadows_without_touching_parent() {
        let mut global = Scope::new();
        global.set("color", Expression::value("red"));

        let mut local = Scope::child(&global);
        local.set("color", Expression::value("blue"));

        assert_eq!(local.get("color"), Some(&Expression::value("blue")));
        assert_eq!(global.get("color"), Some(&Expression::value("red")));
    }
}
