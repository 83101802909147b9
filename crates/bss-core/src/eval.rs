//! Expression evaluation.
//!
//! Evaluation only resolves variables through the scope chain and hands
//! function calls to a [`FunctionEvaluator`]; values are never computed
//! arithmetically.

use crate::ast::{Expression, FunctionCall};
use crate::diagnostics::Diagnostics;
use crate::scope::Scope;

/// Hook for calls appearing inside expressions, e.g. `darken($c, 10%)`.
pub trait FunctionEvaluator {
    /// Receives the call with its arguments already evaluated.
    fn evaluate_function(&self, call: &FunctionCall) -> Expression;
}

/// Default evaluator: a call renders as its own text.
#[derive(Debug, Default, Clone, Copy)]
pub struct Builtins;

impl FunctionEvaluator for Builtins {
    fn evaluate_function(&self, call: &FunctionCall) -> Expression {
        Expression::Value(call.to_string())
    }
}

impl Expression {
    /// Constant expressions contain no variables and no calls, so they
    /// evaluate to themselves in any scope.
    pub fn is_constant(&self) -> bool {
        match self {
            Expression::Value(_) => true,
            Expression::Variable(_) | Expression::Call(_) => false,
            Expression::List { items, .. } => items.iter().all(Expression::is_constant),
        }
    }

    /// Evaluates against `scope`.
    ///
    /// An unbound variable stays an unresolved `$name` reference, and so does
    /// a variable met again while its own value is being resolved; each such
    /// cycle is reported once per evaluation.
    pub fn eval(
        &self,
        scope: &Scope<'_>,
        engine: &dyn FunctionEvaluator,
        diagnostics: &mut Diagnostics,
    ) -> Expression {
        let mut evaluator = Evaluator {
            engine,
            resolving: Vec::new(),
            cycles: Vec::new(),
        };
        let result = evaluator.eval(self, scope);
        for name in evaluator.cycles {
            diagnostics.warn(format!(
                "Cannot resolve self-referencing variable '${}'",
                name
            ));
        }
        result
    }
}

struct Evaluator<'e> {
    engine: &'e dyn FunctionEvaluator,
    /// Variables whose values are being evaluated, outermost first.
    resolving: Vec<String>,
    cycles: Vec<String>,
}

impl Evaluator<'_> {
    fn eval(&mut self, expression: &Expression, scope: &Scope<'_>) -> Expression {
        match expression {
            Expression::Value(_) => expression.clone(),
            Expression::Variable(name) => {
                if self.resolving.contains(name) {
                    if !self.cycles.contains(name) {
                        self.cycles.push(name.clone());
                    }
                    return expression.clone();
                }
                match scope.lookup(name) {
                    Some((value, defining)) => {
                        self.resolving.push(name.clone());
                        let result = self.eval(value, defining);
                        self.resolving.pop();
                        result
                    }
                    None => {
                        tracing::debug!("undefined variable ${}", name);
                        expression.clone()
                    }
                }
            }
            Expression::Call(call) => {
                let evaluated = FunctionCall {
                    name: call.name.clone(),
                    arguments: call
                        .arguments
                        .iter()
                        .map(|arg| self.eval(arg, scope))
                        .collect(),
                };
                self.engine.evaluate_function(&evaluated)
            }
            Expression::List { separator, items } => Expression::List {
                separator: *separator,
                items: items.iter().map(|item| self.eval(item, scope)).collect(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Separator;

    fn quiet(expression: &Expression, scope: &Scope<'_>) -> Expression {
        expression.eval(scope, &Builtins, &mut Diagnostics::default())
    }

    fn call(name: &str, arguments: Vec<Expression>) -> Expression {
        Expression::Call(FunctionCall {
            name: name.to_string(),
            arguments,
        })
    }

    #[test]
    fn constant_detection() {
        assert!(Expression::value("red").is_constant());
        assert!(!Expression::variable("c").is_constant());
        assert!(!call("rgb", vec![]).is_constant());
        let list = Expression::List {
            separator: Separator::Space,
            items: vec![Expression::value("1px"), Expression::variable("c")],
        };
        assert!(!list.is_constant());
    }

    #[test]
    fn variables_resolve_through_chain() {
        let mut global = Scope::new();
        global.set("base", Expression::value("blue"));
        global.set("main", Expression::variable("base"));

        let mut local = Scope::child(&global);
        local.set("c", Expression::variable("main"));

        let result = quiet(&Expression::variable("c"), &local);
        assert_eq!(result, Expression::value("blue"));
    }

    #[test]
    fn bound_value_evaluates_where_it_was_defined() {
        let mut global = Scope::new();
        global.set("outer", Expression::variable("inner"));

        let mut local = Scope::child(&global);
        local.set("inner", Expression::value("local-only"));

        let result = quiet(&Expression::variable("outer"), &local);
        assert_eq!(result, Expression::variable("inner"));
    }

    #[test]
    fn undefined_variable_is_left_unresolved() {
        let scope = Scope::new();
        let result = quiet(&Expression::variable("nope"), &scope);
        assert_eq!(result.to_string(), "$nope");
    }

    #[test]
    fn self_reference_is_left_unresolved_and_reported() {
        let mut scope = Scope::new();
        scope.set(
            "a",
            Expression::List {
                separator: Separator::Space,
                items: vec![Expression::variable("a"), Expression::value("1px")],
            },
        );
        let mut diagnostics = Diagnostics::default();
        let result = Expression::variable("a").eval(&scope, &Builtins, &mut diagnostics);
        assert_eq!(result.to_string(), "$a 1px");
        let messages: Vec<&str> = diagnostics.entries().iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["Cannot resolve self-referencing variable '$a'"]);
    }

    #[test]
    fn branching_self_reference_terminates() {
        let mut scope = Scope::new();
        scope.set(
            "a",
            Expression::List {
                separator: Separator::Space,
                items: vec![Expression::variable("a"), Expression::variable("a")],
            },
        );
        let mut diagnostics = Diagnostics::default();
        let result = Expression::variable("a").eval(&scope, &Builtins, &mut diagnostics);
        assert_eq!(result.to_string(), "$a $a");
        assert_eq!(diagnostics.entries().len(), 1);
    }

    #[test]
    fn indirect_cycle_is_reported_once() {
        let mut scope = Scope::new();
        scope.set("a", Expression::variable("b"));
        scope.set("b", Expression::variable("a"));
        let mut diagnostics = Diagnostics::default();
        let result = Expression::variable("a").eval(&scope, &Builtins, &mut diagnostics);
        assert_eq!(result, Expression::variable("a"));
        assert_eq!(diagnostics.entries().len(), 1);
    }

    #[test]
    fn repeated_use_is_not_a_cycle() {
        let mut scope = Scope::new();
        scope.set("x", Expression::value("2px"));
        let expr = Expression::List {
            separator: Separator::Space,
            items: vec![Expression::variable("x"), Expression::variable("x")],
        };
        let mut diagnostics = Diagnostics::default();
        assert_eq!(expr.eval(&scope, &Builtins, &mut diagnostics).to_string(), "2px 2px");
        assert!(diagnostics.entries().is_empty());
    }

    #[test]
    fn calls_render_with_evaluated_arguments() {
        let mut scope = Scope::new();
        scope.set("c", Expression::value("#fff"));
        let expr = call("darken", vec![Expression::variable("c"), Expression::value("10%")]);
        assert_eq!(quiet(&expr, &scope), Expression::value("darken(#fff, 10%)"));
    }
}
