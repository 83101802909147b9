use std::fmt;

/// One parsed source file. Never modified after parsing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stylesheet {
    pub name: String,
    pub imports: Vec<String>,
    pub variables: Vec<Variable>,
    pub funcs: Vec<Func>,
    pub sections: Vec<Section>,
}

impl Stylesheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// A selector alternative: the token parts of one comma-separated selector.
pub type Selector = Vec<String>;

/// One nesting level of a stylesheet.
///
/// A section without selectors but with a media query is an `@media`
/// wrapper and is never emitted as a rule of its own.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Section {
    pub selectors: Vec<Selector>,
    pub attributes: Vec<Attribute>,
    pub sub_sections: Vec<Section>,
    pub extends: Vec<String>,
    pub references: Vec<FuncReference>,
    pub media_query: Option<Expression>,
}

impl Section {
    pub fn with_selectors(selectors: Vec<Selector>) -> Self {
        Self {
            selectors,
            ..Self::default()
        }
    }

    pub fn media(query: Expression) -> Self {
        Self {
            media_query: Some(query),
            ..Self::default()
        }
    }

    pub fn selector_string(&self) -> String {
        selector_string(&self.selectors)
    }
}

/// Renders selector alternatives the way they appear in warnings and output.
pub fn selector_string(selectors: &[Selector]) -> String {
    selectors
        .iter()
        .map(|selector| selector.join(" "))
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub expression: Expression,
}

impl Attribute {
    pub fn new(name: impl Into<String>, expression: Expression) -> Self {
        Self {
            name: name.into(),
            expression,
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.expression)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub value: Expression,
    pub is_default: bool,
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}: {}", self.name, self.value)?;
        if self.is_default {
            write!(f, " !default")?;
        }
        Ok(())
    }
}

/// A `@func` template. Applied to the sections that reference it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Func {
    pub name: String,
    pub parameters: Vec<String>,
    pub attributes: Vec<Attribute>,
    pub sub_sections: Vec<Section>,
}

/// A `@func name(args);` call inside a section.
#[derive(Debug, Clone, PartialEq)]
pub struct FuncReference {
    pub name: String,
    pub parameters: Vec<Expression>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Separator {
    Space,
    Comma,
    /// Pieces written without whitespace, e.g. `-$gap` or `(max-width: $bp)`.
    Concat,
}

impl Separator {
    fn as_str(self) -> &'static str {
        match self {
            Separator::Space => " ",
            Separator::Comma => ", ",
            Separator::Concat => "",
        }
    }
}

/// Attribute values, variable values and media queries.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Literal text, emitted as written.
    Value(String),
    /// `$name` reference.
    Variable(String),
    /// `name(args)`; rendered through the engine's function evaluator.
    Call(FunctionCall),
    List {
        separator: Separator,
        items: Vec<Expression>,
    },
}

impl Expression {
    pub fn value(text: impl Into<String>) -> Self {
        Expression::Value(text.into())
    }

    pub fn variable(name: impl Into<String>) -> Self {
        Expression::Variable(name.into())
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Value(text) => f.write_str(text),
            Expression::Variable(name) => write!(f, "${}", name),
            Expression::Call(call) => write!(f, "{}", call),
            Expression::List { separator, items } => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(separator.as_str())?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: Vec<Expression>,
}

impl fmt::Display for FunctionCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, arg) in self.arguments.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", arg)?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_string_joins_tokens_and_alternatives() {
        let selectors = vec![
            vec![".a".to_string(), ">".to_string(), "li".to_string()],
            vec![".b".to_string()],
        ];
        assert_eq!(selector_string(&selectors), ".a > li, .b");
    }

    #[test]
    fn expressions_render_as_source() {
        let expr = Expression::List {
            separator: Separator::Space,
            items: vec![
                Expression::value("1px"),
                Expression::value("solid"),
                Expression::Call(FunctionCall {
                    name: "rgba".to_string(),
                    arguments: vec![Expression::variable("c"), Expression::value("0.5")],
                }),
            ],
        };
        assert_eq!(expr.to_string(), "1px solid rgba($c, 0.5)");
    }

    #[test]
    fn default_variable_renders_flag() {
        let var = Variable {
            name: "gap".to_string(),
            value: Expression::value("4px"),
            is_default: true,
        };
        assert_eq!(var.to_string(), "$gap: 4px !default");
    }
}
