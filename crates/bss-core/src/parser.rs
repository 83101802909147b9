use crate::ast::{
    Attribute, Expression, Func, FuncReference, FunctionCall, Section, Selector, Separator,
    Stylesheet, Variable,
};
use crate::error::{Error, Result};
use crate::lexer::{tokenize, Token, TokenKind};

const DEFAULT_FLAG: &str = "!default";

/// Parses the source of one stylesheet. `name` becomes the sheet's declared
/// name, which is what imports are deduplicated by.
pub fn parse(name: &str, input: &str) -> Result<Stylesheet> {
    let tokens = tokenize(name, input)?;
    Parser {
        sheet: name,
        tokens,
        pos: 0,
    }
    .stylesheet()
}

struct Parser<'a> {
    sheet: &'a str,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn current(&self) -> &Token {
        // the token list always ends with Eof
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn kind(&self) -> &TokenKind {
        &self.current().kind
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn error<T>(&self, message: impl Into<String>) -> Result<T> {
        Err(Error::parse(self.sheet, self.current().span, message))
    }

    fn expect(&mut self, kind: TokenKind, what: &str) -> Result<Token> {
        if *self.kind() == kind {
            Ok(self.advance())
        } else {
            self.error(format!("Expected {} but found '{}'", what, self.current().text()))
        }
    }

    /// Accepts `;`, or nothing when the enclosing block closes right away.
    fn end_of_statement(&mut self) -> Result<()> {
        match self.kind() {
            TokenKind::Semicolon => {
                self.advance();
                Ok(())
            }
            TokenKind::RBrace | TokenKind::Eof => Ok(()),
            _ => self.error(format!("Expected ';' but found '{}'", self.current().text())),
        }
    }

    fn stylesheet(mut self) -> Result<Stylesheet> {
        let mut sheet = Stylesheet::new(self.sheet);
        loop {
            match self.kind().clone() {
                TokenKind::Eof => break,
                TokenKind::Semicolon => {
                    self.advance();
                }
                TokenKind::AtKeyword(keyword) if keyword == "import" => {
                    self.advance();
                    self.import(&mut sheet.imports)?;
                }
                TokenKind::AtKeyword(keyword) if keyword == "func" => {
                    sheet.funcs.push(self.func_definition()?);
                }
                TokenKind::AtKeyword(keyword) if keyword == "media" => {
                    sheet.sections.push(self.media()?);
                }
                TokenKind::Variable(_) => sheet.variables.push(self.variable()?),
                TokenKind::AtKeyword(keyword) if !self.block_follows() => {
                    return self.error(format!("Unsupported at-rule statement '@{}'", keyword));
                }
                _ => {
                    if !self.block_follows() {
                        return self.error("Attributes must be declared inside a selector");
                    }
                    sheet.sections.push(self.rule()?);
                }
            }
        }
        Ok(sheet)
    }

    fn import(&mut self, imports: &mut Vec<String>) -> Result<()> {
        loop {
            let token = self.advance();
            match token.kind {
                TokenKind::Str(quoted) => imports.push(quoted[1..quoted.len() - 1].to_string()),
                TokenKind::Word(name) => imports.push(name),
                _ => {
                    return Err(Error::parse(
                        self.sheet,
                        token.span,
                        "Expected stylesheet name after @import",
                    ))
                }
            }
            if *self.kind() == TokenKind::Comma {
                self.advance();
                continue;
            }
            return self.end_of_statement();
        }
    }

    fn variable(&mut self) -> Result<Variable> {
        let TokenKind::Variable(name) = self.advance().kind else {
            return self.error("Expected variable");
        };
        self.expect(TokenKind::Colon, "':' after variable name")?;
        let value = self.value()?;
        let is_default = matches!(self.kind(), TokenKind::Word(w) if w == DEFAULT_FLAG);
        if is_default {
            self.advance();
        }
        self.end_of_statement()?;
        Ok(Variable {
            name,
            value,
            is_default,
        })
    }

    fn func_definition(&mut self) -> Result<Func> {
        let start = self.advance().span;
        let name = self.func_name()?;
        let mut parameters = Vec::new();
        if *self.kind() == TokenKind::LParen {
            self.advance();
            while *self.kind() != TokenKind::RParen {
                match self.advance().kind {
                    TokenKind::Variable(param) => parameters.push(param),
                    _ => return self.error("Expected parameter name like '$name'"),
                }
                if *self.kind() == TokenKind::Comma {
                    self.advance();
                }
            }
            self.advance();
        }
        self.expect(TokenKind::LBrace, "'{' after @func header")?;
        let mut body = Section::default();
        self.block(&mut body)?;
        if !body.extends.is_empty() || !body.references.is_empty() {
            return Err(Error::parse(
                self.sheet,
                start,
                format!("@func '{}' cannot contain @extend or @func calls", name),
            ));
        }
        if body.sub_sections.iter().any(|child| child.selectors.is_empty()) {
            return Err(Error::parse(
                self.sheet,
                start,
                format!("@func '{}' cannot contain @media blocks", name),
            ));
        }
        Ok(Func {
            name,
            parameters,
            attributes: body.attributes,
            sub_sections: body.sub_sections,
        })
    }

    fn func_name(&mut self) -> Result<String> {
        match self.advance().kind {
            TokenKind::Word(name) => Ok(name),
            _ => self.error("Expected function name"),
        }
    }

    fn func_reference(&mut self) -> Result<FuncReference> {
        self.advance();
        let name = self.func_name()?;
        let parameters = if *self.kind() == TokenKind::LParen {
            self.advance();
            self.arguments()?
        } else {
            Vec::new()
        };
        self.end_of_statement()?;
        Ok(FuncReference { name, parameters })
    }

    fn media(&mut self) -> Result<Section> {
        self.advance();
        if *self.kind() == TokenKind::LBrace {
            return self.error("Expected media query");
        }
        let query = self.value()?;
        self.expect(TokenKind::LBrace, "'{' after media query")?;
        let mut section = Section::media(query);
        self.block(&mut section)?;
        Ok(section)
    }

    fn rule(&mut self) -> Result<Section> {
        let selectors = self.selectors()?;
        self.expect(TokenKind::LBrace, "'{'")?;
        let mut section = Section::with_selectors(selectors);
        self.block(&mut section)?;
        Ok(section)
    }

    /// Parses block members up to and including the closing brace.
    fn block(&mut self, section: &mut Section) -> Result<()> {
        loop {
            match self.kind().clone() {
                TokenKind::RBrace => {
                    self.advance();
                    return Ok(());
                }
                TokenKind::Eof => return self.error("Expected '}' before end of file"),
                TokenKind::Semicolon => {
                    self.advance();
                }
                TokenKind::AtKeyword(keyword) if keyword == "extend" => {
                    self.advance();
                    section.extends.push(self.extend_target()?);
                }
                TokenKind::AtKeyword(keyword) if keyword == "func" => {
                    section.references.push(self.func_reference()?);
                }
                TokenKind::AtKeyword(keyword) if keyword == "media" => {
                    section.sub_sections.push(self.media()?);
                }
                TokenKind::AtKeyword(keyword) if keyword == "import" => {
                    return self.error("@import is only allowed at top level");
                }
                TokenKind::Variable(_) => {
                    return self.error("Variables are only allowed at top level");
                }
                TokenKind::AtKeyword(keyword) if !self.block_follows() => {
                    return self.error(format!("Unsupported at-rule statement '@{}'", keyword));
                }
                _ => {
                    if self.block_follows() {
                        section.sub_sections.push(self.rule()?);
                    } else {
                        section.attributes.push(self.attribute()?);
                    }
                }
            }
        }
    }

    /// Whether a `{` comes before the end of the current statement.
    fn block_follows(&self) -> bool {
        let mut depth = 0usize;
        for token in &self.tokens[self.pos..] {
            match token.kind {
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => depth = depth.saturating_sub(1),
                TokenKind::LBrace if depth == 0 => return true,
                TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof if depth == 0 => {
                    return false
                }
                _ => {}
            }
        }
        false
    }

    fn extend_target(&mut self) -> Result<String> {
        let mut target = String::new();
        while !matches!(
            self.kind(),
            TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof
        ) {
            let token = self.advance();
            if token.spaced && !target.is_empty() {
                target.push(' ');
            }
            target.push_str(&token.text());
        }
        if target.is_empty() {
            return self.error("Expected selector after @extend");
        }
        self.end_of_statement()?;
        Ok(target)
    }

    fn selectors(&mut self) -> Result<Vec<Selector>> {
        let mut alternatives: Vec<Vec<Token>> = vec![Vec::new()];
        let mut depth = 0usize;
        loop {
            match self.kind() {
                TokenKind::LBrace | TokenKind::Eof if depth == 0 => break,
                TokenKind::Comma if depth == 0 => {
                    self.advance();
                    alternatives.push(Vec::new());
                    continue;
                }
                TokenKind::LParen => depth += 1,
                TokenKind::RParen => depth = depth.saturating_sub(1),
                _ => {}
            }
            let token = self.advance();
            if let Some(current) = alternatives.last_mut() {
                current.push(token);
            }
        }

        let mut selectors = Vec::with_capacity(alternatives.len());
        for tokens in alternatives {
            if tokens.is_empty() {
                return self.error("Missing selector before '{'");
            }
            selectors.push(selector_parts(&tokens));
        }
        Ok(selectors)
    }

    fn attribute(&mut self) -> Result<Attribute> {
        let mut name = String::new();
        while !matches!(
            self.kind(),
            TokenKind::Colon | TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof
        ) {
            let token = self.advance();
            if token.spaced && !name.is_empty() {
                name.push(' ');
            }
            name.push_str(&token.text());
        }
        if name.is_empty() {
            return self.error("Expected attribute name");
        }
        self.expect(TokenKind::Colon, &format!("':' after attribute '{}'", name))?;
        let expression = self.value()?;
        self.end_of_statement()?;
        Ok(Attribute::new(name, expression))
    }

    fn is_value_end(&self) -> bool {
        match self.kind() {
            TokenKind::Semicolon
            | TokenKind::RBrace
            | TokenKind::LBrace
            | TokenKind::Comma
            | TokenKind::RParen
            | TokenKind::Eof => true,
            TokenKind::Word(w) => w == DEFAULT_FLAG,
            _ => false,
        }
    }

    /// Comma separated list of space separated terms.
    fn value(&mut self) -> Result<Expression> {
        let mut lists = vec![self.space_list()?];
        while *self.kind() == TokenKind::Comma {
            self.advance();
            lists.push(self.space_list()?);
        }
        Ok(collapse(Separator::Comma, lists))
    }

    fn space_list(&mut self) -> Result<Expression> {
        let mut terms = Vec::new();
        while !self.is_value_end() {
            terms.push(self.term()?);
        }
        if terms.is_empty() {
            return self.error(format!("Expected value but found '{}'", self.current().text()));
        }
        Ok(collapse(Separator::Space, terms))
    }

    /// Pieces written without whitespace between them.
    fn term(&mut self) -> Result<Expression> {
        let mut pieces: Vec<Expression> = Vec::new();
        loop {
            for piece in self.piece()? {
                if let (Some(Expression::Value(prev)), Expression::Value(text)) =
                    (pieces.last_mut(), &piece)
                {
                    prev.push_str(text);
                    continue;
                }
                pieces.push(piece);
            }
            if self.is_value_end() || self.current().spaced {
                break;
            }
        }
        Ok(collapse(Separator::Concat, pieces))
    }

    fn piece(&mut self) -> Result<Vec<Expression>> {
        let token = self.advance();
        let piece = match token.kind {
            TokenKind::Variable(name) => Expression::Variable(name),
            TokenKind::Word(name)
                if *self.kind() == TokenKind::LParen && !self.current().spaced =>
            {
                self.advance();
                let arguments = self.arguments()?;
                Expression::Call(FunctionCall { name, arguments })
            }
            TokenKind::LParen => {
                let mut group = vec![Expression::value("(")];
                if *self.kind() != TokenKind::RParen {
                    group.push(self.value()?);
                }
                self.expect(TokenKind::RParen, "')'")?;
                group.push(Expression::value(")"));
                return Ok(group);
            }
            _ => Expression::Value(token.text()),
        };
        Ok(vec![piece])
    }

    /// Call arguments after the opening parenthesis, through the closing one.
    fn arguments(&mut self) -> Result<Vec<Expression>> {
        let mut arguments = Vec::new();
        if *self.kind() == TokenKind::RParen {
            self.advance();
            return Ok(arguments);
        }
        loop {
            arguments.push(self.space_list()?);
            match self.kind() {
                TokenKind::Comma => {
                    self.advance();
                }
                TokenKind::RParen => {
                    self.advance();
                    return Ok(arguments);
                }
                _ => return self.error("Expected ',' or ')' in argument list"),
            }
        }
    }
}

fn collapse(separator: Separator, mut items: Vec<Expression>) -> Expression {
    if items.len() == 1 {
        items.remove(0)
    } else {
        Expression::List { separator, items }
    }
}

/// Splits one selector alternative into its parts: compounds written
/// without whitespace, `&` and combinators each become a part of their own.
/// A leading `&` followed by whitespace means plain nesting and is dropped.
fn selector_parts(tokens: &[Token]) -> Selector {
    let mut parts: Selector = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;

    for token in tokens {
        if depth > 0 {
            if token.spaced {
                current.push(' ');
            }
        } else {
            match token.kind {
                TokenKind::Ampersand | TokenKind::Combinator(_) => {
                    flush(&mut parts, &mut current);
                    parts.push(token.text());
                    continue;
                }
                _ if token.spaced => flush(&mut parts, &mut current),
                _ => {}
            }
        }
        match token.kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => depth = depth.saturating_sub(1),
            _ => {}
        }
        current.push_str(&token.text());
    }
    flush(&mut parts, &mut current);

    let spaced_leading_amp = tokens.len() > 1
        && tokens[0].kind == TokenKind::Ampersand
        && tokens[1].spaced;
    if spaced_leading_amp && parts.len() > 1 {
        parts.remove(0);
    }
    parts
}

fn flush(parts: &mut Selector, current: &mut String) {
    if !current.is_empty() {
        parts.push(std::mem::take(current));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sel(parts: &[&str]) -> Selector {
        parts.iter().map(|p| p.to_string()).collect()
    }

    fn parse_ok(input: &str) -> Stylesheet {
        parse("test.bss", input).expect("parse")
    }

    #[test]
    fn parses_imports_and_variables() {
        let sheet = parse_ok("@import \"base\", mixins;\n$c: blue;\n$gap: 4px !default;");
        assert_eq!(sheet.name, "test.bss");
        assert_eq!(sheet.imports, vec!["base".to_string(), "mixins".to_string()]);
        assert_eq!(
            sheet.variables,
            vec![
                Variable {
                    name: "c".into(),
                    value: Expression::value("blue"),
                    is_default: false,
                },
                Variable {
                    name: "gap".into(),
                    value: Expression::value("4px"),
                    is_default: true,
                },
            ]
        );
    }

    #[test]
    fn splits_selectors_into_parts() {
        let sheet = parse_ok(".a, .b > li, ul li:hover { x: y }");
        assert_eq!(
            sheet.sections[0].selectors,
            vec![sel(&[".a"]), sel(&[".b", ">", "li"]), sel(&["ul", "li:hover"])]
        );
    }

    #[test]
    fn ampersand_is_its_own_part() {
        let sheet = parse_ok(".a { &--c { x: y } &:hover { x: y } .b & { x: y } & .d { x: y } }");
        let children: Vec<_> = sheet.sections[0]
            .sub_sections
            .iter()
            .map(|s| s.selectors[0].clone())
            .collect();
        assert_eq!(
            children,
            vec![
                sel(&["&", "--c"]),
                sel(&["&", ":hover"]),
                sel(&[".b", "&"]),
                sel(&[".d"]),
            ]
        );
    }

    #[test]
    fn parenthesised_selector_stays_one_part() {
        let sheet = parse_ok("li:not(.a, .b) { x: y }");
        assert_eq!(sheet.sections[0].selectors, vec![sel(&["li:not(.a, .b)"])]);
    }

    #[test]
    fn parses_section_members() {
        let sheet = parse_ok(
            ".a {\n  color: $c;\n  @extend .base;\n  @func bordered(1px, red);\n  @media screen { padding: 0 }\n  b { margin: 0 auto }\n}",
        );
        let section = &sheet.sections[0];
        assert_eq!(
            section.attributes,
            vec![Attribute::new("color", Expression::variable("c"))]
        );
        assert_eq!(section.extends, vec![".base".to_string()]);
        assert_eq!(
            section.references,
            vec![FuncReference {
                name: "bordered".into(),
                parameters: vec![Expression::value("1px"), Expression::value("red")],
            }]
        );
        assert_eq!(section.sub_sections.len(), 2);
        assert!(section.sub_sections[0].selectors.is_empty());
        assert!(section.sub_sections[0].media_query.is_some());
        assert_eq!(section.sub_sections[1].attributes[0].expression.to_string(), "0 auto");
    }

    #[test]
    fn parses_func_definition() {
        let sheet = parse_ok("@func box($w, $c) { border: $w solid $c; &:hover { color: $c } }");
        let func = &sheet.funcs[0];
        assert_eq!(func.name, "box");
        assert_eq!(func.parameters, vec!["w".to_string(), "c".to_string()]);
        assert_eq!(func.attributes[0].expression.to_string(), "$w solid $c");
        assert_eq!(func.sub_sections[0].selectors, vec![sel(&["&", ":hover"])]);
    }

    #[test]
    fn parses_values() {
        let sheet = parse_ok(
            "a { font: 12px/1.5 \"Open Sans\", serif; margin: -$gap; background: url(http://x.org/a.png) !important }",
        );
        let attrs = &sheet.sections[0].attributes;
        assert_eq!(attrs[0].expression.to_string(), "12px/1.5 \"Open Sans\", serif");
        assert_eq!(
            attrs[1].expression,
            Expression::List {
                separator: Separator::Concat,
                items: vec![Expression::value("-"), Expression::variable("gap")],
            }
        );
        assert_eq!(
            attrs[2].expression.to_string(),
            "url(http://x.org/a.png) !important"
        );
    }

    #[test]
    fn media_query_keeps_parentheses() {
        let sheet = parse_ok("@media screen and (max-width: $bp) { a { x: y } }");
        let query = sheet.sections[0].media_query.as_ref().expect("query");
        assert_eq!(query.to_string(), "screen and (max-width: $bp)");
        assert!(!query.is_constant());
    }

    #[test]
    fn at_rules_become_sections() {
        let sheet = parse_ok("@font-face { font-family: X; }\n@keyframes spin { from { x: y } }");
        assert_eq!(sheet.sections[0].selectors, vec![sel(&["@font-face"])]);
        assert_eq!(sheet.sections[1].selectors, vec![sel(&["@keyframes", "spin"])]);
        assert_eq!(sheet.sections[1].sub_sections[0].selectors, vec![sel(&["from"])]);
    }

    #[test]
    fn reports_position_of_errors() {
        let err = parse("test.bss", "a {\n  color red;\n}").unwrap_err();
        assert_eq!(
            err.to_string(),
            "test.bss:2:12: Expected ':' after attribute 'color red' but found ';'"
        );
    }

    #[test]
    fn rejects_top_level_attributes() {
        let err = parse("test.bss", "color: red;").unwrap_err();
        assert!(err.to_string().contains("inside a selector"));
    }

    #[test]
    fn rejects_media_inside_func() {
        let err = parse("test.bss", "@func f() {\n  @media print { padding: 0 }\n}").unwrap_err();
        assert_eq!(
            err.to_string(),
            "test.bss:1:1: @func 'f' cannot contain @media blocks"
        );
    }

    #[test]
    fn unknown_at_rule_statement_has_its_own_error() {
        let err = parse("test.bss", "@charset \"UTF-8\";").unwrap_err();
        assert_eq!(err.to_string(), "test.bss:1:1: Unsupported at-rule statement '@charset'");

        let err = parse("test.bss", "a {\n  @apply x;\n}").unwrap_err();
        assert_eq!(err.to_string(), "test.bss:2:3: Unsupported at-rule statement '@apply'");
    }

    #[test]
    fn rejects_unclosed_block() {
        let err = parse("test.bss", "a { color: red;").unwrap_err();
        assert!(err.to_string().contains("Expected '}'"));
    }
}
