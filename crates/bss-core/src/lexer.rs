use crate::error::{Error, Result, Span};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    /// Identifiers, numbers, class/id names, units and any other run of
    /// plain characters.
    Word(String),
    /// `$name`
    Variable(String),
    /// `@name`
    AtKeyword(String),
    /// Quoted string, quotes included.
    Str(String),
    Ampersand,
    Colon,
    Semicolon,
    Comma,
    LBrace,
    RBrace,
    LParen,
    RParen,
    /// `>`, `+` or `~`
    Combinator(char),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    /// Whitespace or a comment separates this token from the previous one.
    pub spaced: bool,
}

impl Token {
    /// Source text of the token as it is re-emitted in selectors and values.
    pub fn text(&self) -> String {
        match &self.kind {
            TokenKind::Word(w) | TokenKind::Str(w) => w.clone(),
            TokenKind::Variable(name) => format!("${}", name),
            TokenKind::AtKeyword(name) => format!("@{}", name),
            TokenKind::Ampersand => "&".to_string(),
            TokenKind::Colon => ":".to_string(),
            TokenKind::Semicolon => ";".to_string(),
            TokenKind::Comma => ",".to_string(),
            TokenKind::LBrace => "{".to_string(),
            TokenKind::RBrace => "}".to_string(),
            TokenKind::LParen => "(".to_string(),
            TokenKind::RParen => ")".to_string(),
            TokenKind::Combinator(c) => c.to_string(),
            TokenKind::Eof => String::new(),
        }
    }
}

fn is_word_char(ch: char) -> bool {
    !ch.is_whitespace()
        && !matches!(
            ch,
            '{' | '}' | ';' | ':' | ',' | '(' | ')' | '&' | '$' | '@' | '"' | '\'' | '>' | '+'
                | '~'
        )
}

pub fn tokenize(sheet: &str, input: &str) -> Result<Vec<Token>> {
    Lexer::new(sheet, input).run()
}

struct Lexer<'a> {
    sheet: &'a str,
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    fn new(sheet: &'a str, input: &str) -> Self {
        Self {
            sheet,
            chars: input.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn span(&self) -> Span {
        Span {
            line: self.line,
            column: self.column,
        }
    }

    fn run(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let spaced = self.skip_trivia()?;
            let span = self.span();
            let Some(ch) = self.bump() else {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    span,
                    spaced: true,
                });
                return Ok(tokens);
            };

            let kind = match ch {
                '{' => TokenKind::LBrace,
                '}' => TokenKind::RBrace,
                ';' => TokenKind::Semicolon,
                ':' => TokenKind::Colon,
                ',' => TokenKind::Comma,
                '(' => TokenKind::LParen,
                ')' => TokenKind::RParen,
                '&' => TokenKind::Ampersand,
                '>' | '+' | '~' => TokenKind::Combinator(ch),
                '"' | '\'' => TokenKind::Str(self.string(ch, span)?),
                '$' => {
                    let name = self.word();
                    if name.is_empty() {
                        return Err(Error::parse(self.sheet, span, "Expected variable name after '$'"));
                    }
                    TokenKind::Variable(name)
                }
                '@' => {
                    let name = self.word();
                    if name.is_empty() {
                        return Err(Error::parse(self.sheet, span, "Expected directive name after '@'"));
                    }
                    TokenKind::AtKeyword(name)
                }
                _ => {
                    let mut word = ch.to_string();
                    word.push_str(&self.word());
                    TokenKind::Word(word)
                }
            };
            tokens.push(Token {
                kind,
                span,
                spaced: spaced || tokens.is_empty(),
            });
        }
    }

    fn word(&mut self) -> String {
        let mut out = String::new();
        while let Some(ch) = self.peek(0) {
            let comment = self.at_line_comment() || (ch == '/' && self.peek(1) == Some('*'));
            if !is_word_char(ch) || comment {
                break;
            }
            out.push(ch);
            self.bump();
        }
        out
    }

    fn string(&mut self, quote: char, start: Span) -> Result<String> {
        let mut out = quote.to_string();
        while let Some(ch) = self.bump() {
            out.push(ch);
            if ch == '\\' {
                if let Some(escaped) = self.bump() {
                    out.push(escaped);
                }
                continue;
            }
            if ch == quote {
                return Ok(out);
            }
        }
        Err(Error::parse(self.sheet, start, "Unterminated string"))
    }

    /// `//` only opens a comment at the start of a line or after whitespace
    /// or a delimiter, so `url(http://...)` stays intact.
    fn at_line_comment(&self) -> bool {
        if self.peek(0) != Some('/') || self.peek(1) != Some('/') {
            return false;
        }
        match self.pos.checked_sub(1).map(|i| self.chars[i]) {
            None => true,
            Some(prev) => prev.is_whitespace() || matches!(prev, ';' | '{' | '}'),
        }
    }

    /// Skips whitespace and comments; returns whether anything was skipped.
    fn skip_trivia(&mut self) -> Result<bool> {
        let mut skipped = false;
        loop {
            match self.peek(0) {
                Some(ch) if ch.is_whitespace() => {
                    self.bump();
                    skipped = true;
                }
                Some('/') if self.peek(1) == Some('*') => {
                    let start = self.span();
                    self.bump();
                    self.bump();
                    loop {
                        match self.bump() {
                            Some('*') if self.peek(0) == Some('/') => {
                                self.bump();
                                break;
                            }
                            Some(_) => {}
                            None => {
                                return Err(Error::parse(self.sheet, start, "Unterminated comment"))
                            }
                        }
                    }
                    skipped = true;
                }
                Some('/') if self.at_line_comment() => {
                    while let Some(ch) = self.peek(0) {
                        if ch == '\n' {
                            break;
                        }
                        self.bump();
                    }
                    skipped = true;
                }
                _ => return Ok(skipped),
            }
        }
    }
}
