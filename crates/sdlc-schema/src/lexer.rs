//! Tokenizer for schema source text.

use crate::ast::Position;
use crate::error::ParseError;

/// Token categories produced by [`tokenize`].
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Name(String),
    Int(String),
    Float(String),
    /// A quoted or block string, already unescaped.
    String(String),
    /// One of `! $ & ( ) : = @ [ ] { | }`.
    Punct(char),
    /// `...`
    Spread,
    Eof,
}

impl TokenKind {
    /// Short description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Name(name) => format!("name '{}'", name),
            TokenKind::Int(text) | TokenKind::Float(text) => format!("number {}", text),
            TokenKind::String(_) => "string".to_string(),
            TokenKind::Punct(c) => format!("'{}'", c),
            TokenKind::Spread => "'...'".to_string(),
            TokenKind::Eof => "end of file".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: Position,
}

/// Splits `source` into tokens. The final token is always [`TokenKind::Eof`].
pub fn tokenize(file: &str, source: &str) -> Result<Vec<Token>, ParseError> {
    Lexer::new(file, source).run()
}

struct Lexer<'a> {
    file: &'a str,
    chars: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
}

impl<'a> Lexer<'a> {
    fn new(file: &'a str, source: &str) -> Self {
        Self {
            file,
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn run(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_ignored();
            let position = self.position();
            let Some(c) = self.peek() else {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    position,
                });
                return Ok(tokens);
            };

            let kind = match c {
                '!' | '$' | '&' | '(' | ')' | ':' | '=' | '@' | '[' | ']' | '{' | '|' | '}' => {
                    self.bump();
                    TokenKind::Punct(c)
                }
                '.' => {
                    if self.peek_at(1) == Some('.') && self.peek_at(2) == Some('.') {
                        self.bump();
                        self.bump();
                        self.bump();
                        TokenKind::Spread
                    } else {
                        return Err(self.error(position, "unexpected character '.'"));
                    }
                }
                '"' => {
                    if self.peek_at(1) == Some('"') && self.peek_at(2) == Some('"') {
                        TokenKind::String(self.block_string(position)?)
                    } else {
                        TokenKind::String(self.string(position)?)
                    }
                }
                c if c == '-' || c.is_ascii_digit() => self.number(position)?,
                c if is_name_start(c) => TokenKind::Name(self.name()),
                c => {
                    return Err(self.error(position, format!("unexpected character {:?}", c)));
                }
            };
            tokens.push(Token { kind, position });
        }
    }

    fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }

    fn error(&self, position: Position, message: impl Into<String>) -> ParseError {
        ParseError::at(self.file, position, message)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        match c {
            '\n' => {
                self.line += 1;
                self.column = 1;
            }
            '\r' => {
                if self.peek() != Some('\n') {
                    self.line += 1;
                    self.column = 1;
                }
            }
            _ => self.column += 1,
        }
        Some(c)
    }

    fn skip_ignored(&mut self) {
        while let Some(c) = self.peek() {
            match c {
                ' ' | '\t' | ',' | '\n' | '\r' | '\u{feff}' => {
                    self.bump();
                }
                '#' => {
                    while let Some(c) = self.peek() {
                        if c == '\n' || c == '\r' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    fn name(&mut self) -> String {
        let mut name = String::new();
        while let Some(c) = self.peek() {
            if is_name_continue(c) {
                name.push(c);
                self.bump();
            } else {
                break;
            }
        }
        name
    }

    fn digits(&mut self, text: &mut String) -> usize {
        let mut count = 0;
        while let Some(c) = self.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            text.push(c);
            self.bump();
            count += 1;
        }
        count
    }

    fn number(&mut self, position: Position) -> Result<TokenKind, ParseError> {
        let mut text = String::new();
        let mut is_float = false;

        if self.peek() == Some('-') {
            text.push('-');
            self.bump();
        }

        if self.peek() == Some('0') {
            text.push('0');
            self.bump();
            if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                return Err(self.error(position, "invalid number: leading zero"));
            }
        } else if self.digits(&mut text) == 0 {
            return Err(self.error(position, "invalid number: expected digit"));
        }

        if self.peek() == Some('.') {
            is_float = true;
            text.push('.');
            self.bump();
            if self.digits(&mut text) == 0 {
                return Err(self.error(position, "invalid number: expected digit after '.'"));
            }
        }

        if let Some(e @ ('e' | 'E')) = self.peek() {
            is_float = true;
            text.push(e);
            self.bump();
            if let Some(sign @ ('+' | '-')) = self.peek() {
                text.push(sign);
                self.bump();
            }
            if self.digits(&mut text) == 0 {
                return Err(self.error(position, "invalid number: expected exponent digits"));
            }
        }

        if let Some(c) = self.peek() {
            if c == '.' || is_name_start(c) {
                return Err(self.error(
                    position,
                    format!("invalid number: unexpected character {:?}", c),
                ));
            }
        }

        Ok(if is_float {
            TokenKind::Float(text)
        } else {
            TokenKind::Int(text)
        })
    }

    fn string(&mut self, position: Position) -> Result<String, ParseError> {
        self.bump();
        let mut value = String::new();
        loop {
            let escape_pos = self.position();
            match self.bump() {
                None | Some('\n') | Some('\r') => {
                    return Err(self.error(position, "unterminated string"));
                }
                Some('"') => return Ok(value),
                Some('\\') => {
                    let c = match self.bump() {
                        Some('"') => '"',
                        Some('\\') => '\\',
                        Some('/') => '/',
                        Some('b') => '\u{8}',
                        Some('f') => '\u{c}',
                        Some('n') => '\n',
                        Some('r') => '\r',
                        Some('t') => '\t',
                        Some('u') => self.unicode_escape(escape_pos)?,
                        other => {
                            return Err(self.error(
                                escape_pos,
                                format!("invalid escape sequence {:?}", other),
                            ));
                        }
                    };
                    value.push(c);
                }
                Some(c) => value.push(c),
            }
        }
    }

    fn unicode_escape(&mut self, position: Position) -> Result<char, ParseError> {
        let mut code = 0u32;
        for _ in 0..4 {
            let digit = self
                .bump()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.error(position, "invalid unicode escape"))?;
            code = code * 16 + digit;
        }
        char::from_u32(code).ok_or_else(|| self.error(position, "invalid unicode escape"))
    }

    fn block_string(&mut self, position: Position) -> Result<String, ParseError> {
        for _ in 0..3 {
            self.bump();
        }
        let mut raw = String::new();
        loop {
            match self.peek() {
                None => return Err(self.error(position, "unterminated block string")),
                Some('"') if self.peek_at(1) == Some('"') && self.peek_at(2) == Some('"') => {
                    for _ in 0..3 {
                        self.bump();
                    }
                    return Ok(block_string_value(&raw));
                }
                Some('\\')
                    if self.peek_at(1) == Some('"')
                        && self.peek_at(2) == Some('"')
                        && self.peek_at(3) == Some('"') =>
                {
                    for _ in 0..4 {
                        self.bump();
                    }
                    raw.push_str("\"\"\"");
                }
                Some(c) => {
                    raw.push(c);
                    self.bump();
                }
            }
        }
    }
}

fn is_name_start(c: char) -> bool {
    c == '_' || c.is_ascii_alphabetic()
}

fn is_name_continue(c: char) -> bool {
    c == '_' || c.is_ascii_alphanumeric()
}

/// Removes the common indentation and surrounding blank lines of a block string.
fn block_string_value(raw: &str) -> String {
    let normalized = raw.replace("\r\n", "\n").replace('\r', "\n");
    let lines: Vec<&str> = normalized.split('\n').collect();

    let common_indent = lines
        .iter()
        .skip(1)
        .filter_map(|line| {
            let indent = line.chars().take_while(|c| *c == ' ' || *c == '\t').count();
            (indent < line.chars().count()).then_some(indent)
        })
        .min()
        .unwrap_or(0);

    let mut out: Vec<String> = lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            if i == 0 {
                line.to_string()
            } else {
                line.chars().skip(common_indent).collect()
            }
        })
        .collect();

    while out.first().is_some_and(|l| l.trim_matches([' ', '\t']).is_empty()) {
        out.remove(0);
    }
    while out.last().is_some_and(|l| l.trim_matches([' ', '\t']).is_empty()) {
        out.pop();
    }

    out.join("\n")
}
