//! Parser for `.recipe` files.
//!
//! Recipes are S-expressions with optional named attributes:
//! ```lisp
//! (recipe
//!   (copy "root/start.txt" "out/start.txt")
//!   (instantiate from="App.kt.tmpl" to="src/App.kt")
//!   (dependency "implementation" "com.squareup.okio:okio:3.4.0"))
//! ```
//! `;` starts a line comment. Quoted strings support `\n`, `\t`, `\\`, `\"`.

use crate::ast::Expr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("line {0}: unexpected end of input")]
    UnexpectedEof(u32),
    #[error("line {line}: unexpected character: {ch:?}")]
    UnexpectedChar { line: u32, ch: char },
    #[error("line {0}: unclosed string")]
    UnclosedString(u32),
    #[error("line {0}: unclosed list")]
    UnclosedList(u32),
    #[error("line {0}: attribute is missing a quoted value")]
    BareAttribute(u32),
    #[error("line {0}: trailing content after recipe")]
    TrailingContent(u32),
}

/// Parse a single expression, requiring the whole input to be consumed.
pub fn parse(input: &str) -> Result<Expr, ParseError> {
    let mut scanner = Scanner::new(input);
    let expr = scanner.expr()?;
    scanner.skip_trivia();
    if scanner.peek().is_some() {
        return Err(ParseError::TrailingContent(scanner.line));
    }
    Ok(expr)
}

struct Scanner<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: u32,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
            line: 1,
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next();
        if c == Some('\n') {
            self.line += 1;
        }
        c
    }

    fn skip_trivia(&mut self) {
        loop {
            while self.peek().is_some_and(|c| c.is_whitespace()) {
                self.bump();
            }
            if self.peek() == Some(';') {
                while self.peek().is_some_and(|c| c != '\n') {
                    self.bump();
                }
            } else {
                break;
            }
        }
    }

    fn expr(&mut self) -> Result<Expr, ParseError> {
        self.skip_trivia();
        match self.peek() {
            None => Err(ParseError::UnexpectedEof(self.line)),
            Some('(') => self.list(),
            Some('"') => Ok(Expr::Atom(self.quoted()?)),
            Some(')') => Err(ParseError::UnexpectedChar {
                line: self.line,
                ch: ')',
            }),
            Some(_) => self.symbol_or_attr(),
        }
    }

    fn list(&mut self) -> Result<Expr, ParseError> {
        let open_line = self.line;
        self.bump(); // consume '('
        let mut items = Vec::new();

        loop {
            self.skip_trivia();
            match self.peek() {
                None => return Err(ParseError::UnclosedList(open_line)),
                Some(')') => {
                    self.bump();
                    return Ok(Expr::List(items));
                }
                Some(_) => items.push(self.expr()?),
            }
        }
    }

    fn quoted(&mut self) -> Result<String, ParseError> {
        let open_line = self.line;
        self.bump(); // consume opening '"'
        let mut s = String::new();

        loop {
            match self.bump() {
                None => return Err(ParseError::UnclosedString(open_line)),
                Some('"') => return Ok(s),
                Some('\\') => match self.bump() {
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some('\\') => s.push('\\'),
                    Some('"') => s.push('"'),
                    Some(c) => {
                        s.push('\\');
                        s.push(c);
                    }
                    None => return Err(ParseError::UnclosedString(open_line)),
                },
                Some(c) => s.push(c),
            }
        }
    }

    /// A bare symbol, or a `name="value"` attribute when the symbol is
    /// immediately followed by `=`.
    fn symbol_or_attr(&mut self) -> Result<Expr, ParseError> {
        let mut s = String::new();

        while let Some(c) = self.peek() {
            if c.is_whitespace() || c == '(' || c == ')' || c == '"' || c == ';' || c == '=' {
                break;
            }
            s.push(c);
            self.bump();
        }

        if s.is_empty() {
            return Err(ParseError::UnexpectedChar {
                line: self.line,
                ch: self.peek().unwrap_or(' '),
            });
        }

        if self.peek() == Some('=') {
            self.bump();
            if self.peek() != Some('"') {
                return Err(ParseError::BareAttribute(self.line));
            }
            let value = self.quoted()?;
            return Ok(Expr::Attr(s, value));
        }

        Ok(Expr::Atom(s))
    }
}
