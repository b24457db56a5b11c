//! Recursive descent parser for the query document language.
//!
//! Supported subset: an optional `query` / `mutation` keyword with optional
//! operation name, nested selection sets, and arguments whose values are
//! integer or string literals. Commas are insignificant and `#` starts a
//! comment. No fragments, variables, aliases or directives.

use std::iter::Peekable;
use std::str::CharIndices;

use super::ast::{Argument, Document, Field, Literal, Operation};

/// Deepest selection-set nesting a document may use.
pub const MAX_DEPTH: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Name(String),
    Int(i64),
    Str(String),
    Punct(char),
}

fn describe(token: &Token) -> String {
    match token {
        Token::Name(n) => format!("name \"{n}\""),
        Token::Int(n) => format!("integer {n}"),
        Token::Str(_) => "string".to_owned(),
        Token::Punct(c) => format!("'{c}'"),
    }
}

/// Parse a query document.
///
/// # Errors
///
/// Returns a descriptive error string if the text is not a valid document
/// or nests deeper than [`MAX_DEPTH`].
pub fn parse(input: &str) -> Result<Document, String> {
    let tokens = tokenize(input)?;
    Parser { tokens, pos: 0 }.document()
}

// =============================================================================
// LEXER
// =============================================================================

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() || c == ',' => {
                chars.next();
            }
            '#' => {
                for (_, c) in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '{' | '}' | '(' | ')' | ':' => {
                chars.next();
                tokens.push(Token::Punct(c));
            }
            '"' => {
                chars.next();
                tokens.push(Token::Str(read_string(&mut chars, offset)?));
            }
            c if c == '-' || c.is_ascii_digit() => {
                let mut text = String::new();
                if c == '-' {
                    text.push('-');
                    chars.next();
                }
                while let Some(&(_, d)) = chars.peek() {
                    if !d.is_ascii_digit() {
                        break;
                    }
                    text.push(d);
                    chars.next();
                }
                let value = text
                    .parse::<i64>()
                    .map_err(|_| format!("Invalid integer \"{text}\" at offset {offset}"))?;
                tokens.push(Token::Int(value));
            }
            c if c == '_' || c.is_ascii_alphabetic() => {
                let mut name = String::new();
                while let Some(&(_, d)) = chars.peek() {
                    if !(d == '_' || d.is_ascii_alphanumeric()) {
                        break;
                    }
                    name.push(d);
                    chars.next();
                }
                tokens.push(Token::Name(name));
            }
            other => return Err(format!("Unexpected character {other:?} at offset {offset}")),
        }
    }
    Ok(tokens)
}

fn read_string(chars: &mut Peekable<CharIndices<'_>>, start: usize) -> Result<String, String> {
    let unterminated = || format!("Unterminated string at offset {start}");
    let mut out = String::new();
    loop {
        match chars.next() {
            None | Some((_, '\n')) => return Err(unterminated()),
            Some((_, '"')) => return Ok(out),
            Some((_, '\\')) => match chars.next() {
                Some((_, '"')) => out.push('"'),
                Some((_, '\\')) => out.push('\\'),
                Some((_, '/')) => out.push('/'),
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, 'r')) => out.push('\r'),
                Some((at, other)) => return Err(format!("Invalid escape \\{other} at offset {at}")),
                None => return Err(unterminated()),
            },
            Some((_, c)) => out.push(c),
        }
    }
}

// =============================================================================
// PARSER
// =============================================================================

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn at(&self, c: char) -> bool {
        self.peek() == Some(&Token::Punct(c))
    }

    fn expect(&mut self, c: char) -> Result<(), String> {
        match self.bump() {
            Some(Token::Punct(p)) if p == c => Ok(()),
            Some(other) => Err(format!("Expected '{c}', found {}", describe(&other))),
            None => Err(format!("Unexpected end of document; expected '{c}'")),
        }
    }

    fn name(&mut self) -> Result<String, String> {
        match self.bump() {
            Some(Token::Name(n)) => Ok(n),
            Some(other) => Err(format!("Expected a name, found {}", describe(&other))),
            None => Err("Unexpected end of document; expected a name".to_owned()),
        }
    }

    fn document(&mut self) -> Result<Document, String> {
        let operation = match self.peek() {
            Some(Token::Name(n)) if n == "query" => Operation::Query,
            Some(Token::Name(n)) if n == "mutation" => Operation::Mutation,
            Some(Token::Punct('{')) => Operation::Query,
            Some(other) => return Err(format!("Expected an operation, found {}", describe(other))),
            None => return Err("Empty query document".to_owned()),
        };
        if !self.at('{') {
            self.pos += 1;
            // Operation name.
            if matches!(self.peek(), Some(Token::Name(_))) {
                self.pos += 1;
            }
        }

        let selection = self.selection_set(1)?;
        if let Some(extra) = self.peek() {
            return Err(format!("Unexpected {} after end of document", describe(extra)));
        }
        Ok(Document { operation, selection })
    }

    fn selection_set(&mut self, depth: usize) -> Result<Vec<Field>, String> {
        if depth > MAX_DEPTH {
            return Err(format!("Query exceeds maximum depth of {MAX_DEPTH}"));
        }
        self.expect('{')?;

        let mut fields = Vec::new();
        loop {
            match self.peek() {
                Some(Token::Punct('}')) => {
                    self.pos += 1;
                    break;
                }
                Some(Token::Name(_)) => fields.push(self.field(depth)?),
                Some(other) => return Err(format!("Expected a field name, found {}", describe(other))),
                None => return Err("Unexpected end of document; expected '}'".to_owned()),
            }
        }

        if fields.is_empty() {
            return Err("Selection set cannot be empty".to_owned());
        }
        Ok(fields)
    }

    fn field(&mut self, depth: usize) -> Result<Field, String> {
        let name = self.name()?;
        let arguments = if self.at('(') { self.arguments()? } else { Vec::new() };
        let selection = if self.at('{') { self.selection_set(depth + 1)? } else { Vec::new() };
        Ok(Field { name, arguments, selection })
    }

    fn arguments(&mut self) -> Result<Vec<Argument>, String> {
        self.expect('(')?;
        let mut arguments = Vec::new();
        while !self.at(')') {
            let name = self.name()?;
            self.expect(':')?;
            let value = match self.bump() {
                Some(Token::Int(n)) => Literal::Int(n),
                Some(Token::Str(s)) => Literal::Str(s),
                Some(other) => return Err(format!("Expected an argument value, found {}", describe(&other))),
                None => return Err("Unexpected end of document in argument list".to_owned()),
            };
            arguments.push(Argument { name, value });
        }
        self.pos += 1;

        if arguments.is_empty() {
            return Err("Argument list cannot be empty".to_owned());
        }
        Ok(arguments)
    }
}
