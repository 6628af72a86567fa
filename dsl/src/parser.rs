//! Recursive-descent parser for the filter grammar emitted by the compiler and
//! the fluent builder:
//!
//! ```text
//! expr      := and_expr ("OR" and_expr)*
//! and_expr  := primary ("AND" primary)*
//! primary   := "(" expr ")" | predicate
//! predicate := field infix literal | field "@" name "(" [literal ("," literal)*] ")"
//! ```

use super::types::Operator;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Literal {
    String(String),
    Integer(i64),
    Number(f64),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Predicate {
    pub field: String,
    pub operator: Operator,
    pub args: Vec<Literal>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Expr {
    Or(Vec<Expr>),
    And(Vec<Expr>),
    Predicate(Predicate),
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} at position {position}")]
pub struct ParseError {
    pub message: String,
    pub position: usize,
}

impl ParseError {
    fn new(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Infix(Operator),
    Function(String),
    Str(String),
    Integer(i64),
    Number(f64),
    LParen,
    RParen,
    Comma,
    And,
    Or,
}

struct Tokenizer {
    input: Vec<char>,
    pos: usize,
}

impl Tokenizer {
    fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            pos: 0,
        }
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.advance();
        }
    }

    fn read_while<F>(&mut self, predicate: F) -> String
    where
        F: Fn(char) -> bool,
    {
        let mut result = String::new();
        while let Some(ch) = self.peek() {
            if !predicate(ch) {
                break;
            }
            result.push(ch);
            self.advance();
        }
        result
    }

    fn tokenize(&mut self) -> Result<Vec<(Token, usize)>, ParseError> {
        let mut tokens = Vec::new();

        loop {
            self.skip_whitespace();
            let start = self.pos;
            let ch = match self.peek() {
                Some(c) => c,
                None => break,
            };

            let token = match ch {
                '(' => {
                    self.advance();
                    Token::LParen
                }
                ')' => {
                    self.advance();
                    Token::RParen
                }
                ',' => {
                    self.advance();
                    Token::Comma
                }
                '"' | '\'' => Token::Str(self.read_string(ch)?),
                '=' | '!' | '<' | '>' => self.read_infix()?,
                '@' => {
                    self.advance();
                    let name = self.read_while(|c| c.is_ascii_alphabetic());
                    if name.is_empty() {
                        return Err(ParseError::new("Expected function name after '@'", start));
                    }
                    Token::Function(name)
                }
                '-' | '0'..='9' => {
                    let text = self.read_while(|c| {
                        c.is_ascii_digit() || matches!(c, '-' | '+' | '.' | 'e' | 'E')
                    });
                    match text.parse::<i64>() {
                        Ok(integer) => Token::Integer(integer),
                        Err(_) => text.parse::<f64>().map(Token::Number).map_err(|_| {
                            ParseError::new(format!("Invalid number: {}", text), start)
                        })?,
                    }
                }
                _ if ch.is_alphanumeric() || ch == '_' => {
                    let word = self.read_while(|c| c.is_alphanumeric() || c == '_' || c == '.');
                    match word.to_uppercase().as_str() {
                        "AND" => Token::And,
                        "OR" => Token::Or,
                        _ => Token::Ident(word),
                    }
                }
                _ => {
                    return Err(ParseError::new(
                        format!("Unexpected character: {}", ch),
                        start,
                    ))
                }
            };
            tokens.push((token, start));
        }

        Ok(tokens)
    }

    fn read_infix(&mut self) -> Result<Token, ParseError> {
        let start = self.pos;
        let first = self.advance().unwrap_or_default();
        let with_eq = self.peek() == Some('=');
        let operator = match (first, with_eq) {
            ('=', true) => Operator::Eq,
            ('!', true) => Operator::Neq,
            ('>', true) => Operator::Gte,
            ('<', true) => Operator::Lte,
            ('>', false) => Operator::Gt,
            ('<', false) => Operator::Lt,
            _ => {
                return Err(ParseError::new(
                    format!("Unexpected character: {}", first),
                    start,
                ))
            }
        };
        if with_eq {
            self.advance();
        }
        Ok(Token::Infix(operator))
    }

    fn read_string(&mut self, delimiter: char) -> Result<String, ParseError> {
        let start = self.pos;
        self.advance();
        let mut value = String::new();
        loop {
            match self.advance() {
                Some('\\') => match self.advance() {
                    Some('n') => value.push('\n'),
                    Some('r') => value.push('\r'),
                    Some(escaped) => value.push(escaped),
                    None => break,
                },
                Some(c) if c == delimiter => return Ok(value),
                Some(c) => value.push(c),
                None => break,
            }
        }
        Err(ParseError::new("Unterminated string literal", start))
    }
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    end: usize,
}

impl Parser {
    fn new(tokens: Vec<(Token, usize)>, end: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            end,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn position(&self) -> usize {
        self.tokens.get(self.pos).map(|(_, p)| *p).unwrap_or(self.end)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(t, _)| t.clone());
        self.pos += 1;
        token
    }

    fn expect(&mut self, expected: Token, what: &str) -> Result<(), ParseError> {
        let position = self.position();
        match self.advance() {
            Some(token) if token == expected => Ok(()),
            _ => Err(ParseError::new(format!("Expected {}", what), position)),
        }
    }

    fn parse(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_or()?;
        if self.peek().is_some() {
            return Err(ParseError::new("Expected AND or OR", self.position()));
        }
        Ok(expr)
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut terms = vec![self.parse_and()?];
        while matches!(self.peek(), Some(Token::Or)) {
            self.advance();
            terms.push(self.parse_and()?);
        }
        Ok(collapse(terms, Expr::Or))
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut terms = vec![self.parse_primary()?];
        while matches!(self.peek(), Some(Token::And)) {
            self.advance();
            terms.push(self.parse_primary()?);
        }
        Ok(collapse(terms, Expr::And))
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        if matches!(self.peek(), Some(Token::LParen)) {
            self.advance();
            let inner = self.parse_or()?;
            self.expect(Token::RParen, "closing parenthesis")?;
            return Ok(inner);
        }
        self.parse_predicate().map(Expr::Predicate)
    }

    fn parse_predicate(&mut self) -> Result<Predicate, ParseError> {
        let position = self.position();
        let field = match self.advance() {
            Some(Token::Ident(f)) => f,
            _ => return Err(ParseError::new("Expected field name", position)),
        };

        let position = self.position();
        match self.advance() {
            Some(Token::Infix(operator)) => {
                let value = self.parse_literal()?;
                Ok(Predicate {
                    field,
                    operator,
                    args: vec![value],
                })
            }
            Some(Token::Function(name)) => {
                let operator: Operator = format!("@{}", name)
                    .parse()
                    .map_err(|e: String| ParseError::new(e, position))?;
                let args = self.parse_args()?;
                check_arity(operator, args.len())
                    .map_err(|message| ParseError::new(message, position))?;
                Ok(Predicate {
                    field,
                    operator,
                    args,
                })
            }
            _ => Err(ParseError::new("Expected operator", position)),
        }
    }

    fn parse_args(&mut self) -> Result<Vec<Literal>, ParseError> {
        self.expect(Token::LParen, "'('")?;
        let mut args = Vec::new();
        if matches!(self.peek(), Some(Token::RParen)) {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.parse_literal()?);
            let position = self.position();
            match self.advance() {
                Some(Token::Comma) => continue,
                Some(Token::RParen) => return Ok(args),
                _ => return Err(ParseError::new("Expected ',' or ')'", position)),
            }
        }
    }

    fn parse_literal(&mut self) -> Result<Literal, ParseError> {
        let position = self.position();
        match self.advance() {
            Some(Token::Str(s)) => Ok(Literal::String(s)),
            Some(Token::Integer(i)) => Ok(Literal::Integer(i)),
            Some(Token::Number(n)) => Ok(Literal::Number(n)),
            Some(Token::Ident(word)) if word.eq_ignore_ascii_case("true") => Ok(Literal::Bool(true)),
            Some(Token::Ident(word)) if word.eq_ignore_ascii_case("false") => {
                Ok(Literal::Bool(false))
            }
            _ => Err(ParseError::new("Expected value", position)),
        }
    }
}

fn collapse(mut terms: Vec<Expr>, combine: fn(Vec<Expr>) -> Expr) -> Expr {
    if terms.len() == 1 {
        terms.remove(0)
    } else {
        combine(terms)
    }
}

fn check_arity(operator: Operator, count: usize) -> Result<(), String> {
    let ok = match operator {
        Operator::IsNull | Operator::NotNull => count == 0,
        Operator::Between => count == 2,
        Operator::In | Operator::NotIn => count >= 1,
        _ => count == 1,
    };
    if ok {
        Ok(())
    } else {
        Err(format!("Wrong number of arguments for {}", operator))
    }
}

/// Parses a DSL expression. Blank input yields `Ok(None)`.
pub fn parse_query(query: &str) -> Result<Option<Expr>, ParseError> {
    let mut tokenizer = Tokenizer::new(query);
    let tokens = tokenizer.tokenize()?;
    if tokens.is_empty() {
        return Ok(None);
    }
    let mut parser = Parser::new(tokens, query.chars().count());
    parser.parse().map(Some)
}
