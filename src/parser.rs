//! Expression grammar.
//!
//! ```text
//! expr    := and ("||" and)*
//! and     := primary ("&&" primary)*
//! primary := "(" expr ")" | call
//! call    := IDENT "(" string ("," string)* ")"
//! string  := "`" raw "`" | "\"" escaped "\""
//! ```
//!
//! Function names resolve through [`Function::from_alias`], so `Host`,
//! `host`, `HOST` (and `Host`'s title spelling) name the same function.

use crate::ast::Expr;
use crate::error::{GrammarErrorKind, Result, RuleError};
use crate::types::Function;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Str(String),
    LParen,
    RParen,
    Comma,
    And,
    Or,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("identifier '{}'", name),
            Token::Str(s) => format!("string \"{}\"", s),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::Comma => "','".to_string(),
            Token::And => "'&&'".to_string(),
            Token::Or => "'||'".to_string(),
        }
    }
}

/// Parse an expression-grammar rule into the canonical AST.
pub fn parse_expression(rule: &str) -> Result<Expr> {
    if rule.trim().is_empty() {
        return Err(RuleError::grammar(GrammarErrorKind::Empty, "empty rule"));
    }

    let tokens = tokenize(rule)?;
    let mut parser = Parser {
        rule,
        tokens,
        pos: 0,
    };
    let expr = parser.parse_or()?;

    if let Some((offset, token)) = parser.tokens.get(parser.pos) {
        return Err(syntax_error(
            rule,
            *offset,
            format!("unexpected {}", token.describe()),
        ));
    }

    Ok(expr)
}

/// Hostnames referenced by `Host` calls in an expression-grammar rule.
pub fn parse_domains_expression(rule: &str) -> Result<Vec<String>> {
    Ok(parse_expression(rule)?.domains())
}

fn syntax_error(rule: &str, offset: usize, message: impl AsRef<str>) -> RuleError {
    RuleError::grammar(
        GrammarErrorKind::Syntax,
        format!(
            "{} at offset {} in rule '{}'",
            message.as_ref(),
            offset,
            rule
        ),
    )
}

fn tokenize(rule: &str) -> Result<Vec<(usize, Token)>> {
    let mut tokens = Vec::new();
    let mut chars = rule.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push((offset, Token::LParen));
            }
            ')' => {
                chars.next();
                tokens.push((offset, Token::RParen));
            }
            ',' => {
                chars.next();
                tokens.push((offset, Token::Comma));
            }
            '&' | '|' => {
                chars.next();
                match chars.next() {
                    Some((_, next)) if next == c => {
                        let token = if c == '&' { Token::And } else { Token::Or };
                        tokens.push((offset, token));
                    }
                    _ => {
                        return Err(syntax_error(
                            rule,
                            offset,
                            format!("expected '{}{}'", c, c),
                        ))
                    }
                }
            }
            '`' => {
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some((_, '`')) => break,
                        Some((_, c)) => value.push(c),
                        None => return Err(syntax_error(rule, offset, "unterminated string")),
                    }
                }
                tokens.push((offset, Token::Str(value)));
            }
            '"' => {
                chars.next();
                let mut value = String::new();
                loop {
                    match chars.next() {
                        Some((_, '"')) => break,
                        Some((escape_at, '\\')) => match chars.next() {
                            Some((_, '"')) => value.push('"'),
                            Some((_, '\\')) => value.push('\\'),
                            Some((_, 'n')) => value.push('\n'),
                            Some((_, 't')) => value.push('\t'),
                            Some((_, other)) => {
                                return Err(syntax_error(
                                    rule,
                                    escape_at,
                                    format!("unknown escape '\\{}'", other),
                                ))
                            }
                            None => {
                                return Err(syntax_error(rule, offset, "unterminated string"))
                            }
                        },
                        Some((_, c)) => value.push(c),
                        None => return Err(syntax_error(rule, offset, "unterminated string")),
                    }
                }
                tokens.push((offset, Token::Str(value)));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut name = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        name.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push((offset, Token::Ident(name)));
            }
            other => {
                return Err(syntax_error(
                    rule,
                    offset,
                    format!("unexpected character '{}'", other),
                ))
            }
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    rule: &'a str,
    tokens: Vec<(usize, Token)>,
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(_, t)| t)
    }

    /// Offset of the current token, or the end of the rule.
    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(o, _)| *o)
            .unwrap_or(self.rule.len())
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(_, t)| t.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> Result<()> {
        let offset = self.offset();
        match self.next() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(syntax_error(
                self.rule,
                offset,
                format!("expected {}, found {}", expected.describe(), token.describe()),
            )),
            None => Err(syntax_error(
                self.rule,
                offset,
                format!("expected {}, found end of rule", expected.describe()),
            )),
        }
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.next();
            let right = self.parse_and()?;
            left = Expr::or(left, right);
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_primary()?;
        while self.peek() == Some(&Token::And) {
            self.next();
            let right = self.parse_primary()?;
            left = Expr::and(left, right);
        }
        Ok(left)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let offset = self.offset();
        match self.next() {
            Some(Token::LParen) => {
                let expr = self.parse_or()?;
                self.expect(Token::RParen)?;
                Ok(expr)
            }
            Some(Token::Ident(name)) => self.parse_call(&name, offset),
            Some(token) => Err(syntax_error(
                self.rule,
                offset,
                format!("unexpected {}", token.describe()),
            )),
            None => Err(syntax_error(
                self.rule,
                offset,
                "unexpected end of rule",
            )),
        }
    }

    fn parse_call(&mut self, name: &str, offset: usize) -> Result<Expr> {
        let function = Function::from_alias(name).ok_or_else(|| {
            RuleError::grammar(
                GrammarErrorKind::UnknownFunction,
                format!("Unknown function: '{}' in rule '{}'", name, self.rule),
            )
        })?;

        self.expect(Token::LParen)?;

        if self.peek() == Some(&Token::RParen) {
            return Err(RuleError::grammar(
                GrammarErrorKind::MissingArguments,
                format!(
                    "{}() at offset {} has no arguments in rule '{}'",
                    name, offset, self.rule
                ),
            ));
        }

        let mut args = Vec::new();
        loop {
            let arg_offset = self.offset();
            match self.next() {
                Some(Token::Str(value)) => args.push(value),
                Some(token) => {
                    return Err(syntax_error(
                        self.rule,
                        arg_offset,
                        format!("expected string argument, found {}", token.describe()),
                    ))
                }
                None => {
                    return Err(syntax_error(
                        self.rule,
                        arg_offset,
                        "expected string argument, found end of rule",
                    ))
                }
            }

            let sep_offset = self.offset();
            match self.next() {
                Some(Token::Comma) => continue,
                Some(Token::RParen) => break,
                Some(token) => {
                    return Err(syntax_error(
                        self.rule,
                        sep_offset,
                        format!("expected ',' or ')', found {}", token.describe()),
                    ))
                }
                None => {
                    return Err(syntax_error(
                        self.rule,
                        sep_offset,
                        "unbalanced parentheses",
                    ))
                }
            }
        }

        Ok(Expr::leaf(function, args))
    }
}
