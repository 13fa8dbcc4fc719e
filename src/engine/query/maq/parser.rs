// SPDX-License-Identifier: MIT

//! Parser for the declarative query language
//!
//! Programs look like:
//!
//! ```text
//! -- bind statement-local variables
//! SET disease = 'asthma'
//!
//! SELECT disease->chemical_substance->gene
//!   FROM $reasoner
//!  WHERE disease = $disease
//!    AND max_p_value < 0.5
//!    SET '$.nodes.[*]' AS exposures
//! ```

use super::ast::{CompareOp, OutputBinding, Predicate, SelectStatement, SetStatement, Statement};
use crate::ops::error::EngineError;
use serde_json::{json, Value};

/// Parse a program into its statements
pub fn parse(input: &str) -> Result<Vec<Statement>, EngineError> {
    let tokens = tokenize(input)?;
    let mut statements = Vec::new();
    let mut cursor = 0;

    while cursor < tokens.len() {
        match tokens[cursor] {
            Token::Word(ref w) if w.eq_ignore_ascii_case("set") => {
                let (statement, next) = parse_set(&tokens, cursor + 1, input)?;
                statements.push(Statement::Set(statement));
                cursor = next;
            }
            Token::Word(ref w) if w.eq_ignore_ascii_case("select") => {
                let (statement, next) = parse_select(&tokens, cursor + 1, input)?;
                statements.push(Statement::Select(statement));
                cursor = next;
            }
            _ => return Err(bad(input)),
        }
    }
    Ok(statements)
}

fn bad(input: &str) -> EngineError {
    EngineError::BadExpression(input.to_string())
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Quoted(String),
}

impl Token {
    fn word(&self) -> Option<&str> {
        match self {
            Token::Word(w) => Some(w),
            Token::Quoted(_) => None,
        }
    }

    fn is_keyword(&self, keyword: &str) -> bool {
        self.word()
            .map(|w| w.eq_ignore_ascii_case(keyword))
            .unwrap_or(false)
    }
}

/// Split into words and quoted strings; `--` comments run to end of line
fn tokenize(input: &str) -> Result<Vec<Token>, EngineError> {
    let mut tokens = Vec::new();
    for line in input.lines() {
        let line = match line.find("--") {
            Some(pos) => &line[..pos],
            None => line,
        };
        let mut chars = line.chars().peekable();
        while let Some(&c) = chars.peek() {
            if c.is_whitespace() {
                chars.next();
            } else if c == '\'' || c == '"' {
                chars.next();
                let mut text = String::new();
                let mut closed = false;
                for inner in chars.by_ref() {
                    if inner == c {
                        closed = true;
                        break;
                    }
                    text.push(inner);
                }
                if !closed {
                    return Err(bad(input));
                }
                tokens.push(Token::Quoted(text));
            } else {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || c == '\'' || c == '"' {
                        break;
                    }
                    word.push(c);
                    chars.next();
                }
                tokens.push(Token::Word(word));
            }
        }
    }
    Ok(tokens)
}

/// `SET <name> = <scalar>`
fn parse_set(
    tokens: &[Token],
    mut cursor: usize,
    input: &str,
) -> Result<(SetStatement, usize), EngineError> {
    let name = tokens
        .get(cursor)
        .and_then(Token::word)
        .ok_or_else(|| bad(input))?
        .to_string();
    cursor += 1;
    if !tokens
        .get(cursor)
        .map(|t| t.is_keyword("="))
        .unwrap_or(false)
    {
        return Err(bad(input));
    }
    cursor += 1;
    let value = tokens
        .get(cursor)
        .map(scalar_of)
        .ok_or_else(|| bad(input))?;
    Ok((SetStatement { name, value }, cursor + 1))
}

/// `SELECT chain FROM $service [WHERE pred (AND pred)*] [SET out (AND out)*]`
fn parse_select(
    tokens: &[Token],
    mut cursor: usize,
    input: &str,
) -> Result<(SelectStatement, usize), EngineError> {
    // Concept chain: every token up to FROM, joined and split on arrows.
    let mut chain = String::new();
    while let Some(token) = tokens.get(cursor) {
        if token.is_keyword("from") {
            break;
        }
        chain.push_str(token.word().ok_or_else(|| bad(input))?);
        cursor += 1;
    }
    let concepts: Vec<String> = chain
        .split("->")
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    if concepts.is_empty() {
        return Err(bad(input));
    }

    if !tokens
        .get(cursor)
        .map(|t| t.is_keyword("from"))
        .unwrap_or(false)
    {
        return Err(bad(input));
    }
    cursor += 1;

    let service = tokens
        .get(cursor)
        .and_then(Token::word)
        .and_then(|w| w.strip_prefix('$'))
        .ok_or_else(|| bad(input))?
        .to_string();
    cursor += 1;

    let mut statement = SelectStatement {
        concepts,
        service,
        ..Default::default()
    };

    if tokens
        .get(cursor)
        .map(|t| t.is_keyword("where"))
        .unwrap_or(false)
    {
        cursor += 1;
        loop {
            let (predicate, next) = parse_predicate(tokens, cursor, input)?;
            statement.where_clause.push(predicate);
            cursor = next;
            if tokens
                .get(cursor)
                .map(|t| t.is_keyword("and"))
                .unwrap_or(false)
            {
                cursor += 1;
            } else {
                break;
            }
        }
    }

    while tokens
        .get(cursor)
        .map(|t| t.is_keyword("set"))
        .unwrap_or(false)
    {
        // `SET name = value` after a select is a new statement, not an
        // output binding.
        if let (Some(Token::Word(_)), Some(eq)) = (tokens.get(cursor + 1), tokens.get(cursor + 2))
        {
            if eq.is_keyword("=") {
                break;
            }
        }
        cursor += 1;
        let (binding, next) = parse_output(tokens, cursor, input)?;
        statement.outputs.push(binding);
        cursor = next;
    }

    Ok((statement, cursor))
}

/// `<ident> <op> <scalar | $ref>`
fn parse_predicate(
    tokens: &[Token],
    cursor: usize,
    input: &str,
) -> Result<(Predicate, usize), EngineError> {
    let left = tokens
        .get(cursor)
        .and_then(Token::word)
        .ok_or_else(|| bad(input))?
        .to_string();
    let op = tokens
        .get(cursor + 1)
        .and_then(Token::word)
        .and_then(|w| CompareOp::parse(&w.to_ascii_lowercase()))
        .ok_or_else(|| bad(input))?;
    let right = tokens
        .get(cursor + 2)
        .map(scalar_of)
        .ok_or_else(|| bad(input))?;
    Ok((Predicate { left, op, right }, cursor + 3))
}

/// `'<path>' AS <name>` or a bare `<name>`
fn parse_output(
    tokens: &[Token],
    cursor: usize,
    input: &str,
) -> Result<(OutputBinding, usize), EngineError> {
    match tokens.get(cursor) {
        Some(Token::Quoted(path)) => {
            if !tokens
                .get(cursor + 1)
                .map(|t| t.is_keyword("as"))
                .unwrap_or(false)
            {
                return Err(bad(input));
            }
            let name = tokens
                .get(cursor + 2)
                .and_then(Token::word)
                .ok_or_else(|| bad(input))?
                .to_string();
            Ok((
                OutputBinding {
                    path: Some(path.clone()),
                    name,
                },
                cursor + 3,
            ))
        }
        Some(Token::Word(name)) => Ok((
            OutputBinding {
                path: None,
                name: name.clone(),
            },
            cursor + 1,
        )),
        None => Err(bad(input)),
    }
}

/// Quoted tokens are strings; words parse as numbers when they can
fn scalar_of(token: &Token) -> Value {
    match token {
        Token::Quoted(text) => Value::String(text.clone()),
        Token::Word(word) => {
            if let Ok(n) = word.parse::<i64>() {
                json!(n)
            } else if let Ok(f) = word.parse::<f64>() {
                json!(f)
            } else {
                Value::String(word.clone())
            }
        }
    }
}
