use std::iter::Peekable;
use std::vec::IntoIter;

use super::models::{OutputMode, Predicate, QueryDirective, SortDirection, SortOrder};
use crate::utils::normalize_scope;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Word(String),
    Quoted(String),
    Comma,
    Eq,
}

impl Token {
    fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Word(w) if w.eq_ignore_ascii_case(keyword))
    }

    fn describe(&self) -> String {
        match self {
            Token::Word(w) => format!("`{w}`"),
            Token::Quoted(q) => format!("\"{q}\""),
            Token::Comma => "`,`".to_string(),
            Token::Eq => "`=`".to_string(),
        }
    }
}

const CLAUSES: [&str; 4] = ["FROM", "WHERE", "SORT", "LIMIT"];

fn is_clause(token: &Token) -> bool {
    CLAUSES.iter().any(|k| token.is_keyword(k))
}

fn tokenize(source: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = source.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '=' => {
                chars.next();
                tokens.push(Token::Eq);
            }
            '"' => {
                chars.next();
                let mut quoted = String::new();
                loop {
                    match chars.next() {
                        Some('"') => break,
                        Some('\\') => {
                            if let Some(escaped) = chars.next() {
                                quoted.push(escaped);
                            }
                        }
                        Some(other) => quoted.push(other),
                        None => return Err("unterminated string literal".to_string()),
                    }
                }
                tokens.push(Token::Quoted(quoted));
            }
            _ => {
                let mut word = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() || matches!(c, ',' | '=' | '"') {
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

type Tokens = Peekable<IntoIter<Token>>;

fn expect_field(tokens: &mut Tokens, context: &str) -> Result<String, String> {
    match tokens.next() {
        Some(Token::Word(w)) if !is_clause(&Token::Word(w.clone())) => Ok(w),
        Some(Token::Quoted(q)) => Ok(q),
        Some(other) => Err(format!("expected a field name {context}, found {}", other.describe())),
        None => Err(format!("expected a field name {context}")),
    }
}

fn expect_value(tokens: &mut Tokens, field: &str) -> Result<String, String> {
    match tokens.next() {
        Some(Token::Word(w)) | Some(Token::Quoted(w)) => Ok(w),
        Some(other) => Err(format!(
            "expected a value for `{field}`, found {}",
            other.describe()
        )),
        None => Err(format!("missing value for `{field}`")),
    }
}

fn parse_projection(tokens: &mut Tokens) -> Result<Vec<String>, String> {
    let mut fields = Vec::new();
    loop {
        match tokens.peek() {
            None => break,
            Some(t) if is_clause(t) => break,
            Some(_) => {}
        }
        fields.push(expect_field(tokens, "in TABLE")?);
        if tokens.peek() == Some(&Token::Comma) {
            tokens.next();
        } else {
            break;
        }
    }
    Ok(fields)
}

fn parse_predicate(tokens: &mut Tokens) -> Result<Predicate, String> {
    if let Some(t) = tokens.peek() {
        if t.is_keyword("NOT") {
            return Err("NOT is not supported; predicates can only be combined with AND".into());
        }
    }
    let field = expect_field(tokens, "after WHERE")?;
    match tokens.next() {
        Some(Token::Eq) => {}
        Some(other) => {
            return Err(format!(
                "expected `=` after `{field}`, found {}",
                other.describe()
            ))
        }
        None => return Err(format!("expected `=` after `{field}`")),
    }
    let value = expect_value(tokens, &field)?;
    Ok(Predicate { field, value })
}

pub(super) fn parse_directive(source: &str) -> Result<QueryDirective, String> {
    let mut tokens = tokenize(source)?.into_iter().peekable();

    let mode = match tokens.next() {
        Some(t) if t.is_keyword("TABLE") => OutputMode::Table,
        Some(t) if t.is_keyword("LIST") => OutputMode::List,
        Some(other) => {
            return Err(format!(
                "directive must start with TABLE or LIST, found {}",
                other.describe()
            ))
        }
        None => return Err("empty directive".to_string()),
    };

    let mut projection = match mode {
        OutputMode::Table => parse_projection(&mut tokens)?,
        OutputMode::List => Vec::new(),
    };
    if projection.is_empty() {
        projection.push("title".to_string());
    }

    let mut scope: Option<String> = None;
    let mut predicates = Vec::new();
    let mut order: Option<SortOrder> = None;
    let mut limit: Option<usize> = None;

    while let Some(token) = tokens.next() {
        if token.is_keyword("FROM") {
            if scope.is_some() {
                return Err("duplicate FROM clause".to_string());
            }
            let raw = expect_value(&mut tokens, "FROM")?;
            scope = Some(normalize_scope(&raw).to_string());
        } else if token.is_keyword("WHERE") {
            predicates.push(parse_predicate(&mut tokens)?);
            while let Some(next) = tokens.peek() {
                if next.is_keyword("AND") {
                    tokens.next();
                    predicates.push(parse_predicate(&mut tokens)?);
                } else if next.is_keyword("OR") {
                    return Err("OR is not supported; predicates can only be combined with AND".into());
                } else {
                    break;
                }
            }
        } else if token.is_keyword("SORT") {
            if order.is_some() {
                return Err("duplicate SORT clause".to_string());
            }
            let field = expect_field(&mut tokens, "after SORT")?;
            let direction = match tokens.peek() {
                Some(t) if t.is_keyword("ASC") || t.is_keyword("ASCENDING") => {
                    tokens.next();
                    SortDirection::Asc
                }
                Some(t) if t.is_keyword("DESC") || t.is_keyword("DESCENDING") => {
                    tokens.next();
                    SortDirection::Desc
                }
                Some(t) if !is_clause(t) => {
                    return Err(format!("unknown sort direction {}", t.describe()));
                }
                _ => SortDirection::Asc,
            };
            order = Some(SortOrder { field, direction });
        } else if token.is_keyword("LIMIT") {
            if limit.is_some() {
                return Err("duplicate LIMIT clause".to_string());
            }
            let raw = expect_value(&mut tokens, "LIMIT")?;
            let parsed = raw
                .parse::<usize>()
                .map_err(|_| format!("LIMIT expects a non-negative integer, found `{raw}`"))?;
            limit = Some(parsed);
        } else {
            return Err(format!("unexpected {}", token.describe()));
        }
    }

    Ok(QueryDirective {
        mode,
        scope: scope.unwrap_or_default(),
        predicates,
        projection,
        order,
        limit,
        source: source.to_string(),
        range: None,
        error: None,
    })
}
