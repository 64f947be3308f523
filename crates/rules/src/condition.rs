//! Condition expression parser and evaluator.
//!
//! A small DSL over fact attributes:
//!
//! ```text
//! light_color == "red"
//! state == "not loaded" AND NOT #0 EXISTS
//! attempts >= 3 OR (mode == manual AND paused == true)
//! path NOT STARTS_WITH "/tmp"
//! ```
//!
//! Grammar (informal):
//! ```text
//! expr     = clause (("AND" | "OR") clause)*
//! clause   = ["NOT"] atom | "(" expr ")"
//! atom     = key ["NOT"] OP value | key ["NOT"] "EXISTS"
//! key      = IDENT | "#" NUMBER
//! OP       = "CONTAINS" | "MATCHES" | "STARTS_WITH" | "ENDS_WITH"
//!          | "==" | "!=" | ">" | "<" | ">=" | "<="
//! value    = QUOTED_STRING | NUMBER | "true" | "false" | IDENT
//! ```

use deliberate_core::{Condition, Fact, FactKey};
use regex_lite::Regex;
use serde_json::Value as Json;

/// A parsed condition tree.
#[derive(Debug, Clone)]
pub enum Expr {
    Atom(Atom),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    /// Empty condition.
    Always,
}

#[derive(Debug, Clone)]
pub struct Atom {
    pub key: FactKey,
    pub op: Op,
    pub value: Literal,
    regex: Option<Regex>,
}

/// Comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Exists,
    Missing,
    Contains,
    NotContains,
    Matches,
    NotMatches,
    StartsWith,
    NotStartsWith,
    EndsWith,
    NotEndsWith,
    Eq,
    NotEq,
    Gt,
    Lt,
    Gte,
    Lte,
}

/// A literal on the right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Num(f64),
    Bool(bool),
    /// Placeholder for `EXISTS`.
    None,
}

impl Expr {
    pub fn evaluate(&self, fact: &Fact) -> bool {
        match self {
            Expr::Always => true,
            Expr::Atom(atom) => atom.evaluate(fact),
            Expr::And(a, b) => a.evaluate(fact) && b.evaluate(fact),
            Expr::Or(a, b) => a.evaluate(fact) || b.evaluate(fact),
            Expr::Not(inner) => !inner.evaluate(fact),
        }
    }
}

impl Atom {
    fn evaluate(&self, fact: &Fact) -> bool {
        let attr = fact.get(&self.key);
        match self.op {
            Op::Exists => attr.is_some(),
            Op::Missing => attr.is_none(),
            Op::Contains => attr.is_some_and(|v| contains(v, &self.value)),
            Op::NotContains => attr.is_none_or(|v| !contains(v, &self.value)),
            Op::Matches => attr.is_some_and(|v| self.is_match(v)),
            Op::NotMatches => attr.is_none_or(|v| !self.is_match(v)),
            Op::StartsWith => attr.is_some_and(|v| render(v).starts_with(&self.value.render())),
            Op::NotStartsWith => {
                attr.is_none_or(|v| !render(v).starts_with(&self.value.render()))
            }
            Op::EndsWith => attr.is_some_and(|v| render(v).ends_with(&self.value.render())),
            Op::NotEndsWith => attr.is_none_or(|v| !render(v).ends_with(&self.value.render())),
            Op::Eq => attr.is_some_and(|v| equals(v, &self.value)),
            Op::NotEq => attr.is_none_or(|v| !equals(v, &self.value)),
            Op::Gt => self.compare_num(attr, |a, b| a > b),
            Op::Lt => self.compare_num(attr, |a, b| a < b),
            Op::Gte => self.compare_num(attr, |a, b| a >= b),
            Op::Lte => self.compare_num(attr, |a, b| a <= b),
        }
    }

    fn is_match(&self, attr: &Json) -> bool {
        self.regex.as_ref().is_some_and(|re| re.is_match(&render(attr)))
    }

    fn compare_num(&self, attr: Option<&Json>, cmp: impl Fn(f64, f64) -> bool) -> bool {
        match (attr.and_then(as_number), &self.value) {
            (Some(x), Literal::Num(n)) => cmp(x, *n),
            _ => false,
        }
    }
}

impl Literal {
    fn render(&self) -> String {
        match self {
            Literal::Str(s) => s.clone(),
            Literal::Num(n) => n.to_string(),
            Literal::Bool(b) => b.to_string(),
            Literal::None => String::new(),
        }
    }
}

/// Text form of an attribute value: strings unquoted, everything else as JSON.
pub fn render(value: &Json) -> String {
    match value {
        Json::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn as_number(value: &Json) -> Option<f64> {
    match value {
        Json::Number(n) => n.as_f64(),
        Json::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn equals(attr: &Json, literal: &Literal) -> bool {
    match literal {
        Literal::Num(n) => as_number(attr).is_some_and(|x| (x - n).abs() < f64::EPSILON),
        Literal::Bool(b) => match attr {
            Json::Bool(v) => v == b,
            Json::String(s) => s == &b.to_string(),
            _ => false,
        },
        Literal::Str(s) => &render(attr) == s,
        Literal::None => false,
    }
}

fn contains(attr: &Json, literal: &Literal) -> bool {
    match attr {
        Json::Array(items) => items.iter().any(|item| equals(item, literal)),
        other => render(other).contains(&literal.render()),
    }
}

/// A parsed condition usable as a production condition.
#[derive(Debug, Clone)]
pub struct ParsedCondition {
    source: String,
    expr: Expr,
}

impl ParsedCondition {
    pub fn parse(source: &str) -> Result<Self, String> {
        Ok(Self {
            source: source.trim().to_string(),
            expr: parse_condition(source)?,
        })
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }
}

impl Condition for ParsedCondition {
    fn matches(&self, fact: &Fact) -> bool {
        self.expr.evaluate(fact)
    }

    fn describe(&self) -> String {
        if self.source.is_empty() {
            "<always>".into()
        } else {
            self.source.clone()
        }
    }
}

// ─── Parser ──────────────────────────────────────────────────────────

/// Parse a condition expression string into an [`Expr`] tree.
///
/// Returns `Ok(Expr::Always)` for empty input.
pub fn parse_condition(input: &str) -> Result<Expr, String> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(Expr::Always);
    }
    let tokens = tokenize(input)?;
    let (expr, rest) = parse_or(&tokens)?;
    if !rest.is_empty() {
        return Err(format!("unexpected tokens after expression: {rest:?}"));
    }
    Ok(expr)
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Index(u64),
    Str(String),
    Num(f64),
    And,
    Or,
    Not,
    Exists,
    Contains,
    Matches,
    StartsWith,
    EndsWith,
    Eq,
    NotEq,
    Gt,
    Lt,
    Gte,
    Lte,
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            ' ' | '\t' | '\n' | '\r' => {
                chars.next();
            }
            '(' => {
                chars.next();
                tokens.push(Token::LParen);
            }
            ')' => {
                chars.next();
                tokens.push(Token::RParen);
            }
            '"' | '\'' => {
                let quote = c;
                chars.next();
                let mut s = String::new();
                loop {
                    match chars.next() {
                        Some('\\') => {
                            if let Some(escaped) = chars.next() {
                                s.push(escaped);
                            }
                        }
                        Some(ch) if ch == quote => break,
                        Some(ch) => s.push(ch),
                        None => return Err("unterminated string literal".into()),
                    }
                }
                tokens.push(Token::Str(s));
            }
            '#' => {
                chars.next();
                let mut digits = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() {
                        digits.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let idx = digits
                    .parse::<u64>()
                    .map_err(|_| format!("invalid positional key: #{digits}"))?;
                tokens.push(Token::Index(idx));
            }
            '>' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Gte);
                } else {
                    tokens.push(Token::Gt);
                }
            }
            '<' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::Lte);
                } else {
                    tokens.push(Token::Lt);
                }
            }
            '=' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                }
                tokens.push(Token::Eq);
            }
            '!' => {
                chars.next();
                if chars.peek() == Some(&'=') {
                    chars.next();
                    tokens.push(Token::NotEq);
                } else {
                    tokens.push(Token::Not);
                }
            }
            _ if c.is_ascii_digit() || c == '-' => {
                let mut num_str = String::new();
                num_str.push(c);
                chars.next();
                while let Some(&nc) = chars.peek() {
                    if nc.is_ascii_digit() || nc == '.' {
                        num_str.push(nc);
                        chars.next();
                    } else {
                        break;
                    }
                }
                match num_str.parse::<f64>() {
                    Ok(n) => tokens.push(Token::Num(n)),
                    Err(_) => return Err(format!("invalid number: {num_str}")),
                }
            }
            _ if c.is_alphanumeric() || c == '_' || c == '.' => {
                let mut word = String::new();
                while let Some(&wc) = chars.peek() {
                    if wc.is_alphanumeric() || wc == '_' || wc == '.' {
                        word.push(wc);
                        chars.next();
                    } else {
                        break;
                    }
                }
                let token = match word.as_str() {
                    "AND" | "and" => Token::And,
                    "OR" | "or" => Token::Or,
                    "NOT" | "not" => Token::Not,
                    "EXISTS" | "exists" => Token::Exists,
                    "CONTAINS" | "contains" => Token::Contains,
                    "MATCHES" | "matches" => Token::Matches,
                    "STARTS_WITH" | "starts_with" => Token::StartsWith,
                    "ENDS_WITH" | "ends_with" => Token::EndsWith,
                    _ => Token::Ident(word),
                };
                tokens.push(token);
            }
            _ => return Err(format!("unexpected character: {c}")),
        }
    }

    Ok(tokens)
}

fn parse_or(tokens: &[Token]) -> Result<(Expr, &[Token]), String> {
    let (mut left, mut rest) = parse_and(tokens)?;
    while rest.first() == Some(&Token::Or) {
        let (right, remaining) = parse_and(&rest[1..])?;
        left = Expr::Or(Box::new(left), Box::new(right));
        rest = remaining;
    }
    Ok((left, rest))
}

fn parse_and(tokens: &[Token]) -> Result<(Expr, &[Token]), String> {
    let (mut left, mut rest) = parse_unary(tokens)?;
    while rest.first() == Some(&Token::And) {
        let (right, remaining) = parse_unary(&rest[1..])?;
        left = Expr::And(Box::new(left), Box::new(right));
        rest = remaining;
    }
    Ok((left, rest))
}

fn parse_unary(tokens: &[Token]) -> Result<(Expr, &[Token]), String> {
    // Negated operators (`key NOT CONTAINS ...`) are handled in parse_op.
    if tokens.first() == Some(&Token::Not) {
        let (inner, rest) = parse_primary(&tokens[1..])?;
        return Ok((Expr::Not(Box::new(inner)), rest));
    }
    parse_primary(tokens)
}

fn parse_primary(tokens: &[Token]) -> Result<(Expr, &[Token]), String> {
    if tokens.first() == Some(&Token::LParen) {
        let (inner, rest) = parse_or(&tokens[1..])?;
        if rest.first() != Some(&Token::RParen) {
            return Err("expected closing parenthesis".into());
        }
        return Ok((inner, &rest[1..]));
    }
    parse_atom(tokens)
}

fn parse_atom(tokens: &[Token]) -> Result<(Expr, &[Token]), String> {
    let (key, rest) = parse_key(tokens)?;
    let (op, rest) = parse_op(rest)?;

    if matches!(op, Op::Exists | Op::Missing) {
        return Ok((
            Expr::Atom(Atom {
                key,
                op,
                value: Literal::None,
                regex: None,
            }),
            rest,
        ));
    }

    let (value, rest) = parse_value(rest)?;
    let regex = match op {
        Op::Matches | Op::NotMatches => {
            let pattern = value.render();
            Some(Regex::new(&pattern).map_err(|e| format!("invalid regex {pattern:?}: {e}"))?)
        }
        _ => None,
    };
    Ok((
        Expr::Atom(Atom {
            key,
            op,
            value,
            regex,
        }),
        rest,
    ))
}

fn parse_key(tokens: &[Token]) -> Result<(FactKey, &[Token]), String> {
    match tokens.first() {
        Some(Token::Ident(name)) => Ok((FactKey::name(name.clone()), &tokens[1..])),
        Some(Token::Index(idx)) => Ok((FactKey::Index(*idx), &tokens[1..])),
        _ => Err(format!("expected attribute key, got {:?}", tokens.first())),
    }
}

fn parse_op(tokens: &[Token]) -> Result<(Op, &[Token]), String> {
    if tokens.first() == Some(&Token::Not) && tokens.len() > 1 {
        let (base_op, rest) = parse_base_op(&tokens[1..])?;
        let negated = match base_op {
            Op::Exists => Op::Missing,
            Op::Contains => Op::NotContains,
            Op::Matches => Op::NotMatches,
            Op::StartsWith => Op::NotStartsWith,
            Op::EndsWith => Op::NotEndsWith,
            other => {
                return Err(format!("cannot negate operator: {other:?}"));
            }
        };
        return Ok((negated, rest));
    }
    parse_base_op(tokens)
}

fn parse_base_op(tokens: &[Token]) -> Result<(Op, &[Token]), String> {
    let op = match tokens.first() {
        Some(Token::Exists) => Op::Exists,
        Some(Token::Contains) => Op::Contains,
        Some(Token::Matches) => Op::Matches,
        Some(Token::StartsWith) => Op::StartsWith,
        Some(Token::EndsWith) => Op::EndsWith,
        Some(Token::Eq) => Op::Eq,
        Some(Token::NotEq) => Op::NotEq,
        Some(Token::Gt) => Op::Gt,
        Some(Token::Lt) => Op::Lt,
        Some(Token::Gte) => Op::Gte,
        Some(Token::Lte) => Op::Lte,
        _ => return Err(format!("expected operator, got {:?}", tokens.first())),
    };
    Ok((op, &tokens[1..]))
}

fn parse_value(tokens: &[Token]) -> Result<(Literal, &[Token]), String> {
    match tokens.first() {
        Some(Token::Str(s)) => Ok((Literal::Str(s.clone()), &tokens[1..])),
        Some(Token::Num(n)) => Ok((Literal::Num(*n), &tokens[1..])),
        Some(Token::Ident(s)) => {
            let literal = match s.as_str() {
                "true" => Literal::Bool(true),
                "false" => Literal::Bool(false),
                // Bare identifier as a string value.
                _ => Literal::Str(s.clone()),
            };
            Ok((literal, &tokens[1..]))
        }
        _ => Err(format!(
            "expected value (string, number or boolean), got {:?}",
            tokens.first()
        )),
    }
}

// ─── Tests ──────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn eval(condition: &str, fact: &Fact) -> bool {
        parse_condition(condition).unwrap().evaluate(fact)
    }

    #[test]
    fn string_equality() {
        let fact = Fact::new().with("light_color", "red");
        assert!(eval(r#"light_color == "red""#, &fact));
        assert!(!eval(r#"light_color == "green""#, &fact));
        assert!(eval("light_color == red", &fact));
        assert!(eval(r#"light_color != "green""#, &fact));
    }

    #[test]
    fn missing_attribute_semantics() {
        let fact = Fact::new();
        assert!(!eval(r#"state == "loaded""#, &fact));
        assert!(eval(r#"state != "loaded""#, &fact));
        assert!(eval(r#"state NOT CONTAINS "x""#, &fact));
        assert!(!eval("count > 1", &fact));
    }

    #[test]
    fn positional_keys_and_exists() {
        let fact = Fact::new().with(0u64, "first").with("state", "idle");
        assert!(eval("#0 EXISTS", &fact));
        assert!(eval("#1 NOT EXISTS", &fact));
        assert!(eval(r#"#0 == "first" AND NOT #3 EXISTS"#, &fact));
        assert!(!eval("NOT #0 EXISTS", &fact));
    }

    #[test]
    fn numeric_comparison() {
        let fact = Fact::new().with("attempts", 3).with("load", "0.75");
        assert!(eval("attempts >= 3", &fact));
        assert!(eval("attempts < 4", &fact));
        assert!(!eval("attempts > 3", &fact));
        assert!(eval("attempts == 3", &fact));
        assert!(eval("load > 0.5", &fact));
    }

    #[test]
    fn boolean_literals() {
        let fact = Fact::new().with("paused", true);
        assert!(eval("paused == true", &fact));
        assert!(!eval("paused == false", &fact));
    }

    #[test]
    fn and_or_and_grouping() {
        let fact = Fact::new().with("mode", "manual").with("paused", false).with("attempts", 1);
        assert!(eval("attempts >= 3 OR (mode == manual AND paused == false)", &fact));
        assert!(!eval("attempts >= 3 OR (mode == auto AND paused == false)", &fact));
        assert!(eval("NOT (mode == auto)", &fact));
    }

    #[test]
    fn string_operators() {
        let fact = Fact::new().with("path", "/tmp/uploads/a.csv");
        assert!(eval(r#"path STARTS_WITH "/tmp""#, &fact));
        assert!(eval(r#"path ENDS_WITH ".csv""#, &fact));
        assert!(eval(r#"path NOT STARTS_WITH "/etc""#, &fact));
        assert!(eval(r#"path CONTAINS "uploads""#, &fact));
        assert!(eval(r#"path MATCHES "^/tmp/.*\\.csv$""#, &fact));
        assert!(!eval(r#"path NOT MATCHES "csv""#, &fact));
    }

    #[test]
    fn contains_checks_array_members() {
        let fact = Fact::new().with("seen", json!(["a.csv", "b.csv"]));
        assert!(eval(r#"seen CONTAINS "a.csv""#, &fact));
        assert!(!eval(r#"seen CONTAINS "a""#, &fact));
    }

    #[test]
    fn empty_condition_is_always() {
        let cond = ParsedCondition::parse("  ").unwrap();
        assert!(cond.matches(&Fact::new()));
        assert_eq!(cond.describe(), "<always>");
    }

    #[test]
    fn describe_keeps_source() {
        let cond = ParsedCondition::parse(r#"state == "not loaded""#).unwrap();
        assert_eq!(cond.describe(), r#"state == "not loaded""#);
    }

    #[test]
    fn invalid_condition_rejects() {
        assert!(parse_condition("CONTAINS").is_err());
        assert!(parse_condition(r#"x BADOP "y""#).is_err());
        assert!(parse_condition("x == ").is_err());
        assert!(parse_condition("(x == 1").is_err());
        assert!(parse_condition("# == 1").is_err());
        assert!(parse_condition(r#"x MATCHES "(""#).is_err());
        assert!(parse_condition("x NOT == 1").is_err());
    }
}
