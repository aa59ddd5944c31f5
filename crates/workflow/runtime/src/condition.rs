//! Condition evaluation for conditional connecting flows
//!
//! The engine only depends on [`ConditionEvaluator`]. [`ExpressionEvaluator`]
//! is the evaluator installed by default; it understands a small expression
//! language over process data:
//!
//! - literals: numbers (with unary minus), `"strings"` / `'strings'`, `true`, `false`, `null`
//! - variables, with dotted paths into nested objects (`order.total`)
//! - comparisons: `==`, `!=`, `>`, `>=`, `<`, `<=`
//! - boolean operators: `&&` / `and`, `||` / `or`, `!` / `not`, parentheses
//!
//! A variable missing from process data is an error rather than `false`, so
//! a caller can supply the data and retry.

use serde_json::Value;
use std::cmp::Ordering;
use workflow_model::{ProcessData, WorkflowError, WorkflowResult};

/// Evaluates a flow condition against process data
pub trait ConditionEvaluator: Send + Sync {
    fn evaluate(&self, expression: &str, data: &ProcessData) -> WorkflowResult<bool>;
}

/// The built-in expression evaluator
#[derive(Clone, Copy, Debug, Default)]
pub struct ExpressionEvaluator;

impl ExpressionEvaluator {
    pub fn new() -> Self {
        Self
    }
}

impl ConditionEvaluator for ExpressionEvaluator {
    fn evaluate(&self, expression: &str, data: &ProcessData) -> WorkflowResult<bool> {
        let fail = |message: String| WorkflowError::Expression {
            expression: expression.to_string(),
            message,
        };

        let tokens = tokenize(expression).map_err(fail)?;
        let mut parser = Parser { tokens, pos: 0 };
        let ast = parser.parse_or().map_err(fail)?;
        if let Some(token) = parser.peek() {
            return Err(fail(format!("unexpected token {:?}", token)));
        }
        let value = eval(&ast, data).map_err(fail)?;
        Ok(truthy(&value))
    }
}

// ── Lexer ────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Number(f64),
    Str(String),
    Ident(String),
    Op(&'static str),
    LParen,
    RParen,
}

fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '"' | '\'' => {
                let quote = c;
                let mut text = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err("unterminated string literal".into()),
                        Some('\\') => {
                            let escaped = chars
                                .get(i + 1)
                                .ok_or_else(|| "dangling escape".to_string())?;
                            text.push(*escaped);
                            i += 2;
                        }
                        Some(&ch) if ch == quote => {
                            i += 1;
                            break;
                        }
                        Some(&ch) => {
                            text.push(ch);
                            i += 1;
                        }
                    }
                }
                tokens.push(Token::Str(text));
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let number = text
                    .parse::<f64>()
                    .map_err(|_| format!("invalid number '{}'", text))?;
                tokens.push(Token::Number(number));
            }
            c if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.')
                {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                let token = match word.as_str() {
                    "and" => Token::Op("&&"),
                    "or" => Token::Op("||"),
                    "not" => Token::Op("!"),
                    _ => Token::Ident(word),
                };
                tokens.push(token);
            }
            _ => {
                let two: String = chars[i..(i + 2).min(chars.len())].iter().collect();
                let op = match two.as_str() {
                    "==" => Some("=="),
                    "!=" => Some("!="),
                    ">=" => Some(">="),
                    "<=" => Some("<="),
                    "&&" => Some("&&"),
                    "||" => Some("||"),
                    _ => None,
                };
                if let Some(op) = op {
                    tokens.push(Token::Op(op));
                    i += 2;
                    continue;
                }
                let op = match c {
                    '>' => ">",
                    '<' => "<",
                    '!' => "!",
                    '-' => "-",
                    _ => return Err(format!("unexpected character '{}'", c)),
                };
                tokens.push(Token::Op(op));
                i += 1;
            }
        }
    }

    if tokens.is_empty() {
        return Err("empty expression".into());
    }
    Ok(tokens)
}

// ── Parser ───────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
enum Expr {
    Literal(Value),
    Var(String),
    Neg(Box<Expr>),
    Not(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare(&'static str, Box<Expr>, Box<Expr>),
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn eat_op(&mut self, op: &str) -> bool {
        if matches!(self.peek(), Some(Token::Op(o)) if *o == op) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn parse_or(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_and()?;
        while self.eat_op("||") {
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, String> {
        let mut left = self.parse_not()?;
        while self.eat_op("&&") {
            let right = self.parse_not()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_not(&mut self) -> Result<Expr, String> {
        if self.eat_op("!") {
            return Ok(Expr::Not(Box::new(self.parse_not()?)));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expr, String> {
        let left = self.parse_primary()?;
        let op = match self.peek() {
            Some(Token::Op(op)) if matches!(*op, "==" | "!=" | ">" | ">=" | "<" | "<=") => *op,
            _ => return Ok(left),
        };
        self.pos += 1;
        let right = self.parse_primary()?;
        Ok(Expr::Compare(op, Box::new(left), Box::new(right)))
    }

    fn parse_primary(&mut self) -> Result<Expr, String> {
        match self.next() {
            Some(Token::Number(n)) => Ok(Expr::Literal(number(n))),
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::String(s))),
            Some(Token::Ident(word)) => Ok(match word.as_str() {
                "true" => Expr::Literal(Value::Bool(true)),
                "false" => Expr::Literal(Value::Bool(false)),
                "null" => Expr::Literal(Value::Null),
                _ => Expr::Var(word),
            }),
            Some(Token::Op("-")) => Ok(Expr::Neg(Box::new(self.parse_primary()?))),
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err("missing closing parenthesis".into()),
                }
            }
            Some(token) => Err(format!("unexpected token {:?}", token)),
            None => Err("unexpected end of expression".into()),
        }
    }
}

fn number(n: f64) -> Value {
    serde_json::Number::from_f64(n)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

// ── Evaluation ───────────────────────────────────────────────────────

fn eval(expr: &Expr, data: &ProcessData) -> Result<Value, String> {
    match expr {
        Expr::Literal(value) => Ok(value.clone()),
        Expr::Var(path) => data
            .lookup(path)
            .cloned()
            .ok_or_else(|| format!("variable '{}' is not defined", path)),
        Expr::Neg(inner) => {
            let value = eval(inner, data)?;
            as_number(&value)
                .map(|n| number(-n))
                .ok_or_else(|| format!("cannot negate {}", type_name(&value)))
        }
        Expr::Not(inner) => Ok(Value::Bool(!truthy(&eval(inner, data)?))),
        Expr::And(left, right) => {
            if !truthy(&eval(left, data)?) {
                return Ok(Value::Bool(false));
            }
            Ok(Value::Bool(truthy(&eval(right, data)?)))
        }
        Expr::Or(left, right) => {
            if truthy(&eval(left, data)?) {
                return Ok(Value::Bool(true));
            }
            Ok(Value::Bool(truthy(&eval(right, data)?)))
        }
        Expr::Compare(op, left, right) => {
            let left = eval(left, data)?;
            let right = eval(right, data)?;
            compare(op, &left, &right).map(Value::Bool)
        }
    }
}

fn compare(op: &str, left: &Value, right: &Value) -> Result<bool, String> {
    let ordering = order(left, right);
    match op {
        "==" => Ok(ordering == Some(Ordering::Equal) || left == right),
        "!=" => Ok(!(ordering == Some(Ordering::Equal) || left == right)),
        _ => {
            let ordering = ordering.ok_or_else(|| {
                format!("cannot order {} and {}", type_name(left), type_name(right))
            })?;
            Ok(match op {
                ">" => ordering == Ordering::Greater,
                ">=" => ordering != Ordering::Less,
                "<" => ordering == Ordering::Less,
                "<=" => ordering != Ordering::Greater,
                _ => return Err(format!("unknown operator '{}'", op)),
            })
        }
    }
}

/// Numbers compare numerically (numeric strings included), strings
/// lexically; anything else is unordered
fn order(left: &Value, right: &Value) -> Option<Ordering> {
    match (as_number(left), as_number(right)) {
        (Some(l), Some(r)) if left.is_number() || right.is_number() => l.partial_cmp(&r),
        _ => match (left, right) {
            (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
            _ => None,
        },
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty() && s != "0" && s != "false",
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
