//! # Calculator
//!
//! Expression evaluator behind the transactional calculator, plus the
//! keypad session state (expression buffer and memory register).
//!
//! ## Grammar
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '×' | '/' | '÷') unary)*
//! unary   := ('-' | '+') unary | postfix
//! postfix := primary '%'*            x% = x / 100
//! primary := number | '(' expr ')'
//! number  := digits ['.' digits] | '.' digits      leading zeros allowed
//! ```
//!
//! Arithmetic is exact decimal (`rust_decimal`), so `0.1 + 0.2` is `0.3`.
//! Nesting deeper than [`MAX_NESTING`] is rejected as malformed.

use std::iter::Peekable;
use std::str::Chars;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;

/// Fractional digits kept in a non-integral result.
pub const RESULT_DECIMALS: u32 = 8;

/// Deepest nesting of parentheses and unary signs an expression may use.
pub const MAX_NESTING: usize = 128;

const MULTIPLY: char = '×';
const DIVIDE: char = '÷';

// =============================================================================
// Evaluation
// =============================================================================

/// Outcome of evaluating one expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub expression: String,
    pub value: Decimal,
    /// What the display shows, e.g. `"3"` or `"0.33333333"`.
    pub display: String,
}

impl Evaluation {
    /// The result as money, rounded half-up to the minor unit.
    pub fn amount(&self) -> Option<Money> {
        Money::from_decimal(self.value)
    }
}

/// Evaluates `expression`. An empty expression evaluates to `0`.
///
/// ## Example
/// ```rust
/// use digical_core::calculator::evaluate;
///
/// assert_eq!(evaluate("2+3×4").unwrap().display, "14");
/// assert_eq!(evaluate("50%").unwrap().display, "0.5");
/// assert_eq!(evaluate("10÷3").unwrap().display, "3.33333333");
/// assert!(evaluate("1÷0").is_err());
/// ```
pub fn evaluate(expression: &str) -> CoreResult<Evaluation> {
    let value = if expression.trim().is_empty() {
        Decimal::ZERO
    } else {
        Parser::new(expression).parse()?
    };

    let value = round_result(value);
    Ok(Evaluation {
        expression: expression.to_string(),
        value,
        display: format_decimal(value),
    })
}

fn round_result(value: Decimal) -> Decimal {
    if value.is_zero() {
        // drop any negative zero
        return Decimal::ZERO;
    }
    value
        .round_dp_with_strategy(RESULT_DECIMALS, RoundingStrategy::MidpointNearestEven)
        .normalize()
}

/// Formats a value the way the display shows results: integers without a
/// fractional part, everything else without trailing zeros.
pub fn format_decimal(value: Decimal) -> String {
    if value.is_zero() {
        return "0".to_string();
    }
    value.normalize().to_string()
}

// =============================================================================
// Parser
// =============================================================================

struct Parser<'a> {
    chars: Peekable<Chars<'a>>,
    source: &'a str,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Parser {
            chars: source.chars().peekable(),
            source,
            depth: 0,
        }
    }

    fn parse(mut self) -> CoreResult<Decimal> {
        let value = self.expr()?;
        self.skip_whitespace();
        match self.chars.peek() {
            None => Ok(value),
            Some(&c) => Err(self.malformed(format!("unexpected '{}'", c))),
        }
    }

    /// Runs `step` one nesting level deeper.
    fn nested(&mut self, step: impl FnOnce(&mut Self) -> CoreResult<Decimal>) -> CoreResult<Decimal> {
        if self.depth >= MAX_NESTING {
            return Err(self.malformed(format!("nested deeper than {} levels", MAX_NESTING)));
        }
        self.depth += 1;
        let result = step(self);
        self.depth -= 1;
        result
    }

    fn expr(&mut self) -> CoreResult<Decimal> {
        let mut value = self.term()?;
        loop {
            match self.peek_symbol() {
                Some('+') => {
                    self.chars.next();
                    let rhs = self.term()?;
                    value = value.checked_add(rhs).ok_or_else(|| self.overflow())?;
                }
                Some('-') => {
                    self.chars.next();
                    let rhs = self.term()?;
                    value = value.checked_sub(rhs).ok_or_else(|| self.overflow())?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn term(&mut self) -> CoreResult<Decimal> {
        let mut value = self.unary()?;
        loop {
            match self.peek_symbol() {
                Some('*') | Some(MULTIPLY) => {
                    self.chars.next();
                    let rhs = self.unary()?;
                    value = value.checked_mul(rhs).ok_or_else(|| self.overflow())?;
                }
                Some('/') | Some(DIVIDE) => {
                    self.chars.next();
                    let rhs = self.unary()?;
                    if rhs.is_zero() {
                        return Err(CoreError::DivisionByZero);
                    }
                    value = value.checked_div(rhs).ok_or_else(|| self.overflow())?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn unary(&mut self) -> CoreResult<Decimal> {
        match self.peek_symbol() {
            Some('-') => {
                self.chars.next();
                Ok(-self.nested(Self::unary)?)
            }
            Some('+') => {
                self.chars.next();
                self.nested(Self::unary)
            }
            _ => self.postfix(),
        }
    }

    fn postfix(&mut self) -> CoreResult<Decimal> {
        let mut value = self.primary()?;
        while self.peek_symbol() == Some('%') {
            self.chars.next();
            value /= Decimal::ONE_HUNDRED;
        }
        Ok(value)
    }

    fn primary(&mut self) -> CoreResult<Decimal> {
        match self.peek_symbol() {
            Some('(') => {
                self.chars.next();
                let value = self.nested(Self::expr)?;
                if self.peek_symbol() != Some(')') {
                    return Err(self.malformed("missing ')'".to_string()));
                }
                self.chars.next();
                Ok(value)
            }
            Some(c) if c.is_ascii_digit() || c == '.' => self.number(),
            Some(c) => Err(self.malformed(format!("unexpected '{}'", c))),
            None => Err(self.malformed("unexpected end of expression".to_string())),
        }
    }

    fn number(&mut self) -> CoreResult<Decimal> {
        let mut literal = String::new();
        let mut seen_point = false;

        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() {
                literal.push(c);
            } else if c == '.' && !seen_point {
                seen_point = true;
                literal.push(c);
            } else {
                break;
            }
            self.chars.next();
        }

        if literal == "." {
            return Err(self.malformed("'.' is not a number".to_string()));
        }
        if literal.starts_with('.') {
            literal.insert(0, '0');
        }
        if literal.ends_with('.') {
            literal.push('0');
        }

        Decimal::from_str(&literal).map_err(|_| self.malformed(format!("'{}' is out of range", literal)))
    }

    fn peek_symbol(&mut self) -> Option<char> {
        self.skip_whitespace();
        self.chars.peek().copied()
    }

    fn skip_whitespace(&mut self) {
        while self.chars.peek().is_some_and(|c| c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn malformed(&self, reason: String) -> CoreError {
        CoreError::MalformedExpression(format!("{}: {}", self.source, reason))
    }

    fn overflow(&self) -> CoreError {
        self.malformed("result out of range".to_string())
    }
}

// =============================================================================
// Calculator Session
// =============================================================================

/// Keypad state: the expression being typed and the memory register.
#[derive(Debug, Clone, Default)]
pub struct Calculator {
    buffer: String,
    memory: Decimal,
    last_result: Decimal,
}

impl Calculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current expression, `"0"` when nothing has been typed.
    pub fn expression(&self) -> &str {
        if self.buffer.is_empty() {
            "0"
        } else {
            &self.buffer
        }
    }

    /// Replaces the whole expression.
    pub fn set_expression(&mut self, expression: impl Into<String>) {
        self.buffer = expression.into();
    }

    /// Appends a digit, `.`, a parenthesis or `%`. Other keys are ignored.
    pub fn push_digit(&mut self, key: char) -> &str {
        if key.is_ascii_digit() || matches!(key, '.' | '(' | ')' | '%') {
            self.buffer.push(key);
        }
        self.expression()
    }

    /// Appends a binary operator.
    ///
    /// An operator directly after another operator is dropped, except `-`
    /// which starts a negative number. `*` and `/` are shown as `×` and `÷`.
    pub fn push_operator(&mut self, op: char) -> &str {
        let op = match op {
            '*' => MULTIPLY,
            '/' => DIVIDE,
            other => other,
        };
        if !is_operator(op) {
            return self.expression();
        }

        let after_operand = self.buffer.chars().last().is_some_and(|c| !is_operator(c));
        if after_operand || op == '-' {
            self.buffer.push(op);
        }
        self.expression()
    }

    /// Removes the last typed key.
    pub fn backspace(&mut self) -> &str {
        self.buffer.pop();
        self.expression()
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Evaluates the buffer. The buffer is cleared whether or not it
    /// evaluates.
    pub fn evaluate(&mut self) -> CoreResult<Evaluation> {
        let expression = std::mem::take(&mut self.buffer);
        let evaluation = evaluate(&expression)?;
        self.last_result = evaluation.value;
        Ok(evaluation)
    }

    pub fn last_result(&self) -> Decimal {
        self.last_result
    }

    /// M+: adds `value`, or the last result when `None`.
    ///
    /// The register keeps its value when the sum would overflow.
    pub fn memory_add(&mut self, value: Option<Decimal>) {
        if let Some(sum) = self.memory.checked_add(value.unwrap_or(self.last_result)) {
            self.memory = sum;
        }
    }

    /// M-: subtracts `value`, or the last result when `None`.
    pub fn memory_subtract(&mut self, value: Option<Decimal>) {
        if let Some(difference) = self.memory.checked_sub(value.unwrap_or(self.last_result)) {
            self.memory = difference;
        }
    }

    /// MR
    pub fn memory_recall(&self) -> Decimal {
        self.memory
    }

    /// MC
    pub fn memory_clear(&mut self) {
        self.memory = Decimal::ZERO;
    }
}

fn is_operator(c: char) -> bool {
    matches!(c, '+' | '-' | MULTIPLY | DIVIDE)
}

// =============================================================================
// Unit Tests
// =============================================================================
