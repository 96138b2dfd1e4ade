//! The condition/effect language.
//!
//! Authored content stores expressions as strings such as
//! `"inventory.torch = true"` or `"variables.courage += 1"`. They are parsed
//! once into `Condition` and `Effect` trees; malformed input is a
//! `ExpressionError` instead of a silently false comparison.
//!
//! Grammar: `<category>.<key> <op> <operand>`, where the first operator found
//! scanning left to right splits the expression, trying longer operators
//! first at each position so `>=` is never read as `>`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use taleweave_core::node::Choice;
use thiserror::Error;
use tracing::warn;

use super::state::GameState;
use super::value::Value;

/// Errors raised while parsing an expression.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpressionError {
    /// No comparison or assignment operator was found.
    #[error("no operator in expression `{0}`")]
    MissingOperator(String),

    /// The left-hand side has no `category.` prefix.
    #[error("`{0}` is not of the form category.key")]
    MissingCategory(String),

    /// The category is neither `inventory` nor `variables`.
    #[error("unknown category `{0}`")]
    UnknownCategory(String),

    /// The key after the category is empty.
    #[error("empty key in `{0}`")]
    EmptyKey(String),

    /// An arithmetic operand is not an integer.
    #[error("operand `{0}` is not an integer")]
    InvalidOperand(String),
}

/// The state bucket an expression addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// `inventory.*`
    Inventory,
    /// `variables.*`
    Variables,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Inventory => "inventory",
            Self::Variables => "variables",
        })
    }
}

/// A comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparator {
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `>`
    Gt,
    /// `<`
    Lt,
    /// `>=`
    Ge,
    /// `<=`
    Le,
}

#[derive(Debug, Clone, Copy)]
enum AssignOp {
    Set,
    Add,
    Sub,
}

const COMPARATORS: [(&str, Comparator); 6] = [
    (">=", Comparator::Ge),
    ("<=", Comparator::Le),
    ("!=", Comparator::Ne),
    ("=", Comparator::Eq),
    (">", Comparator::Gt),
    ("<", Comparator::Lt),
];

const ASSIGN_OPS: [(&str, AssignOp); 3] = [
    ("+=", AssignOp::Add),
    ("-=", AssignOp::Sub),
    ("=", AssignOp::Set),
];

/// A parsed condition: `<category>.<key> <comparator> <literal>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Addressed bucket.
    pub category: Category,
    /// Addressed key.
    pub key: String,
    /// Comparison operator.
    pub comparator: Comparator,
    /// Right-hand literal.
    pub literal: Value,
}

/// The mutation an effect performs.
#[derive(Debug, Clone, PartialEq)]
pub enum Assignment {
    /// `=`: replace the value.
    Set(Value),
    /// `+=`: add to the numeric value.
    Add(i64),
    /// `-=`: subtract from the numeric value.
    Sub(i64),
}

/// A parsed effect: `<category>.<key> <assignOp> <operand>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Effect {
    /// Addressed bucket.
    pub category: Category,
    /// Addressed key.
    pub key: String,
    /// Mutation to perform.
    pub assignment: Assignment,
}

fn split_on_operator<'a, T: Copy>(
    expr: &'a str,
    operators: &[(&str, T)],
) -> Option<(&'a str, T, &'a str)> {
    for (index, _) in expr.char_indices() {
        let rest = &expr[index..];
        for (token, op) in operators {
            if let Some(operand) = rest.strip_prefix(token) {
                return Some((&expr[..index], *op, operand));
            }
        }
    }
    None
}

fn parse_target(lhs: &str) -> Result<(Category, String), ExpressionError> {
    let lhs = lhs.trim();
    let (category, key) = lhs
        .split_once('.')
        .ok_or_else(|| ExpressionError::MissingCategory(lhs.to_owned()))?;
    let category = match category.trim() {
        "inventory" => Category::Inventory,
        "variables" => Category::Variables,
        other => return Err(ExpressionError::UnknownCategory(other.to_owned())),
    };
    let key = key.trim();
    if key.is_empty() {
        return Err(ExpressionError::EmptyKey(lhs.to_owned()));
    }
    Ok((category, key.to_owned()))
}

impl FromStr for Condition {
    type Err = ExpressionError;

    fn from_str(expr: &str) -> Result<Self, Self::Err> {
        let (lhs, comparator, rhs) = split_on_operator(expr, &COMPARATORS)
            .ok_or_else(|| ExpressionError::MissingOperator(expr.to_owned()))?;
        let (category, key) = parse_target(lhs)?;
        Ok(Self {
            category,
            key,
            comparator,
            literal: Value::parse_literal(rhs.trim()),
        })
    }
}

impl Condition {
    /// Evaluates the condition. A missing key only satisfies `!=`.
    #[must_use]
    pub fn evaluate(&self, state: &GameState) -> bool {
        let Some(current) = state.lookup(self.category, &self.key) else {
            return self.comparator == Comparator::Ne;
        };
        let ordering = current.compare(&self.literal);
        match self.comparator {
            Comparator::Eq => *current == self.literal,
            Comparator::Ne => *current != self.literal,
            Comparator::Gt => ordering == Some(Ordering::Greater),
            Comparator::Lt => ordering == Some(Ordering::Less),
            Comparator::Ge => matches!(ordering, Some(Ordering::Greater | Ordering::Equal)),
            Comparator::Le => matches!(ordering, Some(Ordering::Less | Ordering::Equal)),
        }
    }
}

impl FromStr for Effect {
    type Err = ExpressionError;

    fn from_str(expr: &str) -> Result<Self, Self::Err> {
        let (lhs, op, rhs) = split_on_operator(expr, &ASSIGN_OPS)
            .ok_or_else(|| ExpressionError::MissingOperator(expr.to_owned()))?;
        let (category, key) = parse_target(lhs)?;
        let rhs = rhs.trim();
        let integer = || {
            rhs.parse::<i64>()
                .map_err(|_| ExpressionError::InvalidOperand(rhs.to_owned()))
        };
        let assignment = match op {
            AssignOp::Set => Assignment::Set(Value::parse_literal(rhs)),
            AssignOp::Add => Assignment::Add(integer()?),
            AssignOp::Sub => Assignment::Sub(integer()?),
        };
        Ok(Self {
            category,
            key,
            assignment,
        })
    }
}

impl Effect {
    /// Applies the effect in place. Arithmetic on an absent key starts
    /// from 0.
    #[allow(clippy::cast_precision_loss)]
    pub fn apply_to(&self, state: &mut GameState) {
        let delta = match &self.assignment {
            Assignment::Set(value) => {
                state
                    .bucket_mut(self.category)
                    .insert(self.key.clone(), value.clone());
                return;
            }
            Assignment::Add(operand) => *operand as f64,
            Assignment::Sub(operand) => -(*operand as f64),
        };
        let bucket = state.bucket_mut(self.category);
        let base = match bucket.get(&self.key) {
            None => 0.0,
            Some(current) => current.arithmetic_base().unwrap_or_else(|| {
                warn!(
                    category = %self.category,
                    key = %self.key,
                    value = %current,
                    "non-numeric value used in arithmetic effect, treating as 0"
                );
                0.0
            }),
        };
        bucket.insert(self.key.clone(), Value::Number(base + delta));
    }
}

/// Evaluates one condition string. Malformed input evaluates to `false`.
#[must_use]
pub fn evaluate_condition(expr: &str, state: &GameState) -> bool {
    match expr.parse::<Condition>() {
        Ok(condition) => condition.evaluate(state),
        Err(err) => {
            warn!(expression = expr, error = %err, "malformed condition evaluates to false");
            false
        }
    }
}

/// Applies a batch of effect strings as a sequential fold and returns the
/// new state; `state` is left untouched. Malformed expressions are skipped,
/// the rest of the batch still applies.
#[must_use]
pub fn apply_effects<S: AsRef<str>>(effects: &[S], state: &GameState) -> GameState {
    let mut next = state.clone();
    for expr in effects {
        let expr = expr.as_ref();
        match expr.parse::<Effect>() {
            Ok(effect) => effect.apply_to(&mut next),
            Err(err) => warn!(expression = expr, error = %err, "skipping malformed effect"),
        }
    }
    next
}

/// A choice with its expressions parsed once, so availability checks on
/// every render do not re-parse.
#[derive(Debug, Clone)]
pub struct CompiledChoice {
    /// The authored choice.
    pub choice: Choice,
    conditions: Vec<(String, Result<Condition, ExpressionError>)>,
    effects: Vec<(String, Result<Effect, ExpressionError>)>,
}

impl CompiledChoice {
    /// Parses every expression of `choice`, logging malformed ones.
    #[must_use]
    pub fn compile(choice: &Choice) -> Self {
        let conditions = choice
            .conditions
            .iter()
            .map(|expr| (expr.clone(), expr.parse::<Condition>()))
            .collect();
        let effects = choice
            .effects
            .iter()
            .map(|expr| (expr.clone(), expr.parse::<Effect>()))
            .collect();
        let compiled = Self {
            choice: choice.clone(),
            conditions,
            effects,
        };
        for (expr, err) in compiled.diagnostics() {
            warn!(choice = %choice.label, expression = expr, error = %err, "malformed expression in choice");
        }
        compiled
    }

    /// A choice is enabled iff every condition holds. Malformed conditions
    /// never hold.
    #[must_use]
    pub fn is_enabled(&self, state: &GameState) -> bool {
        self.conditions
            .iter()
            .all(|(_, parsed)| parsed.as_ref().is_ok_and(|c| c.evaluate(state)))
    }

    /// The authored text of every condition that does not hold.
    #[must_use]
    pub fn unmet_conditions(&self, state: &GameState) -> Vec<&str> {
        self.conditions
            .iter()
            .filter(|(_, parsed)| !parsed.as_ref().is_ok_and(|c| c.evaluate(state)))
            .map(|(expr, _)| expr.as_str())
            .collect()
    }

    /// Applies the effects in order and returns the new state.
    #[must_use]
    pub fn apply(&self, state: &GameState) -> GameState {
        let mut next = state.clone();
        for effect in self.effects.iter().filter_map(|(_, parsed)| parsed.as_ref().ok()) {
            effect.apply_to(&mut next);
        }
        next
    }

    /// Every malformed expression with its parse error.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<(&str, &ExpressionError)> {
        let conditions = self
            .conditions
            .iter()
            .filter_map(|(expr, parsed)| parsed.as_ref().err().map(|e| (expr.as_str(), e)));
        let effects = self
            .effects
            .iter()
            .filter_map(|(expr, parsed)| parsed.as_ref().err().map(|e| (expr.as_str(), e)));
        conditions.chain(effects).collect()
    }
}
