//! Filter expression evaluator for Query and Scan operations.
//!
//! Filters are evaluated against stored items after key-based retrieval.
//! Numbers compare by decimal value, strings and binaries by byte order.
//! Values of different types never compare, sets only support equality,
//! and a missing attribute never satisfies a comparison.

use std::cmp::Ordering;

use crate::encoding::{AttributeValue, Item};
use crate::error::FilterError;

/// A filter expression that can be evaluated against an item.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpr {
    // Leaf nodes
    /// Reference to an item attribute by name.
    Attr(String),
    /// A literal value.
    Literal(AttributeValue),

    // Comparisons
    Eq(Box<FilterExpr>, Box<FilterExpr>),
    Ne(Box<FilterExpr>, Box<FilterExpr>),
    Lt(Box<FilterExpr>, Box<FilterExpr>),
    Le(Box<FilterExpr>, Box<FilterExpr>),
    Gt(Box<FilterExpr>, Box<FilterExpr>),
    Ge(Box<FilterExpr>, Box<FilterExpr>),
    Between(Box<FilterExpr>, Box<FilterExpr>, Box<FilterExpr>),

    // String and set operations
    BeginsWith(Box<FilterExpr>, String),
    /// Substring of a string, or element of a set.
    Contains(Box<FilterExpr>, AttributeValue),

    // Existence checks
    AttributeExists(String),
    AttributeNotExists(String),

    // Boolean logic
    And(Vec<FilterExpr>),
    Or(Vec<FilterExpr>),
    Not(Box<FilterExpr>),
}

/// Maximum nesting depth for filter expressions.
const MAX_EXPRESSION_DEPTH: usize = 16;

impl FilterExpr {
    /// Check the expression's shape without evaluating it.
    ///
    /// Leaves may only appear as comparison operands, comparison operands
    /// must be leaves, and nesting is limited to 16 levels. An expression
    /// that validates never fails in [`eval`](Self::eval).
    pub fn validate(&self) -> Result<(), FilterError> {
        self.validate_inner(0)
    }

    fn validate_inner(&self, depth: usize) -> Result<(), FilterError> {
        if depth > MAX_EXPRESSION_DEPTH {
            return Err(FilterError::InvalidExpression(format!(
                "expression depth exceeds maximum of {MAX_EXPRESSION_DEPTH}"
            )));
        }
        match self {
            FilterExpr::Attr(_) | FilterExpr::Literal(_) => Err(FilterError::InvalidExpression(
                "leaf node cannot be evaluated as a boolean".to_string(),
            )),
            FilterExpr::Eq(l, r)
            | FilterExpr::Ne(l, r)
            | FilterExpr::Lt(l, r)
            | FilterExpr::Le(l, r)
            | FilterExpr::Gt(l, r)
            | FilterExpr::Ge(l, r) => {
                require_operand(l)?;
                require_operand(r)
            }
            FilterExpr::Between(v, lo, hi) => {
                require_operand(v)?;
                require_operand(lo)?;
                require_operand(hi)
            }
            FilterExpr::BeginsWith(e, _) | FilterExpr::Contains(e, _) => require_operand(e),
            FilterExpr::AttributeExists(_) | FilterExpr::AttributeNotExists(_) => Ok(()),
            FilterExpr::And(exprs) | FilterExpr::Or(exprs) => exprs
                .iter()
                .try_for_each(|e| e.validate_inner(depth + 1)),
            FilterExpr::Not(e) => e.validate_inner(depth + 1),
        }
    }

    /// Evaluate this filter expression against an item.
    ///
    /// Returns `true` if the item passes the filter, `false` otherwise.
    pub fn eval(&self, item: &Item) -> Result<bool, FilterError> {
        self.eval_inner(item, 0)
    }

    fn eval_inner(&self, item: &Item, depth: usize) -> Result<bool, FilterError> {
        if depth > MAX_EXPRESSION_DEPTH {
            return Err(FilterError::InvalidExpression(format!(
                "expression depth exceeds maximum of {MAX_EXPRESSION_DEPTH}"
            )));
        }

        match self {
            FilterExpr::Attr(_) | FilterExpr::Literal(_) => Err(FilterError::InvalidExpression(
                "leaf node cannot be evaluated as a boolean".to_string(),
            )),

            FilterExpr::Eq(left, right) => {
                compare(item, left, right, |ord| ord == Some(Ordering::Equal))
            }
            FilterExpr::Ne(left, right) => {
                compare(item, left, right, |ord| ord != Some(Ordering::Equal))
            }
            FilterExpr::Lt(left, right) => {
                compare(item, left, right, |ord| ord == Some(Ordering::Less))
            }
            FilterExpr::Le(left, right) => compare(item, left, right, |ord| {
                matches!(ord, Some(Ordering::Less | Ordering::Equal))
            }),
            FilterExpr::Gt(left, right) => {
                compare(item, left, right, |ord| ord == Some(Ordering::Greater))
            }
            FilterExpr::Ge(left, right) => compare(item, left, right, |ord| {
                matches!(ord, Some(Ordering::Greater | Ordering::Equal))
            }),
            FilterExpr::Between(val, low, high) => {
                let (Some(v), Some(lo), Some(hi)) = (
                    resolve_expr(val, item)?,
                    resolve_expr(low, item)?,
                    resolve_expr(high, item)?,
                ) else {
                    return Ok(false);
                };
                let ge_low = matches!(
                    compare_values(v, lo),
                    Some(Ordering::Greater | Ordering::Equal)
                );
                let le_high = matches!(
                    compare_values(v, hi),
                    Some(Ordering::Less | Ordering::Equal)
                );
                Ok(ge_low && le_high)
            }

            FilterExpr::BeginsWith(expr, prefix) => match resolve_expr(expr, item)? {
                Some(AttributeValue::String(s)) => Ok(s.starts_with(prefix.as_str())),
                Some(AttributeValue::Binary(b)) => Ok(b.starts_with(prefix.as_bytes())),
                _ => Ok(false),
            },
            FilterExpr::Contains(expr, search) => {
                let found = match (resolve_expr(expr, item)?, search) {
                    (Some(AttributeValue::String(s)), AttributeValue::String(needle)) => {
                        s.contains(needle.as_str())
                    }
                    (Some(AttributeValue::StringSet(set)), AttributeValue::String(needle)) => {
                        set.contains(needle)
                    }
                    (Some(AttributeValue::NumberSet(set)), AttributeValue::Number(needle)) => {
                        set.contains(needle)
                    }
                    (Some(AttributeValue::BinarySet(set)), AttributeValue::Binary(needle)) => {
                        set.contains(needle)
                    }
                    _ => false,
                };
                Ok(found)
            }

            FilterExpr::AttributeExists(name) => Ok(item.contains(name)),
            FilterExpr::AttributeNotExists(name) => Ok(!item.contains(name)),

            FilterExpr::And(exprs) => {
                for expr in exprs {
                    if !expr.eval_inner(item, depth + 1)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            FilterExpr::Or(exprs) => {
                for expr in exprs {
                    if expr.eval_inner(item, depth + 1)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            FilterExpr::Not(expr) => Ok(!expr.eval_inner(item, depth + 1)?),
        }
    }

    /// `attr == value` pairs that every matching item must satisfy.
    ///
    /// Walks the top-level conjunction (including nested `And`s) and collects
    /// equalities between an attribute and a literal. Anything under `Or` or
    /// `Not` is ignored, since it does not constrain every match.
    pub fn required_equalities(&self) -> Vec<(&str, &AttributeValue)> {
        let mut out = Vec::new();
        self.collect_equalities(&mut out);
        out
    }

    fn collect_equalities<'a>(&'a self, out: &mut Vec<(&'a str, &'a AttributeValue)>) {
        match self {
            FilterExpr::Eq(l, r) => match (l.as_ref(), r.as_ref()) {
                (FilterExpr::Attr(name), FilterExpr::Literal(v))
                | (FilterExpr::Literal(v), FilterExpr::Attr(name)) => out.push((name, v)),
                _ => {}
            },
            FilterExpr::And(exprs) => {
                for expr in exprs {
                    expr.collect_equalities(out);
                }
            }
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn require_operand(expr: &FilterExpr) -> Result<(), FilterError> {
    match expr {
        FilterExpr::Attr(_) | FilterExpr::Literal(_) => Ok(()),
        _ => Err(FilterError::InvalidExpression(
            "expected attribute or literal in comparison position".to_string(),
        )),
    }
}

/// Resolve an operand to a value. `Ok(None)` means the attribute is missing.
fn resolve_expr<'a>(
    expr: &'a FilterExpr,
    item: &'a Item,
) -> Result<Option<&'a AttributeValue>, FilterError> {
    match expr {
        FilterExpr::Attr(name) => Ok(item.get(name)),
        FilterExpr::Literal(val) => Ok(Some(val)),
        _ => Err(FilterError::InvalidExpression(
            "expected attribute or literal in comparison position".to_string(),
        )),
    }
}

fn compare(
    item: &Item,
    left: &FilterExpr,
    right: &FilterExpr,
    accept: impl Fn(Option<Ordering>) -> bool,
) -> Result<bool, FilterError> {
    match (resolve_expr(left, item)?, resolve_expr(right, item)?) {
        (Some(l), Some(r)) => Ok(accept(compare_values(l, r))),
        _ => Ok(false),
    }
}

/// Compare two values, returning an ordering if the types are comparable.
///
/// - Numbers: compared by exact decimal value
/// - Strings and binaries: compared bytewise
/// - Sets of the same type: `Equal` if they hold the same elements, otherwise unordered
/// - Mismatched types: returns `None`
pub fn compare_values(left: &AttributeValue, right: &AttributeValue) -> Option<Ordering> {
    match (left, right) {
        (AttributeValue::Number(a), AttributeValue::Number(b)) => Some(a.cmp(b)),
        (AttributeValue::String(a), AttributeValue::String(b)) => Some(a.as_bytes().cmp(b.as_bytes())),
        (AttributeValue::Binary(a), AttributeValue::Binary(b)) => Some(a.cmp(b)),
        (AttributeValue::NumberSet(a), AttributeValue::NumberSet(b)) => {
            (a == b).then_some(Ordering::Equal)
        }
        (AttributeValue::StringSet(a), AttributeValue::StringSet(b)) => {
            (a == b).then_some(Ordering::Equal)
        }
        (AttributeValue::BinarySet(a), AttributeValue::BinarySet(b)) => {
            (a == b).then_some(Ordering::Equal)
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Convenience constructors
// ---------------------------------------------------------------------------

impl FilterExpr {
    /// Create an attribute reference.
    pub fn attr(name: impl Into<String>) -> Self {
        FilterExpr::Attr(name.into())
    }

    /// Create a literal value.
    pub fn literal(val: impl Into<AttributeValue>) -> Self {
        FilterExpr::Literal(val.into())
    }

    /// `attr == value`
    pub fn eq(left: FilterExpr, right: FilterExpr) -> Self {
        FilterExpr::Eq(Box::new(left), Box::new(right))
    }

    /// `attr <> value`
    pub fn ne(left: FilterExpr, right: FilterExpr) -> Self {
        FilterExpr::Ne(Box::new(left), Box::new(right))
    }

    /// `attr < value`
    pub fn lt(left: FilterExpr, right: FilterExpr) -> Self {
        FilterExpr::Lt(Box::new(left), Box::new(right))
    }

    /// `attr <= value`
    pub fn le(left: FilterExpr, right: FilterExpr) -> Self {
        FilterExpr::Le(Box::new(left), Box::new(right))
    }

    /// `attr > value`
    pub fn gt(left: FilterExpr, right: FilterExpr) -> Self {
        FilterExpr::Gt(Box::new(left), Box::new(right))
    }

    /// `attr >= value`
    pub fn ge(left: FilterExpr, right: FilterExpr) -> Self {
        FilterExpr::Ge(Box::new(left), Box::new(right))
    }

    /// `attr BETWEEN low AND high`
    pub fn between(val: FilterExpr, low: FilterExpr, high: FilterExpr) -> Self {
        FilterExpr::Between(Box::new(val), Box::new(low), Box::new(high))
    }

    /// `begins_with(attr, prefix)`
    pub fn begins_with(expr: FilterExpr, prefix: impl Into<String>) -> Self {
        FilterExpr::BeginsWith(Box::new(expr), prefix.into())
    }

    /// `contains(attr, value)`
    pub fn contains(expr: FilterExpr, search: impl Into<AttributeValue>) -> Self {
        FilterExpr::Contains(Box::new(expr), search.into())
    }

    /// `attribute_exists(name)`
    pub fn attribute_exists(name: impl Into<String>) -> Self {
        FilterExpr::AttributeExists(name.into())
    }

    /// `attribute_not_exists(name)`
    pub fn attribute_not_exists(name: impl Into<String>) -> Self {
        FilterExpr::AttributeNotExists(name.into())
    }

    /// `expr1 AND expr2 AND ...`
    pub fn and(exprs: Vec<FilterExpr>) -> Self {
        FilterExpr::And(exprs)
    }

    /// `expr1 OR expr2 OR ...`
    pub fn or(exprs: Vec<FilterExpr>) -> Self {
        FilterExpr::Or(exprs)
    }

    /// `NOT expr`
    #[allow(clippy::should_implement_trait)]
    pub fn not(expr: FilterExpr) -> Self {
        FilterExpr::Not(Box::new(expr))
    }
}
