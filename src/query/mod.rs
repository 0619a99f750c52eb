//! Query composition.
//!
//! `QueryOptions` is the caller-facing description (domain values).
//! `WireQuery` is the same query after the codec has encoded every
//! comparand; backends evaluate `WireQuery` only.
//!
//! Filters are conjunctive. Evaluation order does not change the result.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::codec::TemporalCodec;
use crate::model::{Value, WireDocument, WireMap, WireValue};
use crate::{Error, Result};

// ============================================================================
// Operators
// ============================================================================

/// Comparison operator of a single filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    ArrayContains,
    ArrayContainsAny,
    In,
}

impl FilterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "==",
            FilterOp::Ne => "!=",
            FilterOp::Lt => "<",
            FilterOp::Le => "<=",
            FilterOp::Gt => ">",
            FilterOp::Ge => ">=",
            FilterOp::ArrayContains => "array-contains",
            FilterOp::ArrayContainsAny => "array-contains-any",
            FilterOp::In => "in",
        }
    }

    /// Operators whose comparand is a list of alternatives.
    pub fn is_disjunctive(&self) -> bool {
        matches!(self, FilterOp::ArrayContainsAny | FilterOp::In)
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(match s {
            "==" => FilterOp::Eq,
            "!=" => FilterOp::Ne,
            "<" => FilterOp::Lt,
            "<=" => FilterOp::Le,
            ">" => FilterOp::Gt,
            ">=" => FilterOp::Ge,
            "array-contains" => FilterOp::ArrayContains,
            "array-contains-any" => FilterOp::ArrayContainsAny,
            "in" => FilterOp::In,
            other => return Err(Error::Validation(format!("unknown filter operator `{other}`"))),
        })
    }
}

// ============================================================================
// Caller-facing query description
// ============================================================================

/// `(field, op, comparand)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn new(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self { field: field.into(), op, value: value.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Filters (AND), then at most one ordering clause, then an optional limit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryOptions {
    pub filters: SmallVec<[Filter; 4]>,
    pub order_by: Option<OrderBy>,
    /// `Some(0)` is treated as no limit.
    pub limit: Option<usize>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::new(field, op, value));
        self
    }

    pub fn where_eq(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter(field, FilterOp::Eq, value)
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy { field: field.into(), direction });
        self
    }

    pub fn limit(mut self, count: usize) -> Self {
        self.limit = Some(count);
        self
    }

    /// Validate and encode every comparand for the backend.
    ///
    /// `max_disjunction` caps the comparand list of `in` /
    /// `array-contains-any`.
    pub fn to_wire(&self, max_disjunction: Option<usize>) -> Result<WireQuery> {
        let mut filters = Vec::with_capacity(self.filters.len());
        for f in &self.filters {
            if f.field.is_empty() {
                return Err(Error::Validation("filter field name must not be empty".into()));
            }
            if f.op.is_disjunctive() {
                let Some(list) = f.value.as_list() else {
                    return Err(Error::Validation(format!(
                        "`{}` on `{}` needs a list comparand, got {}",
                        f.op, f.field, f.value.type_name()
                    )));
                };
                if list.is_empty() {
                    return Err(Error::Validation(format!(
                        "`{}` on `{}` needs at least one value", f.op, f.field
                    )));
                }
                if let Some(max) = max_disjunction {
                    if list.len() > max {
                        return Err(Error::Validation(format!(
                            "`{}` on `{}` allows at most {max} values, got {}",
                            f.op, f.field, list.len()
                        )));
                    }
                }
            }
            filters.push(WireFilter {
                field: f.field.clone(),
                op: f.op,
                value: TemporalCodec::to_wire(&f.value),
            });
        }
        Ok(WireQuery {
            filters,
            order_by: self.order_by.clone(),
            limit: self.limit.filter(|n| *n > 0),
        })
    }
}

// ============================================================================
// Backend-facing query
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireFilter {
    pub field: String,
    pub op: FilterOp,
    pub value: WireValue,
}

impl WireFilter {
    /// Does this filter accept the given document body?
    /// A document lacking the field never matches.
    pub fn matches(&self, fields: &WireMap) -> bool {
        let Some(actual) = fields.get(&self.field) else {
            return false;
        };
        let range = |want: fn(Ordering) -> bool| {
            actual.same_class(&self.value) && want(actual.total_cmp(&self.value))
        };
        match self.op {
            FilterOp::Eq => actual.loose_eq(&self.value),
            FilterOp::Ne => !actual.loose_eq(&self.value),
            FilterOp::Lt => range(|o| o == Ordering::Less),
            FilterOp::Le => range(|o| o != Ordering::Greater),
            FilterOp::Gt => range(|o| o == Ordering::Greater),
            FilterOp::Ge => range(|o| o != Ordering::Less),
            FilterOp::ArrayContains => match actual {
                WireValue::Array(items) => items.iter().any(|i| i.loose_eq(&self.value)),
                _ => false,
            },
            FilterOp::ArrayContainsAny => match (actual, &self.value) {
                (WireValue::Array(items), WireValue::Array(wanted)) => {
                    items.iter().any(|i| wanted.iter().any(|w| i.loose_eq(w)))
                }
                _ => false,
            },
            FilterOp::In => match &self.value {
                WireValue::Array(wanted) => wanted.iter().any(|w| actual.loose_eq(w)),
                _ => false,
            },
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WireQuery {
    pub filters: Vec<WireFilter>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl WireQuery {
    pub fn matches(&self, fields: &WireMap) -> bool {
        self.filters.iter().all(|f| f.matches(fields))
    }

    /// Run the query over documents given in backend order.
    ///
    /// Ordering is a stable sort, so ties keep backend order. Documents
    /// lacking the order field are excluded once an order clause is given.
    pub fn evaluate<'a, I>(&self, docs: I) -> Vec<WireDocument>
    where
        I: IntoIterator<Item = &'a WireDocument>,
    {
        let mut out: Vec<WireDocument> = docs
            .into_iter()
            .filter(|d| self.matches(&d.fields))
            .cloned()
            .collect();

        if let Some(order) = &self.order_by {
            out.retain(|d| d.fields.contains_key(&order.field));
            out.sort_by(|a, b| {
                let ord = a.fields[&order.field].total_cmp(&b.fields[&order.field]);
                match order.direction {
                    Direction::Asc => ord,
                    Direction::Desc => ord.reverse(),
                }
            });
        }

        if let Some(n) = self.limit {
            out.truncate(n);
        }
        out
    }
}
