//! Filter criteria for read, update and delete operations.
//!
//! Criteria combine two styles, mirroring how test code naturally writes
//! filters: keyword equality conditions (`field = value`, always ANDed) and
//! positional predicate expressions ([`Condition`]) for anything richer.
//!
//! The read path applies both sets together. The write path (update/delete)
//! uses the predicate expressions when any are present and falls back to the
//! equality conditions otherwise.
//!
//! Field names in criteria are logical; the facade remaps them to physical
//! identifiers before a client sees them.

use std::fmt;

use serde_json::Value;

/// Comparison operator for a predicate expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    /// `field = value`
    Eq,
    /// `field <> value`
    Ne,
    /// `field > value`
    Gt,
    /// `field >= value`
    Ge,
    /// `field < value`
    Lt,
    /// `field <= value`
    Le,
    /// `field IN (values...)`
    In,
    /// `field LIKE pattern`
    Like,
    /// `field IS NULL`
    IsNull,
    /// `field IS NOT NULL`
    IsNotNull,
}

impl Op {
    fn symbol(self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Ne => "<>",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::In => "IN",
            Op::Like => "LIKE",
            Op::IsNull => "IS NULL",
            Op::IsNotNull => "IS NOT NULL",
        }
    }
}

/// One predicate expression over a single field.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// The field the predicate applies to.
    pub field: String,
    /// The comparison operator.
    pub op: Op,
    /// Operand values: empty for null checks, one for binary operators,
    /// any number for `In`.
    pub values: Vec<Value>,
}

impl Condition {
    fn unary(field: impl Into<String>, op: Op) -> Self {
        Self {
            field: field.into(),
            op,
            values: Vec::new(),
        }
    }

    fn binary(field: impl Into<String>, op: Op, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            values: vec![value.into()],
        }
    }

    /// `field = value`
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::binary(field, Op::Eq, value)
    }

    /// `field <> value`
    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::binary(field, Op::Ne, value)
    }

    /// `field > value`
    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::binary(field, Op::Gt, value)
    }

    /// `field >= value`
    pub fn ge(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::binary(field, Op::Ge, value)
    }

    /// `field < value`
    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::binary(field, Op::Lt, value)
    }

    /// `field <= value`
    pub fn le(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::binary(field, Op::Le, value)
    }

    /// `field IN (values...)`
    pub fn is_in<V: Into<Value>>(field: impl Into<String>, values: Vec<V>) -> Self {
        Self {
            field: field.into(),
            op: Op::In,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// `field LIKE pattern`
    pub fn like(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::binary(field, Op::Like, pattern.into())
    }

    /// `field IS NULL`
    pub fn is_null(field: impl Into<String>) -> Self {
        Self::unary(field, Op::IsNull)
    }

    /// `field IS NOT NULL`
    pub fn is_not_null(field: impl Into<String>) -> Self {
        Self::unary(field, Op::IsNotNull)
    }

    fn renamed(&self, field: String) -> Self {
        Self {
            field,
            op: self.op,
            values: self.values.clone(),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.op {
            Op::IsNull | Op::IsNotNull => write!(f, "{} {}", self.field, self.op.symbol()),
            Op::In => {
                let items: Vec<String> = self.values.iter().map(|v| v.to_string()).collect();
                write!(f, "{} IN ({})", self.field, items.join(", "))
            }
            _ => write!(
                f,
                "{} {} {}",
                self.field,
                self.op.symbol(),
                self.values.first().unwrap_or(&Value::Null)
            ),
        }
    }
}

/// The combined filter used to select rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    exprs: Vec<Condition>,
    eq: Vec<(String, Value)>,
    order_by: Option<String>,
}

impl Criteria {
    /// An empty filter matching every row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Shortcut for a single keyword equality filter.
    pub fn by(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new().and_eq(field, value)
    }

    /// Adds a keyword equality condition.
    pub fn and_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.eq.push((field.into(), value.into()));
        self
    }

    /// Adds a predicate expression.
    pub fn and(mut self, condition: Condition) -> Self {
        self.exprs.push(condition);
        self
    }

    /// Orders results by the given logical field, ascending.
    pub fn order_by(mut self, field: impl Into<String>) -> Self {
        self.order_by = Some(field.into());
        self
    }

    /// The ordering field, if any.
    pub fn ordering(&self) -> Option<&str> {
        self.order_by.as_deref()
    }

    /// Whether no condition of either style was supplied.
    pub fn is_empty(&self) -> bool {
        self.exprs.is_empty() && self.eq.is_empty()
    }

    /// Conditions for the read path: expressions and equality conditions
    /// ANDed together.
    pub fn read_conditions(&self) -> Vec<Condition> {
        self.exprs
            .iter()
            .cloned()
            .chain(
                self.eq
                    .iter()
                    .map(|(field, value)| Condition::eq(field.clone(), value.clone())),
            )
            .collect()
    }

    /// Conditions for the write path: expressions when present, otherwise the
    /// equality conditions.
    pub fn write_conditions(&self) -> Vec<Condition> {
        if self.exprs.is_empty() {
            self.eq
                .iter()
                .map(|(field, value)| Condition::eq(field.clone(), value.clone()))
                .collect()
        } else {
            self.exprs.clone()
        }
    }

    /// Returns a copy with every field name translated through `rename`.
    ///
    /// Used by the facade to turn logical names into physical ones before a
    /// client sees the criteria.
    pub fn map_fields(&self, mut rename: impl FnMut(&str) -> String) -> Criteria {
        Criteria {
            exprs: self
                .exprs
                .iter()
                .map(|c| c.renamed(rename(&c.field)))
                .collect(),
            eq: self
                .eq
                .iter()
                .map(|(field, value)| (rename(field), value.clone()))
                .collect(),
            order_by: self.order_by.as_deref().map(&mut rename),
        }
    }
}

impl fmt::Display for Criteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "(all)");
        }
        let parts: Vec<String> = self
            .read_conditions()
            .iter()
            .map(ToString::to_string)
            .collect();
        write!(f, "{}", parts.join(" AND "))
    }
}
