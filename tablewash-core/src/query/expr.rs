//! Binding of parsed expressions to a schema, and row evaluation.

use crate::data::{ColumnType, Row, Schema, Value};
use crate::error::WashError;
use crate::query::parser::{CmpOp, Expr};
use std::cmp::Ordering;

/// A scalar side of a comparison, resolved to a column index.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Column(usize),
    Literal(Value),
}

impl Operand {
    fn value<'a>(&'a self, row: &'a Row) -> &'a Value {
        match self {
            Operand::Column(i) => &row[*i],
            Operand::Literal(v) => v,
        }
    }
}

/// A predicate whose column references have been checked against a schema.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundExpr {
    Compare {
        left: Operand,
        op: CmpOp,
        right: Operand,
    },
    IsNull {
        operand: Operand,
        negated: bool,
    },
    And(Box<BoundExpr>, Box<BoundExpr>),
    Or(Box<BoundExpr>, Box<BoundExpr>),
    Not(Box<BoundExpr>),
}

impl Expr {
    /// Resolve columns and check operand types.
    pub fn bind(&self, schema: &Schema) -> Result<BoundExpr, WashError> {
        match self {
            Expr::Compare { left, op, right } => {
                let (left, lt) = bind_operand(left, schema)?;
                let (right, rt) = bind_operand(right, schema)?;
                if let (Some(a), Some(b)) = (lt, rt) {
                    if a.is_numeric() != b.is_numeric() {
                        return Err(WashError::query(format!(
                            "cannot compare {a} with {b} in '{}'",
                            describe(self)
                        )));
                    }
                }
                Ok(BoundExpr::Compare {
                    left,
                    op: *op,
                    right,
                })
            }
            Expr::IsNull { expr, negated } => Ok(BoundExpr::IsNull {
                operand: bind_operand(expr, schema)?.0,
                negated: *negated,
            }),
            Expr::And(a, b) => Ok(BoundExpr::And(
                Box::new(a.bind(schema)?),
                Box::new(b.bind(schema)?),
            )),
            Expr::Or(a, b) => Ok(BoundExpr::Or(
                Box::new(a.bind(schema)?),
                Box::new(b.bind(schema)?),
            )),
            Expr::Not(inner) => Ok(BoundExpr::Not(Box::new(inner.bind(schema)?))),
            Expr::Column(_) | Expr::Literal(_) => Err(WashError::query(format!(
                "'{}' is not a boolean condition",
                describe(self)
            ))),
        }
    }
}

fn bind_operand(expr: &Expr, schema: &Schema) -> Result<(Operand, Option<ColumnType>), WashError> {
    match expr {
        Expr::Column(name) => {
            let col = schema.resolve(name)?;
            Ok((Operand::Column(col.index), Some(col.dtype)))
        }
        Expr::Literal(value) => Ok((Operand::Literal(value.clone()), value.dtype())),
        other => Err(WashError::query(format!(
            "expected a column or literal, found '{}'",
            describe(other)
        ))),
    }
}

fn describe(expr: &Expr) -> String {
    match expr {
        Expr::Column(name) => name.clone(),
        Expr::Literal(Value::Str(s)) => format!("'{s}'"),
        Expr::Literal(Value::Null) => "NULL".to_string(),
        Expr::Literal(v) => v.to_string(),
        Expr::Compare { left, op, right } => {
            format!("{} {} {}", describe(left), op_symbol(*op), describe(right))
        }
        Expr::IsNull { expr, negated } => format!(
            "{} IS {}NULL",
            describe(expr),
            if *negated { "NOT " } else { "" }
        ),
        Expr::And(a, b) => format!("{} AND {}", describe(a), describe(b)),
        Expr::Or(a, b) => format!("{} OR {}", describe(a), describe(b)),
        Expr::Not(inner) => format!("NOT {}", describe(inner)),
    }
}

fn op_symbol(op: CmpOp) -> &'static str {
    match op {
        CmpOp::Eq => "=",
        CmpOp::Ne => "<>",
        CmpOp::Lt => "<",
        CmpOp::Le => "<=",
        CmpOp::Gt => ">",
        CmpOp::Ge => ">=",
    }
}

impl BoundExpr {
    /// SQL three-valued evaluation; `None` is unknown.
    pub fn eval(&self, row: &Row) -> Option<bool> {
        match self {
            BoundExpr::Compare { left, op, right } => {
                let (a, b) = (left.value(row), right.value(row));
                if a.is_null() || b.is_null() {
                    return None;
                }
                if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
                    if x.is_nan() || y.is_nan() {
                        return Some(*op == CmpOp::Ne);
                    }
                }
                let ord = a.total_cmp(b);
                Some(match op {
                    CmpOp::Eq => ord == Ordering::Equal,
                    CmpOp::Ne => ord != Ordering::Equal,
                    CmpOp::Lt => ord == Ordering::Less,
                    CmpOp::Le => ord != Ordering::Greater,
                    CmpOp::Gt => ord == Ordering::Greater,
                    CmpOp::Ge => ord != Ordering::Less,
                })
            }
            BoundExpr::IsNull { operand, negated } => {
                Some(operand.value(row).is_null() != *negated)
            }
            BoundExpr::And(a, b) => match (a.eval(row), b.eval(row)) {
                (Some(false), _) | (_, Some(false)) => Some(false),
                (Some(true), Some(true)) => Some(true),
                _ => None,
            },
            BoundExpr::Or(a, b) => match (a.eval(row), b.eval(row)) {
                (Some(true), _) | (_, Some(true)) => Some(true),
                (Some(false), Some(false)) => Some(false),
                _ => None,
            },
            BoundExpr::Not(inner) => inner.eval(row).map(|b| !b),
        }
    }

    /// True only when the predicate definitely holds.
    pub fn matches(&self, row: &Row) -> bool {
        self.eval(row) == Some(true)
    }
}
