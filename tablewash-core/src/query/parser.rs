//! Recursive-descent parser producing the query AST.

use crate::data::Value;
use crate::error::WashError;
use crate::query::lexer::{Token, tokenize};
use crate::transform::{AggFunc, OrderBy};

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Boolean and scalar expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(String),
    Literal(Value),
    Compare {
        left: Box<Expr>,
        op: CmpOp,
        right: Box<Expr>,
    },
    IsNull {
        expr: Box<Expr>,
        negated: bool,
    },
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    Wildcard,
    Column {
        name: String,
        alias: Option<String>,
    },
    Aggregate {
        func: AggFunc,
        /// Source column, or `*`.
        column: String,
        alias: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub items: Vec<SelectItem>,
    pub from: String,
    pub filter: Option<Expr>,
    pub group_by: Vec<String>,
    pub order_by: Vec<OrderBy>,
    pub limit: Option<usize>,
}

const RESERVED: &[&str] = &[
    "select", "from", "where", "group", "by", "order", "asc", "desc", "limit", "as", "and", "or",
    "not", "is", "null",
];

pub fn parse_query(text: &str) -> Result<Query, WashError> {
    let mut parser = Parser::new(text)?;
    let query = parser.query()?;
    parser.finish()?;
    Ok(query)
}

/// Parse a bare boolean expression, as used by filter steps.
pub fn parse_predicate(text: &str) -> Result<Expr, WashError> {
    let mut parser = Parser::new(text)?;
    let expr = parser.expr()?;
    parser.finish()?;
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn new(text: &str) -> Result<Self, WashError> {
        Ok(Self {
            tokens: tokenize(text)?,
            pos: 0,
        })
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn at_keyword(&self, kw: &str) -> bool {
        self.peek().is_some_and(|t| t.is_keyword(kw))
    }

    fn eat_keyword(&mut self, kw: &str) -> bool {
        if self.at_keyword(kw) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek() == Some(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, kw: &str) -> Result<(), WashError> {
        if self.eat_keyword(kw) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("keyword {}", kw.to_ascii_uppercase())))
        }
    }

    fn expect(&mut self, token: &Token, what: &str) -> Result<(), WashError> {
        if self.eat(token) {
            Ok(())
        } else {
            Err(self.unexpected(what))
        }
    }

    fn unexpected(&self, wanted: &str) -> WashError {
        match self.peek() {
            Some(t) => WashError::query(format!("expected {wanted}, found {t:?}")),
            None => WashError::query(format!("expected {wanted}, found end of input")),
        }
    }

    fn finish(&mut self) -> Result<(), WashError> {
        while self.eat(&Token::Semicolon) {}
        match self.peek() {
            None => Ok(()),
            Some(_) => Err(self.unexpected("end of input")),
        }
    }

    fn identifier(&mut self) -> Result<String, WashError> {
        match self.peek() {
            Some(Token::Ident { text, quoted }) => {
                if !quoted && RESERVED.iter().any(|r| text.eq_ignore_ascii_case(r)) {
                    return Err(self.unexpected("identifier"));
                }
                let text = text.clone();
                self.pos += 1;
                Ok(text)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn alias(&mut self) -> Result<Option<String>, WashError> {
        if self.eat_keyword("as") {
            return self.identifier().map(Some);
        }
        // Bare alias: `avg(x) mean_x`
        match self.peek() {
            Some(Token::Ident { text, quoted })
                if *quoted || !RESERVED.iter().any(|r| text.eq_ignore_ascii_case(r)) =>
            {
                self.identifier().map(Some)
            }
            _ => Ok(None),
        }
    }

    fn query(&mut self) -> Result<Query, WashError> {
        self.expect_keyword("select")?;
        let mut items = vec![self.select_item()?];
        while self.eat(&Token::Comma) {
            items.push(self.select_item()?);
        }

        self.expect_keyword("from")?;
        let from = self.identifier()?;

        let filter = if self.eat_keyword("where") {
            Some(self.expr()?)
        } else {
            None
        };

        let mut group_by = Vec::new();
        if self.eat_keyword("group") {
            self.expect_keyword("by")?;
            group_by.push(self.identifier()?);
            while self.eat(&Token::Comma) {
                group_by.push(self.identifier()?);
            }
        }

        let mut order_by = Vec::new();
        if self.eat_keyword("order") {
            self.expect_keyword("by")?;
            loop {
                let column = self.order_target()?;
                let descending = if self.eat_keyword("desc") {
                    true
                } else {
                    self.eat_keyword("asc");
                    false
                };
                order_by.push(OrderBy { column, descending });
                if !self.eat(&Token::Comma) {
                    break;
                }
            }
        }

        let limit = if self.eat_keyword("limit") {
            match self.advance() {
                Some(Token::Int(n)) if n >= 0 => Some(n as usize),
                _ => return Err(WashError::query("LIMIT expects a non-negative integer")),
            }
        } else {
            None
        };

        Ok(Query {
            items,
            from,
            filter,
            group_by,
            order_by,
            limit,
        })
    }

    /// ORDER BY accepts a plain name or an aggregate call such as `avg(salary)`.
    fn order_target(&mut self) -> Result<String, WashError> {
        let name = self.identifier()?;
        if let Some(func) = AggFunc::parse(&name) {
            if self.eat(&Token::LParen) {
                let column = self.agg_argument()?;
                self.expect(&Token::RParen, "')'")?;
                return Ok(default_agg_name(func, &column));
            }
        }
        Ok(name)
    }

    fn agg_argument(&mut self) -> Result<String, WashError> {
        if self.eat(&Token::Star) {
            Ok("*".to_string())
        } else {
            self.identifier()
        }
    }

    fn select_item(&mut self) -> Result<SelectItem, WashError> {
        if self.eat(&Token::Star) {
            return Ok(SelectItem::Wildcard);
        }
        let name = self.identifier()?;
        if self.peek() == Some(&Token::LParen) {
            let func = AggFunc::parse(&name)
                .ok_or_else(|| WashError::query(format!("unknown function '{name}'")))?;
            self.pos += 1;
            let column = self.agg_argument()?;
            self.expect(&Token::RParen, "')'")?;
            let alias = self.alias()?;
            return Ok(SelectItem::Aggregate {
                func,
                column,
                alias,
            });
        }
        let alias = self.alias()?;
        Ok(SelectItem::Column { name, alias })
    }

    pub(crate) fn expr(&mut self) -> Result<Expr, WashError> {
        let mut left = self.and_expr()?;
        while self.eat_keyword("or") {
            let right = self.and_expr()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr, WashError> {
        let mut left = self.not_expr()?;
        while self.eat_keyword("and") {
            let right = self.not_expr()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn not_expr(&mut self) -> Result<Expr, WashError> {
        if self.eat_keyword("not") {
            return Ok(Expr::Not(Box::new(self.not_expr()?)));
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr, WashError> {
        let left = self.primary()?;

        if self.eat_keyword("is") {
            let negated = self.eat_keyword("not");
            self.expect_keyword("null")?;
            return Ok(Expr::IsNull {
                expr: Box::new(left),
                negated,
            });
        }

        let op = match self.peek() {
            Some(Token::Eq) => CmpOp::Eq,
            Some(Token::Ne) => CmpOp::Ne,
            Some(Token::Lt) => CmpOp::Lt,
            Some(Token::Le) => CmpOp::Le,
            Some(Token::Gt) => CmpOp::Gt,
            Some(Token::Ge) => CmpOp::Ge,
            _ => return Ok(left),
        };
        self.pos += 1;
        let right = self.primary()?;
        Ok(Expr::Compare {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
    }

    fn primary(&mut self) -> Result<Expr, WashError> {
        if self.eat(&Token::LParen) {
            let inner = self.expr()?;
            self.expect(&Token::RParen, "')'")?;
            return Ok(inner);
        }
        if self.eat_keyword("null") {
            return Ok(Expr::Literal(Value::Null));
        }
        match self.peek().cloned() {
            Some(Token::Minus) => {
                self.pos += 1;
                match self.advance() {
                    Some(Token::Int(i)) => Ok(Expr::Literal(Value::Int(-i))),
                    Some(Token::Float(f)) => Ok(Expr::Literal(Value::Float(-f))),
                    _ => Err(WashError::query("'-' must be followed by a number")),
                }
            }
            Some(Token::Int(i)) => {
                self.pos += 1;
                Ok(Expr::Literal(Value::Int(i)))
            }
            Some(Token::Float(f)) => {
                self.pos += 1;
                Ok(Expr::Literal(Value::Float(f)))
            }
            Some(Token::Str(s)) => {
                self.pos += 1;
                Ok(Expr::Literal(Value::Str(s)))
            }
            Some(Token::Ident { .. }) => self.identifier().map(Expr::Column),
            _ => Err(self.unexpected("expression")),
        }
    }
}

/// Output name for an un-aliased aggregate, e.g. `avg(salary)`.
pub fn default_agg_name(func: AggFunc, column: &str) -> String {
    format!("{}({})", func.as_str(), column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn col(name: &str) -> Box<Expr> {
        Box::new(Expr::Column(name.into()))
    }

    #[test]
    fn test_parse_full_query() {
        let q = parse_query(
            "select dept, count(*) as n, AVG(salary) from employees \
             where salary is not null and dept <> 'HR' \
             group by dept order by n desc, dept limit 10;",
        )
        .unwrap();
        assert_eq!(
            q.items,
            vec![
                SelectItem::Column {
                    name: "dept".into(),
                    alias: None
                },
                SelectItem::Aggregate {
                    func: AggFunc::Count,
                    column: "*".into(),
                    alias: Some("n".into())
                },
                SelectItem::Aggregate {
                    func: AggFunc::Avg,
                    column: "salary".into(),
                    alias: None
                },
            ]
        );
        assert_eq!(q.from, "employees");
        assert_eq!(q.group_by, vec!["dept".to_string()]);
        assert_eq!(q.order_by.len(), 2);
        assert!(q.order_by[0].descending);
        assert!(!q.order_by[1].descending);
        assert_eq!(q.limit, Some(10));
        assert_eq!(
            q.filter,
            Some(Expr::And(
                Box::new(Expr::IsNull {
                    expr: col("salary"),
                    negated: true
                }),
                Box::new(Expr::Compare {
                    left: col("dept"),
                    op: CmpOp::Ne,
                    right: Box::new(Expr::Literal(Value::from("HR"))),
                }),
            ))
        );
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        let e = parse_predicate("a = 1 OR b = 2 AND NOT c < -3").unwrap();
        match e {
            Expr::Or(_, right) => assert!(matches!(*right, Expr::And(_, _))),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_order_by_aggregate_call() {
        let q = parse_query("SELECT dept, avg(salary) FROM t GROUP BY dept ORDER BY AVG(salary)")
            .unwrap();
        assert_eq!(q.order_by[0].column, "avg(salary)");
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_query("SELECT FROM t").is_err());
        assert!(parse_query("SELECT a FROM t WHERE").is_err());
        assert!(parse_query("SELECT median(a) FROM t").is_err());
        assert!(parse_query("SELECT a FROM t LIMIT -1").is_err());
        assert!(parse_query("SELECT a FROM t extra").is_err());
        assert!(parse_predicate("a = ").is_err());
    }
}
