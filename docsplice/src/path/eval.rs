//! Evaluates parsed expressions against any [`HtmlTree`].

use std::collections::HashMap;

use super::ast::{Axis, CompareOp, Expr, Function, NodeTest, Step};
use crate::error::DocError;
use crate::tree::{HtmlTree, NodeView};
use crate::untyped_dom::Namespace;

/// Result of evaluating an expression.
#[derive(Debug, Clone)]
pub(crate) enum Value<N> {
    /// Nodes in document order, without duplicates.
    Nodes(Vec<N>),
    /// Attribute values selected by a trailing `@name` step.
    Strings(Vec<String>),
    Str(String),
    Num(f64),
    Bool(bool),
}

#[derive(Clone)]
struct Context<N> {
    node: N,
    position: usize,
    size: usize,
}

pub(crate) struct Evaluator<'t, T: HtmlTree> {
    tree: &'t T,
    order: HashMap<T::Node, usize>,
}

impl<'t, T: HtmlTree> Evaluator<'t, T> {
    pub(crate) fn new(tree: &'t T) -> Self {
        let document = tree.document();
        let order = std::iter::once(document.clone())
            .chain(tree.descendants(&document))
            .enumerate()
            .map(|(i, node)| (node, i))
            .collect();
        Self { tree, order }
    }

    /// Evaluates `expr` and requires it to produce nodes.
    ///
    /// Relative paths start at the root element, so `body/div` and
    /// `/html/body/div` address the same nodes.
    pub(crate) fn select(&self, expr: &Expr) -> Result<Vec<T::Node>, DocError> {
        let node = self.tree.root().unwrap_or_else(|| self.tree.document());
        let ctx = Context {
            node,
            position: 1,
            size: 1,
        };
        match self.eval(expr, &ctx)? {
            Value::Nodes(nodes) => Ok(nodes),
            Value::Strings(_) => Err(DocError::not_supported(
                "selecting attribute values instead of elements",
            )),
            _ => Err(DocError::not_supported(
                "expressions that do not select nodes",
            )),
        }
    }

    fn eval(&self, expr: &Expr, ctx: &Context<T::Node>) -> Result<Value<T::Node>, DocError> {
        match expr {
            Expr::Path(path) => {
                let start = if path.absolute {
                    vec![self.tree.document()]
                } else {
                    vec![ctx.node.clone()]
                };
                self.apply_steps(start, &path.steps)
            }
            Expr::Filter {
                primary,
                predicates,
                steps,
            } => {
                let mut nodes = match self.eval(primary, ctx)? {
                    Value::Nodes(nodes) => nodes,
                    _ => {
                        return Err(DocError::invalid_input(
                            "predicates and steps can only follow a node-set",
                        ));
                    }
                };
                for predicate in predicates {
                    nodes = self.filter(nodes, predicate)?;
                }
                self.apply_steps(nodes, steps)
            }
            Expr::Or(lhs, rhs) => {
                let value = self.boolean(&self.eval(lhs, ctx)?)
                    || self.boolean(&self.eval(rhs, ctx)?);
                Ok(Value::Bool(value))
            }
            Expr::And(lhs, rhs) => {
                let value = self.boolean(&self.eval(lhs, ctx)?)
                    && self.boolean(&self.eval(rhs, ctx)?);
                Ok(Value::Bool(value))
            }
            Expr::Compare(op, lhs, rhs) => {
                let lhs = self.eval(lhs, ctx)?;
                let rhs = self.eval(rhs, ctx)?;
                Ok(Value::Bool(self.compare(*op, lhs, rhs)))
            }
            Expr::Literal(s) => Ok(Value::Str(s.clone())),
            Expr::Number(n) => Ok(Value::Num(*n)),
            Expr::Call(function, args) => self.call(*function, args, ctx),
        }
    }

    fn apply_steps(
        &self,
        start: Vec<T::Node>,
        steps: &[Step],
    ) -> Result<Value<T::Node>, DocError> {
        let mut current = start;

        for (i, step) in steps.iter().enumerate() {
            if step.axis == Axis::Attribute {
                if i + 1 != steps.len() {
                    return Err(DocError::not_supported("steps after an attribute step"));
                }
                if !step.predicates.is_empty() {
                    return Err(DocError::not_supported("predicates on attribute steps"));
                }
                let values = current
                    .iter()
                    .flat_map(|node| self.tree.attrs(node))
                    .filter(|(name, _)| match &step.test {
                        NodeTest::Name(wanted) => name == wanted,
                        NodeTest::Any | NodeTest::Node => true,
                        NodeTest::Text | NodeTest::Comment => false,
                    })
                    .map(|(_, value)| value.to_string())
                    .collect();
                return Ok(Value::Strings(values));
            }

            let mut next = Vec::new();
            for node in &current {
                let mut candidates: Vec<T::Node> = self
                    .axis(step.axis, node)
                    .into_iter()
                    .filter(|candidate| self.matches(&step.test, candidate))
                    .collect();
                for predicate in &step.predicates {
                    candidates = self.filter(candidates, predicate)?;
                }
                next.extend(candidates);
            }
            current = self.sort_dedup(next);
        }

        Ok(Value::Nodes(current))
    }

    /// Nodes along `axis`, nearest first for reverse axes.
    fn axis(&self, axis: Axis, node: &T::Node) -> Vec<T::Node> {
        let tree = self.tree;
        match axis {
            Axis::Child => tree.children(node),
            Axis::Descendant => tree.descendants(node),
            Axis::DescendantOrSelf => {
                let mut nodes = vec![node.clone()];
                nodes.extend(tree.descendants(node));
                nodes
            }
            Axis::Parent => tree.parent(node).into_iter().collect(),
            Axis::SelfAxis => vec![node.clone()],
            Axis::Ancestor => tree.ancestors(node),
            Axis::AncestorOrSelf => {
                let mut nodes = vec![node.clone()];
                nodes.extend(tree.ancestors(node));
                nodes
            }
            Axis::FollowingSibling | Axis::PrecedingSibling => {
                let Some(parent) = tree.parent(node) else {
                    return Vec::new();
                };
                let siblings = tree.children(&parent);
                let Some(index) = siblings.iter().position(|s| s == node) else {
                    return Vec::new();
                };
                if axis == Axis::FollowingSibling {
                    siblings[index + 1..].to_vec()
                } else {
                    siblings[..index].iter().rev().cloned().collect()
                }
            }
            Axis::Attribute => Vec::new(),
        }
    }

    fn matches(&self, test: &NodeTest, node: &T::Node) -> bool {
        match (test, self.tree.view(node)) {
            (NodeTest::Node, _) => true,
            (NodeTest::Any, NodeView::Element { .. }) => true,
            (NodeTest::Name(wanted), NodeView::Element { tag, ns }) => {
                if ns == Namespace::Html {
                    tag.eq_ignore_ascii_case(wanted)
                } else {
                    tag == wanted
                }
            }
            (NodeTest::Text, NodeView::Text(_)) => true,
            (NodeTest::Comment, NodeView::Comment(_)) => true,
            _ => false,
        }
    }

    fn filter(&self, nodes: Vec<T::Node>, predicate: &Expr) -> Result<Vec<T::Node>, DocError> {
        let size = nodes.len();
        let mut kept = Vec::with_capacity(size);
        for (i, node) in nodes.into_iter().enumerate() {
            let ctx = Context {
                node,
                position: i + 1,
                size,
            };
            let keep = match self.eval(predicate, &ctx)? {
                Value::Num(n) => n == ctx.position as f64,
                other => self.boolean(&other),
            };
            if keep {
                kept.push(ctx.node);
            }
        }
        Ok(kept)
    }

    fn sort_dedup(&self, mut nodes: Vec<T::Node>) -> Vec<T::Node> {
        nodes.sort_by_key(|node| self.order.get(node).copied().unwrap_or(usize::MAX));
        nodes.dedup();
        nodes
    }

    fn call(
        &self,
        function: Function,
        args: &[Expr],
        ctx: &Context<T::Node>,
    ) -> Result<Value<T::Node>, DocError> {
        let arg = |i: usize| -> Result<Option<Value<T::Node>>, DocError> {
            args.get(i).map(|expr| self.eval(expr, ctx)).transpose()
        };
        let string_arg = |i: usize| -> Result<String, DocError> {
            Ok(match arg(i)? {
                Some(value) => self.string(&value),
                None => self.tree.text_content(&ctx.node),
            })
        };

        let value = match function {
            Function::Position => Value::Num(ctx.position as f64),
            Function::Last => Value::Num(ctx.size as f64),
            Function::Count => match arg(0)? {
                Some(Value::Nodes(nodes)) => Value::Num(nodes.len() as f64),
                Some(Value::Strings(values)) => Value::Num(values.len() as f64),
                _ => return Err(DocError::invalid_input("count() expects a node-set")),
            },
            Function::String => Value::Str(string_arg(0)?),
            Function::NormalizeSpace => Value::Str(super::normalize_space(&string_arg(0)?)),
            Function::StringLength => Value::Num(string_arg(0)?.chars().count() as f64),
            Function::Contains => Value::Bool(string_arg(0)?.contains(&string_arg(1)?)),
            Function::StartsWith => Value::Bool(string_arg(0)?.starts_with(&string_arg(1)?)),
            Function::Concat => {
                let mut out = String::new();
                for i in 0..args.len() {
                    out.push_str(&string_arg(i)?);
                }
                Value::Str(out)
            }
            Function::Not => Value::Bool(!arg(0)?.is_some_and(|v| self.boolean(&v))),
            Function::Boolean => Value::Bool(arg(0)?.is_some_and(|v| self.boolean(&v))),
            Function::True => Value::Bool(true),
            Function::False => Value::Bool(false),
            Function::Name | Function::LocalName => {
                let node = match arg(0)? {
                    Some(Value::Nodes(nodes)) => nodes.into_iter().next(),
                    Some(_) => {
                        return Err(DocError::invalid_input(
                            "name() and local-name() expect a node-set",
                        ));
                    }
                    None => Some(ctx.node.clone()),
                };
                let name = node
                    .and_then(|n| self.tree.view(&n).tag().map(str::to_string))
                    .unwrap_or_default();
                Value::Str(name)
            }
        };
        Ok(value)
    }

    fn string(&self, value: &Value<T::Node>) -> String {
        match value {
            Value::Nodes(nodes) => nodes
                .first()
                .map(|node| self.tree.text_content(node))
                .unwrap_or_default(),
            Value::Strings(values) => values.first().cloned().unwrap_or_default(),
            Value::Str(s) => s.clone(),
            Value::Num(n) => number_to_string(*n),
            Value::Bool(b) => b.to_string(),
        }
    }

    fn number(&self, value: &Value<T::Node>) -> f64 {
        match value {
            Value::Num(n) => *n,
            Value::Bool(b) => f64::from(u8::from(*b)),
            other => string_to_number(&self.string(other)),
        }
    }

    fn boolean(&self, value: &Value<T::Node>) -> bool {
        match value {
            Value::Nodes(nodes) => !nodes.is_empty(),
            Value::Strings(values) => !values.is_empty(),
            Value::Str(s) => !s.is_empty(),
            Value::Num(n) => *n != 0.0 && !n.is_nan(),
            Value::Bool(b) => *b,
        }
    }

    /// String values of a node-set, or `None` for atomic values.
    fn set_strings(&self, value: &Value<T::Node>) -> Option<Vec<String>> {
        match value {
            Value::Nodes(nodes) => Some(
                nodes
                    .iter()
                    .map(|node| self.tree.text_content(node))
                    .collect(),
            ),
            Value::Strings(values) => Some(values.clone()),
            _ => None,
        }
    }

    fn compare(&self, op: CompareOp, lhs: Value<T::Node>, rhs: Value<T::Node>) -> bool {
        match (self.set_strings(&lhs), self.set_strings(&rhs)) {
            (Some(left), Some(right)) => left.iter().any(|a| {
                right.iter().any(|b| {
                    self.compare_atomic(op, &Value::Str(a.clone()), &Value::Str(b.clone()))
                })
            }),
            (Some(left), None) => match rhs {
                Value::Bool(b) => {
                    self.compare_atomic(op, &Value::Bool(!left.is_empty()), &Value::Bool(b))
                }
                _ => left
                    .into_iter()
                    .any(|a| self.compare_atomic(op, &Value::Str(a), &rhs)),
            },
            (None, Some(right)) => match lhs {
                Value::Bool(b) => {
                    self.compare_atomic(op, &Value::Bool(b), &Value::Bool(!right.is_empty()))
                }
                _ => right
                    .into_iter()
                    .any(|b| self.compare_atomic(op, &lhs, &Value::Str(b))),
            },
            (None, None) => self.compare_atomic(op, &lhs, &rhs),
        }
    }

    fn compare_atomic(&self, op: CompareOp, lhs: &Value<T::Node>, rhs: &Value<T::Node>) -> bool {
        let either = |f: fn(&Value<T::Node>) -> bool| f(lhs) || f(rhs);
        match op {
            CompareOp::Eq | CompareOp::Ne => {
                let equal = if either(|v| matches!(v, Value::Bool(_))) {
                    self.boolean(lhs) == self.boolean(rhs)
                } else if either(|v| matches!(v, Value::Num(_))) {
                    self.number(lhs) == self.number(rhs)
                } else {
                    self.string(lhs) == self.string(rhs)
                };
                (op == CompareOp::Eq) == equal
            }
            CompareOp::Lt => self.number(lhs) < self.number(rhs),
            CompareOp::Le => self.number(lhs) <= self.number(rhs),
            CompareOp::Gt => self.number(lhs) > self.number(rhs),
            CompareOp::Ge => self.number(lhs) >= self.number(rhs),
        }
    }
}

fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Numbers are an optional minus, digits and at most one dot. Anything else
/// is NaN.
fn string_to_number(s: &str) -> f64 {
    let s = s.trim_matches(|c| matches!(c, ' ' | '\t' | '\r' | '\n'));
    let digits = s.strip_prefix('-').unwrap_or(s);
    let valid = !digits.is_empty()
        && digits != "."
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits.matches('.').count() <= 1;
    if valid {
        s.parse().unwrap_or(f64::NAN)
    } else {
        f64::NAN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_to_string() {
        assert_eq!(number_to_string(3.0), "3");
        assert_eq!(number_to_string(-2.0), "-2");
        assert_eq!(number_to_string(2.5), "2.5");
        assert_eq!(number_to_string(f64::NAN), "NaN");
        assert_eq!(number_to_string(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_string_to_number() {
        assert_eq!(string_to_number(" 42 "), 42.0);
        assert_eq!(string_to_number("-1.5"), -1.5);
        assert_eq!(string_to_number(".5"), 0.5);
        assert!(string_to_number("").is_nan());
        assert!(string_to_number("1e3").is_nan());
        assert!(string_to_number("inf").is_nan());
        assert!(string_to_number("1.2.3").is_nan());
    }
}
