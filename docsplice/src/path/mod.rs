//! Path expressions over [`HtmlTree`]s: an XPath 1.0 subset.
//!
//! Expressions are tokenized, parsed into an [`Expr`], checked against the
//! engine's [`Dialect`] and then evaluated. The full dialect covers location
//! paths with every axis except `following`, `preceding` and `namespace`,
//! predicates with boolean and comparison operators, and a small function
//! library. The basic dialect keeps element steps, `//`, `.`, `..` and
//! predicates of the form `[n]`, `[@attr]` and `[@attr='value']`.
//!
//! Relative paths are evaluated from the root element, so `body/div` is the
//! same as `/html/body/div`.

mod ast;
mod eval;
mod lexer;
mod parser;

pub use ast::{Axis, CompareOp, Expr, Function, LocationPath, NodeTest, Step};

use crate::error::DocError;
use crate::tracing_macros::trace;
use crate::tree::{Dialect, HtmlTree};
use eval::Evaluator;

/// A parsed path expression, validated for one dialect.
#[derive(Debug, Clone, PartialEq)]
pub struct PathExpr {
    source: String,
    expr: Expr,
    dialect: Dialect,
}

impl PathExpr {
    pub fn parse(source: &str, dialect: Dialect) -> Result<Self, DocError> {
        let expr = parser::parse(source)?;
        ensure_selects_nodes(&expr)?;
        if dialect == Dialect::Basic {
            check_basic(&expr).map_err(|what| {
                DocError::not_supported(format!(
                    "`{source}` uses {what}, which the basic path dialect does not support"
                ))
            })?;
        }
        Ok(Self {
            source: source.to_string(),
            expr,
            dialect,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Selected nodes, in document order and without duplicates.
    pub fn select<T: HtmlTree>(&self, tree: &T) -> Result<Vec<T::Node>, DocError> {
        let nodes = Evaluator::new(tree).select(&self.expr)?;
        trace!(path = %self.source, matches = nodes.len(), "evaluated path");
        Ok(nodes)
    }
}

/// Parse `source` for `dialect`.
pub fn compile(source: &str, dialect: Dialect) -> Result<PathExpr, DocError> {
    PathExpr::parse(source, dialect)
}

/// Parse and evaluate in one go.
pub fn select<T: HtmlTree>(
    tree: &T,
    source: &str,
    dialect: Dialect,
) -> Result<Vec<T::Node>, DocError> {
    compile(source, dialect)?.select(tree)
}

fn ensure_selects_nodes(expr: &Expr) -> Result<(), DocError> {
    let steps = match expr {
        Expr::Path(path) => &path.steps,
        Expr::Filter { primary, steps, .. } => {
            if steps.is_empty() {
                return ensure_selects_nodes(primary);
            }
            steps
        }
        _ => {
            return Err(DocError::not_supported(
                "expressions that do not select nodes",
            ));
        }
    };
    if steps.last().is_some_and(|step| step.axis == Axis::Attribute) {
        return Err(DocError::not_supported(
            "selecting attribute values instead of elements",
        ));
    }
    Ok(())
}

/// Returns a description of the first construct outside the basic dialect.
fn check_basic(expr: &Expr) -> Result<(), &'static str> {
    let Expr::Path(path) = expr else {
        return Err("filter expressions");
    };

    for step in &path.steps {
        if !step.abbreviated {
            return Err("explicit axes");
        }
        match (step.axis, &step.test) {
            (Axis::Child, NodeTest::Name(_) | NodeTest::Any) => {}
            (Axis::DescendantOrSelf | Axis::SelfAxis | Axis::Parent, NodeTest::Node) => {}
            (Axis::Attribute, _) => return Err("attribute steps"),
            _ => return Err("node type tests"),
        }
        if step.axis != Axis::Child && !step.predicates.is_empty() {
            return Err("predicates on `.` or `..`");
        }
        for predicate in &step.predicates {
            let allowed = match predicate {
                Expr::Number(n) => n.fract() == 0.0 && *n >= 1.0,
                Expr::Compare(CompareOp::Eq, lhs, rhs) => {
                    is_attribute_ref(lhs) && matches!(**rhs, Expr::Literal(_))
                }
                other => is_attribute_ref(other),
            };
            if !allowed {
                return Err("this kind of predicate");
            }
        }
    }
    Ok(())
}

fn is_attribute_ref(expr: &Expr) -> bool {
    match expr {
        Expr::Path(LocationPath {
            absolute: false,
            steps,
        }) => match steps.as_slice() {
            [step] => {
                step.axis == Axis::Attribute
                    && matches!(step.test, NodeTest::Name(_))
                    && step.predicates.is_empty()
            }
            _ => false,
        },
        _ => false,
    }
}

/// The path minus its last step, split at the last `/` outside predicates,
/// parentheses and string literals. `None` when nothing would be left.
///
/// ```
/// use docsplice::path::parent_path;
///
/// assert_eq!(parent_path("/html/body/div"), Some("/html/body"));
/// assert_eq!(parent_path("//ul/li[@title='a/b']"), Some("//ul"));
/// assert_eq!(parent_path("//ul"), None);
/// ```
pub fn parent_path(path: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut last_slash = None;

    for (i, c) in path.char_indices() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '\'' | '"' => quote = Some(c),
                '[' | '(' => depth += 1,
                ']' | ')' => depth = depth.saturating_sub(1),
                '/' if depth == 0 => last_slash = Some(i),
                _ => {}
            },
        }
    }

    let parent = path[..last_slash?].trim_end_matches('/').trim_end();
    (!parent.is_empty()).then_some(parent)
}

/// Quote `text` as a string literal. Text holding both quote characters is
/// spelled as a `concat()` call.
pub fn literal(text: &str) -> String {
    if !text.contains('\'') {
        format!("'{text}'")
    } else if !text.contains('"') {
        format!("\"{text}\"")
    } else {
        let parts: Vec<String> = text
            .split('\'')
            .map(|part| format!("'{part}'"))
            .collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

/// Collapse runs of whitespace to one space and trim both ends, like the
/// `normalize-space()` function.
pub fn normalize_space(text: &str) -> String {
    text.split(|c| matches!(c, ' ' | '\t' | '\r' | '\n'))
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// The query selecting nodes of `xpath` whose first text child matches
/// `text` after whitespace normalization. Empty `text` matches nodes with
/// no visible text.
pub fn text_match_query(xpath: &str, text: &str) -> String {
    let text = normalize_space(text);
    if text.is_empty() {
        format!("{xpath}[string-length(normalize-space(text()))=0]")
    } else {
        format!("{xpath}[normalize-space(text())={}]", literal(&text))
    }
}
