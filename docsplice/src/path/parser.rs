//! Recursive-descent parser from tokens to [`Expr`].
//!
//! Grammar (operators by increasing precedence):
//!
//! ```text
//! or      := and ("or" and)*
//! and     := eq ("and" eq)*
//! eq      := rel (("=" | "!=") rel)*
//! rel     := unary (("<" | "<=" | ">" | ">=") unary)*
//! unary   := path
//! path    := location | filter (("/" | "//") relative)?
//! filter  := primary predicate*
//! primary := literal | number | "(" or ")" | call
//! ```
//!
//! Unions, arithmetic and variable references are recognized so they can be
//! reported as unsupported rather than as syntax errors.
//!
//! Expression nesting (parentheses, predicates, call arguments and operator
//! chains) is capped at [`MAX_DEPTH`] so that evaluating or dropping the
//! tree stays within a worker thread's stack.

use super::ast::{Axis, CompareOp, Expr, Function, LocationPath, NodeTest, Step};
use super::lexer::{Token, tokenize};
use crate::error::DocError;

/// Deepest expression nesting accepted.
pub(crate) const MAX_DEPTH: usize = 128;

pub(crate) fn parse(input: &str) -> Result<Expr, DocError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(DocError::invalid_input("empty path expression"));
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.parse_or()?;
    if let Some(tok) = parser.peek() {
        return Err(DocError::invalid_input(format!(
            "unexpected {tok} in path expression"
        )));
    }
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    /// Goes one level deeper. Every successful call is undone by [`Self::leave`].
    fn enter(&mut self) -> Result<(), DocError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(DocError::invalid_input(format!(
                "path expression nested deeper than {MAX_DEPTH} levels"
            )));
        }
        Ok(())
    }

    fn leave(&mut self, levels: usize) {
        self.depth -= levels;
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn bump(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn peek_name(&self, name: &str) -> bool {
        matches!(self.peek(), Some(Token::Name(n)) if n == name)
    }

    fn expect(&mut self, expected: Token) -> Result<(), DocError> {
        match self.bump() {
            Some(tok) if tok == expected => Ok(()),
            Some(tok) => Err(DocError::invalid_input(format!(
                "expected {expected}, found {tok}"
            ))),
            None => Err(DocError::invalid_input(format!(
                "expected {expected}, found end of expression"
            ))),
        }
    }

    fn parse_or(&mut self) -> Result<Expr, DocError> {
        self.enter()?;
        let mut left = self.parse_and()?;
        let mut links = 0;
        while self.peek_name("or") {
            self.bump();
            self.enter()?;
            links += 1;
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        self.leave(links + 1);
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr, DocError> {
        let mut left = self.parse_equality()?;
        let mut links = 0;
        while self.peek_name("and") {
            self.bump();
            self.enter()?;
            links += 1;
            let right = self.parse_equality()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        self.leave(links);
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expr, DocError> {
        let mut left = self.parse_relational()?;
        let mut links = 0;
        loop {
            let op = match self.peek() {
                Some(Token::Eq) => CompareOp::Eq,
                Some(Token::Ne) => CompareOp::Ne,
                _ => break,
            };
            self.bump();
            self.enter()?;
            links += 1;
            let right = self.parse_relational()?;
            left = Expr::Compare(op, Box::new(left), Box::new(right));
        }
        self.leave(links);
        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expr, DocError> {
        let mut left = self.parse_unary()?;
        let mut links = 0;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => CompareOp::Lt,
                Some(Token::Le) => CompareOp::Le,
                Some(Token::Gt) => CompareOp::Gt,
                Some(Token::Ge) => CompareOp::Ge,
                _ => break,
            };
            self.bump();
            self.enter()?;
            links += 1;
            let right = self.parse_unary()?;
            left = Expr::Compare(op, Box::new(left), Box::new(right));
        }
        self.leave(links);
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr, DocError> {
        if matches!(self.peek(), Some(Token::Minus)) {
            return Err(DocError::not_supported("arithmetic in path expressions"));
        }
        let expr = self.parse_path_expr()?;
        if matches!(self.peek(), Some(Token::Pipe)) {
            return Err(DocError::not_supported("union expressions (`|`)"));
        }
        let arithmetic = match self.peek() {
            Some(Token::Plus | Token::Minus | Token::Star) => true,
            Some(Token::Name(n)) => n == "div" || n == "mod",
            _ => false,
        };
        if arithmetic {
            return Err(DocError::not_supported("arithmetic in path expressions"));
        }
        Ok(expr)
    }

    fn parse_path_expr(&mut self) -> Result<Expr, DocError> {
        match self.peek() {
            Some(Token::Slash | Token::DoubleSlash) => {
                Ok(Expr::Path(self.parse_absolute_path()?))
            }
            _ if self.at_step_start() => {
                let mut steps = Vec::new();
                self.parse_relative_steps(&mut steps)?;
                Ok(Expr::Path(LocationPath {
                    absolute: false,
                    steps,
                }))
            }
            _ => self.parse_filter_expr(),
        }
    }

    fn at_step_start(&self) -> bool {
        match self.peek() {
            Some(Token::Dot | Token::DotDot | Token::At | Token::Star) => true,
            Some(Token::Name(name)) => match self.peek_at(1) {
                Some(Token::LParen) => is_node_type(name),
                _ => true,
            },
            _ => false,
        }
    }

    fn parse_absolute_path(&mut self) -> Result<LocationPath, DocError> {
        let mut steps = Vec::new();
        match self.bump() {
            Some(Token::Slash) => {
                if self.at_step_start() {
                    self.parse_relative_steps(&mut steps)?;
                }
            }
            Some(Token::DoubleSlash) => {
                steps.push(Step::descendant_or_self());
                if !self.at_step_start() {
                    return Err(DocError::invalid_input("`//` must be followed by a step"));
                }
                self.parse_relative_steps(&mut steps)?;
            }
            _ => return Err(DocError::invalid_input("expected `/` or `//`")),
        }
        Ok(LocationPath {
            absolute: true,
            steps,
        })
    }

    fn parse_relative_steps(&mut self, steps: &mut Vec<Step>) -> Result<(), DocError> {
        loop {
            steps.push(self.parse_step()?);
            match self.peek() {
                Some(Token::Slash) => {
                    self.bump();
                }
                Some(Token::DoubleSlash) => {
                    self.bump();
                    steps.push(Step::descendant_or_self());
                }
                _ => return Ok(()),
            }
        }
    }

    fn parse_step(&mut self) -> Result<Step, DocError> {
        let (axis, abbreviated) = match self.peek() {
            Some(Token::Dot) => {
                self.bump();
                return self.finish_step(Axis::SelfAxis, NodeTest::Node, true);
            }
            Some(Token::DotDot) => {
                self.bump();
                return self.finish_step(Axis::Parent, NodeTest::Node, true);
            }
            Some(Token::At) => {
                self.bump();
                (Axis::Attribute, true)
            }
            Some(Token::Name(name)) if matches!(self.peek_at(1), Some(Token::DoubleColon)) => {
                let axis = match Axis::from_name(name) {
                    Some(axis) => axis,
                    None if matches!(
                        name.as_str(),
                        "following" | "preceding" | "namespace"
                    ) =>
                    {
                        return Err(DocError::not_supported(format!("the {name} axis")));
                    }
                    None => {
                        return Err(DocError::invalid_input(format!("unknown axis `{name}`")));
                    }
                };
                self.bump();
                self.bump();
                (axis, false)
            }
            _ => (Axis::Child, true),
        };

        let test = self.parse_node_test()?;
        self.finish_step(axis, test, abbreviated)
    }

    fn finish_step(
        &mut self,
        axis: Axis,
        test: NodeTest,
        abbreviated: bool,
    ) -> Result<Step, DocError> {
        let predicates = self.parse_predicates()?;
        Ok(Step {
            axis,
            test,
            predicates,
            abbreviated,
        })
    }

    fn parse_node_test(&mut self) -> Result<NodeTest, DocError> {
        match self.bump() {
            Some(Token::Star) => Ok(NodeTest::Any),
            Some(Token::Name(name)) => {
                if matches!(self.peek(), Some(Token::LParen)) && is_node_type(&name) {
                    self.bump();
                    self.expect(Token::RParen)?;
                    return match name.as_str() {
                        "text" => Ok(NodeTest::Text),
                        "node" => Ok(NodeTest::Node),
                        "comment" => Ok(NodeTest::Comment),
                        _ => Err(DocError::not_supported(format!("the {name}() node test"))),
                    };
                }
                if name.contains(':') {
                    return Err(DocError::not_supported(format!(
                        "namespace prefixes (`{name}`)"
                    )));
                }
                Ok(NodeTest::Name(name))
            }
            Some(tok) => Err(DocError::invalid_input(format!(
                "expected a node test, found {tok}"
            ))),
            None => Err(DocError::invalid_input(
                "expected a node test, found end of expression",
            )),
        }
    }

    fn parse_predicates(&mut self) -> Result<Vec<Expr>, DocError> {
        let mut predicates = Vec::new();
        while matches!(self.peek(), Some(Token::LBracket)) {
            self.bump();
            predicates.push(self.parse_or()?);
            self.expect(Token::RBracket)?;
        }
        Ok(predicates)
    }

    fn parse_filter_expr(&mut self) -> Result<Expr, DocError> {
        let primary = self.parse_primary()?;
        let predicates = self.parse_predicates()?;

        let mut steps = Vec::new();
        match self.peek() {
            Some(Token::Slash) => {
                self.bump();
                self.parse_relative_steps(&mut steps)?;
            }
            Some(Token::DoubleSlash) => {
                self.bump();
                steps.push(Step::descendant_or_self());
                self.parse_relative_steps(&mut steps)?;
            }
            _ => {}
        }

        if predicates.is_empty() && steps.is_empty() {
            Ok(primary)
        } else {
            Ok(Expr::Filter {
                primary: Box::new(primary),
                predicates,
                steps,
            })
        }
    }

    fn parse_primary(&mut self) -> Result<Expr, DocError> {
        match self.bump() {
            Some(Token::Literal(lit)) => Ok(Expr::Literal(lit)),
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::LParen) => {
                let inner = self.parse_or()?;
                self.expect(Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Dollar) => Err(DocError::not_supported("variable references")),
            Some(Token::Name(name)) if matches!(self.peek(), Some(Token::LParen)) => {
                self.bump();
                self.parse_call(&name)
            }
            Some(tok) => Err(DocError::invalid_input(format!(
                "unexpected {tok} in path expression"
            ))),
            None => Err(DocError::invalid_input("unexpected end of path expression")),
        }
    }

    /// Parses call arguments; the opening paren is already consumed.
    fn parse_call(&mut self, name: &str) -> Result<Expr, DocError> {
        let function = Function::from_name(name)
            .ok_or_else(|| DocError::not_supported(format!("the {name}() function")))?;

        let mut args = Vec::new();
        if !matches!(self.peek(), Some(Token::RParen)) {
            loop {
                args.push(self.parse_or()?);
                if matches!(self.peek(), Some(Token::Comma)) {
                    self.bump();
                } else {
                    break;
                }
            }
        }
        self.expect(Token::RParen)?;

        let (min, max) = function.arity();
        if args.len() < min || max.is_some_and(|max| args.len() > max) {
            return Err(DocError::invalid_input(format!(
                "wrong number of arguments to {name}(): {}",
                args.len()
            )));
        }
        Ok(Expr::Call(function, args))
    }
}

fn is_node_type(name: &str) -> bool {
    matches!(name, "text" | "node" | "comment" | "processing-instruction")
}
