//! Canonical rule AST shared by both grammars.
//!
//! The expression grammar parses straight into [`Expr`]; the flat grammar
//! desugars its clauses into a left-deep [`Expr::And`] chain.

use crate::types::{Clause, Function};

/// Predicate tree of a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// A single function call
    Leaf { function: Function, args: Vec<String> },
    /// Both sides must match
    And(Box<Expr>, Box<Expr>),
    /// Either side must match
    Or(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn leaf(function: Function, args: Vec<String>) -> Self {
        Expr::Leaf { function, args }
    }

    pub fn and(left: Expr, right: Expr) -> Self {
        Expr::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: Expr, right: Expr) -> Self {
        Expr::Or(Box::new(left), Box::new(right))
    }

    /// Fold clauses into an AND chain in declaration order.
    /// Returns `None` for an empty clause list.
    pub fn from_clauses(clauses: impl IntoIterator<Item = Clause>) -> Option<Self> {
        clauses
            .into_iter()
            .map(|c| Expr::leaf(c.function, c.args))
            .reduce(Expr::and)
    }

    /// Hostnames named by `Host` leaves, lower-cased, in tree order.
    ///
    /// `&&` and `||` are walked the same way, so a host that is only one
    /// alternative of an OR is reported just like a required one. Duplicates
    /// are kept.
    pub fn domains(&self) -> Vec<String> {
        let mut domains = Vec::new();
        self.collect_domains(&mut domains);
        domains.iter_mut().for_each(|d| *d = d.to_lowercase());
        domains
    }

    fn collect_domains(&self, out: &mut Vec<String>) {
        match self {
            Expr::And(left, right) | Expr::Or(left, right) => {
                left.collect_domains(out);
                right.collect_domains(out);
            }
            Expr::Leaf {
                function: Function::Host,
                args,
            } => out.extend(args.iter().cloned()),
            Expr::Leaf { .. } => {}
        }
    }

    /// Number of leaves in the tree.
    pub fn leaf_count(&self) -> usize {
        match self {
            Expr::Leaf { .. } => 1,
            Expr::And(left, right) | Expr::Or(left, right) => {
                left.leaf_count() + right.leaf_count()
            }
        }
    }
}
