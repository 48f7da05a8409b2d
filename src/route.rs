use std::fmt;
use std::sync::Arc;

use http::Request;

use crate::compile::RuleSyntax;
use crate::error::Result;
use crate::flat::parse_domains;
use crate::matcher::{Matcher, RequestMatcher};
use crate::parser::parse_domains_expression;
use crate::priority::effective_priority;
use crate::resolver::HostResolver;
use crate::rewrite::Rewrite;

/// A compiled route: the conjunction of its matchers plus rewrite slots.
///
/// Routes are only mutated while their rule is being bound; once
/// [`compile_rule`](crate::compile_rule) returns they are read-only and can
/// be shared across threads.
pub struct Route {
    rule: String,
    syntax: RuleSyntax,
    priority: Option<i64>,
    matchers: Vec<Matcher>,
    rewrite: Rewrite,
    resolver: Option<Arc<dyn HostResolver>>,
}

impl Route {
    pub(crate) fn new(
        rule: &str,
        syntax: RuleSyntax,
        resolver: Option<Arc<dyn HostResolver>>,
    ) -> Self {
        Self {
            rule: rule.to_string(),
            syntax,
            priority: None,
            matchers: Vec::new(),
            rewrite: Rewrite::default(),
            resolver,
        }
    }

    /// Set an explicit priority.
    pub fn with_priority(mut self, priority: Option<i64>) -> Self {
        self.priority = priority;
        self
    }

    /// The rule this route was compiled from.
    pub fn rule(&self) -> &str {
        &self.rule
    }

    /// Grammar the rule was parsed with (never [`RuleSyntax::Auto`]).
    pub fn syntax(&self) -> RuleSyntax {
        self.syntax
    }

    pub fn priority(&self) -> Option<i64> {
        self.priority
    }

    /// Explicit priority, or the rule length when none is set.
    pub fn effective_priority(&self) -> i64 {
        effective_priority(&self.rule, self.priority)
    }

    pub fn matchers(&self) -> &[Matcher] {
        &self.matchers
    }

    pub fn rewrite(&self) -> &Rewrite {
        &self.rewrite
    }

    /// Hostnames the rule depends on, for certificate selection.
    pub fn domains(&self) -> Result<Vec<String>> {
        match self.syntax {
            RuleSyntax::Expression => parse_domains_expression(&self.rule),
            RuleSyntax::Flat | RuleSyntax::Auto => parse_domains(&self.rule),
        }
    }

    pub(crate) fn push_matcher(&mut self, matcher: Matcher) {
        self.matchers.push(matcher);
    }

    pub(crate) fn rewrite_mut(&mut self) -> &mut Rewrite {
        &mut self.rewrite
    }

    pub(crate) fn resolver(&self) -> Option<Arc<dyn HostResolver>> {
        self.resolver.clone()
    }
}

impl RequestMatcher for Route {
    fn matches<B>(&self, req: &Request<B>) -> bool {
        self.matchers.iter().all(|m| m.matches(req))
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("rule", &self.rule)
            .field("syntax", &self.syntax)
            .field("priority", &self.priority)
            .field("matchers", &self.matchers)
            .field("rewrite", &self.rewrite)
            .finish()
    }
}
