//! Router module.
//!
//! Holds compiled routes ordered by priority and picks the first one whose
//! matchers accept a request.

use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use http::Request;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::compile::{compile_rule, RuleSyntax};
use crate::error::{Result, RuleError};
use crate::matcher::RequestMatcher;
use crate::resolver::{CachingResolver, CnameLookup, HostResolver};
use crate::route::Route;

/// Router builder options.
#[derive(Clone, Default)]
pub struct RouterOptions {
    /// Grammar used for rules added through [`Router::add_route`]
    pub syntax: RuleSyntax,
    /// Resolver used by `Host` matchers for CNAME flattening
    pub resolver: Option<Arc<dyn HostResolver>>,
}

impl RouterOptions {
    /// Create new router options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the rule grammar.
    pub fn with_syntax(mut self, syntax: RuleSyntax) -> Self {
        self.syntax = syntax;
        self
    }

    /// Set the host resolver.
    pub fn with_resolver(mut self, resolver: Arc<dyn HostResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Enable CNAME flattening backed by `lookup`, with the default cache.
    pub fn with_cname_flattening<L>(self, lookup: L) -> Self
    where
        L: CnameLookup + 'static,
    {
        self.with_resolver(Arc::new(CachingResolver::new(lookup)))
    }
}

/// A single route in a [`RouterConfig`].
#[derive(Debug, Clone, Deserialize)]
pub struct RouteConfig<T> {
    pub rule: String,
    #[serde(default)]
    pub priority: Option<i64>,
    /// Overrides the router-wide grammar for this rule
    #[serde(default)]
    pub syntax: Option<RuleSyntax>,
    pub target: T,
}

/// Deserializable router definition.
#[derive(Debug, Clone, Deserialize)]
pub struct RouterConfig<T> {
    /// Overrides the grammar from [`RouterOptions`] when set
    #[serde(default)]
    pub syntax: Option<RuleSyntax>,
    #[serde(default = "Vec::new")]
    pub routes: Vec<RouteConfig<T>>,
}

struct Entry<T> {
    route: Route,
    priority: i64,
    target: T,
}

/// The route selected for a request.
#[derive(Debug)]
pub struct RouteMatch<'a, T> {
    pub route: &'a Route,
    pub target: &'a T,
}

impl<T> RouteMatch<'_, T> {
    /// Apply the matched route's rewrite directives to `req`.
    pub fn rewrite<B>(&self, req: &mut Request<B>) -> Result<()> {
        let outcome = self.route.rewrite().apply(req.uri().path());
        outcome.apply_to(req)
    }
}

/// Router selects a target for each request from prioritized routes.
///
/// Routes are kept sorted by effective priority, highest first. Routes with
/// equal priority are tried in the order they were added.
pub struct Router<T> {
    entries: Vec<Entry<T>>,
    options: RouterOptions,
}

impl<T> Router<T> {
    /// Create an empty router.
    pub fn new(options: RouterOptions) -> Self {
        Self {
            entries: Vec::new(),
            options,
        }
    }

    /// Build a router from a parsed config.
    pub fn from_config(config: RouterConfig<T>, options: RouterOptions) -> Result<Self> {
        let options = match config.syntax {
            Some(syntax) => options.with_syntax(syntax),
            None => options,
        };
        let mut router = Self::new(options);
        for route in config.routes {
            let syntax = route.syntax.unwrap_or(router.options.syntax);
            let compiled = compile_rule(&route.rule, syntax, router.options.resolver.clone())?
                .with_priority(route.priority);
            router.add_compiled(compiled, route.target);
        }
        Ok(router)
    }

    /// Compile `rule` and register it for `target`.
    pub fn add_route(&mut self, rule: &str, priority: Option<i64>, target: T) -> Result<()> {
        let route = compile_rule(rule, self.options.syntax, self.options.resolver.clone())?
            .with_priority(priority);
        self.add_compiled(route, target);
        Ok(())
    }

    /// Register an already compiled route.
    pub fn add_compiled(&mut self, route: Route, target: T) {
        let priority = route.effective_priority();
        let pos = self.entries.partition_point(|e| e.priority >= priority);
        tracing::debug!(rule = route.rule(), priority, position = pos, "registered route");
        self.entries.insert(
            pos,
            Entry {
                route,
                priority,
                target,
            },
        );
    }

    /// Find the highest priority route matching `req`.
    pub fn route<B>(&self, req: &Request<B>) -> Option<RouteMatch<'_, T>> {
        let found = self.entries.iter().find(|e| e.route.matches(req));
        match found {
            Some(entry) => {
                tracing::trace!(
                    method = %req.method(),
                    uri = %req.uri(),
                    rule = entry.route.rule(),
                    "route matched"
                );
                Some(RouteMatch {
                    route: &entry.route,
                    target: &entry.target,
                })
            }
            None => {
                tracing::trace!(method = %req.method(), uri = %req.uri(), "no route matched");
                None
            }
        }
    }

    /// Routes in match order.
    pub fn routes(&self) -> impl Iterator<Item = (&Route, &T)> {
        self.entries.iter().map(|e| (&e.route, &e.target))
    }

    /// Hostnames named by every route, in match order, duplicates removed.
    pub fn domains(&self) -> Result<Vec<String>> {
        let mut domains: Vec<String> = Vec::new();
        for entry in &self.entries {
            for domain in entry.route.domains()? {
                if !domains.contains(&domain) {
                    domains.push(domain);
                }
            }
        }
        Ok(domains)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: fmt::Debug> fmt::Debug for Router<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("syntax", &self.options.syntax)
            .field("routes", &self.routes().collect::<Vec<_>>())
            .finish()
    }
}

impl<T: DeserializeOwned> Router<T> {
    /// Build a router from a JSON config.
    pub fn from_json(json: &str, options: RouterOptions) -> Result<Self> {
        let config: RouterConfig<T> = serde_json::from_str(json)
            .map_err(|e| RuleError::Config(format!("invalid router config: {}", e)))?;
        Self::from_config(config, options)
    }

    /// Build a router from a JSON config file.
    pub fn from_file(path: impl AsRef<Path>, options: RouterOptions) -> Result<Self> {
        let json = fs::read_to_string(path.as_ref()).map_err(|e| {
            RuleError::Config(format!(
                "failed to read {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_json(&json, options)
    }
}
