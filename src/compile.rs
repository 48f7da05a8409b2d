use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::ast::Expr;
use crate::error::{Result, RuleError};
use crate::flat::for_each_clause;
use crate::matcher::{
    HeadersMatcher, HostMatcher, HostRegexpMatcher, Matcher, MethodMatcher, PathMatcher,
    PathPrefixMatcher, QueryMatcher,
};
use crate::parser::parse_expression;
use crate::priority::sort_by_size_desc;
use crate::resolver::HostResolver;
use crate::route::Route;
use crate::types::Function;

/// Which grammar a rule is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleSyntax {
    /// Pick per rule with [`RuleSyntax::detect`]
    #[default]
    Auto,
    /// `Host:a.com;PathPrefix:/api`
    Flat,
    /// ``Host(`a.com`) && PathPrefix(`/api`)``
    Expression,
}

impl RuleSyntax {
    /// Expression grammar when the rule opens with `(` or a name followed
    /// by `(`, flat grammar otherwise.
    pub fn detect(rule: &str) -> RuleSyntax {
        let rule = rule.trim_start();
        if rule.starts_with('(') {
            return RuleSyntax::Expression;
        }
        let name_end = rule
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(rule.len());
        if name_end > 0 && rule[name_end..].trim_start().starts_with('(') {
            RuleSyntax::Expression
        } else {
            RuleSyntax::Flat
        }
    }

    fn resolve(self, rule: &str) -> RuleSyntax {
        match self {
            RuleSyntax::Auto => RuleSyntax::detect(rule),
            other => other,
        }
    }
}

impl Function {
    /// Bind one call of this function to `route`.
    ///
    /// Returns the request constraint the call adds, or `None` for functions
    /// that only set a rewrite slot. Rewrite directives are recorded on
    /// `route` as a side effect.
    pub fn bind(self, route: &mut Route, args: &[String]) -> Result<Option<Matcher>> {
        let binding = |message: String| RuleError::binding(self.name(), message);

        let matcher = match self {
            Function::Host => Matcher::Host(HostMatcher::new(args, route.resolver())),
            Function::HostRegexp => {
                Matcher::HostRegexp(HostRegexpMatcher::new(args).map_err(binding)?)
            }
            Function::Path => Matcher::Path(PathMatcher::new(args).map_err(binding)?),
            Function::PathStrip => {
                let sorted = sorted_by_size(args);
                let matcher = PathMatcher::new(&sorted).map_err(binding)?;
                route.rewrite_mut().add_strip_prefixes(&sorted);
                Matcher::Path(matcher)
            }
            Function::PathStripRegex => {
                let sorted = sorted_by_size(args);
                let matcher = PathMatcher::new(&sorted).map_err(binding)?;
                route
                    .rewrite_mut()
                    .add_strip_prefixes_regex(&sorted)
                    .map_err(binding)?;
                Matcher::Path(matcher)
            }
            Function::PathPrefix => {
                Matcher::PathPrefix(PathPrefixMatcher::new(args).map_err(binding)?)
            }
            Function::PathPrefixStrip => {
                let sorted = sorted_by_size(args);
                let matcher = PathPrefixMatcher::new(&sorted).map_err(binding)?;
                route.rewrite_mut().add_strip_prefixes(&sorted);
                Matcher::PathPrefix(matcher)
            }
            Function::PathPrefixStripRegex => {
                let sorted = sorted_by_size(args);
                let matcher = PathPrefixMatcher::new(&sorted).map_err(binding)?;
                route
                    .rewrite_mut()
                    .add_strip_prefixes_regex(&sorted)
                    .map_err(binding)?;
                Matcher::PathPrefix(matcher)
            }
            Function::Method => Matcher::Method(MethodMatcher::new(args).map_err(binding)?),
            Function::Headers => Matcher::Headers(HeadersMatcher::new(args).map_err(binding)?),
            Function::HeadersRegexp => {
                Matcher::Headers(HeadersMatcher::new_regexp(args).map_err(binding)?)
            }
            Function::Query => Matcher::Query(QueryMatcher::new(args).map_err(binding)?),
            Function::AddPrefix => {
                for arg in args {
                    route.rewrite_mut().set_add_prefix(arg);
                }
                return Ok(None);
            }
            Function::ReplacePath => {
                for arg in args {
                    route.rewrite_mut().set_replace_path(arg);
                }
                return Ok(None);
            }
            Function::ReplacePathRegex => {
                for arg in args {
                    route
                        .rewrite_mut()
                        .set_replace_path_regex(arg)
                        .map_err(binding)?;
                }
                return Ok(None);
            }
        };

        Ok(Some(matcher))
    }
}

fn sorted_by_size(args: &[String]) -> Vec<String> {
    let mut sorted = args.to_vec();
    sort_by_size_desc(&mut sorted);
    sorted
}

/// Bind an expression tree to `route`, returning its combined constraint.
pub fn bind_expr(expr: &Expr, route: &mut Route) -> Result<Option<Matcher>> {
    match expr {
        Expr::Leaf { function, args } => function
            .bind(route, args)
            .map_err(|e| e.in_clause(describe_call(*function, args))),
        Expr::And(left, right) => {
            let left = bind_expr(left, route)?;
            let right = bind_expr(right, route)?;
            Ok(match (left, right) {
                (Some(l), Some(r)) => Some(l.and(r)),
                (Some(m), None) | (None, Some(m)) => Some(m),
                (None, None) => None,
            })
        }
        Expr::Or(left, right) => {
            let left = bind_expr(left, route)?;
            let right = bind_expr(right, route)?;
            match (left, right) {
                (Some(l), Some(r)) => Ok(Some(l.or(r))),
                _ => Err(RuleError::binding(
                    "||",
                    "both alternatives must constrain the request; rewrite-only functions cannot be alternatives",
                )),
            }
        }
    }
}

fn describe_call(function: Function, args: &[String]) -> String {
    let args: Vec<String> = args.iter().map(|a| format!("`{}`", a)).collect();
    format!("{}({})", function, args.join(", "))
}

/// Compile a rule into a [`Route`].
///
/// `resolver` enables CNAME flattening for `Host` matchers.
pub fn compile_rule(
    rule: &str,
    syntax: RuleSyntax,
    resolver: Option<Arc<dyn HostResolver>>,
) -> Result<Route> {
    let syntax = syntax.resolve(rule);
    let mut route = Route::new(rule, syntax, resolver);

    match syntax {
        RuleSyntax::Expression => {
            let expr = parse_expression(rule)?;
            if let Some(matcher) = bind_expr(&expr, &mut route)? {
                route.push_matcher(matcher);
            }
        }
        RuleSyntax::Flat | RuleSyntax::Auto => {
            for_each_clause(rule, |clause| {
                if let Some(matcher) = clause.function.bind(&mut route, &clause.args)? {
                    route.push_matcher(matcher);
                }
                Ok(())
            })?;
        }
    }

    tracing::debug!(
        rule,
        ?syntax,
        matchers = route.matchers().len(),
        "compiled route rule"
    );

    Ok(route)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GrammarErrorKind;
    use crate::matcher::RequestMatcher;
    use http::Request;

    fn request(host: &str, uri: &str) -> Request<()> {
        Request::builder()
            .uri(uri)
            .header(http::header::HOST, host)
            .body(())
            .unwrap()
    }

    fn flat(rule: &str) -> Route {
        compile_rule(rule, RuleSyntax::Flat, None).unwrap()
    }

    fn expression(rule: &str) -> Route {
        compile_rule(rule, RuleSyntax::Expression, None).unwrap()
    }

    #[test]
    fn test_detect_syntax() {
        assert_eq!(RuleSyntax::detect("Host:a.com"), RuleSyntax::Flat);
        assert_eq!(RuleSyntax::detect("Path:/a(b)"), RuleSyntax::Flat);
        assert_eq!(RuleSyntax::detect("Host(`a.com`)"), RuleSyntax::Expression);
        assert_eq!(RuleSyntax::detect("  host (`a.com`)"), RuleSyntax::Expression);
        assert_eq!(
            RuleSyntax::detect("(Host(`a`) || Host(`b`))"),
            RuleSyntax::Expression
        );
        assert_eq!(RuleSyntax::detect(""), RuleSyntax::Flat);
    }

    #[test]
    fn test_flat_conjunction() {
        let route = flat("Host:foo.bar;Path:/test");
        assert_eq!(route.matchers().len(), 2);
        assert!(route.matches(&request("foo.bar", "/test")));
        assert!(!route.matches(&request("foo.bar", "/other")));
        assert!(!route.matches(&request("other.bar", "/test")));
    }

    #[test]
    fn test_flat_host_case() {
        for rule in ["Host:foo.bar", "Host:FOO.BAR", "Host: foo.bar "] {
            let route = flat(rule);
            assert!(route.matches(&request("FOO.BAR", "/")), "{}", rule);
            assert_eq!(route.domains().unwrap(), vec!["foo.bar"], "{}", rule);
        }
    }

    #[test]
    fn test_host_case_insensitive_path_case_sensitive() {
        let route = flat("Host: Foo.Bar ; Path:/FOObar");
        assert!(route.matches(&request("foo.bar", "/FOObar")));
        assert!(!route.matches(&request("foo.bar", "/foobar")));
    }

    #[test]
    fn test_strip_ordering() {
        let route = flat("PathPrefixStrip:/a,/ab");
        assert_eq!(route.rewrite().strip_prefixes(), &["/ab", "/a"]);

        let route = flat("PathPrefixStrip:/ab,/a");
        assert_eq!(route.rewrite().strip_prefixes(), &["/ab", "/a"]);
    }

    #[test]
    fn test_strip_accumulates_across_clauses() {
        let route = flat("PathStrip:/a;PathStrip:/abc,/ab");
        assert_eq!(route.rewrite().strip_prefixes(), &["/abc", "/ab", "/a"]);
    }

    #[test]
    fn test_path_strip_is_exact() {
        let route = flat("PathStrip:/api");
        assert!(route.matches(&request("a", "/api")));
        assert!(!route.matches(&request("a", "/api/users")));
        assert_eq!(route.rewrite().strip_prefixes(), &["/api"]);
    }

    #[test]
    fn test_path_prefix_strip_regex() {
        let route = flat("PathPrefixStripRegex:/api/{version:v[0-9]+}");
        assert!(route.matches(&request("a", "/api/v1/users")));
        assert!(!route.matches(&request("a", "/api/latest/users")));
        assert_eq!(
            route.rewrite().strip_prefixes_regex(),
            vec!["/api/{version:v[0-9]+}"]
        );
        assert_eq!(route.rewrite().apply("/api/v1/users").path, "/users");
    }

    #[test]
    fn test_path_strip_regex() {
        let route = flat("PathStripRegex:/{tenant:[a-z]+}");
        assert!(route.matches(&request("a", "/acme")));
        assert!(!route.matches(&request("a", "/acme/x")));
        assert_eq!(route.rewrite().apply("/acme").path, "/");
    }

    #[test]
    fn test_rewrite_only_functions() {
        let route = flat("AddPrefix:/one;AddPrefix:/two;ReplacePath:/a,/b");
        assert!(route.matchers().is_empty());
        assert!(route.matches(&request("any", "/anything")));
        assert_eq!(route.rewrite().add_prefix(), Some("/two"));
        assert_eq!(route.rewrite().replace_path(), Some("/b"));
    }

    #[test]
    fn test_replace_path_regex_binding() {
        let route = flat("PathPrefix:/api;ReplacePathRegex: ^/api/(.*) /v1/$1");
        assert_eq!(route.rewrite().replace_path_regex(), Some("^/api/(.*) /v1/$1"));
        assert_eq!(route.rewrite().apply("/api/users").path, "/v1/users");

        let route = flat("ReplacePathRegex:^/a/(.*) /b/$1 x");
        assert_eq!(route.rewrite().apply("/a/c").path, "/b/c x");

        let err = compile_rule("ReplacePathRegex:^/api/(.*)", RuleSyntax::Flat, None).unwrap_err();
        assert!(err.is_binding(), "got: {:?}", err);
    }

    #[test]
    fn test_method_headers_query() {
        let route = flat("Method:get,post;Headers:X-Env,prod;Query:debug=1");
        let req = Request::builder()
            .method("POST")
            .uri("/x?debug=1")
            .header("x-env", "prod")
            .body(())
            .unwrap();
        assert!(route.matches(&req));

        let req = Request::builder()
            .method("POST")
            .uri("/x?debug=0")
            .header("x-env", "prod")
            .body(())
            .unwrap();
        assert!(!route.matches(&req));
    }

    #[test]
    fn test_headers_regexp_binding() {
        let route = flat("HeadersRegexp:User-Agent,^curl/");
        let req = Request::builder()
            .uri("/")
            .header("user-agent", "curl/8.0")
            .body(())
            .unwrap();
        assert!(route.matches(&req));
    }

    #[test]
    fn test_binding_errors_carry_clause() {
        for rule in [
            "HostRegexp:{sub.foo.bar",
            "HeadersRegexp:X-A,(unclosed",
            "Headers:X-A",
            "Query:novalue",
            "Path:/{id",
            "PathPrefixStripRegex:/{v:(}",
        ] {
            let err = compile_rule(rule, RuleSyntax::Flat, None).unwrap_err();
            assert!(err.is_binding(), "rule {:?} gave {:?}", rule, err);
            assert!(format!("{}", err).contains(rule.split(':').next().unwrap()));
        }
    }

    #[test]
    fn test_grammar_errors() {
        let err = compile_rule("", RuleSyntax::Flat, None).unwrap_err();
        assert_eq!(err.grammar_kind(), Some(GrammarErrorKind::Empty));

        let err = compile_rule("Host:", RuleSyntax::Flat, None).unwrap_err();
        assert_eq!(err.grammar_kind(), Some(GrammarErrorKind::MissingArguments));

        let err = compile_rule("Nope:x", RuleSyntax::Auto, None).unwrap_err();
        assert_eq!(err.grammar_kind(), Some(GrammarErrorKind::UnknownFunction));
    }

    #[test]
    fn test_expression_or() {
        let route = expression("Host(`a.com`) && (PathPrefix(`/api`) || Method(`POST`))");
        assert!(route.matches(&request("a.com", "/api/x")));
        assert!(!route.matches(&request("a.com", "/web")));
        assert!(!route.matches(&request("b.com", "/api/x")));

        let post = Request::builder()
            .method("POST")
            .uri("/web")
            .header(http::header::HOST, "a.com")
            .body(())
            .unwrap();
        assert!(route.matches(&post));
    }

    #[test]
    fn test_expression_rewrite_under_and() {
        let route = expression("PathPrefixStrip(`/a`, `/ab`) && ReplacePath(`/x`)");
        assert_eq!(route.rewrite().strip_prefixes(), &["/ab", "/a"]);
        assert_eq!(route.rewrite().replace_path(), Some("/x"));
        assert!(route.matches(&request("h", "/ab/c")));
    }

    #[test]
    fn test_expression_rewrite_under_or_rejected() {
        let err = compile_rule(
            "Host(`a.com`) || ReplacePath(`/x`)",
            RuleSyntax::Expression,
            None,
        )
        .unwrap_err();
        assert!(err.is_binding());
    }

    #[test]
    fn test_expression_binding_error_names_call() {
        let err = compile_rule("HostRegexp(`{sub`)", RuleSyntax::Auto, None).unwrap_err();
        assert!(err.is_binding());
        assert!(format!("{}", err).contains("HostRegexp(`{sub`)"));
    }

    #[test]
    fn test_auto_syntax_routes() {
        let flat_route = compile_rule("Host:a.com", RuleSyntax::Auto, None).unwrap();
        assert_eq!(flat_route.syntax(), RuleSyntax::Flat);
        let expr_route = compile_rule("Host(`a.com`)", RuleSyntax::Auto, None).unwrap();
        assert_eq!(expr_route.syntax(), RuleSyntax::Expression);
    }

    #[test]
    fn test_idempotent_binding() {
        let rule = "Host:foo.bar;PathPrefix:/api;Method:GET";
        let first = flat(rule);
        let second = flat(rule);
        for (host, path) in [
            ("foo.bar", "/api"),
            ("foo.bar", "/api/x"),
            ("foo.bar", "/apix"),
            ("foo.bar", "/web"),
            ("other", "/api"),
        ] {
            let req = request(host, path);
            assert_eq!(first.matches(&req), second.matches(&req), "{} {}", host, path);
        }
    }
}
