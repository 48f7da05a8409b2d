//! Route Rule Engine - rule parsing and request matching for HTTP reverse proxies
//!
//! This library turns routing rules into request matchers with support for:
//! - Two rule grammars: flat `Name:args;...` clauses and `Name(args)` expressions with `&&`, `||` and parentheses
//! - Host, path, path prefix, method, header and query matching, with brace templates
//! - Path rewrites: prefix stripping, prefix adding and path replacement
//! - Domain extraction for certificate selection
//! - Priority ordering of competing routes
//! - Optional CNAME flattening for host matching, with an LRU cache
//!
//! # Example
//!
//! ```rust
//! use http::Request;
//! use route_rule_engine::{Router, RouterOptions};
//!
//! let mut router = Router::new(RouterOptions::new());
//! router.add_route("Host:example.com;PathPrefixStrip:/api", None, "api").unwrap();
//! router.add_route("Host(`example.com`) && Path(`/health`)", None, "health").unwrap();
//!
//! let mut req = Request::builder()
//!     .uri("/api/users")
//!     .header("host", "Example.com:8080")
//!     .body(())
//!     .unwrap();
//!
//! let matched = router.route(&req).unwrap();
//! assert_eq!(*matched.target, "api");
//!
//! matched.rewrite(&mut req).unwrap();
//! assert_eq!(req.uri().path(), "/users");
//!
//! assert_eq!(router.domains().unwrap(), vec!["example.com"]);
//! ```
//!
//! # Rule Syntax
//!
//! Flat rules are `;`-separated clauses, each `Name:arg[,arg...]`; every
//! clause must match:
//! ```text
//! Host:example.com,www.example.com;PathPrefix:/api
//! ```
//!
//! Expression rules combine calls with `&&` and `||` (`&&` binds tighter):
//! ```text
//! Host(`example.com`) && (PathPrefix(`/api`) || Method(`POST`))
//! ```
//!
//! ## Functions
//!
//! | Function | Example | Description |
//! |----------|---------|-------------|
//! | Host | `Host:a.com,b.com` | Request host, case-insensitive |
//! | HostRegexp | `HostRegexp:{sub:[a-z]+}.a.com` | Host template |
//! | Path | `Path:/users/{id}` | Exact path or path template |
//! | PathStrip | `PathStrip:/api` | Exact path, stripped before forwarding |
//! | PathStripRegex | `PathStripRegex:/{tenant}` | Path template, stripped |
//! | PathPrefix | `PathPrefix:/api` | Path prefix |
//! | PathPrefixStrip | `PathPrefixStrip:/api` | Path prefix, stripped |
//! | PathPrefixStripRegex | `PathPrefixStripRegex:/api/{v}` | Prefix template, stripped |
//! | Method | `Method:GET,POST` | Request method |
//! | Headers | `Headers:X-Env,prod` | Header key/value pairs |
//! | HeadersRegexp | `HeadersRegexp:User-Agent,^curl` | Header key/regex pairs |
//! | Query | `Query:debug=1` | Query parameters |
//! | AddPrefix | `AddPrefix:/v1` | Prepend to the path |
//! | ReplacePath | `ReplacePath:/health` | Replace the path |
//! | ReplacePathRegex | `ReplacePathRegex:^/a/(.*) /b/$1` | Regex path replacement |
//!
//! Expression rules also accept lower-case, upper-case and title-case
//! function names (`host`, `HOST`, `Pathprefix`).

pub mod ast;
pub mod compile;
pub mod error;
pub mod flat;
pub mod matcher;
pub mod parser;
pub mod priority;
pub mod resolver;
pub mod rewrite;
pub mod route;
pub mod router;
pub mod types;

// Re-export commonly used items
pub use ast::Expr;
pub use compile::{bind_expr, compile_rule, RuleSyntax};
pub use error::{GrammarErrorKind, Result, RuleError};
pub use flat::{for_each_clause, parse_clauses, parse_domains, parse_flat};
pub use matcher::{Matcher, RequestMatcher};
pub use parser::{parse_domains_expression, parse_expression};
pub use priority::{effective_priority, sort_by_size_desc};
pub use rewrite::{Rewrite, RewriteOutcome, FORWARDED_PREFIX_HEADER, REPLACED_PATH_HEADER};
pub use route::Route;
pub use types::{Clause, Function};

// Re-export resolver types
pub use resolver::{
    CachingResolver, CnameLookup, CnameRecord, HostResolver, NilResolver, StaticResolver,
    DEFAULT_NEGATIVE_TTL, DEFAULT_RESOLVER_CACHE_SIZE, DEFAULT_RESOLVE_DEPTH,
};

// Re-export router types
pub use router::{RouteConfig, RouteMatch, Router, RouterConfig, RouterOptions};

#[cfg(test)]
mod tests {
    use super::*;
    use http::Request;

    #[test]
    fn test_full_workflow() {
        let config = r#"{
            "routes": [
                { "rule": "Host:example.com;PathPrefixStrip:/api,/api/v1", "target": "api" },
                { "rule": "Host(`example.com`) && Path(`/health`)", "target": "health" },
                { "rule": "HostRegexp:{sub:[a-z]+}.example.com", "target": "tenant" },
                { "rule": "PathPrefix:/", "priority": 0, "target": "fallback" }
            ]
        }"#;

        let router: Router<String> = Router::from_json(config, RouterOptions::new()).unwrap();
        assert_eq!(router.len(), 4);

        // Versioned API -> longest strip prefix removed
        let mut req = Request::builder()
            .uri("/api/v1/users")
            .header("host", "EXAMPLE.com")
            .body(())
            .unwrap();
        let matched = router.route(&req).unwrap();
        assert_eq!(matched.target, "api");
        matched.rewrite(&mut req).unwrap();
        assert_eq!(req.uri().path(), "/users");
        assert_eq!(req.headers()[FORWARDED_PREFIX_HEADER], "/api/v1");

        // Health check
        let req = Request::builder()
            .uri("/health")
            .header("host", "example.com")
            .body(())
            .unwrap();
        assert_eq!(router.route(&req).unwrap().target, "health");

        // Tenant subdomain
        let req = Request::builder()
            .uri("/")
            .header("host", "acme.example.com")
            .body(())
            .unwrap();
        assert_eq!(router.route(&req).unwrap().target, "tenant");

        // Anything else -> fallback
        let req = Request::builder()
            .uri("/x")
            .header("host", "other.org")
            .body(())
            .unwrap();
        assert_eq!(router.route(&req).unwrap().target, "fallback");

        // Domains for certificate selection; HostRegexp contributes none
        assert_eq!(router.domains().unwrap(), vec!["example.com"]);
    }
}
