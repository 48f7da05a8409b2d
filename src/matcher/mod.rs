mod header;
mod host;
mod path;
pub mod template;

pub use header::{HeadersMatcher, MethodMatcher, QueryMatcher};
pub use host::{canonical_host, HostMatcher, HostRegexpMatcher};
pub use path::{PathMatcher, PathPrefixMatcher};
pub use template::{Template, TemplateKind};

use http::Request;

/// Trait for request matchers
pub trait RequestMatcher: Send + Sync {
    /// Check if the request matches this matcher
    fn matches<B>(&self, req: &Request<B>) -> bool;
}

/// Enum wrapper for all matcher types
#[derive(Debug)]
pub enum Matcher {
    /// Matches every request
    All,
    Host(HostMatcher),
    HostRegexp(HostRegexpMatcher),
    Path(PathMatcher),
    PathPrefix(PathPrefixMatcher),
    Method(MethodMatcher),
    Headers(HeadersMatcher),
    Query(QueryMatcher),
    /// Every inner matcher must match
    And(Vec<Matcher>),
    /// At least one inner matcher must match
    Or(Vec<Matcher>),
}

impl Matcher {
    /// Conjunction of two matchers, flattening nested conjunctions.
    pub fn and(self, other: Matcher) -> Matcher {
        match (self, other) {
            (Matcher::All, m) | (m, Matcher::All) => m,
            (Matcher::And(mut left), Matcher::And(right)) => {
                left.extend(right);
                Matcher::And(left)
            }
            (Matcher::And(mut left), m) => {
                left.push(m);
                Matcher::And(left)
            }
            (m, Matcher::And(mut right)) => {
                right.insert(0, m);
                Matcher::And(right)
            }
            (left, right) => Matcher::And(vec![left, right]),
        }
    }

    /// Disjunction of two matchers, flattening nested disjunctions.
    pub fn or(self, other: Matcher) -> Matcher {
        match (self, other) {
            (Matcher::Or(mut left), Matcher::Or(right)) => {
                left.extend(right);
                Matcher::Or(left)
            }
            (Matcher::Or(mut left), m) => {
                left.push(m);
                Matcher::Or(left)
            }
            (m, Matcher::Or(mut right)) => {
                right.insert(0, m);
                Matcher::Or(right)
            }
            (left, right) => Matcher::Or(vec![left, right]),
        }
    }
}

impl RequestMatcher for Matcher {
    fn matches<B>(&self, req: &Request<B>) -> bool {
        match self {
            Matcher::All => true,
            Matcher::Host(m) => m.matches(req),
            Matcher::HostRegexp(m) => m.matches(req),
            Matcher::Path(m) => m.matches(req),
            Matcher::PathPrefix(m) => m.matches(req),
            Matcher::Method(m) => m.matches(req),
            Matcher::Headers(m) => m.matches(req),
            Matcher::Query(m) => m.matches(req),
            Matcher::And(ms) => ms.iter().all(|m| m.matches(req)),
            Matcher::Or(ms) => ms.iter().any(|m| m.matches(req)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn request(host: &str, path: &str) -> Request<()> {
        Request::builder()
            .uri(path)
            .header(http::header::HOST, host)
            .body(())
            .unwrap()
    }

    fn host(h: &str) -> Matcher {
        Matcher::Host(HostMatcher::new(&args(&[h]), None))
    }

    fn path(p: &str) -> Matcher {
        Matcher::Path(PathMatcher::new(&args(&[p])).unwrap())
    }

    #[test]
    fn test_all_matcher() {
        assert!(Matcher::All.matches(&request("any.host", "/any")));
    }

    #[test]
    fn test_and_matcher() {
        let matcher = host("foo.bar").and(path("/test"));
        assert!(matcher.matches(&request("foo.bar", "/test")));
        assert!(!matcher.matches(&request("foo.bar", "/other")));
        assert!(!matcher.matches(&request("bar.foo", "/test")));
    }

    #[test]
    fn test_or_matcher() {
        let matcher = host("a.com").or(path("/b"));
        assert!(matcher.matches(&request("a.com", "/x")));
        assert!(matcher.matches(&request("c.com", "/b")));
        assert!(!matcher.matches(&request("c.com", "/x")));
    }

    #[test]
    fn test_and_flattens() {
        let matcher = host("a.com").and(path("/b")).and(Matcher::All).and(path("/b"));
        match matcher {
            Matcher::And(inner) => assert_eq!(inner.len(), 3),
            other => panic!("expected And, got {:?}", other),
        }
    }

    #[test]
    fn test_or_flattens() {
        let matcher = host("a.com").or(host("b.com")).or(host("c.com"));
        match matcher {
            Matcher::Or(inner) => assert_eq!(inner.len(), 3),
            other => panic!("expected Or, got {:?}", other),
        }
    }
}
