use http::Request;

use super::template::{Template, TemplateKind};
use super::RequestMatcher;

#[derive(Debug, Clone)]
enum PathPattern {
    Exact(String),
    Template(Template),
}

/// Matches the request path exactly against any of its patterns.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    patterns: Vec<PathPattern>,
}

impl PathMatcher {
    /// Create a path matcher. Arguments containing `{` are compiled as templates.
    pub fn new(paths: &[String]) -> std::result::Result<Self, String> {
        let patterns = paths
            .iter()
            .map(|p| {
                let p = p.trim();
                if Template::is_template(p) {
                    Template::new(p, TemplateKind::Path).map(PathPattern::Template)
                } else {
                    Ok(PathPattern::Exact(p.to_string()))
                }
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    pub fn matches_path(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| match p {
            PathPattern::Exact(exact) => path == exact,
            PathPattern::Template(t) => t.is_match(path),
        })
    }
}

impl RequestMatcher for PathMatcher {
    fn matches<B>(&self, req: &Request<B>) -> bool {
        self.matches_path(req.uri().path())
    }
}

#[derive(Debug, Clone)]
enum PrefixPattern {
    Literal(String),
    Template(Template),
}

/// Matches when the request path starts with any of its prefixes.
///
/// A literal prefix `p` matches paths starting with `p` (so also `p/...`). Prefixes
/// containing `{` are compiled as templates anchored at the start of the path.
#[derive(Debug, Clone)]
pub struct PathPrefixMatcher {
    prefixes: Vec<PrefixPattern>,
}

impl PathPrefixMatcher {
    pub fn new(prefixes: &[String]) -> std::result::Result<Self, String> {
        let prefixes = prefixes
            .iter()
            .map(|p| {
                let p = p.trim();
                if Template::is_template(p) {
                    Template::new(p, TemplateKind::PathPrefix).map(PrefixPattern::Template)
                } else {
                    Ok(PrefixPattern::Literal(p.to_string()))
                }
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { prefixes })
    }

    pub fn matches_path(&self, path: &str) -> bool {
        self.prefixes.iter().any(|p| match p {
            PrefixPattern::Literal(prefix) => path.starts_with(prefix.as_str()),
            PrefixPattern::Template(t) => t.match_prefix(path).is_some(),
        })
    }
}

impl RequestMatcher for PathPrefixMatcher {
    fn matches<B>(&self, req: &Request<B>) -> bool {
        self.matches_path(req.uri().path())
    }
}
