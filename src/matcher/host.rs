use std::fmt;
use std::sync::Arc;

use http::header::HOST;
use http::Request;

use super::template::{Template, TemplateKind};
use super::RequestMatcher;
use crate::resolver::HostResolver;

/// Canonical host of a request: the `Host` header (or the URI authority),
/// port removed, trimmed and lower-cased. `None` when neither is present.
pub fn canonical_host<B>(req: &Request<B>) -> Option<String> {
    let raw = req
        .headers()
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .or_else(|| req.uri().authority().map(|a| a.host().to_string()))?;

    let host = strip_port(raw.trim()).trim().to_lowercase();
    if host.is_empty() {
        None
    } else {
        Some(host)
    }
}

fn strip_port(host: &str) -> &str {
    if let Some(rest) = host.strip_prefix('[') {
        // [v6]:port or [v6]
        return match rest.find(']') {
            Some(end) => &rest[..end],
            None => host,
        };
    }

    match host.rsplit_once(':') {
        // a bare IPv6 address has more than one colon and no port
        Some((name, port)) if !name.contains(':') && port.bytes().all(|b| b.is_ascii_digit()) => {
            name
        }
        _ => host,
    }
}

/// Matches the canonical request host against a list of hostnames.
pub struct HostMatcher {
    hosts: Vec<String>,
    resolver: Option<Arc<dyn HostResolver>>,
}

impl HostMatcher {
    /// Create a host matcher. Hostnames are lower-cased.
    pub fn new(hosts: &[String], resolver: Option<Arc<dyn HostResolver>>) -> Self {
        Self {
            hosts: hosts.iter().map(|h| h.to_lowercase()).collect(),
            resolver,
        }
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    /// Match an already canonicalized host.
    pub fn matches_host(&self, host: &str) -> bool {
        if host.is_empty() {
            return false;
        }

        if let Some(resolver) = &self.resolver {
            let (resolved, flattened) = resolver.cname_flatten(host);
            return self.hosts.iter().any(|h| {
                resolved.eq_ignore_ascii_case(h) || flattened.eq_ignore_ascii_case(h)
            });
        }

        self.hosts.iter().any(|h| h == host)
    }
}

impl fmt::Debug for HostMatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostMatcher")
            .field("hosts", &self.hosts)
            .field("cname_flattening", &self.resolver.is_some())
            .finish()
    }
}

impl RequestMatcher for HostMatcher {
    fn matches<B>(&self, req: &Request<B>) -> bool {
        canonical_host(req).is_some_and(|host| self.matches_host(&host))
    }
}

/// Matches the canonical request host against host templates.
#[derive(Debug, Clone)]
pub struct HostRegexpMatcher {
    templates: Vec<Template>,
}

impl HostRegexpMatcher {
    pub fn new(patterns: &[String]) -> std::result::Result<Self, String> {
        let templates = patterns
            .iter()
            .map(|p| Template::new(p, TemplateKind::Host))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { templates })
    }

    pub fn matches_host(&self, host: &str) -> bool {
        self.templates.iter().any(|t| t.is_match(host))
    }
}

impl RequestMatcher for HostRegexpMatcher {
    fn matches<B>(&self, req: &Request<B>) -> bool {
        canonical_host(req).is_some_and(|host| self.matches_host(&host))
    }
}
