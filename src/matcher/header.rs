use http::header::HeaderName;
use http::{Method, Request};
use regex::Regex;

use super::template::{Template, TemplateKind};
use super::RequestMatcher;

/// Matches the request method against any of a list of methods.
#[derive(Debug, Clone)]
pub struct MethodMatcher {
    methods: Vec<Method>,
}

impl MethodMatcher {
    /// Method names are upper-cased before comparison.
    pub fn new(methods: &[String]) -> std::result::Result<Self, String> {
        let methods = methods
            .iter()
            .map(|m| {
                Method::from_bytes(m.trim().to_uppercase().as_bytes())
                    .map_err(|_| format!("invalid method {:?}", m))
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self { methods })
    }
}

impl RequestMatcher for MethodMatcher {
    fn matches<B>(&self, req: &Request<B>) -> bool {
        self.methods.iter().any(|m| m == req.method())
    }
}

#[derive(Debug, Clone)]
enum ValueMatch {
    /// Present with any value
    Any,
    Exact(String),
    Regex(Regex),
}

impl ValueMatch {
    fn matches(&self, value: &str) -> bool {
        match self {
            ValueMatch::Any => true,
            ValueMatch::Exact(expected) => value == expected,
            ValueMatch::Regex(re) => re.is_match(value),
        }
    }
}

/// Matches request headers. Every configured header must be present with a
/// matching value; a header that repeats matches if any of its values does.
#[derive(Debug, Clone)]
pub struct HeadersMatcher {
    headers: Vec<(HeaderName, ValueMatch)>,
}

impl HeadersMatcher {
    /// Exact values from `key, value` pairs. An empty value only requires presence.
    pub fn new(pairs: &[String]) -> std::result::Result<Self, String> {
        Self::build(pairs, |value| {
            Ok(if value.is_empty() {
                ValueMatch::Any
            } else {
                ValueMatch::Exact(value.to_string())
            })
        })
    }

    /// Regex values from `key, pattern` pairs. An empty pattern only requires presence.
    pub fn new_regexp(pairs: &[String]) -> std::result::Result<Self, String> {
        Self::build(pairs, |value| {
            if value.is_empty() {
                return Ok(ValueMatch::Any);
            }
            Regex::new(value)
                .map(ValueMatch::Regex)
                .map_err(|e| format!("invalid pattern {:?}: {}", value, e))
        })
    }

    fn build<F>(pairs: &[String], value_match: F) -> std::result::Result<Self, String>
    where
        F: Fn(&str) -> std::result::Result<ValueMatch, String>,
    {
        if pairs.len() % 2 != 0 {
            return Err(format!(
                "number of parameters must be a multiple of 2, got {}",
                pairs.len()
            ));
        }

        let headers = pairs
            .chunks_exact(2)
            .map(|pair| {
                let name = HeaderName::from_bytes(pair[0].trim().as_bytes())
                    .map_err(|_| format!("invalid header name {:?}", pair[0]))?;
                Ok((name, value_match(&pair[1])?))
            })
            .collect::<std::result::Result<Vec<_>, String>>()?;
        Ok(Self { headers })
    }
}

impl RequestMatcher for HeadersMatcher {
    fn matches<B>(&self, req: &Request<B>) -> bool {
        self.headers.iter().all(|(name, value)| {
            req.headers()
                .get_all(name)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .any(|v| value.matches(v))
        })
    }
}

#[derive(Debug, Clone)]
enum QueryValue {
    /// Key present with any value
    Any,
    Exact(String),
    Template(Template),
}

/// Matches query parameters. Every configured key must be present with a
/// matching value.
#[derive(Debug, Clone)]
pub struct QueryMatcher {
    params: Vec<(String, QueryValue)>,
}

impl QueryMatcher {
    /// Build from `key=value` arguments. An empty value only requires the key.
    pub fn new(args: &[String]) -> std::result::Result<Self, String> {
        let params = args
            .iter()
            .map(|arg| {
                let (key, value) = arg
                    .split_once('=')
                    .ok_or_else(|| format!("expected key=value, got {:?}", arg))?;
                let key = key.trim();
                if key.is_empty() {
                    return Err(format!("empty query key in {:?}", arg));
                }
                let value = value.trim();
                let value = if value.is_empty() {
                    QueryValue::Any
                } else if Template::is_template(value) {
                    QueryValue::Template(Template::new(value, TemplateKind::Query)?)
                } else {
                    QueryValue::Exact(value.to_string())
                };
                Ok((key.to_string(), value))
            })
            .collect::<std::result::Result<Vec<_>, String>>()?;
        Ok(Self { params })
    }

    pub fn matches_query(&self, query: &str) -> bool {
        let pairs: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        self.params.iter().all(|(key, expected)| {
            pairs
                .iter()
                .filter(|(k, _)| k == key)
                .any(|(_, v)| match expected {
                    QueryValue::Any => true,
                    QueryValue::Exact(e) => v == e,
                    QueryValue::Template(t) => t.is_match(v),
                })
        })
    }
}

impl RequestMatcher for QueryMatcher {
    fn matches<B>(&self, req: &Request<B>) -> bool {
        self.matches_query(req.uri().query().unwrap_or(""))
    }
}
