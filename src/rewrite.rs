//! Path rewrite directives carried by a route.
//!
//! Directives run in a fixed order: literal prefix strip, regex prefix
//! strip, add prefix, replace path, replace path by regex.

use http::header::{HeaderName, HeaderValue};
use http::uri::{PathAndQuery, Uri};
use http::Request;
use regex::Regex;

use crate::error::{Result, RuleError};
use crate::matcher::{Template, TemplateKind};
use crate::priority::sort_by_size_desc;

/// Header carrying each stripped prefix
pub const FORWARDED_PREFIX_HEADER: HeaderName = HeaderName::from_static("x-forwarded-prefix");

/// Header carrying the path before replacement
pub const REPLACED_PATH_HEADER: HeaderName = HeaderName::from_static("x-replaced-path");

#[derive(Debug, Clone)]
struct RegexReplacement {
    source: String,
    regex: Regex,
    replacement: String,
}

/// Rewrite slots of a route.
#[derive(Debug, Clone, Default)]
pub struct Rewrite {
    strip_prefixes: Vec<String>,
    strip_prefixes_regex: Vec<Template>,
    add_prefix: Option<String>,
    replace_path: Option<String>,
    replace_path_regex: Option<RegexReplacement>,
}

impl Rewrite {
    pub(crate) fn add_strip_prefixes(&mut self, prefixes: &[String]) {
        self.strip_prefixes.extend(prefixes.iter().cloned());
        sort_by_size_desc(&mut self.strip_prefixes);
    }

    pub(crate) fn add_strip_prefixes_regex(
        &mut self,
        prefixes: &[String],
    ) -> std::result::Result<(), String> {
        for prefix in prefixes {
            let template = Template::new(prefix, TemplateKind::PathPrefix)?;
            self.strip_prefixes_regex.push(template);
        }
        sort_by_size_desc(&mut self.strip_prefixes_regex);
        Ok(())
    }

    pub(crate) fn set_add_prefix(&mut self, prefix: &str) {
        self.add_prefix = Some(prefix.to_string());
    }

    pub(crate) fn set_replace_path(&mut self, path: &str) {
        self.replace_path = Some(path.to_string());
    }

    /// `arg` is `"<regex> <replacement>"`; the replacement may contain spaces.
    pub(crate) fn set_replace_path_regex(&mut self, arg: &str) -> std::result::Result<(), String> {
        let split = arg
            .trim()
            .split_once(char::is_whitespace)
            .map(|(pattern, replacement)| (pattern, replacement.trim_start()));
        let Some((pattern, replacement)) = split.filter(|(_, r)| !r.is_empty()) else {
            return Err(format!(
                "expected \"<regex> <replacement>\", got {:?}",
                arg
            ));
        };
        let regex =
            Regex::new(pattern).map_err(|e| format!("invalid pattern {:?}: {}", pattern, e))?;
        self.replace_path_regex = Some(RegexReplacement {
            source: arg.to_string(),
            regex,
            replacement: replacement.to_string(),
        });
        Ok(())
    }

    /// Literal strip targets, longest first.
    pub fn strip_prefixes(&self) -> &[String] {
        &self.strip_prefixes
    }

    /// Template strip targets, longest first.
    pub fn strip_prefixes_regex(&self) -> Vec<&str> {
        self.strip_prefixes_regex.iter().map(|t| t.source()).collect()
    }

    pub fn add_prefix(&self) -> Option<&str> {
        self.add_prefix.as_deref()
    }

    pub fn replace_path(&self) -> Option<&str> {
        self.replace_path.as_deref()
    }

    /// The `"<regex> <replacement>"` argument as written.
    pub fn replace_path_regex(&self) -> Option<&str> {
        self.replace_path_regex.as_ref().map(|r| r.source.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.strip_prefixes.is_empty()
            && self.strip_prefixes_regex.is_empty()
            && self.add_prefix.is_none()
            && self.replace_path.is_none()
            && self.replace_path_regex.is_none()
    }

    /// Run every directive against `path`.
    pub fn apply(&self, path: &str) -> RewriteOutcome {
        let mut outcome = RewriteOutcome {
            path: path.to_string(),
            forwarded_prefixes: Vec::new(),
            replaced_path: None,
        };

        if let Some(prefix) = self
            .strip_prefixes
            .iter()
            .find(|p| outcome.path.starts_with(p.as_str()))
        {
            outcome.path = ensure_leading_slash(&outcome.path[prefix.len()..]);
            outcome.forwarded_prefixes.push(prefix.clone());
        }

        if let Some(len) = self
            .strip_prefixes_regex
            .iter()
            .find_map(|t| t.match_prefix(&outcome.path))
        {
            let prefix = outcome.path[..len].to_string();
            outcome.path = ensure_leading_slash(&outcome.path[len..]);
            outcome.forwarded_prefixes.push(prefix);
        }

        if let Some(prefix) = &self.add_prefix {
            outcome.path = format!("{}{}", ensure_leading_slash(prefix), outcome.path);
        }

        if let Some(path) = &self.replace_path {
            outcome.replaced_path.get_or_insert_with(|| outcome.path.clone());
            outcome.path = path.clone();
        }

        if let Some(r) = &self.replace_path_regex {
            if r.regex.is_match(&outcome.path) {
                outcome.replaced_path.get_or_insert_with(|| outcome.path.clone());
                outcome.path = r
                    .regex
                    .replace_all(&outcome.path, r.replacement.as_str())
                    .into_owned();
            }
        }

        outcome
    }
}

fn ensure_leading_slash(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

/// Result of applying a route's rewrite directives to a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOutcome {
    /// Rewritten path
    pub path: String,
    /// Stripped prefixes, in the order they were removed
    pub forwarded_prefixes: Vec<String>,
    /// Path before the first replacement, if a replacement ran
    pub replaced_path: Option<String>,
}

impl RewriteOutcome {
    /// Write the rewritten path (keeping the query) and the forwarding headers
    /// into `req`.
    pub fn apply_to<B>(&self, req: &mut Request<B>) -> Result<()> {
        let path_and_query = match req.uri().query() {
            Some(query) => format!("{}?{}", self.path, query),
            None => self.path.clone(),
        };
        let path_and_query: PathAndQuery = path_and_query
            .parse()
            .map_err(|e| RuleError::Rewrite(format!("invalid path {:?}: {}", self.path, e)))?;

        let mut parts = req.uri().clone().into_parts();
        parts.path_and_query = Some(path_and_query);
        *req.uri_mut() = Uri::from_parts(parts)
            .map_err(|e| RuleError::Rewrite(format!("invalid uri: {}", e)))?;

        for prefix in &self.forwarded_prefixes {
            let value = HeaderValue::from_str(prefix)
                .map_err(|e| RuleError::Rewrite(format!("invalid prefix {:?}: {}", prefix, e)))?;
            req.headers_mut().append(FORWARDED_PREFIX_HEADER, value);
        }

        if let Some(replaced) = &self.replaced_path {
            let value = HeaderValue::from_str(replaced)
                .map_err(|e| RuleError::Rewrite(format!("invalid path {:?}: {}", replaced, e)))?;
            req.headers_mut().insert(REPLACED_PATH_HEADER, value);
        }

        Ok(())
    }
}
