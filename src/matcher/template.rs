//! Brace templates such as `{subdomain:[a-z]+}.example.com` or `/user/{id}`.
//!
//! Each `{name}` or `{name:pattern}` becomes a capture group; everything
//! outside braces is matched literally.

use regex::Regex;

/// Where a template is used. Decides the default variable pattern and anchoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    /// Host name, matched case-insensitively in full
    Host,
    /// Request path, matched in full
    Path,
    /// Request path prefix, anchored at the start only
    PathPrefix,
    /// Query parameter value, matched in full
    Query,
}

impl TemplateKind {
    fn default_pattern(self) -> &'static str {
        match self {
            TemplateKind::Host => "[^.]+",
            TemplateKind::Path | TemplateKind::PathPrefix => "[^/]+",
            TemplateKind::Query => ".*",
        }
    }
}

/// A compiled brace template.
#[derive(Debug, Clone)]
pub struct Template {
    source: String,
    regex: Regex,
    vars: Vec<String>,
}

impl Template {
    /// Compile a template. The error message names the offending part.
    pub fn new(template: &str, kind: TemplateKind) -> std::result::Result<Self, String> {
        let braces = brace_indices(template)?;

        let mut pattern = String::with_capacity(template.len() * 2);
        if kind == TemplateKind::Host {
            pattern.push_str("(?i)");
        }
        pattern.push('^');

        let mut vars = Vec::with_capacity(braces.len());
        let mut end = 0;
        for (open, close) in braces {
            pattern.push_str(&regex::escape(&template[end..open]));

            let inner = &template[open + 1..close];
            let (name, var_pattern) = match inner.split_once(':') {
                Some((name, var_pattern)) => (name, var_pattern),
                None => (inner, kind.default_pattern()),
            };
            if name.is_empty() || var_pattern.is_empty() {
                return Err(format!("missing name or pattern in {:?}", template));
            }

            pattern.push_str(&format!("(?P<v{}>{})", vars.len(), var_pattern));
            vars.push(name.to_string());
            end = close + 1;
        }
        pattern.push_str(&regex::escape(&template[end..]));

        if kind != TemplateKind::PathPrefix {
            pattern.push('$');
        }

        let regex = Regex::new(&pattern)
            .map_err(|e| format!("invalid pattern in {:?}: {}", template, e))?;

        Ok(Self {
            source: template.to_string(),
            regex,
            vars,
        })
    }

    /// Whether the string contains template syntax.
    pub fn is_template(s: &str) -> bool {
        s.contains('{')
    }

    /// The template as written.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Variable names, in order of appearance.
    pub fn vars(&self) -> &[String] {
        &self.vars
    }

    pub fn is_match(&self, s: &str) -> bool {
        self.regex.is_match(s)
    }

    /// Byte length of the leading part of `s` matched by the template.
    pub fn match_prefix(&self, s: &str) -> Option<usize> {
        self.regex.find(s).map(|m| m.end())
    }

    /// Variable values captured from `s`, or `None` if it does not match.
    pub fn captures(&self, s: &str) -> Option<Vec<(String, String)>> {
        let caps = self.regex.captures(s)?;
        Some(
            self.vars
                .iter()
                .enumerate()
                .filter_map(|(i, name)| {
                    caps.name(&format!("v{}", i))
                        .map(|m| (name.clone(), m.as_str().to_string()))
                })
                .collect(),
        )
    }
}

impl AsRef<str> for Template {
    fn as_ref(&self) -> &str {
        &self.source
    }
}

/// Byte offsets of the outermost `{`/`}` pairs.
fn brace_indices(s: &str) -> std::result::Result<Vec<(usize, usize)>, String> {
    let mut level = 0usize;
    let mut start = 0;
    let mut indices = Vec::new();

    for (i, c) in s.char_indices() {
        match c {
            '{' => {
                level += 1;
                if level == 1 {
                    start = i;
                }
            }
            '}' => {
                if level == 0 {
                    return Err(format!("unbalanced braces in {:?}", s));
                }
                level -= 1;
                if level == 0 {
                    indices.push((start, i));
                }
            }
            _ => {}
        }
    }

    if level != 0 {
        return Err(format!("unbalanced braces in {:?}", s));
    }
    Ok(indices)
}
