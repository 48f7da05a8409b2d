use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;

/// Rule functions understood by both rule grammars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Function {
    Host,
    HostRegexp,
    Path,
    PathStrip,
    PathStripRegex,
    PathPrefix,
    PathPrefixStrip,
    PathPrefixStripRegex,
    Method,
    Headers,
    HeadersRegexp,
    AddPrefix,
    ReplacePath,
    ReplacePathRegex,
    Query,
}

/// Expression-grammar lookup table: every function under its four spellings.
static ALIASES: Lazy<HashMap<String, Function>> = Lazy::new(|| {
    let mut map = HashMap::with_capacity(Function::ALL.len() * 4);
    for function in Function::ALL {
        for alias in function.aliases() {
            map.insert(alias, function);
        }
    }
    map
});

impl Function {
    /// Every accepted function, in table order.
    pub const ALL: [Function; 15] = [
        Function::Host,
        Function::HostRegexp,
        Function::Path,
        Function::PathStrip,
        Function::PathStripRegex,
        Function::PathPrefix,
        Function::PathPrefixStrip,
        Function::PathPrefixStripRegex,
        Function::Method,
        Function::Headers,
        Function::HeadersRegexp,
        Function::AddPrefix,
        Function::ReplacePath,
        Function::ReplacePathRegex,
        Function::Query,
    ];

    /// Canonical name of the function.
    pub fn name(self) -> &'static str {
        match self {
            Function::Host => "Host",
            Function::HostRegexp => "HostRegexp",
            Function::Path => "Path",
            Function::PathStrip => "PathStrip",
            Function::PathStripRegex => "PathStripRegex",
            Function::PathPrefix => "PathPrefix",
            Function::PathPrefixStrip => "PathPrefixStrip",
            Function::PathPrefixStripRegex => "PathPrefixStripRegex",
            Function::Method => "Method",
            Function::Headers => "Headers",
            Function::HeadersRegexp => "HeadersRegexp",
            Function::AddPrefix => "AddPrefix",
            Function::ReplacePath => "ReplacePath",
            Function::ReplacePathRegex => "ReplacePathRegex",
            Function::Query => "Query",
        }
    }

    /// Exact-spelling lookup, as used by the flat grammar.
    pub fn from_name(name: &str) -> Option<Function> {
        Function::ALL.into_iter().find(|f| f.name() == name)
    }

    /// Lookup accepting the original, lower, upper and title spellings.
    pub fn from_alias(name: &str) -> Option<Function> {
        ALIASES.get(name).copied()
    }

    /// The four registered spellings: original, lower, upper, title.
    pub fn aliases(self) -> [String; 4] {
        let name = self.name();
        let lower = name.to_lowercase();
        let mut title = String::with_capacity(name.len());
        let mut chars = lower.chars();
        if let Some(first) = chars.next() {
            title.extend(first.to_uppercase());
            title.push_str(chars.as_str());
        }
        [name.to_string(), lower, name.to_uppercase(), title]
    }

    /// Functions that only set a rewrite slot and add no request constraint.
    pub fn is_rewrite_only(self) -> bool {
        matches!(
            self,
            Function::AddPrefix | Function::ReplacePath | Function::ReplacePathRegex
        )
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One `Name:arg1,arg2` unit of a flat rule expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    /// Resolved function
    pub function: Function,
    /// Trimmed arguments, in source order
    pub args: Vec<String>,
}

impl Clause {
    pub fn new(function: Function, args: Vec<String>) -> Self {
        Self { function, args }
    }
}
