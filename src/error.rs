use thiserror::Error;

/// Classifies grammar errors for programmatic matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrammarErrorKind {
    /// The rule expression is empty or blank
    Empty,
    /// A function name is not part of the function table
    UnknownFunction,
    /// A function call or clause carries no arguments
    MissingArguments,
    /// Malformed expression (unbalanced parentheses, dangling operator, bad string, ...)
    Syntax,
}

/// Rule engine error types
#[derive(Error, Debug)]
pub enum RuleError {
    #[error("Grammar error: {message}")]
    Grammar {
        kind: GrammarErrorKind,
        message: String,
    },

    #[error("Binding error in {function}: {message}")]
    Binding { function: String, message: String },

    #[error("Domain extraction error: {0}")]
    DomainExtraction(String),

    #[error("Error in rule '{clause}': {source}")]
    Clause {
        clause: String,
        #[source]
        source: Box<RuleError>,
    },

    #[error("Rewrite error: {0}")]
    Rewrite(String),

    #[error("Resolve error: {0}")]
    Resolve(String),

    #[error("Config error: {0}")]
    Config(String),
}

impl RuleError {
    pub(crate) fn grammar(kind: GrammarErrorKind, message: impl Into<String>) -> Self {
        RuleError::Grammar {
            kind,
            message: message.into(),
        }
    }

    pub(crate) fn binding(function: impl Into<String>, message: impl Into<String>) -> Self {
        RuleError::Binding {
            function: function.into(),
            message: message.into(),
        }
    }

    /// Wrap this error with the text of the clause it came from.
    pub(crate) fn in_clause(self, clause: impl Into<String>) -> Self {
        RuleError::Clause {
            clause: clause.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, looking through clause context.
    pub fn root(&self) -> &RuleError {
        match self {
            RuleError::Clause { source, .. } => source.root(),
            other => other,
        }
    }

    /// Grammar error kind, if this is (or wraps) a grammar error.
    pub fn grammar_kind(&self) -> Option<GrammarErrorKind> {
        match self.root() {
            RuleError::Grammar { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    pub fn is_grammar(&self) -> bool {
        matches!(self.root(), RuleError::Grammar { .. })
    }

    pub fn is_binding(&self) -> bool {
        matches!(self.root(), RuleError::Binding { .. })
    }

    pub fn is_domain_extraction(&self) -> bool {
        matches!(self.root(), RuleError::DomainExtraction(_))
    }
}

pub type Result<T> = std::result::Result<T, RuleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grammar_error_kind_is_matchable() {
        let err = RuleError::grammar(GrammarErrorKind::Empty, "empty rule");
        match &err {
            RuleError::Grammar { kind, .. } => {
                assert!(matches!(kind, GrammarErrorKind::Empty));
            }
            _ => panic!("expected Grammar"),
        }
        assert_eq!(err.grammar_kind(), Some(GrammarErrorKind::Empty));
    }

    #[test]
    fn test_clause_wrapper_exposes_root() {
        let err = RuleError::binding("HostRegexp", "invalid template").in_clause("HostRegexp:{a");
        assert!(err.is_binding());
        assert!(!err.is_grammar());
        assert!(err.grammar_kind().is_none());

        let display = format!("{}", err);
        assert!(display.contains("HostRegexp:{a"), "got: {}", display);
        assert!(display.contains("invalid template"), "got: {}", display);
    }

    #[test]
    fn test_nested_clause_wrappers() {
        let err = RuleError::grammar(GrammarErrorKind::UnknownFunction, "Unknown function: 'Foo'")
            .in_clause("Foo:bar")
            .in_clause("Host:a;Foo:bar");
        assert_eq!(err.grammar_kind(), Some(GrammarErrorKind::UnknownFunction));
    }

    #[test]
    fn test_domain_extraction_display() {
        let err = RuleError::DomainExtraction("no domain found in rule Host: ,".into());
        assert!(err.is_domain_extraction());
        assert!(format!("{}", err).contains("no domain found"));
    }
}
