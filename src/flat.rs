//! Flat rule grammar.
//!
//! ```text
//! rule    := clause (";" clause)*
//! clause  := functionName ":" argList
//! argList := arg ("," arg)*
//! ```
//!
//! Clauses are implicitly AND-ed. Function names are matched by their exact
//! spelling; whitespace around names and arguments is trimmed.

use crate::ast::Expr;
use crate::error::{GrammarErrorKind, Result, RuleError};
use crate::types::{Clause, Function};

/// Tokenize a flat rule and hand every clause to `on_clause`, in order.
///
/// Stops at the first error. Errors raised by `on_clause` are wrapped with
/// the text of the offending clause.
pub fn for_each_clause<F>(expression: &str, mut on_clause: F) -> Result<()>
where
    F: FnMut(&Clause) -> Result<()>,
{
    if expression.is_empty() {
        return Err(RuleError::grammar(GrammarErrorKind::Empty, "empty rule"));
    }

    for raw in expression.split(';').filter(|s| !s.is_empty()) {
        let clause = parse_clause(raw)?;
        on_clause(&clause).map_err(|e| e.in_clause(raw.trim()))?;
    }

    Ok(())
}

/// Tokenize a flat rule into its clauses.
pub fn parse_clauses(expression: &str) -> Result<Vec<Clause>> {
    let mut clauses = Vec::new();
    for_each_clause(expression, |clause| {
        clauses.push(clause.clone());
        Ok(())
    })?;
    Ok(clauses)
}

/// Desugar a flat rule into the canonical AST (an AND chain of its clauses).
pub fn parse_flat(expression: &str) -> Result<Expr> {
    Expr::from_clauses(parse_clauses(expression)?).ok_or_else(|| {
        RuleError::grammar(
            GrammarErrorKind::Empty,
            format!("no clause found in rule '{}'", expression),
        )
    })
}

/// Hostnames named by `Host` clauses, lower-cased, empties dropped.
///
/// A rule without any `Host` clause yields an empty list. A rule whose
/// `Host` clauses leave no usable domain is an error.
pub fn parse_domains(expression: &str) -> Result<Vec<String>> {
    let mut domains = Vec::new();
    let mut has_host = false;

    for_each_clause(expression, |clause| {
        if clause.function == Function::Host {
            has_host = true;
            domains.extend(clause.args.iter().cloned());
        }
        Ok(())
    })?;

    let domains: Vec<String> = domains
        .into_iter()
        .map(|d| d.to_lowercase())
        .filter(|d| !d.is_empty())
        .collect();

    if has_host && domains.is_empty() {
        return Err(RuleError::DomainExtraction(format!(
            "no domain found in rule {}",
            expression
        )));
    }

    Ok(domains)
}

fn parse_clause(raw: &str) -> Result<Clause> {
    let (name, rest) = match raw.split_once(':') {
        Some((name, rest)) => (name.trim(), rest),
        None => (raw.trim(), ""),
    };

    let function = Function::from_name(name).ok_or_else(|| {
        RuleError::grammar(
            GrammarErrorKind::UnknownFunction,
            format!("error parsing rule: '{}'. Unknown function: '{}'", raw, name),
        )
    })?;

    let args: Vec<String> = rest
        .split(',')
        .filter(|s| !s.is_empty())
        .map(|s| s.trim().to_string())
        .collect();

    if args.is_empty() {
        return Err(RuleError::grammar(
            GrammarErrorKind::MissingArguments,
            format!("error parsing args from rule: '{}'", raw),
        ));
    }

    Ok(Clause::new(function, args))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_clause() {
        let clauses = parse_clauses("Host:foo.bar").unwrap();
        assert_eq!(
            clauses,
            vec![Clause::new(Function::Host, vec!["foo.bar".to_string()])]
        );
    }

    #[test]
    fn test_parse_trims_names_and_args() {
        let clauses = parse_clauses(" Host : Foo.Bar , test.bar ; Path:/FOObar").unwrap();
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].function, Function::Host);
        assert_eq!(clauses[0].args, vec!["Foo.Bar", "test.bar"]);
        assert_eq!(clauses[1].function, Function::Path);
        assert_eq!(clauses[1].args, vec!["/FOObar"]);
    }

    #[test]
    fn test_parse_splits_on_first_colon_only() {
        let clauses = parse_clauses("Host:localhost:8080").unwrap();
        assert_eq!(clauses[0].args, vec!["localhost:8080"]);

        let clauses = parse_clauses("ReplacePathRegex: ^/api/(.*) /v1/$1").unwrap();
        assert_eq!(clauses[0].args, vec!["^/api/(.*) /v1/$1"]);
    }

    #[test]
    fn test_parse_skips_empty_clauses_and_args() {
        let clauses = parse_clauses(";Host:a.com,,b.com;;Path:/x;").unwrap();
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].args, vec!["a.com", "b.com"]);
    }

    #[test]
    fn test_empty_rule() {
        let err = parse_clauses("").unwrap_err();
        assert_eq!(err.grammar_kind(), Some(GrammarErrorKind::Empty));
        assert!(format!("{}", err).contains("empty rule"));
    }

    #[test]
    fn test_missing_arguments() {
        for rule in ["Host:", "Host", "Host:,", "Path:/a;Method:"] {
            let err = parse_clauses(rule).unwrap_err();
            assert_eq!(
                err.grammar_kind(),
                Some(GrammarErrorKind::MissingArguments),
                "rule {:?}",
                rule
            );
        }
    }

    #[test]
    fn test_unknown_function_names_clause() {
        let err = parse_clauses("Host:a.com;Hots:b.com").unwrap_err();
        assert_eq!(err.grammar_kind(), Some(GrammarErrorKind::UnknownFunction));
        let msg = format!("{}", err);
        assert!(msg.contains("Hots:b.com"), "got: {}", msg);

        // The flat grammar has no case aliases
        let err = parse_clauses("host:a.com").unwrap_err();
        assert_eq!(err.grammar_kind(), Some(GrammarErrorKind::UnknownFunction));
    }

    #[test]
    fn test_callback_order_and_fail_fast() {
        let mut seen = Vec::new();
        let result = for_each_clause("Host:a;Path:/b;Method:GET;Query:x=1", |clause| {
            seen.push(clause.function);
            if clause.function == Function::Method {
                return Err(RuleError::binding("Method", "rejected"));
            }
            Ok(())
        });

        assert_eq!(seen, vec![Function::Host, Function::Path, Function::Method]);
        let err = result.unwrap_err();
        assert!(err.is_binding());
        assert!(format!("{}", err).contains("Method:GET"));
    }

    #[test]
    fn test_parse_flat_desugars_to_and_chain() {
        let expr = parse_flat("Host:a.com;Path:/x").unwrap();
        assert_eq!(
            expr,
            Expr::and(
                Expr::leaf(Function::Host, vec!["a.com".to_string()]),
                Expr::leaf(Function::Path, vec!["/x".to_string()]),
            )
        );
        assert!(parse_flat(";;").is_err());
    }

    #[test]
    fn test_parse_domains() {
        assert_eq!(parse_domains("Host:foo.bar").unwrap(), vec!["foo.bar"]);
        assert_eq!(parse_domains("Host:FOO.BAR").unwrap(), vec!["foo.bar"]);
        assert_eq!(parse_domains("Host: foo.bar ").unwrap(), vec!["foo.bar"]);
        assert_eq!(
            parse_domains("Host: Foo.Bar ; Path:/FOObar").unwrap(),
            vec!["foo.bar"]
        );
        assert_eq!(
            parse_domains("Host:foo.bar,test.bar").unwrap(),
            vec!["foo.bar", "test.bar"]
        );
        assert_eq!(
            parse_domains("Host:a.com;Host:b.com,A.com").unwrap(),
            vec!["a.com", "b.com", "a.com"]
        );
    }

    #[test]
    fn test_parse_domains_without_host() {
        assert!(parse_domains("Path:/test").unwrap().is_empty());
        assert!(parse_domains("PathPrefix:/a;Method:GET").unwrap().is_empty());
    }

    #[test]
    fn test_parse_domains_degenerate_host() {
        let err = parse_domains("Host: ,").unwrap_err();
        assert!(err.is_domain_extraction(), "got: {:?}", err);
        assert!(format!("{}", err).contains("no domain found"));
    }

    #[test]
    fn test_parse_domains_grammar_errors() {
        assert!(parse_domains("").is_err());
        assert!(parse_domains("Host:").is_err());
        assert!(parse_domains("Unknown:x").is_err());
    }
}
