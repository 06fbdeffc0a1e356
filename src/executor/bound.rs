//! Row-cap enforcement by limit-clause injection.
//!
//! The cap is a ceiling, not a floor: a statement that already limits itself
//! to fewer rows keeps its own limit, while a missing, larger, or unbounded
//! (`LIMIT ALL`) clause is brought down to the configured maximum.

use crate::security::lexer::{self, Token, TokenKind};
use crate::security::AcceptedStatement;
use serde::Serialize;
use tracing::debug;

/// An accepted statement with its row cap applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoundedStatement {
    text: String,
    row_cap: u32,
}

impl BoundedStatement {
    /// Final executable text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Effective row ceiling; always `<=` the configured maximum.
    pub fn row_cap(&self) -> u32 {
        self.row_cap
    }
}

/// Apply the row cap to an accepted statement.
pub fn bound_statement(statement: &AcceptedStatement, max_row_cap: u32) -> BoundedStatement {
    let sql = statement.text();
    // Accepted statements lexed once already; a failure here is unreachable.
    let tokens = lexer::tokenize(sql).unwrap_or_default();

    match find_limit_value(&tokens) {
        Some(LimitClause::Count { value, .. }) if value <= max_row_cap as u64 => {
            BoundedStatement {
                text: sql.to_string(),
                row_cap: value as u32,
            }
        }
        Some(LimitClause::Count { span, .. }) | Some(LimitClause::All { span }) => {
            debug!("Rewriting oversized LIMIT down to cap {}", max_row_cap);
            let mut text = String::with_capacity(sql.len());
            text.push_str(&sql[..span.0]);
            text.push_str(&max_row_cap.to_string());
            text.push_str(&sql[span.1..]);
            BoundedStatement {
                text,
                row_cap: max_row_cap,
            }
        }
        None => {
            debug!("No LIMIT clause; appending cap {}", max_row_cap);
            BoundedStatement {
                text: format!("{} LIMIT {}", sql.trim_end(), max_row_cap),
                row_cap: max_row_cap,
            }
        }
    }
}

enum LimitClause {
    /// `LIMIT <n>`; span covers the number token.
    Count { value: u64, span: (usize, usize) },
    /// `LIMIT ALL`; span covers the `ALL` token.
    All { span: (usize, usize) },
}

/// Find the statement-level `LIMIT` clause. `LIMIT` inside a subquery (any
/// parenthesis depth above zero) bounds only that subquery and is ignored.
fn find_limit_value(tokens: &[Token]) -> Option<LimitClause> {
    let mut depth: i64 = 0;
    for (i, token) in tokens.iter().enumerate() {
        match &token.kind {
            TokenKind::Punct('(') => depth += 1,
            TokenKind::Punct(')') => depth -= 1,
            TokenKind::Word(w) if depth == 0 && w.eq_ignore_ascii_case("LIMIT") => {
                let next = tokens.get(i + 1)?;
                return match &next.kind {
                    TokenKind::Number(n) => {
                        let span = (next.span.start, next.span.end);
                        match n.parse::<u64>() {
                            Ok(value) => Some(LimitClause::Count { value, span }),
                            // Not a plain integer; treat as unbounded and rewrite.
                            Err(_) => Some(LimitClause::All { span }),
                        }
                    }
                    TokenKind::Word(w) if w.eq_ignore_ascii_case("ALL") => Some(LimitClause::All {
                        span: (next.span.start, next.span.end),
                    }),
                    _ => None,
                };
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PolicyConfig;
    use crate::security::StatementValidator;

    fn accepted(sql: &str) -> AcceptedStatement {
        StatementValidator::new(PolicyConfig::default())
            .validate(sql)
            .into_accepted()
            .expect("test statement must validate")
    }

    #[test]
    fn test_injects_cap_when_absent() {
        let bounded = bound_statement(&accepted("SELECT * FROM orders"), 1000);
        assert_eq!(bounded.text(), "SELECT * FROM orders LIMIT 1000");
        assert_eq!(bounded.row_cap(), 1000);
    }

    #[test]
    fn test_injection_after_terminator_strip() {
        let bounded = bound_statement(&accepted("SELECT * FROM orders;"), 1000);
        assert_eq!(bounded.text(), "SELECT * FROM orders LIMIT 1000");
    }

    #[test]
    fn test_smaller_limit_is_preserved() {
        let bounded = bound_statement(&accepted("SELECT * FROM orders LIMIT 50"), 10_000);
        assert_eq!(bounded.text(), "SELECT * FROM orders LIMIT 50");
        assert_eq!(bounded.row_cap(), 50);
    }

    #[test]
    fn test_larger_limit_is_clamped() {
        let bounded = bound_statement(&accepted("SELECT * FROM orders LIMIT 500000"), 10_000);
        assert_eq!(bounded.text(), "SELECT * FROM orders LIMIT 10000");
        assert_eq!(bounded.row_cap(), 10_000);
    }

    #[test]
    fn test_limit_all_is_clamped() {
        let bounded = bound_statement(&accepted("SELECT * FROM orders LIMIT ALL"), 10_000);
        assert_eq!(bounded.text(), "SELECT * FROM orders LIMIT 10000");
        assert_eq!(bounded.row_cap(), 10_000);
    }

    #[test]
    fn test_limit_with_offset_is_preserved() {
        let bounded = bound_statement(
            &accepted("SELECT * FROM orders LIMIT 20 OFFSET 40"),
            10_000,
        );
        assert_eq!(bounded.text(), "SELECT * FROM orders LIMIT 20 OFFSET 40");
        assert_eq!(bounded.row_cap(), 20);
    }

    #[test]
    fn test_subquery_limit_does_not_bound_statement() {
        let bounded = bound_statement(
            &accepted("SELECT * FROM (SELECT * FROM orders LIMIT 5) sub"),
            1000,
        );
        assert_eq!(
            bounded.text(),
            "SELECT * FROM (SELECT * FROM orders LIMIT 5) sub LIMIT 1000"
        );
        assert_eq!(bounded.row_cap(), 1000);
    }

    #[test]
    fn test_cte_body_limit_does_not_bound_statement() {
        let bounded = bound_statement(
            &accepted("WITH top AS (SELECT * FROM orders LIMIT 5) SELECT * FROM top"),
            1000,
        );
        assert!(bounded.text().ends_with("LIMIT 1000"));
    }

    #[test]
    fn test_scenario_a_bounded_text() {
        let bounded = bound_statement(
            &accepted(
                "SELECT category, SUM(revenue) FROM orders o \
                 JOIN products p ON o.product_id=p.product_id GROUP BY category",
            ),
            1000,
        );
        assert!(bounded.text().ends_with("LIMIT 1000"));
        assert_eq!(bounded.row_cap(), 1000);
    }
}
