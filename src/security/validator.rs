//! SQL statement validator.
//!
//! Decides whether an LLM-produced candidate statement may be executed at
//! all. The decision is made entirely over the token stream from
//! [`lexer`](crate::security::lexer), with no database contact and no I/O,
//! and is deterministic for a given policy.
//!
//! Checks run in a fixed order, first failure wins: parseable, single
//! statement, read-only root, keyword denylist, then (if enabled) the table
//! allowlist. A rejection is terminal; there is no fix-up path.

use crate::config::PolicyConfig;
use crate::security::lexer::{self, Token, TokenKind};
use crate::security::tables;
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

/// Why a candidate statement was rejected.
///
/// [`RejectReason::code`] yields the machine-readable reason string;
/// `Display` yields the human-readable detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RejectReason {
    SyntaxError { detail: String },
    MultipleStatements,
    NotAQuery { found: String },
    ForbiddenKeyword { keyword: String },
    TableNotAllowed { table: String },
}

impl RejectReason {
    /// Machine-readable reason code, e.g. `forbidden_keyword:DROP`.
    pub fn code(&self) -> String {
        match self {
            Self::SyntaxError { .. } => "syntax_error".into(),
            Self::MultipleStatements => "multiple_statements".into(),
            Self::NotAQuery { .. } => "not_a_query".into(),
            Self::ForbiddenKeyword { keyword } => format!("forbidden_keyword:{}", keyword),
            Self::TableNotAllowed { table } => format!("table_not_allowed:{}", table),
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SyntaxError { detail } => write!(f, "Statement could not be parsed: {}", detail),
            Self::MultipleStatements => write!(f, "Multiple SQL statements are not allowed"),
            Self::NotAQuery { found } => {
                write!(f, "Only SELECT queries are allowed (found {})", found)
            }
            Self::ForbiddenKeyword { keyword } => {
                write!(f, "Forbidden keyword: {}", keyword)
            }
            Self::TableNotAllowed { table } => {
                write!(f, "Access to table not allowed: {}", table)
            }
        }
    }
}

/// A statement that passed validation.
///
/// The only constructor is [`StatementValidator::validate`], so holding one
/// proves the text went through the full check sequence. The executor takes
/// this type, not a raw string: handing it a rejected or unvetted statement
/// is unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcceptedStatement {
    text: String,
}

impl AcceptedStatement {
    /// The effective statement text: original token extent, trailing
    /// terminator and surrounding comments stripped.
    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Outcome of validating one candidate statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum ValidationVerdict {
    Accepted(AcceptedStatement),
    Rejected(RejectReason),
}

impl ValidationVerdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }

    pub fn reason(&self) -> Option<&RejectReason> {
        match self {
            Self::Rejected(reason) => Some(reason),
            Self::Accepted(_) => None,
        }
    }

    pub fn into_accepted(self) -> Option<AcceptedStatement> {
        match self {
            Self::Accepted(statement) => Some(statement),
            Self::Rejected(_) => None,
        }
    }
}

/// SQL statement validator. Pure with respect to the database.
#[derive(Debug, Clone)]
pub struct StatementValidator {
    policy: PolicyConfig,
}

impl StatementValidator {
    pub fn new(policy: PolicyConfig) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &PolicyConfig {
        &self.policy
    }

    /// Validate a candidate statement.
    pub fn validate(&self, candidate: &str) -> ValidationVerdict {
        debug!(
            "Validating candidate: {}",
            &candidate[..candidate.len().min(100)]
        );

        let tokens = match lexer::tokenize(candidate) {
            Ok(tokens) => tokens,
            Err(e) => {
                warn!("Candidate failed to tokenize: {}", e);
                return ValidationVerdict::Rejected(RejectReason::SyntaxError {
                    detail: e.to_string(),
                });
            }
        };

        let statements = lexer::split_statements(&tokens);
        let statement = match statements.as_slice() {
            [] => {
                return ValidationVerdict::Rejected(RejectReason::SyntaxError {
                    detail: "no statement found".into(),
                });
            }
            [single] => *single,
            _ => {
                warn!("Candidate contains {} statements", statements.len());
                return ValidationVerdict::Rejected(RejectReason::MultipleStatements);
            }
        };

        if let Err(reason) = check_readonly_root(statement) {
            warn!("Candidate rejected: {}", reason);
            return ValidationVerdict::Rejected(reason);
        }

        if let Err(reason) = self.check_denylist(statement) {
            warn!("Candidate rejected: {}", reason);
            return ValidationVerdict::Rejected(reason);
        }

        if self.policy.enforce_table_allowlist {
            if let Err(reason) = self.check_table_allowlist(statement) {
                warn!("Candidate rejected: {}", reason);
                return ValidationVerdict::Rejected(reason);
            }
        }

        let first = statement.first().expect("statement groups are non-empty");
        let last = statement.last().expect("statement groups are non-empty");
        let text = candidate[first.span.start..last.span.end].to_string();

        debug!("Candidate accepted");
        ValidationVerdict::Accepted(AcceptedStatement { text })
    }

    /// Denylist matching is whole-token only: an identifier such as
    /// `dropdown_count` never matches `DROP`.
    fn check_denylist(&self, statement: &[Token]) -> Result<(), RejectReason> {
        for token in statement {
            if let Some(word) = token.word_upper() {
                if self.policy.denylisted_keywords.contains(&word) {
                    return Err(RejectReason::ForbiddenKeyword { keyword: word });
                }
            }
        }
        Ok(())
    }

    fn check_table_allowlist(&self, statement: &[Token]) -> Result<(), RejectReason> {
        for table in tables::extract_table_references(statement) {
            if !self.policy.allowed_tables.contains(&table) {
                return Err(RejectReason::TableNotAllowed { table });
            }
        }
        Ok(())
    }
}

/// The statement root must be `SELECT`, or `WITH` whose body resolves to a
/// `SELECT` at the top level of the statement.
fn check_readonly_root(statement: &[Token]) -> Result<(), RejectReason> {
    let first = statement.first().expect("statement groups are non-empty");

    if first.is_word("SELECT") {
        return Ok(());
    }

    if first.is_word("WITH") {
        // Scan past the CTE definitions: the first depth-0 DML verb after
        // `WITH` decides what the statement actually does.
        let mut depth: i64 = 0;
        for token in &statement[1..] {
            match &token.kind {
                TokenKind::Punct('(') => depth += 1,
                TokenKind::Punct(')') => depth -= 1,
                TokenKind::Word(w) if depth == 0 => match w.to_uppercase().as_str() {
                    "SELECT" => return Ok(()),
                    verb @ ("INSERT" | "UPDATE" | "DELETE" | "MERGE") => {
                        return Err(RejectReason::NotAQuery { found: verb.into() });
                    }
                    _ => {}
                },
                _ => {}
            }
        }
        return Err(RejectReason::NotAQuery {
            found: "WITH".into(),
        });
    }

    let found = first
        .word_upper()
        .unwrap_or_else(|| "non-keyword token".into());
    Err(RejectReason::NotAQuery { found })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> StatementValidator {
        StatementValidator::new(PolicyConfig::default())
    }

    fn reject_code(sql: &str) -> String {
        validator()
            .validate(sql)
            .reason()
            .expect("expected rejection")
            .code()
    }

    #[test]
    fn test_accepts_plain_select() {
        let verdict = validator().validate("SELECT * FROM orders");
        assert!(verdict.is_accepted());
    }

    #[test]
    fn test_accepts_join_and_group_by() {
        let verdict = validator().validate(
            "SELECT category, SUM(revenue) FROM orders o \
             JOIN products p ON o.product_id=p.product_id GROUP BY category",
        );
        assert!(verdict.is_accepted());
    }

    #[test]
    fn test_accepts_cte() {
        let verdict = validator()
            .validate("WITH top AS (SELECT product_id FROM orders LIMIT 5) SELECT * FROM top");
        assert!(verdict.is_accepted());
    }

    #[test]
    fn test_accepts_recursive_cte() {
        let verdict = validator().validate(
            "WITH RECURSIVE seq AS (SELECT 1 AS n UNION ALL SELECT n + 1 FROM seq WHERE n < 5) \
             SELECT n FROM seq",
        );
        assert!(verdict.is_accepted());
    }

    #[test]
    fn test_effective_text_strips_terminator() {
        let statement = validator()
            .validate("  SELECT 1;  ")
            .into_accepted()
            .unwrap();
        assert_eq!(statement.text(), "SELECT 1");
    }

    #[test]
    fn test_rejects_empty_and_comment_only() {
        assert_eq!(reject_code(""), "syntax_error");
        assert_eq!(reject_code("   "), "syntax_error");
        assert_eq!(reject_code("-- nothing here"), "syntax_error");
    }

    #[test]
    fn test_rejects_unterminated_string() {
        assert_eq!(reject_code("SELECT 'oops"), "syntax_error");
    }

    #[test]
    fn test_rejects_stacked_statements() {
        // The single-statement check fires before the denylist.
        assert_eq!(
            reject_code("SELECT * FROM orders; DROP TABLE orders;"),
            "multiple_statements"
        );
    }

    #[test]
    fn test_trailing_terminator_is_not_stacking() {
        assert!(validator().validate("SELECT 1;").is_accepted());
    }

    #[test]
    fn test_rejects_update_as_not_a_query() {
        assert_eq!(reject_code("UPDATE products SET price = 0"), "not_a_query");
    }

    #[test]
    fn test_rejects_insert_delete_ddl_roots() {
        assert_eq!(
            reject_code("INSERT INTO orders VALUES (1)"),
            "not_a_query"
        );
        assert_eq!(reject_code("DELETE FROM orders"), "not_a_query");
        assert_eq!(reject_code("DROP TABLE orders"), "not_a_query");
        assert_eq!(reject_code("TRUNCATE orders"), "not_a_query");
        assert_eq!(reject_code("GRANT ALL ON orders TO joe"), "not_a_query");
    }

    #[test]
    fn test_rejects_cte_wrapping_mutation() {
        assert_eq!(
            reject_code("WITH doomed AS (SELECT 1) DELETE FROM orders"),
            "not_a_query"
        );
    }

    #[test]
    fn test_rejects_forbidden_keyword_in_body() {
        assert_eq!(
            reject_code("SELECT * FROM orders WHERE id IN (SELECT 1) AND EXECUTE"),
            "forbidden_keyword:EXECUTE"
        );
    }

    #[test]
    fn test_denylist_is_whole_token_only() {
        let verdict = validator().validate("SELECT dropdown_count FROM orders");
        assert!(verdict.is_accepted());

        let verdict = validator().validate("SELECT updated_at, created_at FROM orders");
        assert!(verdict.is_accepted());
    }

    #[test]
    fn test_keyword_in_string_or_comment_is_ignored() {
        let verdict =
            validator().validate("SELECT 'DROP TABLE orders' AS scary FROM orders -- DELETE");
        assert!(verdict.is_accepted());
    }

    #[test]
    fn test_semicolon_inside_string_is_not_stacking() {
        let verdict = validator().validate("SELECT 'a; b' FROM orders");
        assert!(verdict.is_accepted());
    }

    #[test]
    fn test_table_allowlist_off_by_default() {
        let verdict = validator().validate("SELECT * FROM secrets");
        assert!(verdict.is_accepted());
    }

    #[test]
    fn test_table_allowlist_enforced_when_enabled() {
        let policy = PolicyConfig::builder()
            .enforce_table_allowlist(true)
            .build()
            .unwrap();
        let validator = StatementValidator::new(policy);

        assert!(validator.validate("SELECT * FROM orders").is_accepted());
        assert_eq!(
            validator
                .validate("SELECT * FROM secrets")
                .reason()
                .unwrap()
                .code(),
            "table_not_allowed:secrets"
        );
    }

    #[test]
    fn test_reason_codes_and_detail() {
        let reason = RejectReason::ForbiddenKeyword {
            keyword: "DROP".into(),
        };
        assert_eq!(reason.code(), "forbidden_keyword:DROP");
        assert_eq!(reason.to_string(), "Forbidden keyword: DROP");
    }
}
