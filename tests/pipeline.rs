//! End-to-end admission pipeline: validate, then bound, without a database.

use sqlgate::executor::bound_statement;
use sqlgate::{PolicyConfig, StatementValidator, ValidationVerdict};

fn validator() -> StatementValidator {
    StatementValidator::new(PolicyConfig::default())
}

#[test]
fn join_and_group_by_is_accepted_and_capped() {
    let candidate = "SELECT category, SUM(revenue) FROM orders o \
                     JOIN products p ON o.product_id=p.product_id GROUP BY category";

    let statement = validator()
        .validate(candidate)
        .into_accepted()
        .expect("join query must validate");

    let bounded = bound_statement(&statement, 1000);
    assert!(bounded.text().ends_with("LIMIT 1000"));
    assert_eq!(bounded.row_cap(), 1000);
}

#[test]
fn stacked_drop_never_reaches_bounding() {
    let verdict = validator().validate("SELECT * FROM orders; DROP TABLE orders;");

    match verdict {
        ValidationVerdict::Rejected(reason) => {
            assert_eq!(reason.code(), "multiple_statements");
        }
        ValidationVerdict::Accepted(_) => panic!("stacked statements must not be accepted"),
    }
}

#[test]
fn mutation_is_rejected_before_any_execution() {
    let verdict = validator().validate("UPDATE products SET price = 0");
    assert_eq!(verdict.reason().expect("must reject").code(), "not_a_query");
}

#[test]
fn own_limit_survives_the_whole_pipeline() {
    let statement = validator()
        .validate("SELECT * FROM orders LIMIT 50;")
        .into_accepted()
        .expect("limited query must validate");

    let bounded = bound_statement(&statement, 10_000);
    assert_eq!(bounded.text(), "SELECT * FROM orders LIMIT 50");
    assert_eq!(bounded.row_cap(), 50);
}

#[test]
fn injection_attempts_from_the_generator_are_contained() {
    let hostile = [
        "SELECT * FROM orders WHERE id = 1 OR 1=1; DELETE FROM orders",
        "DROP TABLE orders",
        "GRANT ALL PRIVILEGES ON orders TO public",
        "SELECT * FROM orders UNION ALL SELECT * FROM orders; TRUNCATE orders",
    ];

    for candidate in hostile {
        let verdict = validator().validate(candidate);
        assert!(
            !verdict.is_accepted(),
            "hostile candidate was accepted: {}",
            candidate
        );
    }
}

#[test]
fn benign_identifiers_with_scary_substrings_pass() {
    let statement = validator()
        .validate("SELECT dropdown_count, updated_at FROM orders")
        .into_accepted()
        .expect("benign identifiers must validate");

    assert_eq!(
        statement.text(),
        "SELECT dropdown_count, updated_at FROM orders"
    );
}

#[test]
fn distinct_policies_are_independent() {
    let strict = StatementValidator::new(
        PolicyConfig::builder()
            .enforce_table_allowlist(true)
            .build()
            .unwrap(),
    );
    let lax = validator();

    let candidate = "SELECT * FROM audit_log";
    assert!(!strict.validate(candidate).is_accepted());
    assert!(lax.validate(candidate).is_accepted());
}
