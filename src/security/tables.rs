//! Table-reference extraction for the advisory allowlist.
//!
//! Collects the names referenced in `FROM` and `JOIN` position anywhere in
//! the statement, excluding CTE names and derived tables. Generated SQL can
//! still fool this walk (an alias in table position, an exotic clause), which
//! is why the allowlist it feeds is an optional policy layer, disabled by
//! default, rather than a hard gate.

use crate::security::lexer::{Token, TokenKind};
use std::collections::HashSet;

/// Keywords that end a FROM list.
const CLAUSE_BOUNDARY: &[&str] = &[
    "WHERE", "GROUP", "ORDER", "HAVING", "LIMIT", "OFFSET", "UNION", "INTERSECT", "EXCEPT", "ON",
    "JOIN", "INNER", "LEFT", "RIGHT", "FULL", "CROSS", "NATURAL", "USING",
];

/// Extract referenced table names, lowercased, deduplicated.
pub fn extract_table_references(statement: &[Token]) -> Vec<String> {
    let ctes = collect_cte_names(statement);
    let mut seen = HashSet::new();
    let mut tables = Vec::new();

    let mut i = 0;
    while i < statement.len() {
        let token = &statement[i];
        if token.is_word("FROM") {
            i = collect_from_list(statement, i + 1, &mut |name| {
                push_unique(&mut tables, &mut seen, &ctes, name)
            });
            continue;
        }
        if token.is_word("JOIN") {
            if let Some((name, next)) = read_table_name(statement, i + 1) {
                push_unique(&mut tables, &mut seen, &ctes, name);
                i = next;
                continue;
            }
        }
        i += 1;
    }

    tables
}

fn push_unique(
    tables: &mut Vec<String>,
    seen: &mut HashSet<String>,
    ctes: &HashSet<String>,
    name: String,
) {
    if !ctes.contains(&name) && seen.insert(name.clone()) {
        tables.push(name);
    }
}

/// Names declared by a leading `WITH` clause; these are not table references.
fn collect_cte_names(statement: &[Token]) -> HashSet<String> {
    let mut names = HashSet::new();
    let mut iter = statement.iter().peekable();

    match iter.next() {
        Some(token) if token.is_word("WITH") => {}
        _ => return names,
    }

    // The clause is a comma-separated list of `name [ (cols) ] AS ( ... )`
    // at depth 0; it ends at the first depth-0 SELECT.
    let mut depth: i64 = 0;
    let mut expect_name = true;
    for token in iter {
        match &token.kind {
            TokenKind::Punct('(') => depth += 1,
            TokenKind::Punct(')') => depth -= 1,
            TokenKind::Punct(',') if depth == 0 => expect_name = true,
            TokenKind::Word(w) if depth == 0 => {
                let upper = w.to_uppercase();
                if upper == "SELECT" {
                    break;
                }
                if upper == "RECURSIVE" || upper == "AS" {
                    continue;
                }
                if expect_name {
                    names.insert(w.to_lowercase());
                    expect_name = false;
                }
            }
            TokenKind::QuotedIdent(q) if depth == 0 && expect_name => {
                names.insert(q.clone());
                expect_name = false;
            }
            _ => {}
        }
    }

    names
}

/// Walk a comma-separated FROM list starting at `start`, invoking `emit` for
/// each base-table name. Returns the index to resume scanning from.
fn collect_from_list(
    statement: &[Token],
    start: usize,
    emit: &mut impl FnMut(String),
) -> usize {
    let mut i = start;
    loop {
        match read_table_name(statement, i) {
            Some((name, next)) => {
                emit(name);
                i = next;
            }
            // Derived table or anything else we do not model; stop here and
            // let the outer scan pick up any later FROM/JOIN.
            None => return i,
        }

        // Skip an optional alias (`orders o` / `orders AS o`).
        while i < statement.len() {
            let token = &statement[i];
            if token.is_word("AS") {
                i += 1;
                continue;
            }
            if let Some(word) = token.word_upper() {
                if CLAUSE_BOUNDARY.contains(&word.as_str()) {
                    return i;
                }
                i += 1; // alias
                continue;
            }
            break;
        }

        match statement.get(i).map(|t| &t.kind) {
            Some(TokenKind::Punct(',')) => i += 1,
            _ => return i,
        }
    }
}

/// Read one table name at `index`: an identifier, optionally qualified
/// (`schema.table`, where the table part wins). Returns the name and the index
/// past it, or `None` for derived tables and non-identifiers.
fn read_table_name(statement: &[Token], index: usize) -> Option<(String, usize)> {
    let mut name = statement.get(index)?.identifier_text()?;
    let mut next = index + 1;

    while let Some(TokenKind::Punct('.')) = statement.get(next).map(|t| &t.kind) {
        let part = statement.get(next + 1)?.identifier_text()?;
        name = part;
        next += 2;
    }

    Some((name, next))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::lexer::tokenize;

    fn extract(sql: &str) -> Vec<String> {
        let tokens = tokenize(sql).unwrap();
        extract_table_references(&tokens)
    }

    #[test]
    fn test_simple_from() {
        assert_eq!(extract("SELECT * FROM orders"), vec!["orders"]);
    }

    #[test]
    fn test_join() {
        assert_eq!(
            extract(
                "SELECT * FROM orders o JOIN products p ON o.product_id = p.product_id"
            ),
            vec!["orders", "products"]
        );
    }

    #[test]
    fn test_comma_separated_from_list() {
        assert_eq!(
            extract("SELECT * FROM orders, customers WHERE 1=1"),
            vec!["orders", "customers"]
        );
    }

    #[test]
    fn test_qualified_name_uses_table_part() {
        assert_eq!(extract("SELECT * FROM public.orders"), vec!["orders"]);
    }

    #[test]
    fn test_subquery_tables_are_collected() {
        assert_eq!(
            extract("SELECT * FROM (SELECT * FROM orders) sub JOIN customers c ON 1=1"),
            vec!["orders", "customers"]
        );
    }

    #[test]
    fn test_cte_names_are_not_references() {
        assert_eq!(
            extract("WITH top AS (SELECT * FROM orders) SELECT * FROM top"),
            vec!["orders"]
        );
    }

    #[test]
    fn test_multiple_ctes() {
        assert_eq!(
            extract(
                "WITH a AS (SELECT * FROM orders), b AS (SELECT * FROM products) \
                 SELECT * FROM a JOIN b ON 1=1"
            ),
            vec!["orders", "products"]
        );
    }

    #[test]
    fn test_left_join_variants() {
        assert_eq!(
            extract("SELECT * FROM orders LEFT JOIN customers ON 1=1"),
            vec!["orders", "customers"]
        );
    }

    #[test]
    fn test_deduplication() {
        assert_eq!(
            extract("SELECT * FROM orders o1 JOIN orders o2 ON 1=1"),
            vec!["orders"]
        );
    }
}
