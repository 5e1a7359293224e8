use super::*;

#[test]
fn test_blank_and_comment_segments_skipped() {
    let sql = "CREATE TABLE t(x int); -- comment\n;  \nINSERT INTO t VALUES(1);";
    let stmts = split_statements(sql);
    assert_eq!(stmts, vec!["CREATE TABLE t(x int)", "INSERT INTO t VALUES(1)"]);
}

#[test]
fn test_empty_input() {
    assert!(split_statements("").is_empty());
    assert!(split_statements(" ;\n ; \t").is_empty());
    assert!(split_statements("-- only a comment\n/* and a block */").is_empty());
}

#[test]
fn test_last_statement_without_semicolon() {
    assert_eq!(
        split_statements("SELECT 1; SELECT 2"),
        vec!["SELECT 1", "SELECT 2"]
    );
}

#[test]
fn test_semicolon_inside_string_literal() {
    let sql = "INSERT INTO memo (content) VALUES ('a; b'); SELECT 1;";
    assert_eq!(
        split_statements(sql),
        vec!["INSERT INTO memo (content) VALUES ('a; b')", "SELECT 1"]
    );
}

#[test]
fn test_escaped_quote_inside_literal() {
    let sql = "INSERT INTO t VALUES ('it''s; fine'); SELECT 2";
    assert_eq!(
        split_statements(sql),
        vec!["INSERT INTO t VALUES ('it''s; fine')", "SELECT 2"]
    );
}

#[test]
fn test_semicolon_inside_quoted_identifier() {
    let sql = "CREATE TABLE \"odd;name\" (x int);";
    assert_eq!(split_statements(sql), vec!["CREATE TABLE \"odd;name\" (x int)"]);
}

#[test]
fn test_semicolon_inside_comments() {
    let sql = "SELECT 1 -- trailing; not a split\n; /* also; not */ SELECT 2;";
    let stmts = split_statements(sql);
    assert_eq!(stmts.len(), 2);
    assert_eq!(stmts[0], "SELECT 1 -- trailing; not a split");
    assert_eq!(stmts[1], "/* also; not */ SELECT 2");
}

#[test]
fn test_leading_comment_kept_with_statement() {
    let stmts = split_statements("-- users\nCREATE TABLE u(id int);");
    assert_eq!(stmts, vec!["-- users\nCREATE TABLE u(id int)"]);
}

#[test]
fn test_non_ascii_content() {
    let stmts = split_statements("INSERT INTO memo (content) VALUES ('héllo · wörld');");
    assert_eq!(stmts, vec!["INSERT INTO memo (content) VALUES ('héllo · wörld')"]);
}
