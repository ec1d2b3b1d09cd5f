//! Integration tests against an in-memory SQLite database.

use db_session::{params, BindMode, Error, Param, Session};

const SEQUENCE_VIEW: &str = "CREATE VIEW seq AS \
    WITH RECURSIVE s(n) AS (SELECT 0 UNION ALL SELECT n + 1 FROM s WHERE n < 99) \
    SELECT n FROM s";

/// Session over a fresh in-memory database with a 100-row sequence view.
fn sequence_session() -> Session {
    let mut session = Session::connect("sqlite::memory:", "", "", "main").unwrap();
    session.execute(SEQUENCE_VIEW).unwrap();
    session
}

fn column_values(session: &mut Session, sql: &str, params: &[Param]) -> Vec<String> {
    let mut cursor = if params.is_empty() {
        session.query(sql)
    } else {
        session.query_with(sql, params)
    }
    .unwrap()
    .expect("session should be connected");

    let mut values = Vec::new();
    while cursor.next().unwrap() {
        values.push(cursor.get_string(1).unwrap());
    }
    values
}

#[test]
fn test_sequence_first_page() {
    let mut session = sequence_session();

    let values = column_values(&mut session, "SELECT * FROM seq LIMIT 0, 10", &[]);
    let expected: Vec<String> = (0..10).map(|n| n.to_string()).collect();
    assert_eq!(values, expected);
}

#[test]
fn test_sequence_parameterized_page() {
    let mut session = sequence_session();

    let values = column_values(&mut session, "SELECT * FROM seq LIMIT ?, ?", &params![10, 10]);
    let expected: Vec<String> = (10..20).map(|n| n.to_string()).collect();
    assert_eq!(values, expected);
}

#[test]
fn test_repeated_query_is_idempotent() {
    let mut session = sequence_session();
    let sql = "SELECT n FROM seq WHERE n >= ? LIMIT ?";

    let first = column_values(&mut session, sql, &params![42, 5]);
    let second = column_values(&mut session, sql, &params![42, 5]);
    assert_eq!(first, second);
    assert_eq!(first, vec!["42", "43", "44", "45", "46"]);
}

#[test]
fn test_positional_binding_of_every_type() {
    let mut session = Session::connect("sqlite::memory:", "", "", "main").unwrap();
    let owned = String::from("owned");

    let mut cursor = session
        .query_with(
            "SELECT ?, ?, ?, ?, ?, ?",
            &params![7, 2.5, 0.25f32, true, "raw", owned],
        )
        .unwrap()
        .unwrap();

    assert!(cursor.next().unwrap());
    let row = cursor.current_row().unwrap();
    assert_eq!(
        row.values(),
        &[
            Some("7".to_string()),
            Some("2.5".to_string()),
            Some("0.25".to_string()),
            Some("1".to_string()),
            Some("raw".to_string()),
            Some("owned".to_string()),
        ]
    );
    assert!(!cursor.next().unwrap());
}

#[test]
fn test_float_widening_matches_double_column() {
    let mut session = Session::connect("sqlite::memory:", "", "", "main").unwrap();
    session
        .execute("CREATE TABLE readings (id INTEGER, value REAL)")
        .unwrap();
    session
        .execute_with("INSERT INTO readings VALUES (?, ?)", &params![1, 0.5])
        .unwrap();
    session
        .execute_with("INSERT INTO readings VALUES (?, ?)", &params![2, 0.75])
        .unwrap();

    let ids = column_values(
        &mut session,
        "SELECT id FROM readings WHERE value = ?",
        &params![0.75f32],
    );
    assert_eq!(ids, vec!["2"]);
}

#[test]
fn test_execute_reports_affected_rows() {
    let mut session = Session::connect("sqlite::memory:", "", "", "main").unwrap();
    session
        .execute("CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT)")
        .unwrap();

    for (id, name) in [(1, "a"), (2, "b"), (3, "c")] {
        let affected = session
            .execute_with("INSERT INTO items (id, name) VALUES (?, ?)", &params![id, name])
            .unwrap();
        assert_eq!(affected, Some(1));
    }

    let affected = session
        .execute_with("DELETE FROM items WHERE id > ?", &params![1])
        .unwrap();
    assert_eq!(affected, Some(2));
}

#[test]
fn test_null_and_column_names() {
    let mut session = Session::connect("sqlite::memory:", "", "", "main").unwrap();
    session
        .execute("CREATE TABLE people (id INTEGER, nickname TEXT)")
        .unwrap();
    session
        .execute("INSERT INTO people VALUES (1, NULL)")
        .unwrap();

    let mut cursor = session
        .query("SELECT id, nickname FROM people")
        .unwrap()
        .unwrap();
    assert_eq!(cursor.columns(), &["id".to_string(), "nickname".to_string()]);

    assert!(cursor.next().unwrap());
    assert!(cursor.is_null(2).unwrap());
    assert_eq!(cursor.get_string(2).unwrap(), "");
    assert_eq!(cursor.current_row().unwrap().get_by_name("ID"), Some("1"));
}

#[test]
fn test_empty_result() {
    let mut session = sequence_session();

    let mut cursor = session
        .query_with("SELECT n FROM seq WHERE n > ?", &params![1000])
        .unwrap()
        .unwrap();
    assert!(!cursor.next().unwrap());
    assert_eq!(cursor.rowcount(), 0);
    assert!(matches!(cursor.get_string(1), Err(Error::NoCurrentRow)));
}

#[test]
fn test_fetch_all_and_into_rows() {
    let mut session = sequence_session();

    let rows = session
        .query("SELECT n FROM seq LIMIT 3")
        .unwrap()
        .unwrap()
        .fetch_all()
        .unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[2].get(0), Some("2"));

    let cursor = session
        .query_with("SELECT n FROM seq LIMIT ?, ?", &params![95, 10])
        .unwrap()
        .unwrap();
    let tail: Vec<String> = cursor
        .into_rows()
        .map(|row| row.unwrap().get(0).unwrap().to_string())
        .collect();
    assert_eq!(tail, vec!["95", "96", "97", "98", "99"]);
}

#[test]
fn test_strict_mode_rejects_unsupported_parameter() {
    let mut session = sequence_session();

    let result = session.query_with("SELECT * FROM seq LIMIT ?, ?", &[Param::of(0), Param::of(10i64)]);
    assert!(matches!(
        result,
        Err(Error::UnsupportedParameter { position: 2, .. })
    ));
}

#[test]
fn test_open_session_binds_around_unsupported_value() {
    let mut session = Session::open("sqlite::memory:", "", "", "main");
    assert!(session.is_connected());
    assert_eq!(session.bind_mode(), BindMode::Lenient);

    assert!(matches!(
        session.query_with("SELECT ?, ?, ?", &[Param::of(1), Param::of(2i64), Param::of(3)]),
        Err(Error::UnboundParameter { position: 2 })
    ));

    let values = column_values(&mut session, "SELECT ? + ?", &params![1, 3]);
    assert_eq!(values, vec!["4"]);
}

#[test]
fn test_lenient_mode_leaves_placeholder_unbound() {
    let mut session = sequence_session().with_bind_mode(BindMode::Lenient);

    let result = session.query_with("SELECT * FROM seq LIMIT ?, ?", &[Param::of(10i64), Param::of(10)]);
    assert!(matches!(result, Err(Error::UnboundParameter { position: 1 })));
    drop(result);

    // The session stays usable.
    let values = column_values(&mut session, "SELECT * FROM seq LIMIT ?, ?", &params![0, 2]);
    assert_eq!(values, vec!["0", "1"]);
}

#[test]
fn test_too_many_parameters() {
    let mut session = Session::connect("sqlite::memory:", "", "", "main").unwrap();

    let result = session.query_with("SELECT ?", &params![1, 2]);
    assert!(matches!(
        result,
        Err(Error::ParameterIndexOutOfBounds { index: 2, count: 1 })
    ));
}

#[test]
fn test_prepare_failure_propagates() {
    let mut session = Session::connect("sqlite::memory:", "", "", "main").unwrap();

    assert!(matches!(
        session.query_with("SELECT * FROM no_such_table WHERE id = ?", &params![1]),
        Err(Error::Driver(_))
    ));
    assert!(matches!(
        session.query("SELECT * FROM no_such_table"),
        Err(Error::Driver(_))
    ));
}

#[test]
fn test_unknown_schema() {
    let result = Session::connect("sqlite::memory:", "", "", "warehouse");
    assert!(matches!(result, Err(Error::UnknownSchema { .. })));

    let mut session = Session::open("sqlite::memory:", "", "", "warehouse");
    assert!(!session.is_connected());
    assert!(session.query("SELECT 1").unwrap().is_none());
}

#[test]
fn test_ping_and_close() {
    let mut session = Session::connect("sqlite::memory:", "", "", "").unwrap();
    assert!(session.ping());
    session.close().unwrap();
}
