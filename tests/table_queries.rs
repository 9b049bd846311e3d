use recsql::{Converter, QueryResult, RecsqlError, Store, Table, TableOptions, Value};

const LAUREATES: &str = "\
Table[laureates]: Physics Nobel prize statistics.
=============  ==========  =========
name           age         year
=============  ==========  =========
A. Einstein    42          1921
P. Dirac       31          1933
R. P. Feynman  47          1965
=============  ==========  =========
";

fn laureates(store: &Store) -> Table {
    Table::from_text(store, LAUREATES, &Converter::default(), TableOptions::default())
        .expect("laureates table")
}

#[test]
fn typed_results() {
    let store = Store::open_in_memory().expect("store");
    let mut t = laureates(&store);
    assert_eq!(t.name(), "laureates");
    assert_eq!(t.columns(), ["name", "age", "year"]);
    let r = t
        .sql("SELECT name, age FROM __self__ WHERE year > 1930 ORDER BY year")
        .expect("query");
    let array = r.typed().expect("typed result");
    assert_eq!(array.names(), ["name", "age"]);
    assert_eq!(
        array.column("age"),
        Some(&recsql::Column::Integer(vec![31, 47]))
    );
    assert_eq!(r.get(1, 0), Some(Value::from("R. P. Feynman")));
}

#[test]
fn repeated_queries_come_from_the_cache() {
    let store = Store::open_in_memory().expect("store");
    let mut t = laureates(&store);
    let first = t.sql("SELECT * FROM __self__").expect("query");
    assert!(t.cache().contains("SELECT * FROM laureates"));
    let second = t.sql("SELECT * FROM __self__").expect("query");
    assert_eq!(first, second);
    assert_eq!(t.cache().len(), 1);
}

#[test]
fn delete_always_invalidates() {
    let store = Store::open_in_memory().expect("store");
    let mut t = laureates(&store);
    t.sql("SELECT * FROM __self__").expect("query");
    assert_eq!(t.cache().len(), 1);
    // no row matches, so only the keyword triggers invalidation
    t.sql("DELETE FROM __self__ WHERE age > 100").expect("delete");
    assert!(t.cache().is_empty());
    assert_eq!(t.row_count().expect("count"), 3);
}

#[test]
fn changed_rows_invalidate() {
    let store = Store::open_in_memory().expect("store");
    let mut t = laureates(&store);
    assert_eq!(t.row_count().expect("count"), 3);
    t.sql("INSERT INTO __self__ VALUES ('M. Curie', 36, 1903)")
        .expect("insert");
    assert!(t.cache().is_empty());
    assert_eq!(t.row_count().expect("count"), 4);
    t.sql("UPDATE __self__ SET age = age + 1").expect("update");
    assert!(t.cache().is_empty());
    assert_eq!(t.limits("age").expect("limits"), (Value::Integer(32), Value::Integer(48)));
}

#[test]
fn caches_are_per_handle() {
    let store = Store::open_in_memory().expect("store");
    let mut writer = laureates(&store);
    let mut reader = Table::open(&store, "laureates", TableOptions::default()).expect("open");
    assert_eq!(reader.row_count().expect("count"), 3);
    writer
        .sql("INSERT INTO __self__ VALUES ('M. Curie', 36, 1903)")
        .expect("insert");
    // the reader's cache is not told about the other handle's change
    assert_eq!(reader.row_count().expect("count"), 3);
    let fresh = reader
        .execute("SELECT COUNT() AS length FROM __self__", None, true, false)
        .expect("uncached count");
    assert_eq!(fresh.get(0, 0), Some(Value::Integer(4)));
}

#[test]
fn placeholder_queries_are_never_cached() {
    let store = Store::open_in_memory().expect("store");
    let mut t = laureates(&store);
    let sql = "SELECT name FROM __self__ WHERE age > ?";
    assert_eq!(t.sql_params(sql, &[Value::from(30)]).expect("query").len(), 3);
    assert_eq!(t.sql_params(sql, &[Value::from(45)]).expect("query").len(), 1);
    let named = "SELECT name FROM __self__ WHERE year < :year";
    assert_eq!(t.sql_params(named, &[Value::from(1930)]).expect("query").len(), 1);
    assert_eq!(t.sql_params(named, &[Value::from(1970)]).expect("query").len(), 3);
    assert!(t.cache().is_empty());
}

#[test]
fn empty_results_are_untyped_and_not_cached() {
    let store = Store::open_in_memory().expect("store");
    let mut t = laureates(&store);
    let r = t.sql("SELECT * FROM __self__ WHERE age > 100").expect("query");
    assert_eq!(r, QueryResult::Rows(Vec::new()));
    assert!(t.cache().is_empty());
}

#[test]
fn untyped_fallback() {
    let store = Store::open_in_memory().expect("store");
    let mut t = laureates(&store);
    // duplicate column names cannot form typed columns
    let r = t.sql("SELECT name, name FROM __self__ ORDER BY year").expect("query");
    assert!(!r.is_typed());
    assert_eq!(r.get(0, 1), Some(Value::from("A. Einstein")));
    let rows = t
        .execute("SELECT age FROM __self__ ORDER BY age", None, false, true)
        .expect("query");
    assert_eq!(
        rows.into_records(),
        vec![vec![Value::Integer(31)], vec![Value::Integer(42)], vec![Value::Integer(47)]]
    );
}

#[test]
fn select_helpers() {
    let store = Store::open_in_memory().expect("store");
    let mut t = laureates(&store);
    let r = t.select_where("age < 40").expect("condition");
    assert_eq!(r.get(0, 0), Some(Value::from("P. Dirac")));
    let r = t
        .select_where("select year from __self__ where name = 'A. Einstein'")
        .expect("statement");
    assert_eq!(r.get(0, 0), Some(Value::Integer(1921)));
    let r = t
        .select("name, year", &["ORDER BY age DESC", "LIMIT 1"])
        .expect("select");
    assert_eq!(r.records(), vec![vec![Value::from("R. P. Feynman"), Value::Integer(1965)]]);
    assert_eq!(t.recarray().expect("all").len(), 3);
}

#[test]
fn composite_values_round_trip() {
    let store = Store::open_in_memory().expect("store");
    let tags = Value::Sequence(vec![Value::from("red"), Value::from("green")]);
    let mut t = Table::create(
        &store,
        "tagged",
        &["id", "tags"],
        vec![
            vec![Value::from(1), tags.clone()],
            vec![Value::from(2), Value::from("blue")],
        ],
        TableOptions::default(),
    )
    .expect("table");
    let r = t.sql("SELECT tags FROM __self__ ORDER BY id").expect("query");
    assert_eq!(r.get(0, 0), Some(tags));
    assert_eq!(r.get(1, 0), Some(Value::from("blue")));
}

#[test]
fn scalars_next_to_composites_keep_their_type() {
    let store = Store::open_in_memory().expect("store");
    let pair = Value::Sequence(vec![Value::from("a"), Value::from("b")]);
    let mut t = Table::create(
        &store,
        "mixed",
        &["id", "payload"],
        vec![
            vec![Value::from(1), pair.clone()],
            vec![Value::from(2), Value::from("true")],
            vec![Value::from(3), Value::from("42")],
            vec![Value::from(4), Value::from("null")],
            vec![Value::from(5), Value::from(7)],
            vec![Value::from(6), Value::Null],
        ],
        TableOptions::default(),
    )
    .expect("table");
    let r = t
        .execute("SELECT payload FROM __self__ ORDER BY id", None, false, false)
        .expect("query");
    assert_eq!(r.get(0, 0), Some(pair));
    assert_eq!(r.get(1, 0), Some(Value::from("true")));
    assert_eq!(r.get(2, 0), Some(Value::from("42")));
    assert_eq!(r.get(3, 0), Some(Value::from("null")));
    assert_eq!(r.get(4, 0), Some(Value::Integer(7)));
    assert_eq!(r.get(5, 0), Some(Value::Null));
}

#[test]
fn opaque_column_aliases() {
    let store = Store::open_in_memory().expect("store");
    let mut t = laureates(&store);
    let r = t
        .sql(r#"SELECT json_array(age, year) AS "pair [Array]" FROM __self__ WHERE age = 42"#)
        .expect("query");
    assert_eq!(
        r.get(0, 0),
        Some(Value::Sequence(vec![Value::Integer(42), Value::Integer(1921)]))
    );
    let r = t
        .sql(r#"SELECT json_quote(name) AS "who [Object]" FROM __self__ WHERE age = 31"#)
        .expect("query");
    let array = r.typed().expect("typed");
    assert_eq!(array.names(), ["who"]);
    assert_eq!(r.get(0, 0), Some(Value::from("P. Dirac")));
}

#[test]
fn indexes() {
    let store = Store::open_in_memory().expect("store");
    let mut t = laureates(&store);
    t.sql_index("by_name", &["name"], true).expect("index");
    let err = t
        .sql("INSERT INTO __self__ VALUES ('P. Dirac', 0, 0)")
        .unwrap_err();
    assert!(matches!(err, RecsqlError::Store(_)));
    let err = t.sql_index::<&str>("nothing", &[], false).unwrap_err();
    assert!(matches!(err, RecsqlError::Validation(_)));
}

#[test]
fn sql_errors_propagate() {
    let store = Store::open_in_memory().expect("store");
    let mut t = laureates(&store);
    let err = t.sql("SELECT nope FROM __self__").unwrap_err();
    assert!(matches!(err, RecsqlError::Store(_)));
}

#[test]
fn reserved_and_malformed_definitions() {
    let store = Store::open_in_memory().expect("store");
    let record = vec![vec![Value::from(1)]];
    for name in ["recsql_master", "__tmp_merge_table", "__self__", ""] {
        let err = Table::create(&store, name, &["a"], record.clone(), TableOptions::default())
            .unwrap_err();
        assert!(matches!(err, RecsqlError::Validation(_)), "{}", name);
    }
    let bad_columns: [&[&str]; 4] = [&[], &["__self__"], &["a", "A"], &[" "]];
    for columns in bad_columns {
        let records = vec![vec![Value::Null; columns.len()]];
        let err = Table::create(&store, "t", columns, records, TableOptions::default())
            .unwrap_err();
        assert!(matches!(err, RecsqlError::Validation(_)), "{:?}", columns);
    }
    let err = Table::create(
        &store,
        "t",
        &["a", "b"],
        vec![vec![Value::from(1)]],
        TableOptions::default(),
    )
    .unwrap_err();
    assert!(matches!(err, RecsqlError::Validation(_)));
    assert!(!store.has_table("t").expect("has_table"));
    assert_eq!(store.connection_count().expect("count"), 0);
}

#[test]
fn binding_to_a_missing_table() {
    let store = Store::open_in_memory().expect("store");
    let _t = laureates(&store);
    match Table::open(&store, "nobody", TableOptions::default()) {
        Err(RecsqlError::Validation(message)) => {
            assert!(message.contains("nobody"));
            assert!(message.contains("laureates"));
        }
        other => panic!("unexpected {:?}", other.map(|t| t.name().to_owned())),
    }
}

#[test]
fn connection_counting_and_close() {
    let store = Store::open_in_memory().expect("store");
    let mut first = laureates(&store);
    assert_eq!(first.connection_count().expect("count"), 1);
    let mut second = Table::open(&store, "laureates", TableOptions::default()).expect("open");
    assert_eq!(second.connection_count().expect("count"), 2);
    second.close().expect("close");
    second.close().expect("second close is a no-op");
    assert_eq!(first.connection_count().expect("count"), 1);
    assert!(matches!(second.sql("SELECT 1"), Err(RecsqlError::Closed)));
    first.save().expect("save");
    first.close().expect("close");
    // the last handle on an in-memory store drops its table
    assert!(!store.has_table("laureates").expect("has_table"));
}
