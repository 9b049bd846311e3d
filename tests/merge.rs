use recsql::store::MERGE_TABLE;
use recsql::{RecArray, RecsqlError, Store, Table, TableOptions, Value};

fn people(store: &Store) -> Table {
    let mut t = Table::create(
        store,
        "people",
        &["name", "age"],
        vec![
            vec![Value::from("Ada"), Value::from(36)],
            vec![Value::from("Alan"), Value::from(41)],
            vec![Value::from("Grace"), Value::from(85)],
        ],
        TableOptions::default(),
    )
    .expect("people");
    t.sql_index("unique_name", &["name"], true).expect("index");
    t
}

#[test]
fn merging_new_rows() {
    let store = Store::open_in_memory().expect("store");
    let mut t = people(&store);
    let added = t
        .merge(
            vec![
                vec![Value::from("Edsger"), Value::from(72)],
                vec![Value::from("Barbara"), Value::from(70)],
            ],
            &["name", "age"],
        )
        .expect("merge");
    assert_eq!(added, 2);
    assert_eq!(t.row_count().expect("count"), 5);
    assert!(!store.has_table(MERGE_TABLE).expect("has_table"));
    assert_eq!(t.connection_count().expect("count"), 1);
}

#[test]
fn colliding_merge_leaves_the_table_intact() {
    let store = Store::open_in_memory().expect("store");
    let mut t = people(&store);
    let err = t
        .merge(
            vec![
                vec![Value::from("Edsger"), Value::from(72)],
                vec![Value::from("Ada"), Value::from(37)],
            ],
            &["name", "age"],
        )
        .unwrap_err();
    assert!(matches!(err, RecsqlError::Store(_)));
    assert_eq!(t.row_count().expect("count"), 3);
    assert_eq!(t.connection_count().expect("count"), 1);

    // a later merge starts from a fresh staging table
    let added = t
        .merge(vec![vec![Value::from("Edsger"), Value::from(72)]], &["name", "age"])
        .expect("merge");
    assert_eq!(added, 1);
}

#[test]
fn merge_checks_widths_before_touching_anything() {
    let store = Store::open_in_memory().expect("store");
    let mut t = people(&store);
    let err = t
        .merge(vec![vec![Value::from("Edsger")]], &["name", "age"])
        .unwrap_err();
    assert!(matches!(err, RecsqlError::Validation(_)));
    assert_eq!(t.row_count().expect("count"), 3);
}

#[test]
fn merging_record_arrays_and_tables() {
    let store = Store::open_in_memory().expect("store");
    let mut t = people(&store);
    let array = RecArray::from_records(
        vec![vec![Value::from("Donald"), Value::from(86)]],
        &["name", "age"],
    )
    .expect("recarray");
    assert_eq!(t.merge_recarray(&array).expect("merge"), 1);

    let _more = Table::create(
        &store,
        "more",
        &["name", "age"],
        vec![
            vec![Value::from("Niklaus"), Value::from(89)],
            vec![Value::from("John"), Value::from(84)],
        ],
        TableOptions::default(),
    )
    .expect("more");
    assert!(t.has_table("more").expect("has_table"));
    assert_eq!(t.merge_table("more").expect("merge table"), 2);
    assert_eq!(t.row_count().expect("count"), 6);
}

#[test]
fn merge_counts_rows_written_by_other_handles() {
    let store = Store::open_in_memory().expect("store");
    let mut writer = people(&store);
    let mut reader = Table::open(&store, "people", TableOptions::default()).expect("open");
    // leaves a cached count of 3 in the reader
    assert_eq!(reader.row_count().expect("count"), 3);

    writer
        .sql_params(
            "INSERT INTO __self__ (name, age) VALUES (?, ?)",
            &[Value::from("Edsger"), Value::from(72)],
        )
        .expect("insert");

    let added = reader
        .merge(vec![vec![Value::from("Barbara"), Value::from(70)]], &["name", "age"])
        .expect("merge");
    assert_eq!(added, 1);
    let fresh = reader
        .execute("SELECT COUNT() AS length FROM __self__", None, true, false)
        .expect("count");
    assert_eq!(fresh.get(0, 0), Some(Value::Integer(5)));
    assert!(!store.has_table(MERGE_TABLE).expect("has_table"));

    let _more = Table::create(
        &store,
        "more",
        &["name", "age"],
        vec![vec![Value::from("Niklaus"), Value::from(89)]],
        TableOptions::default(),
    )
    .expect("more");
    assert_eq!(reader.row_count().expect("count"), 5);
    writer
        .sql_params(
            "INSERT INTO __self__ (name, age) VALUES (?, ?)",
            &[Value::from("John"), Value::from(84)],
        )
        .expect("insert");
    assert_eq!(reader.merge_table("more").expect("merge table"), 1);
}
