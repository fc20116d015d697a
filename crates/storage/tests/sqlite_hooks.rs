#![forbid(unsafe_code)]

use nested_storage::{
    NestedError, NestedSet, Node, NodeId, SqliteTreeStore, StoreError, TreeConfig, TreeRepository,
};
use rusqlite::{Connection, params};

fn insert_raw(store: &SqliteTreeStore, name: &str, parent: Option<NodeId>) -> NodeId {
    store
        .connection()
        .execute(
            "INSERT INTO nodes(name, parent_id) VALUES (?1, ?2)",
            params![name, parent.map(NodeId::get)],
        )
        .expect("insert row");
    NodeId::try_new(store.connection().last_insert_rowid()).expect("row id")
}

fn set_parent_raw(store: &SqliteTreeStore, id: NodeId, parent: Option<NodeId>) {
    store
        .connection()
        .execute(
            "UPDATE nodes SET parent_id = ?2 WHERE id = ?1",
            params![id.get(), parent.map(NodeId::get)],
        )
        .expect("update parent");
}

fn bounds(store: &mut SqliteTreeStore, id: NodeId) -> (i64, i64, i64) {
    let tx = store.begin_read().expect("read tx");
    let row = tx.row(id).expect("select").expect("row exists");
    (row.node.left(), row.node.right(), row.node.level())
}

#[test]
fn host_driven_hooks_keep_the_table_numbered() {
    let store = SqliteTreeStore::open_in_memory(TreeConfig::default()).expect("open store");
    let mut tree = NestedSet::new(store);

    let root = insert_raw(tree.unit(), "root", None);
    tree.on_create(root, None).expect("place root");
    let left = insert_raw(tree.unit(), "left", Some(root));
    tree.on_create(left, Some(root)).expect("place left");
    let right = insert_raw(tree.unit(), "right", Some(root));
    tree.on_create(right, Some(root)).expect("place right");
    let leaf = insert_raw(tree.unit(), "leaf", Some(left));
    tree.on_create(leaf, Some(left)).expect("place leaf");

    assert_eq!(bounds(tree.unit_mut(), root), (1, 8, 0));
    assert_eq!(bounds(tree.unit_mut(), left), (2, 5, 1));
    assert_eq!(bounds(tree.unit_mut(), leaf), (3, 4, 2));
    assert_eq!(bounds(tree.unit_mut(), right), (6, 7, 1));

    set_parent_raw(tree.unit(), left, Some(right));
    tree.on_update(left, Some(root), Some(right))
        .expect("move left under right");
    assert_eq!(bounds(tree.unit_mut(), right), (2, 7, 1));
    assert_eq!(bounds(tree.unit_mut(), left), (3, 6, 2));
    assert_eq!(bounds(tree.unit_mut(), leaf), (4, 5, 3));

    let mut repo = TreeRepository::from_store(tree.into_inner());
    repo.validate().expect("tree stays valid");
}

#[test]
fn sibling_promotions_before_the_parent_column_is_written_stay_disjoint() {
    let store = SqliteTreeStore::open_in_memory(TreeConfig::default()).expect("open store");
    let mut tree = NestedSet::new(store);

    let a = insert_raw(tree.unit(), "a", None);
    tree.on_create(a, None).expect("place a");
    let b = insert_raw(tree.unit(), "b", Some(a));
    tree.on_create(b, Some(a)).expect("place b");
    let c = insert_raw(tree.unit(), "c", Some(a));
    tree.on_create(c, Some(a)).expect("place c");

    tree.on_reparent(b, Some(a), None).expect("promote b");
    tree.on_reparent(c, Some(a), None).expect("promote c");
    assert_eq!(bounds(tree.unit_mut(), a), (1, 2, 0));
    assert_eq!(bounds(tree.unit_mut(), b), (3, 4, 0));
    assert_eq!(bounds(tree.unit_mut(), c), (5, 6, 0));

    set_parent_raw(tree.unit(), b, None);
    set_parent_raw(tree.unit(), c, None);
    let mut repo = TreeRepository::from_store(tree.into_inner());
    repo.validate().expect("tree stays valid");
}

#[test]
fn delete_hook_uses_carried_bounds_after_the_host_removed_the_row() {
    let store = SqliteTreeStore::open_in_memory(TreeConfig::default()).expect("open store");
    let mut tree = NestedSet::new(store);

    let root = insert_raw(tree.unit(), "root", None);
    tree.on_create(root, None).expect("place root");
    let branch = insert_raw(tree.unit(), "branch", Some(root));
    tree.on_create(branch, Some(root)).expect("place branch");
    let leaf = insert_raw(tree.unit(), "leaf", Some(branch));
    tree.on_create(leaf, Some(branch)).expect("place leaf");
    let sibling = insert_raw(tree.unit(), "sibling", Some(root));
    tree.on_create(sibling, Some(root)).expect("place sibling");

    let doomed: Node = {
        let tx = tree.unit_mut().begin_read().expect("read tx");
        tx.row(branch).expect("select").expect("branch").node
    };
    tree.unit()
        .connection()
        .execute("DELETE FROM nodes WHERE id = ?1", params![branch.get()])
        .expect("host delete");

    let removed = tree.on_delete(&doomed).expect("delete hook");
    assert_eq!(removed, Some(1));
    assert_eq!(bounds(tree.unit_mut(), root), (1, 4, 0));
    assert_eq!(bounds(tree.unit_mut(), sibling), (2, 3, 1));
}

#[test]
fn rows_without_bounds_stay_invisible_until_placed() {
    let store = SqliteTreeStore::open_in_memory(TreeConfig::default()).expect("open store");
    let mut tree = NestedSet::new(store);

    let root = insert_raw(tree.unit(), "root", None);
    tree.on_create(root, None).expect("place root");
    insert_raw(tree.unit(), "pending", Some(root));

    let mut repo = TreeRepository::from_store(tree.into_inner());
    let names: Vec<String> = repo
        .list()
        .expect("list")
        .into_iter()
        .map(|row| row.name)
        .collect();
    assert_eq!(names, vec!["root"]);
    repo.validate().expect("placed rows stay valid");
}

#[test]
fn custom_columns_may_use_reserved_words() {
    let config = TreeConfig::from_json_str(
        r#"{
            "table": "taxons",
            "parent_column": "parent",
            "left_column": "left",
            "right_column": "right",
            "level_column": "depth"
        }"#,
    )
    .expect("config");
    let mut repo = TreeRepository::open_in_memory(config).expect("open repository");

    let animals = repo.create("Animalia", None).expect("root").node.id;
    let chordates = repo
        .create("Chordata", Some(animals))
        .expect("child")
        .node
        .id;
    repo.create("Arthropoda", Some(animals)).expect("child");
    repo.reparent(chordates, None).expect("promote");
    repo.validate().expect("tree stays valid");

    let (left, right): (i64, i64) = repo
        .store()
        .connection()
        .query_row(
            r#"SELECT "left", "right" FROM taxons WHERE id = ?1"#,
            params![chordates.get()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .expect("raw select");
    assert_eq!((left, right), (5, 6));
}

#[test]
fn existing_table_without_tree_columns_is_rejected() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("legacy.sqlite");
    {
        let conn = Connection::open(&path).expect("open raw");
        conn.execute_batch(
            "CREATE TABLE nodes (id INTEGER PRIMARY KEY, name TEXT, parent_id INTEGER, lft INTEGER, rgt INTEGER);",
        )
        .expect("legacy schema");
    }

    let err = SqliteTreeStore::open(&path, TreeConfig::default())
        .expect_err("missing level column must be rejected");
    match err {
        StoreError::InvalidInput(message) => {
            assert_eq!(message, "existing table lacks a configured tree column");
        }
        other => panic!("expected InvalidInput, got {other:?}"),
    }
}

#[test]
fn locked_database_surfaces_a_retryable_conflict() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("tree.sqlite");
    let config = TreeConfig {
        busy_timeout_ms: 0,
        ..TreeConfig::default()
    };
    let mut repo = TreeRepository::open(&path, config).expect("open repository");
    repo.create("root", None).expect("root");

    let other = Connection::open(&path).expect("second connection");
    other.execute_batch("BEGIN IMMEDIATE;").expect("hold writer lock");

    let err = repo
        .create("blocked", None)
        .expect_err("writer lock is held elsewhere");
    assert!(err.is_retryable(), "unexpected error: {err}");
    assert!(matches!(
        err,
        StoreError::Tree(NestedError::ConcurrentModification { .. })
    ));

    other.execute_batch("ROLLBACK;").expect("release lock");
    repo.create("unblocked", None).expect("retry succeeds");
    repo.validate().expect("tree stays valid");
}
