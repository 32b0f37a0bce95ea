use serde_json::json;
use sqlite_loadpool::events::EventSink;
use sqlite_loadpool::prelude::*;
use tempfile::{TempDir, tempdir};

const SCHEMA: &str = "
CREATE TABLE users (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    age INTEGER,
    updated_at TEXT
);
";

async fn pool_with_users() -> Result<(TempDir, Pool), SqlPoolError> {
    let dir = tempdir().expect("tempdir");
    let schema = dir.path().join("schema.sql");
    std::fs::write(&schema, SCHEMA).expect("write schema");
    let pool = Pool::builder(dir.path().join("users.db").to_string_lossy())
        .pool_size(3)
        .schema_file(schema)
        .events(EventSink::silent())
        .build()
        .await?;
    Ok((dir, pool))
}

fn names(res: &QueryResult) -> Vec<String> {
    res.rows
        .iter()
        .filter_map(|row| row.get("name").and_then(SqlValue::as_text))
        .map(str::to_owned)
        .collect()
}

#[tokio::test]
async fn insert_select_update_delete() -> Result<(), SqlPoolError> {
    let (_dir, pool) = pool_with_users().await?;

    let res = pool
        .insert(&Insert::table("users").rows([
            Record::new().set("name", "alice").set("age", 31),
            Record::new().set("name", "o'brien").set("age", 17),
            Record::new().set("name", "carol").set("age", SqlValue::Null),
        ]))
        .await?;
    assert_eq!(res.rows_changed, 3);
    assert_eq!(res.inserted_id, Some(3));

    let adults = Select::table("users")
        .fields(["id", "name"])
        .filter(FilterNode::compare("age", ">=", 18)?)
        .order(OrderBy::new().asc("name"));
    assert_eq!(names(&pool.select(&adults).await?), vec!["alice"]);

    let by_name = Select::table("users")
        .filter(FilterNode::from_json(&json!({"name": "o'brien"}))?);
    let res = pool.select(&by_name).await?;
    assert_eq!(res.first_value("age"), Some(&SqlValue::Int(17)));

    let res = pool
        .update(
            &Update::table("users")
                .set(
                    Record::new()
                        .set("age", 18)
                        .set("updated_at", SqlValue::raw("CURRENT_TIMESTAMP")),
                )
                .filter(FilterNode::eq("name", "o'brien")),
        )
        .await?;
    assert_eq!(res.rows_changed, 1);
    assert_eq!(res.inserted_id, None);
    assert_eq!(
        names(&pool.select(&adults).await?),
        vec!["alice", "o'brien"]
    );

    let missing_age = FilterNode::compare("age", "IS", SqlValue::Null)?;
    let res = pool
        .delete(&Delete::table("users").filter(missing_age))
        .await?;
    assert_eq!(res.rows_changed, 1);

    let everyone = Select::table("users").order(OrderBy::parse(["id[DESC]"])?);
    assert_eq!(names(&pool.select(&everyone).await?), vec!["o'brien", "alice"]);
    Ok(())
}

#[tokio::test]
async fn upsert_overwrites_conflicting_rows() -> Result<(), SqlPoolError> {
    let (_dir, pool) = pool_with_users().await?;
    pool.insert(&Insert::table("users").row(Record::new().set("id", 7).set("name", "dave")))
        .await?;

    let upsert = Insert::table("users")
        .row(Record::from_json(&json!({"id": 7, "name": "david", "age": 40}))?)
        .on_conflict(["id"]);
    let res = pool.execute(&upsert).await?;
    assert_eq!(res.rows_changed, 1);

    let res = pool
        .select(&Select::table("users").filter(FilterNode::eq("id", 7)))
        .await?;
    assert_eq!(res.rows.len(), 1);
    assert_eq!(names(&res), vec!["david"]);
    assert_eq!(res.first_value("age"), Some(&SqlValue::Int(40)));
    Ok(())
}

#[tokio::test]
async fn nested_filters_match_the_engine() -> Result<(), SqlPoolError> {
    let (_dir, pool) = pool_with_users().await?;
    pool.insert(&Insert::table("users").rows(
        [("ann", 20), ("bob", 15), ("cat", 70), ("dan", 40)]
            .into_iter()
            .map(|(name, age)| Record::new().set("name", name).set("age", age)),
    ))
    .await?;

    let filter = FilterNode::from_json(&json!({
        "OR": [
            { "age[<]": 18 },
            { "age[>]": 60, "name[LIKE]": "c%" },
        ]
    }))?;
    let select = Select::table("users")
        .fields("name")
        .filter(filter)
        .order(OrderBy::new().asc("name"));
    assert_eq!(names(&pool.select(&select).await?), vec!["bob", "cat"]);

    let page = Select::table("users")
        .order(OrderBy::new().asc("age"))
        .limit((1_u64, 2_u64));
    assert_eq!(names(&pool.select(&page).await?), vec!["ann", "dan"]);
    Ok(())
}

#[tokio::test]
async fn render_errors_never_reach_the_engine() -> Result<(), SqlPoolError> {
    let (_dir, pool) = pool_with_users().await?;
    let bad = Update::table("users").set(Record::new().set("age", f64::INFINITY));
    let err = pool.update(&bad).await.unwrap_err();
    assert!(matches!(err, SqlPoolError::InvalidArgument(_)));

    let stats = pool.refresh_statistics().await?;
    assert_eq!(stats.in_flight, vec![0, 0, 0]);
    Ok(())
}

#[tokio::test]
async fn limited_update_and_delete_touch_only_the_cap() -> Result<(), SqlPoolError> {
    let (_dir, pool) = pool_with_users().await?;
    pool.insert(&Insert::table("users").rows(
        ["ann", "bob", "cat", "dan", "eve"]
            .into_iter()
            .map(|name| Record::new().set("name", name).set("age", 30)),
    ))
    .await?;

    let res = pool
        .update(
            &Update::table("users")
                .set(Record::new().set("age", 31))
                .filter(FilterNode::eq("age", 30))
                .limit(2_u64),
        )
        .await?;
    assert_eq!(res.rows_changed, 2);
    let older = pool
        .select(&Select::table("users").filter(FilterNode::eq("age", 31)))
        .await?;
    assert_eq!(older.rows.len(), 2);

    let res = pool
        .delete(&Delete::table("users").limit(1_u64))
        .await?;
    assert_eq!(res.rows_changed, 1);
    let left = pool.select(&Select::table("users")).await?;
    assert_eq!(left.rows.len(), 4);

    let res = pool
        .delete(&Delete::table("users").filter(FilterNode::eq("age", 30)).limit(0_u64))
        .await?;
    assert_eq!(res.rows_changed, 0);
    Ok(())
}
