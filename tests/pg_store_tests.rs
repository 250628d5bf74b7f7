//! Round-trips against a live PostgreSQL. Run with
//! `DATABASE_URL=postgres://... cargo test --test pg_store_tests -- --ignored`.

use docrest::{ensure_database_exists, new_id, DialInfo, DocumentStore, PgDocumentStore};
use serde_json::json;

async fn store() -> PgDocumentStore {
    let dial = DialInfo::from_env().expect("dial info from env");
    ensure_database_exists(&dial).await.expect("database exists");
    PgDocumentStore::connect(&dial).await.expect("connect")
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at a PostgreSQL server"]
async fn crud_round_trip() {
    let store = store().await;
    let collection = format!("docrest_test_{}", &new_id()[..8]);
    store.ensure_collection(&collection).await.unwrap();
    store.ping().await.unwrap();

    let mut s = store.session(&collection).await.unwrap();
    s.insert("a", &json!({"id": "a", "title": "Dune", "pages": 412})).await.unwrap();
    s.insert("b", &json!({"id": "b", "title": "Emma"})).await.unwrap();

    assert_eq!(s.find_id("a").await.unwrap()["title"], "Dune");
    let merged = s.update_id("a", &json!({"id": "a", "title": "Dune Messiah"})).await.unwrap();
    assert_eq!(merged, json!({"id": "a", "title": "Dune Messiah", "pages": 412}));

    let all = s.find_all().await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0]["id"], "a");

    s.remove_id("b").await.unwrap();
    assert!(s.remove_id("b").await.unwrap_err().is_not_found());
    assert!(s.find_id("b").await.unwrap_err().is_not_found());
    assert!(s.update_id("b", &json!({})).await.unwrap_err().is_not_found());

    drop(s);
    sqlx::query(&format!("DROP TABLE \"{}\"", collection))
        .execute(store.pool())
        .await
        .unwrap();
    store.close().await;
}
