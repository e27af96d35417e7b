use std::collections::BTreeMap;

use vectorlite::collection::Collection;
use vectorlite::config::{CollectionConfig, CollectionConfigBuilder};
use vectorlite::distance::DistanceMetric;
use vectorlite::metadata::MetadataValue;
use vectorlite::{CancellationToken, VectorLiteError};

fn config(dimension: usize) -> CollectionConfig {
    CollectionConfig::new(CollectionConfigBuilder { dimension: Some(dimension), distance: Some(DistanceMetric::L2), ..Default::default() })
}

fn empty_metadata() -> BTreeMap<String, MetadataValue> {
    BTreeMap::new()
}

#[test]
fn basic_insert_and_search() {
    let dir = tempfile::tempdir().unwrap();
    let col = Collection::open(dir.path(), config(4)).unwrap();
    let token = CancellationToken::new();

    for (i, id) in ["a", "b", "c", "d", "e"].iter().enumerate() {
        let v = (i + 1) as f32;
        col.insert(id, vec![v, 0.0, 0.0, 0.0], empty_metadata(), &token).unwrap();
    }

    let results = col.search(&[3.0, 0.0, 0.0, 0.0], 3).unwrap();
    let ids: Vec<&str> = results.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids[0], "c");
    assert!(ids[1..].iter().all(|id| *id == "b" || *id == "d"));
    assert_eq!(results.len(), 3);
}

#[test]
fn duplicate_id_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let col = Collection::open(dir.path(), config(4)).unwrap();
    let token = CancellationToken::new();

    col.insert("x", vec![1.0, 0.0, 0.0, 0.0], empty_metadata(), &token).unwrap();
    let err = col.insert("x", vec![2.0, 0.0, 0.0, 0.0], empty_metadata(), &token).unwrap_err();
    assert!(matches!(err, VectorLiteError::DuplicateId(_)));
    assert_eq!(col.count().unwrap(), 1);
}

#[test]
fn dimension_mismatch_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let col = Collection::open(dir.path(), config(4)).unwrap();
    let token = CancellationToken::new();

    let err = col.insert("a", vec![1.0, 2.0, 3.0], empty_metadata(), &token).unwrap_err();
    assert!(matches!(err, VectorLiteError::DimensionMismatch { expected: 4, got: 3 }));
    assert_eq!(col.count().unwrap(), 0);
}

#[test]
fn persistence_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let token = CancellationToken::new();
    let path = dir.path().to_path_buf();

    {
        let col = Collection::open(&path, config(64)).unwrap();
        let authors = ["Alice", "Bob", "Alice"];
        for (i, author) in authors.iter().enumerate() {
            let mut v = vec![0.0f32; 64];
            v[i] = 1.0;
            let metadata = BTreeMap::from([("author".to_string(), MetadataValue::String(author.to_string()))]);
            col.insert(&format!("doc{i}"), v, metadata, &token).unwrap();
        }
        col.save().unwrap();
        col.close().unwrap();
    }

    let col = Collection::open(&path, config(64)).unwrap();
    assert_eq!(col.count().unwrap(), 3);
    let doc2 = col.get("doc1").unwrap().unwrap();
    assert_eq!(doc2.metadata["author"], MetadataValue::String("Bob".to_string()));

    let results = col.search(&vec![0.0f32; 64], 10).unwrap();
    assert_eq!(results.len(), 3);
}

#[test]
fn filtered_search_adaptive_expansion() {
    let dir = tempfile::tempdir().unwrap();
    let col = Collection::open(dir.path(), config(8)).unwrap();
    let token = CancellationToken::new();

    for i in 0..100 {
        let mut v = vec![0.0f32; 8];
        v[i % 8] = (i + 1) as f32;
        let category = if i % 2 == 0 { "A" } else { "B" };
        let metadata = BTreeMap::from([("category".to_string(), MetadataValue::String(category.to_string()))]);
        col.insert(&format!("doc{i}"), v, metadata, &token).unwrap();
    }

    let predicate: vectorlite::FilterPredicate =
        Box::new(|m| matches!(m.get("category"), Some(MetadataValue::String(s)) if s == "A"));
    let results = col.search_with_filter(&vec![1.0f32; 8], 10, &predicate, &token).unwrap();

    assert_eq!(results.len(), 10);
    for doc in &results {
        assert_eq!(doc.metadata["category"], MetadataValue::String("A".to_string()));
    }
}

#[test]
fn update_replaces_vector_and_orphans_old_node() {
    let dir = tempfile::tempdir().unwrap();
    let col = Collection::open(dir.path(), config(4)).unwrap();
    let token = CancellationToken::new();

    col.insert("a", vec![1.0, 0.0, 0.0, 0.0], empty_metadata(), &token).unwrap();
    col.update("a", vec![9.0, 0.0, 0.0, 0.0], empty_metadata(), &token).unwrap();

    let doc = col.get("a").unwrap().unwrap();
    assert_eq!(doc.vector, vec![9.0, 0.0, 0.0, 0.0]);
    assert_eq!(col.count().unwrap(), 1);

    let stats = col.stats().unwrap();
    assert_eq!(stats.node_count, 2);
    assert_eq!(stats.orphan_count, 1);
}

#[test]
fn upsert_inserts_then_updates() {
    let dir = tempfile::tempdir().unwrap();
    let col = Collection::open(dir.path(), config(4)).unwrap();
    let token = CancellationToken::new();

    col.upsert("a", vec![1.0, 0.0, 0.0, 0.0], empty_metadata(), &token).unwrap();
    assert_eq!(col.count().unwrap(), 1);
    col.upsert("a", vec![2.0, 0.0, 0.0, 0.0], empty_metadata(), &token).unwrap();
    assert_eq!(col.count().unwrap(), 1);
    assert_eq!(col.get("a").unwrap().unwrap().vector, vec![2.0, 0.0, 0.0, 0.0]);
}

#[test]
fn delete_removes_document_and_orphans_node() {
    let dir = tempfile::tempdir().unwrap();
    let col = Collection::open(dir.path(), config(4)).unwrap();
    let token = CancellationToken::new();

    col.insert("a", vec![1.0, 0.0, 0.0, 0.0], empty_metadata(), &token).unwrap();
    assert!(col.delete("a", &token).unwrap());
    assert_eq!(col.get("a").unwrap(), None);
    assert_eq!(col.count().unwrap(), 0);
    assert!(!col.delete("a", &token).unwrap());
}

#[test]
fn insert_batch_validates_before_inserting_any() {
    let dir = tempfile::tempdir().unwrap();
    let col = Collection::open(dir.path(), config(4)).unwrap();
    let token = CancellationToken::new();

    let docs = vec![
        ("a".to_string(), vec![1.0, 0.0, 0.0, 0.0], empty_metadata()),
        ("b".to_string(), vec![1.0, 0.0, 0.0], empty_metadata()),
    ];
    let err = col.insert_batch(docs, &token).unwrap_err();
    assert!(matches!(err, VectorLiteError::DimensionMismatch { .. }));
    assert_eq!(col.count().unwrap(), 0);
}

#[test]
fn get_batch_skips_missing_ids() {
    let dir = tempfile::tempdir().unwrap();
    let col = Collection::open(dir.path(), config(4)).unwrap();
    let token = CancellationToken::new();

    col.insert("a", vec![1.0, 0.0, 0.0, 0.0], empty_metadata(), &token).unwrap();
    let results = col.get_batch(&["a".to_string(), "missing".to_string()]).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, "a");
}

#[test]
fn idempotent_close() {
    let dir = tempfile::tempdir().unwrap();
    let col = Collection::open(dir.path(), config(4)).unwrap();
    col.close().unwrap();
    col.close().unwrap();
}

#[test]
fn operations_after_close_fail() {
    let dir = tempfile::tempdir().unwrap();
    let col = Collection::open(dir.path(), config(4)).unwrap();
    col.close().unwrap();
    let err = col.count().unwrap_err();
    assert!(matches!(err, VectorLiteError::CollectionClosed));
}

#[test]
fn cancelled_token_aborts_insert() {
    let dir = tempfile::tempdir().unwrap();
    let col = Collection::open(dir.path(), config(4)).unwrap();
    let token = CancellationToken::new();
    token.cancel();
    let err = col.insert("a", vec![1.0, 0.0, 0.0, 0.0], empty_metadata(), &token).unwrap_err();
    assert!(matches!(err, VectorLiteError::Cancelled));
}
