//! Query Execution Tests
//!
//! Tests for find invariants:
//! - Results equal the matcher applied to the full collection, whatever
//!   indices exist
//! - Sort, skip and limit apply after matching
//! - Custom text operators work at the top level and under $or
//! - Index failures fail the whole find

use std::sync::Arc;

use aeroquery::collection::{Collection, CollectionSpec, QueryError};
use aeroquery::config::QueryConfig;
use aeroquery::executor::{CriteriaMatcher, PredicateMatcher, ResultSorter};
use aeroquery::index::{IndexKey, MemoryPrimaryIndex, RangeIndex, TextIndex};
use aeroquery::planner::{FindOptions, Schema, SortSpec};
use aeroquery::text_index::{FnLoader, InvertedIndex, PostingMap, TextIndexOptions, TokenizerHooks};
use serde_json::{json, Value};

// =============================================================================
// Helper Functions
// =============================================================================

const COUNTRIES: &[&str] = &["Angola", "Africa", "Argentina", "Armenia", "Austria", "Australia", "Brazil"];

fn numbered(count: i64) -> Vec<Value> {
    (0..count)
        .map(|i| {
            let tags = if i % 2 == 0 { json!(["even"]) } else { json!(["odd", "prime?"]) };
            json!({
                "id": i,
                "age": (i * 13) % 50,
                "group": i % 4,
                "country": COUNTRIES[(i as usize) % COUNTRIES.len()],
                "tags": tags,
            })
        })
        .collect()
}

fn indexed_spec() -> CollectionSpec {
    serde_json::from_value(json!({
        "id_attr": "id",
        "indices": [
            {"kind": "range", "name": "age_idx", "path": "age"},
            {"kind": "range", "name": "group_idx", "path": "group"},
            {"kind": "text", "operator": "$text", "paths": ["country"],
             "options": {"id": "countries", "actuation_limit_auto": true}}
        ]
    }))
    .unwrap()
}

fn small_shards() -> QueryConfig {
    QueryConfig {
        shard_chunk_size: 4,
        default_batch_size: 3,
        ..QueryConfig::default()
    }
}

fn indexed(records: Vec<Value>) -> Collection {
    Collection::build(&indexed_spec(), records, small_shards()).unwrap()
}

fn bare(records: Vec<Value>) -> Collection {
    Collection::build(&CollectionSpec { id_attr: "id".into(), indices: Vec::new() }, records, small_shards()).unwrap()
}

/// Reference result: matcher over every record, then sort/skip/limit
fn expected(records: &[Value], criteria: &Value, options: &FindOptions) -> Vec<Value> {
    let matcher = CriteriaMatcher::new();
    let mut matches: Vec<Value> = records.iter().filter(|r| matcher.matches(criteria, r)).cloned().collect();
    ResultSorter::sort(&mut matches, &options.sort);
    matches
        .into_iter()
        .skip(options.skip)
        .take(options.limit.unwrap_or(usize::MAX))
        .collect()
}

fn ids(records: &[Value]) -> Vec<i64> {
    records.iter().map(|r| r["id"].as_i64().unwrap()).collect()
}

// =============================================================================
// Primary Key Tests
// =============================================================================

/// id < 10 over 51 records returns exactly ids 0..=9.
#[tokio::test]
async fn test_primary_range_over_51_records() {
    let collection = bare(numbered(51));
    let result = collection
        .find(&json!({"id": {"$lt": 10}}), &FindOptions::new())
        .await
        .unwrap();

    assert_eq!(ids(&result.records), (0..10).collect::<Vec<_>>());
    assert!(!result.diagnostics.missed);
}

// =============================================================================
// Fallback Tests
// =============================================================================

/// Without usable indices, find equals the matcher over the whole collection.
#[tokio::test]
async fn test_fallback_equals_matcher() {
    let records = numbered(40);
    let collection = bare(records.clone());

    let cases = vec![
        (json!({"age": {"$gte": 20, "$lt": 40}}), FindOptions::new()),
        (json!({"group": {"$in": [1, 3]}}), FindOptions::new().with_sort(SortSpec::desc("age")).with_limit(4)),
        (json!({"tags": "odd", "age": {"$ne": 13}}), FindOptions::new().with_skip(2).with_limit(3)),
        (json!({"$or": [{"age": 0}, {"country": {"$regex": "^Au"}}]}), FindOptions::new().with_sort(SortSpec::asc("country"))),
        (json!({"missing": null}), FindOptions::new().with_limit(2)),
    ];

    for (criteria, options) in cases {
        let result = collection.find(&criteria, &options).await.unwrap();
        assert!(result.diagnostics.missed);
        assert_eq!(result.records, expected(&records, &criteria, &options), "criteria {}", criteria);
    }
}

/// Indexed and unindexed collections agree on every query.
#[tokio::test]
async fn test_indexed_equals_fallback() {
    let records = numbered(60);
    let with = indexed(records.clone());
    let without = bare(records.clone());

    let cases = vec![
        (json!({"age": {"$gt": 10, "$lte": 30}}), FindOptions::new().with_sort(SortSpec::asc("id"))),
        (json!({"group": 2}), FindOptions::new().with_sort(SortSpec::asc("age")).with_limit(5)),
        (json!({"group": {"$in": [0, 1]}, "age": {"$lt": 25}}), FindOptions::new().with_sort(SortSpec::desc("age")).with_skip(3).with_limit(4)),
        (json!({"$and": [{"age": {"$gte": 5}}, {"tags": "even"}]}), FindOptions::new().with_sort(SortSpec::asc("id"))),
        (json!({}), FindOptions::new().with_sort(SortSpec::desc("age")).with_sort(SortSpec::asc("id")).with_limit(7)),
    ];

    for (criteria, options) in cases {
        let indexed_result = with.find(&criteria, &options).await.unwrap();
        let fallback = without.find(&criteria, &options).await.unwrap();
        let reference = expected(&records, &criteria, &options);
        assert_eq!(indexed_result.records, reference, "indexed, criteria {}", criteria);
        assert_eq!(fallback.records, reference, "fallback, criteria {}", criteria);
    }
}

/// Index-driven sorts agree with the fallback when the sort path holds
/// arrays, objects or runs through arrays.
#[tokio::test]
async fn test_multikey_sort_equals_fallback() {
    let records = vec![
        json!({"id": 1, "score": [1, 100]}),
        json!({"id": 2, "score": 5}),
        json!({"id": 3, "score": 6}),
        json!({"id": 4, "score": []}),
        json!({"id": 5, "score": {"a": 1}}),
        json!({"id": 6}),
        json!({"id": 7, "score": [7, "x"]}),
        json!({"id": 8, "items": [{"qty": 3}, {"qty": 50}]}),
        json!({"id": 9, "items": [{"qty": 20}]}),
        json!({"id": 10, "items": {"qty": 9}}),
    ];
    let spec: CollectionSpec = serde_json::from_value(json!({
        "indices": [
            {"kind": "range", "name": "score_idx", "path": "score"},
            {"kind": "range", "name": "qty_idx", "path": "items.qty"}
        ]
    }))
    .unwrap();
    let with = Collection::build(&spec, records.clone(), small_shards()).unwrap();
    let without = bare(records.clone());

    let cases = vec![
        (json!({}), FindOptions::new().with_sort(SortSpec::asc("score")).with_limit(2)),
        (json!({}), FindOptions::new().with_sort(SortSpec::desc("score")).with_limit(3)),
        (json!({}), FindOptions::new().with_sort(SortSpec::asc("score")).with_skip(5).with_limit(3)),
        (json!({"score": {"$gt": 4}}), FindOptions::new().with_sort(SortSpec::asc("score")).with_limit(2)),
        (json!({"score": 5}), FindOptions::new().with_sort(SortSpec::desc("score")).with_limit(1)),
        (json!({}), FindOptions::new().with_sort(SortSpec::asc("items.qty")).with_skip(7).with_limit(2)),
        (json!({}), FindOptions::new().with_sort(SortSpec::desc("items.qty")).with_limit(2)),
    ];

    for (criteria, options) in cases {
        let indexed_result = with.find(&criteria, &options).await.unwrap();
        let fallback = without.find(&criteria, &options).await.unwrap();
        let reference = expected(&records, &criteria, &options);
        assert!(indexed_result.diagnostics.greedy, "criteria {}", criteria);
        assert_eq!(ids(&indexed_result.records), ids(&reference), "indexed, criteria {}", criteria);
        assert_eq!(ids(&fallback.records), ids(&reference), "fallback, criteria {}", criteria);
    }

    let smallest_scalars = with
        .find(&json!({}), &FindOptions::new().with_sort(SortSpec::asc("score")).with_skip(6).with_limit(2))
        .await
        .unwrap();
    assert_eq!(ids(&smallest_scalars.records), vec![1, 2]);
}

// =============================================================================
// Sort / Skip / Limit Tests
// =============================================================================

/// A greedy sorted query stops after skip + limit matches.
#[tokio::test]
async fn test_greedy_sorted_window() {
    let records = numbered(50);
    let collection = indexed(records.clone());
    let options = FindOptions::new().with_sort(SortSpec::asc("age")).with_skip(2).with_limit(3);
    let criteria = json!({"group": {"$gte": 1}});

    let result = collection.find(&criteria, &options).await.unwrap();
    assert!(result.diagnostics.greedy);
    assert_eq!(result.records, expected(&records, &criteria, &options));
    assert!(result.scanned_count <= 5);
    assert!(result.limit_applied);
}

/// Skip past the end returns nothing.
#[tokio::test]
async fn test_skip_past_end() {
    let collection = indexed(numbered(10));
    let result = collection
        .find(&json!({"group": 1}), &FindOptions::new().with_skip(100))
        .await
        .unwrap();
    assert!(result.is_empty());
    assert!(!result.limit_applied);
}

// =============================================================================
// Text Operator Tests
// =============================================================================

/// $text at the top level narrows by fuzzy match.
#[tokio::test]
async fn test_text_top_level() {
    let records = numbered(21);
    let collection = indexed(records.clone());

    let result = collection
        .find(&json!({"$text": "Angoli"}), &FindOptions::new().with_sort(SortSpec::asc("id")))
        .await
        .unwrap();

    let angola: Vec<i64> = (0..21).filter(|i| i % 7 == 0).collect();
    assert_eq!(ids(&result.records), angola);
    assert!(result.diagnostics.greedy);
}

/// $text combined with an indexed clause intersects both.
#[tokio::test]
async fn test_text_with_range() {
    let collection = indexed(numbered(28));
    let result = collection
        .find(&json!({"$text": "Brazil", "group": 2}), &FindOptions::new())
        .await
        .unwrap();

    for record in &result.records {
        assert_eq!(record["country"], "Brazil");
        assert_eq!(record["group"], 2);
    }
    assert_eq!(ids(&result.records), vec![6]);
}

/// $text under $or keeps its meaning through the membership rewrite.
#[tokio::test]
async fn test_text_under_or() {
    let records = numbered(28);
    let collection = indexed(records.clone());
    let criteria = json!({"$or": [{"$text": "Brazil"}, {"age": 0}]});

    let result = collection
        .find(&criteria, &FindOptions::new().with_sort(SortSpec::asc("id")))
        .await
        .unwrap();

    let expected_ids: Vec<i64> = records
        .iter()
        .filter(|r| r["country"] == "Brazil" || r["age"] == 0)
        .map(|r| r["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids(&result.records), expected_ids);
}

// =============================================================================
// Failure Tests
// =============================================================================

/// A text index that fails to load fails the find with its error code.
#[tokio::test]
async fn test_load_failure_surfaces() {
    let records = numbered(5);
    let loader = FnLoader(|| async { Err::<PostingMap<IndexKey>, String>("disk gone".to_string()) });
    let lazy = InvertedIndex::lazy(TextIndexOptions::new("countries"), TokenizerHooks::none(), Arc::new(loader)).unwrap();

    let primary = Arc::new(MemoryPrimaryIndex::with_records("id", records.clone()).unwrap());
    let schema = Schema::new("id", primary)
        .bind_path("age", Arc::new(RangeIndex::build("age_idx", "age", "id", &records).unwrap()))
        .bind_operator("$text", Arc::new(TextIndex::new("countries", "$text", vec![lazy])));
    let collection = Collection::new(schema, QueryConfig::default()).unwrap();

    let err = collection
        .find(&json!({"$text": "Angola"}), &FindOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::Executor(_)));
    assert_eq!(err.code(), "AERO_TEXT_LOAD_FAILED");
    assert_eq!(collection.metrics().queries_failed, 1);
}

/// Malformed criteria are rejected before execution.
#[tokio::test]
async fn test_malformed_rejected() {
    let collection = indexed(numbered(5));
    for criteria in [json!({"$and": []}), json!({"age": {"$in": 4}}), json!({"$near": [0, 0]})] {
        let err = collection.find(&criteria, &FindOptions::new()).await.unwrap_err();
        assert_eq!(err.code(), "AERO_QUERY_INVALID", "criteria {}", criteria);
    }
}
