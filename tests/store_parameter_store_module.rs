use paramset::provider::{HashingEmbedder, InMemoryVectorIndex};
use paramset::resolution::ParameterValue;
use paramset::store::{mapping_record_id, ParameterStore};
use std::fs;
use std::sync::Arc;
use tempfile::tempdir;

fn store_fixture() -> (ParameterStore, Arc<InMemoryVectorIndex>) {
    let embedder = Arc::new(HashingEmbedder::new());
    let index = Arc::new(InMemoryVectorIndex::new());
    let store = ParameterStore::new(embedder, index.clone());
    (store, index)
}

#[test]
fn store_parameter_store_module_record_ids_are_content_addressed() {
    let id = mapping_record_id("table", "leg_angle", "straight legs");
    assert_eq!(id, mapping_record_id("table", "leg_angle", "straight legs"));
    assert_eq!(id.len(), 64);
    assert!(id.chars().all(|c| c.is_ascii_hexdigit()));

    assert_ne!(id, mapping_record_id("table", "leg_angle", "bent legs"));
    assert_ne!(id, mapping_record_id("table", "width", "straight legs"));
    assert_ne!(id, mapping_record_id("bench", "leg_angle", "straight legs"));
}

#[test]
fn store_parameter_store_module_round_trips_a_mapping() {
    let (store, _index) = store_fixture();
    store
        .store_mapping(
            "table with straight legs",
            "leg_angle",
            &ParameterValue::Float(0.0),
            "picnic_table",
        )
        .expect("store");

    let mapping = store
        .find_mapping("table with straight legs", "leg_angle", "picnic_table", None)
        .expect("find")
        .expect("mapping present");

    assert_eq!(mapping.context, "table with straight legs");
    assert_eq!(mapping.value, ParameterValue::Float(0.0));
    assert_eq!(mapping.parameter_name, "leg_angle");
    assert_eq!(mapping.workflow_name, "picnic_table");
    assert_eq!(mapping.usage_count, 1);
    assert!(mapping.created_at.is_some());
    assert!(mapping.similarity >= 0.99, "got {}", mapping.similarity);
}

#[test]
fn store_parameter_store_module_lookup_is_scoped_to_parameter_and_workflow() {
    let (store, _index) = store_fixture();
    store
        .store_mapping(
            "straight legs",
            "leg_angle",
            &ParameterValue::Float(0.0),
            "picnic_table",
        )
        .expect("store");

    assert!(store
        .find_mapping("straight legs", "table_width", "picnic_table", None)
        .expect("find")
        .is_none());
    assert!(store
        .find_mapping("straight legs", "leg_angle", "bench", None)
        .expect("find")
        .is_none());
    assert!(store
        .find_mapping("straight legs", "leg_angle", "picnic_table", None)
        .expect("find")
        .is_some());
}

#[test]
fn store_parameter_store_module_unrelated_prompt_stays_below_threshold() {
    let (store, _index) = store_fixture();
    store
        .store_mapping(
            "give it an oak finish",
            "material",
            &ParameterValue::Text("oak".to_string()),
            "picnic_table",
        )
        .expect("store");

    let found = store
        .find_mapping("blue paint everywhere", "material", "picnic_table", None)
        .expect("find");
    assert!(found.is_none());
}

#[test]
fn store_parameter_store_module_restoring_same_triple_upserts() {
    let (store, index) = store_fixture();
    store
        .store_mapping(
            "straight legs",
            "leg_angle",
            &ParameterValue::Float(0.0),
            "picnic_table",
        )
        .expect("store");
    store
        .store_mapping(
            "straight legs",
            "leg_angle",
            &ParameterValue::Float(0.1),
            "picnic_table",
        )
        .expect("restore");

    assert_eq!(index.len(), 1);
    let mapping = store
        .find_mapping("straight legs", "leg_angle", "picnic_table", None)
        .expect("find")
        .expect("mapping present");
    assert_eq!(mapping.value, ParameterValue::Float(0.1));
    assert_eq!(mapping.usage_count, 1);
}

#[test]
fn store_parameter_store_module_increment_usage_bumps_count_and_keeps_created_at() {
    let (store, _index) = store_fixture();
    store
        .store_mapping(
            "straight legs",
            "leg_angle",
            &ParameterValue::Float(0.0),
            "picnic_table",
        )
        .expect("store");

    let first = store
        .find_mapping("straight legs", "leg_angle", "picnic_table", None)
        .expect("find")
        .expect("mapping present");
    store.increment_usage(&first).expect("increment");
    store
        .increment_usage(
            &store
                .find_mapping("straight legs", "leg_angle", "picnic_table", None)
                .expect("find")
                .expect("mapping present"),
        )
        .expect("increment again");

    let latest = store
        .find_mapping("straight legs", "leg_angle", "picnic_table", None)
        .expect("find")
        .expect("mapping present");
    assert_eq!(latest.usage_count, 3);
    assert_eq!(latest.created_at, first.created_at);
    assert_eq!(latest.value, first.value);
}

#[test]
fn store_parameter_store_module_namespaces_isolate_stores() {
    let embedder = Arc::new(HashingEmbedder::new());
    let index = Arc::new(InMemoryVectorIndex::new());
    let store_a = ParameterStore::new(embedder.clone(), index.clone()).with_namespace("tenant-a");
    let store_b = ParameterStore::new(embedder, index).with_namespace("tenant-b");

    store_a
        .store_mapping(
            "straight legs",
            "leg_angle",
            &ParameterValue::Float(0.0),
            "picnic_table",
        )
        .expect("store");

    assert!(store_b
        .find_mapping("straight legs", "leg_angle", "picnic_table", None)
        .expect("find")
        .is_none());
    assert!(store_a
        .find_mapping("straight legs", "leg_angle", "picnic_table", None)
        .expect("find")
        .is_some());
}

#[test]
fn store_parameter_store_module_clear_removes_all_mappings() {
    let (store, index) = store_fixture();
    store
        .store_mapping("straight legs", "leg_angle", &ParameterValue::Float(0.0), "t")
        .expect("store");
    store
        .store_mapping("oak finish", "material", &ParameterValue::Text("oak".into()), "t")
        .expect("store");

    assert_eq!(store.clear().expect("clear"), 2);
    assert!(index.is_empty());
    assert!(store
        .find_mapping("straight legs", "leg_angle", "t", Some(0.0))
        .expect("find")
        .is_none());
}

#[test]
fn store_parameter_store_module_event_log_records_lifecycle() {
    let dir = tempdir().expect("tempdir");
    let log_path = dir.path().join("events").join("parameters.jsonl");

    let embedder = Arc::new(HashingEmbedder::new());
    let index = Arc::new(InMemoryVectorIndex::new());
    let store =
        ParameterStore::new(embedder, index).with_event_log(log_path.clone());

    store
        .store_mapping("straight legs", "leg_angle", &ParameterValue::Float(0.0), "t")
        .expect("store");
    let mapping = store
        .find_mapping("straight legs", "leg_angle", "t", None)
        .expect("find")
        .expect("mapping present");
    store.increment_usage(&mapping).expect("increment");
    store.clear().expect("clear");

    let raw = fs::read_to_string(&log_path).expect("read event log");
    let events = raw
        .lines()
        .map(|line| serde_json::from_str::<serde_json::Value>(line).expect("valid json line"))
        .collect::<Vec<_>>();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0]["event"], "parameter.store");
    assert_eq!(events[1]["event"], "parameter.reuse");
    assert_eq!(events[1]["usage_count"], 2);
    assert_eq!(events[2]["event"], "parameter.clear");
    assert!(events.iter().all(|event| event["timestamp"].is_i64()));
}

#[test]
fn store_parameter_store_module_threshold_override_widens_recall() {
    let embedder = Arc::new(HashingEmbedder::new());
    let index = Arc::new(InMemoryVectorIndex::new());
    let store = ParameterStore::new(embedder, index).with_similarity_threshold(0.99);

    store
        .store_mapping(
            "make the legs straight please",
            "leg_angle",
            &ParameterValue::Float(0.0),
            "picnic_table",
        )
        .expect("store");

    // The configured threshold is strict; an explicit lower one still finds
    // the partially overlapping prompt.
    let strict = store
        .find_mapping("straight legs", "leg_angle", "picnic_table", None)
        .expect("find");
    let relaxed = store
        .find_mapping("straight legs", "leg_angle", "picnic_table", Some(0.1))
        .expect("find");
    assert!(strict.is_none());
    assert!(relaxed.is_some());
}
