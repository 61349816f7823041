//! End-to-end flows through every stage of the pipeline.
//!
//! - a dated place event is normalized with timestamp siblings and indexed.
//! - relations reach the graph store but never a bulk request.
//! - a capacity rejection holds back the next batch until the cooldown ends.
//! - an index that already exists is registered and written to.
//! - a structured geometry survives normalization and compilation unchanged.

use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;

use e2e_tests::{
    node_event, rejected, relation_event, FakeSearchEngine, HarnessConfig, TestHarness,
};
use histograph_normalize::CommandNormalizer;
use histograph_search::{compile_one, BulkOp};
use histograph_types::{Acknowledgement, FieldValue, Operation, RawEvent, Structure};

#[tokio::test(start_paused = true)]
async fn test_dated_place_is_normalized_and_indexed() {
    let TestHarness {
        queue,
        graph,
        engine,
        pipeline,
        ..
    } = TestHarness::new();

    let event = RawEvent::new("add", "ds1")
        .with_field("id", "123")
        .with_field("type", "Place")
        .with_field("validSince", "1990");
    queue.push(&event).unwrap();
    drop(queue);

    let stats = pipeline.run().await.unwrap();
    assert_eq!(stats.documents_written, 1);

    let registered = graph.registered();
    assert_eq!(registered.len(), 1);
    let command = &registered[0];
    assert_eq!(command.operation, Operation::Add);
    assert_eq!(command.dataset, "ds1");
    assert_eq!(command.kind.as_deref(), Some("Place"));
    assert_eq!(command.id.as_deref(), Some("urn:hgid:ds1/123"));
    assert_eq!(command.data["validSinceTimestamp"], FieldValue::integer(631_152_000));

    let requests = engine.requests();
    assert_eq!(requests.len(), 1);
    let action = &requests[0][0];
    assert_eq!(action.op, BulkOp::Index);
    assert_eq!(action.action.index, "ds1");
    assert_eq!(action.action.kind.as_deref(), Some("Place"));

    let document = action.document.as_ref().unwrap();
    assert_eq!(document["dataset"], json!("ds1"));
    assert_eq!(document["validSinceTimestamp"], json!(631_152_000));
    assert_eq!(
        document["validSince"],
        json!(["1990-01-01T00:00:00+00:00", "1990-12-31T23:59:59+00:00"])
    );
}

#[tokio::test(start_paused = true)]
async fn test_relations_never_reach_the_index() {
    let TestHarness {
        queue,
        graph,
        engine,
        pipeline,
        ..
    } = TestHarness::new();

    queue.push(&node_event("add", "ds1", "1")).unwrap();
    queue.push(&relation_event("ds1", "1", "2")).unwrap();
    queue.push(&node_event("add", "ds1", "2")).unwrap();
    drop(queue);

    let stats = pipeline.run().await.unwrap();

    // the graph store sees all three
    assert_eq!(graph.registered().len(), 3);
    assert_eq!(stats.relations_skipped, 1);
    assert_eq!(stats.nodes_forwarded, 2);

    let sent: Vec<_> = engine.requests().into_iter().flatten().collect();
    assert_eq!(sent.len(), 2);
    assert!(sent.iter().all(|a| a.action.id.is_some()));
}

#[tokio::test(start_paused = true)]
async fn test_rejection_suspends_until_cooldown() {
    let engine = FakeSearchEngine::new();
    engine.reply_with(Ok(rejected()));

    let TestHarness {
        queue,
        engine,
        pipeline,
        ..
    } = TestHarness::with_engine(
        engine,
        HarnessConfig {
            batch_size: 1,
            cooldown: Duration::from_secs(10),
            ..Default::default()
        },
    );

    queue.push(&node_event("add", "ds1", "1")).unwrap();
    queue.push(&node_event("add", "ds1", "2")).unwrap();
    drop(queue);

    let stats = pipeline.run().await.unwrap();

    let sent_at = engine.sent_at();
    assert_eq!(sent_at.len(), 2);
    assert!(sent_at[1].duration_since(sent_at[0]) >= Duration::from_secs(10));
    assert_eq!(
        engine.request_ids(),
        vec![vec!["urn:hgid:ds1/1".to_string()], vec!["urn:hgid:ds1/2".to_string()]]
    );
    assert_eq!(stats.batches_written, 2);
    assert_eq!(stats.item_failures, 1);
}

#[tokio::test(start_paused = true)]
async fn test_existing_index_is_registered_and_written() {
    let engine = FakeSearchEngine::new().with_existing_index("ds1");

    let TestHarness {
        queue,
        engine,
        registry,
        pipeline,
        ..
    } = TestHarness::with_engine(engine, HarnessConfig::default());

    queue.push(&node_event("add", "ds1", "1")).unwrap();
    drop(queue);

    let stats = pipeline.run().await.unwrap();

    assert_eq!(engine.creations(), vec!["ds1".to_string()]);
    assert!(registry.contains("ds1"));
    assert_eq!(engine.requests().len(), 1);
    assert_eq!(stats.documents_written, 1);
}

#[test]
fn test_geometry_survives_normalize_and_compile() {
    let geometry = json!({
        "type": "Polygon",
        "coordinates": [[[4.8, 52.3], [4.9, 52.3], [4.9, 52.4], [4.8, 52.3]]],
        "crs": null,
        "sequence": u64::MAX
    });
    let event: RawEvent = serde_json::from_value(json!({
        "action": "add",
        "dataset": "ds1",
        "data": {"id": "1", "type": "Place", "geometry": geometry.clone()}
    }))
    .unwrap();

    let command = CommandNormalizer::default().normalize(&event).unwrap();
    // stored as a string on the command
    assert!(command.data["geometry"].as_str().is_some());

    let action = compile_one(&Acknowledgement::new(Structure::Node, command));
    let document = action.document.unwrap();
    assert_eq!(document["geometry"], geometry);
}
