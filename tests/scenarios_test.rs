//! End-to-end assembly scenarios through the session controller.

mod common;

use std::sync::Arc;
use std::time::Duration;

use answer_stream::assembler::{ContentAssembler, SourceMerge};
use answer_stream::models::StreamRequest;
use answer_stream::observe::ObserverEvent;
use answer_stream::queue::EffectQueue;
use answer_stream::reveal::RevealKind;
use answer_stream::stream::StreamEvent;
use common::*;
use parking_lot::Mutex;

fn request() -> StreamRequest {
    StreamRequest::new("acct-1", "How does pacing work?").with_thread(THREAD_ID)
}

#[tokio::test(start_paused = true)]
async fn test_thought_chunks_merge_into_one_item() {
    let http = MockHttpConfig::new()
        .with_records(
            STREAM_URL,
            [
                thought("m1", "t1", "making"),
                thought("m1", "t1", " progress"),
                end("m1"),
            ],
        )
        .build();
    let mut harness = Harness::new(http);

    let report = harness.controller.run(request()).await.unwrap();

    assert!(report.outcome.is_completed());
    assert_eq!(report.finalized.len(), 1);
    let message = &report.finalized[0];
    assert_eq!(message.id, "m1");
    assert_eq!(message.thought_items.len(), 1);
    assert_eq!(message.thought_items[0].sub_id, "t1");
    assert_eq!(message.thought_items[0].tool_name, "search");
    assert_eq!(message.thought_items[0].description, "making progress");
    assert!(message.done);

    // Every thought frame is re-wrapped with its sub id
    let events = harness.drain_events();
    let thought_text: String = frames(&events)
        .into_iter()
        .filter_map(|frame| match frame.kind {
            RevealKind::Thought { sub_id, .. } => {
                assert_eq!(sub_id, "t1");
                Some(frame.slice)
            }
            _ => None,
        })
        .collect();
    assert_eq!(thought_text, "making progress");
}

#[tokio::test(start_paused = true)]
async fn test_queue_keeps_order_under_latency_inversion() {
    // Unordered: the fast second task lands first.
    let unordered = Arc::new(Mutex::new(ContentAssembler::default()));
    let slow = {
        let assembler = Arc::clone(&unordered);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            assembler.lock().apply(&StreamEvent::answer("m2", "Hello"));
        })
    };
    let fast = {
        let assembler = Arc::clone(&unordered);
        tokio::spawn(async move {
            assembler.lock().apply(&StreamEvent::answer("m2", " world"));
        })
    };
    slow.await.unwrap();
    fast.await.unwrap();
    assert_eq!(unordered.lock().live().unwrap().content(), " worldHello");

    // Through the effect queue the same latencies keep stream order.
    let ordered = Arc::new(Mutex::new(ContentAssembler::default()));
    let queue = EffectQueue::new();
    {
        let assembler = Arc::clone(&ordered);
        queue.enqueue(move || async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            assembler.lock().apply(&StreamEvent::answer("m2", "Hello"));
            Ok(())
        });
    }
    {
        let assembler = Arc::clone(&ordered);
        queue.enqueue(move || async move {
            assembler.lock().apply(&StreamEvent::answer("m2", " world"));
            Ok(())
        });
    }
    queue.wait_idle().await;

    assert_eq!(ordered.lock().live().unwrap().content(), "Hello world");
    assert_eq!(queue.stats().completed, 2);
}

#[tokio::test(start_paused = true)]
async fn test_answer_split_across_chunk_boundaries() {
    let body = format!("{}\n{}\n{}\n", answer("m2", "Hello"), answer("m2", " world"), end("m2"));
    let http = MockHttpConfig::new()
        .with_chunked_body(STREAM_URL, &body, 3)
        .build();
    let mut harness = Harness::new(http);

    let report = harness.controller.run(request()).await.unwrap();

    assert_eq!(report.finalized[0].content, "Hello world");
    assert_eq!(revealed_text(&harness.drain_events(), "m2"), "Hello world");
}

#[tokio::test(start_paused = true)]
async fn test_malformed_record_is_skipped_and_stream_continues() {
    let http = MockHttpConfig::new()
        .with_records(
            STREAM_URL,
            [
                answer("m1", "before "),
                "this is not json".to_string(),
                answer("m1", "after"),
                end("m1"),
            ],
        )
        .build();
    let mut harness = Harness::new(http);

    let report = harness.controller.run(request()).await.unwrap();

    assert!(report.outcome.is_completed());
    assert_eq!(report.skipped_records, 1);
    assert_eq!(report.finalized.len(), 1);
    assert_eq!(report.finalized[0].content, "before after");

    let events = harness.drain_events();
    assert!(events
        .iter()
        .any(|e| matches!(e, ObserverEvent::RecordSkipped { .. })));
}

#[tokio::test(start_paused = true)]
async fn test_error_event_finalizes_like_end_marker() {
    let http = MockHttpConfig::new()
        .with_records(STREAM_URL, [answer("m3", "partial "), error("m3", "rate limited")])
        .build();
    let mut harness = Harness::new(http);

    let report = harness.controller.run(request()).await.unwrap();

    assert_eq!(report.finalized.len(), 1);
    let message = &report.finalized[0];
    assert_eq!(message.content, "rate limited");
    assert!(message.failed);
    assert!(message.done);

    // Same reconciliation as a normal finalize
    let steps: Vec<_> = harness.backend.calls().iter().map(|c| c.step()).collect();
    assert_eq!(steps.len(), 2);
    assert!(harness.backend.calls().contains(&BackendCall::ScoreRecommendations {
        thread_id: THREAD_ID.to_string(),
        message_id: "m3".to_string(),
    }));

    let events = harness.drain_events();
    assert_eq!(revealed_text(&events, "m3"), "partial rate limited");
    assert!(events
        .iter()
        .any(|e| matches!(e, ObserverEvent::Finalized(m) if m.id == "m3" && m.failed)));
}

#[tokio::test(start_paused = true)]
async fn test_new_message_id_finalizes_previous() {
    let http = MockHttpConfig::new()
        .with_records(
            STREAM_URL,
            [answer("m1", "first"), answer("m2", "second"), end("m2")],
        )
        .build();
    let harness = Harness::new(http);

    let report = harness.controller.run(request()).await.unwrap();

    let ids: Vec<_> = report.finalized.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(ids, vec!["m1", "m2"]);
    assert_eq!(report.finalized[0].content, "first");
    assert!(report.finalized[0].done);

    let history = harness.controller.history();
    assert_eq!(history.len(), 2);
    assert_eq!(history.get("m2").map(|m| m.content.as_str()), Some("second"));
}

#[tokio::test(start_paused = true)]
async fn test_source_batches_follow_merge_mode() {
    let records = [
        sources("m1", &["c1", "c2"]),
        sources("m1", &["c2", "c3"]),
        end("m1"),
    ];

    let concat = Harness::new(
        MockHttpConfig::new()
            .with_records(STREAM_URL, records.clone())
            .build(),
    );
    let report = concat.controller.run(request()).await.unwrap();
    assert_eq!(report.finalized[0].citations().count(), 4);

    let dedup = Harness::with_config(
        test_config().with_source_merge(SourceMerge::DedupById),
        MockHttpConfig::new().with_records(STREAM_URL, records).build(),
        MockThreadBackend::new(),
    );
    let report = dedup.controller.run(request()).await.unwrap();
    let ids: Vec<_> = report.finalized[0]
        .citations()
        .filter_map(|c| c.id.as_deref())
        .collect();
    assert_eq!(ids, vec!["c1", "c2", "c3"]);
}
