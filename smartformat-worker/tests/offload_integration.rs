//! Integration tests for the background transform worker.

use std::collections::HashSet;

use smartformat_core::{
    Bounds, Element, ElementKind, FormatEngine, LayoutContext, Role, TransformOptions,
};
use smartformat_worker::{OffloadError, OffloadHandle};

fn square() -> LayoutContext {
    LayoutContext::new(1080.0, 1080.0, "instagram", "post").expect("square")
}

fn target(width: f32, height: f32) -> LayoutContext {
    LayoutContext::new(width, height, "custom", "target").expect("target")
}

fn layout() -> Vec<Element> {
    vec![
        Element::text("Launch day", 48.0, Bounds::new(100.0, 100.0, 600.0, 120.0))
            .with_id("heading")
            .with_role(Role::Heading),
        Element::new(ElementKind::Image, Bounds::new(100.0, 300.0, 880.0, 500.0)).with_id("photo"),
        Element::text("Join us", 28.0, Bounds::new(380.0, 880.0, 320.0, 80.0))
            .with_id("cta")
            .with_role(Role::Cta),
    ]
}

fn offloaded() -> TransformOptions {
    TransformOptions {
        use_offload: true,
        ..TransformOptions::default()
    }
}

#[tokio::test]
async fn test_offloaded_matches_inline() {
    let handle = OffloadHandle::spawn(FormatEngine::builtin());
    let story = LayoutContext::new(1080.0, 1920.0, "instagram", "story").expect("story");

    let inline = FormatEngine::builtin().transform(
        &layout(),
        &square(),
        &story,
        &TransformOptions::default(),
    );
    let remote = handle.transform(&layout(), &square(), &story, &offloaded()).await;
    assert_eq!(inline, remote);

    handle.shutdown().await;
}

#[tokio::test]
async fn test_concurrent_requests_get_their_own_replies() {
    let handle = OffloadHandle::spawn(FormatEngine::builtin());

    let mut waiting = Vec::new();
    for width in [400.0, 800.0, 1200.0, 1600.0] {
        let to = target(width, 1000.0);
        let (id, pending) = handle
            .submit(layout(), square(), to, TransformOptions::default())
            .expect("submit");
        assert_eq!(id, pending.id());
        waiting.push((id, width, pending));
    }

    let ids: HashSet<_> = waiting.iter().map(|(id, _, _)| *id).collect();
    assert_eq!(ids.len(), 4);

    for (id, width, pending) in waiting {
        let response = pending.await.expect("reply");
        assert_eq!(response.id, id);
        for element in &response.elements {
            assert!(element.bounds.is_within(width, 1000.0), "{id}: {:?}", element.bounds);
        }
    }
    assert_eq!(handle.in_flight(), 0);

    handle.shutdown().await;
}

#[tokio::test]
async fn test_transform_many_keeps_target_order() {
    let handle = OffloadHandle::spawn(FormatEngine::builtin());
    let targets = [target(500.0, 500.0), target(2000.0, 1000.0)];

    let results = handle
        .transform_many(&layout(), &square(), &targets, &offloaded())
        .await;
    assert_eq!(results.len(), 2);
    assert!(results[0].iter().all(|e| e.bounds.is_within(500.0, 500.0)));
    assert!(results[1].iter().all(|e| e.bounds.is_within(2000.0, 1000.0)));

    handle.shutdown().await;
}

#[tokio::test]
async fn test_after_shutdown_submit_fails_and_transform_runs_inline() {
    let handle = OffloadHandle::spawn(FormatEngine::builtin());
    handle.shutdown().await;

    let options = TransformOptions::default();
    let result = handle.submit(layout(), square(), target(540.0, 540.0), options);
    assert!(matches!(result, Err(OffloadError::ChannelClosed)));
    assert_eq!(handle.in_flight(), 0);

    let out = handle
        .transform(&layout(), &square(), &target(540.0, 540.0), &offloaded())
        .await;
    let inline = FormatEngine::builtin().transform(
        &layout(),
        &square(),
        &target(540.0, 540.0),
        &offloaded(),
    );
    assert_eq!(out, inline);
}
