//! Broker connection loss and recovery with a presenter running on top.

use serde_json::json;
use whiskers_domain::MediaActivity;

use super::{E2EPresenter, FALLBACK, PRIMARY};
use crate::infrastructure::messaging::ConnectionState;
use crate::ports::outbound::MinigameSignal;

#[tokio::test]
async fn falls_back_to_the_secondary_broker() {
    let harness = E2EPresenter::start_with(|transport| transport.refuse(PRIMARY)).await;

    assert_eq!(harness.transport.connect_attempts(), vec![PRIMARY, FALLBACK]);
    assert!(harness.state().connected());

    harness.stop().await;
}

#[tokio::test]
async fn outbound_messages_survive_a_broker_outage_in_order() {
    let mut harness = E2EPresenter::start().await;
    harness.proceed_to_hall().await;
    harness.send(json!({"type": "make_choice", "choiceIndex": 0}));
    harness
        .wait_for_state(|s| s.media_active() == MediaActivity::Minigame)
        .await;
    harness.wait_for_published("minigame_status", 1).await;
    let delivered_before = harness.transport.published().len();

    harness.transport.refuse(PRIMARY);
    harness.transport.refuse(FALLBACK);
    harness.transport.drop_link("broker restart");
    harness.wait_for_state(|s| !s.connected()).await;

    // the story keeps moving while nothing can be delivered
    assert!(harness
        .host
        .emit(MinigameSignal::Completed(json!({"success": true, "score": 7}))));
    harness
        .wait_for_state(|s| s.current_chapter().as_str() == "ending_good")
        .await;
    assert_eq!(harness.transport.published().len(), delivered_before);

    harness.transport.accept(PRIMARY);
    harness.wait_for_connection(ConnectionState::Connected).await;
    harness.wait_for_state(|s| s.connected()).await;
    harness.wait_for_published("chapter_changed", 4).await;

    let flushed: Vec<_> = harness.published()[delivered_before..].to_vec();
    let completed = flushed
        .iter()
        .position(|m| m["type"] == "minigame_status" && m["status"] == "completed")
        .expect("completion flushed");
    let ending = flushed
        .iter()
        .position(|m| m["type"] == "chapter_changed" && m["currentChapter"] == "ending_good")
        .expect("ending flushed");
    assert!(completed < ending);

    // exactly once: start, hall, garden, ending_good
    assert_eq!(harness.published_of("chapter_changed").len(), 4);

    harness.stop().await;
}

#[tokio::test]
async fn shutdown_stops_media_and_disconnects() {
    let harness = E2EPresenter::start().await;

    let router = harness.stop().await;

    let ctx = router.context();
    assert!(!ctx.state().connected());
    assert!(ctx.media().is_fully_stopped());
}
