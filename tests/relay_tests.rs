mod utils;

use battleship::store::{keys, StateStore};
use battleship::{Notification, NotificationRelay};
use utils::{FleetBuilder, TestSetupBuilder};

#[tokio::test]
async fn test_game_start_reaches_both_players_once() {
    let mut setup = TestSetupBuilder::new().with_two_players().build().await;
    setup.create_room("r1", &["alice", "bob"]).await;
    let fleet = FleetBuilder::new().stacked_rows().build();

    setup.place_fleet("r1", "alice", &fleet).await;
    setup.settle().await;
    let alice_messages = setup.global_messages("alice");
    assert_eq!(alice_messages.len(), 1);
    assert_eq!(alice_messages[0]["type"], "ships_placed");
    assert!(setup.global_messages("bob").is_empty());

    setup.place_fleet("r1", "bob", &fleet).await;
    setup.expect_global("bob", "ships_placed").await;
    let to_alice = setup.expect_global("alice", "game_start").await;
    let to_bob = setup.expect_global("bob", "game_start").await;
    assert_eq!(to_alice, to_bob);
    assert_eq!(to_alice["roomId"], "r1");

    // A resubmitted fleet announces again but keeps the running game
    setup.place_fleet("r1", "bob", &fleet).await;
    setup.expect_global("bob", "ships_placed").await;
    let restart = setup.expect_global("alice", "game_start").await;
    assert_eq!(restart["turn"], to_alice["turn"]);
}

#[tokio::test]
async fn test_malformed_payload_does_not_stop_relay() {
    let mut setup = TestSetupBuilder::new().with_two_players().build().await;

    setup
        .store
        .publish(keys::NOTIFICATIONS_CHANNEL, "not json")
        .await
        .unwrap();
    setup
        .store
        .publish(keys::NOTIFICATIONS_CHANNEL, r#"{"type":"match_found"}"#)
        .await
        .unwrap();
    let valid = Notification::match_found("r9", "alice").to_json().unwrap();
    setup
        .store
        .publish(keys::NOTIFICATIONS_CHANNEL, &valid)
        .await
        .unwrap();

    let delivered = setup.expect_global("alice", "match_found").await;
    assert_eq!(delivered["roomId"], "r9");
}

#[tokio::test]
async fn test_offline_recipient_is_skipped() {
    let mut setup = TestSetupBuilder::new().with_two_players().build().await;

    for player in ["carol", "bob"] {
        let payload = Notification::match_found("r2", player).to_json().unwrap();
        setup
            .store
            .publish(keys::NOTIFICATIONS_CHANNEL, &payload)
            .await
            .unwrap();
    }

    let delivered = setup.expect_global("bob", "match_found").await;
    assert_eq!(delivered["player"], "bob");
    assert!(setup.global_messages("alice").is_empty());
}

#[tokio::test]
async fn test_relay_only_starts_game_when_both_fleets_exist() {
    let mut setup = TestSetupBuilder::new()
        .with_two_players()
        .without_background_tasks()
        .build()
        .await;
    setup.create_room("r1", &["alice", "bob"]).await;
    let fleet = FleetBuilder::new().stacked_rows().build();
    setup.place_fleet("r1", "alice", &fleet).await;

    let relay = NotificationRelay::new(
        setup.state.store.clone(),
        setup.state.connections.clone(),
        setup.state.game_service.clone(),
    );

    // Forged notification claiming bob placed ships he never sent
    let forged = Notification::ships_placed("r1", "bob").to_json().unwrap();
    relay.handle_payload(&forged).await;

    let to_bob = setup.global_messages("bob");
    assert_eq!(to_bob.len(), 1);
    assert_eq!(to_bob[0]["type"], "ships_placed");
    assert!(setup.global_messages("alice").is_empty());
    assert!(setup
        .state
        .game_service
        .get_session("r1")
        .await
        .unwrap()
        .is_none());
}
