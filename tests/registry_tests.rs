#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Registry tests: room creation, connection dispatch, listing and teardown.

mod common;

use common::{fixture_catalog, join, registry, registry_with, settle, MockTransport};
use party_rooms::protocol::{ClientMessage, PartialSettings, ServerMessage};
use party_rooms::{ErrorCode, Handshake, RoomConfig, RoomError};

// ════════════════════════════════════════════════════════════════════
// Creation
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn created_rooms_get_distinct_alphanumeric_ids() {
    let registry = registry_with(RoomConfig::default().with_room_id_length(6), fixture_catalog());
    let mut ids = Vec::new();
    for creator in 0..20 {
        ids.push(registry.create(creator).await);
    }
    for id in &ids {
        assert_eq!(id.len(), 6);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 20);
    assert_eq!(registry.len().await, 20);
}

#[tokio::test(start_paused = true)]
async fn host_opens_a_room_led_by_the_caller() {
    let registry = registry();
    let (transport, mut client) = MockTransport::pair();
    let handshake = Handshake::from_pairs([("user", "7"), ("name", "Grace")]);
    assert!(handshake.room_id.is_none());

    let room_id = registry.host(handshake, transport).await.unwrap();
    assert!(registry.contains(&room_id).await);

    let ServerMessage::Sync(sync) = client.next().await else {
        panic!("expected sync");
    };
    assert_eq!(sync.room_id, room_id);
    let ServerMessage::Players { players, .. } = client.next_kind("players").await else {
        panic!("expected players");
    };
    assert_eq!(players[0].user.id, 7);
    assert_eq!(players[0].user.name, "Grace");
    assert!(players[0].leader);
}

// ════════════════════════════════════════════════════════════════════
// Refusals
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn unknown_room_is_refused() {
    let registry = registry();
    let (transport, mut client) = MockTransport::pair();
    let err = registry
        .dispatch(common::handshake("nope", 1, "Ada"), transport)
        .await
        .unwrap_err();
    assert!(matches!(err, RoomError::RoomNotFound(id) if id == "nope"));
    assert_eq!(client.closed_with().await, ErrorCode::RoomNotFound);
    assert!(client.is_closed());
}

#[tokio::test(start_paused = true)]
async fn handshake_without_room_is_refused() {
    let registry = registry();
    let (transport, mut client) = MockTransport::pair();
    let handshake = Handshake::default().with_param("user", "1");
    assert!(registry.dispatch(handshake, transport).await.is_err());
    assert_eq!(client.closed_with().await, ErrorCode::InvalidHandshake);
}

#[tokio::test(start_paused = true)]
async fn unidentified_session_is_refused() {
    let registry = registry();
    let room_id = registry.create(1).await;
    let (transport, mut client) = MockTransport::pair();
    let handshake = Handshake::default().with_room(room_id).with_param("name", "Nobody");
    let err = registry.dispatch(handshake, transport).await.unwrap_err();
    assert!(matches!(err, RoomError::Identity(_)));
    assert_eq!(client.closed_with().await, ErrorCode::Unauthorized);
}

// ════════════════════════════════════════════════════════════════════
// Listing
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn public_rooms_lists_only_public_rooms() {
    let registry = registry();
    let open = registry.create(1).await;
    let hidden = registry.create(2).await;

    let _host = join(&registry, &open, 1).await;
    let _guest = join(&registry, &open, 3).await;
    let private_host = join(&registry, &hidden, 2).await;
    private_host.send(&ClientMessage::SyncSettings(PartialSettings {
        public: Some(false),
        ..Default::default()
    }));
    settle().await;

    let rooms = registry.public_rooms(Some(3)).await;
    assert_eq!(rooms.len(), 1);
    let room = &rooms[0];
    assert_eq!(room.id, open);
    assert!(!room.started);
    assert_eq!(room.leader.as_ref().unwrap().id, 1);
    assert_eq!(room.players, vec![common::player_name(3)]);
    assert!(room.rejoin);

    let rooms = registry.public_rooms(Some(42)).await;
    assert!(!rooms[0].rejoin);
    assert!(!registry.public_rooms(None).await[0].rejoin);
}

// ════════════════════════════════════════════════════════════════════
// Teardown
// ════════════════════════════════════════════════════════════════════

#[tokio::test(start_paused = true)]
async fn destroy_disconnects_everyone() {
    let registry = registry();
    let room_id = registry.create(1).await;
    let mut first = join(&registry, &room_id, 1).await;
    let mut second = join(&registry, &room_id, 2).await;

    assert!(registry.destroy(&room_id).await);
    assert!(!registry.destroy(&room_id).await);
    assert!(!registry.contains(&room_id).await);

    assert_eq!(first.closed_with().await, ErrorCode::RoomClosed);
    assert_eq!(second.closed_with().await, ErrorCode::RoomClosed);
    assert!(first.try_next().await.is_none());

    let (_, mut late) = common::try_join(&registry, &room_id, 3).await;
    assert_eq!(late.closed_with().await, ErrorCode::RoomNotFound);
}

#[tokio::test(start_paused = true)]
async fn shutdown_empties_the_registry() {
    let registry = registry();
    let room_id = registry.create(1).await;
    let mut client = join(&registry, &room_id, 1).await;
    registry.create(2).await;

    registry.shutdown().await;
    assert!(registry.is_empty().await);
    assert_eq!(client.closed_with().await, ErrorCode::RoomClosed);
}
