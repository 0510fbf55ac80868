#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing,
    dead_code
)]
//! Shared test utilities for Party Rooms integration tests.
//!
//! Provides a channel-based [`MockTransport`] whose other end is a
//! [`TestClient`], a small card catalog fixture and helpers for opening rooms
//! and starting games.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use party_rooms::catalog::{CardPool, PackPrivacy, PoolRequest, StaticPack};
use party_rooms::protocol::{
    BlackCardView, CardId, ClientMessage, NewRoundPayload, RoomId, ServerMessage, Settings,
    SettingsPack, UserId, WhiteCardView,
};
use party_rooms::{
    AnonymousIdentity, CardCatalog, ErrorCode, Handshake, RoomConfig, RoomError, RoomRegistry,
    StaticCatalog, Transport,
};
use tokio::sync::{mpsc, Semaphore};

/// Longest a test waits for a message before giving up.
const RECV_TIMEOUT: Duration = Duration::from_secs(30);

// ── MockTransport ───────────────────────────────────────────────────

/// A transport backed by two unbounded channels.
///
/// Frames pushed through [`TestClient::send`] come out of `recv()`; frames
/// the server sends are readable with [`TestClient::next`]. Dropping the
/// client's sender (see [`TestClient::disconnect`]) makes `recv()` return
/// `None`, like a peer hanging up.
pub struct MockTransport {
    inbound: mpsc::UnboundedReceiver<String>,
    outbound: mpsc::UnboundedSender<String>,
    closed: Arc<AtomicBool>,
}

impl MockTransport {
    pub fn pair() -> (Self, TestClient) {
        let (in_tx, in_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        let transport = Self {
            inbound: in_rx,
            outbound: out_tx,
            closed: Arc::clone(&closed),
        };
        let client = TestClient {
            inbound: Some(in_tx),
            outbound: out_rx,
            closed,
        };
        (transport, client)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, message: String) -> Result<(), RoomError> {
        if self.closed.load(Ordering::Relaxed) {
            return Err(RoomError::TransportClosed);
        }
        let _ = self.outbound.send(message);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, RoomError>> {
        self.inbound.recv().await.map(Ok)
    }

    async fn close(&mut self) -> Result<(), RoomError> {
        self.closed.store(true, Ordering::Relaxed);
        Ok(())
    }
}

// ── TestClient ──────────────────────────────────────────────────────

/// The player's side of a [`MockTransport`].
pub struct TestClient {
    inbound: Option<mpsc::UnboundedSender<String>>,
    outbound: mpsc::UnboundedReceiver<String>,
    closed: Arc<AtomicBool>,
}

impl TestClient {
    pub fn send(&self, message: &ClientMessage) {
        self.send_raw(&serde_json::to_string(message).unwrap());
    }

    pub fn send_raw(&self, text: &str) {
        if let Some(tx) = &self.inbound {
            let _ = tx.send(text.to_owned());
        }
    }

    /// Hang up from the client side.
    pub fn disconnect(&mut self) {
        self.inbound = None;
    }

    /// Whether the server closed the transport.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }

    /// Next server message, or `None` once the connection is gone.
    pub async fn try_next(&mut self) -> Option<ServerMessage> {
        let text = tokio::time::timeout(RECV_TIMEOUT, self.outbound.recv())
            .await
            .expect("timed out waiting for a server message")?;
        Some(serde_json::from_str(&text).unwrap())
    }

    pub async fn next(&mut self) -> ServerMessage {
        self.try_next().await.expect("connection closed")
    }

    /// Skip messages until one of `kind` arrives.
    pub async fn next_kind(&mut self, kind: &str) -> ServerMessage {
        loop {
            let message = self.next().await;
            if message.kind() == kind {
                return message;
            }
        }
    }

    pub async fn next_round(&mut self) -> NewRoundPayload {
        match self.next_kind("new-round").await {
            ServerMessage::NewRound(payload) => *payload,
            other => panic!("expected new-round, got {other:?}"),
        }
    }

    /// Wait for the `closed` notice.
    pub async fn closed_with(&mut self) -> ErrorCode {
        match self.next_kind("closed").await {
            ServerMessage::Closed { error_code } => error_code,
            other => panic!("expected closed, got {other:?}"),
        }
    }

    /// Everything queued right now.
    pub fn drain(&mut self) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(text) = self.outbound.try_recv() {
            messages.push(serde_json::from_str(&text).unwrap());
        }
        messages
    }

    /// Drain and keep only messages of `kind`.
    pub fn drain_kind(&mut self, kind: &str) -> Vec<ServerMessage> {
        self.drain()
            .into_iter()
            .filter(|m| m.kind() == kind)
            .collect()
    }
}

// ── Fixtures ────────────────────────────────────────────────────────

pub const BASE_PACK: u64 = 1;
pub const PICK_TWO_PACK: u64 = 2;
pub const PRIVATE_PACK: u64 = 3;
pub const PRIVATE_OWNER: UserId = 99;

/// Base: 80 whites, 10 pick-1 blacks. Pick two: 40 whites, 3 pick-2 draw-1
/// blacks. A private pack owned by [`PRIVATE_OWNER`].
pub fn fixture_catalog() -> StaticCatalog {
    let mut base = StaticPack::new(BASE_PACK, "Base");
    for id in 1..=80 {
        base = base.with_white(id, format!("White card {id}"));
    }
    for id in 1001..=1010 {
        base = base.with_black(id, format!("Black card {id}: ____."), 1, 0);
    }

    let mut pick_two = StaticPack::new(PICK_TWO_PACK, "Pick two");
    for id in 201..=240 {
        pick_two = pick_two.with_white(id, format!("White card {id}"));
    }
    for id in 2001..=2003 {
        pick_two = pick_two.with_black(id, format!("Black card {id}: ____ and ____."), 2, 1);
    }

    let private = StaticPack::new(PRIVATE_PACK, "Secret")
        .owned_by(PRIVATE_OWNER, PackPrivacy::Private)
        .with_white(301, "A secret")
        .with_black(3001, "Nobody knows ____.", 1, 0);

    StaticCatalog::new()
        .with_pack(base)
        .with_pack(pick_two)
        .with_pack(private)
}

pub fn pack(id: u64) -> SettingsPack {
    SettingsPack {
        id,
        whites: true,
        blacks: true,
    }
}

pub fn registry() -> RoomRegistry {
    registry_with(RoomConfig::default(), fixture_catalog())
}

pub fn registry_with(config: RoomConfig, catalog: StaticCatalog) -> RoomRegistry {
    registry_with_catalog(config, Arc::new(catalog))
}

pub fn registry_with_catalog(config: RoomConfig, catalog: Arc<dyn CardCatalog>) -> RoomRegistry {
    RoomRegistry::new(config, catalog, Arc::new(AnonymousIdentity::default()))
}

// ── Catalog doubles ─────────────────────────────────────────────────

/// The fixture catalog whose first `failures` pool resolutions error out.
pub struct FailingCatalog {
    inner: StaticCatalog,
    failures: AtomicUsize,
}

impl FailingCatalog {
    pub fn new(failures: usize) -> Self {
        Self {
            inner: fixture_catalog(),
            failures: AtomicUsize::new(failures),
        }
    }
}

#[async_trait]
impl CardCatalog for FailingCatalog {
    async fn card_pool(&self, request: &PoolRequest) -> Result<CardPool, RoomError> {
        let failed = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(RoomError::Catalog("card store unavailable".into()));
        }
        self.inner.card_pool(request).await
    }

    async fn white_cards(&self, ids: &[CardId]) -> Result<Vec<WhiteCardView>, RoomError> {
        self.inner.white_cards(ids).await
    }

    async fn black_card(&self, id: CardId) -> Result<BlackCardView, RoomError> {
        self.inner.black_card(id).await
    }
}

/// The fixture catalog whose pool resolutions wait for [`PoolGate::release`].
pub struct GatedCatalog {
    inner: StaticCatalog,
    gate: Arc<Semaphore>,
}

/// Lets one held pool resolution through per `release`.
#[derive(Clone)]
pub struct PoolGate(Arc<Semaphore>);

impl PoolGate {
    pub fn release(&self) {
        self.0.add_permits(1);
    }
}

impl GatedCatalog {
    pub fn new() -> (Self, PoolGate) {
        let gate = Arc::new(Semaphore::new(0));
        let catalog = Self {
            inner: fixture_catalog(),
            gate: Arc::clone(&gate),
        };
        (catalog, PoolGate(gate))
    }
}

#[async_trait]
impl CardCatalog for GatedCatalog {
    async fn card_pool(&self, request: &PoolRequest) -> Result<CardPool, RoomError> {
        self.gate
            .acquire()
            .await
            .map_err(|_| RoomError::Catalog("gate closed".into()))?
            .forget();
        self.inner.card_pool(request).await
    }

    async fn white_cards(&self, ids: &[CardId]) -> Result<Vec<WhiteCardView>, RoomError> {
        self.inner.white_cards(ids).await
    }

    async fn black_card(&self, id: CardId) -> Result<BlackCardView, RoomError> {
        self.inner.black_card(id).await
    }
}

pub fn handshake(room_id: &str, user: UserId, name: &str) -> Handshake {
    Handshake::default()
        .with_room(room_id)
        .with_param("user", user.to_string())
        .with_param("name", name)
}

/// Connect `user` to a room, returning the client whatever the outcome.
pub async fn try_join(
    registry: &RoomRegistry,
    room_id: &str,
    user: UserId,
) -> (Result<RoomId, RoomError>, TestClient) {
    let (transport, client) = MockTransport::pair();
    let result = registry
        .dispatch(handshake(room_id, user, &player_name(user)), transport)
        .await;
    (result, client)
}

/// Connect `user` and wait for the initial sync.
pub async fn join(registry: &RoomRegistry, room_id: &str, user: UserId) -> TestClient {
    let (result, mut client) = try_join(registry, room_id, user).await;
    result.unwrap();
    assert_eq!(client.next().await.kind(), "sync");
    client
}

pub fn player_name(user: UserId) -> String {
    format!("Player {user}")
}

/// Settings a leader starts with.
pub fn start_settings(packs: Vec<SettingsPack>, time_limit: Option<u32>) -> Settings {
    Settings {
        name: "Test room".into(),
        public: true,
        players_limit: 10,
        time_limit,
        score_limit: None,
        round_limit: None,
        packs,
    }
}

/// Let every task run until the runtime is idle.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

/// A started game: users `1..=players` seated in order, user 1 leading.
pub struct Table {
    pub registry: RoomRegistry,
    pub room_id: RoomId,
    pub clients: Vec<TestClient>,
    /// Each player's first `new-round`, indexed like `clients`.
    pub rounds: Vec<NewRoundPayload>,
}

impl Table {
    pub async fn start(players: UserId, settings: Settings) -> Self {
        Self::start_in(registry(), players, settings).await
    }

    pub async fn start_in(registry: RoomRegistry, players: UserId, settings: Settings) -> Self {
        let room_id = registry.create(1).await;
        let mut clients = Vec::new();
        for user in 1..=players {
            clients.push(join(&registry, &room_id, user).await);
        }
        settle().await;
        for client in &mut clients {
            client.drain();
        }

        clients[0].send(&ClientMessage::Start(settings));
        let mut rounds = Vec::new();
        for client in &mut clients {
            rounds.push(client.next_round().await);
        }
        settle().await;
        for client in &mut clients {
            client.drain();
        }
        Self {
            registry,
            room_id,
            clients,
            rounds,
        }
    }

    /// Index of the current tsar according to `rounds`.
    pub fn tsar(&self) -> usize {
        self.rounds.iter().position(|r| r.tsar).unwrap()
    }

    /// Submit `pick` cards from every non-tsar's current hand.
    pub fn submit_all(&self) {
        for (client, round) in self.clients.iter().zip(&self.rounds) {
            if !round.tsar {
                client.send(&ClientMessage::Submit {
                    cards: first_cards(round),
                });
            }
        }
    }
}

/// The first `pick` card ids of a round's hand.
pub fn first_cards(round: &NewRoundPayload) -> Vec<CardId> {
    round
        .cards
        .iter()
        .take(round.black_card.pick)
        .map(|c| c.id)
        .collect()
}
