//! Card catalog: pack resolution and card rendering.
//!
//! The engine only moves card ids around. A [`CardCatalog`] turns the packs a
//! leader selected into id pools when a game starts, and turns ids back into
//! display text whenever a view is sent. [`StaticCatalog`] is an in-memory
//! implementation loaded from JSON.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::deck::BlackCard;
use crate::error::{Result, RoomError};
use crate::protocol::{BlackCardView, CardId, PackId, SettingsPack, UserId, WhiteCardView};

/// Who may play with a pack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PackPrivacy {
    #[default]
    Public,
    /// Usable in any room where the owner is seated.
    RoomOnly,
    /// Usable only when the owner leads the room.
    Private,
}

/// Input of [`CardCatalog::card_pool`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolRequest {
    pub packs: Vec<SettingsPack>,
    pub leader: UserId,
    /// Every seated user, leader included.
    pub participants: Vec<UserId>,
}

/// Card ids a game is played with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardPool {
    /// The requested packs that passed the visibility check.
    pub packs: Vec<SettingsPack>,
    pub whites: Vec<CardId>,
    pub blacks: Vec<BlackCard>,
}

/// Returns whether a pack with the given owner and privacy may be used by a
/// room led by `leader` with the given participants.
pub fn pack_usable(
    owner: Option<UserId>,
    privacy: PackPrivacy,
    leader: UserId,
    participants: &[UserId],
) -> bool {
    match (privacy, owner) {
        (PackPrivacy::Public, _) => true,
        (PackPrivacy::RoomOnly, Some(owner)) => participants.contains(&owner),
        (PackPrivacy::Private, Some(owner)) => owner == leader,
        (_, None) => false,
    }
}

#[async_trait]
pub trait CardCatalog: Send + Sync + 'static {
    /// Resolve the selected packs into card pools.
    ///
    /// Packs that are unknown, hidden from this room or have neither pile
    /// selected are left out of the pool (and out of [`CardPool::packs`]).
    async fn card_pool(&self, request: &PoolRequest) -> Result<CardPool>;

    /// Render white cards, keeping the order of `ids`.
    async fn white_cards(&self, ids: &[CardId]) -> Result<Vec<WhiteCardView>>;

    async fn black_card(&self, id: CardId) -> Result<BlackCardView>;

    /// Render several groups of white cards, e.g. every submitted choice.
    async fn white_card_groups(&self, groups: &[Vec<CardId>]) -> Result<Vec<Vec<WhiteCardView>>> {
        let mut rendered = Vec::with_capacity(groups.len());
        for group in groups {
            rendered.push(self.white_cards(group).await?);
        }
        Ok(rendered)
    }
}

// ── Static catalog ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhiteCardEntry {
    pub id: CardId,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlackCardEntry {
    pub id: CardId,
    pub text: String,
    #[serde(default = "default_pick")]
    pub pick: usize,
    #[serde(default)]
    pub draw: usize,
}

fn default_pick() -> usize {
    1
}

/// One pack of a [`StaticCatalog`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticPack {
    pub id: PackId,
    pub name: String,
    #[serde(default)]
    pub owner: Option<UserId>,
    #[serde(default)]
    pub privacy: PackPrivacy,
    #[serde(default)]
    pub whites: Vec<WhiteCardEntry>,
    #[serde(default)]
    pub blacks: Vec<BlackCardEntry>,
}

impl StaticPack {
    /// An empty public pack.
    pub fn new(id: PackId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            owner: None,
            privacy: PackPrivacy::Public,
            whites: Vec::new(),
            blacks: Vec::new(),
        }
    }

    #[must_use]
    pub fn owned_by(mut self, owner: UserId, privacy: PackPrivacy) -> Self {
        self.owner = Some(owner);
        self.privacy = privacy;
        self
    }

    #[must_use]
    pub fn with_white(mut self, id: CardId, text: impl Into<String>) -> Self {
        self.whites.push(WhiteCardEntry {
            id,
            text: text.into(),
        });
        self
    }

    #[must_use]
    pub fn with_black(mut self, id: CardId, text: impl Into<String>, pick: usize, draw: usize) -> Self {
        self.blacks.push(BlackCardEntry {
            id,
            text: text.into(),
            pick: pick.max(1),
            draw,
        });
        self
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    packs: Vec<StaticPack>,
}

/// In-memory catalog.
///
/// JSON layout:
///
/// ```json
/// { "packs": [ { "id": 1, "name": "Base", "privacy": "public",
///     "whites": [ { "id": 10, "text": "A lazy afternoon." } ],
///     "blacks": [ { "id": 20, "text": "What ruined brunch? ____.", "pick": 1 } ] } ] }
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    packs: Vec<StaticPack>,
    /// card id → (pack index, card index)
    white_index: HashMap<CardId, (usize, usize)>,
    black_index: HashMap<CardId, (usize, usize)>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pack. A card id already present in another pack is shadowed.
    #[must_use]
    pub fn with_pack(mut self, pack: StaticPack) -> Self {
        let pack_index = self.packs.len();
        for (card_index, card) in pack.whites.iter().enumerate() {
            self.white_index.insert(card.id, (pack_index, card_index));
        }
        for (card_index, card) in pack.blacks.iter().enumerate() {
            self.black_index.insert(card.id, (pack_index, card_index));
        }
        self.packs.push(pack);
        self
    }

    /// Parse a catalog from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`RoomError::Serialization`] on malformed input.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(json)?;
        Ok(file
            .packs
            .into_iter()
            .fold(Self::new(), |catalog, pack| catalog.with_pack(pack)))
    }

    /// Read and parse a JSON catalog file.
    ///
    /// # Errors
    ///
    /// Returns [`RoomError::Io`] if the file cannot be read and
    /// [`RoomError::Serialization`] on malformed input.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn packs(&self) -> &[StaticPack] {
        &self.packs
    }

    fn pack(&self, id: PackId) -> Option<&StaticPack> {
        self.packs.iter().find(|p| p.id == id)
    }

    fn white(&self, id: CardId) -> Result<WhiteCardView> {
        let (pack, card) = self
            .white_index
            .get(&id)
            .and_then(|(p, c)| {
                let pack = self.packs.get(*p)?;
                Some((pack, pack.whites.get(*c)?))
            })
            .ok_or_else(|| RoomError::Catalog(format!("unknown white card {id}")))?;
        Ok(WhiteCardView {
            id,
            text: card.text.clone(),
            pack: pack.name.clone(),
        })
    }
}

#[async_trait]
impl CardCatalog for StaticCatalog {
    async fn card_pool(&self, request: &PoolRequest) -> Result<CardPool> {
        let mut pool = CardPool::default();
        for selected in request.packs.iter().filter(|p| p.is_used()) {
            let Some(pack) = self.pack(selected.id) else {
                continue;
            };
            if !pack_usable(pack.owner, pack.privacy, request.leader, &request.participants) {
                continue;
            }
            if selected.whites {
                pool.whites.extend(pack.whites.iter().map(|c| c.id));
            }
            if selected.blacks {
                pool.blacks
                    .extend(pack.blacks.iter().map(|c| BlackCard::new(c.id, c.pick, c.draw)));
            }
            pool.packs.push(*selected);
        }
        Ok(pool)
    }

    async fn white_cards(&self, ids: &[CardId]) -> Result<Vec<WhiteCardView>> {
        ids.iter().map(|id| self.white(*id)).collect()
    }

    async fn black_card(&self, id: CardId) -> Result<BlackCardView> {
        let (pack, card) = self
            .black_index
            .get(&id)
            .and_then(|(p, c)| {
                let pack = self.packs.get(*p)?;
                Some((pack, pack.blacks.get(*c)?))
            })
            .ok_or_else(|| RoomError::Catalog(format!("unknown black card {id}")))?;
        Ok(BlackCardView {
            id,
            text: card.text.clone(),
            pack: pack.name.clone(),
            pick: card.pick.max(1),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn catalog() -> StaticCatalog {
        StaticCatalog::new()
            .with_pack(
                StaticPack::new(1, "Base")
                    .with_white(10, "ten")
                    .with_white(11, "eleven")
                    .with_black(20, "twenty ____", 1, 0),
            )
            .with_pack(
                StaticPack::new(2, "Friends")
                    .owned_by(7, PackPrivacy::RoomOnly)
                    .with_white(30, "thirty"),
            )
            .with_pack(
                StaticPack::new(3, "Secret")
                    .owned_by(7, PackPrivacy::Private)
                    .with_black(40, "forty ____ ____", 2, 1),
            )
    }

    fn select(id: PackId) -> SettingsPack {
        SettingsPack {
            id,
            whites: true,
            blacks: true,
        }
    }

    #[test]
    fn visibility_rules() {
        assert!(pack_usable(None, PackPrivacy::Public, 1, &[1]));
        assert!(pack_usable(Some(7), PackPrivacy::RoomOnly, 1, &[1, 7]));
        assert!(!pack_usable(Some(7), PackPrivacy::RoomOnly, 1, &[1, 2]));
        assert!(pack_usable(Some(7), PackPrivacy::Private, 7, &[7]));
        assert!(!pack_usable(Some(7), PackPrivacy::Private, 1, &[1, 7]));
        assert!(!pack_usable(None, PackPrivacy::Private, 1, &[1]));
    }

    #[tokio::test]
    async fn card_pool_filters_hidden_and_unused_packs() {
        let catalog = catalog();
        let request = PoolRequest {
            packs: vec![
                select(1),
                select(2),
                select(3),
                SettingsPack {
                    id: 1,
                    whites: false,
                    blacks: false,
                },
                select(99),
            ],
            leader: 1,
            participants: vec![1, 7],
        };
        let pool = catalog.card_pool(&request).await.unwrap();
        assert_eq!(pool.packs, vec![select(1), select(2)]);
        assert_eq!(pool.whites, vec![10, 11, 30]);
        assert_eq!(pool.blacks, vec![BlackCard::new(20, 1, 0)]);
    }

    #[tokio::test]
    async fn card_pool_respects_pile_selection() {
        let pool = catalog()
            .card_pool(&PoolRequest {
                packs: vec![SettingsPack {
                    id: 1,
                    whites: false,
                    blacks: true,
                }],
                leader: 1,
                participants: vec![1],
            })
            .await
            .unwrap();
        assert!(pool.whites.is_empty());
        assert_eq!(pool.blacks.len(), 1);
    }

    #[tokio::test]
    async fn renders_cards_in_order() {
        let catalog = catalog();
        let whites = catalog.white_cards(&[30, 10]).await.unwrap();
        assert_eq!(whites[0].text, "thirty");
        assert_eq!(whites[0].pack, "Friends");
        assert_eq!(whites[1].id, 10);

        let black = catalog.black_card(40).await.unwrap();
        assert_eq!(black.pick, 2);
        assert_eq!(black.pack, "Secret");

        assert!(matches!(
            catalog.white_cards(&[10, 12345]).await,
            Err(RoomError::Catalog(_))
        ));
        assert!(catalog.black_card(10).await.is_err());
    }

    #[test]
    fn from_json_parses_defaults() {
        let json = r#"{"packs":[{"id":5,"name":"Json","whites":[{"id":1,"text":"a"}],
            "blacks":[{"id":2,"text":"b ____"}]}]}"#;
        let catalog = StaticCatalog::from_json(json).unwrap();
        let pack = &catalog.packs()[0];
        assert_eq!(pack.privacy, PackPrivacy::Public);
        assert_eq!(pack.blacks[0].pick, 1);
        assert_eq!(pack.blacks[0].draw, 0);

        assert!(matches!(
            StaticCatalog::from_json("{"),
            Err(RoomError::Serialization(_))
        ));
    }
}
