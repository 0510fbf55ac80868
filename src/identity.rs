//! Session identity: who is behind a connection.
//!
//! Authentication itself lives outside this crate. A [`SessionIdentity`]
//! provider looks at the connection [`Handshake`] and either yields a stable
//! [`Identity`] or rejects the connection.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RoomError};
use crate::protocol::{RoomId, UserId};

/// Handshake parameter carrying the target room.
pub const ROOM_PARAM: &str = "room";

/// Whatever a connection carried when it was opened.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Handshake {
    pub room_id: Option<RoomId>,
    pub params: HashMap<String, String>,
}

impl Handshake {
    /// Build a handshake from key/value pairs, lifting `room` into
    /// [`room_id`](Self::room_id).
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut params: HashMap<String, String> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        let room_id = params.remove(ROOM_PARAM).filter(|id| !id.is_empty());
        Self { room_id, params }
    }

    #[must_use]
    pub fn with_room(mut self, room_id: impl Into<RoomId>) -> Self {
        self.room_id = Some(room_id.into());
        self
    }

    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

/// A stable user identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub name: String,
    #[serde(default)]
    pub picture: Option<String>,
}

impl Identity {
    pub fn new(id: UserId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            picture: None,
        }
    }

    #[must_use]
    pub fn with_picture(mut self, picture: impl Into<String>) -> Self {
        self.picture = Some(picture.into());
        self
    }
}

/// Identity provider consulted for every inbound connection.
#[async_trait]
pub trait SessionIdentity: Send + Sync + 'static {
    /// Identify the user behind `handshake`.
    ///
    /// # Errors
    ///
    /// Returns [`RoomError::Identity`] when the connection must be refused.
    async fn identify(&self, handshake: &Handshake) -> Result<Identity>;
}

/// Trusts the `user`, `name` and `picture` handshake parameters.
///
/// Meant for development servers and tests where no real sign-in exists.
#[derive(Debug, Clone)]
pub struct AnonymousIdentity {
    default_name: String,
}

impl Default for AnonymousIdentity {
    fn default() -> Self {
        Self {
            default_name: "Anonymous".into(),
        }
    }
}

impl AnonymousIdentity {
    pub fn new(default_name: impl Into<String>) -> Self {
        Self {
            default_name: default_name.into(),
        }
    }
}

#[async_trait]
impl SessionIdentity for AnonymousIdentity {
    async fn identify(&self, handshake: &Handshake) -> Result<Identity> {
        let id = handshake
            .param("user")
            .ok_or_else(|| RoomError::Identity("missing `user` parameter".into()))?
            .parse::<UserId>()
            .map_err(|e| RoomError::Identity(format!("invalid `user` parameter: {e}")))?;

        let name = handshake
            .param("name")
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(&self.default_name);

        let mut identity = Identity::new(id, name);
        identity.picture = handshake.param("picture").map(str::to_owned);
        Ok(identity)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn from_pairs_lifts_room() {
        let handshake = Handshake::from_pairs([("room", "abc"), ("user", "7")]);
        assert_eq!(handshake.room_id.as_deref(), Some("abc"));
        assert_eq!(handshake.param("user"), Some("7"));
        assert!(handshake.param("room").is_none());

        let empty = Handshake::from_pairs([("room", "")]);
        assert!(empty.room_id.is_none());
    }

    #[tokio::test]
    async fn anonymous_identity_reads_params() {
        let provider = AnonymousIdentity::default();
        let handshake = Handshake::default()
            .with_param("user", "42")
            .with_param("name", " Ada ");
        let identity = provider.identify(&handshake).await.unwrap();
        assert_eq!(identity, Identity::new(42, "Ada"));

        let nameless = Handshake::default().with_param("user", "1");
        assert_eq!(provider.identify(&nameless).await.unwrap().name, "Anonymous");
    }

    #[test]
    fn anonymous_identity_rejects_missing_or_bad_user() {
        let provider = AnonymousIdentity::default();
        assert!(matches!(
            tokio_test::block_on(provider.identify(&Handshake::default())),
            Err(RoomError::Identity(_))
        ));
        let bad = Handshake::default().with_param("user", "nope");
        tokio_test::assert_err!(tokio_test::block_on(provider.identify(&bad)));
    }
}
