//! Room registry.
//!
//! [`RoomRegistry`] owns every live room behind its id. It creates rooms,
//! routes new connections to them and forgets a room once its task ends.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use rand::distributions::Alphanumeric;
use rand::Rng;
use tokio::sync::{oneshot, Mutex};
use tracing::{debug, info};

use crate::catalog::CardCatalog;
use crate::config::RoomConfig;
use crate::error::{Result, RoomError};
use crate::error_codes::ErrorCode;
use crate::identity::{Handshake, Identity, SessionIdentity};
use crate::protocol::{RoomId, RoomSummary, UserId};
use crate::room::{self, ConnectionHandle, RoomEvent, RoomHandle};
use crate::transport::Transport;

struct RegistryInner {
    rooms: Mutex<HashMap<RoomId, RoomHandle>>,
    config: Arc<RoomConfig>,
    catalog: Arc<dyn CardCatalog>,
    identity: Arc<dyn SessionIdentity>,
}

/// Cloneable handle to the set of live rooms.
#[derive(Clone)]
pub struct RoomRegistry {
    inner: Arc<RegistryInner>,
}

impl RoomRegistry {
    pub fn new(
        config: RoomConfig,
        catalog: Arc<dyn CardCatalog>,
        identity: Arc<dyn SessionIdentity>,
    ) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                rooms: Mutex::new(HashMap::new()),
                config: Arc::new(config),
                catalog,
                identity,
            }),
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.inner.config
    }

    /// Open an empty room owned by `creator` and return its id.
    ///
    /// The room closes by itself if nobody attaches within
    /// [`RoomConfig::idle_room_timeout`].
    pub async fn create(&self, creator: UserId) -> RoomId {
        let mut rooms = self.inner.rooms.lock().await;
        let id = loop {
            let candidate: RoomId = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(self.inner.config.room_id_length)
                .map(char::from)
                .collect();
            if !rooms.contains_key(&candidate) {
                break candidate;
            }
        };

        let (handle, task) = room::open(
            id.clone(),
            creator,
            Arc::clone(&self.inner.config),
            Arc::clone(&self.inner.catalog),
        );
        rooms.insert(id.clone(), handle.clone());
        drop(rooms);

        let registry = Arc::downgrade(&self.inner);
        let room_id = id.clone();
        tokio::spawn(async move {
            task.await;
            forget(registry, &room_id, &handle).await;
        });

        info!(room_id = %id, creator, "room created");
        id
    }

    /// Identify the connection and attach it to the room named in the
    /// handshake.
    ///
    /// Refused connections receive a `closed` message with the reason before
    /// the transport is closed.
    ///
    /// # Errors
    ///
    /// - [`RoomError::InvalidMessage`] when the handshake names no room.
    /// - [`RoomError::Identity`] when the session cannot be identified.
    /// - [`RoomError::RoomNotFound`] / [`RoomError::RoomClosed`] when the room
    ///   does not exist or is shutting down.
    pub async fn dispatch(&self, handshake: Handshake, transport: impl Transport) -> Result<RoomId> {
        let Some(room_id) = handshake.room_id.clone() else {
            room::refuse(transport, ErrorCode::InvalidHandshake).await;
            return Err(RoomError::InvalidMessage("handshake names no room".into()));
        };
        let identity = match self.inner.identity.identify(&handshake).await {
            Ok(identity) => identity,
            Err(e) => {
                room::refuse(transport, ErrorCode::Unauthorized).await;
                return Err(e);
            }
        };
        self.attach(&room_id, identity, transport).await?;
        Ok(room_id)
    }

    /// Identify the connection, open a room led by it and attach it.
    ///
    /// # Errors
    ///
    /// Same as [`dispatch`](Self::dispatch), minus the missing-room case.
    pub async fn host(&self, handshake: Handshake, transport: impl Transport) -> Result<RoomId> {
        let identity = match self.inner.identity.identify(&handshake).await {
            Ok(identity) => identity,
            Err(e) => {
                room::refuse(transport, ErrorCode::Unauthorized).await;
                return Err(e);
            }
        };
        let room_id = self.create(identity.id).await;
        self.attach(&room_id, identity, transport).await?;
        Ok(room_id)
    }

    /// Attach an already identified connection to a room.
    ///
    /// # Errors
    ///
    /// [`RoomError::RoomNotFound`] or [`RoomError::RoomClosed`]; the transport
    /// is refused in both cases.
    pub async fn attach(
        &self,
        room_id: &str,
        identity: Identity,
        transport: impl Transport,
    ) -> Result<()> {
        let Some(handle) = self.handle(room_id).await else {
            debug!(room_id, "connection for unknown room");
            room::refuse(transport, ErrorCode::RoomNotFound).await;
            return Err(RoomError::RoomNotFound(room_id.to_owned()));
        };

        let (connection, outbound) = ConnectionHandle::new();
        let connection_id = connection.id();
        // Attach is queued before the connection task can forward anything.
        if handle
            .send(RoomEvent::Attach {
                identity,
                connection,
            })
            .is_err()
        {
            room::refuse(transport, ErrorCode::RoomClosed).await;
            return Err(RoomError::RoomClosed);
        }

        tokio::spawn(room::run_connection(
            transport,
            connection_id,
            outbound,
            handle.sender(),
            Arc::clone(&self.inner.config),
        ));
        Ok(())
    }

    /// Disconnect everyone from a room and remove it. Returns `false` if no
    /// such room exists.
    pub async fn destroy(&self, room_id: &str) -> bool {
        let Some(handle) = self.inner.rooms.lock().await.remove(room_id) else {
            return false;
        };
        if handle.send(RoomEvent::Shutdown).is_err() {
            debug!(room_id, "room already stopped");
        }
        info!(room_id, "room destroyed");
        true
    }

    /// Destroy every room.
    pub async fn shutdown(&self) {
        let rooms: Vec<(RoomId, RoomHandle)> = self.inner.rooms.lock().await.drain().collect();
        for (room_id, handle) in rooms {
            let _ = handle.send(RoomEvent::Shutdown);
            debug!(%room_id, "room shut down");
        }
    }

    /// Summaries of every public room, from `viewer`'s perspective.
    pub async fn public_rooms(&self, viewer: Option<UserId>) -> Vec<RoomSummary> {
        let handles: Vec<RoomHandle> = self.inner.rooms.lock().await.values().cloned().collect();
        let mut summaries = Vec::new();
        for handle in handles {
            let (reply, response) = oneshot::channel();
            if handle.send(RoomEvent::Describe { viewer, reply }).is_err() {
                continue;
            }
            match response.await {
                Ok((true, summary)) => summaries.push(summary),
                Ok((false, _)) => {}
                Err(_) => debug!("room stopped while being listed"),
            }
        }
        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        summaries
    }

    pub async fn contains(&self, room_id: &str) -> bool {
        self.inner.rooms.lock().await.contains_key(room_id)
    }

    pub async fn len(&self) -> usize {
        self.inner.rooms.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.rooms.lock().await.is_empty()
    }

    async fn handle(&self, room_id: &str) -> Option<RoomHandle> {
        self.inner.rooms.lock().await.get(room_id).cloned()
    }
}

/// Drop the entry of a room whose task ended, unless the id was reused.
async fn forget(registry: Weak<RegistryInner>, room_id: &str, handle: &RoomHandle) {
    let Some(inner) = registry.upgrade() else {
        return;
    };
    let mut rooms = inner.rooms.lock().await;
    if rooms.get(room_id).is_some_and(|h| h.same_room(handle)) {
        rooms.remove(room_id);
        debug!(room_id, "room removed from registry");
    }
}

impl std::fmt::Debug for RoomRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomRegistry")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}
