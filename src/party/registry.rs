use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

use storyboard_core::models::{CursorPosition, UserPresence, ViewTarget, ViewTargetKind};

use super::protocol::{JoinUser, ServerMessage};

/// Live connection handle for one participant in one room. The connection
/// id guards eviction: only the connection that registered the participant
/// may remove it again.
struct Peer {
    conn_id: Uuid,
    tx: UnboundedSender<ServerMessage>,
}

#[derive(Default)]
struct Room {
    users: HashMap<String, UserPresence>,
    peers: HashMap<String, Peer>,
}

impl Room {
    /// Fan a message out to every peer, optionally excluding one user. A
    /// failed send means that peer's pump is gone; it is skipped so one dead
    /// connection cannot block the rest of the room.
    fn broadcast(&self, message: &ServerMessage, exclude: Option<&str>) {
        for (user_id, peer) in &self.peers {
            if exclude == Some(user_id.as_str()) {
                continue;
            }
            let _ = peer.tx.send(message.clone());
        }
    }
}

/// Per-room presence state. Rooms are created on the first join and removed
/// when the last participant leaves; opening a connection alone never
/// creates one. All mutation happens under one lock which is never held
/// across an await.
#[derive(Clone, Default)]
pub struct RoomRegistry {
    rooms: Arc<Mutex<HashMap<String, Room>>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current users of a room, for the initial `presence.sync` and the
    /// REST views' `onlineUsers`. Empty when the room does not exist.
    pub fn snapshot(&self, room_id: &str) -> Vec<UserPresence> {
        let rooms = self.lock();
        rooms
            .get(room_id)
            .map(|room| room.users.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Register a participant and announce it to everyone else in the room.
    pub fn join(
        &self,
        room_id: &str,
        user: JoinUser,
        conn_id: Uuid,
        tx: UnboundedSender<ServerMessage>,
    ) {
        let presence = UserPresence {
            user_id: user.user_id.clone(),
            name: user.name,
            avatar: user.avatar,
            cursor: None,
            viewing: ViewTarget {
                kind: ViewTargetKind::Project,
                id: room_id.to_string(),
            },
            editing: None,
            last_seen: Utc::now(),
        };

        let mut rooms = self.lock();
        let room = rooms.entry(room_id.to_string()).or_default();
        room.users.insert(user.user_id.clone(), presence.clone());
        room.peers
            .insert(user.user_id.clone(), Peer { conn_id, tx });
        room.broadcast(&ServerMessage::Join { user: presence }, Some(&user.user_id));
        tracing::debug!(room = room_id, user = %user.user_id, "participant joined");
    }

    /// Update a joined participant's cursor and tell the other participants.
    /// Participants that never joined are ignored.
    pub fn move_cursor(&self, room_id: &str, user_id: &str, cursor: CursorPosition) {
        let mut rooms = self.lock();
        let Some(room) = rooms.get_mut(room_id) else {
            return;
        };
        let Some(user) = room.users.get_mut(user_id) else {
            return;
        };
        user.cursor = Some(cursor);
        user.last_seen = Utc::now();
        room.broadcast(
            &ServerMessage::CursorMove {
                user_id: user_id.to_string(),
                cursor,
            },
            Some(user_id),
        );
    }

    /// Opaque relay: everyone currently in the room gets it, sender included.
    pub fn relay_event(&self, room_id: &str, event: serde_json::Value) {
        let rooms = self.lock();
        if let Some(room) = rooms.get(room_id) {
            room.broadcast(&ServerMessage::Event { event }, None);
        }
    }

    /// Drop a participant when its connection closes. A stale connection
    /// closing after the participant rejoined elsewhere does not evict the
    /// live registration. The room itself is removed once empty.
    pub fn leave(&self, room_id: &str, user_id: &str, conn_id: Uuid) {
        let mut rooms = self.lock();
        let Some(room) = rooms.get_mut(room_id) else {
            return;
        };
        match room.peers.get(user_id) {
            Some(peer) if peer.conn_id == conn_id => {}
            _ => return,
        }
        room.peers.remove(user_id);
        room.users.remove(user_id);
        room.broadcast(
            &ServerMessage::Leave {
                user_id: user_id.to_string(),
            },
            None,
        );
        tracing::debug!(room = room_id, user = user_id, "participant left");
        if room.peers.is_empty() {
            rooms.remove(room_id);
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Room>> {
        self.rooms.lock().expect("room registry mutex poisoned")
    }
}
